//! Currency normalization.
//!
//! Amounts in different currencies are never summed directly; each is first
//! converted to the reference currency with a fixed rate table.

use crate::error::{PriorityError, PriorityResult};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Reference currency used for every aggregate.
pub const REFERENCE_CURRENCY: &str = "EGP";

/// Built-in rates: units of the reference currency per unit of each currency.
fn default_rates() -> BTreeMap<String, Decimal> {
    [
        ("EGP", Decimal::ONE),
        ("USD", Decimal::new(50, 0)),
        ("EUR", Decimal::new(54, 0)),
        ("GBP", Decimal::new(63, 0)),
        ("SAR", Decimal::new(133, 1)),
        ("AED", Decimal::new(136, 1)),
    ]
    .into_iter()
    .map(|(code, rate)| (code.to_string(), rate))
    .collect()
}

/// Uppercases and trims a currency code.
pub fn normalize_currency_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Currency settings as read from configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CurrencyConfig {
    /// Currency every aggregate is expressed in.
    pub reference: String,
    /// Extra or overriding rates, in reference units per unit.
    pub rates: BTreeMap<String, Decimal>,
}

impl Default for CurrencyConfig {
    fn default() -> Self {
        Self {
            reference: REFERENCE_CURRENCY.to_string(),
            rates: BTreeMap::new(),
        }
    }
}

/// Fixed conversion table into one reference currency.
#[derive(Clone, Debug, PartialEq)]
pub struct RateTable {
    reference: String,
    rates: BTreeMap<String, Decimal>,
}

impl Default for RateTable {
    fn default() -> Self {
        Self {
            reference: REFERENCE_CURRENCY.to_string(),
            rates: default_rates(),
        }
    }
}

impl RateTable {
    /// Built-in rates with the configured overrides applied.
    ///
    /// When the configured reference differs from the built-in one, every
    /// rate is rebased onto it.
    pub fn from_config(config: &CurrencyConfig) -> PriorityResult<Self> {
        let mut table = Self::default();
        for (code, rate) in &config.rates {
            if *rate <= Decimal::ZERO {
                return Err(PriorityError::InvalidRate {
                    code: code.clone(),
                    rate: *rate,
                });
            }
            table = table.with_rate(code, *rate);
        }
        let reference = normalize_currency_code(&config.reference);
        if reference.is_empty() || reference == table.reference {
            return Ok(table);
        }
        let base = table
            .rates
            .get(&reference)
            .copied()
            .ok_or_else(|| PriorityError::UnknownReference(reference.clone()))?;
        Ok(Self {
            rates: table
                .rates
                .iter()
                .map(|(code, rate)| (code.clone(), rate / base))
                .collect(),
            reference,
        })
    }

    pub fn with_rate(mut self, code: &str, rate: Decimal) -> Self {
        self.rates.insert(normalize_currency_code(code), rate);
        self
    }

    pub fn reference(&self) -> &str {
        &self.reference
    }

    pub fn rate(&self, code: &str) -> Option<Decimal> {
        let code = normalize_currency_code(code);
        if code.is_empty() || code == self.reference {
            return Some(Decimal::ONE);
        }
        self.rates.get(&code).copied()
    }

    /// Converts `amount` to the reference currency. `None` for an unknown
    /// currency.
    pub fn to_reference(&self, amount: Decimal, code: &str) -> Option<Decimal> {
        self.rate(code).map(|rate| amount * rate)
    }
}
