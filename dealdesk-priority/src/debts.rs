//! Debt aggregation for the dashboard.

use crate::currency::{RateTable, normalize_currency_code};
use crate::types::{DebtOverview, DueDebt};
use chrono::NaiveDate;
use dealdesk_model::{Debt, PressureLevel};

/// Totals over unpaid debts. Debts in a currency without a rate still count
/// toward pressure and due dates but are left out of the sums.
pub fn overview(debts: &[Debt], rates: &RateTable, today: NaiveDate) -> DebtOverview {
    let mut out = DebtOverview::default();
    for debt in debts.iter().filter(|d| !d.is_paid) {
        match (
            rates.to_reference(debt.remaining(), &debt.currency),
            rates.to_reference(debt.monthly_payment, &debt.currency),
        ) {
            (Some(remaining), Some(monthly)) => {
                out.outstanding_total += remaining;
                out.monthly_payments += monthly;
            }
            _ => {
                out.unconverted_currencies
                    .insert(normalize_currency_code(&debt.currency));
            }
        }
        if debt.effective_pressure(today) == PressureLevel::High {
            out.high_pressure_count += 1;
        }
        let Some(due) = debt.due_date else {
            continue;
        };
        if out.nearest_due.as_ref().is_none_or(|n| due < n.due_date) {
            out.nearest_due = Some(DueDebt {
                id: debt.id.clone(),
                creditor_name: debt.creditor_name.clone(),
                due_date: due,
                remaining: debt.remaining(),
                currency: debt.currency.clone(),
            });
        }
    }
    out
}
