use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum PriorityError {
    #[error("invalid rate for {code}: {rate} (must be positive)")]
    InvalidRate { code: String, rate: Decimal },

    #[error("no rate known for reference currency {0}")]
    UnknownReference(String),
}

pub type PriorityResult<T> = Result<T, PriorityError>;
