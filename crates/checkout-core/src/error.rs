//! Error Types for the Checkout Domain

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ChargeError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChargeError {
    #[error("Charge amount must be non-negative, got {0}")]
    NegativeAmount(i64),

    #[error("Store credit to apply must be non-negative, got {0}")]
    NegativeCredit(i64),

    #[error("Store credit {requested} exceeds charge amount {amount}")]
    CreditExceedsAmount { requested: i64, amount: i64 },

    #[error("Insufficient store credit: need {needed}, have {available}")]
    InsufficientCredit { needed: i64, available: i64 },

    #[error("Customer id must not be empty")]
    MissingCustomer,

    #[error("Payment reference id must not be empty")]
    EmptyPaymentReference,

    #[error("Invalid currency code: {0}")]
    InvalidCurrency(String),
}
