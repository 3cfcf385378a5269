//! Payment Error Types

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, PaymentError>;

/// Payment-related errors
#[derive(Error, Debug)]
pub enum PaymentError {
    /// The processor returned a 4xx with an error body
    #[error("Processor rejected the request: {message}")]
    ProcessorRejected {
        status: u16,
        code: Option<String>,
        decline_code: Option<String>,
        message: String,
    },

    /// Network failure or processor 5xx
    #[error("Processor unavailable: {0}")]
    ProcessorUnavailable(String),

    /// Request failed boundary validation or ledger invariants
    #[error("{0}")]
    Charge(#[from] checkout_core::ChargeError),

    /// Webhook signature verification failed
    #[error("Webhook signature invalid: {0}")]
    WebhookSignature(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl PaymentError {
    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(self, PaymentError::ProcessorUnavailable(_))
    }

    /// The most specific reason the processor gave for a rejection.
    ///
    /// Prefers the decline code, then the error code, then the message,
    /// so a card decline surfaces its code verbatim.
    pub fn rejection_reason(&self) -> Option<String> {
        match self {
            PaymentError::ProcessorRejected {
                code,
                decline_code,
                message,
                ..
            } => Some(
                decline_code
                    .clone()
                    .or_else(|| code.clone())
                    .unwrap_or_else(|| message.clone()),
            ),
            _ => None,
        }
    }
}
