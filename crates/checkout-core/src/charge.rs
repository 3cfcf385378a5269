//! Charge Request Types
//!
//! Wire types describing a single checkout attempt. A request is created
//! fresh per attempt and never reused.

use serde::{Deserialize, Serialize};

use crate::error::{ChargeError, Result};

/// Tokenized payment reference supplied by the client.
///
/// The kind is an explicit tag set by the caller. Identifier prefixes
/// (`pm_`, `ctoken_`) are opaque strings here and never inspected; the
/// processor may change its id formats at any time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum PaymentReference {
    /// Durable, reusable payment method identifier, attached (or about
    /// to be attached) to a customer record.
    SavedMethod(String),

    /// Single-use token representing freshly entered card details, not
    /// yet attached to any customer.
    OneTimeToken(String),
}

impl PaymentReference {
    /// The opaque processor identifier.
    pub fn id(&self) -> &str {
        match self {
            Self::SavedMethod(id) | Self::OneTimeToken(id) => id,
        }
    }
}

/// A single checkout attempt.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargeRequest {
    /// Opaque customer identifier on the processor.
    pub customer_id: String,

    /// Requested charge amount in minor currency units.
    pub amount: i64,

    /// ISO 4217 currency code.
    #[serde(default = "default_currency")]
    pub currency: String,

    /// How the payment is funded on the processor side.
    pub payment_reference: PaymentReference,

    /// Whether the payment method should be vaulted for reuse.
    #[serde(default)]
    pub save_for_future_use: bool,

    /// Store credit the customer elected to spend, in minor units.
    #[serde(default)]
    pub store_credit_to_apply: i64,
}

fn default_currency() -> String {
    "usd".into()
}

impl ChargeRequest {
    /// Boundary validation. Out-of-range inputs are rejected here so the
    /// reconciler itself stays total.
    pub fn validate(&self) -> Result<()> {
        if self.amount < 0 {
            return Err(ChargeError::NegativeAmount(self.amount));
        }
        if self.store_credit_to_apply < 0 {
            return Err(ChargeError::NegativeCredit(self.store_credit_to_apply));
        }
        if self.store_credit_to_apply > self.amount {
            return Err(ChargeError::CreditExceedsAmount {
                requested: self.store_credit_to_apply,
                amount: self.amount,
            });
        }
        if self.customer_id.trim().is_empty() {
            return Err(ChargeError::MissingCustomer);
        }
        if self.payment_reference.id().trim().is_empty() {
            return Err(ChargeError::EmptyPaymentReference);
        }
        if self.currency.len() != 3 || !self.currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ChargeError::InvalidCurrency(self.currency.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> ChargeRequest {
        ChargeRequest {
            customer_id: "cus_123".into(),
            amount: 9900,
            currency: "usd".into(),
            payment_reference: PaymentReference::SavedMethod("pm_123".into()),
            save_for_future_use: false,
            store_credit_to_apply: 5000,
        }
    }

    #[test]
    fn test_valid_request() {
        assert!(request().validate().is_ok());
    }

    #[test]
    fn test_negative_amount_rejected() {
        let mut req = request();
        req.amount = -1;
        assert_eq!(req.validate(), Err(ChargeError::NegativeAmount(-1)));
    }

    #[test]
    fn test_credit_exceeding_amount_rejected() {
        let mut req = request();
        req.store_credit_to_apply = 10_000;
        assert!(matches!(
            req.validate(),
            Err(ChargeError::CreditExceedsAmount { .. })
        ));
    }

    #[test]
    fn test_bad_currency_rejected() {
        let mut req = request();
        req.currency = "dollars".into();
        assert!(matches!(req.validate(), Err(ChargeError::InvalidCurrency(_))));
    }

    #[test]
    fn test_reference_tag_round_trip() {
        let json = r#"{"type":"one_time_token","id":"ctoken_abc"}"#;
        let parsed: PaymentReference = serde_json::from_str(json).unwrap();
        assert_eq!(parsed, PaymentReference::OneTimeToken("ctoken_abc".into()));
        assert_eq!(parsed.id(), "ctoken_abc");
    }

    #[test]
    fn test_unknown_tag_rejected() {
        let json = r#"{"type":"magic_token","id":"x"}"#;
        assert!(serde_json::from_str::<PaymentReference>(json).is_err());
    }
}
