//! Processor Webhook Intake
//!
//! Signature verification is delegated to the processor SDK; recognized
//! events are logged for observability. The store-credit ledger is
//! never reconciled from webhooks; settlement bookkeeping stays with
//! the intent router.

use stripe::{Event, EventObject, EventType, Webhook};

use crate::error::{PaymentError, Result};

/// Webhook handler
pub struct WebhookHandler {
    signing_secret: String,
}

impl WebhookHandler {
    pub fn new(signing_secret: impl Into<String>) -> Self {
        Self {
            signing_secret: signing_secret.into(),
        }
    }

    /// Verify the signature and parse the event.
    pub fn parse_event(&self, payload: &str, signature: &str) -> Result<Event> {
        Webhook::construct_event(payload, signature, &self.signing_secret)
            .map_err(|e| PaymentError::WebhookSignature(e.to_string()))
    }

    /// Log the outcome carried by a verified event.
    pub fn handle(&self, event: &Event) {
        match event.type_ {
            EventType::SetupIntentSucceeded => {
                if let EventObject::SetupIntent(intent) = &event.data.object {
                    tracing::info!(intent = %intent.id, "Setup intent succeeded");
                }
            }
            EventType::SetupIntentSetupFailed => {
                if let EventObject::SetupIntent(intent) = &event.data.object {
                    tracing::warn!(intent = %intent.id, "Setup intent failed");
                }
            }
            EventType::PaymentIntentSucceeded => {
                if let EventObject::PaymentIntent(intent) = &event.data.object {
                    tracing::info!(
                        intent = %intent.id,
                        amount = intent.amount,
                        "Payment intent succeeded"
                    );
                }
            }
            EventType::PaymentIntentPaymentFailed => {
                if let EventObject::PaymentIntent(intent) = &event.data.object {
                    tracing::warn!(intent = %intent.id, "Payment intent failed");
                }
            }
            _ => {
                tracing::debug!(event_type = ?event.type_, "Unhandled webhook event");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bad_signature_is_rejected() {
        let handler = WebhookHandler::new("whsec_test");
        let result = handler.parse_event(r#"{"id":"evt_1"}"#, "t=1,v1=deadbeef");
        assert!(matches!(result, Err(PaymentError::WebhookSignature(_))));
    }
}
