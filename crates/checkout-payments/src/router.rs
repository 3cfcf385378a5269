//! Intent Routing
//!
//! Decides, for a single checkout attempt, how much to charge the
//! processor versus deduct from store credit, and which call shape the
//! payment reference needs (saved method vs. one-time confirmation
//! token, vaulted vs. fresh). Store credit is only debited once
//! settlement is certain: on the credit-only short-circuit, or on a
//! synchronously confirmed charge.

use std::sync::Arc;

use checkout_core::{
    ChargeRequest, CreditLedger, CreditSplit, IntentOutcome, PaymentReference, reconcile,
};

use crate::error::{PaymentError, Result};
use crate::processor::{FutureUsage, IntentParams, IntentStatus, IntentSummary, ProcessorClient};

/// Checkout workflow over a processor and a store-credit ledger.
pub struct IntentRouter {
    processor: Arc<dyn ProcessorClient>,
    ledger: Arc<dyn CreditLedger>,
    return_url: String,
}

impl IntentRouter {
    pub fn new(
        processor: Arc<dyn ProcessorClient>,
        ledger: Arc<dyn CreditLedger>,
        return_url: impl Into<String>,
    ) -> Self {
        Self {
            processor,
            ledger,
            return_url: return_url.into(),
        }
    }

    /// Run one checkout attempt end to end.
    pub async fn create_intent(&self, request: &ChargeRequest) -> Result<IntentOutcome> {
        request.validate()?;

        let available = self.ledger.balance(&request.customer_id);
        if request.store_credit_to_apply > available {
            return Err(checkout_core::ChargeError::InsufficientCredit {
                needed: request.store_credit_to_apply,
                available,
            }
            .into());
        }

        let split = reconcile(request.amount, available, request.store_credit_to_apply);

        if split.fully_covered() {
            // Zero-amount processor calls are invalid; settle from credit
            // alone without creating an intent.
            self.ledger.debit(&request.customer_id, split.credit_applied)?;
            tracing::info!(
                customer = %request.customer_id,
                amount_used = split.credit_applied,
                "Charge fully covered by store credit"
            );
            return Ok(IntentOutcome::PaidWithStoreCredit {
                amount_used: split.credit_applied,
            });
        }

        let params = self.build_params(request, split).await?;

        let intent = match self.processor.create_intent(params).await {
            Ok(intent) => intent,
            Err(error @ PaymentError::ProcessorRejected { .. }) => {
                let reason = error
                    .rejection_reason()
                    .unwrap_or_else(|| error.to_string());
                tracing::warn!(
                    customer = %request.customer_id,
                    reason = %reason,
                    "Processor declined the charge"
                );
                return Ok(IntentOutcome::failed(reason));
            }
            Err(error) => return Err(error),
        };

        tracing::info!(
            intent = %intent.id,
            status = ?intent.status,
            customer = %request.customer_id,
            "Payment intent created"
        );

        if intent.status == IntentStatus::Succeeded {
            self.ensure_attached_after_confirm(request, &intent).await;

            // The synchronous confirmation is treated as final for the
            // credit portion; a requires_action response does not debit.
            if split.credit_applied > 0 {
                self.ledger.debit(&request.customer_id, split.credit_applied)?;
            }
        }

        let client_secret = intent.client_secret.ok_or_else(|| {
            PaymentError::ProcessorUnavailable("intent response missing client secret".into())
        })?;

        Ok(IntentOutcome::RequiresProcessorConfirmation { client_secret })
    }

    /// Build the confirm request for the residual amount.
    ///
    /// An unattached saved method being vaulted is attached *before* the
    /// confirm call; confirming first would reference an orphaned
    /// method.
    async fn build_params(
        &self,
        request: &ChargeRequest,
        split: CreditSplit,
    ) -> Result<IntentParams> {
        let order_id = uuid::Uuid::new_v4().to_string();
        let mut params = IntentParams {
            amount: split.residual,
            currency: request.currency.to_ascii_lowercase(),
            customer: request.customer_id.clone(),
            confirm: true,
            return_url: Some(self.return_url.clone()),
            description: Some(format!(
                "Checkout order {order_id}, store credit applied: {}",
                split.credit_applied
            )),
            metadata: vec![
                ("order_id".to_string(), order_id),
                (
                    "store_credit_applied".to_string(),
                    split.credit_applied.to_string(),
                ),
                ("total".to_string(), request.amount.to_string()),
            ],
            ..IntentParams::default()
        };

        match &request.payment_reference {
            PaymentReference::SavedMethod(id) => {
                let method = self.processor.retrieve_payment_method(id).await?;

                if method.customer.is_some() {
                    tracing::debug!(method = %id, "Using vaulted payment method");
                    params.payment_method = Some(id.clone());
                    params.off_session = true;
                } else if request.save_for_future_use {
                    tracing::debug!(method = %id, "Attaching new payment method before confirm");
                    self.processor
                        .attach_payment_method(id, &request.customer_id)
                        .await?;
                    params.payment_method = Some(id.clone());
                    params.setup_future_usage = Some(FutureUsage::OffSession);
                } else {
                    tracing::debug!(method = %id, "Using payment method without saving");
                    params.payment_method = Some(id.clone());
                }
            }
            PaymentReference::OneTimeToken(id) => {
                tracing::debug!(token = %id, "Confirming with one-time token");
                params.confirmation_token = Some(id.clone());
                params.automatic_payment_methods = true;
                if request.save_for_future_use {
                    params.setup_future_usage = Some(FutureUsage::OffSession);
                }
            }
        }

        Ok(params)
    }

    /// Token-confirmed methods can come back unattached even with a
    /// future-usage marker set. The charge already went through, so a
    /// failure here is logged and never fails the request.
    async fn ensure_attached_after_confirm(&self, request: &ChargeRequest, intent: &IntentSummary) {
        if !request.save_for_future_use
            || !matches!(request.payment_reference, PaymentReference::OneTimeToken(_))
        {
            return;
        }

        let Some(method_id) = intent.payment_method.as_deref() else {
            return;
        };

        let attached = match self.processor.retrieve_payment_method(method_id).await {
            Ok(method) => method.customer.is_some(),
            Err(error) => {
                tracing::warn!(
                    method = %method_id,
                    error = %error,
                    "Could not inspect payment method after confirmation"
                );
                return;
            }
        };

        if attached {
            return;
        }

        match self
            .processor
            .attach_payment_method(method_id, &request.customer_id)
            .await
        {
            Ok(_) => tracing::info!(
                method = %method_id,
                customer = %request.customer_id,
                "Attached payment method after confirmation"
            ),
            Err(error) => tracing::warn!(
                method = %method_id,
                error = %error,
                "Failed to attach payment method after confirmation"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use checkout_core::MemoryCreditLedger;

    use crate::processor::MockProcessor;

    fn request(reference: PaymentReference) -> ChargeRequest {
        ChargeRequest {
            customer_id: "cus_123".into(),
            amount: 9900,
            currency: "usd".into(),
            payment_reference: reference,
            save_for_future_use: false,
            store_credit_to_apply: 5000,
        }
    }

    fn router(processor: Arc<MockProcessor>, seed: i64) -> (IntentRouter, Arc<MemoryCreditLedger>) {
        let ledger = Arc::new(MemoryCreditLedger::new(seed));
        let router = IntentRouter::new(processor, ledger.clone(), "checkout://stripe-redirect");
        (router, ledger)
    }

    #[tokio::test]
    async fn test_partial_credit_charges_residual() {
        let processor = Arc::new(MockProcessor::new().with_attached("pm_saved", "cus_123"));
        let (router, ledger) = router(processor.clone(), 5000);

        let outcome = router
            .create_intent(&request(PaymentReference::SavedMethod("pm_saved".into())))
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            IntentOutcome::RequiresProcessorConfirmation { .. }
        ));

        // amount=9900, credit=5000 -> the processor sees 4900
        let intent = processor.last_intent().unwrap();
        assert_eq!(intent.amount, 4900);
        assert!(intent.confirm);
        assert!(intent.off_session);
        assert_eq!(intent.payment_method.as_deref(), Some("pm_saved"));
        assert!(
            intent
                .metadata
                .contains(&("store_credit_applied".to_string(), "5000".to_string()))
        );

        // confirmed synchronously, so the credit portion settled
        assert_eq!(ledger.balance("cus_123"), 0);
    }

    #[tokio::test]
    async fn test_full_credit_skips_processor() {
        let processor = Arc::new(MockProcessor::new());
        let (router, ledger) = router(processor.clone(), 5000);

        let mut req = request(PaymentReference::SavedMethod("pm_saved".into()));
        req.amount = 3000;
        req.store_credit_to_apply = 3000;

        let outcome = router.create_intent(&req).await.unwrap();

        assert_eq!(
            outcome,
            IntentOutcome::PaidWithStoreCredit { amount_used: 3000 }
        );
        assert!(processor.calls().is_empty(), "no processor call expected");
        assert_eq!(ledger.balance("cus_123"), 2000);
    }

    #[tokio::test]
    async fn test_unattached_saved_method_attaches_before_confirm() {
        let processor = Arc::new(MockProcessor::new());
        let (router, _ledger) = router(processor.clone(), 5000);

        let mut req = request(PaymentReference::SavedMethod("pm_new".into()));
        req.save_for_future_use = true;

        router.create_intent(&req).await.unwrap();

        let calls = processor.calls();
        assert_eq!(
            calls,
            vec![
                "retrieve_payment_method:pm_new",
                "attach:pm_new:cus_123",
                "create_intent:4900",
            ]
        );

        let intent = processor.last_intent().unwrap();
        assert_eq!(
            intent.setup_future_usage,
            Some(FutureUsage::OffSession)
        );
        assert!(!intent.off_session);
    }

    #[tokio::test]
    async fn test_unattached_method_without_save_stays_bare() {
        let processor = Arc::new(MockProcessor::new());
        let (router, _ledger) = router(processor.clone(), 5000);

        router
            .create_intent(&request(PaymentReference::SavedMethod("pm_new".into())))
            .await
            .unwrap();

        let calls = processor.calls();
        assert!(!calls.iter().any(|call| call.starts_with("attach:")));

        let intent = processor.last_intent().unwrap();
        assert_eq!(intent.setup_future_usage, None);
        assert!(!intent.off_session);
    }

    #[tokio::test]
    async fn test_one_time_token_attaches_after_confirm() {
        let processor = Arc::new(MockProcessor::new().with_confirmed_method("pm_from_token"));
        let (router, _ledger) = router(processor.clone(), 5000);

        let mut req = request(PaymentReference::OneTimeToken("ctoken_abc".into()));
        req.save_for_future_use = true;

        let outcome = router.create_intent(&req).await.unwrap();
        assert!(matches!(
            outcome,
            IntentOutcome::RequiresProcessorConfirmation { .. }
        ));

        let intent = processor.last_intent().unwrap();
        assert_eq!(intent.confirmation_token.as_deref(), Some("ctoken_abc"));
        assert!(intent.automatic_payment_methods);
        assert_eq!(intent.payment_method, None);

        // the method left unattached by the token confirm gets attached
        assert_eq!(
            processor.attached_customer("pm_from_token").as_deref(),
            Some("cus_123")
        );
    }

    #[tokio::test]
    async fn test_attach_failure_after_confirm_is_not_fatal() {
        let processor = Arc::new(
            MockProcessor::new()
                .with_confirmed_method("pm_from_token")
                .with_failing_attach(),
        );
        let (router, ledger) = router(processor.clone(), 5000);

        let mut req = request(PaymentReference::OneTimeToken("ctoken_abc".into()));
        req.save_for_future_use = true;

        let outcome = router.create_intent(&req).await.unwrap();

        // charge succeeded; the attach failure is logged only
        assert!(matches!(
            outcome,
            IntentOutcome::RequiresProcessorConfirmation { .. }
        ));
        assert_eq!(ledger.balance("cus_123"), 0);
    }

    #[tokio::test]
    async fn test_decline_preserves_code() {
        let processor = Arc::new(
            MockProcessor::new().with_decline("insufficient_funds", "Your card was declined."),
        );
        let (router, ledger) = router(processor.clone(), 5000);

        let outcome = router
            .create_intent(&request(PaymentReference::SavedMethod("pm_saved".into())))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            IntentOutcome::Failed {
                reason: "insufficient_funds".into()
            }
        );
        // no settlement happened, the credit stays untouched
        assert_eq!(ledger.balance("cus_123"), 5000);
    }

    #[tokio::test]
    async fn test_requires_action_defers_credit_debit() {
        let processor = Arc::new(
            MockProcessor::new()
                .with_attached("pm_saved", "cus_123")
                .with_intent_status(IntentStatus::RequiresAction),
        );
        let (router, ledger) = router(processor.clone(), 5000);

        let outcome = router
            .create_intent(&request(PaymentReference::SavedMethod("pm_saved".into())))
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            IntentOutcome::RequiresProcessorConfirmation { .. }
        ));
        assert_eq!(ledger.balance("cus_123"), 5000);
    }

    #[tokio::test]
    async fn test_credit_beyond_balance_is_rejected() {
        let processor = Arc::new(MockProcessor::new());
        let (router, _ledger) = router(processor.clone(), 1000);

        let err = router
            .create_intent(&request(PaymentReference::SavedMethod("pm_saved".into())))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            PaymentError::Charge(checkout_core::ChargeError::InsufficientCredit {
                needed: 5000,
                available: 1000,
            })
        ));
        assert!(processor.calls().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_request_never_reaches_processor() {
        let processor = Arc::new(MockProcessor::new());
        let (router, _ledger) = router(processor.clone(), 5000);

        let mut req = request(PaymentReference::SavedMethod("pm_saved".into()));
        req.amount = -100;

        assert!(router.create_intent(&req).await.is_err());
        assert!(processor.calls().is_empty());
    }
}
