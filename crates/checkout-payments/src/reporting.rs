//! Reporting
//!
//! Read-only summaries over recent processor activity: captured payment
//! totals with fees, and customers whose latest payment attempt failed.

use std::collections::HashMap;

use chrono::Utc;
use serde::Serialize;

use crate::error::Result;
use crate::processor::{IntentRecord, ProcessorClient};

/// Reporting window: the trailing 36 hours.
pub const LOOKBACK_SECONDS: i64 = 36 * 60 * 60;

/// Unix timestamp where the reporting window starts.
pub fn lookback_start() -> i64 {
    Utc::now().timestamp() - LOOKBACK_SECONDS
}

/// Captured totals over the window, in minor units.
#[derive(Clone, Debug, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentTotals {
    pub payment_total: i64,
    pub fee_total: i64,
    pub net_total: i64,
}

/// Sum captured charges and their processor fees since `since`.
pub async fn payment_totals(processor: &dyn ProcessorClient, since: i64) -> Result<PaymentTotals> {
    let mut payment_total = 0;
    let mut fee_total = 0;
    let mut starting_after: Option<String> = None;

    loop {
        let page = processor.list_charges(since, starting_after.as_deref()).await?;

        for charge in &page.data {
            payment_total += charge.amount_captured;

            if let Some(transaction_id) = &charge.balance_transaction {
                fee_total += processor
                    .retrieve_balance_transaction(transaction_id)
                    .await?
                    .fee;
            }
        }

        starting_after = match (page.has_more, page.data.last()) {
            (true, Some(last)) => Some(last.id.clone()),
            _ => break,
        };
    }

    Ok(PaymentTotals {
        payment_total,
        fee_total,
        net_total: payment_total - fee_total,
    })
}

/// A customer whose most recent payment attempt failed.
#[derive(Clone, Debug, Serialize)]
pub struct FailedPayment {
    pub customer: FailedPaymentCustomer,
    pub payment_intent: FailedPaymentIntent,
    pub payment_method: FailedPaymentMethod,
}

#[derive(Clone, Debug, Serialize)]
pub struct FailedPaymentCustomer {
    pub id: String,
    pub email: String,
    pub name: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct FailedPaymentIntent {
    pub created: i64,
    pub description: String,
    pub status: String,
    pub error: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct FailedPaymentMethod {
    pub last4: String,
    pub brand: String,
}

/// Find customers whose *latest* intent in the window carries a payment
/// error. Deleted customers are skipped, as are customers the processor
/// no longer knows.
pub async fn failed_payments(
    processor: &dyn ProcessorClient,
    since: i64,
) -> Result<Vec<FailedPayment>> {
    let mut latest_by_customer: HashMap<String, IntentRecord> = HashMap::new();
    let mut starting_after: Option<String> = None;

    loop {
        let page = processor
            .list_payment_intents(since, starting_after.as_deref())
            .await?;

        for intent in &page.data {
            let Some(customer_id) = intent.customer.clone() else {
                continue;
            };

            match latest_by_customer.get(&customer_id) {
                Some(existing) if existing.created >= intent.created => {}
                _ => {
                    latest_by_customer.insert(customer_id, intent.clone());
                }
            }
        }

        starting_after = match (page.has_more, page.data.last()) {
            (true, Some(last)) => Some(last.id.clone()),
            _ => break,
        };
    }

    let mut failed = Vec::new();

    for (customer_id, intent) in latest_by_customer {
        let Some(error) = &intent.last_payment_error else {
            continue;
        };

        let customer = match processor.retrieve_customer(&customer_id).await {
            Ok(customer) if !customer.deleted => customer,
            Ok(_) => continue,
            Err(fetch_error) => {
                tracing::debug!(
                    customer = %customer_id,
                    error = %fetch_error,
                    "Skipping customer in failed-payment report"
                );
                continue;
            }
        };

        let decline = error
            .decline_code
            .clone()
            .or_else(|| error.code.clone())
            .unwrap_or_else(|| "generic_decline".to_string());

        let card = error
            .payment_method
            .as_ref()
            .and_then(|method| method.card.clone())
            .unwrap_or_default();

        failed.push(FailedPayment {
            customer: FailedPaymentCustomer {
                id: customer.id,
                email: customer.email.unwrap_or_default(),
                name: customer.name.unwrap_or_default(),
            },
            payment_intent: FailedPaymentIntent {
                created: intent.created,
                description: intent.description.clone().unwrap_or_default(),
                status: "failed".to_string(),
                error: decline,
            },
            payment_method: FailedPaymentMethod {
                last4: card.last4.unwrap_or_default(),
                brand: card.brand.unwrap_or_default(),
            },
        });
    }

    Ok(failed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::{
        CardSummary, ChargeSummary, CustomerInfo, IntentStatus, LastPaymentError, MockProcessor,
        PaymentMethodInfo,
    };

    fn charge(id: &str, captured: i64, transaction: Option<&str>) -> ChargeSummary {
        ChargeSummary {
            id: id.to_string(),
            amount_captured: captured,
            created: 1_700_000_000,
            balance_transaction: transaction.map(str::to_string),
        }
    }

    fn failed_intent(id: &str, customer: &str, created: i64, decline: Option<&str>) -> IntentRecord {
        IntentRecord {
            id: id.to_string(),
            created,
            customer: Some(customer.to_string()),
            description: Some("order".into()),
            status: IntentStatus::RequiresPaymentMethod,
            last_payment_error: Some(LastPaymentError {
                code: Some("card_declined".into()),
                decline_code: decline.map(str::to_string),
                message: Some("declined".into()),
                payment_method: Some(PaymentMethodInfo {
                    id: "pm_x".into(),
                    customer: None,
                    card: Some(CardSummary {
                        brand: Some("visa".into()),
                        last4: Some("4242".into()),
                        exp_month: None,
                        exp_year: None,
                    }),
                }),
            }),
        }
    }

    fn customer(id: &str, deleted: bool) -> CustomerInfo {
        CustomerInfo {
            id: id.to_string(),
            email: Some(format!("{id}@example.com")),
            name: Some("Jo".into()),
            deleted,
        }
    }

    #[tokio::test]
    async fn test_totals_sum_charges_and_fees_across_pages() {
        let processor = MockProcessor::new()
            .with_charges(vec![
                charge("ch_1", 1000, Some("txn_1")),
                charge("ch_2", 2500, Some("txn_2")),
                charge("ch_3", 400, None),
            ])
            .with_fee("txn_1", 59)
            .with_fee("txn_2", 102)
            .with_page_size(1);

        let totals = payment_totals(&processor, 0).await.unwrap();
        assert_eq!(
            totals,
            PaymentTotals {
                payment_total: 3900,
                fee_total: 161,
                net_total: 3739,
            }
        );

        // page size 1 with three charges means three list calls
        let list_calls = processor
            .calls()
            .iter()
            .filter(|call| call.as_str() == "list_charges")
            .count();
        assert_eq!(list_calls, 3);
    }

    #[tokio::test]
    async fn test_failed_payments_keep_latest_intent_per_customer() {
        let processor = MockProcessor::new()
            .with_intents(vec![
                failed_intent("pi_old", "cus_a", 100, Some("expired_card")),
                failed_intent("pi_new", "cus_a", 200, Some("do_not_honor")),
            ])
            .with_customer(customer("cus_a", false));

        let failed = failed_payments(&processor, 0).await.unwrap();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].payment_intent.error, "do_not_honor");
        assert_eq!(failed[0].payment_method.last4, "4242");
        assert_eq!(failed[0].customer.email, "cus_a@example.com");
    }

    #[tokio::test]
    async fn test_failed_payments_skip_deleted_and_unknown_customers() {
        let processor = MockProcessor::new()
            .with_intents(vec![
                failed_intent("pi_1", "cus_deleted", 100, None),
                failed_intent("pi_2", "cus_gone", 100, None),
            ])
            .with_customer(customer("cus_deleted", true));

        let failed = failed_payments(&processor, 0).await.unwrap();
        assert!(failed.is_empty());
    }

    #[tokio::test]
    async fn test_decline_code_falls_back_to_error_code() {
        let processor = MockProcessor::new()
            .with_intents(vec![failed_intent("pi_1", "cus_a", 100, None)])
            .with_customer(customer("cus_a", false));

        let failed = failed_payments(&processor, 0).await.unwrap();
        assert_eq!(failed[0].payment_intent.error, "card_declined");
    }
}
