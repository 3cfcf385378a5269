//! Mock Processor Client
//!
//! Scripted, in-memory stand-in for the live API. Records the sequence
//! of calls so workflow tests can assert ordering (attach before
//! confirm, short-circuits that skip the processor entirely).

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{
    BalanceTransactionInfo, CardSummary, ChargeSummary, CouponInfo, CustomerInfo, CustomerSession,
    EphemeralKeyInfo, IntentParams, IntentRecord, IntentStatus, IntentSummary, Page,
    PaymentMethodInfo, ProcessorClient, PromotionCodeInfo, RefundSummary, SetupIntentSummary,
};
use crate::error::{PaymentError, Result};

/// Mock processor with scripted outcomes
pub struct MockProcessor {
    calls: Mutex<Vec<String>>,
    attached: Mutex<HashMap<String, String>>,
    last_intent: Mutex<Option<IntentParams>>,
    intent_status: IntentStatus,
    decline: Option<(String, String)>,
    fail_attach: bool,
    fail_coupons: bool,
    confirmed_method: Option<String>,
    charges: Vec<ChargeSummary>,
    intents: Vec<IntentRecord>,
    fees: HashMap<String, i64>,
    customers: HashMap<String, CustomerInfo>,
    page_size: usize,
}

impl Default for MockProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProcessor {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            attached: Mutex::new(HashMap::new()),
            last_intent: Mutex::new(None),
            intent_status: IntentStatus::Succeeded,
            decline: None,
            fail_attach: false,
            fail_coupons: false,
            confirmed_method: None,
            charges: Vec::new(),
            intents: Vec::new(),
            fees: HashMap::new(),
            customers: HashMap::new(),
            page_size: usize::MAX,
        }
    }

    /// Confirmations come back in this status (default `Succeeded`).
    pub fn with_intent_status(mut self, status: IntentStatus) -> Self {
        self.intent_status = status;
        self
    }

    /// Confirmations are declined with this code and message.
    pub fn with_decline(
        mut self,
        decline_code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        self.decline = Some((decline_code.into(), message.into()));
        self
    }

    /// Attach calls fail.
    pub fn with_failing_attach(mut self) -> Self {
        self.fail_attach = true;
        self
    }

    /// Coupon creation fails (existing coupon, disabled account, ...).
    pub fn with_failing_coupons(mut self) -> Self {
        self.fail_coupons = true;
        self
    }

    /// The payment method id reported back on a confirmed intent.
    pub fn with_confirmed_method(mut self, payment_method_id: impl Into<String>) -> Self {
        self.confirmed_method = Some(payment_method_id.into());
        self
    }

    /// Pre-attach a payment method to a customer.
    pub fn with_attached(
        mut self,
        payment_method_id: impl Into<String>,
        customer_id: impl Into<String>,
    ) -> Self {
        self.attached
            .get_mut()
            .unwrap()
            .insert(payment_method_id.into(), customer_id.into());
        self
    }

    pub fn with_charges(mut self, charges: Vec<ChargeSummary>) -> Self {
        self.charges = charges;
        self
    }

    pub fn with_intents(mut self, intents: Vec<IntentRecord>) -> Self {
        self.intents = intents;
        self
    }

    pub fn with_fee(mut self, balance_transaction_id: impl Into<String>, fee: i64) -> Self {
        self.fees.insert(balance_transaction_id.into(), fee);
        self
    }

    pub fn with_customer(mut self, customer: CustomerInfo) -> Self {
        self.customers.insert(customer.id.clone(), customer);
        self
    }

    /// Force list calls to paginate with small pages.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Ordered log of calls made so far.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Parameters of the most recent intent creation, if any.
    pub fn last_intent(&self) -> Option<IntentParams> {
        self.last_intent.lock().unwrap().clone()
    }

    /// Customer a payment method is currently attached to.
    pub fn attached_customer(&self, payment_method_id: &str) -> Option<String> {
        self.attached
            .lock()
            .unwrap()
            .get(payment_method_id)
            .cloned()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }
}

fn page_of<T: Clone>(
    items: &[T],
    id_of: impl Fn(&T) -> &str,
    starting_after: Option<&str>,
    page_size: usize,
) -> Page<T> {
    let start = match starting_after {
        Some(cursor) => items
            .iter()
            .position(|item| id_of(item) == cursor)
            .map_or(items.len(), |position| position + 1),
        None => 0,
    };
    let end = start.saturating_add(page_size).min(items.len());

    Page {
        data: items[start..end].to_vec(),
        has_more: end < items.len(),
    }
}

fn rejected(status: u16, code: &str, message: &str) -> PaymentError {
    PaymentError::ProcessorRejected {
        status,
        code: Some(code.to_string()),
        decline_code: None,
        message: message.to_string(),
    }
}

#[async_trait]
impl ProcessorClient for MockProcessor {
    async fn create_customer(&self, name: &str, _source: &str) -> Result<CustomerInfo> {
        self.record("create_customer");
        Ok(CustomerInfo {
            id: "cus_mock".into(),
            email: None,
            name: Some(name.to_string()),
            deleted: false,
        })
    }

    async fn retrieve_customer(&self, customer_id: &str) -> Result<CustomerInfo> {
        self.record(format!("retrieve_customer:{customer_id}"));
        self.customers
            .get(customer_id)
            .cloned()
            .ok_or_else(|| rejected(404, "resource_missing", "No such customer"))
    }

    async fn create_customer_session(&self, customer_id: &str) -> Result<CustomerSession> {
        self.record(format!("create_customer_session:{customer_id}"));
        Ok(CustomerSession {
            client_secret: format!("cuss_secret_{customer_id}"),
        })
    }

    async fn create_ephemeral_key(
        &self,
        customer_id: &str,
        _api_version: Option<&str>,
    ) -> Result<EphemeralKeyInfo> {
        self.record(format!("create_ephemeral_key:{customer_id}"));
        Ok(EphemeralKeyInfo {
            id: "ephkey_mock".into(),
            secret: Some("ek_test_mock".into()),
        })
    }

    async fn retrieve_payment_method(&self, payment_method_id: &str) -> Result<PaymentMethodInfo> {
        self.record(format!("retrieve_payment_method:{payment_method_id}"));
        Ok(PaymentMethodInfo {
            id: payment_method_id.to_string(),
            customer: self.attached_customer(payment_method_id),
            card: Some(CardSummary {
                brand: Some("visa".into()),
                last4: Some("4242".into()),
                exp_month: Some(12),
                exp_year: Some(2030),
            }),
        })
    }

    async fn attach_payment_method(
        &self,
        payment_method_id: &str,
        customer_id: &str,
    ) -> Result<PaymentMethodInfo> {
        self.record(format!("attach:{payment_method_id}:{customer_id}"));

        if self.fail_attach {
            return Err(rejected(
                400,
                "payment_method_unexpected_state",
                "The payment method cannot be attached",
            ));
        }

        self.attached
            .lock()
            .unwrap()
            .insert(payment_method_id.to_string(), customer_id.to_string());

        Ok(PaymentMethodInfo {
            id: payment_method_id.to_string(),
            customer: Some(customer_id.to_string()),
            card: None,
        })
    }

    async fn create_intent(&self, params: IntentParams) -> Result<IntentSummary> {
        self.record(format!("create_intent:{}", params.amount));

        if let Some((decline_code, message)) = &self.decline {
            return Err(PaymentError::ProcessorRejected {
                status: 402,
                code: Some("card_declined".into()),
                decline_code: Some(decline_code.clone()),
                message: message.clone(),
            });
        }

        let payment_method = self
            .confirmed_method
            .clone()
            .or_else(|| params.payment_method.clone());
        *self.last_intent.lock().unwrap() = Some(params);

        Ok(IntentSummary {
            id: "pi_mock_1".into(),
            status: self.intent_status,
            client_secret: Some("pi_mock_1_secret_test".into()),
            payment_method,
        })
    }

    async fn create_setup_intent(&self, customer_id: &str) -> Result<SetupIntentSummary> {
        self.record(format!("create_setup_intent:{customer_id}"));
        Ok(SetupIntentSummary {
            id: "seti_mock".into(),
            client_secret: Some("seti_mock_secret_test".into()),
        })
    }

    async fn create_refund(&self, payment_intent_id: &str, amount: i64) -> Result<RefundSummary> {
        self.record(format!("create_refund:{payment_intent_id}:{amount}"));
        Ok(RefundSummary {
            id: "re_mock".into(),
            amount,
            status: Some("succeeded".into()),
        })
    }

    async fn list_charges(
        &self,
        _created_after: i64,
        starting_after: Option<&str>,
    ) -> Result<Page<ChargeSummary>> {
        self.record("list_charges");
        Ok(page_of(
            &self.charges,
            |charge| charge.id.as_str(),
            starting_after,
            self.page_size,
        ))
    }

    async fn list_payment_intents(
        &self,
        _created_after: i64,
        starting_after: Option<&str>,
    ) -> Result<Page<IntentRecord>> {
        self.record("list_payment_intents");
        Ok(page_of(
            &self.intents,
            |intent| intent.id.as_str(),
            starting_after,
            self.page_size,
        ))
    }

    async fn retrieve_balance_transaction(&self, id: &str) -> Result<BalanceTransactionInfo> {
        self.record(format!("balance_transaction:{id}"));
        Ok(BalanceTransactionInfo {
            id: id.to_string(),
            fee: self.fees.get(id).copied().unwrap_or(0),
        })
    }

    async fn create_coupon(
        &self,
        code: &str,
        _percent_off: Option<i64>,
        _amount_off: Option<i64>,
        _currency: &str,
    ) -> Result<CouponInfo> {
        self.record(format!("create_coupon:{code}"));

        if self.fail_coupons {
            return Err(rejected(400, "coupon_exists", "Coupon already exists"));
        }

        Ok(CouponInfo {
            id: format!("coupon_{code}"),
        })
    }

    async fn create_promotion_code(
        &self,
        coupon_id: &str,
        code: &str,
    ) -> Result<PromotionCodeInfo> {
        self.record(format!("create_promotion_code:{code}"));
        Ok(PromotionCodeInfo {
            id: format!("promo_{coupon_id}"),
            code: code.to_string(),
        })
    }
}
