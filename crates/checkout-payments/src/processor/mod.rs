//! Processor Integration
//!
//! Abstraction over the payment-processing API, plus the data shapes the
//! gateway actually consumes from it. Response DTOs are deliberately
//! minimal: only the fields a caller reads are modeled.

mod mock;
mod stripe;

pub use mock::MockProcessor;
pub use stripe::StripeGateway;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Future-usage marker for vaulting a payment method after confirmation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FutureUsage {
    OnSession,
    OffSession,
}

impl FutureUsage {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OnSession => "on_session",
            Self::OffSession => "off_session",
        }
    }
}

/// Parameters for a create-and-confirm payment intent call.
///
/// Mirrors the processor's wire arguments; exactly one of
/// `payment_method` / `confirmation_token` is set by the router.
#[derive(Clone, Debug, Default)]
pub struct IntentParams {
    pub amount: i64,
    pub currency: String,
    pub customer: String,
    pub confirm: bool,
    pub return_url: Option<String>,
    pub payment_method: Option<String>,
    pub confirmation_token: Option<String>,
    pub setup_future_usage: Option<FutureUsage>,
    pub off_session: bool,
    pub automatic_payment_methods: bool,
    pub description: Option<String>,
    pub metadata: Vec<(String, String)>,
}

/// Payment intent lifecycle status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentStatus {
    RequiresPaymentMethod,
    RequiresConfirmation,
    RequiresAction,
    Processing,
    RequiresCapture,
    Canceled,
    Succeeded,
    #[serde(other)]
    Unknown,
}

/// Result of creating (and synchronously confirming) an intent.
#[derive(Clone, Debug, Deserialize)]
pub struct IntentSummary {
    pub id: String,
    pub status: IntentStatus,
    pub client_secret: Option<String>,
    pub payment_method: Option<String>,
}

/// A payment intent as returned by list calls, with decline context.
#[derive(Clone, Debug, Deserialize)]
pub struct IntentRecord {
    pub id: String,
    pub created: i64,
    pub customer: Option<String>,
    pub description: Option<String>,
    pub status: IntentStatus,
    pub last_payment_error: Option<LastPaymentError>,
}

/// Decline details attached to a failed intent.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct LastPaymentError {
    pub code: Option<String>,
    pub decline_code: Option<String>,
    pub message: Option<String>,
    pub payment_method: Option<PaymentMethodInfo>,
}

/// The slice of a payment method the gateway reads.
#[derive(Clone, Debug, Deserialize)]
pub struct PaymentMethodInfo {
    pub id: String,
    /// Customer the method is attached to, if any. Unexpanded id.
    pub customer: Option<String>,
    pub card: Option<CardSummary>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CardSummary {
    pub brand: Option<String>,
    pub last4: Option<String>,
    pub exp_month: Option<i64>,
    pub exp_year: Option<i64>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CustomerInfo {
    pub id: String,
    pub email: Option<String>,
    pub name: Option<String>,
    #[serde(default)]
    pub deleted: bool,
}

/// Session credential scoping the payment element to a customer.
#[derive(Clone, Debug, Deserialize)]
pub struct CustomerSession {
    pub client_secret: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct EphemeralKeyInfo {
    pub id: String,
    pub secret: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct SetupIntentSummary {
    pub id: String,
    pub client_secret: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct RefundSummary {
    pub id: String,
    pub amount: i64,
    pub status: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ChargeSummary {
    pub id: String,
    pub amount_captured: i64,
    pub created: i64,
    pub balance_transaction: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct BalanceTransactionInfo {
    pub id: String,
    pub fee: i64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CouponInfo {
    pub id: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct PromotionCodeInfo {
    pub id: String,
    pub code: String,
}

/// One page of a paginated list.
#[derive(Clone, Debug, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub has_more: bool,
}

/// Processor client trait (Strategy pattern)
///
/// One implementation speaks the live REST API; the mock scripts
/// responses for workflow tests.
#[async_trait]
pub trait ProcessorClient: Send + Sync {
    /// Create a customer record.
    async fn create_customer(&self, name: &str, source: &str) -> Result<CustomerInfo>;

    /// Retrieve a customer record.
    async fn retrieve_customer(&self, customer_id: &str) -> Result<CustomerInfo>;

    /// Create a payment-element session credential for a customer.
    async fn create_customer_session(&self, customer_id: &str) -> Result<CustomerSession>;

    /// Create an ephemeral key scoped to a customer (legacy mobile SDKs).
    async fn create_ephemeral_key(
        &self,
        customer_id: &str,
        api_version: Option<&str>,
    ) -> Result<EphemeralKeyInfo>;

    /// Retrieve a payment method.
    async fn retrieve_payment_method(&self, payment_method_id: &str) -> Result<PaymentMethodInfo>;

    /// Attach a payment method to a customer.
    async fn attach_payment_method(
        &self,
        payment_method_id: &str,
        customer_id: &str,
    ) -> Result<PaymentMethodInfo>;

    /// Create (and optionally confirm) a payment intent.
    async fn create_intent(&self, params: IntentParams) -> Result<IntentSummary>;

    /// Create a setup intent for saving a card outside a charge.
    async fn create_setup_intent(&self, customer_id: &str) -> Result<SetupIntentSummary>;

    /// Refund part or all of a payment intent.
    async fn create_refund(&self, payment_intent_id: &str, amount: i64) -> Result<RefundSummary>;

    /// List charges created at or after `created_after` (unix seconds).
    async fn list_charges(
        &self,
        created_after: i64,
        starting_after: Option<&str>,
    ) -> Result<Page<ChargeSummary>>;

    /// List payment intents created at or after `created_after`.
    async fn list_payment_intents(
        &self,
        created_after: i64,
        starting_after: Option<&str>,
    ) -> Result<Page<IntentRecord>>;

    /// Retrieve the balance transaction behind a charge (for fees).
    async fn retrieve_balance_transaction(&self, id: &str) -> Result<BalanceTransactionInfo>;

    /// Create a single-use coupon mirroring a local discount code.
    async fn create_coupon(
        &self,
        code: &str,
        percent_off: Option<i64>,
        amount_off: Option<i64>,
        currency: &str,
    ) -> Result<CouponInfo>;

    /// Create a promotion code for an existing coupon.
    async fn create_promotion_code(&self, coupon_id: &str, code: &str)
    -> Result<PromotionCodeInfo>;
}
