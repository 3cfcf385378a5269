//! Stripe REST Gateway
//!
//! Typed client over the processor's form-encoded HTTP API. The
//! operations this gateway depends on (confirmation tokens, customer
//! sessions) postdate the bundled SDK's generated surface, so payment
//! calls speak REST directly; webhook signature verification still goes
//! through the SDK (see `crate::webhook`).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use super::{
    BalanceTransactionInfo, ChargeSummary, CouponInfo, CustomerInfo, CustomerSession,
    EphemeralKeyInfo, IntentParams, IntentRecord, IntentSummary, Page, PaymentMethodInfo,
    ProcessorClient, PromotionCodeInfo, RefundSummary, SetupIntentSummary,
};
use crate::error::{PaymentError, Result};

const API_BASE: &str = "https://api.stripe.com/v1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
const PAGE_LIMIT: &str = "100";

/// Ephemeral keys are pinned to an API version by the mobile SDK.
const EPHEMERAL_KEY_API_VERSION: &str = "2024-11-20.acacia";

/// Stripe REST client
pub struct StripeGateway {
    http: Client,
    secret_key: String,
    api_version: Option<String>,
    base_url: String,
}

impl StripeGateway {
    /// Create a new gateway for a secret key.
    pub fn new(secret_key: impl Into<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| PaymentError::Config(format!("http client: {e}")))?;

        Ok(Self {
            http,
            secret_key: secret_key.into(),
            api_version: None,
            base_url: API_BASE.to_string(),
        })
    }

    /// Create from environment variables.
    pub fn from_env() -> Result<Self> {
        let secret_key = std::env::var("STRIPE_SECRET_KEY")
            .map_err(|_| PaymentError::Config("STRIPE_SECRET_KEY not set".into()))?;

        let gateway = Self::new(secret_key)?;
        Ok(match std::env::var("STRIPE_API_VERSION") {
            Ok(version) => gateway.with_api_version(version),
            Err(_) => gateway,
        })
    }

    /// Pin requests to a specific API version.
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = Some(version.into());
        self
    }

    /// Point the client at a different base URL (stripe-mock and tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.request(self.http.post(format!("{}{path}", self.base_url)))
    }

    fn get_request(&self, path: &str) -> RequestBuilder {
        self.request(self.http.get(format!("{}{path}", self.base_url)))
    }

    fn request(&self, builder: RequestBuilder) -> RequestBuilder {
        let builder = builder.bearer_auth(&self.secret_key);
        match &self.api_version {
            Some(version) => builder.header("Stripe-Version", version.as_str()),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let response = builder
            .send()
            .await
            .map_err(|e| PaymentError::ProcessorUnavailable(e.to_string()))?;
        decode(response).await
    }
}

/// Stripe error envelope: `{"error": {"type", "code", "message", ...}}`.
#[derive(Debug, Default, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    error: ErrorBody,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    code: Option<String>,
    decline_code: Option<String>,
    message: Option<String>,
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if status.is_success() {
        return response
            .json::<T>()
            .await
            .map_err(|e| PaymentError::ProcessorUnavailable(format!("invalid response body: {e}")));
    }

    let body = response.text().await.unwrap_or_default();
    let envelope: ErrorEnvelope = serde_json::from_str(&body).unwrap_or_default();
    let message = envelope
        .error
        .message
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));

    if status.is_server_error() {
        return Err(PaymentError::ProcessorUnavailable(format!(
            "HTTP {}: {message}",
            status.as_u16()
        )));
    }

    Err(PaymentError::ProcessorRejected {
        status: status.as_u16(),
        code: envelope.error.code,
        decline_code: envelope.error.decline_code,
        message,
    })
}

/// Flatten intent params into the processor's bracketed form encoding.
fn intent_form(params: &IntentParams) -> Vec<(String, String)> {
    let mut form = vec![
        ("amount".to_string(), params.amount.to_string()),
        ("currency".to_string(), params.currency.clone()),
        ("customer".to_string(), params.customer.clone()),
        ("confirm".to_string(), params.confirm.to_string()),
    ];

    if let Some(url) = &params.return_url {
        form.push(("return_url".to_string(), url.clone()));
    }
    if let Some(method) = &params.payment_method {
        form.push(("payment_method".to_string(), method.clone()));
    }
    if let Some(token) = &params.confirmation_token {
        form.push(("confirmation_token".to_string(), token.clone()));
    }
    if let Some(usage) = params.setup_future_usage {
        form.push(("setup_future_usage".to_string(), usage.as_str().to_string()));
    }
    if params.off_session {
        form.push(("off_session".to_string(), "true".to_string()));
    }
    if params.automatic_payment_methods {
        form.push((
            "automatic_payment_methods[enabled]".to_string(),
            "true".to_string(),
        ));
    }
    if let Some(description) = &params.description {
        form.push(("description".to_string(), description.clone()));
    }
    for (key, value) in &params.metadata {
        form.push((format!("metadata[{key}]"), value.clone()));
    }

    form
}

fn list_query(created_after: i64, starting_after: Option<&str>) -> Vec<(String, String)> {
    let mut query = vec![
        ("created[gte]".to_string(), created_after.to_string()),
        ("limit".to_string(), PAGE_LIMIT.to_string()),
    ];
    if let Some(cursor) = starting_after {
        query.push(("starting_after".to_string(), cursor.to_string()));
    }
    query
}

#[async_trait]
impl ProcessorClient for StripeGateway {
    async fn create_customer(&self, name: &str, source: &str) -> Result<CustomerInfo> {
        let form = [
            ("name".to_string(), name.to_string()),
            ("metadata[source]".to_string(), source.to_string()),
        ];
        self.send(self.post("/customers").form(&form)).await
    }

    async fn retrieve_customer(&self, customer_id: &str) -> Result<CustomerInfo> {
        self.send(self.get_request(&format!("/customers/{customer_id}")))
            .await
    }

    async fn create_customer_session(&self, customer_id: &str) -> Result<CustomerSession> {
        let element = "components[mobile_payment_element]";
        let form = [
            ("customer".to_string(), customer_id.to_string()),
            (format!("{element}[enabled]"), "true".to_string()),
            (
                format!("{element}[features][payment_method_save]"),
                "enabled".to_string(),
            ),
            (
                format!("{element}[features][payment_method_redisplay]"),
                "enabled".to_string(),
            ),
            (
                format!("{element}[features][payment_method_remove]"),
                "enabled".to_string(),
            ),
        ];
        self.send(self.post("/customer_sessions").form(&form)).await
    }

    async fn create_ephemeral_key(
        &self,
        customer_id: &str,
        api_version: Option<&str>,
    ) -> Result<EphemeralKeyInfo> {
        let form = [("customer".to_string(), customer_id.to_string())];
        let builder = self
            .post("/ephemeral_keys")
            .header(
                "Stripe-Version",
                api_version.unwrap_or(EPHEMERAL_KEY_API_VERSION),
            )
            .form(&form);
        self.send(builder).await
    }

    async fn retrieve_payment_method(&self, payment_method_id: &str) -> Result<PaymentMethodInfo> {
        self.send(self.get_request(&format!("/payment_methods/{payment_method_id}")))
            .await
    }

    async fn attach_payment_method(
        &self,
        payment_method_id: &str,
        customer_id: &str,
    ) -> Result<PaymentMethodInfo> {
        let form = [("customer".to_string(), customer_id.to_string())];
        self.send(
            self.post(&format!("/payment_methods/{payment_method_id}/attach"))
                .form(&form),
        )
        .await
    }

    async fn create_intent(&self, params: IntentParams) -> Result<IntentSummary> {
        self.send(self.post("/payment_intents").form(&intent_form(&params)))
            .await
    }

    async fn create_setup_intent(&self, customer_id: &str) -> Result<SetupIntentSummary> {
        let form = [
            ("customer".to_string(), customer_id.to_string()),
            ("payment_method_types[]".to_string(), "card".to_string()),
        ];
        self.send(self.post("/setup_intents").form(&form)).await
    }

    async fn create_refund(&self, payment_intent_id: &str, amount: i64) -> Result<RefundSummary> {
        let form = [
            ("payment_intent".to_string(), payment_intent_id.to_string()),
            ("amount".to_string(), amount.to_string()),
        ];
        self.send(self.post("/refunds").form(&form)).await
    }

    async fn list_charges(
        &self,
        created_after: i64,
        starting_after: Option<&str>,
    ) -> Result<Page<ChargeSummary>> {
        self.send(
            self.get_request("/charges")
                .query(&list_query(created_after, starting_after)),
        )
        .await
    }

    async fn list_payment_intents(
        &self,
        created_after: i64,
        starting_after: Option<&str>,
    ) -> Result<Page<IntentRecord>> {
        self.send(
            self.get_request("/payment_intents")
                .query(&list_query(created_after, starting_after)),
        )
        .await
    }

    async fn retrieve_balance_transaction(&self, id: &str) -> Result<BalanceTransactionInfo> {
        self.send(self.get_request(&format!("/balance_transactions/{id}")))
            .await
    }

    async fn create_coupon(
        &self,
        code: &str,
        percent_off: Option<i64>,
        amount_off: Option<i64>,
        currency: &str,
    ) -> Result<CouponInfo> {
        let mut form = vec![
            ("duration".to_string(), "once".to_string()),
            ("name".to_string(), code.to_string()),
            ("metadata[code]".to_string(), code.to_string()),
        ];
        if let Some(percent) = percent_off {
            form.push(("percent_off".to_string(), percent.to_string()));
        } else if let Some(amount) = amount_off {
            form.push(("amount_off".to_string(), amount.to_string()));
            form.push(("currency".to_string(), currency.to_string()));
        }
        self.send(self.post("/coupons").form(&form)).await
    }

    async fn create_promotion_code(
        &self,
        coupon_id: &str,
        code: &str,
    ) -> Result<PromotionCodeInfo> {
        let form = [
            ("coupon".to_string(), coupon_id.to_string()),
            ("code".to_string(), code.to_string()),
        ];
        self.send(self.post("/promotion_codes").form(&form)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::FutureUsage;

    #[test]
    fn test_intent_form_for_confirmation_token() {
        let params = IntentParams {
            amount: 4900,
            currency: "usd".into(),
            customer: "cus_1".into(),
            confirm: true,
            confirmation_token: Some("ctoken_x".into()),
            automatic_payment_methods: true,
            setup_future_usage: Some(FutureUsage::OffSession),
            metadata: vec![("total".into(), "9900".into())],
            ..IntentParams::default()
        };

        let form = intent_form(&params);
        assert!(form.contains(&("confirmation_token".to_string(), "ctoken_x".to_string())));
        assert!(form.contains(&(
            "automatic_payment_methods[enabled]".to_string(),
            "true".to_string()
        )));
        assert!(form.contains(&("setup_future_usage".to_string(), "off_session".to_string())));
        assert!(form.contains(&("metadata[total]".to_string(), "9900".to_string())));
        assert!(!form.iter().any(|(k, _)| k == "payment_method"));
        assert!(!form.iter().any(|(k, _)| k == "off_session"));
    }

    #[test]
    fn test_intent_form_for_saved_method() {
        let params = IntentParams {
            amount: 1099,
            currency: "usd".into(),
            customer: "cus_1".into(),
            confirm: true,
            payment_method: Some("pm_x".into()),
            off_session: true,
            ..IntentParams::default()
        };

        let form = intent_form(&params);
        assert!(form.contains(&("payment_method".to_string(), "pm_x".to_string())));
        assert!(form.contains(&("off_session".to_string(), "true".to_string())));
        assert!(!form.iter().any(|(k, _)| k == "confirmation_token"));
    }

    #[test]
    fn test_list_query_cursor() {
        let query = list_query(1_700_000_000, Some("ch_last"));
        assert!(query.contains(&("created[gte]".to_string(), "1700000000".to_string())));
        assert!(query.contains(&("starting_after".to_string(), "ch_last".to_string())));
    }

    #[test]
    fn test_error_envelope_parsing() {
        let body = r#"{"error":{"code":"card_declined","decline_code":"do_not_honor","message":"Your card was declined."}}"#;
        let envelope: ErrorEnvelope = serde_json::from_str(body).unwrap();
        assert_eq!(envelope.error.code.as_deref(), Some("card_declined"));
        assert_eq!(envelope.error.decline_code.as_deref(), Some("do_not_honor"));
    }
}
