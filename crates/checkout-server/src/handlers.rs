//! HTTP Handlers

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
};
use serde::{Deserialize, Serialize};

use checkout_core::{ChargeError, ChargeRequest, CreditLedger, IntentOutcome, money};
use checkout_payments::reporting::{FailedPayment, PaymentTotals};
use checkout_payments::{PaymentError, discount, reporting};

use crate::state::AppState;

// ============================================================================
// Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub webhook_configured: bool,
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Serialize)]
#[serde(untagged)]
pub enum CreateIntentResponse {
    #[serde(rename_all = "camelCase")]
    StoreCredit {
        success: bool,
        paid_with_store_credit: bool,
        amount: i64,
        store_credit_used: i64,
    },
    #[serde(rename_all = "camelCase")]
    Processor { client_secret: String },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreCreditResponse {
    pub customer_id: String,
    pub balance: i64,
    pub formatted: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSheetResponse {
    pub customer_session_client_secret: String,
    pub customer: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientSecretResponse {
    pub client_secret: String,
}

#[derive(Serialize)]
pub struct EphemeralKeyResponse {
    pub secret: String,
}

#[derive(Serialize)]
pub struct ConfigResponse {
    pub key: String,
}

#[derive(Serialize)]
pub struct RefundResponse {
    pub refund: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyDiscountResponse {
    pub valid: bool,
    #[serde(flatten)]
    pub quote: discount::DiscountQuote,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub promotion_code_id: Option<String>,
}

#[derive(Serialize)]
pub struct AvailableDiscountsResponse {
    pub discounts: Vec<DiscountDisplay>,
}

#[derive(Serialize)]
pub struct DiscountDisplay {
    pub code: &'static str,
    pub description: &'static str,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub value: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerRequest {
    pub customer_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EphemeralKeyRequest {
    pub customer_id: String,
    #[serde(default)]
    pub api_version: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundRequest {
    pub payment_intent_id: String,
    pub amount: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyDiscountRequest {
    #[serde(default)]
    pub discount_code: Option<String>,
    #[serde(default = "default_original_amount")]
    pub original_amount: i64,
}

fn default_original_amount() -> i64 {
    6099
}

type ApiError = (StatusCode, Json<ErrorResponse>);
type ApiResult<T> = Result<Json<T>, ApiError>;

// ============================================================================
// Error Mapping
// ============================================================================

fn error_response(status: StatusCode, code: &str, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message: message.into(),
            },
        }),
    )
}

/// Map workflow errors onto the wire taxonomy: validation and processor
/// rejections are 400s (processor messages surfaced verbatim),
/// unavailability is a 502, configuration problems a 500.
fn payment_error_response(error: &PaymentError) -> ApiError {
    match error {
        PaymentError::ProcessorRejected { code, message, .. } => error_response(
            StatusCode::BAD_REQUEST,
            code.as_deref().unwrap_or("processor_rejected"),
            message.clone(),
        ),
        PaymentError::ProcessorUnavailable(message) => error_response(
            StatusCode::BAD_GATEWAY,
            "processor_unavailable",
            message.clone(),
        ),
        PaymentError::Charge(charge_error) => {
            let code = match charge_error {
                ChargeError::InsufficientCredit { .. } => "insufficient_store_credit",
                _ => "invalid_request",
            };
            error_response(StatusCode::BAD_REQUEST, code, charge_error.to_string())
        }
        PaymentError::WebhookSignature(message) => error_response(
            StatusCode::BAD_REQUEST,
            "invalid_signature",
            message.clone(),
        ),
        PaymentError::Config(message) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "configuration_error",
            message.clone(),
        ),
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        webhook_configured: state.webhook.is_some(),
    })
}

/// Run one checkout attempt: reconcile against store credit, then
/// create and confirm an intent for the residual.
pub async fn create_intent(
    State(state): State<AppState>,
    payload: Result<Json<ChargeRequest>, JsonRejection>,
) -> ApiResult<CreateIntentResponse> {
    let Json(request) = payload.map_err(|rejection| {
        error_response(StatusCode::BAD_REQUEST, "invalid_body", rejection.body_text())
    })?;

    match state.router.create_intent(&request).await {
        Ok(IntentOutcome::PaidWithStoreCredit { amount_used }) => {
            Ok(Json(CreateIntentResponse::StoreCredit {
                success: true,
                paid_with_store_credit: true,
                amount: 0,
                store_credit_used: amount_used,
            }))
        }
        Ok(IntentOutcome::RequiresProcessorConfirmation { client_secret }) => {
            Ok(Json(CreateIntentResponse::Processor { client_secret }))
        }
        Ok(IntentOutcome::Failed { reason }) => Err(error_response(
            StatusCode::BAD_REQUEST,
            "payment_failed",
            reason,
        )),
        Err(error) => {
            tracing::error!(error = %error, "Create intent failed");
            Err(payment_error_response(&error))
        }
    }
}

/// Current store-credit balance for a customer
pub async fn store_credit(
    State(state): State<AppState>,
    Path(customer_id): Path<String>,
) -> Json<StoreCreditResponse> {
    let balance = state.ledger.balance(&customer_id);

    Json(StoreCreditResponse {
        formatted: money::format_minor_units(balance, "usd"),
        customer_id,
        balance,
    })
}

/// Provision a guest customer plus a payment-element session
pub async fn payment_sheet(State(state): State<AppState>) -> ApiResult<PaymentSheetResponse> {
    let customer = state
        .processor
        .create_customer("Guest User", "mobile_app")
        .await
        .map_err(|error| {
            tracing::error!(error = %error, "Customer creation failed");
            payment_error_response(&error)
        })?;

    let session = state
        .processor
        .create_customer_session(&customer.id)
        .await
        .map_err(|error| {
            tracing::error!(error = %error, "Customer session creation failed");
            payment_error_response(&error)
        })?;

    Ok(Json(PaymentSheetResponse {
        customer_session_client_secret: session.client_secret,
        customer: customer.id,
    }))
}

/// Create a setup intent for saving a card outside a charge
pub async fn create_setup_intent(
    State(state): State<AppState>,
    Json(payload): Json<CustomerRequest>,
) -> ApiResult<ClientSecretResponse> {
    let setup_intent = state
        .processor
        .create_setup_intent(&payload.customer_id)
        .await
        .map_err(|error| payment_error_response(&error))?;

    let client_secret = setup_intent.client_secret.ok_or_else(|| {
        error_response(
            StatusCode::BAD_GATEWAY,
            "processor_unavailable",
            "Setup intent response missing client secret",
        )
    })?;

    Ok(Json(ClientSecretResponse { client_secret }))
}

/// Create an ephemeral key for legacy mobile SDK flows
pub async fn create_ephemeral_key(
    State(state): State<AppState>,
    Json(payload): Json<EphemeralKeyRequest>,
) -> ApiResult<EphemeralKeyResponse> {
    let key = state
        .processor
        .create_ephemeral_key(&payload.customer_id, payload.api_version.as_deref())
        .await
        .map_err(|error| payment_error_response(&error))?;

    let secret = key.secret.ok_or_else(|| {
        error_response(
            StatusCode::BAD_GATEWAY,
            "processor_unavailable",
            "Ephemeral key response missing secret",
        )
    })?;

    Ok(Json(EphemeralKeyResponse { secret }))
}

/// Publishable key for client SDK initialization
pub async fn get_config(State(state): State<AppState>) -> Json<ConfigResponse> {
    Json(ConfigResponse {
        key: state.publishable_key.clone(),
    })
}

/// Refund part or all of a payment intent
pub async fn create_refund(
    State(state): State<AppState>,
    Json(payload): Json<RefundRequest>,
) -> ApiResult<RefundResponse> {
    if payload.amount <= 0 {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            "invalid_amount",
            "Refund amount must be positive",
        ));
    }

    let refund = state
        .processor
        .create_refund(&payload.payment_intent_id, payload.amount)
        .await
        .map_err(|error| {
            tracing::error!(error = %error, "Refund failed");
            payment_error_response(&error)
        })?;

    Ok(Json(RefundResponse { refund: refund.id }))
}

/// Quote a discount code against an amount
pub async fn apply_discount(
    State(state): State<AppState>,
    Json(payload): Json<ApplyDiscountRequest>,
) -> ApiResult<ApplyDiscountResponse> {
    let code = payload
        .discount_code
        .filter(|code| !code.trim().is_empty())
        .ok_or_else(|| {
            error_response(
                StatusCode::BAD_REQUEST,
                "missing_discount_code",
                "Discount code is required",
            )
        })?;

    let Some(spec) = discount::find(&code) else {
        return Err(error_response(
            StatusCode::NOT_FOUND,
            "invalid_discount_code",
            "Invalid discount code",
        ));
    };

    let quote = spec.quote(payload.original_amount);
    let promotion_code_id = discount::sync_to_processor(spec, state.processor.as_ref(), "usd").await;

    Ok(Json(ApplyDiscountResponse {
        valid: true,
        quote,
        promotion_code_id,
    }))
}

/// List the recognized discount codes
pub async fn available_discounts() -> Json<AvailableDiscountsResponse> {
    let discounts = discount::all()
        .iter()
        .map(|spec| DiscountDisplay {
            code: spec.code,
            description: spec.description,
            kind: if spec.percent_off.is_some() {
                "percentage"
            } else {
                "fixed"
            },
            value: spec.percent_off.or(spec.amount_off).unwrap_or(0),
        })
        .collect();

    Json(AvailableDiscountsResponse { discounts })
}

/// Captured payment totals over the reporting window
pub async fn payment_totals(State(state): State<AppState>) -> ApiResult<PaymentTotals> {
    reporting::payment_totals(state.processor.as_ref(), reporting::lookback_start())
        .await
        .map(Json)
        .map_err(|error| {
            tracing::error!(error = %error, "Payment totals report failed");
            payment_error_response(&error)
        })
}

/// Customers whose latest payment attempt failed
pub async fn failed_payments(State(state): State<AppState>) -> ApiResult<Vec<FailedPayment>> {
    reporting::failed_payments(state.processor.as_ref(), reporting::lookback_start())
        .await
        .map(Json)
        .map_err(|error| {
            tracing::error!(error = %error, "Failed-payment report failed");
            payment_error_response(&error)
        })
}

/// Processor webhook intake
pub async fn processor_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<StatusCode, ApiError> {
    let Some(webhook) = state.webhook.as_ref() else {
        return Err(error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "webhook_disabled",
            "Webhook intake not configured",
        ));
    };

    let signature = headers
        .get("stripe-signature")
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| {
            error_response(
                StatusCode::BAD_REQUEST,
                "missing_signature",
                "Missing Stripe signature",
            )
        })?;

    let event = webhook.parse_event(&body, signature).map_err(|error| {
        tracing::warn!(error = %error, "Webhook signature failed");
        error_response(StatusCode::BAD_REQUEST, "invalid_signature", "Invalid signature")
    })?;

    webhook.handle(&event);

    Ok(StatusCode::OK)
}
