//! Checkout Gateway HTTP Server
//!
//! Axum-based gateway in front of the payment processor: reconciles
//! charges against store credit, creates and confirms payment intents,
//! and provisions the session credentials a mobile payment-element
//! client needs.

mod handlers;
mod state;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use checkout_core::MemoryCreditLedger;
use checkout_payments::{IntentRouter, ProcessorClient, StripeGateway, WebhookHandler};

use crate::handlers::{
    apply_discount, available_discounts, create_ephemeral_key, create_intent, create_refund,
    create_setup_intent, failed_payments, get_config, health_check, payment_sheet, payment_totals,
    processor_webhook, store_credit,
};
use crate::state::AppState;

/// Deep link the mobile client registers for redirect-based auth.
const DEFAULT_RETURN_URL: &str = "checkout://stripe-redirect";

/// Seed balance for customers the ledger has not seen, in minor units.
const DEFAULT_SEED_BALANCE: i64 = 5000;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment
    dotenvy::dotenv().ok();

    // Processor credentials are the one hard startup requirement.
    let gateway = StripeGateway::from_env()?;
    tracing::info!("✓ Processor client configured");

    let publishable_key = std::env::var("STRIPE_PUBLISHABLE_KEY").unwrap_or_default();
    if publishable_key.is_empty() {
        tracing::warn!("⚠ STRIPE_PUBLISHABLE_KEY not set - client SDK init will fail");
    }

    let webhook = match std::env::var("STRIPE_WEBHOOK_SECRET") {
        Ok(secret) => {
            tracing::info!("✓ Webhook intake configured");
            Some(Arc::new(WebhookHandler::new(secret)))
        }
        Err(_) => {
            tracing::warn!("⚠ STRIPE_WEBHOOK_SECRET not set - webhook intake disabled");
            None
        }
    };

    let seed_balance = std::env::var("STORE_CREDIT_SEED")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(DEFAULT_SEED_BALANCE);

    let return_url =
        std::env::var("CHECKOUT_RETURN_URL").unwrap_or_else(|_| DEFAULT_RETURN_URL.into());

    // Build application state
    let processor: Arc<dyn ProcessorClient> = Arc::new(gateway);
    let ledger = Arc::new(MemoryCreditLedger::new(seed_balance));
    let router = Arc::new(IntentRouter::new(
        processor.clone(),
        ledger.clone(),
        return_url,
    ));

    let state = AppState {
        processor,
        ledger,
        router,
        webhook,
        publishable_key,
    };

    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build router
    let app = Router::new()
        // Health & config
        .route("/health", get(health_check))
        .route("/config", get(get_config))
        // Checkout workflow
        .route("/create-intent", post(create_intent))
        .route("/store-credit/{customer_id}", get(store_credit))
        // Payment-element provisioning
        .route("/payment-sheet", post(payment_sheet))
        .route("/create-setup-intent", post(create_setup_intent))
        .route("/create-ephemeral-key", post(create_ephemeral_key))
        // Operations
        .route("/refund", post(create_refund))
        .route("/apply-discount", post(apply_discount))
        .route("/available-discounts", get(available_discounts))
        .route("/reporting/payment-totals", get(payment_totals))
        .route("/reporting/failed-payments", get(failed_payments))
        // Processor callbacks
        .route("/webhook", post(processor_webhook))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:4242".into());
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("🛒 checkout gateway running on http://{}", addr);
    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("");
    tracing::info!("Endpoints:");
    tracing::info!("  POST /create-intent        - Reconcile + confirm a charge");
    tracing::info!("  GET  /store-credit/{{id}}    - Store-credit balance");
    tracing::info!("  POST /payment-sheet        - Customer + session credential");
    tracing::info!("  POST /create-setup-intent  - Save a card outside a charge");
    tracing::info!("  POST /create-ephemeral-key - Legacy mobile SDK credential");
    tracing::info!("  POST /refund               - Refund a payment intent");
    tracing::info!("  POST /apply-discount       - Quote a discount code");
    tracing::info!("  GET  /config               - Publishable key");
    tracing::info!("  POST /webhook              - Processor webhook intake");
    tracing::info!("");

    axum::serve(listener, app).await?;

    Ok(())
}
