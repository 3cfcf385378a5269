//! Application State

use std::sync::Arc;

use checkout_core::MemoryCreditLedger;
use checkout_payments::{IntentRouter, ProcessorClient, WebhookHandler};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Processor boundary (live REST client in production).
    pub processor: Arc<dyn ProcessorClient>,

    /// Store-credit balances, process lifetime only.
    pub ledger: Arc<MemoryCreditLedger>,

    /// Checkout workflow over the processor and the ledger.
    pub router: Arc<IntentRouter>,

    /// Webhook intake (None when no signing secret is configured).
    pub webhook: Option<Arc<WebhookHandler>>,

    /// Publishable key handed to the client SDK.
    pub publishable_key: String,
}
