//! # checkout-payments
//!
//! The processor boundary and checkout workflow for the gateway.
//!
//! ## Pieces
//!
//! - [`ProcessorClient`]: the seam to the payment-processing API. The
//!   live implementation ([`StripeGateway`]) speaks the form-encoded
//!   REST API; [`MockProcessor`] scripts responses for tests.
//! - [`IntentRouter`]: for one checkout attempt, reconciles the charge
//!   against store credit, short-circuits credit-only settlements, and
//!   routes the payment reference to the right confirm-call shape.
//! - [`WebhookHandler`]: signature verification (via the processor
//!   SDK) and event logging.
//! - [`discount`] / [`reporting`]: the operational extras around the
//!   checkout flow, demo discount codes and read-only activity reports.
//!
//! ## Settlement rule
//!
//! Store credit is debited exactly once per attempt, and only when
//! settlement is certain: on the credit-only short-circuit, or when the
//! synchronous confirmation reports success. Charges that still need a
//! client-side authentication step leave the credit untouched.

pub mod discount;
pub mod error;
pub mod processor;
pub mod reporting;
pub mod router;
pub mod webhook;

pub use error::{PaymentError, Result};
pub use processor::{
    FutureUsage, IntentParams, IntentStatus, IntentSummary, MockProcessor, ProcessorClient,
    StripeGateway,
};
pub use router::IntentRouter;
pub use webhook::WebhookHandler;
