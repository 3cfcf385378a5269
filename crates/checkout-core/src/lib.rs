//! # checkout-core
//!
//! Pure domain logic for the checkout gateway: how a single checkout
//! attempt is split between store credit and the payment processor.
//!
//! ## Flow
//!
//! ```text
//! ┌──────────┐   ChargeRequest    ┌────────────┐   residual > 0   ┌───────────┐
//! │  Client   │──────────────────▶│ Reconciler │─────────────────▶│ Processor │
//! │ (mobile)  │                   │  (pure)    │                  │  confirm  │
//! └──────────┘                    └────────────┘                  └───────────┘
//!                                       │ residual == 0
//!                                       ▼
//!                                 store-credit-only
//!                                 settlement, no
//!                                 processor call
//! ```
//!
//! Nothing in this crate performs I/O. The reconciler is a total
//! function; the ledger is an in-process stand-in behind a trait so a
//! transactional store can replace it without touching the callers.

pub mod charge;
pub mod error;
pub mod ledger;
pub mod money;
pub mod outcome;
pub mod reconcile;

pub use charge::{ChargeRequest, PaymentReference};
pub use error::{ChargeError, Result};
pub use ledger::{CreditLedger, MemoryCreditLedger};
pub use outcome::IntentOutcome;
pub use reconcile::{CreditSplit, reconcile};
