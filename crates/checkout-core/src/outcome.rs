//! Checkout Outcomes
//!
//! Terminal result of a single checkout attempt as seen by the gateway.
//! A `RequiresProcessorConfirmation` outcome hands the client a secret
//! for any additional authentication step; what happens there is
//! reported by the client UI, not by this core.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum IntentOutcome {
    /// The full amount was covered by store credit; the processor was
    /// never contacted.
    PaidWithStoreCredit { amount_used: i64 },

    /// An intent was created and confirmed (or needs a client-side
    /// authentication step); the client continues with this secret.
    RequiresProcessorConfirmation { client_secret: String },

    /// The processor declined the charge.
    Failed { reason: String },
}

impl IntentOutcome {
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }
}
