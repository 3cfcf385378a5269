//! Amount Reconciliation
//!
//! Splits a requested charge between store credit and the processor.

use serde::{Deserialize, Serialize};

/// Result of reconciling a charge against available store credit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditSplit {
    /// Store credit to deduct, in minor units.
    pub credit_applied: i64,

    /// Remaining amount to charge via the processor, in minor units.
    pub residual: i64,
}

impl CreditSplit {
    /// The charge is fully covered by store credit.
    pub const fn fully_covered(&self) -> bool {
        self.residual == 0
    }
}

/// Compute how much of a charge store credit covers.
///
/// Credit is clamped on all three bounds: what exists, what the customer
/// asked to apply, and what the charge needs. Total over all inputs;
/// negative values clamp to zero rather than erroring, though callers
/// validate before invoking. No side effects: the ledger is debited by
/// the caller only once settlement is certain.
#[must_use]
pub fn reconcile(requested_amount: i64, available_credit: i64, requested_credit: i64) -> CreditSplit {
    let credit_applied = requested_credit
        .min(available_credit)
        .min(requested_amount)
        .max(0);

    CreditSplit {
        credit_applied,
        residual: (requested_amount - credit_applied).max(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_credit() {
        // amount=9900, credit=5000, requested=5000 -> 4900 goes to the processor
        let split = reconcile(9900, 5000, 5000);
        assert_eq!(split.credit_applied, 5000);
        assert_eq!(split.residual, 4900);
        assert!(!split.fully_covered());
    }

    #[test]
    fn test_fully_covered() {
        let split = reconcile(3000, 5000, 3000);
        assert_eq!(split.credit_applied, 3000);
        assert_eq!(split.residual, 0);
        assert!(split.fully_covered());
    }

    #[test]
    fn test_zero_requested_credit() {
        let split = reconcile(4200, 5000, 0);
        assert_eq!(split.credit_applied, 0);
        assert_eq!(split.residual, 4200);
    }

    #[test]
    fn test_clamped_to_available() {
        let split = reconcile(9900, 1000, 5000);
        assert_eq!(split.credit_applied, 1000);
        assert_eq!(split.residual, 8900);
    }

    #[test]
    fn test_clamped_to_amount() {
        let split = reconcile(500, 5000, 5000);
        assert_eq!(split.credit_applied, 500);
        assert_eq!(split.residual, 0);
    }

    #[test]
    fn test_negative_inputs_clamp_to_zero() {
        let split = reconcile(1000, -50, -50);
        assert_eq!(split.credit_applied, 0);
        assert_eq!(split.residual, 1000);
    }

    #[test]
    fn test_bounds_hold_over_grid() {
        for amount in [0i64, 1, 99, 5000, 9900] {
            for available in [0i64, 1, 4999, 5000, 20_000] {
                for requested in [0i64, 1, 5000, 9900, 50_000] {
                    let split = reconcile(amount, available, requested);
                    assert!(split.credit_applied <= requested.min(available).min(amount).max(0));
                    assert!(split.residual >= 0);
                    assert_eq!(split.credit_applied + split.residual, amount.max(0));
                    // pure function: identical inputs, identical outputs
                    assert_eq!(split, reconcile(amount, available, requested));
                }
            }
        }
    }
}
