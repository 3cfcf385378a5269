//! Store-Credit Ledger
//!
//! Volatile, process-lifetime balances keyed by customer id. A restart
//! resets every balance to the seed value. This is a stand-in for a
//! durable transactional store; the trait is the seam for replacing it
//! without touching the reconciliation logic.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{ChargeError, Result};

/// Storage seam for store-credit balances.
pub trait CreditLedger: Send + Sync {
    /// Current balance in minor units, seeding new customers as needed.
    fn balance(&self, customer_id: &str) -> i64;

    /// Deduct `amount` under a single lock, failing instead of going
    /// negative. Returns the new balance.
    fn debit(&self, customer_id: &str, amount: i64) -> Result<i64>;

    /// Add funds, returning the new balance.
    fn credit(&self, customer_id: &str, amount: i64) -> i64;
}

/// In-memory ledger (for development and demos).
pub struct MemoryCreditLedger {
    balances: RwLock<HashMap<String, i64>>,
    seed_balance: i64,
}

impl Default for MemoryCreditLedger {
    fn default() -> Self {
        Self::new(0)
    }
}

impl MemoryCreditLedger {
    pub fn new(seed_balance: i64) -> Self {
        Self {
            balances: RwLock::new(HashMap::new()),
            seed_balance,
        }
    }
}

impl CreditLedger for MemoryCreditLedger {
    fn balance(&self, customer_id: &str) -> i64 {
        let mut balances = self.balances.write().unwrap();
        *balances
            .entry(customer_id.to_string())
            .or_insert(self.seed_balance)
    }

    fn debit(&self, customer_id: &str, amount: i64) -> Result<i64> {
        let mut balances = self.balances.write().unwrap();
        let balance = balances
            .entry(customer_id.to_string())
            .or_insert(self.seed_balance);

        if *balance < amount {
            return Err(ChargeError::InsufficientCredit {
                needed: amount,
                available: *balance,
            });
        }

        *balance -= amount;
        Ok(*balance)
    }

    fn credit(&self, customer_id: &str, amount: i64) -> i64 {
        let mut balances = self.balances.write().unwrap();
        let balance = balances
            .entry(customer_id.to_string())
            .or_insert(self.seed_balance);
        *balance += amount;
        *balance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_customer_sees_seed_balance() {
        let ledger = MemoryCreditLedger::new(5000);
        assert_eq!(ledger.balance("cus_a"), 5000);
    }

    #[test]
    fn test_debit_and_credit() {
        let ledger = MemoryCreditLedger::new(5000);
        assert_eq!(ledger.debit("cus_a", 3000).unwrap(), 2000);
        assert_eq!(ledger.credit("cus_a", 500), 2500);
        assert_eq!(ledger.balance("cus_a"), 2500);
    }

    #[test]
    fn test_debit_never_goes_negative() {
        let ledger = MemoryCreditLedger::new(100);
        let err = ledger.debit("cus_a", 200).unwrap_err();
        assert_eq!(
            err,
            ChargeError::InsufficientCredit {
                needed: 200,
                available: 100
            }
        );
        // balance untouched by the failed debit
        assert_eq!(ledger.balance("cus_a"), 100);
    }

    #[test]
    fn test_customers_are_independent() {
        let ledger = MemoryCreditLedger::new(1000);
        ledger.debit("cus_a", 1000).unwrap();
        assert_eq!(ledger.balance("cus_b"), 1000);
    }

    #[test]
    fn test_concurrent_debits_cannot_overdraw() {
        use std::sync::Arc;

        let ledger = Arc::new(MemoryCreditLedger::new(1000));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ledger = Arc::clone(&ledger);
                std::thread::spawn(move || ledger.debit("cus_a", 300).is_ok())
            })
            .collect();

        let successes = handles
            .into_iter()
            .filter(|h| h.join().unwrap())
            .count();

        // 1000 / 300 -> at most three debits can win
        assert_eq!(successes, 3);
        assert_eq!(ledger.balance("cus_a"), 100);
    }
}
