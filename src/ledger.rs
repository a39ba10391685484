//! In-memory account ledger.
//!
//! Balances live in a single map behind a reader/writer lock. Reads take the
//! shared lock, a batch of deltas takes the exclusive lock for its whole
//! duration, so readers observe either the full pre-batch or the full
//! post-batch state.

use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::warn;

use crate::types::{Account, BalanceDelta, LedgerView};

/// Diagnostic counters for a ledger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedgerStats {
    /// Number of known accounts.
    pub accounts: usize,
    /// Number of `apply_deltas` calls.
    pub batches_applied: u64,
    /// Debits that exceeded the balance and were clamped to zero.
    pub underflow_clamps: u64,
    /// Credits that exceeded `u64::MAX` and were saturated.
    pub overflow_saturations: u64,
}

/// Thread-safe account balance store.
#[derive(Debug, Default)]
pub struct AccountLedger {
    accounts: RwLock<BTreeMap<String, u64>>,
    batches_applied: AtomicU64,
    underflow_clamps: AtomicU64,
    overflow_saturations: AtomicU64,
}

impl AccountLedger {
    /// Creates a ledger seeded with the given accounts.
    ///
    /// A name appearing more than once keeps its last balance.
    pub fn new(initial: impl IntoIterator<Item = Account>) -> Self {
        let accounts = initial
            .into_iter()
            .map(|account| (account.name, account.balance))
            .collect();

        Self {
            accounts: RwLock::new(accounts),
            ..Default::default()
        }
    }

    /// Reads an account; unknown names yield a zero-balance account.
    pub fn read(&self, name: &str) -> Account {
        Account::new(name, self.balance(name))
    }

    /// Applies a batch of deltas as one atomic unit.
    ///
    /// Debits larger than the balance clamp to zero and credits past
    /// `u64::MAX` saturate. Both are counted in [`LedgerStats`] and logged at
    /// warn level.
    pub fn apply_deltas(&self, deltas: &[BalanceDelta]) {
        let mut accounts = self.accounts.write();

        for delta in deltas {
            let current = accounts.get(&delta.account).copied();
            let balance = current.unwrap_or(0);
            let magnitude = delta.change.unsigned_abs();

            let updated = if delta.change >= 0 {
                balance.checked_add(magnitude).unwrap_or_else(|| {
                    self.overflow_saturations.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        account = %delta.account,
                        balance,
                        change = delta.change,
                        "credit overflowed, saturating balance"
                    );
                    u64::MAX
                })
            } else {
                balance.checked_sub(magnitude).unwrap_or_else(|| {
                    self.underflow_clamps.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        account = %delta.account,
                        balance,
                        change = delta.change,
                        "debit exceeds balance, clamping to zero"
                    );
                    0
                })
            };

            // Accounts come into existence on their first non-zero credit.
            if current.is_some() || updated > 0 {
                accounts.insert(delta.account.clone(), updated);
            }
        }

        self.batches_applied.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns an owned copy of every known account, sorted by name.
    pub fn snapshot(&self) -> Vec<Account> {
        self.accounts
            .read()
            .iter()
            .map(|(name, &balance)| Account::new(name.clone(), balance))
            .collect()
    }

    /// Sum of all balances.
    pub fn total_supply(&self) -> u128 {
        self.accounts
            .read()
            .values()
            .map(|&balance| balance as u128)
            .sum()
    }

    /// Number of known accounts.
    pub fn len(&self) -> usize {
        self.accounts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.read().is_empty()
    }

    /// Gets diagnostic counters.
    pub fn stats(&self) -> LedgerStats {
        LedgerStats {
            accounts: self.len(),
            batches_applied: self.batches_applied.load(Ordering::Relaxed),
            underflow_clamps: self.underflow_clamps.load(Ordering::Relaxed),
            overflow_saturations: self.overflow_saturations.load(Ordering::Relaxed),
        }
    }
}

impl LedgerView for AccountLedger {
    fn balance(&self, name: &str) -> u64 {
        self.accounts.read().get(name).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;
    use std::thread;

    fn ledger(accounts: &[(&str, u64)]) -> AccountLedger {
        AccountLedger::new(accounts.iter().map(|&(name, balance)| Account::new(name, balance)))
    }

    #[test]
    fn test_unknown_account_reads_zero() {
        let ledger = ledger(&[("A", 10)]);

        assert_eq!(ledger.read("nobody"), Account::new("nobody", 0));
        // Reading does not create the account.
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_apply_deltas() {
        let ledger = ledger(&[("A", 20), ("B", 30)]);
        ledger.apply_deltas(&[BalanceDelta::new("A", -5), BalanceDelta::new("B", 5)]);

        assert_eq!(
            ledger.snapshot(),
            vec![Account::new("A", 15), Account::new("B", 35)]
        );
        assert_eq!(ledger.stats().batches_applied, 1);
    }

    #[test]
    fn test_underflow_clamps_to_zero() {
        let ledger = ledger(&[("A", 10)]);
        ledger.apply_deltas(&[BalanceDelta::new("A", -50)]);

        assert_eq!(ledger.read("A").balance, 0);
        assert_eq!(ledger.stats().underflow_clamps, 1);
        // The account is still known after dropping to zero.
        assert_eq!(ledger.snapshot(), vec![Account::new("A", 0)]);
    }

    #[test]
    fn test_overflow_saturates() {
        let ledger = ledger(&[("A", u64::MAX - 1)]);
        ledger.apply_deltas(&[BalanceDelta::new("A", 10)]);

        assert_eq!(ledger.read("A").balance, u64::MAX);
        assert_eq!(ledger.stats().overflow_saturations, 1);
    }

    #[test]
    fn test_implicit_creation_on_credit() {
        let ledger = ledger(&[]);
        ledger.apply_deltas(&[BalanceDelta::new("ghost", -3), BalanceDelta::new("Z", 0)]);
        assert!(ledger.is_empty());

        ledger.apply_deltas(&[BalanceDelta::new("Z", 7)]);
        assert_eq!(ledger.snapshot(), vec![Account::new("Z", 7)]);
    }

    #[test]
    fn test_duplicate_initial_accounts_keep_last() {
        let ledger = ledger(&[("A", 1), ("A", 2)]);
        assert_eq!(ledger.read("A").balance, 2);
    }

    #[test]
    fn test_snapshot_is_independent() {
        let ledger = ledger(&[("A", 10)]);
        let before = ledger.snapshot();
        ledger.apply_deltas(&[BalanceDelta::new("A", 5)]);

        assert_eq!(before, vec![Account::new("A", 10)]);
        assert_eq!(ledger.read("A").balance, 15);
    }

    #[test]
    fn test_batches_are_atomic_for_readers() {
        // Every batch moves 1 from A to B, so any consistent view sums to 1000.
        let ledger = Arc::new(ledger(&[("A", 1000), ("B", 0)]));
        let stop = Arc::new(AtomicBool::new(false));

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let ledger = ledger.clone();
                let stop = stop.clone();
                thread::spawn(move || {
                    let mut observed = 0;
                    while !stop.load(Ordering::Acquire) {
                        assert_eq!(ledger.total_supply(), 1000);
                        let snapshot = ledger.snapshot();
                        let sum: u64 = snapshot.iter().map(|a| a.balance).sum();
                        assert_eq!(sum, 1000);
                        observed += 1;
                    }
                    observed
                })
            })
            .collect();

        for _ in 0..1000 {
            ledger.apply_deltas(&[BalanceDelta::new("A", -1), BalanceDelta::new("B", 1)]);
        }
        stop.store(true, Ordering::Release);

        for reader in readers {
            reader.join().expect("reader thread panicked");
        }
        assert_eq!(ledger.read("A").balance, 0);
        assert_eq!(ledger.read("B").balance, 1000);
    }
}
