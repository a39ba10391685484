//! Core types shared by the ledger, the worker pool and the executors.

use std::fmt;
use std::sync::Arc;

use crate::error::TxError;

/// Transaction index in the block (0-based).
pub type TxnIndex = usize;

/// An account balance as seen by callers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Account {
    pub name: String,
    pub balance: u64,
}

impl Account {
    pub fn new(name: impl Into<String>, balance: u64) -> Self {
        Self {
            name: name.into(),
            balance,
        }
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.balance)
    }
}

/// A signed balance change produced by a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceDelta {
    pub account: String,
    pub change: i64,
}

impl BalanceDelta {
    pub fn new(account: impl Into<String>, change: i64) -> Self {
        Self {
            account: account.into(),
            change,
        }
    }

    /// A credit of `amount`, failing if it does not fit a signed delta.
    pub fn credit(account: impl Into<String>, amount: u64) -> Result<Self, TxError> {
        let change = i64::try_from(amount).map_err(|_| TxError::AmountOutOfRange { amount })?;
        Ok(Self::new(account, change))
    }

    /// A debit of `amount`, failing if it does not fit a signed delta.
    pub fn debit(account: impl Into<String>, amount: u64) -> Result<Self, TxError> {
        let change = i64::try_from(amount).map_err(|_| TxError::AmountOutOfRange { amount })?;
        Ok(Self::new(account, -change))
    }
}

/// Read-only access to account balances.
///
/// This is the only capability a [`Transaction`] receives while computing its
/// effects. Names never seen before read as zero.
pub trait LedgerView {
    /// Returns the balance of `name`, or 0 for an unknown account.
    fn balance(&self, name: &str) -> u64;

    /// Returns the account `name`, synthesized with balance 0 if unknown.
    fn account(&self, name: &str) -> Account {
        Account::new(name, self.balance(name))
    }
}

/// A unit of business logic applied to the ledger.
///
/// Implementations must be deterministic functions of the balances they read
/// through the view: the speculative executor relies on this to decide when a
/// result computed against an older state can still be committed.
pub trait Transaction: Send + Sync + fmt::Debug {
    /// Computes the balance deltas this transaction would apply.
    fn compute_effects(&self, view: &dyn LedgerView) -> Result<Vec<BalanceDelta>, TxError>;

    /// Short label used in logs.
    fn kind(&self) -> &'static str {
        "custom"
    }
}

/// An ordered batch of transactions.
#[derive(Debug, Clone, Default)]
pub struct Block {
    pub transactions: Vec<Arc<dyn Transaction>>,
}

impl Block {
    pub fn new(transactions: Vec<Arc<dyn Transaction>>) -> Self {
        Self { transactions }
    }

    /// Appends a transaction to the end of the block.
    pub fn push<T: Transaction + 'static>(&mut self, tx: T) {
        self.transactions.push(Arc::new(tx));
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}

impl<T: Transaction + 'static> FromIterator<T> for Block {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            transactions: iter
                .into_iter()
                .map(|tx| Arc::new(tx) as Arc<dyn Transaction>)
                .collect(),
        }
    }
}

/// Outcome of one transaction inside a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxnStatus {
    /// Effects applied to the ledger.
    Committed,
    /// Computation failed, nothing applied.
    Discarded,
}
