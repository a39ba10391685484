//! Built-in transaction variants.

use crate::error::TxError;
use crate::types::{BalanceDelta, LedgerView, Transaction};

/// Moves `amount` from one account to another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    pub from: String,
    pub to: String,
    pub amount: u64,
}

impl Transfer {
    pub fn new(from: impl Into<String>, to: impl Into<String>, amount: u64) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            amount,
        }
    }
}

impl Transaction for Transfer {
    fn compute_effects(&self, view: &dyn LedgerView) -> Result<Vec<BalanceDelta>, TxError> {
        let balance = view.balance(&self.from);
        if balance < self.amount {
            return Err(TxError::InsufficientFunds {
                account: self.from.clone(),
                balance,
                required: self.amount,
            });
        }

        Ok(vec![
            BalanceDelta::debit(self.from.as_str(), self.amount)?,
            BalanceDelta::credit(self.to.as_str(), self.amount)?,
        ])
    }

    fn kind(&self) -> &'static str {
        "transfer"
    }
}

/// Credits `amount` to an account out of thin air.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mint {
    pub to: String,
    pub amount: u64,
}

impl Mint {
    pub fn new(to: impl Into<String>, amount: u64) -> Self {
        Self {
            to: to.into(),
            amount,
        }
    }
}

impl Transaction for Mint {
    fn compute_effects(&self, _view: &dyn LedgerView) -> Result<Vec<BalanceDelta>, TxError> {
        Ok(vec![BalanceDelta::credit(self.to.as_str(), self.amount)?])
    }

    fn kind(&self) -> &'static str {
        "mint"
    }
}

/// Destroys `amount` held by an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Burn {
    pub from: String,
    pub amount: u64,
}

impl Burn {
    pub fn new(from: impl Into<String>, amount: u64) -> Self {
        Self {
            from: from.into(),
            amount,
        }
    }
}

impl Transaction for Burn {
    fn compute_effects(&self, view: &dyn LedgerView) -> Result<Vec<BalanceDelta>, TxError> {
        let balance = view.balance(&self.from);
        if balance < self.amount {
            return Err(TxError::InsufficientFunds {
                account: self.from.clone(),
                balance,
                required: self.amount,
            });
        }

        Ok(vec![BalanceDelta::debit(self.from.as_str(), self.amount)?])
    }

    fn kind(&self) -> &'static str {
        "burn"
    }
}
