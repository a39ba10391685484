//! Error types for block execution.
//!
//! [`TxError`] is a business failure of a single transaction and is absorbed
//! by the block executor, while [`ExecError`] is a failure of the dispatch and
//! collection machinery and aborts the run.

use thiserror::Error;

use crate::TxnIndex;

/// Result type for executor and chain operations.
pub type Result<T> = std::result::Result<T, ExecError>;

/// Failure of a transaction's own business logic.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TxError {
    /// The debited account does not hold enough funds.
    #[error("insufficient funds in {account}: balance {balance}, required {required}")]
    InsufficientFunds {
        account: String,
        balance: u64,
        required: u64,
    },

    /// The amount cannot be expressed as a signed balance change.
    #[error("amount {amount} is out of range for a balance delta")]
    AmountOutOfRange { amount: u64 },

    /// Any other rejection raised by a custom transaction.
    #[error("transaction rejected: {0}")]
    Rejected(String),
}

/// Failure of the execution machinery itself.
#[derive(Error, Debug)]
pub enum ExecError {
    /// Worker pools need at least one worker.
    #[error("invalid worker count {0}, at least one worker is required")]
    InvalidWorkerCount(usize),

    /// A worker thread could not be started.
    #[error("failed to spawn worker thread: {0}")]
    PoolSpawn(#[from] std::io::Error),

    /// Every worker has exited before the task could be handed off.
    #[error("worker pool closed before transaction {index} was dispatched")]
    DispatchClosed { index: TxnIndex },

    /// The result channel closed while a result was outstanding.
    #[error("worker pool closed while awaiting the result of transaction {index}")]
    ResultsClosed { index: TxnIndex },

    /// A worker returned a result for a transaction other than the awaited one.
    #[error("expected result for transaction {expected}, got {got}")]
    OutOfOrderResult { expected: TxnIndex, got: TxnIndex },

    /// A transaction's computation panicked on a worker.
    #[error("transaction {index} panicked during computation: {message}")]
    TaskPanicked { index: TxnIndex, message: String },

    /// A block failed; blocks before `height` stay applied.
    #[error("block {height} failed: {source}")]
    Block {
        height: usize,
        #[source]
        source: Box<ExecError>,
    },
}

impl ExecError {
    /// Wraps this error with the height of the block that produced it.
    pub fn at_block(self, height: usize) -> Self {
        ExecError::Block {
            height,
            source: Box::new(self),
        }
    }
}
