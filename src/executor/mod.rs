//! Block execution strategies.
//!
//! This module provides the [`BlockExecutor`] trait and its two
//! implementations. Both compute transaction effects on a [`WorkerPool`] and
//! commit them to the ledger strictly in block order, so the final state is
//! the same for any worker count and either strategy.
//!
//! [`WorkerPool`]: crate::pool::WorkerPool

mod pipeline;
mod speculative;

pub use pipeline::PipelineExecutor;
pub use speculative::SpeculativeExecutor;

use std::num::NonZeroUsize;
use std::thread;
use tracing::debug;

use crate::error::{ExecError, Result, TxError};
use crate::ledger::AccountLedger;
use crate::types::{BalanceDelta, Block, Transaction, TxnIndex, TxnStatus};

/// How a block's transactions are scheduled onto the worker pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionStrategy {
    /// One transaction in flight at a time: dispatch, await, commit, repeat.
    ///
    /// This is the reference behavior. It never uses more than one worker at
    /// once, whatever the pool size.
    #[default]
    Pipeline,

    /// Windows of up to `num_workers` transactions are computed concurrently
    /// against the state before the window, then validated and committed in
    /// order. A result whose reads were overwritten by an earlier commit in
    /// the same window is recomputed against the live ledger.
    Speculative,
}

impl ExecutionStrategy {
    /// Returns true if transactions may be computed ahead of earlier commits.
    pub fn is_speculative(&self) -> bool {
        matches!(self, ExecutionStrategy::Speculative)
    }

    pub fn name(&self) -> &'static str {
        match self {
            ExecutionStrategy::Pipeline => "pipeline",
            ExecutionStrategy::Speculative => "speculative",
        }
    }
}

/// Configuration for block execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutorConfig {
    /// Number of worker threads per block, at least 1.
    pub num_workers: usize,
    pub strategy: ExecutionStrategy,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            num_workers: thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1),
            strategy: ExecutionStrategy::default(),
        }
    }
}

impl ExecutorConfig {
    pub fn new(num_workers: usize, strategy: ExecutionStrategy) -> Self {
        Self {
            num_workers,
            strategy,
        }
    }

    /// Checks that the configuration can drive a worker pool.
    pub fn validate(&self) -> Result<()> {
        if self.num_workers == 0 {
            return Err(ExecError::InvalidWorkerCount(self.num_workers));
        }
        Ok(())
    }

    /// Builds the executor selected by `strategy`.
    pub fn build(&self) -> Result<Box<dyn BlockExecutor>> {
        self.validate()?;
        Ok(match self.strategy {
            ExecutionStrategy::Pipeline => Box::new(PipelineExecutor::new(self.num_workers)),
            ExecutionStrategy::Speculative => {
                Box::new(SpeculativeExecutor::new(self.num_workers))
            }
        })
    }
}

/// Counts of what happened to the transactions of one block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockReport {
    /// Transactions whose effects were applied.
    pub committed: usize,
    /// Transactions whose computation failed and whose effects were dropped.
    pub discarded: usize,
    /// Speculative results that had to be recomputed.
    pub reexecuted: usize,
}

impl BlockReport {
    /// Total number of transactions processed.
    pub fn total(&self) -> usize {
        self.committed + self.discarded
    }

    fn record(&mut self, status: TxnStatus) {
        match status {
            TxnStatus::Committed => self.committed += 1,
            TxnStatus::Discarded => self.discarded += 1,
        }
    }
}

/// Trait for the different block execution strategies.
///
/// # Implementing a New Executor
///
/// ```ignore
/// use block_ledger::{AccountLedger, Block, BlockExecutor, BlockReport, Result};
///
/// pub struct MyExecutor;
///
/// impl BlockExecutor for MyExecutor {
///     fn execute_block(&self, block: &Block, ledger: &AccountLedger) -> Result<BlockReport> {
///         // Compute each transaction, commit in block order.
///         todo!()
///     }
/// }
/// ```
pub trait BlockExecutor {
    /// Executes every transaction of `block` against `ledger`.
    ///
    /// A transaction whose computation fails is discarded without touching
    /// the ledger and the block carries on. An `Err` means the execution
    /// machinery failed; transactions committed before the failure stay
    /// applied.
    fn execute_block(&self, block: &Block, ledger: &AccountLedger) -> Result<BlockReport>;

    /// Returns a human-readable name for this executor.
    fn name(&self) -> &'static str {
        "unknown"
    }
}

/// Commits or discards one computed transaction.
fn settle(
    ledger: &AccountLedger,
    index: TxnIndex,
    tx: &dyn Transaction,
    effects: std::result::Result<Vec<BalanceDelta>, TxError>,
) -> TxnStatus {
    match effects {
        Ok(deltas) => {
            ledger.apply_deltas(&deltas);
            debug!(index, kind = tx.kind(), deltas = deltas.len(), "committed");
            TxnStatus::Committed
        }
        Err(error) => {
            debug!(index, kind = tx.kind(), %error, "discarded");
            TxnStatus::Discarded
        }
    }
}
