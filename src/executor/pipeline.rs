//! Strict pipeline executor.
//!
//! This is the reference executor: each transaction is dispatched, awaited and
//! committed before the next one is dispatched, so transaction `i` always
//! computes against the state left by `0..i`.

use std::thread;
use tracing::{info, instrument};

use super::{settle, BlockExecutor, BlockReport};
use crate::error::{ExecError, Result};
use crate::ledger::AccountLedger;
use crate::pool::WorkerPool;
use crate::types::Block;

/// Executor that keeps exactly one transaction in flight.
///
/// # Example
///
/// ```
/// use block_ledger::{Account, AccountLedger, Block, BlockExecutor, PipelineExecutor, Transfer};
///
/// let ledger = AccountLedger::new([Account::new("A", 20), Account::new("B", 30)]);
/// let block: Block = [Transfer::new("A", "B", 5)].into_iter().collect();
///
/// let report = PipelineExecutor::new(4).execute_block(&block, &ledger).unwrap();
/// assert_eq!(report.committed, 1);
/// assert_eq!(ledger.read("B").balance, 35);
/// ```
#[derive(Debug, Clone)]
pub struct PipelineExecutor {
    /// Number of worker threads spawned per block.
    pub num_workers: usize,
}

impl PipelineExecutor {
    pub fn new(num_workers: usize) -> Self {
        Self { num_workers }
    }
}

impl BlockExecutor for PipelineExecutor {
    #[instrument(skip_all, fields(txs = block.len(), workers = self.num_workers))]
    fn execute_block(&self, block: &Block, ledger: &AccountLedger) -> Result<BlockReport> {
        let report = thread::scope(|scope| {
            let pool = WorkerPool::spawn(scope, self.num_workers, ledger)?;
            let mut report = BlockReport::default();

            for (index, tx) in block.transactions.iter().enumerate() {
                let outcome = pool.run(index, tx.as_ref())?;
                report.record(settle(ledger, index, tx.as_ref(), outcome.effects));
            }

            Ok::<_, ExecError>(report)
        })?;

        info!(
            committed = report.committed,
            discarded = report.discarded,
            "block executed"
        );
        Ok(report)
    }

    fn name(&self) -> &'static str {
        "pipeline"
    }
}
