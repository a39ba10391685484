//! Speculative windowed executor.
//!
//! Transactions are computed in windows of up to `num_workers` consecutive
//! indices. Every transaction in a window reads the ledger as it stood before
//! the window, because nothing is committed until all of the window's results
//! are in. Results are then validated and committed in index order:
//!
//! 1. The worker records every account a transaction read.
//! 2. Committing a transaction marks the accounts it wrote as dirty.
//! 3. A later result in the same window that read a dirty account is stale;
//!    it is recomputed against the live ledger before being settled.
//! 4. A computation that panicked is treated like a stale one: the panic may
//!    come from a pre-window balance the pipeline would never have shown it.
//!    Only a panic on the recompute, which sees exactly the pipeline's state,
//!    aborts the block.
//!
//! Since a transaction's effects depend only on the balances it reads, a
//! result whose reads are all clean equals what the pipeline executor would
//! have computed, and the final state matches it exactly.

use std::collections::HashSet;
use std::thread;
use tracing::{debug, info, instrument};

use super::{settle, BlockExecutor, BlockReport};
use crate::error::{ExecError, Result};
use crate::ledger::AccountLedger;
use crate::pool::{TaskReply, WorkerPool};
use crate::types::{Block, TxnIndex};

/// Executor that computes several transactions ahead of their commits.
#[derive(Debug, Clone)]
pub struct SpeculativeExecutor {
    /// Number of worker threads spawned per block; also the window size.
    pub num_workers: usize,
}

impl SpeculativeExecutor {
    pub fn new(num_workers: usize) -> Self {
        Self { num_workers }
    }

    /// Computes the window `start..end` concurrently, returned in index order.
    fn compute_window<'env>(
        pool: &WorkerPool<'env>,
        block: &'env Block,
        start: TxnIndex,
        end: TxnIndex,
    ) -> Result<Vec<TaskReply>> {
        for index in start..end {
            pool.dispatch(index, block.transactions[index].as_ref())?;
        }

        let mut slots: Vec<Option<TaskReply>> = (start..end).map(|_| None).collect();
        for _ in start..end {
            let reply = pool.next_reply(start)?;
            let got = reply.index();
            let slot = got
                .checked_sub(start)
                .and_then(|offset| slots.get_mut(offset))
                .filter(|slot| slot.is_none())
                .ok_or(ExecError::OutOfOrderResult {
                    expected: start,
                    got,
                })?;
            *slot = Some(reply);
        }

        slots
            .into_iter()
            .enumerate()
            .map(|(offset, slot)| {
                slot.ok_or(ExecError::ResultsClosed {
                    index: start + offset,
                })
            })
            .collect()
    }
}

impl BlockExecutor for SpeculativeExecutor {
    #[instrument(skip_all, fields(txs = block.len(), workers = self.num_workers))]
    fn execute_block(&self, block: &Block, ledger: &AccountLedger) -> Result<BlockReport> {
        let report = thread::scope(|scope| {
            let pool = WorkerPool::spawn(scope, self.num_workers, ledger)?;
            let mut report = BlockReport::default();
            let mut start = 0;

            while start < block.len() {
                let end = (start + pool.size()).min(block.len());
                let window = Self::compute_window(&pool, block, start, end)?;
                let mut written: HashSet<String> = HashSet::new();

                for (offset, reply) in window.into_iter().enumerate() {
                    let index = start + offset;
                    let tx = block.transactions[index].as_ref();

                    let outcome = match reply {
                        TaskReply::Computed(outcome)
                            if !outcome.reads.iter().any(|name| written.contains(name)) =>
                        {
                            outcome
                        }
                        TaskReply::Computed(_) => {
                            debug!(index, "stale speculative result, recomputing");
                            report.reexecuted += 1;
                            pool.run(index, tx)?
                        }
                        TaskReply::Panicked { message, .. } => {
                            debug!(index, %message, "speculative panic, recomputing");
                            report.reexecuted += 1;
                            pool.run(index, tx)?
                        }
                    };

                    if let Ok(deltas) = &outcome.effects {
                        written.extend(deltas.iter().map(|delta| delta.account.clone()));
                    }
                    report.record(settle(ledger, index, tx, outcome.effects));
                }

                start = end;
            }

            Ok::<_, ExecError>(report)
        })?;

        info!(
            committed = report.committed,
            discarded = report.discarded,
            reexecuted = report.reexecuted,
            "block executed"
        );
        Ok(report)
    }

    fn name(&self) -> &'static str {
        "speculative"
    }
}
