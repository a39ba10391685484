//! Fixed-size worker pool for computing transaction effects.
//!
//! Workers live inside a [`std::thread::Scope`] for the duration of one block,
//! which lets tasks borrow the block's transactions and the ledger directly.
//! Tasks and results travel over bounded crossbeam channels. Workers only ever
//! read the ledger; committing is left to the executor driving the pool.

use crossbeam::channel::{self, Receiver, Sender};
use std::any::Any;
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, Scope};
use tracing::trace;

use crate::error::{ExecError, Result, TxError};
use crate::ledger::AccountLedger;
use crate::types::{BalanceDelta, LedgerView, Transaction, TxnIndex};

/// Account names observed by one computation.
pub type ReadSet = BTreeSet<String>;

/// A transaction handed to a worker.
struct Task<'env> {
    index: TxnIndex,
    tx: &'env dyn Transaction,
}

/// Result of computing one transaction's effects.
#[derive(Debug)]
pub struct TaskOutcome {
    pub index: TxnIndex,
    pub effects: std::result::Result<Vec<BalanceDelta>, TxError>,
    /// Every account the transaction read while computing.
    pub reads: ReadSet,
}

/// What a worker sends back for one task.
#[derive(Debug)]
pub enum TaskReply {
    /// The computation returned, successfully or with a business failure.
    Computed(TaskOutcome),
    /// The computation panicked.
    Panicked { index: TxnIndex, message: String },
}

impl TaskReply {
    pub fn index(&self) -> TxnIndex {
        match self {
            TaskReply::Computed(outcome) => outcome.index,
            TaskReply::Panicked { index, .. } => *index,
        }
    }

    /// Turns a panic into [`ExecError::TaskPanicked`].
    pub fn into_outcome(self) -> Result<TaskOutcome> {
        match self {
            TaskReply::Computed(outcome) => Ok(outcome),
            TaskReply::Panicked { index, message } => {
                Err(ExecError::TaskPanicked { index, message })
            }
        }
    }
}

/// Ledger view that remembers which accounts were read.
pub struct RecordingView<'a> {
    ledger: &'a AccountLedger,
    reads: RefCell<ReadSet>,
}

impl<'a> RecordingView<'a> {
    pub fn new(ledger: &'a AccountLedger) -> Self {
        Self {
            ledger,
            reads: RefCell::new(ReadSet::new()),
        }
    }

    pub fn into_reads(self) -> ReadSet {
        self.reads.into_inner()
    }
}

impl LedgerView for RecordingView<'_> {
    fn balance(&self, name: &str) -> u64 {
        let mut reads = self.reads.borrow_mut();
        // Only allocate the owned name on first read.
        if !reads.contains(name) {
            reads.insert(name.to_owned());
        }
        self.ledger.balance(name)
    }
}

/// Pool of `size` worker threads bound to one ledger.
pub struct WorkerPool<'env> {
    jobs: Sender<Task<'env>>,
    results: Receiver<TaskReply>,
    size: usize,
}

impl<'env> WorkerPool<'env> {
    /// Spawns `size` workers inside `scope`.
    ///
    /// Dropping the pool closes both channels, which stops the workers; the
    /// scope joins them.
    pub fn spawn<'scope>(
        scope: &'scope Scope<'scope, 'env>,
        size: usize,
        ledger: &'env AccountLedger,
    ) -> Result<Self> {
        if size == 0 {
            return Err(ExecError::InvalidWorkerCount(size));
        }

        let (job_tx, job_rx) = channel::bounded::<Task<'env>>(size);
        let (result_tx, result_rx) = channel::bounded(size);

        for worker_id in 0..size {
            let jobs = job_rx.clone();
            let results = result_tx.clone();
            thread::Builder::new()
                .name(format!("ledger-worker-{worker_id}"))
                .spawn_scoped(scope, move || worker_loop(worker_id, ledger, jobs, results))?;
        }

        Ok(Self {
            jobs: job_tx,
            results: result_rx,
            size,
        })
    }

    /// Number of workers in the pool.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Hands transaction `index` to the next free worker.
    pub fn dispatch(&self, index: TxnIndex, tx: &'env dyn Transaction) -> Result<()> {
        self.jobs
            .send(Task { index, tx })
            .map_err(|_| ExecError::DispatchClosed { index })
    }

    /// Blocks until any outstanding task finishes.
    ///
    /// A panicking task is returned as [`TaskReply::Panicked`]; `Err` means
    /// the pool has gone away, and `awaiting` only labels that error.
    pub fn next_reply(&self, awaiting: TxnIndex) -> Result<TaskReply> {
        self.results
            .recv()
            .map_err(|_| ExecError::ResultsClosed { index: awaiting })
    }

    /// Like [`next_reply`](Self::next_reply), with a panic reported as
    /// [`ExecError::TaskPanicked`].
    pub fn next_result(&self, awaiting: TxnIndex) -> Result<TaskOutcome> {
        self.next_reply(awaiting)?.into_outcome()
    }

    /// Dispatches one transaction and waits for its result.
    ///
    /// Must only be called while no other task is outstanding.
    pub fn run(&self, index: TxnIndex, tx: &'env dyn Transaction) -> Result<TaskOutcome> {
        self.dispatch(index, tx)?;
        let outcome = self.next_result(index)?;
        if outcome.index != index {
            return Err(ExecError::OutOfOrderResult {
                expected: index,
                got: outcome.index,
            });
        }
        Ok(outcome)
    }
}

/// Worker thread main loop.
fn worker_loop(
    worker_id: usize,
    ledger: &AccountLedger,
    jobs: Receiver<Task<'_>>,
    results: Sender<TaskReply>,
) {
    let mut executed = 0usize;

    for Task { index, tx } in jobs.iter() {
        let view = RecordingView::new(ledger);
        let computed = panic::catch_unwind(AssertUnwindSafe(|| tx.compute_effects(&view)));

        let reply = match computed {
            Ok(effects) => TaskReply::Computed(TaskOutcome {
                index,
                effects,
                reads: view.into_reads(),
            }),
            Err(payload) => TaskReply::Panicked {
                index,
                message: panic_message(payload.as_ref()),
            },
        };
        executed += 1;

        if results.send(reply).is_err() {
            // Executor has stopped listening.
            break;
        }
    }

    trace!(worker_id, executed, "worker exiting");
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
