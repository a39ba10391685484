//! Deterministic parallel block execution over an account ledger.
//!
//! This crate applies blocks of transactions to a shared balance ledger while
//! distributing the *computation* of each transaction's effects over a worker
//! pool. Commits always happen in block order, so the final state is the same
//! whatever the number of workers.
//!
//! # Architecture
//!
//! - **Ledger**: [`AccountLedger`], a reader/writer locked balance map with
//!   atomic batch commits
//! - **Pool**: [`WorkerPool`], scoped worker threads computing effects
//! - **Executor**: a [`BlockExecutor`] strategy ordering computation and commit
//! - **Chain**: [`ChainDriver`], applying blocks one after another
//!
//! # Quick Start
//!
//! ```
//! use block_ledger::{run_chain, ExecutorConfig, ExecutionStrategy, Workload, WorkloadConfig};
//!
//! let config = WorkloadConfig {
//!     num_accounts: 100,
//!     num_blocks: 4,
//!     transactions_per_block: 50,
//!     conflict_factor: 0.5,
//!     ..Default::default()
//! };
//! let workload = Workload::generate(config);
//!
//! let pipeline = ExecutorConfig::new(1, ExecutionStrategy::Pipeline);
//! let speculative = ExecutorConfig::new(4, ExecutionStrategy::Speculative);
//!
//! let expected = run_chain(&workload.blocks, workload.accounts.clone(), &pipeline).unwrap();
//! let actual = run_chain(&workload.blocks, workload.accounts.clone(), &speculative).unwrap();
//! assert_eq!(expected, actual);
//! ```

pub mod chain;
pub mod error;
pub mod executor;
pub mod ledger;
pub mod pool;
pub mod transaction;
pub mod types;

pub use chain::{run_chain, ChainDriver, ChainReport};
pub use error::{ExecError, Result, TxError};
pub use executor::{
    BlockExecutor, BlockReport, ExecutionStrategy, ExecutorConfig, PipelineExecutor,
    SpeculativeExecutor,
};
pub use ledger::{AccountLedger, LedgerStats};
pub use pool::{ReadSet, RecordingView, TaskOutcome, TaskReply, WorkerPool};
pub use transaction::{Burn, Mint, Transfer};
pub use types::{Account, BalanceDelta, Block, LedgerView, Transaction, TxnIndex, TxnStatus};

use rand::{rngs::StdRng, Rng, SeedableRng};

// ============================================================================
// Workload Configuration & Generation
// ============================================================================

/// Configuration for workload generation.
#[derive(Debug, Clone)]
pub struct WorkloadConfig {
    /// Total number of accounts in the system.
    pub num_accounts: usize,
    /// Number of blocks to generate.
    pub num_blocks: usize,
    /// Number of transactions in each block.
    pub transactions_per_block: usize,
    /// Conflict factor: 0.0 = no conflicts, 1.0 = all transactions touch same accounts.
    pub conflict_factor: f64,
    /// Starting balance of every account.
    pub initial_balance: u64,
    /// Upper bound (inclusive) for generated amounts.
    pub max_amount: u64,
    /// Random seed for reproducibility.
    pub seed: u64,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            num_accounts: 1000,
            num_blocks: 10,
            transactions_per_block: 100,
            conflict_factor: 0.0,
            initial_balance: 1_000,
            max_amount: 100,
            seed: 42,
        }
    }
}

/// A pre-generated set of accounts and blocks.
#[derive(Debug, Clone)]
pub struct Workload {
    /// Initial state of every account.
    pub accounts: Vec<Account>,
    /// Blocks to apply, in order.
    pub blocks: Vec<Block>,
    /// The configuration used to generate this workload.
    pub config: WorkloadConfig,
}

impl Workload {
    /// Generates a new workload from the given configuration.
    ///
    /// Roughly 90% of transactions are transfers, the rest split between
    /// mints and burns. Amounts are drawn up to `max_amount`, so heavily
    /// conflicting workloads produce some failing transfers.
    pub fn generate(config: WorkloadConfig) -> Self {
        let mut rng = StdRng::seed_from_u64(config.seed);
        let num_accounts = config.num_accounts.max(1);

        let accounts: Vec<Account> = (0..num_accounts)
            .map(|i| Account::new(account_name(i), config.initial_balance))
            .collect();

        // Calculate "hot" account range for conflict simulation.
        let hot_account_count = if config.conflict_factor > 0.0 {
            (2.0 + (1.0 - config.conflict_factor) * (num_accounts as f64 - 2.0)).max(2.0) as usize
        } else {
            num_accounts
        }
        .min(num_accounts);

        let blocks = (0..config.num_blocks)
            .map(|_| {
                let mut block = Block::default();
                for _ in 0..config.transactions_per_block {
                    let pool = if rng.gen::<f64>() < config.conflict_factor {
                        hot_account_count
                    } else {
                        num_accounts
                    };
                    let from = rng.gen_range(0..pool);
                    let to = if pool > 1 {
                        (from + rng.gen_range(1..pool)) % pool
                    } else {
                        from
                    };
                    let amount = rng.gen_range(1..=config.max_amount.max(1));

                    match rng.gen_range(0..100) {
                        0..=89 => {
                            block.push(Transfer::new(account_name(from), account_name(to), amount))
                        }
                        90..=94 => block.push(Mint::new(account_name(to), amount)),
                        _ => block.push(Burn::new(account_name(from), amount)),
                    }
                }
                block
            })
            .collect();

        Self {
            accounts,
            blocks,
            config,
        }
    }

    /// Total number of transactions across all blocks.
    pub fn total_transactions(&self) -> usize {
        self.blocks.iter().map(Block::len).sum()
    }
}

fn account_name(index: usize) -> String {
    format!("acct-{index:05}")
}

// ============================================================================
// Tests
// ============================================================================
