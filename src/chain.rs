//! Sequential application of blocks to one ledger.

use tracing::{info, warn};

use crate::error::Result;
use crate::executor::{BlockExecutor, BlockReport, ExecutorConfig};
use crate::ledger::AccountLedger;
use crate::types::{Account, Block};

/// Totals over every block applied by a [`ChainDriver`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChainReport {
    /// Number of blocks fully applied.
    pub blocks: usize,
    pub committed: usize,
    pub discarded: usize,
    pub reexecuted: usize,
}

impl ChainReport {
    fn absorb(&mut self, block: &BlockReport) {
        self.blocks += 1;
        self.committed += block.committed;
        self.discarded += block.discarded;
        self.reexecuted += block.reexecuted;
    }
}

/// Owns a ledger and feeds it blocks one at a time.
pub struct ChainDriver {
    ledger: AccountLedger,
    executor: Box<dyn BlockExecutor>,
}

impl ChainDriver {
    pub fn new(ledger: AccountLedger, executor: Box<dyn BlockExecutor>) -> Self {
        Self { ledger, executor }
    }

    /// Creates a driver over a fresh ledger seeded with `initial`.
    pub fn from_config(
        initial: impl IntoIterator<Item = Account>,
        config: &ExecutorConfig,
    ) -> Result<Self> {
        Ok(Self::new(AccountLedger::new(initial), config.build()?))
    }

    pub fn ledger(&self) -> &AccountLedger {
        &self.ledger
    }

    /// Applies `blocks` in order.
    ///
    /// Stops at the first block whose execution fails. Blocks applied before
    /// it, and the failing block's own commits, stay in the ledger.
    pub fn apply(&self, blocks: &[Block]) -> Result<ChainReport> {
        let mut report = ChainReport::default();

        for (height, block) in blocks.iter().enumerate() {
            let block_report = self
                .executor
                .execute_block(block, &self.ledger)
                .map_err(|err| {
                    warn!(
                        height,
                        executor = self.executor.name(),
                        error = %err,
                        "block failed, aborting chain"
                    );
                    err.at_block(height)
                })?;
            report.absorb(&block_report);
        }

        info!(
            blocks = report.blocks,
            committed = report.committed,
            discarded = report.discarded,
            reexecuted = report.reexecuted,
            accounts = self.ledger.len(),
            "chain applied"
        );
        Ok(report)
    }

    /// Returns the current state of all accounts.
    pub fn snapshot(&self) -> Vec<Account> {
        self.ledger.snapshot()
    }

    /// Consumes the driver, returning the final state of all accounts.
    pub fn finish(self) -> Vec<Account> {
        self.ledger.snapshot()
    }
}

/// Runs `blocks` from `initial` on a fresh ledger and returns the final state.
///
/// # Example
///
/// ```
/// use block_ledger::{run_chain, Account, Block, ExecutorConfig, ExecutionStrategy, Transfer};
///
/// let initial = [Account::new("A", 100), Account::new("B", 100), Account::new("C", 100)];
/// let blocks: Vec<Block> = vec![
///     [Transfer::new("A", "B", 50)].into_iter().collect(),
///     [Transfer::new("B", "C", 30)].into_iter().collect(),
///     [Transfer::new("C", "A", 20)].into_iter().collect(),
/// ];
///
/// let config = ExecutorConfig::new(4, ExecutionStrategy::Pipeline);
/// let state = run_chain(&blocks, initial, &config).unwrap();
///
/// assert_eq!(
///     state,
///     vec![Account::new("A", 70), Account::new("B", 120), Account::new("C", 110)]
/// );
/// ```
pub fn run_chain(
    blocks: &[Block],
    initial: impl IntoIterator<Item = Account>,
    config: &ExecutorConfig,
) -> Result<Vec<Account>> {
    let driver = ChainDriver::from_config(initial, config)?;
    driver.apply(blocks)?;
    Ok(driver.finish())
}
