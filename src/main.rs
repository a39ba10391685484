//! CLI for running generated workloads through the block executor.

use block_ledger::{
    AccountLedger, ChainDriver, ExecutionStrategy, ExecutorConfig, Workload, WorkloadConfig,
};
use clap::{Parser, ValueEnum};
use std::process::ExitCode;
use std::time::Instant;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Strategy {
    Pipeline,
    Speculative,
}

impl From<Strategy> for ExecutionStrategy {
    fn from(strategy: Strategy) -> Self {
        match strategy {
            Strategy::Pipeline => ExecutionStrategy::Pipeline,
            Strategy::Speculative => ExecutionStrategy::Speculative,
        }
    }
}

/// Apply a generated chain of blocks to an in-memory ledger.
#[derive(Debug, Parser)]
#[command(name = "block-ledger", version)]
struct Args {
    /// Worker threads per block.
    #[arg(short, long, default_value_t = 4)]
    workers: usize,

    /// Block execution strategy.
    #[arg(short, long, value_enum, default_value_t = Strategy::Pipeline)]
    strategy: Strategy,

    /// Number of accounts in the workload.
    #[arg(long, default_value_t = 1000)]
    accounts: usize,

    /// Number of blocks to apply.
    #[arg(long, default_value_t = 10)]
    blocks: usize,

    /// Transactions in each block.
    #[arg(long, default_value_t = 1000)]
    txs_per_block: usize,

    /// Share of transactions drawn from a small set of hot accounts (0.0..=1.0).
    #[arg(long, default_value_t = 0.0)]
    conflict_factor: f64,

    /// Starting balance of every account.
    #[arg(long, default_value_t = 1_000)]
    initial_balance: u64,

    /// Random seed for workload generation.
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Re-run the chain with a single pipelined worker and compare snapshots.
    #[arg(long)]
    verify_determinism: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "run failed");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    if !(0.0..=1.0).contains(&args.conflict_factor) {
        return Err(format!("conflict factor {} is outside 0.0..=1.0", args.conflict_factor).into());
    }

    let workload = Workload::generate(WorkloadConfig {
        num_accounts: args.accounts,
        num_blocks: args.blocks,
        transactions_per_block: args.txs_per_block,
        conflict_factor: args.conflict_factor,
        initial_balance: args.initial_balance,
        seed: args.seed,
        ..Default::default()
    });
    let config = ExecutorConfig::new(args.workers, args.strategy.into());

    info!(
        accounts = workload.accounts.len(),
        blocks = workload.blocks.len(),
        transactions = workload.total_transactions(),
        workers = config.num_workers,
        strategy = config.strategy.name(),
        "workload generated"
    );

    let driver = ChainDriver::from_config(workload.accounts.clone(), &config)?;
    let start = Instant::now();
    let report = driver.apply(&workload.blocks)?;
    let elapsed = start.elapsed();

    let stats = driver.ledger().stats();
    let supply = driver.ledger().total_supply();
    let snapshot = driver.finish();

    println!(
        "{:12} | {:3} workers | {:6} committed | {:6} discarded | {:6} re-executed | \
         {:8.2} ms | {:8.0} tx/s",
        config.strategy.name(),
        config.num_workers,
        report.committed,
        report.discarded,
        report.reexecuted,
        elapsed.as_secs_f64() * 1000.0,
        workload.total_transactions() as f64 / elapsed.as_secs_f64(),
    );
    println!(
        "{} accounts | supply {} | {} underflow clamps | {} overflow saturations",
        stats.accounts, supply, stats.underflow_clamps, stats.overflow_saturations
    );

    if args.verify_determinism {
        let reference = ChainDriver::new(
            AccountLedger::new(workload.accounts.clone()),
            ExecutorConfig::new(1, ExecutionStrategy::Pipeline).build()?,
        );
        reference.apply(&workload.blocks)?;
        if reference.finish() != snapshot {
            return Err("final state differs from the single-worker pipeline".into());
        }
        println!("determinism check passed");
    }

    Ok(())
}
