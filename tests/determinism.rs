//! Property-based tests for execution determinism.
//!
//! These tests use proptest to verify that the final ledger state does not
//! depend on the worker count or on the execution strategy.

use block_ledger::{
    run_chain, Account, Block, Burn, ExecutionStrategy, ExecutorConfig, Mint, Transfer, Workload,
    WorkloadConfig,
};
use proptest::prelude::*;

const NAMES: [&str; 5] = ["A", "B", "C", "D", "E"];

#[derive(Debug, Clone)]
enum Op {
    Transfer(usize, usize, u64),
    Mint(usize, u64),
    Burn(usize, u64),
}

/// Strategy for generating operations over a small, heavily shared account set.
fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        6 => (0..NAMES.len(), 0..NAMES.len(), 0u64..150)
            .prop_map(|(f, t, a)| Op::Transfer(f, t, a)),
        1 => (0..NAMES.len(), 0u64..150).prop_map(|(t, a)| Op::Mint(t, a)),
        1 => (0..NAMES.len(), 0u64..150).prop_map(|(f, a)| Op::Burn(f, a)),
    ]
}

fn blocks_strategy() -> impl Strategy<Value = Vec<Vec<Op>>> {
    prop::collection::vec(prop::collection::vec(op_strategy(), 0..24), 1..5)
}

fn initial_strategy() -> impl Strategy<Value = Vec<u64>> {
    prop::collection::vec(0u64..200, NAMES.len())
}

fn build_blocks(ops: &[Vec<Op>]) -> Vec<Block> {
    ops.iter()
        .map(|block_ops| {
            let mut block = Block::default();
            for op in block_ops {
                match *op {
                    Op::Transfer(f, t, a) => block.push(Transfer::new(NAMES[f], NAMES[t], a)),
                    Op::Mint(t, a) => block.push(Mint::new(NAMES[t], a)),
                    Op::Burn(f, a) => block.push(Burn::new(NAMES[f], a)),
                }
            }
            block
        })
        .collect()
}

fn initial_accounts(balances: &[u64]) -> Vec<Account> {
    NAMES
        .iter()
        .zip(balances)
        .map(|(name, &balance)| Account::new(*name, balance))
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_worker_count_does_not_change_state(
        ops in blocks_strategy(),
        balances in initial_strategy(),
        workers in 2usize..9,
    ) {
        let blocks = build_blocks(&ops);
        let initial = initial_accounts(&balances);

        let reference = run_chain(
            &blocks,
            initial.clone(),
            &ExecutorConfig::new(1, ExecutionStrategy::Pipeline),
        ).unwrap();

        for strategy in [ExecutionStrategy::Pipeline, ExecutionStrategy::Speculative] {
            let config = ExecutorConfig::new(workers, strategy);
            let state = run_chain(&blocks, initial.clone(), &config).unwrap();
            prop_assert_eq!(&state, &reference);
        }
    }

    #[test]
    fn prop_transfers_conserve_supply(
        transfers in prop::collection::vec((0..NAMES.len(), 0..NAMES.len(), 0u64..150), 0..40),
        balances in initial_strategy(),
    ) {
        let block: Block = transfers
            .iter()
            .map(|&(f, t, a)| Transfer::new(NAMES[f], NAMES[t], a))
            .collect();
        let initial = initial_accounts(&balances);
        let supply: u64 = balances.iter().sum();

        let state = run_chain(
            &[block],
            initial,
            &ExecutorConfig::new(4, ExecutionStrategy::Speculative),
        ).unwrap();

        prop_assert_eq!(state.iter().map(|a| a.balance).sum::<u64>(), supply);
    }
}

#[test]
fn test_generated_workload_is_deterministic() {
    let workload = Workload::generate(WorkloadConfig {
        num_accounts: 50,
        num_blocks: 5,
        transactions_per_block: 200,
        conflict_factor: 0.75,
        ..Default::default()
    });

    let reference = run_chain(
        &workload.blocks,
        workload.accounts.clone(),
        &ExecutorConfig::new(1, ExecutionStrategy::Pipeline),
    )
    .unwrap();

    for workers in [2, 4, 8] {
        for strategy in [ExecutionStrategy::Pipeline, ExecutionStrategy::Speculative] {
            let state = run_chain(
                &workload.blocks,
                workload.accounts.clone(),
                &ExecutorConfig::new(workers, strategy),
            )
            .unwrap();
            assert_eq!(state, reference, "{} with {workers} workers", strategy.name());
        }
    }
}
