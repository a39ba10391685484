//! End-to-end chain scenarios through the public API.

use block_ledger::{
    run_chain, Account, AccountLedger, BalanceDelta, Block, BlockExecutor, ExecutionStrategy,
    ExecutorConfig, LedgerView, Transaction, Transfer, TxError,
};

const STRATEGIES: [ExecutionStrategy; 2] =
    [ExecutionStrategy::Pipeline, ExecutionStrategy::Speculative];

fn accounts(entries: &[(&str, u64)]) -> Vec<Account> {
    entries
        .iter()
        .map(|&(name, balance)| Account::new(name, balance))
        .collect()
}

fn block(transfers: &[(&str, &str, u64)]) -> Block {
    transfers
        .iter()
        .map(|&(from, to, amount)| Transfer::new(from, to, amount))
        .collect()
}

#[test]
fn test_order_sensitivity() {
    let initial = accounts(&[("A", 20), ("B", 30), ("C", 40)]);
    let blocks = vec![block(&[("A", "B", 5), ("B", "C", 10), ("B", "C", 30)])];

    for strategy in STRATEGIES {
        for workers in [1, 3] {
            let config = ExecutorConfig::new(workers, strategy);
            let state = run_chain(&blocks, initial.clone(), &config).unwrap();
            assert_eq!(state, accounts(&[("A", 15), ("B", 25), ("C", 50)]));
        }
    }
}

#[test]
fn test_independent_block_accumulation() {
    let initial = accounts(&[("A", 100), ("B", 100), ("C", 100)]);
    let blocks = vec![
        block(&[("A", "B", 50)]),
        block(&[("B", "C", 30)]),
        block(&[("C", "A", 20)]),
    ];

    for strategy in STRATEGIES {
        let state = run_chain(&blocks, initial.clone(), &ExecutorConfig::new(4, strategy)).unwrap();
        assert_eq!(state, accounts(&[("A", 70), ("B", 120), ("C", 110)]));
    }
}

#[test]
fn test_multiple_independent_transfers_repeatable() {
    let initial = accounts(&[
        ("A1", 100),
        ("A2", 100),
        ("A3", 100),
        ("B1", 100),
        ("B2", 100),
        ("B3", 100),
    ]);
    let blocks = vec![block(&[("A1", "B1", 50), ("A2", "B2", 50), ("A3", "B3", 50)])];
    let expected = accounts(&[
        ("A1", 50),
        ("A2", 50),
        ("A3", 50),
        ("B1", 150),
        ("B2", 150),
        ("B3", 150),
    ]);

    let config = ExecutorConfig::new(4, ExecutionStrategy::Pipeline);
    for _ in 0..5 {
        let state = run_chain(&blocks, initial.clone(), &config).unwrap();
        assert_eq!(state, expected);
    }
}

#[test]
fn test_different_worker_counts() {
    let initial = accounts(&[("A", 1000), ("B", 1000), ("C", 1000), ("D", 1000), ("E", 1000)]);
    let blocks = vec![block(&[
        ("A", "B", 100),
        ("C", "D", 200),
        ("B", "E", 50),
        ("D", "A", 75),
        ("E", "C", 25),
    ])];
    let expected = accounts(&[("A", 975), ("B", 1050), ("C", 825), ("D", 1125), ("E", 1025)]);

    for strategy in STRATEGIES {
        for workers in [1, 2, 4, 8, 16] {
            let config = ExecutorConfig::new(workers, strategy);
            let state = run_chain(&blocks, initial.clone(), &config).unwrap();
            assert_eq!(state, expected, "{} with {workers} workers", strategy.name());
        }
    }
}

#[test]
fn test_credit_creates_account() {
    let initial = accounts(&[("A", 10)]);
    let blocks = vec![block(&[("A", "new", 4)])];

    let config = ExecutorConfig::new(2, ExecutionStrategy::Pipeline);
    let state = run_chain(&blocks, initial, &config).unwrap();
    assert_eq!(state, accounts(&[("A", 6), ("new", 4)]));
}

/// Debits more than the account holds without checking, exercising the clamp.
#[derive(Debug)]
struct Overdraw {
    account: &'static str,
    amount: i64,
}

impl Transaction for Overdraw {
    fn compute_effects(&self, _view: &dyn LedgerView) -> Result<Vec<BalanceDelta>, TxError> {
        Ok(vec![BalanceDelta::new(self.account, -self.amount)])
    }
}

#[test]
fn test_underflow_clamp_is_counted() {
    for strategy in STRATEGIES {
        let ledger = AccountLedger::new(accounts(&[("A", 10)]));
        let mut block = Block::default();
        block.push(Overdraw {
            account: "A",
            amount: 50,
        });

        let executor = ExecutorConfig::new(2, strategy).build().unwrap();
        executor.execute_block(&block, &ledger).unwrap();

        assert_eq!(ledger.read("A").balance, 0);
        assert_eq!(ledger.stats().underflow_clamps, 1);
    }
}
