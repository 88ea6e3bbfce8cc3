//! Property tests
//!
//! - Ledger conservation under arbitrary transfer/mint/burn sequences
//! - Inflation reserve never underflows, for arbitrary supply trajectories
//! - extend_lock never moves the lock end backwards
//! - unlock is refused for every time before the lock end

use primitive_types::U256;
use proptest::prelude::*;
use token_lock_sim_core::{tokens, Address, Ledger, LockAccounting, LockError};

#[derive(Debug, Clone)]
enum LedgerOp {
    Transfer { from: usize, to: usize, amount: u64 },
    Mint { to: usize, amount: u64 },
    Burn { from: usize, amount: u64 },
}

fn ledger_op() -> impl Strategy<Value = LedgerOp> {
    prop_oneof![
        (0..4usize, 0..4usize, 0..2_000u64).prop_map(|(from, to, amount)| LedgerOp::Transfer { from, to, amount }),
        (0..4usize, 0..2_000u64).prop_map(|(to, amount)| LedgerOp::Mint { to, amount }),
        (0..4usize, 0..2_000u64).prop_map(|(from, amount)| LedgerOp::Burn { from, amount }),
    ]
}

fn accounts() -> Vec<Address> {
    ["admin", "a", "b", "c"].iter().map(|s| Address::new(*s)).collect()
}

/// Supply move applied before an unlock: positive mints, negative burns
fn supply_step() -> impl Strategy<Value = i64> {
    -50_000i64..50_000
}

proptest! {
    #[test]
    fn prop_ledger_conserved(ops in prop::collection::vec(ledger_op(), 1..60)) {
        let accounts = accounts();
        let mut ledger = Ledger::new("PLN", accounts[0].clone(), tokens(1_000));

        for op in ops {
            let before = ledger.clone();
            let result = match op {
                LedgerOp::Transfer { from, to, amount } => {
                    ledger.transfer(&accounts[from], &accounts[to], tokens(amount))
                }
                LedgerOp::Mint { to, amount } => {
                    ledger.mint(&accounts[to], tokens(amount));
                    Ok(())
                }
                LedgerOp::Burn { from, amount } => ledger.burn(&accounts[from], tokens(amount)),
            };
            if result.is_err() {
                prop_assert_eq!(&ledger, &before);
            }
            prop_assert!(ledger.is_conserved());
        }
    }

    #[test]
    fn prop_reserve_never_underflows(steps in prop::collection::vec(supply_step(), 1..12)) {
        let admin = Address::new("admin");
        let mut base = Ledger::new("PLN", admin.clone(), tokens(10_000_000));
        let mut locks = LockAccounting::new(base.total_supply());

        let lockers: Vec<Address> = (0..steps.len()).map(|i| Address::new(format!("locker{}", i))).collect();
        for locker in &lockers {
            base.transfer(&admin, locker, tokens(100_000)).unwrap();
            locks.create_lock(&mut base, locker, 0, tokens(100_000)).unwrap();
        }

        for (step, locker) in steps.iter().zip(&lockers) {
            let magnitude = tokens(step.unsigned_abs());
            if *step >= 0 {
                base.mint(&admin, magnitude);
            } else {
                base.burn(&admin, magnitude).unwrap();
            }
            let supply = base.total_supply();
            let outcome = locks.unlock(&mut base, locker, 0).unwrap();

            if supply < outcome.inflation.recorded_supply {
                prop_assert!(outcome.inflation.reserved_after >= outcome.inflation.reserved_before);
            } else {
                prop_assert!(outcome.inflation.reserved_after <= outcome.inflation.reserved_before);
            }
            prop_assert!(outcome.protection <= tokens(100_000));
            prop_assert!(base.is_conserved());
        }
        prop_assert_eq!(locks.derivative().total_supply(), U256::zero());
    }

    #[test]
    fn prop_extend_lock_monotonic(start in 1u64..1_000_000, requests in prop::collection::vec(0u64..2_000_000, 1..20)) {
        let admin = Address::new("admin");
        let mut base = Ledger::new("PLN", admin.clone(), tokens(1));
        let mut locks = LockAccounting::new(base.total_supply());
        locks.create_lock(&mut base, &admin, start, tokens(1)).unwrap();

        for requested in requests {
            let current = locks.lock(&admin).unwrap().lock_end();
            match locks.extend_lock(&admin, requested) {
                Ok(old) => {
                    prop_assert!(requested > current);
                    prop_assert_eq!(old, current);
                }
                Err(err) => {
                    prop_assert!(requested <= current);
                    prop_assert_eq!(err, LockError::LockNotExtended { current, requested });
                }
            }
            prop_assert!(locks.lock(&admin).unwrap().lock_end() >= current);
        }
    }

    #[test]
    fn prop_unlock_gated_by_lock_end(lock_end in 1u64..u64::MAX, offset in 1u64..u64::MAX) {
        let admin = Address::new("admin");
        let mut base = Ledger::new("PLN", admin.clone(), tokens(1));
        let mut locks = LockAccounting::new(base.total_supply());
        locks.create_lock(&mut base, &admin, lock_end, tokens(1)).unwrap();

        let now = lock_end.saturating_sub(offset);
        let err = locks.unlock(&mut base, &admin, now).unwrap_err();

        prop_assert_eq!(err, LockError::LockStillActive { lock_end, now });
        prop_assert!(locks.has_lock(&admin));
        prop_assert_eq!(base.balance_of(&admin), U256::zero());
    }
}
