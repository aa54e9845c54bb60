//! # Replay Protection Integration Tests
//!
//! Queue independence, out-of-order consumption, execution-failure
//! rollback, and snapshot durability across engine restarts.

#[cfg(test)]
mod tests {
    use crate::integration::support::*;
    use mandate_engine::{
        BatchResult, DenyReason, Environment, InvocationApi, ReplayTracker,
    };
    use shared_types::U256;

    fn env() -> Environment {
        Environment::default()
    }

    #[test]
    fn test_queues_are_independent() {
        let root = key(1);
        let mut executor = engine(root.address());
        fund(&mut executor, &root, 100);

        // The same nonce is a distinct slot in every queue.
        for queue in [1, 2, 3] {
            let batch = single_batch(&executor, &root, withdraw(10), vec![], queue, 7);
            let result = executor.submit(&batch, &env());
            assert!(
                matches!(result, BatchResult::AllSucceeded(_)),
                "queue {} denied: {:?}",
                queue,
                result
            );
        }

        assert_eq!(
            executor.gateway().balance_of(&root.address()),
            U256::from(70u64)
        );
    }

    #[test]
    fn test_out_of_order_nonces_within_queue() {
        let root = key(1);
        let mut executor = engine(root.address());
        fund(&mut executor, &root, 100);

        for nonce in [5, 2, 9] {
            let batch = single_batch(&executor, &root, withdraw(10), vec![], 0, nonce);
            let result = executor.submit(&batch, &env());
            assert!(matches!(result, BatchResult::AllSucceeded(_)));
        }

        // Exact repeats are denied; the gap at nonce 3 is still open.
        let repeat = single_batch(&executor, &root, withdraw(10), vec![], 0, 5);
        assert_eq!(
            executor.submit(&repeat, &env()),
            BatchResult::Failed {
                index: 0,
                reason: DenyReason::AlreadyConsumed { queue: 0, nonce: 5 },
            }
        );

        let gap = single_batch(&executor, &root, withdraw(10), vec![], 0, 3);
        assert!(matches!(
            executor.submit(&gap, &env()),
            BatchResult::AllSucceeded(_)
        ));
    }

    #[test]
    fn test_failed_execution_releases_replay_slot() {
        let root = key(1);
        let mut executor = engine(root.address());

        // Withdrawal against an empty balance fails at execution, after
        // the replay slot was selected.
        let batch = single_batch(&executor, &root, withdraw(50), vec![], 0, 1);
        match executor.submit(&batch, &env()) {
            BatchResult::Failed {
                index: 0,
                reason: DenyReason::ExecutionFailed { reason },
            } => assert!(reason.contains("insufficient balance")),
            other => panic!("expected execution failure, got {:?}", other),
        }

        // The slot must not be left consumed: fund and replay the very
        // same signed batch.
        fund(&mut executor, &root, 100);
        let result = executor.submit(&batch, &env());
        assert!(matches!(result, BatchResult::AllSucceeded(_)));
        assert_eq!(
            executor.gateway().balance_of(&root.address()),
            U256::from(50u64)
        );
    }

    #[test]
    fn test_snapshot_survives_restart() {
        let root = key(1);
        let mut executor = engine(root.address());
        fund(&mut executor, &root, 100);

        let batch = single_batch(&executor, &root, withdraw(10), vec![], 0, 1);
        assert!(matches!(
            executor.submit(&batch, &env()),
            BatchResult::AllSucceeded(_)
        ));

        // Persist replay state, restart the engine, restore.
        let snapshot = executor.replay().serialize();
        let mut restarted = engine(root.address());
        fund(&mut restarted, &root, 100);
        restarted.restore_replay(ReplayTracker::deserialize(&snapshot).unwrap());

        // The consumed slot stays consumed across the restart.
        assert_eq!(
            restarted.submit(&batch, &env()),
            BatchResult::Failed {
                index: 0,
                reason: DenyReason::AlreadyConsumed { queue: 0, nonce: 1 },
            }
        );

        // Unconsumed slots remain open.
        let fresh = single_batch(&restarted, &root, withdraw(10), vec![], 0, 2);
        assert!(matches!(
            restarted.submit(&fresh, &env()),
            BatchResult::AllSucceeded(_)
        ));
    }

    #[test]
    fn test_duplicate_slot_within_one_batch() {
        let root = key(1);
        let mut executor = engine(root.address());
        fund(&mut executor, &root, 100);

        // Two invocations in one batch claiming the same (queue, nonce)
        // slot: the second is an exact repeat.
        let invocations = vec![
            (withdraw(10), 0, 1),
            (withdraw(10), 0, 1),
        ];
        let invocations = invocations
            .into_iter()
            .map(|(action, queue, nonce)| shared_types::Invocation {
                action,
                authority: vec![],
                replay_protection: shared_types::ReplayProtection { nonce, queue },
            })
            .collect();
        let batch = executor.codec().sign_batch(invocations, &root).unwrap();

        assert_eq!(
            executor.submit(&batch, &env()),
            BatchResult::Failed {
                index: 1,
                reason: DenyReason::AlreadyConsumed { queue: 0, nonce: 1 },
            }
        );

        // Atomic mode: the first invocation was rolled back with the
        // batch, so its slot is open again.
        assert_eq!(
            executor.gateway().balance_of(&root.address()),
            U256::from(100u64)
        );
        let single = single_batch(&executor, &root, withdraw(10), vec![], 0, 1);
        assert!(matches!(
            executor.submit(&single, &env()),
            BatchResult::AllSucceeded(_)
        ));
    }
}
