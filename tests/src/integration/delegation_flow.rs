//! # Delegation Flow Integration Tests
//!
//! End-to-end flows through issuance, chain validation, and execution:
//! root invocations, single and chained delegations, height-locked
//! re-delegation, and the precise denial taxonomy for broken input.

#[cfg(test)]
mod tests {
    use crate::integration::support::*;
    use mandate_engine::{
        BatchResult, DenyReason, Environment, InvocationApi, NotBeforeHeightEnforcer,
    };
    use shared_types::{Caveat, U256};

    fn at_height(height: u64) -> Environment {
        Environment { height }
    }

    #[test]
    fn test_root_holder_invokes_directly() {
        let root = key(1);
        let mut executor = engine(root.address());

        // Empty authority chain: the invoker acts on native authority.
        let batch = single_batch(&executor, &root, deposit(100), vec![], 0, 1);
        let result = executor.submit(&batch, &at_height(0));
        assert!(matches!(result, BatchResult::AllSucceeded(_)));

        let batch = single_batch(&executor, &root, withdraw(40), vec![], 0, 2);
        let result = executor.submit(&batch, &at_height(0));
        assert!(matches!(result, BatchResult::AllSucceeded(_)));

        assert_eq!(
            executor.gateway().balance_of(&root.address()),
            U256::from(60u64)
        );
    }

    #[test]
    fn test_delegated_invocation_acts_as_root() {
        let root = key(1);
        let alice = key(2);
        let mut executor = engine(root.address());
        fund(&mut executor, &root, 100);

        // Root delegates to Alice; Alice's invocation moves ROOT's funds.
        let delegation = root_delegation(&executor, &root, alice.address());
        let batch = single_batch(
            &executor,
            &alice,
            transfer(alice.address(), 30),
            vec![delegation],
            0,
            1,
        );

        let result = executor.submit(&batch, &at_height(0));
        assert!(matches!(result, BatchResult::AllSucceeded(_)));
        assert_eq!(
            executor.gateway().balance_of(&root.address()),
            U256::from(70u64)
        );
        assert_eq!(
            executor.gateway().balance_of(&alice.address()),
            U256::from(30u64)
        );
    }

    /// Full lifecycle of a height-locked re-delegation: root -> A
    /// unconditionally, A -> B locked until height 50; B's invocation is
    /// denied early, allowed late, replay-protected, and repeatable under a
    /// fresh nonce.
    #[test]
    fn test_time_locked_redelegation_lifecycle() {
        init_tracing();

        let root = key(1);
        let a = key(2);
        let b = key(3);
        let mut executor = engine(root.address());
        fund(&mut executor, &root, 100);

        let first = root_delegation(&executor, &root, a.address());
        let second = extend_chain(
            &executor,
            &first,
            &a,
            b.address(),
            vec![Caveat {
                enforcer: HEIGHT_ENFORCER,
                terms: NotBeforeHeightEnforcer::terms(50),
            }],
            2,
        );
        let chain = vec![first, second];

        let locked = single_batch(
            &executor,
            &b,
            transfer(b.address(), 50),
            chain.clone(),
            0,
            1,
        );

        // Height 10: the second link's caveat gates the whole chain.
        assert_eq!(
            executor.submit(&locked, &at_height(10)),
            BatchResult::Failed {
                index: 0,
                reason: DenyReason::CaveatRejected {
                    delegation: 1,
                    caveat: 0,
                    reason: "usable from height 50, current height 10".to_string(),
                },
            }
        );
        assert_eq!(
            executor.gateway().balance_of(&root.address()),
            U256::from(100u64)
        );

        // Height 60: the identical invocation executes exactly once.
        let result = executor.submit(&locked, &at_height(60));
        assert!(matches!(result, BatchResult::AllSucceeded(_)));
        assert_eq!(
            executor.gateway().balance_of(&b.address()),
            U256::from(50u64)
        );

        // Replaying the consumed (queue 0, nonce 1) slot is denied.
        assert_eq!(
            executor.submit(&locked, &at_height(60)),
            BatchResult::Failed {
                index: 0,
                reason: DenyReason::AlreadyConsumed { queue: 0, nonce: 1 },
            }
        );

        // A fresh nonce in the same queue proceeds.
        let fresh = single_batch(&executor, &b, transfer(b.address(), 10), chain, 0, 2);
        let result = executor.submit(&fresh, &at_height(60));
        assert!(matches!(result, BatchResult::AllSucceeded(_)));
        assert_eq!(
            executor.gateway().balance_of(&b.address()),
            U256::from(60u64)
        );
    }

    #[test]
    fn test_chain_signed_for_other_deployment_rejected() {
        let root = key(1);
        let a = key(2);
        let b = key(3);

        // Issue the chain against a deployment with the same keys and
        // resource address but another chain id.
        let mut foreign_domain = domain();
        foreign_domain.chain_id = 777;
        let foreign = mandate_engine::InvocationExecutor::new(
            foreign_domain,
            mandate_engine::EnforcerRegistry::new(),
            mandate_ledger::TokenLedger::new(LEDGER_ADDRESS, root.address()),
        );
        let first = root_delegation(&foreign, &root, a.address());
        let second = extend_chain(&foreign, &first, &a, b.address(), vec![], 2);

        // Submit to the home deployment: digests differ, linkage breaks.
        let mut home = engine(root.address());
        fund(&mut home, &root, 100);
        let batch = single_batch(
            &home,
            &b,
            transfer(b.address(), 10),
            vec![first, second],
            0,
            1,
        );

        assert_eq!(
            home.submit(&batch, &at_height(0)),
            BatchResult::Failed {
                index: 0,
                reason: DenyReason::BrokenChain { index: 1 },
            }
        );
    }

    #[test]
    fn test_mint_requires_recognized_root() {
        let admin = key(1);
        let outsider = key(9);
        let alice = key(2);
        let mut executor = engine(admin.address());

        // A chain rooted in a non-admin identity cannot authorize minting.
        let delegation = root_delegation(&executor, &outsider, alice.address());
        let batch = single_batch(
            &executor,
            &alice,
            mint(alice.address(), 1_000),
            vec![delegation],
            0,
            1,
        );
        assert_eq!(
            executor.submit(&batch, &at_height(0)),
            BatchResult::Failed {
                index: 0,
                reason: DenyReason::UnrecognizedRoot {
                    root: outsider.address()
                },
            }
        );

        // The same delegation shape rooted in the admin mints fine.
        let delegation = root_delegation(&executor, &admin, alice.address());
        let batch = single_batch(
            &executor,
            &alice,
            mint(alice.address(), 1_000),
            vec![delegation],
            0,
            2,
        );
        let result = executor.submit(&batch, &at_height(0));
        assert!(matches!(result, BatchResult::AllSucceeded(_)));
        assert_eq!(
            executor.gateway().balance_of(&alice.address()),
            U256::from(1_000u64)
        );
    }

    #[test]
    fn test_action_for_foreign_resource_rejected() {
        let root = key(1);
        let mut executor = engine(root.address());

        let mut action = deposit(10);
        action.to = [0x99; 20];
        let foreign_to = action.to;

        let batch = single_batch(&executor, &root, action, vec![], 0, 1);
        assert_eq!(
            executor.submit(&batch, &at_height(0)),
            BatchResult::Failed {
                index: 0,
                reason: DenyReason::TargetMismatch {
                    expected: LEDGER_ADDRESS,
                    actual: foreign_to,
                },
            }
        );
    }

    #[test]
    fn test_unregistered_enforcer_rejected() {
        let root = key(1);
        let alice = key(2);
        let mut executor = engine(root.address());
        fund(&mut executor, &root, 100);

        let unregistered = [0xDD; 20];
        let delegation = delegate_to(
            &executor,
            &root,
            alice.address(),
            shared_types::ROOT_AUTHORITY,
            vec![Caveat {
                enforcer: unregistered,
                terms: vec![],
            }],
            1,
        );
        let batch = single_batch(
            &executor,
            &alice,
            transfer(alice.address(), 10),
            vec![delegation],
            0,
            1,
        );

        assert_eq!(
            executor.submit(&batch, &at_height(0)),
            BatchResult::Failed {
                index: 0,
                reason: DenyReason::UnknownEnforcer {
                    delegation: 0,
                    caveat: 0,
                    enforcer: unregistered,
                },
            }
        );
    }

    #[test]
    fn test_batch_signer_must_be_final_delegate() {
        let root = key(1);
        let alice = key(2);
        let mallory = key(9);
        let mut executor = engine(root.address());
        fund(&mut executor, &root, 100);

        // Chain authorizes Alice, but Mallory signs the batch.
        let delegation = root_delegation(&executor, &root, alice.address());
        let batch = single_batch(
            &executor,
            &mallory,
            transfer(mallory.address(), 100),
            vec![delegation],
            0,
            1,
        );

        assert_eq!(
            executor.submit(&batch, &at_height(0)),
            BatchResult::Failed {
                index: 0,
                reason: DenyReason::InvalidBatchSignature {
                    expected: alice.address(),
                    recovered: mallory.address(),
                },
            }
        );
        assert_eq!(
            executor.gateway().balance_of(&root.address()),
            U256::from(100u64)
        );
    }

    #[test]
    fn test_malformed_batch_signature_rejected() {
        let root = key(1);
        let mut executor = engine(root.address());

        let mut batch = single_batch(&executor, &root, deposit(10), vec![], 0, 1);
        batch.signature.v = 9;

        match executor.submit(&batch, &at_height(0)) {
            BatchResult::Failed {
                index: 0,
                reason: DenyReason::InvalidSignatureEncoding { .. },
            } => {}
            other => panic!("expected signature-encoding denial, got {:?}", other),
        }
    }

    #[test]
    fn test_tampered_action_breaks_batch_signature() {
        let root = key(1);
        let thief = key(9);
        let mut executor = engine(root.address());
        fund(&mut executor, &root, 100);

        // Tampering with a signed invocation changes the batch digest, so
        // the signature recovers to some unrelated identity that holds no
        // delegated authority over root's funds.
        let mut batch = single_batch(&executor, &root, transfer(root.address(), 10), vec![], 0, 1);
        batch.invocations[0].action = transfer(thief.address(), 100);

        let result = executor.submit(&batch, &at_height(0));
        assert!(!result.is_success(), "tampered batch executed: {:?}", result);
        assert_eq!(
            executor.gateway().balance_of(&root.address()),
            U256::from(100u64)
        );
        assert_eq!(executor.gateway().balance_of(&thief.address()), U256::zero());
    }
}
