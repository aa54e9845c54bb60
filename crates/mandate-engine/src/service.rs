//! # Invocation Executor
//!
//! Application service that orchestrates a submission: decode → verify the
//! batch signature → validate each authority chain → stage the replay slot
//! → execute the target action → run post-hooks → commit.
//!
//! ## Atomicity
//!
//! Execution and replay-consumption are all-or-nothing per invocation: a
//! failed execution releases its staged replay slot, so a legitimate action
//! is never left permanently unexecutable. In [`BatchMode::Atomic`] the
//! same discipline extends to the whole batch: replay slots stay staged and
//! post-hooks are deferred until every invocation has executed, and the
//! resource is reverted to its pre-batch checkpoint on the first failure.

use crate::domain::chain::{ChainValidator, ValidatedChain};
use crate::domain::codec::MessageCodec;
use crate::domain::enforcer::{EnforcerRegistry, InvocationContext};
use crate::domain::entities::{
    BatchMode, BatchResult, EngineConfig, Environment, ExecutionOutput,
};
use crate::domain::errors::DenyReason;
use crate::domain::replay::{ReplayError, ReplaySlot, ReplayTracker};
use crate::ports::inbound::InvocationApi;
use crate::ports::outbound::ResourceGateway;
use shared_crypto::recover_signer;
use shared_types::{Address, DomainInfo, Invocation, SignedInvocationBatch};
use tracing::{debug, warn};

/// The authorization engine fronting one protected resource.
///
/// Owns the only persistent engine state: the replay tracker. Delegations
/// and invocations are transient caller-supplied values.
pub struct InvocationExecutor<G: ResourceGateway> {
    codec: MessageCodec,
    registry: EnforcerRegistry,
    replay: ReplayTracker,
    gateway: G,
    config: EngineConfig,
}

impl<G: ResourceGateway> InvocationExecutor<G> {
    /// Create an engine with default configuration.
    pub fn new(domain: DomainInfo, registry: EnforcerRegistry, gateway: G) -> Self {
        Self::with_config(domain, registry, gateway, EngineConfig::default())
    }

    /// Create an engine with explicit configuration.
    pub fn with_config(
        domain: DomainInfo,
        registry: EnforcerRegistry,
        gateway: G,
        config: EngineConfig,
    ) -> Self {
        Self {
            codec: MessageCodec::new(domain),
            registry,
            replay: ReplayTracker::new(),
            gateway,
            config,
        }
    }

    /// The codec bound to this engine's verifying context. Issuers use it
    /// to produce delegations and batches the engine will accept.
    pub fn codec(&self) -> &MessageCodec {
        &self.codec
    }

    /// The protected resource collaborator.
    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Replay bookkeeping, e.g. for snapshotting to durable storage.
    pub fn replay(&self) -> &ReplayTracker {
        &self.replay
    }

    /// Replace the replay bookkeeping, e.g. with a tracker restored from a
    /// snapshot after a restart.
    pub fn restore_replay(&mut self, replay: ReplayTracker) {
        self.replay = replay;
    }

    fn submit_atomic(
        &mut self,
        batch: &SignedInvocationBatch,
        invoker: Address,
        env: &Environment,
    ) -> BatchResult {
        self.gateway.checkpoint();

        let mut slots: Vec<ReplaySlot> = Vec::with_capacity(batch.invocations.len());
        let mut executed: Vec<(ValidatedChain, ExecutionOutput)> =
            Vec::with_capacity(batch.invocations.len());

        for (index, invocation) in batch.invocations.iter().enumerate() {
            match self.process_invocation(invocation, invoker, env) {
                Ok((output, chain, slot)) => {
                    slots.push(slot);
                    executed.push((chain, output));
                }
                Err(reason) => {
                    warn!(index, %reason, "atomic batch denied, rolling back");
                    for slot in slots {
                        self.replay.revert(slot);
                    }
                    self.gateway.revert();
                    return BatchResult::Failed { index, reason };
                }
            }
        }

        // Whole batch executed: post-hooks, then burn slots and keep state.
        for (invocation, (chain, output)) in batch.invocations.iter().zip(&executed) {
            self.run_after_hooks(invocation, chain, output);
        }
        for slot in slots {
            self.replay.commit(slot);
        }
        self.gateway.commit();

        debug!(count = executed.len(), "atomic batch committed");
        BatchResult::AllSucceeded(executed.into_iter().map(|(_, output)| output).collect())
    }

    fn submit_independent(
        &mut self,
        batch: &SignedInvocationBatch,
        invoker: Address,
        env: &Environment,
    ) -> BatchResult {
        let mut outcomes: Vec<Result<ExecutionOutput, DenyReason>> =
            Vec::with_capacity(batch.invocations.len());

        for (index, invocation) in batch.invocations.iter().enumerate() {
            self.gateway.checkpoint();
            match self.process_invocation(invocation, invoker, env) {
                Ok((output, chain, slot)) => {
                    self.run_after_hooks(invocation, &chain, &output);
                    self.replay.commit(slot);
                    self.gateway.commit();
                    outcomes.push(Ok(output));
                }
                Err(reason) => {
                    warn!(index, %reason, "invocation denied");
                    self.gateway.revert();
                    outcomes.push(Err(reason));
                }
            }
        }

        if outcomes.iter().all(Result::is_ok) {
            BatchResult::AllSucceeded(outcomes.into_iter().flatten().collect())
        } else {
            BatchResult::PartialSuccess(outcomes)
        }
    }

    /// Authorize and execute one invocation. On success the replay slot is
    /// returned still staged; committing it is the caller's (mode-dependent)
    /// responsibility. On failure nothing stays staged and the resource is
    /// untouched.
    fn process_invocation(
        &mut self,
        invocation: &Invocation,
        invoker: Address,
        env: &Environment,
    ) -> Result<(ExecutionOutput, ValidatedChain, ReplaySlot), DenyReason> {
        // The single batch signature must authorize this invocation's
        // invoker: the delegate of the final chain link, or the batch
        // signer itself for an empty chain.
        if let Some(last) = invocation.authority.last() {
            if last.delegation.delegate != invoker {
                return Err(DenyReason::InvalidBatchSignature {
                    expected: last.delegation.delegate,
                    recovered: invoker,
                });
            }
        }

        // Delegated authority is only meaningful against the resource that
        // recognizes it.
        let protected = self.codec.domain().resource_address;
        if invocation.action.to != protected {
            return Err(DenyReason::TargetMismatch {
                expected: protected,
                actual: invocation.action.to,
            });
        }

        let context = InvocationContext {
            height: env.height,
            invoker,
        };
        let validated = ChainValidator::new(&self.codec, &self.registry, self.config.max_chain_depth)
            .validate(
                &invocation.authority,
                invoker,
                &invocation.action,
                &context,
                &self.gateway,
            )?;
        debug!(
            chain_len = invocation.authority.len(),
            acting = ?validated.acting_identity,
            "authority chain validated"
        );

        let slot = self
            .replay
            .stage(
                invoker,
                invocation.replay_protection.queue,
                invocation.replay_protection.nonce,
            )
            .map_err(|ReplayError::AlreadyConsumed { queue, nonce }| {
                DenyReason::AlreadyConsumed { queue, nonce }
            })?;

        match self
            .gateway
            .apply(&invocation.action, &validated.acting_identity)
        {
            Ok(output) => Ok((output, validated, slot)),
            Err(error) => {
                // Roll back together: a failed execution must not leave its
                // nonce consumed.
                self.replay.revert(slot);
                Err(DenyReason::ExecutionFailed {
                    reason: error.to_string(),
                })
            }
        }
    }

    /// Run every caveat's post-hook in the order the pre-hooks ran.
    fn run_after_hooks(
        &self,
        invocation: &Invocation,
        chain: &ValidatedChain,
        output: &ExecutionOutput,
    ) {
        for (index, link) in invocation.authority.iter().enumerate() {
            for caveat in &link.delegation.caveats {
                // Validation already established every enforcer is present.
                if let Some(enforcer) = self.registry.get(&caveat.enforcer) {
                    enforcer.after_invocation(
                        &caveat.terms,
                        &chain.delegation_digests[index],
                        &invocation.action,
                        output,
                    );
                }
            }
        }
    }
}

impl<G: ResourceGateway> InvocationApi for InvocationExecutor<G> {
    fn submit(&mut self, batch: &SignedInvocationBatch, env: &Environment) -> BatchResult {
        let digest = self.codec.batch_digest(&batch.invocations);
        let invoker = match recover_signer(&digest, &batch.signature) {
            Ok(address) => address,
            Err(error) => {
                warn!(%error, "batch signature unparseable");
                return BatchResult::Failed {
                    index: 0,
                    reason: DenyReason::from_crypto(error),
                };
            }
        };
        debug!(
            invocations = batch.invocations.len(),
            invoker = ?invoker,
            height = env.height,
            "processing batch"
        );

        match self.config.batch_mode {
            BatchMode::Atomic => self.submit_atomic(batch, invoker, env),
            BatchMode::Independent => self.submit_independent(batch, invoker, env),
        }
    }
}
