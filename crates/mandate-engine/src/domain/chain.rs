//! # Authority Chain Validation
//!
//! Walks a delegation chain from its root anchor to the invoker, verifying
//! signatures, delegate/delegator linkage, root recognition, and caveat
//! satisfaction.
//!
//! Chains are a directed path, not a graph: each link must reference the
//! previous link's digest, validation is O(chain length), and cycles cannot
//! be constructed because a link cannot reference a digest that does not
//! exist yet.

use super::codec::MessageCodec;
use super::enforcer::{CaveatDecision, EnforcerRegistry, InvocationContext};
use super::errors::DenyReason;
use shared_crypto::recover_signer;
use shared_types::{Address, Hash, SignedDelegation, TargetAction};

/// Recognizes native (non-delegated) authority over actions. Implemented by
/// the protected resource: it alone knows which identity holds root
/// authority for a given action.
pub trait RootAuthority {
    /// True if `identity` holds native authority for `action`.
    fn is_root_holder(&self, identity: &Address, action: &TargetAction) -> bool;
}

/// Facts established by a successful chain validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedChain {
    /// Identity the action executes as: the chain's root signer, or the
    /// invoker itself for an empty chain.
    pub acting_identity: Address,
    /// Digest of each delegation, in chain order. Post-execution enforcer
    /// hooks are keyed by these.
    pub delegation_digests: Vec<Hash>,
}

/// Validates authority chains against one verifying context and enforcer
/// registry.
pub struct ChainValidator<'a> {
    codec: &'a MessageCodec,
    registry: &'a EnforcerRegistry,
    max_depth: usize,
}

impl<'a> ChainValidator<'a> {
    /// Create a validator.
    pub fn new(codec: &'a MessageCodec, registry: &'a EnforcerRegistry, max_depth: usize) -> Self {
        Self {
            codec,
            registry,
            max_depth,
        }
    }

    /// Validate a chain for `invoker` performing `action`.
    ///
    /// On success returns the validated chain facts; on failure returns a
    /// single denial naming the exact failure site. Denials are semantic
    /// rejections: resubmitting unchanged input cannot succeed.
    pub fn validate(
        &self,
        chain: &[SignedDelegation],
        invoker: Address,
        action: &TargetAction,
        context: &InvocationContext,
        roots: &dyn RootAuthority,
    ) -> Result<ValidatedChain, DenyReason> {
        if chain.len() > self.max_depth {
            return Err(DenyReason::ChainTooDeep {
                depth: chain.len(),
                max: self.max_depth,
            });
        }

        // Empty chain: the invoker claims native authority.
        if chain.is_empty() {
            if !roots.is_root_holder(&invoker, action) {
                return Err(DenyReason::NoAuthority { invoker });
            }
            return Ok(ValidatedChain {
                acting_identity: invoker,
                delegation_digests: Vec::new(),
            });
        }

        // Anchor link: must claim root and be signed by a recognized holder.
        let anchor = &chain[0];
        if !anchor.delegation.is_root_anchored() {
            return Err(DenyReason::BrokenChain { index: 0 });
        }

        let anchor_digest = self.codec.delegation_digest(&anchor.delegation);
        let root = recover_signer(&anchor_digest, &anchor.signature)
            .map_err(DenyReason::from_crypto)?;
        if !roots.is_root_holder(&root, action) {
            return Err(DenyReason::UnrecognizedRoot { root });
        }

        let mut digests = Vec::with_capacity(chain.len());
        digests.push(anchor_digest);

        // Interior links: authority must point at the parent digest and the
        // signer must be the parent's delegate.
        for index in 1..chain.len() {
            let link = &chain[index];
            if link.delegation.authority != digests[index - 1] {
                return Err(DenyReason::BrokenChain { index });
            }

            let digest = self.codec.delegation_digest(&link.delegation);
            let signer =
                recover_signer(&digest, &link.signature).map_err(DenyReason::from_crypto)?;
            if signer != chain[index - 1].delegation.delegate {
                return Err(DenyReason::BrokenChain { index });
            }

            digests.push(digest);
        }

        // The final link must authorize the claimed invoker.
        let final_delegate = chain[chain.len() - 1].delegation.delegate;
        if final_delegate != invoker {
            return Err(DenyReason::DelegateMismatch {
                delegate: final_delegate,
                invoker,
            });
        }

        // Caveats, delegation by delegation, in order; first failure aborts.
        for (delegation_index, link) in chain.iter().enumerate() {
            for (caveat_index, caveat) in link.delegation.caveats.iter().enumerate() {
                let enforcer =
                    self.registry
                        .get(&caveat.enforcer)
                        .ok_or(DenyReason::UnknownEnforcer {
                            delegation: delegation_index,
                            caveat: caveat_index,
                            enforcer: caveat.enforcer,
                        })?;

                match enforcer.before_invocation(
                    &caveat.terms,
                    &digests[delegation_index],
                    action,
                    context,
                ) {
                    CaveatDecision::Allow => {}
                    CaveatDecision::Deny(reason) => {
                        return Err(DenyReason::CaveatRejected {
                            delegation: delegation_index,
                            caveat: caveat_index,
                            reason,
                        });
                    }
                }
            }
        }

        Ok(ValidatedChain {
            acting_identity: root,
            delegation_digests: digests,
        })
    }
}
