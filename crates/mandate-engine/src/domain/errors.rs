//! Engine error types.
//!
//! Every failure is a semantic denial carrying the exact validation step and
//! position that failed. Denials are never retryable without changed input;
//! callers get enough structure to distinguish "fix your delegation chain"
//! from "condition not yet met" from "already used" without engine
//! internals.

use shared_crypto::CryptoError;
use shared_types::Address;
use thiserror::Error;

/// Reason an invocation (or a whole submission) was denied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DenyReason {
    /// A signature was structurally malformed (bad scalar range, high S,
    /// invalid recovery id). Fatal to the submission.
    #[error("invalid signature encoding: {detail}")]
    InvalidSignatureEncoding {
        /// Description of the structural defect.
        detail: String,
    },

    /// The batch signature does not authorize the invoker implied by the
    /// invocation's authority chain.
    #[error("batch signature mismatch: chain authorizes {expected:02x?}, batch signed by {recovered:02x?}")]
    InvalidBatchSignature {
        /// Delegate of the final chain link.
        expected: Address,
        /// Signer recovered from the batch signature.
        recovered: Address,
    },

    /// Empty authority chain and the invoker is not a recognized root
    /// holder for the action.
    #[error("invoker {invoker:02x?} holds no authority for this action")]
    NoAuthority {
        /// The claimed invoker.
        invoker: Address,
    },

    /// The chain's first delegation was not signed by a holder recognized
    /// for the target action's scope.
    #[error("chain root {root:02x?} is not a recognized holder for this action")]
    UnrecognizedRoot {
        /// Signer recovered from the first delegation.
        root: Address,
    },

    /// Delegate/authority linkage violated at a specific chain position:
    /// the authority pointer does not match the parent digest, the signer
    /// is not the parent's delegate, or a non-initial link claims root.
    #[error("delegation chain broken at index {index}")]
    BrokenChain {
        /// Position of the offending link.
        index: usize,
    },

    /// The final chain link does not authorize the claimed invoker.
    #[error("final delegate {delegate:02x?} does not match invoker {invoker:02x?}")]
    DelegateMismatch {
        /// Delegate named by the last chain link.
        delegate: Address,
        /// The claimed invoker.
        invoker: Address,
    },

    /// Chain length exceeds the configured bound.
    #[error("chain depth {depth} exceeds maximum {max}")]
    ChainTooDeep {
        /// Submitted chain length.
        depth: usize,
        /// Configured maximum.
        max: usize,
    },

    /// A caveat names an enforcer that is not registered with the engine.
    #[error("caveat {caveat} of delegation {delegation} names unregistered enforcer {enforcer:02x?}")]
    UnknownEnforcer {
        /// Index of the delegation within the chain.
        delegation: usize,
        /// Index of the caveat within that delegation.
        caveat: usize,
        /// The unregistered enforcer identity.
        enforcer: Address,
    },

    /// A caveat enforcer denied the invocation. The reason is
    /// enforcer-specific and surfaced verbatim for auditability.
    #[error("caveat {caveat} of delegation {delegation} rejected: {reason}")]
    CaveatRejected {
        /// Index of the delegation within the chain.
        delegation: usize,
        /// Index of the caveat within that delegation.
        caveat: usize,
        /// Verbatim enforcer-provided reason.
        reason: String,
    },

    /// The target action is addressed to a different resource than the one
    /// this engine protects.
    #[error("action targets {actual:02x?} but this engine protects {expected:02x?}")]
    TargetMismatch {
        /// The protected resource address.
        expected: Address,
        /// The address the action was directed at.
        actual: Address,
    },

    /// The (invoker, queue, nonce) replay slot was already consumed.
    /// Fatal to this invocation, not to the queue.
    #[error("replay slot (queue {queue}, nonce {nonce}) already consumed")]
    AlreadyConsumed {
        /// The queue identifier.
        queue: u64,
        /// The consumed nonce.
        nonce: u64,
    },

    /// The external resource reported an execution failure. The replay
    /// slot selected for this invocation is rolled back, not consumed.
    #[error("resource execution failed: {reason}")]
    ExecutionFailed {
        /// Collaborator-reported failure reason.
        reason: String,
    },
}

impl DenyReason {
    /// Map a cryptographic failure surfaced during signature recovery onto
    /// the denial taxonomy. Everything recovery can reject is a structural
    /// signature defect; identity mismatches are diagnosed by the callers
    /// that compare recovered addresses.
    pub fn from_crypto(error: CryptoError) -> Self {
        DenyReason::InvalidSignatureEncoding {
            detail: error.to_string(),
        }
    }
}
