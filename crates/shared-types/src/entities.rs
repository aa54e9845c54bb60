//! # Core Protocol Entities
//!
//! Defines the wire-level entities of the delegation protocol.
//!
//! ## Clusters
//!
//! - **Primitives**: `Hash`, `Address`, `RecoverableSignature`
//! - **Domain Binding**: `DomainInfo`
//! - **Delegation**: `Caveat`, `Delegation`, `SignedDelegation`
//! - **Invocation**: `TargetAction`, `ReplayProtection`, `Invocation`,
//!   `SignedInvocationBatch`

use serde::{Deserialize, Serialize};

// Re-export U256 from primitive-types for use across all crates
pub use primitive_types::U256;

// =============================================================================
// CLUSTER A: PRIMITIVES
// =============================================================================

/// A 32-byte Keccak256 digest.
pub type Hash = [u8; 32];

/// A 20-byte Ethereum-style address derived from a secp256k1 public key.
pub type Address = [u8; 20];

/// Sentinel authority reference. A delegation whose `authority` equals this
/// value is anchored directly to a root holder rather than re-delegating
/// from a parent delegation.
pub const ROOT_AUTHORITY: Hash = [0u8; 32];

/// A secp256k1 ECDSA signature in recoverable (r, s, v) form.
///
/// The recovery id `v` accepts both the raw form (0 or 1) and the
/// Ethereum-legacy form (27 or 28); `shared-crypto` normalizes on recovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoverableSignature {
    /// The r component (x-coordinate of the ephemeral point).
    pub r: [u8; 32],
    /// The s component. Must be in the lower half of the curve order.
    pub s: [u8; 32],
    /// Recovery id: 0, 1, 27, or 28.
    pub v: u8,
}

// =============================================================================
// CLUSTER B: DOMAIN BINDING
// =============================================================================

/// Immutable per-resource-instance verifying context.
///
/// Folded into every digest as a domain separator so that a signature valid
/// under one resource instance is never valid under another, nor under the
/// same code deployed on a different chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainInfo {
    /// Human-readable name of the protecting resource.
    pub name: String,
    /// Protocol version string.
    pub version: String,
    /// Chain (or deployment) identifier.
    pub chain_id: u64,
    /// Address of the protected resource instance.
    pub resource_address: Address,
}

// =============================================================================
// CLUSTER C: DELEGATION
// =============================================================================

/// A condition attached to a delegation.
///
/// The `terms` bytes are opaque to the engine; only the enforcer registered
/// under `enforcer` interprets them. Order within a delegation's caveat list
/// is significant: all caveats must pass, evaluated in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caveat {
    /// Identity of the enforcer that evaluates this caveat.
    pub enforcer: Address,
    /// Opaque terms interpreted only by that enforcer.
    pub terms: Vec<u8>,
}

/// A signed statement granting a scoped subset of authority to a delegate.
///
/// A delegation with `authority == ROOT_AUTHORITY` is self-contained: its
/// signer claims native authority over the resource. Any other `authority`
/// value re-delegates from the delegation whose digest matches it, and the
/// signer must equal that parent delegation's `delegate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delegation {
    /// Identity authorized to use this delegation.
    pub delegate: Address,
    /// Digest of the parent delegation, or `ROOT_AUTHORITY`.
    pub authority: Hash,
    /// Ordered conditions that must all pass before the delegated action
    /// executes.
    pub caveats: Vec<Caveat>,
    /// Arbitrary value for digest uniqueness between otherwise identical
    /// delegations.
    pub salt: [u8; 32],
}

impl Delegation {
    /// True if this delegation is anchored directly to a root holder.
    pub fn is_root_anchored(&self) -> bool {
        self.authority == ROOT_AUTHORITY
    }
}

/// A delegation together with its delegator's signature over the
/// delegation's digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedDelegation {
    /// The signed statement.
    pub delegation: Delegation,
    /// Delegator's signature over the delegation digest.
    pub signature: RecoverableSignature,
}

// =============================================================================
// CLUSTER D: INVOCATION
// =============================================================================

/// The operation an invocation asks the protected resource to perform.
///
/// The payload is opaque to the engine; the resource collaborator decodes
/// it. `to` must address the protected resource instance itself, since
/// delegated authority is only meaningful against the resource that
/// recognizes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetAction {
    /// Address of the resource instance the action is directed at.
    pub to: Address,
    /// Opaque payload describing the operation, decoded by the resource.
    pub payload: Vec<u8>,
}

/// Replay-protection metadata for one invocation.
///
/// Queues are independent nonce spaces: consuming a nonce in one queue never
/// blocks another queue. Within a queue, nonces may be consumed in any
/// order, but each (invoker, queue, nonce) slot is single-use forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayProtection {
    /// Single-use slot within the queue.
    pub nonce: u64,
    /// Independent nonce space identifier.
    pub queue: u64,
}

/// A request to perform a target action, carrying the authority chain and
/// replay-protection metadata that authorize it.
///
/// The authority chain is ordered root-first: index 0 is anchored to the
/// root holder, the last link's `delegate` is the invoker. An empty chain
/// means the invoker claims native (non-delegated) authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invocation {
    /// The operation to perform on the protected resource.
    pub action: TargetAction,
    /// Delegation chain from a root holder down to the invoker.
    pub authority: Vec<SignedDelegation>,
    /// Replay-protection slot consumed by executing this invocation.
    pub replay_protection: ReplayProtection,
}

/// An ordered batch of invocations authorized by a single invoker
/// signature over the batch digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedInvocationBatch {
    /// The invocations, executed in order.
    pub invocations: Vec<Invocation>,
    /// Invoker's signature over the batch digest.
    pub signature: RecoverableSignature,
}
