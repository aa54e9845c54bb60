//! # Caveat Enforcer Protocol
//!
//! Caveats are (enforcer, terms) pairs attached to delegations. The engine
//! routes each caveat to the enforcer registered under its identity; the
//! terms bytes are opaque to everything but that enforcer. New conditions
//! are added by registering a new enforcer identity, never by modifying the
//! validator.
//!
//! Enforcers are pure policy over their terms and the ambient
//! [`InvocationContext`]; the pre-hook gates execution, the optional
//! post-hook runs bookkeeping after a successful execution (use counting,
//! rate limiting).

use super::entities::ExecutionOutput;
use shared_types::{Address, Hash, TargetAction};
use std::collections::HashMap;
use std::sync::Mutex;

/// Ambient context handed to enforcer pre-hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvocationContext {
    /// Current block (or epoch) height.
    pub height: u64,
    /// Identity submitting the invocation.
    pub invoker: Address,
}

/// Outcome of a pre-execution caveat check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaveatDecision {
    /// The condition is satisfied; the action may proceed.
    Allow,
    /// The condition failed. The reason is surfaced verbatim to callers.
    Deny(String),
}

/// A pluggable caveat condition.
///
/// Implementations must be pure over `(terms, delegation_digest, action,
/// context)` apart from their own bookkeeping, so that validation is
/// reproducible and auditable.
pub trait CaveatEnforcer: Send + Sync {
    /// Decide whether the delegated action may proceed.
    fn before_invocation(
        &self,
        terms: &[u8],
        delegation_digest: &Hash,
        action: &TargetAction,
        context: &InvocationContext,
    ) -> CaveatDecision;

    /// Cleanup/bookkeeping hook, run after the target action executed
    /// successfully, in the same order the pre-hooks ran.
    fn after_invocation(
        &self,
        _terms: &[u8],
        _delegation_digest: &Hash,
        _action: &TargetAction,
        _output: &ExecutionOutput,
    ) {
    }
}

/// Registry mapping enforcer identities to implementations.
#[derive(Default)]
pub struct EnforcerRegistry {
    enforcers: HashMap<Address, Box<dyn CaveatEnforcer>>,
}

impl EnforcerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an enforcer under an identity, replacing any previous
    /// registration for that identity.
    pub fn register(&mut self, identity: Address, enforcer: impl CaveatEnforcer + 'static) {
        self.enforcers.insert(identity, Box::new(enforcer));
    }

    /// Look up the enforcer registered under an identity.
    pub fn get(&self, identity: &Address) -> Option<&dyn CaveatEnforcer> {
        self.enforcers.get(identity).map(Box::as_ref)
    }
}

/// Decode 8-byte big-endian enforcer terms.
fn decode_u64_terms(terms: &[u8]) -> Result<u64, String> {
    let bytes: [u8; 8] = terms
        .try_into()
        .map_err(|_| format!("terms must be 8 bytes big-endian, got {} bytes", terms.len()))?;
    Ok(u64::from_be_bytes(bytes))
}

/// Encode a u64 threshold as enforcer terms.
pub fn encode_u64_terms(value: u64) -> Vec<u8> {
    value.to_be_bytes().to_vec()
}

// =============================================================================
// REFERENCE ENFORCERS
// =============================================================================

/// Time-lock caveat: the delegation is not usable before a threshold
/// height.
///
/// Terms decode to a single big-endian u64 threshold `H`. The pre-hook
/// denies strictly below `H` and allows at or above it.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotBeforeHeightEnforcer;

impl NotBeforeHeightEnforcer {
    /// Create the enforcer.
    pub fn new() -> Self {
        Self
    }

    /// Terms encoding for a threshold height.
    pub fn terms(height: u64) -> Vec<u8> {
        encode_u64_terms(height)
    }
}

impl CaveatEnforcer for NotBeforeHeightEnforcer {
    fn before_invocation(
        &self,
        terms: &[u8],
        _delegation_digest: &Hash,
        _action: &TargetAction,
        context: &InvocationContext,
    ) -> CaveatDecision {
        let threshold = match decode_u64_terms(terms) {
            Ok(t) => t,
            Err(e) => return CaveatDecision::Deny(e),
        };

        if context.height < threshold {
            CaveatDecision::Deny(format!(
                "usable from height {}, current height {}",
                threshold, context.height
            ))
        } else {
            CaveatDecision::Allow
        }
    }
}

/// Use-limiting caveat: the delegation may authorize at most N executed
/// invocations.
///
/// Terms decode to a single big-endian u64 limit. The post-hook counts
/// executions per delegation digest; the pre-hook denies once the count
/// reaches the limit. Counts live in this enforcer instance and survive for
/// the engine's lifetime.
#[derive(Debug, Default)]
pub struct LimitedCallsEnforcer {
    used: Mutex<HashMap<Hash, u64>>,
}

impl LimitedCallsEnforcer {
    /// Create the enforcer with no recorded uses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Terms encoding for a use limit.
    pub fn terms(limit: u64) -> Vec<u8> {
        encode_u64_terms(limit)
    }

    fn used_count(&self, delegation_digest: &Hash) -> u64 {
        self.used
            .lock()
            .map(|used| used.get(delegation_digest).copied().unwrap_or(0))
            .unwrap_or(u64::MAX)
    }
}

impl CaveatEnforcer for LimitedCallsEnforcer {
    fn before_invocation(
        &self,
        terms: &[u8],
        delegation_digest: &Hash,
        _action: &TargetAction,
        _context: &InvocationContext,
    ) -> CaveatDecision {
        let limit = match decode_u64_terms(terms) {
            Ok(t) => t,
            Err(e) => return CaveatDecision::Deny(e),
        };

        let used = self.used_count(delegation_digest);
        if used >= limit {
            CaveatDecision::Deny(format!("delegation exhausted: {} of {} uses", used, limit))
        } else {
            CaveatDecision::Allow
        }
    }

    fn after_invocation(
        &self,
        _terms: &[u8],
        delegation_digest: &Hash,
        _action: &TargetAction,
        _output: &ExecutionOutput,
    ) {
        if let Ok(mut used) = self.used.lock() {
            *used.entry(*delegation_digest).or_insert(0) += 1;
        }
    }
}
