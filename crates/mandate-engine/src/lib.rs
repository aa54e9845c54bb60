//! # Mandate Authorization Engine
//!
//! Capability delegation with conditional, pluggable enforcement. A party
//! holding authority over a resource delegates a scoped subset of that
//! authority by issuing a signed delegation; delegations chain into an
//! authority path from a root holder down to an invoker; each link may carry
//! caveats evaluated by registered enforcers; and every invocation consumes a
//! single-use (queue, nonce) replay slot.
//!
//! ## Architecture
//!
//! This crate follows hexagonal architecture:
//! - **Domain Layer** (`domain/`): Pure authorization logic, no I/O
//! - **Ports Layer** (`ports/`): Trait definitions for inbound/outbound
//!   interfaces
//! - **Service Layer** (`service.rs`): Wires domain logic to ports
//!
//! ## Security Notes
//!
//! - Every delegation signature in every chain is independently recovered
//!   and compared against the expected delegator; linkage failures report
//!   the exact chain position.
//! - Replay consumption and target-action execution are all-or-nothing: a
//!   failed execution never leaves its nonce consumed.
//! - Failures are typed denials (`DenyReason`), never silently downgraded.

pub mod domain;
pub mod ports;
pub mod service;

// Re-export public API
pub use domain::chain::{ChainValidator, RootAuthority, ValidatedChain};
pub use domain::codec::MessageCodec;
pub use domain::enforcer::{
    CaveatDecision, CaveatEnforcer, EnforcerRegistry, InvocationContext, LimitedCallsEnforcer,
    NotBeforeHeightEnforcer,
};
pub use domain::entities::{
    BatchMode, BatchResult, EngineConfig, Environment, ExecutionOutput, DEFAULT_MAX_CHAIN_DEPTH,
};
pub use domain::errors::DenyReason;
pub use domain::replay::{ReplayError, ReplaySlot, ReplayTracker};
pub use ports::inbound::InvocationApi;
pub use ports::outbound::{ResourceError, ResourceGateway};
pub use service::InvocationExecutor;
