//! # Shared Types Crate
//!
//! This crate contains the wire-level protocol entities shared across the
//! Mandate crates: identities, recoverable signatures, delegations,
//! invocations, and replay-protection metadata.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: All cross-crate protocol types are defined
//!   here.
//! - **Transient and Immutable**: Delegations and invocations are
//!   caller-supplied values; once hashed and signed they are never mutated.
//! - **No Hidden Semantics**: Entities carry data only. Hashing, signature
//!   recovery, and validation live in `shared-crypto` and `mandate-engine`.

pub mod entities;

pub use entities::*;
