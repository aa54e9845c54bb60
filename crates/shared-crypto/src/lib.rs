//! # Shared Crypto - Cryptographic Primitives
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `hashing` | Keccak256 | Digests, domain separation, address derivation |
//! | `ecdsa` | secp256k1 | Delegation/invocation signing and signer recovery |
//!
//! ## Security Properties
//!
//! - **secp256k1**: RFC 6979 deterministic nonces, low-S normalization (EIP-2)
//! - **Recovery**: signer identity is recovered from (digest, signature) and
//!   surfaced as an ordinary address for the caller to compare, so chain
//!   validation can report precise mismatch diagnostics
//! - **Constant-time**: scalar range and low-S checks use `subtle`
//! - **Key hygiene**: secret key material is zeroized on drop

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod ecdsa;
pub mod errors;
pub mod hashing;

// Re-exports
pub use ecdsa::{recover_signer, verify_signer, Secp256k1KeyPair};
pub use errors::CryptoError;
pub use hashing::{keccak256, keccak256_concat, Keccak256Hasher};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
