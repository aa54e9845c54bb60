//! Crypto error types.

use shared_types::Address;
use thiserror::Error;

/// Cryptographic operation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// Signature bytes are structurally malformed (out-of-range scalar,
    /// invalid recovery id, zero component)
    #[error("Invalid signature encoding: {0}")]
    InvalidSignatureEncoding(&'static str),

    /// S component is in the upper half of the curve order (EIP-2)
    #[error("Malleable signature: S not in lower half of curve order")]
    MalleableSignature,

    /// Public key recovery failed for a structurally valid signature
    #[error("Signer recovery failed")]
    RecoveryFailed,

    /// Invalid private key
    #[error("Invalid private key")]
    InvalidPrivateKey,

    /// Signing over the given digest failed
    #[error("Signing failed")]
    SigningFailed,

    /// Recovered signer does not match the expected identity
    #[error("Signer mismatch: expected {expected:02x?}, got {actual:02x?}")]
    SignerMismatch {
        /// Expected signer address
        expected: Address,
        /// Recovered signer address
        actual: Address,
    },
}
