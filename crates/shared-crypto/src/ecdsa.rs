//! # ECDSA Signatures (secp256k1)
//!
//! Signing and signer recovery over 32-byte digests.
//!
//! ## Security Properties
//!
//! - RFC 6979 deterministic nonces (no RNG dependency for signing)
//! - Low-S normalization (EIP-2), enforced on both signing and recovery
//! - Scalar range validation in constant time via `subtle`
//! - Secret key material zeroized on drop
//!
//! ## Recovery Semantics
//!
//! `recover_signer` authenticates nothing by itself: it maps a structurally
//! valid (digest, signature) pair to the address that produced it. Callers
//! compare the recovered address against the identity they expect, which
//! lets chain validation report *which* link mismatched instead of an
//! opaque "invalid signature".

use crate::errors::CryptoError;
use crate::hashing::keccak256;
use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use shared_types::{Address, Hash, RecoverableSignature};
use subtle::{Choice, ConstantTimeEq};
use zeroize::Zeroize;

/// secp256k1 curve order n
/// n = 0xFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFEBAAEDCE6AF48A03BBFD25E8CD0364141
const SECP256K1_ORDER: [u8; 32] = [
    0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFE,
    0xBA, 0xAE, 0xDC, 0xE6, 0xAF, 0x48, 0xA0, 0x3B, 0xBF, 0xD2, 0x5E, 0x8C, 0xD0, 0x36, 0x41, 0x41,
];

/// Half of the secp256k1 curve order (for malleability check).
const SECP256K1_HALF_ORDER: [u8; 32] = [
    0x7F, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
    0x5D, 0x57, 0x6E, 0x73, 0x57, 0xA4, 0x50, 0x1D, 0xDF, 0xE9, 0x2F, 0x46, 0x68, 0x1B, 0x20, 0xA0,
];

// =============================================================================
// KEY PAIR
// =============================================================================

/// secp256k1 ECDSA keypair.
pub struct Secp256k1KeyPair {
    signing_key: SigningKey,
}

impl Secp256k1KeyPair {
    /// Generate random keypair.
    pub fn generate() -> Self {
        let signing_key = SigningKey::random(&mut rand::thread_rng());
        Self { signing_key }
    }

    /// Create from secret key bytes (32 bytes).
    pub fn from_bytes(bytes: [u8; 32]) -> Result<Self, CryptoError> {
        let signing_key =
            SigningKey::from_bytes((&bytes).into()).map_err(|_| CryptoError::InvalidPrivateKey)?;
        Ok(Self { signing_key })
    }

    /// Derive the Ethereum-style address of this keypair.
    pub fn address(&self) -> Address {
        address_from_pubkey(self.signing_key.verifying_key())
    }

    /// Sign a 32-byte digest, producing a recoverable (r, s, v) signature.
    ///
    /// Deterministic per RFC 6979; the S component is low-S normalized with
    /// the recovery id adjusted accordingly.
    pub fn sign_digest(&self, digest: &Hash) -> Result<RecoverableSignature, CryptoError> {
        let (sig, recovery_id) = self
            .signing_key
            .sign_prehash_recoverable(digest)
            .map_err(|_| CryptoError::SigningFailed)?;

        let bytes = sig.to_bytes();
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..]);

        Ok(RecoverableSignature {
            r,
            s,
            v: recovery_id.to_byte(),
        })
    }

    /// Get secret key bytes (for serialization).
    pub fn to_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes().into()
    }
}

impl Drop for Secp256k1KeyPair {
    fn drop(&mut self) {
        // Zeroize secret key material
        let mut bytes: [u8; 32] = self.signing_key.to_bytes().into();
        bytes.zeroize();
    }
}

// =============================================================================
// RECOVERY
// =============================================================================

/// Recover the signer's address from a digest and a recoverable signature.
///
/// Validations performed before recovery:
/// 1. R is in valid range [1, n-1] per SEC1
/// 2. S is in valid range [1, n-1] per SEC1
/// 3. S is in the lower half of the curve order (EIP-2)
/// 4. Recovery id (v) is 0, 1, 27, or 28
pub fn recover_signer(
    digest: &Hash,
    signature: &RecoverableSignature,
) -> Result<Address, CryptoError> {
    if !is_valid_scalar(&signature.r) {
        return Err(CryptoError::InvalidSignatureEncoding(
            "R not in range [1, n-1]",
        ));
    }

    if !is_valid_scalar(&signature.s) {
        return Err(CryptoError::InvalidSignatureEncoding(
            "S not in range [1, n-1]",
        ));
    }

    if !is_low_s(&signature.s) {
        return Err(CryptoError::MalleableSignature);
    }

    let recovery_id = parse_recovery_id(signature.v)?;

    let mut sig_bytes = [0u8; 64];
    sig_bytes[..32].copy_from_slice(&signature.r);
    sig_bytes[32..].copy_from_slice(&signature.s);

    let sig = match Signature::from_slice(&sig_bytes) {
        Ok(s) => {
            sig_bytes.zeroize();
            s
        }
        Err(_) => {
            sig_bytes.zeroize();
            return Err(CryptoError::InvalidSignatureEncoding("unparseable r||s"));
        }
    };

    let recovered_key = VerifyingKey::recover_from_prehash(digest, &sig, recovery_id)
        .map_err(|_| CryptoError::RecoveryFailed)?;

    Ok(address_from_pubkey(&recovered_key))
}

/// Recover the signer and require it to match the expected identity.
pub fn verify_signer(
    digest: &Hash,
    signature: &RecoverableSignature,
    expected: Address,
) -> Result<(), CryptoError> {
    let recovered = recover_signer(digest, signature)?;
    if recovered != expected {
        return Err(CryptoError::SignerMismatch {
            expected,
            actual: recovered,
        });
    }
    Ok(())
}

/// Derive Ethereum-style address from a public key: the last 20 bytes of
/// the Keccak256 hash of the uncompressed point (without the 0x04 prefix).
pub fn address_from_pubkey(public_key: &VerifyingKey) -> Address {
    let pubkey_bytes = public_key.to_encoded_point(false);
    let hash = keccak256(&pubkey_bytes.as_bytes()[1..]);

    let mut address = [0u8; 20];
    address.copy_from_slice(&hash[12..]);
    address
}

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Parse a recovery id byte. Accepts the raw form (0, 1) and the
/// Ethereum-legacy form (27, 28).
fn parse_recovery_id(v: u8) -> Result<RecoveryId, CryptoError> {
    let normalized = match v {
        0 | 1 => v,
        27 | 28 => v - 27,
        _ => {
            return Err(CryptoError::InvalidSignatureEncoding(
                "recovery id not in {0, 1, 27, 28}",
            ))
        }
    };
    RecoveryId::from_byte(normalized)
        .ok_or(CryptoError::InvalidSignatureEncoding("invalid recovery id"))
}

/// Check if S value is in lower half of curve order (EIP-2 malleability
/// protection). Constant-time: no early returns on byte comparisons.
fn is_low_s(s: &[u8; 32]) -> bool {
    constant_time_lt(s, &SECP256K1_HALF_ORDER)
}

/// Check if a scalar value is in valid range [1, n-1] for ECDSA.
/// Constant-time: no early returns on byte comparisons.
fn is_valid_scalar(scalar: &[u8; 32]) -> bool {
    let mut is_zero = Choice::from(1u8);
    for &byte in scalar {
        is_zero &= byte.ct_eq(&0u8);
    }

    let less = constant_time_lt(scalar, &SECP256K1_ORDER);
    bool::from(!is_zero) && less
}

/// Constant-time big-endian comparison: a < b.
fn constant_time_lt(a: &[u8; 32], b: &[u8; 32]) -> bool {
    let mut less = Choice::from(0u8);
    let mut greater = Choice::from(0u8);

    for i in 0..32 {
        let not_decided = !(less | greater);
        let byte_less = Choice::from((a[i] < b[i]) as u8);
        let byte_greater = Choice::from((a[i] > b[i]) as u8);

        less |= not_decided & byte_less;
        greater |= not_decided & byte_greater;
    }

    less.into()
}
