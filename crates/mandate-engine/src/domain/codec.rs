//! # Message Codec
//!
//! Deterministic, collision-resistant digests of the protocol's typed
//! structured messages, domain-separated by the verifying context.
//!
//! ## Encoding Scheme
//!
//! Typed structured-data hashing in the EIP-712 mold:
//!
//! - Every struct type has a typehash: the Keccak256 of its canonical type
//!   string (including the type strings of everything it references).
//! - A struct hashes to `keccak256(typehash || field_1 || ... || field_n)`
//!   where every field occupies exactly one 32-byte word: fixed-size values
//!   are padded, variable-length byte fields are replaced by their
//!   Keccak256 hash, and arrays of structs are replaced by the Keccak256
//!   of their concatenated element hashes. Because every variable-length
//!   value is collapsed to a fixed-width digest before concatenation, no
//!   two distinct messages share an encoding.
//! - The signable digest of a struct hash `h` is
//!   `keccak256(0x19 || 0x01 || domain_separator || h)`. The domain
//!   separator folds {name, version, chain id, resource address} into every
//!   digest, so a signature valid under one resource instance is never
//!   valid under another.
//!
//! The delegation digest doubles as the authority reference: a child
//! delegation's `authority` field must equal the digest its parent's
//! signature covers.

use shared_crypto::{keccak256, CryptoError, Keccak256Hasher, Secp256k1KeyPair};
use shared_types::{
    Caveat, Delegation, DomainInfo, Hash, Invocation, RecoverableSignature, ReplayProtection,
    SignedDelegation, SignedInvocationBatch, TargetAction,
};

/// Canonical type strings. Referenced component types are appended in
/// alphabetical order, so two types that disagree anywhere in their
/// transitive shape hash differently.
const DOMAIN_TYPE: &[u8] =
    b"MandateDomain(string name,string version,uint256 chainId,address resourceAddress)";

const CAVEAT_TYPE: &[u8] = b"Caveat(address enforcer,bytes terms)";

const DELEGATION_TYPE: &[u8] =
    b"Delegation(address delegate,bytes32 authority,Caveat[] caveats,bytes32 salt)\
      Caveat(address enforcer,bytes terms)";

const SIGNED_DELEGATION_TYPE: &[u8] =
    b"SignedDelegation(Delegation delegation,bytes signature)\
      Caveat(address enforcer,bytes terms)\
      Delegation(address delegate,bytes32 authority,Caveat[] caveats,bytes32 salt)";

const TARGET_ACTION_TYPE: &[u8] = b"TargetAction(address to,bytes payload)";

const REPLAY_PROTECTION_TYPE: &[u8] = b"ReplayProtection(uint64 nonce,uint64 queue)";

const INVOCATION_TYPE: &[u8] =
    b"Invocation(TargetAction action,SignedDelegation[] authority,ReplayProtection replayProtection)\
      Caveat(address enforcer,bytes terms)\
      Delegation(address delegate,bytes32 authority,Caveat[] caveats,bytes32 salt)\
      ReplayProtection(uint64 nonce,uint64 queue)\
      SignedDelegation(Delegation delegation,bytes signature)\
      TargetAction(address to,bytes payload)";

const BATCH_TYPE: &[u8] =
    b"InvocationBatch(Invocation[] invocations)\
      Caveat(address enforcer,bytes terms)\
      Delegation(address delegate,bytes32 authority,Caveat[] caveats,bytes32 salt)\
      Invocation(TargetAction action,SignedDelegation[] authority,ReplayProtection replayProtection)\
      ReplayProtection(uint64 nonce,uint64 queue)\
      SignedDelegation(Delegation delegation,bytes signature)\
      TargetAction(address to,bytes payload)";

/// Codec bound to one verifying context. Pure and deterministic: identical
/// field values always yield identical digests.
#[derive(Debug, Clone)]
pub struct MessageCodec {
    domain: DomainInfo,
    separator: Hash,
}

impl MessageCodec {
    /// Bind a codec to a verifying context, precomputing its domain
    /// separator.
    pub fn new(domain: DomainInfo) -> Self {
        let separator = hash_domain(&domain);
        Self { domain, separator }
    }

    /// The verifying context this codec is bound to.
    pub fn domain(&self) -> &DomainInfo {
        &self.domain
    }

    /// The precomputed domain separator.
    pub fn domain_separator(&self) -> Hash {
        self.separator
    }

    /// Signable digest of a delegation. This is both what the delegator
    /// signs and what a child delegation's `authority` field references.
    pub fn delegation_digest(&self, delegation: &Delegation) -> Hash {
        self.signable_digest(hash_delegation(delegation))
    }

    /// Signable digest of an invocation batch. One signature over this
    /// digest authorizes every invocation in the batch.
    pub fn batch_digest(&self, invocations: &[Invocation]) -> Hash {
        let mut elements = Keccak256Hasher::new();
        for invocation in invocations {
            elements.update(&hash_invocation(invocation));
        }

        let mut hasher = Keccak256Hasher::new();
        hasher
            .update(&keccak256(BATCH_TYPE))
            .update(&elements.finalize());
        self.signable_digest(hasher.finalize())
    }

    /// Sign a delegation with the delegator's key.
    pub fn sign_delegation(
        &self,
        delegation: Delegation,
        delegator: &Secp256k1KeyPair,
    ) -> Result<SignedDelegation, CryptoError> {
        let digest = self.delegation_digest(&delegation);
        let signature = delegator.sign_digest(&digest)?;
        Ok(SignedDelegation {
            delegation,
            signature,
        })
    }

    /// Sign an invocation batch with the invoker's key.
    pub fn sign_batch(
        &self,
        invocations: Vec<Invocation>,
        invoker: &Secp256k1KeyPair,
    ) -> Result<SignedInvocationBatch, CryptoError> {
        let digest = self.batch_digest(&invocations);
        let signature = invoker.sign_digest(&digest)?;
        Ok(SignedInvocationBatch {
            invocations,
            signature,
        })
    }

    /// `keccak256(0x19 || 0x01 || domain_separator || struct_hash)`
    fn signable_digest(&self, struct_hash: Hash) -> Hash {
        let mut hasher = Keccak256Hasher::new();
        hasher
            .update(&[0x19, 0x01])
            .update(&self.separator)
            .update(&struct_hash);
        hasher.finalize()
    }
}

// =============================================================================
// STRUCT HASHING
// =============================================================================

fn hash_domain(domain: &DomainInfo) -> Hash {
    let mut hasher = Keccak256Hasher::new();
    hasher
        .update(&keccak256(DOMAIN_TYPE))
        .update(&keccak256(domain.name.as_bytes()))
        .update(&keccak256(domain.version.as_bytes()))
        .update(&u64_word(domain.chain_id))
        .update(&address_word(&domain.resource_address));
    hasher.finalize()
}

fn hash_caveat(caveat: &Caveat) -> Hash {
    let mut hasher = Keccak256Hasher::new();
    hasher
        .update(&keccak256(CAVEAT_TYPE))
        .update(&address_word(&caveat.enforcer))
        .update(&keccak256(&caveat.terms));
    hasher.finalize()
}

fn hash_delegation(delegation: &Delegation) -> Hash {
    let mut caveats = Keccak256Hasher::new();
    for caveat in &delegation.caveats {
        caveats.update(&hash_caveat(caveat));
    }

    let mut hasher = Keccak256Hasher::new();
    hasher
        .update(&keccak256(DELEGATION_TYPE))
        .update(&address_word(&delegation.delegate))
        .update(&delegation.authority)
        .update(&caveats.finalize())
        .update(&delegation.salt);
    hasher.finalize()
}

fn hash_signed_delegation(signed: &SignedDelegation) -> Hash {
    let mut hasher = Keccak256Hasher::new();
    hasher
        .update(&keccak256(SIGNED_DELEGATION_TYPE))
        .update(&hash_delegation(&signed.delegation))
        .update(&hash_signature(&signed.signature));
    hasher.finalize()
}

fn hash_target_action(action: &TargetAction) -> Hash {
    let mut hasher = Keccak256Hasher::new();
    hasher
        .update(&keccak256(TARGET_ACTION_TYPE))
        .update(&address_word(&action.to))
        .update(&keccak256(&action.payload));
    hasher.finalize()
}

fn hash_replay_protection(replay: &ReplayProtection) -> Hash {
    let mut hasher = Keccak256Hasher::new();
    hasher
        .update(&keccak256(REPLAY_PROTECTION_TYPE))
        .update(&u64_word(replay.nonce))
        .update(&u64_word(replay.queue));
    hasher.finalize()
}

fn hash_invocation(invocation: &Invocation) -> Hash {
    let mut authority = Keccak256Hasher::new();
    for signed in &invocation.authority {
        authority.update(&hash_signed_delegation(signed));
    }

    let mut hasher = Keccak256Hasher::new();
    hasher
        .update(&keccak256(INVOCATION_TYPE))
        .update(&hash_target_action(&invocation.action))
        .update(&authority.finalize())
        .update(&hash_replay_protection(&invocation.replay_protection));
    hasher.finalize()
}

/// Signatures hash as their 65-byte `r || s || v` encoding.
fn hash_signature(signature: &RecoverableSignature) -> Hash {
    let mut bytes = [0u8; 65];
    bytes[..32].copy_from_slice(&signature.r);
    bytes[32..64].copy_from_slice(&signature.s);
    bytes[64] = signature.v;
    keccak256(&bytes)
}

/// Left-pad a 20-byte address to a 32-byte word.
fn address_word(address: &[u8; 20]) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(address);
    word
}

/// Big-endian u64 in a 32-byte word.
fn u64_word(value: u64) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[24..].copy_from_slice(&value.to_be_bytes());
    word
}
