//! # Replay Protection
//!
//! Per-(invoker, queue) nonce bookkeeping. Queues are independent nonce
//! spaces; within one queue nonces may be consumed in any order, but each
//! (invoker, queue, nonce) slot is single-use forever. This trades strict
//! ordering for concurrency: unrelated action streams never block each
//! other, yet an executed invocation can never be replayed.
//!
//! Consumption is two-phase so that execution and replay-consumption commit
//! or unwind together: `stage` reserves a slot, then `commit` burns it or
//! `revert` releases it. Only committed slots survive in snapshots.

use shared_types::Address;
use std::collections::BTreeSet;
use std::io::{self, Read};
use thiserror::Error;

/// One (invoker, queue, nonce) triple.
type SlotKey = (Address, u64, u64);

/// Replay bookkeeping errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReplayError {
    /// The slot was consumed (or staged by an earlier invocation of the
    /// same submission) and can never be used again.
    #[error("replay slot (queue {queue}, nonce {nonce}) already consumed")]
    AlreadyConsumed {
        /// The queue identifier.
        queue: u64,
        /// The consumed nonce.
        nonce: u64,
    },
}

/// A staged reservation handed back to the caller. Must be passed to
/// [`ReplayTracker::commit`] or [`ReplayTracker::revert`]; dropping it
/// without either leaves the slot staged for the tracker's lifetime.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "staged slots must be committed or reverted"]
pub struct ReplaySlot {
    key: SlotKey,
}

/// Sparse consumed-set over (invoker, queue, nonce) with staged
/// reservations.
///
/// State grows monotonically with usage and is never pruned: a consumed
/// slot stays consumed for the lifetime of the protected resource.
#[derive(Debug, Default)]
pub struct ReplayTracker {
    consumed: BTreeSet<SlotKey>,
    staged: BTreeSet<SlotKey>,
}

/// Magic bytes for replay snapshots (includes format version).
const SNAPSHOT_MAGIC: &[u8; 8] = b"MNDRPLY\x01";

impl ReplayTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a slot. Fails if the slot was already consumed or is staged
    /// by an earlier invocation of the same submission.
    pub fn stage(
        &mut self,
        invoker: Address,
        queue: u64,
        nonce: u64,
    ) -> Result<ReplaySlot, ReplayError> {
        let key = (invoker, queue, nonce);
        if self.consumed.contains(&key) || !self.staged.insert(key) {
            return Err(ReplayError::AlreadyConsumed { queue, nonce });
        }
        Ok(ReplaySlot { key })
    }

    /// Burn a staged slot permanently.
    pub fn commit(&mut self, slot: ReplaySlot) {
        self.staged.remove(&slot.key);
        self.consumed.insert(slot.key);
    }

    /// Release a staged slot so it may be validly reused.
    pub fn revert(&mut self, slot: ReplaySlot) {
        self.staged.remove(&slot.key);
    }

    /// True if the slot has been committed.
    pub fn is_consumed(&self, invoker: &Address, queue: u64, nonce: u64) -> bool {
        self.consumed.contains(&(*invoker, queue, nonce))
    }

    /// Number of committed slots.
    pub fn consumed_len(&self) -> usize {
        self.consumed.len()
    }

    // =========================================================================
    // SNAPSHOTS
    // =========================================================================

    /// Serialize the committed slots for persistence.
    ///
    /// Format: [MAGIC][COUNT][ENTRY]... with entries sorted, so identical
    /// trackers always produce identical bytes. Staged reservations are
    /// transient and never persisted.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(16 + self.consumed.len() * 36);

        buf.extend_from_slice(SNAPSHOT_MAGIC);
        buf.extend_from_slice(&(self.consumed.len() as u64).to_le_bytes());

        for (invoker, queue, nonce) in &self.consumed {
            buf.extend_from_slice(invoker);
            buf.extend_from_slice(&queue.to_le_bytes());
            buf.extend_from_slice(&nonce.to_le_bytes());
        }

        buf
    }

    /// Restore a tracker from a snapshot produced by [`Self::serialize`].
    pub fn deserialize(data: &[u8]) -> io::Result<Self> {
        let mut reader = data;

        let mut magic = [0u8; 8];
        reader.read_exact(&mut magic)?;
        if &magic != SNAPSHOT_MAGIC {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "Invalid magic"));
        }

        let mut count_bytes = [0u8; 8];
        reader.read_exact(&mut count_bytes)?;
        let count = u64::from_le_bytes(count_bytes);

        let mut consumed = BTreeSet::new();
        for _ in 0..count {
            let mut invoker = [0u8; 20];
            reader.read_exact(&mut invoker)?;

            let mut queue_bytes = [0u8; 8];
            reader.read_exact(&mut queue_bytes)?;

            let mut nonce_bytes = [0u8; 8];
            reader.read_exact(&mut nonce_bytes)?;

            consumed.insert((
                invoker,
                u64::from_le_bytes(queue_bytes),
                u64::from_le_bytes(nonce_bytes),
            ));
        }

        Ok(Self {
            consumed,
            staged: BTreeSet::new(),
        })
    }
}
