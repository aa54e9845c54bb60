//! Engine-local value types: ambient environment, configuration, and
//! submission results.

use super::errors::DenyReason;

/// Output bytes returned by the protected resource for one executed action.
pub type ExecutionOutput = Vec<u8>;

/// Ambient facts at submission time.
///
/// Enforcers are pure policy over their terms and this context; nothing
/// else about the outside world is observable from inside validation, which
/// keeps chain validation reproducible and auditable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Environment {
    /// Current block (or epoch) height of the deployment.
    pub height: u64,
}

/// Failure semantics for a multi-invocation batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchMode {
    /// All invocations succeed or the whole batch is rolled back: resource
    /// state, replay slots, and enforcer post-hooks all unwind together.
    #[default]
    Atomic,
    /// Each invocation commits or fails independently; partial success is
    /// allowed and reported per invocation.
    Independent,
}

/// Default bound on authority chain length.
pub const DEFAULT_MAX_CHAIN_DEPTH: usize = 64;

/// Engine configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Batch failure semantics. See [`BatchMode`].
    pub batch_mode: BatchMode,
    /// Upper bound on accepted authority chain length (adversarial-input
    /// hardening; legitimate chains are short).
    pub max_chain_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            batch_mode: BatchMode::Atomic,
            max_chain_depth: DEFAULT_MAX_CHAIN_DEPTH,
        }
    }
}

/// Result of submitting a signed invocation batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchResult {
    /// Every invocation executed; outputs in batch order.
    AllSucceeded(Vec<ExecutionOutput>),
    /// Processing stopped at `index`; in [`BatchMode::Atomic`] everything
    /// the batch had done so far was rolled back.
    Failed {
        /// Index of the invocation that failed.
        index: usize,
        /// Why it failed.
        reason: DenyReason,
    },
    /// [`BatchMode::Independent`] only: at least one invocation failed;
    /// per-invocation outcomes in batch order.
    PartialSuccess(Vec<Result<ExecutionOutput, DenyReason>>),
}

impl BatchResult {
    /// True if every invocation in the batch executed.
    pub fn is_success(&self) -> bool {
        matches!(self, BatchResult::AllSucceeded(_))
    }
}
