//! # Outbound Ports (Driven Ports / Collaborators)
//!
//! Traits implemented by the protected resource the engine executes
//! against.

use crate::domain::chain::RootAuthority;
use crate::domain::entities::ExecutionOutput;
use shared_types::{Address, TargetAction};
use thiserror::Error;

/// Failure reported by the protected resource for one action.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ResourceError(pub String);

/// The protected resource the engine fronts.
///
/// Contract:
/// - `apply` is called at most once per invocation per submission, only
///   after authorization and replay checks have passed, and must either
///   fully apply the action or fail without partial state change.
/// - Implementations must not perform replay checks of their own; that is
///   the engine's exclusive responsibility.
/// - `checkpoint`/`commit`/`revert` follow stack discipline: every
///   `checkpoint` is closed by exactly one `commit` (keep changes) or
///   `revert` (restore the checkpointed state). The engine uses these for
///   batch atomicity.
pub trait ResourceGateway: RootAuthority {
    /// Execute the action as `acting_identity`.
    fn apply(
        &mut self,
        action: &TargetAction,
        acting_identity: &Address,
    ) -> Result<ExecutionOutput, ResourceError>;

    /// Open a rollback point.
    fn checkpoint(&mut self);

    /// Close the innermost rollback point, keeping all changes since it.
    fn commit(&mut self);

    /// Close the innermost rollback point, restoring the state captured at
    /// `checkpoint`.
    fn revert(&mut self);
}
