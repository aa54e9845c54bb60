//! # Inbound Ports (Driving Ports / API)
//!
//! Traits that define the public API of the engine.

use crate::domain::entities::{BatchResult, Environment};
use shared_types::SignedInvocationBatch;

/// Primary invocation-processing API.
///
/// Submission is serialized per protected-resource instance: replay-state
/// consumption and target-action execution are linearized relative to each
/// other, which is why submission takes `&mut self`.
pub trait InvocationApi {
    /// Authenticate, validate, and execute a signed invocation batch.
    ///
    /// Failure semantics are governed by the engine's
    /// [`BatchMode`](crate::domain::entities::BatchMode).
    fn submit(&mut self, batch: &SignedInvocationBatch, env: &Environment) -> BatchResult;
}
