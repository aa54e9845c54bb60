//! Cross-crate integration flows.


pub mod delegation_flow;
pub mod replay_protection;
