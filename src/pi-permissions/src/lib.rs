//! Decision engine for the pi permission gate.
//!
//! [`PermissionGate`] turns tool-call events from the host runtime into
//! allow/block verdicts, combining the pure classifier, the persisted
//! autonomy level, per-session memory of denials, and an injected UI
//! capability for confirmation prompts. One gate instance serves one
//! session; decisions are sequential and an escalation applied during one
//! call is visible to all subsequent calls.

#[cfg(test)]
mod tests;

mod engine;
mod oracle;
mod session;

pub use engine::PermissionGate;
pub use oracle::ChoiceOracle;
pub use session::SessionMemory;

// Wire types, re-exported for host convenience.
pub use pi_protocol::{AutonomyLevel, Severity, ToolCall, Verdict};
