//! Shared wire types for the pi permission gate.
//!
//! These types cross process boundaries: the autonomy level is persisted in
//! settings files and read from the environment, and the host runtime
//! exchanges tool-call events and verdicts with the gate. Everything here is
//! plain data with stable serde names.

mod events;
mod level;

pub use events::{Severity, ToolCall, Verdict};
pub use level::AutonomyLevel;
