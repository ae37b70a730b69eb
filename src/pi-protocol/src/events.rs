//! Host event contract: tool-call payloads and gate verdicts.

use serde::{Deserialize, Serialize};

/// A tool invocation reported by the host runtime.
///
/// Only the shell and filesystem-mutation surfaces are guarded; any other
/// tool kind deserialises to [`ToolCall::Other`] and passes through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ToolCall {
    /// Shell command execution.
    Bash { command: String },
    /// File creation or overwrite.
    Write { path: String },
    /// In-place file edit.
    Edit { path: String },
    /// Any tool kind the gate does not guard.
    #[serde(other)]
    Other,
}

/// The gate's answer for a tool call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    /// Whether the host must refuse to run the tool call.
    pub block: bool,
    /// Human-readable reason, present when blocked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Verdict {
    /// Permit the tool call.
    pub fn allow() -> Self {
        Self {
            block: false,
            reason: None,
        }
    }

    /// Refuse the tool call with a reason.
    pub fn blocked(reason: impl Into<String>) -> Self {
        Self {
            block: true,
            reason: Some(reason.into()),
        }
    }

    /// Whether the verdict refuses execution.
    pub fn is_blocked(&self) -> bool {
        self.block
    }
}

/// Severity of a transient user notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}
