//! Autonomy levels.
//!
//! The level controls how much the agent can do without user confirmation:
//! - Minimal ("off"): read-only commands auto-approved
//! - Low: + file writes inside the project
//! - Medium: + dev-ops commands (installs, builds, tests)
//! - High: + arbitrary commands, still prompting for dangerous ones
//! - Bypassed: skip all permission checks (dangerous!)

use serde::{Deserialize, Serialize};

/// Autonomy level for the agent. Totally ordered, least to most permissive.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum AutonomyLevel {
    /// Read-only commands only; everything else prompts.
    #[serde(rename = "off")]
    Minimal,
    /// + file writes inside the project.
    Low,
    /// + dev-ops commands (installs, builds, tests).
    Medium,
    /// + arbitrary commands except the dangerous set.
    #[default]
    High,
    /// Skip all permission checks, including the dangerous set.
    Bypassed,
}

impl AutonomyLevel {
    /// All levels, least to most permissive.
    pub fn all() -> [Self; 5] {
        [
            Self::Minimal,
            Self::Low,
            Self::Medium,
            Self::High,
            Self::Bypassed,
        ]
    }

    /// Parse a level from its wire name, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "off" | "minimal" => Some(Self::Minimal),
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            "bypassed" => Some(Self::Bypassed),
            _ => None,
        }
    }

    /// Stable wire name (lowercase), as persisted in settings files.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Minimal => "off",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Bypassed => "bypassed",
        }
    }

    /// Human label for pickers and notifications.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Minimal => "Off",
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Bypassed => "Bypassed",
        }
    }

    /// One-line description for pickers.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Minimal => "Read-only commands run automatically, everything else asks",
            Self::Low => "Also write files inside the project",
            Self::Medium => "Also run installs, builds and tests",
            Self::High => "Run any command, asking only for dangerous ones",
            Self::Bypassed => "Skip all permission checks (dangerous!)",
        }
    }

    /// Read-only commands auto-approve at this level.
    pub fn allows_read_only(&self) -> bool {
        true
    }

    /// File writes inside the project auto-approve at this level.
    pub fn allows_writes_in_project(&self) -> bool {
        *self >= Self::Low
    }

    /// Dev-ops commands (installs, builds, tests) auto-approve at this level.
    pub fn allows_dev_ops(&self) -> bool {
        *self >= Self::Medium
    }

    /// Arbitrary commands auto-approve at this level.
    pub fn allows_arbitrary(&self) -> bool {
        *self >= Self::High
    }

    /// Dangerous commands still require confirmation at this level.
    pub fn blocks_denied(&self) -> bool {
        !matches!(self, Self::Bypassed)
    }
}

impl std::fmt::Display for AutonomyLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}
