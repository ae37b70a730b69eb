//! Protected-path policy for file writes.
//!
//! Decides whether a write to a path may proceed at a given autonomy level.
//! Protected names are matched as substrings of the tilde-expanded path;
//! project containment is a lexical prefix check after resolving relative
//! components against the working directory.

use std::path::{Component, Path, PathBuf};

use pi_protocol::AutonomyLevel;
use serde::Serialize;

/// Names and prefixes that must not be written at lower levels.
pub const PROTECTED_PATHS: &[&str] = &[
    ".env",
    ".env.local",
    ".env.production",
    ".git/",
    "node_modules/",
    "package-lock.json",
    "yarn.lock",
    "pnpm-lock.yaml",
];

/// Verdict for a file write at a given level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteVerdict {
    /// Allowed by the level alone.
    Allow,
    /// Allowed because the path is inside the project.
    AllowWithProjectCheck,
    /// Needs confirmation.
    Prompt,
    /// Needs confirmation; the path is protected.
    PromptProtected,
}

impl WriteVerdict {
    /// Whether the write may proceed without a prompt.
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow | Self::AllowWithProjectCheck)
    }
}

/// Decide whether writing `path` from `cwd` is allowed at `level`.
pub fn write_policy(path: &str, cwd: &Path, level: AutonomyLevel) -> WriteVerdict {
    write_policy_impl(path, cwd, level, dirs::home_dir().as_deref())
}

fn write_policy_impl(
    path: &str,
    cwd: &Path,
    level: AutonomyLevel,
    home: Option<&Path>,
) -> WriteVerdict {
    let expanded = expand_tilde(path, home);
    if is_protected_path(&expanded) {
        return if level.allows_arbitrary() {
            WriteVerdict::Allow
        } else {
            WriteVerdict::PromptProtected
        };
    }
    if level.allows_writes_in_project() && within_project(&expanded, cwd) {
        WriteVerdict::AllowWithProjectCheck
    } else {
        WriteVerdict::Prompt
    }
}

/// Check whether a path contains a protected name.
pub fn is_protected_path(path: &str) -> bool {
    let normalized = path.replace('\\', "/");
    PROTECTED_PATHS.iter().any(|p| normalized.contains(p))
}

/// Check whether `path` (tilde-expanded first) resolves inside `cwd`.
pub fn is_within_project(path: &str, cwd: &Path) -> bool {
    within_project(&expand_tilde(path, dirs::home_dir().as_deref()), cwd)
}

fn within_project(path: &str, cwd: &Path) -> bool {
    let absolute = if Path::new(path).is_absolute() {
        PathBuf::from(path)
    } else {
        cwd.join(path)
    };
    normalize(&absolute).starts_with(normalize(cwd))
}

/// Expand a leading `~` or `~/` with the user's home directory.
fn expand_tilde(path: &str, home: Option<&Path>) -> String {
    let Some(home) = home else {
        return path.to_string();
    };
    if path == "~" {
        return home.to_string_lossy().into_owned();
    }
    if let Some(rest) = path.strip_prefix("~/") {
        return home.join(rest).to_string_lossy().into_owned();
    }
    path.to_string()
}

/// Lexically resolve `.` and `..` components; no filesystem access.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}
