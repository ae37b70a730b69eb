//! Settings scope: project-local or user-global.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Result, SettingsError};

/// Directory holding project-scope settings, relative to the repo root.
pub const PROJECT_SETTINGS_DIR: &str = ".pi";

/// Directory holding global settings, relative to the home directory.
pub const GLOBAL_SETTINGS_DIR: &str = ".pi/agent";

/// Settings file name, common to both scopes.
pub const SETTINGS_FILE: &str = "settings.json";

/// Where the settings file lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// `<root>/.pi/settings.json`, tied to a source-control root.
    Project(PathBuf),
    /// `<home>/.pi/agent/settings.json`.
    Global(PathBuf),
}

impl Scope {
    /// Pick the scope for a session starting in `cwd`: project when inside
    /// a git repository, global otherwise (including when the probe fails).
    pub fn detect(cwd: &Path) -> Result<Self> {
        if let Some(root) = pi_utils_git::repo_root(cwd) {
            debug!(root = %root.display(), "project settings scope");
            return Ok(Self::Project(root));
        }
        let home = dirs::home_dir().ok_or(SettingsError::HomeDirNotFound)?;
        debug!(home = %home.display(), "global settings scope");
        Ok(Self::Global(home))
    }

    /// Path of the settings file for this scope.
    pub fn settings_path(&self) -> PathBuf {
        match self {
            Self::Project(root) => root.join(PROJECT_SETTINGS_DIR).join(SETTINGS_FILE),
            Self::Global(home) => home.join(GLOBAL_SETTINGS_DIR).join(SETTINGS_FILE),
        }
    }

    /// Short description for notifications ("project settings" / "global
    /// settings").
    pub fn describe(&self) -> &'static str {
        match self {
            Self::Project(_) => "project settings",
            Self::Global(_) => "global settings",
        }
    }
}
