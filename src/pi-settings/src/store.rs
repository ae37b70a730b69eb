//! Settings persistence.

use std::path::PathBuf;

use pi_protocol::AutonomyLevel;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::Result;
use crate::scope::{Scope, PROJECT_SETTINGS_DIR};

/// Environment variable overriding the stored level, for reads only.
pub const ENV_AUTONOMY_LEVEL: &str = "AUTONOMY_LEVEL";

/// JSON key holding the autonomy level.
const LEVEL_KEY: &str = "autonomyLevel";

/// Persisted settings for one scope.
///
/// Unknown top-level keys survive a rewrite untouched; only `autonomyLevel`
/// is interpreted.
#[derive(Debug)]
pub struct SettingsStore {
    scope: Scope,
    level: Option<AutonomyLevel>,
    extra: Map<String, Value>,
}

impl SettingsStore {
    /// Load the settings for a scope. A missing file is the "no settings
    /// yet" state; an unreadable or malformed file is treated the same way,
    /// with a warning.
    pub fn load(scope: Scope) -> Self {
        let path = scope.settings_path();
        let (level, extra) = match std::fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<Value>(&raw) {
                Ok(Value::Object(mut map)) => {
                    let level = map.remove(LEVEL_KEY).and_then(|v| {
                        let parsed = v.as_str().and_then(AutonomyLevel::parse);
                        if parsed.is_none() {
                            warn!(path = %path.display(), value = %v, "unrecognised autonomy level in settings");
                        }
                        parsed
                    });
                    (level, map)
                }
                Ok(other) => {
                    warn!(path = %path.display(), "settings file is not a JSON object: {other}");
                    (None, Map::new())
                }
                Err(err) => {
                    warn!(path = %path.display(), "unparseable settings file: {err}");
                    (None, Map::new())
                }
            },
            Err(_) => (None, Map::new()),
        };
        debug!(path = %path.display(), ?level, "settings loaded");
        Self {
            scope,
            level,
            extra,
        }
    }

    /// The scope this store persists to.
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Path of the backing settings file.
    pub fn path(&self) -> PathBuf {
        self.scope.settings_path()
    }

    /// The persisted level, ignoring the environment override.
    pub fn stored_level(&self) -> Option<AutonomyLevel> {
        self.level
    }

    /// The level reads should see: the environment override when present,
    /// otherwise the stored value.
    pub fn effective_level(&self) -> Option<AutonomyLevel> {
        env_override().or(self.level)
    }

    /// Set and persist the level. Persistence failures are logged and
    /// swallowed; the in-memory value updates regardless.
    pub fn set_level(&mut self, level: AutonomyLevel) {
        self.level = Some(level);
        if let Err(err) = self.save() {
            warn!(path = %self.path().display(), "failed to persist settings: {err}");
        }
    }

    fn save(&self) -> Result<()> {
        let path = self.path();
        let first_creation = !path.exists();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut map = self.extra.clone();
        if let Some(level) = self.level {
            map.insert(LEVEL_KEY.to_string(), Value::String(level.name().to_string()));
        }
        let mut contents = serde_json::to_string_pretty(&Value::Object(map))?;
        contents.push('\n');
        std::fs::write(&path, contents)?;
        debug!(path = %path.display(), "settings saved");

        if first_creation {
            if let Scope::Project(root) = &self.scope {
                exclude_settings_dir_from_git(root);
            }
        }
        Ok(())
    }
}

/// Read and parse the environment override.
fn env_override() -> Option<AutonomyLevel> {
    parse_override(std::env::var(ENV_AUTONOMY_LEVEL).ok().as_deref())
}

fn parse_override(raw: Option<&str>) -> Option<AutonomyLevel> {
    AutonomyLevel::parse(raw?)
}

/// Keep `.pi/` out of source control via the repository's local exclude
/// file, which is not shared with other clones. Best-effort: any failure is
/// logged and ignored.
fn exclude_settings_dir_from_git(root: &std::path::Path) {
    let Some(git_dir) = pi_utils_git::resolve_git_dir(root) else {
        return;
    };
    let exclude_path = git_dir.join("info").join("exclude");
    let entry = format!("{PROJECT_SETTINGS_DIR}/");

    let existing = std::fs::read_to_string(&exclude_path).unwrap_or_default();
    if existing.lines().any(|line| line.trim() == entry) {
        return;
    }

    let mut contents = existing;
    if !contents.is_empty() && !contents.ends_with('\n') {
        contents.push('\n');
    }
    contents.push_str(&entry);
    contents.push('\n');

    let Some(info_dir) = exclude_path.parent() else {
        return;
    };
    let result = std::fs::create_dir_all(info_dir)
        .and_then(|()| std::fs::write(&exclude_path, contents));
    match result {
        Ok(()) => debug!(path = %exclude_path.display(), "registered settings dir in local exclude"),
        Err(err) => {
            warn!(path = %exclude_path.display(), "could not update local exclude: {err}");
        }
    }
}
