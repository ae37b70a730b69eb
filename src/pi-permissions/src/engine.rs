//! The permission gate itself.

use std::path::PathBuf;

use pi_execpolicy::{classify, is_within_project, normalized_program, write_policy, WriteVerdict};
use pi_protocol::{AutonomyLevel, Severity, ToolCall, Verdict};
use pi_settings::{Scope, SettingsStore};
use tracing::{debug, warn};

use crate::oracle::ChoiceOracle;
use crate::session::SessionMemory;

/// Trivially safe programs allowed without classification, as long as the
/// raw command carries no chaining or substitution characters.
const ALWAYS_ALLOW_PROGRAMS: &[&str] = &[
    "ls", "pwd", "echo", "cat", "head", "tail", "wc", "which", "whoami", "date", "uname", "env",
    "printenv", "type", "file", "stat", "df", "du", "free", "uptime",
];

const OPTION_ALLOW_ONCE: &str = "Allow once";
const OPTION_ALWAYS_BLOCK: &str = "Always block";
const OPTION_BLOCK: &str = "Block";

/// Decision engine for one session.
///
/// Owns the settings handle and the session memory exclusively; callers
/// drive it one decision at a time.
pub struct PermissionGate {
    cwd: PathBuf,
    store: SettingsStore,
    session: SessionMemory,
    oracle: Option<Box<dyn ChoiceOracle>>,
    /// Level for this session when nothing is persisted yet.
    active_level: AutonomyLevel,
}

impl PermissionGate {
    /// Start a session: resolve the settings scope for `cwd`, load the
    /// level, and ask for one if nothing is stored and a UI exists.
    pub fn start(cwd: impl Into<PathBuf>, oracle: Option<Box<dyn ChoiceOracle>>) -> Self {
        let cwd = cwd.into();
        let store = match Scope::detect(&cwd) {
            Ok(scope) => SettingsStore::load(scope),
            Err(err) => {
                // No home directory: fall back to a throwaway global scope.
                warn!("settings scope detection failed: {err}");
                SettingsStore::load(Scope::Global(std::env::temp_dir()))
            }
        };
        Self::with_store(cwd, store, oracle)
    }

    /// Start a session over an already-loaded store.
    pub fn with_store(
        cwd: PathBuf,
        store: SettingsStore,
        oracle: Option<Box<dyn ChoiceOracle>>,
    ) -> Self {
        let mut gate = Self {
            cwd,
            store,
            session: SessionMemory::new(),
            oracle,
            active_level: AutonomyLevel::High,
        };
        gate.active_level = gate.initial_level();
        debug!(level = %gate.active_level, "session started");
        gate
    }

    /// The level decisions are made against right now. The environment
    /// override wins over anything stored or chosen.
    pub fn level(&self) -> AutonomyLevel {
        self.store.effective_level().unwrap_or(self.active_level)
    }

    /// Dispatch a host tool-call event.
    pub fn handle(&mut self, call: &ToolCall) -> Verdict {
        match call {
            ToolCall::Bash { command } => self.check_shell(command),
            ToolCall::Write { path } | ToolCall::Edit { path } => self.check_write(path),
            // Only shell and filesystem mutations are guarded.
            ToolCall::Other => Verdict::allow(),
        }
    }

    /// Decide a shell command.
    pub fn check_shell(&mut self, command: &str) -> Verdict {
        let command = command.trim();
        let level = self.level();

        if !level.blocks_denied() {
            // Bypassed skips every check; classification still runs so a
            // dangerous command at least leaves a trace.
            if classify(command).dangerous {
                self.notify(
                    &format!("Running dangerous command without prompt: {command}"),
                    Severity::Warning,
                );
            }
            debug!(command, "allowed (bypassed)");
            return Verdict::allow();
        }

        if shortcut_allows(command) {
            debug!(command, "allowed (shortcut)");
            return Verdict::allow();
        }

        let c = classify(command);
        debug!(
            command,
            level = %level,
            required = %c.required_level,
            dangerous = c.dangerous,
            "classified"
        );

        if c.dangerous {
            return self.confirm_dangerous(command);
        }

        if level.allows_arbitrary()
            || (level.allows_dev_ops() && c.required_level <= AutonomyLevel::Medium)
            || (level.allows_read_only() && c.required_level <= AutonomyLevel::Minimal)
        {
            return Verdict::allow();
        }

        let escalation = (c.required_level > level).then_some(c.required_level);
        self.confirm(
            &format!("Approval required ({}): {command}", c.required_level.label()),
            escalation,
        )
    }

    /// Decide a file write or edit.
    pub fn check_write(&mut self, path: &str) -> Verdict {
        let level = self.level();
        if !level.blocks_denied() {
            return Verdict::allow();
        }
        match write_policy(path, &self.cwd, level) {
            WriteVerdict::Allow | WriteVerdict::AllowWithProjectCheck => Verdict::allow(),
            WriteVerdict::PromptProtected => self.confirm(
                &format!("\u{26a0} Write to protected path: {path}"),
                (level < AutonomyLevel::High).then_some(AutonomyLevel::High),
            ),
            WriteVerdict::Prompt => {
                // Escalating to Low only helps for paths inside the
                // project; nothing short of Bypassed auto-allows the rest.
                let escalation = (is_within_project(path, &self.cwd)
                    && level < AutonomyLevel::Low)
                    .then_some(AutonomyLevel::Low);
                self.confirm(&format!("Approval required to write: {path}"), escalation)
            }
        }
    }

    /// Forget this session's "Always block" choices.
    pub fn clear_session_denials(&mut self) {
        self.session.clear();
    }

    /// Finalise the session. Settings are persisted synchronously on every
    /// change, so there is nothing left to flush.
    pub fn end(self) {
        debug!("session ended");
    }

    /// Load the stored level, or bootstrap one. With a UI and no stored
    /// level the user picks; the pick is persisted. Without a UI, or when
    /// the picker is dismissed, the session runs at High unpersisted.
    fn initial_level(&mut self) -> AutonomyLevel {
        if let Some(level) = self.store.stored_level() {
            return level;
        }
        let Some(oracle) = self.oracle.as_deref_mut() else {
            return AutonomyLevel::High;
        };
        let options: Vec<String> = AutonomyLevel::all()
            .iter()
            .map(|l| format!("{} - {}", l.label(), l.description()))
            .collect();
        let Some(choice) = oracle.select("Choose an autonomy level", &options) else {
            return AutonomyLevel::High;
        };
        let level = AutonomyLevel::all()
            .into_iter()
            .zip(&options)
            .find(|(_, option)| **option == choice)
            .map(|(level, _)| level)
            .unwrap_or(AutonomyLevel::High);
        self.store.set_level(level);
        self.notify(
            &format!(
                "Autonomy level set to {} (saved to {})",
                level.label(),
                self.store.scope().describe()
            ),
            Severity::Info,
        );
        level
    }

    /// Dangerous command prompt: allow once, block, or block for the whole
    /// session. Never offers escalation.
    fn confirm_dangerous(&mut self, command: &str) -> Verdict {
        if self.session.is_remembered_deny(command) {
            return Verdict::blocked("previously denied this session");
        }
        let Some(oracle) = self.oracle.as_deref_mut() else {
            return Verdict::blocked("dangerous command blocked (no UI)");
        };
        let options = vec![
            OPTION_ALLOW_ONCE.to_string(),
            OPTION_ALWAYS_BLOCK.to_string(),
            OPTION_BLOCK.to_string(),
        ];
        match oracle.select(&format!("\u{26a0} Dangerous command: {command}"), &options) {
            Some(choice) if choice == OPTION_ALLOW_ONCE => Verdict::allow(),
            Some(choice) if choice == OPTION_ALWAYS_BLOCK => {
                self.session.remember_deny(command);
                Verdict::blocked("blocked by user")
            }
            _ => Verdict::blocked("blocked by user"),
        }
    }

    /// Generic confirmation prompt, with an optional "Allow all" escalation
    /// to a target level.
    fn confirm(&mut self, title: &str, escalate_to: Option<AutonomyLevel>) -> Verdict {
        let escalate_option = escalate_to.map(|l| format!("Allow all ({})", l.label()));
        let Some(oracle) = self.oracle.as_deref_mut() else {
            return Verdict::blocked("approval required (no UI)");
        };
        let mut options = vec![OPTION_ALLOW_ONCE.to_string()];
        if let Some(option) = &escalate_option {
            options.push(option.clone());
        }
        options.push(OPTION_BLOCK.to_string());

        match oracle.select(title, &options) {
            Some(choice) if choice == OPTION_ALLOW_ONCE => Verdict::allow(),
            Some(choice) if escalate_option.as_deref() == Some(choice.as_str()) => {
                if let Some(target) = escalate_to {
                    self.escalate(target);
                }
                Verdict::allow()
            }
            _ => Verdict::blocked("blocked by user"),
        }
    }

    /// Raise the level for this session and persist it.
    fn escalate(&mut self, level: AutonomyLevel) {
        self.active_level = level;
        self.store.set_level(level);
        let message = format!(
            "Autonomy level escalated to {} (saved to {})",
            level.label(),
            self.store.scope().describe()
        );
        self.notify(&message, Severity::Info);
    }

    fn notify(&mut self, message: &str, severity: Severity) {
        if let Some(oracle) = self.oracle.as_deref_mut() {
            oracle.notify(message, severity);
        }
    }
}

/// The always-allow shortcut: a trivially safe program with no chaining or
/// substitution characters anywhere in the command.
fn shortcut_allows(command: &str) -> bool {
    if command.contains([';', '&', '|', '`']) || command.contains("$(") {
        return false;
    }
    let Some(first) = command.split_whitespace().next() else {
        return false;
    };
    ALWAYS_ALLOW_PROGRAMS.contains(&normalized_program(first).as_str())
}
