//! Tests for the permission gate decision engine.
//!
//! Coverage:
//! 1. Auto-allow shortcut and classification ladder
//! 2. Dangerous command prompts and session memory
//! 3. Escalation, persistence, and notifications
//! 4. Write/edit flow over the protected-path policy
//! 5. Session bootstrap with and without a UI

use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::Path;
use std::rc::Rc;

use pi_protocol::{AutonomyLevel, Severity, ToolCall, Verdict};
use pi_settings::{Scope, SettingsStore};

use super::*;

// ============================================================================
// Scripted oracle
// ============================================================================

#[derive(Debug, Clone, Copy)]
enum Answer {
    /// Pick the option starting with this text.
    Pick(&'static str),
    /// Dismiss the prompt.
    Dismiss,
}

#[derive(Default)]
struct OracleState {
    answers: VecDeque<Answer>,
    prompts: Vec<(String, Vec<String>)>,
    notifications: Vec<(String, Severity)>,
}

/// Test oracle with a pre-scripted answer per expected prompt.
#[derive(Clone, Default)]
struct ScriptedOracle(Rc<RefCell<OracleState>>);

impl ScriptedOracle {
    fn answering(answers: &[Answer]) -> Self {
        let oracle = Self::default();
        oracle.0.borrow_mut().answers = answers.iter().copied().collect();
        oracle
    }

    fn prompts(&self) -> Vec<(String, Vec<String>)> {
        self.0.borrow().prompts.clone()
    }

    fn notifications(&self) -> Vec<(String, Severity)> {
        self.0.borrow().notifications.clone()
    }
}

impl ChoiceOracle for ScriptedOracle {
    fn select(&mut self, title: &str, options: &[String]) -> Option<String> {
        let mut state = self.0.borrow_mut();
        state.prompts.push((title.to_string(), options.to_vec()));
        match state.answers.pop_front() {
            Some(Answer::Pick(prefix)) => options.iter().find(|o| o.starts_with(prefix)).cloned(),
            Some(Answer::Dismiss) | None => None,
        }
    }

    fn notify(&mut self, message: &str, severity: Severity) {
        self.0.borrow_mut().notifications.push((message.to_string(), severity));
    }
}

fn store_at(dir: &Path, level: AutonomyLevel) -> SettingsStore {
    let mut store = SettingsStore::load(Scope::Project(dir.to_path_buf()));
    store.set_level(level);
    store
}

fn gate_at(dir: &Path, level: AutonomyLevel, oracle: &ScriptedOracle) -> PermissionGate {
    PermissionGate::with_store(
        dir.to_path_buf(),
        store_at(dir, level),
        Some(Box::new(oracle.clone())),
    )
}

fn gate_without_ui(dir: &Path, level: AutonomyLevel) -> PermissionGate {
    PermissionGate::with_store(dir.to_path_buf(), store_at(dir, level), None)
}

// ============================================================================
// Shell flow
// ============================================================================

mod shell_flow {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_shortcut_allows_without_prompt() {
        let dir = tempfile::tempdir().unwrap();
        let oracle = ScriptedOracle::default();
        let mut gate = gate_at(dir.path(), AutonomyLevel::Low, &oracle);

        assert_eq!(gate.check_shell("ls"), Verdict::allow());
        assert_eq!(gate.check_shell("cat README.md"), Verdict::allow());
        assert!(oracle.prompts().is_empty());
    }

    #[test]
    fn test_shortcut_refuses_chaining_characters() {
        let dir = tempfile::tempdir().unwrap();
        let oracle = ScriptedOracle::answering(&[Answer::Dismiss]);
        let mut gate = gate_at(dir.path(), AutonomyLevel::Minimal, &oracle);

        // `echo` alone is a shortcut; with a substitution it must go
        // through classification, which sends it to a prompt at Minimal.
        assert_eq!(gate.check_shell("echo hi"), Verdict::allow());
        assert!(gate.check_shell("echo $(whoami)").is_blocked());
        assert_eq!(oracle.prompts().len(), 1);
    }

    #[test]
    fn test_auto_allow_ladder() {
        let dir = tempfile::tempdir().unwrap();

        // Minimal allows read-only classifications.
        let mut gate = gate_without_ui(dir.path(), AutonomyLevel::Minimal);
        assert_eq!(gate.check_shell("git status"), Verdict::allow());
        assert!(gate.check_shell("npm install").is_blocked());

        // Medium allows dev-ops.
        let mut gate = gate_without_ui(dir.path(), AutonomyLevel::Medium);
        assert_eq!(gate.check_shell("npm install"), Verdict::allow());
        assert!(gate.check_shell("git push").is_blocked());

        // High allows arbitrary commands.
        let mut gate = gate_without_ui(dir.path(), AutonomyLevel::High);
        assert_eq!(gate.check_shell("git push"), Verdict::allow());
        assert_eq!(gate.check_shell("frobnicate"), Verdict::allow());
    }

    #[test]
    fn test_prompt_allow_once_does_not_change_level() {
        let dir = tempfile::tempdir().unwrap();
        let oracle = ScriptedOracle::answering(&[Answer::Pick("Allow once")]);
        let mut gate = gate_at(dir.path(), AutonomyLevel::Low, &oracle);

        assert_eq!(gate.check_shell("npm install"), Verdict::allow());
        assert_eq!(gate.level(), AutonomyLevel::Low);

        let (_, options) = &oracle.prompts()[0];
        assert_eq!(
            options,
            &vec![
                "Allow once".to_string(),
                "Allow all (Medium)".to_string(),
                "Block".to_string()
            ]
        );
    }

    #[test]
    fn test_escalation_persists_and_notifies() {
        let dir = tempfile::tempdir().unwrap();
        let oracle = ScriptedOracle::answering(&[Answer::Pick("Allow all (Medium)")]);
        let mut gate = gate_at(dir.path(), AutonomyLevel::Low, &oracle);

        assert_eq!(gate.check_shell("npm install"), Verdict::allow());
        assert_eq!(gate.level(), AutonomyLevel::Medium);

        // Visible to subsequent calls without further prompting.
        assert_eq!(gate.check_shell("cargo build"), Verdict::allow());
        assert_eq!(oracle.prompts().len(), 1);

        // And persisted.
        let reloaded = SettingsStore::load(Scope::Project(dir.path().to_path_buf()));
        assert_eq!(reloaded.stored_level(), Some(AutonomyLevel::Medium));

        let notifications = oracle.notifications();
        assert_eq!(notifications.len(), 1);
        assert!(notifications[0].0.contains("Medium"));
        assert_eq!(notifications[0].1, Severity::Info);
    }

    #[test]
    fn test_dismissed_prompt_blocks() {
        let dir = tempfile::tempdir().unwrap();
        let oracle = ScriptedOracle::answering(&[Answer::Dismiss]);
        let mut gate = gate_at(dir.path(), AutonomyLevel::Low, &oracle);

        assert!(gate.check_shell("npm install").is_blocked());
        assert_eq!(gate.level(), AutonomyLevel::Low);
    }

    #[test]
    fn test_prompt_without_ui_blocks() {
        let dir = tempfile::tempdir().unwrap();
        let mut gate = gate_without_ui(dir.path(), AutonomyLevel::Low);

        let verdict = gate.check_shell("npm install");
        assert!(verdict.is_blocked());
        assert!(verdict.reason.unwrap().contains("no UI"));
    }
}

// ============================================================================
// Dangerous commands
// ============================================================================

mod dangerous_flow {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_dangerous_prompts_even_at_high() {
        let dir = tempfile::tempdir().unwrap();
        let oracle = ScriptedOracle::answering(&[Answer::Pick("Allow once")]);
        let mut gate = gate_at(dir.path(), AutonomyLevel::High, &oracle);

        assert_eq!(gate.check_shell("rm -rf build"), Verdict::allow());

        let (title, options) = &oracle.prompts()[0];
        assert!(title.starts_with('\u{26a0}'), "warning glyph in {title}");
        assert_eq!(
            options,
            &vec![
                "Allow once".to_string(),
                "Always block".to_string(),
                "Block".to_string()
            ]
        );
    }

    #[test]
    fn test_always_block_is_remembered() {
        let dir = tempfile::tempdir().unwrap();
        let oracle = ScriptedOracle::answering(&[Answer::Pick("Always block")]);
        let mut gate = gate_at(dir.path(), AutonomyLevel::High, &oracle);

        let first = gate.check_shell("rm -rf build");
        assert!(first.is_blocked());
        assert_eq!(first.reason.as_deref(), Some("blocked by user"));

        // Second attempt blocks without consulting the oracle again.
        let second = gate.check_shell("rm -rf build");
        assert!(second.is_blocked());
        assert_eq!(second.reason.as_deref(), Some("previously denied this session"));
        assert_eq!(oracle.prompts().len(), 1);

        // Clearing the session memory re-prompts; the script is exhausted,
        // so the prompt is dismissed and blocks.
        gate.clear_session_denials();
        assert!(gate.check_shell("rm -rf build").is_blocked());
        assert_eq!(oracle.prompts().len(), 2);
    }

    #[test]
    fn test_dangerous_without_ui_blocks() {
        let dir = tempfile::tempdir().unwrap();
        let mut gate = gate_without_ui(dir.path(), AutonomyLevel::High);

        let verdict = gate.check_shell("sudo make install");
        assert!(verdict.is_blocked());
        assert!(verdict.reason.unwrap().contains("no UI"));
    }

    #[test]
    fn test_bypassed_allows_dangerous_without_prompt() {
        let dir = tempfile::tempdir().unwrap();
        let oracle = ScriptedOracle::default();
        let mut gate = gate_at(dir.path(), AutonomyLevel::Bypassed, &oracle);

        assert_eq!(gate.check_shell("rm -rf build"), Verdict::allow());
        assert!(oracle.prompts().is_empty());
        // A warning notification is still surfaced.
        let notifications = oracle.notifications();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].1, Severity::Warning);
    }
}

// ============================================================================
// Write flow
// ============================================================================

mod write_flow {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_project_writes_allowed_from_low() {
        let dir = tempfile::tempdir().unwrap();
        let oracle = ScriptedOracle::default();
        let mut gate = gate_at(dir.path(), AutonomyLevel::Low, &oracle);

        let path = dir.path().join("src/main.rs");
        assert_eq!(gate.check_write(path.to_str().unwrap()), Verdict::allow());
        assert!(oracle.prompts().is_empty());
    }

    #[test]
    fn test_minimal_write_prompts_with_low_escalation() {
        let dir = tempfile::tempdir().unwrap();
        let oracle = ScriptedOracle::answering(&[Answer::Pick("Allow once")]);
        let mut gate = gate_at(dir.path(), AutonomyLevel::Minimal, &oracle);

        let path = dir.path().join("src/foo.ts");
        assert_eq!(gate.check_write(path.to_str().unwrap()), Verdict::allow());
        assert_eq!(gate.level(), AutonomyLevel::Minimal);

        let (_, options) = &oracle.prompts()[0];
        assert!(options.contains(&"Allow all (Low)".to_string()));
    }

    #[test]
    fn test_protected_write_prompts_with_high_escalation() {
        let dir = tempfile::tempdir().unwrap();
        let oracle = ScriptedOracle::answering(&[Answer::Pick("Allow all (High)")]);
        let mut gate = gate_at(dir.path(), AutonomyLevel::Medium, &oracle);

        let path = dir.path().join(".env");
        assert_eq!(gate.check_write(path.to_str().unwrap()), Verdict::allow());
        assert_eq!(gate.level(), AutonomyLevel::High);

        let (title, _) = &oracle.prompts()[0];
        assert!(title.starts_with('\u{26a0}'));

        let reloaded = SettingsStore::load(Scope::Project(dir.path().to_path_buf()));
        assert_eq!(reloaded.stored_level(), Some(AutonomyLevel::High));
    }

    #[test]
    fn test_protected_write_allowed_at_high() {
        let dir = tempfile::tempdir().unwrap();
        let oracle = ScriptedOracle::default();
        let mut gate = gate_at(dir.path(), AutonomyLevel::High, &oracle);

        let path = dir.path().join(".env");
        assert_eq!(gate.check_write(path.to_str().unwrap()), Verdict::allow());
        assert!(oracle.prompts().is_empty());
    }

    #[test]
    fn test_write_outside_project_has_no_escalation_option() {
        let dir = tempfile::tempdir().unwrap();
        let oracle = ScriptedOracle::answering(&[Answer::Dismiss]);
        let mut gate = gate_at(dir.path(), AutonomyLevel::Low, &oracle);

        assert!(gate.check_write("/etc/hosts").is_blocked());
        let (_, options) = &oracle.prompts()[0];
        assert_eq!(options, &vec!["Allow once".to_string(), "Block".to_string()]);
    }

    #[test]
    fn test_bypassed_writes_anywhere() {
        let dir = tempfile::tempdir().unwrap();
        let mut gate = gate_without_ui(dir.path(), AutonomyLevel::Bypassed);
        assert_eq!(gate.check_write("/etc/hosts"), Verdict::allow());
        assert_eq!(
            gate.check_write(dir.path().join(".env").to_str().unwrap()),
            Verdict::allow()
        );
    }
}

// ============================================================================
// Tool-call dispatch and session bootstrap
// ============================================================================

mod session_lifecycle {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_handle_dispatches_by_kind() {
        let dir = tempfile::tempdir().unwrap();
        let mut gate = gate_without_ui(dir.path(), AutonomyLevel::Minimal);

        assert_eq!(
            gate.handle(&ToolCall::Bash {
                command: "ls".to_string()
            }),
            Verdict::allow()
        );
        assert!(gate
            .handle(&ToolCall::Write {
                path: "src/a.rs".to_string()
            })
            .is_blocked());
        assert!(gate
            .handle(&ToolCall::Edit {
                path: "src/a.rs".to_string()
            })
            .is_blocked());
        // Unguarded tool kinds pass through.
        assert_eq!(gate.handle(&ToolCall::Other), Verdict::allow());
    }

    #[test]
    fn test_bootstrap_prompts_for_initial_level() {
        let dir = tempfile::tempdir().unwrap();
        let oracle = ScriptedOracle::answering(&[Answer::Pick("Medium")]);
        let store = SettingsStore::load(Scope::Project(dir.path().to_path_buf()));
        let gate = PermissionGate::with_store(
            dir.path().to_path_buf(),
            store,
            Some(Box::new(oracle.clone())),
        );

        assert_eq!(gate.level(), AutonomyLevel::Medium);
        let (title, options) = &oracle.prompts()[0];
        assert_eq!(title, "Choose an autonomy level");
        assert_eq!(options.len(), 5);

        let reloaded = SettingsStore::load(Scope::Project(dir.path().to_path_buf()));
        assert_eq!(reloaded.stored_level(), Some(AutonomyLevel::Medium));
    }

    #[test]
    fn test_bootstrap_dismissal_defaults_to_high_unpersisted() {
        let dir = tempfile::tempdir().unwrap();
        let oracle = ScriptedOracle::answering(&[Answer::Dismiss]);
        let store = SettingsStore::load(Scope::Project(dir.path().to_path_buf()));
        let gate = PermissionGate::with_store(
            dir.path().to_path_buf(),
            store,
            Some(Box::new(oracle.clone())),
        );

        assert_eq!(gate.level(), AutonomyLevel::High);
        let reloaded = SettingsStore::load(Scope::Project(dir.path().to_path_buf()));
        assert_eq!(reloaded.stored_level(), None);
    }

    #[test]
    fn test_bootstrap_without_ui_defaults_to_high() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::load(Scope::Project(dir.path().to_path_buf()));
        let gate = PermissionGate::with_store(dir.path().to_path_buf(), store, None);

        assert_eq!(gate.level(), AutonomyLevel::High);
        let reloaded = SettingsStore::load(Scope::Project(dir.path().to_path_buf()));
        assert_eq!(reloaded.stored_level(), None);
    }

    #[test]
    fn test_stored_level_skips_bootstrap_prompt() {
        let dir = tempfile::tempdir().unwrap();
        let oracle = ScriptedOracle::default();
        let gate = gate_at(dir.path(), AutonomyLevel::Low, &oracle);

        assert_eq!(gate.level(), AutonomyLevel::Low);
        assert!(oracle.prompts().is_empty());
    }
}
