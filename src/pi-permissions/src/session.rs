//! Per-session memory of denied commands.

use std::collections::HashSet;

/// Commands the user chose "Always block" for during this session.
///
/// Transient by design: nothing here is persisted, and a new session starts
/// empty. Consulted only for commands already classified as dangerous.
#[derive(Debug, Default)]
pub struct SessionMemory {
    denied: HashSet<String>,
}

impl SessionMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a command the user wants blocked for the rest of the session.
    pub fn remember_deny(&mut self, command: &str) {
        self.denied.insert(command.to_string());
    }

    /// Whether the user already blocked this exact command.
    pub fn is_remembered_deny(&self, command: &str) -> bool {
        self.denied.contains(command)
    }

    /// Forget all remembered denials.
    pub fn clear(&mut self) {
        self.denied.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remember_and_clear() {
        let mut memory = SessionMemory::new();
        assert!(!memory.is_remembered_deny("rm -rf build"));

        memory.remember_deny("rm -rf build");
        assert!(memory.is_remembered_deny("rm -rf build"));
        assert!(!memory.is_remembered_deny("rm -rf dist"));

        memory.clear();
        assert!(!memory.is_remembered_deny("rm -rf build"));
    }
}
