//! The UI capability consumed by the decision engine.

use pi_protocol::Severity;

/// A choice oracle: the engine's only window to the user.
///
/// `select` presents options and returns the chosen one, or `None` when the
/// user dismisses the prompt (treated as a block). Implementations live in
/// the host UI; tests substitute a scripted oracle.
pub trait ChoiceOracle {
    fn select(&mut self, title: &str, options: &[String]) -> Option<String>;

    fn notify(&mut self, message: &str, severity: Severity);
}
