//! Error types for the command classifier.

use thiserror::Error;

/// Errors from the shell tokenizer.
///
/// These never propagate past classification: the classifier treats any
/// parse failure as a shell trick and attributes the highest level.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Nothing but whitespace or comments.
    #[error("empty command")]
    EmptyCommand,

    /// A single or double quote was never closed.
    #[error("unterminated quote")]
    UnterminatedQuote,

    /// The command ends in an escaping backslash.
    #[error("trailing backslash")]
    TrailingBackslash,

    /// A redirection operator without a target.
    #[error("redirection missing target")]
    MissingRedirectTarget,

    /// A chain operator with no command before or after it.
    #[error("dangling operator")]
    DanglingOperator,

    /// Syntax this tokenizer does not model (e.g. heredocs).
    #[error("unsupported shell syntax")]
    UnsupportedSyntax,
}
