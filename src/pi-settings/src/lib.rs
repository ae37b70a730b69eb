//! Two-scope settings store for the pi permission gate.
//!
//! The persisted autonomy level lives either with the project (inside a
//! source-controlled tree) or with the user (home directory). The file is a
//! small JSON object; keys this crate does not know are preserved across
//! rewrites so newer versions can share the file.

mod error;
mod scope;
mod store;

pub use error::{Result, SettingsError};
pub use scope::Scope;
pub use store::{SettingsStore, ENV_AUTONOMY_LEVEL};
