//! Engine-level recoverable errors.
//!
//! Capacity violations are deliberately not represented here: exceeding a
//! compile-time ceiling is a configuration error and terminates. Everything
//! a caller can reasonably recover from comes back as an [`EngineError`].

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid tag filter '{filter}': must be of the form '[tag]'")]
    InvalidTagFilter { filter: String },
    #[error("unknown reporter '{name}': expected console, teamcity, or json")]
    UnknownReporter { name: String },
}
