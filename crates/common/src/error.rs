//! Error types for the storefront suite

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using the common Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while loading fixtures
#[derive(Error, Debug)]
pub enum Error {
    #[error("Fixture load error ({}): {reason}", path.display())]
    FixtureLoad { path: PathBuf, reason: String },
}

impl Error {
    pub fn fixture(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::FixtureLoad {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
