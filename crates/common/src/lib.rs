//! Storefront Common Library
//!
//! Shared types and fixture loading for the storefront E2E suite.

pub mod error;
pub mod fixtures;
pub mod types;

// Re-export commonly used types
pub use error::{Error, Result};
pub use fixtures::FixtureStore;
pub use types::*;

/// Default fixture file, relative to the workspace root
pub fn default_fixtures_path() -> std::path::PathBuf {
    std::path::PathBuf::from("fixtures/users.json")
}

/// Default contact-form attachment
pub fn default_attachment_path() -> std::path::PathBuf {
    std::path::PathBuf::from("fixtures/Helloworld.txt")
}
