//! Error types for E2E testing

use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error(transparent)]
    Common(#[from] storefront_common::Error),

    #[error("Element not found: {selector} (waited {timeout_ms} ms)")]
    ElementNotFound { selector: String, timeout_ms: u64 },

    #[error("Cannot {action} {selector}: {reason}")]
    Interaction {
        action: String,
        selector: String,
        reason: String,
    },

    #[error("Assertion failed: {0}")]
    AssertionFailed(String),

    #[error("Timeout waiting for: {0}")]
    Timeout(String),

    #[error("Playwright not found. Install with: npm install playwright && npx playwright install")]
    PlaywrightNotFound,

    #[error("Playwright error: {0}")]
    Playwright(String),

    #[error("Bridge protocol error: {0}")]
    BridgeProtocol(String),

    #[error("Site unreachable after {0} attempts")]
    SiteUnreachable(usize),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl E2eError {
    /// Stable label used in result files and the HTML report
    pub fn kind(&self) -> &'static str {
        match self {
            E2eError::Common(storefront_common::Error::FixtureLoad { .. }) => "fixture_load",
            E2eError::ElementNotFound { .. } => "element_not_found",
            E2eError::Interaction { .. } => "interaction",
            E2eError::AssertionFailed(_) => "assertion",
            E2eError::Timeout(_) => "timeout",
            E2eError::PlaywrightNotFound | E2eError::Playwright(_) => "playwright",
            E2eError::BridgeProtocol(_) => "bridge_protocol",
            E2eError::SiteUnreachable(_) => "site_unreachable",
            E2eError::InvalidConfig(_) => "invalid_config",
            E2eError::Io(_) => "io",
            E2eError::Json(_) => "json",
            E2eError::Yaml(_) => "yaml",
            E2eError::Http(_) => "http",
        }
    }

    pub(crate) fn interaction(
        action: &str,
        selector: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        E2eError::Interaction {
            action: action.to_string(),
            selector: selector.to_string(),
            reason: reason.into(),
        }
    }
}

pub type E2eResult<T> = Result<T, E2eError>;
