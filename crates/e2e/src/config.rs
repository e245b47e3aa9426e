//! Suite configuration
//!
//! Defaults cover a plain run against the public storefront. A YAML file can
//! override any subset of fields, and command-line flags override the file.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{E2eError, E2eResult};
use crate::expect::WaitConfig;
use crate::playwright::{Browser, PlaywrightConfig};
use crate::runner::RunnerConfig;
use crate::site::DEFAULT_BASE_URL;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuiteConfig {
    pub base_url: String,
    pub fixtures_path: PathBuf,
    pub attachment_path: PathBuf,
    pub contact_subject: String,
    pub contact_message: String,
    pub output_dir: PathBuf,
    pub report_title: String,

    pub browser: Browser,
    pub headless: bool,
    pub viewport: Viewport,

    pub element_timeout_ms: u64,
    pub assertion_timeout_ms: u64,
    pub poll_interval_ms: u64,
    pub scenario_timeout_ms: u64,
    pub preflight_timeout_ms: u64,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            fixtures_path: storefront_common::default_fixtures_path(),
            attachment_path: storefront_common::default_attachment_path(),
            contact_subject: "Test Subject".to_string(),
            contact_message: "Automated contact form check.".to_string(),
            output_dir: PathBuf::from("test-results"),
            report_title: "AutomationExercise E2E Report".to_string(),
            browser: Browser::Chromium,
            headless: true,
            viewport: Viewport::default(),
            element_timeout_ms: 4_000,
            assertion_timeout_ms: 4_000,
            poll_interval_ms: 100,
            scenario_timeout_ms: 120_000,
            preflight_timeout_ms: 30_000,
        }
    }
}

impl SuiteConfig {
    /// Parse a config from YAML; missing fields keep their defaults
    pub fn from_yaml(yaml: &str) -> E2eResult<Self> {
        serde_yaml::from_str(yaml).map_err(E2eError::from)
    }

    pub fn from_file(path: &Path) -> E2eResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Reject settings the suite cannot run with
    pub fn validate(&self) -> E2eResult<()> {
        let url = url::Url::parse(&self.base_url)
            .map_err(|e| E2eError::InvalidConfig(format!("base_url {:?}: {}", self.base_url, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(E2eError::InvalidConfig(format!(
                "base_url must be http or https, got {}",
                url.scheme()
            )));
        }

        let timeouts = [
            ("element_timeout_ms", self.element_timeout_ms),
            ("assertion_timeout_ms", self.assertion_timeout_ms),
            ("poll_interval_ms", self.poll_interval_ms),
            ("scenario_timeout_ms", self.scenario_timeout_ms),
            ("preflight_timeout_ms", self.preflight_timeout_ms),
        ];
        for (name, value) in timeouts {
            if value == 0 {
                return Err(E2eError::InvalidConfig(format!("{} must be greater than 0", name)));
            }
        }

        if self.poll_interval_ms > self.assertion_timeout_ms {
            return Err(E2eError::InvalidConfig(format!(
                "poll_interval_ms ({}) exceeds assertion_timeout_ms ({})",
                self.poll_interval_ms, self.assertion_timeout_ms
            )));
        }

        if self.viewport.width == 0 || self.viewport.height == 0 {
            return Err(E2eError::InvalidConfig("viewport must be non-empty".to_string()));
        }

        Ok(())
    }

    pub fn wait(&self) -> WaitConfig {
        WaitConfig::new(
            Duration::from_millis(self.assertion_timeout_ms),
            Duration::from_millis(self.poll_interval_ms),
        )
    }

    pub fn preflight_timeout(&self) -> Duration {
        Duration::from_millis(self.preflight_timeout_ms)
    }

    pub fn playwright(&self) -> PlaywrightConfig {
        PlaywrightConfig {
            browser: self.browser,
            headless: self.headless,
            viewport_width: self.viewport.width,
            viewport_height: self.viewport.height,
            element_timeout: Duration::from_millis(self.element_timeout_ms),
            ..Default::default()
        }
    }

    pub fn runner(&self) -> RunnerConfig {
        RunnerConfig {
            output_dir: self.output_dir.clone(),
            scenario_timeout: Duration::from_millis(self.scenario_timeout_ms),
            report_title: self.report_title.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_defaults_are_valid() {
        let config = SuiteConfig::default();
        config.validate().unwrap();
        assert_eq!(config.base_url, "https://automationexercise.com");
        assert_eq!(config.wait().timeout, Duration::from_secs(4));
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = r#"
base_url: http://localhost:8080
browser: firefox
viewport:
  width: 1920
  height: 1080
element_timeout_ms: 8000
"#;
        let config = SuiteConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.base_url, "http://localhost:8080");
        assert_eq!(config.browser, Browser::Firefox);
        assert_eq!(config.viewport.width, 1920);
        assert_eq!(config.element_timeout_ms, 8000);
        assert_eq!(config.report_title, "AutomationExercise E2E Report");
        assert!(config.headless);

        let playwright = config.playwright();
        assert_eq!(playwright.element_timeout, Duration::from_secs(8));
        assert_eq!(playwright.viewport_height, 1080);
    }

    #[test]
    fn test_unknown_browser_is_a_yaml_error() {
        let err = SuiteConfig::from_yaml("browser: netscape").unwrap_err();
        assert!(matches!(err, E2eError::Yaml(_)));
    }

    #[test_case("base_url", "not a url" ; "unparsable url")]
    #[test_case("base_url", "ftp://example.com" ; "wrong scheme")]
    #[test_case("element_timeout_ms", "0" ; "zero element timeout")]
    #[test_case("scenario_timeout_ms", "0" ; "zero scenario timeout")]
    #[test_case("poll_interval_ms", "10000" ; "poll longer than assertion")]
    #[test_case("viewport", "{ width: 0, height: 720 }" ; "empty viewport")]
    fn test_invalid_config(field: &str, value: &str) {
        let config = SuiteConfig::from_yaml(&format!("{}: {}", field, value)).unwrap();
        assert!(matches!(config.validate(), Err(E2eError::InvalidConfig(_))));
    }
}
