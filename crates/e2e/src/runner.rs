//! Scenario runner: executes scenarios in order and records results

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::driver::PageDriver;
use crate::error::{E2eError, E2eResult};
use crate::report;
use crate::scenarios::{Scenario, ScenarioContext};

/// Result of running a single scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub name: String,
    pub tags: Vec<String>,
    pub success: bool,
    pub duration_ms: u64,
    pub error: Option<String>,
    pub error_kind: Option<String>,
    pub screenshot_path: Option<PathBuf>,
    pub screenshot_sha256: Option<String>,
}

/// Result of running a set of scenarios
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuiteResult {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub duration_ms: u64,
    pub started_at: DateTime<Utc>,
    pub results: Vec<ScenarioResult>,
}

impl SuiteResult {
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }

    /// (name, success) pairs in run order
    pub fn outcomes(&self) -> Vec<(&str, bool)> {
        self.results
            .iter()
            .map(|r| (r.name.as_str(), r.success))
            .collect()
    }
}

/// Configuration for the scenario runner
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub output_dir: PathBuf,
    pub scenario_timeout: Duration,
    pub report_title: String,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("test-results"),
            scenario_timeout: Duration::from_secs(120),
            report_title: "AutomationExercise E2E Report".to_string(),
        }
    }
}

/// Runs scenarios one at a time against a single driver
pub struct ScenarioRunner<D: PageDriver> {
    driver: D,
    context: ScenarioContext,
    config: RunnerConfig,
}

impl<D: PageDriver> ScenarioRunner<D> {
    pub fn new(driver: D, context: ScenarioContext, config: RunnerConfig) -> Self {
        Self {
            driver,
            context,
            config,
        }
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    pub fn into_driver(self) -> D {
        self.driver
    }

    pub async fn run_all(&mut self) -> SuiteResult {
        self.run_scenarios(&Scenario::ALL).await
    }

    /// Run scenarios carrying `tag`
    pub async fn run_tagged(&mut self, tag: &str) -> SuiteResult {
        let filtered: Vec<Scenario> = Scenario::ALL
            .into_iter()
            .filter(|s| s.tags().contains(&tag))
            .collect();
        self.run_scenarios(&filtered).await
    }

    /// Run the named scenarios, in the order given
    pub async fn run_named(&mut self, names: &[String]) -> E2eResult<SuiteResult> {
        let scenarios = names
            .iter()
            .map(|name| {
                Scenario::from_name(name)
                    .ok_or_else(|| E2eError::InvalidConfig(format!("Scenario not found: {}", name)))
            })
            .collect::<E2eResult<Vec<_>>>()?;
        Ok(self.run_scenarios(&scenarios).await)
    }

    /// Run a list of scenarios; a failing scenario never stops the rest
    pub async fn run_scenarios(&mut self, scenarios: &[Scenario]) -> SuiteResult {
        let started_at = Utc::now();
        let start = Instant::now();
        let mut results = Vec::with_capacity(scenarios.len());
        let mut passed = 0;
        let mut failed = 0;

        info!("Running {} scenario(s)...", scenarios.len());

        for scenario in scenarios {
            let result = self.run_scenario(*scenario).await;
            if result.success {
                passed += 1;
                info!("✓ {} ({} ms)", result.name, result.duration_ms);
            } else {
                failed += 1;
                error!(
                    "✗ {} - {}",
                    result.name,
                    result.error.as_deref().unwrap_or("unknown error")
                );
            }
            results.push(result);
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "Scenario results: {} passed, {} failed ({} ms)",
            passed, failed, duration_ms
        );

        SuiteResult {
            total: scenarios.len(),
            passed,
            failed,
            duration_ms,
            started_at,
            results,
        }
    }

    /// Run one scenario from a clean session. Every failure, screenshot
    /// capture included, stays inside the returned result.
    pub async fn run_scenario(&mut self, scenario: Scenario) -> ScenarioResult {
        let start = Instant::now();
        debug!("Running scenario: {}", scenario.name());

        let outcome = match self.driver.reset_session().await {
            Ok(()) => match tokio::time::timeout(
                self.config.scenario_timeout,
                scenario.run(&mut self.driver, &self.context),
            )
            .await
            {
                Ok(outcome) => outcome,
                Err(_) => Err(E2eError::Timeout(format!(
                    "scenario {} exceeded {} ms",
                    scenario.name(),
                    self.config.scenario_timeout.as_millis()
                ))),
            },
            Err(e) => Err(e),
        };

        let mut result = ScenarioResult {
            name: scenario.name().to_string(),
            tags: scenario.tags().iter().map(|t| t.to_string()).collect(),
            success: outcome.is_ok(),
            duration_ms: 0,
            error: None,
            error_kind: None,
            screenshot_path: None,
            screenshot_sha256: None,
        };

        if let Err(e) = outcome {
            result.error = Some(e.to_string());
            result.error_kind = Some(e.kind().to_string());
            if let Some((path, digest)) = self.capture_failure(scenario).await {
                result.screenshot_path = Some(path);
                result.screenshot_sha256 = Some(digest);
            }
        }

        result.duration_ms = start.elapsed().as_millis() as u64;
        result
    }

    /// Screenshot the page a scenario failed on
    async fn capture_failure(&mut self, scenario: Scenario) -> Option<(PathBuf, String)> {
        let dir = self.config.output_dir.join("screenshots");
        if let Err(e) = std::fs::create_dir_all(&dir) {
            warn!("Cannot create screenshot directory {}: {}", dir.display(), e);
            return None;
        }
        let path = dir.join(format!("{}.png", scenario.name()));

        if let Err(e) = self.driver.screenshot(&path).await {
            warn!("Failed to capture screenshot for {}: {}", scenario.name(), e);
            return None;
        }

        match std::fs::read(&path) {
            Ok(bytes) => Some((path, hex::encode(Sha256::digest(&bytes)))),
            Err(e) => {
                warn!("Screenshot {} unreadable: {}", path.display(), e);
                None
            }
        }
    }

    /// Write results to `test-results.json` in the output directory
    pub fn write_results(&self, results: &SuiteResult) -> E2eResult<PathBuf> {
        write_results(&self.config.output_dir, results)
    }

    /// Write the HTML report next to the JSON results
    pub fn write_report(&self, results: &SuiteResult) -> E2eResult<PathBuf> {
        report::write_html_report(&self.config.output_dir, &self.config.report_title, results)
    }
}

pub fn write_results(output_dir: &Path, results: &SuiteResult) -> E2eResult<PathBuf> {
    std::fs::create_dir_all(output_dir)?;

    let path = output_dir.join("test-results.json");
    let json = serde_json::to_string_pretty(results)?;
    std::fs::write(&path, json)?;

    info!("Results written to: {}", path.display());
    Ok(path)
}
