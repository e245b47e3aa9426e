//! Scenario runner against the in-memory storefront

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::Duration;

use storefront_common::FixtureStore;
use storefront_e2e::{
    E2eResult, ElementHandle, FakeStorefront, PageDriver, RunnerConfig, Scenario,
    ScenarioContext, ScenarioRunner, Selector, SuiteConfig,
};

const BASE_URL: &str = "https://shop.test";

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../fixtures")
        .join(name)
}

fn suite_config(output_dir: &Path) -> SuiteConfig {
    SuiteConfig {
        base_url: BASE_URL.to_string(),
        fixtures_path: fixture_path("users.json"),
        attachment_path: fixture_path("Helloworld.txt"),
        output_dir: output_dir.to_path_buf(),
        assertion_timeout_ms: 50,
        poll_interval_ms: 5,
        scenario_timeout_ms: 2_000,
        ..SuiteConfig::default()
    }
}

/// Storefront where the first fixture user is already registered
fn storefront() -> FakeStorefront {
    let patrick = FixtureStore::from_path(fixture_path("users.json"))
        .user(0)
        .unwrap();
    FakeStorefront::new(BASE_URL).with_account(&patrick)
}

fn runner<D: PageDriver>(driver: D, config: &SuiteConfig) -> ScenarioRunner<D> {
    let context = ScenarioContext::load(config).unwrap();
    ScenarioRunner::new(driver, context, config.runner())
}

#[tokio::test]
async fn all_scenarios_pass() {
    let dir = tempfile::tempdir().unwrap();
    let config = suite_config(dir.path());
    let mut runner = runner(storefront(), &config);

    let suite = runner.run_all().await;
    for result in &suite.results {
        assert!(result.success, "{} failed: {:?}", result.name, result.error);
        assert!(result.screenshot_path.is_none());
    }
    assert_eq!(suite.total, Scenario::ALL.len());
    assert_eq!(suite.passed, suite.total);
    assert!(suite.all_passed());

    // register_user cleans up after itself
    let site = runner.into_driver();
    assert_eq!(site.accounts().len(), 1);
    assert_eq!(site.contact_submissions().len(), 1);
}

#[tokio::test]
async fn repeated_runs_give_identical_outcomes() {
    let dir = tempfile::tempdir().unwrap();
    let config = suite_config(dir.path());
    let mut runner = runner(storefront(), &config);

    let first = runner.run_all().await;
    let second = runner.run_all().await;
    assert_eq!(first.outcomes(), second.outcomes());
    assert!(second.all_passed());
}

#[tokio::test]
async fn failing_scenario_does_not_stop_the_rest() {
    let dir = tempfile::tempdir().unwrap();
    let config = suite_config(dir.path());
    let site = storefront().refuse_interaction("submit-button");
    let mut runner = runner(site, &config);

    let suite = runner.run_all().await;
    assert_eq!(suite.failed, 1);
    assert_eq!(suite.passed, Scenario::ALL.len() - 1);

    let failed = suite.results.iter().find(|r| !r.success).unwrap();
    assert_eq!(failed.name, "contact_form_submission");
    assert_eq!(failed.error_kind.as_deref(), Some("interaction"));

    let shot = failed.screenshot_path.as_ref().unwrap();
    assert_eq!(shot, &dir.path().join("screenshots/contact_form_submission.png"));
    let bytes = std::fs::read(shot).unwrap();
    assert_eq!(
        failed.screenshot_sha256.as_deref(),
        Some(hex::encode(Sha256::digest(&bytes)).as_str())
    );
    assert_eq!(runner.driver_mut().screenshots(), &[shot.clone()]);
}

#[tokio::test]
async fn unwritable_screenshot_dir_does_not_stop_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let not_a_dir = dir.path().join("results");
    std::fs::write(&not_a_dir, "occupied").unwrap();

    let config = suite_config(&not_a_dir);
    let mut runner = runner(storefront().refuse_interaction("submit-button"), &config);

    let suite = runner.run_all().await;
    assert_eq!(suite.total, Scenario::ALL.len());
    assert_eq!(suite.failed, 1);
    assert_eq!(suite.passed, Scenario::ALL.len() - 1);

    let failed = suite.results.iter().find(|r| !r.success).unwrap();
    assert_eq!(failed.name, "contact_form_submission");
    assert_eq!(failed.error_kind.as_deref(), Some("interaction"));
    assert!(failed.screenshot_path.is_none());
    assert!(failed.screenshot_sha256.is_none());
}

#[tokio::test]
async fn register_user_fails_when_account_already_exists() {
    let dir = tempfile::tempdir().unwrap();
    let config = suite_config(dir.path());
    let julie = FixtureStore::from_path(fixture_path("users.json"))
        .user(1)
        .unwrap();
    let mut runner = runner(storefront().with_account(&julie), &config);

    let result = runner.run_scenario(Scenario::RegisterUser).await;
    assert!(!result.success);
    assert_eq!(result.error_kind.as_deref(), Some("assertion"));
}

#[tokio::test]
async fn existing_email_scenario_fails_when_signup_goes_through() {
    let dir = tempfile::tempdir().unwrap();
    let config = suite_config(dir.path());
    let mut runner = runner(FakeStorefront::new(BASE_URL), &config);

    let result = runner
        .run_scenario(Scenario::RegisterUserWithExistingEmail)
        .await;
    assert!(!result.success);
    assert!(result.error.unwrap().contains("created a new account"));
}

#[tokio::test]
async fn each_scenario_starts_signed_out() {
    let dir = tempfile::tempdir().unwrap();
    let config = suite_config(dir.path());
    let mut runner = runner(storefront(), &config);

    let suite = runner
        .run_named(&[
            "login_with_valid_credentials".to_string(),
            "login_with_incorrect_password".to_string(),
        ])
        .await
        .unwrap();
    assert!(suite.all_passed(), "{:?}", suite.results);
    assert_eq!(runner.driver_mut().signed_in_as(), None);
}

#[tokio::test]
async fn tag_filter_selects_matching_scenarios() {
    let dir = tempfile::tempdir().unwrap();
    let config = suite_config(dir.path());
    let mut runner = runner(storefront(), &config);

    let suite = runner.run_tagged("signup").await;
    let names: Vec<_> = suite.results.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["register_user", "register_user_with_existing_email"]);
}

#[tokio::test]
async fn unknown_scenario_name_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let config = suite_config(dir.path());
    let mut runner = runner(storefront(), &config);

    let err = runner.run_named(&["checkout".to_string()]).await.unwrap_err();
    assert_eq!(err.kind(), "invalid_config");
}

#[tokio::test]
async fn results_and_report_are_written() {
    let dir = tempfile::tempdir().unwrap();
    let config = suite_config(dir.path());
    let mut runner = runner(storefront().refuse_interaction("login-button"), &config);

    let suite = runner.run_tagged("login").await;
    assert!(!suite.all_passed());

    let json = runner.write_results(&suite).unwrap();
    let parsed: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(json).unwrap()).unwrap();
    assert_eq!(parsed["total"], suite.total);
    assert_eq!(parsed["failed"], suite.failed);

    let html = std::fs::read_to_string(runner.write_report(&suite).unwrap()).unwrap();
    assert!(html.contains("AutomationExercise E2E Report"));
    assert!(html.contains("data:image/png;base64,"));
    assert!(html.contains("logout_user"));
}

#[tokio::test]
async fn too_few_fixture_users_is_a_fixture_error() {
    let dir = tempfile::tempdir().unwrap();
    let fixture = dir.path().join("users.json");
    let users: Vec<serde_json::Value> =
        serde_json::from_str(&std::fs::read_to_string(fixture_path("users.json")).unwrap())
            .unwrap();
    std::fs::write(&fixture, serde_json::to_string(&users[..1]).unwrap()).unwrap();

    let config = SuiteConfig {
        fixtures_path: fixture,
        ..suite_config(dir.path())
    };
    let err = ScenarioContext::load(&config).unwrap_err();
    assert_eq!(err.kind(), "fixture_load");
}

/// Delegates to the fake but never finishes loading a page
struct HangingDriver(FakeStorefront);

#[async_trait]
impl PageDriver for HangingDriver {
    async fn navigate(&mut self, _url: &str) -> E2eResult<()> {
        std::future::pending::<()>().await;
        Ok(())
    }

    async fn find(&mut self, selector: &Selector) -> E2eResult<ElementHandle> {
        self.0.find(selector).await
    }

    async fn query(&mut self, selector: &Selector) -> E2eResult<Option<ElementHandle>> {
        self.0.query(selector).await
    }

    async fn type_text(&mut self, element: &ElementHandle, text: &str) -> E2eResult<()> {
        self.0.type_text(element, text).await
    }

    async fn click(&mut self, element: &ElementHandle) -> E2eResult<()> {
        self.0.click(element).await
    }

    async fn select(&mut self, element: &ElementHandle, value: &str) -> E2eResult<()> {
        self.0.select(element, value).await
    }

    async fn check(&mut self, element: &ElementHandle) -> E2eResult<()> {
        self.0.check(element).await
    }

    async fn upload_file(&mut self, element: &ElementHandle, path: &Path) -> E2eResult<()> {
        self.0.upload_file(element, path).await
    }

    async fn text_of(&mut self, element: &ElementHandle) -> E2eResult<String> {
        self.0.text_of(element).await
    }

    async fn is_visible(&mut self, element: &ElementHandle) -> E2eResult<bool> {
        self.0.is_visible(element).await
    }

    async fn current_url_path(&mut self) -> E2eResult<String> {
        self.0.current_url_path().await
    }

    async fn screenshot(&mut self, path: &Path) -> E2eResult<()> {
        self.0.screenshot(path).await
    }

    async fn reset_session(&mut self) -> E2eResult<()> {
        self.0.reset_session().await
    }
}

#[tokio::test]
async fn stuck_scenario_times_out() {
    let dir = tempfile::tempdir().unwrap();
    let config = SuiteConfig {
        scenario_timeout_ms: 100,
        ..suite_config(dir.path())
    };
    let mut runner = runner(HangingDriver(storefront()), &config);

    let result = runner.run_scenario(Scenario::LogoutUser).await;
    assert!(!result.success);
    assert_eq!(result.error_kind.as_deref(), Some("timeout"));
    assert!(result.screenshot_path.is_some());
}

#[test]
fn runner_config_defaults() {
    let config = RunnerConfig::default();
    assert_eq!(config.scenario_timeout, Duration::from_secs(120));
    assert_eq!(config.output_dir, PathBuf::from("test-results"));
}
