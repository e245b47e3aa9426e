//! Storefront E2E Suite
//!
//! Browser-driven end-to-end checks for the automationexercise.com storefront:
//! - Drives a real browser through Playwright over a JSON-lines bridge
//! - Expresses signup, login and contact flows as reusable workflow commands
//! - Runs named scenarios in isolation and records a JSON and HTML report
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  ScenarioRunner (Rust)                      │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Scenario::run(driver, ctx)                                 │
//! │    ├── workflow::signup_user / login_user / logout_user     │
//! │    ├── workflow::submit_contact_form / delete_account       │
//! │    └── expect::expect_visible / expect_path / ...           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  PageDriver (trait)                                         │
//! │    ├── PlaywrightDriver  -> node bridge -> browser          │
//! │    └── FakeStorefront    -> in-memory site model            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  FixtureStore (storefront-common) -> fixtures/users.json    │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod driver;
pub mod error;
pub mod expect;
pub mod fake;
pub mod playwright;
pub mod report;
pub mod runner;
pub mod scenarios;
pub mod site;
pub mod workflow;

pub use config::SuiteConfig;
pub use driver::{ElementHandle, PageDriver, Selector};
pub use error::{E2eError, E2eResult};
pub use expect::WaitConfig;
pub use fake::FakeStorefront;
pub use playwright::{Browser, PlaywrightConfig, PlaywrightDriver};
pub use runner::{RunnerConfig, ScenarioResult, ScenarioRunner, SuiteResult};
pub use scenarios::{Scenario, ScenarioContext};
pub use workflow::{login_user, signup_user, SignupOutcome};
