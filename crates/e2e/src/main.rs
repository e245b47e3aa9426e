//! Storefront E2E runner - Main Entry Point
//!
//! Exit status: 0 when every selected scenario passed, 1 when any failed,
//! 2 when the suite could not run at all.

use anyhow::Context;
use clap::Parser;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

use storefront_e2e::{
    site, Browser, PlaywrightDriver, Scenario, ScenarioContext, ScenarioRunner, SuiteConfig,
    SuiteResult,
};

/// Run the AutomationExercise storefront E2E scenarios
#[derive(Parser, Debug)]
#[command(name = "storefront-e2e")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// YAML config file; flags below override it
    #[arg(short, long, env = "STOREFRONT_E2E_CONFIG")]
    config: Option<PathBuf>,

    /// Storefront base URL
    #[arg(long, env = "STOREFRONT_BASE_URL")]
    base_url: Option<String>,

    /// User fixture file
    #[arg(long)]
    fixtures: Option<PathBuf>,

    /// File uploaded with the contact form
    #[arg(long)]
    attachment: Option<PathBuf>,

    /// Directory for results, screenshots and the HTML report
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Only run scenarios carrying this tag
    #[arg(long, conflicts_with = "name")]
    tag: Option<String>,

    /// Only run the named scenario (repeatable)
    #[arg(long)]
    name: Vec<String>,

    /// chromium, firefox or webkit
    #[arg(long)]
    browser: Option<String>,

    /// Show the browser window
    #[arg(long)]
    headed: bool,

    #[arg(long)]
    element_timeout_ms: Option<u64>,

    #[arg(long)]
    scenario_timeout_ms: Option<u64>,

    /// Do not wait for the site to answer before launching the browser
    #[arg(long)]
    skip_preflight: bool,

    /// List scenarios and exit
    #[arg(long)]
    list: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn suite_config(&self) -> anyhow::Result<SuiteConfig> {
        let mut config = match &self.config {
            Some(path) => SuiteConfig::from_file(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => SuiteConfig::default(),
        };

        if let Some(base_url) = &self.base_url {
            config.base_url = base_url.clone();
        }
        if let Some(fixtures) = &self.fixtures {
            config.fixtures_path = fixtures.clone();
        }
        if let Some(attachment) = &self.attachment {
            config.attachment_path = attachment.clone();
        }
        if let Some(output) = &self.output {
            config.output_dir = output.clone();
        }
        if let Some(browser) = &self.browser {
            config.browser = browser.parse::<Browser>()?;
        }
        if self.headed {
            config.headless = false;
        }
        if let Some(ms) = self.element_timeout_ms {
            config.element_timeout_ms = ms;
        }
        if let Some(ms) = self.scenario_timeout_ms {
            config.scenario_timeout_ms = ms;
        }

        config.validate()?;
        Ok(config)
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .init();

    if args.list {
        print_scenarios();
        return ExitCode::SUCCESS;
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            error!("Failed to start runtime: {}", e);
            return ExitCode::from(2);
        }
    };

    match runtime.block_on(run(args)) {
        Ok(suite) if suite.all_passed() => ExitCode::SUCCESS,
        Ok(_) => ExitCode::from(1),
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(2)
        }
    }
}

async fn run(args: Args) -> anyhow::Result<SuiteResult> {
    let config = args.suite_config()?;
    let context = ScenarioContext::load(&config)?;

    if !config.attachment_path.is_file() {
        anyhow::bail!(
            "contact attachment {} does not exist",
            config.attachment_path.display()
        );
    }

    if args.skip_preflight {
        info!("Skipping preflight check");
    } else {
        site::wait_until_reachable(&config.base_url, config.preflight_timeout())
            .await
            .with_context(|| format!("{} is not reachable", config.base_url))?;
    }

    let driver = PlaywrightDriver::launch(config.playwright()).await?;
    let mut runner = ScenarioRunner::new(driver, context, config.runner());

    let outcome = match (&args.tag, args.name.is_empty()) {
        (Some(tag), _) => Ok(runner.run_tagged(tag).await),
        (None, false) => runner.run_named(&args.name).await,
        (None, true) => Ok(runner.run_all().await),
    };

    let written = outcome.and_then(|suite| {
        runner.write_results(&suite)?;
        runner.write_report(&suite)?;
        Ok(suite)
    });

    if let Err(e) = runner.into_driver().close().await {
        error!("Failed to close browser: {}", e);
    }

    let suite = written?;
    print_summary(&suite);
    Ok(suite)
}

fn print_summary(suite: &SuiteResult) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Scenario", "Status", "Duration", "Error"]);

    for result in &suite.results {
        table.add_row(vec![
            result.name.clone(),
            if result.success { "✓ pass" } else { "✗ fail" }.to_string(),
            format!("{} ms", result.duration_ms),
            result.error.clone().unwrap_or_default(),
        ]);
    }

    println!("{table}");
    println!(
        "{} passed, {} failed, {} total ({} ms)",
        suite.passed, suite.failed, suite.total, suite.duration_ms
    );
}

fn print_scenarios() {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Scenario", "Tags"]);

    for scenario in Scenario::ALL {
        table.add_row(vec![scenario.name().to_string(), scenario.tags().join(", ")]);
    }

    println!("{table}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_defaults() {
        let args = Args::parse_from([
            "storefront-e2e",
            "--base-url",
            "http://localhost:3000",
            "--browser",
            "firefox",
            "--headed",
            "--scenario-timeout-ms",
            "5000",
        ]);
        let config = args.suite_config().unwrap();
        assert_eq!(config.base_url, "http://localhost:3000");
        assert_eq!(config.browser, Browser::Firefox);
        assert!(!config.headless);
        assert_eq!(config.scenario_timeout_ms, 5000);
    }

    #[test]
    fn test_bad_override_is_rejected() {
        let args = Args::parse_from(["storefront-e2e", "--element-timeout-ms", "0"]);
        assert!(args.suite_config().is_err());

        let args = Args::parse_from(["storefront-e2e", "--browser", "netscape"]);
        assert!(args.suite_config().is_err());
    }

    #[test]
    fn test_tag_and_name_conflict() {
        let parsed = Args::try_parse_from([
            "storefront-e2e",
            "--tag",
            "smoke",
            "--name",
            "logout_user",
        ]);
        assert!(parsed.is_err());
    }
}
