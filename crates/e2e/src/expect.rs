//! Bounded-wait assertions on page state
//!
//! Every check polls the driver until it holds or the wait expires. None of
//! them retry an action; they only re-read the page.

use std::time::{Duration, Instant};
use tracing::debug;

use crate::driver::{ElementHandle, PageDriver, Selector};
use crate::error::{E2eError, E2eResult};

/// Timeout and polling cadence for assertions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitConfig {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl WaitConfig {
    pub fn new(timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            timeout,
            poll_interval,
        }
    }
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(4),
            poll_interval: Duration::from_millis(100),
        }
    }
}

struct Deadline {
    start: Instant,
    wait: WaitConfig,
}

impl Deadline {
    fn start(wait: WaitConfig) -> Self {
        Self {
            start: Instant::now(),
            wait,
        }
    }

    fn expired(&self) -> bool {
        self.start.elapsed() >= self.wait.timeout
    }

    async fn tick(&self) {
        tokio::time::sleep(self.wait.poll_interval).await;
    }
}

/// The element located by `selector`, if it is currently present and visible
async fn visible_now<D>(driver: &mut D, selector: &Selector) -> E2eResult<Option<ElementHandle>>
where
    D: PageDriver + ?Sized,
{
    match driver.query(selector).await? {
        Some(element) if driver.is_visible(&element).await? => Ok(Some(element)),
        _ => Ok(None),
    }
}

/// Wait until `selector` is visible
pub async fn expect_visible<D>(
    driver: &mut D,
    selector: &Selector,
    wait: WaitConfig,
) -> E2eResult<ElementHandle>
where
    D: PageDriver + ?Sized,
{
    let deadline = Deadline::start(wait);
    loop {
        if let Some(element) = visible_now(driver, selector).await? {
            debug!("{} is visible", selector);
            return Ok(element);
        }
        if deadline.expired() {
            return Err(E2eError::AssertionFailed(format!(
                "expected {} to be visible within {} ms",
                selector,
                wait.timeout.as_millis()
            )));
        }
        deadline.tick().await;
    }
}

/// Wait until some element containing `text` is visible
pub async fn expect_text_visible<D>(
    driver: &mut D,
    text: &str,
    wait: WaitConfig,
) -> E2eResult<ElementHandle>
where
    D: PageDriver + ?Sized,
{
    expect_visible(driver, &Selector::text(text), wait).await
}

/// Wait until the element at `selector` contains `text`
pub async fn expect_contains_text<D>(
    driver: &mut D,
    selector: &Selector,
    text: &str,
    wait: WaitConfig,
) -> E2eResult<()>
where
    D: PageDriver + ?Sized,
{
    let deadline = Deadline::start(wait);
    let mut last_seen: Option<String> = None;
    loop {
        if let Some(element) = driver.query(selector).await? {
            let actual = driver.text_of(&element).await?;
            if actual.contains(text) {
                return Ok(());
            }
            last_seen = Some(actual);
        }
        if deadline.expired() {
            let seen = match last_seen {
                Some(actual) => format!("found {:?}", actual),
                None => "element never appeared".to_string(),
            };
            return Err(E2eError::AssertionFailed(format!(
                "expected {} to contain {:?}, {}",
                selector, text, seen
            )));
        }
        deadline.tick().await;
    }
}

/// Assert that `selector` is not visible right now
pub async fn expect_absent<D>(driver: &mut D, selector: &Selector) -> E2eResult<()>
where
    D: PageDriver + ?Sized,
{
    match visible_now(driver, selector).await? {
        None => Ok(()),
        Some(_) => Err(E2eError::AssertionFailed(format!(
            "expected {} not to be visible",
            selector
        ))),
    }
}

/// Wait until the URL path equals `expected`
pub async fn expect_path<D>(driver: &mut D, expected: &str, wait: WaitConfig) -> E2eResult<()>
where
    D: PageDriver + ?Sized,
{
    wait_for_path(driver, wait, |path| path == expected, &format!("equal {:?}", expected)).await
}

/// Wait until the URL path contains `fragment`
pub async fn expect_path_contains<D>(
    driver: &mut D,
    fragment: &str,
    wait: WaitConfig,
) -> E2eResult<()>
where
    D: PageDriver + ?Sized,
{
    wait_for_path(
        driver,
        wait,
        |path| path.contains(fragment),
        &format!("contain {:?}", fragment),
    )
    .await
}

async fn wait_for_path<D, F>(
    driver: &mut D,
    wait: WaitConfig,
    accept: F,
    description: &str,
) -> E2eResult<()>
where
    D: PageDriver + ?Sized,
    F: Fn(&str) -> bool,
{
    let deadline = Deadline::start(wait);
    loop {
        let path = driver.current_url_path().await?;
        if accept(&path) {
            return Ok(());
        }
        if deadline.expired() {
            return Err(E2eError::AssertionFailed(format!(
                "expected URL path to {}, was {:?}",
                description, path
            )));
        }
        deadline.tick().await;
    }
}

/// Wait until any of `candidates` is visible and return its index.
///
/// Candidates are checked in order on every poll, so an earlier entry wins
/// when several are visible at once.
pub async fn wait_for_first<D>(
    driver: &mut D,
    candidates: &[Selector],
    wait: WaitConfig,
) -> E2eResult<usize>
where
    D: PageDriver + ?Sized,
{
    let deadline = Deadline::start(wait);
    loop {
        for (index, selector) in candidates.iter().enumerate() {
            if visible_now(driver, selector).await?.is_some() {
                return Ok(index);
            }
        }
        if deadline.expired() {
            let names: Vec<String> = candidates.iter().map(|s| s.to_string()).collect();
            return Err(E2eError::AssertionFailed(format!(
                "none of [{}] became visible within {} ms",
                names.join(", "),
                wait.timeout.as_millis()
            )));
        }
        deadline.tick().await;
    }
}
