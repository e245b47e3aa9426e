//! Playwright browser automation
//!
//! [`PlaywrightDriver`] keeps one Node process alive for the whole run. The
//! process hosts a Playwright page and answers one JSON command per line on
//! stdin with one JSON reply per line on stdout. Commands are strictly
//! request/response, so the page only ever sees one interaction at a time.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::str::FromStr;
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command as TokioCommand};
use tracing::{debug, info, warn};

use crate::driver::{ElementHandle, PageDriver, Selector};
use crate::error::{E2eError, E2eResult};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    pub fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }
}

impl FromStr for Browser {
    type Err = E2eError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "chromium" | "chrome" => Ok(Browser::Chromium),
            "firefox" => Ok(Browser::Firefox),
            "webkit" | "safari" => Ok(Browser::Webkit),
            other => Err(E2eError::InvalidConfig(format!("unknown browser: {}", other))),
        }
    }
}

/// Configuration for Playwright
#[derive(Debug, Clone)]
pub struct PlaywrightConfig {
    pub browser: Browser,
    pub headless: bool,
    pub viewport_width: u32,
    pub viewport_height: u32,

    /// Bounded wait for `find` and for each page action
    pub element_timeout: Duration,

    /// Upper bound on any single bridge round trip, navigation included
    pub command_timeout: Duration,

    /// How long the bridge may take to launch the browser
    pub startup_timeout: Duration,

    pub node_binary: PathBuf,

    /// Directory the bridge runs in; `playwright` must resolve from here
    pub working_dir: PathBuf,

    /// Extra module search path handed to node as `NODE_PATH`
    pub node_path: Option<PathBuf>,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            browser: Browser::Chromium,
            headless: true,
            viewport_width: 1280,
            viewport_height: 720,
            element_timeout: Duration::from_secs(4),
            command_timeout: Duration::from_secs(60),
            startup_timeout: Duration::from_secs(30),
            node_binary: PathBuf::from("node"),
            working_dir: PathBuf::from("."),
            node_path: None,
        }
    }
}

/// One bridge command, tagged by `op` on the wire
#[derive(Debug, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum BridgeCommand<'a> {
    Navigate { url: &'a str },
    Find { selector: &'a Selector, timeout_ms: u64 },
    Query { selector: &'a Selector },
    Type { handle: u64, text: &'a str, timeout_ms: u64 },
    Click { handle: u64, timeout_ms: u64 },
    Select { handle: u64, value: &'a str, timeout_ms: u64 },
    Check { handle: u64, timeout_ms: u64 },
    Upload { handle: u64, path: &'a str, timeout_ms: u64 },
    Text { handle: u64, timeout_ms: u64 },
    Visible { handle: u64 },
    Path,
    Screenshot { path: &'a str },
    ResetSession,
    Close,
}

impl BridgeCommand<'_> {
    fn op(&self) -> &'static str {
        match self {
            BridgeCommand::Navigate { .. } => "navigate",
            BridgeCommand::Find { .. } => "find",
            BridgeCommand::Query { .. } => "query",
            BridgeCommand::Type { .. } => "type",
            BridgeCommand::Click { .. } => "click",
            BridgeCommand::Select { .. } => "select",
            BridgeCommand::Check { .. } => "check",
            BridgeCommand::Upload { .. } => "upload",
            BridgeCommand::Text { .. } => "text",
            BridgeCommand::Visible { .. } => "visible",
            BridgeCommand::Path => "path",
            BridgeCommand::Screenshot { .. } => "screenshot",
            BridgeCommand::ResetSession => "reset_session",
            BridgeCommand::Close => "close",
        }
    }
}

#[derive(Debug, Deserialize)]
struct BridgeReply {
    id: u64,
    ok: bool,
    #[serde(default)]
    value: serde_json::Value,
    #[serde(default)]
    error: Option<BridgeFailure>,
}

#[derive(Debug, Clone, Deserialize)]
struct BridgeFailure {
    kind: String,
    message: String,
}

/// Playwright-backed [`PageDriver`]
pub struct PlaywrightDriver {
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
    next_id: u64,
    element_timeout: Duration,
    command_timeout: Duration,

    /// Holds the bridge script until the driver is dropped
    _script_dir: TempDir,
}

impl PlaywrightDriver {
    /// Start the bridge and wait until the browser page is ready
    pub async fn launch(config: PlaywrightConfig) -> E2eResult<Self> {
        Self::check_playwright_installed(&config).await?;

        let script_dir = tempfile::tempdir()?;
        let script_path = script_dir.path().join("bridge.js");
        std::fs::write(&script_path, build_bridge_script(&config))?;

        info!(
            "Launching {} (headless: {}) via Playwright bridge",
            config.browser.as_str(),
            config.headless
        );

        let mut cmd = TokioCommand::new(&config.node_binary);
        cmd.arg(&script_path)
            .current_dir(&config.working_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        if let Some(node_path) = &config.node_path {
            cmd.env("NODE_PATH", node_path);
        }

        let mut child = cmd.spawn().map_err(|e| {
            E2eError::Playwright(format!(
                "Failed to spawn {}: {}",
                config.node_binary.display(),
                e
            ))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| E2eError::Playwright("bridge stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| E2eError::Playwright("bridge stdout unavailable".to_string()))?;

        let mut driver = Self {
            child,
            stdin,
            stdout: BufReader::new(stdout).lines(),
            next_id: 0,
            element_timeout: config.element_timeout,
            command_timeout: config.command_timeout,
            _script_dir: script_dir,
        };

        let ready = driver.read_reply(config.startup_timeout).await?;
        if !ready.ok {
            let message = ready
                .error
                .map(|f| f.message)
                .unwrap_or_else(|| "bridge failed to start".to_string());
            return Err(E2eError::Playwright(message));
        }

        debug!("Playwright bridge ready");
        Ok(driver)
    }

    /// Check if Playwright is installed
    async fn check_playwright_installed(config: &PlaywrightConfig) -> E2eResult<()> {
        let output = TokioCommand::new("npx")
            .args(["playwright", "--version"])
            .current_dir(&config.working_dir)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status()
            .await;

        match output {
            Ok(status) if status.success() => Ok(()),
            _ => Err(E2eError::PlaywrightNotFound),
        }
    }

    /// Close the browser and wait for the bridge to exit
    pub async fn close(mut self) -> E2eResult<()> {
        if let Err(e) = self.call(BridgeCommand::Close).await {
            warn!("Bridge did not close cleanly: {}", e);
        }
        match tokio::time::timeout(Duration::from_secs(5), self.child.wait()).await {
            Ok(status) => {
                debug!("Bridge exited with {}", status?);
            }
            Err(_) => {
                warn!("Bridge still running after close, killing it");
                self.child.kill().await?;
            }
        }
        Ok(())
    }

    fn timeout_ms(&self) -> u64 {
        self.element_timeout.as_millis() as u64
    }

    /// Send one command and wait for its reply.
    ///
    /// The outer `Result` is transport failure; the inner one is the
    /// bridge reporting that the page operation itself failed.
    async fn call(
        &mut self,
        command: BridgeCommand<'_>,
    ) -> E2eResult<Result<serde_json::Value, BridgeFailure>> {
        self.next_id += 1;
        let id = self.next_id;

        let mut request = serde_json::to_value(&command)?;
        request["id"] = serde_json::json!(id);
        let mut line = serde_json::to_string(&request)?;
        line.push('\n');

        debug!("bridge #{} {}", id, command.op());
        self.stdin.write_all(line.as_bytes()).await?;
        self.stdin.flush().await?;

        loop {
            let reply = self.read_reply(self.command_timeout).await?;
            // Replies to commands abandoned by an earlier timeout
            if reply.id < id {
                debug!("Discarding late reply #{}", reply.id);
                continue;
            }
            if reply.id > id {
                return Err(E2eError::BridgeProtocol(format!(
                    "expected reply #{} but got #{}",
                    id, reply.id
                )));
            }

            return Ok(if reply.ok {
                Ok(reply.value)
            } else {
                Err(reply.error.unwrap_or_else(|| BridgeFailure {
                    kind: "unknown".to_string(),
                    message: "bridge reported failure without details".to_string(),
                }))
            });
        }
    }

    async fn read_reply(&mut self, limit: Duration) -> E2eResult<BridgeReply> {
        loop {
            let line = tokio::time::timeout(limit, self.stdout.next_line())
                .await
                .map_err(|_| {
                    E2eError::Timeout(format!("bridge reply after {} ms", limit.as_millis()))
                })??
                .ok_or_else(|| E2eError::Playwright("bridge process exited".to_string()))?;

            let line = line.trim();
            if !line.starts_with('{') {
                if !line.is_empty() {
                    debug!("bridge: {}", line);
                }
                continue;
            }

            return serde_json::from_str(line)
                .map_err(|e| E2eError::BridgeProtocol(format!("{}: {}", e, line)));
        }
    }

    /// Run a command against an element and map page failures to interaction errors
    async fn act(
        &mut self,
        action: &str,
        element: &ElementHandle,
        command: BridgeCommand<'_>,
    ) -> E2eResult<serde_json::Value> {
        match self.call(command).await? {
            Ok(value) => Ok(value),
            Err(failure) if failure.kind == "protocol" => {
                Err(E2eError::BridgeProtocol(failure.message))
            }
            Err(failure) => Err(E2eError::interaction(action, element.selector(), failure.message)),
        }
    }

    fn handle_from(value: serde_json::Value, selector: &Selector) -> E2eResult<Option<ElementHandle>> {
        match value {
            serde_json::Value::Null => Ok(None),
            serde_json::Value::Number(n) => n
                .as_u64()
                .map(|id| Some(ElementHandle::new(id, selector.clone())))
                .ok_or_else(|| E2eError::BridgeProtocol(format!("bad element handle: {}", n))),
            other => Err(E2eError::BridgeProtocol(format!(
                "expected element handle, got {}",
                other
            ))),
        }
    }

    fn path_arg(path: &Path) -> E2eResult<String> {
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()?.join(path)
        };
        absolute
            .to_str()
            .map(str::to_string)
            .ok_or_else(|| E2eError::InvalidConfig(format!("non UTF-8 path: {}", path.display())))
    }
}

#[async_trait]
impl PageDriver for PlaywrightDriver {
    async fn navigate(&mut self, url: &str) -> E2eResult<()> {
        match self.call(BridgeCommand::Navigate { url }).await? {
            Ok(_) => Ok(()),
            Err(failure) => Err(E2eError::Playwright(format!(
                "navigation to {} failed: {}",
                url, failure.message
            ))),
        }
    }

    async fn find(&mut self, selector: &Selector) -> E2eResult<ElementHandle> {
        let timeout_ms = self.timeout_ms();
        match self.call(BridgeCommand::Find { selector, timeout_ms }).await? {
            Ok(value) => Self::handle_from(value, selector)?.ok_or_else(|| {
                E2eError::BridgeProtocol("find returned no element handle".to_string())
            }),
            Err(failure) if failure.kind == "not_found" => Err(E2eError::ElementNotFound {
                selector: selector.to_string(),
                timeout_ms,
            }),
            Err(failure) => Err(E2eError::Playwright(failure.message)),
        }
    }

    async fn query(&mut self, selector: &Selector) -> E2eResult<Option<ElementHandle>> {
        match self.call(BridgeCommand::Query { selector }).await? {
            Ok(value) => Self::handle_from(value, selector),
            Err(failure) => Err(E2eError::Playwright(failure.message)),
        }
    }

    async fn type_text(&mut self, element: &ElementHandle, text: &str) -> E2eResult<()> {
        let command = BridgeCommand::Type {
            handle: element.id(),
            text,
            timeout_ms: self.timeout_ms(),
        };
        self.act("type into", element, command).await.map(|_| ())
    }

    async fn click(&mut self, element: &ElementHandle) -> E2eResult<()> {
        let command = BridgeCommand::Click {
            handle: element.id(),
            timeout_ms: self.timeout_ms(),
        };
        self.act("click", element, command).await.map(|_| ())
    }

    async fn select(&mut self, element: &ElementHandle, value: &str) -> E2eResult<()> {
        let command = BridgeCommand::Select {
            handle: element.id(),
            value,
            timeout_ms: self.timeout_ms(),
        };
        self.act("select", element, command).await.map(|_| ())
    }

    async fn check(&mut self, element: &ElementHandle) -> E2eResult<()> {
        let command = BridgeCommand::Check {
            handle: element.id(),
            timeout_ms: self.timeout_ms(),
        };
        self.act("check", element, command).await.map(|_| ())
    }

    async fn upload_file(&mut self, element: &ElementHandle, path: &Path) -> E2eResult<()> {
        let path = Self::path_arg(path)?;
        let command = BridgeCommand::Upload {
            handle: element.id(),
            path: &path,
            timeout_ms: self.timeout_ms(),
        };
        self.act("upload to", element, command).await.map(|_| ())
    }

    async fn text_of(&mut self, element: &ElementHandle) -> E2eResult<String> {
        let command = BridgeCommand::Text {
            handle: element.id(),
            timeout_ms: self.timeout_ms(),
        };
        match self.act("read", element, command).await? {
            serde_json::Value::String(text) => Ok(text),
            other => Err(E2eError::BridgeProtocol(format!("expected text, got {}", other))),
        }
    }

    async fn is_visible(&mut self, element: &ElementHandle) -> E2eResult<bool> {
        let command = BridgeCommand::Visible {
            handle: element.id(),
        };
        match self.act("inspect", element, command).await? {
            serde_json::Value::Bool(visible) => Ok(visible),
            other => Err(E2eError::BridgeProtocol(format!("expected bool, got {}", other))),
        }
    }

    async fn current_url_path(&mut self) -> E2eResult<String> {
        match self.call(BridgeCommand::Path).await? {
            Ok(serde_json::Value::String(path)) => Ok(path),
            Ok(other) => Err(E2eError::BridgeProtocol(format!("expected path, got {}", other))),
            Err(failure) => Err(E2eError::Playwright(failure.message)),
        }
    }

    async fn screenshot(&mut self, path: &Path) -> E2eResult<()> {
        let path = Self::path_arg(path)?;
        match self.call(BridgeCommand::Screenshot { path: &path }).await? {
            Ok(_) => Ok(()),
            Err(failure) => Err(E2eError::Playwright(format!(
                "screenshot failed: {}",
                failure.message
            ))),
        }
    }

    async fn reset_session(&mut self) -> E2eResult<()> {
        match self.call(BridgeCommand::ResetSession).await? {
            Ok(_) => Ok(()),
            Err(failure) => Err(E2eError::Playwright(failure.message)),
        }
    }
}

/// Build the Node bridge script for a browser configuration
pub fn build_bridge_script(config: &PlaywrightConfig) -> String {
    let mut script = String::new();

    // Header
    script.push_str(&format!(
        r#"
const {{ chromium, firefox, webkit }} = require('playwright');
const readline = require('readline');

(async () => {{
  const browser = await {browser}.launch({{ headless: {headless} }});
  const contextOptions = {{
    viewport: {{ width: {width}, height: {height} }}
  }};
"#,
        browser = config.browser.as_str(),
        headless = config.headless,
        width = config.viewport_width,
        height = config.viewport_height,
    ));

    script.push_str(BRIDGE_BODY);
    script
}

const BRIDGE_BODY: &str = r#"
  let context;
  let page;

  // Handles are locators; they are only valid for the document they were found in
  const handles = new Map();
  let nextHandle = 1;
  let documentGeneration = 0;

  const openPage = async () => {
    context = await browser.newContext(contextOptions);
    page = await context.newPage();
    // confirm() on form submission must be accepted, as a user would
    page.on('dialog', (dialog) => dialog.accept().catch(() => {}));
    page.on('framenavigated', (frame) => {
      if (frame === page.mainFrame()) documentGeneration++;
    });
  };

  await openPage();

  const reply = (msg) => process.stdout.write(JSON.stringify(msg) + '\n');
  const fail = (kind, message) => Object.assign(new Error(message), { kind });

  const locate = (sel) => {
    switch (sel.kind) {
      case 'css': return page.locator(sel.css);
      case 'data_qa': return page.locator(`[data-qa="${sel.name}"]`);
      case 'text': return page.getByText(sel.text);
      case 'css_with_text': return page.locator(sel.css).filter({ hasText: sel.text });
      default: throw fail('protocol', `unknown selector kind ${sel.kind}`);
    }
  };

  const store = (locator) => {
    const id = nextHandle++;
    handles.set(id, { locator, generation: documentGeneration });
    return id;
  };

  const handle = (id) => {
    const entry = handles.get(id);
    if (!entry) throw fail('interaction', `unknown element handle ${id}`);
    if (entry.generation !== documentGeneration) {
      handles.delete(id);
      throw fail('interaction', 'stale element handle');
    }
    return entry.locator;
  };

  const ops = {
    navigate: async (c) => { await page.goto(c.url, { waitUntil: 'load' }); return null; },
    find: async (c) => {
      const locator = locate(c.selector).first();
      try {
        await locator.waitFor({ state: 'attached', timeout: c.timeout_ms });
      } catch (e) {
        throw fail('not_found', e.message);
      }
      return store(locator);
    },
    query: async (c) => {
      const locator = locate(c.selector).first();
      return (await locator.count()) > 0 ? store(locator) : null;
    },
    type: async (c) => { await handle(c.handle).pressSequentially(c.text, { timeout: c.timeout_ms }); return null; },
    click: async (c) => { await handle(c.handle).click({ timeout: c.timeout_ms }); return null; },
    select: async (c) => { await handle(c.handle).selectOption(c.value, { timeout: c.timeout_ms }); return null; },
    check: async (c) => { await handle(c.handle).check({ timeout: c.timeout_ms }); return null; },
    upload: async (c) => { await handle(c.handle).setInputFiles(c.path, { timeout: c.timeout_ms }); return null; },
    text: async (c) => handle(c.handle).innerText({ timeout: c.timeout_ms }),
    visible: async (c) => handle(c.handle).isVisible(),
    path: async () => new URL(page.url()).pathname,
    screenshot: async (c) => { await page.screenshot({ path: c.path, fullPage: true }); return null; },
    // A fresh context drops cookies, localStorage, sessionStorage and cache
    reset_session: async () => {
      handles.clear();
      await context.close();
      await openPage();
      return null;
    },
    close: async () => null,
  };

  reply({ id: 0, ok: true, value: 'ready' });

  const rl = readline.createInterface({ input: process.stdin });
  for await (const line of rl) {
    if (!line.trim()) continue;
    let cmd;
    try {
      cmd = JSON.parse(line);
    } catch (e) {
      console.error(`bridge: unparsable command: ${line}`);
      continue;
    }
    const op = ops[cmd.op];
    if (!op) {
      reply({ id: cmd.id, ok: false, error: { kind: 'protocol', message: `unknown op ${cmd.op}` } });
      continue;
    }
    try {
      const value = await op(cmd);
      reply({ id: cmd.id, ok: true, value: value === undefined ? null : value });
    } catch (e) {
      const kind = e.kind || (e.name === 'TimeoutError' ? 'timeout' : 'interaction');
      reply({ id: cmd.id, ok: false, error: { kind, message: e.message } });
    }
    if (cmd.op === 'close') break;
  }

  await browser.close().catch(() => {});
  process.exit(0);
})().catch((error) => {
  console.log(JSON.stringify({ id: 0, ok: false, error: { kind: 'startup', message: error.message } }));
  process.exit(1);
});
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_header_uses_config() {
        let config = PlaywrightConfig {
            browser: Browser::Firefox,
            headless: false,
            viewport_width: 1920,
            viewport_height: 1080,
            ..Default::default()
        };
        let script = build_bridge_script(&config);
        assert!(script.contains("await firefox.launch({ headless: false })"));
        assert!(script.contains("viewport: { width: 1920, height: 1080 }"));
        assert!(script.contains("dialog.accept()"));
    }

    #[test]
    fn test_handles_expire_with_their_document() {
        let script = build_bridge_script(&PlaywrightConfig::default());
        assert!(script.contains("page.on('framenavigated'"));
        assert!(script.contains("entry.generation !== documentGeneration"));
        assert!(script.contains("throw fail('interaction', 'stale element handle')"));
    }

    #[test]
    fn test_reset_session_replaces_the_context() {
        let script = build_bridge_script(&PlaywrightConfig::default());
        let reset = &script[script.find("reset_session: async").unwrap()..];
        let reset = &reset[..reset.find("},").unwrap()];
        assert!(reset.contains("await context.close()"));
        assert!(reset.contains("await openPage()"));
    }

    #[tokio::test]
    async fn test_install_check_fails_without_working_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = PlaywrightConfig {
            working_dir: dir.path().join("missing"),
            ..Default::default()
        };
        let err = PlaywrightDriver::check_playwright_installed(&config)
            .await
            .unwrap_err();
        assert!(matches!(err, E2eError::PlaywrightNotFound));
    }

    #[test]
    fn test_command_wire_format() {
        let selector = Selector::data_qa("signup-name");
        let value = serde_json::to_value(BridgeCommand::Find {
            selector: &selector,
            timeout_ms: 4000,
        })
        .unwrap();
        assert_eq!(value["op"], "find");
        assert_eq!(value["timeout_ms"], 4000);
        assert_eq!(value["selector"]["kind"], "data_qa");

        let value = serde_json::to_value(BridgeCommand::ResetSession).unwrap();
        assert_eq!(value["op"], "reset_session");
    }

    #[test]
    fn test_reply_parsing() {
        let reply: BridgeReply =
            serde_json::from_str(r#"{"id":3,"ok":false,"error":{"kind":"not_found","message":"x"}}"#)
                .unwrap();
        assert!(!reply.ok);
        assert_eq!(reply.error.unwrap().kind, "not_found");

        let reply: BridgeReply = serde_json::from_str(r#"{"id":4,"ok":true,"value":7}"#).unwrap();
        let handle = PlaywrightDriver::handle_from(reply.value, &Selector::css("body"))
            .unwrap()
            .unwrap();
        assert_eq!(handle.id(), 7);
    }

    #[test]
    fn test_browser_from_str() {
        assert_eq!("Firefox".parse::<Browser>().unwrap(), Browser::Firefox);
        assert!("netscape".parse::<Browser>().is_err());
    }
}
