//! Page driver abstraction
//!
//! [`PageDriver`] is the only boundary between workflow code and a browser.
//! Every method takes `&mut self`, so a workflow can never have two page
//! interactions in flight at once: each call is awaited before the next is
//! issued.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::error::E2eResult;

/// How to locate an element on the page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Selector {
    /// Plain CSS selector
    Css { css: String },

    /// `[data-qa="..."]` attribute, the site's stable test hook
    DataQa { name: String },

    /// First element whose text contains `text`
    Text { text: String },

    /// First element matching `css` whose text contains `text`
    CssWithText { css: String, text: String },
}

impl Selector {
    pub fn css(css: impl Into<String>) -> Self {
        Self::Css { css: css.into() }
    }

    pub fn data_qa(name: impl Into<String>) -> Self {
        Self::DataQa { name: name.into() }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn css_with_text(css: impl Into<String>, text: impl Into<String>) -> Self {
        Self::CssWithText {
            css: css.into(),
            text: text.into(),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Css { css } => write!(f, "{}", css),
            Selector::DataQa { name } => write!(f, "[data-qa=\"{}\"]", name),
            Selector::Text { text } => write!(f, "text({:?})", text),
            Selector::CssWithText { css, text } => write!(f, "{}:text({:?})", css, text),
        }
    }
}

/// Opaque reference to an element located by [`PageDriver::find`].
///
/// Handles are not guaranteed to survive a page change; workflows find
/// elements again after every navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementHandle {
    id: u64,
    selector: Selector,
}

impl ElementHandle {
    pub fn new(id: u64, selector: Selector) -> Self {
        Self { id, selector }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }
}

/// Browser capabilities needed by the workflow commands
#[async_trait]
pub trait PageDriver: Send {
    /// Load `url` and wait for the page to settle
    async fn navigate(&mut self, url: &str) -> E2eResult<()>;

    /// Locate one element, waiting up to the driver's element timeout
    async fn find(&mut self, selector: &Selector) -> E2eResult<ElementHandle>;

    /// Locate one element without waiting
    async fn query(&mut self, selector: &Selector) -> E2eResult<Option<ElementHandle>>;

    async fn type_text(&mut self, element: &ElementHandle, text: &str) -> E2eResult<()>;

    async fn click(&mut self, element: &ElementHandle) -> E2eResult<()>;

    /// Pick a dropdown option by value or visible label
    async fn select(&mut self, element: &ElementHandle, value: &str) -> E2eResult<()>;

    async fn check(&mut self, element: &ElementHandle) -> E2eResult<()>;

    async fn upload_file(&mut self, element: &ElementHandle, path: &Path) -> E2eResult<()>;

    async fn text_of(&mut self, element: &ElementHandle) -> E2eResult<String>;

    async fn is_visible(&mut self, element: &ElementHandle) -> E2eResult<bool>;

    /// Path component of the current URL, e.g. `/contact_us`
    async fn current_url_path(&mut self) -> E2eResult<String>;

    /// Write a full-page PNG screenshot to `path`
    async fn screenshot(&mut self, path: &Path) -> E2eResult<()>;

    /// Drop cookies and signed-in state so the next scenario starts clean
    async fn reset_session(&mut self) -> E2eResult<()>;
}
