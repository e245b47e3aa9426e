//! In-memory stand-in for the storefront
//!
//! `FakeStorefront` implements [`PageDriver`] over a small model of the
//! site's login, signup, account and contact pages. It keeps its own account
//! table and session, so workflow logic can be exercised end to end without
//! a browser. Lookups never wait: a missing element fails immediately, as a
//! real driver would once its timeout ran out.

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use storefront_common::UserRecord;

use crate::driver::{ElementHandle, PageDriver, Selector};
use crate::error::{E2eError, E2eResult};
use crate::site::banners;

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";

const MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

const COUNTRIES: [&str; 7] = [
    "India",
    "United States",
    "Canada",
    "Australia",
    "Israel",
    "New Zealand",
    "Singapore",
];

/// Fields the site marks as required on the account-information form
const REQUIRED_DETAILS: [&str; 8] = [
    "password",
    "first_name",
    "last_name",
    "address",
    "state",
    "city",
    "zipcode",
    "mobile_number",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FakePage {
    Home,
    Login,
    Signup,
    AccountCreated,
    AccountDeleted,
    Contact,
}

impl FakePage {
    fn path(&self) -> &'static str {
        match self {
            FakePage::Home => "/",
            FakePage::Login => "/login",
            FakePage::Signup => "/signup",
            FakePage::AccountCreated => "/account_created",
            FakePage::AccountDeleted => "/delete_account",
            FakePage::Contact => "/contact_us",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Static,
    Link,
    Button,
    Input,
    Select,
    Checkbox,
    Radio,
    File,
}

#[derive(Debug, Clone)]
struct FakeElement {
    key: &'static str,
    kind: Kind,
    css: Vec<&'static str>,
    data_qa: Option<&'static str>,
    text: String,
}

impl FakeElement {
    fn new(key: &'static str, kind: Kind, css: &[&'static str], text: impl Into<String>) -> Self {
        Self {
            key,
            kind,
            css: css.to_vec(),
            data_qa: None,
            text: text.into(),
        }
    }

    /// Element addressed by its `data-qa` attribute, which doubles as its key
    fn qa(data_qa: &'static str, kind: Kind, tag: &'static str, text: impl Into<String>) -> Self {
        Self {
            key: data_qa,
            kind,
            css: vec![tag],
            data_qa: Some(data_qa),
            text: text.into(),
        }
    }

    fn matches(&self, selector: &Selector) -> bool {
        match selector {
            Selector::Css { css } => self.css.iter().any(|c| c == css),
            Selector::DataQa { name } => self.data_qa == Some(name.as_str()),
            // The body holds every text; a text lookup wants the element itself
            Selector::Text { text } => self.key != "body" && self.text.contains(text.as_str()),
            Selector::CssWithText { css, text } => {
                self.css.iter().any(|c| c == css) && self.text.contains(text.as_str())
            }
        }
    }
}

/// An account registered on the fake site
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeAccount {
    pub name: String,
    pub email: String,
    pub password: String,
    pub newsletter: bool,
    pub optin: bool,
    /// Everything typed or selected on the account-information form
    pub details: BTreeMap<String, String>,
}

/// A message received through the contact form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactSubmission {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    pub attachment: Option<PathBuf>,
}

/// Scripted storefront implementing [`PageDriver`]
#[derive(Debug)]
pub struct FakeStorefront {
    base_url: url::Url,
    page: FakePage,
    generation: u64,
    next_handle: u64,
    handles: HashMap<u64, (u64, &'static str)>,

    accounts: BTreeMap<String, FakeAccount>,
    session: Option<String>,
    pending_signup: Option<(String, String)>,
    last_created: Option<String>,

    inputs: HashMap<&'static str, String>,
    selections: HashMap<&'static str, String>,
    checked: BTreeSet<&'static str>,
    upload: Option<PathBuf>,

    login_error: bool,
    signup_error: bool,
    contact_sent: bool,

    contact_submissions: Vec<ContactSubmission>,
    refused: BTreeSet<String>,
    actions: Vec<String>,
    screenshots: Vec<PathBuf>,
    element_timeout_ms: u64,
}

impl FakeStorefront {
    /// Create an empty site served at `base_url`.
    ///
    /// # Panics
    ///
    /// Panics if `base_url` is not an absolute URL.
    pub fn new(base_url: &str) -> Self {
        let base_url = url::Url::parse(base_url).expect("fake storefront needs an absolute base URL");
        Self {
            base_url,
            page: FakePage::Home,
            generation: 0,
            next_handle: 1,
            handles: HashMap::new(),
            accounts: BTreeMap::new(),
            session: None,
            pending_signup: None,
            last_created: None,
            inputs: HashMap::new(),
            selections: HashMap::new(),
            checked: BTreeSet::new(),
            upload: None,
            login_error: false,
            signup_error: false,
            contact_sent: false,
            contact_submissions: Vec::new(),
            refused: BTreeSet::new(),
            actions: Vec::new(),
            screenshots: Vec::new(),
            element_timeout_ms: 4000,
        }
    }

    /// Pre-register `user` as if it had signed up earlier
    pub fn with_account(mut self, user: &UserRecord) -> Self {
        self.accounts.insert(
            user.email.clone(),
            FakeAccount {
                name: user.name.clone(),
                email: user.email.clone(),
                password: user.password.clone(),
                newsletter: user.newsletter,
                optin: user.optin,
                details: BTreeMap::new(),
            },
        );
        self
    }

    /// Make every interaction with the element keyed `key` fail.
    ///
    /// Keys are `data-qa` names, or the CSS id / link key for elements
    /// without one (`nav-login`, `nav-contact`, `newsletter`, ...).
    pub fn refuse_interaction(mut self, key: &str) -> Self {
        self.refused.insert(key.to_string());
        self
    }

    pub fn accounts(&self) -> &BTreeMap<String, FakeAccount> {
        &self.accounts
    }

    pub fn account(&self, email: &str) -> Option<&FakeAccount> {
        self.accounts.get(email)
    }

    /// Name of the signed-in user, if any
    pub fn signed_in_as(&self) -> Option<&str> {
        self.session
            .as_ref()
            .and_then(|email| self.accounts.get(email))
            .map(|account| account.name.as_str())
    }

    pub fn contact_submissions(&self) -> &[ContactSubmission] {
        &self.contact_submissions
    }

    /// Every driver call made so far, as `action:target` strings
    pub fn actions(&self) -> &[String] {
        &self.actions
    }

    pub fn screenshots(&self) -> &[PathBuf] {
        &self.screenshots
    }

    fn goto(&mut self, page: FakePage) {
        self.page = page;
        self.generation += 1;
        self.inputs.clear();
        self.selections.clear();
        self.checked.clear();
        self.upload = None;
        self.login_error = false;
        self.signup_error = false;
        self.contact_sent = false;
    }

    fn elements(&self) -> Vec<FakeElement> {
        let mut elements = vec![FakeElement::new(
            "nav-home",
            Kind::Link,
            &["a", r#"a[href="/"]"#],
            " Home",
        )];

        match self.signed_in_as() {
            None => elements.push(FakeElement::new(
                "nav-login",
                Kind::Link,
                &["a", r#"a[href="/login"]"#],
                " Signup / Login",
            )),
            Some(_) => {
                elements.push(FakeElement::new(
                    "nav-logout",
                    Kind::Link,
                    &["a", r#"a[href="/logout"]"#],
                    " Logout",
                ));
                elements.push(FakeElement::new(
                    "nav-delete",
                    Kind::Link,
                    &["a", r#"a[href="/delete_account"]"#],
                    " Delete Account",
                ));
            }
        }
        elements.push(FakeElement::new(
            "nav-contact",
            Kind::Link,
            &["a", r#"a[href="/contact_us"]"#],
            " Contact us",
        ));
        if let Some(name) = self.signed_in_as() {
            elements.push(FakeElement::new(
                "nav-user",
                Kind::Link,
                &["a"],
                format!(" Logged in as {}", name),
            ));
        }

        match self.page {
            FakePage::Home => {
                elements.push(FakeElement::new("features", Kind::Static, &["h2"], "Features Items"));
            }
            FakePage::Login => {
                elements.push(FakeElement::new(
                    "login-heading",
                    Kind::Static,
                    &["h2"],
                    banners::LOGIN_HEADING,
                ));
                elements.push(FakeElement::qa("login-email", Kind::Input, "input", ""));
                elements.push(FakeElement::qa("login-password", Kind::Input, "input", ""));
                if self.login_error {
                    elements.push(FakeElement::new(
                        "login-error",
                        Kind::Static,
                        &["p", r#"form[action="/login"] p"#],
                        banners::INCORRECT_CREDENTIALS,
                    ));
                }
                elements.push(FakeElement::qa("login-button", Kind::Button, "button", "Login"));
                elements.push(FakeElement::new(
                    "signup-heading",
                    Kind::Static,
                    &["h2"],
                    banners::SIGNUP_HEADING,
                ));
                elements.push(FakeElement::qa("signup-name", Kind::Input, "input", ""));
                elements.push(FakeElement::qa("signup-email", Kind::Input, "input", ""));
                if self.signup_error {
                    elements.push(FakeElement::new(
                        "signup-error",
                        Kind::Static,
                        &["p", r#"form[action="/signup"] p"#],
                        banners::EMAIL_EXISTS,
                    ));
                }
                elements.push(FakeElement::qa("signup-button", Kind::Button, "button", "Signup"));
            }
            FakePage::Signup => {
                elements.push(FakeElement::new(
                    "account-info",
                    Kind::Static,
                    &["h2", "b"],
                    banners::ACCOUNT_INFORMATION,
                ));
                elements.push(FakeElement::new("id_gender1", Kind::Radio, &["input", "#id_gender1"], ""));
                elements.push(FakeElement::new("id_gender2", Kind::Radio, &["input", "#id_gender2"], ""));
                elements.push(FakeElement::qa("password", Kind::Input, "input", ""));
                elements.push(FakeElement::qa("days", Kind::Select, "select", ""));
                elements.push(FakeElement::qa("months", Kind::Select, "select", ""));
                elements.push(FakeElement::qa("years", Kind::Select, "select", ""));
                elements.push(FakeElement::new("newsletter", Kind::Checkbox, &["input", "#newsletter"], ""));
                elements.push(FakeElement::new("optin", Kind::Checkbox, &["input", "#optin"], ""));
                for field in ["first_name", "last_name", "company", "address", "address2"] {
                    elements.push(FakeElement::qa(field, Kind::Input, "input", ""));
                }
                elements.push(FakeElement::qa("country", Kind::Select, "select", ""));
                for field in ["state", "city", "zipcode", "mobile_number"] {
                    elements.push(FakeElement::qa(field, Kind::Input, "input", ""));
                }
                elements.push(FakeElement::qa(
                    "create-account",
                    Kind::Button,
                    "button",
                    "Create Account",
                ));
            }
            FakePage::AccountCreated => {
                elements.push(FakeElement::qa(
                    "account-created",
                    Kind::Static,
                    "h2",
                    banners::ACCOUNT_CREATED,
                ));
                elements.push(FakeElement::qa("continue-button", Kind::Link, "a", "Continue"));
            }
            FakePage::AccountDeleted => {
                elements.push(FakeElement::qa(
                    "account-deleted",
                    Kind::Static,
                    "h2",
                    banners::ACCOUNT_DELETED,
                ));
                elements.push(FakeElement::qa("continue-button", Kind::Link, "a", "Continue"));
            }
            FakePage::Contact => {
                elements.push(FakeElement::new(
                    "contact-form",
                    Kind::Static,
                    &["div", "div.contact-form"],
                    "Get In Touch",
                ));
                if self.contact_sent {
                    elements.push(FakeElement::new(
                        "status",
                        Kind::Static,
                        &["div", ".status", "div.status"],
                        banners::CONTACT_SUCCESS,
                    ));
                }
                for field in ["name", "email", "subject"] {
                    elements.push(FakeElement::qa(field, Kind::Input, "input", ""));
                }
                elements.push(FakeElement::qa("message", Kind::Input, "textarea", ""));
                elements.push(FakeElement::new(
                    "upload_file",
                    Kind::File,
                    &["input", r#"input[type="file"]"#, r#"input[name="upload_file"]"#],
                    "",
                ));
                elements.push(FakeElement::qa("submit-button", Kind::Button, "input", "Submit"));
            }
        }

        let body_text = elements
            .iter()
            .map(|e| e.text.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n");
        elements.push(FakeElement::new("body", Kind::Static, &["body"], body_text));
        elements
    }

    fn lookup(&self, selector: &Selector) -> Option<FakeElement> {
        self.elements().into_iter().find(|e| e.matches(selector))
    }

    fn issue_handle(&mut self, element: &FakeElement, selector: &Selector) -> ElementHandle {
        let id = self.next_handle;
        self.next_handle += 1;
        self.handles.insert(id, (self.generation, element.key));
        ElementHandle::new(id, selector.clone())
    }

    /// Resolve a handle against the current page
    fn resolve(&self, action: &str, handle: &ElementHandle) -> E2eResult<FakeElement> {
        let (generation, key) = self
            .handles
            .get(&handle.id())
            .copied()
            .ok_or_else(|| E2eError::interaction(action, handle.selector(), "unknown element handle"))?;

        if generation != self.generation {
            return Err(E2eError::interaction(action, handle.selector(), "stale element handle"));
        }

        self.elements()
            .into_iter()
            .find(|e| e.key == key)
            .ok_or_else(|| E2eError::interaction(action, handle.selector(), "element detached"))
    }

    /// Resolve a handle that is about to receive input
    fn interactable(&self, action: &str, handle: &ElementHandle) -> E2eResult<FakeElement> {
        let element = self.resolve(action, handle)?;
        if self.refused.contains(element.key) {
            return Err(E2eError::interaction(action, handle.selector(), "element is not interactable"));
        }
        Ok(element)
    }

    fn input(&self, key: &str) -> String {
        self.inputs.get(key).cloned().unwrap_or_default()
    }

    fn accepts_option(key: &str, value: &str) -> bool {
        match key {
            "days" => value.parse::<u32>().map(|d| (1..=31).contains(&d)).unwrap_or(false),
            "months" => {
                MONTHS.contains(&value)
                    || value.parse::<u32>().map(|m| (1..=12).contains(&m)).unwrap_or(false)
            }
            "years" => value.parse::<u32>().map(|y| (1900..=2021).contains(&y)).unwrap_or(false),
            "country" => COUNTRIES.contains(&value),
            _ => false,
        }
    }

    fn submit_login(&mut self) {
        let email = self.input("login-email");
        let password = self.input("login-password");
        let valid = self
            .accounts
            .get(&email)
            .map(|account| account.password == password)
            .unwrap_or(false);

        if valid {
            self.session = Some(email);
            self.goto(FakePage::Home);
        } else {
            self.goto(FakePage::Login);
            self.login_error = true;
        }
    }

    fn submit_signup(&mut self) {
        let name = self.input("signup-name");
        let email = self.input("signup-email");
        if name.is_empty() || email.is_empty() {
            // Blocked by the browser's required-field validation
            return;
        }

        if self.accounts.contains_key(&email) {
            self.goto(FakePage::Login);
            self.signup_error = true;
        } else {
            self.goto(FakePage::Signup);
            self.pending_signup = Some((name, email));
        }
    }

    fn create_account(&mut self) {
        let missing_required = REQUIRED_DETAILS
            .iter()
            .any(|field| self.input(field).is_empty())
            || !self.selections.contains_key("country");
        if missing_required {
            return;
        }
        let Some((name, email)) = self.pending_signup.take() else {
            return;
        };

        let mut details: BTreeMap<String, String> = self
            .inputs
            .iter()
            .filter(|(key, _)| **key != "password")
            .map(|(key, value)| (key.to_string(), value.clone()))
            .collect();
        details.extend(
            self.selections
                .iter()
                .map(|(key, value)| (key.to_string(), value.clone())),
        );

        let account = FakeAccount {
            name,
            email: email.clone(),
            password: self.input("password"),
            newsletter: self.checked.contains("newsletter"),
            optin: self.checked.contains("optin"),
            details,
        };
        self.accounts.insert(email.clone(), account);
        self.last_created = Some(email);
        self.goto(FakePage::AccountCreated);
    }

    fn submit_contact(&mut self) {
        let submission = ContactSubmission {
            name: self.input("name"),
            email: self.input("email"),
            subject: self.input("subject"),
            message: self.input("message"),
            attachment: self.upload.clone(),
        };
        if submission.name.is_empty() || submission.email.is_empty() || submission.message.is_empty() {
            return;
        }
        self.contact_submissions.push(submission);
        self.goto(FakePage::Contact);
        self.contact_sent = true;
    }

    fn activate(&mut self, key: &'static str) {
        match key {
            "nav-home" => self.goto(FakePage::Home),
            "nav-login" => self.goto(FakePage::Login),
            "nav-contact" => self.goto(FakePage::Contact),
            "nav-logout" => {
                self.session = None;
                self.goto(FakePage::Login);
            }
            "nav-delete" => {
                if let Some(email) = self.session.take() {
                    self.accounts.remove(&email);
                }
                self.goto(FakePage::AccountDeleted);
            }
            "login-button" => self.submit_login(),
            "signup-button" => self.submit_signup(),
            "id_gender1" => {
                self.selections.insert("gender", "male".to_string());
            }
            "id_gender2" => {
                self.selections.insert("gender", "female".to_string());
            }
            "create-account" => self.create_account(),
            "continue-button" => {
                if self.page == FakePage::AccountCreated {
                    self.session = self.last_created.take();
                }
                self.goto(FakePage::Home);
            }
            "submit-button" => self.submit_contact(),
            _ => {}
        }
    }
}

#[async_trait]
impl PageDriver for FakeStorefront {
    async fn navigate(&mut self, url: &str) -> E2eResult<()> {
        self.actions.push(format!("navigate:{}", url));

        let target = self
            .base_url
            .join(url)
            .map_err(|e| E2eError::Playwright(format!("invalid URL {}: {}", url, e)))?;
        if target.host_str() != self.base_url.host_str() {
            return Err(E2eError::Playwright(format!(
                "fake storefront does not serve {}",
                url
            )));
        }

        let page = match target.path() {
            "/" => FakePage::Home,
            "/login" => FakePage::Login,
            "/contact_us" => FakePage::Contact,
            other => {
                return Err(E2eError::Playwright(format!(
                    "fake storefront has no page at {}",
                    other
                )))
            }
        };
        self.pending_signup = None;
        self.goto(page);
        Ok(())
    }

    async fn find(&mut self, selector: &Selector) -> E2eResult<ElementHandle> {
        match self.lookup(selector) {
            Some(element) => Ok(self.issue_handle(&element, selector)),
            None => Err(E2eError::ElementNotFound {
                selector: selector.to_string(),
                timeout_ms: self.element_timeout_ms,
            }),
        }
    }

    async fn query(&mut self, selector: &Selector) -> E2eResult<Option<ElementHandle>> {
        Ok(self
            .lookup(selector)
            .map(|element| self.issue_handle(&element, selector)))
    }

    async fn type_text(&mut self, element: &ElementHandle, text: &str) -> E2eResult<()> {
        let target = self.interactable("type into", element)?;
        if target.kind != Kind::Input {
            return Err(E2eError::interaction("type into", element.selector(), "not a text input"));
        }
        self.actions.push(format!("type:{}", target.key));
        self.inputs.entry(target.key).or_default().push_str(text);
        Ok(())
    }

    async fn click(&mut self, element: &ElementHandle) -> E2eResult<()> {
        let target = self.interactable("click", element)?;
        self.actions.push(format!("click:{}", target.key));
        self.activate(target.key);
        Ok(())
    }

    async fn select(&mut self, element: &ElementHandle, value: &str) -> E2eResult<()> {
        let target = self.interactable("select", element)?;
        if target.kind != Kind::Select {
            return Err(E2eError::interaction("select", element.selector(), "not a dropdown"));
        }
        if !Self::accepts_option(target.key, value) {
            return Err(E2eError::interaction(
                "select",
                element.selector(),
                format!("no option {:?}", value),
            ));
        }
        self.actions.push(format!("select:{}", target.key));
        self.selections.insert(target.key, value.to_string());
        Ok(())
    }

    async fn check(&mut self, element: &ElementHandle) -> E2eResult<()> {
        let target = self.interactable("check", element)?;
        if !matches!(target.kind, Kind::Checkbox | Kind::Radio) {
            return Err(E2eError::interaction("check", element.selector(), "not a checkbox"));
        }
        self.actions.push(format!("check:{}", target.key));
        self.checked.insert(target.key);
        Ok(())
    }

    async fn upload_file(&mut self, element: &ElementHandle, path: &Path) -> E2eResult<()> {
        let target = self.interactable("upload to", element)?;
        if target.kind != Kind::File {
            return Err(E2eError::interaction("upload to", element.selector(), "not a file input"));
        }
        if !path.is_file() {
            return Err(E2eError::interaction(
                "upload to",
                element.selector(),
                format!("no such file {}", path.display()),
            ));
        }
        self.actions.push(format!("upload:{}", target.key));
        self.upload = Some(path.to_path_buf());
        Ok(())
    }

    async fn text_of(&mut self, element: &ElementHandle) -> E2eResult<String> {
        Ok(self.resolve("read", element)?.text)
    }

    async fn is_visible(&mut self, element: &ElementHandle) -> E2eResult<bool> {
        self.resolve("inspect", element).map(|_| true)
    }

    async fn current_url_path(&mut self) -> E2eResult<String> {
        Ok(self.page.path().to_string())
    }

    async fn screenshot(&mut self, path: &Path) -> E2eResult<()> {
        std::fs::write(path, PNG_SIGNATURE)?;
        self.screenshots.push(path.to_path_buf());
        Ok(())
    }

    async fn reset_session(&mut self) -> E2eResult<()> {
        self.session = None;
        self.pending_signup = None;
        self.last_created = None;
        self.handles.clear();
        Ok(())
    }
}
