//! The storefront scenarios
//!
//! Every scenario starts by navigating to the base URL and owns its own
//! setup; none relies on state left by another.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

use storefront_common::{ContactMessage, Error as CommonError, FixtureStore, UserRecord};

use crate::config::SuiteConfig;
use crate::driver::{PageDriver, Selector};
use crate::error::{E2eError, E2eResult};
use crate::expect::{expect_absent, expect_path, expect_text_visible, expect_visible, WaitConfig};
use crate::site::{banners, links};
use crate::workflow::{
    delete_account, login_user, logout_user, signup_user, submit_contact_form, SignupOutcome,
};

/// Email no account is registered under
pub const UNKNOWN_EMAIL: &str = "wrong.email@example.com";

/// Fixture slot of the already-registered user
const EXISTING_USER: usize = 0;

/// Fixture slot of the user the signup scenarios register
const NEW_USER: usize = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scenario {
    ContactFormSubmission,
    LoginWithValidCredentials,
    LoginWithIncorrectEmail,
    LoginWithIncorrectPassword,
    LogoutUser,
    RegisterUser,
    RegisterUserWithExistingEmail,
}

impl Scenario {
    pub const ALL: [Scenario; 7] = [
        Scenario::ContactFormSubmission,
        Scenario::LoginWithValidCredentials,
        Scenario::LoginWithIncorrectEmail,
        Scenario::LoginWithIncorrectPassword,
        Scenario::LogoutUser,
        Scenario::RegisterUser,
        Scenario::RegisterUserWithExistingEmail,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Scenario::ContactFormSubmission => "contact_form_submission",
            Scenario::LoginWithValidCredentials => "login_with_valid_credentials",
            Scenario::LoginWithIncorrectEmail => "login_with_incorrect_email",
            Scenario::LoginWithIncorrectPassword => "login_with_incorrect_password",
            Scenario::LogoutUser => "logout_user",
            Scenario::RegisterUser => "register_user",
            Scenario::RegisterUserWithExistingEmail => "register_user_with_existing_email",
        }
    }

    pub fn tags(&self) -> &'static [&'static str] {
        match self {
            Scenario::ContactFormSubmission => &["contact", "smoke"],
            Scenario::LoginWithValidCredentials => &["login", "smoke"],
            Scenario::LoginWithIncorrectEmail | Scenario::LoginWithIncorrectPassword => &["login"],
            Scenario::LogoutUser => &["login"],
            Scenario::RegisterUser => &["signup", "smoke"],
            Scenario::RegisterUserWithExistingEmail => &["signup"],
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.name() == name)
    }

    /// Fixture records this scenario reads
    fn required_users(&self) -> usize {
        match self {
            Scenario::RegisterUser | Scenario::RegisterUserWithExistingEmail => NEW_USER + 1,
            _ => EXISTING_USER + 1,
        }
    }

    /// Run the scenario from a fresh navigation to the base URL
    pub async fn run<D>(&self, driver: &mut D, ctx: &ScenarioContext) -> E2eResult<()>
    where
        D: PageDriver + ?Sized,
    {
        info!("Scenario {}", self.name());
        driver.navigate(&ctx.base_url).await?;
        let wait = ctx.wait;

        match self {
            Scenario::ContactFormSubmission => {
                let message = ctx.contact_message(ctx.user(EXISTING_USER)?);
                submit_contact_form(driver, &message, wait).await?;

                let home = driver.find(&Selector::css_with_text("a", links::HOME)).await?;
                driver.click(&home).await?;
                expect_path(driver, "/", wait).await
            }
            Scenario::LoginWithValidCredentials => {
                let user = ctx.user(EXISTING_USER)?;
                login_user(driver, user, wait).await?;
                expect_text_visible(driver, &user.logged_in_banner(), wait).await?;
                Ok(())
            }
            Scenario::LoginWithIncorrectEmail => {
                let user = ctx.user(EXISTING_USER)?.with_email(UNKNOWN_EMAIL);
                login_user(driver, &user, wait).await?;
                expect_text_visible(driver, banners::INCORRECT_CREDENTIALS, wait).await?;
                Ok(())
            }
            Scenario::LoginWithIncorrectPassword => {
                let known = ctx.user(EXISTING_USER)?;
                let user = known.with_password(format!("{}-wrong", known.password));
                login_user(driver, &user, wait).await?;
                expect_text_visible(driver, banners::INCORRECT_CREDENTIALS, wait).await?;
                expect_absent(driver, &Selector::text(user.logged_in_banner())).await
            }
            Scenario::LogoutUser => {
                let user = ctx.user(EXISTING_USER)?;
                login_user(driver, user, wait).await?;
                expect_text_visible(driver, &user.logged_in_banner(), wait).await?;
                logout_user(driver, wait).await
            }
            Scenario::RegisterUser => {
                let user = ctx.user(NEW_USER)?;
                match signup_user(driver, user, wait).await? {
                    SignupOutcome::Created(created) => {
                        expect_text_visible(driver, &created.logged_in_banner(), wait).await?;
                    }
                    SignupOutcome::AlreadyExists(existing) => {
                        return Err(E2eError::AssertionFailed(format!(
                            "expected a new account for {}, but the site says it already exists",
                            existing.email
                        )));
                    }
                }
                expect_visible(driver, &Selector::css(links::LOGOUT), wait).await?;
                delete_account(driver, wait).await
            }
            Scenario::RegisterUserWithExistingEmail => {
                let registered = ctx.user(EXISTING_USER)?;
                let user = ctx.user(NEW_USER)?.with_email(registered.email.clone());
                match signup_user(driver, &user, wait).await? {
                    SignupOutcome::AlreadyExists(_) => {
                        expect_text_visible(driver, banners::EMAIL_EXISTS, wait).await?;
                        Ok(())
                    }
                    SignupOutcome::Created(created) => Err(E2eError::AssertionFailed(format!(
                        "signup with registered email {} created a new account",
                        created.email
                    ))),
                }
            }
        }
    }
}

/// Inputs shared by every scenario in a run
#[derive(Debug, Clone)]
pub struct ScenarioContext {
    pub base_url: String,
    pub users: Vec<UserRecord>,
    pub wait: WaitConfig,
    pub contact_subject: String,
    pub contact_message: String,
    pub attachment: PathBuf,
    pub fixtures_path: PathBuf,
}

impl ScenarioContext {
    /// Load fixtures for `config` and check they cover every scenario
    pub fn load(config: &SuiteConfig) -> E2eResult<Self> {
        let store = FixtureStore::from_path(&config.fixtures_path);
        let users = store.load()?;

        let required = Scenario::ALL
            .iter()
            .map(Scenario::required_users)
            .max()
            .unwrap_or(0);
        if users.len() < required {
            return Err(CommonError::fixture(
                store.path(),
                format!("scenarios need {} users, fixture has {}", required, users.len()),
            )
            .into());
        }

        Ok(Self {
            base_url: config.base_url.clone(),
            users,
            wait: config.wait(),
            contact_subject: config.contact_subject.clone(),
            contact_message: config.contact_message.clone(),
            attachment: config.attachment_path.clone(),
            fixtures_path: store.path().to_path_buf(),
        })
    }

    pub fn user(&self, index: usize) -> E2eResult<&UserRecord> {
        self.users.get(index).ok_or_else(|| {
            CommonError::fixture(&self.fixtures_path, format!("no user at index {}", index)).into()
        })
    }

    fn contact_message(&self, user: &UserRecord) -> ContactMessage {
        ContactMessage::from_user(
            user,
            self.contact_subject.clone(),
            self.contact_message.clone(),
            self.attachment.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for scenario in Scenario::ALL {
            assert_eq!(Scenario::from_name(scenario.name()), Some(scenario));
        }
        assert_eq!(Scenario::from_name("nope"), None);
    }

    #[test]
    fn test_every_scenario_is_tagged() {
        for scenario in Scenario::ALL {
            assert!(!scenario.tags().is_empty(), "{} has no tags", scenario.name());
        }
        let smoke: Vec<_> = Scenario::ALL
            .iter()
            .filter(|s| s.tags().contains(&"smoke"))
            .collect();
        assert_eq!(smoke.len(), 3);
    }

    #[test]
    fn test_missing_fixture_user_is_a_fixture_error() {
        let ctx = ScenarioContext {
            base_url: "https://shop.test".to_string(),
            users: Vec::new(),
            wait: WaitConfig::default(),
            contact_subject: String::new(),
            contact_message: String::new(),
            attachment: PathBuf::from("Helloworld.txt"),
            fixtures_path: PathBuf::from("users.json"),
        };
        let err = ctx.user(NEW_USER).unwrap_err();
        assert_eq!(err.kind(), "fixture_load");
        assert!(err.to_string().contains("no user at index 1"), "got: {}", err);
    }

    #[test]
    fn test_serialized_name_matches() {
        let value = serde_json::to_value(Scenario::RegisterUserWithExistingEmail).unwrap();
        assert_eq!(value, Scenario::RegisterUserWithExistingEmail.name());
    }
}
