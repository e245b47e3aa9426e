//! Reusable multi-step user workflows
//!
//! Each command takes the browser session explicitly and drives it through
//! one user action on the storefront. Commands only assert the intermediate
//! page states they depend on; final outcomes are checked by the caller.

use tracing::{debug, info};

use storefront_common::{ContactMessage, UserRecord};

use crate::driver::{PageDriver, Selector};
use crate::error::E2eResult;
use crate::expect::{
    expect_contains_text, expect_path_contains, expect_text_visible, expect_visible,
    wait_for_first, WaitConfig,
};
use crate::site::{banners, links};

/// Which way a signup attempt went
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignupOutcome {
    /// A new account was created and the user is signed in
    Created(UserRecord),

    /// The site already has an account for this email. Nothing past the
    /// name/email step was submitted.
    AlreadyExists(UserRecord),
}

impl SignupOutcome {
    pub fn user(&self) -> &UserRecord {
        match self {
            SignupOutcome::Created(user) | SignupOutcome::AlreadyExists(user) => user,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, SignupOutcome::Created(_))
    }
}

async fn click<D>(driver: &mut D, selector: &Selector) -> E2eResult<()>
where
    D: PageDriver + ?Sized,
{
    let element = driver.find(selector).await?;
    driver.click(&element).await
}

async fn fill<D>(driver: &mut D, data_qa: &str, text: &str) -> E2eResult<()>
where
    D: PageDriver + ?Sized,
{
    // Typing nothing is not an interaction; leave optional fields blank
    if text.is_empty() {
        debug!("Leaving {} empty", data_qa);
        return Ok(());
    }
    let element = driver.find(&Selector::data_qa(data_qa)).await?;
    driver.type_text(&element, text).await
}

async fn choose<D>(driver: &mut D, data_qa: &str, value: &str) -> E2eResult<()>
where
    D: PageDriver + ?Sized,
{
    let element = driver.find(&Selector::data_qa(data_qa)).await?;
    driver.select(&element, value).await
}

async fn tick<D>(driver: &mut D, css: &str) -> E2eResult<()>
where
    D: PageDriver + ?Sized,
{
    let element = driver.find(&Selector::css(css)).await?;
    driver.check(&element).await
}

/// Register `user` through the signup form.
///
/// Returns [`SignupOutcome::AlreadyExists`] as soon as the signup form reports
/// the email is taken; that branch is an outcome, not an error. Every other
/// deviation from the expected pages fails the command.
pub async fn signup_user<D>(
    driver: &mut D,
    user: &UserRecord,
    wait: WaitConfig,
) -> E2eResult<SignupOutcome>
where
    D: PageDriver + ?Sized,
{
    info!("Signing up {} <{}>", user.name, user.email);

    click(driver, &Selector::text(links::SIGNUP_LOGIN)).await?;
    expect_text_visible(driver, banners::SIGNUP_HEADING, wait).await?;

    fill(driver, "signup-name", &user.name).await?;
    fill(driver, "signup-email", &user.email).await?;
    click(driver, &Selector::data_qa("signup-button")).await?;

    let branches = [
        Selector::css_with_text(links::SIGNUP_ERROR, banners::EMAIL_EXISTS),
        Selector::text(banners::ACCOUNT_INFORMATION),
    ];
    if wait_for_first(driver, &branches, wait).await? == 0 {
        info!("{} is already registered, skipping account details", user.email);
        return Ok(SignupOutcome::AlreadyExists(user.clone()));
    }

    click(driver, &Selector::css(user.gender.radio_selector())).await?;
    fill(driver, "password", &user.password).await?;
    choose(driver, "days", &user.day).await?;
    choose(driver, "months", &user.month).await?;
    choose(driver, "years", &user.year).await?;

    if user.newsletter {
        tick(driver, links::NEWSLETTER).await?;
    }
    if user.optin {
        tick(driver, links::OPTIN).await?;
    }

    fill(driver, "first_name", &user.first_name).await?;
    fill(driver, "last_name", &user.last_name).await?;
    fill(driver, "company", &user.company).await?;
    fill(driver, "address", &user.address).await?;
    fill(driver, "address2", &user.address2).await?;
    choose(driver, "country", &user.country).await?;
    fill(driver, "state", &user.state).await?;
    fill(driver, "city", &user.city).await?;
    fill(driver, "zipcode", &user.zipcode).await?;
    fill(driver, "mobile_number", &user.mobile).await?;

    click(driver, &Selector::data_qa("create-account")).await?;
    expect_text_visible(driver, banners::ACCOUNT_CREATED, wait).await?;
    click(driver, &Selector::data_qa("continue-button")).await?;
    expect_text_visible(driver, &user.logged_in_banner(), wait).await?;

    info!("Created account for {}", user.email);
    Ok(SignupOutcome::Created(user.clone()))
}

/// Submit the login form with `user`'s credentials.
///
/// Makes no claim about the result: the same command drives both the
/// successful and the rejected login scenarios.
pub async fn login_user<D>(driver: &mut D, user: &UserRecord, wait: WaitConfig) -> E2eResult<()>
where
    D: PageDriver + ?Sized,
{
    info!("Logging in as {}", user.email);

    expect_visible(driver, &Selector::css("body"), wait).await?;
    click(driver, &Selector::text(links::SIGNUP_LOGIN)).await?;

    fill(driver, "login-email", &user.email).await?;
    fill(driver, "login-password", &user.password).await?;
    click(driver, &Selector::data_qa("login-button")).await
}

/// Sign out and land on the login view
pub async fn logout_user<D>(driver: &mut D, wait: WaitConfig) -> E2eResult<()>
where
    D: PageDriver + ?Sized,
{
    click(driver, &Selector::css(links::LOGOUT)).await?;
    expect_text_visible(driver, banners::LOGIN_HEADING, wait).await?;
    Ok(())
}

/// Delete the signed-in account
pub async fn delete_account<D>(driver: &mut D, wait: WaitConfig) -> E2eResult<()>
where
    D: PageDriver + ?Sized,
{
    click(driver, &Selector::css(links::DELETE_ACCOUNT)).await?;
    expect_text_visible(driver, banners::ACCOUNT_DELETED, wait).await?;
    click(driver, &Selector::data_qa("continue-button")).await
}

/// Fill and send the contact form, attachment included
pub async fn submit_contact_form<D>(
    driver: &mut D,
    message: &ContactMessage,
    wait: WaitConfig,
) -> E2eResult<()>
where
    D: PageDriver + ?Sized,
{
    info!("Sending contact message as {}", message.email);

    click(driver, &Selector::css_with_text("a", links::CONTACT_US)).await?;
    expect_path_contains(driver, "/contact_us", wait).await?;
    expect_visible(driver, &Selector::css(links::CONTACT_FORM), wait).await?;

    fill(driver, "name", &message.name).await?;
    fill(driver, "email", &message.email).await?;
    fill(driver, "subject", &message.subject).await?;
    fill(driver, "message", &message.message).await?;

    let upload = driver.find(&Selector::css(links::FILE_INPUT)).await?;
    driver.upload_file(&upload, &message.attachment).await?;

    click(driver, &Selector::data_qa("submit-button")).await?;
    expect_contains_text(
        driver,
        &Selector::css(links::CONTACT_STATUS),
        banners::CONTACT_SUCCESS,
        wait,
    )
    .await
}
