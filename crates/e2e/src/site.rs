//! Target storefront: page text, selectors and a reachability probe

use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{info, warn};

use crate::error::{E2eError, E2eResult};

/// Public demo storefront the suite runs against
pub const DEFAULT_BASE_URL: &str = "https://automationexercise.com";

/// Literal text the site renders after an action
pub mod banners {
    pub const ACCOUNT_CREATED: &str = "Account Created!";
    pub const ACCOUNT_DELETED: &str = "Account Deleted!";
    pub const EMAIL_EXISTS: &str = "Email Address already exist!";
    pub const INCORRECT_CREDENTIALS: &str = "Your email or password is incorrect!";
    pub const LOGIN_HEADING: &str = "Login to your account";
    pub const SIGNUP_HEADING: &str = "New User Signup!";
    pub const ACCOUNT_INFORMATION: &str = "Enter Account Information";
    pub const CONTACT_SUCCESS: &str = "Success! Your details have been submitted successfully.";
}

/// Link texts and CSS hooks that have no `data-qa` attribute
pub mod links {
    pub const SIGNUP_LOGIN: &str = "Signup / Login";
    pub const CONTACT_US: &str = "Contact us";
    pub const HOME: &str = "Home";
    pub const LOGOUT: &str = r#"a[href="/logout"]"#;
    pub const DELETE_ACCOUNT: &str = r#"a[href="/delete_account"]"#;
    pub const SIGNUP_ERROR: &str = r#"form[action="/signup"] p"#;
    pub const CONTACT_FORM: &str = "div.contact-form";
    pub const CONTACT_STATUS: &str = ".status";
    pub const FILE_INPUT: &str = r#"input[type="file"]"#;
    pub const NEWSLETTER: &str = "#newsletter";
    pub const OPTIN: &str = "#optin";
}

/// Poll `base_url` until it answers with a success status.
///
/// Runs before a browser is launched so an offline site fails the run once
/// instead of failing every scenario on its first navigation.
pub async fn wait_until_reachable(base_url: &str, timeout_duration: Duration) -> E2eResult<()> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()?;

    let start = Instant::now();
    let mut attempts = 0;

    while start.elapsed() < timeout_duration {
        attempts += 1;

        match client.get(base_url).send().await {
            Ok(resp) if resp.status().is_success() => {
                info!("Site is reachable at {}", base_url);
                return Ok(());
            }
            Ok(resp) => {
                warn!("Preflight returned {}", resp.status());
            }
            Err(e) => {
                if attempts == 1 {
                    info!("Waiting for {} to respond...", base_url);
                }
                if !e.is_connect() {
                    warn!("Preflight error: {}", e);
                }
            }
        }

        sleep(Duration::from_millis(250)).await;
    }

    Err(E2eError::SiteUnreachable(attempts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_reachable_site() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = [0u8; 1024];
                let _ = socket.read(&mut buf).await;
                let _ = socket
                    .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\nConnection: close\r\n\r\nok")
                    .await;
            }
        });

        wait_until_reachable(&format!("http://{}", addr), Duration::from_secs(5))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_unreachable_site() {
        // Grab a free port, then close it so nothing is listening
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = wait_until_reachable(&format!("http://{}", addr), Duration::from_millis(600))
            .await
            .unwrap_err();
        match err {
            E2eError::SiteUnreachable(attempts) => assert!(attempts >= 1),
            other => panic!("unexpected error: {}", other),
        }
    }
}
