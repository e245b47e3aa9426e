//! Core types for the storefront suite

use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;

/// Gender radio choice on the account-information form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    /// CSS selector of the matching radio button
    pub fn radio_selector(&self) -> &'static str {
        match self {
            Gender::Male => "#id_gender1",
            Gender::Female => "#id_gender2",
        }
    }
}

/// A user as stored in the fixture file.
///
/// Records are never mutated once loaded. Scenarios that need a variation
/// (a duplicate email, a wrong password) derive a copy with [`UserRecord::with_email`]
/// or [`UserRecord::with_password`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub name: String,
    pub email: String,
    pub gender: Gender,
    pub password: String,

    /// Date of birth, kept as the three dropdown values the form expects
    #[serde(deserialize_with = "string_or_number")]
    pub day: String,
    pub month: String,
    #[serde(deserialize_with = "string_or_number")]
    pub year: String,

    pub newsletter: bool,
    pub optin: bool,

    pub first_name: String,
    pub last_name: String,
    pub company: String,
    pub address: String,
    pub address2: String,
    pub country: String,
    pub state: String,
    pub city: String,
    #[serde(deserialize_with = "string_or_number")]
    pub zipcode: String,
    #[serde(deserialize_with = "string_or_number")]
    pub mobile: String,
}

impl UserRecord {
    /// Copy of this record with a different email
    pub fn with_email(&self, email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            ..self.clone()
        }
    }

    /// Copy of this record with a different password
    pub fn with_password(&self, password: impl Into<String>) -> Self {
        Self {
            password: password.into(),
            ..self.clone()
        }
    }

    /// Banner text the site shows in the nav bar once this user is signed in
    pub fn logged_in_banner(&self) -> String {
        format!("Logged in as {}", self.name)
    }
}

/// A contact-form submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactMessage {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    pub attachment: PathBuf,
}

impl ContactMessage {
    /// Build a message sent on behalf of a fixture user
    pub fn from_user(
        user: &UserRecord,
        subject: impl Into<String>,
        message: impl Into<String>,
        attachment: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: user.name.clone(),
            email: user.email.clone(),
            subject: subject.into(),
            message: message.into(),
            attachment: attachment.into(),
        }
    }
}

/// Accepts `"12"` or `12` and yields `"12"`. Anything else is a type error.
fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        String(String),
        Number(serde_json::Number),
    }

    match StringOrNumber::deserialize(deserializer) {
        Ok(StringOrNumber::String(s)) => Ok(s),
        Ok(StringOrNumber::Number(n)) => Ok(n.to_string()),
        Err(_) => Err(serde::de::Error::custom("expected a string or a number")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> serde_json::Value {
        json!({
            "name": "Patrick",
            "email": "patrick@example.com",
            "gender": "male",
            "password": "secret",
            "day": 12,
            "month": "May",
            "year": "1990",
            "newsletter": true,
            "optin": false,
            "firstName": "Patrick",
            "lastName": "Durand",
            "company": "Acme",
            "address": "1 Main St",
            "address2": "Apt 2",
            "country": "Canada",
            "state": "Quebec",
            "city": "Montreal",
            "zipcode": 12345,
            "mobile": "0600000000"
        })
    }

    #[test]
    fn test_numbers_are_normalized_to_strings() {
        let user: UserRecord = serde_json::from_value(sample()).unwrap();
        assert_eq!(user.day, "12");
        assert_eq!(user.year, "1990");
        assert_eq!(user.zipcode, "12345");
        assert_eq!(user.first_name, "Patrick");
        assert_eq!(user.gender, Gender::Male);
    }

    #[test]
    fn test_bool_in_numeric_field_is_rejected() {
        let mut value = sample();
        value["zipcode"] = json!(true);
        assert!(serde_json::from_value::<UserRecord>(value).is_err());
    }

    #[test]
    fn test_unknown_gender_is_rejected() {
        let mut value = sample();
        value["gender"] = json!("other");
        assert!(serde_json::from_value::<UserRecord>(value).is_err());
    }

    #[test]
    fn test_derived_copy_leaves_source_untouched() {
        let user: UserRecord = serde_json::from_value(sample()).unwrap();
        let copy = user.with_email("someone@else.com");
        assert_eq!(user.email, "patrick@example.com");
        assert_eq!(copy.email, "someone@else.com");
        assert_eq!(copy.name, user.name);

        let wrong = user.with_password("nope");
        assert_eq!(user.password, "secret");
        assert_eq!(wrong.password, "nope");
    }

    #[test]
    fn test_gender_radio_selector() {
        assert_eq!(Gender::Male.radio_selector(), "#id_gender1");
        assert_eq!(Gender::Female.radio_selector(), "#id_gender2");
    }
}
