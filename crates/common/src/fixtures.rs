//! Fixture store: user records read from a JSON file

use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{Error, Result};
use crate::types::UserRecord;

/// Read-only source of [`UserRecord`]s, addressed by position
#[derive(Debug, Clone)]
pub struct FixtureStore {
    path: PathBuf,
}

impl FixtureStore {
    /// Create a store backed by the given JSON file
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load every record, in file order.
    ///
    /// The file must hold a non-empty JSON array. Each entry is validated on
    /// its own so the error names the offending index.
    pub fn load(&self) -> Result<Vec<UserRecord>> {
        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| Error::fixture(&self.path, format!("cannot read file: {}", e)))?;
        Self::parse(&self.path, &content)
    }

    /// Clone of the record at `index`
    pub fn user(&self, index: usize) -> Result<UserRecord> {
        let users = self.load()?;
        users
            .into_iter()
            .nth(index)
            .ok_or_else(|| Error::fixture(&self.path, format!("no user at index {}", index)))
    }

    fn parse(path: &Path, content: &str) -> Result<Vec<UserRecord>> {
        let entries: Vec<serde_json::Value> = serde_json::from_str(content)
            .map_err(|e| Error::fixture(path, format!("expected a JSON array of users: {}", e)))?;

        if entries.is_empty() {
            return Err(Error::fixture(path, "fixture contains no users"));
        }

        let users = entries
            .into_iter()
            .enumerate()
            .map(|(i, entry)| {
                serde_json::from_value::<UserRecord>(entry)
                    .map_err(|e| Error::fixture(path, format!("user {}: {}", i, e)))
            })
            .collect::<Result<Vec<_>>>()?;

        debug!("Loaded {} user(s) from {}", users.len(), path.display());
        Ok(users)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;
    use test_case::test_case;

    const TWO_USERS: &str = r#"[
  {
    "name": "Patrick", "email": "patrick@example.com", "gender": "male",
    "password": "pw1", "day": "1", "month": "January", "year": 1985,
    "newsletter": true, "optin": true, "firstName": "Patrick", "lastName": "Martin",
    "company": "Acme", "address": "1 rue A", "address2": "", "country": "Canada",
    "state": "Quebec", "city": "Montreal", "zipcode": "H2X", "mobile": 5140000000
  },
  {
    "name": "Julie", "email": "julie@example.com", "gender": "female",
    "password": "pw2", "day": 5, "month": "March", "year": "1992",
    "newsletter": false, "optin": false, "firstName": "Julie", "lastName": "Roy",
    "company": "Beta", "address": "2 rue B", "address2": "Bureau 3", "country": "India",
    "state": "Goa", "city": "Panaji", "zipcode": 403001, "mobile": "9100000000"
  }
]"#;

    fn write_fixture(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_keeps_file_order() {
        let file = write_fixture(TWO_USERS);
        let store = FixtureStore::from_path(file.path());

        let users = store.load().unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(users[0].name, "Patrick");
        assert_eq!(users[1].name, "Julie");

        // Same result on every call
        assert_eq!(store.load().unwrap(), users);
    }

    #[test]
    fn test_user_by_index() {
        let file = write_fixture(TWO_USERS);
        let store = FixtureStore::from_path(file.path());

        assert_eq!(store.user(1).unwrap().email, "julie@example.com");
        let err = store.user(2).unwrap_err();
        assert!(err.to_string().contains("no user at index 2"));
    }

    #[test]
    fn test_missing_file_is_fixture_error() {
        let store = FixtureStore::from_path("/definitely/not/here/users.json");
        assert!(matches!(store.load(), Err(Error::FixtureLoad { .. })));
    }

    #[test_case("{}" ; "object instead of array")]
    #[test_case("[]" ; "empty array")]
    #[test_case("not json" ; "garbage")]
    #[test_case(r#"[{"name": "Only a name"}]"# ; "missing required fields")]
    fn test_malformed_fixture_is_rejected(content: &str) {
        let file = write_fixture(content);
        let store = FixtureStore::from_path(file.path());
        assert!(matches!(store.load(), Err(Error::FixtureLoad { .. })));
    }

    #[test]
    fn test_error_names_offending_entry() {
        let broken = TWO_USERS.replace(r#""newsletter": false"#, r#""newsletter": "no""#);
        let file = write_fixture(&broken);
        let err = FixtureStore::from_path(file.path()).load().unwrap_err();
        assert!(err.to_string().contains("user 1"), "got: {}", err);
    }
}
