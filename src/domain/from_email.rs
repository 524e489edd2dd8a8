//! src/domain/from_email.rs
use serde::{Deserialize, Serialize};
use validator::validate_email;

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum Error {
    #[error("The 'From' Email Address field is required.")]
    Empty,
    #[error("{0} is not a valid email address.")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FromEmail(String);

impl FromEmail {
    pub fn parse(s: String) -> Result<Self, Error> {
        let s = s.trim().to_string();
        if s.is_empty() {
            return Err(Error::Empty);
        }

        if validate_email(&s) {
            Ok(Self(s))
        } else {
            Err(Error::Invalid(s))
        }
    }

    /// Takes an address read back from storage as is. Rows may have been
    /// written by clients with looser rules, so nothing is checked.
    pub(crate) fn from_stored(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for FromEmail {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FromEmail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_ref())
    }
}
