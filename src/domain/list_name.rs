//! src/domain/list_name.rs
use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum Error {
    #[error("The List Name field is required.")]
    Empty,
    #[error("A list name must not be more than 256 characters long.")]
    TooLong,
    #[error("Only alphanumeric characters and underscore (_) are allowed.")]
    InvalidCharacters,
}

/// The name of a mailing list. Doubles as the partition key of every row
/// belonging to the list, so it is restricted to `[A-Za-z0-9_]+`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct ListName(String);

impl ListName {
    pub fn parse(s: String) -> Result<Self, Error> {
        if s.is_empty() {
            return Err(Error::Empty);
        }

        if s.len() > 256 {
            return Err(Error::TooLong);
        }

        let is_word = |c: char| c.is_ascii_alphanumeric() || c == '_';
        if !s.chars().all(is_word) {
            return Err(Error::InvalidCharacters);
        }

        Ok(Self(s))
    }
}

impl AsRef<str> for ListName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ListName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_ref())
    }
}
