//! src/domain/description.rs
use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum Error {
    #[error("A description must not be more than 1024 graphemes long.")]
    TooLong,
}

/// Free text shown next to a mailing list. Blank input means "no description".
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Description(String);

impl Description {
    pub fn parse(s: Option<String>) -> Result<Option<Self>, Error> {
        let s = match s {
            Some(s) if !s.trim().is_empty() => s,
            _ => return Ok(None),
        };

        // Counted in graphemes so that `å` written as `a` + combining ring
        // still counts once.
        if s.graphemes(true).count() > 1024 {
            return Err(Error::TooLong);
        }

        Ok(Some(Self(s)))
    }

    /// Like `parse`, without the length limit. Used for stored rows.
    pub(crate) fn from_stored(s: Option<String>) -> Option<Self> {
        s.filter(|s| !s.trim().is_empty()).map(Self)
    }
}

impl AsRef<str> for Description {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
