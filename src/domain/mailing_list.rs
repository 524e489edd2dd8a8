//! src/domain/mailing_list.rs
use super::{list_name, Description, FromEmail, ListName};
use crate::routes::MailingListForm;
use crate::storage::{Properties, StorageKey, TableEntity};
use serde::Deserialize;
use serde_json::Value;

/// Row key shared by every mailing-list row. Subscriber rows in the same
/// partition use the subscriber's email address instead, which can never
/// collide with this value.
pub const MAILING_LIST_ROW_KEY: &str = "mailinglist";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    ListName,
    FromEmailAddress,
    Description,
    VersionTag,
}

impl Field {
    /// Caption shown next to the field in forms.
    pub fn display_name(&self) -> &'static str {
        match self {
            Field::ListName => "List Name",
            Field::FromEmailAddress => "'From' Email Address",
            Field::Description => "Description",
            Field::VersionTag => "ETag",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: Field,
    pub message: String,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn push(&mut self, field: Field, error: impl std::fmt::Display) {
        self.0.push(FieldError {
            field,
            message: error.to_string(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }

    pub fn for_field(&self, field: Field) -> impl Iterator<Item = &str> {
        self.0
            .iter()
            .filter(move |e| e.field == field)
            .map(|e| e.message.as_str())
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let messages: Vec<_> = self
            .0
            .iter()
            .map(|e| format!("{}: {}", e.field.display_name(), e.message))
            .collect();
        write!(f, "{}", messages.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

#[derive(thiserror::Error, Debug)]
pub enum DecodeError {
    #[error("row {0} is not a mailing list row")]
    NotAMailingList(StorageKey),
    #[error("stored list name is invalid")]
    ListName(#[from] list_name::Error),
    #[error("stored properties are malformed")]
    Properties(#[from] serde_json::Error),
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StoredProperties {
    from_email_address: String,
    #[serde(default)]
    description: Option<String>,
}

/// A mailing-list row. The list name lives in the partition key; the row
/// key is always `MAILING_LIST_ROW_KEY`.
#[derive(Debug, Clone, PartialEq)]
pub struct MailingList {
    key: StorageKey,
    pub from_email_address: FromEmail,
    pub description: Option<Description>,
    version_tag: Option<String>,
}

impl MailingList {
    pub fn new(
        list_name: ListName,
        from_email_address: FromEmail,
        description: Option<Description>,
    ) -> Self {
        Self {
            key: StorageKey::new(list_name.as_ref(), MAILING_LIST_ROW_KEY),
            from_email_address,
            description,
            version_tag: None,
        }
    }

    /// Validates raw input, reporting every invalid field at once.
    pub fn parse(
        list_name: String,
        from_email_address: String,
        description: Option<String>,
    ) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let list_name = ListName::parse(list_name)
            .map_err(|e| errors.push(Field::ListName, e))
            .ok();
        let from_email_address = FromEmail::parse(from_email_address)
            .map_err(|e| errors.push(Field::FromEmailAddress, e))
            .ok();
        let description = Description::parse(description)
            .map_err(|e| errors.push(Field::Description, e))
            .ok();

        match (list_name, from_email_address, description) {
            (Some(list_name), Some(from_email_address), Some(description)) => {
                Ok(Self::new(list_name, from_email_address, description))
            }
            _ => Err(errors),
        }
    }

    pub fn list_name(&self) -> &str {
        &self.key.partition_key
    }

    pub fn key(&self) -> &StorageKey {
        &self.key
    }

    /// `None` until the record has been read from or written to storage.
    pub fn version_tag(&self) -> Option<&str> {
        self.version_tag.as_deref()
    }

    pub fn with_version_tag(mut self, version_tag: impl Into<String>) -> Self {
        self.version_tag = Some(version_tag.into());
        self
    }

    pub fn description_text(&self) -> &str {
        self.description.as_ref().map(AsRef::as_ref).unwrap_or("")
    }

    pub fn to_properties(&self) -> Properties {
        let mut properties = Properties::new();
        properties.insert(
            "FromEmailAddress".into(),
            Value::String(self.from_email_address.as_ref().into()),
        );
        if let Some(description) = &self.description {
            properties.insert(
                "Description".into(),
                Value::String(description.as_ref().into()),
            );
        }
        properties
    }

    /// Decodes a stored row. The list name must still be a valid key, but
    /// the other fields are taken as stored: form rules are not re-applied.
    pub fn from_entity(entity: TableEntity) -> Result<Self, DecodeError> {
        if entity.key.row_key != MAILING_LIST_ROW_KEY {
            return Err(DecodeError::NotAMailingList(entity.key));
        }

        let stored: StoredProperties = serde_json::from_value(Value::Object(entity.properties))?;
        let list_name = ListName::parse(entity.key.partition_key)?;

        Ok(Self::new(
            list_name,
            FromEmail::from_stored(stored.from_email_address),
            Description::from_stored(stored.description),
        )
        .with_version_tag(entity.etag))
    }
}

impl TryFrom<MailingListForm> for MailingList {
    type Error = ValidationErrors;

    fn try_from(form: MailingListForm) -> Result<Self, Self::Error> {
        Self::parse(form.list_name, form.from_email_address, form.description)
    }
}
