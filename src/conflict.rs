//! src/conflict.rs
//!
//! Optimistic-concurrency handling for edits: a replace that loses the race
//! is turned into a report of what the winner changed.
use crate::domain::{Field, MailingList};
use crate::store::{MailingListStore, StoreError};

pub const CONCURRENCY_NOTICE: &str = "The record you attempted to edit was modified by another \
user after you got the original value. The edit operation was canceled and the current values in \
the database have been displayed. If you still want to edit this record, click the 'Save' button \
again. Otherwise click the 'Back to List' hyperlink.";

/// A field whose stored value differs from what the caller submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discrepancy {
    pub field: Field,
    pub current_value: String,
}

impl Discrepancy {
    pub fn message(&self) -> String {
        format!("Current value: {}", self.current_value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConflictReport {
    pub submitted: MailingList,
    pub current: MailingList,
    pub discrepancies: Vec<Discrepancy>,
}

impl ConflictReport {
    pub fn new(submitted: MailingList, current: MailingList) -> Self {
        let discrepancies = discrepancies(&current, &submitted);
        Self {
            submitted,
            current,
            discrepancies,
        }
    }

    /// The submitted values tagged with the current version, so that saving
    /// them again without changes succeeds.
    pub fn resubmission(&self) -> MailingList {
        match self.current.version_tag() {
            Some(tag) => self.submitted.clone().with_version_tag(tag),
            None => self.submitted.clone(),
        }
    }

    pub fn summary(&self) -> &'static str {
        CONCURRENCY_NOTICE
    }
}

#[derive(Debug)]
pub enum EditOutcome {
    Saved(MailingList),
    Conflict(ConflictReport),
}

/// Fields of `submitted` that no longer match `current`. The list name is the
/// row's key and is the same on both sides.
pub fn discrepancies(current: &MailingList, submitted: &MailingList) -> Vec<Discrepancy> {
    let mut discrepancies = Vec::new();

    if current.from_email_address != submitted.from_email_address {
        discrepancies.push(Discrepancy {
            field: Field::FromEmailAddress,
            current_value: current.from_email_address.to_string(),
        });
    }

    if current.description != submitted.description {
        discrepancies.push(Discrepancy {
            field: Field::Description,
            current_value: current.description_text().to_string(),
        });
    }

    discrepancies
}

/// Saves `submitted` against `expected_version_tag`.
///
/// A version mismatch is not an error here: the current row is fetched and
/// compared with the submission instead. Any other failure, including the row
/// having been deleted in the meantime, is returned as is.
#[tracing::instrument(
    name = "Edit mailing list",
    skip(store, submitted),
    fields(list_name = %submitted.list_name())
)]
pub async fn edit(
    store: &MailingListStore,
    submitted: MailingList,
    expected_version_tag: &str,
) -> Result<EditOutcome, StoreError> {
    match store.replace(&submitted, expected_version_tag).await {
        Ok(saved) => Ok(EditOutcome::Saved(saved)),
        Err(StoreError::VersionConflict(_)) => {
            let current = store.find(submitted.list_name()).await?;
            let report = ConflictReport::new(submitted, current);
            tracing::warn!(
                changed_fields = report.discrepancies.len(),
                "Mailing list was modified concurrently"
            );
            Ok(EditOutcome::Conflict(report))
        }
        Err(e) => Err(e),
    }
}
