//! src/routes/mailing_lists/mod.rs
use crate::store::StoreError;
use crate::telemetry::error_chain_fmt;
use actix_web::http::{header::ContentType, StatusCode};
use actix_web::{HttpResponse, ResponseError};

mod views;

mod index;
pub use index::*;

mod create;
pub use create::*;

mod details;
pub use details::*;

mod edit;
pub use edit::*;

mod delete;
pub use delete::*;

/// Fields posted by the create form. Missing fields arrive as empty strings
/// so that they are reported next to the field instead of as a bad request.
#[derive(serde::Deserialize, Debug, Clone, Default)]
pub struct MailingListForm {
    #[serde(default)]
    pub list_name: String,
    #[serde(default)]
    pub from_email_address: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Fields posted by the edit form. The list name comes from the path.
#[derive(serde::Deserialize, Debug, Clone, Default)]
pub struct EditForm {
    #[serde(default)]
    pub from_email_address: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub etag: String,
}

#[derive(thiserror::Error)]
pub enum MailingListError {
    #[error("{0}")]
    NotFound(String),
    #[error("Timeout error, try again.")]
    Timeout(#[source] StoreError),
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

impl std::fmt::Debug for MailingListError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl From<StoreError> for MailingListError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(_) => MailingListError::NotFound(e.to_string()),
            StoreError::Timeout(_) => {
                // The page only says "try again"; the cause goes to the log.
                tracing::error!(error.cause_chain = ?e, "Mailing list storage timed out");
                MailingListError::Timeout(e)
            }
            e => MailingListError::UnexpectedError(e.into()),
        }
    }
}

impl ResponseError for MailingListError {
    fn status_code(&self) -> StatusCode {
        match self {
            MailingListError::NotFound(_) => StatusCode::NOT_FOUND,
            MailingListError::Timeout(_) => StatusCode::SERVICE_UNAVAILABLE,
            MailingListError::UnexpectedError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            MailingListError::UnexpectedError(_) => {
                "An error occurred while processing your request.".to_string()
            }
            e => e.to_string(),
        };

        HttpResponse::build(self.status_code())
            .content_type(ContentType::html())
            .body(views::error_page(&message))
    }
}

fn html(status: StatusCode, body: String) -> HttpResponse {
    HttpResponse::build(status)
        .content_type(ContentType::html())
        .body(body)
}
