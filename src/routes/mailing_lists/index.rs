//! src/routes/mailing_lists/index.rs
use super::{html, views, MailingListError};
use crate::store::MailingListStore;
use actix_web::{http::StatusCode, web, HttpResponse};

#[tracing::instrument(name = "GET /mailinglists", skip(store))]
pub async fn list_mailing_lists(
    store: web::Data<MailingListStore>,
) -> Result<HttpResponse, MailingListError> {
    let lists = store.list_mailing_lists().await?;
    Ok(html(StatusCode::OK, views::index_page(&lists)))
}
