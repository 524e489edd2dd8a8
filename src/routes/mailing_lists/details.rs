//! src/routes/mailing_lists/details.rs
use super::{html, views, MailingListError};
use crate::store::MailingListStore;
use actix_web::{http::StatusCode, web, HttpResponse};

#[tracing::instrument(name = "GET /mailinglists/{list_name}", skip(store))]
pub async fn mailing_list_details(
    list_name: web::Path<String>,
    store: web::Data<MailingListStore>,
) -> Result<HttpResponse, MailingListError> {
    let list = store.find(&list_name).await?;
    Ok(html(StatusCode::OK, views::details_page(&list)))
}
