//! src/routes/mailing_lists/delete.rs
use super::{html, views, MailingListError};
use crate::routes::see_other;
use crate::store::MailingListStore;
use actix_web::{http::StatusCode, web, HttpResponse};

#[tracing::instrument(name = "GET /mailinglists/{list_name}/delete", skip(store))]
pub async fn delete_mailing_list_form(
    list_name: web::Path<String>,
    store: web::Data<MailingListStore>,
) -> Result<HttpResponse, MailingListError> {
    let list = store.find(&list_name).await?;
    Ok(html(StatusCode::OK, views::delete_page(&list)))
}

/// Removes the list together with its subscribers. Deleting a list that is
/// already gone succeeds.
#[tracing::instrument(name = "Deleting a mailing list", skip(store))]
pub async fn delete_mailing_list(
    list_name: web::Path<String>,
    store: web::Data<MailingListStore>,
) -> Result<HttpResponse, MailingListError> {
    store.delete_partition(&list_name).await?;
    Ok(see_other("/mailinglists"))
}
