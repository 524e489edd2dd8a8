//! src/routes/mailing_lists/edit.rs
use super::{html, views::FormView, EditForm, MailingListError};
use crate::conflict::{edit, EditOutcome};
use crate::domain::{Field, MailingList, ValidationErrors};
use crate::routes::see_other;
use crate::store::MailingListStore;
use actix_web::{http::StatusCode, web, HttpResponse};

#[tracing::instrument(name = "GET /mailinglists/{list_name}/edit", skip(store))]
pub async fn edit_mailing_list_form(
    list_name: web::Path<String>,
    store: web::Data<MailingListStore>,
) -> Result<HttpResponse, MailingListError> {
    let list = store.find(&list_name).await?;
    Ok(html(StatusCode::OK, FormView::edit(&list).render()))
}

/// Saves the submitted values. They are used exactly as posted; a version
/// mismatch redisplays them next to the values now stored.
#[tracing::instrument(
    name = "Editing a mailing list",
    skip(form, store),
    fields(from_email_address = %form.from_email_address)
)]
pub async fn edit_mailing_list(
    list_name: web::Path<String>,
    form: web::Form<EditForm>,
    store: web::Data<MailingListStore>,
) -> Result<HttpResponse, MailingListError> {
    let list_name = list_name.into_inner();
    let form = form.into_inner();

    let (list, mut errors) = match MailingList::parse(
        list_name.clone(),
        form.from_email_address.clone(),
        form.description.clone(),
    ) {
        Ok(list) => (Some(list), ValidationErrors::default()),
        Err(errors) => (None, errors),
    };
    if form.etag.trim().is_empty() {
        errors.push(
            Field::VersionTag,
            "The record version is missing. Reload the page and try again.",
        );
    }

    let list = match list {
        Some(list) if errors.is_empty() => list,
        _ => {
            let view = FormView::edit_submission(&list_name, &form).with_errors(&errors);
            return Ok(html(StatusCode::BAD_REQUEST, view.render()));
        }
    };

    match edit(&store, list, &form.etag).await? {
        EditOutcome::Saved(_) => Ok(see_other("/mailinglists")),
        EditOutcome::Conflict(report) => Ok(html(
            StatusCode::CONFLICT,
            FormView::conflict(&report).render(),
        )),
    }
}
