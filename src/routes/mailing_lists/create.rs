//! src/routes/mailing_lists/create.rs
use super::{html, views::FormView, MailingListError, MailingListForm};
use crate::domain::{Field, MailingList, ValidationErrors};
use crate::routes::see_other;
use crate::store::{MailingListStore, StoreError};
use actix_web::{http::StatusCode, web, HttpResponse};
use uuid::Uuid;

pub async fn create_mailing_list_form() -> HttpResponse {
    html(
        StatusCode::OK,
        FormView::create(&MailingListForm::default()).render(),
    )
}

#[tracing::instrument(
    name = "Creating a new mailing list",
    skip(form, store),
    fields(
        request_id = %Uuid::new_v4(),
        list_name = %form.list_name,
        from_email_address = %form.from_email_address
    )
)]
pub async fn create_mailing_list(
    form: web::Form<MailingListForm>,
    store: web::Data<MailingListStore>,
) -> Result<HttpResponse, MailingListError> {
    let form = form.into_inner();

    let list = match MailingList::try_from(form.clone()) {
        Ok(list) => list,
        Err(errors) => {
            let view = FormView::create(&form).with_errors(&errors);
            return Ok(html(StatusCode::BAD_REQUEST, view.render()));
        }
    };

    match store.insert(&list).await {
        Ok(_) => Ok(see_other("/mailinglists")),
        Err(e @ StoreError::Conflict(_)) => {
            tracing::warn!("{}", e);
            let mut errors = ValidationErrors::default();
            errors.push(Field::ListName, &e);
            let view = FormView::create(&form).with_errors(&errors);
            Ok(html(StatusCode::CONFLICT, view.render()))
        }
        Err(e) => Err(e.into()),
    }
}
