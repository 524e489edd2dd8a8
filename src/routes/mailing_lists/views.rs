//! src/routes/mailing_lists/views.rs
use super::{EditForm, MailingListForm};
use crate::conflict::ConflictReport;
use crate::domain::{Field, FieldError, MailingList, ValidationErrors};
use htmlescape::encode_minimal;

fn page(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta http-equiv="content-type" content="text/html; charset=utf-8">
    <title>{title}</title>
</head>
<body>
    <h2>{title}</h2>
    {body}
</body>
</html>"#,
        title = encode_minimal(title),
        body = body,
    )
}

/// List names are restricted to `[A-Za-z0-9_]`, so the encoded path needs no
/// further escaping inside an attribute.
fn list_path(list: &MailingList) -> String {
    format!("/mailinglists/{}", urlencoding::encode(list.list_name()))
}

pub fn index_page(lists: &[MailingList]) -> String {
    let rows: String = lists
        .iter()
        .map(|list| {
            let path = list_path(list);
            format!(
                r#"
        <tr>
            <td>{name}</td>
            <td>{from}</td>
            <td>{description}</td>
            <td>
                <a href="{path}/edit">Edit</a> |
                <a href="{path}">Details</a> |
                <a href="{path}/delete">Delete</a>
            </td>
        </tr>"#,
                name = encode_minimal(list.list_name()),
                from = encode_minimal(list.from_email_address.as_ref()),
                description = encode_minimal(list.description_text()),
                path = path,
            )
        })
        .collect();

    page(
        "Mailing Lists",
        &format!(
            r#"<p><a href="/mailinglists/create">Create New</a></p>
    <table>
        <tr>
            <th>{name}</th>
            <th>{from}</th>
            <th>{description}</th>
            <th></th>
        </tr>{rows}
    </table>"#,
            name = encode_minimal(Field::ListName.display_name()),
            from = encode_minimal(Field::FromEmailAddress.display_name()),
            description = Field::Description.display_name(),
            rows = rows,
        ),
    )
}

pub fn details_page(list: &MailingList) -> String {
    let path = list_path(list);
    page(
        "Mailing List Details",
        &format!(
            r#"<dl>
        <dt>{name_label}</dt><dd>{name}</dd>
        <dt>{from_label}</dt><dd>{from}</dd>
        <dt>{description_label}</dt><dd>{description}</dd>
    </dl>
    <p><a href="{path}/edit">Edit</a> | <a href="/mailinglists">Back to List</a></p>"#,
            name_label = encode_minimal(Field::ListName.display_name()),
            name = encode_minimal(list.list_name()),
            from_label = encode_minimal(Field::FromEmailAddress.display_name()),
            from = encode_minimal(list.from_email_address.as_ref()),
            description_label = Field::Description.display_name(),
            description = encode_minimal(list.description_text()),
            path = path,
        ),
    )
}

pub fn delete_page(list: &MailingList) -> String {
    let path = list_path(list);
    page(
        "Delete Mailing List",
        &format!(
            r#"<p>Are you sure you want to delete {name} and all of its subscribers?</p>
    <form action="{path}/delete" method="post">
        <button type="submit">Delete</button>
    </form>
    <p><a href="/mailinglists">Back to List</a></p>"#,
            name = encode_minimal(list.list_name()),
            path = path,
        ),
    )
}

pub fn error_page(message: &str) -> String {
    page(
        "Error",
        &format!(
            r#"<p><i>{}</i></p>
    <p><a href="/mailinglists">Back to List</a></p>"#,
            encode_minimal(message)
        ),
    )
}

/// State of the create or edit form, including any messages to show.
#[derive(Debug, Default)]
pub struct FormView {
    editing: bool,
    list_name: String,
    from_email_address: String,
    description: String,
    etag: Option<String>,
    field_errors: Vec<FieldError>,
    summary: Vec<String>,
}

impl FormView {
    pub fn create(form: &MailingListForm) -> Self {
        Self {
            list_name: form.list_name.clone(),
            from_email_address: form.from_email_address.clone(),
            description: form.description.clone().unwrap_or_default(),
            ..Default::default()
        }
    }

    pub fn edit(list: &MailingList) -> Self {
        Self {
            editing: true,
            list_name: list.list_name().to_string(),
            from_email_address: list.from_email_address.to_string(),
            description: list.description_text().to_string(),
            etag: list.version_tag().map(str::to_string),
            ..Default::default()
        }
    }

    pub fn edit_submission(list_name: &str, form: &EditForm) -> Self {
        Self {
            editing: true,
            list_name: list_name.to_string(),
            from_email_address: form.from_email_address.clone(),
            description: form.description.clone().unwrap_or_default(),
            etag: Some(form.etag.clone()),
            ..Default::default()
        }
    }

    /// The submitted values, each changed field annotated with the value now
    /// stored, and the current version tag in the hidden field.
    pub fn conflict(report: &ConflictReport) -> Self {
        let mut view = Self::edit(&report.resubmission());
        view.field_errors = report
            .discrepancies
            .iter()
            .map(|d| FieldError {
                field: d.field,
                message: d.message(),
            })
            .collect();
        view.summary.push(report.summary().to_string());
        view
    }

    pub fn with_errors(mut self, errors: &ValidationErrors) -> Self {
        for error in errors.iter() {
            match error.field {
                // Not shown as an input, so surface it in the summary.
                Field::VersionTag => self.summary.push(error.message.clone()),
                _ => self.field_errors.push(error.clone()),
            }
        }
        self
    }

    fn errors_for(&self, field: Field) -> String {
        self.field_errors
            .iter()
            .filter(|e| e.field == field)
            .map(|e| {
                format!(
                    r#"<span class="field-error">{}</span>"#,
                    encode_minimal(&e.message)
                )
            })
            .collect()
    }

    pub fn render(&self) -> String {
        let summary: String = self
            .summary
            .iter()
            .map(|message| format!("<p><i>{}</i></p>", encode_minimal(message)))
            .collect();

        let (title, action, list_name_input) = if self.editing {
            let path = format!("/mailinglists/{}", urlencoding::encode(&self.list_name));
            (
                "Edit Mailing List",
                format!("{}/edit", path),
                format!(
                    r#"<input type="text" name="list_name" value="{}" readonly>"#,
                    encode_minimal(&self.list_name)
                ),
            )
        } else {
            (
                "Create Mailing List",
                "/mailinglists/create".to_string(),
                format!(
                    r#"<input type="text" name="list_name" value="{}">"#,
                    encode_minimal(&self.list_name)
                ),
            )
        };

        let etag_input = match &self.etag {
            Some(etag) => format!(
                r#"<input type="hidden" name="etag" value="{}">"#,
                encode_minimal(etag)
            ),
            None => String::new(),
        };

        page(
            title,
            &format!(
                r#"{summary}
    <form action="{action}" method="post">
        {etag_input}
        <label>{name_label}
            {list_name_input}
        </label>
        {name_errors}
        <label>{from_label}
            <input type="text" name="from_email_address" value="{from}">
        </label>
        {from_errors}
        <label>{description_label}
            <input type="text" name="description" value="{description}">
        </label>
        {description_errors}
        <button type="submit">Save</button>
    </form>
    <p><a href="/mailinglists">Back to List</a></p>"#,
                summary = summary,
                action = action,
                etag_input = etag_input,
                name_label = encode_minimal(Field::ListName.display_name()),
                list_name_input = list_name_input,
                name_errors = self.errors_for(Field::ListName),
                from_label = encode_minimal(Field::FromEmailAddress.display_name()),
                from = encode_minimal(&self.from_email_address),
                from_errors = self.errors_for(Field::FromEmailAddress),
                description_label = Field::Description.display_name(),
                description = encode_minimal(&self.description),
                description_errors = self.errors_for(Field::Description),
            ),
        )
    }
}
