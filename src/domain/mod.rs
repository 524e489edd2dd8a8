//! src/domain/mod.rs
mod list_name;
pub use list_name::ListName;

mod from_email;
pub use from_email::FromEmail;

mod description;
pub use description::Description;

mod mailing_list;
pub use mailing_list::*;
