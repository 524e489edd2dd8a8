//! src/routes/mod.rs
mod health_check;
pub use health_check::*;

mod mailing_lists;
pub use mailing_lists::*;

use actix_web::HttpResponse;

fn see_other(location: &str) -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header(("Location", location))
        .finish()
}
