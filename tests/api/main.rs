mod health_check;
mod helpers;
mod mailing_lists;
