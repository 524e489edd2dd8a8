//! tests/api/mailing_lists.rs

use crate::helpers::{assert_is_redirect_to, extract_etag, spawn_app, spawn_app_with};
use mailroom::storage::{Filter, Properties, StorageKey, TableClient};
use std::time::Duration;

#[tokio::test]
async fn list_returns_a_200_when_there_are_no_lists() {
    // Arrange
    let app = spawn_app().await;

    // Act
    let response = app.get("/mailinglists").await;

    // Assert
    assert_eq!(200, response.status().as_u16());
    let html = response.text().await.unwrap();
    assert!(html.contains("Create New"));
    assert!(!html.contains("/edit"));
}

#[tokio::test]
async fn list_shows_rows_written_with_looser_rules() {
    // Arrange
    let app = spawn_app().await;
    let mut properties = Properties::new();
    properties.insert("FromEmailAddress".into(), "postmaster".into());
    app.storage
        .insert(&app.table, &StorageKey::new("legacy", "mailinglist"), properties)
        .await
        .unwrap();

    // Act
    let response = app.get("/mailinglists").await;

    // Assert
    assert_eq!(200, response.status().as_u16());
    let html = response.text().await.unwrap();
    assert!(html.contains("legacy"));
    assert!(html.contains("postmaster"));
}

#[tokio::test]
async fn create_persists_the_new_list_and_redirects_to_the_list_page() {
    // Arrange
    let app = spawn_app().await;

    // Act
    let body = "list_name=news&from_email_address=a%40x.com&description=Weekly";
    let response = app.post_body("/mailinglists/create", body.into()).await;

    // Assert
    assert_is_redirect_to(&response, "/mailinglists");
    let saved = app.stored_list("news").await;
    assert_eq!(saved.properties["FromEmailAddress"], "a@x.com");
    assert_eq!(saved.properties["Description"], "Weekly");

    let html = app.get_html("/mailinglists").await;
    assert!(html.contains("news"));
    assert!(html.contains("a@x.com"));
}

#[tokio::test]
async fn create_returns_a_400_when_data_is_missing() {
    // Arrange
    let app = spawn_app().await;
    let test_cases = vec![
        ("from_email_address=a%40x.com", "missing the list name"),
        ("list_name=news", "missing the from address"),
        ("", "missing both list name and from address"),
    ];

    for (body, error_message) in test_cases {
        // Act
        let response = app.post_body("/mailinglists/create", body.into()).await;

        // Assert
        assert_eq!(
            400,
            response.status().as_u16(),
            // Additional customised error message on test failure
            "The API did not fail with 400 Bad Request when the payload was {}.",
            error_message
        );
    }
    let stored = app
        .storage
        .query(&app.table, &Filter::partition_key_eq("news"))
        .await
        .unwrap();
    assert!(stored.is_empty());
}

#[tokio::test]
async fn create_redisplays_the_form_with_a_message_for_a_bad_list_name() {
    // Arrange
    let app = spawn_app().await;

    // Act
    let body = "list_name=weekly%20news&from_email_address=a%40x.com";
    let response = app.post_body("/mailinglists/create", body.into()).await;

    // Assert
    assert_eq!(400, response.status().as_u16());
    let html = response.text().await.unwrap();
    assert!(html.contains("Only alphanumeric characters and underscore (_) are allowed."));
    assert!(html.contains(r#"value="weekly news""#));
}

#[tokio::test]
async fn create_returns_a_400_when_the_from_address_is_invalid() {
    // Arrange
    let app = spawn_app().await;

    // Act
    let body = "list_name=news&from_email_address=notanemail";
    let response = app.post_body("/mailinglists/create", body.into()).await;

    // Assert
    assert_eq!(400, response.status().as_u16());
}

#[tokio::test]
async fn creating_an_existing_list_conflicts_and_keeps_the_original() {
    // Arrange
    let app = spawn_app().await;
    app.create_list("news", "a@x.com", "Weekly").await;

    // Act
    let response = app.create_list("news", "b@x.com", "Daily").await;

    // Assert
    assert_eq!(409, response.status().as_u16());
    let html = response.text().await.unwrap();
    assert!(html.contains("A mailing list named news already exists."));

    let saved = app.stored_list("news").await;
    assert_eq!(saved.properties["FromEmailAddress"], "a@x.com");
    assert_eq!(saved.properties["Description"], "Weekly");
}

#[tokio::test]
async fn details_show_the_stored_values() {
    // Arrange
    let app = spawn_app().await;
    app.create_list("news", "a@x.com", "Weekly").await;

    // Act
    let response = app.get("/mailinglists/news").await;

    // Assert
    assert_eq!(200, response.status().as_u16());
    let html = response.text().await.unwrap();
    assert!(html.contains("a@x.com"));
    assert!(html.contains("Weekly"));
}

#[tokio::test]
async fn pages_for_a_missing_list_return_a_404() {
    // Arrange
    let app = spawn_app().await;

    for path in ["/mailinglists/nope", "/mailinglists/nope/edit", "/mailinglists/nope/delete"] {
        // Act
        let response = app.get(path).await;

        // Assert
        assert_eq!(404, response.status().as_u16(), "GET {} was not a 404", path);
    }
}

#[tokio::test]
async fn an_edit_with_the_current_etag_is_saved() {
    // Arrange
    let app = spawn_app().await;
    app.create_list("news", "a@x.com", "Weekly").await;
    let etag = extract_etag(&app.get_html("/mailinglists/news/edit").await);
    assert_eq!(etag, app.stored_list("news").await.etag);

    // Act
    let response = app.edit_list("news", "b@x.com", "Weekly", &etag).await;

    // Assert
    assert_is_redirect_to(&response, "/mailinglists");
    let saved = app.stored_list("news").await;
    assert_eq!(saved.properties["FromEmailAddress"], "b@x.com");
    assert_ne!(saved.etag, etag);
}

#[tokio::test]
async fn a_stale_edit_shows_what_changed_and_a_resubmission_wins() {
    // Arrange
    let app = spawn_app().await;
    app.create_list("news", "a@x.com", "Weekly").await;
    let stale_etag = extract_etag(&app.get_html("/mailinglists/news/edit").await);

    // Another user changes the description first.
    let response = app.edit_list("news", "a@x.com", "Daily", &stale_etag).await;
    assert_is_redirect_to(&response, "/mailinglists");
    let current_etag = app.stored_list("news").await.etag;

    // Act
    let response = app.edit_list("news", "b@x.com", "Weekly", &stale_etag).await;

    // Assert
    assert_eq!(409, response.status().as_u16());
    let html = response.text().await.unwrap();
    assert!(html.contains("Current value: Daily"));
    assert!(html.contains("Current value: a@x.com"));
    assert!(html.contains("was modified by another user"));
    assert_eq!(extract_etag(&html), current_etag);

    let saved = app.stored_list("news").await;
    assert_eq!(saved.properties["FromEmailAddress"], "a@x.com");
    assert_eq!(saved.properties["Description"], "Daily");

    // Saving the redisplayed form without changes goes through.
    let response = app
        .edit_list("news", "b@x.com", "Weekly", &extract_etag(&html))
        .await;
    assert_is_redirect_to(&response, "/mailinglists");
    let saved = app.stored_list("news").await;
    assert_eq!(saved.properties["FromEmailAddress"], "b@x.com");
    assert_eq!(saved.properties["Description"], "Weekly");
}

#[tokio::test]
async fn a_wildcard_etag_cannot_overwrite_a_newer_change() {
    // Arrange
    let app = spawn_app().await;
    app.create_list("news", "a@x.com", "Weekly").await;
    let etag = extract_etag(&app.get_html("/mailinglists/news/edit").await);
    app.edit_list("news", "a@x.com", "Daily", &etag).await;
    let current_etag = app.stored_list("news").await.etag;

    // Act
    let response = app.edit_list("news", "b@x.com", "Weekly", "*").await;

    // Assert
    assert_eq!(409, response.status().as_u16());
    let html = response.text().await.unwrap();
    assert_eq!(extract_etag(&html), current_etag);

    let saved = app.stored_list("news").await;
    assert_eq!(saved.properties["FromEmailAddress"], "a@x.com");
    assert_eq!(saved.properties["Description"], "Daily");
}

#[tokio::test]
async fn an_edit_without_an_etag_returns_a_400() {
    // Arrange
    let app = spawn_app().await;
    app.create_list("news", "a@x.com", "Weekly").await;

    // Act
    let body = "from_email_address=b%40x.com&description=Weekly";
    let response = app.post_body("/mailinglists/news/edit", body.into()).await;

    // Assert
    assert_eq!(400, response.status().as_u16());
    let saved = app.stored_list("news").await;
    assert_eq!(saved.properties["FromEmailAddress"], "a@x.com");
}

#[tokio::test]
async fn editing_a_missing_list_returns_a_404() {
    // Arrange
    let app = spawn_app().await;

    // Act
    let response = app.edit_list("nope", "a@x.com", "", "W/\"v1\"").await;

    // Assert
    assert_eq!(404, response.status().as_u16());
}

#[tokio::test]
async fn delete_removes_the_list_and_its_subscribers() {
    // Arrange
    let app = spawn_app().await;
    app.create_list("news", "a@x.com", "Weekly").await;
    app.create_list("sports", "s@x.com", "").await;
    for i in 0..120 {
        let key = StorageKey::new("news", format!("reader{}@x.com", i));
        app.storage
            .insert(&app.table, &key, Properties::new())
            .await
            .unwrap();
    }

    // Act
    let response = app.post_body("/mailinglists/news/delete", "".into()).await;

    // Assert
    assert_is_redirect_to(&response, "/mailinglists");
    let remaining = app
        .storage
        .query(&app.table, &Filter::partition_key_eq("news"))
        .await
        .unwrap();
    assert!(remaining.is_empty());
    assert_eq!(app.storage.batch_calls(), vec![100, 21]);
    assert!(app.stored("sports", "mailinglist").await.is_some());

    // A second delete finds nothing left and still succeeds.
    let response = app.post_body("/mailinglists/news/delete", "".into()).await;
    assert_is_redirect_to(&response, "/mailinglists");
}

#[tokio::test]
async fn a_slow_list_query_shows_a_try_again_page() {
    // Arrange
    let app = spawn_app_with(|config| {
        config.storage.list_query.maximum_execution_time_ms = 50;
        config.storage.list_query.retry_interval_ms = 10;
        config.storage.list_query.max_retries = 1;
    })
    .await;
    app.storage.set_query_delay(Duration::from_millis(500));

    // Act
    let response = app.get("/mailinglists").await;

    // Assert
    assert_eq!(503, response.status().as_u16());
    let html = response.text().await.unwrap();
    assert!(html.contains("Timeout error, try again."));
    assert!(!html.contains("time limit"));
}
