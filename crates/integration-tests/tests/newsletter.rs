//! Newsletter integration tests.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]

use axum::http::StatusCode;
use serde_json::json;

use wovry_integration_tests::TestContext;

#[tokio::test]
async fn test_subscribe_then_resubscribe() {
    let ctx = TestContext::new();

    let (status, body) = ctx
        .post("/api/newsletter", None, &json!({ "email": " Meera@Example.in " }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["subscribed"], true);
    assert_eq!(body["email"], "meera@example.in");

    let (status, body) = ctx
        .post("/api/newsletter", None, &json!({ "email": "meera@example.in" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["alreadySubscribed"], true);

    assert_eq!(ctx.subscribers.all().await.len(), 1);

    // Only the first call greets; wait long enough for a second to show up.
    let welcomes = ctx.mailer.welcomes(2).await;
    assert_eq!(welcomes.len(), 1);
    assert_eq!(welcomes[0].as_str(), "meera@example.in");
}

#[tokio::test]
async fn test_invalid_email_is_rejected() {
    let ctx = TestContext::new();

    for email in ["", "no-at-sign", "two@@example.in"] {
        let (status, body) = ctx
            .post("/api/newsletter", None, &json!({ "email": email }))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "accepted {email:?}");
        assert!(body["error"].is_string());
    }

    assert!(ctx.subscribers.all().await.is_empty());
    assert!(ctx.mailer.welcomes(0).await.is_empty());
}
