//! Admin integration tests.
//!
//! Every admin endpoint answers 403 before touching a collaborator unless the
//! bearer token belongs to a configured administrator.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]

use axum::http::{Method, StatusCode};
use rust_decimal::Decimal;
use serde_json::json;

use wovry_core::{OrderStatus, ProductId};
use wovry_integration_tests::{
    ADMIN_TOKEN, ADMIN_UID, SHOPPER_TOKEN, TestContext, checkout_body, decimal, json_request,
};
use wovry_storefront::db::{OrderStore, ProductStore};

// =============================================================================
// Identity listing
// =============================================================================

#[tokio::test]
async fn test_list_users_without_token_is_forbidden() {
    let ctx = TestContext::new();

    let (status, body) = ctx.get("/listUsers", None).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Forbidden");
}

#[tokio::test]
async fn test_list_users_with_unknown_token_is_forbidden() {
    let ctx = TestContext::new();

    let (status, _) = ctx.get("/listUsers", Some("forged")).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_list_users_as_shopper_is_forbidden() {
    let ctx = TestContext::new();

    let (status, _) = ctx.get("/listUsers", Some(SHOPPER_TOKEN)).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_list_users_as_admin() {
    let ctx = TestContext::new();

    let (status, body) = ctx.get("/listUsers", Some(ADMIN_TOKEN)).await;

    assert_eq!(status, StatusCode::OK);
    let users = body.as_array().unwrap();
    assert_eq!(users.len(), 2);
    assert_eq!(users[0]["uid"], ADMIN_UID);
}

#[tokio::test]
async fn test_list_users_provider_failure_is_internal_error() {
    let ctx = TestContext::new();
    ctx.identity.fail_listing();

    let (status, body) = ctx.get("/listUsers", Some(ADMIN_TOKEN)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!body["error"].as_str().unwrap().contains("backend"));
}

// =============================================================================
// Orders
// =============================================================================

#[tokio::test]
async fn test_admin_lists_orders_by_status() {
    let ctx = TestContext::new();
    for _ in 0..2 {
        let (status, _) = ctx
            .post("/createCheckoutSession", None, &checkout_body())
            .await;
        assert_eq!(status, StatusCode::OK);
    }
    let first = ctx.orders.list(None).await.unwrap()[0].id;
    ctx.orders.mark_paid(first).await.unwrap();

    let (status, all) = ctx.get("/api/admin/orders", Some(ADMIN_TOKEN)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all.as_array().unwrap().len(), 2);

    let (_, paid) = ctx
        .get("/api/admin/orders?status=paid", Some(ADMIN_TOKEN))
        .await;
    assert_eq!(paid.as_array().unwrap().len(), 1);
    assert_eq!(paid[0]["status"], "paid");

    let (status, _) = ctx
        .get("/api/admin/orders?status=shipped", Some(ADMIN_TOKEN))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = ctx.get("/api/admin/orders", Some(SHOPPER_TOKEN)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let pending = ctx.orders.list(Some(OrderStatus::Pending)).await.unwrap();
    assert_eq!(pending.len(), 1);
}

// =============================================================================
// Products
// =============================================================================

#[tokio::test]
async fn test_admin_product_lifecycle() {
    let ctx = TestContext::new();

    let (status, created) = ctx
        .post(
            "/api/admin/products",
            Some(ADMIN_TOKEN),
            &json!({
                "name": "  Alpaca Cowl ",
                "price": "1850.00",
                "category": "scarves",
                "sizes": "One Size",
                "colors": ["Oat", "Moss"],
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "body: {created}");
    assert_eq!(created["name"], "Alpaca Cowl");
    let id: ProductId = created["id"].as_str().unwrap().parse().unwrap();

    let update = json!({
        "name": "Alpaca Cowl",
        "price": 1650,
        "category": "scarves",
        "colors": "Oat",
        "isFeatured": true,
    });
    let (status, updated) = ctx
        .send(json_request(
            Method::PUT,
            &format!("/api/admin/products/{id}"),
            Some(ADMIN_TOKEN),
            Some(&update),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decimal(&updated["price"]), Decimal::from(1650));
    assert_eq!(updated["colors"], json!(["Oat"]));
    assert_eq!(updated["createdAt"], created["createdAt"]);

    let (status, _) = ctx
        .send(json_request(
            Method::DELETE,
            &format!("/api/admin/products/{id}"),
            Some(ADMIN_TOKEN),
            None,
        ))
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(ctx.products.get(id).await.unwrap().is_none());

    let (status, _) = ctx
        .send(json_request(
            Method::DELETE,
            &format!("/api/admin/products/{id}"),
            Some(ADMIN_TOKEN),
            None,
        ))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_rejects_invalid_product() {
    let ctx = TestContext::new();

    let (status, _) = ctx
        .post(
            "/api/admin/products",
            Some(ADMIN_TOKEN),
            &json!({ "name": "  ", "price": 100 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = ctx
        .post(
            "/api/admin/products",
            Some(ADMIN_TOKEN),
            &json!({ "name": "Refund", "price": -5 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = ctx
        .post(
            "/api/admin/products",
            Some(ADMIN_TOKEN),
            &json!({ "name": "Thread", "price": "0.005" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = ctx
        .post(
            "/api/admin/products",
            Some(ADMIN_TOKEN),
            &json!({ "name": "Estate", "price": "100000000000" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_shopper_cannot_manage_products() {
    let ctx = TestContext::new();
    let catalog = ctx.seed_catalog().await;

    let (status, _) = ctx
        .post(
            "/api/admin/products",
            Some(SHOPPER_TOKEN),
            &json!({ "name": "Sneaky", "price": 1 }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = ctx
        .send(json_request(
            Method::DELETE,
            &format!("/api/admin/products/{}", catalog[0].id),
            None,
            None,
        ))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(ctx.products.get(catalog[0].id).await.unwrap().is_some());
}
