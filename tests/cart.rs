mod common;

use axum::http::StatusCode;
use serde_json::json;
use uuid::Uuid;

use common::TestApp;

#[tokio::test]
async fn test_adding_the_same_product_merges_lines() {
    let app = TestApp::new();
    let (seller, _, product) = app.storefront(120, 10).await;

    let (status, body) = app.post("/api/cart/sess-1", None, json!({ "productId": product.id })).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let (status, body) = app.post("/api/cart/sess-1", None, json!({ "productId": product.id, "quantity": 2 })).await;
    assert_eq!(status, StatusCode::OK);

    let cart = &body["cart"];
    assert_eq!(cart["items"].as_array().unwrap().len(), 1);
    assert_eq!(cart["items"][0]["quantity"], 3);
    assert_eq!(cart["items"][0]["price"], "120");
    assert_eq!(cart["items"][0]["sellerId"], json!(seller.id));
    assert_eq!(cart["itemCount"], 3);
    assert_eq!(cart["subtotal"], "360");
}

#[tokio::test]
async fn test_carts_are_isolated_by_session() {
    let app = TestApp::new();
    let (_, _, product) = app.storefront(50, 10).await;
    app.post("/api/cart/sess-a", None, json!({ "productId": product.id })).await;

    let (status, body) = app.get("/api/cart/sess-b", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["cart"]["items"].as_array().unwrap().is_empty());
    assert_eq!(body["cart"]["subtotal"], "0");

    let (_, body) = app.get("/api/cart/sess-a", None).await;
    assert_eq!(body["cart"]["itemCount"], 1);
}

#[tokio::test]
async fn test_update_remove_and_clear() {
    let app = TestApp::new();
    let (_, _, first) = app.storefront(10, 10).await;
    let (_, _, second) = app.storefront(20, 10).await;
    app.post("/api/cart/sess-1", None, json!({ "productId": first.id, "quantity": 1 })).await;
    app.post("/api/cart/sess-1", None, json!({ "productId": second.id, "quantity": 1 })).await;

    let (status, body) = app.patch(&format!("/api/cart/sess-1/items/{}", first.id), None, json!({ "quantity": 4 })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cart"]["subtotal"], "60");

    let (status, body) = app.patch(&format!("/api/cart/sess-1/items/{}", first.id), None, json!({ "quantity": 0 })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cart"]["items"].as_array().unwrap().len(), 1);

    let (status, _) = app.patch(&format!("/api/cart/sess-1/items/{}", second.id), None, json!({ "quantity": -1 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app.delete(&format!("/api/cart/sess-1/items/{}", second.id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["cart"]["items"].as_array().unwrap().is_empty());
    let (status, _) = app.delete(&format!("/api/cart/sess-1/items/{}", second.id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    app.post("/api/cart/sess-1", None, json!({ "productId": first.id })).await;
    let (status, body) = app.delete("/api/cart/sess-1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    let (_, body) = app.get("/api/cart/sess-1", None).await;
    assert_eq!(body["cart"]["itemCount"], 0);
}

#[tokio::test]
async fn test_cart_rejects_unknown_products_and_bad_quantities() {
    let app = TestApp::new();
    let (_, seller_token, product) = app.storefront(10, 10).await;

    let (status, _) = app.post("/api/cart/sess-1", None, json!({ "productId": Uuid::new_v4() })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.post("/api/cart/sess-1", None, json!({ "productId": product.id, "quantity": 0 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app.post("/api/cart/sess-1", None, json!({ "quantity": 1 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.delete(&format!("/api/seller/products/{}", product.id), Some(&seller_token)).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.post("/api/cart/sess-1", None, json!({ "productId": product.id })).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let long_key = "k".repeat(129);
    let (status, _) = app.get(&format!("/api/cart/{long_key}"), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_huge_quantities_are_bounded() {
    let app = TestApp::new();
    let (_, _, first) = app.storefront(1, 10).await;
    let (_, _, second) = app.storefront(1, 10).await;

    let (status, _) = app.post("/api/cart/sess-1", None, json!({ "productId": first.id, "quantity": 3000000000u64 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    for product in [&first, &second] {
        let (status, _) = app.post("/api/cart/sess-1", None, json!({ "productId": product.id, "quantity": 2147483647 })).await;
        assert_eq!(status, StatusCode::OK);
    }
    let (status, body) = app.post("/api/cart/sess-1", None, json!({ "productId": first.id, "quantity": 5 })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cart"]["items"][0]["quantity"], 2147483647u64);
    assert_eq!(body["cart"]["itemCount"], 4294967294u64);

    let (status, _) = app.patch(&format!("/api/cart/sess-1/items/{}", first.id), None, json!({ "quantity": 2147483648u64 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, body) = app.get("/api/cart/sess-1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cart"]["itemCount"], 4294967294u64);
}
