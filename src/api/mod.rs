//! HTTP surface.

pub mod addresses;
pub mod cart;
pub mod data_deletion;
pub mod orders;
pub mod products;
pub mod sellers;
pub mod shops;
pub mod subscriptions;

use axum::routing::{get, patch, post, put};
use axum::{middleware, Json, Router};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::auth::resolve_auth;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/auth/seller/login", post(sellers::login))
        .route("/api/orders", get(orders::list_orders).post(orders::create_order))
        .route("/api/orders/:id", get(orders::get_order).patch(orders::update_order))
        .route("/api/customer/orders", get(orders::customer_orders))
        .route(
            "/api/customer/addresses",
            get(addresses::list_addresses)
                .post(addresses::create_address)
                .patch(addresses::update_address)
                .delete(addresses::delete_address),
        )
        .route("/api/admin/sellers", get(sellers::list_sellers).post(sellers::create_seller))
        .route("/api/admin/sellers/:id", patch(sellers::update_seller))
        .route("/api/admin/plans", get(sellers::list_plans).post(sellers::create_plan))
        .route("/api/admin/subscriptions", get(subscriptions::list_subscriptions).post(subscriptions::assign_subscription))
        .route(
            "/api/admin/subscriptions/:id",
            patch(subscriptions::update_subscription).delete(subscriptions::delete_subscription),
        )
        .route("/api/seller/subscription", get(subscriptions::current_subscription))
        .route("/api/seller/shops", get(shops::list_shops).post(shops::create_shop))
        .route("/api/seller/shops/:id", patch(shops::update_shop))
        .route("/api/seller/shops/:id/default", post(shops::make_default))
        .route("/api/seller/products", get(products::list_products).post(products::create_product))
        .route(
            "/api/seller/products/:id",
            get(products::get_product).put(products::update_product).delete(products::delete_product),
        )
        .route("/api/seller/products/:id/images", put(products::reorder_images))
        .route("/api/cart/:session", get(cart::get_cart).post(cart::add_to_cart).delete(cart::clear_cart))
        .route("/api/cart/:session/items/:product_id", patch(cart::update_item).delete(cart::remove_item))
        .route("/api/data-deletion/callback", post(data_deletion::callback))
        .layer(middleware::from_fn_with_state(state.clone(), resolve_auth))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<Value> { Json(json!({"status": "healthy", "service": "shopgram"})) }
