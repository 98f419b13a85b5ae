//! Seller catalog management.
//!
//! Products are scoped to the authenticated seller; another seller's product
//! is reported as missing. Creating or reactivating a product needs a current
//! subscription whose plan still has room under `max_products`.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;
use validator::Validate;

use crate::auth::RequireSeller;
use crate::domain::aggregates::{NewProduct, Product, ProductError, ProductPatch};
use crate::error::ApiResult;
use crate::state::AppState;

async fn owned_product(state: &AppState, seller_id: Uuid, id: Uuid) -> ApiResult<Product> {
    Ok(state.stores.products.product(id).await?
        .filter(|p| p.seller_id == seller_id)
        .ok_or(ProductError::NotFound)?)
}

async fn ensure_shop(state: &AppState, seller_id: Uuid, shop_id: Uuid) -> ApiResult<()> {
    let shops = state.stores.sellers.shops(seller_id).await?;
    if !shops.iter().any(|s| s.id == shop_id && s.is_active) { return Err(ProductError::ShopNotFound.into()); }
    Ok(())
}

/// Fails unless one more active product fits the seller's current plan.
async fn ensure_quota(state: &AppState, seller_id: Uuid, now: DateTime<Utc>) -> ApiResult<()> {
    let subscription = state.stores.subscriptions.subscriptions(Some(seller_id)).await?
        .into_iter()
        .find(|s| s.is_current(now))
        .ok_or(ProductError::NoActiveSubscription)?;
    let plan = state.stores.subscriptions.plan(subscription.plan_id).await?.ok_or(ProductError::NoActiveSubscription)?;
    let active = state.stores.products.count_active_products(seller_id).await?;
    if active >= i64::from(plan.max_products) { return Err(ProductError::QuotaReached(plan.max_products).into()); }
    Ok(())
}

pub async fn list_products(State(state): State<AppState>, RequireSeller(auth): RequireSeller) -> ApiResult<Json<Value>> {
    let products = state.stores.products.seller_products(auth.user_id).await?;
    Ok(Json(json!({ "success": true, "products": products })))
}

#[tracing::instrument(skip_all)]
pub async fn create_product(
    State(state): State<AppState>,
    RequireSeller(auth): RequireSeller,
    payload: Result<Json<NewProduct>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let Json(new) = payload?;
    new.validate()?;
    let now = Utc::now();
    let product = Product::create(auth.user_id, &new, now)?;
    ensure_shop(&state, auth.user_id, new.shop_id).await?;
    ensure_quota(&state, auth.user_id, now).await?;
    state.stores.products.insert_product(&product).await?;
    tracing::info!(product_id = %product.id, seller_id = %auth.user_id, "product created");
    Ok((StatusCode::CREATED, Json(json!({ "success": true, "product": product }))))
}

pub async fn get_product(
    State(state): State<AppState>,
    RequireSeller(auth): RequireSeller,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<Value>> {
    let Path(id) = id?;
    let product = owned_product(&state, auth.user_id, id).await?;
    Ok(Json(json!({ "success": true, "product": product })))
}

#[tracing::instrument(skip_all)]
pub async fn update_product(
    State(state): State<AppState>,
    RequireSeller(auth): RequireSeller,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<ProductPatch>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Path(id) = id?;
    let Json(patch) = payload?;
    patch.validate()?;
    let now = Utc::now();
    let mut product = owned_product(&state, auth.user_id, id).await?;
    if let Some(shop_id) = patch.shop_id.filter(|s| *s != product.shop_id) {
        ensure_shop(&state, auth.user_id, shop_id).await?;
    }
    if patch.is_active == Some(true) && !product.is_active {
        ensure_quota(&state, auth.user_id, now).await?;
    }
    product.apply_patch(&patch, now)?;
    state.stores.products.update_product(&product).await?;
    Ok(Json(json!({ "success": true, "product": product })))
}

/// Soft delete.
#[tracing::instrument(skip_all)]
pub async fn delete_product(
    State(state): State<AppState>,
    RequireSeller(auth): RequireSeller,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<Value>> {
    let Path(id) = id?;
    let mut product = owned_product(&state, auth.user_id, id).await?;
    product.deactivate(Utc::now());
    state.stores.products.update_product(&product).await?;
    tracing::info!(product_id = %product.id, "product deactivated");
    Ok(Json(json!({ "success": true })))
}

#[derive(Debug, Deserialize)]
pub struct ReorderImagesRequest {
    pub images: Vec<String>,
}

pub async fn reorder_images(
    State(state): State<AppState>,
    RequireSeller(auth): RequireSeller,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<ReorderImagesRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Path(id) = id?;
    let Json(req) = payload?;
    let mut product = owned_product(&state, auth.user_id, id).await?;
    product.reorder_images(&req.images, Utc::now())?;
    state.stores.products.update_product(&product).await?;
    Ok(Json(json!({ "success": true, "product": product })))
}
