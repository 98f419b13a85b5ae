//! Session carts.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::domain::aggregates::{Cart, CartError, MAX_LINE_QUANTITY};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

const MAX_SESSION_KEY_LEN: usize = 128;

fn session_key(raw: &str) -> ApiResult<&str> {
    let key = raw.trim();
    if key.is_empty() || key.len() > MAX_SESSION_KEY_LEN {
        return Err(ApiError::BadRequest("session key must be 1 to 128 characters".into()));
    }
    Ok(key)
}

fn quantity(value: i64) -> ApiResult<u32> {
    u32::try_from(value).ok()
        .filter(|q| *q <= MAX_LINE_QUANTITY)
        .ok_or_else(|| CartError::InvalidQuantity.into())
}

fn cart_body(cart: &Cart) -> Json<Value> {
    Json(json!({
        "success": true,
        "cart": {
            "items": cart.items(),
            "subtotal": cart.subtotal(),
            "itemCount": cart.item_count(),
            "updatedAt": cart.updated_at(),
        }
    }))
}

pub async fn get_cart(State(state): State<AppState>, session: Result<Path<String>, PathRejection>) -> ApiResult<Json<Value>> {
    let Path(session) = session?;
    let cart = state.carts.get_cart(session_key(&session)?).await?;
    Ok(cart_body(&cart))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequest {
    pub product_id: Uuid,
    #[serde(default = "one")]
    pub quantity: i64,
}

fn one() -> i64 { 1 }

pub async fn add_to_cart(
    State(state): State<AppState>,
    session: Result<Path<String>, PathRejection>,
    payload: Result<Json<AddToCartRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Path(session) = session?;
    let Json(req) = payload?;
    let cart = state.carts.add_item(session_key(&session)?, req.product_id, quantity(req.quantity)?).await?;
    Ok(cart_body(&cart))
}

pub async fn clear_cart(State(state): State<AppState>, session: Result<Path<String>, PathRejection>) -> ApiResult<Json<Value>> {
    let Path(session) = session?;
    state.carts.clear(session_key(&session)?).await?;
    Ok(Json(json!({ "success": true })))
}

#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    pub quantity: i64,
}

/// A quantity of zero removes the line.
pub async fn update_item(
    State(state): State<AppState>,
    path: Result<Path<(String, Uuid)>, PathRejection>,
    payload: Result<Json<UpdateItemRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Path((session, product_id)) = path?;
    let Json(req) = payload?;
    let cart = state.carts.update_quantity(session_key(&session)?, product_id, quantity(req.quantity)?).await?;
    Ok(cart_body(&cart))
}

pub async fn remove_item(State(state): State<AppState>, path: Result<Path<(String, Uuid)>, PathRejection>) -> ApiResult<Json<Value>> {
    let Path((session, product_id)) = path?;
    let cart = state.carts.remove_item(session_key(&session)?, product_id).await?;
    Ok(cart_body(&cart))
}
