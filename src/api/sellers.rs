//! Seller accounts, plans and seller login.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;
use validator::Validate;

use crate::auth::{RequireAdmin, UserType};
use crate::domain::aggregates::{NewPlan, NewSeller, Plan, Seller, SellerError, SellerPatch};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub async fn list_sellers(State(state): State<AppState>, _admin: RequireAdmin) -> ApiResult<Json<Value>> {
    let sellers = state.stores.sellers.sellers().await?;
    Ok(Json(json!({ "success": true, "sellers": sellers })))
}

/// Argon2 work runs on the blocking pool.
async fn off_runtime<T: Send + 'static>(work: impl FnOnce() -> T + Send + 'static) -> ApiResult<T> {
    tokio::task::spawn_blocking(work).await.map_err(|e| ApiError::Internal(e.to_string()))
}

#[tracing::instrument(skip_all)]
pub async fn create_seller(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    payload: Result<Json<NewSeller>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let Json(new) = payload?;
    new.validate()?;
    let now = Utc::now();
    let seller = off_runtime(move || Seller::register(&new, now)).await??;
    state.stores.sellers.insert_seller(&seller).await?;
    tracing::info!(seller_id = %seller.id, username = %seller.username, "seller registered");
    Ok((StatusCode::CREATED, Json(json!({ "success": true, "seller": seller }))))
}

#[tracing::instrument(skip_all)]
pub async fn update_seller(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<SellerPatch>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Path(id) = id?;
    let Json(patch) = payload?;
    patch.validate()?;
    let mut seller = state.stores.sellers.seller(id).await?.ok_or(SellerError::NotFound)?;
    seller.apply_patch(&patch, Utc::now())?;
    state.stores.sellers.update_seller(&seller).await?;
    Ok(Json(json!({ "success": true, "seller": seller })))
}

pub async fn list_plans(State(state): State<AppState>, _admin: RequireAdmin) -> ApiResult<Json<Value>> {
    let plans = state.stores.subscriptions.plans().await?;
    Ok(Json(json!({ "success": true, "plans": plans })))
}

pub async fn create_plan(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    payload: Result<Json<NewPlan>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let Json(new) = payload?;
    new.validate()?;
    let plan = Plan::create(&new, Utc::now())?;
    state.stores.subscriptions.insert_plan(&plan).await?;
    Ok((StatusCode::CREATED, Json(json!({ "success": true, "plan": plan }))))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

pub async fn login(State(state): State<AppState>, payload: Result<Json<LoginRequest>, JsonRejection>) -> ApiResult<Json<Value>> {
    let Json(req) = payload?;
    let invalid = || ApiError::Unauthorized("Invalid credentials".into());
    let seller = state.stores.sellers.seller_by_username(&req.username).await?.ok_or_else(invalid)?;
    let (seller, verified) = off_runtime(move || {
        let verified = seller.is_active && seller.verify_password(&req.password);
        (seller, verified)
    })
    .await?;
    if !verified {
        tracing::info!(seller_id = %seller.id, "seller login rejected");
        return Err(invalid());
    }
    let token = state.auth.keys().issue(seller.id, UserType::Seller, Utc::now())
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(Json(json!({ "success": true, "token": token, "seller": seller })))
}
