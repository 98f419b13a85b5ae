use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;
use validator::Validate;

use crate::auth::RequireSeller;
use crate::domain::aggregates::{NewShop, ShopCommand, ShopPatch};
use crate::domain::events::publish;
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn list_shops(State(state): State<AppState>, RequireSeller(auth): RequireSeller) -> ApiResult<Json<Value>> {
    let shops = state.stores.sellers.shops(auth.user_id).await?;
    Ok(Json(json!({ "success": true, "shops": shops })))
}

#[tracing::instrument(skip_all)]
pub async fn create_shop(
    State(state): State<AppState>,
    RequireSeller(auth): RequireSeller,
    payload: Result<Json<NewShop>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let Json(new) = payload?;
    new.validate()?;
    let applied = state.stores.sellers.apply_shop_command(auth.user_id, ShopCommand::Create(new), Utc::now()).await?;
    publish(&applied.events);
    Ok((StatusCode::CREATED, Json(json!({ "success": true, "shop": applied.value }))))
}

#[tracing::instrument(skip_all)]
pub async fn update_shop(
    State(state): State<AppState>,
    RequireSeller(auth): RequireSeller,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<ShopPatch>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Path(id) = id?;
    let Json(patch) = payload?;
    patch.validate()?;
    let applied = state.stores.sellers.apply_shop_command(auth.user_id, ShopCommand::Update { id, patch }, Utc::now()).await?;
    publish(&applied.events);
    Ok(Json(json!({ "success": true, "shop": applied.value })))
}

#[tracing::instrument(skip_all)]
pub async fn make_default(
    State(state): State<AppState>,
    RequireSeller(auth): RequireSeller,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<Value>> {
    let Path(id) = id?;
    let applied = state.stores.sellers.apply_shop_command(auth.user_id, ShopCommand::MakeDefault { id }, Utc::now()).await?;
    publish(&applied.events);
    Ok(Json(json!({ "success": true, "shop": applied.value })))
}
