//! Customer address book.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;
use validator::Validate;

use crate::auth::RequireCustomer;
use crate::domain::aggregates::{AddressCommand, AddressPatch, NewAddress};
use crate::domain::events::publish;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub async fn list_addresses(State(state): State<AppState>, RequireCustomer(auth): RequireCustomer) -> ApiResult<Json<Value>> {
    let addresses = state.stores.customers.addresses(auth.user_id).await?;
    Ok(Json(json!({ "success": true, "addresses": addresses })))
}

#[tracing::instrument(skip_all)]
pub async fn create_address(
    State(state): State<AppState>,
    RequireCustomer(auth): RequireCustomer,
    payload: Result<Json<NewAddress>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let Json(new) = payload?;
    new.validate()?;
    let applied = state.stores.customers.apply_address_command(auth.user_id, AddressCommand::Create(new), Utc::now()).await?;
    publish(&applied.events);
    Ok((StatusCode::CREATED, Json(json!({ "success": true, "address": applied.value }))))
}

#[derive(Debug, Deserialize)]
pub struct UpdateAddressRequest {
    pub id: Uuid,
    #[serde(flatten)]
    pub patch: AddressPatch,
}

#[tracing::instrument(skip_all)]
pub async fn update_address(
    State(state): State<AppState>,
    RequireCustomer(auth): RequireCustomer,
    payload: Result<Json<UpdateAddressRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(req) = payload?;
    req.patch.validate()?;
    let command = AddressCommand::Update { id: req.id, patch: req.patch };
    let applied = state.stores.customers.apply_address_command(auth.user_id, command, Utc::now()).await?;
    publish(&applied.events);
    Ok(Json(json!({ "success": true, "address": applied.value })))
}

#[derive(Debug, Deserialize)]
pub struct DeleteAddressParams {
    pub id: Option<Uuid>,
}

#[tracing::instrument(skip_all)]
pub async fn delete_address(
    State(state): State<AppState>,
    RequireCustomer(auth): RequireCustomer,
    params: Result<Query<DeleteAddressParams>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    let Query(params) = params?;
    let id = params.id.ok_or_else(|| ApiError::BadRequest("id is required".into()))?;
    let applied = state.stores.customers.apply_address_command(auth.user_id, AddressCommand::Delete { id }, Utc::now()).await?;
    publish(&applied.events);
    Ok(Json(json!({ "success": true })))
}
