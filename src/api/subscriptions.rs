//! Plan subscriptions.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;
use validator::Validate;

use crate::auth::{RequireAdmin, RequireSeller};
use crate::domain::aggregates::{AssignSubscription, SubscriptionCommand, SubscriptionError, SubscriptionPatch};
use crate::domain::events::publish;
use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionListParams {
    pub seller_id: Option<Uuid>,
}

pub async fn list_subscriptions(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    params: Result<Query<SubscriptionListParams>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    let Query(params) = params?;
    let subscriptions = state.stores.subscriptions.subscriptions(params.seller_id).await?;
    Ok(Json(json!({ "success": true, "subscriptions": subscriptions })))
}

#[tracing::instrument(skip_all)]
pub async fn assign_subscription(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    payload: Result<Json<AssignSubscription>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let Json(req) = payload?;
    req.validate()?;
    let plan = state.stores.subscriptions.plan(req.plan_id).await?.ok_or(SubscriptionError::PlanNotFound)?;
    let command = SubscriptionCommand::Assign { plan, months: req.months, is_active: req.is_active, start_date: req.start_date };
    let applied = state.stores.subscriptions.apply_subscription_command(req.seller_id, command, Utc::now()).await?;
    publish(&applied.events);
    Ok((StatusCode::CREATED, Json(json!({ "success": true, "subscription": applied.value }))))
}

#[tracing::instrument(skip_all)]
pub async fn update_subscription(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<SubscriptionPatch>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Path(id) = id?;
    let Json(patch) = payload?;
    patch.validate()?;
    let current = state.stores.subscriptions.subscription(id).await?.ok_or(SubscriptionError::NotFound)?;
    if let Some(plan_id) = patch.plan_id {
        state.stores.subscriptions.plan(plan_id).await?.ok_or(SubscriptionError::PlanNotFound)?;
    }
    let command = SubscriptionCommand::Update { id, patch };
    let applied = state.stores.subscriptions.apply_subscription_command(current.seller_id, command, Utc::now()).await?;
    publish(&applied.events);
    Ok(Json(json!({ "success": true, "subscription": applied.value })))
}

#[tracing::instrument(skip_all)]
pub async fn delete_subscription(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<Value>> {
    let Path(id) = id?;
    let current = state.stores.subscriptions.subscription(id).await?.ok_or(SubscriptionError::NotFound)?;
    let applied = state.stores.subscriptions
        .apply_subscription_command(current.seller_id, SubscriptionCommand::Remove { id }, Utc::now())
        .await?;
    publish(&applied.events);
    Ok(Json(json!({ "success": true })))
}

/// The seller's current subscription and its plan, or nulls.
pub async fn current_subscription(State(state): State<AppState>, RequireSeller(auth): RequireSeller) -> ApiResult<Json<Value>> {
    let now = Utc::now();
    let current = state.stores.subscriptions.subscriptions(Some(auth.user_id)).await?
        .into_iter()
        .find(|s| s.is_current(now));
    let plan = match &current {
        Some(s) => state.stores.subscriptions.plan(s.plan_id).await?,
        None => None,
    };
    Ok(Json(json!({ "success": true, "subscription": current, "plan": plan })))
}
