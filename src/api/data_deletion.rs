//! Platform data-deletion callback.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::domain::events::publish;
use crate::domain::value_objects::{Email, Mobile};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

const CONFIRMATION_CODE_LEN: usize = 16;

#[derive(Debug, Default, Deserialize)]
pub struct DataDeletionRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub mobile: Option<String>,
}

fn confirmation_code() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(CONFIRMATION_CODE_LEN)
        .map(|c| char::from(c).to_ascii_uppercase())
        .collect()
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Anonymizes every customer matching the email or mobile. Succeeds even
/// when nothing matched.
#[tracing::instrument(skip_all)]
pub async fn callback(State(state): State<AppState>, payload: Result<Json<DataDeletionRequest>, JsonRejection>) -> ApiResult<Json<Value>> {
    let Json(req) = payload?;
    let email = present(&req.email).map(Email::parse).transpose()?;
    let mobile = present(&req.mobile).map(Mobile::parse).transpose()?;
    if email.is_none() && mobile.is_none() {
        return Err(ApiError::BadRequest("email or mobile is required".into()));
    }

    let applied = state.stores.customers.anonymize_customers(email.as_ref(), mobile.as_ref(), Utc::now()).await?;
    publish(&applied.events);

    let code = confirmation_code();
    tracing::info!(confirmation_code = %code, customers = applied.value.len(), "data deletion processed");
    Ok(Json(json!({
        "url": format!("{}?code={}", state.data_deletion_status_url, code),
        "confirmationCode": code,
        "customersAnonymized": applied.value.len(),
    })))
}
