//! Order placement and order management.

use std::collections::HashMap;

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::{AuthContext, MaybeAuth, RequireCustomer, UserType};
use crate::domain::aggregates::order::{parse_cart_lines, parse_total};
use crate::domain::aggregates::{
    CartLineInput, Checkout, Customer, CustomerData, CustomerError, CustomerResolution, Order, OrderError, OrderStatus,
    PaymentStatus,
};
use crate::domain::events::publish;
use crate::domain::value_objects::OrderNumber;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[serde(default)]
    pub customer_data: Option<CustomerData>,
    #[serde(default)]
    pub cart_items: Option<Vec<CartLineInput>>,
    #[serde(default)]
    pub total: Option<Value>,
    #[serde(default)]
    pub seller_id: Option<String>,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub shipping_address: Option<Value>,
}

#[tracing::instrument(skip_all)]
pub async fn create_order(
    State(state): State<AppState>,
    MaybeAuth(auth): MaybeAuth,
    payload: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let Json(req) = payload?;
    let now = Utc::now();

    let lines = parse_cart_lines(req.cart_items.as_deref().unwrap_or_default())?;
    let seller_id = match req.seller_id.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => Uuid::parse_str(raw).map_err(|_| ApiError::BadRequest("sellerId is not a valid id".into()))?,
        None => return Err(OrderError::MissingField("sellerId").into()),
    };
    let claimed_total = parse_total(req.total.as_ref())?;

    let customer = match auth.filter(|a| a.user_type == UserType::Customer) {
        Some(auth) => {
            let data = req.customer_data.clone().unwrap_or_default();
            let mut existing = match state.stores.customers.customer(auth.user_id).await? {
                Some(found) => found,
                None => {
                    let (email, mobile) = data.contact()?;
                    state.stores.customers.customer_by_contact(email.as_ref(), mobile.as_ref()).await?
                        .ok_or(CustomerError::NotFound)?
                }
            };
            existing.refresh_contact(&data, now)?;
            CustomerResolution::Existing(existing)
        }
        None => CustomerResolution::New(Customer::from_guest(req.customer_data.as_ref(), now)?),
    };

    let seller = state.stores.sellers.seller(seller_id).await?
        .filter(|s| s.is_active)
        .ok_or_else(|| ApiError::BadRequest(format!("Seller {seller_id} does not exist")))?;

    let ids: Vec<Uuid> = lines.iter().map(|l| l.product_id).collect();
    let catalog: HashMap<Uuid, _> = state.stores.products.products_by_ids(&ids).await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();

    let checkout = Checkout {
        customer_id: customer.customer().id,
        seller_id: seller.id,
        lines,
        claimed_total,
        payment_method: req.payment_method,
        shipping_address: req.shipping_address.unwrap_or_else(|| json!({})),
    };
    let order = Order::place(OrderNumber::generate(now), checkout, &catalog, now)?;
    state.stores.orders.place_order(&customer, &order).await?;
    publish(&[order.placed_event()]);

    Ok((StatusCode::CREATED, Json(json!({ "success": true, "orderNumber": order.order_number, "orderId": order.id }))))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderListParams {
    pub seller_id: Option<Uuid>,
}

pub async fn list_orders(
    State(state): State<AppState>,
    MaybeAuth(auth): MaybeAuth,
    params: Result<Query<OrderListParams>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    let auth = auth.ok_or_else(ApiError::unauthorized)?;
    let Query(params) = params?;
    let seller_id = match auth.user_type {
        UserType::Seller => match params.seller_id {
            Some(id) if id != auth.user_id => return Err(ApiError::forbidden()),
            _ => auth.user_id,
        },
        UserType::Admin => params.seller_id.ok_or(OrderError::MissingField("sellerId"))?,
        UserType::Customer => return Err(ApiError::forbidden()),
    };
    let orders = state.stores.orders.seller_orders(seller_id).await?;
    Ok(Json(json!({ "success": true, "orders": orders })))
}

fn can_view(auth: &AuthContext, order: &Order) -> bool {
    match auth.user_type {
        UserType::Admin => true,
        UserType::Seller => order.seller_id == auth.user_id,
        UserType::Customer => order.customer_id == auth.user_id,
    }
}

pub async fn get_order(
    State(state): State<AppState>,
    MaybeAuth(auth): MaybeAuth,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<Value>> {
    let auth = auth.ok_or_else(ApiError::unauthorized)?;
    let Path(id) = id?;
    let order = state.stores.orders.order(id).await?
        .filter(|o| can_view(&auth, o))
        .ok_or(OrderError::NotFound)?;
    Ok(Json(json!({ "success": true, "order": order })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrderRequest {
    pub status: Option<String>,
    pub payment_status: Option<String>,
}

#[tracing::instrument(skip_all)]
pub async fn update_order(
    State(state): State<AppState>,
    MaybeAuth(auth): MaybeAuth,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateOrderRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let auth = auth.ok_or_else(ApiError::unauthorized)?;
    if auth.user_type == UserType::Customer { return Err(ApiError::forbidden()); }
    let Path(id) = id?;
    let Json(req) = payload?;

    let status = req.status.as_deref()
        .map(|v| OrderStatus::parse(v).ok_or_else(|| OrderError::UnknownStatus { field: "status", value: v.to_string() }))
        .transpose()?;
    let payment = req.payment_status.as_deref()
        .map(|v| PaymentStatus::parse(v).ok_or_else(|| OrderError::UnknownStatus { field: "paymentStatus", value: v.to_string() }))
        .transpose()?;
    if status.is_none() && payment.is_none() {
        return Err(ApiError::BadRequest("status or paymentStatus is required".into()));
    }

    let mut order = state.stores.orders.order(id).await?
        .filter(|o| can_view(&auth, o))
        .ok_or(OrderError::NotFound)?;
    let events = order.transition(status, payment, Utc::now())?;
    state.stores.orders.update_order_status(&order).await?;
    publish(&events);
    Ok(Json(json!({ "success": true, "order": order })))
}

pub async fn customer_orders(State(state): State<AppState>, RequireCustomer(auth): RequireCustomer) -> ApiResult<Json<Value>> {
    let orders = state.stores.orders.customer_orders(auth.user_id).await?;
    Ok(Json(json!({ "success": true, "orders": orders })))
}
