//! Order Aggregate

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::product::Product;
use crate::domain::events::{DomainEvent, OrderEvent};
use crate::domain::value_objects::{decimal_from_json, OrderNumber, Quantity, MONEY_LIMIT};

pub const DEFAULT_PAYMENT_METHOD: &str = "online";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus { #[default] Pending, Processing, Completed, Cancelled }

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus { #[default] Pending, Paid, Failed, Refunded }

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Pending => "pending", Self::Processing => "processing", Self::Completed => "completed", Self::Cancelled => "cancelled" }
    }
    pub fn parse(value: &str) -> Option<Self> {
        match value { "pending" => Some(Self::Pending), "processing" => Some(Self::Processing), "completed" => Some(Self::Completed), "cancelled" => Some(Self::Cancelled), _ => None }
    }
    pub fn is_terminal(&self) -> bool { matches!(self, Self::Completed | Self::Cancelled) }
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        *self == next || matches!((self, next),
            (Self::Pending, Self::Processing) | (Self::Pending, Self::Cancelled) |
            (Self::Processing, Self::Completed) | (Self::Processing, Self::Cancelled))
    }
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Pending => "pending", Self::Paid => "paid", Self::Failed => "failed", Self::Refunded => "refunded" }
    }
    pub fn parse(value: &str) -> Option<Self> {
        match value { "pending" => Some(Self::Pending), "paid" => Some(Self::Paid), "failed" => Some(Self::Failed), "refunded" => Some(Self::Refunded), _ => None }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub title: String,
    pub price: Decimal,
    pub quantity: i32,
    pub total_price: Decimal,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub order_number: String,
    pub customer_id: Uuid,
    pub seller_id: Uuid,
    pub total: Decimal,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: String,
    pub shipping_address: serde_json::Value,
    pub items: Vec<OrderItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Cart line as posted by the storefront; shapes are checked by [`parse_cart_lines`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineInput {
    #[serde(default)]
    pub product: Option<CartProductInput>,
    #[serde(default)]
    pub quantity: serde_json::Value,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CartProductInput {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub price: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutLine { pub product_id: Uuid, pub quoted_price: Decimal, pub quantity: Quantity }

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrderError {
    #[error("Order not found")]
    NotFound,
    #[error("Cart is empty")]
    EmptyCart,
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("cartItems[{index}]: {reason}")]
    InvalidLine { index: usize, reason: &'static str },
    #[error("Product {0} does not exist")]
    UnknownProduct(Uuid),
    #[error("Product {0} is no longer available")]
    ProductUnavailable(Uuid),
    #[error("Product {0} does not belong to this seller")]
    WrongSeller(Uuid),
    #[error("Price of product {0} has changed; refresh the cart")]
    PriceChanged(Uuid),
    #[error("Order total {claimed} does not match cart total {expected}")]
    TotalMismatch { expected: Decimal, claimed: Decimal },
    #[error("total must be numeric")]
    InvalidTotal,
    #[error("Order total {0} is too large")]
    TotalTooLarge(Decimal),
    #[error("Insufficient inventory for product {0}")]
    InsufficientInventory(Uuid),
    #[error("Cannot move order from {from} to {to}")]
    InvalidTransition { from: &'static str, to: &'static str },
    #[error("unknown {field} '{value}'")]
    UnknownStatus { field: &'static str, value: String },
}

/// Validates raw cart lines and merges repeated products.
pub fn parse_cart_lines(items: &[CartLineInput]) -> Result<Vec<CheckoutLine>, OrderError> {
    if items.is_empty() { return Err(OrderError::EmptyCart); }
    let mut lines: Vec<CheckoutLine> = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let product = item.product.as_ref().ok_or(OrderError::InvalidLine { index, reason: "product is missing" })?;
        let product_id = product.id.as_deref().and_then(|id| Uuid::parse_str(id.trim()).ok())
            .ok_or(OrderError::InvalidLine { index, reason: "product.id is missing or malformed" })?;
        let quoted_price = decimal_from_json(&product.price).filter(|p| !p.is_sign_negative())
            .ok_or(OrderError::InvalidLine { index, reason: "product.price must be a non-negative number" })?;
        let quantity = Quantity::from_json(&item.quantity)
            .ok_or(OrderError::InvalidLine { index, reason: "quantity must be a positive integer" })?;
        match lines.iter_mut().find(|l| l.product_id == product_id) {
            Some(existing) if existing.quoted_price != quoted_price =>
                return Err(OrderError::InvalidLine { index, reason: "product appears twice with different prices" }),
            Some(existing) => existing.quantity = existing.quantity.add(quantity),
            None => lines.push(CheckoutLine { product_id, quoted_price, quantity }),
        }
    }
    Ok(lines)
}

pub fn parse_total(value: Option<&serde_json::Value>) -> Result<Option<Decimal>, OrderError> {
    match value {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(v) => decimal_from_json(v).map(Some).ok_or(OrderError::InvalidTotal),
    }
}

/// Everything needed to turn validated cart lines into an order.
#[derive(Debug, Clone)]
pub struct Checkout {
    pub customer_id: Uuid,
    pub seller_id: Uuid,
    pub lines: Vec<CheckoutLine>,
    pub claimed_total: Option<Decimal>,
    pub payment_method: Option<String>,
    pub shipping_address: serde_json::Value,
}

impl Order {
    /// Builds the order with item snapshots taken from `catalog`.
    pub fn place(number: OrderNumber, checkout: Checkout, catalog: &HashMap<Uuid, Product>, now: DateTime<Utc>) -> Result<Self, OrderError> {
        let id = Uuid::now_v7();
        let mut items = Vec::with_capacity(checkout.lines.len());
        for line in &checkout.lines {
            let product = catalog.get(&line.product_id).ok_or(OrderError::UnknownProduct(line.product_id))?;
            if product.seller_id != checkout.seller_id { return Err(OrderError::WrongSeller(product.id)); }
            if !product.is_active { return Err(OrderError::ProductUnavailable(product.id)); }
            if product.price != line.quoted_price { return Err(OrderError::PriceChanged(product.id)); }
            if !product.has_stock_for(line.quantity) { return Err(OrderError::InsufficientInventory(product.id)); }
            items.push(OrderItem {
                id: Uuid::now_v7(), order_id: id, product_id: product.id, title: product.title.clone(),
                price: product.price, quantity: line.quantity.as_i32(),
                total_price: product.price * Decimal::from(line.quantity.value()),
            });
        }
        let total: Decimal = items.iter().map(|i| i.total_price).sum();
        if total >= MONEY_LIMIT { return Err(OrderError::TotalTooLarge(total)); }
        if let Some(claimed) = checkout.claimed_total {
            if claimed != total { return Err(OrderError::TotalMismatch { expected: total, claimed }); }
        }
        let payment_method = checkout.payment_method.as_deref().map(str::trim).filter(|m| !m.is_empty())
            .unwrap_or(DEFAULT_PAYMENT_METHOD).to_string();
        Ok(Self {
            id, order_number: number.as_str().to_string(), customer_id: checkout.customer_id, seller_id: checkout.seller_id,
            total, status: OrderStatus::Pending, payment_status: PaymentStatus::Pending, payment_method,
            shipping_address: checkout.shipping_address, items, created_at: now, updated_at: now,
        })
    }

    pub fn placed_event(&self) -> DomainEvent {
        DomainEvent::Order(OrderEvent::Placed { order_id: self.id, order_number: self.order_number.clone(), seller_id: self.seller_id, total: self.total })
    }

    pub fn transition(&mut self, status: Option<OrderStatus>, payment: Option<PaymentStatus>, now: DateTime<Utc>) -> Result<Vec<DomainEvent>, OrderError> {
        let mut events = vec![];
        if let Some(next) = status {
            if !self.status.can_transition_to(next) {
                return Err(OrderError::InvalidTransition { from: self.status.as_str(), to: next.as_str() });
            }
            if next != self.status {
                self.status = next;
                events.push(DomainEvent::Order(OrderEvent::StatusChanged { order_id: self.id, status: next.as_str() }));
            }
        }
        if let Some(payment) = payment { self.payment_status = payment; }
        self.updated_at = now;
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::product::NewProduct;
    use serde_json::json;

    fn line(id: Uuid, price: serde_json::Value, quantity: serde_json::Value) -> CartLineInput {
        CartLineInput { product: Some(CartProductInput { id: Some(id.to_string()), title: Some("Rose Oil".into()), price }), quantity }
    }

    fn catalog(seller_id: Uuid, price: i64, inventory: i32) -> (Uuid, HashMap<Uuid, Product>) {
        let new = NewProduct { shop_id: Uuid::new_v4(), title: "Rose Oil".into(), description: None, price: Decimal::new(price, 0), inventory, images: vec![] };
        let p = Product::create(seller_id, &new, Utc::now()).unwrap();
        (p.id, HashMap::from([(p.id, p)]))
    }

    fn checkout(seller_id: Uuid, lines: Vec<CheckoutLine>, claimed_total: Option<Decimal>) -> Checkout {
        Checkout { customer_id: Uuid::new_v4(), seller_id, lines, claimed_total, payment_method: None, shipping_address: json!({}) }
    }

    #[test]
    fn test_parse_cart_lines() {
        assert_eq!(parse_cart_lines(&[]), Err(OrderError::EmptyCart));
        let id = Uuid::new_v4();
        let lines = parse_cart_lines(&[line(id, json!(100), json!(2)), line(id, json!("100"), json!(1))]).unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].quantity.value(), 3);

        let bad_price = parse_cart_lines(&[line(id, json!("cheap"), json!(1))]);
        assert!(matches!(bad_price, Err(OrderError::InvalidLine { index: 0, .. })));
        let bad_qty = parse_cart_lines(&[line(id, json!(1), json!(1)), line(Uuid::new_v4(), json!(1), json!(0))]);
        assert!(matches!(bad_qty, Err(OrderError::InvalidLine { index: 1, .. })));
        assert!(parse_cart_lines(&[CartLineInput::default()]).is_err());
    }

    #[test]
    fn test_place_order_snapshots_items() {
        let seller = Uuid::new_v4();
        let (pid, catalog) = catalog(seller, 100, 10);
        let lines = parse_cart_lines(&[line(pid, json!(100), json!(2))]).unwrap();
        let number = OrderNumber::generate(Utc::now());
        let order = Order::place(number, checkout(seller, lines, Some(Decimal::new(200, 0))), &catalog, Utc::now()).unwrap();
        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].total_price, Decimal::new(200, 0));
        assert_eq!(order.items[0].title, "Rose Oil");
        assert_eq!(order.total, Decimal::new(200, 0));
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.payment_method, DEFAULT_PAYMENT_METHOD);
    }

    #[test]
    fn test_total_must_fit_storage() {
        let seller = Uuid::new_v4();
        let (pid, catalog) = catalog(seller, 600_000_000_000, 10);
        let lines = parse_cart_lines(&[line(pid, json!(600_000_000_000i64), json!(2))]).unwrap();
        let placed = Order::place(OrderNumber::generate(Utc::now()), checkout(seller, lines, None), &catalog, Utc::now());
        assert!(matches!(placed, Err(OrderError::TotalTooLarge(_))));
    }

    #[test]
    fn test_place_order_rejections() {
        let seller = Uuid::new_v4();
        let (pid, catalog) = catalog(seller, 100, 1);
        let n = || OrderNumber::generate(Utc::now());
        let lines = |q: u32| vec![CheckoutLine { product_id: pid, quoted_price: Decimal::new(100, 0), quantity: Quantity::new(q).unwrap() }];

        assert_eq!(Order::place(n(), checkout(seller, lines(2), None), &catalog, Utc::now()), Err(OrderError::InsufficientInventory(pid)));
        assert_eq!(Order::place(n(), checkout(Uuid::new_v4(), lines(1), None), &catalog, Utc::now()), Err(OrderError::WrongSeller(pid)));
        assert!(matches!(Order::place(n(), checkout(seller, lines(1), Some(Decimal::new(99, 0))), &catalog, Utc::now()), Err(OrderError::TotalMismatch { .. })));
        let stale = vec![CheckoutLine { product_id: pid, quoted_price: Decimal::new(90, 0), quantity: Quantity::new(1).unwrap() }];
        assert_eq!(Order::place(n(), checkout(seller, stale, None), &catalog, Utc::now()), Err(OrderError::PriceChanged(pid)));
        let ghost = Uuid::new_v4();
        let unknown = vec![CheckoutLine { product_id: ghost, quoted_price: Decimal::ONE, quantity: Quantity::new(1).unwrap() }];
        assert_eq!(Order::place(n(), checkout(seller, unknown, None), &catalog, Utc::now()), Err(OrderError::UnknownProduct(ghost)));
    }

    #[test]
    fn test_status_transitions() {
        let seller = Uuid::new_v4();
        let (pid, catalog) = catalog(seller, 10, 5);
        let lines = vec![CheckoutLine { product_id: pid, quoted_price: Decimal::new(10, 0), quantity: Quantity::new(1).unwrap() }];
        let mut order = Order::place(OrderNumber::generate(Utc::now()), checkout(seller, lines, None), &catalog, Utc::now()).unwrap();

        let events = order.transition(Some(OrderStatus::Processing), Some(PaymentStatus::Paid), Utc::now()).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(order.payment_status, PaymentStatus::Paid);
        order.transition(Some(OrderStatus::Completed), None, Utc::now()).unwrap();
        assert_eq!(
            order.transition(Some(OrderStatus::Cancelled), None, Utc::now()),
            Err(OrderError::InvalidTransition { from: "completed", to: "cancelled" })
        );
        assert!(OrderStatus::Completed.is_terminal());
        assert_eq!(OrderStatus::parse("processing"), Some(OrderStatus::Processing));
        assert_eq!(PaymentStatus::parse("bogus"), None);
    }

    #[test]
    fn test_parse_total() {
        assert_eq!(parse_total(None), Ok(None));
        assert_eq!(parse_total(Some(&json!(200))), Ok(Some(Decimal::new(200, 0))));
        assert_eq!(parse_total(Some(&json!({}))), Err(OrderError::InvalidTotal));
    }
}
