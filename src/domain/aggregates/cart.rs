//! Cart Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Largest quantity a single line can hold; matches the order item column.
pub const MAX_LINE_QUANTITY: u32 = i32::MAX as u32;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    items: Vec<CartItem>,
    updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product_id: Uuid,
    pub seller_id: Uuid,
    pub title: String,
    pub price: Decimal,
    pub quantity: u32,
}

impl CartItem {
    pub fn line_total(&self) -> Decimal { self.price * Decimal::from(self.quantity) }
}

impl Default for Cart {
    fn default() -> Self { Self { items: vec![], updated_at: Utc::now() } }
}

impl Cart {
    pub fn items(&self) -> &[CartItem] { &self.items }
    pub fn item_count(&self) -> u64 { self.items.iter().map(|i| u64::from(i.quantity)).sum() }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }
    pub fn subtotal(&self) -> Decimal { self.items.iter().map(CartItem::line_total).sum() }
    pub fn updated_at(&self) -> DateTime<Utc> { self.updated_at }

    /// Same product merges into one line; title and price follow the latest add.
    pub fn add_item(&mut self, item: CartItem) -> Result<(), CartError> {
        if item.quantity == 0 || item.quantity > MAX_LINE_QUANTITY { return Err(CartError::InvalidQuantity); }
        if let Some(existing) = self.items.iter_mut().find(|i| i.product_id == item.product_id) {
            existing.quantity = existing.quantity.saturating_add(item.quantity).min(MAX_LINE_QUANTITY);
            existing.title = item.title;
            existing.price = item.price;
        } else {
            self.items.push(item);
        }
        self.touch();
        Ok(())
    }

    pub fn update_quantity(&mut self, product_id: Uuid, quantity: u32) -> Result<(), CartError> {
        if quantity > MAX_LINE_QUANTITY { return Err(CartError::InvalidQuantity); }
        let item = self.items.iter_mut().find(|i| i.product_id == product_id).ok_or(CartError::ItemNotFound)?;
        if quantity == 0 { self.items.retain(|i| i.product_id != product_id); }
        else { item.quantity = quantity; }
        self.touch();
        Ok(())
    }

    pub fn remove_item(&mut self, product_id: Uuid) -> Result<(), CartError> {
        let before = self.items.len();
        self.items.retain(|i| i.product_id != product_id);
        if self.items.len() == before { return Err(CartError::ItemNotFound); }
        self.touch();
        Ok(())
    }

    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CartError {
    #[error("Item not found in cart")]
    ItemNotFound,
    #[error("quantity must be a positive integer")]
    InvalidQuantity,
    #[error("Product not found")]
    ProductNotFound,
}
