//! Product Aggregate

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::domain::value_objects::{money_amount, Quantity};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub seller_id: Uuid,
    pub shop_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub inventory: i32,
    pub is_active: bool,
    pub images: Vec<ProductImage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductImage { pub url: String, pub position: i32 }

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub shop_id: Uuid,
    #[validate(length(max = 200))]
    pub title: String,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    pub price: Decimal,
    #[validate(range(min = 0, message = "inventory cannot be negative"))]
    #[serde(default)]
    pub inventory: i32,
    #[serde(default)]
    pub images: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProductPatch {
    pub shop_id: Option<Uuid>,
    #[validate(length(max = 200))]
    pub title: Option<String>,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    pub price: Option<Decimal>,
    #[validate(range(min = 0, message = "inventory cannot be negative"))]
    pub inventory: Option<i32>,
    pub is_active: Option<bool>,
    pub images: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProductError {
    #[error("Product not found")]
    NotFound,
    #[error("Shop not found")]
    ShopNotFound,
    #[error("title is required")]
    MissingTitle,
    #[error("price cannot be negative")]
    NegativePrice,
    #[error("price must have at most two decimal places and be below 1000000000000")]
    InvalidPrice,
    #[error("inventory cannot be negative")]
    NegativeInventory,
    #[error("image urls must be non-empty and unique")]
    InvalidImages,
    #[error("image order must list every current image exactly once")]
    ImageOrderMismatch,
    #[error("an active subscription is required to add products")]
    NoActiveSubscription,
    #[error("product limit of {0} reached for the current plan")]
    QuotaReached(i32),
}

impl Product {
    pub fn create(seller_id: Uuid, new: &NewProduct, now: DateTime<Utc>) -> Result<Self, ProductError> {
        let title = new.title.trim();
        if title.is_empty() { return Err(ProductError::MissingTitle); }
        let price = product_price(new.price)?;
        if new.inventory < 0 { return Err(ProductError::NegativeInventory); }
        Ok(Self {
            id: Uuid::now_v7(), seller_id, shop_id: new.shop_id, title: title.to_string(),
            description: new.description.clone(), price, inventory: new.inventory,
            is_active: true, images: numbered(&new.images)?, created_at: now, updated_at: now,
        })
    }

    pub fn apply_patch(&mut self, patch: &ProductPatch, now: DateTime<Utc>) -> Result<(), ProductError> {
        if let Some(title) = &patch.title {
            let title = title.trim();
            if title.is_empty() { return Err(ProductError::MissingTitle); }
            self.title = title.to_string();
        }
        if let Some(price) = patch.price {
            self.price = product_price(price)?;
        }
        if let Some(inventory) = patch.inventory {
            if inventory < 0 { return Err(ProductError::NegativeInventory); }
            self.inventory = inventory;
        }
        if let Some(images) = &patch.images { self.images = numbered(images)?; }
        if let Some(shop_id) = patch.shop_id { self.shop_id = shop_id; }
        if patch.description.is_some() { self.description = patch.description.clone(); }
        if let Some(active) = patch.is_active { self.is_active = active; }
        self.touch(now);
        Ok(())
    }

    /// Rewrites image positions to follow `urls`, which must be a permutation
    /// of the current image set.
    pub fn reorder_images(&mut self, urls: &[String], now: DateTime<Utc>) -> Result<(), ProductError> {
        let current: HashSet<&str> = self.images.iter().map(|i| i.url.as_str()).collect();
        let wanted: HashSet<&str> = urls.iter().map(String::as_str).collect();
        if urls.len() != self.images.len() || wanted.len() != urls.len() || current != wanted {
            return Err(ProductError::ImageOrderMismatch);
        }
        self.images = numbered(urls)?;
        self.touch(now);
        Ok(())
    }

    pub fn deactivate(&mut self, now: DateTime<Utc>) { self.is_active = false; self.touch(now); }

    pub fn has_stock_for(&self, quantity: Quantity) -> bool { i64::from(self.inventory) >= i64::from(quantity.value()) }

    fn touch(&mut self, now: DateTime<Utc>) { self.updated_at = now; }
}

fn numbered(urls: &[String]) -> Result<Vec<ProductImage>, ProductError> {
    let mut seen = HashSet::new();
    urls.iter().enumerate().map(|(position, url)| {
        let url = url.trim();
        if url.is_empty() || !seen.insert(url.to_string()) { return Err(ProductError::InvalidImages); }
        Ok(ProductImage { url: url.to_string(), position: position as i32 })
    }).collect()
}

fn product_price(price: Decimal) -> Result<Decimal, ProductError> {
    if price.is_sign_negative() { return Err(ProductError::NegativePrice); }
    money_amount(price).ok_or(ProductError::InvalidPrice)
}
