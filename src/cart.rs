//! Cart service
//!
//! Carts are keyed by an opaque session key and persisted through whatever
//! [`CartStorage`] the service is built with. Lines always take their title
//! and price from the catalog at the time they are added.

use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use crate::domain::aggregates::{Cart, CartError, CartItem};
use crate::store::{CartStorage, ProductStore, StoreError};

#[derive(Debug, Error)]
pub enum CartServiceError {
    #[error(transparent)]
    Cart(#[from] CartError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type CartResult<T> = Result<T, CartServiceError>;

#[derive(Clone)]
pub struct CartService {
    storage: Arc<dyn CartStorage>,
    products: Arc<dyn ProductStore>,
}

impl CartService {
    pub fn new(storage: Arc<dyn CartStorage>, products: Arc<dyn ProductStore>) -> Self { Self { storage, products } }

    /// Empty cart when nothing is stored under `key`.
    pub async fn get_cart(&self, key: &str) -> CartResult<Cart> {
        Ok(self.storage.load(key).await?.unwrap_or_default())
    }

    #[tracing::instrument(skip(self))]
    pub async fn add_item(&self, key: &str, product_id: Uuid, quantity: u32) -> CartResult<Cart> {
        if quantity == 0 { return Err(CartError::InvalidQuantity.into()); }
        let product = self.products.product(product_id).await?
            .filter(|p| p.is_active)
            .ok_or(CartError::ProductNotFound)?;
        let mut cart = self.get_cart(key).await?;
        cart.add_item(CartItem { product_id, seller_id: product.seller_id, title: product.title, price: product.price, quantity })?;
        self.storage.save(key, &cart).await?;
        Ok(cart)
    }

    pub async fn update_quantity(&self, key: &str, product_id: Uuid, quantity: u32) -> CartResult<Cart> {
        let mut cart = self.get_cart(key).await?;
        cart.update_quantity(product_id, quantity)?;
        self.storage.save(key, &cart).await?;
        Ok(cart)
    }

    pub async fn remove_item(&self, key: &str, product_id: Uuid) -> CartResult<Cart> {
        let mut cart = self.get_cart(key).await?;
        cart.remove_item(product_id)?;
        self.storage.save(key, &cart).await?;
        Ok(cart)
    }

    pub async fn clear(&self, key: &str) -> CartResult<()> {
        self.storage.remove(key).await?;
        Ok(())
    }
}
