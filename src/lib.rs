//! Shopgram Commerce Service
//!
//! Multi-tenant commerce backend for social-shop sellers.
//!
//! ## Features
//! - Seller accounts, shops and plan subscriptions
//! - Seller-scoped product catalog with plan quotas
//! - Checkout with server-side pricing and inventory decrement
//! - Customer address book
//! - Session carts
//! - Platform data-deletion callback

pub mod api;
pub mod auth;
pub mod cart;
pub mod config;
pub mod domain;
pub mod error;
pub mod state;
pub mod store;

pub use api::router;
pub use config::AppConfig;
pub use error::{ApiError, ApiResult};
pub use state::AppState;
