//! Persistence seams.
//!
//! Handlers talk to these traits only. [`postgres::PgStore`] is the production
//! backend; [`memory::MemoryStore`] backs the test suite. Every command that
//! touches a "single default" or "single active" rule is applied to the
//! owner's aggregate inside one unit of work, so both backends share the
//! rules in `domain::aggregates` and differ only in how they lock and write.

pub mod memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::aggregates::{
    AddressCommand, AddressError, Cart, Customer, CustomerAddress, CustomerResolution, Order, Plan, Product, Seller, Shop,
    ShopCommand, ShopError, Subscription, SubscriptionCommand, SubscriptionError,
};
use crate::domain::events::DomainEvent;
use crate::domain::value_objects::{Email, Mobile};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Duplicate(String),
    #[error("{0}")]
    MissingReference(String),
    #[error("Insufficient inventory for product {0}")]
    InsufficientInventory(Uuid),
    #[error("database schema does not match the application: {0}")]
    SchemaMismatch(String),
    #[error("stored data is corrupt: {0}")]
    Corrupt(String),
    #[error(transparent)]
    Address(#[from] AddressError),
    #[error(transparent)]
    Shop(#[from] ShopError),
    #[error(transparent)]
    Subscription(#[from] SubscriptionError),
    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Result of a command together with the domain events it raised.
#[derive(Debug, Clone)]
pub struct Applied<T> {
    pub value: T,
    pub events: Vec<DomainEvent>,
}

impl<T> Applied<T> {
    pub fn new(value: T, events: Vec<DomainEvent>) -> Self { Self { value, events } }
}

#[async_trait]
pub trait SellerStore: Send + Sync {
    async fn insert_seller(&self, seller: &Seller) -> StoreResult<()>;
    async fn update_seller(&self, seller: &Seller) -> StoreResult<()>;
    async fn seller(&self, id: Uuid) -> StoreResult<Option<Seller>>;
    async fn seller_by_username(&self, username: &str) -> StoreResult<Option<Seller>>;
    async fn sellers(&self) -> StoreResult<Vec<Seller>>;
    /// Shops in creation order.
    async fn shops(&self, seller_id: Uuid) -> StoreResult<Vec<Shop>>;
    async fn apply_shop_command(&self, seller_id: Uuid, command: ShopCommand, now: DateTime<Utc>) -> StoreResult<Applied<Shop>>;
}

#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    async fn insert_plan(&self, plan: &Plan) -> StoreResult<()>;
    async fn plan(&self, id: Uuid) -> StoreResult<Option<Plan>>;
    async fn plans(&self) -> StoreResult<Vec<Plan>>;
    async fn subscription(&self, id: Uuid) -> StoreResult<Option<Subscription>>;
    /// Newest first; all sellers when `seller_id` is `None`.
    async fn subscriptions(&self, seller_id: Option<Uuid>) -> StoreResult<Vec<Subscription>>;
    async fn apply_subscription_command(&self, seller_id: Uuid, command: SubscriptionCommand, now: DateTime<Utc>) -> StoreResult<Applied<Subscription>>;
}

#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn insert_product(&self, product: &Product) -> StoreResult<()>;
    async fn update_product(&self, product: &Product) -> StoreResult<()>;
    async fn product(&self, id: Uuid) -> StoreResult<Option<Product>>;
    async fn products_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<Product>>;
    /// Newest first, including deactivated products.
    async fn seller_products(&self, seller_id: Uuid) -> StoreResult<Vec<Product>>;
    async fn count_active_products(&self, seller_id: Uuid) -> StoreResult<i64>;
}

#[async_trait]
pub trait CustomerStore: Send + Sync {
    async fn insert_customer(&self, customer: &Customer) -> StoreResult<()>;
    async fn customer(&self, id: Uuid) -> StoreResult<Option<Customer>>;
    /// Live customer holding the email, else the mobile.
    async fn customer_by_contact(&self, email: Option<&Email>, mobile: Option<&Mobile>) -> StoreResult<Option<Customer>>;
    /// Live addresses, default first, then creation order.
    async fn addresses(&self, customer_id: Uuid) -> StoreResult<Vec<CustomerAddress>>;
    async fn apply_address_command(&self, customer_id: Uuid, command: AddressCommand, now: DateTime<Utc>) -> StoreResult<Applied<CustomerAddress>>;
    /// Anonymizes every customer matching either contact and soft-deletes their addresses.
    async fn anonymize_customers(&self, email: Option<&Email>, mobile: Option<&Mobile>, now: DateTime<Utc>) -> StoreResult<Applied<Vec<Uuid>>>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Writes customer, order, items and inventory decrements atomically.
    async fn place_order(&self, customer: &CustomerResolution, order: &Order) -> StoreResult<()>;
    async fn order(&self, id: Uuid) -> StoreResult<Option<Order>>;
    async fn seller_orders(&self, seller_id: Uuid) -> StoreResult<Vec<Order>>;
    async fn customer_orders(&self, customer_id: Uuid) -> StoreResult<Vec<Order>>;
    async fn update_order_status(&self, order: &Order) -> StoreResult<()>;
}

/// Where carts live between requests.
#[async_trait]
pub trait CartStorage: Send + Sync {
    async fn load(&self, key: &str) -> StoreResult<Option<Cart>>;
    async fn save(&self, key: &str, cart: &Cart) -> StoreResult<()>;
    async fn remove(&self, key: &str) -> StoreResult<()>;
}

#[derive(Clone)]
pub struct Stores {
    pub sellers: Arc<dyn SellerStore>,
    pub subscriptions: Arc<dyn SubscriptionStore>,
    pub products: Arc<dyn ProductStore>,
    pub customers: Arc<dyn CustomerStore>,
    pub orders: Arc<dyn OrderStore>,
    pub carts: Arc<dyn CartStorage>,
}

impl Stores {
    pub fn postgres(pool: sqlx::PgPool) -> Self { Self::from_backend(Arc::new(postgres::PgStore::new(pool))) }

    pub fn in_memory() -> Self { Self::from_backend(Arc::new(memory::MemoryStore::default())) }

    fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: SellerStore + SubscriptionStore + ProductStore + CustomerStore + OrderStore + CartStorage + 'static,
    {
        Self {
            sellers: backend.clone(),
            subscriptions: backend.clone(),
            products: backend.clone(),
            customers: backend.clone(),
            orders: backend.clone(),
            carts: backend,
        }
    }
}
