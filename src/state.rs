use std::sync::Arc;

use crate::auth::{AuthResolver, JwtKeys};
use crate::cart::CartService;
use crate::store::Stores;

#[derive(Clone)]
pub struct AppState {
    pub stores: Stores,
    pub carts: CartService,
    pub auth: Arc<AuthResolver>,
    pub data_deletion_status_url: Arc<str>,
}

impl AppState {
    pub fn new(stores: Stores, auth: AuthResolver, data_deletion_status_url: &str) -> Self {
        let carts = CartService::new(stores.carts.clone(), stores.products.clone());
        Self { stores, carts, auth: Arc::new(auth), data_deletion_status_url: Arc::from(data_deletion_status_url) }
    }

    /// In-memory stores with default cookie name and token lifetime.
    pub fn in_memory(secret: &[u8]) -> Self {
        let auth = AuthResolver::new(JwtKeys::new(secret, 24), "session-token");
        Self::new(Stores::in_memory(), auth, "http://localhost:8083/data-deletion/status")
    }
}
