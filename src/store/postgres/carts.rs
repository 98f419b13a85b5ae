use async_trait::async_trait;
use sqlx::types::Json;

use super::PgStore;
use crate::domain::aggregates::Cart;
use crate::store::{CartStorage, StoreResult};

#[async_trait]
impl CartStorage for PgStore {
    async fn load(&self, key: &str) -> StoreResult<Option<Cart>> {
        let payload = sqlx::query_scalar::<_, Json<Cart>>("SELECT payload FROM carts WHERE session_key = $1")
            .bind(key).fetch_optional(&self.pool).await?;
        Ok(payload.map(|p| p.0))
    }

    async fn save(&self, key: &str, cart: &Cart) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO carts (session_key, payload, updated_at) VALUES ($1, $2, $3) \
             ON CONFLICT (session_key) DO UPDATE SET payload = EXCLUDED.payload, updated_at = EXCLUDED.updated_at",
        )
        .bind(key).bind(Json(cart)).bind(cart.updated_at())
        .execute(&self.pool).await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> StoreResult<()> {
        sqlx::query("DELETE FROM carts WHERE session_key = $1").bind(key).execute(&self.pool).await?;
        Ok(())
    }
}
