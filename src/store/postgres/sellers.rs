use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::PgStore;
use crate::domain::aggregates::{Seller, Shop, ShopCommand, ShopRoster};
use crate::store::{Applied, SellerStore, StoreError, StoreResult};

const SELLER_COLUMNS: &str = "id, username, email, password_hash, is_active, created_at, updated_at";
const SHOP_COLUMNS: &str = "id, seller_id, shop_name, is_default, is_active, created_at, updated_at";

#[async_trait]
impl SellerStore for PgStore {
    async fn insert_seller(&self, seller: &Seller) -> StoreResult<()> {
        sqlx::query("INSERT INTO sellers (id, username, email, password_hash, is_active, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7)")
            .bind(seller.id).bind(&seller.username).bind(&seller.email).bind(&seller.password_hash)
            .bind(seller.is_active).bind(seller.created_at).bind(seller.updated_at)
            .execute(&self.pool).await?;
        Ok(())
    }

    async fn update_seller(&self, seller: &Seller) -> StoreResult<()> {
        let result = sqlx::query("UPDATE sellers SET username = $2, email = $3, is_active = $4, updated_at = $5 WHERE id = $1")
            .bind(seller.id).bind(&seller.username).bind(&seller.email).bind(seller.is_active).bind(seller.updated_at)
            .execute(&self.pool).await?;
        if result.rows_affected() == 0 { return Err(StoreError::NotFound("Seller")); }
        Ok(())
    }

    async fn seller(&self, id: Uuid) -> StoreResult<Option<Seller>> {
        Ok(sqlx::query_as::<_, Seller>(&format!("SELECT {SELLER_COLUMNS} FROM sellers WHERE id = $1"))
            .bind(id).fetch_optional(&self.pool).await?)
    }

    async fn seller_by_username(&self, username: &str) -> StoreResult<Option<Seller>> {
        Ok(sqlx::query_as::<_, Seller>(&format!("SELECT {SELLER_COLUMNS} FROM sellers WHERE username = $1"))
            .bind(username.trim().to_lowercase()).fetch_optional(&self.pool).await?)
    }

    async fn sellers(&self) -> StoreResult<Vec<Seller>> {
        Ok(sqlx::query_as::<_, Seller>(&format!("SELECT {SELLER_COLUMNS} FROM sellers ORDER BY created_at DESC"))
            .fetch_all(&self.pool).await?)
    }

    async fn shops(&self, seller_id: Uuid) -> StoreResult<Vec<Shop>> {
        Ok(sqlx::query_as::<_, Shop>(&format!("SELECT {SHOP_COLUMNS} FROM shops WHERE seller_id = $1 ORDER BY created_at, id"))
            .bind(seller_id).fetch_all(&self.pool).await?)
    }

    async fn apply_shop_command(&self, seller_id: Uuid, command: ShopCommand, now: DateTime<Utc>) -> StoreResult<Applied<Shop>> {
        let mut tx = self.pool.begin().await?;
        sqlx::query_scalar::<_, Uuid>("SELECT id FROM sellers WHERE id = $1 FOR UPDATE")
            .bind(seller_id).fetch_optional(&mut *tx).await?
            .ok_or(StoreError::NotFound("Seller"))?;
        let current = sqlx::query_as::<_, Shop>(&format!("SELECT {SHOP_COLUMNS} FROM shops WHERE seller_id = $1 ORDER BY created_at, id"))
            .bind(seller_id).fetch_all(&mut *tx).await?;

        let mut roster = ShopRoster::load(seller_id, current);
        let shop = roster.apply(command, now)?;
        for row in roster.changes() {
            sqlx::query(
                "INSERT INTO shops (id, seller_id, shop_name, is_default, is_active, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7) \
                 ON CONFLICT (id) DO UPDATE SET shop_name = EXCLUDED.shop_name, is_default = EXCLUDED.is_default, \
                 is_active = EXCLUDED.is_active, updated_at = EXCLUDED.updated_at",
            )
            .bind(row.id).bind(row.seller_id).bind(&row.shop_name).bind(row.is_default).bind(row.is_active)
            .bind(row.created_at).bind(row.updated_at)
            .execute(&mut *tx).await?;
        }
        tx.commit().await?;
        tracing::debug!(%seller_id, shop_id = %shop.id, "shop roster updated");
        Ok(Applied::new(shop, roster.take_events()))
    }
}
