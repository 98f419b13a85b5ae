use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use uuid::Uuid;

use super::PgStore;
use crate::domain::aggregates::{Product, ProductImage};
use crate::store::{ProductStore, StoreError, StoreResult};

const PRODUCT_COLUMNS: &str =
    "id, seller_id, shop_id, title, description, price, inventory, is_active, images, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: Uuid,
    seller_id: Uuid,
    shop_id: Uuid,
    title: String,
    description: Option<String>,
    price: Decimal,
    inventory: i32,
    is_active: bool,
    images: Json<Vec<ProductImage>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(r: ProductRow) -> Self {
        Self {
            id: r.id, seller_id: r.seller_id, shop_id: r.shop_id, title: r.title, description: r.description,
            price: r.price, inventory: r.inventory, is_active: r.is_active, images: r.images.0,
            created_at: r.created_at, updated_at: r.updated_at,
        }
    }
}

#[async_trait]
impl ProductStore for PgStore {
    async fn insert_product(&self, p: &Product) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO products (id, seller_id, shop_id, title, description, price, inventory, is_active, images, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(p.id).bind(p.seller_id).bind(p.shop_id).bind(&p.title).bind(&p.description).bind(p.price)
        .bind(p.inventory).bind(p.is_active).bind(Json(&p.images)).bind(p.created_at).bind(p.updated_at)
        .execute(&self.pool).await?;
        Ok(())
    }

    async fn update_product(&self, p: &Product) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE products SET shop_id = $2, title = $3, description = $4, price = $5, inventory = $6, \
             is_active = $7, images = $8, updated_at = $9 WHERE id = $1",
        )
        .bind(p.id).bind(p.shop_id).bind(&p.title).bind(&p.description).bind(p.price).bind(p.inventory)
        .bind(p.is_active).bind(Json(&p.images)).bind(p.updated_at)
        .execute(&self.pool).await?;
        if result.rows_affected() == 0 { return Err(StoreError::NotFound("Product")); }
        Ok(())
    }

    async fn product(&self, id: Uuid) -> StoreResult<Option<Product>> {
        let row = sqlx::query_as::<_, ProductRow>(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"))
            .bind(id).fetch_optional(&self.pool).await?;
        Ok(row.map(Product::from))
    }

    async fn products_by_ids(&self, ids: &[Uuid]) -> StoreResult<Vec<Product>> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ANY($1)"))
            .bind(ids).fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Product::from).collect())
    }

    async fn seller_products(&self, seller_id: Uuid) -> StoreResult<Vec<Product>> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE seller_id = $1 ORDER BY created_at DESC"
        ))
        .bind(seller_id).fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Product::from).collect())
    }

    async fn count_active_products(&self, seller_id: Uuid) -> StoreResult<i64> {
        Ok(sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM products WHERE seller_id = $1 AND is_active")
            .bind(seller_id).fetch_one(&self.pool).await?)
    }
}
