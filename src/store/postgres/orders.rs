use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use uuid::Uuid;

use super::customers::{insert_customer_tx, update_customer_tx};
use super::PgStore;
use crate::domain::aggregates::{CustomerResolution, Order, OrderItem, OrderStatus, PaymentStatus};
use crate::store::{OrderStore, StoreError, StoreResult};

const ORDER_COLUMNS: &str =
    "id, order_number, customer_id, seller_id, total, status, payment_status, payment_method, shipping_address, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    order_number: String,
    customer_id: Uuid,
    seller_id: Uuid,
    total: Decimal,
    status: String,
    payment_status: String,
    payment_method: String,
    shipping_address: Json<serde_json::Value>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct ItemRow {
    id: Uuid,
    order_id: Uuid,
    product_id: Uuid,
    title: String,
    price: Decimal,
    quantity: i32,
    total_price: Decimal,
}

impl From<ItemRow> for OrderItem {
    fn from(r: ItemRow) -> Self {
        Self { id: r.id, order_id: r.order_id, product_id: r.product_id, title: r.title, price: r.price, quantity: r.quantity, total_price: r.total_price }
    }
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> StoreResult<Order> {
        let status = OrderStatus::parse(&self.status)
            .ok_or_else(|| StoreError::Corrupt(format!("order {} has status '{}'", self.id, self.status)))?;
        let payment_status = PaymentStatus::parse(&self.payment_status)
            .ok_or_else(|| StoreError::Corrupt(format!("order {} has payment status '{}'", self.id, self.payment_status)))?;
        Ok(Order {
            id: self.id, order_number: self.order_number, customer_id: self.customer_id, seller_id: self.seller_id,
            total: self.total, status, payment_status, payment_method: self.payment_method,
            shipping_address: self.shipping_address.0, items, created_at: self.created_at, updated_at: self.updated_at,
        })
    }
}

impl PgStore {
    async fn hydrate(&self, rows: Vec<OrderRow>) -> StoreResult<Vec<Order>> {
        if rows.is_empty() { return Ok(vec![]); }
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let items = sqlx::query_as::<_, ItemRow>(
            "SELECT id, order_id, product_id, title, price, quantity, total_price FROM order_items WHERE order_id = ANY($1) ORDER BY id",
        )
        .bind(&ids).fetch_all(&self.pool).await?;

        let mut by_order: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
        for item in items { by_order.entry(item.order_id).or_default().push(item.into()); }
        rows.into_iter()
            .map(|row| { let items = by_order.remove(&row.id).unwrap_or_default(); row.into_order(items) })
            .collect()
    }
}

#[async_trait]
impl OrderStore for PgStore {
    async fn place_order(&self, customer: &CustomerResolution, order: &Order) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        match customer {
            CustomerResolution::New(c) => insert_customer_tx(&mut tx, c).await?,
            CustomerResolution::Existing(c) => update_customer_tx(&mut tx, c).await?,
        }

        sqlx::query(
            "INSERT INTO orders (id, order_number, customer_id, seller_id, total, status, payment_status, payment_method, \
             shipping_address, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(order.id).bind(&order.order_number).bind(order.customer_id).bind(order.seller_id).bind(order.total)
        .bind(order.status.as_str()).bind(order.payment_status.as_str()).bind(&order.payment_method)
        .bind(Json(&order.shipping_address)).bind(order.created_at).bind(order.updated_at)
        .execute(&mut *tx).await?;

        for item in &order.items {
            sqlx::query(
                "INSERT INTO order_items (id, order_id, product_id, title, price, quantity, total_price) VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(item.id).bind(item.order_id).bind(item.product_id).bind(&item.title).bind(item.price)
            .bind(item.quantity).bind(item.total_price)
            .execute(&mut *tx).await?;

            let decremented = sqlx::query(
                "UPDATE products SET inventory = inventory - $2, updated_at = $3 WHERE id = $1 AND inventory >= $2",
            )
            .bind(item.product_id).bind(item.quantity).bind(order.created_at)
            .execute(&mut *tx).await?;
            if decremented.rows_affected() == 0 {
                return Err(StoreError::InsufficientInventory(item.product_id));
            }
        }
        tx.commit().await?;
        Ok(())
    }

    async fn order(&self, id: Uuid) -> StoreResult<Option<Order>> {
        let row = sqlx::query_as::<_, OrderRow>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(id).fetch_optional(&self.pool).await?;
        match row {
            Some(row) => Ok(self.hydrate(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn seller_orders(&self, seller_id: Uuid) -> StoreResult<Vec<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE seller_id = $1 ORDER BY created_at DESC"
        ))
        .bind(seller_id).fetch_all(&self.pool).await?;
        self.hydrate(rows).await
    }

    async fn customer_orders(&self, customer_id: Uuid) -> StoreResult<Vec<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE customer_id = $1 ORDER BY created_at DESC"
        ))
        .bind(customer_id).fetch_all(&self.pool).await?;
        self.hydrate(rows).await
    }

    async fn update_order_status(&self, order: &Order) -> StoreResult<()> {
        let result = sqlx::query("UPDATE orders SET status = $2, payment_status = $3, updated_at = $4 WHERE id = $1")
            .bind(order.id).bind(order.status.as_str()).bind(order.payment_status.as_str()).bind(order.updated_at)
            .execute(&self.pool).await?;
        if result.rows_affected() == 0 { return Err(StoreError::NotFound("Order")); }
        Ok(())
    }
}
