use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use super::PgStore;
use crate::domain::aggregates::{AddressBook, AddressCommand, Customer, CustomerAddress};
use crate::domain::value_objects::{Email, Mobile};
use crate::store::{Applied, CustomerStore, StoreError, StoreResult};

const CUSTOMER_COLUMNS: &str = "id, full_name, email, mobile, created_at, updated_at, anonymized_at";
const ADDRESS_COLUMNS: &str =
    "id, customer_id, full_name, mobile, address, city, province, postal_code, is_default, created_at, updated_at, deleted_at";

pub(super) async fn insert_customer_tx(tx: &mut Transaction<'_, Postgres>, c: &Customer) -> StoreResult<()> {
    sqlx::query("INSERT INTO customers (id, full_name, email, mobile, created_at, updated_at, anonymized_at) VALUES ($1, $2, $3, $4, $5, $6, $7)")
        .bind(c.id).bind(&c.full_name).bind(&c.email).bind(&c.mobile).bind(c.created_at).bind(c.updated_at).bind(c.anonymized_at)
        .execute(&mut **tx).await?;
    Ok(())
}

pub(super) async fn update_customer_tx(tx: &mut Transaction<'_, Postgres>, c: &Customer) -> StoreResult<()> {
    let result = sqlx::query("UPDATE customers SET full_name = $2, email = $3, mobile = $4, updated_at = $5, anonymized_at = $6 WHERE id = $1")
        .bind(c.id).bind(&c.full_name).bind(&c.email).bind(&c.mobile).bind(c.updated_at).bind(c.anonymized_at)
        .execute(&mut **tx).await?;
    if result.rows_affected() == 0 { return Err(StoreError::NotFound("Customer")); }
    Ok(())
}

#[async_trait]
impl CustomerStore for PgStore {
    async fn insert_customer(&self, customer: &Customer) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        insert_customer_tx(&mut tx, customer).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn customer(&self, id: Uuid) -> StoreResult<Option<Customer>> {
        Ok(sqlx::query_as::<_, Customer>(&format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = $1"))
            .bind(id).fetch_optional(&self.pool).await?)
    }

    async fn customer_by_contact(&self, email: Option<&Email>, mobile: Option<&Mobile>) -> StoreResult<Option<Customer>> {
        if email.is_none() && mobile.is_none() { return Ok(None); }
        Ok(sqlx::query_as::<_, Customer>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE email = $1 OR mobile = $2 \
             ORDER BY (email IS NOT DISTINCT FROM $1) DESC, created_at LIMIT 1"
        ))
        .bind(email.map(Email::as_str)).bind(mobile.map(Mobile::as_str))
        .fetch_optional(&self.pool).await?)
    }

    async fn addresses(&self, customer_id: Uuid) -> StoreResult<Vec<CustomerAddress>> {
        Ok(sqlx::query_as::<_, CustomerAddress>(&format!(
            "SELECT {ADDRESS_COLUMNS} FROM customer_addresses WHERE customer_id = $1 AND deleted_at IS NULL \
             ORDER BY is_default DESC, created_at, id"
        ))
        .bind(customer_id).fetch_all(&self.pool).await?)
    }

    async fn apply_address_command(&self, customer_id: Uuid, command: AddressCommand, now: DateTime<Utc>) -> StoreResult<Applied<CustomerAddress>> {
        let mut tx = self.pool.begin().await?;
        sqlx::query_scalar::<_, Uuid>("SELECT id FROM customers WHERE id = $1 FOR UPDATE")
            .bind(customer_id).fetch_optional(&mut *tx).await?
            .ok_or(StoreError::NotFound("Customer"))?;
        let current = sqlx::query_as::<_, CustomerAddress>(&format!(
            "SELECT {ADDRESS_COLUMNS} FROM customer_addresses WHERE customer_id = $1 AND deleted_at IS NULL ORDER BY created_at, id"
        ))
        .bind(customer_id).fetch_all(&mut *tx).await?;

        let mut book = AddressBook::load(customer_id, current);
        let address = book.apply(command, now)?;
        for row in book.changes() {
            sqlx::query(
                "INSERT INTO customer_addresses (id, customer_id, full_name, mobile, address, city, province, postal_code, \
                 is_default, created_at, updated_at, deleted_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
                 ON CONFLICT (id) DO UPDATE SET full_name = EXCLUDED.full_name, mobile = EXCLUDED.mobile, address = EXCLUDED.address, \
                 city = EXCLUDED.city, province = EXCLUDED.province, postal_code = EXCLUDED.postal_code, \
                 is_default = EXCLUDED.is_default, updated_at = EXCLUDED.updated_at, deleted_at = EXCLUDED.deleted_at",
            )
            .bind(row.id).bind(row.customer_id).bind(&row.full_name).bind(&row.mobile).bind(&row.address)
            .bind(&row.city).bind(&row.province).bind(&row.postal_code).bind(row.is_default)
            .bind(row.created_at).bind(row.updated_at).bind(row.deleted_at)
            .execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(Applied::new(address, book.take_events()))
    }

    async fn anonymize_customers(&self, email: Option<&Email>, mobile: Option<&Mobile>, now: DateTime<Utc>) -> StoreResult<Applied<Vec<Uuid>>> {
        let mut tx = self.pool.begin().await?;
        let matched = sqlx::query_as::<_, Customer>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE ($1::text IS NOT NULL AND email = $1) OR ($2::text IS NOT NULL AND mobile = $2) FOR UPDATE"
        ))
        .bind(email.map(Email::as_str)).bind(mobile.map(Mobile::as_str))
        .fetch_all(&mut *tx).await?;

        let mut ids = Vec::with_capacity(matched.len());
        let mut events = Vec::with_capacity(matched.len());
        for mut customer in matched {
            events.push(customer.anonymize(now));
            update_customer_tx(&mut tx, &customer).await?;
            ids.push(customer.id);
        }
        if !ids.is_empty() {
            sqlx::query(
                "UPDATE customer_addresses SET is_default = FALSE, deleted_at = $2, updated_at = $2 \
                 WHERE customer_id = ANY($1) AND deleted_at IS NULL",
            )
            .bind(&ids).bind(now)
            .execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(Applied::new(ids, events))
    }
}
