//! PostgreSQL backend.
//!
//! Rule-bearing commands lock the owning row (`sellers` or `customers`)
//! with `SELECT ... FOR UPDATE`, load the owner's aggregate, apply the command
//! in memory and write back the changed rows, all inside one transaction.
//! Partial unique indexes in the schema back the same invariants.

mod carts;
mod customers;
mod orders;
mod products;
mod sellers;
mod subscriptions;

use sqlx::error::DatabaseError;
use sqlx::PgPool;

use super::StoreError;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self { Self { pool } }
}

const UNDEFINED_TABLE: &str = "42P01";
const UNDEFINED_COLUMN: &str = "42703";

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            if db.is_unique_violation() { return Self::Duplicate(duplicate_message(&**db)); }
            if db.is_foreign_key_violation() { return Self::MissingReference(reference_message(&**db)); }
            if matches!(db.code().as_deref(), Some(UNDEFINED_TABLE) | Some(UNDEFINED_COLUMN)) {
                return Self::SchemaMismatch(db.message().to_string());
            }
        }
        Self::Database(err)
    }
}

fn duplicate_message(db: &dyn DatabaseError) -> String {
    match db.constraint() {
        Some("customers_email_key") => "A customer with this email already exists",
        Some("customers_mobile_key") => "A customer with this mobile number already exists",
        Some("sellers_username_key") => "A seller with this username already exists",
        Some("sellers_email_key") => "A seller with this email already exists",
        Some("orders_order_number_key") => "Order number collision; please retry",
        Some("shops_one_default_per_seller" | "subscriptions_one_active_per_seller" | "customer_addresses_one_default") =>
            "A concurrent update changed this record; please retry",
        _ => "Unique constraint failed",
    }
    .to_string()
}

fn reference_message(db: &dyn DatabaseError) -> String {
    match db.constraint() {
        Some(constraint) => format!("Foreign key constraint failed ({constraint}): a referenced record does not exist"),
        None => "Foreign key constraint failed: a referenced record does not exist".to_string(),
    }
}
