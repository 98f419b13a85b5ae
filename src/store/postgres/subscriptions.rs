use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::PgStore;
use crate::domain::aggregates::{Plan, Subscription, SubscriptionCommand, SubscriptionLedger};
use crate::store::{Applied, StoreError, StoreResult, SubscriptionStore};

const PLAN_COLUMNS: &str = "id, name, price, max_products, is_active, created_at";
const SUBSCRIPTION_COLUMNS: &str = "id, seller_id, plan_id, start_date, end_date, is_active, created_at, updated_at";

#[async_trait]
impl SubscriptionStore for PgStore {
    async fn insert_plan(&self, plan: &Plan) -> StoreResult<()> {
        sqlx::query("INSERT INTO plans (id, name, price, max_products, is_active, created_at) VALUES ($1, $2, $3, $4, $5, $6)")
            .bind(plan.id).bind(&plan.name).bind(plan.price).bind(plan.max_products).bind(plan.is_active).bind(plan.created_at)
            .execute(&self.pool).await?;
        Ok(())
    }

    async fn plan(&self, id: Uuid) -> StoreResult<Option<Plan>> {
        Ok(sqlx::query_as::<_, Plan>(&format!("SELECT {PLAN_COLUMNS} FROM plans WHERE id = $1"))
            .bind(id).fetch_optional(&self.pool).await?)
    }

    async fn plans(&self) -> StoreResult<Vec<Plan>> {
        Ok(sqlx::query_as::<_, Plan>(&format!("SELECT {PLAN_COLUMNS} FROM plans ORDER BY price, name"))
            .fetch_all(&self.pool).await?)
    }

    async fn subscription(&self, id: Uuid) -> StoreResult<Option<Subscription>> {
        Ok(sqlx::query_as::<_, Subscription>(&format!("SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions WHERE id = $1"))
            .bind(id).fetch_optional(&self.pool).await?)
    }

    async fn subscriptions(&self, seller_id: Option<Uuid>) -> StoreResult<Vec<Subscription>> {
        Ok(sqlx::query_as::<_, Subscription>(&format!(
            "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions WHERE ($1::uuid IS NULL OR seller_id = $1) ORDER BY created_at DESC"
        ))
        .bind(seller_id).fetch_all(&self.pool).await?)
    }

    async fn apply_subscription_command(&self, seller_id: Uuid, command: SubscriptionCommand, now: DateTime<Utc>) -> StoreResult<Applied<Subscription>> {
        let mut tx = self.pool.begin().await?;
        sqlx::query_scalar::<_, Uuid>("SELECT id FROM sellers WHERE id = $1 FOR UPDATE")
            .bind(seller_id).fetch_optional(&mut *tx).await?
            .ok_or(StoreError::NotFound("Seller"))?;
        let current = sqlx::query_as::<_, Subscription>(&format!(
            "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions WHERE seller_id = $1 ORDER BY created_at, id"
        ))
        .bind(seller_id).fetch_all(&mut *tx).await?;

        let mut ledger = SubscriptionLedger::load(seller_id, current);
        let subscription = ledger.apply(command, now)?;
        for removed in ledger.removed() {
            sqlx::query("DELETE FROM subscriptions WHERE id = $1").bind(removed.id).execute(&mut *tx).await?;
        }
        for row in ledger.changes() {
            sqlx::query(
                "INSERT INTO subscriptions (id, seller_id, plan_id, start_date, end_date, is_active, created_at, updated_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
                 ON CONFLICT (id) DO UPDATE SET plan_id = EXCLUDED.plan_id, end_date = EXCLUDED.end_date, \
                 is_active = EXCLUDED.is_active, updated_at = EXCLUDED.updated_at",
            )
            .bind(row.id).bind(row.seller_id).bind(row.plan_id).bind(row.start_date).bind(row.end_date)
            .bind(row.is_active).bind(row.created_at).bind(row.updated_at)
            .execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(Applied::new(subscription, ledger.take_events()))
    }
}
