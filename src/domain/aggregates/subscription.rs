//! Plans and the per-seller subscription ledger

use std::collections::HashSet;

use chrono::{DateTime, Months, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::exclusive::{raise_exclusive, sort_for_write, ExclusiveFlag};
use crate::domain::events::{DomainEvent, SubscriptionEvent};
use crate::domain::value_objects::money_amount;

pub const MAX_SUBSCRIPTION_MONTHS: u32 = 36;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub max_products: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewPlan {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    pub price: Decimal,
    #[validate(range(min = 0, message = "maxProducts cannot be negative"))]
    pub max_products: i32,
}

impl Plan {
    pub fn create(new: &NewPlan, now: DateTime<Utc>) -> Result<Self, SubscriptionError> {
        if new.price.is_sign_negative() { return Err(SubscriptionError::NegativePrice); }
        let price = money_amount(new.price).ok_or(SubscriptionError::InvalidPrice)?;
        Ok(Self { id: Uuid::now_v7(), name: new.name.trim().to_string(), price, max_products: new.max_products, is_active: true, created_at: now })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: Uuid,
    pub seller_id: Uuid,
    pub plan_id: Uuid,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Subscription {
    /// Active and not yet expired.
    pub fn is_current(&self, now: DateTime<Utc>) -> bool { self.is_active && self.start_date <= now && now < self.end_date }
}

impl ExclusiveFlag for Subscription {
    fn key(&self) -> Uuid { self.id }
    fn flagged(&self) -> bool { self.is_active }
    fn set_flagged(&mut self, on: bool, now: DateTime<Utc>) { self.is_active = on; self.updated_at = now; }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AssignSubscription {
    pub seller_id: Uuid,
    pub plan_id: Uuid,
    #[validate(range(min = 1, max = 36, message = "months must be between 1 and 36"))]
    pub months: u32,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub start_date: Option<DateTime<Utc>>,
}

fn default_true() -> bool { true }

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionPatch {
    pub plan_id: Option<Uuid>,
    pub end_date: Option<DateTime<Utc>>,
    #[validate(range(min = 1, max = 36, message = "extendMonths must be between 1 and 36"))]
    pub extend_months: Option<u32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone)]
pub enum SubscriptionCommand {
    Assign { plan: Plan, months: u32, is_active: bool, start_date: Option<DateTime<Utc>> },
    Update { id: Uuid, patch: SubscriptionPatch },
    Remove { id: Uuid },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubscriptionError {
    #[error("Subscription not found")]
    NotFound,
    #[error("Plan not found")]
    PlanNotFound,
    #[error("plan is not available for new subscriptions")]
    InactivePlan,
    #[error("duration must be between 1 and {MAX_SUBSCRIPTION_MONTHS} months, got {0}")]
    InvalidDuration(u32),
    #[error("endDate must be after startDate")]
    EndBeforeStart,
    #[error("price cannot be negative")]
    NegativePrice,
    #[error("price must have at most two decimal places and be below 1000000000000")]
    InvalidPrice,
}

/// All subscriptions of one seller; at most one is active.
#[derive(Debug)]
pub struct SubscriptionLedger {
    seller_id: Uuid,
    subscriptions: Vec<Subscription>,
    removed: Vec<Subscription>,
    dirty: HashSet<Uuid>,
    events: Vec<DomainEvent>,
}

impl SubscriptionLedger {
    pub fn load(seller_id: Uuid, rows: Vec<Subscription>) -> Self {
        let subscriptions = rows.into_iter().filter(|s| s.seller_id == seller_id).collect();
        Self { seller_id, subscriptions, removed: vec![], dirty: HashSet::new(), events: vec![] }
    }

    pub fn subscriptions(&self) -> &[Subscription] { &self.subscriptions }
    pub fn active(&self) -> Option<&Subscription> { self.subscriptions.iter().find(|s| s.is_active) }

    pub fn apply(&mut self, command: SubscriptionCommand, now: DateTime<Utc>) -> Result<Subscription, SubscriptionError> {
        match command {
            SubscriptionCommand::Assign { plan, months, is_active, start_date } => self.assign(&plan, months, is_active, start_date, now),
            SubscriptionCommand::Update { id, patch } => self.update(id, &patch, now),
            SubscriptionCommand::Remove { id } => self.remove(id),
        }
    }

    pub fn assign(&mut self, plan: &Plan, months: u32, is_active: bool, start_date: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Result<Subscription, SubscriptionError> {
        if !plan.is_active { return Err(SubscriptionError::InactivePlan); }
        let start_date = start_date.unwrap_or(now);
        let end_date = add_months(start_date, months)?;
        let subscription = Subscription {
            id: Uuid::now_v7(), seller_id: self.seller_id, plan_id: plan.id,
            start_date, end_date, is_active: false, created_at: now, updated_at: now,
        };
        let id = subscription.id;
        self.subscriptions.push(subscription);
        self.dirty.insert(id);
        if is_active { self.activate(id, now); }
        self.get(id)
    }

    pub fn update(&mut self, id: Uuid, patch: &SubscriptionPatch, now: DateTime<Utc>) -> Result<Subscription, SubscriptionError> {
        let subscription = self.subscriptions.iter_mut().find(|s| s.id == id).ok_or(SubscriptionError::NotFound)?;
        if let Some(plan_id) = patch.plan_id { subscription.plan_id = plan_id; }
        if let Some(end_date) = patch.end_date { subscription.end_date = end_date; }
        if let Some(months) = patch.extend_months { subscription.end_date = add_months(subscription.end_date, months)?; }
        if subscription.end_date <= subscription.start_date { return Err(SubscriptionError::EndBeforeStart); }
        subscription.updated_at = now;
        self.dirty.insert(id);
        match patch.is_active {
            Some(true) => self.activate(id, now),
            Some(false) => {
                if let Some(s) = self.subscriptions.iter_mut().find(|s| s.id == id) {
                    if s.is_active {
                        s.set_flagged(false, now);
                        self.events.push(DomainEvent::Subscription(SubscriptionEvent::Deactivated { subscription_id: id, seller_id: self.seller_id }));
                    }
                }
            }
            None => {}
        }
        self.get(id)
    }

    pub fn remove(&mut self, id: Uuid) -> Result<Subscription, SubscriptionError> {
        let index = self.subscriptions.iter().position(|s| s.id == id).ok_or(SubscriptionError::NotFound)?;
        let subscription = self.subscriptions.remove(index);
        self.dirty.remove(&id);
        self.removed.push(subscription.clone());
        self.events.push(DomainEvent::Subscription(SubscriptionEvent::Removed { subscription_id: id, seller_id: self.seller_id }));
        Ok(subscription)
    }

    /// Rows to upsert, deactivations first.
    pub fn changes(&self) -> Vec<Subscription> {
        let mut rows: Vec<Subscription> = self.subscriptions.iter().filter(|s| self.dirty.contains(&s.id)).cloned().collect();
        sort_for_write(&mut rows);
        rows
    }

    pub fn removed(&self) -> &[Subscription] { &self.removed }
    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }

    fn activate(&mut self, id: Uuid, now: DateTime<Utc>) {
        let changed = raise_exclusive(&mut self.subscriptions, id, now);
        if changed.contains(&id) {
            let deactivated = changed.len() - 1;
            self.events.push(DomainEvent::Subscription(SubscriptionEvent::Activated { subscription_id: id, seller_id: self.seller_id, deactivated }));
        }
        self.dirty.extend(changed);
    }

    fn get(&self, id: Uuid) -> Result<Subscription, SubscriptionError> {
        self.subscriptions.iter().find(|s| s.id == id).cloned().ok_or(SubscriptionError::NotFound)
    }
}

fn add_months(from: DateTime<Utc>, months: u32) -> Result<DateTime<Utc>, SubscriptionError> {
    if months == 0 || months > MAX_SUBSCRIPTION_MONTHS { return Err(SubscriptionError::InvalidDuration(months)); }
    from.checked_add_months(Months::new(months)).ok_or(SubscriptionError::InvalidDuration(months))
}
