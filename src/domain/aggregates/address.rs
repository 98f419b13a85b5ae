//! Customer address book
//!
//! Holds the live (non-deleted) addresses of one customer in creation order.
//! Every mutation keeps the single-default rule: at most one live address is
//! default, the first address is always default, and removing the default
//! promotes the first remaining address.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::exclusive::{raise_exclusive, sort_for_write, ExclusiveFlag};
use crate::domain::events::{AddressEvent, DomainEvent};
use crate::domain::value_objects::{ContactError, Mobile};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CustomerAddress {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub full_name: String,
    pub mobile: String,
    pub address: String,
    pub city: String,
    pub province: String,
    pub postal_code: String,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl ExclusiveFlag for CustomerAddress {
    fn key(&self) -> Uuid { self.id }
    fn flagged(&self) -> bool { self.is_default }
    fn set_flagged(&mut self, on: bool, now: DateTime<Utc>) { self.is_default = on; self.updated_at = now; }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewAddress {
    #[validate(length(max = 120))]
    pub full_name: String,
    pub mobile: String,
    #[validate(length(max = 500))]
    pub address: String,
    #[validate(length(max = 80))]
    pub city: String,
    #[validate(length(max = 80))]
    pub province: String,
    #[validate(length(max = 20))]
    pub postal_code: String,
    #[serde(default)]
    pub is_default: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddressPatch {
    #[validate(length(max = 120))]
    pub full_name: Option<String>,
    pub mobile: Option<String>,
    #[validate(length(max = 500))]
    pub address: Option<String>,
    #[validate(length(max = 80))]
    pub city: Option<String>,
    #[validate(length(max = 80))]
    pub province: Option<String>,
    #[validate(length(max = 20))]
    pub postal_code: Option<String>,
    pub is_default: Option<bool>,
}

#[derive(Debug, Clone)]
pub enum AddressCommand {
    Create(NewAddress),
    Update { id: Uuid, patch: AddressPatch },
    Delete { id: Uuid },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    #[error("Address not found")]
    NotFound,
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error(transparent)]
    Contact(#[from] ContactError),
}

#[derive(Debug)]
pub struct AddressBook {
    customer_id: Uuid,
    addresses: Vec<CustomerAddress>,
    removed: Vec<CustomerAddress>,
    dirty: HashSet<Uuid>,
    events: Vec<DomainEvent>,
}

impl AddressBook {
    /// Rows are expected in creation order; deleted and foreign rows are dropped.
    pub fn load(customer_id: Uuid, rows: Vec<CustomerAddress>) -> Self {
        let addresses = rows.into_iter().filter(|a| a.customer_id == customer_id && a.deleted_at.is_none()).collect();
        Self { customer_id, addresses, removed: vec![], dirty: HashSet::new(), events: vec![] }
    }

    pub fn customer_id(&self) -> Uuid { self.customer_id }
    pub fn addresses(&self) -> &[CustomerAddress] { &self.addresses }
    pub fn default_address(&self) -> Option<&CustomerAddress> { self.addresses.iter().find(|a| a.is_default) }

    pub fn apply(&mut self, command: AddressCommand, now: DateTime<Utc>) -> Result<CustomerAddress, AddressError> {
        match command {
            AddressCommand::Create(new) => self.create(new, now),
            AddressCommand::Update { id, patch } => self.update(id, patch, now),
            AddressCommand::Delete { id } => self.delete(id, now),
        }
    }

    pub fn create(&mut self, new: NewAddress, now: DateTime<Utc>) -> Result<CustomerAddress, AddressError> {
        let address = CustomerAddress {
            id: Uuid::now_v7(),
            customer_id: self.customer_id,
            full_name: required("fullName", &new.full_name)?,
            mobile: Mobile::parse(&new.mobile)?.into_inner(),
            address: required("address", &new.address)?,
            city: required("city", &new.city)?,
            province: required("province", &new.province)?,
            postal_code: required("postalCode", &new.postal_code)?,
            is_default: false,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        let id = address.id;
        let make_default = new.is_default || self.addresses.is_empty();
        self.addresses.push(address);
        self.dirty.insert(id);
        if make_default { self.make_default(id, now); }
        self.get(id)
    }

    pub fn update(&mut self, id: Uuid, patch: AddressPatch, now: DateTime<Utc>) -> Result<CustomerAddress, AddressError> {
        let mobile = patch.mobile.as_deref().map(Mobile::parse).transpose()?;
        let address = self.addresses.iter_mut().find(|a| a.id == id).ok_or(AddressError::NotFound)?;
        if let Some(v) = &patch.full_name { address.full_name = required("fullName", v)?; }
        if let Some(v) = mobile { address.mobile = v.into_inner(); }
        if let Some(v) = &patch.address { address.address = required("address", v)?; }
        if let Some(v) = &patch.city { address.city = required("city", v)?; }
        if let Some(v) = &patch.province { address.province = required("province", v)?; }
        if let Some(v) = &patch.postal_code { address.postal_code = required("postalCode", v)?; }
        address.updated_at = now;
        self.dirty.insert(id);
        match patch.is_default {
            Some(true) => self.make_default(id, now),
            Some(false) => {
                if let Some(address) = self.addresses.iter_mut().find(|a| a.id == id) { address.set_flagged(false, now); }
            }
            None => {}
        }
        self.get(id)
    }

    /// Soft delete. Promotes the first remaining address when the default goes.
    pub fn delete(&mut self, id: Uuid, now: DateTime<Utc>) -> Result<CustomerAddress, AddressError> {
        let index = self.addresses.iter().position(|a| a.id == id).ok_or(AddressError::NotFound)?;
        let mut address = self.addresses.remove(index);
        let was_default = address.is_default;
        address.is_default = false;
        address.deleted_at = Some(now);
        address.updated_at = now;
        self.dirty.remove(&id);
        self.removed.push(address.clone());

        let promoted = match (was_default, self.addresses.first().map(|a| a.id)) {
            (true, Some(next)) => { self.make_default(next, now); Some(next) }
            _ => None,
        };
        self.events.push(DomainEvent::Address(AddressEvent::Removed { customer_id: self.customer_id, address_id: id, promoted }));
        Ok(address)
    }

    /// Rows to persist, ordered so cleared defaults are written before the new one.
    pub fn changes(&self) -> Vec<CustomerAddress> {
        let mut rows: Vec<CustomerAddress> = self.removed.iter().cloned()
            .chain(self.addresses.iter().filter(|a| self.dirty.contains(&a.id)).cloned())
            .collect();
        sort_for_write(&mut rows);
        rows
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }

    fn make_default(&mut self, id: Uuid, now: DateTime<Utc>) {
        let changed = raise_exclusive(&mut self.addresses, id, now);
        if changed.contains(&id) {
            self.events.push(DomainEvent::Address(AddressEvent::DefaultChanged { customer_id: self.customer_id, address_id: id }));
        }
        self.dirty.extend(changed);
    }

    fn get(&self, id: Uuid) -> Result<CustomerAddress, AddressError> {
        self.addresses.iter().find(|a| a.id == id).cloned().ok_or(AddressError::NotFound)
    }
}

fn required(field: &'static str, value: &str) -> Result<String, AddressError> {
    let value = value.trim();
    if value.is_empty() { Err(AddressError::MissingField(field)) } else { Ok(value.to_string()) }
}
