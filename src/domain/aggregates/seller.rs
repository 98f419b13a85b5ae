//! Seller and Shop roster

use std::collections::HashSet;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::exclusive::{raise_exclusive, sort_for_write, ExclusiveFlag};
use crate::domain::events::{DomainEvent, ShopEvent};
use crate::domain::value_objects::{ContactError, Email};

#[derive(Clone, Debug, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Seller {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewSeller {
    #[validate(length(min = 3, max = 50))]
    pub username: String,
    pub email: String,
    #[validate(length(min = 8, max = 128, message = "password must be 8 to 128 characters"))]
    pub password: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SellerPatch {
    #[validate(length(min = 3, max = 50))]
    pub username: Option<String>,
    pub email: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, thiserror::Error)]
pub enum SellerError {
    #[error("Seller not found")]
    NotFound,
    #[error("username may only contain letters, digits, '.', '-' and '_'")]
    InvalidUsername,
    #[error(transparent)]
    Contact(#[from] ContactError),
    #[error("password hashing failed")]
    PasswordHash,
}

impl Seller {
    pub fn register(new: &NewSeller, now: DateTime<Utc>) -> Result<Self, SellerError> {
        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(new.password.as_bytes(), &salt)
            .map_err(|_| SellerError::PasswordHash)?
            .to_string();
        Ok(Self {
            id: Uuid::now_v7(),
            username: username(&new.username)?,
            email: Email::parse(&new.email)?.into_inner(),
            password_hash,
            is_active: true,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn verify_password(&self, password: &str) -> bool {
        PasswordHash::new(&self.password_hash)
            .map(|parsed| Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
            .unwrap_or(false)
    }

    pub fn apply_patch(&mut self, patch: &SellerPatch, now: DateTime<Utc>) -> Result<(), SellerError> {
        if let Some(v) = &patch.username { self.username = username(v)?; }
        if let Some(v) = &patch.email { self.email = Email::parse(v)?.into_inner(); }
        if let Some(v) = patch.is_active { self.is_active = v; }
        self.updated_at = now;
        Ok(())
    }
}

fn username(value: &str) -> Result<String, SellerError> {
    let value = value.trim();
    let valid = !value.is_empty() && value.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'));
    if valid { Ok(value.to_lowercase()) } else { Err(SellerError::InvalidUsername) }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Shop {
    pub id: Uuid,
    pub seller_id: Uuid,
    pub shop_name: String,
    pub is_default: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ExclusiveFlag for Shop {
    fn key(&self) -> Uuid { self.id }
    fn flagged(&self) -> bool { self.is_default }
    fn set_flagged(&mut self, on: bool, now: DateTime<Utc>) { self.is_default = on; self.updated_at = now; }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewShop {
    #[validate(length(max = 120))]
    pub shop_name: String,
    #[serde(default)]
    pub is_default: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ShopPatch {
    #[validate(length(max = 120))]
    pub shop_name: Option<String>,
    pub is_active: Option<bool>,
    pub is_default: Option<bool>,
}

#[derive(Debug, Clone)]
pub enum ShopCommand {
    Create(NewShop),
    Update { id: Uuid, patch: ShopPatch },
    MakeDefault { id: Uuid },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShopError {
    #[error("Shop not found")]
    NotFound,
    #[error("shopName is required")]
    MissingName,
    #[error("the default shop cannot be deactivated")]
    DefaultMustStayActive,
    #[error("an inactive shop cannot be the default")]
    InactiveDefault,
    #[error("a seller must keep a default shop; mark another shop as default instead")]
    DefaultRequired,
}

/// The shops of one seller; exactly one of them is the default once any exist.
#[derive(Debug)]
pub struct ShopRoster {
    seller_id: Uuid,
    shops: Vec<Shop>,
    dirty: HashSet<Uuid>,
    events: Vec<DomainEvent>,
}

impl ShopRoster {
    pub fn load(seller_id: Uuid, shops: Vec<Shop>) -> Self {
        let shops = shops.into_iter().filter(|s| s.seller_id == seller_id).collect();
        Self { seller_id, shops, dirty: HashSet::new(), events: vec![] }
    }

    pub fn shops(&self) -> &[Shop] { &self.shops }
    pub fn default_shop(&self) -> Option<&Shop> { self.shops.iter().find(|s| s.is_default) }

    pub fn apply(&mut self, command: ShopCommand, now: DateTime<Utc>) -> Result<Shop, ShopError> {
        match command {
            ShopCommand::Create(new) => self.create(new, now),
            ShopCommand::Update { id, patch } => self.update(id, patch, now),
            ShopCommand::MakeDefault { id } => { self.make_default(id, now)?; self.get(id) }
        }
    }

    pub fn create(&mut self, new: NewShop, now: DateTime<Utc>) -> Result<Shop, ShopError> {
        let name = new.shop_name.trim();
        if name.is_empty() { return Err(ShopError::MissingName); }
        let shop = Shop {
            id: Uuid::now_v7(), seller_id: self.seller_id, shop_name: name.to_string(),
            is_default: false, is_active: true, created_at: now, updated_at: now,
        };
        let id = shop.id;
        let make_default = new.is_default || self.shops.is_empty();
        self.shops.push(shop);
        self.dirty.insert(id);
        if make_default { self.make_default(id, now)?; }
        self.get(id)
    }

    pub fn update(&mut self, id: Uuid, patch: ShopPatch, now: DateTime<Utc>) -> Result<Shop, ShopError> {
        let shop = self.shops.iter_mut().find(|s| s.id == id).ok_or(ShopError::NotFound)?;
        if let Some(name) = &patch.shop_name {
            let name = name.trim();
            if name.is_empty() { return Err(ShopError::MissingName); }
            shop.shop_name = name.to_string();
        }
        if let Some(active) = patch.is_active {
            if !active && (shop.is_default || patch.is_default == Some(true)) { return Err(ShopError::DefaultMustStayActive); }
            shop.is_active = active;
        }
        if patch.is_default == Some(false) && shop.is_default { return Err(ShopError::DefaultRequired); }
        shop.updated_at = now;
        self.dirty.insert(id);
        if patch.is_default == Some(true) { self.make_default(id, now)?; }
        self.get(id)
    }

    pub fn changes(&self) -> Vec<Shop> {
        let mut rows: Vec<Shop> = self.shops.iter().filter(|s| self.dirty.contains(&s.id)).cloned().collect();
        sort_for_write(&mut rows);
        rows
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }

    fn make_default(&mut self, id: Uuid, now: DateTime<Utc>) -> Result<(), ShopError> {
        let target = self.shops.iter().find(|s| s.id == id).ok_or(ShopError::NotFound)?;
        if !target.is_active { return Err(ShopError::InactiveDefault); }
        let changed = raise_exclusive(&mut self.shops, id, now);
        if changed.contains(&id) {
            self.events.push(DomainEvent::Shop(ShopEvent::DefaultChanged { seller_id: self.seller_id, shop_id: id }));
        }
        self.dirty.extend(changed);
        Ok(())
    }

    fn get(&self, id: Uuid) -> Result<Shop, ShopError> {
        self.shops.iter().find(|s| s.id == id).cloned().ok_or(ShopError::NotFound)
    }
}
