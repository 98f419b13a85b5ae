//! Customer records and checkout contact resolution

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::events::{CustomerEvent, DomainEvent};
use crate::domain::value_objects::{ContactError, Email, Mobile};

pub const ANONYMIZED_NAME: &str = "Deleted User";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: Uuid,
    pub full_name: String,
    pub email: Option<String>,
    pub mobile: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub anonymized_at: Option<DateTime<Utc>>,
}

/// Contact block sent with an order.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerData {
    #[serde(alias = "name")]
    pub full_name: Option<String>,
    pub email: Option<String>,
    #[serde(alias = "phone")]
    pub mobile: Option<String>,
}

impl CustomerData {
    /// Normalized email and mobile, skipping blank fields.
    pub fn contact(&self) -> Result<(Option<Email>, Option<Mobile>), CustomerError> {
        let email = present(&self.email).map(Email::parse).transpose()?;
        let mobile = present(&self.mobile).map(Mobile::parse).transpose()?;
        Ok((email, mobile))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CustomerError {
    #[error("Customer not found")]
    NotFound,
    #[error("customerData.{0} is required")]
    MissingField(&'static str),
    #[error(transparent)]
    Contact(#[from] ContactError),
}

/// Who an order is placed for.
#[derive(Debug, Clone)]
pub enum CustomerResolution {
    /// Authenticated customer, possibly with refreshed contact details.
    Existing(Customer),
    /// Guest checkout creating a new record.
    New(Customer),
}

impl CustomerResolution {
    pub fn customer(&self) -> &Customer {
        match self { Self::Existing(c) | Self::New(c) => c }
    }
}

impl Customer {
    /// Guest checkout: name, email and mobile are all required.
    pub fn from_guest(data: Option<&CustomerData>, now: DateTime<Utc>) -> Result<Self, CustomerError> {
        let data = data.ok_or(CustomerError::MissingField("email"))?;
        let full_name = present(&data.full_name).ok_or(CustomerError::MissingField("fullName"))?;
        let email = present(&data.email).ok_or(CustomerError::MissingField("email"))?;
        let mobile = present(&data.mobile).ok_or(CustomerError::MissingField("mobile"))?;
        Ok(Self {
            id: Uuid::now_v7(),
            full_name: full_name.to_string(),
            email: Some(Email::parse(email)?.into_inner()),
            mobile: Some(Mobile::parse(mobile)?.into_inner()),
            created_at: now,
            updated_at: now,
            anonymized_at: None,
        })
    }

    /// Authenticated checkout: only supplied fields are validated and applied.
    pub fn refresh_contact(&mut self, data: &CustomerData, now: DateTime<Utc>) -> Result<bool, CustomerError> {
        let mut changed = false;
        if let Some(name) = present(&data.full_name) {
            if self.full_name != name { self.full_name = name.to_string(); changed = true; }
        }
        if let Some(email) = present(&data.email) {
            let email = Email::parse(email)?.into_inner();
            if self.email.as_deref() != Some(email.as_str()) { self.email = Some(email); changed = true; }
        }
        if let Some(mobile) = present(&data.mobile) {
            let mobile = Mobile::parse(mobile)?.into_inner();
            if self.mobile.as_deref() != Some(mobile.as_str()) { self.mobile = Some(mobile); changed = true; }
        }
        if changed { self.updated_at = now; }
        Ok(changed)
    }

    /// Matches on normalized email or mobile.
    pub fn matches_contact(&self, email: Option<&Email>, mobile: Option<&Mobile>) -> bool {
        let by_email = matches!((email, &self.email), (Some(e), Some(mine)) if e.as_str() == mine);
        let by_mobile = matches!((mobile, &self.mobile), (Some(m), Some(mine)) if m.as_str() == mine);
        by_email || by_mobile
    }

    pub fn anonymize(&mut self, now: DateTime<Utc>) -> DomainEvent {
        self.full_name = ANONYMIZED_NAME.to_string();
        self.email = None;
        self.mobile = None;
        self.anonymized_at = Some(now);
        self.updated_at = now;
        DomainEvent::Customer(CustomerEvent::Anonymized { customer_id: self.id })
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
