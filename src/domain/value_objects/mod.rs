//! Value Objects for the commerce domain

use chrono::{DateTime, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Normalized email address (trimmed, lowercase).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Email(String);

impl Email {
    pub fn parse(value: &str) -> Result<Self, ContactError> {
        let value = value.trim().to_lowercase();
        if value.is_empty() { return Err(ContactError::Empty("email")); }
        let (local, domain) = value.split_once('@').ok_or(ContactError::InvalidEmail)?;
        if local.is_empty() || !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
            return Err(ContactError::InvalidEmail);
        }
        Ok(Self(value))
    }
    pub fn as_str(&self) -> &str { &self.0 }
    pub fn into_inner(self) -> String { self.0 }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

/// Mobile number with separators stripped. A leading `+` is kept.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Mobile(String);

impl Mobile {
    pub fn parse(value: &str) -> Result<Self, ContactError> {
        let trimmed = value.trim();
        if trimmed.is_empty() { return Err(ContactError::Empty("mobile")); }
        let (plus, rest) = match trimmed.strip_prefix('+') { Some(r) => ("+", r), None => ("", trimmed) };
        let digits: String = rest.chars().filter(|c| !matches!(c, ' ' | '-' | '(' | ')')).collect();
        if !digits.chars().all(|c| c.is_ascii_digit()) || !(10..=15).contains(&digits.len()) {
            return Err(ContactError::InvalidMobile);
        }
        Ok(Self(format!("{plus}{digits}")))
    }
    pub fn as_str(&self) -> &str { &self.0 }
    pub fn into_inner(self) -> String { self.0 }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContactError {
    #[error("{0} is required")]
    Empty(&'static str),
    #[error("email address is not valid")]
    InvalidEmail,
    #[error("mobile number is not valid")]
    InvalidMobile,
}

/// Human-readable order number: six trailing digits of the millisecond
/// clock followed by a four digit random suffix.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderNumber(String);

impl OrderNumber {
    pub fn generate(now: DateTime<Utc>) -> Self { Self::generate_with(now, &mut rand::thread_rng()) }

    pub fn generate_with<R: Rng + ?Sized>(now: DateTime<Utc>, rng: &mut R) -> Self {
        let clock = now.timestamp_millis().rem_euclid(1_000_000);
        let suffix: u32 = rng.gen_range(1000..=9999);
        Self(format!("{clock:06}{suffix:04}"))
    }

    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for OrderNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

/// Strictly positive line quantity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Quantity(u32);

impl Quantity {
    pub fn new(value: u32) -> Option<Self> { (value > 0 && value <= i32::MAX as u32).then_some(Self(value)) }
    pub fn value(&self) -> u32 { self.0 }
    pub fn as_i32(&self) -> i32 { self.0 as i32 }
    pub fn add(&self, other: Quantity) -> Self { Self(self.0.saturating_add(other.0).min(i32::MAX as u32)) }

    /// Accepts a JSON integer or an integer string.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()).and_then(Self::new),
            serde_json::Value::String(s) => s.trim().parse::<u32>().ok().and_then(Self::new),
            _ => None,
        }
    }
}

/// Exclusive upper bound of a stored money amount (`NUMERIC(14, 2)`).
pub const MONEY_LIMIT: Decimal = Decimal::from_parts(3_567_587_328, 232, 0, false, 0);

/// A money amount as the database will keep it: at most two decimal places
/// and below [`MONEY_LIMIT`]. Zeros past the cents are dropped.
pub fn money_amount(value: Decimal) -> Option<Decimal> {
    let cents = value.round_dp(2);
    (cents == value && cents.abs() < MONEY_LIMIT).then_some(cents)
}

/// Reads a money amount from a JSON number or numeric string.
pub fn decimal_from_json(value: &serde_json::Value) -> Option<Decimal> {
    match value {
        serde_json::Value::Number(n) => Decimal::from_str(&n.to_string())
            .or_else(|_| Decimal::from_scientific(&n.to_string()))
            .ok(),
        serde_json::Value::String(s) => Decimal::from_str(s.trim()).ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};
    use serde_json::json;

    #[test]
    fn test_email() {
        assert_eq!(Email::parse("  Buyer@Example.COM ").unwrap().as_str(), "buyer@example.com");
        assert_eq!(Email::parse("nope"), Err(ContactError::InvalidEmail));
        assert_eq!(Email::parse(" "), Err(ContactError::Empty("email")));
    }

    #[test]
    fn test_mobile() {
        assert_eq!(Mobile::parse("0912 345-6789").unwrap().as_str(), "09123456789");
        assert_eq!(Mobile::parse("+98 912 345 6789").unwrap().as_str(), "+989123456789");
        assert_eq!(Mobile::parse("12ab"), Err(ContactError::InvalidMobile));
    }

    #[test]
    fn test_order_number_shape() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let n = OrderNumber::generate_with(Utc::now(), &mut rng);
            assert_eq!(n.as_str().len(), 10);
            assert!(n.as_str().chars().all(|c| c.is_ascii_digit()));
            let suffix: u32 = n.as_str()[6..].parse().unwrap();
            assert!((1000..=9999).contains(&suffix));
        }
    }

    #[test]
    fn test_quantity_and_decimal_parsing() {
        assert_eq!(Quantity::from_json(&json!(2)).map(|q| q.value()), Some(2));
        assert_eq!(Quantity::from_json(&json!("3")).map(|q| q.value()), Some(3));
        assert!(Quantity::from_json(&json!(0)).is_none());
        assert!(Quantity::from_json(&json!(1.5)).is_none());
        assert_eq!(decimal_from_json(&json!(100)), Some(Decimal::new(100, 0)));
        assert_eq!(decimal_from_json(&json!("19.90")), Some(Decimal::new(1990, 2)));
        assert_eq!(decimal_from_json(&json!(true)), None);
    }

    #[test]
    fn test_money_amount_fits_the_column() {
        assert_eq!(MONEY_LIMIT, Decimal::new(1_000_000_000_000, 0));
        assert_eq!(money_amount(Decimal::new(1999, 2)), Some(Decimal::new(1999, 2)));
        assert_eq!(money_amount(Decimal::new(19_990, 3)).map(|d| d.to_string()), Some("19.99".to_string()));
        assert_eq!(money_amount(Decimal::new(2450, 2)).map(|d| d.to_string()), Some("24.50".to_string()));
        assert_eq!(money_amount(Decimal::new(19_999, 3)), None);
        assert_eq!(money_amount(MONEY_LIMIT), None);
        assert_eq!(money_amount(MONEY_LIMIT - Decimal::new(1, 2)), Some(Decimal::new(99_999_999_999_999, 2)));
    }
}
