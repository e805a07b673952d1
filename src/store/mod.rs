//! Single-table key-value store access layer.
//!
//! Every persisted entity lives in one table keyed by `(pk, sk)`, with a
//! secondary index (`gsi1`) for owner and username lookups. Handlers talk to
//! the [`Store`] trait only; the concrete backends are [`DynamoStore`] for
//! deployments and [`MemoryStore`] for tests and local development.

pub mod dynamo;
pub mod memory;

use std::collections::BTreeMap;
use std::str::FromStr;

use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::{Map, Number, Value};
use thiserror::Error;

pub use dynamo::DynamoStore;
pub use memory::MemoryStore;

/// Primary key attribute names.
pub const PK: &str = "pk";
pub const SK: &str = "sk";

/// Secondary index name and the attribute holding its partition key.
pub const GSI1: &str = "gsi1";
pub const GSI1_PK: &str = "gsi1pk";

/// Key layout helpers. All composite keys are built here so the
/// `PROPERTY#`/`USER#`/`OWNER#` conventions exist in exactly one place.
pub mod keys {
    pub const METADATA: &str = "METADATA";
    pub const FINANCE: &str = "FINANCE";
    pub const PROFILE: &str = "PROFILE";
    pub const CREDENTIALS: &str = "CREDENTIALS";

    pub const PROPERTY_PREFIX: &str = "PROPERTY#";
    pub const LOAN_PREFIX: &str = "LOAN#";

    pub fn property(property_id: &str) -> String {
        format!("PROPERTY#{property_id}")
    }

    pub fn user(user_id: &str) -> String {
        format!("USER#{user_id}")
    }

    pub fn loan(loan_id: &str) -> String {
        format!("LOAN#{loan_id}")
    }

    pub fn owner(owner_id: &str) -> String {
        format!("OWNER#{owner_id}")
    }

    pub fn username(username: &str) -> String {
        format!("USERNAME#{username}")
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("invalid item: {0}")]
    InvalidItem(String),
}

/// A stored attribute value. Numbers are held as exact decimals; they are
/// converted to/from standard floating point only at the JSON boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum Attribute {
    S(String),
    N(Decimal),
    Bool(bool),
    Null,
    L(Vec<Attribute>),
    M(BTreeMap<String, Attribute>),
}

/// A flat stored record, keyed by attribute name.
pub type Item = BTreeMap<String, Attribute>;

/// A structured attribute diff for [`Store::update`]. Handlers never build
/// storage-query syntax; encoding the patch safely is the adapter's job.
pub type Patch = BTreeMap<String, Attribute>;

/// Structured scan predicate. Only used on the owner-index fallback path and
/// the health probe; scans are O(table size) by nature.
#[derive(Debug, Clone, Default)]
pub struct ScanFilter {
    pub pk_prefix: Option<String>,
}

impl Attribute {
    /// Convert inbound JSON into the storage representation. Fractional
    /// numbers are parsed from their decimal text so no binary-float rounding
    /// leaks into the table; the conversion recurses through arrays and
    /// objects.
    pub fn from_json(value: &Value) -> Attribute {
        match value {
            Value::Null => Attribute::Null,
            Value::Bool(b) => Attribute::Bool(*b),
            Value::Number(n) => match decimal_from_number(n) {
                Some(d) => Attribute::N(d),
                None => Attribute::Null,
            },
            Value::String(s) => Attribute::S(s.clone()),
            Value::Array(values) => Attribute::L(values.iter().map(Attribute::from_json).collect()),
            Value::Object(map) => Attribute::M(
                map.iter()
                    .map(|(k, v)| (k.clone(), Attribute::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Convert a stored attribute back into JSON. Whole decimals come back as
    /// integers, everything else as standard floating point.
    pub fn to_json(&self) -> Value {
        match self {
            Attribute::S(s) => Value::String(s.clone()),
            Attribute::N(d) => number_from_decimal(*d),
            Attribute::Bool(b) => Value::Bool(*b),
            Attribute::Null => Value::Null,
            Attribute::L(values) => Value::Array(values.iter().map(Attribute::to_json).collect()),
            Attribute::M(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect::<Map<String, Value>>(),
            ),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Attribute::S(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for Attribute {
    fn from(value: &str) -> Self {
        Attribute::S(value.to_string())
    }
}

impl From<String> for Attribute {
    fn from(value: String) -> Self {
        Attribute::S(value)
    }
}

fn decimal_from_number(n: &Number) -> Option<Decimal> {
    if let Some(i) = n.as_i64() {
        return Some(Decimal::from(i));
    }
    if let Some(u) = n.as_u64() {
        return Some(Decimal::from(u));
    }
    // Fractional: parse the decimal text rather than the f64 bits, falling
    // back to scientific notation for exponent forms.
    let text = n.to_string();
    Decimal::from_str(&text)
        .ok()
        .or_else(|| Decimal::from_scientific(&text).ok())
}

fn number_from_decimal(d: Decimal) -> Value {
    if d.fract().is_zero() {
        if let Some(i) = d.to_i64() {
            return Value::Number(Number::from(i));
        }
    }
    d.to_f64()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

/// Pull the composite key out of an item, or refuse it.
pub fn item_key(item: &Item) -> Result<(String, String), StoreError> {
    let pk = item
        .get(PK)
        .and_then(Attribute::as_str)
        .ok_or_else(|| StoreError::InvalidItem(format!("missing key attribute: {PK}")))?;
    let sk = item
        .get(SK)
        .and_then(Attribute::as_str)
        .ok_or_else(|| StoreError::InvalidItem(format!("missing key attribute: {SK}")))?;
    Ok((pk.to_string(), sk.to_string()))
}

/// Composite-key table contract. `update` applies a structured patch with
/// reserved-word-safe encoding and returns the post-update item; `scan` is the
/// degraded-mode path only.
#[async_trait]
pub trait Store: Send + Sync {
    async fn get(&self, pk: &str, sk: &str) -> Result<Option<Item>, StoreError>;

    async fn put(&self, item: Item) -> Result<(), StoreError>;

    async fn update(&self, pk: &str, sk: &str, patch: Patch) -> Result<Item, StoreError>;

    async fn delete(&self, pk: &str, sk: &str) -> Result<(), StoreError>;

    async fn query_partition(
        &self,
        pk: &str,
        sk_prefix: Option<&str>,
    ) -> Result<Vec<Item>, StoreError>;

    async fn query_index(&self, index: &str, key: &str) -> Result<Vec<Item>, StoreError>;

    async fn scan(&self, filter: &ScanFilter, limit: Option<usize>)
        -> Result<Vec<Item>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fractional_numbers_keep_their_decimal_value() {
        let attr = Attribute::from_json(&json!(1200.45));
        assert_eq!(attr, Attribute::N(Decimal::from_str("1200.45").unwrap()));
        assert_eq!(attr.to_json(), json!(1200.45));
    }

    #[test]
    fn whole_numbers_round_trip_as_integers() {
        let attr = Attribute::from_json(&json!(1200));
        assert_eq!(attr.to_json(), json!(1200));
    }

    #[test]
    fn conversion_recurses_through_nested_values() {
        let value = json!({
            "purchase": { "price": 349_999.99, "parties": ["a", "b"] },
            "active": true,
        });
        let attr = Attribute::from_json(&value);
        match &attr {
            Attribute::M(map) => match map.get("purchase") {
                Some(Attribute::M(purchase)) => {
                    assert_eq!(
                        purchase.get("price"),
                        Some(&Attribute::N(Decimal::from_str("349999.99").unwrap()))
                    );
                }
                other => panic!("unexpected purchase attribute: {other:?}"),
            },
            other => panic!("unexpected attribute: {other:?}"),
        }
        assert_eq!(attr.to_json(), value);
    }

    #[test]
    fn item_key_requires_both_key_attributes() {
        let mut item = Item::new();
        item.insert(PK.into(), "PROPERTY#1".into());
        assert!(item_key(&item).is_err());
        item.insert(SK.into(), keys::METADATA.into());
        assert_eq!(
            item_key(&item).unwrap(),
            ("PROPERTY#1".to_string(), keys::METADATA.to_string())
        );
    }
}
