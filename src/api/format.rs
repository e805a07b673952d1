//! Record codec: wire JSON (nested, camelCase) ↔ storage items (flat,
//! snake_case, exact-decimal numbers).
//!
//! Field translation is explicit and total: every wire field has exactly one
//! storage field, unknown wire fields are dropped silently, and the storage
//! key attributes (`pk`, `sk`, `gsi1pk`) are never emitted back out.

use serde_json::{json, Map, Value};

use crate::store::{Attribute, Item, Patch};

/// Resource kinds the codec knows how to translate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Property,
    Finance,
    Loan,
    Profile,
}

/// `(wire name, storage name)` per resource kind.
const PROPERTY_FIELDS: &[(&str, &str)] = &[
    ("title", "title"),
    ("description", "description"),
    ("propertyType", "property_type"),
    ("price", "price"),
    ("bedrooms", "bedrooms"),
    ("bathrooms", "bathrooms"),
    ("squareFeet", "square_feet"),
    ("garageSpaces", "garage_spaces"),
    ("garageType", "garage_type"),
    ("yearBuilt", "year_built"),
    ("address", "address"),
    ("status", "status"),
];

const FINANCE_FIELDS: &[(&str, &str)] = &[
    ("ownershipType", "ownership_type"),
    ("ownershipStatus", "ownership_status"),
    ("purchasePrice", "purchase_price"),
    ("purchaseDate", "purchase_date"),
    ("downPayment", "down_payment"),
    ("closingCosts", "closing_costs"),
    ("sellerName", "seller_name"),
    ("buyerName", "buyer_name"),
];

const LOAN_FIELDS: &[(&str, &str)] = &[
    ("lender", "lender"),
    ("loanType", "loan_type"),
    ("originalAmount", "original_amount"),
    ("currentAmount", "current_amount"),
    ("interestRate", "interest_rate"),
    ("termYears", "term_years"),
    ("monthlyPayment", "monthly_payment"),
    ("startDate", "start_date"),
    ("maturityDate", "maturity_date"),
    ("isActive", "is_active"),
];

const PROFILE_FIELDS: &[(&str, &str)] = &[
    ("email", "email"),
    ("firstName", "first_name"),
    ("lastName", "last_name"),
    ("phone", "phone"),
    ("dateOfBirth", "date_of_birth"),
    ("address", "address"),
    ("accountType", "account_type"),
    ("company", "company"),
    ("status", "status"),
];

/// Fixed shape of the structured address object. Callers may rely on every
/// sub-field being present.
const ADDRESS_FIELDS: &[&str] = &["street", "city", "county", "state", "zip", "country"];

impl Resource {
    fn fields(self) -> &'static [(&'static str, &'static str)] {
        match self {
            Resource::Property => PROPERTY_FIELDS,
            Resource::Finance => FINANCE_FIELDS,
            Resource::Loan => LOAN_FIELDS,
            Resource::Profile => PROFILE_FIELDS,
        }
    }

    fn has_address(self) -> bool {
        matches!(self, Resource::Property | Resource::Profile)
    }
}

/// Translate a wire object into storage attributes. Only fields in the
/// resource's table are carried over; floats become exact decimals on the way
/// in (recursively, via [`Attribute::from_json`]).
pub fn to_storage(resource: Resource, wire: &Map<String, Value>) -> Patch {
    let mut attrs = Patch::new();
    for (wire_name, storage_name) in resource.fields() {
        let Some(value) = wire.get(*wire_name) else {
            continue;
        };
        let attr = if *storage_name == "address" {
            address_to_storage(value)
        } else {
            Attribute::from_json(value)
        };
        attrs.insert((*storage_name).to_string(), attr);
    }
    attrs
}

/// Format a stored item for the API. Never fails: a malformed item degrades
/// to a minimal id/title representation instead of erroring.
pub fn to_wire(resource: Resource, item: &Item) -> Value {
    match detail(resource, item) {
        Some(value) => value,
        None => minimal(item),
    }
}

fn detail(resource: Resource, item: &Item) -> Option<Value> {
    let id = item.get("id").and_then(Attribute::as_str)?;

    let mut wire = Map::new();
    wire.insert("id".into(), Value::String(id.to_string()));
    for (wire_name, storage_name) in resource.fields() {
        if *storage_name == "address" {
            continue; // always emitted below, in its fixed shape
        }
        if let Some(attr) = item.get(*storage_name) {
            wire.insert((*wire_name).to_string(), attr.to_json());
        }
    }
    if resource.has_address() {
        wire.insert("address".into(), address_to_wire(item.get("address")));
    }
    if resource == Resource::Property {
        wire.insert("owner_id".into(), string_or_empty(item.get("owner_id")));
        wire.insert("images".into(), images_to_wire(item.get("images")));
    }
    if resource == Resource::Profile {
        wire.insert("user_id".into(), Value::String(id.to_string()));
        wire.remove("id");
    }
    for timestamp in ["created_at", "updated_at"] {
        if let Some(attr) = item.get(timestamp) {
            wire.insert(timestamp.to_string(), attr.to_json());
        }
    }
    Some(Value::Object(wire))
}

// Formatting errors must never become 500s; fall back to the best we have.
fn minimal(item: &Item) -> Value {
    let title = item
        .get("title")
        .and_then(Attribute::as_str)
        .unwrap_or("Untitled Property");
    json!({
        "id": string_or_empty(item.get("id")),
        "title": title,
    })
}

fn string_or_empty(attr: Option<&Attribute>) -> Value {
    Value::String(attr.and_then(Attribute::as_str).unwrap_or("").to_string())
}

fn address_to_storage(value: &Value) -> Attribute {
    match value {
        Value::Object(map) => {
            let mut address = std::collections::BTreeMap::new();
            for field in ADDRESS_FIELDS {
                if let Some(part) = map.get(*field) {
                    address.insert((*field).to_string(), Attribute::from_json(part));
                }
            }
            Attribute::M(address)
        }
        // A non-object address (legacy single-line form) is kept under its
        // street sub-field so the stored shape stays structured.
        Value::String(line) => {
            let mut address = std::collections::BTreeMap::new();
            address.insert("street".to_string(), Attribute::S(line.clone()));
            Attribute::M(address)
        }
        _ => Attribute::M(std::collections::BTreeMap::new()),
    }
}

fn address_to_wire(attr: Option<&Attribute>) -> Value {
    let stored = match attr {
        Some(Attribute::M(map)) => Some(map),
        _ => None,
    };
    let mut address = Map::new();
    for field in ADDRESS_FIELDS {
        let value = stored
            .and_then(|map| map.get(*field))
            .map(Attribute::to_json)
            .unwrap_or(Value::String(String::new()));
        address.insert((*field).to_string(), value);
    }
    Value::Object(address)
}

fn images_to_wire(attr: Option<&Attribute>) -> Value {
    match attr {
        Some(Attribute::L(values)) => {
            Value::Array(values.iter().map(Attribute::to_json).collect())
        }
        _ => Value::Array(Vec::new()),
    }
}
