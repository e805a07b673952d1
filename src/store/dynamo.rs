//! DynamoDB store backend.
//!
//! One table, composite `pk`/`sk` key, `gsi1` secondary index. Update patches
//! are encoded with expression attribute aliases for every attribute name, so
//! names that collide with engine reserved words ("status", "state", "type",
//! ...) can never break an update.

use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_dynamodb::primitives::Blob;
use aws_sdk_dynamodb::types::{AttributeValue, ReturnValue};
use aws_sdk_dynamodb::Client;

use super::{Attribute, Item, Patch, ScanFilter, Store, StoreError, PK, SK};

pub struct DynamoStore {
    client: Client,
    table_name: String,
}

impl DynamoStore {
    pub fn new(client: Client, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }
}

fn unavailable(err: impl std::fmt::Display) -> StoreError {
    StoreError::Unavailable(err.to_string())
}

#[async_trait]
impl Store for DynamoStore {
    async fn get(&self, pk: &str, sk: &str) -> Result<Option<Item>, StoreError> {
        let output = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key(PK, AttributeValue::S(pk.to_string()))
            .key(SK, AttributeValue::S(sk.to_string()))
            .send()
            .await
            .map_err(unavailable)?;
        Ok(output.item.map(item_from_dynamo))
    }

    async fn put(&self, item: Item) -> Result<(), StoreError> {
        super::item_key(&item)?;
        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item_to_dynamo(&item)))
            .send()
            .await
            .map_err(unavailable)?;
        Ok(())
    }

    async fn update(&self, pk: &str, sk: &str, patch: Patch) -> Result<Item, StoreError> {
        if patch.is_empty() {
            return self
                .get(pk, sk)
                .await?
                .ok_or_else(|| StoreError::InvalidItem("empty update on missing item".into()));
        }
        let encoded = UpdateExpression::encode(&patch);
        let output = self
            .client
            .update_item()
            .table_name(&self.table_name)
            .key(PK, AttributeValue::S(pk.to_string()))
            .key(SK, AttributeValue::S(sk.to_string()))
            .update_expression(encoded.expression)
            .set_expression_attribute_names(Some(encoded.names))
            .set_expression_attribute_values(Some(encoded.values))
            .return_values(ReturnValue::AllNew)
            .send()
            .await
            .map_err(unavailable)?;
        output
            .attributes
            .map(item_from_dynamo)
            .ok_or_else(|| StoreError::Unavailable("update returned no attributes".into()))
    }

    async fn delete(&self, pk: &str, sk: &str) -> Result<(), StoreError> {
        self.client
            .delete_item()
            .table_name(&self.table_name)
            .key(PK, AttributeValue::S(pk.to_string()))
            .key(SK, AttributeValue::S(sk.to_string()))
            .send()
            .await
            .map_err(unavailable)?;
        Ok(())
    }

    async fn query_partition(
        &self,
        pk: &str,
        sk_prefix: Option<&str>,
    ) -> Result<Vec<Item>, StoreError> {
        let mut condition = String::from("#pk = :pk");
        let mut names = HashMap::from([("#pk".to_string(), PK.to_string())]);
        let mut values = HashMap::from([(":pk".to_string(), AttributeValue::S(pk.to_string()))]);
        if let Some(prefix) = sk_prefix {
            condition.push_str(" AND begins_with(#sk, :sk)");
            names.insert("#sk".to_string(), SK.to_string());
            values.insert(":sk".to_string(), AttributeValue::S(prefix.to_string()));
        }

        let mut items = Vec::new();
        let mut start_key = None;
        loop {
            let output = self
                .client
                .query()
                .table_name(&self.table_name)
                .key_condition_expression(&condition)
                .set_expression_attribute_names(Some(names.clone()))
                .set_expression_attribute_values(Some(values.clone()))
                .set_exclusive_start_key(start_key)
                .send()
                .await
                .map_err(unavailable)?;
            items.extend(output.items.unwrap_or_default().into_iter().map(item_from_dynamo));
            start_key = output.last_evaluated_key;
            if start_key.is_none() {
                break;
            }
        }
        Ok(items)
    }

    async fn query_index(&self, index: &str, key: &str) -> Result<Vec<Item>, StoreError> {
        // By convention the index named `gsi1` is keyed by the `gsi1pk`
        // attribute; the same holds for any further index.
        let key_attr = format!("{index}pk");
        let mut items = Vec::new();
        let mut start_key = None;
        loop {
            let output = self
                .client
                .query()
                .table_name(&self.table_name)
                .index_name(index)
                .key_condition_expression("#k = :k")
                .expression_attribute_names("#k", &key_attr)
                .expression_attribute_values(":k", AttributeValue::S(key.to_string()))
                .set_exclusive_start_key(start_key)
                .send()
                .await
                .map_err(unavailable)?;
            items.extend(output.items.unwrap_or_default().into_iter().map(item_from_dynamo));
            start_key = output.last_evaluated_key;
            if start_key.is_none() {
                break;
            }
        }
        Ok(items)
    }

    async fn scan(
        &self,
        filter: &ScanFilter,
        limit: Option<usize>,
    ) -> Result<Vec<Item>, StoreError> {
        let mut items = Vec::new();
        let mut start_key = None;
        loop {
            let mut request = self
                .client
                .scan()
                .table_name(&self.table_name)
                .set_exclusive_start_key(start_key);
            if let Some(prefix) = &filter.pk_prefix {
                request = request
                    .filter_expression("begins_with(#pk, :prefix)")
                    .expression_attribute_names("#pk", PK)
                    .expression_attribute_values(":prefix", AttributeValue::S(prefix.clone()));
            }
            if let Some(limit) = limit {
                let remaining = limit.saturating_sub(items.len());
                request = request.limit(remaining.clamp(1, i32::MAX as usize) as i32);
            }
            let output = request.send().await.map_err(unavailable)?;
            items.extend(output.items.unwrap_or_default().into_iter().map(item_from_dynamo));
            if limit.is_some_and(|limit| items.len() >= limit) {
                items.truncate(limit.unwrap_or(items.len()));
                break;
            }
            start_key = output.last_evaluated_key;
            if start_key.is_none() {
                break;
            }
        }
        Ok(items)
    }
}

struct UpdateExpression {
    expression: String,
    names: HashMap<String, String>,
    values: HashMap<String, AttributeValue>,
}

impl UpdateExpression {
    /// Encode a patch as `SET #n0 = :v0, #n1 = :v1, ...`. Every attribute
    /// name goes through an alias, so reserved words never appear in the
    /// expression itself.
    fn encode(patch: &Patch) -> Self {
        let mut assignments = Vec::with_capacity(patch.len());
        let mut names = HashMap::with_capacity(patch.len());
        let mut values = HashMap::with_capacity(patch.len());
        for (i, (name, value)) in patch.iter().enumerate() {
            let alias = format!("#n{i}");
            let placeholder = format!(":v{i}");
            assignments.push(format!("{alias} = {placeholder}"));
            names.insert(alias, name.clone());
            values.insert(placeholder, attr_to_dynamo(value));
        }
        Self {
            expression: format!("SET {}", assignments.join(", ")),
            names,
            values,
        }
    }
}

fn item_to_dynamo(item: &Item) -> HashMap<String, AttributeValue> {
    item.iter()
        .map(|(name, attr)| (name.clone(), attr_to_dynamo(attr)))
        .collect()
}

fn item_from_dynamo(item: HashMap<String, AttributeValue>) -> Item {
    item.into_iter()
        .map(|(name, value)| (name, attr_from_dynamo(value)))
        .collect()
}

fn attr_to_dynamo(attr: &Attribute) -> AttributeValue {
    match attr {
        Attribute::S(s) => AttributeValue::S(s.clone()),
        Attribute::N(d) => AttributeValue::N(d.to_string()),
        Attribute::Bool(b) => AttributeValue::Bool(*b),
        Attribute::Null => AttributeValue::Null(true),
        Attribute::L(values) => AttributeValue::L(values.iter().map(attr_to_dynamo).collect()),
        Attribute::M(map) => AttributeValue::M(
            map.iter()
                .map(|(name, value)| (name.clone(), attr_to_dynamo(value)))
                .collect(),
        ),
    }
}

fn attr_from_dynamo(value: AttributeValue) -> Attribute {
    match value {
        AttributeValue::S(s) => Attribute::S(s),
        AttributeValue::N(n) => n
            .parse()
            .map(Attribute::N)
            .unwrap_or(Attribute::S(n)),
        AttributeValue::Bool(b) => Attribute::Bool(b),
        AttributeValue::Null(_) => Attribute::Null,
        AttributeValue::L(values) => {
            Attribute::L(values.into_iter().map(attr_from_dynamo).collect())
        }
        AttributeValue::M(map) => Attribute::M(
            map.into_iter()
                .map(|(name, value)| (name, attr_from_dynamo(value)))
                .collect(),
        ),
        AttributeValue::Ss(strings) => {
            Attribute::L(strings.into_iter().map(Attribute::S).collect())
        }
        AttributeValue::Ns(numbers) => Attribute::L(
            numbers
                .into_iter()
                .map(|n| n.parse().map(Attribute::N).unwrap_or(Attribute::S(n)))
                .collect(),
        ),
        AttributeValue::B(blob) => binary_placeholder(Some(blob)),
        AttributeValue::Bs(_) => binary_placeholder(None),
        _ => Attribute::Null,
    }
}

// Binary attributes are not part of the data model; surface them as nulls
// rather than failing a whole read.
fn binary_placeholder(_blob: Option<Blob>) -> Attribute {
    tracing::debug!("dropping binary attribute on read");
    Attribute::Null
}
