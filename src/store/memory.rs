//! In-memory store backend.
//!
//! Partition-level concurrency via [`DashMap`]; within a partition, items are
//! held in a `BTreeMap` keyed by sort key so prefix queries come back in sort
//! order. Observable semantics match [`super::DynamoStore`], including upsert
//! behavior on `update`.

use std::collections::BTreeMap;

use async_trait::async_trait;
use dashmap::DashMap;

use super::{item_key, Attribute, Item, Patch, ScanFilter, Store, StoreError, GSI1_PK, PK, SK};

#[derive(Debug, Default)]
pub struct MemoryStore {
    partitions: DashMap<String, BTreeMap<String, Item>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get(&self, pk: &str, sk: &str) -> Result<Option<Item>, StoreError> {
        Ok(self
            .partitions
            .get(pk)
            .and_then(|partition| partition.get(sk).cloned()))
    }

    async fn put(&self, item: Item) -> Result<(), StoreError> {
        let (pk, sk) = item_key(&item)?;
        self.partitions.entry(pk).or_default().insert(sk, item);
        Ok(())
    }

    async fn update(&self, pk: &str, sk: &str, patch: Patch) -> Result<Item, StoreError> {
        let mut partition = self.partitions.entry(pk.to_string()).or_default();
        let item = partition.entry(sk.to_string()).or_insert_with(|| {
            // Upsert semantics: an update against a missing key creates the
            // item, same as the backing table engine.
            let mut created = Item::new();
            created.insert(PK.into(), Attribute::S(pk.to_string()));
            created.insert(SK.into(), Attribute::S(sk.to_string()));
            created
        });
        for (name, value) in patch {
            item.insert(name, value);
        }
        Ok(item.clone())
    }

    async fn delete(&self, pk: &str, sk: &str) -> Result<(), StoreError> {
        if let Some(mut partition) = self.partitions.get_mut(pk) {
            partition.remove(sk);
        }
        Ok(())
    }

    async fn query_partition(
        &self,
        pk: &str,
        sk_prefix: Option<&str>,
    ) -> Result<Vec<Item>, StoreError> {
        let Some(partition) = self.partitions.get(pk) else {
            return Ok(Vec::new());
        };
        Ok(partition
            .iter()
            .filter(|(sk, _)| sk_prefix.map_or(true, |prefix| sk.starts_with(prefix)))
            .map(|(_, item)| item.clone())
            .collect())
    }

    async fn query_index(&self, _index: &str, key: &str) -> Result<Vec<Item>, StoreError> {
        let mut matches: Vec<Item> = self
            .partitions
            .iter()
            .flat_map(|partition| {
                partition
                    .values()
                    .filter(|item| {
                        matches!(item.get(GSI1_PK), Some(Attribute::S(index_key)) if index_key == key)
                    })
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .collect();
        sort_by_key_attrs(&mut matches);
        Ok(matches)
    }

    async fn scan(
        &self,
        filter: &ScanFilter,
        limit: Option<usize>,
    ) -> Result<Vec<Item>, StoreError> {
        let mut matches: Vec<Item> = self
            .partitions
            .iter()
            .filter(|partition| {
                filter
                    .pk_prefix
                    .as_deref()
                    .map_or(true, |prefix| partition.key().starts_with(prefix))
            })
            .flat_map(|partition| partition.values().cloned().collect::<Vec<_>>())
            .collect();
        sort_by_key_attrs(&mut matches);
        if let Some(limit) = limit {
            matches.truncate(limit);
        }
        Ok(matches)
    }
}

// DashMap iteration order is arbitrary; keep results deterministic.
fn sort_by_key_attrs(items: &mut [Item]) {
    items.sort_by(|a, b| {
        let key = |item: &Item| {
            (
                item.get(PK).and_then(Attribute::as_str).unwrap_or("").to_string(),
                item.get(SK).and_then(Attribute::as_str).unwrap_or("").to_string(),
            )
        };
        key(a).cmp(&key(b))
    });
}
