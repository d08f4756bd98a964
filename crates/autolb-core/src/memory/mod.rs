// # In-Memory Providers
//
// In-memory implementations of InventoryProvider and ZoneProvider.
//
// ## Purpose
//
// Lets the engine run without a cloud account: contract tests, embedding,
// and local experiments. Both types are cheap to clone and share state
// between clones, so a test can keep a handle while the engine owns another.
//
// ## Zone Semantics
//
// `MemoryZone` mirrors how hosted DNS zones treat changes:
// - Upsert creates or replaces the record with the given name
// - Delete must name the current target and TTL; a mismatch is `NotFound`
//   and leaves the record in place

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::naming::{names_match, qualify_zone};
use crate::traits::{AliasRecord, InventoryProvider, LoadBalancer, Tags, ZoneProvider};
use crate::Error;

/// In-memory load balancer inventory
///
/// # Example
///
/// ```rust,no_run
/// use autolb_core::memory::MemoryInventory;
/// use autolb_core::traits::{InventoryProvider, LoadBalancer};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let inventory = MemoryInventory::new();
///     inventory
///         .add(LoadBalancer::new("web", "web-1.elb.test", "arn:web").with_tag("autolb", ""))
///         .await;
///
///     let tags = inventory.get_tags("arn:web").await?;
///     assert!(tags.contains_key("autolb"));
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryInventory {
    inner: Arc<RwLock<BTreeMap<String, LoadBalancer>>>,
}

impl MemoryInventory {
    /// Create an empty inventory
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a load balancer (keyed by name)
    pub async fn add(&self, load_balancer: LoadBalancer) {
        let mut guard = self.inner.write().await;
        guard.insert(load_balancer.name.clone(), load_balancer);
    }

    /// Remove a load balancer by name
    pub async fn remove(&self, name: &str) -> Option<LoadBalancer> {
        self.inner.write().await.remove(name)
    }

    /// Replace the tags of a load balancer
    pub async fn set_tags(&self, name: &str, tags: Tags) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        let lb = guard
            .get_mut(name)
            .ok_or_else(|| Error::not_found(format!("Load balancer not found: {}", name)))?;
        lb.tags = tags;
        Ok(())
    }

    /// Number of load balancers
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Check if the inventory is empty
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[async_trait]
impl InventoryProvider for MemoryInventory {
    async fn list_load_balancers(&self) -> Result<Vec<LoadBalancer>, Error> {
        let guard = self.inner.read().await;
        Ok(guard
            .values()
            .map(|lb| LoadBalancer::new(&lb.name, &lb.dns_name, &lb.resource_ref))
            .collect())
    }

    async fn get_tags(&self, resource_ref: &str) -> Result<Tags, Error> {
        let guard = self.inner.read().await;
        guard
            .values()
            .find(|lb| lb.resource_ref == resource_ref)
            .map(|lb| lb.tags.clone())
            .ok_or_else(|| Error::not_found(format!("Load balancer not found: {}", resource_ref)))
    }

    fn provider_name(&self) -> &'static str {
        "memory"
    }
}

#[derive(Debug, Default)]
struct ZoneState {
    /// Qualified zone name -> zone id
    zones: HashMap<String, String>,
    /// Zone id -> record name -> record
    records: HashMap<String, BTreeMap<String, AliasRecord>>,
}

/// In-memory hosted zones
#[derive(Debug, Clone, Default)]
pub struct MemoryZone {
    inner: Arc<RwLock<ZoneState>>,
}

impl MemoryZone {
    /// Create a store with no zones
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding one empty zone
    pub async fn with_zone(zone_name: &str, zone_id: &str) -> Self {
        let zone = Self::new();
        zone.add_zone(zone_name, zone_id).await;
        zone
    }

    /// Add an empty zone
    pub async fn add_zone(&self, zone_name: &str, zone_id: &str) {
        let mut guard = self.inner.write().await;
        guard.zones.insert(qualify_zone(zone_name), zone_id.to_string());
        guard.records.entry(zone_id.to_string()).or_default();
    }

    /// Put a record directly into a zone, bypassing change semantics
    pub async fn insert(&self, zone_id: &str, record: AliasRecord) {
        let mut guard = self.inner.write().await;
        guard
            .records
            .entry(zone_id.to_string())
            .or_default()
            .insert(record.record_name.clone(), record);
    }

    /// Snapshot of a zone's records, ordered by name
    pub async fn records(&self, zone_id: &str) -> Vec<AliasRecord> {
        let guard = self.inner.read().await;
        guard
            .records
            .get(zone_id)
            .map(|records| records.values().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ZoneProvider for MemoryZone {
    async fn find_zone_id(&self, zone_name: &str) -> Result<String, Error> {
        let guard = self.inner.read().await;
        guard
            .zones
            .iter()
            .find(|(name, _)| names_match(name, zone_name))
            .map(|(_, id)| id.clone())
            .ok_or_else(|| Error::not_found(format!("Zone {} not found", zone_name)))
    }

    async fn list_records(&self, zone_id: &str) -> Result<Vec<AliasRecord>, Error> {
        let guard = self.inner.read().await;
        guard
            .records
            .get(zone_id)
            .map(|records| records.values().cloned().collect())
            .ok_or_else(|| Error::not_found(format!("Zone id {} not found", zone_id)))
    }

    async fn upsert_record(
        &self,
        zone_id: &str,
        record_name: &str,
        target: &str,
        ttl: u32,
    ) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        let records = guard
            .records
            .get_mut(zone_id)
            .ok_or_else(|| Error::not_found(format!("Zone id {} not found", zone_id)))?;

        records.insert(
            record_name.to_string(),
            AliasRecord::new(record_name, target).with_ttl(ttl),
        );
        Ok(())
    }

    async fn delete_record(&self, zone_id: &str, record: &AliasRecord) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        let records = guard
            .records
            .get_mut(zone_id)
            .ok_or_else(|| Error::not_found(format!("Zone id {} not found", zone_id)))?;

        let matches = records.get(&record.record_name).is_some_and(|current| {
            current.target == record.target && current.effective_ttl() == record.effective_ttl()
        });
        if !matches {
            return Err(Error::not_found(format!(
                "No record {} -> {} with TTL {}",
                record.record_name,
                record.target,
                record.effective_ttl()
            )));
        }

        records.remove(&record.record_name);
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "memory"
    }
}
