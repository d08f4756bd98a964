//! Test doubles and common utilities for contract tests
//!
//! The doubles wrap the in-memory providers and add what the in-memory ones
//! cannot do on their own: injected failures, delays and call counters.
//! Counters are shared between clones, so a test keeps one handle and gives
//! the engine another.

#![allow(dead_code)]

use autolb_core::config::{AutolbConfig, EngineConfig, OwnershipScope, ProviderConfig};
use autolb_core::error::{Error, Result};
use autolb_core::memory::{MemoryInventory, MemoryZone};
use autolb_core::traits::{AliasRecord, InventoryProvider, LoadBalancer, Tags, ZoneProvider};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const REGION: &str = "us-east-1";
pub const ZONE: &str = "example.com.";
pub const ZONE_ID: &str = "Z0TEST";
pub const TAG: &str = "autolb";

/// A tagged load balancer whose DNS name is `<name>.elb.test`
pub fn tagged(name: &str) -> LoadBalancer {
    LoadBalancer::new(name, format!("{}.elb.test", name), format!("arn:{}", name))
        .with_tag(TAG, "")
}

/// The record name the engine writes for `name`
pub fn owned_name(name: &str) -> String {
    format!("autolb-{}-{}.{}", REGION, name, ZONE)
}

/// An inventory that can fail or stall on demand
#[derive(Clone, Default)]
pub struct ScriptedInventory {
    pub inner: MemoryInventory,
    /// Fail this many upcoming list calls
    fail_lists: Arc<AtomicUsize>,
    /// Fail every list call with a configuration error
    misconfigured: Arc<AtomicBool>,
    /// Resource refs whose tag lookup fails with a transient error
    failing_tags: Arc<Mutex<HashSet<String>>>,
    /// Resource refs whose tag lookup reports the load balancer as gone
    vanished: Arc<Mutex<HashSet<String>>>,
    /// Delay before answering list calls
    list_delay: Arc<Mutex<Option<Duration>>>,
    list_calls: Arc<AtomicUsize>,
    tag_calls: Arc<AtomicUsize>,
}

impl ScriptedInventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn with(load_balancers: Vec<LoadBalancer>) -> Self {
        let inventory = Self::new();
        for lb in load_balancers {
            inventory.inner.add(lb).await;
        }
        inventory
    }

    pub fn fail_next_lists(&self, count: usize) {
        self.fail_lists.store(count, Ordering::SeqCst);
    }

    pub fn reject_credentials(&self) {
        self.misconfigured.store(true, Ordering::SeqCst);
    }

    pub fn fail_tags_for(&self, resource_ref: &str) {
        self.failing_tags.lock().unwrap().insert(resource_ref.to_string());
    }

    pub fn vanish_during_lookup(&self, resource_ref: &str) {
        self.vanished.lock().unwrap().insert(resource_ref.to_string());
    }

    pub fn delay_lists(&self, delay: Duration) {
        *self.list_delay.lock().unwrap() = Some(delay);
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn tag_calls(&self) -> usize {
        self.tag_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl InventoryProvider for ScriptedInventory {
    async fn list_load_balancers(&self) -> Result<Vec<LoadBalancer>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);

        let delay = *self.list_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.misconfigured.load(Ordering::SeqCst) {
            return Err(Error::config("describe load balancers: no credentials configured"));
        }

        let remaining = self.fail_lists.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_lists.store(remaining - 1, Ordering::SeqCst);
            return Err(Error::transient("describe load balancers: connection reset"));
        }

        self.inner.list_load_balancers().await
    }

    async fn get_tags(&self, resource_ref: &str) -> Result<Tags> {
        self.tag_calls.fetch_add(1, Ordering::SeqCst);

        if self.failing_tags.lock().unwrap().contains(resource_ref) {
            return Err(Error::transient(format!("describe tags {}: throttled", resource_ref)));
        }
        if self.vanished.lock().unwrap().contains(resource_ref) {
            return Err(Error::not_found(format!("Load balancer not found: {}", resource_ref)));
        }

        self.inner.get_tags(resource_ref).await
    }

    fn provider_name(&self) -> &'static str {
        "scripted"
    }
}

/// A zone that counts mutations and can reject individual records
#[derive(Clone)]
pub struct RecordingZone {
    pub inner: MemoryZone,
    /// Record names whose mutations fail
    failing_records: Arc<Mutex<HashSet<String>>>,
    upsert_calls: Arc<AtomicUsize>,
    delete_calls: Arc<AtomicUsize>,
}

impl RecordingZone {
    /// A store holding the test zone, empty
    pub async fn new() -> Self {
        Self {
            inner: MemoryZone::with_zone(ZONE, ZONE_ID).await,
            failing_records: Arc::new(Mutex::new(HashSet::new())),
            upsert_calls: Arc::new(AtomicUsize::new(0)),
            delete_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A store with no zones at all
    pub fn without_zone() -> Self {
        Self {
            inner: MemoryZone::new(),
            failing_records: Arc::new(Mutex::new(HashSet::new())),
            upsert_calls: Arc::new(AtomicUsize::new(0)),
            delete_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub async fn seed(&self, record_name: &str, target: &str) {
        self.inner
            .insert(ZONE_ID, AliasRecord::new(record_name, target).with_ttl(300))
            .await;
    }

    pub fn fail_record(&self, record_name: &str) {
        self.failing_records.lock().unwrap().insert(record_name.to_string());
    }

    pub fn heal(&self) {
        self.failing_records.lock().unwrap().clear();
    }

    pub async fn records(&self) -> Vec<AliasRecord> {
        self.inner.records(ZONE_ID).await
    }

    pub async fn target_of(&self, record_name: &str) -> Option<String> {
        self.records()
            .await
            .into_iter()
            .find(|r| r.record_name == record_name)
            .map(|r| r.target)
    }

    pub fn upsert_calls(&self) -> usize {
        self.upsert_calls.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    pub fn mutation_calls(&self) -> usize {
        self.upsert_calls() + self.delete_calls()
    }

    fn check(&self, record_name: &str) -> Result<()> {
        if self.failing_records.lock().unwrap().contains(record_name) {
            return Err(Error::provider("recording", format!("change rejected for {}", record_name)));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl ZoneProvider for RecordingZone {
    async fn find_zone_id(&self, zone_name: &str) -> Result<String> {
        self.inner.find_zone_id(zone_name).await
    }

    async fn list_records(&self, zone_id: &str) -> Result<Vec<AliasRecord>> {
        self.inner.list_records(zone_id).await
    }

    async fn upsert_record(&self, zone_id: &str, record_name: &str, target: &str, ttl: u32) -> Result<()> {
        self.upsert_calls.fetch_add(1, Ordering::SeqCst);
        self.check(record_name)?;
        self.inner.upsert_record(zone_id, record_name, target, ttl).await
    }

    async fn delete_record(&self, zone_id: &str, record: &AliasRecord) -> Result<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.check(&record.record_name)?;
        self.inner.delete_record(zone_id, record).await
    }

    fn provider_name(&self) -> &'static str {
        "recording"
    }
}

/// Helper to create a minimal AutolbConfig for testing
pub fn minimal_config() -> AutolbConfig {
    AutolbConfig {
        region: REGION.to_string(),
        zone_name: ZONE.to_string(),
        tag_key: TAG.to_string(),
        provider: ProviderConfig::Custom {
            factory: "memory".to_string(),
            config: serde_json::json!({}),
        },
        engine: EngineConfig {
            poll_interval_secs: 1,
            io_timeout_secs: 1,
            record_ttl: 300,
            ownership: OwnershipScope::Global,
            event_channel_capacity: 100,
        },
    }
}
