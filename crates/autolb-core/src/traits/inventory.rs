// # Inventory Provider Trait
//
// Defines the interface for listing load balancers and their tags.
//
// ## Implementations
//
// - AWS ELBv2: `autolb-provider-aws` crate
// - In-memory: `autolb_core::memory::MemoryInventory`
//
// ## Usage
//
// ```rust,ignore
// use autolb_core::InventoryProvider;
//
// #[tokio::main]
// async fn main() -> autolb_core::Result<()> {
//     let inventory = /* InventoryProvider implementation */;
//
//     for lb in inventory.list_load_balancers().await? {
//         let tags = inventory.get_tags(&lb.resource_ref).await?;
//         println!("{} -> {} ({} tags)", lb.name, lb.dns_name, tags.len());
//     }
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Tags attached to a load balancer, keyed by tag key
pub type Tags = BTreeMap<String, String>;

/// Snapshot of one provisioned load balancer
///
/// Fetched once per reconciliation cycle and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadBalancer {
    /// Load balancer name, unique within the account and region
    pub name: String,
    /// Provider-assigned public hostname; the target of any alias
    pub dns_name: String,
    /// Provider resource identifier used for tag lookups (an ARN on AWS)
    pub resource_ref: String,
    /// Tags as returned by [`InventoryProvider::get_tags`]
    #[serde(default)]
    pub tags: Tags,
}

impl LoadBalancer {
    /// Create a load balancer snapshot without tags
    pub fn new(
        name: impl Into<String>,
        dns_name: impl Into<String>,
        resource_ref: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            dns_name: dns_name.into(),
            resource_ref: resource_ref.into(),
            tags: Tags::new(),
        }
    }

    /// Attach a tag
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Whether the marker tag is present
    ///
    /// Only the presence of the key matters; its value is ignored.
    pub fn has_tag(&self, tag_key: &str) -> bool {
        self.tags.contains_key(tag_key)
    }
}

/// Trait for load balancer inventory implementations
///
/// # Trust Level: Untrusted
///
/// Inventory providers only talk to their own API:
///
/// - ✅ List load balancers and read their tags
/// - ✅ Return success or failure (the poll loop retries next cycle)
/// - ❌ Retry, back off or sleep (owned by `AutolbEngine`)
/// - ❌ Cache results across calls (each cycle must see live state)
/// - ❌ Spawn background tasks
///
/// Implementations that receive partial records from their API (missing
/// name or DNS name) must skip them rather than invent values.
#[async_trait]
pub trait InventoryProvider: Send + Sync {
    /// List every load balancer visible to this provider
    ///
    /// The returned snapshots carry no tags; the engine fills them in via
    /// [`InventoryProvider::get_tags`]. Implementations must return the
    /// complete list (following pagination) or an error, never a prefix.
    async fn list_load_balancers(&self) -> Result<Vec<LoadBalancer>, crate::Error>;

    /// Fetch the tags of one load balancer
    ///
    /// # Parameters
    ///
    /// - `resource_ref`: The load balancer's [`LoadBalancer::resource_ref`]
    async fn get_tags(&self, resource_ref: &str) -> Result<Tags, crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}
