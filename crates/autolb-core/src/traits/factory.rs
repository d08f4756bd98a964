// # Provider Factory Trait
//
// Constructs an inventory/zone provider pair from configuration. Factories
// are registered by name in the `ProviderRegistry`.

use async_trait::async_trait;

use super::{InventoryProvider, ZoneProvider};
use crate::config::AutolbConfig;

/// The two provider handles the engine needs
pub struct Providers {
    /// Load balancer inventory
    pub inventory: Box<dyn InventoryProvider>,
    /// DNS zone access
    pub zone: Box<dyn ZoneProvider>,
}

/// Helper trait for constructing providers from configuration
///
/// Creation is async because cloud SDKs resolve credentials and regions
/// while building their clients.
#[async_trait]
pub trait ProviderFactory: Send + Sync {
    /// Create the provider pair
    ///
    /// # Parameters
    ///
    /// - `config`: Full configuration (region and provider settings)
    async fn create(&self, config: &AutolbConfig) -> Result<Providers, crate::Error>;
}
