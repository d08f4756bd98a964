//! Plugin-based provider registry
//!
//! The registry allows provider factories to be registered dynamically at
//! runtime, so the daemon picks a backend by name instead of through
//! hard-coded branches.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use autolb_core::registry::ProviderRegistry;
//!
//! let registry = ProviderRegistry::new();
//! autolb_provider_aws::register(&registry);
//!
//! let providers = registry.create_providers(&config).await?;
//! ```

use crate::config::AutolbConfig;
use crate::error::{Error, Result};
use crate::traits::{ProviderFactory, Providers};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Provider registry for plugin-based provider creation
///
/// ## Thread Safety
///
/// The registry uses interior mutability with RwLock, allowing concurrent
/// reads and exclusive writes. Factories are reference-counted so the lock is
/// released before their async `create` runs.
#[derive(Default)]
pub struct ProviderRegistry {
    /// Registered provider factories
    providers: RwLock<HashMap<String, Arc<dyn ProviderFactory>>>,
}

impl ProviderRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider factory
    ///
    /// # Parameters
    ///
    /// - `name`: Provider type name (e.g., "aws")
    /// - `factory`: Factory object for creating provider instances
    pub fn register_provider(&self, name: impl Into<String>, factory: Box<dyn ProviderFactory>) {
        let name = name.into();
        let mut providers = self
            .providers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        providers.insert(name, Arc::from(factory));
    }

    /// Create the provider pair named by `config.provider`
    ///
    /// # Returns
    ///
    /// - `Ok(Providers)`: Created inventory and zone providers
    /// - `Err(Error)`: If the provider type is not registered or creation fails
    pub async fn create_providers(&self, config: &AutolbConfig) -> Result<Providers> {
        let provider_type = config.provider.type_name();

        let factory = {
            let providers = self
                .providers
                .read()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            providers
                .get(provider_type)
                .cloned()
                .ok_or_else(|| Error::config(format!("Unknown provider type: {}", provider_type)))?
        };

        factory.create(config).await
    }

    /// List all registered provider types
    pub fn list_providers(&self) -> Vec<String> {
        let providers = self
            .providers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut names: Vec<String> = providers.keys().cloned().collect();
        names.sort();
        names
    }

    /// Check if a provider type is registered
    pub fn has_provider(&self, name: &str) -> bool {
        let providers = self
            .providers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        providers.contains_key(name)
    }
}
