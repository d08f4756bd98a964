// # autolb-core
//
// Core library for keeping load balancer alias records in a DNS zone.
//
// ## Architecture Overview
//
// This library provides the core functionality for alias reconciliation:
// - **InventoryProvider**: Trait for listing load balancers and their tags
// - **ZoneProvider**: Trait for reading and changing CNAME records in a zone
// - **reconcile**: Pure diff of tagged load balancers against owned records
// - **AutolbEngine**: Poll loop that gathers, reconciles and applies
// - **ProviderRegistry**: Plugin-based registry for provider backends
//
// ## Design Principles
//
// 1. **Separation of Concerns**: The diff is pure; I/O lives in providers
// 2. **Ownership Prefix**: Only `autolb-` records are ever changed
// 3. **Plugin-Based**: Providers are registered dynamically, no hard-coded if-else
// 4. **Library-First**: All core functionality can be used as a library
// 5. **Stateless**: The zone is the source of truth; nothing persists between cycles

pub mod traits;
pub mod engine;
pub mod reconcile;
pub mod naming;
pub mod registry;
pub mod config;
pub mod error;
pub mod memory;

// Re-export core types for convenience
pub use traits::{AliasRecord, InventoryProvider, LoadBalancer, ProviderFactory, Providers, ZoneProvider};
pub use engine::{AutolbEngine, CycleReport, EngineEvent};
pub use reconcile::{NameCollision, PlannedAlias, ReconciliationPlan, reconcile};
pub use naming::NamingPolicy;
pub use registry::ProviderRegistry;
pub use config::{AutolbConfig, EngineConfig, OwnershipScope, ProviderConfig, parse_interval};
pub use error::{Error, Result};
pub use memory::{MemoryInventory, MemoryZone};
