//! Core traits for the autolb system
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`InventoryProvider`]: List load balancers and their tags
//! - [`ZoneProvider`]: Read and mutate alias records in a hosted zone
//! - [`ProviderFactory`]: Build both from configuration

pub mod factory;
pub mod inventory;
pub mod zone_provider;

pub use factory::{ProviderFactory, Providers};
pub use inventory::{InventoryProvider, LoadBalancer, Tags};
pub use zone_provider::{AliasRecord, DEFAULT_RECORD_TTL, RecordType, ZoneProvider};
