// # Zone Provider Trait
//
// Defines the interface for reading and mutating alias records in a
// hosted DNS zone.
//
// ## Implementations
//
// - AWS Route53: `autolb-provider-aws` crate
// - In-memory: `autolb_core::memory::MemoryZone`
//
// ## Usage
//
// ```rust,ignore
// use autolb_core::ZoneProvider;
//
// #[tokio::main]
// async fn main() -> autolb_core::Result<()> {
//     let zone = /* ZoneProvider implementation */;
//
//     let zone_id = zone.find_zone_id("example.com.").await?;
//     zone.upsert_record(
//         &zone_id,
//         "autolb-us-east-1-web.example.com.",
//         "web-123.us-east-1.elb.amazonaws.com",
//         300,
//     ).await?;
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// TTL applied to every managed record (seconds)
pub const DEFAULT_RECORD_TTL: u32 = 300;

/// DNS record kind managed by this system
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordType {
    /// Alias mapping one name to another
    #[default]
    Cname,
}

impl std::fmt::Display for RecordType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordType::Cname => f.write_str("CNAME"),
        }
    }
}

/// An alias record observed in (or written to) the zone
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AliasRecord {
    /// Fully-qualified record name, e.g. `autolb-us-east-1-web.example.com.`
    pub record_name: String,
    /// The name the record points at
    pub target: String,
    /// Record kind
    #[serde(default)]
    pub record_type: RecordType,
    /// TTL as observed in the zone, if the provider reports one
    #[serde(default)]
    pub ttl: Option<u32>,
}

impl AliasRecord {
    /// Create a CNAME alias record with no observed TTL
    pub fn new(record_name: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            record_name: record_name.into(),
            target: target.into(),
            record_type: RecordType::Cname,
            ttl: None,
        }
    }

    /// Set the observed TTL
    pub fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// TTL to send with an exact-match delete
    pub fn effective_ttl(&self) -> u32 {
        self.ttl.unwrap_or(DEFAULT_RECORD_TTL)
    }
}

/// Trait for DNS zone provider implementations
///
/// # Trust Level: Untrusted
///
/// Zone providers execute single API calls on behalf of the engine:
///
/// - ✅ Look up zones, list records, submit one change per call
/// - ✅ Return success or failure (the engine logs and moves on)
/// - ❌ Decide whether a change is needed (owned by `reconcile`)
/// - ❌ Retry, back off or sleep (owned by `AutolbEngine`)
/// - ❌ Touch records other than the one named in the call
#[async_trait]
pub trait ZoneProvider: Send + Sync {
    /// Resolve a zone name to the provider's zone identifier
    ///
    /// The match is exact (a trailing dot on either side is ignored).
    ///
    /// # Returns
    ///
    /// - `Ok(String)`: The zone identifier
    /// - `Err(Error::NotFound)`: No zone with exactly this name exists
    async fn find_zone_id(&self, zone_name: &str) -> Result<String, crate::Error>;

    /// List the CNAME records of a zone
    ///
    /// Implementations must return every record (following pagination)
    /// or an error. Records of other types are omitted.
    async fn list_records(&self, zone_id: &str) -> Result<Vec<AliasRecord>, crate::Error>;

    /// Create the record, or replace its value if it already exists
    ///
    /// # Idempotency
    ///
    /// Calling this twice with the same arguments must succeed both times.
    async fn upsert_record(
        &self,
        zone_id: &str,
        record_name: &str,
        target: &str,
        ttl: u32,
    ) -> Result<(), crate::Error>;

    /// Delete exactly this record
    ///
    /// The delete names the current target (and TTL) so that a record whose
    /// value changed since it was listed is left alone and reported as an
    /// error instead.
    async fn delete_record(&self, zone_id: &str, record: &AliasRecord)
        -> Result<(), crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}
