//! Naming policy for managed alias records
//!
//! Every record this system creates is named
//! `autolb-<region>-<load balancer name>.<zone>.` and the `autolb-` prefix is
//! the only ownership marker: records without it are never touched.
//!
//! Load balancer names are passed through unescaped. A name that is not a
//! valid DNS label produces an invalid record name, which the zone provider
//! rejects; that mutation then fails on its own without affecting others.

use crate::config::OwnershipScope;

/// Prefix marking a record as created and manageable by this system
pub const OWNERSHIP_PREFIX: &str = "autolb-";

/// Canonical (unqualified) record name for a load balancer
///
/// ```
/// use autolb_core::naming::canonical_name;
///
/// assert_eq!(canonical_name("us-east-1", "web"), "autolb-us-east-1-web");
/// ```
pub fn canonical_name(region: &str, load_balancer_name: &str) -> String {
    format!("{}{}-{}", OWNERSHIP_PREFIX, region, load_balancer_name)
}

/// Whether a record name carries the ownership prefix
///
/// Only the first label is inspected, so `www.autolb-x.example.com.` is not
/// owned.
pub fn is_owned(record_name: &str) -> bool {
    record_name.starts_with(OWNERSHIP_PREFIX)
}

/// Normalize a zone name to its fully-qualified form (single trailing dot)
pub fn qualify_zone(zone_name: &str) -> String {
    format!("{}.", zone_name.trim_end_matches('.'))
}

/// Whether two DNS names are equal, ignoring ASCII case and a trailing dot
///
/// Used for zone names, record names and record targets alike.
pub fn names_match(a: &str, b: &str) -> bool {
    a.trim_end_matches('.')
        .eq_ignore_ascii_case(b.trim_end_matches('.'))
}

/// Naming policy bound to one region and zone
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingPolicy {
    region: String,
    zone: String,
    scope: OwnershipScope,
}

impl NamingPolicy {
    /// Create a policy for a region and zone
    pub fn new(region: impl Into<String>, zone_name: &str, scope: OwnershipScope) -> Self {
        Self {
            region: region.into(),
            zone: qualify_zone(zone_name),
            scope,
        }
    }

    /// The fully-qualified zone name, with trailing dot
    pub fn zone(&self) -> &str {
        &self.zone
    }

    /// The region used in record names
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Fully-qualified record name for a load balancer
    pub fn fqdn(&self, load_balancer_name: &str) -> String {
        format!("{}.{}", canonical_name(&self.region, load_balancer_name), self.zone)
    }

    /// Whether a record belongs to this system under the configured scope
    pub fn owns(&self, record_name: &str) -> bool {
        match self.scope {
            OwnershipScope::Global => is_owned(record_name),
            OwnershipScope::Region => {
                record_name.starts_with(&format!("{}{}-", OWNERSHIP_PREFIX, self.region))
            }
        }
    }
}
