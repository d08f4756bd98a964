//! Reconciliation: diff tagged load balancers against owned alias records
//!
//! [`reconcile`] is a pure function. It performs no I/O, holds no state and
//! cannot fail; the poll loop gathers its inputs and applies its output.
//!
//! ## Matching
//!
//! A load balancer and a record correspond when the record's `target` equals
//! the load balancer's `dns_name` (ASCII case and a trailing dot ignored).
//! Record names are not compared: the DNS name is the routable endpoint, so a
//! record pointing at it is correct no matter what it is called.
//!
//! ```text
//!   tagged load balancers            owned alias records
//!   ┌──────────────────┐             ┌──────────────────┐
//!   │ web  → a.elb     │── match ───▶│ … → a.elb        │  in sync
//!   │ api  → b.elb     │── none ────▶│                  │  to_create
//!   └──────────────────┘             │ … → gone.elb     │  to_delete
//!                                    └──────────────────┘
//! ```
//!
//! ## Guarantees
//!
//! - Same inputs, same plan (sets are ordered)
//! - Applying the plan and reconciling again yields an empty plan
//! - A record without the ownership prefix never appears in the plan
//!
//! ## Name collisions
//!
//! Because matching ignores names, an owned record called after load balancer
//! `old` may legitimately serve load balancer `renamed`. If `old` is tagged
//! too, creating its record would overwrite the only record `renamed` has.
//! [`ReconciliationPlan::hold_back_collisions`] moves such creates into
//! `collisions`; they stay there until the occupying record is released.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::naming::{NamingPolicy, is_owned, names_match};
use crate::traits::{AliasRecord, LoadBalancer};

/// A load balancer that needs an alias record
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlannedAlias {
    /// Load balancer name (becomes part of the record name)
    pub load_balancer_name: String,
    /// Load balancer DNS name (becomes the record target)
    pub dns_name: String,
}

impl PlannedAlias {
    /// Create a planned alias
    pub fn new(load_balancer_name: impl Into<String>, dns_name: impl Into<String>) -> Self {
        Self {
            load_balancer_name: load_balancer_name.into(),
            dns_name: dns_name.into(),
        }
    }
}

/// A planned create whose record name is taken by a record serving another
/// load balancer
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NameCollision {
    /// The record name both load balancers map to
    pub record_name: String,
    /// Load balancer that wanted the record
    pub load_balancer_name: String,
    /// DNS name the record would have pointed at
    pub dns_name: String,
    /// Load balancer the existing record serves
    pub held_by: String,
    /// Current target of the existing record
    pub current_target: String,
}

/// Creates and deletes needed to converge the zone
///
/// Recomputed from live state every cycle and never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationPlan {
    /// Tagged load balancers with no owned record pointing at them
    pub to_create: BTreeSet<PlannedAlias>,
    /// Owned records pointing at no tagged load balancer
    pub to_delete: BTreeSet<AliasRecord>,
    /// Tagged load balancers that already have a record (informational)
    pub in_sync: BTreeSet<String>,
    /// Creates withheld because their record name is in use
    #[serde(default)]
    pub collisions: BTreeSet<NameCollision>,
}

impl ReconciliationPlan {
    /// Whether the zone is already converged
    pub fn is_empty(&self) -> bool {
        self.to_create.is_empty() && self.to_delete.is_empty()
    }

    /// Number of mutations the plan requires
    pub fn mutation_count(&self) -> usize {
        self.to_create.len() + self.to_delete.len()
    }

    /// Withhold creates whose record name is occupied by a record that stays
    ///
    /// A record occupies a name when it is owned, matches the name, and is not
    /// scheduled for deletion (it serves a tagged load balancer). Occupants
    /// that are being deleted free their name: that is the replaced load
    /// balancer case and the create proceeds.
    pub fn hold_back_collisions(
        &mut self,
        load_balancers: &[LoadBalancer],
        owned_aliases: &[AliasRecord],
        naming: &NamingPolicy,
    ) {
        let planned = std::mem::take(&mut self.to_create);

        for alias in planned {
            let record_name = naming.fqdn(&alias.load_balancer_name);
            let occupant = owned_aliases.iter().find(|record| {
                is_owned(&record.record_name)
                    && names_match(&record.record_name, &record_name)
                    && !self.to_delete.contains(*record)
            });

            match occupant {
                Some(record) => {
                    let held_by = load_balancers
                        .iter()
                        .find(|lb| {
                            self.in_sync.contains(&lb.name) && names_match(&lb.dns_name, &record.target)
                        })
                        .map(|lb| lb.name.clone())
                        .unwrap_or_default();

                    self.collisions.insert(NameCollision {
                        record_name,
                        load_balancer_name: alias.load_balancer_name,
                        dns_name: alias.dns_name,
                        held_by,
                        current_target: record.target.clone(),
                    });
                }
                None => {
                    self.to_create.insert(alias);
                }
            }
        }
    }
}

/// Compute the plan for one cycle
///
/// # Parameters
///
/// - `load_balancers`: Current inventory, with tags filled in. Only entries
///   carrying `tag_key` (with any value) participate; entries without a name
///   or DNS name are ignored.
/// - `owned_aliases`: Alias records selected by the naming policy. Records
///   without the ownership prefix are ignored even if passed in.
/// - `tag_key`: The marker tag key
pub fn reconcile(
    load_balancers: &[LoadBalancer],
    owned_aliases: &[AliasRecord],
    tag_key: &str,
) -> ReconciliationPlan {
    let tagged: Vec<&LoadBalancer> = load_balancers
        .iter()
        .filter(|lb| lb.has_tag(tag_key))
        .filter(|lb| !lb.name.is_empty() && !lb.dns_name.is_empty())
        .collect();

    let owned: Vec<&AliasRecord> = owned_aliases
        .iter()
        .filter(|record| is_owned(&record.record_name))
        .collect();

    let mut plan = ReconciliationPlan::default();

    // Match pass
    for lb in &tagged {
        let has_record = owned
            .iter()
            .any(|record| names_match(&record.target, &lb.dns_name));
        if has_record {
            plan.in_sync.insert(lb.name.clone());
        } else {
            plan.to_create
                .insert(PlannedAlias::new(lb.name.clone(), lb.dns_name.clone()));
        }
    }

    // Cleanup pass
    for record in owned {
        let has_load_balancer = tagged
            .iter()
            .any(|lb| names_match(&lb.dns_name, &record.target));
        if !has_load_balancer {
            plan.to_delete.insert(record.clone());
        }
    }

    plan
}
