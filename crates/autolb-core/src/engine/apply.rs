//! Plan application
//!
//! Deletes run before upserts so that a stale record reusing the canonical
//! name of a replaced load balancer is gone before the new value is written.
//! Each mutation is independent: a failure is logged, reported and skipped.
//! Nothing is retried here; the next cycle recomputes the plan from the zone.
//!
//! Creates withheld for a name collision are never sent to the zone. They
//! are reported as failed upserts so the conflict shows up every cycle until
//! an operator renames one of the load balancers or removes a tag.

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use super::{AutolbEngine, EngineEvent, with_timeout};
use crate::reconcile::ReconciliationPlan;

/// Kind of zone mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationKind {
    /// Create-or-replace
    Upsert,
    /// Exact-match delete
    Delete,
}

impl std::fmt::Display for MutationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MutationKind::Upsert => f.write_str("upsert"),
            MutationKind::Delete => f.write_str("delete"),
        }
    }
}

/// One mutation that did not go through
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationFailure {
    /// What was attempted
    pub operation: MutationKind,
    /// The record it targeted
    pub record_name: String,
    /// The load balancer it was for (upserts only)
    pub load_balancer: Option<String>,
    /// Provider error message
    pub error: String,
}

/// Outcome of applying one plan
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyReport {
    /// Record names upserted
    pub created: Vec<String>,
    /// Record names deleted
    pub deleted: Vec<String>,
    /// Mutations that failed
    pub failures: Vec<MutationFailure>,
}

impl AutolbEngine {
    /// Apply a plan against the zone
    ///
    /// Never fails as a whole; per-record errors end up in
    /// [`ApplyReport::failures`].
    pub(crate) async fn apply_plan(&self, zone_id: &str, plan: &ReconciliationPlan) -> ApplyReport {
        let mut report = ApplyReport::default();

        for record in &plan.to_delete {
            let result = with_timeout(
                self.io_timeout,
                "delete_record",
                self.zone.delete_record(zone_id, record),
            )
            .await;

            match result {
                Ok(()) => {
                    info!(
                        record = %record.record_name,
                        target = %record.target,
                        "Deleted alias record with no tagged load balancer"
                    );
                    self.emit_event(EngineEvent::RecordDeleted {
                        record_name: record.record_name.clone(),
                        target: record.target.clone(),
                    });
                    report.deleted.push(record.record_name.clone());
                }
                Err(e) => {
                    error!(
                        record = %record.record_name,
                        target = %record.target,
                        operation = %MutationKind::Delete,
                        "Failed to delete alias record: {}",
                        e
                    );
                    self.record_failure(
                        &mut report,
                        MutationKind::Delete,
                        &record.record_name,
                        None,
                        e.to_string(),
                    );
                }
            }
        }

        for alias in &plan.to_create {
            let record_name = self.naming.fqdn(&alias.load_balancer_name);
            let result = with_timeout(
                self.io_timeout,
                "upsert_record",
                self.zone
                    .upsert_record(zone_id, &record_name, &alias.dns_name, self.record_ttl),
            )
            .await;

            match result {
                Ok(()) => {
                    info!(
                        record = %record_name,
                        load_balancer = %alias.load_balancer_name,
                        target = %alias.dns_name,
                        "Upserted alias record"
                    );
                    self.emit_event(EngineEvent::RecordCreated {
                        record_name: record_name.clone(),
                        load_balancer: alias.load_balancer_name.clone(),
                        target: alias.dns_name.clone(),
                    });
                    report.created.push(record_name);
                }
                Err(e) => {
                    error!(
                        record = %record_name,
                        load_balancer = %alias.load_balancer_name,
                        operation = %MutationKind::Upsert,
                        "Failed to upsert alias record: {}",
                        e
                    );
                    self.record_failure(
                        &mut report,
                        MutationKind::Upsert,
                        &record_name,
                        Some(&alias.load_balancer_name),
                        e.to_string(),
                    );
                }
            }
        }

        for collision in &plan.collisions {
            warn!(
                record = %collision.record_name,
                load_balancer = %collision.load_balancer_name,
                held_by = %collision.held_by,
                current_target = %collision.current_target,
                "Not upserting alias record for '{}': the name already serves load balancer '{}'",
                collision.load_balancer_name,
                collision.held_by
            );
            self.record_failure(
                &mut report,
                MutationKind::Upsert,
                &collision.record_name,
                Some(&collision.load_balancer_name),
                format!(
                    "record name already points at {} for load balancer '{}'",
                    collision.current_target, collision.held_by
                ),
            );
        }

        report
    }

    fn record_failure(
        &self,
        report: &mut ApplyReport,
        operation: MutationKind,
        record_name: &str,
        load_balancer: Option<&str>,
        error: String,
    ) {
        let failure = MutationFailure {
            operation,
            record_name: record_name.to_string(),
            load_balancer: load_balancer.map(str::to_string),
            error,
        };
        self.emit_event(EngineEvent::MutationFailed(failure.clone()));
        report.failures.push(failure);
    }
}
