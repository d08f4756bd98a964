//! Core autolb engine (the poll loop)
//!
//! The AutolbEngine is responsible for:
//! - Gathering inventory and zone state once per interval
//! - Selecting the records it owns via the naming policy
//! - Computing the plan with [`reconcile`]
//! - Applying the plan through the ZoneProvider
//!
//! ## Architecture
//!
//! ```text
//!                    ┌──────────────┐
//!                    │ AutolbEngine │── sleep(interval) ──┐
//!                    └──────────────┘                     │
//!                      ▲      │                           │
//!                      └──────┼───────────────────────────┘
//!         ┌───────────────────┼────────────────────┐
//!         ▼                   ▼                    ▼
//! ┌───────────────────┐ ┌──────────────┐  ┌──────────────┐
//! │ InventoryProvider │ │ ZoneProvider │  │    Events    │
//! │ (list, tags)      │ │ (read/write) │  │   (notify)   │
//! └───────────────────┘ └──────────────┘  └──────────────┘
//! ```
//!
//! ## Cycle Flow
//!
//! 1. List load balancers and fetch their tags
//! 2. Resolve the zone and list its CNAME records
//! 3. Keep only owned records, compute the plan
//! 4. Apply deletes, then upserts (per-record failures tolerated)
//! 5. Emit a report, sleep, repeat
//!
//! Any failure in steps 1–2 (including a timeout) aborts the cycle before
//! anything is written: a plan is never computed from partial inventory.
//! Retryable failures are logged and the loop sleeps as usual; a
//! configuration or input error stops the loop and is returned to the caller.
//!
//! A tagged load balancer whose record name is already taken by a record
//! serving another tagged load balancer is not upserted (see
//! [`ReconciliationPlan::hold_back_collisions`]).

mod apply;

pub use apply::{ApplyReport, MutationFailure, MutationKind};

use chrono::{DateTime, Utc};
use std::future::Future;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use crate::config::AutolbConfig;
use crate::error::{Error, Result};
use crate::naming::NamingPolicy;
use crate::reconcile::{ReconciliationPlan, reconcile};
use crate::traits::{AliasRecord, InventoryProvider, LoadBalancer, ZoneProvider};

/// Events emitted by the AutolbEngine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Engine started
    Started {
        zone: String,
        tag_key: String,
    },

    /// A reconciliation cycle began
    CycleStarted {
        started_at: DateTime<Utc>,
    },

    /// An alias record was upserted
    RecordCreated {
        record_name: String,
        load_balancer: String,
        target: String,
    },

    /// A stale alias record was deleted
    RecordDeleted {
        record_name: String,
        target: String,
    },

    /// A single mutation failed (the cycle continued)
    MutationFailed(MutationFailure),

    /// A cycle ran to completion
    CycleCompleted(CycleReport),

    /// A cycle was aborted before applying anything
    CycleAborted {
        reason: String,
    },

    /// Engine stopped
    Stopped {
        reason: String,
    },
}

/// Summary of one completed cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    /// When gathering began
    pub started_at: DateTime<Utc>,
    /// When the last mutation finished
    pub finished_at: DateTime<Utc>,
    /// Load balancers carrying the marker tag
    pub tagged: usize,
    /// Owned records observed in the zone
    pub owned: usize,
    /// Tagged load balancers that already had a record
    pub in_sync: usize,
    /// Result of applying the plan
    pub applied: ApplyReport,
}

impl CycleReport {
    /// Whether every planned mutation went through
    pub fn is_clean(&self) -> bool {
        self.applied.failures.is_empty()
    }
}

/// Core autolb engine
///
/// Owns the injected provider handles and runs one reconciliation cycle per
/// poll interval, strictly sequentially.
///
/// ## Lifecycle
///
/// 1. Create with [`AutolbEngine::new()`]
/// 2. Start with [`AutolbEngine::run()`] or [`AutolbEngine::run_until()`]
/// 3. Engine runs until shutdown; a cycle in progress is finished first
///
/// ## State
///
/// Nothing is carried between cycles except the configuration. The zone is
/// the source of truth, so a missed or failed cycle heals on the next one.
pub struct AutolbEngine {
    /// Load balancer inventory
    inventory: Box<dyn InventoryProvider>,

    /// DNS zone access
    zone: Box<dyn ZoneProvider>,

    /// Record naming and ownership
    naming: NamingPolicy,

    /// Marker tag key
    tag_key: String,

    /// TTL for upserted records
    record_ttl: u32,

    /// Sleep between cycles
    poll_interval: Duration,

    /// Timeout for each provider call
    io_timeout: Duration,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<EngineEvent>,
}

impl AutolbEngine {
    /// Create a new engine
    ///
    /// # Parameters
    ///
    /// - `inventory`: Inventory provider implementation
    /// - `zone`: Zone provider implementation
    /// - `config`: autolb configuration
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where event_receiver yields engine events
    pub fn new(
        inventory: Box<dyn InventoryProvider>,
        zone: Box<dyn ZoneProvider>,
        config: AutolbConfig,
    ) -> Result<(Self, mpsc::Receiver<EngineEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.engine.event_channel_capacity);

        let engine = Self {
            inventory,
            zone,
            naming: NamingPolicy::new(
                config.region.clone(),
                &config.zone_name,
                config.engine.ownership,
            ),
            tag_key: config.tag_key,
            record_ttl: config.engine.record_ttl,
            poll_interval: config.engine.poll_interval(),
            io_timeout: config.engine.io_timeout(),
            event_tx: tx,
        };

        Ok((engine, rx))
    }

    /// Run the poll loop until Ctrl-C
    pub async fn run(&self) -> Result<()> {
        self.run_internal(None).await
    }

    /// Run the poll loop until `shutdown` fires (or its sender is dropped)
    pub async fn run_until(&self, shutdown: oneshot::Receiver<()>) -> Result<()> {
        self.run_internal(Some(shutdown)).await
    }

    async fn run_internal(&self, shutdown_rx: Option<oneshot::Receiver<()>>) -> Result<()> {
        self.emit_event(EngineEvent::Started {
            zone: self.naming.zone().to_string(),
            tag_key: self.tag_key.clone(),
        });
        info!(
            "Reconciling {} every {:?} (marker tag '{}', {} via {})",
            self.naming.zone(),
            self.poll_interval,
            self.tag_key,
            self.inventory.provider_name(),
            self.zone.provider_name()
        );

        let shutdown = async move {
            match shutdown_rx {
                Some(rx) => {
                    let _ = rx.await;
                }
                None => {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        error!("Failed to listen for Ctrl-C: {}", e);
                        std::future::pending::<()>().await;
                    }
                }
            }
        };
        tokio::pin!(shutdown);

        loop {
            if let Err(e) = self.run_cycle_logged().await {
                self.emit_event(EngineEvent::Stopped {
                    reason: e.to_string(),
                });
                return Err(e);
            }

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                _ = &mut shutdown => {
                    info!("Shutdown signal received");
                    self.emit_event(EngineEvent::Stopped {
                        reason: "Shutdown signal".to_string(),
                    });
                    break;
                }
            }
        }

        Ok(())
    }

    /// Run one cycle, turning an error into a log line and an event
    ///
    /// Only errors that will not heal on a later cycle are returned.
    async fn run_cycle_logged(&self) -> Result<()> {
        match self.run_cycle().await {
            Ok(report) => {
                if report.is_clean() {
                    info!(
                        "Cycle complete: {} created, {} deleted, {} in sync",
                        report.applied.created.len(),
                        report.applied.deleted.len(),
                        report.in_sync
                    );
                } else {
                    warn!(
                        "Cycle complete with failures: {} created, {} deleted, {} failed (retried next cycle)",
                        report.applied.created.len(),
                        report.applied.deleted.len(),
                        report.applied.failures.len()
                    );
                }
                self.emit_event(EngineEvent::CycleCompleted(report));
                Ok(())
            }
            Err(e) => {
                self.emit_event(EngineEvent::CycleAborted {
                    reason: e.to_string(),
                });
                if e.is_retryable() {
                    error!("Reconciliation cycle aborted: {}", e);
                    Ok(())
                } else {
                    error!("Reconciliation cycle failed with a fatal error, stopping: {}", e);
                    Err(e)
                }
            }
        }
    }

    /// Run a single fetch-diff-apply cycle
    ///
    /// # Returns
    ///
    /// - `Ok(CycleReport)`: The plan was computed and applied (individual
    ///   mutations may still have failed, see [`CycleReport::is_clean`])
    /// - `Err(Error)`: Gathering failed; nothing was written
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        let started_at = Utc::now();
        self.emit_event(EngineEvent::CycleStarted { started_at });

        let load_balancers = self.fetch_inventory().await?;
        let (zone_id, owned) = self.fetch_owned_records().await?;

        let mut plan = reconcile(&load_balancers, &owned, &self.tag_key);
        plan.hold_back_collisions(&load_balancers, &owned, &self.naming);
        self.log_decisions(&plan);

        let applied = if plan.is_empty() && plan.collisions.is_empty() {
            ApplyReport::default()
        } else {
            self.apply_plan(&zone_id, &plan).await
        };

        Ok(CycleReport {
            started_at,
            finished_at: Utc::now(),
            tagged: load_balancers
                .iter()
                .filter(|lb| lb.has_tag(&self.tag_key))
                .count(),
            owned: owned.len(),
            in_sync: plan.in_sync.len(),
            applied,
        })
    }

    /// List load balancers and attach their tags
    async fn fetch_inventory(&self) -> Result<Vec<LoadBalancer>> {
        let listed = with_timeout(
            self.io_timeout,
            "list_load_balancers",
            self.inventory.list_load_balancers(),
        )
        .await?;

        let mut load_balancers = Vec::with_capacity(listed.len());
        for mut lb in listed {
            match with_timeout(self.io_timeout, "get_tags", self.inventory.get_tags(&lb.resource_ref))
                .await
            {
                Ok(tags) => {
                    lb.tags = tags;
                    load_balancers.push(lb);
                }
                Err(e) if e.is_not_found() => {
                    // Deleted between listing and tag lookup
                    debug!(load_balancer = %lb.name, "Load balancer vanished during tag lookup: {}", e);
                }
                Err(e) => {
                    warn!(load_balancer = %lb.name, "Tag lookup failed: {}", e);
                    return Err(e);
                }
            }
        }

        debug!("Fetched {} load balancer(s)", load_balancers.len());
        Ok(load_balancers)
    }

    /// Resolve the zone and return its id plus the records this engine owns
    async fn fetch_owned_records(&self) -> Result<(String, Vec<AliasRecord>)> {
        let zone_id = with_timeout(
            self.io_timeout,
            "find_zone_id",
            self.zone.find_zone_id(self.naming.zone()),
        )
        .await?;

        let records = with_timeout(self.io_timeout, "list_records", self.zone.list_records(&zone_id))
            .await?;

        let total = records.len();
        let owned: Vec<AliasRecord> = records
            .into_iter()
            .filter(|record| self.naming.owns(&record.record_name))
            .collect();

        debug!(
            zone = %self.naming.zone(),
            "Zone has {} CNAME record(s), {} owned",
            total,
            owned.len()
        );
        Ok((zone_id, owned))
    }

    fn log_decisions(&self, plan: &ReconciliationPlan) {
        for name in &plan.in_sync {
            debug!(load_balancer = %name, "Alias record present, skipping");
        }
        for alias in &plan.to_create {
            info!(
                load_balancer = %alias.load_balancer_name,
                target = %alias.dns_name,
                "Tagged load balancer has no alias record"
            );
        }
        for record in &plan.to_delete {
            info!(
                record = %record.record_name,
                target = %record.target,
                "No tagged load balancer for alias record"
            );
        }
    }

    /// Emit an engine event
    ///
    /// # Parameters
    ///
    /// - `event`: The event to emit
    fn emit_event(&self, event: EngineEvent) {
        if self.event_tx.try_send(event).is_err() {
            warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
        }
    }
}

/// Await a provider call, failing with [`Error::Timeout`] after `timeout`
pub(crate) async fn with_timeout<T, F>(timeout: Duration, operation: &str, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(Error::timeout(operation, timeout)),
    }
}
