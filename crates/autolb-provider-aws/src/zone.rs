//! Route53 hosted zone access
//!
//! Only single-value CNAME record sets are surfaced; alias (A/AAAA) targets,
//! weighted or latency sets with several values and every other record type
//! are invisible to the engine.

use async_trait::async_trait;
use autolb_core::naming::names_match;
use autolb_core::traits::{AliasRecord, ZoneProvider};
use autolb_core::{Error, Result};
use aws_sdk_route53::Client;
use aws_sdk_route53::operation::change_resource_record_sets::ChangeResourceRecordSetsError;
use aws_sdk_route53::types::{
    Change, ChangeAction, ChangeBatch, ResourceRecord, ResourceRecordSet, RrType,
};

use crate::sdk_error;

/// Prefix Route53 puts in front of hosted zone ids
const HOSTED_ZONE_PREFIX: &str = "/hostedzone/";

/// How many zones to look at when resolving a zone by name
const ZONE_LOOKUP_LIMIT: i32 = 10;

/// Zone provider backed by the Route53 API
///
/// # Dry-Run Mode
///
/// When `dry_run` is true, the provider will:
/// - Perform all reads (zone lookup, record listing)
/// - Log the change batch it would have sent
/// - **NOT** call ChangeResourceRecordSets
pub struct Route53Zone {
    client: Client,
    dry_run: bool,
}

impl std::fmt::Debug for Route53Zone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route53Zone")
            .field("dry_run", &self.dry_run)
            .finish_non_exhaustive()
    }
}

impl Route53Zone {
    /// Create a zone provider
    pub fn new(client: Client, dry_run: bool) -> Self {
        Self { client, dry_run }
    }

    /// Whether mutations are only logged
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Send a single-change batch for one CNAME
    async fn change(
        &self,
        zone_id: &str,
        action: ChangeAction,
        record_name: &str,
        target: &str,
        ttl: u32,
    ) -> Result<()> {
        if self.dry_run {
            tracing::info!(
                record = %record_name,
                target = %target,
                "[DRY-RUN] Would send ChangeResourceRecordSets to {} with payload: {}",
                zone_id,
                serde_json::json!({
                    "Action": action.as_str(),
                    "Name": record_name,
                    "Type": "CNAME",
                    "TTL": ttl,
                    "ResourceRecords": [{ "Value": target }],
                })
            );
            return Ok(());
        }

        let batch = change_batch(action.clone(), record_name, target, ttl)?;

        self.client
            .change_resource_record_sets()
            .hosted_zone_id(zone_id)
            .change_batch(batch)
            .send()
            .await
            .map_err(|e| {
                // Route53 rejects a DELETE whose values do not match as an invalid batch
                if action == ChangeAction::Delete
                    && matches!(
                        e.as_service_error(),
                        Some(ChangeResourceRecordSetsError::InvalidChangeBatch(_))
                    )
                {
                    Error::not_found(format!("No record {} -> {} with TTL {}", record_name, target, ttl))
                } else {
                    sdk_error("ChangeResourceRecordSets", e)
                }
            })?;

        Ok(())
    }
}

#[async_trait]
impl ZoneProvider for Route53Zone {
    /// Resolve a hosted zone id by exact name
    ///
    /// # API Call
    ///
    /// ```http
    /// GET /2013-04-01/hostedzonesbyname?dnsname=example.com.&maxitems=10
    /// ```
    async fn find_zone_id(&self, zone_name: &str) -> Result<String> {
        let output = self
            .client
            .list_hosted_zones_by_name()
            .dns_name(zone_name)
            .max_items(ZONE_LOOKUP_LIMIT)
            .send()
            .await
            .map_err(|e| sdk_error("ListHostedZonesByName", e))?;

        let zone = output
            .hosted_zones()
            .iter()
            .find(|zone| names_match(zone.name(), zone_name))
            .ok_or_else(|| Error::not_found(format!("Zone {} not found", zone_name)))?;

        let zone_id = strip_zone_prefix(zone.id());
        tracing::debug!(zone = %zone_name, "Found hosted zone ID: {}", zone_id);
        Ok(zone_id.to_string())
    }

    /// List every CNAME in the zone, following truncation markers
    ///
    /// # API Call
    ///
    /// ```http
    /// GET /2013-04-01/hostedzone/<id>/rrset[?name=...&type=...&identifier=...]
    /// ```
    async fn list_records(&self, zone_id: &str) -> Result<Vec<AliasRecord>> {
        let mut records = Vec::new();
        let mut start_name: Option<String> = None;
        let mut start_type: Option<RrType> = None;
        let mut start_identifier: Option<String> = None;

        loop {
            let page = self
                .client
                .list_resource_record_sets()
                .hosted_zone_id(zone_id)
                .set_start_record_name(start_name.take())
                .set_start_record_type(start_type.take())
                .set_start_record_identifier(start_identifier.take())
                .send()
                .await
                .map_err(|e| sdk_error("ListResourceRecordSets", e))?;

            records.extend(page.resource_record_sets().iter().filter_map(convert_record_set));

            if !page.is_truncated() {
                break;
            }
            match page.next_record_name() {
                Some(name) => {
                    start_name = Some(name.to_string());
                    start_type = page.next_record_type().cloned();
                    start_identifier = page.next_record_identifier().map(str::to_string);
                }
                None => break,
            }
        }

        Ok(records)
    }

    async fn upsert_record(
        &self,
        zone_id: &str,
        record_name: &str,
        target: &str,
        ttl: u32,
    ) -> Result<()> {
        self.change(zone_id, ChangeAction::Upsert, record_name, target, ttl).await
    }

    async fn delete_record(&self, zone_id: &str, record: &AliasRecord) -> Result<()> {
        self.change(
            zone_id,
            ChangeAction::Delete,
            &record.record_name,
            &record.target,
            record.effective_ttl(),
        )
        .await
    }

    fn provider_name(&self) -> &'static str {
        "route53"
    }
}

/// `/hostedzone/Z123` -> `Z123`
fn strip_zone_prefix(id: &str) -> &str {
    id.strip_prefix(HOSTED_ZONE_PREFIX).unwrap_or(id)
}

/// Keep single-value CNAME sets, dropping everything else
fn convert_record_set(set: &ResourceRecordSet) -> Option<AliasRecord> {
    if *set.r#type() != RrType::Cname || set.alias_target().is_some() {
        return None;
    }

    let [value] = set.resource_records() else {
        return None;
    };

    let record = AliasRecord::new(set.name(), value.value());
    Some(match set.ttl().and_then(|ttl| u32::try_from(ttl).ok()) {
        Some(ttl) => record.with_ttl(ttl),
        None => record,
    })
}

/// Build a batch holding one CNAME change
fn change_batch(action: ChangeAction, record_name: &str, target: &str, ttl: u32) -> Result<ChangeBatch> {
    let build_error = |e: aws_sdk_route53::error::BuildError| {
        Error::invalid_input(format!("Cannot build change for {}: {}", record_name, e))
    };

    let record_set = ResourceRecordSet::builder()
        .name(record_name)
        .r#type(RrType::Cname)
        .ttl(i64::from(ttl))
        .resource_records(ResourceRecord::builder().value(target).build().map_err(build_error)?)
        .build()
        .map_err(build_error)?;

    let change = Change::builder()
        .action(action)
        .resource_record_set(record_set)
        .build()
        .map_err(build_error)?;

    ChangeBatch::builder()
        .comment("autolb")
        .changes(change)
        .build()
        .map_err(build_error)
}
