//! Configuration types for the autolb system
//!
//! This module defines all configuration structures used throughout the crate,
//! plus [`parse_interval`] for Go-style duration strings such as `"5m"`.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::traits::DEFAULT_RECORD_TTL;

/// Main autolb configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutolbConfig {
    /// Cloud region the load balancers live in (part of every record name)
    pub region: String,

    /// Hosted zone the alias records are written to (e.g. "example.com.")
    pub zone_name: String,

    /// Marker tag key; load balancers carrying it get an alias record
    pub tag_key: String,

    /// Provider configuration
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Optional engine settings
    #[serde(default)]
    pub engine: EngineConfig,
}

impl AutolbConfig {
    /// Create a configuration with default provider and engine settings
    pub fn new(
        region: impl Into<String>,
        zone_name: impl Into<String>,
        tag_key: impl Into<String>,
    ) -> Self {
        Self {
            region: region.into(),
            zone_name: zone_name.into(),
            tag_key: tag_key.into(),
            provider: ProviderConfig::default(),
            engine: EngineConfig::default(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.region.trim().is_empty() {
            return Err(crate::Error::config("Region cannot be empty"));
        }
        if self.region.contains('.') || self.region.contains(char::is_whitespace) {
            return Err(crate::Error::config(format!(
                "Region '{}' must be a single DNS label",
                self.region
            )));
        }
        if self.zone_name.trim_end_matches('.').is_empty() {
            return Err(crate::Error::config("Zone name cannot be empty"));
        }
        if self.tag_key.is_empty() {
            return Err(crate::Error::config("Marker tag key cannot be empty"));
        }

        self.provider.validate()?;
        self.engine.validate()?;

        Ok(())
    }
}

/// Provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// AWS: ELBv2 inventory and Route53 zone
    Aws {
        /// Named credentials profile (default chain when unset)
        #[serde(default)]
        profile: Option<String>,
        /// Endpoint override, e.g. for a local AWS emulator
        #[serde(default)]
        endpoint_url: Option<String>,
        /// Log zone mutations instead of submitting them
        #[serde(default)]
        dry_run: bool,
    },

    /// Custom provider
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl ProviderConfig {
    /// Validate the provider configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            ProviderConfig::Aws { endpoint_url, .. } => {
                if let Some(url) = endpoint_url
                    && !url.starts_with("http://")
                    && !url.starts_with("https://")
                {
                    return Err(crate::Error::config(format!(
                        "AWS endpoint URL must use HTTP or HTTPS scheme. Got: {}",
                        url
                    )));
                }
                Ok(())
            }
            ProviderConfig::Custom { factory, config } => {
                if factory.is_empty() {
                    return Err(crate::Error::config(
                        "Custom provider factory cannot be empty",
                    ));
                }
                if config.is_null() {
                    return Err(crate::Error::config(
                        "Custom provider config cannot be null",
                    ));
                }
                Ok(())
            }
        }
    }

    /// Get the provider type name
    pub fn type_name(&self) -> &str {
        match self {
            ProviderConfig::Aws { .. } => "aws",
            ProviderConfig::Custom { factory, .. } => factory,
        }
    }

    /// Whether mutations should only be logged
    pub fn is_dry_run(&self) -> bool {
        matches!(self, ProviderConfig::Aws { dry_run: true, .. })
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig::Aws {
            profile: None,
            endpoint_url: None,
            dry_run: false,
        }
    }
}

/// Which alias records the engine considers its own
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OwnershipScope {
    /// Every record whose name starts with `autolb-`
    #[default]
    Global,
    /// Only records whose name starts with `autolb-<region>-`
    ///
    /// Lets several regions share one zone without deleting each other's
    /// records.
    Region,
}

impl std::str::FromStr for OwnershipScope {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "global" => Ok(OwnershipScope::Global),
            "region" => Ok(OwnershipScope::Region),
            other => Err(crate::Error::config(format!(
                "Unknown ownership scope '{}'. Valid: global, region",
                other
            ))),
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Sleep between the end of one cycle and the start of the next (in seconds)
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Timeout applied to every individual provider call (in seconds)
    #[serde(default = "default_io_timeout_secs")]
    pub io_timeout_secs: u64,

    /// TTL written with every managed record
    #[serde(default = "default_record_ttl")]
    pub record_ttl: u32,

    /// Ownership scope for cleanup
    #[serde(default)]
    pub ownership: OwnershipScope,

    /// Capacity of the internal event channel
    ///
    /// When full, new events are dropped (with a warning log).
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl EngineConfig {
    /// Validate the engine settings
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.poll_interval_secs == 0 {
            return Err(crate::Error::config("Poll interval must be > 0"));
        }
        if self.io_timeout_secs == 0 {
            return Err(crate::Error::config("I/O timeout must be > 0"));
        }
        if self.record_ttl == 0 {
            return Err(crate::Error::config("Record TTL must be > 0"));
        }
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }
        Ok(())
    }

    /// Poll interval as a [`Duration`]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Per-call I/O timeout as a [`Duration`]
    pub fn io_timeout(&self) -> Duration {
        Duration::from_secs(self.io_timeout_secs)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            io_timeout_secs: default_io_timeout_secs(),
            record_ttl: default_record_ttl(),
            ownership: OwnershipScope::default(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_poll_interval_secs() -> u64 {
    300
}

fn default_io_timeout_secs() -> u64 {
    30
}

fn default_record_ttl() -> u32 {
    DEFAULT_RECORD_TTL
}

fn default_event_channel_capacity() -> usize {
    1000
}

const NANOS_PER_UNIT: &[(&str, f64)] = &[
    ("ns", 1.0),
    ("us", 1e3),
    ("µs", 1e3),
    ("ms", 1e6),
    ("s", 1e9),
    ("m", 60e9),
    ("h", 3600e9),
];

/// Parse a Go-style duration string into a [`Duration`].
///
/// Accepts one or more `<number><unit>` pairs, e.g. `"5m"`, `"1h30m"`,
/// `"90s"`, `"1.5h"`, `"2500ms"`. Units: `ns`, `us`/`µs`, `ms`, `s`, `m`, `h`.
///
/// # Errors
///
/// Returns [`crate::Error::Config`] if the string is empty, a number has no
/// unit, a unit is unknown, the total does not fit a [`Duration`], or the
/// total is below one second (the poll loop does not run sub-second cycles).
pub fn parse_interval(input: &str) -> Result<Duration, crate::Error> {
    let s = input.trim();
    if s.is_empty() {
        return Err(crate::Error::config("Interval cannot be empty"));
    }

    let mut rest = s;
    let mut total_nanos = 0f64;

    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .ok_or_else(|| {
                crate::Error::config(format!("Interval '{}' is missing a unit", input))
            })?;
        if number_len == 0 {
            return Err(crate::Error::config(format!(
                "Interval '{}' is malformed: expected a number",
                input
            )));
        }

        let (number, tail) = rest.split_at(number_len);
        let value: f64 = number.parse().map_err(|_| {
            crate::Error::config(format!("Interval '{}' has an invalid number '{}'", input, number))
        })?;

        let unit_len = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, next) = tail.split_at(unit_len);

        let nanos_per_unit = NANOS_PER_UNIT
            .iter()
            .find(|(name, _)| *name == unit)
            .map(|(_, nanos)| *nanos)
            .ok_or_else(|| {
                crate::Error::config(format!(
                    "Interval '{}' has unknown unit '{}'. Valid: ns, us, ms, s, m, h",
                    input, unit
                ))
            })?;

        total_nanos += value * nanos_per_unit;
        rest = next;
    }

    let seconds = total_nanos / 1e9;
    if seconds < 1.0 {
        return Err(crate::Error::config(format!(
            "Interval '{}' is below the minimum of 1s",
            input
        )));
    }

    Duration::try_from_secs_f64(seconds)
        .map_err(|_| crate::Error::config(format!("Interval '{}' is too large", input)))
}
