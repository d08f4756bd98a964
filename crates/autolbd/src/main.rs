// # autolbd - autolb Daemon
//
// The autolbd daemon is a thin integration layer. It is responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing logging and the runtime
// 3. Registering providers and building them from configuration
// 4. Running the reconciliation engine until SIGTERM/SIGINT
//
// All reconciliation logic lives in autolb-core.
//
// ## Configuration
//
// All configuration is done via environment variables:
//
// ### Scope
// - `AUTOLB_REGION`: Region of the load balancers (falls back to `AWS_REGION`)
// - `AUTOLB_ZONE`: Hosted zone to write records into (e.g. `example.com.`)
// - `AUTOLB_TAG`: Marker tag key (default: `Name`)
// - `AUTOLB_OWNERSHIP_SCOPE`: `global` (default) or `region`
//
// ### Engine
// - `AUTOLB_INTERVAL`: Poll interval as a duration string (default: `5m`)
// - `AUTOLB_IO_TIMEOUT_SECS`: Timeout for each API call (default: 30)
//
// ### Provider
// - `AUTOLB_PROVIDER`: Provider type (default: `aws`)
// - `AUTOLB_AWS_PROFILE`: Shared-config profile name (optional)
// - `AUTOLB_AWS_ENDPOINT_URL`: Endpoint override, e.g. for LocalStack (optional)
// - `AUTOLB_MODE`: `live` (default) or `dry-run`
//
// ### Logging
// - `AUTOLB_LOG_LEVEL`: trace, debug, info, warn, error (default: info;
//   `RUST_LOG` takes precedence when set)
// - `AUTOLB_LOG_FORMAT`: `text` (default) or `json`
//
// ## Example
//
// ```bash
// export AUTOLB_REGION=us-east-1
// export AUTOLB_ZONE=example.com.
// export AUTOLB_TAG=autolb
// export AUTOLB_INTERVAL=1m
//
// autolbd
// ```

use anyhow::{Context, Result};
use autolb_core::config::{AutolbConfig, EngineConfig, OwnershipScope, ProviderConfig};
use autolb_core::{AutolbEngine, EngineEvent, ProviderRegistry, parse_interval};
use std::process::ExitCode;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// How long a cycle in progress may take to finish after a shutdown signal
const SHUTDOWN_GRACE: Duration = Duration::from_secs(120);

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum AutolbExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<AutolbExitCode> for ExitCode {
    fn from(code: AutolbExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogFormat {
    Text,
    Json,
}

/// Application configuration
#[derive(Debug)]
struct Config {
    region: String,
    zone: String,
    tag: String,
    interval: Duration,
    io_timeout_secs: Option<u64>,
    ownership: OwnershipScope,
    provider_type: String,
    aws_profile: Option<String>,
    aws_endpoint_url: Option<String>,
    dry_run: bool,
    log_level: String,
    log_format: LogFormat,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup`; empty values count as unset
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let interval = match get("AUTOLB_INTERVAL") {
            Some(raw) => parse_interval(&raw).with_context(|| format!("AUTOLB_INTERVAL '{}'", raw))?,
            None => Duration::from_secs(300),
        };

        let io_timeout_secs = get("AUTOLB_IO_TIMEOUT_SECS")
            .map(|raw| {
                raw.parse::<u64>()
                    .with_context(|| format!("AUTOLB_IO_TIMEOUT_SECS must be a number of seconds. Got: {}", raw))
            })
            .transpose()?;

        let ownership = match get("AUTOLB_OWNERSHIP_SCOPE") {
            Some(raw) => raw.parse::<OwnershipScope>().context("AUTOLB_OWNERSHIP_SCOPE")?,
            None => OwnershipScope::default(),
        };

        let dry_run = match get("AUTOLB_MODE").as_deref().map(str::to_lowercase).as_deref() {
            None | Some("live") => false,
            Some("dry-run") => true,
            Some(other) => anyhow::bail!("AUTOLB_MODE '{}' is not valid. Valid modes: live, dry-run", other),
        };

        let log_format = match get("AUTOLB_LOG_FORMAT").as_deref().map(str::to_lowercase).as_deref() {
            None | Some("text") => LogFormat::Text,
            Some("json") => LogFormat::Json,
            Some(other) => anyhow::bail!("AUTOLB_LOG_FORMAT '{}' is not valid. Valid formats: text, json", other),
        };

        Ok(Self {
            region: get("AUTOLB_REGION").or_else(|| get("AWS_REGION")).unwrap_or_default(),
            zone: get("AUTOLB_ZONE").unwrap_or_default(),
            tag: get("AUTOLB_TAG").unwrap_or_else(|| "Name".to_string()),
            interval,
            io_timeout_secs,
            ownership,
            provider_type: get("AUTOLB_PROVIDER").unwrap_or_else(|| "aws".to_string()),
            aws_profile: get("AUTOLB_AWS_PROFILE"),
            aws_endpoint_url: get("AUTOLB_AWS_ENDPOINT_URL"),
            dry_run,
            log_level: get("AUTOLB_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            log_format,
        })
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        if self.region.is_empty() {
            anyhow::bail!(
                "AUTOLB_REGION is required. \
                Set it via: export AUTOLB_REGION=us-east-1"
            );
        }

        if self.zone.is_empty() {
            anyhow::bail!(
                "AUTOLB_ZONE is required. \
                Set it via: export AUTOLB_ZONE=example.com."
            );
        }

        if self.provider_type != "aws" && (self.aws_profile.is_some() || self.aws_endpoint_url.is_some()) {
            anyhow::bail!(
                "AUTOLB_AWS_* settings only apply to AUTOLB_PROVIDER=aws. Got provider: {}",
                self.provider_type
            );
        }

        if self.dry_run && self.provider_type != "aws" {
            anyhow::bail!("AUTOLB_MODE=dry-run is only supported by the aws provider");
        }

        // Validate log level
        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "AUTOLB_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        Ok(())
    }

    /// Build the library configuration and run its validation
    fn to_autolb_config(&self) -> Result<AutolbConfig> {
        let provider = if self.provider_type == "aws" {
            ProviderConfig::Aws {
                profile: self.aws_profile.clone(),
                endpoint_url: self.aws_endpoint_url.clone(),
                dry_run: self.dry_run,
            }
        } else {
            ProviderConfig::Custom {
                factory: self.provider_type.clone(),
                config: serde_json::json!({}),
            }
        };

        let mut engine = EngineConfig {
            poll_interval_secs: self.interval.as_secs(),
            ownership: self.ownership,
            ..EngineConfig::default()
        };
        if let Some(io_timeout_secs) = self.io_timeout_secs {
            engine.io_timeout_secs = io_timeout_secs;
        }

        let config = AutolbConfig {
            region: self.region.clone(),
            zone_name: self.zone.clone(),
            tag_key: self.tag.clone(),
            provider,
            engine,
        };
        config.validate()?;
        Ok(config)
    }
}

/// Install the global tracing subscriber
fn init_tracing(log_level: &str, format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let result = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    result.map_err(|e| anyhow::anyhow!("Failed to set tracing subscriber: {}", e))
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return AutolbExitCode::ConfigError.into();
        }
    };

    // Validate configuration
    let autolb_config = match config.validate().and_then(|()| config.to_autolb_config()) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration validation error: {:#}", e);
            return AutolbExitCode::ConfigError.into();
        }
    };

    if let Err(e) = init_tracing(&config.log_level, config.log_format) {
        eprintln!("{:#}", e);
        return AutolbExitCode::ConfigError.into();
    }

    info!("Starting autolbd daemon");
    info!(
        zone = %autolb_config.zone_name,
        "Configuration loaded: region {}, marker tag '{}', interval {:?}{}",
        autolb_config.region,
        autolb_config.tag_key,
        config.interval,
        if config.dry_run { " [DRY-RUN]" } else { "" }
    );

    // Enter tokio runtime
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return AutolbExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        let (engine, events) = match build_engine(autolb_config).await {
            Ok(built) => built,
            Err(e) => {
                error!("Startup error: {:#}", e);
                return AutolbExitCode::ConfigError;
            }
        };

        if let Err(e) = run_daemon(engine, events).await {
            error!("Daemon error: {:#}", e);
            AutolbExitCode::RuntimeError
        } else {
            AutolbExitCode::CleanShutdown
        }
    });

    result.into()
}

/// Register providers, build them from configuration and create the engine
async fn build_engine(config: AutolbConfig) -> Result<(AutolbEngine, mpsc::Receiver<EngineEvent>)> {
    let registry = ProviderRegistry::new();

    #[cfg(feature = "aws")]
    {
        info!("Registering AWS providers");
        autolb_provider_aws::register(&registry);
    }

    let provider_type = config.provider.type_name().to_string();
    if !registry.has_provider(&provider_type) {
        anyhow::bail!(
            "AUTOLB_PROVIDER '{}' is not available in this build. Available: {}",
            provider_type,
            registry.list_providers().join(", ")
        );
    }

    let providers = registry
        .create_providers(&config)
        .await
        .with_context(|| format!("Failed to create '{}' providers", provider_type))?;

    let built = AutolbEngine::new(providers.inventory, providers.zone, config)?;
    Ok(built)
}

/// Run the engine until a shutdown signal arrives
async fn run_daemon(engine: AutolbEngine, mut events: mpsc::Receiver<EngineEvent>) -> Result<()> {
    // Drain engine events; the task ends once the engine is dropped
    let event_log = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            debug!(?event, "Engine event");
        }
    });

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let outcome = {
        let engine_run = engine.run_until(shutdown_rx);
        tokio::pin!(engine_run);

        tokio::select! {
            result = &mut engine_run => result.map_err(anyhow::Error::from),
            signal = wait_for_shutdown() => match signal {
                Ok(signal) => {
                    info!("Received shutdown signal: {}", signal);
                    info!("Finishing current cycle before exit");
                    let _ = shutdown_tx.send(());

                    match tokio::time::timeout(SHUTDOWN_GRACE, &mut engine_run).await {
                        Ok(result) => result.map_err(anyhow::Error::from),
                        Err(_) => Err(anyhow::anyhow!("Shutdown timeout after {:?}", SHUTDOWN_GRACE)),
                    }
                }
                Err(e) => Err(e),
            },
        }
    };

    drop(engine);
    let _ = event_log.await;
    outcome?;

    info!("Shutting down daemon");
    Ok(())
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
///
/// # Returns
///
/// Returns the name of the signal received.
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    // Set up signal handlers for SIGTERM and SIGINT
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    let signal = tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    };
    Ok(signal)
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
