// # AWS Providers
//
// This crate provides the AWS implementations for the autolb system:
//
// - [`ElbInventory`]: load balancers and their tags from the ELBv2 API
// - [`Route53Zone`]: CNAME records in a Route53 hosted zone
//
// ## Behavior
//
// - One API request per trait call (plus pagination)
// - Errors propagate to the engine, which aborts or skips as appropriate
// - No caching, no background tasks
// - Dry-run mode for safe testing (reads happen, changes are only logged)
//
// ## Credentials
//
// Credentials come from the standard AWS provider chain (environment,
// shared profile, container or instance role). They are never logged.
//
// ## API Reference
//
// - ELBv2: DescribeLoadBalancers, DescribeTags
// - Route53: ListHostedZonesByName, ListResourceRecordSets, ChangeResourceRecordSets

mod inventory;
mod zone;

pub use inventory::ElbInventory;
pub use zone::Route53Zone;

use async_trait::async_trait;
use autolb_core::config::{AutolbConfig, ProviderConfig};
use autolb_core::traits::{ProviderFactory, Providers};
use autolb_core::{Error, Result};
use aws_config::{BehaviorVersion, Region};
use aws_sdk_route53::error::{DisplayErrorContext, SdkError};

/// Map an SDK failure onto the core error kinds
///
/// Failures that never produced a service response (dispatch, timeout,
/// unparseable response) are transient; service errors are reported as
/// provider errors with the operation name.
pub(crate) fn sdk_error<E, R>(operation: &str, err: SdkError<E, R>) -> Error
where
    E: std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug + Send + Sync + 'static,
{
    let transient = matches!(
        err,
        SdkError::DispatchFailure(_) | SdkError::TimeoutError(_) | SdkError::ResponseError(_)
    );
    let message = format!("{} failed: {}", operation, DisplayErrorContext(&err));

    if transient {
        Error::transient(message)
    } else {
        Error::provider("aws", message)
    }
}

/// Factory for creating the ELBv2 + Route53 provider pair
pub struct AwsFactory;

#[async_trait]
impl ProviderFactory for AwsFactory {
    async fn create(&self, config: &AutolbConfig) -> Result<Providers> {
        match &config.provider {
            ProviderConfig::Aws {
                profile,
                endpoint_url,
                dry_run,
            } => {
                let mut loader = aws_config::defaults(BehaviorVersion::latest())
                    .region(Region::new(config.region.clone()));
                if let Some(profile) = profile {
                    loader = loader.profile_name(profile);
                }
                if let Some(endpoint_url) = endpoint_url {
                    tracing::info!("Using custom AWS endpoint: {}", endpoint_url);
                    loader = loader.endpoint_url(endpoint_url);
                }
                let sdk_config = loader.load().await;

                if *dry_run {
                    tracing::warn!("Route53 provider running in DRY-RUN mode - no changes will be made");
                }

                Ok(Providers {
                    inventory: Box::new(ElbInventory::new(
                        aws_sdk_elasticloadbalancingv2::Client::new(&sdk_config),
                    )),
                    zone: Box::new(Route53Zone::new(
                        aws_sdk_route53::Client::new(&sdk_config),
                        *dry_run,
                    )),
                })
            }
            _ => Err(Error::config("Invalid config for AWS provider")),
        }
    }
}

/// Register the AWS providers with a registry
///
/// # Example
///
/// ```rust
/// use autolb_core::ProviderRegistry;
///
/// let registry = ProviderRegistry::new();
/// autolb_provider_aws::register(&registry);
/// assert!(registry.has_provider("aws"));
/// ```
pub fn register(registry: &autolb_core::ProviderRegistry) {
    registry.register_provider("aws", Box::new(AwsFactory));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aws_config(dry_run: bool) -> AutolbConfig {
        let mut config = AutolbConfig::new("us-east-1", "example.com.", "autolb");
        config.provider = ProviderConfig::Aws {
            profile: None,
            endpoint_url: Some("http://localhost:4566".to_string()),
            dry_run,
        };
        config
    }

    #[tokio::test]
    async fn test_factory_creation() {
        let providers = AwsFactory.create(&aws_config(true)).await.unwrap();

        assert_eq!(providers.inventory.provider_name(), "elbv2");
        assert_eq!(providers.zone.provider_name(), "route53");
    }

    #[tokio::test]
    async fn test_factory_rejects_foreign_config() {
        let mut config = aws_config(false);
        config.provider = ProviderConfig::Custom {
            factory: "memory".to_string(),
            config: serde_json::json!({}),
        };

        let result = AwsFactory.create(&config).await;
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_register_via_registry() {
        let registry = autolb_core::ProviderRegistry::new();
        register(&registry);

        assert!(registry.has_provider("aws"));
        let providers = registry.create_providers(&aws_config(true)).await.unwrap();
        assert_eq!(providers.zone.provider_name(), "route53");
    }

    #[test]
    fn test_debug_shows_mode() {
        let sdk_config = aws_sdk_route53::Config::builder()
            .behavior_version(aws_sdk_route53::config::BehaviorVersion::latest())
            .region(aws_sdk_route53::config::Region::new("us-east-1"))
            .build();
        let zone = Route53Zone::new(aws_sdk_route53::Client::from_conf(sdk_config), true);

        let debug_str = format!("{:?}", zone);
        assert!(debug_str.contains("Route53Zone"));
        assert!(debug_str.contains("dry_run: true"));
        assert!(zone.is_dry_run());
    }
}
