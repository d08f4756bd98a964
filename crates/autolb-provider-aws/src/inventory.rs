//! ELBv2 load balancer inventory

use async_trait::async_trait;
use autolb_core::traits::{InventoryProvider, LoadBalancer, Tags};
use autolb_core::{Error, Result};
use aws_sdk_elasticloadbalancingv2::Client;
use aws_sdk_elasticloadbalancingv2::operation::describe_tags::DescribeTagsError;
use aws_sdk_elasticloadbalancingv2::types::LoadBalancer as SdkLoadBalancer;

use crate::sdk_error;

/// Largest page DescribeLoadBalancers accepts
const PAGE_SIZE: i32 = 400;

/// Load balancer inventory backed by the ELBv2 API
///
/// Lists application, network and gateway load balancers in the client's
/// region. Tags are fetched one load balancer at a time through
/// [`InventoryProvider::get_tags`].
#[derive(Debug, Clone)]
pub struct ElbInventory {
    client: Client,
}

impl ElbInventory {
    /// Create an inventory from an SDK client
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl InventoryProvider for ElbInventory {
    /// List every load balancer, following `NextMarker` until exhausted
    ///
    /// # API Call
    ///
    /// ```http
    /// POST / Action=DescribeLoadBalancers&PageSize=400[&Marker=...]
    /// ```
    async fn list_load_balancers(&self) -> Result<Vec<LoadBalancer>> {
        let mut load_balancers = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let page = self
                .client
                .describe_load_balancers()
                .page_size(PAGE_SIZE)
                .set_marker(marker.take())
                .send()
                .await
                .map_err(|e| sdk_error("DescribeLoadBalancers", e))?;

            load_balancers.extend(page.load_balancers().iter().filter_map(convert_load_balancer));

            match page.next_marker() {
                Some(next) if !next.is_empty() => marker = Some(next.to_string()),
                _ => break,
            }
        }

        tracing::debug!("DescribeLoadBalancers returned {} load balancer(s)", load_balancers.len());
        Ok(load_balancers)
    }

    /// Fetch the tags of one load balancer by ARN
    ///
    /// # API Call
    ///
    /// ```http
    /// POST / Action=DescribeTags&ResourceArns.member.1=<arn>
    /// ```
    async fn get_tags(&self, resource_ref: &str) -> Result<Tags> {
        let output = self
            .client
            .describe_tags()
            .resource_arns(resource_ref)
            .send()
            .await
            .map_err(|e| {
                if matches!(
                    e.as_service_error(),
                    Some(DescribeTagsError::LoadBalancerNotFoundException(_))
                ) {
                    Error::not_found(format!("Load balancer not found: {}", resource_ref))
                } else {
                    sdk_error("DescribeTags", e)
                }
            })?;

        let description = output
            .tag_descriptions()
            .iter()
            .find(|d| d.resource_arn() == Some(resource_ref))
            .ok_or_else(|| Error::not_found(format!("No tags returned for {}", resource_ref)))?;

        Ok(collect_tags(
            description.tags().iter().map(|tag| (tag.key(), tag.value())),
        ))
    }

    fn provider_name(&self) -> &'static str {
        "elbv2"
    }
}

/// Convert an SDK load balancer, dropping entries with missing fields
fn convert_load_balancer(lb: &SdkLoadBalancer) -> Option<LoadBalancer> {
    match (lb.load_balancer_name(), lb.dns_name(), lb.load_balancer_arn()) {
        (Some(name), Some(dns_name), Some(arn))
            if !name.is_empty() && !dns_name.is_empty() && !arn.is_empty() =>
        {
            Some(LoadBalancer::new(name, dns_name, arn))
        }
        (name, dns_name, arn) => {
            tracing::warn!(
                load_balancer = name.unwrap_or("<unnamed>"),
                "Skipping load balancer with partial data (dns_name: {:?}, arn: {:?})",
                dns_name,
                arn
            );
            None
        }
    }
}

/// Build a tag map; a tag without a value maps to the empty string
fn collect_tags<'a>(pairs: impl IntoIterator<Item = (&'a str, Option<&'a str>)>) -> Tags {
    pairs
        .into_iter()
        .map(|(key, value)| (key.to_string(), value.unwrap_or_default().to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_complete_load_balancer() {
        let sdk = SdkLoadBalancer::builder()
            .load_balancer_name("web")
            .dns_name("web-123.us-east-1.elb.amazonaws.com")
            .load_balancer_arn("arn:aws:elasticloadbalancing:us-east-1:1:loadbalancer/app/web/1")
            .build();

        let lb = convert_load_balancer(&sdk).unwrap();
        assert_eq!(lb.name, "web");
        assert_eq!(lb.dns_name, "web-123.us-east-1.elb.amazonaws.com");
        assert!(lb.resource_ref.ends_with("/app/web/1"));
        assert!(lb.tags.is_empty());
    }

    #[test]
    fn test_convert_skips_partial_load_balancer() {
        let no_dns = SdkLoadBalancer::builder()
            .load_balancer_name("web")
            .load_balancer_arn("arn:web")
            .build();
        let empty_name = SdkLoadBalancer::builder()
            .load_balancer_name("")
            .dns_name("x.elb.amazonaws.com")
            .load_balancer_arn("arn:x")
            .build();

        assert!(convert_load_balancer(&no_dns).is_none());
        assert!(convert_load_balancer(&empty_name).is_none());
    }

    #[test]
    fn test_collect_tags() {
        let tags = collect_tags([("autolb", None), ("team", Some("web"))]);

        assert_eq!(tags.get("autolb").map(String::as_str), Some(""));
        assert_eq!(tags.get("team").map(String::as_str), Some("web"));
    }
}
