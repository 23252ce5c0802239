//! Endpoint resolution.
//!
//! Turns a logical target (a region code, or nothing) into a base URI using
//! the strategy declared on the operation descriptor. Resolution is a pure
//! function over tables fixed at initialization.

use std::collections::HashMap;

use crate::descriptor::EndpointStrategy;
use crate::error::CloudError;

/// Per-provider endpoint tables.
#[derive(Debug, Clone)]
pub struct EndpointResolver {
    provider: String,
    default_endpoint: String,
    regions: HashMap<String, String>,
}

impl EndpointResolver {
    pub fn new(provider: impl Into<String>, default_endpoint: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            default_endpoint: default_endpoint.into(),
            regions: HashMap::new(),
        }
    }

    /// Register a region identifier → base URI mapping.
    pub fn with_region(mut self, id: impl Into<String>, uri: impl Into<String>) -> Self {
        self.regions.insert(id.into(), uri.into());
        self
    }

    pub fn with_regions(mut self, regions: HashMap<String, String>) -> Self {
        self.regions.extend(regions);
        self
    }

    /// Resolve a base URI. An absent target always selects the provider
    /// default; a present target is interpreted per strategy.
    pub fn resolve(
        &self,
        target: Option<&str>,
        strategy: &EndpointStrategy,
    ) -> Result<String, CloudError> {
        match (strategy, target) {
            (EndpointStrategy::Constant, _) | (_, None) => Ok(self.default_endpoint.clone()),
            (EndpointStrategy::Lookup, Some(id)) => {
                self.regions
                    .get(id)
                    .cloned()
                    .ok_or_else(|| CloudError::UnresolvableEndpoint {
                        provider: self.provider.clone(),
                        target: id.to_string(),
                    })
            }
            (EndpointStrategy::VirtualHost, Some(id)) => {
                let (scheme, authority) = split_endpoint(&self.default_endpoint)?;
                Ok(format!("{scheme}://{id}.{authority}"))
            }
        }
    }
}

/// Split `scheme://authority` into its two parts.
pub(crate) fn split_endpoint(endpoint: &str) -> Result<(&str, &str), CloudError> {
    endpoint
        .split_once("://")
        .filter(|(scheme, authority)| !scheme.is_empty() && !authority.is_empty())
        .ok_or_else(|| {
            CloudError::Configuration(format!("endpoint '{endpoint}' is not scheme://authority"))
        })
}
