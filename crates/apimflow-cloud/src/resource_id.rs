//! Resource identity parsing
//!
//! Identities are ARM-style paths made of key/value segment pairs:
//!
//! ```text
//! /subscriptions/{sub}/resourceGroups/{rg}/providers/{namespace}/{type}/{name}
//! ```

use crate::error::{CloudError, Result};
use std::fmt;

/// A parsed resource identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceId {
    pub subscription_id: String,
    pub resource_group: String,
    pub provider: Option<String>,
    /// Remaining key/value pairs in path order
    pub path: Vec<(String, String)>,
}

impl ResourceId {
    pub fn new(
        subscription_id: impl Into<String>,
        resource_group: impl Into<String>,
        provider: impl Into<String>,
    ) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            resource_group: resource_group.into(),
            provider: Some(provider.into()),
            path: Vec::new(),
        }
    }

    pub fn with_segment(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.path.push((key.into(), value.into()));
        self
    }

    pub fn parse(id: &str) -> Result<Self> {
        let trimmed = id.trim_start_matches('/');
        if trimmed.is_empty() {
            return Err(CloudError::parse(id, "cannot parse an empty ID"));
        }
        if !id.starts_with('/') {
            return Err(CloudError::parse(id, "ID must start with '/'"));
        }

        let components: Vec<&str> = trimmed.split('/').collect();
        if components.len() % 2 != 0 {
            return Err(CloudError::parse(
                id,
                "the number of path segments is not divisible by 2",
            ));
        }

        let mut subscription_id = None;
        let mut resource_group = None;
        let mut provider = None;
        let mut path = Vec::new();

        for pair in components.chunks(2) {
            let (key, value) = (pair[0], pair[1]);
            if key.is_empty() || value.is_empty() {
                return Err(CloudError::parse(id, "key/value segments must not be empty"));
            }

            match key {
                "subscriptions" if subscription_id.is_none() => {
                    subscription_id = Some(value.to_string())
                }
                "resourceGroups" | "resourcegroups" if resource_group.is_none() => {
                    resource_group = Some(value.to_string())
                }
                "providers" if provider.is_none() => provider = Some(value.to_string()),
                _ => {
                    if path.iter().any(|(k, _): &(String, String)| k == key) {
                        return Err(CloudError::parse(id, format!("duplicate key {:?}", key)));
                    }
                    path.push((key.to_string(), value.to_string()));
                }
            }
        }

        let subscription_id =
            subscription_id.ok_or_else(|| CloudError::parse(id, "no subscription ID found"))?;
        let resource_group =
            resource_group.ok_or_else(|| CloudError::parse(id, "no resource group name found"))?;

        Ok(Self {
            subscription_id,
            resource_group,
            provider,
            path,
        })
    }

    /// Value of a path key, e.g. `get("service")`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.path
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Like [`ResourceId::get`] but a missing key is a parse error
    pub fn require(&self, key: &str) -> Result<&str> {
        self.get(key)
            .ok_or_else(|| CloudError::parse(self.to_string(), format!("no {:?} segment found", key)))
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "/subscriptions/{}/resourceGroups/{}",
            self.subscription_id, self.resource_group
        )?;
        if let Some(provider) = &self.provider {
            write!(f, "/providers/{}", provider)?;
        }
        for (key, value) in &self.path {
            write!(f, "/{}/{}", key, value)?;
        }
        Ok(())
    }
}

impl std::str::FromStr for ResourceId {
    type Err = CloudError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
