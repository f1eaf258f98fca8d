//! YAML manifest declaring the desired services

use anyhow::Context;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

/// Desired resources, keyed by a label local to the manifest
///
/// ```yaml
/// api_management_services:
///   primary:
///     name: acme-apim
///     resource_group_name: acme-rg
///     location: West Europe
///     sku: { name: Developer, capacity: 1 }
///     publisher: { name: Acme, email: ops@acme.com }
/// ```
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(default)]
    pub api_management_services: BTreeMap<String, Value>,
}

impl Manifest {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid manifest {}", path.display()))
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        // An empty or comment-only document has no mapping to deserialize
        let document: Option<Self> = serde_yaml::from_str(content)?;
        Ok(document.unwrap_or_default())
    }
}

/// Record address of a resource: `<resource type>.<label>`
pub fn address(resource_type: &str, label: &str) -> String {
    format!("{}.{}", resource_type, label)
}
