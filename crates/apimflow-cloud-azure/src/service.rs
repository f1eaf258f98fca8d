//! `azurerm_api_management_service`: schema, typed configuration and the
//! expand/flatten translation to and from ARM payloads.

use crate::models::{ServiceProperties, ServiceResource, ServiceSkuProperties, SkuType, VpnType};
use apimflow_cloud::{Attribute, Block, CloudError, ResourceId, Result, Schema};
use serde::{Deserialize, Deserializer, Serialize};

pub const RESOURCE_TYPE: &str = "azurerm_api_management_service";
pub const PROVIDER_NAMESPACE: &str = "Microsoft.ApiManagement";
pub const SERVICE_SEGMENT: &str = "service";

const MAX_NAME_LEN: usize = 50;

pub fn schema() -> Schema {
    Schema::v0()
        .with_attribute(
            "name",
            Attribute::required_string()
                .force_new()
                .with_description("Name of the API Management service"),
        )
        .with_attribute(
            "resource_group_name",
            Attribute::required_string().force_new(),
        )
        .with_attribute(
            "location",
            Attribute::required_string().with_description("Azure region, e.g. \"West US\""),
        )
        .with_block(
            "sku",
            Block::exactly_one()
                .with_attribute(
                    "name",
                    Attribute::required_string()
                        .with_alias("type")
                        .with_description("Developer, Basic, Standard or Premium"),
                )
                .with_attribute("capacity", Attribute::required_int()),
        )
        .with_block(
            "publisher",
            Block::exactly_one()
                .with_attribute("name", Attribute::required_string())
                .with_attribute("email", Attribute::required_string()),
        )
        .with_attribute("id", Attribute::computed_string())
        .with_attribute("vpn_type", Attribute::computed_string())
        .with_attribute("provisioning_state", Attribute::computed_string())
        .with_attribute("gateway_url", Attribute::computed_string())
        .with_attribute("portal_url", Attribute::computed_string())
        .with_attribute("management_api_url", Attribute::computed_string())
        .with_attribute("scm_url", Attribute::computed_string())
        .with_attribute("created_at_utc", Attribute::computed_string())
}

/// Check raw configuration against [`schema`] and convert it
pub fn decode(raw: &serde_json::Value) -> Result<ApiManagementService> {
    let conformed = schema().conform(raw)?;
    let config: ApiManagementService =
        serde_json::from_value(conformed).map_err(|e| CloudError::Validation(e.to_string()))?;
    validate_identity(&config)?;
    Ok(config)
}

/// Reject names that cannot stand alone as ARM path segments
///
/// Service names follow ARM's rule: a leading letter, then letters, digits
/// and hyphens, at most 50 characters, not ending in a hyphen.
pub fn validate_identity(config: &ApiManagementService) -> Result<()> {
    let name = &config.name;
    let mut chars = name.chars();
    let well_formed = name.len() <= MAX_NAME_LEN
        && chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '-')
        && !name.ends_with('-');
    if !well_formed {
        return Err(CloudError::Validation(format!(
            "name: {:?} must start with a letter, contain only letters, digits and hyphens, \
             not end with a hyphen and be at most {} characters",
            name, MAX_NAME_LEN
        )));
    }

    let group = &config.resource_group_name;
    if group.trim().is_empty() {
        return Err(CloudError::Validation(
            "resource_group_name: must not be empty".to_string(),
        ));
    }
    if let Some(c) = group.chars().find(|c| matches!(c, '/' | '?' | '#')) {
        return Err(CloudError::Validation(format!(
            "resource_group_name: {:?} must not contain {:?}",
            group, c
        )));
    }
    Ok(())
}

/// Declared configuration of an API Management service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiManagementService {
    pub name: String,
    pub resource_group_name: String,
    #[serde(deserialize_with = "deserialize_location")]
    pub location: String,
    pub sku: Sku,
    pub publisher: Publisher,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sku {
    pub name: SkuType,
    pub capacity: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Publisher {
    pub name: String,
    pub email: String,
}

/// Observed state: the configuration as the backend reports it plus
/// backend-computed attributes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiManagementServiceState {
    pub id: String,
    #[serde(flatten)]
    pub config: ApiManagementService,
    pub vpn_type: Option<String>,
    pub provisioning_state: Option<String>,
    pub gateway_url: Option<String>,
    pub portal_url: Option<String>,
    pub management_api_url: Option<String>,
    pub scm_url: Option<String>,
    pub created_at_utc: Option<String>,
}

/// Lower-case and strip spaces, so "West US" and "westus" compare equal
pub fn normalize_location(location: &str) -> String {
    location.replace(' ', "").to_lowercase()
}

fn deserialize_location<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(|l| normalize_location(&l))
}

/// Identity of an API Management service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceId {
    pub subscription_id: String,
    pub resource_group: String,
    pub name: String,
}

impl ServiceId {
    pub fn new(
        subscription_id: impl Into<String>,
        resource_group: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            resource_group: resource_group.into(),
            name: name.into(),
        }
    }

    pub fn parse(id: &str) -> Result<Self> {
        let parsed = ResourceId::parse(id)?;

        match parsed.provider.as_deref() {
            Some(p) if p.eq_ignore_ascii_case(PROVIDER_NAMESPACE) => {}
            other => {
                return Err(CloudError::parse(
                    id,
                    format!("expected provider {}, found {:?}", PROVIDER_NAMESPACE, other),
                ));
            }
        }

        if parsed.path.len() != 1 {
            return Err(CloudError::parse(
                id,
                format!("expected a single {:?} segment", SERVICE_SEGMENT),
            ));
        }
        let name = parsed.require(SERVICE_SEGMENT)?.to_string();

        Ok(Self {
            subscription_id: parsed.subscription_id,
            resource_group: parsed.resource_group,
            name,
        })
    }

    /// Whether this identity addresses the service `config` declares
    pub fn matches(&self, config: &ApiManagementService) -> bool {
        self.resource_group
            .eq_ignore_ascii_case(&config.resource_group_name)
            && self.name.eq_ignore_ascii_case(&config.name)
    }
}

impl std::fmt::Display for ServiceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let id = ResourceId::new(&self.subscription_id, &self.resource_group, PROVIDER_NAMESPACE)
            .with_segment(SERVICE_SEGMENT, &self.name);
        write!(f, "{}", id)
    }
}

/// Build the ARM request payload
///
/// Capacity is narrowed to the backend's 32-bit width; out-of-range values
/// are rejected, never truncated.
pub fn expand(config: &ApiManagementService) -> Result<ServiceResource> {
    validate_identity(config)?;

    let capacity = i32::try_from(config.sku.capacity)
        .ok()
        .filter(|c| *c >= 1)
        .ok_or_else(|| {
            CloudError::Validation(format!(
                "sku.capacity: must be between 1 and {}, got {}",
                i32::MAX,
                config.sku.capacity
            ))
        })?;

    Ok(ServiceResource {
        location: Some(config.location.clone()),
        sku: Some(ServiceSkuProperties {
            name: config.sku.name.to_string(),
            capacity: Some(capacity),
        }),
        properties: Some(ServiceProperties {
            publisher_name: Some(config.publisher.name.clone()),
            publisher_email: Some(config.publisher.email.clone()),
            vpn_type: Some(VpnType::None.as_str().to_string()),
            ..Default::default()
        }),
        ..Default::default()
    })
}

/// Translate a fetched resource into observed state
///
/// `id` supplies the coordinates that live in the request path rather than
/// the body.
pub fn flatten(id: &ServiceId, resource: &ServiceResource) -> Result<ApiManagementServiceState> {
    let missing = |field: &str| {
        CloudError::InvalidResponse(format!("{} {}: missing {}", RESOURCE_TYPE, id.name, field))
    };

    let sku = resource.sku.as_ref().ok_or_else(|| missing("sku"))?;
    let properties = resource
        .properties
        .as_ref()
        .ok_or_else(|| missing("properties"))?;

    let sku_name = sku
        .name
        .parse::<SkuType>()
        .map_err(CloudError::InvalidResponse)?;
    let capacity = sku.capacity.ok_or_else(|| missing("sku.capacity"))?;
    let location = resource
        .location
        .as_deref()
        .ok_or_else(|| missing("location"))?;

    let config = ApiManagementService {
        name: resource.name.clone().unwrap_or_else(|| id.name.clone()),
        resource_group_name: id.resource_group.clone(),
        location: normalize_location(location),
        sku: Sku {
            name: sku_name,
            capacity: i64::from(capacity),
        },
        publisher: Publisher {
            name: properties
                .publisher_name
                .clone()
                .ok_or_else(|| missing("properties.publisherName"))?,
            email: properties
                .publisher_email
                .clone()
                .ok_or_else(|| missing("properties.publisherEmail"))?,
        },
    };

    Ok(ApiManagementServiceState {
        id: resource.id.clone().unwrap_or_else(|| id.to_string()),
        config,
        vpn_type: properties.vpn_type.clone(),
        provisioning_state: properties.provisioning_state.clone(),
        gateway_url: properties.runtime_url.clone(),
        portal_url: properties.portal_url.clone(),
        management_api_url: properties.management_api_url.clone(),
        scm_url: properties.scm_url.clone(),
        created_at_utc: properties.created_at_utc.clone(),
    })
}
