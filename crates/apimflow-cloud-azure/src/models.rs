//! ARM payload types for `Microsoft.ApiManagement/service`

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const API_VERSION: &str = "2016-07-07";

/// API Management service resource, as sent and returned by ARM
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceResource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<BTreeMap<String, String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<ServiceSkuProperties>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<ServiceProperties>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSkuProperties {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher_email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vpn_type: Option<String>,

    // Read-only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_provisioning_state: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at_utc: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub portal_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub management_api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scm_url: Option<String>,
}

/// SKUs offered by the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SkuType {
    Developer,
    Basic,
    Standard,
    Premium,
}

impl SkuType {
    pub const ALL: [SkuType; 4] = [
        SkuType::Developer,
        SkuType::Basic,
        SkuType::Standard,
        SkuType::Premium,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SkuType::Developer => "Developer",
            SkuType::Basic => "Basic",
            SkuType::Standard => "Standard",
            SkuType::Premium => "Premium",
        }
    }
}

impl std::fmt::Display for SkuType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SkuType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        SkuType::ALL
            .into_iter()
            .find(|sku| sku.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                let names: Vec<&str> = SkuType::ALL.iter().map(SkuType::as_str).collect();
                format!("unknown SKU {:?}, expected one of {}", s, names.join(", "))
            })
    }
}

impl TryFrom<String> for SkuType {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SkuType> for String {
    fn from(sku: SkuType) -> Self {
        sku.as_str().to_string()
    }
}

/// Virtual network integration mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VpnType {
    None,
    External,
    Internal,
}

impl VpnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VpnType::None => "None",
            VpnType::External => "External",
            VpnType::Internal => "Internal",
        }
    }
}

/// ARM error envelope
#[derive(Debug, Clone, Deserialize)]
pub struct ArmErrorResponse {
    pub error: ArmErrorBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArmErrorBody {
    #[serde(default)]
    pub code: String,

    #[serde(default)]
    pub message: String,
}

/// Body returned by an `Azure-AsyncOperation` status URL
#[derive(Debug, Clone, Deserialize)]
pub struct OperationStatus {
    pub status: String,

    #[serde(default)]
    pub error: Option<ArmErrorBody>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sku_type_parse_is_case_insensitive() {
        assert_eq!("premium".parse::<SkuType>().unwrap(), SkuType::Premium);
        assert_eq!("Developer".parse::<SkuType>().unwrap(), SkuType::Developer);
        assert!("Consumption".parse::<SkuType>().is_err());
    }

    #[test]
    fn test_service_resource_wire_format() {
        let resource = ServiceResource {
            location: Some("westus".to_string()),
            sku: Some(ServiceSkuProperties {
                name: SkuType::Standard.to_string(),
                capacity: Some(1),
            }),
            properties: Some(ServiceProperties {
                publisher_email: Some("a@acme.com".to_string()),
                publisher_name: Some("Acme".to_string()),
                vpn_type: Some(VpnType::None.as_str().to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };

        assert_eq!(
            serde_json::to_value(&resource).unwrap(),
            json!({
                "location": "westus",
                "sku": { "name": "Standard", "capacity": 1 },
                "properties": {
                    "publisherEmail": "a@acme.com",
                    "publisherName": "Acme",
                    "vpnType": "None"
                }
            })
        );
    }

    #[test]
    fn test_parse_get_response() {
        let body = json!({
            "id": "/subscriptions/sub/resourceGroups/rg1/providers/Microsoft.ApiManagement/service/svc1",
            "name": "svc1",
            "type": "Microsoft.ApiManagement/service",
            "location": "West US",
            "etag": "AAAAAAAAAAA=",
            "sku": { "name": "Premium", "capacity": 2 },
            "properties": {
                "publisherEmail": "a@acme.com",
                "publisherName": "Acme",
                "provisioningState": "Succeeded",
                "targetProvisioningState": "",
                "createdAtUtc": "2017-03-01T10:00:00Z",
                "runtimeUrl": "https://svc1.azure-api.net",
                "portalUrl": "https://svc1.portal.azure-api.net",
                "managementApiUrl": "https://svc1.management.azure-api.net",
                "scmUrl": "https://svc1.scm.azure-api.net",
                "vpnType": "None",
                "staticIPs": ["13.64.0.1"]
            }
        });

        let resource: ServiceResource = serde_json::from_value(body).unwrap();
        assert_eq!(resource.resource_type.as_deref(), Some("Microsoft.ApiManagement/service"));
        assert_eq!(resource.sku.unwrap().capacity, Some(2));
        let properties = resource.properties.unwrap();
        assert_eq!(properties.runtime_url.as_deref(), Some("https://svc1.azure-api.net"));
        assert_eq!(properties.provisioning_state.as_deref(), Some("Succeeded"));
    }
}
