//! API Management service reconciler

use crate::client::{ApiServicesClient, DeleteOutcome};
use crate::service::{
    self, ApiManagementService, ApiManagementServiceState, RESOURCE_TYPE, ServiceId,
};
use apimflow_cloud::{Applied, CloudError, Reconciler, Result, Schema};
use async_trait::async_trait;

/// Reconciles `azurerm_api_management_service` resources through an
/// injected [`ApiServicesClient`]
pub struct ApiManagementServiceReconciler<C> {
    client: C,
}

impl<C: ApiServicesClient> ApiManagementServiceReconciler<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    /// Create-or-update, then read the resource back
    async fn apply(
        &self,
        config: &ApiManagementService,
    ) -> Result<Applied<ApiManagementServiceState>> {
        let parameters = service::expand(config)?;

        tracing::info!(
            "Creating/updating API Management Service {} (resource group {})",
            config.name,
            config.resource_group_name
        );

        let accepted = self
            .client
            .create_or_update(&config.resource_group_name, &config.name, &parameters)
            .await
            .map_err(|e| {
                e.into_backend(
                    "create/update",
                    RESOURCE_TYPE,
                    &config.resource_group_name,
                    &config.name,
                )
            })?;

        let id = accepted
            .id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| {
                ServiceId::new(
                    self.client.subscription_id(),
                    &config.resource_group_name,
                    &config.name,
                )
                .to_string()
            });

        match self.read(&id).await {
            Ok(Some(observed)) => Ok(Applied { id, observed }),
            Ok(None) => Err(CloudError::Unsynced {
                id,
                message: "resource not found after create/update".to_string(),
            }),
            Err(e) => Err(CloudError::Unsynced {
                id,
                message: e.to_string(),
            }),
        }
    }
}

#[async_trait]
impl<C: ApiServicesClient> Reconciler for ApiManagementServiceReconciler<C> {
    type Config = ApiManagementService;
    type Observed = ApiManagementServiceState;

    fn resource_type(&self) -> &str {
        RESOURCE_TYPE
    }

    fn schema(&self) -> Schema {
        service::schema()
    }

    fn decode(&self, raw: &serde_json::Value) -> Result<ApiManagementService> {
        service::decode(raw)
    }

    async fn create(
        &self,
        config: &ApiManagementService,
    ) -> Result<Applied<ApiManagementServiceState>> {
        self.apply(config).await
    }

    async fn read(&self, id: &str) -> Result<Option<ApiManagementServiceState>> {
        let service_id = ServiceId::parse(id)?;

        let resource = self
            .client
            .get(&service_id.resource_group, &service_id.name)
            .await
            .map_err(|e| {
                e.into_backend(
                    "read",
                    RESOURCE_TYPE,
                    &service_id.resource_group,
                    &service_id.name,
                )
            })?;

        match resource {
            Some(resource) => Ok(Some(service::flatten(&service_id, &resource)?)),
            None => {
                tracing::info!(
                    "API Management Service {} (resource group {}) no longer exists",
                    service_id.name,
                    service_id.resource_group
                );
                Ok(None)
            }
        }
    }

    async fn update(
        &self,
        id: &str,
        config: &ApiManagementService,
    ) -> Result<ApiManagementServiceState> {
        let service_id = ServiceId::parse(id)?;
        if !service_id.matches(config) {
            return Err(CloudError::Validation(format!(
                "{} addresses {} (resource group {}), configuration declares {} (resource group {}); changing name or resource_group_name requires replacement",
                id,
                service_id.name,
                service_id.resource_group,
                config.name,
                config.resource_group_name
            )));
        }

        Ok(self.apply(config).await?.observed)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let service_id = ServiceId::parse(id)?;

        tracing::info!(
            "Deleting API Management Service {} (resource group {})",
            service_id.name,
            service_id.resource_group
        );

        let outcome = self
            .client
            .delete(&service_id.resource_group, &service_id.name)
            .await
            .map_err(|e| {
                e.into_backend(
                    "delete",
                    RESOURCE_TYPE,
                    &service_id.resource_group,
                    &service_id.name,
                )
            })?;

        if outcome == DeleteOutcome::NotFound {
            tracing::debug!("API Management Service {} was already absent", service_id.name);
        }
        Ok(())
    }
}
