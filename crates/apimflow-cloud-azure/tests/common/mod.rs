use apimflow_cloud_azure::{
    ApiServicesClient, AzureError, DeleteOutcome, Result, ServiceId, ServiceResource,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

pub const SUBSCRIPTION_ID: &str = "00000000-0000-0000-0000-000000000000";

/// In-memory backend that stores PUT payloads and echoes them back with
/// the read-only fields ARM would add
#[derive(Default)]
pub struct FakeApiServicesClient {
    services: Mutex<HashMap<(String, String), ServiceResource>>,
    calls: AtomicUsize,
    fail_put: Mutex<Option<AzureError>>,
    fail_get: Mutex<Option<AzureError>>,
    fail_delete: Mutex<Option<AzureError>>,
}

#[allow(dead_code)]
impl FakeApiServicesClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of backend calls issued so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn contains(&self, resource_group: &str, name: &str) -> bool {
        self.services
            .lock()
            .unwrap()
            .contains_key(&(resource_group.to_string(), name.to_string()))
    }

    pub fn stored(&self, resource_group: &str, name: &str) -> Option<ServiceResource> {
        self.services
            .lock()
            .unwrap()
            .get(&(resource_group.to_string(), name.to_string()))
            .cloned()
    }

    pub fn fail_next_put(&self, error: AzureError) {
        *self.fail_put.lock().unwrap() = Some(error);
    }

    pub fn fail_next_get(&self, error: AzureError) {
        *self.fail_get.lock().unwrap() = Some(error);
    }

    pub fn fail_next_delete(&self, error: AzureError) {
        *self.fail_delete.lock().unwrap() = Some(error);
    }

    /// Remove a service behind the reconciler's back
    pub fn remove(&self, resource_group: &str, name: &str) {
        self.services
            .lock()
            .unwrap()
            .remove(&(resource_group.to_string(), name.to_string()));
    }
}

pub fn conflict() -> AzureError {
    AzureError::Api {
        status: 409,
        code: "ServiceAlreadyExists".to_string(),
        message: "Api service already exists: svc1".to_string(),
    }
}

#[async_trait]
impl ApiServicesClient for FakeApiServicesClient {
    fn subscription_id(&self) -> &str {
        SUBSCRIPTION_ID
    }

    async fn create_or_update(
        &self,
        resource_group: &str,
        name: &str,
        parameters: &ServiceResource,
    ) -> Result<ServiceResource> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.fail_put.lock().unwrap().take() {
            return Err(error);
        }

        let mut resource = parameters.clone();
        resource.id = Some(ServiceId::new(SUBSCRIPTION_ID, resource_group, name).to_string());
        resource.name = Some(name.to_string());
        resource.resource_type = Some("Microsoft.ApiManagement/service".to_string());
        if let Some(properties) = resource.properties.as_mut() {
            properties.provisioning_state = Some("Succeeded".to_string());
            properties.runtime_url = Some(format!("https://{}.azure-api.net", name));
            properties.portal_url = Some(format!("https://{}.portal.azure-api.net", name));
        }

        self.services.lock().unwrap().insert(
            (resource_group.to_string(), name.to_string()),
            resource.clone(),
        );
        Ok(resource)
    }

    async fn get(&self, resource_group: &str, name: &str) -> Result<Option<ServiceResource>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.fail_get.lock().unwrap().take() {
            return Err(error);
        }
        Ok(self.stored(resource_group, name))
    }

    async fn delete(&self, resource_group: &str, name: &str) -> Result<DeleteOutcome> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.fail_delete.lock().unwrap().take() {
            return Err(error);
        }
        let removed = self
            .services
            .lock()
            .unwrap()
            .remove(&(resource_group.to_string(), name.to_string()));
        Ok(if removed.is_some() {
            DeleteOutcome::Deleted
        } else {
            DeleteOutcome::NotFound
        })
    }
}
