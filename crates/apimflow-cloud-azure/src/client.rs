//! API Management service client
//!
//! [`ApiServicesClient`] is the outbound capability the reconciler is given.
//! [`ArmApiServicesClient`] implements it against the ARM REST API with a
//! bearer token, and waits for long-running operations to finish.

use crate::config::{ArmConfig, PollConfig};
use crate::error::{AzureError, Result};
use crate::models::{API_VERSION, ArmErrorResponse, OperationStatus, ServiceResource};
use crate::service::{PROVIDER_NAMESPACE, SERVICE_SEGMENT};
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{StatusCode, Url};
use std::sync::Arc;

/// Outcome of a delete request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// Nothing to delete
    NotFound,
}

#[async_trait]
pub trait ApiServicesClient: Send + Sync {
    /// Subscription all requests are scoped to
    fn subscription_id(&self) -> &str;

    /// Create or update a service and wait for the operation to finish
    async fn create_or_update(
        &self,
        resource_group: &str,
        name: &str,
        parameters: &ServiceResource,
    ) -> Result<ServiceResource>;

    /// Fetch a service; `None` when it does not exist
    async fn get(&self, resource_group: &str, name: &str) -> Result<Option<ServiceResource>>;

    /// Delete a service and wait for the operation to finish
    async fn delete(&self, resource_group: &str, name: &str) -> Result<DeleteOutcome>;
}

#[async_trait]
impl<T: ApiServicesClient + ?Sized> ApiServicesClient for Arc<T> {
    fn subscription_id(&self) -> &str {
        (**self).subscription_id()
    }

    async fn create_or_update(
        &self,
        resource_group: &str,
        name: &str,
        parameters: &ServiceResource,
    ) -> Result<ServiceResource> {
        (**self)
            .create_or_update(resource_group, name, parameters)
            .await
    }

    async fn get(&self, resource_group: &str, name: &str) -> Result<Option<ServiceResource>> {
        (**self).get(resource_group, name).await
    }

    async fn delete(&self, resource_group: &str, name: &str) -> Result<DeleteOutcome> {
        (**self).delete(resource_group, name).await
    }
}

/// Where to check the progress of an accepted operation
#[derive(Debug, Clone, PartialEq, Eq)]
enum PollTarget {
    /// `Azure-AsyncOperation`: returns an [`OperationStatus`] body
    AsyncOperation(String),
    /// `Location`: 202 while running, 200/204 when done
    Location(String),
}

impl PollTarget {
    fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .filter(|v| !v.is_empty())
                .map(String::from)
        };

        header("Azure-AsyncOperation")
            .map(PollTarget::AsyncOperation)
            .or_else(|| header("Location").map(PollTarget::Location))
    }

    fn url(&self) -> &str {
        match self {
            PollTarget::AsyncOperation(url) | PollTarget::Location(url) => url,
        }
    }
}

/// ARM REST client for `Microsoft.ApiManagement/service`
pub struct ArmApiServicesClient {
    client: reqwest::Client,
    subscription_id: String,
    access_token: String,
    endpoint: Url,
    poll: PollConfig,
}

impl ArmApiServicesClient {
    pub fn new(config: ArmConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        let endpoint = Url::parse(&config.endpoint)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| {
                AzureError::InvalidConfig(format!("endpoint {:?} is not a base URL", config.endpoint))
            })?;

        Ok(Self {
            client,
            subscription_id: config.subscription_id,
            access_token: config.access_token,
            endpoint,
            poll: config.poll,
        })
    }

    /// Each coordinate is pushed as one escaped path segment
    fn service_url(&self, resource_group: &str, name: &str) -> Result<Url> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| {
                AzureError::InvalidConfig(format!("endpoint {} is not a base URL", self.endpoint))
            })?
            .pop_if_empty()
            .extend([
                "subscriptions",
                self.subscription_id.as_str(),
                "resourceGroups",
                resource_group,
                "providers",
                PROVIDER_NAMESPACE,
                SERVICE_SEGMENT,
                name,
            ]);
        url.query_pairs_mut().append_pair("api-version", API_VERSION);
        Ok(url)
    }

    /// Turn a non-success response into an error carrying the ARM payload
    async fn api_error(response: reqwest::Response) -> AzureError {
        let status = response.status();
        let body = response.text().await;
        Self::error_from_body(status, body)
    }

    fn error_from_body(status: StatusCode, body: reqwest::Result<String>) -> AzureError {
        let body = match body {
            Ok(body) => body,
            Err(e) => {
                tracing::debug!("Failed to read HTTP {} response body: {}", status, e);
                format!("failed to read response body: {}", e)
            }
        };

        match serde_json::from_str::<ArmErrorResponse>(&body) {
            Ok(envelope) => AzureError::Api {
                status: status.as_u16(),
                code: envelope.error.code,
                message: envelope.error.message,
            },
            Err(_) => AzureError::Api {
                status: status.as_u16(),
                code: status.canonical_reason().unwrap_or("Unknown").to_string(),
                message: body,
            },
        }
    }

    async fn parse_body(response: reqwest::Response) -> Result<ServiceResource> {
        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(ServiceResource::default());
        }
        Ok(serde_json::from_str(&body)?)
    }

    /// Poll an accepted operation until it reaches a terminal state
    async fn wait_for_completion(&self, target: PollTarget) -> Result<()> {
        for attempt in 1..=self.poll.max_attempts {
            tokio::time::sleep(self.poll.interval).await;

            tracing::debug!(
                "Polling operation ({}/{}): {}",
                attempt,
                self.poll.max_attempts,
                target.url()
            );

            let response = self
                .client
                .get(target.url())
                .bearer_auth(&self.access_token)
                .send()
                .await?;

            match &target {
                PollTarget::AsyncOperation(_) => {
                    if !response.status().is_success() {
                        return Err(Self::api_error(response).await);
                    }
                    let status: OperationStatus = response.json().await?;
                    match status.status.as_str() {
                        "Succeeded" => return Ok(()),
                        "Failed" | "Canceled" => {
                            let message = status
                                .error
                                .map(|e| format!("{}: {}", e.code, e.message))
                                .unwrap_or_else(|| "Unknown error".to_string());
                            return Err(AzureError::OperationFailed {
                                status: status.status,
                                message,
                            });
                        }
                        _ => continue,
                    }
                }
                PollTarget::Location(_) => match response.status() {
                    StatusCode::ACCEPTED => continue,
                    StatusCode::OK
                    | StatusCode::CREATED
                    | StatusCode::NO_CONTENT
                    | StatusCode::NOT_FOUND => return Ok(()),
                    _ => return Err(Self::api_error(response).await),
                },
            }
        }

        Err(AzureError::Timeout(target.url().to_string()))
    }
}

#[async_trait]
impl ApiServicesClient for ArmApiServicesClient {
    fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    async fn create_or_update(
        &self,
        resource_group: &str,
        name: &str,
        parameters: &ServiceResource,
    ) -> Result<ServiceResource> {
        let url = self.service_url(resource_group, name)?;
        tracing::debug!("PUT {}", url);

        let response = self
            .client
            .put(url)
            .bearer_auth(&self.access_token)
            .json(parameters)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Self::parse_body(response).await,
            StatusCode::CREATED | StatusCode::ACCEPTED => {
                let target = PollTarget::from_headers(response.headers());
                let accepted = Self::parse_body(response).await?;
                if let Some(target) = target {
                    tracing::info!("Waiting for {} to finish provisioning", name);
                    self.wait_for_completion(target).await?;
                }
                Ok(accepted)
            }
            _ => Err(Self::api_error(response).await),
        }
    }

    async fn get(&self, resource_group: &str, name: &str) -> Result<Option<ServiceResource>> {
        let url = self.service_url(resource_group, name)?;
        tracing::debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(Some(Self::parse_body(response).await?)),
            StatusCode::NOT_FOUND => Ok(None),
            _ => Err(Self::api_error(response).await),
        }
    }

    async fn delete(&self, resource_group: &str, name: &str) -> Result<DeleteOutcome> {
        let url = self.service_url(resource_group, name)?;
        tracing::debug!("DELETE {}", url);

        let response = self
            .client
            .delete(url)
            .bearer_auth(&self.access_token)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(DeleteOutcome::Deleted),
            // ARM answers 204 when there was nothing to delete
            StatusCode::NO_CONTENT | StatusCode::NOT_FOUND => Ok(DeleteOutcome::NotFound),
            StatusCode::ACCEPTED => {
                if let Some(target) = PollTarget::from_headers(response.headers()) {
                    self.wait_for_completion(target).await?;
                }
                Ok(DeleteOutcome::Deleted)
            }
            _ => Err(Self::api_error(response).await),
        }
    }
}
