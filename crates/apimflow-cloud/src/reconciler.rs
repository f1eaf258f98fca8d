//! Reconciler trait definition

use crate::error::{CloudError, Result};
use crate::schema::Schema;
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Drives one kind of remote resource toward its declared configuration
///
/// Implementations hold an injected, already-authenticated API client and no
/// other state between calls. The caller owns persistence of identities and
/// observed state, and must not run two calls for the same identity at once.
#[async_trait]
pub trait Reconciler: Send + Sync {
    /// Typed configuration, produced from raw input by [`Reconciler::decode`]
    type Config: Serialize + DeserializeOwned + Send + Sync;

    /// Observed state, flattened from the backend's representation
    type Observed: Serialize + Send + Sync;

    /// Resource type name (e.g. "azurerm_api_management_service")
    fn resource_type(&self) -> &str;

    /// Schema the raw configuration is checked against
    fn schema(&self) -> Schema;

    /// Validate raw configuration against the schema and convert it
    fn decode(&self, raw: &serde_json::Value) -> Result<Self::Config> {
        let conformed = self.schema().conform(raw)?;
        serde_json::from_value(conformed).map_err(|e| CloudError::Validation(e.to_string()))
    }

    /// Create the resource and return its new identity with the observed state
    async fn create(&self, config: &Self::Config) -> Result<Applied<Self::Observed>>;

    /// Fetch the current state; `None` when the resource no longer exists
    async fn read(&self, id: &str) -> Result<Option<Self::Observed>>;

    /// Apply `config` in place to the resource identified by `id`
    async fn update(&self, id: &str, config: &Self::Config) -> Result<Self::Observed>;

    /// Delete the resource; deleting an absent resource succeeds
    async fn delete(&self, id: &str) -> Result<()>;

    /// Adopt an existing resource by identity
    async fn import(&self, id: &str) -> Result<Applied<Self::Observed>> {
        match self.read(id).await? {
            Some(observed) => Ok(Applied {
                id: id.to_string(),
                observed,
            }),
            None => Err(CloudError::ResourceNotFound(id.to_string())),
        }
    }
}

/// Result of a successful create or import
#[derive(Debug, Clone, Serialize)]
pub struct Applied<T> {
    /// Durable identity of the resource
    pub id: String,

    /// State read back from the backend
    pub observed: T,
}
