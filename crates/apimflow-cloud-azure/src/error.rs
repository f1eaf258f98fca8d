//! Azure provider error types

use apimflow_cloud::CloudError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AzureError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Non-success response carrying the ARM error payload
    #[error("HTTP {status}, code {code:?}: {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    /// A long-running operation finished in a non-success state
    #[error("operation {status}: {message}")]
    OperationFailed { status: String, message: String },

    #[error("timed out waiting for operation {0}")]
    Timeout(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl AzureError {
    /// Wrap as a backend error with resource context
    pub fn into_backend(
        self,
        operation: &'static str,
        resource_type: &str,
        resource_group: &str,
        name: &str,
    ) -> CloudError {
        CloudError::Backend {
            operation,
            resource_type: resource_type.to_string(),
            name: name.to_string(),
            resource_group: resource_group.to_string(),
            message: self.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AzureError>;
