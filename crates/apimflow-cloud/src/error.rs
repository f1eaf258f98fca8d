//! Reconciler error types

use thiserror::Error;

/// Reconciler errors
///
/// Not-found on read/delete is not represented here: those paths return an
/// absent result instead.
#[derive(Error, Debug)]
pub enum CloudError {
    /// Configuration rejected before any backend call
    #[error("Invalid configuration: {0}")]
    Validation(String),

    /// Malformed resource identity
    #[error("Invalid resource ID {id:?}: {reason}")]
    Parse { id: String, reason: String },

    #[error(
        "Error issuing {operation} request for {resource_type} {name:?} (resource group {resource_group:?}): {message}"
    )]
    Backend {
        operation: &'static str,
        resource_type: String,
        name: String,
        resource_group: String,
        message: String,
    },

    /// The backend accepted the change but the resource could not be read back
    #[error("Resource {id} was applied but could not be read back: {message}")]
    Unsynced { id: String, message: String },

    #[error("Invalid backend response: {0}")]
    InvalidResponse(String),

    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("State file error: {0}")]
    StateError(String),

    #[error("Lock acquisition failed: {0}")]
    LockError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CloudError {
    pub fn parse(id: impl Into<String>, reason: impl Into<String>) -> Self {
        CloudError::Parse {
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// True when the remote side may hold a resource the caller has not recorded
    pub fn is_unsynced(&self) -> bool {
        matches!(self, CloudError::Unsynced { .. })
    }
}

pub type Result<T> = std::result::Result<T, CloudError>;
