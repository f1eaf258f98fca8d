//! Azure API Management provider for apimflow
//!
//! This crate implements the [`Reconciler`](apimflow_cloud::Reconciler) trait
//! for `azurerm_api_management_service`, backed by the Azure Resource Manager
//! REST API.
//!
//! # Requirements
//!
//! - `ARM_SUBSCRIPTION_ID` and `ARM_ACCESS_TOKEN` env vars (see [`ArmConfig`])
//!
//! # Example
//!
//! ```ignore
//! use apimflow_cloud::Reconciler;
//! use apimflow_cloud_azure::{ApiManagementServiceReconciler, ArmApiServicesClient, ArmConfig};
//!
//! let client = ArmApiServicesClient::new(ArmConfig::from_env()?)?;
//! let reconciler = ApiManagementServiceReconciler::new(client);
//!
//! let config = reconciler.decode(&serde_json::json!({
//!     "name": "svc1",
//!     "resource_group_name": "rg1",
//!     "location": "West US",
//!     "sku": { "name": "Standard", "capacity": 1 },
//!     "publisher": { "name": "Acme", "email": "a@acme.com" }
//! }))?;
//!
//! let applied = reconciler.create(&config).await?;
//! println!("{} -> {:?}", applied.id, applied.observed.gateway_url);
//!
//! reconciler.delete(&applied.id).await?;
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod reconciler;
pub mod service;

pub use client::{ApiServicesClient, ArmApiServicesClient, DeleteOutcome};
pub use config::{ArmConfig, PollConfig};
pub use error::{AzureError, Result};
pub use models::{ServiceProperties, ServiceResource, ServiceSkuProperties, SkuType, VpnType};
pub use reconciler::ApiManagementServiceReconciler;
pub use service::{
    ApiManagementService, ApiManagementServiceState, Publisher, RESOURCE_TYPE, ServiceId, Sku,
};
