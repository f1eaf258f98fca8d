//! apimflow cloud core
//!
//! Provider-agnostic building blocks for declarative resource reconcilers:
//! schemas checked at the configuration boundary, resource identities, the
//! [`Reconciler`] trait and the host-side record store.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                   apim CLI                      │
//! │          (apply / refresh / destroy)            │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │                apimflow-cloud                   │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │      trait Reconciler { ... }            │   │
//! │  └──────────────────────────────────────────┘   │
//! │  ┌──────────┐  ┌─────────────┐  ┌───────────┐   │
//! │  │  Schema  │  │ ResourceId  │  │ State Mgmt│   │
//! │  └──────────┘  └─────────────┘  └───────────┘   │
//! └───────┬─────────────────────────────────────────┘
//!         │
//! ┌───────▼───────────────┐
//! │ apimflow-cloud-azure  │
//! │ (API Management, ARM) │
//! └───────────────────────┘
//! ```

pub mod action;
pub mod error;
pub mod reconciler;
pub mod resource_id;
pub mod schema;
pub mod state;

// Re-exports
pub use action::{ActionResult, ActionType, ApplyResult};
pub use error::{CloudError, Result};
pub use reconciler::{Applied, Reconciler};
pub use resource_id::ResourceId;
pub use schema::{Attribute, AttributeType, Block, Diagnostic, Schema};
pub use state::{
    GlobalState, ResourceState, ResourceStatus, STALE_LOCK_AFTER, StateLock, StateManager,
};
