// SPDX-License-Identifier: GPL-3.0-only

//! Vendor storage adapters for array-side copy offload
//!
//! Each adapter implements [`xcopy_contracts::CopyOffloadAdapter`] against a
//! narrow API seam (`Par3Api`, `PowerFlexApi`, `InfiniboxApi`). The vendor SDK
//! bindings implement those seams; this crate owns the mapping logic:
//! - host and adapter identity matching
//! - idempotent map/unmap reconciliation
//! - mapped-group discovery
//!
//! Adapters hold no cached array state. Every call re-reads the backend.

pub mod config;
pub mod domain;
pub mod error;
pub mod infinibox;
pub mod powerflex;
pub mod primera3par;
pub mod retry;
pub mod routing;

pub use config::{AccessMode, BackendConfig, Credentials, PowerFlexMappingOptions, RetrySettings};
pub use error::ApiError;
pub use infinibox::{InfiniboxApi, InfiniboxClonner};
pub use powerflex::{PowerFlexApi, PowerFlexClonner};
pub use primera3par::{Par3Api, Par3Clonner};
pub use retry::RetryPolicy;
pub use routing::{AdapterRoute, BackendClient, build_adapter};
