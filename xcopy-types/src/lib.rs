// SPDX-License-Identifier: GPL-3.0-only

//! Canonical domain models for array-side copy offload
//!
//! These types are shared by every layer of the populator storage stack:
//!
//! - **xcopy-contracts**: capability traits are expressed in terms of these types
//! - **xcopy-adapters**: vendor adapters translate backend objects into them
//! - **xcopy-testing**: fakes and lab specs build fixtures from them
//!
//! `Lun`, `Host` and `MappingRecord` describe objects owned by the storage array.
//! `MappingContext` is the only value owned by the caller, and it lives for a
//! single orchestration run.

pub mod backend;
pub mod context;
pub mod host;
pub mod lun;

pub use backend::BackendKind;
pub use context::MappingContext;
pub use host::{Host, MappingRecord, Port, PortProtocol};
pub use lun::{Lun, PersistentVolume, StorageProtocol};
