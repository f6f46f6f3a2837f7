// SPDX-License-Identifier: GPL-3.0-only

//! Software-defined block storage (PowerFlex)
//!
//! There is no initiator group object: the storage data client (SDC) of the
//! cloning host is the group, and volumes are mapped straight to it.

pub mod api;
pub mod clonner;

pub use api::{
    MapVolumeSdcParam, MappedSdcInfo, PowerFlexApi, PowerFlexSystem, PowerFlexVolume, Sdc,
    UnmapVolumeSdcParam,
};
pub use clonner::PowerFlexClonner;
