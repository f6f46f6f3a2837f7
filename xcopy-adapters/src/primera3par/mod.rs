// SPDX-License-Identifier: GPL-3.0-only

//! FC/iSCSI SAN arrays (HPE Primera / 3PAR)
//!
//! The initiator group is a host set. Group setup creates the cloning host when
//! the array does not know it yet and adds it to the set; volumes are exported
//! to the whole set through VLUNs.

pub mod api;
pub mod clonner;

pub use api::{Par3Api, Par3Volume, VLun};
pub use clonner::Par3Clonner;

/// NAA vendor prefix of volumes exported by these arrays.
pub const PROVIDER_ID: &str = "60002ac";

/// VLUN host name prefix addressing a host set.
pub const HOST_SET_PREFIX: &str = "set:";
