// SPDX-License-Identifier: GPL-3.0-only

//! Scale-out block arrays (InfiniBox)
//!
//! Hosts carry several ports; the cloning host is found by adapter identity and
//! volumes are mapped by (host id, volume id).

pub mod api;
pub mod clonner;

pub use api::{IboxVolume, InfiniboxApi};
pub use clonner::InfiniboxClonner;
