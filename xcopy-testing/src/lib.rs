// SPDX-License-Identifier: GPL-3.0-only

//! Test tooling for the copy offload adapters
//!
//! In-memory arrays stand in for the vendor API bindings so the adapters can be
//! driven through whole clone workflows without hardware.

pub mod errors;
pub mod fakes;
pub mod lab;
pub mod spec;
