// SPDX-License-Identifier: GPL-3.0-only

pub mod identity;

pub use identity::{
    AdapterIdentity, HostMatch, HostMatchDomain, HostMatchPolicy, compare_wwns, extract_wwpn,
    identifiers_match, no_matching_host, normalize_wwn,
};
