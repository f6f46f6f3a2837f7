// SPDX-License-Identifier: GPL-3.0-only

//! Adapter identity matching
//!
//! The hypervisor reports its storage adapters as `fc.<wwnn>:<wwpn>` for Fibre
//! Channel and as the bare IQN for iSCSI. Arrays report host ports in their own
//! notation, usually colon-separated WWPN bytes. Fibre Channel identifiers are
//! compared on their hex digits only; everything else must match exactly.

use tracing::{debug, warn};
use xcopy_contracts::StorageError;
use xcopy_types::Host;

pub const FC_PREFIX: &str = "fc.";

/// Hex digits in a WWNN or WWPN.
const WWN_HEX_DIGITS: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdapterIdentity {
    FibreChannel { wwpn: String },
    Literal(String),
}

impl AdapterIdentity {
    pub fn parse(adapter_id: &str) -> Result<Self, StorageError> {
        if adapter_id.starts_with(FC_PREFIX) {
            let wwpn = extract_wwpn(adapter_id)?;
            Ok(Self::FibreChannel { wwpn })
        } else {
            Ok(Self::Literal(adapter_id.to_string()))
        }
    }

    pub fn matches_port(&self, port_address: &str) -> bool {
        match self {
            Self::FibreChannel { wwpn } => {
                let other = if port_address.starts_with(FC_PREFIX) {
                    match extract_wwpn(port_address) {
                        Ok(other) => other,
                        Err(_) => return false,
                    }
                } else {
                    port_address.to_string()
                };
                compare_wwns(wwpn, &other)
            }
            Self::Literal(id) => {
                if port_address.starts_with(FC_PREFIX) {
                    // Let the prefixed side drive the comparison
                    return Self::parse(port_address)
                        .map(|identity| identity.matches_port(id))
                        .unwrap_or(false);
                }
                id == port_address
            }
        }
    }
}

/// Returns the WWPN of an `fc.` adapter identifier, normalized.
///
/// `fc.<wwnn>:<wwpn>` yields the WWPN half; any other shape is taken whole.
pub fn extract_wwpn(adapter_id: &str) -> Result<String, StorageError> {
    let raw = adapter_id.strip_prefix(FC_PREFIX).ok_or_else(|| {
        StorageError::invalid_state(format!(
            "adapter id '{adapter_id}' is not a Fibre Channel identifier"
        ))
    })?;

    let wwpn = match raw.split_once(':') {
        Some((wwnn, wwpn))
            if normalize_wwn(wwnn).len() == WWN_HEX_DIGITS
                && normalize_wwn(wwpn).len() == WWN_HEX_DIGITS
                && !wwpn.contains(':') =>
        {
            normalize_wwn(wwpn)
        }
        _ => normalize_wwn(raw),
    };

    if wwpn.is_empty() {
        return Err(StorageError::invalid_state(format!(
            "adapter id '{adapter_id}' carries no WWPN"
        )));
    }

    Ok(wwpn)
}

/// Hex digits only, lower-cased.
pub fn normalize_wwn(wwn: &str) -> String {
    wwn.chars()
        .filter(char::is_ascii_hexdigit)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

pub fn compare_wwns(a: &str, b: &str) -> bool {
    let a = normalize_wwn(a);
    !a.is_empty() && a == normalize_wwn(b)
}

/// Symmetric comparison of an adapter identifier and a port address.
pub fn identifiers_match(adapter_id: &str, port_address: &str) -> bool {
    match AdapterIdentity::parse(adapter_id) {
        Ok(identity) => identity.matches_port(port_address),
        Err(e) => {
            warn!(adapter_id = %adapter_id, error = %e, "ignoring unparsable adapter id");
            false
        }
    }
}

pub fn no_matching_host(adapter_ids: &[String]) -> StorageError {
    StorageError::not_found(format!(
        "no host found with adapter IDs [{}]",
        adapter_ids.join(", ")
    ))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostMatch<'a> {
    pub host: &'a Host,
    pub port_address: &'a str,
    pub adapter_id: &'a str,
}

pub trait HostMatchDomain: Send + Sync {
    fn find_host<'a>(
        &self,
        hosts: &'a [Host],
        adapter_ids: &'a [String],
    ) -> Option<HostMatch<'a>>;
}

/// First (host, port) in backend order matching any identifier wins.
pub struct HostMatchPolicy;

impl HostMatchDomain for HostMatchPolicy {
    fn find_host<'a>(
        &self,
        hosts: &'a [Host],
        adapter_ids: &'a [String],
    ) -> Option<HostMatch<'a>> {
        let identities: Vec<(&str, AdapterIdentity)> = adapter_ids
            .iter()
            .filter_map(|id| match AdapterIdentity::parse(id) {
                Ok(identity) => Some((id.as_str(), identity)),
                Err(e) => {
                    warn!(adapter_id = %id, error = %e, "ignoring unparsable adapter id");
                    None
                }
            })
            .collect();

        for host in hosts {
            for port in &host.ports {
                for (adapter_id, identity) in &identities {
                    if identity.matches_port(&port.address) {
                        debug!(
                            host = %host.name,
                            adapter_id = %adapter_id,
                            port = %port.address,
                            "matched host port"
                        );
                        return Some(HostMatch {
                            host,
                            port_address: &port.address,
                            adapter_id: *adapter_id,
                        });
                    }
                }
            }
        }

        None
    }
}
