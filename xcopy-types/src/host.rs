// SPDX-License-Identifier: GPL-3.0-only

//! Backend host and mapping records
//!
//! These are read-only views of array objects. The populator never mutates a
//! host beyond creating it when absent.

use serde::{Deserialize, Serialize};

/// Addressing convention of a host port.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortProtocol {
    FibreChannel,
    Iscsi,
    Nvme,
    #[default]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Port {
    /// Address as reported by the backend (colon-separated WWPN, IQN, ...)
    pub address: String,
    #[serde(default)]
    pub protocol: PortProtocol,
}

impl Port {
    pub fn new(address: impl Into<String>, protocol: PortProtocol) -> Self {
        Self {
            address: address.into(),
            protocol,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Host {
    pub id: u64,
    pub name: String,
    /// Ports in backend order; matching relies on this order being stable
    #[serde(default)]
    pub ports: Vec<Port>,
}

impl Host {
    pub fn has_port(&self, address: &str) -> bool {
        self.ports.iter().any(|port| port.address == address)
    }
}

/// Association of a volume to a host or host cluster.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingRecord {
    pub host_id: u64,
    #[serde(default)]
    pub host_cluster_id: u64,
    /// Mapped to a host cluster rather than an individual host
    #[serde(default)]
    pub clustered: bool,
    pub lun: u32,
}
