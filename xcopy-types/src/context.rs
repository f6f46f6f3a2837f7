// SPDX-License-Identifier: GPL-3.0-only

//! Mapping context produced by group setup
//!
//! Group setup resolves which backend host stands for the initiator group and
//! hands those facts to `map`, `unmap` and discovery. The context is recomputed
//! on every orchestration run and never persisted.

use serde::{Deserialize, Serialize};

use crate::Host;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingContext {
    /// Backend id of the host representing the group
    pub host_id: Option<u64>,

    /// Initiator group name the context was built for
    pub logical_host_name: Option<String>,

    /// Backend host (or SDC) that represents the group
    pub real_host_name: Option<String>,

    /// Backend host currently holding the volume, recorded by discovery
    pub peer_host_name: Option<String>,
}

impl MappingContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_host(initiator_group: &str, host: &Host) -> Self {
        Self {
            host_id: Some(host.id),
            logical_host_name: Some(initiator_group.to_string()),
            real_host_name: Some(host.name.clone()),
            peer_host_name: None,
        }
    }

    pub fn for_named(initiator_group: &str, real_host_name: &str) -> Self {
        Self {
            host_id: None,
            logical_host_name: Some(initiator_group.to_string()),
            real_host_name: Some(real_host_name.to_string()),
            peer_host_name: None,
        }
    }

    pub fn host_id(&self) -> Option<u64> {
        self.host_id
    }

    pub fn logical_host_name(&self) -> Option<&str> {
        self.logical_host_name.as_deref()
    }

    pub fn real_host_name(&self) -> Option<&str> {
        self.real_host_name.as_deref()
    }

    pub fn peer_host_name(&self) -> Option<&str> {
        self.peer_host_name.as_deref()
    }

    /// True when `initiator_group` is the group this context was built for.
    pub fn is_logical_group(&self, initiator_group: &str) -> bool {
        self.logical_host_name() == Some(initiator_group)
    }

    /// Records the peer host once; later discoveries keep the first value.
    pub fn record_peer_host(&mut self, host_name: &str) -> bool {
        if self.peer_host_name.is_some() {
            return false;
        }
        self.peer_host_name = Some(host_name.to_string());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Port, PortProtocol};

    fn host() -> Host {
        Host {
            id: 7,
            name: "esx-01".to_string(),
            ports: vec![Port::new("21:00:00:11:22:33:44:55", PortProtocol::FibreChannel)],
        }
    }

    #[test]
    fn for_host_fills_identity_fields() {
        let ctx = MappingContext::for_host("grp1", &host());
        assert_eq!(ctx.host_id(), Some(7));
        assert_eq!(ctx.logical_host_name(), Some("grp1"));
        assert_eq!(ctx.real_host_name(), Some("esx-01"));
        assert!(ctx.is_logical_group("grp1"));
        assert!(!ctx.is_logical_group("ocp-node"));
    }

    #[test]
    fn peer_host_is_recorded_once() {
        let mut ctx = MappingContext::new();
        assert!(ctx.record_peer_host("ocp-worker-1"));
        assert!(!ctx.record_peer_host("ocp-worker-2"));
        assert_eq!(ctx.peer_host_name(), Some("ocp-worker-1"));
    }
}
