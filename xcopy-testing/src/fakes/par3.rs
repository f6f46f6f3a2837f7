// SPDX-License-Identifier: GPL-3.0-only

use std::collections::BTreeMap;
use std::sync::Mutex;

use xcopy_adapters::ApiError;
use xcopy_adapters::Credentials;
use xcopy_adapters::error::ApiResult;
use xcopy_adapters::primera3par::{HOST_SET_PREFIX, Par3Api, Par3Volume, VLun};
use xcopy_types::{Host, Port, PortProtocol};

use super::{FaultInjection, FaultPlan, lock};

#[derive(Debug, Default)]
struct State {
    hosts: Vec<Host>,
    host_sets: BTreeMap<String, Vec<String>>,
    volumes: Vec<Par3Volume>,
    vluns: Vec<VLun>,
    faults: FaultPlan,
}

impl State {
    fn next_host_id(&self) -> u64 {
        self.hosts.iter().map(|host| host.id).max().map_or(1, |id| id + 1)
    }

    fn next_lun(&self, volume_name: &str) -> u32 {
        self.vluns
            .iter()
            .filter(|vlun| vlun.volume_name == volume_name)
            .map(|vlun| vlun.lun)
            .max()
            .map_or(0, |lun| lun + 1)
    }
}

#[derive(Debug, Default)]
pub struct FakePar3 {
    state: Mutex<State>,
}

fn port(address: &str) -> Port {
    let protocol = if address.starts_with("iqn.") {
        PortProtocol::Iscsi
    } else {
        PortProtocol::FibreChannel
    };
    Port::new(address, protocol)
}

impl FakePar3 {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_host(self, name: &str, ports: &[&str]) -> Self {
        {
            let mut state = lock(&self.state);
            let id = state.next_host_id();
            state.hosts.push(Host {
                id,
                name: name.to_string(),
                ports: ports.iter().map(|address| port(address)).collect(),
            });
        }
        self
    }

    pub fn with_host_set(self, name: &str, members: &[&str]) -> Self {
        lock(&self.state).host_sets.insert(
            name.to_string(),
            members.iter().map(|member| member.to_string()).collect(),
        );
        self
    }

    pub fn with_volume(self, id: u64, name: &str, wwn: &str) -> Self {
        lock(&self.state).volumes.push(Par3Volume {
            id,
            name: name.to_string(),
            wwn: wwn.to_string(),
        });
        self
    }

    /// Exports a volume to a host set outside of any adapter call.
    pub fn with_export(self, volume_name: &str, host_set: &str) -> Self {
        {
            let mut state = lock(&self.state);
            let lun = state.next_lun(volume_name);
            state.vluns.push(VLun {
                volume_name: volume_name.to_string(),
                lun,
                hostname: format!("{HOST_SET_PREFIX}{host_set}"),
            });
        }
        self
    }

    pub fn vluns_of(&self, volume_name: &str) -> Vec<VLun> {
        lock(&self.state)
            .vluns
            .iter()
            .filter(|vlun| vlun.volume_name == volume_name)
            .cloned()
            .collect()
    }

    pub fn host_names(&self) -> Vec<String> {
        lock(&self.state)
            .hosts
            .iter()
            .map(|host| host.name.clone())
            .collect()
    }

    pub fn host_set_members_of(&self, name: &str) -> Option<Vec<String>> {
        lock(&self.state).host_sets.get(name).cloned()
    }
}

impl FaultInjection for FakePar3 {
    fn with_faults<R>(&self, f: impl FnOnce(&mut FaultPlan) -> R) -> R {
        f(&mut lock(&self.state).faults)
    }
}

impl Par3Api for FakePar3 {
    fn authenticate(&self, _credentials: &Credentials<'_>) -> ApiResult<()> {
        lock(&self.state).faults.enter("authenticate")
    }

    fn list_hosts(&self) -> ApiResult<Vec<Host>> {
        let mut state = lock(&self.state);
        state.faults.enter("list_hosts")?;
        Ok(state.hosts.clone())
    }

    fn create_host(&self, name: &str, ports: &[String]) -> ApiResult<Host> {
        let mut state = lock(&self.state);
        state.faults.enter("create_host")?;

        if state.hosts.iter().any(|host| host.name == name) {
            return Err(ApiError::Rejected(format!("host {name} already exists")));
        }
        if let Some(owner) = state
            .hosts
            .iter()
            .find(|host| ports.iter().any(|address| host.has_port(address)))
        {
            return Err(ApiError::Rejected(format!(
                "a requested port is already used by host {}",
                owner.name
            )));
        }

        let host = Host {
            id: state.next_host_id(),
            name: name.to_string(),
            ports: ports.iter().map(|address| port(address)).collect(),
        };
        state.hosts.push(host.clone());
        Ok(host)
    }

    fn host_set_exists(&self, name: &str) -> ApiResult<bool> {
        let mut state = lock(&self.state);
        state.faults.enter("host_set_exists")?;
        Ok(state.host_sets.contains_key(name))
    }

    fn create_host_set(&self, name: &str) -> ApiResult<()> {
        let mut state = lock(&self.state);
        state.faults.enter("create_host_set")?;
        if state.host_sets.contains_key(name) {
            return Err(ApiError::Rejected(format!("host set {name} already exists")));
        }
        state.host_sets.insert(name.to_string(), Vec::new());
        Ok(())
    }

    fn host_set_members(&self, name: &str) -> ApiResult<Vec<String>> {
        let mut state = lock(&self.state);
        state.faults.enter("host_set_members")?;
        state
            .host_sets
            .get(name)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("host set {name}")))
    }

    fn add_host_to_host_set(&self, host_set: &str, host_name: &str) -> ApiResult<()> {
        let mut state = lock(&self.state);
        state.faults.enter("add_host_to_host_set")?;

        if !state.hosts.iter().any(|host| host.name == host_name) {
            return Err(ApiError::NotFound(format!("host {host_name}")));
        }
        let members = state
            .host_sets
            .get_mut(host_set)
            .ok_or_else(|| ApiError::NotFound(format!("host set {host_set}")))?;
        if members.iter().any(|member| member == host_name) {
            return Err(ApiError::Rejected(format!(
                "host {host_name} is already a member of {host_set}"
            )));
        }
        members.push(host_name.to_string());
        Ok(())
    }

    fn get_volume(&self, name: &str) -> ApiResult<Par3Volume> {
        let mut state = lock(&self.state);
        state.faults.enter("get_volume")?;
        state
            .volumes
            .iter()
            .find(|volume| volume.name == name)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("volume {name}")))
    }

    fn list_vluns(&self, volume_name: &str) -> ApiResult<Vec<VLun>> {
        let mut state = lock(&self.state);
        state.faults.enter("list_vluns")?;
        Ok(state
            .vluns
            .iter()
            .filter(|vlun| vlun.volume_name == volume_name)
            .cloned()
            .collect())
    }

    fn create_vlun(&self, volume_name: &str, host_set: &str) -> ApiResult<VLun> {
        let mut state = lock(&self.state);
        state.faults.enter("create_vlun")?;

        if !state.volumes.iter().any(|volume| volume.name == volume_name) {
            return Err(ApiError::NotFound(format!("volume {volume_name}")));
        }
        if !state.host_sets.contains_key(host_set) {
            return Err(ApiError::NotFound(format!("host set {host_set}")));
        }
        let hostname = format!("{HOST_SET_PREFIX}{host_set}");
        if state
            .vluns
            .iter()
            .any(|vlun| vlun.volume_name == volume_name && vlun.hostname == hostname)
        {
            return Err(ApiError::Rejected(format!(
                "volume {volume_name} is already exported to {hostname}"
            )));
        }

        let vlun = VLun {
            volume_name: volume_name.to_string(),
            lun: state.next_lun(volume_name),
            hostname,
        };
        state.vluns.push(vlun.clone());
        Ok(vlun)
    }

    fn delete_vlun(&self, volume_name: &str, host_set: &str, lun: u32) -> ApiResult<()> {
        let mut state = lock(&self.state);
        state.faults.enter("delete_vlun")?;

        let hostname = format!("{HOST_SET_PREFIX}{host_set}");
        let before = state.vluns.len();
        state.vluns.retain(|vlun| {
            !(vlun.volume_name == volume_name && vlun.hostname == hostname && vlun.lun == lun)
        });
        if state.vluns.len() == before {
            return Err(ApiError::NotFound(format!(
                "VLUN {lun} of {volume_name} for {hostname}"
            )));
        }
        Ok(())
    }
}
