// SPDX-License-Identifier: GPL-3.0-only

use std::collections::BTreeMap;
use std::sync::Mutex;

use xcopy_adapters::ApiError;
use xcopy_adapters::Credentials;
use xcopy_adapters::error::ApiResult;
use xcopy_adapters::infinibox::{IboxVolume, InfiniboxApi};
use xcopy_types::{Host, MappingRecord, Port, PortProtocol};

use super::{FaultInjection, FaultPlan, lock};

#[derive(Debug, Default)]
struct State {
    hosts: Vec<Host>,
    volumes: Vec<IboxVolume>,
    mappings: BTreeMap<u64, Vec<MappingRecord>>,
    faults: FaultPlan,
}

impl State {
    fn volume_exists(&self, volume_id: u64) -> bool {
        self.volumes.iter().any(|volume| volume.id == volume_id)
    }

    fn next_lun(&self, volume_id: u64) -> u32 {
        self.mappings
            .get(&volume_id)
            .and_then(|records| records.iter().map(|record| record.lun).max())
            .map_or(1, |lun| lun + 1)
    }
}

#[derive(Debug, Default)]
pub struct FakeInfinibox {
    state: Mutex<State>,
}

impl FakeInfinibox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_host(self, id: u64, name: &str, ports: &[&str]) -> Self {
        lock(&self.state).hosts.push(Host {
            id,
            name: name.to_string(),
            ports: ports
                .iter()
                .map(|address| Port::new(*address, protocol_of(address)))
                .collect(),
        });
        self
    }

    pub fn with_volume(self, id: u64, name: &str, serial: &str) -> Self {
        lock(&self.state).volumes.push(IboxVolume {
            id,
            name: name.to_string(),
            serial: serial.to_string(),
        });
        self
    }

    /// Maps the volume to a host outside of any adapter call.
    pub fn with_mapping(self, volume_id: u64, host_id: u64) -> Self {
        {
            let mut state = lock(&self.state);
            let lun = state.next_lun(volume_id);
            state.mappings.entry(volume_id).or_default().push(MappingRecord {
                host_id,
                host_cluster_id: 0,
                clustered: false,
                lun,
            });
        }
        self
    }

    /// Maps the volume to a host cluster.
    pub fn with_cluster_mapping(self, volume_id: u64, host_cluster_id: u64) -> Self {
        {
            let mut state = lock(&self.state);
            let lun = state.next_lun(volume_id);
            state.mappings.entry(volume_id).or_default().push(MappingRecord {
                host_id: 0,
                host_cluster_id,
                clustered: true,
                lun,
            });
        }
        self
    }

    /// Adds a raw mapping record, e.g. a cluster mapping naming a member host.
    pub fn with_record(self, volume_id: u64, record: MappingRecord) -> Self {
        lock(&self.state).mappings.entry(volume_id).or_default().push(record);
        self
    }

    pub fn mappings_of(&self, volume_id: u64) -> Vec<MappingRecord> {
        lock(&self.state)
            .mappings
            .get(&volume_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn host_count(&self) -> usize {
        lock(&self.state).hosts.len()
    }
}

fn protocol_of(address: &str) -> PortProtocol {
    if address.starts_with("iqn.") {
        PortProtocol::Iscsi
    } else if address.starts_with("nqn.") {
        PortProtocol::Nvme
    } else {
        PortProtocol::FibreChannel
    }
}

impl FaultInjection for FakeInfinibox {
    fn with_faults<R>(&self, f: impl FnOnce(&mut FaultPlan) -> R) -> R {
        f(&mut lock(&self.state).faults)
    }
}

impl InfiniboxApi for FakeInfinibox {
    fn authenticate(&self, _credentials: &Credentials<'_>) -> ApiResult<()> {
        lock(&self.state).faults.enter("authenticate")
    }

    fn get_all_hosts(&self) -> ApiResult<Vec<Host>> {
        let mut state = lock(&self.state);
        state.faults.enter("get_all_hosts")?;
        Ok(state.hosts.clone())
    }

    fn get_host_by_name(&self, name: &str) -> ApiResult<Host> {
        let mut state = lock(&self.state);
        state.faults.enter("get_host_by_name")?;
        state
            .hosts
            .iter()
            .find(|host| host.name == name)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("host {name}")))
    }

    fn get_volume_by_name(&self, name: &str) -> ApiResult<IboxVolume> {
        let mut state = lock(&self.state);
        state.faults.enter("get_volume_by_name")?;
        state
            .volumes
            .iter()
            .find(|volume| volume.name == name)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("volume {name}")))
    }

    fn get_luns_by_volume(&self, volume_id: u64) -> ApiResult<Vec<MappingRecord>> {
        let mut state = lock(&self.state);
        state.faults.enter("get_luns_by_volume")?;
        if !state.volume_exists(volume_id) {
            return Err(ApiError::NotFound(format!("volume id {volume_id}")));
        }
        Ok(state.mappings.get(&volume_id).cloned().unwrap_or_default())
    }

    fn map_volume_to_host(
        &self,
        host_id: u64,
        volume_id: u64,
        lun: u32,
    ) -> ApiResult<MappingRecord> {
        let mut state = lock(&self.state);
        state.faults.enter("map_volume_to_host")?;

        if !state.hosts.iter().any(|host| host.id == host_id) {
            return Err(ApiError::NotFound(format!("host id {host_id}")));
        }
        if !state.volume_exists(volume_id) {
            return Err(ApiError::NotFound(format!("volume id {volume_id}")));
        }
        let already_mapped = state.mappings.get(&volume_id).is_some_and(|records| {
            records
                .iter()
                .any(|record| record.host_id == host_id && !record.clustered)
        });
        if already_mapped {
            return Err(ApiError::Rejected(format!(
                "volume {volume_id} is already mapped to host {host_id}"
            )));
        }

        let record = MappingRecord {
            host_id,
            host_cluster_id: 0,
            clustered: false,
            lun: if lun == 0 { state.next_lun(volume_id) } else { lun },
        };
        state.mappings.entry(volume_id).or_default().push(record);
        Ok(record)
    }

    fn unmap_volume_from_host(&self, host_id: u64, volume_id: u64) -> ApiResult<()> {
        let mut state = lock(&self.state);
        state.faults.enter("unmap_volume_from_host")?;

        let records = state.mappings.entry(volume_id).or_default();
        let before = records.len();
        records.retain(|record| record.clustered || record.host_id != host_id);
        if records.len() == before {
            return Err(ApiError::NotFound(format!(
                "volume {volume_id} is not mapped to host {host_id}"
            )));
        }
        Ok(())
    }
}
