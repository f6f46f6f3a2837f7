// SPDX-License-Identifier: GPL-3.0-only

use std::sync::Mutex;

use xcopy_adapters::error::ApiResult;
use xcopy_adapters::powerflex::{
    MapVolumeSdcParam, MappedSdcInfo, PowerFlexApi, PowerFlexSystem, PowerFlexVolume, Sdc,
    UnmapVolumeSdcParam,
};
use xcopy_adapters::{ApiError, Credentials};

use super::{FaultInjection, FaultPlan, lock};

#[derive(Debug)]
struct State {
    system: PowerFlexSystem,
    volumes: Vec<PowerFlexVolume>,
    sdcs: Vec<Sdc>,
    map_requests: Vec<MapVolumeSdcParam>,
    unmap_requests: Vec<UnmapVolumeSdcParam>,
    faults: FaultPlan,
}

#[derive(Debug)]
pub struct FakePowerFlex {
    state: Mutex<State>,
}

impl FakePowerFlex {
    pub fn new(system_id: &str) -> Self {
        Self {
            state: Mutex::new(State {
                system: PowerFlexSystem {
                    id: system_id.to_string(),
                    name: format!("pfx-{system_id}"),
                },
                volumes: Vec::new(),
                sdcs: Vec::new(),
                map_requests: Vec::new(),
                unmap_requests: Vec::new(),
                faults: FaultPlan::default(),
            }),
        }
    }

    pub fn with_sdc(self, id: &str, name: &str, guid: &str, ip: &str) -> Self {
        lock(&self.state).sdcs.push(Sdc {
            id: id.to_string(),
            name: name.to_string(),
            sdc_guid: guid.to_string(),
            sdc_ip: ip.to_string(),
        });
        self
    }

    pub fn with_volume(self, id: &str, name: &str) -> Self {
        lock(&self.state).volumes.push(PowerFlexVolume {
            id: id.to_string(),
            name: name.to_string(),
            mapped_sdc_info: Vec::new(),
        });
        self
    }

    /// Maps the volume to an SDC outside of any adapter call.
    pub fn with_mapping(self, volume_id: &str, sdc_id: &str) -> Self {
        {
            let mut state = lock(&self.state);
            let ip = state
                .sdcs
                .iter()
                .find(|sdc| sdc.id == sdc_id)
                .map(|sdc| sdc.sdc_ip.clone())
                .unwrap_or_default();
            if let Some(volume) = state.volumes.iter_mut().find(|volume| volume.id == volume_id) {
                volume.mapped_sdc_info.push(MappedSdcInfo {
                    sdc_id: sdc_id.to_string(),
                    sdc_ip: ip,
                    access_mode: "ReadWrite".to_string(),
                });
            }
        }
        self
    }

    pub fn mapped_sdcs(&self, volume_id: &str) -> Vec<String> {
        lock(&self.state)
            .volumes
            .iter()
            .find(|volume| volume.id == volume_id)
            .map(|volume| {
                volume
                    .mapped_sdc_info
                    .iter()
                    .map(|info| info.sdc_id.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn map_requests(&self) -> Vec<MapVolumeSdcParam> {
        lock(&self.state).map_requests.clone()
    }

    pub fn unmap_requests(&self) -> Vec<UnmapVolumeSdcParam> {
        lock(&self.state).unmap_requests.clone()
    }
}

impl FaultInjection for FakePowerFlex {
    fn with_faults<R>(&self, f: impl FnOnce(&mut FaultPlan) -> R) -> R {
        f(&mut lock(&self.state).faults)
    }
}

impl PowerFlexApi for FakePowerFlex {
    fn authenticate(&self, _credentials: &Credentials<'_>) -> ApiResult<()> {
        lock(&self.state).faults.enter("authenticate")
    }

    fn find_system(&self, system_id: &str) -> ApiResult<PowerFlexSystem> {
        let mut state = lock(&self.state);
        state.faults.enter("find_system")?;
        if state.system.id != system_id {
            return Err(ApiError::NotFound(format!("system {system_id}")));
        }
        Ok(state.system.clone())
    }

    fn get_volume(&self, volume_id: &str) -> ApiResult<Vec<PowerFlexVolume>> {
        let mut state = lock(&self.state);
        state.faults.enter("get_volume")?;
        Ok(state
            .volumes
            .iter()
            .filter(|volume| volume.id == volume_id)
            .cloned()
            .collect())
    }

    fn list_sdcs(&self) -> ApiResult<Vec<Sdc>> {
        let mut state = lock(&self.state);
        state.faults.enter("list_sdcs")?;
        Ok(state.sdcs.clone())
    }

    fn map_volume_sdc(&self, volume_id: &str, param: &MapVolumeSdcParam) -> ApiResult<()> {
        let mut state = lock(&self.state);
        state.faults.enter("map_volume_sdc")?;
        state.map_requests.push(param.clone());

        let ip = state
            .sdcs
            .iter()
            .find(|sdc| sdc.id == param.sdc_id)
            .map(|sdc| sdc.sdc_ip.clone())
            .ok_or_else(|| ApiError::NotFound(format!("SDC {}", param.sdc_id)))?;
        let volume = state
            .volumes
            .iter_mut()
            .find(|volume| volume.id == volume_id)
            .ok_or_else(|| ApiError::NotFound(format!("volume {volume_id}")))?;

        if volume.is_mapped_to(&param.sdc_id) {
            return Err(ApiError::Rejected(format!(
                "volume {volume_id} is already mapped to SDC {}",
                param.sdc_id
            )));
        }
        if !volume.mapped_sdc_info.is_empty() && !param.allow_multiple_mappings {
            return Err(ApiError::Rejected(format!(
                "volume {volume_id} is mapped elsewhere and multiple mappings are not allowed"
            )));
        }

        volume.mapped_sdc_info.push(MappedSdcInfo {
            sdc_id: param.sdc_id.clone(),
            sdc_ip: ip,
            access_mode: param.access_mode.as_str().to_string(),
        });
        Ok(())
    }

    fn unmap_volume_sdc(&self, volume_id: &str, param: &UnmapVolumeSdcParam) -> ApiResult<()> {
        let mut state = lock(&self.state);
        state.faults.enter("unmap_volume_sdc")?;
        state.unmap_requests.push(param.clone());

        let volume = state
            .volumes
            .iter_mut()
            .find(|volume| volume.id == volume_id)
            .ok_or_else(|| ApiError::NotFound(format!("volume {volume_id}")))?;
        let before = volume.mapped_sdc_info.len();
        volume
            .mapped_sdc_info
            .retain(|info| info.sdc_id != param.sdc_id);
        if volume.mapped_sdc_info.len() == before {
            return Err(ApiError::NotFound(format!(
                "volume {volume_id} is not mapped to SDC {}",
                param.sdc_id
            )));
        }
        Ok(())
    }
}
