// SPDX-License-Identifier: GPL-3.0-only

use serde::{Deserialize, Serialize};

use crate::config::{AccessMode, Credentials};
use crate::error::ApiResult;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerFlexSystem {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappedSdcInfo {
    pub sdc_id: String,
    #[serde(default)]
    pub sdc_ip: String,
    #[serde(default)]
    pub access_mode: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerFlexVolume {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub mapped_sdc_info: Vec<MappedSdcInfo>,
}

impl PowerFlexVolume {
    pub fn is_mapped_to(&self, sdc_id: &str) -> bool {
        self.mapped_sdc_info.iter().any(|info| info.sdc_id == sdc_id)
    }
}

/// Storage data client installed on a host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sdc {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub sdc_guid: String,
    #[serde(default)]
    pub sdc_ip: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapVolumeSdcParam {
    pub sdc_id: String,
    pub allow_multiple_mappings: bool,
    pub all_sdcs: bool,
    pub access_mode: AccessMode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnmapVolumeSdcParam {
    pub sdc_id: String,
    pub ignore_scsi_initiators: bool,
    pub all_sdcs: bool,
}

/// Calls the adapter needs from the PowerFlex gateway.
pub trait PowerFlexApi: Send + Sync {
    fn authenticate(&self, credentials: &Credentials<'_>) -> ApiResult<()>;

    fn find_system(&self, system_id: &str) -> ApiResult<PowerFlexSystem>;

    /// Volumes with the given id; empty when none exists.
    fn get_volume(&self, volume_id: &str) -> ApiResult<Vec<PowerFlexVolume>>;

    fn list_sdcs(&self) -> ApiResult<Vec<Sdc>>;

    fn map_volume_sdc(&self, volume_id: &str, param: &MapVolumeSdcParam) -> ApiResult<()>;

    fn unmap_volume_sdc(&self, volume_id: &str, param: &UnmapVolumeSdcParam) -> ApiResult<()>;
}
