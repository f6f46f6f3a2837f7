// SPDX-License-Identifier: GPL-3.0-only

use serde::{Deserialize, Serialize};
use xcopy_types::{Host, MappingRecord};

use crate::config::Credentials;
use crate::error::ApiResult;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IboxVolume {
    pub id: u64,
    pub name: String,
    pub serial: String,
}

/// Calls the adapter needs from the InfiniBox management API.
pub trait InfiniboxApi: Send + Sync {
    fn authenticate(&self, credentials: &Credentials<'_>) -> ApiResult<()>;

    fn get_all_hosts(&self) -> ApiResult<Vec<Host>>;

    fn get_host_by_name(&self, name: &str) -> ApiResult<Host>;

    fn get_volume_by_name(&self, name: &str) -> ApiResult<IboxVolume>;

    fn get_luns_by_volume(&self, volume_id: u64) -> ApiResult<Vec<MappingRecord>>;

    /// `lun` 0 lets the array pick the LUN number.
    fn map_volume_to_host(
        &self,
        host_id: u64,
        volume_id: u64,
        lun: u32,
    ) -> ApiResult<MappingRecord>;

    fn unmap_volume_from_host(&self, host_id: u64, volume_id: u64) -> ApiResult<()>;
}
