// SPDX-License-Identifier: GPL-3.0-only

use serde::{Deserialize, Serialize};
use xcopy_types::Host;

use crate::config::Credentials;
use crate::error::ApiResult;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Par3Volume {
    pub id: u64,
    pub name: String,
    pub wwn: String,
}

/// Export of a volume to a host (`hostname`) or host set (`set:<name>`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VLun {
    pub volume_name: String,
    pub lun: u32,
    pub hostname: String,
}

/// Calls the adapter needs from the array's web services API.
pub trait Par3Api: Send + Sync {
    fn authenticate(&self, credentials: &Credentials<'_>) -> ApiResult<()>;

    fn list_hosts(&self) -> ApiResult<Vec<Host>>;

    /// Creates a host owning the given FC WWPNs or iSCSI names.
    fn create_host(&self, name: &str, ports: &[String]) -> ApiResult<Host>;

    fn host_set_exists(&self, name: &str) -> ApiResult<bool>;

    fn create_host_set(&self, name: &str) -> ApiResult<()>;

    fn host_set_members(&self, name: &str) -> ApiResult<Vec<String>>;

    fn add_host_to_host_set(&self, host_set: &str, host_name: &str) -> ApiResult<()>;

    fn get_volume(&self, name: &str) -> ApiResult<Par3Volume>;

    fn list_vluns(&self, volume_name: &str) -> ApiResult<Vec<VLun>>;

    fn create_vlun(&self, volume_name: &str, host_set: &str) -> ApiResult<VLun>;

    fn delete_vlun(&self, volume_name: &str, host_set: &str, lun: u32) -> ApiResult<()>;
}
