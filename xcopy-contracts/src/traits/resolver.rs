// SPDX-License-Identifier: GPL-3.0-only

use xcopy_types::{Lun, PersistentVolume};

use crate::StorageError;

pub trait VolumeResolver: Send + Sync {
    /// Pure lookup of the backend LUN behind an orchestrator volume.
    fn resolve_volume_handle_to_lun(&self, volume: &PersistentVolume) -> Result<Lun, StorageError>;
}
