// SPDX-License-Identifier: GPL-3.0-only

use xcopy_types::{Lun, MappingContext};

use crate::StorageError;

pub trait LunMappingAdapter: Send + Sync {
    /// Ensures the LUN is visible to the group; mapping twice is a no-op.
    fn map(
        &self,
        initiator_group: &str,
        lun: &Lun,
        context: &MappingContext,
    ) -> Result<Lun, StorageError>;

    /// Removes the mapping; unmapping an unmapped LUN succeeds.
    fn unmap(
        &self,
        initiator_group: &str,
        lun: &Lun,
        context: &MappingContext,
    ) -> Result<(), StorageError>;

    /// Groups the LUN is mapped to, empty when unmapped.
    ///
    /// Adapters may record discovered facts (the peer host) in `context`.
    fn current_mapped_groups(
        &self,
        lun: &Lun,
        context: &mut MappingContext,
    ) -> Result<Vec<String>, StorageError>;
}
