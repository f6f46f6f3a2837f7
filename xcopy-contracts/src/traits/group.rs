// SPDX-License-Identifier: GPL-3.0-only

use xcopy_types::MappingContext;

use crate::StorageError;

pub trait InitiatorGroupAdapter: Send + Sync {
    /// Creates or locates the initiator group for the cloning host.
    ///
    /// Fails with `NotFound` when no backend host matches any identifier.
    fn ensure_clonner_igroup(
        &self,
        initiator_group: &str,
        adapter_ids: &[String],
    ) -> Result<MappingContext, StorageError>;
}
