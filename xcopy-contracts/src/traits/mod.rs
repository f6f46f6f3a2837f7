// SPDX-License-Identifier: GPL-3.0-only

pub mod group;
pub mod mapping;
pub mod resolver;

pub use group::InitiatorGroupAdapter;
pub use mapping::LunMappingAdapter;
pub use resolver::VolumeResolver;

use xcopy_types::BackendKind;

/// Uniform capability contract driven by the volume populator.
///
/// Every operation is a blocking call that re-reads array state, so each may
/// be retried any number of times by the caller.
pub trait CopyOffloadAdapter: VolumeResolver + InitiatorGroupAdapter + LunMappingAdapter {
    fn backend_kind(&self) -> BackendKind;
}
