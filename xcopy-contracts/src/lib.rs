// SPDX-License-Identifier: GPL-3.0-only

pub mod handle;
pub mod protocol;
pub mod traits;

pub use handle::{VolumeHandleParts, parse_volume_handle};
pub use protocol::{OperationId, OperationKind, StorageError, StorageErrorKind};
pub use traits::{CopyOffloadAdapter, InitiatorGroupAdapter, LunMappingAdapter, VolumeResolver};
