// SPDX-License-Identifier: GPL-3.0-only

//! CSI volume handle parsing
//!
//! Drivers that encode the owning system in the handle use the form
//! `<system-id>-<volume-id>`.

use crate::StorageError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeHandleParts<'a> {
    pub system_id: &'a str,
    pub volume_id: &'a str,
}

pub fn parse_volume_handle(volume_handle: &str) -> Result<VolumeHandleParts<'_>, StorageError> {
    let mut parts = volume_handle.split('-');
    let system_id = parts.next().unwrap_or_default();
    let volume_id = parts.next().ok_or_else(|| {
        StorageError::invalid_state(format!(
            "volume handle '{volume_handle}' is not in <system-id>-<volume-id> form"
        ))
    })?;

    if system_id.is_empty() || volume_id.is_empty() {
        return Err(StorageError::invalid_state(format!(
            "volume handle '{volume_handle}' has an empty system or volume id"
        )));
    }

    Ok(VolumeHandleParts {
        system_id,
        volume_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StorageErrorKind;

    #[test]
    fn splits_system_and_volume() {
        let parts = parse_volume_handle("csi-12345").expect("parse handle");
        assert_eq!(parts.system_id, "csi");
        assert_eq!(parts.volume_id, "12345");
    }

    #[test]
    fn handle_without_separator_is_invalid() {
        let error = parse_volume_handle("malformed").unwrap_err();
        assert_eq!(error.kind, StorageErrorKind::InvalidState);
        assert!(parse_volume_handle("csi12345").is_err());
    }

    #[test]
    fn empty_components_are_invalid() {
        assert!(parse_volume_handle("csi-").is_err());
        assert!(parse_volume_handle("-12345").is_err());
        assert!(parse_volume_handle("").is_err());
    }
}
