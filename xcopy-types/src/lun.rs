// SPDX-License-Identifier: GPL-3.0-only

//! LUN and orchestrator volume models

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Volume attribute carrying the backend volume name.
pub const NAME_ATTRIBUTE: &str = "Name";

/// Volume attribute carrying the declared storage protocol.
pub const STORAGE_PROTOCOL_ATTRIBUTE: &str = "storage_protocol";

/// A unit of block storage on one backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Lun {
    /// Backend-local identifier
    pub name: String,

    /// Backend volume id used for API calls (numeric on some arrays)
    pub ldevice_id: String,

    /// Orchestrator-side volume identity this LUN was resolved from
    pub volume_handle: String,

    /// Backend serial, unique within one backend instance
    pub serial_number: String,

    /// Protocol-specific addressable name
    pub iqn: String,

    /// NAA identifier derived from the serial
    pub naa: String,

    /// Vendor prefix of the NAA identifier, when the backend has one
    pub provider_id: String,
}

impl Lun {
    /// Identifier used in log records and error messages.
    pub fn display_id(&self) -> &str {
        if !self.name.is_empty() {
            &self.name
        } else if !self.serial_number.is_empty() {
            &self.serial_number
        } else {
            &self.ldevice_id
        }
    }
}

/// Storage protocol declared on an orchestrator volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageProtocol {
    Iscsi,
    FibreChannel,
    Other,
}

impl StorageProtocol {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "iscsi" => Self::Iscsi,
            "fc" | "fibrechannel" | "fibre_channel" => Self::FibreChannel,
            _ => Self::Other,
        }
    }
}

/// Projection of an orchestrator persistent volume.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistentVolume {
    pub name: String,
    pub volume_handle: String,
    #[serde(default)]
    pub volume_attributes: BTreeMap<String, String>,
}

impl PersistentVolume {
    pub fn from_handle(volume_handle: impl Into<String>) -> Self {
        Self {
            volume_handle: volume_handle.into(),
            ..Default::default()
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.volume_attributes.insert(key.into(), value.into());
        self
    }

    /// Backend volume name from the `Name` attribute, if set and non-empty.
    pub fn attribute_name(&self) -> Option<&str> {
        self.volume_attributes
            .get(NAME_ATTRIBUTE)
            .map(String::as_str)
            .filter(|name| !name.is_empty())
    }

    pub fn storage_protocol(&self) -> StorageProtocol {
        self.volume_attributes
            .get(STORAGE_PROTOCOL_ATTRIBUTE)
            .map(|value| StorageProtocol::parse(value))
            .unwrap_or(StorageProtocol::Other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_id_prefers_name_then_serial() {
        let mut lun = Lun {
            ldevice_id: "17".to_string(),
            ..Default::default()
        };
        assert_eq!(lun.display_id(), "17");

        lun.serial_number = "742b0f".to_string();
        assert_eq!(lun.display_id(), "742b0f");

        lun.name = "pvc-1".to_string();
        assert_eq!(lun.display_id(), "pvc-1");
    }

    #[test]
    fn protocol_attribute_is_case_insensitive() {
        let pv = PersistentVolume::from_handle("h").with_attribute("storage_protocol", "ISCSI");
        assert_eq!(pv.storage_protocol(), StorageProtocol::Iscsi);

        let pv = PersistentVolume::from_handle("h");
        assert_eq!(pv.storage_protocol(), StorageProtocol::Other);
    }

    #[test]
    fn empty_name_attribute_is_ignored() {
        let pv = PersistentVolume::from_handle("h").with_attribute("Name", "");
        assert_eq!(pv.attribute_name(), None);
    }

    #[test]
    fn persistent_volume_reads_from_json_without_attributes() {
        let pv: PersistentVolume =
            serde_json::from_str(r#"{"name":"pv1","volume_handle":"csi-1"}"#).expect("parse pv");
        assert!(pv.volume_attributes.is_empty());
    }
}
