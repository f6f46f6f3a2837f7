// SPDX-License-Identifier: GPL-3.0-only

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use xcopy_types::{BackendKind, PersistentVolume};

use crate::errors::{Result, TestingError};

/// One clone workflow against a seeded in-memory array.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabSpec {
    pub name: String,
    pub backend: BackendKind,
    /// PowerFlex system the volume handle points at
    pub system_id: Option<String>,
    pub initiator_group: String,
    pub adapter_ids: Vec<String>,
    /// Hosts, host sets or SDCs the volume is already exported to
    #[serde(default)]
    pub existing_mappings: Vec<String>,
    pub volume: VolumeSpec,
    #[serde(default)]
    pub hosts: Vec<HostSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeSpec {
    pub handle: String,
    /// Array-side volume name, published as the `Name` attribute
    pub name: Option<String>,
    pub protocol: Option<String>,
    /// Numeric array id (InfiniBox, Primera/3PAR)
    pub id: Option<u64>,
    /// Serial (InfiniBox) or WWN (Primera/3PAR)
    pub serial: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostSpec {
    pub name: String,
    /// SDC id on PowerFlex
    pub id: Option<String>,
    #[serde(default)]
    pub ports: Vec<String>,
}

impl VolumeSpec {
    pub fn persistent_volume(&self) -> PersistentVolume {
        let mut volume = PersistentVolume::from_handle(self.handle.clone());
        if let Some(name) = &self.name {
            volume = volume.with_attribute(xcopy_types::lun::NAME_ATTRIBUTE, name.clone());
        }
        if let Some(protocol) = &self.protocol {
            volume = volume.with_attribute(
                xcopy_types::lun::STORAGE_PROTOCOL_ATTRIBUTE,
                protocol.clone(),
            );
        }
        volume
    }
}

pub fn workspace_root() -> PathBuf {
    if let Ok(value) = std::env::var("XCOPY_TESTING_WORKSPACE_ROOT") {
        return PathBuf::from(value);
    }

    if let Ok(current_dir) = std::env::current_dir()
        && current_dir.join("resources/lab-specs").exists()
    {
        return current_dir;
    }

    let manifest_root = Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();

    if manifest_root.join("resources/lab-specs").exists() {
        return manifest_root;
    }

    PathBuf::from(".")
}

pub fn specs_root() -> PathBuf {
    workspace_root().join("resources/lab-specs")
}

pub fn spec_path_for_name(spec_name: &str) -> PathBuf {
    specs_root().join(format!("{}.toml", spec_name))
}

/// Names of the specs under `resources/lab-specs`, sorted.
pub fn list_names() -> Result<Vec<String>> {
    let root = specs_root();
    let entries = fs::read_dir(&root).map_err(|error| TestingError::LabIo {
        reason: format!("{}: {error}", root.display()),
    })?;

    let mut names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "toml"))
        .filter_map(|path| path.file_stem().map(|stem| stem.to_string_lossy().into_owned()))
        .collect();
    names.sort();
    Ok(names)
}

pub fn load_by_name(spec_name: &str) -> Result<LabSpec> {
    let path = spec_path_for_name(spec_name);
    if !path.exists() {
        return Err(TestingError::SpecNotFound {
            spec_name: spec_name.to_string(),
        });
    }

    let raw = fs::read_to_string(&path).map_err(|error| TestingError::SpecInvalid {
        spec_name: spec_name.to_string(),
        reason: error.to_string(),
    })?;

    parse(spec_name, &raw)
}

pub fn parse(spec_name: &str, raw: &str) -> Result<LabSpec> {
    let spec: LabSpec = toml::from_str(raw).map_err(|error| TestingError::SpecInvalid {
        spec_name: spec_name.to_string(),
        reason: error.to_string(),
    })?;

    validate(&spec)?;
    Ok(spec)
}

fn invalid(spec: &LabSpec, reason: &str) -> TestingError {
    TestingError::SpecInvalid {
        spec_name: spec.name.clone(),
        reason: reason.to_string(),
    }
}

pub fn validate(spec: &LabSpec) -> Result<()> {
    if spec.name.is_empty() {
        return Err(TestingError::SpecInvalid {
            spec_name: "<unknown>".to_string(),
            reason: "name must not be empty".to_string(),
        });
    }

    if spec.initiator_group.is_empty() {
        return Err(invalid(spec, "initiator_group must not be empty"));
    }

    if spec.volume.handle.is_empty() {
        return Err(invalid(spec, "volume.handle must not be empty"));
    }

    match spec.backend {
        BackendKind::PowerFlex => {
            if spec.system_id.as_deref().is_none_or(str::is_empty) {
                return Err(invalid(spec, "powerflex specs need a system_id"));
            }
            if spec.hosts.iter().any(|host| host.id.is_none()) {
                return Err(invalid(spec, "powerflex hosts need an SDC id"));
            }
        }
        BackendKind::Infinibox | BackendKind::Primera3Par => {
            if spec.volume.name.is_none() {
                return Err(invalid(spec, "volume.name must be set"));
            }
            if spec.volume.id.is_none() || spec.volume.serial.is_none() {
                return Err(invalid(spec, "volume.id and volume.serial must be set"));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_spec_name_without_extension() {
        let spec = load_by_name("infinibox-fc").unwrap();
        assert_eq!(spec.name, "infinibox-fc");
        assert_eq!(spec.backend, BackendKind::Infinibox);
    }

    #[test]
    fn lists_bundled_specs() {
        let names = list_names().unwrap();
        assert!(names.contains(&"powerflex-sdc".to_string()));
        assert!(names.contains(&"primera-host-set".to_string()));
    }

    #[test]
    fn powerflex_spec_requires_system_id() {
        let raw = r#"
            name = "broken"
            backend = "powerflex"
            initiator_group = "sdc-1"
            adapter_ids = []

            [volume]
            handle = "sys-vol"
        "#;
        let error = parse("broken", raw).unwrap_err();
        assert!(error.to_string().contains("system_id"));
    }

    #[test]
    fn volume_attributes_flow_into_persistent_volume() {
        let volume = VolumeSpec {
            handle: "pvc-1".to_string(),
            name: Some("ibox-vol-1".to_string()),
            protocol: Some("iscsi".to_string()),
            id: Some(1),
            serial: Some("742b0f".to_string()),
        };
        let pv = volume.persistent_volume();
        assert_eq!(pv.attribute_name(), Some("ibox-vol-1"));
        assert_eq!(pv.storage_protocol(), xcopy_types::StorageProtocol::Iscsi);
    }
}
