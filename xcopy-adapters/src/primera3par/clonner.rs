// SPDX-License-Identifier: GPL-3.0-only

use std::sync::Arc;

use tracing::{debug, info, warn};
use xcopy_contracts::{
    CopyOffloadAdapter, InitiatorGroupAdapter, LunMappingAdapter, OperationKind, StorageError,
    VolumeResolver,
};
use xcopy_types::{BackendKind, Host, Lun, MappingContext, PersistentVolume};

use super::api::{Par3Api, Par3Volume, VLun};
use super::{HOST_SET_PREFIX, PROVIDER_ID};
use crate::config::BackendConfig;
use crate::domain::{AdapterIdentity, HostMatchDomain, HostMatchPolicy};
use crate::retry::RetryPolicy;

pub struct Par3Clonner {
    api: Arc<dyn Par3Api>,
    retry: RetryPolicy,
}

fn host_set_target(initiator_group: &str) -> String {
    format!("{HOST_SET_PREFIX}{initiator_group}")
}

/// Name given to a host created for the cloning adapters.
pub fn clonner_host_name(initiator_group: &str) -> String {
    format!("{initiator_group}-host")
}

/// Port identifiers in the form the array stores them.
fn port_names(adapter_ids: &[String]) -> Result<Vec<String>, StorageError> {
    adapter_ids
        .iter()
        .map(|id| {
            Ok(match AdapterIdentity::parse(id)? {
                AdapterIdentity::FibreChannel { wwpn } => wwpn.to_ascii_uppercase(),
                AdapterIdentity::Literal(name) => name,
            })
        })
        .collect()
}

impl Par3Clonner {
    pub fn connect(api: Arc<dyn Par3Api>, config: &BackendConfig) -> Result<Self, StorageError> {
        api.authenticate(&config.credentials()).map_err(|e| {
            StorageError::transport("authenticate", format!("3par {}", config.hostname), e)
        })?;
        Ok(Self::new(api, config.retry_policy()))
    }

    pub fn new(api: Arc<dyn Par3Api>, retry: RetryPolicy) -> Self {
        Self { api, retry }
    }

    fn volume(&self, operation: OperationKind, name: &str) -> Result<Par3Volume, StorageError> {
        self.retry
            .call("get_volume", || self.api.get_volume(name))
            .map_err(|e| e.into_storage_error(operation, format!("volume {name}")))
    }

    fn vluns(&self, operation: OperationKind, volume_name: &str) -> Result<Vec<VLun>, StorageError> {
        self.retry
            .call("list_vluns", || self.api.list_vluns(volume_name))
            .map_err(|e| e.into_storage_error(operation, format!("VLUNs of volume {volume_name}")))
    }

    fn list_hosts(&self) -> Result<Vec<Host>, StorageError> {
        self.retry
            .call("list_hosts", || self.api.list_hosts())
            .map_err(|e| e.into_storage_error(OperationKind::EnsureInitiatorGroup, "host catalog"))
    }

    /// Host standing for the adapters, or the one created earlier for the group.
    fn existing_host(hosts: &[Host], initiator_group: &str, adapter_ids: &[String]) -> Option<Host> {
        if let Some(found) = HostMatchPolicy.find_host(hosts, adapter_ids) {
            debug!(
                host = %found.host.name,
                adapter_id = %found.adapter_id,
                port = %found.port_address,
                "matched existing host"
            );
            return Some(found.host.clone());
        }

        let host_name = clonner_host_name(initiator_group);
        let existing = hosts.iter().find(|host| host.name == host_name)?;
        warn!(
            group = %initiator_group,
            host = %host_name,
            "host exists without the requested adapters, reusing it"
        );
        Some(existing.clone())
    }

    fn ensure_host(
        &self,
        initiator_group: &str,
        adapter_ids: &[String],
    ) -> Result<Host, StorageError> {
        let operation = OperationKind::EnsureInitiatorGroup;
        let hosts = self.list_hosts()?;

        if let Some(host) = Self::existing_host(&hosts, initiator_group, adapter_ids) {
            info!(
                operation = %operation,
                group = %initiator_group,
                host = %host.name,
                outcome = "host_found",
                "reusing existing host"
            );
            return Ok(host);
        }

        let host_name = clonner_host_name(initiator_group);
        let ports = port_names(adapter_ids)?;
        match self
            .retry
            .call("create_host", || self.api.create_host(&host_name, &ports))
        {
            Ok(host) => {
                info!(
                    operation = %operation,
                    group = %initiator_group,
                    host = %host.name,
                    outcome = "host_created",
                    "created host for cloning adapters"
                );
                Ok(host)
            }
            Err(e) => {
                // Another run may have created it since the lookup
                let created_now = if e.is_throttled() {
                    None
                } else {
                    self.list_hosts()
                        .ok()
                        .and_then(|hosts| Self::existing_host(&hosts, initiator_group, adapter_ids))
                };
                let Some(host) = created_now else {
                    return Err(e.into_storage_error(operation, format!("host {host_name}")));
                };
                info!(
                    operation = %operation,
                    group = %initiator_group,
                    host = %host.name,
                    error = %e,
                    outcome = "host_found",
                    "host created concurrently"
                );
                Ok(host)
            }
        }
    }

    fn host_set_exists(&self, operation: OperationKind, host_set: &str) -> Result<bool, StorageError> {
        self.retry
            .call("host_set_exists", || self.api.host_set_exists(host_set))
            .map_err(|e| e.into_storage_error(operation, format!("host set {host_set}")))
    }

    fn host_set_members(&self, host_set: &str) -> Result<Vec<String>, StorageError> {
        self.retry
            .call("host_set_members", || self.api.host_set_members(host_set))
            .map_err(|e| {
                e.into_storage_error(
                    OperationKind::EnsureInitiatorGroup,
                    format!("host set {host_set}"),
                )
            })
    }

    fn ensure_host_set(&self, initiator_group: &str, host: &Host) -> Result<(), StorageError> {
        let operation = OperationKind::EnsureInitiatorGroup;

        if !self.host_set_exists(operation, initiator_group)? {
            match self
                .retry
                .call("create_host_set", || self.api.create_host_set(initiator_group))
            {
                Ok(()) => {
                    info!(
                        operation = %operation,
                        group = %initiator_group,
                        outcome = "host_set_created",
                        "created host set"
                    );
                }
                Err(e) => {
                    let created_now = !e.is_throttled()
                        && self
                            .host_set_exists(operation, initiator_group)
                            .unwrap_or(false);
                    if !created_now {
                        return Err(e.into_storage_error(
                            operation,
                            format!("host set {initiator_group}"),
                        ));
                    }
                    debug!(group = %initiator_group, error = %e, "host set created concurrently");
                }
            }
        }

        let is_member = |members: Vec<String>| members.iter().any(|member| member == &host.name);
        if is_member(self.host_set_members(initiator_group)?) {
            info!(
                operation = %operation,
                group = %initiator_group,
                host = %host.name,
                outcome = "already_member",
                "host already in host set"
            );
            return Ok(());
        }

        if let Err(e) = self.retry.call("add_host_to_host_set", || {
            self.api.add_host_to_host_set(initiator_group, &host.name)
        }) {
            let added_now = !e.is_throttled()
                && self
                    .host_set_members(initiator_group)
                    .is_ok_and(is_member);
            if !added_now {
                return Err(e.into_storage_error(
                    operation,
                    format!("host {} in host set {initiator_group}", host.name),
                ));
            }
            info!(
                operation = %operation,
                group = %initiator_group,
                host = %host.name,
                error = %e,
                outcome = "already_member",
                "host added to host set concurrently"
            );
            return Ok(());
        }

        info!(
            operation = %operation,
            group = %initiator_group,
            host = %host.name,
            outcome = "host_added",
            "added host to host set"
        );
        Ok(())
    }
}

impl VolumeResolver for Par3Clonner {
    fn resolve_volume_handle_to_lun(&self, volume: &PersistentVolume) -> Result<Lun, StorageError> {
        let volume_name = volume.attribute_name().unwrap_or(&volume.volume_handle);
        if volume_name.is_empty() {
            return Err(StorageError::invalid_state(
                "volume has neither a Name attribute nor a volume handle",
            ));
        }

        let par3_volume = self.volume(OperationKind::ResolveVolume, volume_name)?;
        let wwn = par3_volume.wwn.to_ascii_lowercase();
        if !wwn.starts_with(PROVIDER_ID) {
            warn!(
                volume = %par3_volume.name,
                wwn = %wwn,
                "volume WWN does not carry the expected provider prefix"
            );
        }

        info!(
            operation = %OperationKind::ResolveVolume,
            volume = %par3_volume.name,
            "resolved volume"
        );

        Ok(Lun {
            name: par3_volume.name,
            ldevice_id: par3_volume.id.to_string(),
            volume_handle: volume.volume_handle.clone(),
            serial_number: par3_volume.wwn,
            iqn: String::new(),
            naa: format!("naa.{wwn}"),
            provider_id: PROVIDER_ID.to_string(),
        })
    }
}

impl InitiatorGroupAdapter for Par3Clonner {
    fn ensure_clonner_igroup(
        &self,
        initiator_group: &str,
        adapter_ids: &[String],
    ) -> Result<MappingContext, StorageError> {
        if adapter_ids.is_empty() {
            return Err(StorageError::invalid_state(format!(
                "initiator group {initiator_group} needs at least one adapter id"
            )));
        }

        let host = self.ensure_host(initiator_group, adapter_ids)?;
        self.ensure_host_set(initiator_group, &host)?;
        Ok(MappingContext::for_host(initiator_group, &host))
    }
}

impl LunMappingAdapter for Par3Clonner {
    fn map(
        &self,
        initiator_group: &str,
        lun: &Lun,
        _context: &MappingContext,
    ) -> Result<Lun, StorageError> {
        if !self.host_set_exists(OperationKind::Map, initiator_group)? {
            return Err(StorageError::not_found(format!(
                "host set {initiator_group} does not exist"
            )));
        }

        let volume = self.volume(OperationKind::Map, &lun.name)?;
        let target = host_set_target(initiator_group);
        let vluns = self.vluns(OperationKind::Map, &volume.name)?;

        if let Some(vlun) = vluns.iter().find(|vlun| vlun.hostname == target) {
            info!(
                operation = %OperationKind::Map,
                group = %initiator_group,
                volume = %volume.name,
                lun = vlun.lun,
                outcome = "already_mapped",
                "volume already exported to host set"
            );
            return Ok(lun.clone());
        }

        let vlun = match self
            .retry
            .call("create_vlun", || self.api.create_vlun(&volume.name, initiator_group))
        {
            Ok(vlun) => vlun,
            Err(e) => {
                // Another run may have exported it since the lookup
                let exported_now = if e.is_throttled() {
                    None
                } else {
                    self.vluns(OperationKind::Map, &volume.name)
                        .ok()
                        .and_then(|vluns| vluns.into_iter().find(|vlun| vlun.hostname == target))
                };
                let Some(vlun) = exported_now else {
                    return Err(e.into_storage_error(
                        OperationKind::Map,
                        format!("volume {} to host set {initiator_group}", volume.name),
                    ));
                };
                info!(
                    operation = %OperationKind::Map,
                    group = %initiator_group,
                    volume = %volume.name,
                    lun = vlun.lun,
                    error = %e,
                    outcome = "already_mapped",
                    "volume exported concurrently"
                );
                return Ok(lun.clone());
            }
        };

        info!(
            operation = %OperationKind::Map,
            group = %initiator_group,
            volume = %volume.name,
            lun = vlun.lun,
            outcome = "mapped",
            "exported volume to host set"
        );
        Ok(lun.clone())
    }

    fn unmap(
        &self,
        initiator_group: &str,
        lun: &Lun,
        _context: &MappingContext,
    ) -> Result<(), StorageError> {
        let volume = self.volume(OperationKind::Unmap, &lun.name)?;
        let target = host_set_target(initiator_group);
        let vluns = self.vluns(OperationKind::Unmap, &volume.name)?;

        let Some(vlun) = vluns.iter().find(|vlun| vlun.hostname == target) else {
            info!(
                operation = %OperationKind::Unmap,
                group = %initiator_group,
                volume = %volume.name,
                outcome = "already_unmapped",
                "volume not exported to host set"
            );
            return Ok(());
        };

        match self.retry.call("delete_vlun", || {
            self.api.delete_vlun(&volume.name, initiator_group, vlun.lun)
        }) {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                debug!(volume = %volume.name, group = %initiator_group, "VLUN vanished during unmap");
            }
            Err(e) => {
                return Err(e.into_storage_error(
                    OperationKind::Unmap,
                    format!("volume {} from host set {initiator_group}", volume.name),
                ));
            }
        }

        info!(
            operation = %OperationKind::Unmap,
            group = %initiator_group,
            volume = %volume.name,
            lun = vlun.lun,
            outcome = "unmapped",
            "removed volume export"
        );
        Ok(())
    }

    fn current_mapped_groups(
        &self,
        lun: &Lun,
        context: &mut MappingContext,
    ) -> Result<Vec<String>, StorageError> {
        let volume = self.volume(OperationKind::MappedGroups, &lun.name)?;
        let vluns = self.vluns(OperationKind::MappedGroups, &volume.name)?;

        let mut groups: Vec<String> = Vec::new();
        for vlun in &vluns {
            let group = vlun
                .hostname
                .strip_prefix(HOST_SET_PREFIX)
                .unwrap_or(&vlun.hostname);
            if group.is_empty() || groups.iter().any(|known| known == group) {
                continue;
            }
            groups.push(group.to_string());
        }

        if let Some(first) = groups.first() {
            context.record_peer_host(first);
        }
        Ok(groups)
    }
}

impl CopyOffloadAdapter for Par3Clonner {
    fn backend_kind(&self) -> BackendKind {
        BackendKind::Primera3Par
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fc_ports_are_stored_as_bare_upper_hex() {
        let ids = vec![
            "fc.20000090fa1b2c3d:10000090fa1b2c3d".to_string(),
            "iqn.1998-01.com.vmware:esx01".to_string(),
        ];
        assert_eq!(
            port_names(&ids).expect("port names"),
            vec![
                "10000090FA1B2C3D".to_string(),
                "iqn.1998-01.com.vmware:esx01".to_string()
            ]
        );
    }

    #[test]
    fn broken_fc_id_is_invalid_state() {
        assert!(port_names(&["fc.".to_string()]).is_err());
    }

    #[test]
    fn host_set_targets_use_set_prefix() {
        assert_eq!(host_set_target("xcopy-service-vms"), "set:xcopy-service-vms");
        assert_eq!(clonner_host_name("xcopy-service-vms"), "xcopy-service-vms-host");
    }
}
