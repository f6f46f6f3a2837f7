// SPDX-License-Identifier: GPL-3.0-only

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tracing::{debug, info, warn};
use xcopy_contracts::{
    CopyOffloadAdapter, InitiatorGroupAdapter, LunMappingAdapter, OperationKind, StorageError,
    VolumeResolver,
};
use xcopy_types::{
    BackendKind, Host, Lun, MappingContext, MappingRecord, PersistentVolume, StorageProtocol,
};

use super::api::InfiniboxApi;
use crate::config::BackendConfig;
use crate::domain::{HostMatchDomain, HostMatchPolicy, no_matching_host};
use crate::retry::RetryPolicy;

pub struct InfiniboxClonner {
    api: Arc<dyn InfiniboxApi>,
    retry: RetryPolicy,
}

impl InfiniboxClonner {
    /// Logs in to the array; no adapter is returned without a session.
    pub fn connect(api: Arc<dyn InfiniboxApi>, config: &BackendConfig) -> Result<Self, StorageError> {
        api.authenticate(&config.credentials()).map_err(|e| {
            StorageError::transport("authenticate", format!("infinibox {}", config.hostname), e)
        })?;
        Ok(Self::new(api, config.retry_policy()))
    }

    pub fn new(api: Arc<dyn InfiniboxApi>, retry: RetryPolicy) -> Self {
        Self { api, retry }
    }

    /// Host the group stands for: the cloning host for the logical group,
    /// otherwise the peer host discovery found holding the volume.
    fn target_host_name<'c>(
        initiator_group: &str,
        context: &'c MappingContext,
    ) -> Result<&'c str, StorageError> {
        if context.logical_host_name().is_none() {
            return Err(StorageError::invalid_state(format!(
                "mapping context is required for initiator group {initiator_group}"
            )));
        }

        let host_name = if context.is_logical_group(initiator_group) {
            context.real_host_name()
        } else {
            context.peer_host_name()
        };

        host_name.ok_or_else(|| {
            StorageError::invalid_state(format!(
                "mapping context has no host for initiator group {initiator_group}"
            ))
        })
    }

    fn volume_id(lun: &Lun) -> Result<u64, StorageError> {
        lun.ldevice_id.parse::<u64>().map_err(|e| {
            StorageError::invalid_state(format!(
                "invalid volume ID '{}', expected integer volume ID: {e}",
                lun.ldevice_id
            ))
        })
    }

    fn host_by_name(&self, operation: OperationKind, host_name: &str) -> Result<Host, StorageError> {
        self.retry
            .call("get_host_by_name", || self.api.get_host_by_name(host_name))
            .map_err(|e| e.into_storage_error(operation, format!("host {host_name}")))
    }

    fn mappings(
        &self,
        operation: OperationKind,
        volume_id: u64,
    ) -> Result<Vec<MappingRecord>, StorageError> {
        self.retry
            .call("get_luns_by_volume", || self.api.get_luns_by_volume(volume_id))
            .map_err(|e| e.into_storage_error(operation, format!("volume {volume_id}")))
    }

    /// Whether the volume is mapped to the host itself (not through a cluster).
    fn is_mapped_to_host(records: &[MappingRecord], host_id: u64) -> bool {
        records
            .iter()
            .any(|mapping| mapping.host_id == host_id && !mapping.clustered)
    }
}

impl VolumeResolver for InfiniboxClonner {
    fn resolve_volume_handle_to_lun(&self, volume: &PersistentVolume) -> Result<Lun, StorageError> {
        let volume_name = volume.attribute_name().ok_or_else(|| {
            StorageError::invalid_state(format!(
                "volume {} has no Name attribute",
                volume.volume_handle
            ))
        })?;

        let ibox_volume = self
            .retry
            .call("get_volume_by_name", || self.api.get_volume_by_name(volume_name))
            .map_err(|e| {
                e.into_storage_error(OperationKind::ResolveVolume, format!("volume {volume_name}"))
            })?;

        let serial = ibox_volume.serial;
        let protocol_prefix = match volume.storage_protocol() {
            StorageProtocol::Iscsi => "iqn",
            _ => "naa",
        };

        info!(
            operation = %OperationKind::ResolveVolume,
            volume = %volume_name,
            serial = %serial,
            "resolved volume"
        );

        Ok(Lun {
            name: volume_name.to_string(),
            ldevice_id: ibox_volume.id.to_string(),
            volume_handle: volume.volume_handle.clone(),
            iqn: format!("{protocol_prefix}.{serial}"),
            naa: format!("naa.6{serial}"),
            serial_number: serial,
            provider_id: String::new(),
        })
    }
}

impl InitiatorGroupAdapter for InfiniboxClonner {
    fn ensure_clonner_igroup(
        &self,
        initiator_group: &str,
        adapter_ids: &[String],
    ) -> Result<MappingContext, StorageError> {
        let hosts = self
            .retry
            .call("get_all_hosts", || self.api.get_all_hosts())
            .map_err(|e| e.into_storage_error(OperationKind::EnsureInitiatorGroup, "host catalog"))?;

        let found = HostMatchPolicy
            .find_host(&hosts, adapter_ids)
            .ok_or_else(|| no_matching_host(adapter_ids))?;

        info!(
            operation = %OperationKind::EnsureInitiatorGroup,
            group = %initiator_group,
            host = %found.host.name,
            adapter_id = %found.adapter_id,
            port = %found.port_address,
            outcome = "host_found",
            "found host for initiator group"
        );

        Ok(MappingContext::for_host(initiator_group, found.host))
    }
}

impl LunMappingAdapter for InfiniboxClonner {
    fn map(
        &self,
        initiator_group: &str,
        lun: &Lun,
        context: &MappingContext,
    ) -> Result<Lun, StorageError> {
        let host_name = Self::target_host_name(initiator_group, context)?;
        let host = self.host_by_name(OperationKind::Map, host_name)?;
        let volume_id = Self::volume_id(lun)?;

        let existing = self.mappings(OperationKind::Map, volume_id)?;
        if Self::is_mapped_to_host(&existing, host.id) {
            info!(
                operation = %OperationKind::Map,
                group = %initiator_group,
                volume = %lun.display_id(),
                host = %host.name,
                outcome = "already_mapped",
                "volume already mapped"
            );
            return Ok(lun.clone());
        }

        if let Err(e) = self.retry.call("map_volume_to_host", || {
            self.api.map_volume_to_host(host.id, volume_id, 0)
        }) {
            // Another run may have mapped it since the lookup
            let mapped_now = !e.is_throttled()
                && self
                    .mappings(OperationKind::Map, volume_id)
                    .is_ok_and(|records| Self::is_mapped_to_host(&records, host.id));
            if !mapped_now {
                return Err(e.into_storage_error(
                    OperationKind::Map,
                    format!("volume {} to host {}", lun.display_id(), host.name),
                ));
            }
            info!(
                operation = %OperationKind::Map,
                group = %initiator_group,
                volume = %lun.display_id(),
                host = %host.name,
                error = %e,
                outcome = "already_mapped",
                "volume mapped concurrently"
            );
            return Ok(lun.clone());
        }

        info!(
            operation = %OperationKind::Map,
            group = %initiator_group,
            volume = %lun.display_id(),
            host = %host.name,
            outcome = "mapped",
            "mapped volume"
        );
        Ok(lun.clone())
    }

    fn unmap(
        &self,
        initiator_group: &str,
        lun: &Lun,
        context: &MappingContext,
    ) -> Result<(), StorageError> {
        let host_name = Self::target_host_name(initiator_group, context)?;
        let host = self.host_by_name(OperationKind::Unmap, host_name)?;
        let volume_id = Self::volume_id(lun)?;

        let existing = self.mappings(OperationKind::Unmap, volume_id)?;
        if !Self::is_mapped_to_host(&existing, host.id) {
            info!(
                operation = %OperationKind::Unmap,
                group = %initiator_group,
                volume = %lun.display_id(),
                host = %host.name,
                outcome = "already_unmapped",
                "volume not mapped to host"
            );
            return Ok(());
        }

        match self.retry.call("unmap_volume_from_host", || {
            self.api.unmap_volume_from_host(host.id, volume_id)
        }) {
            Ok(()) => {}
            // Removed between the lookup and the call
            Err(e) if e.is_not_found() => {
                debug!(volume = %lun.display_id(), host = %host.name, "mapping vanished during unmap");
            }
            Err(e) => {
                return Err(e.into_storage_error(
                    OperationKind::Unmap,
                    format!("volume {} from host {}", lun.display_id(), host.name),
                ));
            }
        }

        info!(
            operation = %OperationKind::Unmap,
            group = %initiator_group,
            volume = %lun.display_id(),
            host = %host.name,
            outcome = "unmapped",
            "unmapped volume"
        );
        Ok(())
    }

    fn current_mapped_groups(
        &self,
        lun: &Lun,
        context: &mut MappingContext,
    ) -> Result<Vec<String>, StorageError> {
        let volume_id = Self::volume_id(lun)?;
        let records = self.mappings(OperationKind::MappedGroups, volume_id)?;

        if records.is_empty() {
            debug!(volume = %lun.display_id(), "volume is not mapped to any host");
            return Ok(Vec::new());
        }

        let hosts = self
            .retry
            .call("get_all_hosts", || self.api.get_all_hosts())
            .map_err(|e| e.into_storage_error(OperationKind::MappedGroups, "host catalog"))?;
        let host_by_id: BTreeMap<u64, &Host> = hosts.iter().map(|host| (host.id, host)).collect();

        let mut mapped_hosts = Vec::with_capacity(records.len());
        let mut processed = BTreeSet::new();
        let mut clustered = 0usize;
        let mut unresolved = 0usize;

        for record in &records {
            if processed.contains(&record.host_id) {
                continue;
            }

            if record.clustered {
                warn!(
                    volume = %lun.display_id(),
                    host_cluster_id = record.host_cluster_id,
                    "volume is mapped to a host cluster, cluster mappings are not supported"
                );
                clustered += 1;
                continue;
            }

            let Some(host) = host_by_id.get(&record.host_id) else {
                warn!(
                    volume = %lun.display_id(),
                    host_id = record.host_id,
                    host_cluster_id = record.host_cluster_id,
                    known_hosts = ?host_by_id.keys().collect::<Vec<_>>(),
                    "mapping references an unknown host"
                );
                unresolved += 1;
                continue;
            };

            processed.insert(record.host_id);
            mapped_hosts.push(host.name.clone());

            if context.record_peer_host(&host.name) {
                debug!(volume = %lun.display_id(), host = %host.name, "recorded peer host");
            }
        }

        if mapped_hosts.is_empty() {
            let message = format!(
                "volume {} has {} mapping(s) but none resolve to a host ({clustered} clustered, {unresolved} unknown)",
                lun.display_id(),
                records.len()
            );
            return Err(if clustered > 0 {
                StorageError::unsupported_mapping(message)
            } else {
                StorageError::not_found(message)
            });
        }

        Ok(mapped_hosts)
    }
}

impl CopyOffloadAdapter for InfiniboxClonner {
    fn backend_kind(&self) -> BackendKind {
        BackendKind::Infinibox
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_context_is_rejected() {
        let error =
            InfiniboxClonner::target_host_name("grp1", &MappingContext::new()).unwrap_err();
        assert!(error.message.contains("mapping context is required"));
    }

    #[test]
    fn logical_group_targets_real_host() {
        let ctx = MappingContext::for_named("grp1", "esx-01");
        assert_eq!(
            InfiniboxClonner::target_host_name("grp1", &ctx).expect("host"),
            "esx-01"
        );
    }

    #[test]
    fn other_group_needs_peer_host() {
        let mut ctx = MappingContext::for_named("grp1", "esx-01");
        assert!(InfiniboxClonner::target_host_name("ocp", &ctx).is_err());

        ctx.record_peer_host("ocp-worker-1");
        assert_eq!(
            InfiniboxClonner::target_host_name("ocp", &ctx).expect("host"),
            "ocp-worker-1"
        );
    }

    #[test]
    fn volume_id_must_be_numeric() {
        let lun = Lun {
            ldevice_id: "abc".to_string(),
            ..Default::default()
        };
        assert!(InfiniboxClonner::volume_id(&lun).is_err());
    }
}
