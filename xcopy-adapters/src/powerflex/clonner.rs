// SPDX-License-Identifier: GPL-3.0-only

use std::sync::Arc;

use tracing::{debug, info, warn};
use xcopy_contracts::{
    CopyOffloadAdapter, InitiatorGroupAdapter, LunMappingAdapter, OperationKind, StorageError,
    VolumeResolver, parse_volume_handle,
};
use xcopy_types::{BackendKind, Lun, MappingContext, PersistentVolume};

use super::api::{
    MapVolumeSdcParam, PowerFlexApi, PowerFlexSystem, PowerFlexVolume, UnmapVolumeSdcParam,
};
use crate::config::{BackendConfig, PowerFlexMappingOptions};
use crate::domain::{identifiers_match, no_matching_host};
use crate::retry::RetryPolicy;

pub struct PowerFlexClonner {
    api: Arc<dyn PowerFlexApi>,
    system: PowerFlexSystem,
    options: PowerFlexMappingOptions,
    retry: RetryPolicy,
}

/// System id encoded in a PowerFlex CSI volume handle.
pub fn resolve_system_id(volume: &PersistentVolume) -> Result<String, StorageError> {
    if volume.volume_handle.is_empty() {
        return Err(StorageError::invalid_state(format!(
            "volume {} has no volume handle",
            volume.name
        )));
    }
    Ok(parse_volume_handle(&volume.volume_handle)?
        .system_id
        .to_string())
}

impl PowerFlexClonner {
    /// Logs in to the gateway and locates the configured system.
    pub fn connect(api: Arc<dyn PowerFlexApi>, config: &BackendConfig) -> Result<Self, StorageError> {
        let system_id = config
            .system_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| StorageError::invalid_state("powerflex backend requires a system_id"))?;

        api.authenticate(&config.credentials()).map_err(|e| {
            StorageError::transport("authenticate", format!("powerflex {}", config.hostname), e)
        })?;

        let system = api.find_system(system_id).map_err(|e| {
            StorageError::transport("find_system", format!("powerflex system {system_id}"), e)
        })?;

        info!(system = %system.id, name = %system.name, "connected to powerflex system");
        Ok(Self::new(api, system, config.powerflex, config.retry_policy()))
    }

    pub fn new(
        api: Arc<dyn PowerFlexApi>,
        system: PowerFlexSystem,
        options: PowerFlexMappingOptions,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            api,
            system,
            options,
            retry,
        }
    }

    fn volume(&self, operation: OperationKind, lun: &Lun) -> Result<PowerFlexVolume, StorageError> {
        let volume_id = lun.serial_number.as_str();
        if volume_id.is_empty() {
            return Err(StorageError::invalid_state(format!(
                "LUN {} has no serial number",
                lun.display_id()
            )));
        }

        let volumes = self
            .retry
            .call("get_volume", || self.api.get_volume(volume_id))
            .map_err(|e| e.into_storage_error(operation, format!("volume {volume_id}")))?;

        volumes
            .into_iter()
            .next()
            .ok_or_else(|| StorageError::not_found(format!("no volume found for id {volume_id}")))
    }

    /// The SDC id stands for the group; group setup may have resolved it.
    fn sdc_id<'a>(initiator_group: &'a str, context: &'a MappingContext) -> &'a str {
        if context.is_logical_group(initiator_group) {
            context.real_host_name().unwrap_or(initiator_group)
        } else {
            initiator_group
        }
    }
}

impl VolumeResolver for PowerFlexClonner {
    /// Handles are `<system-id>-<volume-id>`; the volume id is both LUN name and serial.
    fn resolve_volume_handle_to_lun(&self, volume: &PersistentVolume) -> Result<Lun, StorageError> {
        let parts = parse_volume_handle(&volume.volume_handle)?;
        if parts.system_id != self.system.id {
            warn!(
                volume = %volume.volume_handle,
                handle_system = %parts.system_id,
                system = %self.system.id,
                "volume handle names a different system"
            );
        }

        let lun = Lun {
            name: parts.volume_id.to_string(),
            serial_number: parts.volume_id.to_string(),
            volume_handle: volume.volume_handle.clone(),
            ..Default::default()
        };

        // Existence check only; the handle carries every field we report
        self.volume(OperationKind::ResolveVolume, &lun)?;

        info!(
            operation = %OperationKind::ResolveVolume,
            volume = %lun.name,
            "resolved volume"
        );
        Ok(lun)
    }
}

impl InitiatorGroupAdapter for PowerFlexClonner {
    fn ensure_clonner_igroup(
        &self,
        initiator_group: &str,
        adapter_ids: &[String],
    ) -> Result<MappingContext, StorageError> {
        let sdcs = self
            .retry
            .call("list_sdcs", || self.api.list_sdcs())
            .map_err(|e| e.into_storage_error(OperationKind::EnsureInitiatorGroup, "SDC catalog"))?;

        let sdc = sdcs
            .iter()
            .find(|sdc| sdc.id == initiator_group)
            .or_else(|| {
                sdcs.iter().find(|sdc| {
                    adapter_ids.iter().any(|id| {
                        (!sdc.sdc_guid.is_empty() && identifiers_match(id, &sdc.sdc_guid))
                            || (!sdc.sdc_ip.is_empty() && identifiers_match(id, &sdc.sdc_ip))
                    })
                })
            })
            .ok_or_else(|| {
                let mut tried = vec![initiator_group.to_string()];
                tried.extend(adapter_ids.iter().cloned());
                no_matching_host(&tried)
            })?;

        info!(
            operation = %OperationKind::EnsureInitiatorGroup,
            group = %initiator_group,
            host = %sdc.name,
            sdc = %sdc.id,
            outcome = "sdc_found",
            "found SDC for initiator group"
        );

        Ok(MappingContext::for_named(initiator_group, &sdc.id))
    }
}

impl LunMappingAdapter for PowerFlexClonner {
    fn map(
        &self,
        initiator_group: &str,
        lun: &Lun,
        context: &MappingContext,
    ) -> Result<Lun, StorageError> {
        let sdc_id = Self::sdc_id(initiator_group, context);
        let volume = self.volume(OperationKind::Map, lun)?;

        if volume.is_mapped_to(sdc_id) {
            info!(
                operation = %OperationKind::Map,
                group = %initiator_group,
                volume = %volume.id,
                sdc = %sdc_id,
                outcome = "already_mapped",
                "volume already mapped"
            );
            return Ok(lun.clone());
        }

        let param = MapVolumeSdcParam {
            sdc_id: sdc_id.to_string(),
            allow_multiple_mappings: self.options.allow_multiple_mappings,
            all_sdcs: false,
            access_mode: self.options.access_mode,
        };
        if let Err(e) = self
            .retry
            .call("map_volume_sdc", || self.api.map_volume_sdc(&volume.id, &param))
        {
            // Another run may have mapped it since the lookup
            let mapped_now = !e.is_throttled()
                && self
                    .volume(OperationKind::Map, lun)
                    .is_ok_and(|current| current.is_mapped_to(sdc_id));
            if !mapped_now {
                return Err(e.into_storage_error(
                    OperationKind::Map,
                    format!("volume {} to SDC {sdc_id}", volume.id),
                ));
            }
            info!(
                operation = %OperationKind::Map,
                group = %initiator_group,
                volume = %volume.id,
                sdc = %sdc_id,
                error = %e,
                outcome = "already_mapped",
                "volume mapped concurrently"
            );
            return Ok(lun.clone());
        }

        info!(
            operation = %OperationKind::Map,
            group = %initiator_group,
            volume = %volume.id,
            sdc = %sdc_id,
            access_mode = %self.options.access_mode.as_str(),
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
        let sdc_id = Self::sdc_id(initiator_group, context);
        let volume = self.volume(OperationKind::Unmap, lun)?;

        if !volume.is_mapped_to(sdc_id) {
            info!(
                operation = %OperationKind::Unmap,
                group = %initiator_group,
                volume = %volume.id,
                sdc = %sdc_id,
                outcome = "already_unmapped",
                "volume not mapped to SDC"
            );
            return Ok(());
        }

        let param = UnmapVolumeSdcParam {
            sdc_id: sdc_id.to_string(),
            ignore_scsi_initiators: true,
            all_sdcs: false,
        };
        match self
            .retry
            .call("unmap_volume_sdc", || self.api.unmap_volume_sdc(&volume.id, &param))
        {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                debug!(volume = %volume.id, sdc = %sdc_id, "mapping vanished during unmap");
            }
            Err(e) => {
                return Err(e.into_storage_error(
                    OperationKind::Unmap,
                    format!("volume {} from SDC {sdc_id}", volume.id),
                ));
            }
        }

        info!(
            operation = %OperationKind::Unmap,
            group = %initiator_group,
            volume = %volume.id,
            sdc = %sdc_id,
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
        let volume = self.volume(OperationKind::MappedGroups, lun)?;

        let mut sdc_ids: Vec<String> = Vec::with_capacity(volume.mapped_sdc_info.len());
        for info in &volume.mapped_sdc_info {
            if !sdc_ids.contains(&info.sdc_id) {
                sdc_ids.push(info.sdc_id.clone());
            }
        }

        if let Some(first) = sdc_ids.first()
            && context.record_peer_host(first)
        {
            debug!(volume = %volume.id, sdc = %first, "recorded peer SDC");
        }

        Ok(sdc_ids)
    }
}

impl CopyOffloadAdapter for PowerFlexClonner {
    fn backend_kind(&self) -> BackendKind {
        BackendKind::PowerFlex
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_id_comes_from_handle_prefix() {
        let pv = PersistentVolume::from_handle("7a8d2c1f00000000-4c2a9e5b00000003");
        assert_eq!(resolve_system_id(&pv).expect("system id"), "7a8d2c1f00000000");
    }

    #[test]
    fn missing_handle_is_invalid() {
        let pv = PersistentVolume {
            name: "pv-1".to_string(),
            ..Default::default()
        };
        let error = resolve_system_id(&pv).unwrap_err();
        assert!(error.message.contains("pv-1"));
    }

    #[test]
    fn sdc_id_prefers_context_for_logical_group() {
        let ctx = MappingContext::for_named("xcopy-service-vms", "a1b2c3d400000001");
        assert_eq!(
            PowerFlexClonner::sdc_id("xcopy-service-vms", &ctx),
            "a1b2c3d400000001"
        );
        assert_eq!(PowerFlexClonner::sdc_id("a1b2c3d400000009", &ctx), "a1b2c3d400000009");
        assert_eq!(
            PowerFlexClonner::sdc_id("a1b2c3d400000009", &MappingContext::new()),
            "a1b2c3d400000009"
        );
    }
}
