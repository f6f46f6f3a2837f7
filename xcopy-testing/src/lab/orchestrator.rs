// SPDX-License-Identifier: GPL-3.0-only

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::info;
use xcopy_adapters::{BackendClient, BackendConfig, RetrySettings, build_adapter};
use xcopy_contracts::{
    CopyOffloadAdapter, OperationId, OperationKind, StorageError, parse_volume_handle,
};
use xcopy_types::{BackendKind, Lun, MappingContext, PersistentVolume};

use crate::errors::{Result, TestingError};
use crate::fakes::{FakeInfinibox, FakePar3, FakePowerFlex};
use crate::spec::{self, LabSpec};

const LAB_ENDPOINT: &str = "array.lab.invalid";

#[derive(Debug, Clone, Serialize)]
pub struct WorkflowStep {
    pub operation: OperationKind,
    pub mutating: bool,
    pub detail: String,
}

impl WorkflowStep {
    fn new(operation: OperationKind, detail: String) -> Self {
        Self {
            operation,
            mutating: operation.is_mutating(),
            detail,
        }
    }
}

/// What one clone workflow saw, step by step.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowReport {
    pub run_id: OperationId,
    pub backend: BackendKind,
    pub initiator_group: String,
    pub lun: Lun,
    pub context: MappingContext,
    pub groups_after_map: Vec<String>,
    pub groups_after_unmap: Vec<String>,
    pub steps: Vec<WorkflowStep>,
}

/// Connection settings for an in-memory array; retries back off in milliseconds.
pub fn lab_config(kind: BackendKind, system_id: Option<&str>) -> BackendConfig {
    let mut config = BackendConfig::new(kind, LAB_ENDPOINT, "lab", "lab");
    config.system_id = system_id.map(str::to_string);
    config.retry = RetrySettings {
        max_attempts: 4,
        initial_delay_ms: 1,
        max_delay_ms: 4,
        backoff_multiplier: 2.0,
    };
    config
}

/// Builds an in-memory array holding the objects a lab spec describes.
pub fn seed_backend(spec: &LabSpec) -> Result<(BackendConfig, BackendClient)> {
    let config = lab_config(spec.backend, spec.system_id.as_deref());
    let volume = &spec.volume;

    let client = match spec.backend {
        BackendKind::Infinibox => {
            let volume_id = volume.id.unwrap_or_default();
            let mut array = FakeInfinibox::new().with_volume(
                volume_id,
                volume.name.as_deref().unwrap_or_default(),
                volume.serial.as_deref().unwrap_or_default(),
            );
            for (index, host) in spec.hosts.iter().enumerate() {
                let ports: Vec<&str> = host.ports.iter().map(String::as_str).collect();
                array = array.with_host(index as u64 + 1, &host.name, &ports);
            }
            for peer in &spec.existing_mappings {
                let host_id = spec
                    .hosts
                    .iter()
                    .position(|host| &host.name == peer)
                    .ok_or_else(|| unknown_peer(spec, peer))?;
                array = array.with_mapping(volume_id, host_id as u64 + 1);
            }
            BackendClient::Infinibox(Arc::new(array))
        }
        BackendKind::Primera3Par => {
            let volume_name = volume.name.as_deref().unwrap_or_default();
            let mut array = FakePar3::new().with_volume(
                volume.id.unwrap_or_default(),
                volume_name,
                volume.serial.as_deref().unwrap_or_default(),
            );
            for host in &spec.hosts {
                let ports: Vec<&str> = host.ports.iter().map(String::as_str).collect();
                array = array.with_host(&host.name, &ports);
            }
            for host_set in &spec.existing_mappings {
                array = array
                    .with_host_set(host_set, &[])
                    .with_export(volume_name, host_set);
            }
            BackendClient::Primera3Par(Arc::new(array))
        }
        BackendKind::PowerFlex => {
            let parts = parse_volume_handle(&volume.handle)?;
            let mut array = FakePowerFlex::new(spec.system_id.as_deref().unwrap_or_default())
                .with_volume(
                    parts.volume_id,
                    volume.name.as_deref().unwrap_or(parts.volume_id),
                );
            for host in &spec.hosts {
                let id = host.id.as_deref().unwrap_or_default();
                let guid = host.ports.first().map(String::as_str).unwrap_or_default();
                let ip = host.ports.get(1).map(String::as_str).unwrap_or_default();
                array = array.with_sdc(id, &host.name, guid, ip);
            }
            for sdc_id in &spec.existing_mappings {
                array = array.with_mapping(parts.volume_id, sdc_id);
            }
            BackendClient::PowerFlex(Arc::new(array))
        }
    };

    Ok((config, client))
}

fn unknown_peer(spec: &LabSpec, peer: &str) -> TestingError {
    TestingError::SpecInvalid {
        spec_name: spec.name.clone(),
        reason: format!("existing mapping names unknown host {peer}"),
    }
}

fn step<T>(operation: OperationKind, result: std::result::Result<T, StorageError>) -> Result<T> {
    result.map_err(|source| TestingError::Step { operation, source })
}

/// Resolve, set up the group, map twice, discover, unmap twice, discover.
pub fn run_workflow(
    adapter: &dyn CopyOffloadAdapter,
    volume: &PersistentVolume,
    initiator_group: &str,
    adapter_ids: &[String],
) -> Result<WorkflowReport> {
    let run_id = OperationId::new();
    let backend = adapter.backend_kind();
    let mut steps = Vec::new();

    info!(run_id = %run_id, backend = %backend, group = %initiator_group, "workflow started");

    let lun = step(
        OperationKind::ResolveVolume,
        adapter.resolve_volume_handle_to_lun(volume),
    )?;
    steps.push(WorkflowStep::new(
        OperationKind::ResolveVolume,
        format!("{} -> {}", volume.volume_handle, lun.display_id()),
    ));

    let mut context = step(
        OperationKind::EnsureInitiatorGroup,
        adapter.ensure_clonner_igroup(initiator_group, adapter_ids),
    )?;
    steps.push(WorkflowStep::new(
        OperationKind::EnsureInitiatorGroup,
        format!(
            "{initiator_group} -> {}",
            context.real_host_name().unwrap_or("<none>")
        ),
    ));

    for attempt in 1..=2 {
        step(OperationKind::Map, adapter.map(initiator_group, &lun, &context))?;
        steps.push(WorkflowStep::new(OperationKind::Map, format!("attempt {attempt}")));
    }

    let groups_after_map = step(
        OperationKind::MappedGroups,
        adapter.current_mapped_groups(&lun, &mut context),
    )?;
    steps.push(WorkflowStep::new(
        OperationKind::MappedGroups,
        groups_after_map.join(", "),
    ));

    for attempt in 1..=2 {
        step(OperationKind::Unmap, adapter.unmap(initiator_group, &lun, &context))?;
        steps.push(WorkflowStep::new(OperationKind::Unmap, format!("attempt {attempt}")));
    }

    let groups_after_unmap = step(
        OperationKind::MappedGroups,
        adapter.current_mapped_groups(&lun, &mut context),
    )?;
    steps.push(WorkflowStep::new(
        OperationKind::MappedGroups,
        groups_after_unmap.join(", "),
    ));

    info!(
        run_id = %run_id,
        backend = %backend,
        group = %initiator_group,
        volume = %lun.display_id(),
        steps = steps.len(),
        "workflow finished"
    );

    Ok(WorkflowReport {
        run_id,
        backend,
        initiator_group: initiator_group.to_string(),
        lun,
        context,
        groups_after_map,
        groups_after_unmap,
        steps,
    })
}

/// Backend settings from a TOML file, with `XCOPY_STORAGE_*` overrides applied.
pub fn load_config(path: &Path) -> Result<BackendConfig> {
    let mut config = BackendConfig::load(path)?;
    config.apply_env_overrides();
    Ok(config)
}

pub fn run_spec(spec: &LabSpec) -> Result<WorkflowReport> {
    let (config, client) = seed_backend(spec)?;
    run_with_client(spec, &config, client)
}

/// Runs the spec against its in-memory array using caller-supplied settings.
pub fn run_spec_with_config(spec: &LabSpec, config: &BackendConfig) -> Result<WorkflowReport> {
    let (_, client) = seed_backend(spec)?;
    run_with_client(spec, config, client)
}

fn run_with_client(
    spec: &LabSpec,
    config: &BackendConfig,
    client: BackendClient,
) -> Result<WorkflowReport> {
    let adapter = build_adapter(config, client)?;
    run_workflow(
        adapter.as_ref(),
        &spec.volume.persistent_volume(),
        &spec.initiator_group,
        &spec.adapter_ids,
    )
}

pub fn run_by_name(spec_name: &str) -> Result<WorkflowReport> {
    run_spec(&spec::load_by_name(spec_name)?)
}
