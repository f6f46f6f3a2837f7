// SPDX-License-Identifier: GPL-3.0-only

use std::fs;
use std::path::PathBuf;

use xcopy_contracts::OperationKind;
use xcopy_testing::errors::TestingError;
use xcopy_testing::lab::orchestrator;
use xcopy_testing::spec;

#[test]
fn every_bundled_spec_runs_clean() {
    for name in spec::list_names().unwrap() {
        let report = orchestrator::run_by_name(&name)
            .unwrap_or_else(|error| panic!("spec {name}: {error}"));
        assert_eq!(report.steps.len(), 8, "spec {name}");
        assert!(!report.groups_after_map.is_empty(), "spec {name}");
    }
}

#[test]
fn infinibox_workflow_keeps_peer_mapping() {
    let report = orchestrator::run_by_name("infinibox-fc").unwrap();

    assert_eq!(report.lun.ldevice_id, "4711");
    assert_eq!(report.context.real_host_name(), Some("esx-01"));
    assert_eq!(report.context.peer_host_name(), Some("ocp-worker-1"));
    assert_eq!(
        report.groups_after_map,
        vec!["ocp-worker-1".to_string(), "esx-01".to_string()]
    );
    assert_eq!(report.groups_after_unmap, vec!["ocp-worker-1".to_string()]);
}

#[test]
fn primera_workflow_creates_cloning_host() {
    let report = orchestrator::run_by_name("primera-host-set").unwrap();

    assert_eq!(
        report.context.real_host_name(),
        Some("xcopy-service-vms-host")
    );
    assert_eq!(
        report.groups_after_map,
        vec!["ocp-workers".to_string(), "xcopy-service-vms".to_string()]
    );
    assert_eq!(report.groups_after_unmap, vec!["ocp-workers".to_string()]);
}

#[test]
fn powerflex_workflow_maps_matching_sdc() {
    let report = orchestrator::run_by_name("powerflex-sdc").unwrap();

    assert_eq!(report.lun.name, "4c2a9e5b00000003");
    assert_eq!(report.context.real_host_name(), Some("c0ffee0000000002"));
    assert_eq!(report.groups_after_unmap, vec!["c0ffee0000000001".to_string()]);
    assert_eq!(
        report
            .steps
            .iter()
            .filter(|step| step.operation == OperationKind::Map)
            .count(),
        2
    );
}

#[test]
fn only_group_setup_and_mapping_steps_mutate() {
    let report = orchestrator::run_by_name("infinibox-fc").unwrap();

    let mutating: Vec<OperationKind> = report
        .steps
        .iter()
        .filter(|step| step.mutating)
        .map(|step| step.operation)
        .collect();
    assert_eq!(
        mutating,
        vec![
            OperationKind::EnsureInitiatorGroup,
            OperationKind::Map,
            OperationKind::Map,
            OperationKind::Unmap,
            OperationKind::Unmap,
        ]
    );
}

fn config_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("xcopy-lab-{}-{name}.toml", std::process::id()))
}

fn write_config(name: &str, contents: &str) -> PathBuf {
    let path = config_path(name);
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn workflow_runs_with_config_file() {
    let path = write_config(
        "infinibox",
        r#"
        kind = "infinibox"
        hostname = "ibox.lab.invalid"
        username = "lab"
        password = "lab"

        [retry]
        max_attempts = 2
        initial_delay_ms = 1
        max_delay_ms = 2
        "#,
    );

    let config = orchestrator::load_config(&path).unwrap();
    let report =
        orchestrator::run_spec_with_config(&spec::load_by_name("infinibox-fc").unwrap(), &config)
            .unwrap();
    fs::remove_file(&path).unwrap();

    assert_eq!(config.retry.max_attempts, 2);
    assert_eq!(report.groups_after_unmap, vec!["ocp-worker-1".to_string()]);
}

#[test]
fn config_for_other_backend_is_rejected() {
    let path = write_config(
        "powerflex",
        r#"
        kind = "powerflex"
        hostname = "pflex.lab.invalid"
        username = "lab"
        password = "lab"
        system_id = "csi"
        "#,
    );

    let config = orchestrator::load_config(&path).unwrap();
    let error =
        orchestrator::run_spec_with_config(&spec::load_by_name("infinibox-fc").unwrap(), &config)
            .unwrap_err();
    fs::remove_file(&path).unwrap();

    assert!(matches!(error, TestingError::Setup(_)));
}

#[test]
fn missing_config_file_is_reported() {
    let error = orchestrator::load_config(&config_path("absent")).unwrap_err();
    assert!(matches!(error, TestingError::Setup(_)));
}

#[test]
fn unknown_spec_is_reported() {
    let error = orchestrator::run_by_name("no-such-spec").unwrap_err();
    assert!(matches!(error, TestingError::SpecNotFound { .. }));
}
