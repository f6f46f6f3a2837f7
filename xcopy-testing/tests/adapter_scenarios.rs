// SPDX-License-Identifier: GPL-3.0-only

mod common;

use xcopy_contracts::{
    InitiatorGroupAdapter, LunMappingAdapter, StorageErrorKind, VolumeResolver,
};
use xcopy_testing::fakes::FaultInjection;
use xcopy_types::{MappingContext, PersistentVolume};

use common::*;

#[test]
fn infinibox_group_setup_finds_host_by_colon_wwpn() {
    let (fake, adapter) = infinibox(infinibox_array());

    let first = adapter.ensure_clonner_igroup(GROUP, &adapter_ids()).unwrap();
    assert_eq!(first.real_host_name(), Some("esx-01"));
    assert_eq!(first.logical_host_name(), Some(GROUP));
    assert_eq!(first.host_id(), Some(7));

    let second = adapter.ensure_clonner_igroup(GROUP, &adapter_ids()).unwrap();
    assert_eq!(first, second);
    assert_eq!(fake.host_count(), 2);
}

#[test]
fn infinibox_group_setup_without_matching_port_is_not_found() {
    let (_fake, adapter) = infinibox(infinibox_array());
    let error = adapter
        .ensure_clonner_igroup(GROUP, &["fc.2100009999999999".to_string()])
        .unwrap_err();
    assert_eq!(error.kind, StorageErrorKind::NotFound);
    assert!(error.message.contains("fc.2100009999999999"));
}

#[test]
fn par3_group_setup_reuses_host_and_fills_host_set_once() {
    let (fake, adapter) = par3(par3_array());

    let first = adapter.ensure_clonner_igroup(GROUP, &adapter_ids()).unwrap();
    let second = adapter.ensure_clonner_igroup(GROUP, &adapter_ids()).unwrap();

    assert_eq!(first, second);
    assert_eq!(first.real_host_name(), Some("esx-01"));
    assert_eq!(fake.host_names(), vec!["esx-01".to_string()]);
    assert_eq!(fake.host_set_members_of(GROUP), Some(vec!["esx-01".to_string()]));
    assert_eq!(fake.calls("create_host_set"), 1);
    assert_eq!(fake.calls("add_host_to_host_set"), 1);
}

#[test]
fn par3_group_setup_creates_missing_host_once() {
    let (fake, adapter) = par3(par3_array());
    let ids = vec!["iqn.1998-01.com.vmware:esx-09".to_string()];

    let context = adapter.ensure_clonner_igroup(GROUP, &ids).unwrap();
    adapter.ensure_clonner_igroup(GROUP, &ids).unwrap();

    assert_eq!(context.real_host_name(), Some("grp1-host"));
    assert_eq!(fake.calls("create_host"), 1);
    assert_eq!(
        fake.host_set_members_of(GROUP),
        Some(vec!["grp1-host".to_string()])
    );
}

#[test]
fn powerflex_group_setup_matches_sdc_guid() {
    let (_fake, adapter) = powerflex(powerflex_array());

    let context = adapter
        .ensure_clonner_igroup(GROUP, &["guid-esx-01".to_string()])
        .unwrap();
    assert_eq!(context.real_host_name(), Some("sdc-a"));

    let by_id = adapter.ensure_clonner_igroup("sdc-b", &[]).unwrap();
    assert_eq!(by_id.real_host_name(), Some("sdc-b"));
}

#[test]
fn infinibox_map_twice_reports_one_group() {
    let (fake, adapter) = infinibox(infinibox_array());
    let lun = infinibox_lun(&adapter);
    let mut context = adapter.ensure_clonner_igroup(GROUP, &adapter_ids()).unwrap();

    adapter.map(GROUP, &lun, &context).unwrap();
    assert_eq!(
        adapter.current_mapped_groups(&lun, &mut context).unwrap(),
        vec!["esx-01".to_string()]
    );

    adapter.map(GROUP, &lun, &context).unwrap();
    assert_eq!(
        adapter.current_mapped_groups(&lun, &mut context).unwrap(),
        vec!["esx-01".to_string()]
    );
    assert_eq!(fake.mappings_of(100).len(), 1);
    assert_eq!(fake.calls("map_volume_to_host"), 1);
}

#[test]
fn par3_map_twice_reports_one_group() {
    let (fake, adapter) = par3(par3_array());
    let lun = par3_lun(&adapter);
    let mut context = adapter.ensure_clonner_igroup(GROUP, &adapter_ids()).unwrap();

    adapter.map(GROUP, &lun, &context).unwrap();
    adapter.map(GROUP, &lun, &context).unwrap();

    assert_eq!(
        adapter.current_mapped_groups(&lun, &mut context).unwrap(),
        vec![GROUP.to_string()]
    );
    assert_eq!(fake.vluns_of("vol-100").len(), 1);
    assert_eq!(fake.calls("create_vlun"), 1);
}

#[test]
fn powerflex_map_twice_reports_one_sdc() {
    let (fake, adapter) = powerflex(powerflex_array());
    let lun = powerflex_lun(&adapter);
    let mut context = adapter
        .ensure_clonner_igroup(GROUP, &["guid-esx-01".to_string()])
        .unwrap();

    adapter.map(GROUP, &lun, &context).unwrap();
    adapter.map(GROUP, &lun, &context).unwrap();

    assert_eq!(
        adapter.current_mapped_groups(&lun, &mut context).unwrap(),
        vec!["sdc-a".to_string()]
    );
    assert_eq!(fake.mapped_sdcs("12345"), vec!["sdc-a".to_string()]);

    let requests = fake.map_requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].allow_multiple_mappings);
    assert!(!requests[0].all_sdcs);
}

#[test]
fn unmapped_volume_has_no_groups() {
    let (_fake, ibox) = infinibox(infinibox_array());
    let lun = infinibox_lun(&ibox);
    assert!(
        ibox.current_mapped_groups(&lun, &mut MappingContext::new())
            .unwrap()
            .is_empty()
    );

    let (_fake, array) = par3(par3_array());
    let lun = par3_lun(&array);
    assert!(
        array
            .current_mapped_groups(&lun, &mut MappingContext::new())
            .unwrap()
            .is_empty()
    );

    let (_fake, pfx) = powerflex(powerflex_array());
    let lun = powerflex_lun(&pfx);
    assert!(
        pfx.current_mapped_groups(&lun, &mut MappingContext::new())
            .unwrap()
            .is_empty()
    );
}

#[test]
fn powerflex_resolves_csi_handle() {
    let (_fake, adapter) = powerflex(powerflex_array());

    let lun = adapter
        .resolve_volume_handle_to_lun(&PersistentVolume::from_handle("csi-12345"))
        .unwrap();
    assert_eq!(lun.name, "12345");
    assert_eq!(lun.serial_number, "12345");
    assert_eq!(lun.volume_handle, "csi-12345");

    let error = adapter
        .resolve_volume_handle_to_lun(&PersistentVolume::from_handle("malformed"))
        .unwrap_err();
    assert_eq!(error.kind, StorageErrorKind::InvalidState);
}

#[test]
fn powerflex_resolve_of_missing_volume_is_not_found() {
    let (_fake, adapter) = powerflex(powerflex_array());
    let error = adapter
        .resolve_volume_handle_to_lun(&PersistentVolume::from_handle("csi-99999"))
        .unwrap_err();
    assert_eq!(error.kind, StorageErrorKind::NotFound);
}

#[test]
fn infinibox_resolve_synthesizes_names_from_serial() {
    let (_fake, adapter) = infinibox(infinibox_array());

    let fc = adapter
        .resolve_volume_handle_to_lun(
            &PersistentVolume::from_handle("pvc-100")
                .with_attribute("Name", "vol-100")
                .with_attribute("storage_protocol", "fc"),
        )
        .unwrap();
    assert_eq!(fc.name, "vol-100");
    assert_eq!(fc.ldevice_id, "100");
    assert_eq!(fc.serial_number, "742b0f0000000064");
    assert_eq!(fc.naa, "naa.6742b0f0000000064");
    assert_eq!(fc.iqn, "naa.742b0f0000000064");

    let iscsi = adapter
        .resolve_volume_handle_to_lun(
            &PersistentVolume::from_handle("pvc-100")
                .with_attribute("Name", "vol-100")
                .with_attribute("storage_protocol", "iscsi"),
        )
        .unwrap();
    assert_eq!(iscsi.iqn, "iqn.742b0f0000000064");

    let error = adapter
        .resolve_volume_handle_to_lun(&PersistentVolume::from_handle("pvc-100"))
        .unwrap_err();
    assert_eq!(error.kind, StorageErrorKind::InvalidState);
}

#[test]
fn par3_resolve_falls_back_to_handle_and_tags_provider() {
    let (_fake, adapter) = par3(par3_array());

    let lun = adapter
        .resolve_volume_handle_to_lun(&PersistentVolume::from_handle("vol-100"))
        .unwrap();
    assert_eq!(lun.name, "vol-100");
    assert_eq!(lun.ldevice_id, "100");
    assert_eq!(lun.naa, "naa.60002ac0000000000000006400028c4e");
    assert_eq!(lun.provider_id, "60002ac");
}
