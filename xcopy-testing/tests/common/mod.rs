// SPDX-License-Identifier: GPL-3.0-only

#![allow(dead_code)]

use std::sync::Arc;

use xcopy_adapters::{InfiniboxClonner, Par3Clonner, PowerFlexClonner};
use xcopy_contracts::VolumeResolver;
use xcopy_testing::fakes::{FakeInfinibox, FakePar3, FakePowerFlex};
use xcopy_testing::lab::orchestrator::lab_config;
use xcopy_types::{BackendKind, Lun, PersistentVolume};

pub const GROUP: &str = "grp1";
pub const ESX_WWPN_PORT: &str = "21:00:00:11:22:33:44:55";
pub const ESX_ADAPTER: &str = "fc.2100001122334455";
pub const POWERFLEX_SYSTEM: &str = "csi";

pub fn adapter_ids() -> Vec<String> {
    vec![ESX_ADAPTER.to_string()]
}

/// Array with the cloning host `esx-01` (id 7) and volume `vol-100` (id 100).
pub fn infinibox_array() -> FakeInfinibox {
    FakeInfinibox::new()
        .with_host(3, "ocp-worker-1", &["21:00:00:24:ff:7a:10:01"])
        .with_host(7, "esx-01", &["20:00:00:11:22:33:44:55", ESX_WWPN_PORT])
        .with_volume(100, "vol-100", "742b0f0000000064")
}

pub fn infinibox(array: FakeInfinibox) -> (Arc<FakeInfinibox>, InfiniboxClonner) {
    let fake = Arc::new(array);
    let adapter = InfiniboxClonner::connect(fake.clone(), &lab_config(BackendKind::Infinibox, None))
        .expect("infinibox adapter");
    (fake, adapter)
}

pub fn infinibox_lun(adapter: &InfiniboxClonner) -> Lun {
    adapter
        .resolve_volume_handle_to_lun(
            &PersistentVolume::from_handle("pvc-100").with_attribute("Name", "vol-100"),
        )
        .expect("resolve vol-100")
}

pub fn par3_array() -> FakePar3 {
    FakePar3::new()
        .with_host("esx-01", &["2100001122334455"])
        .with_volume(100, "vol-100", "60002AC0000000000000006400028C4E")
}

pub fn par3(array: FakePar3) -> (Arc<FakePar3>, Par3Clonner) {
    let fake = Arc::new(array);
    let adapter = Par3Clonner::connect(fake.clone(), &lab_config(BackendKind::Primera3Par, None))
        .expect("3par adapter");
    (fake, adapter)
}

pub fn par3_lun(adapter: &Par3Clonner) -> Lun {
    adapter
        .resolve_volume_handle_to_lun(
            &PersistentVolume::from_handle("pvc-100").with_attribute("Name", "vol-100"),
        )
        .expect("resolve vol-100")
}

/// Gateway with SDCs `sdc-a` (the cloning host) and `sdc-b`, and volume `12345`.
pub fn powerflex_array() -> FakePowerFlex {
    FakePowerFlex::new(POWERFLEX_SYSTEM)
        .with_sdc("sdc-a", "esx-01", "guid-esx-01", "10.0.0.31")
        .with_sdc("sdc-b", "ocp-worker-1", "guid-ocp-1", "10.0.0.21")
        .with_volume("12345", "vol-12345")
}

pub fn powerflex(array: FakePowerFlex) -> (Arc<FakePowerFlex>, PowerFlexClonner) {
    let fake = Arc::new(array);
    let adapter = PowerFlexClonner::connect(
        fake.clone(),
        &lab_config(BackendKind::PowerFlex, Some(POWERFLEX_SYSTEM)),
    )
    .expect("powerflex adapter");
    (fake, adapter)
}

pub fn powerflex_lun(adapter: &PowerFlexClonner) -> Lun {
    adapter
        .resolve_volume_handle_to_lun(&PersistentVolume::from_handle("csi-12345"))
        .expect("resolve csi-12345")
}
