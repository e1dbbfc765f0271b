// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! A device backed by a captured configuration document.
//!
//! Snapshots let checks run against a recorded vCenter or ESXi configuration
//! without network access. They are read-only, so operations that change
//! device state (certificate generation) are unsupported.

use std::collections::BTreeMap;

use anyhow::Context;
use camino::Utf8Path;
use serde::Deserialize;
use tracing::debug;

use super::{Device, DeviceError, DistributedSwitch, Inventory, NtpStatus};

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Snapshot {
    /// Absent if the capture did not include network configuration.
    pub distributed_switches: Option<Vec<DistributedSwitch>>,

    /// Uplink vmnic for each switch, keyed by switch name.
    #[serde(default)]
    pub uplink_vmnics: BTreeMap<String, String>,

    pub inventory: Option<Inventory>,
    pub ntp: Option<NtpStatus>,
}

impl Snapshot {
    pub fn from_json_path(path: &Utf8Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read snapshot {path}"))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse snapshot {path}"))
    }
}

pub struct SnapshotDevice {
    snapshot: Snapshot,
}

impl SnapshotDevice {
    pub fn new(snapshot: Snapshot) -> Self {
        Self { snapshot }
    }

    pub fn from_json_path(path: &Utf8Path) -> anyhow::Result<Self> {
        debug!(%path, "loading device snapshot");
        Ok(Self::new(Snapshot::from_json_path(path)?))
    }
}

impl Device for SnapshotDevice {
    fn distributed_switches(&self) -> Result<Vec<DistributedSwitch>, DeviceError> {
        self.snapshot
            .distributed_switches
            .clone()
            .ok_or(DeviceError::Unsupported("distributed switch queries"))
    }

    fn uplink_vmnic(&self, dvs: &DistributedSwitch) -> Result<String, DeviceError> {
        self.snapshot.uplink_vmnics.get(&dvs.name).cloned().ok_or_else(|| {
            DeviceError::Api(format!(
                "no uplink vmnic recorded for switch '{}'",
                dvs.name
            ))
        })
    }

    fn ntp_status(&self) -> Result<NtpStatus, DeviceError> {
        self.snapshot
            .ntp
            .clone()
            .ok_or(DeviceError::Unsupported("NTP status queries"))
    }

    fn inventory(&self) -> Result<Inventory, DeviceError> {
        self.snapshot
            .inventory
            .clone()
            .ok_or(DeviceError::Unsupported("inventory retrieval"))
    }
}
