// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The registry of devices under test.
//!
//! A testbed is described by a TOML file with one `[devices.<name>]` table per
//! device:
//!
//! ```toml
//! [devices.vc01]
//! kind = "snapshot"
//! path = "snapshots/vc01.json"
//!
//! [devices.esxi01]
//! kind = "esxi-ssh"
//! host = "10.20.0.11"
//! ```
//!
//! Devices are only connected to (or loaded) when a test looks them up.

use std::collections::BTreeMap;

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use thiserror::Error;

use crate::device::{
    esxi_ssh::{EsxiSshConfig, EsxiSshDevice},
    snapshot::SnapshotDevice,
    vcenter_rest::{VcenterRestConfig, VcenterRestDevice},
    Device,
};

#[derive(Debug, Error)]
pub enum TestbedError {
    #[error("Device '{0}' does not exist in the testbed")]
    NoSuchDevice(String),

    #[error("failed to open device '{name}'")]
    OpenFailed {
        name: String,
        #[source]
        source: anyhow::Error,
    },
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum DeviceConfig {
    /// A captured configuration document. Relative paths are resolved
    /// against the directory containing the testbed file.
    Snapshot { path: Utf8PathBuf },
    EsxiSsh(EsxiSshConfig),
    VcenterRest(VcenterRestConfig),
}

#[derive(Debug, Default, Deserialize)]
struct TestbedFile {
    #[serde(default)]
    devices: BTreeMap<String, DeviceConfig>,
}

#[derive(Debug, Default)]
pub struct Testbed {
    devices: BTreeMap<String, DeviceConfig>,
    base_dir: Utf8PathBuf,
}

impl Testbed {
    pub fn from_toml_path(toml_path: &Utf8Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(toml_path)
            .with_context(|| format!("failed to read testbed {toml_path}"))?;
        let base_dir = toml_path
            .parent()
            .map(Utf8Path::to_path_buf)
            .unwrap_or_default();
        Self::from_toml_str(&contents, base_dir)
            .with_context(|| format!("failed to parse testbed {toml_path}"))
    }

    pub fn from_toml_str(
        contents: &str,
        base_dir: Utf8PathBuf,
    ) -> anyhow::Result<Self> {
        let file: TestbedFile = toml::from_str(contents)?;
        Ok(Self { devices: file.devices, base_dir })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.devices.contains_key(name)
    }

    pub fn device_names(&self) -> impl Iterator<Item = &str> {
        self.devices.keys().map(String::as_str)
    }

    /// Opens the device named `name`.
    pub fn device(&self, name: &str) -> Result<Box<dyn Device>, TestbedError> {
        let config = self
            .devices
            .get(name)
            .ok_or_else(|| TestbedError::NoSuchDevice(name.to_string()))?;

        let opened: anyhow::Result<Box<dyn Device>> = match config {
            DeviceConfig::Snapshot { path } => {
                let path = if path.is_relative() {
                    self.base_dir.join(path)
                } else {
                    path.clone()
                };
                SnapshotDevice::from_json_path(&path)
                    .map(|d| Box::new(d) as Box<dyn Device>)
            }
            DeviceConfig::EsxiSsh(cfg) => {
                Ok(Box::new(EsxiSshDevice::new(cfg.clone())))
            }
            DeviceConfig::VcenterRest(cfg) => VcenterRestDevice::new(cfg)
                .map(|d| Box::new(d) as Box<dyn Device>),
        };

        opened.map_err(|source| TestbedError::OpenFailed {
            name: name.to_string(),
            source,
        })
    }
}
