// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The VCT framework: the testbed, the devices in it, and the helpers checks
//! use to compare live vSphere configuration against expected values.

use anyhow::Context;
use camino::Utf8PathBuf;
use serde::de::DeserializeOwned;
use serde_json::Value;

pub mod device;
pub mod expect;
pub mod poll;
pub mod testbed;
pub mod testcase_data;

pub use device::{Device, DeviceError};
pub use testbed::Testbed;
pub use testcase_data::TestcaseDataStore;

/// Parameters used to set up a test run.
#[derive(Clone, Debug)]
pub struct FrameworkParameters {
    /// TOML file describing the devices under test.
    pub testbed_path: Utf8PathBuf,

    /// TOML file holding each test case's expected values.
    pub testcase_data_path: Utf8PathBuf,
}

/// Shared state for a test run.
#[derive(Debug, Default)]
pub struct Framework {
    pub testbed: Testbed,
    pub testcase_data: TestcaseDataStore,
}

impl Framework {
    pub fn new(params: &FrameworkParameters) -> anyhow::Result<Self> {
        let testbed = Testbed::from_toml_path(&params.testbed_path)?;
        let testcase_data =
            TestcaseDataStore::from_toml_path(&params.testcase_data_path)?;
        Ok(Self { testbed, testcase_data })
    }
}

/// Everything a check body can see while it runs against one device.
pub struct TestContext<'a> {
    device_name: &'a str,
    device: &'a dyn Device,
    data: &'a Value,
}

impl<'a> TestContext<'a> {
    pub fn new(
        device_name: &'a str,
        device: &'a dyn Device,
        data: &'a Value,
    ) -> Self {
        Self { device_name, device, data }
    }

    /// The testbed name of the device under test.
    pub fn device_name(&self) -> &str {
        self.device_name
    }

    pub fn device(&self) -> &dyn Device {
        self.device
    }

    /// Deserializes this test's (already schema-validated) testcase data.
    pub fn testcase_data<T: DeserializeOwned>(&self) -> anyhow::Result<T> {
        T::deserialize(self.data).context("failed to decode testcase data")
    }
}
