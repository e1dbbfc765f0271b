// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Expected-value records for test cases and the schema validation they go
//! through before a check runs.
//!
//! Records live in a TOML file with one table per test case name:
//!
//! ```toml
//! [test_vsphere_cellsite_uplink_validation]
//! expected_dvs = "cellsite-dvs"
//! expected_vmnic = "vmnic2"
//! devices = ["vc01"]
//! ```

use std::collections::BTreeMap;

use anyhow::Context;
use camino::Utf8Path;
use jsonschema::Draft;
use serde_json::Value;
use thiserror::Error;

/// The key in every record that lists the devices to run the test against.
pub const DEVICES_KEY: &str = "devices";

#[derive(Debug, Error)]
pub enum TestcaseDataError {
    #[error("test case schema is invalid: {0}")]
    BadSchema(String),

    #[error("testcase data does not match its schema:\n    {}", .0.join("\n    "))]
    SchemaViolations(Vec<String>),

    #[error("testcase data field '{DEVICES_KEY}' must be an array of device names")]
    BadDeviceList,
}

/// Checks `data` against `schema`, reporting every violation at once.
pub fn validate_testcase_data(
    schema: &Value,
    data: &Value,
) -> Result<(), TestcaseDataError> {
    let validator = jsonschema::options()
        .with_draft(Draft::Draft7)
        .build(schema)
        .map_err(|e| TestcaseDataError::BadSchema(e.to_string()))?;

    let violations: Vec<String> =
        validator.iter_errors(data).map(|e| e.to_string()).collect();
    if violations.is_empty() {
        Ok(())
    } else {
        Err(TestcaseDataError::SchemaViolations(violations))
    }
}

/// Returns the device names listed in a record.
pub fn device_names(data: &Value) -> Result<Vec<String>, TestcaseDataError> {
    let Some(Value::Array(devices)) = data.get(DEVICES_KEY) else {
        return Err(TestcaseDataError::BadDeviceList);
    };

    devices
        .iter()
        .map(|d| d.as_str().map(str::to_string))
        .collect::<Option<Vec<_>>>()
        .ok_or(TestcaseDataError::BadDeviceList)
}

/// Testcase data records keyed by test case name.
#[derive(Debug, Default)]
pub struct TestcaseDataStore {
    records: BTreeMap<String, Value>,
}

impl TestcaseDataStore {
    pub fn from_toml_path(toml_path: &Utf8Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(toml_path).with_context(|| {
            format!("failed to read testcase data {toml_path}")
        })?;
        Self::from_toml_str(&contents).with_context(|| {
            format!("failed to parse testcase data {toml_path}")
        })
    }

    pub fn from_toml_str(contents: &str) -> anyhow::Result<Self> {
        let table: toml::Table = toml::from_str(contents)?;
        let records = table
            .into_iter()
            .map(|(name, record)| Ok((name, serde_json::to_value(record)?)))
            .collect::<anyhow::Result<BTreeMap<_, _>>>()?;
        Ok(Self { records })
    }

    /// Returns the record for the test case named `test_name`.
    pub fn get(&self, test_name: &str) -> Option<&Value> {
        self.records.get(test_name)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
