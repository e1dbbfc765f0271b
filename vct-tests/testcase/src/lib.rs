// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

pub use anyhow::{anyhow, bail, Context, Result};
pub use inventory::submit as inventory_submit;
pub use vct_framework;
pub use vct_testcase_macros::*;

use serde_json::Value;
use thiserror::Error;
use tracing::{info, info_span};
use vct_framework::testcase_data::{self, TestcaseDataError};

pub use vct_framework::expect::Expectations;
pub use vct_framework::{Device, DeviceError, Framework, TestContext};

mod filter;

pub use filter::TestCaseFilter;

#[derive(Debug, Error)]
pub enum TestSkippedError {
    #[error("Test skipped: {0:?}")]
    TestSkipped(Option<String>),
}

/// Returns early from a test body, marking the test as skipped.
#[macro_export]
macro_rules! vct_skip {
    () => {
        return Err($crate::TestSkippedError::TestSkipped(None).into())
    };
    ($msg:expr) => {
        return Err($crate::TestSkippedError::TestSkipped(Some(
            $msg.to_string(),
        ))
        .into())
    };
}

/// Passes `result` through, except that a device's
/// [`DeviceError::Unsupported`] becomes a [`TestSkippedError`] so the test is
/// reported as skipped instead of failed.
pub fn skip_unsupported<T>(result: Result<T, DeviceError>) -> Result<T> {
    match result {
        Ok(v) => Ok(v),
        Err(DeviceError::Unsupported(op)) => Err(TestSkippedError::TestSkipped(
            Some(format!("device does not support {op}")),
        )
        .into()),
        Err(e) => Err(e.into()),
    }
}

/// The outcome from executing a specific test case.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum TestOutcome {
    /// The test passed.
    Passed,

    /// The test failed.
    Failed(Option<String>),

    /// The test chose to be skipped, i.e. it detected a parameter or condition
    /// that makes it impossible to execute the test or to meaningfully provide
    /// a pass/fail outcome. The payload is an optional message.
    Skipped(Option<String>),
}

/// Identifiers linking a test case to its entry in the external test
/// management system, plus the markers used to select it for a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TestMetadata {
    pub project_id: &'static str,
    pub testcase_id: &'static str,
    pub version: &'static str,
    pub markers: &'static [&'static str],
}

impl TestMetadata {
    pub const fn new(
        project_id: &'static str,
        testcase_id: &'static str,
        version: &'static str,
        markers: &'static [&'static str],
    ) -> Self {
        Self { project_id, testcase_id, version, markers }
    }

    pub fn has_marker(&self, marker: &str) -> bool {
        self.markers.iter().any(|m| *m == marker)
    }
}

/// A wrapper for test functions. This is needed to allow [`TestCase`] to have a
/// `const` constructor for the inventory crate.
pub struct TestFunction {
    pub f: fn(&TestContext<'_>) -> TestOutcome,
}

/// A description of a single test case.
pub struct TestCase {
    /// The path to the module containing the test case. This is generally
    /// derived from the `module_path!()` macro, which the `#[vct_testcase]`
    /// attribute macro uses when constructing the test case's inventory entry.
    pub(crate) module_path: &'static str,

    /// The name of this test case, which is generally its function name. This
    /// is also the key of the test's record in the testcase data file.
    pub(crate) name: &'static str,

    pub(crate) metadata: TestMetadata,

    /// Returns the JSON schema the test's testcase data must satisfy.
    pub(crate) schema: fn() -> Value,

    /// The test function to execute to run this test.
    pub(crate) function: TestFunction,
}

impl TestCase {
    /// Constructs a new [`TestCase`].
    pub const fn new(
        module_path: &'static str,
        name: &'static str,
        metadata: TestMetadata,
        schema: fn() -> Value,
        function: TestFunction,
    ) -> Self {
        Self { module_path, name, metadata, schema, function }
    }

    /// Returns the test case's fully qualified name, i.e. `module_path::name`.
    pub fn fully_qualified_name(&self) -> String {
        format!("{}::{}", self.module_path, self.name)
    }

    /// Returns the test case's name.
    pub fn name(&self) -> &str {
        self.name
    }

    pub fn metadata(&self) -> &TestMetadata {
        &self.metadata
    }

    pub fn schema(&self) -> Value {
        (self.schema)()
    }

    /// Validates `data` against this test's schema and returns the names of
    /// the devices the test should run against.
    pub fn validate(
        &self,
        data: &Value,
    ) -> Result<Vec<String>, TestcaseDataError> {
        testcase_data::validate_testcase_data(&self.schema(), data)?;
        testcase_data::device_names(data)
    }

    /// Resolves `device_name` in the framework's testbed and runs the test's
    /// body against it. `data` must already have passed [`TestCase::validate`].
    pub fn run(
        &self,
        framework: &Framework,
        device_name: &str,
        data: &Value,
    ) -> TestOutcome {
        let _span = info_span!(
            "test",
            test = self.name,
            testcase_id = self.metadata.testcase_id,
            device = device_name,
        )
        .entered();

        let device = match framework.testbed.device(device_name) {
            Ok(device) => device,
            Err(e) => {
                return TestOutcome::Failed(Some(format!(
                    "{:#}",
                    anyhow::Error::from(e)
                )))
            }
        };

        info!("running test body");
        let ctx = TestContext::new(device_name, device.as_ref(), data);
        (self.function.f)(&ctx)
    }
}

inventory::collect!(TestCase);

pub fn all_test_cases() -> impl Iterator<Item = &'static TestCase> {
    inventory::iter::<TestCase>.into_iter()
}

/// Returns an iterator over the registered tests that `filter` selects.
pub fn filtered_test_cases<'rule>(
    filter: &'rule TestCaseFilter<'rule>,
) -> impl Iterator<Item = &'static TestCase> + 'rule {
    all_test_cases().filter(|tc| filter.check(tc))
}
