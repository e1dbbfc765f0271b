// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Machine-readable run reports.

use anyhow::Context;
use camino::Utf8Path;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;
use vct_tests::vct_testcase::{TestCase, TestOutcome};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Passed,
    Failed,
    Skipped,
}

/// The result of running one test against one device.
#[derive(Debug, Serialize)]
pub struct ExecutionRecord {
    pub test: String,

    /// `None` when the test failed before any device was chosen, e.g. because
    /// its testcase data did not match its schema.
    pub device: Option<String>,
    pub project_id: &'static str,
    pub testcase_id: &'static str,
    pub version: &'static str,
    pub outcome: Outcome,
    pub message: Option<String>,
}

impl ExecutionRecord {
    pub fn new(
        tc: &TestCase,
        device: Option<&str>,
        outcome: &TestOutcome,
    ) -> Self {
        let (outcome, message) = match outcome {
            TestOutcome::Passed => (Outcome::Passed, None),
            TestOutcome::Failed(msg) => (Outcome::Failed, msg.clone()),
            TestOutcome::Skipped(msg) => (Outcome::Skipped, msg.clone()),
        };
        let metadata = tc.metadata();

        Self {
            test: tc.fully_qualified_name(),
            device: device.map(str::to_string),
            project_id: metadata.project_id,
            testcase_id: metadata.testcase_id,
            version: metadata.version,
            outcome,
            message,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub executions: Vec<ExecutionRecord>,
}

impl RunReport {
    pub fn new(start_time: DateTime<Utc>) -> Self {
        Self { run_id: Uuid::new_v4(), start_time, executions: Vec::new() }
    }

    pub fn write_to(&self, path: &Utf8Path) -> anyhow::Result<()> {
        let file = std::fs::File::create(path)
            .with_context(|| format!("creating report file {path}"))?;
        serde_json::to_writer_pretty(file, self)
            .with_context(|| format!("writing report to {path}"))
    }
}
