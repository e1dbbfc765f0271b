// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde_json::Value;
use tracing::{error, info, warn};
use vct_tests::vct_testcase::{Framework, TestCase, TestOutcome};

use crate::report::{ExecutionRecord, RunReport};

/// Statistics returned after executing a set of tests.
pub struct ExecutionStats {
    /// The number of executions that passed.
    pub tests_passed: u32,

    /// The number of executions that failed, including tests whose testcase
    /// data was rejected before any device was chosen.
    pub tests_failed: u32,

    /// The number of tests that marked themselves as skipped, plus tests that
    /// had no testcase data.
    pub tests_skipped: u32,

    /// The number of executions that the runner decided not to run because
    /// the run was interrupted.
    pub tests_not_run: u32,

    /// The total time spent running tests.
    pub duration: Duration,

    /// `name[device]` labels of the executions that failed.
    pub failed_executions: Vec<String>,

    pub report: RunReport,
}

impl ExecutionStats {
    fn new() -> Self {
        Self {
            tests_passed: 0,
            tests_failed: 0,
            tests_skipped: 0,
            tests_not_run: 0,
            duration: Duration::default(),
            failed_executions: Vec::new(),
            report: RunReport::new(Utc::now()),
        }
    }

    fn record(
        &mut self,
        tc: &TestCase,
        device: Option<&str>,
        outcome: TestOutcome,
    ) {
        match &outcome {
            TestOutcome::Passed => self.tests_passed += 1,
            TestOutcome::Failed(_) => {
                self.tests_failed += 1;
                self.failed_executions.push(label(tc, device));
            }
            TestOutcome::Skipped(_) => self.tests_skipped += 1,
        }
        self.report.executions.push(ExecutionRecord::new(tc, device, &outcome));
    }
}

/// One test paired with one device from its testcase data.
struct Execution<'a> {
    tc: &'static TestCase,
    device: String,
    data: &'a Value,
}

fn label(tc: &TestCase, device: Option<&str>) -> String {
    match device {
        Some(device) => format!("{}[{device}]", tc.fully_qualified_name()),
        None => tc.fully_qualified_name(),
    }
}

fn log_outcome(label: &str, outcome: &TestOutcome) {
    info!(
        "test {} ... {}{}",
        label,
        match outcome {
            TestOutcome::Passed => "ok",
            TestOutcome::Failed(_) => "FAILED: ",
            TestOutcome::Skipped(_) => "skipped: ",
        },
        match outcome {
            TestOutcome::Failed(Some(s)) | TestOutcome::Skipped(Some(s)) => {
                s.as_str()
            }
            TestOutcome::Failed(None) | TestOutcome::Skipped(None) =>
                "[no message]",
            _ => "",
        }
    );
}

/// Expands the selected tests into per-device executions. Tests without
/// testcase data are recorded as skipped and tests whose data fails schema
/// validation as failed; neither produces an execution.
fn plan_executions<'a>(
    framework: &'a Framework,
    tests: impl IntoIterator<Item = &'static TestCase>,
    stats: &mut ExecutionStats,
) -> Vec<Execution<'a>> {
    let mut executions = Vec::new();
    for tc in tests {
        let Some(data) = framework.testcase_data.get(tc.name()) else {
            let outcome = TestOutcome::Skipped(Some(format!(
                "no testcase data for '{}'",
                tc.name()
            )));
            log_outcome(&label(tc, None), &outcome);
            stats.record(tc, None, outcome);
            continue;
        };

        match tc.validate(data) {
            Ok(devices) => executions.extend(
                devices.into_iter().map(|device| Execution { tc, device, data }),
            ),
            Err(e) => {
                let outcome = TestOutcome::Failed(Some(e.to_string()));
                log_outcome(&label(tc, None), &outcome);
                stats.record(tc, None, outcome);
            }
        }
    }

    executions
}

fn run_executions(
    framework: &Framework,
    executions: Vec<Execution<'_>>,
    interrupted: &AtomicBool,
    stats: &mut ExecutionStats,
) {
    stats.tests_not_run = executions.len() as u32;
    info!("Running {} execution(s)", executions.len());

    for execution in executions {
        if interrupted.load(Ordering::SeqCst) {
            info!("Test run interrupted by SIGINT");
            break;
        }

        let label = label(execution.tc, Some(&execution.device));
        info!("Starting test {label}");
        stats.tests_not_run -= 1;

        let outcome =
            execution.tc.run(framework, &execution.device, execution.data);
        log_outcome(&label, &outcome);
        stats.record(execution.tc, Some(&execution.device), outcome);
    }
}

/// Executes the selected tests sequentially against the framework's devices.
pub fn run_tests_with_ctx(
    framework: &Framework,
    tests: impl IntoIterator<Item = &'static TestCase>,
) -> ExecutionStats {
    let mut stats = ExecutionStats::new();
    let start_time = Instant::now();

    let executions = plan_executions(framework, tests, &mut stats);
    if executions.is_empty() {
        info!("No executions selected");
    } else {
        let interrupted = set_sigint_handler();
        run_executions(framework, executions, &interrupted, &mut stats);
    }

    stats.duration = start_time.elapsed();
    stats
}

/// Sets a global Ctrl-C handler and returns the flag it raises. The run
/// stops before the next execution once the flag is set; a second Ctrl-C
/// exits immediately.
fn set_sigint_handler() -> Arc<AtomicBool> {
    let interrupted = Arc::new(AtomicBool::new(false));
    let flag = interrupted.clone();
    let result = ctrlc::set_handler(move || {
        // 130 is the customary SIGINT exit code (128 + SIGINT).
        if flag.swap(true, Ordering::SeqCst) {
            error!("SIGINT received while shutting down, terminating");
            std::process::exit(130);
        }

        warn!("SIGINT received, stopping after the current test");
    });

    if let Err(e) = result {
        warn!(error = %e, "failed to set SIGINT handler");
    }

    interrupted
}
