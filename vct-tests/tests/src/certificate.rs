// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::time::Duration;

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;
use vct_testcase::vct_framework::poll::{poll_until_stable, PollError};
use vct_testcase::*;

fn cellsite_certificate_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "max_stabilize_time": { "type": "number", "minimum": 0 },
            "sleep_stabilize_time": { "type": "number", "exclusiveMinimum": 0 },
            "devices": { "type": "array", "items": { "type": "string" } },
        },
        "required": ["max_stabilize_time", "sleep_stabilize_time", "devices"],
        "additionalProperties": false,
    })
}

/// Stabilization timings, in seconds.
#[derive(Debug, Deserialize)]
struct StabilizeTimes {
    max_stabilize_time: f64,
    sleep_stabilize_time: f64,
}

/// Validates that an ESXi host can regenerate its certificates and that
/// esxcli comes back after `hostd` and `vpxa` restart to pick them up.
#[vct_testcase(
    schema = "cellsite_certificate_schema",
    project_id = "9321231",
    testcase_id = "TC-2338",
    version = "1.0",
    markers = "all, esxi, cli, IaaS"
)]
fn test_esxi_cellsite_certificate(ctx: &TestContext) {
    let times: StabilizeTimes = ctx.testcase_data()?;
    let timeout = Duration::try_from_secs_f64(times.max_stabilize_time)?;
    let step = Duration::try_from_secs_f64(times.sleep_stabilize_time)?;
    let esxi = ctx.device_name();

    info!(
        "Verify successful generation of a certificate on the esxi device \
         '{esxi}'"
    );
    match ctx.device().generate_certificates() {
        Ok(()) => {}
        Err(DeviceError::Unsupported(op)) => {
            vct_skip!(format!("device '{esxi}' does not support {op}"))
        }
        Err(e) => {
            return Err(e).context(format!(
                "The generation of a certificate on the esxi device '{esxi}' \
                 is failed"
            ))
        }
    }
    info!("Certificate has been generated correctly");

    info!("Verify esxcli system stability after restarting the processes");
    let stable = poll_until_stable(
        || ctx.device().ntp_status(),
        step,
        timeout,
        DeviceError::is_transient,
    );
    match stable {
        Ok(status) => {
            info!(ntp_enabled = status.enabled, "esxcli system has been re-stabilized")
        }
        Err(PollError::Timeout { timeout, last_error }) => bail!(
            "esxcli system has not re-stabilized within {timeout:?}, future \
             testcase could be affected (last error: {last_error})"
        ),
        Err(PollError::Fatal(e)) => {
            return Err(e).context("esxcli system stability check failed")
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testutil::{failure_message, run_check};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use vct_framework::device::{MockDevice, NtpStatus};

    fn times() -> Value {
        json!({
            "max_stabilize_time": 2,
            "sleep_stabilize_time": 0.01,
            "devices": ["esxi01"],
        })
    }

    fn ntp() -> NtpStatus {
        NtpStatus { enabled: true, servers: vec!["10.0.0.1".to_string()] }
    }

    #[test]
    fn stabilizes_after_ssh_errors() {
        let mut device = MockDevice::new();
        device.expect_generate_certificates().times(1).returning(|| Ok(()));

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        device.expect_ntp_status().returning(move || {
            if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(DeviceError::Ssh("Connection refused".to_string()))
            } else {
                Ok(ntp())
            }
        });

        assert_eq!(
            run_check(test_esxi_cellsite_certificate, &device, times()),
            TestOutcome::Passed
        );
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn certificate_generation_failure_is_fatal() {
        let mut device = MockDevice::new();
        device.expect_generate_certificates().returning(|| {
            Err(DeviceError::Command {
                command: "/sbin/generate-certificates".to_string(),
                status: 1,
                stderr: "permission denied".to_string(),
            })
        });
        device.expect_ntp_status().never();

        let msg = failure_message(run_check(
            test_esxi_cellsite_certificate,
            &device,
            times(),
        ));
        assert!(
            msg.starts_with(
                "The generation of a certificate on the esxi device 'vc01' is failed"
            ),
            "{msg}"
        );
        assert!(msg.contains("permission denied"), "{msg}");
    }

    #[test]
    fn never_stabilizing_times_out() {
        let mut device = MockDevice::new();
        device.expect_generate_certificates().returning(|| Ok(()));
        device
            .expect_ntp_status()
            .returning(|| Err(DeviceError::Ssh("No route to host".to_string())));

        let data = json!({
            "max_stabilize_time": 0.05,
            "sleep_stabilize_time": 0.01,
            "devices": ["esxi01"],
        });
        let msg = failure_message(run_check(
            test_esxi_cellsite_certificate,
            &device,
            data,
        ));
        assert!(msg.starts_with("esxcli system has not re-stabilized"), "{msg}");
        assert!(msg.contains("No route to host"), "{msg}");
    }

    #[test]
    fn non_ssh_errors_fail_immediately() {
        let mut device = MockDevice::new();
        device.expect_generate_certificates().returning(|| Ok(()));
        device.expect_ntp_status().times(1).returning(|| {
            Err(DeviceError::Parse("NTP status has no 'Enabled' field".to_string()))
        });

        let msg = failure_message(run_check(
            test_esxi_cellsite_certificate,
            &device,
            times(),
        ));
        assert!(msg.starts_with("esxcli system stability check failed"), "{msg}");
    }

    #[test]
    fn read_only_devices_skip() {
        let mut device = MockDevice::new();
        device
            .expect_generate_certificates()
            .returning(|| Err(DeviceError::Unsupported("certificate generation")));

        assert_eq!(
            run_check(test_esxi_cellsite_certificate, &device, times()),
            TestOutcome::Skipped(Some(
                "device 'vc01' does not support certificate generation".to_string()
            ))
        );
    }
}
