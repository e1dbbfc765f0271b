// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! ESXi hosts driven over SSH.
//!
//! Commands run through the system `ssh` client in batch mode, so key-based
//! authentication must already be set up for the configured user.

use std::process::Command;

use camino::Utf8PathBuf;
use serde::Deserialize;
use tracing::{debug, info};

use super::{Device, DeviceError, NtpStatus};

/// `ssh` exits with this status when the connection itself fails, as
/// opposed to the remote command failing.
const SSH_TRANSPORT_FAILURE: i32 = 255;

const GENERATE_CERTIFICATES_CMD: &str = "/sbin/generate-certificates && \
     /etc/init.d/hostd restart && \
     /etc/init.d/vpxa restart";

const NTP_STATUS_CMD: &str = "esxcli system ntp get";

fn default_user() -> String {
    "root".to_string()
}

fn default_port() -> u16 {
    22
}

fn default_connect_timeout_secs() -> u64 {
    10
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct EsxiSshConfig {
    pub host: String,

    #[serde(default = "default_user")]
    pub user: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Private key to pass to `ssh -i`. If absent, `ssh` picks its defaults.
    pub identity_file: Option<Utf8PathBuf>,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

pub struct EsxiSshDevice {
    config: EsxiSshConfig,
}

impl EsxiSshDevice {
    pub fn new(config: EsxiSshConfig) -> Self {
        Self { config }
    }

    fn ssh_command(&self, remote_cmd: &str) -> Command {
        let mut cmd = Command::new("ssh");
        cmd.arg("-o")
            .arg("BatchMode=yes")
            .arg("-o")
            .arg(format!("ConnectTimeout={}", self.config.connect_timeout_secs))
            .arg("-p")
            .arg(self.config.port.to_string());
        if let Some(identity) = &self.config.identity_file {
            cmd.arg("-i").arg(identity.as_str());
        }
        cmd.arg(format!("{}@{}", self.config.user, self.config.host))
            .arg(remote_cmd);
        cmd
    }

    /// Runs `remote_cmd` on the host and returns its stdout.
    fn run(&self, remote_cmd: &str) -> Result<String, DeviceError> {
        debug!(host = %self.config.host, remote_cmd, "running remote command");
        let output = self.ssh_command(remote_cmd).output()?;
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        match output.status.code() {
            Some(0) => Ok(String::from_utf8_lossy(&output.stdout).into_owned()),
            Some(SSH_TRANSPORT_FAILURE) | None => Err(DeviceError::Ssh(stderr)),
            Some(status) => Err(DeviceError::Command {
                command: remote_cmd.to_string(),
                status,
                stderr,
            }),
        }
    }
}

impl Device for EsxiSshDevice {
    fn generate_certificates(&self) -> Result<(), DeviceError> {
        info!(host = %self.config.host, "regenerating host certificates");
        self.run(GENERATE_CERTIFICATES_CMD).map(|_| ())
    }

    fn ntp_status(&self) -> Result<NtpStatus, DeviceError> {
        parse_ntp_status(&self.run(NTP_STATUS_CMD)?)
    }
}

/// Parses the `Key: Value` listing printed by `esxcli system ntp get`.
fn parse_ntp_status(output: &str) -> Result<NtpStatus, DeviceError> {
    let mut enabled = None;
    let mut servers = Vec::new();
    for line in output.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        match key.trim() {
            "Enabled" => {
                enabled = Some(value.parse::<bool>().map_err(|_| {
                    DeviceError::Parse(format!("bad NTP enabled flag '{value}'"))
                })?);
            }
            "Server" | "Servers" => {
                servers = value
                    .split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect();
            }
            _ => {}
        }
    }

    let enabled = enabled.ok_or_else(|| {
        DeviceError::Parse("NTP status has no 'Enabled' field".to_string())
    })?;
    Ok(NtpStatus { enabled, servers })
}
