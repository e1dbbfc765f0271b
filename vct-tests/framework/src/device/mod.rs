// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Devices under test and the capabilities checks can ask of them.

use thiserror::Error;

pub mod esxi_ssh;
pub mod model;
pub mod snapshot;
pub mod vcenter_rest;

pub use model::*;

#[derive(Debug, Error)]
pub enum DeviceError {
    /// The device's backend has no way to perform the requested operation.
    #[error("device does not support {0}")]
    Unsupported(&'static str),

    /// The SSH transport to the device failed. These errors are usually
    /// transient, e.g. while the device's management agents restart.
    #[error("SSH connection error: {0}")]
    Ssh(String),

    #[error("command `{command}` exited with status {status}: {stderr}")]
    Command { command: String, status: i32, stderr: String },

    #[error("API error: {0}")]
    Api(String),

    #[error("failed to parse device output: {0}")]
    Parse(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl DeviceError {
    /// Returns true if retrying the failed operation may succeed without any
    /// change to the request.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Ssh(_))
    }
}

/// The operations checks can perform against a device in the testbed.
///
/// Backends implement the operations their transport can support and leave
/// the rest returning [`DeviceError::Unsupported`].
#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
pub trait Device {
    /// Lists the distributed virtual switches visible to this device.
    fn distributed_switches(&self) -> Result<Vec<DistributedSwitch>, DeviceError> {
        Err(DeviceError::Unsupported("distributed switch queries"))
    }

    /// Returns the name of the physical NIC backing `dvs`'s uplink.
    fn uplink_vmnic(&self, dvs: &DistributedSwitch) -> Result<String, DeviceError> {
        let _ = dvs;
        Err(DeviceError::Unsupported("uplink queries"))
    }

    /// Regenerates the host's certificates and restarts the management
    /// agents (`hostd` and `vpxa`) so they pick them up.
    fn generate_certificates(&self) -> Result<(), DeviceError> {
        Err(DeviceError::Unsupported("certificate generation"))
    }

    fn ntp_status(&self) -> Result<NtpStatus, DeviceError> {
        Err(DeviceError::Unsupported("NTP status queries"))
    }

    /// Retrieves the datacenter/cluster/host/datastore hierarchy.
    fn inventory(&self) -> Result<Inventory, DeviceError> {
        Err(DeviceError::Unsupported("inventory retrieval"))
    }
}
