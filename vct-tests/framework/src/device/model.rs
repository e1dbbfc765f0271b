// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The subset of the vSphere object model that checks inspect.
//!
//! These are plain records: device backends fill them in from whatever
//! source they talk to, and checks only ever read them.

use serde::{Deserialize, Serialize};

/// A vCenter-managed distributed virtual switch.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributedSwitch {
    pub name: String,

    /// The names of the switch's uplink ports (`uplinkPortPolicy`).
    #[serde(default)]
    pub uplink_port_names: Vec<String>,

    /// The NIC teaming policies this switch is capable of.
    #[serde(default)]
    pub supported_teaming_policies: Vec<String>,

    /// The uplink teaming policy from the switch's default port config.
    pub default_teaming: TeamingPolicy,

    #[serde(default)]
    pub portgroups: Vec<Portgroup>,
}

impl DistributedSwitch {
    /// Returns the portgroup with the supplied name, if the switch has one.
    pub fn portgroup(&self, name: &str) -> Option<&Portgroup> {
        self.portgroups.iter().find(|pg| pg.name == name)
    }
}

/// Uplink teaming settings for a switch or portgroup.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamingPolicy {
    /// The load balancing mode, e.g. `loadbalance_srcid`.
    pub policy: String,
    pub notify_switches: bool,

    /// Whether traffic fails back to a recovered active uplink. vSphere calls
    /// this `reversePolicy`.
    pub failback: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Portgroup {
    pub name: String,
    pub vlan_id: u16,
}

/// The inventory hierarchy rooted at a vCenter's root folder.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    #[serde(default)]
    pub datacenters: Vec<Datacenter>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Datacenter {
    pub name: String,

    /// The compute resources (clusters) in the datacenter's host folder.
    #[serde(default)]
    pub host_folder: Vec<ComputeResource>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputeResource {
    pub name: String,
    #[serde(default)]
    pub hosts: Vec<HostSystem>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostSystem {
    pub name: String,
    #[serde(default)]
    pub datastores: Vec<Datastore>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Datastore {
    pub name: String,
}

/// NTP service status as reported by `esxcli system ntp get`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NtpStatus {
    pub enabled: bool,
    #[serde(default)]
    pub servers: Vec<String>,
}
