// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! vCenter servers queried through the vSphere Automation REST API.
//!
//! The Automation API lists datacenters, clusters and hosts, but its
//! datastore filters cannot scope a query to one host. Each host's mounted
//! datastores are read from the host's `datastore` property through the
//! VI/JSON API instead. Distributed switch teaming details are not exposed
//! here, so only inventory retrieval is supported.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{de::DeserializeOwned, Deserialize};
use tracing::{debug, info, warn};

use super::{
    ComputeResource, Datacenter, Datastore, Device, DeviceError, HostSystem,
    Inventory,
};

const SESSION_HEADER: &str = "vmware-api-session-id";

fn default_timeout_secs() -> u64 {
    30
}

fn default_vim_release() -> String {
    "8.0.1.0".to_string()
}

/// Path of a managed object property in the VI/JSON API.
fn vim_property_path(
    release: &str,
    mo_type: &str,
    mo_id: &str,
    property: &str,
) -> String {
    format!("/sdk/vim25/{release}/{mo_type}/{mo_id}/{property}")
}

fn vim_session_path(release: &str, method: &str) -> String {
    format!("/sdk/vim25/{release}/SessionManager/SessionManager/{method}")
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct VcenterRestConfig {
    /// Base URL of the vCenter server, e.g. `https://vc01.lab`.
    pub url: String,
    pub username: String,

    /// Name of the environment variable holding the user's password.
    pub password_env: String,

    /// Accept self-signed or otherwise invalid server certificates.
    #[serde(default)]
    pub insecure: bool,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// vSphere release used in VI/JSON paths; VI/JSON needs 8.0U1 or later.
    #[serde(default = "default_vim_release")]
    pub vim_release: String,
}

#[derive(Debug, Deserialize)]
struct DatacenterSummary {
    datacenter: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct ClusterSummary {
    cluster: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct HostSummary {
    host: String,
    name: String,
}

/// A VI/JSON managed object reference, e.g. `{"type": "Datastore",
/// "value": "datastore-12"}`.
#[derive(Debug, Deserialize)]
struct ManagedObjectReference {
    #[serde(rename = "type")]
    mo_type: String,
    value: String,
}

/// Session ids for the two APIs the inventory walk uses.
struct Sessions {
    api: String,
    vim: String,
}

pub struct VcenterRestDevice {
    base_url: String,
    username: String,
    password: String,
    vim_release: String,
    client: reqwest::blocking::Client,
}

impl VcenterRestDevice {
    pub fn new(config: &VcenterRestConfig) -> anyhow::Result<Self> {
        let password = std::env::var(&config.password_env).map_err(|_| {
            anyhow::anyhow!(
                "password environment variable '{}' is not set",
                config.password_env
            )
        })?;
        let client = reqwest::blocking::ClientBuilder::new()
            .timeout(Duration::from_secs(config.timeout_secs))
            .danger_accept_invalid_certs(config.insecure)
            .build()?;

        Ok(Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            username: config.username.clone(),
            password,
            vim_release: config.vim_release.clone(),
            client,
        })
    }

    fn login(&self) -> Result<String, DeviceError> {
        debug!(url = %self.base_url, user = %self.username, "creating API session");
        let response = self
            .client
            .post(format!("{}/api/session", self.base_url))
            .basic_auth(&self.username, Some(&self.password))
            .send()?;
        if !response.status().is_success() {
            return Err(DeviceError::Api(format!(
                "login to {} failed with HTTP status {}",
                self.base_url,
                response.status()
            )));
        }

        Ok(response.json::<String>()?)
    }

    fn login_vim(&self) -> Result<String, DeviceError> {
        let path = vim_session_path(&self.vim_release, "Login");
        let response = self
            .client
            .post(format!("{}{path}", self.base_url))
            .json(&serde_json::json!({
                "userName": self.username,
                "password": self.password,
            }))
            .send()?;
        if !response.status().is_success() {
            return Err(DeviceError::Api(format!(
                "VI/JSON login to {} failed with HTTP status {}",
                self.base_url,
                response.status()
            )));
        }

        response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| {
                DeviceError::Api(format!(
                    "VI/JSON login to {} returned no session id",
                    self.base_url
                ))
            })
    }

    fn logout_vim(&self, session: &str) {
        let path = vim_session_path(&self.vim_release, "Logout");
        let result = self
            .client
            .post(format!("{}{path}", self.base_url))
            .header(SESSION_HEADER, session)
            .send();
        if let Err(e) = result {
            warn!(error = %e, url = %self.base_url, "failed to close VI/JSON session");
        }
    }

    fn logout(&self, session: &str) {
        let result = self
            .client
            .delete(format!("{}/api/session", self.base_url))
            .header(SESSION_HEADER, session)
            .send();
        if let Err(e) = result {
            warn!(error = %e, url = %self.base_url, "failed to close API session");
        }
    }

    fn get<T: DeserializeOwned>(
        &self,
        session: &str,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, DeviceError> {
        let response = self
            .client
            .get(format!("{}{path}", self.base_url))
            .header(SESSION_HEADER, session)
            .query(query)
            .send()?;
        if !response.status().is_success() {
            return Err(DeviceError::Api(format!(
                "GET {path} returned HTTP status {}",
                response.status()
            )));
        }

        Ok(response.json()?)
    }

    /// Returns the names of the datastores mounted on `host_id`. Names are
    /// cached in `names` across hosts.
    fn host_datastores(
        &self,
        session: &str,
        host_id: &str,
        names: &mut BTreeMap<String, String>,
    ) -> Result<Vec<Datastore>, DeviceError> {
        let path = vim_property_path(
            &self.vim_release,
            "HostSystem",
            host_id,
            "datastore",
        );
        let refs: Vec<ManagedObjectReference> = self.get(session, &path, &[])?;

        let mut datastores = Vec::with_capacity(refs.len());
        for mo in refs {
            if mo.mo_type != "Datastore" {
                return Err(DeviceError::Parse(format!(
                    "host {host_id} lists a {} as a datastore",
                    mo.mo_type
                )));
            }
            let name = match names.get(&mo.value) {
                Some(name) => name.clone(),
                None => {
                    let path = vim_property_path(
                        &self.vim_release,
                        "Datastore",
                        &mo.value,
                        "name",
                    );
                    let name: String = self.get(session, &path, &[])?;
                    names.insert(mo.value, name.clone());
                    name
                }
            };
            datastores.push(Datastore { name });
        }

        Ok(datastores)
    }

    fn first_datacenter(
        &self,
        sessions: &Sessions,
    ) -> Result<Datacenter, DeviceError> {
        let session = sessions.api.as_str();
        let datacenters: Vec<DatacenterSummary> =
            self.get(session, "/api/vcenter/datacenter", &[])?;
        let Some(dc) = datacenters.into_iter().next() else {
            return Err(DeviceError::Api(format!(
                "{} has no datacenters",
                self.base_url
            )));
        };

        let clusters: Vec<ClusterSummary> = self.get(
            session,
            "/api/vcenter/cluster",
            &[("datacenters", &dc.datacenter)],
        )?;

        let mut names = BTreeMap::new();
        let mut host_folder = Vec::with_capacity(clusters.len());
        for cluster in clusters {
            let hosts: Vec<HostSummary> = self.get(
                session,
                "/api/vcenter/host",
                &[("clusters", &cluster.cluster)],
            )?;

            let mut resource =
                ComputeResource { name: cluster.name, hosts: Vec::new() };
            for host in hosts {
                let datastores =
                    self.host_datastores(&sessions.vim, &host.host, &mut names)?;
                resource.hosts.push(HostSystem { name: host.name, datastores });
            }
            host_folder.push(resource);
        }

        Ok(Datacenter { name: dc.name, host_folder })
    }
}

impl Device for VcenterRestDevice {
    /// Retrieves the hierarchy under the server's first datacenter.
    fn inventory(&self) -> Result<Inventory, DeviceError> {
        let api = self.login()?;
        let vim = match self.login_vim() {
            Ok(vim) => vim,
            Err(e) => {
                self.logout(&api);
                return Err(e);
            }
        };
        let sessions = Sessions { api, vim };
        let result = self.first_datacenter(&sessions);
        self.logout_vim(&sessions.vim);
        self.logout(&sessions.api);

        let datacenter = result?;
        info!(
            url = %self.base_url,
            datacenter = %datacenter.name,
            clusters = datacenter.host_folder.len(),
            "retrieved inventory"
        );
        Ok(Inventory { datacenters: vec![datacenter] })
    }
}
