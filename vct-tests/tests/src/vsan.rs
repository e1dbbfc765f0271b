// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;
use vct_testcase::*;

fn vsan_datastore_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "domain": { "type": "string" },
            "cluster": { "type": "string" },
            "datastore": { "type": "string" },
            "devices": { "type": "array", "items": { "type": "string" } },
        },
        "required": ["domain", "cluster", "datastore", "devices"],
        "additionalProperties": false,
    })
}

#[derive(Debug, Deserialize)]
struct VsanDatastore {
    domain: String,
    cluster: String,
    datastore: String,
}

/// Verifies that every host in the `<domain>-<cluster>` cluster of the first
/// datacenter mounts the `<domain>-<datastore>` vSAN datastore.
#[vct_testcase(
    schema = "vsan_datastore_schema",
    project_id = "154",
    testcase_id = "TC-577",
    version = "1.0",
    markers = "all_ndc, vsan_ndc, IaaS"
)]
fn test_vsan_datastore(ctx: &TestContext) {
    let VsanDatastore { domain, cluster, datastore } = ctx.testcase_data()?;
    let inventory = skip_unsupported(ctx.device().inventory())?;

    info!(
        "Verifying if vSAN datastore '{datastore}' exists on the domain \
         '{domain}'; cluster '{cluster}' on the device '{}'",
        ctx.device_name()
    );

    let cluster_name = format!("{domain}-{cluster}");
    let datastore_name = format!("{domain}-{datastore}");
    let Some(resource) = inventory.datacenters.first().and_then(|dc| {
        dc.host_folder.iter().find(|cr| cr.name.contains(&cluster_name))
    }) else {
        bail!(
            "Datastore '{datastore}' does not exist on the domain '{domain}'; \
             cluster '{cluster}'"
        );
    };

    if resource.hosts.is_empty() {
        bail!(
            "Cluster '{}' on the domain '{domain}' has no hosts to check for \
             datastore '{datastore}'",
            resource.name
        );
    }

    let mut pass_msgs = Vec::new();
    let mut error_msgs = Vec::new();
    for host in &resource.hosts {
        if host.datastores.iter().any(|ds| ds.name.contains(&datastore_name)) {
            pass_msgs.push(format!(
                "Datastore '{datastore}' exists on the host '{}'; domain \
                 '{domain}'; cluster '{cluster}'",
                host.name
            ));
        } else {
            error_msgs.push(format!(
                "Datastore '{datastore}' does not exist on the host '{}'; \
                 domain '{domain}'; cluster '{cluster}'",
                host.name
            ));
        }
    }

    for msg in &pass_msgs {
        info!("{msg}");
    }
    if !error_msgs.is_empty() {
        bail!("{}", error_msgs.join("\n"));
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testutil::{failure_message, run_check};
    use vct_framework::device::{
        ComputeResource, Datacenter, Datastore, HostSystem, Inventory,
        MockDevice,
    };

    fn host(name: &str, datastores: &[&str]) -> HostSystem {
        HostSystem {
            name: name.to_string(),
            datastores: datastores
                .iter()
                .map(|d| Datastore { name: d.to_string() })
                .collect(),
        }
    }

    fn inventory(hosts: Vec<HostSystem>) -> Inventory {
        Inventory {
            datacenters: vec![Datacenter {
                name: "dc01".to_string(),
                host_folder: vec![
                    ComputeResource {
                        name: "edge-cl01".to_string(),
                        hosts: vec![host("esxi09", &["edge-vsan"])],
                    },
                    ComputeResource { name: "mgmt-cl01".to_string(), hosts },
                ],
            }],
        }
    }

    fn device(inventory: Inventory) -> MockDevice {
        let mut device = MockDevice::new();
        device.expect_inventory().returning(move || Ok(inventory.clone()));
        device
    }

    fn data() -> Value {
        json!({
            "domain": "mgmt",
            "cluster": "cl01",
            "datastore": "vsan",
            "devices": ["vc01"],
        })
    }

    #[test]
    fn datastore_on_every_host() {
        let device = device(inventory(vec![
            host("esxi01", &["local-esxi01", "mgmt-vsan"]),
            host("esxi02", &["mgmt-vsan"]),
        ]));
        assert_eq!(
            run_check(test_vsan_datastore, &device, data()),
            TestOutcome::Passed
        );
    }

    #[test]
    fn hosts_without_the_datastore_are_listed() {
        let device = device(inventory(vec![
            host("esxi01", &["mgmt-vsan"]),
            host("esxi02", &["local-esxi02"]),
            host("esxi03", &[]),
        ]));
        let msg = failure_message(run_check(test_vsan_datastore, &device, data()));
        assert_eq!(
            msg,
            "Datastore 'vsan' does not exist on the host 'esxi02'; domain \
             'mgmt'; cluster 'cl01'\n\
             Datastore 'vsan' does not exist on the host 'esxi03'; domain \
             'mgmt'; cluster 'cl01'"
        );
    }

    #[test]
    fn missing_cluster_fails() {
        let device = device(inventory(vec![host("esxi01", &["mgmt-vsan"])]));
        let data = json!({
            "domain": "mgmt",
            "cluster": "cl02",
            "datastore": "vsan",
            "devices": ["vc01"],
        });
        let msg = failure_message(run_check(test_vsan_datastore, &device, data));
        assert_eq!(
            msg,
            "Datastore 'vsan' does not exist on the domain 'mgmt'; cluster 'cl02'"
        );
    }

    #[test]
    fn empty_cluster_fails() {
        let device = device(inventory(vec![]));
        let msg = failure_message(run_check(test_vsan_datastore, &device, data()));
        assert!(msg.contains("has no hosts"), "{msg}");
    }

    #[test]
    fn empty_inventory_fails() {
        let device = device(Inventory::default());
        let msg = failure_message(run_check(test_vsan_datastore, &device, data()));
        assert!(msg.starts_with("Datastore 'vsan' does not exist on the domain"));
    }
}
