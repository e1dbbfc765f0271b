// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

pub use vct_testcase;

mod certificate;
mod vsan;

#[cfg(test)]
pub(crate) mod testutil {
    use serde_json::Value;
    use vct_framework::device::MockDevice;
    use vct_testcase::{TestContext, TestOutcome};

    pub(crate) const DEVICE: &str = "vc01";

    /// Runs a test body against `device` as if the runner had resolved it.
    pub(crate) fn run_check(
        check: fn(&TestContext<'_>) -> TestOutcome,
        device: &MockDevice,
        data: Value,
    ) -> TestOutcome {
        check(&TestContext::new(DEVICE, device, &data))
    }

    /// Returns the failure message from `outcome`, panicking if the test did
    /// not fail.
    pub(crate) fn failure_message(outcome: TestOutcome) -> String {
        match outcome {
            TestOutcome::Failed(Some(msg)) => msg,
            other => panic!("expected a failure, got {other:?}"),
        }
    }
}

#[cfg(test)]
mod test {
    use serde_json::{json, Value};
    use vct_testcase::vct_framework::testcase_data::TestcaseDataError;
    use vct_testcase::vct_framework::TestcaseDataStore;
    use vct_testcase::{all_test_cases, TestCase};

    const DEMO_DATA: &str = include_str!("../../../demos/testcase_data.toml");

    fn demo_record(tc: &TestCase) -> Value {
        let store = TestcaseDataStore::from_toml_str(DEMO_DATA).unwrap();
        store
            .get(tc.name())
            .unwrap_or_else(|| panic!("no demo record for {}", tc.name()))
            .clone()
    }

    fn registered(name: &str) -> &'static TestCase {
        all_test_cases()
            .find(|tc| tc.name() == name)
            .unwrap_or_else(|| panic!("{name} is not registered"))
    }

    #[test]
    fn checks_are_registered_with_their_traceability_ids() {
        let mut registered: Vec<_> = all_test_cases()
            .map(|tc| {
                (
                    tc.name().to_string(),
                    tc.metadata().project_id,
                    tc.metadata().testcase_id,
                    tc.metadata().version,
                )
            })
            .collect();
        registered.sort();

        assert_eq!(
            registered,
            vec![
                (
                    "test_esxi_cellsite_certificate".to_string(),
                    "9321231",
                    "TC-2338",
                    "1.0"
                ),
                ("test_vsan_datastore".to_string(), "154", "TC-577", "1.0"),
                (
                    "test_vsphere_cellsite_policies".to_string(),
                    "9321231",
                    "TC-2254",
                    "1.0"
                ),
                (
                    "test_vsphere_cellsite_uplink_validation".to_string(),
                    "9321231",
                    "TC-2256",
                    "1.0"
                ),
            ]
        );
    }

    #[test]
    fn every_schema_requires_a_device_list() {
        for tc in all_test_cases() {
            let schema = tc.schema();
            let required = schema["required"].as_array().unwrap();
            assert!(
                required.iter().any(|r| r == "devices"),
                "{} does not require devices",
                tc.name()
            );
            assert_eq!(schema["additionalProperties"], false);
        }
    }

    #[test]
    fn demo_records_satisfy_the_registered_schemas() {
        for tc in all_test_cases() {
            let data = demo_record(tc);
            assert!(
                tc.validate(&data).is_ok(),
                "{}: {:?}",
                tc.name(),
                tc.validate(&data)
            );
        }
    }

    #[test]
    fn records_missing_a_required_field_are_rejected() {
        for tc in all_test_cases() {
            let record = demo_record(tc);
            let schema = tc.schema();
            for field in schema["required"].as_array().unwrap() {
                let field = field.as_str().unwrap();
                let mut data = record.clone();
                data.as_object_mut().unwrap().remove(field);
                assert!(
                    matches!(
                        tc.validate(&data),
                        Err(TestcaseDataError::SchemaViolations(_))
                    ),
                    "{} accepted a record without {field}",
                    tc.name()
                );
            }

            let mut data = record;
            data.as_object_mut()
                .unwrap()
                .insert("expected_mtu".to_string(), json!(9000));
            assert!(
                tc.validate(&data).is_err(),
                "{} accepted an unknown field",
                tc.name()
            );
        }
    }

    #[test]
    fn mistyped_values_are_rejected() {
        let cases = [
            ("test_vsphere_cellsite_policies", "expected_vlan", json!("100")),
            ("test_vsphere_cellsite_policies", "expected_vlan", json!(4095)),
            ("test_vsphere_cellsite_policies", "expected_uplinks", json!("2")),
            ("test_vsphere_cellsite_policies", "expected_uplinks", json!(-1)),
            ("test_vsphere_cellsite_uplink_validation", "expected_vmnic", json!(2)),
            ("test_vsphere_cellsite_uplink_validation", "devices", json!("vc01")),
            ("test_esxi_cellsite_certificate", "max_stabilize_time", json!("300")),
            ("test_esxi_cellsite_certificate", "sleep_stabilize_time", json!(0)),
            ("test_vsan_datastore", "domain", json!(5)),
            ("test_vsan_datastore", "devices", json!([1])),
        ];

        for (name, field, value) in cases {
            let tc = registered(name);
            let mut data = demo_record(tc);
            data[field] = value.clone();
            assert!(
                tc.validate(&data).is_err(),
                "{name} accepted {field} = {value}"
            );
        }
    }
}
