use std::time::Duration;

use catalyst_ops::config::OnboardProfile;
use catalyst_ops::controller::{ManagedDevice, MockControllerApi, TaskSnapshot};
use catalyst_ops::distribute::{distribute_image, DistributionOutcome};
use catalyst_ops::onboard::{add_device, OnboardOutcome};
use catalyst_ops::task::PollPolicy;

fn quick_policy() -> PollPolicy {
    PollPolicy {
        interval: Duration::from_millis(1),
        max_attempts: 10,
    }
}

fn profile() -> OnboardProfile {
    OnboardProfile {
        cli_username: "catcenter".to_string(),
        cli_password: "cli-secret".to_string(),
        enable_password: "cli-secret".to_string(),
        snmp_ro_community: "ro".to_string(),
        snmp_rw_community: "rw".to_string(),
        http_username: String::new(),
        http_password: String::new(),
    }
}

fn switch(id: &str, hostname: &str) -> ManagedDevice {
    ManagedDevice {
        hostname: hostname.to_string(),
        management_ip_address: "10.93.141.22".to_string(),
        id: id.to_string(),
        software_version: "17.9.4".to_string(),
        family: "Switches and Hubs".to_string(),
        type_name: "Cisco Catalyst 9300 Switch".to_string(),
        role: "ACCESS".to_string(),
    }
}

#[tokio::test]
async fn add_device_short_circuits_when_already_managed() {
    let mut api = MockControllerApi::new();
    api.expect_device_by_ip()
        .withf(|ip| ip == "10.93.141.22")
        .returning(|_| Ok(Some(switch("sw-1", "PDX-EDGE-1"))));
    // No add_device expectation: submitting here would panic the mock.

    let outcome = add_device(&api, &profile(), "10.93.141.22", &quick_policy())
        .await
        .expect("operation should succeed");
    assert!(matches!(outcome, OnboardOutcome::AlreadyManaged));
}

#[tokio::test]
async fn add_device_submits_and_polls_to_completion() {
    let mut api = MockControllerApi::new();
    api.expect_device_by_ip().returning(|_| Ok(None));
    api.expect_add_device()
        .withf(|request| {
            let value = serde_json::to_value(request).unwrap();
            value["ipAddress"][0] == "10.93.141.23" && value["userName"] == "catcenter"
        })
        .returning(|_| Ok("task-add-1".to_string()));
    let mut polls = 0u32;
    api.expect_task().returning(move |task_id| {
        assert_eq!(task_id, "task-add-1");
        polls += 1;
        Ok(TaskSnapshot {
            status: if polls < 2 { "PENDING" } else { "SUCCESS" }.to_string(),
            result_location: Some("/dna/intent/api/v1/task/task-add-1".to_string()),
        })
    });

    let outcome = add_device(&api, &profile(), "10.93.141.23", &quick_policy())
        .await
        .expect("operation should succeed");
    match outcome {
        OnboardOutcome::Finished(task) => {
            assert!(task.is_success());
            assert_eq!(
                task.result_location.as_deref(),
                Some("/dna/intent/api/v1/task/task-add-1")
            );
        }
        OnboardOutcome::AlreadyManaged => panic!("device was not managed beforehand"),
    }
}

#[tokio::test]
async fn distribute_reports_unmanaged_hostnames() {
    let mut api = MockControllerApi::new();
    api.expect_device_by_hostname()
        .withf(|hostname| hostname == "GHOST-1")
        .returning(|_| Ok(None));

    let outcome = distribute_image(&api, "https://cc.example.com", "GHOST-1", &quick_policy())
        .await
        .expect("operation should succeed");
    assert_eq!(outcome, DistributionOutcome::NotManaged);
}

#[tokio::test]
async fn distribute_failure_carries_the_detail_endpoint() {
    let mut api = MockControllerApi::new();
    api.expect_device_by_hostname()
        .returning(|_| Ok(Some(switch("sw-9", "PDX-RN"))));
    api.expect_distribute_image()
        .withf(|device_id| device_id == "sw-9")
        .returning(|_| Ok("task-dist-7".to_string()));
    api.expect_task().returning(|_| {
        Ok(TaskSnapshot {
            status: "FAILURE".to_string(),
            result_location: None,
        })
    });

    let outcome = distribute_image(&api, "https://cc.example.com", "PDX-RN", &quick_policy())
        .await
        .expect("operation should succeed");
    match outcome {
        DistributionOutcome::Failed { status, detail_url } => {
            assert_eq!(status, "FAILURE");
            assert_eq!(
                detail_url,
                "https://cc.example.com/dna/intent/api/v1/tasks/task-dist-7/detail"
            );
        }
        other => panic!("expected failure, got {other:?}"),
    }
}

#[tokio::test]
async fn distribute_success_reports_completion() {
    let mut api = MockControllerApi::new();
    api.expect_device_by_hostname()
        .returning(|_| Ok(Some(switch("sw-9", "PDX-RN"))));
    api.expect_distribute_image()
        .returning(|_| Ok("task-dist-8".to_string()));
    api.expect_task().returning(|_| {
        Ok(TaskSnapshot {
            status: "SUCCESS".to_string(),
            result_location: None,
        })
    });

    let outcome = distribute_image(&api, "https://cc.example.com", "PDX-RN", &quick_policy())
        .await
        .expect("operation should succeed");
    assert_eq!(outcome, DistributionOutcome::Completed);
}
