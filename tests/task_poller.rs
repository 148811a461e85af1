use std::time::Duration;

use catalyst_ops::controller::{MockControllerApi, TaskSnapshot};
use catalyst_ops::task::{wait_for_task, PollPolicy, TaskStatus};

fn quick_policy(max_attempts: u32) -> PollPolicy {
    PollPolicy {
        interval: Duration::from_millis(1),
        max_attempts,
    }
}

#[tokio::test]
async fn poller_returns_success_after_n_pending_polls() {
    for pending_polls in 1..=5u32 {
        let mut api = MockControllerApi::new();
        let mut calls = 0u32;
        api.expect_task().returning(move |_| {
            calls += 1;
            let status = if calls <= pending_polls {
                "PENDING"
            } else {
                "SUCCESS"
            };
            Ok(TaskSnapshot {
                status: status.to_string(),
                result_location: Some("/dna/intent/api/v1/task/t-1".to_string()),
            })
        });

        let outcome = wait_for_task(&api, "t-1", &quick_policy(10))
            .await
            .expect("poll should reach a terminal status");
        assert_eq!(
            outcome.status,
            TaskStatus::Success,
            "expected success after {pending_polls} pending polls"
        );
        assert_eq!(
            outcome.result_location.as_deref(),
            Some("/dna/intent/api/v1/task/t-1")
        );
    }
}

#[tokio::test]
async fn poller_reports_non_success_terminal_status_as_failure() {
    let mut api = MockControllerApi::new();
    api.expect_task().returning(|_| {
        Ok(TaskSnapshot {
            status: "FAILURE".to_string(),
            result_location: None,
        })
    });

    let outcome = wait_for_task(&api, "t-2", &quick_policy(10))
        .await
        .expect("poll should reach a terminal status");
    assert_eq!(outcome.status, TaskStatus::Failure("FAILURE".to_string()));
    assert!(!outcome.is_success());
}

#[tokio::test]
async fn poller_errors_when_task_stays_pending_past_the_bound() {
    let mut api = MockControllerApi::new();
    api.expect_task().times(3).returning(|_| {
        Ok(TaskSnapshot {
            status: "PENDING".to_string(),
            result_location: None,
        })
    });

    let err = wait_for_task(&api, "t-3", &quick_policy(3))
        .await
        .expect_err("bounded poll must not wait forever");
    assert!(
        err.to_string().contains("still pending"),
        "unexpected error: {err}"
    );
}

#[tokio::test]
async fn poller_propagates_api_errors() {
    let mut api = MockControllerApi::new();
    api.expect_task()
        .returning(|_| Err("controller unreachable".into()));

    let err = wait_for_task(&api, "t-4", &quick_policy(5))
        .await
        .expect_err("API errors must surface");
    assert!(err.to_string().contains("controller unreachable"));
}
