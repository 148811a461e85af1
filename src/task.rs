//! Fixed-interval polling of asynchronous controller tasks.
//!
//! Every mutating controller operation returns a task id; completion is
//! observed by polling the task endpoint. The loop sleeps a fixed interval
//! between polls and is bounded by `max_attempts` so a stuck task surfaces as
//! an error instead of hanging the process.

use std::time::Duration;

use tracing::{debug, info};

use crate::controller::{ApiError, ControllerApi};

/// Status value the controller reports while a task is still running.
pub const STATUS_PENDING: &str = "PENDING";
/// The only terminal status treated as success.
pub const STATUS_SUCCESS: &str = "SUCCESS";

/// How often and how long to poll a task.
#[derive(Debug, Clone)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        // 10 minutes at the controller's usual task pace.
        Self {
            interval: Duration::from_secs(5),
            max_attempts: 120,
        }
    }
}

/// Terminal state of a polled task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    Success,
    /// Any terminal status other than `SUCCESS`, carrying the raw value.
    Failure(String),
}

/// What the poller observed when the task reached a terminal status.
#[derive(Debug, Clone)]
pub struct TaskOutcome {
    pub status: TaskStatus,
    /// Controller-relative path to the task result, when reported.
    pub result_location: Option<String>,
}

impl TaskOutcome {
    pub fn is_success(&self) -> bool {
        self.status == TaskStatus::Success
    }
}

/// Polls the task until it leaves `PENDING`, sleeping `policy.interval`
/// between polls. Returns an error when the task is still pending after
/// `policy.max_attempts` polls.
pub async fn wait_for_task<C>(
    api: &C,
    task_id: &str,
    policy: &PollPolicy,
) -> Result<TaskOutcome, ApiError>
where
    C: ControllerApi + ?Sized,
{
    for attempt in 1..=policy.max_attempts {
        tokio::time::sleep(policy.interval).await;
        let snapshot = api.task(task_id).await?;
        if snapshot.status == STATUS_PENDING {
            debug!(task_id, attempt, "[TASK] Still pending");
            continue;
        }
        let status = if snapshot.status == STATUS_SUCCESS {
            TaskStatus::Success
        } else {
            TaskStatus::Failure(snapshot.status.clone())
        };
        info!(task_id, attempt, raw_status = %snapshot.status, "[TASK] Reached terminal status");
        return Ok(TaskOutcome {
            status,
            result_location: snapshot.result_location,
        });
    }
    Err(format!(
        "task {task_id} still pending after {} polls",
        policy.max_attempts
    )
    .into())
}
