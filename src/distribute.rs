//! Software-image distribution: resolve the device, trigger the distribution
//! of its golden image, poll the task.

use anyhow::{Context, Result};
use tracing::info;

use crate::controller::ControllerApi;
use crate::task::{wait_for_task, PollPolicy, TaskStatus};

/// Result of one image-distribution run.
#[derive(Debug, PartialEq, Eq)]
pub enum DistributionOutcome {
    /// The controller does not manage a device with this hostname.
    NotManaged,
    /// Distribution completed successfully.
    Completed,
    /// Distribution failed; diagnostics live at the controller detail endpoint.
    Failed { status: String, detail_url: String },
}

/// Controller endpoint with per-task failure diagnostics.
pub fn task_detail_url(base_url: &str, task_id: &str) -> String {
    format!(
        "{}/dna/intent/api/v1/tasks/{task_id}/detail",
        base_url.trim_end_matches('/')
    )
}

/// Distributes the golden image to the device with `hostname`.
pub async fn distribute_image<C>(
    api: &C,
    base_url: &str,
    hostname: &str,
    policy: &PollPolicy,
) -> Result<DistributionOutcome>
where
    C: ControllerApi + ?Sized,
{
    let device = match api
        .device_by_hostname(hostname)
        .await
        .map_err(|e| anyhow::anyhow!(e))
        .context("device-by-hostname query")?
    {
        Some(device) => device,
        None => {
            info!(hostname, "[DISTRIBUTE] Controller does not manage the device");
            return Ok(DistributionOutcome::NotManaged);
        }
    };
    info!(hostname, device_id = %device.id, "[DISTRIBUTE] Resolved device");

    let task_id = api
        .distribute_image(&device.id)
        .await
        .map_err(|e| anyhow::anyhow!(e))
        .context("image-distribution trigger")?;
    info!(task_id = %task_id, "[DISTRIBUTE] Image distribution task created");

    let outcome = wait_for_task(api, &task_id, policy)
        .await
        .map_err(|e| anyhow::anyhow!(e))
        .context("image-distribution task poll")?;
    match outcome.status {
        TaskStatus::Success => {
            info!(hostname, "[DISTRIBUTE] Image distribution completed");
            Ok(DistributionOutcome::Completed)
        }
        TaskStatus::Failure(status) => {
            let detail_url = task_detail_url(base_url, &task_id);
            info!(hostname, status = %status, detail_url = %detail_url, "[DISTRIBUTE] Image distribution failed");
            Ok(DistributionOutcome::Failed { status, detail_url })
        }
    }
}
