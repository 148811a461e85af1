//! Add-device operation: precondition check, submit, poll.

use anyhow::{Context, Result};
use tracing::info;

use crate::config::OnboardProfile;
use crate::controller::ControllerApi;
use crate::task::{wait_for_task, PollPolicy, TaskOutcome};

/// Result of one add-device run.
#[derive(Debug)]
pub enum OnboardOutcome {
    /// The controller already manages a device at this IP; nothing submitted.
    AlreadyManaged,
    /// The add-device task reached a terminal status.
    Finished(TaskOutcome),
}

/// Adds the device at `ip_address` to the controller inventory.
///
/// The precondition query is the only idempotence check; a race between the
/// check and the submission is accepted.
pub async fn add_device<C>(
    api: &C,
    profile: &OnboardProfile,
    ip_address: &str,
    policy: &PollPolicy,
) -> Result<OnboardOutcome>
where
    C: ControllerApi + ?Sized,
{
    let existing = api
        .device_by_ip(ip_address)
        .await
        .map_err(|e| anyhow::anyhow!(e))
        .context("device-by-ip precondition query")?;
    if existing.is_some() {
        info!(ip_address, "[ONBOARD] Device is already managed by the controller");
        return Ok(OnboardOutcome::AlreadyManaged);
    }

    info!(ip_address, "[ONBOARD] Device not managed yet, submitting add request");
    let request = profile.request_for(ip_address);
    let task_id = api
        .add_device(&request)
        .await
        .map_err(|e| anyhow::anyhow!(e))
        .context("add-device submission")?;
    info!(task_id = %task_id, "[ONBOARD] Add-device task created");

    let outcome = wait_for_task(api, &task_id, policy)
        .await
        .map_err(|e| anyhow::anyhow!(e))
        .context("add-device task poll")?;
    info!(
        success = outcome.is_success(),
        result_location = outcome.result_location.as_deref().unwrap_or(""),
        "[ONBOARD] Add-device task completed"
    );
    Ok(OnboardOutcome::Finished(outcome))
}
