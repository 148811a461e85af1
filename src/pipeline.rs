//! Triggering CI pipelines that execute the automation workflows.

use async_trait::async_trait;
use tracing::info;

use crate::assistant::Workflow;
use crate::config::JenkinsSettings;

/// Boxed error type shared by pipeline calls.
pub type PipelineError = Box<dyn std::error::Error + Send + Sync>;

/// What the CI server said about the build request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// The server accepted the build (HTTP 201).
    Started { status_url: String },
    /// Anything else; the build did not queue.
    NotStarted { status: u16 },
}

/// Starts a parameterized pipeline build for a workflow.
#[cfg_attr(any(test, feature = "test-export-mocks"), mockall::automock)]
#[async_trait]
pub trait PipelineTrigger: Send + Sync {
    async fn trigger(
        &self,
        workflow: Workflow,
        params: &[(String, String)],
    ) -> Result<TriggerOutcome, PipelineError>;
}

/// [`PipelineTrigger`] over the Jenkins remote-build API, using Basic auth
/// with an API token. Success is signaled by HTTP 201.
pub struct JenkinsClient {
    http: reqwest::Client,
    base_url: String,
    username: String,
    token: String,
}

impl JenkinsClient {
    pub fn new(settings: &JenkinsSettings) -> Result<Self, PipelineError> {
        Ok(Self {
            // Lab CI servers run with self-signed certificates.
            http: reqwest::Client::builder()
                .danger_accept_invalid_certs(true)
                .build()?,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            username: settings.username.clone(),
            token: settings.token.clone(),
        })
    }

    fn job_url(&self, workflow: Workflow) -> String {
        format!("{}/job/{}/", self.base_url, workflow.job_path())
    }
}

#[async_trait]
impl PipelineTrigger for JenkinsClient {
    async fn trigger(
        &self,
        workflow: Workflow,
        params: &[(String, String)],
    ) -> Result<TriggerOutcome, PipelineError> {
        let url = format!("{}buildWithParameters", self.job_url(workflow));
        let response = self
            .http
            .post(&url)
            .basic_auth(&self.username, Some(&self.token))
            .query(params)
            .send()
            .await?;
        let status = response.status().as_u16();
        if status == 201 {
            let status_url = self.job_url(workflow);
            info!(workflow = workflow.name(), status_url = %status_url, "[PIPELINE] Build queued");
            Ok(TriggerOutcome::Started { status_url })
        } else {
            info!(workflow = workflow.name(), status, "[PIPELINE] Build not queued");
            Ok(TriggerOutcome::NotStarted { status })
        }
    }
}
