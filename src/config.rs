//! Settings for every external surface the commands talk to.
//!
//! All values come from the process environment, with `dotenvy` pulling in a
//! local `environment.env` file first. Each surface gets its own struct with a
//! `from_env` constructor so a command only requires the variables it actually
//! uses, and tests can build settings directly without touching the
//! environment.

use anyhow::{Context, Result};
use tracing::info;

use crate::controller::OnboardRequest;

/// Name of the local environment file loaded at startup.
pub const ENV_FILE: &str = "environment.env";

/// Loads `environment.env` (and a plain `.env` as fallback) into the process
/// environment. Missing files are not an error; variables may already be set.
pub fn load_env_file() {
    let _ = dotenvy::from_filename(ENV_FILE);
    let _ = dotenvy::dotenv();
}

fn require(name: &str) -> Result<String> {
    std::env::var(name).with_context(|| format!("{name} environment variable not set"))
}

fn optional(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

/// Connection details for the network controller REST API.
#[derive(Debug, Clone)]
pub struct ControllerSettings {
    pub base_url: String,
    pub username: String,
    pub password: String,
}

impl ControllerSettings {
    pub fn from_env() -> Result<Self> {
        let settings = Self {
            base_url: require("CC_URL")?,
            username: require("CC_USER")?,
            password: require("CC_PASS")?,
        };
        info!(base_url = %settings.base_url, "Loaded controller settings");
        Ok(settings)
    }
}

/// Target repository for the published inventory files.
#[derive(Debug, Clone)]
pub struct GitHubSettings {
    pub owner: String,
    pub repository: String,
    pub branch: String,
    pub token: String,
}

impl GitHubSettings {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            owner: require("GITHUB_OWNER")?,
            repository: require("GITHUB_REPO")?,
            branch: optional("GITHUB_BRANCH", "main"),
            token: require("GITHUB_TOKEN")?,
        })
    }
}

/// CI server used by the assistant to trigger workflow pipelines.
#[derive(Debug, Clone)]
pub struct JenkinsSettings {
    pub base_url: String,
    pub username: String,
    pub token: String,
}

impl JenkinsSettings {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            base_url: require("JENKINS_SERVER")?,
            username: require("JENKINS_USER")?,
            token: require("JENKINS_TOKEN")?,
        })
    }
}

/// Language-model API access for the assistant.
#[derive(Debug, Clone)]
pub struct OpenAiSettings {
    pub api_key: String,
    pub model: String,
}

impl OpenAiSettings {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            api_key: require("OPENAI_API_KEY")?,
            model: optional("OPENAI_MODEL", "gpt-4o"),
        })
    }
}

/// Vector-search server used for the assistant's retrieval fallback.
#[derive(Debug, Clone)]
pub struct RetrievalSettings {
    pub base_url: String,
    pub collection: String,
}

impl RetrievalSettings {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            base_url: require("DB_SERVER")?,
            collection: require("DB_COLLECTION")?,
        })
    }
}

/// Credentials the controller uses to reach a device being onboarded.
///
/// These come from the environment rather than a hard-coded payload, so the
/// add-device command only takes the management IP address on the CLI.
#[derive(Debug, Clone)]
pub struct OnboardProfile {
    pub cli_username: String,
    pub cli_password: String,
    pub enable_password: String,
    pub snmp_ro_community: String,
    pub snmp_rw_community: String,
    pub http_username: String,
    pub http_password: String,
}

impl OnboardProfile {
    pub fn from_env() -> Result<Self> {
        let cli_password = require("DEVICE_CLI_PASS")?;
        Ok(Self {
            cli_username: require("DEVICE_CLI_USER")?,
            enable_password: optional("DEVICE_ENABLE_PASS", &cli_password),
            cli_password,
            snmp_ro_community: require("SNMP_RO_COMMUNITY")?,
            snmp_rw_community: require("SNMP_RW_COMMUNITY")?,
            http_username: optional("DEVICE_HTTP_USER", ""),
            http_password: optional("DEVICE_HTTP_PASS", ""),
        })
    }

    /// Builds the add-device request payload for one management IP address.
    pub fn request_for(&self, ip_address: &str) -> OnboardRequest {
        OnboardRequest {
            cli_transport: "ssh".to_string(),
            compute_device: false,
            enable_password: self.enable_password.clone(),
            http_password: self.http_password.clone(),
            http_port: "443".to_string(),
            http_secure: false,
            http_user_name: self.http_username.clone(),
            ip_address: vec![ip_address.to_string()],
            netconf_port: "830".to_string(),
            password: self.cli_password.clone(),
            snmp_ro_community: self.snmp_ro_community.clone(),
            snmp_rw_community: self.snmp_rw_community.clone(),
            snmp_retry: 3,
            snmp_timeout: 5,
            snmp_version: "v2".to_string(),
            device_type: "NETWORK_DEVICE".to_string(),
            user_name: self.cli_username.clone(),
        }
    }
}
