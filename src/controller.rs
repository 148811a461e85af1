//! REST client for the network controller.
//!
//! The [`ControllerApi`] trait is the seam every operation works against: the
//! real [`RestController`] talks HTTP, while tests use the generated
//! `MockControllerApi`. All list/detail endpoints on the controller wrap their
//! payload in a `{"response": ...}` envelope, which the client unwraps before
//! handing data to callers.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::ControllerSettings;

/// Boxed error type shared by all controller calls.
pub type ApiError = Box<dyn std::error::Error + Send + Sync>;

/// A device as reported by the controller's device-list endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedDevice {
    pub hostname: String,
    pub management_ip_address: String,
    pub id: String,
    pub software_version: String,
    /// Device family, e.g. "Switches and Hubs" or "Unified AP".
    pub family: String,
    /// Platform name, e.g. "Cisco Catalyst 9300 Switch".
    #[serde(rename = "type")]
    pub type_name: String,
    pub role: String,
}

/// One observation of an asynchronous controller task.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSnapshot {
    pub status: String,
    #[serde(default)]
    pub result_location: Option<String>,
}

/// Compliance categories the controller reports non-conformance for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComplianceCategory {
    Image,
    SecurityAdvisory,
}

impl ComplianceCategory {
    pub fn as_query(self) -> &'static str {
        match self {
            ComplianceCategory::Image => "IMAGE",
            ComplianceCategory::SecurityAdvisory => "PSIRT",
        }
    }
}

/// Payload for adding a device to the controller inventory.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardRequest {
    pub cli_transport: String,
    pub compute_device: bool,
    pub enable_password: String,
    pub http_password: String,
    pub http_port: String,
    pub http_secure: bool,
    pub http_user_name: String,
    pub ip_address: Vec<String>,
    pub netconf_port: String,
    pub password: String,
    #[serde(rename = "snmpROCommunity")]
    pub snmp_ro_community: String,
    #[serde(rename = "snmpRWCommunity")]
    pub snmp_rw_community: String,
    pub snmp_retry: u32,
    pub snmp_timeout: u32,
    pub snmp_version: String,
    #[serde(rename = "type")]
    pub device_type: String,
    pub user_name: String,
}

/// Everything the automation commands need from the controller.
#[cfg_attr(any(test, feature = "test-export-mocks"), mockall::automock)]
#[async_trait]
pub trait ControllerApi: Send + Sync {
    /// Total number of devices managed by the controller.
    async fn device_count(&self) -> Result<usize, ApiError>;

    /// One page of the managed-device list. Offsets are 1-based.
    async fn device_page(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<ManagedDevice>, ApiError>;

    /// Device managed under the given management IP address, if any.
    async fn device_by_ip(&self, ip_address: &str) -> Result<Option<ManagedDevice>, ApiError>;

    /// Device with the given hostname, if any.
    async fn device_by_hostname(
        &self,
        hostname: &str,
    ) -> Result<Option<ManagedDevice>, ApiError>;

    /// Site hierarchy the device is assigned to; empty string when unassigned.
    async fn device_location(&self, device_id: &str) -> Result<String, ApiError>;

    /// Identifier of the site with the given hierarchy name.
    async fn site_id(&self, site_name: &str) -> Result<String, ApiError>;

    /// Device ids reported non-compliant for the given category.
    async fn non_compliant(&self, category: ComplianceCategory) -> Result<Vec<String>, ApiError>;

    /// Submits an add-device request, returning the controller task id.
    async fn add_device(&self, request: &OnboardRequest) -> Result<String, ApiError>;

    /// Triggers golden-image distribution to a device, returning the task id.
    async fn distribute_image(&self, device_id: &str) -> Result<String, ApiError>;

    /// Current status of an asynchronous task.
    async fn task(&self, task_id: &str) -> Result<TaskSnapshot, ApiError>;
}

/// Controller response envelope: every intent API wraps its payload this way.
#[derive(Deserialize)]
struct Envelope<T> {
    response: T,
}

#[derive(Deserialize)]
struct DeviceDetail {
    #[serde(default)]
    location: Option<String>,
}

#[derive(Deserialize)]
struct SiteRecord {
    id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ComplianceEntry {
    device_uuid: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskReference {
    task_id: String,
}

#[derive(Deserialize)]
struct AuthResponse {
    #[serde(rename = "Token")]
    token: String,
}

/// HTTP implementation of [`ControllerApi`].
///
/// Authenticates once at construction and sends the token as `X-Auth-Token`
/// on every call. Certificate verification is disabled because lab
/// controllers run with self-signed certificates.
pub struct RestController {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl RestController {
    pub async fn connect(settings: &ControllerSettings) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(true)
            .build()?;
        let base_url = settings.base_url.trim_end_matches('/').to_string();
        let auth: AuthResponse = http
            .post(format!("{base_url}/dna/system/api/v1/auth/token"))
            .basic_auth(&settings.username, Some(&settings.password))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        info!(base_url = %base_url, "[CONTROLLER] Authenticated");
        Ok(Self {
            http,
            base_url,
            token: auth.token,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        debug!(path, "[CONTROLLER] GET");
        let response = self
            .http
            .get(format!("{}{path}", self.base_url))
            .header("X-Auth-Token", &self.token)
            .query(query)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        debug!(path, "[CONTROLLER] POST");
        let response = self
            .http
            .post(format!("{}{path}", self.base_url))
            .header("X-Auth-Token", &self.token)
            .json(body)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl ControllerApi for RestController {
    async fn device_count(&self) -> Result<usize, ApiError> {
        let envelope: Envelope<usize> = self
            .get_json("/dna/intent/api/v1/network-device/count", &[])
            .await?;
        Ok(envelope.response)
    }

    async fn device_page(
        &self,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<ManagedDevice>, ApiError> {
        let envelope: Envelope<Vec<ManagedDevice>> = self
            .get_json(
                "/dna/intent/api/v1/network-device",
                &[("offset", offset.to_string()), ("limit", limit.to_string())],
            )
            .await?;
        Ok(envelope.response)
    }

    async fn device_by_ip(&self, ip_address: &str) -> Result<Option<ManagedDevice>, ApiError> {
        let envelope: Envelope<Vec<ManagedDevice>> = self
            .get_json(
                "/dna/intent/api/v1/network-device",
                &[("managementIpAddress", ip_address.to_string())],
            )
            .await?;
        Ok(envelope.response.into_iter().next())
    }

    async fn device_by_hostname(
        &self,
        hostname: &str,
    ) -> Result<Option<ManagedDevice>, ApiError> {
        let envelope: Envelope<Vec<ManagedDevice>> = self
            .get_json(
                "/dna/intent/api/v1/network-device",
                &[("hostname", hostname.to_string())],
            )
            .await?;
        Ok(envelope.response.into_iter().next())
    }

    async fn device_location(&self, device_id: &str) -> Result<String, ApiError> {
        let envelope: Envelope<DeviceDetail> = self
            .get_json(
                "/dna/intent/api/v1/device-detail",
                &[
                    ("identifier", "uuid".to_string()),
                    ("searchBy", device_id.to_string()),
                ],
            )
            .await?;
        // Unassigned devices report no location; callers get an empty string.
        Ok(envelope.response.location.unwrap_or_default())
    }

    async fn site_id(&self, site_name: &str) -> Result<String, ApiError> {
        let envelope: Envelope<Vec<SiteRecord>> = self
            .get_json(
                "/dna/intent/api/v1/site",
                &[("name", site_name.to_string())],
            )
            .await?;
        let site = envelope
            .response
            .into_iter()
            .next()
            .ok_or_else(|| format!("controller returned no site named {site_name}"))?;
        Ok(site.id)
    }

    async fn non_compliant(&self, category: ComplianceCategory) -> Result<Vec<String>, ApiError> {
        let envelope: Envelope<Vec<ComplianceEntry>> = self
            .get_json(
                "/dna/intent/api/v1/compliance/detail",
                &[
                    ("complianceType", category.as_query().to_string()),
                    ("complianceStatus", "NON_COMPLIANT".to_string()),
                ],
            )
            .await?;
        Ok(envelope
            .response
            .into_iter()
            .map(|entry| entry.device_uuid)
            .collect())
    }

    async fn add_device(&self, request: &OnboardRequest) -> Result<String, ApiError> {
        let envelope: Envelope<TaskReference> = self
            .post_json("/dna/intent/api/v1/network-device", request)
            .await?;
        Ok(envelope.response.task_id)
    }

    async fn distribute_image(&self, device_id: &str) -> Result<String, ApiError> {
        let body = [serde_json::json!({ "deviceUuid": device_id })];
        let envelope: Envelope<TaskReference> = self
            .post_json("/dna/intent/api/v1/image/distribution", &body)
            .await?;
        Ok(envelope.response.task_id)
    }

    async fn task(&self, task_id: &str) -> Result<TaskSnapshot, ApiError> {
        let envelope: Envelope<TaskSnapshot> = self
            .get_json(&format!("/dna/intent/api/v1/tasks/{task_id}"), &[])
            .await?;
        Ok(envelope.response)
    }
}
