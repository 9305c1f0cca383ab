//! HTTP client for the fleet API

use reqwest::{header, Client, Method, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use super::endpoints::{paths, Endpoints};
use super::envelope::{resolve_error_message, ApiEnvelope, ApiStatus};
use super::models::{
    CodeServerInstance, CreateCredential, CreateDockerScript, CreateInstance, Credential,
    DockerScript, TemplateScripts, UpdateDockerScript,
};
use crate::config::ApiConfig;

/// API call failure
#[derive(Debug, Error)]
pub enum ApiError {
    /// Non-2xx HTTP status
    #[error("{message}")]
    Http {
        /// HTTP status code
        status: u16,
        /// Resolved error message
        message: String,
    },

    /// 2xx status, but the envelope says the request failed
    #[error("{message}")]
    Rejected {
        /// HTTP status code
        status: u16,
        /// Resolved error message
        message: String,
    },

    /// Connection or protocol failure
    #[error("request failed: {0}")]
    Transport(String),

    /// No response within the request timeout
    #[error("request timed out")]
    Timeout,

    /// Response body did not have the expected shape
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl ApiError {
    /// HTTP status, if a response was received
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } | Self::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else {
            Self::Transport(e.to_string())
        }
    }
}

/// Result alias for API calls
pub type ApiResult<T> = Result<T, ApiError>;

/// JSON client for the fleet API
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    endpoints: Endpoints,
}

impl ApiClient {
    /// Client over an existing `reqwest` client
    #[must_use]
    pub fn new(client: Client, endpoints: Endpoints) -> Self {
        Self { client, endpoints }
    }

    /// Client with the configured base URL and timeouts
    pub fn from_config(config: &ApiConfig) -> ApiResult<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self::new(client, Endpoints::new(&config.base_url)))
    }

    /// Endpoints this client talks to
    #[must_use]
    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    // ========================================================================
    // Generic verbs
    // ========================================================================

    /// GET `path`
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> ApiResult<ApiEnvelope<T>> {
        self.request(Method::GET, path, None::<&()>).await
    }

    /// POST `body` to `path`
    pub async fn post<B, T>(&self, path: &str, body: &B) -> ApiResult<ApiEnvelope<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request(Method::POST, path, Some(body)).await
    }

    /// PUT `body` to `path`
    pub async fn put<B, T>(&self, path: &str, body: &B) -> ApiResult<ApiEnvelope<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.request(Method::PUT, path, Some(body)).await
    }

    /// DELETE `path`
    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> ApiResult<ApiEnvelope<T>> {
        self.request(Method::DELETE, path, None::<&()>).await
    }

    async fn request<B, T>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> ApiResult<ApiEnvelope<T>>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.endpoints.url(path);
        debug!(%method, %url, "api request");

        let mut request = self
            .client
            .request(method.clone(), &url)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            warn!(%method, %url, error = %e, "api request failed");
            ApiError::from(e)
        })?;

        Self::handle_response(response).await
    }

    async fn handle_response<T: DeserializeOwned>(response: Response) -> ApiResult<ApiEnvelope<T>> {
        let status = response.status();
        let text = response.text().await?;
        let body: Option<Value> = serde_json::from_str(&text).ok();

        if !status.is_success() {
            let message = resolve_error_message(status.as_u16(), body.as_ref());
            warn!(status = status.as_u16(), %message, "api error response");
            return Err(ApiError::Http {
                status: status.as_u16(),
                message,
            });
        }

        let body = body.ok_or_else(|| ApiError::Decode("response is not JSON".to_string()))?;
        let flagged_error = body.get("detail").is_some_and(|d| !d.is_null())
            || body.get("status").and_then(Value::as_str) == Some("error");
        if flagged_error {
            let message = resolve_error_message(status.as_u16(), Some(&body));
            warn!(status = status.as_u16(), %message, "api request rejected");
            return Err(ApiError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let envelope: ApiEnvelope<T> =
            serde_json::from_value(body).map_err(|e| ApiError::Decode(e.to_string()))?;
        if envelope.status != ApiStatus::Success {
            return Err(ApiError::Rejected {
                status: status.as_u16(),
                message: envelope
                    .message
                    .unwrap_or_else(|| format!("HTTP error! Status: {}", status.as_u16())),
            });
        }
        Ok(envelope)
    }

    // ========================================================================
    // Typed helpers
    // ========================================================================

    /// Health check; returns the server's message
    pub async fn health(&self) -> ApiResult<Option<String>> {
        let envelope: ApiEnvelope = self.get(paths::HEALTH).await?;
        Ok(envelope.message)
    }

    /// All code-server instances
    pub async fn list_instances(&self) -> ApiResult<Vec<CodeServerInstance>> {
        list(self.get(paths::CODE_SERVER).await?)
    }

    /// Launch a new code-server instance
    pub async fn create_instance(&self, body: &CreateInstance) -> ApiResult<CodeServerInstance> {
        required(self.post(paths::CODE_SERVER, body).await?)
    }

    /// All stored credentials
    pub async fn list_credentials(&self) -> ApiResult<Vec<Credential>> {
        list(self.get(paths::CREDENTIALS).await?)
    }

    /// Create a credential, or replace the one of the same type
    pub async fn save_credential(&self, body: &CreateCredential) -> ApiResult<Credential> {
        required(self.post(paths::CREDENTIALS, body).await?)
    }

    /// Delete a credential
    pub async fn delete_credential(&self, id: &str) -> ApiResult<()> {
        let _: ApiEnvelope = self.delete(&paths::item(paths::CREDENTIALS, id)).await?;
        Ok(())
    }

    /// All Docker scripts
    pub async fn list_scripts(&self) -> ApiResult<Vec<DockerScript>> {
        list(self.get(paths::DOCKER_SCRIPTS).await?)
    }

    /// One Docker script
    pub async fn get_script(&self, id: &str) -> ApiResult<DockerScript> {
        required(self.get(&paths::item(paths::DOCKER_SCRIPTS, id)).await?)
    }

    /// Create a Docker script
    pub async fn create_script(&self, body: &CreateDockerScript) -> ApiResult<DockerScript> {
        required(self.post(paths::DOCKER_SCRIPTS, body).await?)
    }

    /// Update a Docker script
    pub async fn update_script(&self, id: &str, body: &UpdateDockerScript) -> ApiResult<DockerScript> {
        required(self.put(&paths::item(paths::DOCKER_SCRIPTS, id), body).await?)
    }

    /// Delete a Docker script
    pub async fn delete_script(&self, id: &str) -> ApiResult<()> {
        let _: ApiEnvelope = self.delete(&paths::item(paths::DOCKER_SCRIPTS, id)).await?;
        Ok(())
    }

    /// Images built from Docker scripts (shape decided by the server)
    pub async fn list_images(&self) -> ApiResult<Vec<Value>> {
        list(self.get(paths::DOCKER_IMAGES).await?)
    }

    /// All template scripts
    pub async fn list_templates(&self) -> ApiResult<Vec<TemplateScripts>> {
        list(self.get(paths::TEMPLATE_SCRIPTS).await?)
    }
}

/// Collection payload; a missing `data` means an empty collection
fn list<T>(envelope: ApiEnvelope<Vec<T>>) -> ApiResult<Vec<T>> {
    Ok(envelope.data.unwrap_or_default())
}

fn required<T>(envelope: ApiEnvelope<T>) -> ApiResult<T> {
    envelope
        .data
        .ok_or_else(|| ApiError::Decode("response has no data".to_string()))
}
