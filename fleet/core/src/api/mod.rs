//! Fleet API Client
//!
//! JSON CRUD over the fleet management API: code-server instances,
//! credentials, Docker scripts and template scripts. Responses are wrapped in
//! an [`ApiEnvelope`]; a call succeeds only when the HTTP status is 2xx **and**
//! the envelope says `success`.
//!
//! The streamed build log endpoint is not handled here; see
//! [`crate::stream::StreamConsumer::follow_build`].

mod client;
mod endpoints;
mod envelope;
mod models;

pub use client::{ApiClient, ApiError, ApiResult};
pub use endpoints::{paths, Endpoints};
pub use envelope::{resolve_error_message, ApiEnvelope, ApiStatus};
pub use models::{
    ActivityLog, Build, BuildStatus, CodeServerInstance, CreateCredential, CreateDockerScript,
    CreateInstance, Credential, CredentialType, DockerScript, InstanceAction, InstanceStatus,
    TemplateScripts, TemplateType, UpdateDockerScript,
};
