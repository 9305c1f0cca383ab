//! Domain models exchanged with the fleet API
//!
//! Field names follow the API's camelCase JSON.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::feed::{EntryId, LogEntry, LogLevel};

// ============================================================================
// Instances
// ============================================================================

/// Lifecycle state of a code-server container
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstanceStatus {
    /// Being created
    Pending,
    /// Up and serving
    Running,
    /// Frozen
    Paused,
    /// Stopped, can be started again
    Stopped,
    /// Gone for good
    Terminated,
    /// Something went wrong
    Error,
}

impl InstanceStatus {
    /// Whether the instance is (or will shortly be) serving
    #[must_use]
    pub fn is_live(self) -> bool {
        matches!(self, Self::Pending | Self::Running)
    }
}

impl fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "PENDING",
            Self::Running => "RUNNING",
            Self::Paused => "PAUSED",
            Self::Stopped => "STOPPED",
            Self::Terminated => "TERMINATED",
            Self::Error => "ERROR",
        };
        f.write_str(s)
    }
}

/// Status change requested for an instance
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstanceAction {
    /// Start a stopped instance
    Start,
    /// Stop a running instance
    Stop,
    /// Freeze a running instance
    Pause,
    /// Resume a paused instance
    Unpause,
    /// Remove the instance
    Delete,
}

impl InstanceAction {
    /// Status the instance ends up in once the action succeeds
    #[must_use]
    pub fn target_status(self) -> InstanceStatus {
        match self {
            Self::Start | Self::Unpause => InstanceStatus::Running,
            Self::Stop => InstanceStatus::Stopped,
            Self::Pause => InstanceStatus::Paused,
            Self::Delete => InstanceStatus::Terminated,
        }
    }
}

/// A code-server container
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeServerInstance {
    /// Instance ID
    pub id: String,
    /// Container name
    pub name: String,
    /// Host port
    pub port: u16,
    /// Browser URL
    pub url: String,
    /// Current status
    pub status: InstanceStatus,
    /// Image the container runs
    #[serde(default)]
    pub image: Option<String>,
    /// Activity log, newest last
    #[serde(default)]
    pub activities: Vec<ActivityLog>,
    /// Creation time
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Last update
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Body for creating an instance
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateInstance {
    /// Container name
    pub name: String,
    /// Image to run
    pub image: String,
}

/// A recorded instance event
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLog {
    /// Event ID
    pub id: String,
    /// Owning instance
    pub code_server_id: String,
    /// Message text
    pub message: String,
    /// Severity
    pub level: LogLevel,
    /// When it happened
    pub created_at: DateTime<Utc>,
    /// Last update
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ActivityLog {
    /// Convert into a feed entry tagged with the owning instance
    #[must_use]
    pub fn to_log_entry(&self) -> LogEntry {
        LogEntry::new(self.level, self.message.clone())
            .with_id(EntryId(self.id.clone()))
            .with_timestamp(self.created_at)
            .with_source(self.code_server_id.clone())
    }
}

// ============================================================================
// Credentials
// ============================================================================

/// Kind of stored credential
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CredentialType {
    /// GitHub personal access token
    Github,
    /// GitLab token
    Gitlab,
    /// Jira API token
    Jira,
    /// Confluence API token
    Confluences,
    /// Docker Hub token
    Dockerhub,
    /// GitHub container registry token
    GithubContainer,
}

/// A stored credential
///
/// `Debug` never prints the token.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    /// Credential ID
    #[serde(default)]
    pub id: Option<String>,
    /// Kind
    #[serde(rename = "type")]
    pub credential_type: CredentialType,
    /// Display name
    pub name: String,
    /// Secret
    pub token: String,
    /// Service base URL (self-hosted instances)
    #[serde(default)]
    pub base_url: Option<String>,
    /// Account user name
    pub username: String,
    /// Account e-mail
    pub email: String,
    /// Creation time
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Last update
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("id", &self.id)
            .field("credential_type", &self.credential_type)
            .field("name", &self.name)
            .field("token", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Body for creating or replacing a credential
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCredential {
    /// Display name
    pub name: String,
    /// Kind
    #[serde(rename = "type")]
    pub credential_type: CredentialType,
    /// Secret
    pub token: String,
    /// Service base URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Account user name
    pub username: String,
    /// Account e-mail
    pub email: String,
}

impl fmt::Debug for CreateCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CreateCredential")
            .field("name", &self.name)
            .field("credential_type", &self.credential_type)
            .field("token", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("email", &self.email)
            .finish()
    }
}

// ============================================================================
// Docker scripts
// ============================================================================

/// State of an image build
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BuildStatus {
    /// Not started
    Draft,
    /// In progress
    Building,
    /// Image built
    Success,
    /// Build failed
    Failed,
}

/// One image build of a Docker script
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Build {
    /// Build ID
    pub id: String,
    /// Script that was built
    pub docker_script_id: String,
    /// Build state
    pub status: BuildStatus,
    /// Resulting image tag
    #[serde(default)]
    pub image_tag: Option<String>,
    /// Start time
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    /// End time
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    /// Creation time
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Last update
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// A Dockerfile kept by the console
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DockerScript {
    /// Script ID
    pub id: String,
    /// Dockerfile contents
    pub docker_file: String,
    /// Display name
    pub name: String,
    /// Description
    #[serde(default)]
    pub description: String,
    /// Image tag to build
    #[serde(default)]
    pub tag: Option<String>,
    /// Past builds
    #[serde(default)]
    pub builds: Vec<Build>,
    /// Creation time
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Last update
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl DockerScript {
    /// Most recently started build
    #[must_use]
    pub fn latest_build(&self) -> Option<&Build> {
        self.builds.iter().max_by_key(|b| b.started_at)
    }
}

/// Body for creating a Docker script
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDockerScript {
    /// Dockerfile contents
    pub docker_file: String,
    /// Display name
    pub name: String,
    /// Description
    pub description: String,
    /// Image tag to build
    pub tag: String,
}

/// Partial update of a Docker script; unset fields are left alone
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDockerScript {
    /// New Dockerfile contents
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docker_file: Option<String>,
    /// New name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// New tag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

// ============================================================================
// Templates
// ============================================================================

/// Project template family
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TemplateType {
    /// Next.js
    Nextjs,
    /// Next.js front end with a NestJS back end
    NextjsAndNestjs,
    /// FastAPI
    Fastapi,
}

/// Setup instructions for a project template
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateScripts {
    /// Template ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Shell instructions, in order
    pub instructions: Vec<String>,
    /// Template family
    #[serde(rename = "template_type", alias = "templateType")]
    pub template_type: TemplateType,
}
