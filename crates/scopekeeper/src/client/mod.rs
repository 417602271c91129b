//! The remote configuration service, as seen by the controllers.
//!
//! [`ConfigurationService`] is the only seam to the outside world. Callers
//! inject an implementation as `Arc<dyn ConfigurationService>`; the crate
//! ships [`InMemoryService`] for tests and dry runs.

pub mod memory;

pub use memory::InMemoryService;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::convert::ConfigurationOptions;
use crate::schema::ResourceKind;

/// Errors reported by the remote service.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The service refused the request, e.g. a server-side validation failure.
    #[error("Request rejected: {0}")]
    Rejected(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Deadline exceeded")]
    DeadlineExceeded,
}

impl ClientError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ClientError::NotFound(_))
    }
}

/// Result type for remote calls.
pub type Result<T> = std::result::Result<T, ClientError>;

/// The remote's kind of integration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrationKind {
    Aws,
    Azure,
    Gcp,
    Ms365,
    SentinelOne,
    CrowdStrike,
}

impl IntegrationKind {
    pub fn all() -> &'static [IntegrationKind] {
        &[
            IntegrationKind::Aws,
            IntegrationKind::Azure,
            IntegrationKind::Gcp,
            IntegrationKind::Ms365,
            IntegrationKind::SentinelOne,
            IntegrationKind::CrowdStrike,
        ]
    }

    pub fn from_resource(kind: ResourceKind) -> Option<Self> {
        match kind {
            ResourceKind::AwsServerless => Some(IntegrationKind::Aws),
            ResourceKind::Azure => Some(IntegrationKind::Azure),
            ResourceKind::Gcp => Some(IntegrationKind::Gcp),
            ResourceKind::Ms365 => Some(IntegrationKind::Ms365),
            ResourceKind::SentinelOne => Some(IntegrationKind::SentinelOne),
            ResourceKind::CrowdStrike => Some(IntegrationKind::CrowdStrike),
            ResourceKind::Space | ResourceKind::CustomFramework | ResourceKind::Policy => None,
        }
    }

    pub fn resource_kind(&self) -> ResourceKind {
        match self {
            IntegrationKind::Aws => ResourceKind::AwsServerless,
            IntegrationKind::Azure => ResourceKind::Azure,
            IntegrationKind::Gcp => ResourceKind::Gcp,
            IntegrationKind::Ms365 => ResourceKind::Ms365,
            IntegrationKind::SentinelOne => ResourceKind::SentinelOne,
            IntegrationKind::CrowdStrike => ResourceKind::CrowdStrike,
        }
    }

    /// Action fired once after a successful create, if any.
    pub fn post_create_action(&self) -> Option<ActionKind> {
        match self {
            IntegrationKind::Aws => None,
            IntegrationKind::Azure | IntegrationKind::Gcp | IntegrationKind::Ms365 => {
                Some(ActionKind::RunScan)
            }
            IntegrationKind::SentinelOne | IntegrationKind::CrowdStrike => {
                Some(ActionKind::RunImport)
            }
        }
    }
}

impl fmt::Display for IntegrationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IntegrationKind::Aws => "aws",
            IntegrationKind::Azure => "azure",
            IntegrationKind::Gcp => "gcp",
            IntegrationKind::Ms365 => "ms365",
            IntegrationKind::SentinelOne => "sentinel_one",
            IntegrationKind::CrowdStrike => "crowdstrike",
        };
        f.write_str(name)
    }
}

/// Follow-up actions on an integration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionKind {
    RunScan,
    RunImport,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionKind::RunScan => write!(f, "RUN_SCAN"),
            ActionKind::RunImport => write!(f, "RUN_IMPORT"),
        }
    }
}

/// A resolved namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    pub id: String,
    pub mrn: String,
}

/// The service's view of an integration. Never carries credentials.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteObject {
    pub mrn: String,
    pub name: String,
    pub kind: IntegrationKind,
    pub options: ConfigurationOptions,
    /// Registration token; only present in the create response.
    pub token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpaceObject {
    pub id: String,
    pub mrn: String,
    pub name: String,
    pub org_mrn: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameworkObject {
    pub mrn: String,
    pub uid: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicySummary {
    pub mrn: String,
    pub name: String,
    pub assigned: bool,
    pub action: Option<String>,
    pub version: String,
    pub is_public: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Which catalog entries a policy listing returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CatalogType {
    #[default]
    All,
    Policy,
    QueryPack,
}

impl FromStr for CatalogType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "ALL" => Ok(CatalogType::All),
            "POLICY" => Ok(CatalogType::Policy),
            "QUERYPACK" => Ok(CatalogType::QueryPack),
            other => Err(format!("Unknown catalog type: {}", other)),
        }
    }
}

impl fmt::Display for CatalogType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogType::All => write!(f, "ALL"),
            CatalogType::Policy => write!(f, "POLICY"),
            CatalogType::QueryPack => write!(f, "QUERYPACK"),
        }
    }
}

/// Operations the controllers need from the remote service.
///
/// Every call is a single request/response. Implementations must not retry;
/// a missing object is reported as [`ClientError::NotFound`].
#[async_trait]
pub trait ConfigurationService: Send + Sync {
    /// Resolves a space id (or the caller's default space when `None`).
    async fn compute_scope(&self, space_id: Option<&str>) -> Result<Scope>;

    async fn create_integration(
        &self,
        scope_mrn: &str,
        name: &str,
        kind: IntegrationKind,
        options: &ConfigurationOptions,
    ) -> Result<RemoteObject>;

    /// Replaces the full configuration of an existing integration.
    async fn update_integration(
        &self,
        mrn: &str,
        name: &str,
        kind: IntegrationKind,
        options: &ConfigurationOptions,
    ) -> Result<RemoteObject>;

    async fn get_integration(&self, mrn: &str) -> Result<RemoteObject>;

    async fn delete_integration(&self, mrn: &str) -> Result<()>;

    async fn trigger_action(&self, mrn: &str, action: ActionKind) -> Result<()>;

    async fn create_space(&self, org_mrn: &str, name: &str) -> Result<SpaceObject>;

    async fn get_space(&self, mrn: &str) -> Result<SpaceObject>;

    async fn update_space(&self, mrn: &str, name: &str) -> Result<SpaceObject>;

    async fn delete_space(&self, mrn: &str) -> Result<()>;

    /// Uploads framework content verbatim into a space.
    async fn upload_framework(&self, space_mrn: &str, content: &[u8]) -> Result<()>;

    async fn get_framework(&self, space_mrn: &str, uid: &str) -> Result<FrameworkObject>;

    async fn delete_framework(&self, mrn: &str) -> Result<()>;

    async fn list_policies(
        &self,
        scope_mrn: &str,
        catalog_type: CatalogType,
        assigned_only: bool,
    ) -> Result<Vec<PolicySummary>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_create_actions() {
        assert_eq!(IntegrationKind::Aws.post_create_action(), None);
        assert_eq!(
            IntegrationKind::Gcp.post_create_action(),
            Some(ActionKind::RunScan)
        );
        assert_eq!(
            IntegrationKind::CrowdStrike.post_create_action(),
            Some(ActionKind::RunImport)
        );
    }

    #[test]
    fn test_kind_mapping_is_bijective() {
        for kind in IntegrationKind::all() {
            assert_eq!(IntegrationKind::from_resource(kind.resource_kind()), Some(*kind));
        }
        assert_eq!(IntegrationKind::from_resource(ResourceKind::Space), None);
    }

    #[test]
    fn test_catalog_type_parsing() {
        assert_eq!("QUERYPACK".parse::<CatalogType>(), Ok(CatalogType::QueryPack));
        assert!("querypack".parse::<CatalogType>().is_err());
        assert_eq!(CatalogType::default().to_string(), "ALL");
    }

    #[test]
    fn test_not_found_helper() {
        assert!(ClientError::NotFound("x".into()).is_not_found());
        assert!(!ClientError::DeadlineExceeded.is_not_found());
    }
}
