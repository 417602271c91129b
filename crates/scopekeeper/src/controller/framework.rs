//! Custom compliance frameworks uploaded from a data URL.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, field, info, info_span, Instrument, Span};

use super::{call, deadline_or_default, required_str, Applied, Deadline, ReadOutcome};
use crate::client::{ClientError, ConfigurationService, FrameworkObject};
use crate::config::EngineConfig;
use crate::error::{ContentError, ReconcileError, Result};
use crate::mrn::{IdentifierError, ImportId, MrnScheme, ScopeKind};
use crate::schema::{Phase, ResourceKind};
use crate::state::{AttributePath, DesiredState, Value};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// The parts of a framework YAML document the engine reads.
#[derive(Debug, Clone, Deserialize)]
pub struct FrameworkDocument {
    #[serde(default)]
    pub frameworks: Vec<FrameworkEntry>,
}

/// One framework declared in a document.
#[derive(Debug, Clone, Deserialize)]
pub struct FrameworkEntry {
    pub uid: String,
    #[serde(default)]
    pub name: String,
}

impl FrameworkDocument {
    /// Parses framework YAML, requiring at least one framework with a uid.
    pub fn parse(content: &[u8]) -> std::result::Result<Self, ContentError> {
        let document: FrameworkDocument =
            serde_yaml::from_slice(content).map_err(|e| ContentError::Parse(e.to_string()))?;
        if document.frameworks.is_empty() {
            return Err(ContentError::NoFramework);
        }
        if document.frameworks.iter().any(|f| f.uid.trim().is_empty()) {
            return Err(ContentError::Parse("framework uid must not be empty".to_string()));
        }
        Ok(document)
    }

    /// UID of the first declared framework.
    pub fn primary_uid(&self) -> Option<&str> {
        self.frameworks.first().map(|f| f.uid.as_str())
    }
}

fn is_http(data_url: &str) -> bool {
    data_url.starts_with("http://") || data_url.starts_with("https://")
}

/// Lifecycle of custom frameworks. The framework itself is whatever the
/// content at `data_url` declares; only its MRN is tracked.
pub struct FrameworkController {
    service: Arc<dyn ConfigurationService>,
    config: Arc<EngineConfig>,
    scheme: MrnScheme,
    http: Client,
}

impl FrameworkController {
    /// Creates a controller with its own HTTP client for fetching content.
    pub fn new(service: Arc<dyn ConfigurationService>, config: Arc<EngineConfig>) -> Result<Self> {
        let http = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|e| ContentError::HttpClient(e.to_string()))?;
        let scheme = config.scheme();
        Ok(Self {
            service,
            config,
            scheme,
            http,
        })
    }

    /// Reads framework content from an http(s) URL or a local path.
    pub async fn load_content(&self, data_url: &str) -> std::result::Result<Vec<u8>, ContentError> {
        if is_http(data_url) {
            let fetch_error = |message: String| ContentError::Fetch {
                url: data_url.to_string(),
                message,
            };
            let response = self
                .http
                .get(data_url)
                .send()
                .await
                .map_err(|e| fetch_error(e.to_string()))?
                .error_for_status()
                .map_err(|e| fetch_error(e.to_string()))?;
            let bytes = response.bytes().await.map_err(|e| fetch_error(e.to_string()))?;
            log::debug!("Fetched {} bytes from {}", bytes.len(), data_url);
            Ok(bytes.to_vec())
        } else {
            let path = PathBuf::from(data_url.strip_prefix("file://").unwrap_or(data_url));
            tokio::fs::read(&path)
                .await
                .map_err(|e| ContentError::ReadFile { path, source: e })
        }
    }

    async fn load_document(
        &self,
        data_url: &str,
        deadline: Deadline,
    ) -> Result<(Vec<u8>, String)> {
        let content = match tokio::time::timeout_at(deadline, self.load_content(data_url)).await {
            Ok(content) => content?,
            Err(_) => {
                return Err(ReconcileError::client(
                    "load_content",
                    ClientError::DeadlineExceeded,
                ))
            }
        };
        let document = FrameworkDocument::parse(&content)?;
        let uid = document
            .primary_uid()
            .ok_or(ContentError::NoFramework)?
            .to_string();
        Ok((content, uid))
    }

    fn to_state(
        &self,
        framework: &FrameworkObject,
        space_id: &str,
        data_url: Value,
    ) -> DesiredState {
        let mut state = DesiredState::new()
            .with("space_id", space_id)
            .with("mrn", framework.mrn.as_str());
        state.set(&AttributePath::root("data_url"), data_url);
        state
    }

    /// Uploads the content at `data_url` into the space and records the
    /// resulting framework MRN.
    pub async fn create(
        &self,
        desired: &DesiredState,
        deadline: Option<Deadline>,
    ) -> Result<Applied> {
        self.upload("create", desired, Phase::Create, deadline).await
    }

    /// Uploads the content again; the service replaces the framework in place.
    pub async fn update(
        &self,
        desired: &DesiredState,
        deadline: Option<Deadline>,
    ) -> Result<Applied> {
        self.upload("update", desired, Phase::Update, deadline).await
    }

    async fn upload(
        &self,
        operation: &'static str,
        desired: &DesiredState,
        phase: Phase,
        deadline: Option<Deadline>,
    ) -> Result<Applied> {
        let deadline = deadline_or_default(&self.config, deadline);
        let resolved = super::resolve_and_validate(ResourceKind::CustomFramework, desired, phase)?;
        let space_id = required_str(&resolved, "space_id")?;
        let data_url = required_str(&resolved, "data_url")?;
        let space_mrn = self.scheme.space(space_id);

        let span = match operation {
            "create" => info_span!("create",
                kind = %ResourceKind::CustomFramework,
                name = field::Empty,
                space_mrn = %space_mrn,
            ),
            _ => info_span!("update",
                kind = %ResourceKind::CustomFramework,
                name = field::Empty,
                space_mrn = %space_mrn,
            ),
        };
        async move {
            let (content, uid) = self.load_document(data_url, deadline).await?;
            Span::current().record("name", uid.as_str());

            call(
                "upload_framework",
                deadline,
                self.service.upload_framework(&space_mrn, &content),
            )
            .await?;
            let framework = call(
                "get_framework",
                deadline,
                self.service.get_framework(&space_mrn, &uid),
            )
            .await?;
            info!(mrn = %framework.mrn, "Uploaded framework");

            Ok(Applied {
                state: self.to_state(&framework, space_id, Value::string(data_url)),
                warnings: Vec::new(),
            })
        }
        .instrument(span)
        .await
    }

    /// Confirms the framework still exists. `data_url` is kept from `prior`
    /// since the service does not report where the content came from.
    pub async fn read(
        &self,
        prior: &DesiredState,
        deadline: Option<Deadline>,
    ) -> Result<ReadOutcome> {
        let deadline = deadline_or_default(&self.config, deadline);
        let mrn = required_str(prior, "mrn")?;
        let id = ImportId::parse(mrn)?;
        let space_mrn = self.scheme.scope(id.scope_kind(), id.scope_id());

        let span = info_span!("read",
            kind = %ResourceKind::CustomFramework,
            name = id.uid(),
            space_mrn = %space_mrn,
        );
        async move {
            let request = self.service.get_framework(&space_mrn, id.uid());
            match call("get_framework", deadline, request).await {
                Ok(framework) => Ok(ReadOutcome::Present(self.to_state(
                    &framework,
                    prior.get_str("space_id").unwrap_or(id.scope_id()),
                    prior.value(&AttributePath::root("data_url")).clone(),
                ))),
                Err(ReconcileError::Client { source, .. }) if source.is_not_found() => {
                    info!(%mrn, "Framework no longer exists, removing from state");
                    Ok(ReadOutcome::Removed)
                }
                Err(e) => Err(e),
            }
        }
        .instrument(span)
        .await
    }

    /// Deletes the framework. A framework that is already gone counts as deleted.
    pub async fn delete(&self, prior: &DesiredState, deadline: Option<Deadline>) -> Result<()> {
        let deadline = deadline_or_default(&self.config, deadline);
        let mrn = required_str(prior, "mrn")?;

        let span = info_span!("delete",
            kind = %ResourceKind::CustomFramework,
            name = field::Empty,
            space_mrn = field::Empty,
        );
        async move {
            match call("delete_framework", deadline, self.service.delete_framework(mrn)).await {
                Ok(()) => {
                    info!(%mrn, "Deleted framework");
                    Ok(())
                }
                Err(ReconcileError::Client { source, .. }) if source.is_not_found() => {
                    debug!(%mrn, "Framework already absent");
                    Ok(())
                }
                Err(e) => Err(e),
            }
        }
        .instrument(span)
        .await
    }

    /// Adopts an uploaded framework. `data_url` is not recoverable and
    /// stays `Null`.
    pub async fn import(
        &self,
        external_id: &str,
        deadline: Option<Deadline>,
    ) -> Result<DesiredState> {
        let deadline = deadline_or_default(&self.config, deadline);
        let id = ImportId::parse(external_id)?;
        id.expect_collection("frameworks")?;
        if id.scope_kind() != ScopeKind::Space {
            return Err(IdentifierError::WrongScope {
                id: id.to_string(),
                expected: ScopeKind::Space,
            }
            .into());
        }
        let space_mrn = self.scheme.space(id.scope_id());

        let span = info_span!("import",
            kind = %ResourceKind::CustomFramework,
            name = id.uid(),
            space_mrn = %space_mrn,
        );
        async move {
            let framework = call(
                "get_framework",
                deadline,
                self.service.get_framework(&space_mrn, id.uid()),
            )
            .await?;
            info!(mrn = %framework.mrn, "Imported framework");
            Ok(self.to_state(&framework, id.scope_id(), Value::Null))
        }
        .instrument(span)
        .await
    }
}
