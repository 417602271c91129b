//! Space lifecycle.

use std::sync::Arc;

use tracing::{debug, info, info_span, Instrument};

use super::{call, deadline_or_default, required_str, Applied, Deadline, ReadOutcome};
use crate::client::{ConfigurationService, SpaceObject};
use crate::config::EngineConfig;
use crate::error::{ReconcileError, Result};
use crate::mrn::MrnScheme;
use crate::schema::{Phase, ResourceKind};
use crate::state::{AttributePath, DesiredState, Value};

/// Lifecycle of spaces inside an organization.
pub struct SpaceController {
    service: Arc<dyn ConfigurationService>,
    config: Arc<EngineConfig>,
    scheme: MrnScheme,
}

impl SpaceController {
    /// Creates a controller backed by `service`.
    pub fn new(service: Arc<dyn ConfigurationService>, config: Arc<EngineConfig>) -> Self {
        let scheme = config.scheme();
        Self {
            service,
            config,
            scheme,
        }
    }

    fn to_state(&self, space: &SpaceObject, prior_org_id: Option<&str>) -> DesiredState {
        let org_id = self
            .scheme
            .parse_scope(&space.org_mrn)
            .map(|(_, id)| id)
            .ok()
            .or_else(|| prior_org_id.map(str::to_string));

        let mut state = DesiredState::new()
            .with("id", space.id.as_str())
            .with("name", space.name.as_str());
        state.set(
            &AttributePath::root("org_id"),
            org_id.map(Value::String).unwrap_or(Value::Null),
        );
        state
    }

    /// Creates the space under the organization named by `org_id`.
    pub async fn create(
        &self,
        desired: &DesiredState,
        deadline: Option<Deadline>,
    ) -> Result<Applied> {
        let deadline = deadline_or_default(&self.config, deadline);
        let resolved = super::resolve_and_validate(ResourceKind::Space, desired, Phase::Create)?;
        let org_id = required_str(&resolved, "org_id")?;
        let org_mrn = self.scheme.organization(org_id);
        let name = resolved.get_str("name").unwrap_or_default();

        let span = info_span!("create",
            kind = %ResourceKind::Space,
            name,
            space_mrn = tracing::field::Empty,
        );
        async move {
            let space = call(
                "create_space",
                deadline,
                self.service.create_space(&org_mrn, name),
            )
            .await?;
            tracing::Span::current().record("space_mrn", space.mrn.as_str());
            info!(id = %space.id, "Created space");
            Ok(Applied {
                state: self.to_state(&space, Some(org_id)),
                warnings: Vec::new(),
            })
        }
        .instrument(span)
        .await
    }

    /// Refreshes name and organization. A missing space is reported as
    /// [`ReadOutcome::Removed`].
    pub async fn read(
        &self,
        prior: &DesiredState,
        deadline: Option<Deadline>,
    ) -> Result<ReadOutcome> {
        let deadline = deadline_or_default(&self.config, deadline);
        let mrn = self.scheme.space(required_str(prior, "id")?);

        let span = info_span!("read",
            kind = %ResourceKind::Space,
            name = prior.get_str("name").unwrap_or_default(),
            space_mrn = %mrn,
        );
        async move {
            match call("get_space", deadline, self.service.get_space(&mrn)).await {
                Ok(space) => Ok(ReadOutcome::Present(
                    self.to_state(&space, prior.get_str("org_id")),
                )),
                Err(ReconcileError::Client { source, .. }) if source.is_not_found() => {
                    info!("Space no longer exists, removing from state");
                    Ok(ReadOutcome::Removed)
                }
                Err(e) => Err(e),
            }
        }
        .instrument(span)
        .await
    }

    /// Renames the space. Moving a space between organizations is not supported.
    pub async fn update(
        &self,
        desired: &DesiredState,
        deadline: Option<Deadline>,
    ) -> Result<Applied> {
        let deadline = deadline_or_default(&self.config, deadline);
        let resolved = super::resolve_and_validate(ResourceKind::Space, desired, Phase::Update)?;
        let mrn = self.scheme.space(required_str(&resolved, "id")?);
        let name = resolved.get_str("name").unwrap_or_default();
        let org_id = resolved.get_str("org_id");

        let span = info_span!("update", kind = %ResourceKind::Space, name, space_mrn = %mrn);
        async move {
            let space =
                call("update_space", deadline, self.service.update_space(&mrn, name)).await?;
            info!("Updated space");
            Ok(Applied {
                state: self.to_state(&space, org_id),
                warnings: Vec::new(),
            })
        }
        .instrument(span)
        .await
    }

    /// Deletes the space. A space that is already gone counts as deleted.
    pub async fn delete(&self, prior: &DesiredState, deadline: Option<Deadline>) -> Result<()> {
        let deadline = deadline_or_default(&self.config, deadline);
        let mrn = self.scheme.space(required_str(prior, "id")?);

        let span = info_span!("delete",
            kind = %ResourceKind::Space,
            name = prior.get_str("name").unwrap_or_default(),
            space_mrn = %mrn,
        );
        async move {
            match call("delete_space", deadline, self.service.delete_space(&mrn)).await {
                Ok(()) => {
                    info!("Deleted space");
                    Ok(())
                }
                Err(ReconcileError::Client { source, .. }) if source.is_not_found() => {
                    debug!("Space already absent");
                    Ok(())
                }
                Err(e) => Err(e),
            }
        }
        .instrument(span)
        .await
    }

    /// Imports a space by its bare id.
    pub async fn import(&self, id: &str, deadline: Option<Deadline>) -> Result<DesiredState> {
        let deadline = deadline_or_default(&self.config, deadline);
        let id = id.trim();
        if id.is_empty() {
            return Err(crate::mrn::IdentifierError::Empty.into());
        }
        let mrn = self.scheme.space(id);

        let span = info_span!("import", kind = %ResourceKind::Space, name = id, space_mrn = %mrn);
        async move {
            let space = call("get_space", deadline, self.service.get_space(&mrn)).await?;
            info!("Imported space");
            Ok(self.to_state(&space, None))
        }
        .instrument(span)
        .await
    }
}
