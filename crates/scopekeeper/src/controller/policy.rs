//! Read-only listing of the policies visible in a space.

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::{info, info_span, Instrument};

use super::{call, deadline_or_default, Deadline};
use crate::client::{CatalogType, ConfigurationService, PolicySummary};
use crate::config::EngineConfig;
use crate::convert::ConversionError;
use crate::error::{ReconcileError, Result};
use crate::schema::{Phase, ResourceKind};
use crate::state::{AttributePath, DesiredState, Fields, Value};

/// Lists the policies and query packs of a space. Holds no remote state
/// of its own, so there is nothing to create or delete.
pub struct PolicyController {
    service: Arc<dyn ConfigurationService>,
    config: Arc<EngineConfig>,
}

fn timestamp(at: Option<DateTime<Utc>>) -> Value {
    at.map(|t| Value::string(t.to_rfc3339_opts(SecondsFormat::Secs, true)))
        .unwrap_or(Value::Null)
}

fn policy_fields(policy: PolicySummary) -> Fields {
    Fields::from([
        ("policy_mrn".to_string(), Value::String(policy.mrn)),
        ("policy_name".to_string(), Value::String(policy.name)),
        ("assigned".to_string(), Value::Bool(policy.assigned)),
        (
            "action".to_string(),
            policy.action.map(Value::String).unwrap_or(Value::Null),
        ),
        ("version".to_string(), Value::String(policy.version)),
        ("is_public".to_string(), Value::Bool(policy.is_public)),
        ("created_at".to_string(), timestamp(policy.created_at)),
        ("updated_at".to_string(), timestamp(policy.updated_at)),
    ])
}

impl PolicyController {
    /// Creates a controller backed by `service`.
    pub fn new(service: Arc<dyn ConfigurationService>, config: Arc<EngineConfig>) -> Self {
        Self { service, config }
    }

    /// Lists policies for the space named by `space_id` or `space_mrn`
    /// and returns `desired` with `policies` filled in.
    pub async fn list(
        &self,
        desired: &DesiredState,
        deadline: Option<Deadline>,
    ) -> Result<DesiredState> {
        let deadline = deadline_or_default(&self.config, deadline);
        // A refresh passes the previous listing back in.
        let mut state = super::resolve_and_validate(ResourceKind::Policy, desired, Phase::Update)?;

        let scope_mrn = match (state.get_str("space_mrn"), state.get_str("space_id")) {
            (Some(mrn), _) if !mrn.is_empty() => mrn.to_string(),
            (_, Some(id)) => self.config.scheme().space(id),
            _ => return Err(crate::mrn::IdentifierError::Empty.into()),
        };
        let catalog_name = state.get_str("catalog_type").unwrap_or("ALL");
        let catalog_type: CatalogType =
            catalog_name.parse().map_err(|_| ConversionError::UnsupportedValue {
                path: "catalog_type".to_string(),
                value: catalog_name.to_string(),
            })?;
        let assigned_only = state
            .value(&AttributePath::root("assigned_only"))
            .as_bool()
            .unwrap_or(false);

        let span = info_span!("list",
            kind = %ResourceKind::Policy,
            name = %catalog_type,
            space_mrn = %scope_mrn,
        );
        let policies = async {
            let policies = call(
                "list_policies",
                deadline,
                self.service.list_policies(&scope_mrn, catalog_type, assigned_only),
            )
            .await?;
            info!(count = policies.len(), "Listed policies");
            Ok::<_, ReconcileError>(policies)
        }
        .instrument(span)
        .await?;

        state.set(
            &AttributePath::root("policies"),
            Value::Objects(policies.into_iter().map(policy_fields).collect()),
        );
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::InMemoryService;
    use chrono::TimeZone;

    const SPACE_MRN: &str = "//captain.api.mondoo.app/spaces/s1";

    fn summary(name: &str, assigned: bool) -> PolicySummary {
        PolicySummary {
            mrn: format!("//policy.api.mondoo.app/policies/{}", name),
            name: name.to_string(),
            assigned,
            action: assigned.then(|| "ACTIVE".to_string()),
            version: "1.2.0".to_string(),
            is_public: true,
            created_at: Some(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()),
            updated_at: None,
        }
    }

    fn controller() -> (Arc<InMemoryService>, PolicyController) {
        let service = Arc::new(InMemoryService::default());
        service.seed_policy(SPACE_MRN, CatalogType::Policy, summary("cis-aws", true));
        service.seed_policy(SPACE_MRN, CatalogType::QueryPack, summary("asset-inventory", false));
        let controller = PolicyController::new(service.clone(), Arc::new(EngineConfig::default()));
        (service, controller)
    }

    #[tokio::test]
    async fn test_list_by_space_id() {
        let (_, controller) = controller();
        let state = controller
            .list(&DesiredState::new().with("space_id", "s1"), None)
            .await
            .unwrap();

        let Value::Objects(policies) = state.value(&AttributePath::root("policies")) else {
            panic!("policies should be a list of objects");
        };
        assert_eq!(policies.len(), 2);
        let cis = &policies[0];
        assert_eq!(cis["policy_name"], Value::string("cis-aws"));
        assert_eq!(cis["action"], Value::string("ACTIVE"));
        assert_eq!(cis["created_at"], Value::string("2024-03-01T12:00:00Z"));
        assert_eq!(cis["updated_at"], Value::Null);
        assert_eq!(state.get_str("catalog_type"), Some("ALL"));
    }

    #[tokio::test]
    async fn test_list_filters_by_space_mrn_and_catalog() {
        let (_, controller) = controller();
        let desired = DesiredState::new()
            .with("space_mrn", SPACE_MRN)
            .with("catalog_type", "QUERYPACK");
        let state = controller.list(&desired, None).await.unwrap();

        let Value::Objects(policies) = state.value(&AttributePath::root("policies")) else {
            panic!("policies should be a list of objects");
        };
        assert_eq!(policies.len(), 1);
        assert_eq!(policies[0]["policy_name"], Value::string("asset-inventory"));
    }

    #[tokio::test]
    async fn test_assigned_only() {
        let (_, controller) = controller();
        let desired = DesiredState::new()
            .with("space_id", "s1")
            .with("assigned_only", true);
        let state = controller.list(&desired, None).await.unwrap();
        let Value::Objects(policies) = state.value(&AttributePath::root("policies")) else {
            panic!("policies should be a list of objects");
        };
        assert_eq!(policies.len(), 1);
    }

    #[tokio::test]
    async fn test_requires_exactly_one_scope() {
        let (service, controller) = controller();
        let both = DesiredState::new()
            .with("space_id", "s1")
            .with("space_mrn", SPACE_MRN);
        assert!(matches!(
            controller.list(&both, None).await,
            Err(ReconcileError::Configuration(_))
        ));
        assert!(matches!(
            controller.list(&DesiredState::new(), None).await,
            Err(ReconcileError::Configuration(_))
        ));
        assert!(service.calls().is_empty());
    }

    #[tokio::test]
    async fn test_rejects_unknown_catalog_type() {
        let (_, controller) = controller();
        let desired = DesiredState::new()
            .with("space_id", "s1")
            .with("catalog_type", "EVERYTHING");
        let err = controller.list(&desired, None).await.unwrap_err();
        assert_eq!(err.violations()[0].path.to_string(), "catalog_type");
    }
}
