//! In-memory [`ConfigurationService`] for tests and dry runs.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use super::{
    ActionKind, CatalogType, ClientError, ConfigurationService, FrameworkObject, IntegrationKind,
    PolicySummary, RemoteObject, Result, Scope, SpaceObject,
};
use crate::controller::framework::FrameworkDocument;
use crate::convert::ConfigurationOptions;
use crate::mrn::MrnScheme;

/// Names a service call, for failure injection and call tracing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ComputeScope,
    CreateIntegration,
    UpdateIntegration,
    GetIntegration,
    DeleteIntegration,
    TriggerAction,
    CreateSpace,
    GetSpace,
    UpdateSpace,
    DeleteSpace,
    UploadFramework,
    GetFramework,
    DeleteFramework,
    ListPolicies,
}

#[derive(Debug, Clone)]
struct StoredFramework {
    space_mrn: String,
    object: FrameworkObject,
    content: Vec<u8>,
}

#[derive(Default)]
struct Inner {
    integrations: HashMap<String, RemoteObject>,
    spaces: HashMap<String, SpaceObject>,
    frameworks: HashMap<String, StoredFramework>,
    policies: HashMap<String, Vec<(CatalogType, PolicySummary)>>,
    actions: Vec<(String, ActionKind)>,
    failures: HashMap<Operation, ClientError>,
    calls: Vec<Operation>,
    submitted: Vec<ConfigurationOptions>,
}

/// Keeps every object in memory. Credentials are stripped before storing,
/// AWS creates return a fresh token, and triggered actions are recorded.
pub struct InMemoryService {
    scheme: MrnScheme,
    default_space_id: Option<String>,
    latency: Option<Duration>,
    inner: RwLock<Inner>,
}

impl InMemoryService {
    pub fn new(scheme: MrnScheme) -> Self {
        Self {
            scheme,
            default_space_id: None,
            latency: None,
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Space used by `compute_scope(None)`.
    pub fn with_default_space(mut self, space_id: impl Into<String>) -> Self {
        self.default_space_id = Some(space_id.into());
        self
    }

    /// Delay applied to every call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Makes every later call of `operation` fail with `error`.
    pub fn fail(&self, operation: Operation, error: ClientError) {
        self.write().failures.insert(operation, error);
    }

    pub fn clear_failure(&self, operation: Operation) {
        self.write().failures.remove(&operation);
    }

    /// Registers policies visible under a scope.
    pub fn seed_policy(&self, scope_mrn: &str, catalog: CatalogType, policy: PolicySummary) {
        self.write()
            .policies
            .entry(scope_mrn.to_string())
            .or_default()
            .push((catalog, policy));
    }

    /// Deletes an integration behind the controller's back.
    pub fn remove_integration(&self, mrn: &str) -> Option<RemoteObject> {
        self.write().integrations.remove(mrn)
    }

    /// Replaces an integration's options behind the controller's back.
    /// Credentials are dropped, as the service never stores them readable.
    pub fn replace_options(&self, mrn: &str, options: ConfigurationOptions) -> bool {
        match self.write().integrations.get_mut(mrn) {
            Some(stored) if stored.kind == options.kind() => {
                stored.options = options.without_credentials();
                true
            }
            _ => false,
        }
    }

    pub fn integration(&self, mrn: &str) -> Option<RemoteObject> {
        self.read().integrations.get(mrn).cloned()
    }

    pub fn integration_count(&self) -> usize {
        self.read().integrations.len()
    }

    pub fn space(&self, mrn: &str) -> Option<SpaceObject> {
        self.read().spaces.get(mrn).cloned()
    }

    /// Raw content of a stored framework.
    pub fn framework_content(&self, mrn: &str) -> Option<Vec<u8>> {
        self.read().frameworks.get(mrn).map(|f| f.content.clone())
    }

    pub fn triggered_actions(&self) -> Vec<(String, ActionKind)> {
        self.read().actions.clone()
    }

    pub fn calls(&self) -> Vec<Operation> {
        self.read().calls.clone()
    }

    /// Options exactly as submitted by create and update, credentials included.
    pub fn submitted(&self) -> Vec<ConfigurationOptions> {
        self.read().submitted.clone()
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        match self.inner.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("In-memory service lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("In-memory service lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    async fn begin(&self, operation: Operation) -> Result<()> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        let mut inner = self.write();
        inner.calls.push(operation);
        match inner.failures.get(&operation) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    fn new_id() -> String {
        Uuid::new_v4().simple().to_string()
    }
}

impl Default for InMemoryService {
    fn default() -> Self {
        Self::new(MrnScheme::default())
    }
}

fn not_found(what: &str, mrn: &str) -> ClientError {
    ClientError::NotFound(format!("{} '{}'", what, mrn))
}

#[async_trait]
impl ConfigurationService for InMemoryService {
    async fn compute_scope(&self, space_id: Option<&str>) -> Result<Scope> {
        self.begin(Operation::ComputeScope).await?;
        let id = space_id
            .filter(|id| !id.is_empty())
            .or(self.default_space_id.as_deref())
            .ok_or_else(|| {
                ClientError::Rejected("no space id given and no default space configured".into())
            })?;
        Ok(Scope {
            id: id.to_string(),
            mrn: self.scheme.space(id),
        })
    }

    async fn create_integration(
        &self,
        scope_mrn: &str,
        name: &str,
        kind: IntegrationKind,
        options: &ConfigurationOptions,
    ) -> Result<RemoteObject> {
        self.begin(Operation::CreateIntegration).await?;
        if options.kind() != kind {
            return Err(ClientError::Rejected(format!(
                "options for {} submitted as {}",
                options.kind(),
                kind
            )));
        }

        let stored = RemoteObject {
            mrn: format!("{}/integrations/{}", scope_mrn, Self::new_id()),
            name: name.to_string(),
            kind,
            options: options.without_credentials(),
            token: None,
        };
        let mut inner = self.write();
        inner.submitted.push(options.clone());
        inner.integrations.insert(stored.mrn.clone(), stored.clone());

        let mut created = stored;
        if kind == IntegrationKind::Aws {
            created.token = Some(Self::new_id());
        }
        Ok(created)
    }

    async fn update_integration(
        &self,
        mrn: &str,
        name: &str,
        kind: IntegrationKind,
        options: &ConfigurationOptions,
    ) -> Result<RemoteObject> {
        self.begin(Operation::UpdateIntegration).await?;
        let mut inner = self.write();
        let stored = inner
            .integrations
            .get_mut(mrn)
            .ok_or_else(|| not_found("integration", mrn))?;
        if stored.kind != kind || options.kind() != kind {
            return Err(ClientError::Rejected(format!(
                "cannot change integration {} from {} to {}",
                mrn,
                stored.kind,
                options.kind()
            )));
        }
        stored.name = name.to_string();
        stored.options = options.without_credentials();
        let updated = stored.clone();
        inner.submitted.push(options.clone());
        Ok(updated)
    }

    async fn get_integration(&self, mrn: &str) -> Result<RemoteObject> {
        self.begin(Operation::GetIntegration).await?;
        self.integration(mrn)
            .ok_or_else(|| not_found("integration", mrn))
    }

    async fn delete_integration(&self, mrn: &str) -> Result<()> {
        self.begin(Operation::DeleteIntegration).await?;
        self.remove_integration(mrn)
            .map(|_| ())
            .ok_or_else(|| not_found("integration", mrn))
    }

    async fn trigger_action(&self, mrn: &str, action: ActionKind) -> Result<()> {
        self.begin(Operation::TriggerAction).await?;
        let mut inner = self.write();
        if !inner.integrations.contains_key(mrn) {
            return Err(not_found("integration", mrn));
        }
        inner.actions.push((mrn.to_string(), action));
        Ok(())
    }

    async fn create_space(&self, org_mrn: &str, name: &str) -> Result<SpaceObject> {
        self.begin(Operation::CreateSpace).await?;
        let id = Self::new_id();
        let space = SpaceObject {
            mrn: self.scheme.space(&id),
            id,
            name: name.to_string(),
            org_mrn: org_mrn.to_string(),
        };
        self.write().spaces.insert(space.mrn.clone(), space.clone());
        Ok(space)
    }

    async fn get_space(&self, mrn: &str) -> Result<SpaceObject> {
        self.begin(Operation::GetSpace).await?;
        self.space(mrn).ok_or_else(|| not_found("space", mrn))
    }

    async fn update_space(&self, mrn: &str, name: &str) -> Result<SpaceObject> {
        self.begin(Operation::UpdateSpace).await?;
        let mut inner = self.write();
        let space = inner
            .spaces
            .get_mut(mrn)
            .ok_or_else(|| not_found("space", mrn))?;
        space.name = name.to_string();
        Ok(space.clone())
    }

    async fn delete_space(&self, mrn: &str) -> Result<()> {
        self.begin(Operation::DeleteSpace).await?;
        self.write()
            .spaces
            .remove(mrn)
            .map(|_| ())
            .ok_or_else(|| not_found("space", mrn))
    }

    async fn upload_framework(&self, space_mrn: &str, content: &[u8]) -> Result<()> {
        self.begin(Operation::UploadFramework).await?;
        let document = FrameworkDocument::parse(content)
            .map_err(|e| ClientError::Rejected(e.to_string()))?;

        let mut inner = self.write();
        for framework in document.frameworks {
            let mrn = format!("{}/frameworks/{}", space_mrn, framework.uid);
            inner.frameworks.insert(
                mrn.clone(),
                StoredFramework {
                    space_mrn: space_mrn.to_string(),
                    object: FrameworkObject {
                        mrn,
                        uid: framework.uid,
                        name: framework.name,
                    },
                    content: content.to_vec(),
                },
            );
        }
        Ok(())
    }

    async fn get_framework(&self, space_mrn: &str, uid: &str) -> Result<FrameworkObject> {
        self.begin(Operation::GetFramework).await?;
        let mrn = format!("{}/frameworks/{}", space_mrn, uid);
        self.read()
            .frameworks
            .get(&mrn)
            .filter(|f| f.space_mrn == space_mrn)
            .map(|f| f.object.clone())
            .ok_or_else(|| not_found("framework", &mrn))
    }

    async fn delete_framework(&self, mrn: &str) -> Result<()> {
        self.begin(Operation::DeleteFramework).await?;
        self.write()
            .frameworks
            .remove(mrn)
            .map(|_| ())
            .ok_or_else(|| not_found("framework", mrn))
    }

    async fn list_policies(
        &self,
        scope_mrn: &str,
        catalog_type: CatalogType,
        assigned_only: bool,
    ) -> Result<Vec<PolicySummary>> {
        self.begin(Operation::ListPolicies).await?;
        let inner = self.read();
        let policies = inner
            .policies
            .get(scope_mrn)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|(kind, _)| catalog_type == CatalogType::All || *kind == catalog_type)
                    .filter(|(_, policy)| !assigned_only || policy.assigned)
                    .map(|(_, policy)| policy.clone())
                    .collect()
            })
            .unwrap_or_default();
        Ok(policies)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::options::{Ms365Options, SentinelOneOptions};
    use crate::state::Credential;

    fn ms365() -> ConfigurationOptions {
        ConfigurationOptions::Ms365(Ms365Options {
            tenant_id: "t".into(),
            client_id: "c".into(),
            certificate: Some(Credential::new("PEM")),
        })
    }

    #[tokio::test]
    async fn test_create_strips_credentials() {
        let service = InMemoryService::default();
        let scope = service.compute_scope(Some("s1")).await.unwrap();
        assert_eq!(scope.mrn, "//captain.api.mondoo.app/spaces/s1");

        let created = service
            .create_integration(&scope.mrn, "m", IntegrationKind::Ms365, &ms365())
            .await
            .unwrap();
        assert!(created.mrn.starts_with("//captain.api.mondoo.app/spaces/s1/integrations/"));
        assert_eq!(created.token, None);

        let fetched = service.get_integration(&created.mrn).await.unwrap();
        let ConfigurationOptions::Ms365(opts) = fetched.options else {
            panic!("wrong variant");
        };
        assert!(opts.certificate.is_none());
        assert_eq!(service.submitted(), vec![ms365()]);
    }

    #[tokio::test]
    async fn test_aws_create_returns_token_once() {
        let service = InMemoryService::default();
        let created = service
            .create_integration(
                "//captain.api.mondoo.app/spaces/s1",
                "aws",
                IntegrationKind::Aws,
                &ConfigurationOptions::Aws(Default::default()),
            )
            .await
            .unwrap();
        assert!(created.token.is_some());
        let fetched = service.get_integration(&created.mrn).await.unwrap();
        assert_eq!(fetched.token, None);
    }

    #[tokio::test]
    async fn test_compute_scope_uses_default_space() {
        let service = InMemoryService::default().with_default_space("fallback");
        assert_eq!(service.compute_scope(None).await.unwrap().id, "fallback");

        let service = InMemoryService::default();
        assert!(matches!(
            service.compute_scope(None).await,
            Err(ClientError::Rejected(_))
        ));
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let service = InMemoryService::default();
        service.fail(
            Operation::GetIntegration,
            ClientError::Unauthorized("token expired".into()),
        );
        let err = service.get_integration("x").await.unwrap_err();
        assert_eq!(err, ClientError::Unauthorized("token expired".into()));

        service.clear_failure(Operation::GetIntegration);
        assert!(service.get_integration("x").await.unwrap_err().is_not_found());
        assert_eq!(
            service.calls(),
            vec![Operation::GetIntegration, Operation::GetIntegration]
        );
    }

    #[tokio::test]
    async fn test_update_rejects_kind_change() {
        let service = InMemoryService::default();
        let created = service
            .create_integration("//a/spaces/s", "m", IntegrationKind::Ms365, &ms365())
            .await
            .unwrap();
        let err = service
            .update_integration(
                &created.mrn,
                "m",
                IntegrationKind::SentinelOne,
                &ConfigurationOptions::SentinelOne(SentinelOneOptions::default()),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Rejected(_)));
    }

    #[tokio::test]
    async fn test_list_policies_filters() {
        let service = InMemoryService::default();
        let policy = |name: &str, assigned: bool| PolicySummary {
            mrn: format!("//policy.api.mondoo.app/policies/{}", name),
            name: name.to_string(),
            assigned,
            action: None,
            version: "1.0.0".into(),
            is_public: true,
            created_at: None,
            updated_at: None,
        };
        service.seed_policy("//s", CatalogType::Policy, policy("cis", true));
        service.seed_policy("//s", CatalogType::QueryPack, policy("inventory", false));

        let all = service.list_policies("//s", CatalogType::All, false).await.unwrap();
        assert_eq!(all.len(), 2);
        let packs = service
            .list_policies("//s", CatalogType::QueryPack, false)
            .await
            .unwrap();
        assert_eq!(packs[0].name, "inventory");
        let assigned = service.list_policies("//s", CatalogType::All, true).await.unwrap();
        assert_eq!(assigned.len(), 1);
        assert!(service
            .list_policies("//other", CatalogType::All, false)
            .await
            .unwrap()
            .is_empty());
    }
}
