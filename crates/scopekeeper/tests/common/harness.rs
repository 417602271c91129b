//! Test harness for isolated controller runs.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;

use scopekeeper::{
    EngineConfig, FrameworkController, InMemoryService, IntegrationController, PolicyController,
    ResourceKind, SpaceController,
};

pub const DEFAULT_SPACE: &str = "default-space";

/// Controllers sharing one in-memory service and a scratch directory.
pub struct TestHarness {
    temp_dir: TempDir,
    pub service: Arc<InMemoryService>,
    pub config: Arc<EngineConfig>,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let service = Arc::new(
            InMemoryService::new(config.scheme()).with_default_space(DEFAULT_SPACE),
        );
        Self {
            temp_dir,
            service,
            config: Arc::new(config),
        }
    }

    pub fn temp_path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn integration(&self, kind: ResourceKind) -> IntegrationController {
        IntegrationController::new(kind, self.service.clone(), self.config.clone())
            .expect("integration kind")
    }

    pub fn spaces(&self) -> SpaceController {
        SpaceController::new(self.service.clone(), self.config.clone())
    }

    pub fn frameworks(&self) -> FrameworkController {
        FrameworkController::new(self.service.clone(), self.config.clone())
            .expect("Failed to create framework controller")
    }

    pub fn policies(&self) -> PolicyController {
        PolicyController::new(self.service.clone(), self.config.clone())
    }

    /// Writes a file below the scratch directory, creating parents.
    pub fn write_file(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.temp_dir.path().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent dir");
        }
        std::fs::write(&path, content).expect("Failed to write file");
        path
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
