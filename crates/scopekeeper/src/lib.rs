pub mod client;
pub mod config;
pub mod controller;
pub mod convert;
pub mod error;
pub mod logging;
pub mod manifest;
pub mod mrn;
pub mod schema;
pub mod state;
pub mod validation;

pub use client::{
    ActionKind, CatalogType, ClientError, ConfigurationService, InMemoryService, IntegrationKind,
};
pub use config::{EngineConfig, LoggingConfig};
pub use controller::{
    Applied, Deadline, FrameworkController, IntegrationController, PolicyController, ReadOutcome,
    SpaceController, Warning,
};
pub use convert::{from_remote_object, to_remote_request, ConfigurationOptions, ConversionError};
pub use error::{ContentError, ReconcileError, Result};
pub use logging::init_logging;
pub use manifest::{Manifest, ManifestError, ManifestLoader};
pub use mrn::{IdentifierError, ImportId, MrnScheme, ScopeKind};
pub use schema::{Phase, ResourceKind, ResourceSchema};
pub use state::{AttributePath, Credential, DesiredState, Value};
pub use validation::{Rule, ValidatorSet, Violation};
