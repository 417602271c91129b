//! Environment overrides for the engine configuration.

mod common;

use serial_test::serial;

use common::{IntegrationBuilder, TestHarness};
use scopekeeper::config::{ConfigError, ENV_AUTHORITY, ENV_SPACE, ENV_TIMEOUT_SECS};
use scopekeeper::{EngineConfig, ResourceKind};

fn clear_env() {
    for key in [ENV_AUTHORITY, ENV_SPACE, ENV_TIMEOUT_SECS] {
        std::env::remove_var(key);
    }
}

#[test]
#[serial]
fn test_env_overrides_file_values() {
    clear_env();
    let harness = TestHarness::new();
    let path = harness.write_file(
        "config.yaml",
        "authority: //captain.file.example\nrequestTimeoutSecs: 30\n",
    );

    std::env::set_var(ENV_AUTHORITY, "//captain.env.example");
    std::env::set_var(ENV_SPACE, "env-space");
    let config = EngineConfig::load_or_default(&path).unwrap();
    clear_env();

    assert_eq!(config.authority, "//captain.env.example");
    assert_eq!(config.default_space_id.as_deref(), Some("env-space"));
    assert_eq!(config.request_timeout_secs, 30);
}

#[test]
#[serial]
fn test_missing_file_uses_defaults() {
    clear_env();
    let config = EngineConfig::load_or_default("/nonexistent/scopekeeper/config.yaml").unwrap();
    assert_eq!(config, EngineConfig::default());
}

#[test]
#[serial]
fn test_invalid_env_timeout() {
    clear_env();
    std::env::set_var(ENV_TIMEOUT_SECS, "0");
    let result = EngineConfig::default().apply_env();
    clear_env();
    assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
}

#[tokio::test]
#[serial]
async fn test_configured_authority_shapes_mrns() {
    clear_env();
    std::env::set_var(ENV_AUTHORITY, "//captain.staging.example/");
    let mut config = EngineConfig::default();
    config.apply_env().unwrap();
    clear_env();

    let harness = TestHarness::with_config(config);
    let created = harness
        .integration(ResourceKind::Ms365)
        .create(&IntegrationBuilder::new(ResourceKind::Ms365).build(), None)
        .await
        .unwrap();
    assert!(created
        .state
        .get_str("mrn")
        .unwrap()
        .starts_with("//captain.staging.example/spaces/default-space/integrations/"));
}
