//! Conversion between the desired-state tree and wire configuration payloads.
//!
//! Each integration variant is described by a [`VariantTable`]: rows pairing
//! a local attribute path with a wire path and a [`Codec`], plus optional
//! hooks for fields that do not map one to one. Encoding walks the table into
//! a JSON tree and deserializes it into the typed options struct; decoding
//! serializes the struct and reads the wire paths back.
//!
//! Sensitive attributes only travel outward. Decoding carries them (and
//! one-shot computed values such as the AWS token) over from the prior state.

pub mod containers;
pub mod options;
pub mod variants;

use serde_json::{Map, Value as Json};
use thiserror::Error;

pub use options::ConfigurationOptions;

use crate::client::{IntegrationKind, RemoteObject};
use crate::schema::ResourceKind;
use crate::state::{AttributePath, DesiredState, Value};
use containers::{
    list_from_wire, list_to_wire, map_from_wire, map_to_wire, tri_bool_from_wire,
    tri_bool_to_wire, wire_get, wire_set,
};

/// Errors produced while building a wire payload.
#[derive(Error, Debug)]
pub enum ConversionError {
    #[error("Resource kind '{0}' is not an integration")]
    NotAnIntegration(ResourceKind),

    #[error("Attribute '{path}': expected {expected}, found {found}")]
    TypeMismatch {
        path: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Attribute '{path}': unsupported value '{value}'")]
    UnsupportedValue { path: String, value: String },

    #[error("Failed to build {kind} options: {message}")]
    Payload {
        kind: IntegrationKind,
        message: String,
    },
}

/// How a single attribute travels over the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    /// Always sent; unset becomes `""`.
    Str,
    /// Omitted when unset or empty.
    OptStr,
    /// Always sent; unset becomes `false`.
    Bool,
    /// Omitted when unset, so an explicit `false` survives.
    TriBool,
    Int,
    /// Ordered string sequence; unset becomes `[]`.
    List,
    /// String mapping; unset becomes `{}`.
    Map,
    /// Write-only. Sent when non-empty, never read back.
    Secret,
}

impl Codec {
    fn expected(&self) -> &'static str {
        match self {
            Codec::Str | Codec::OptStr | Codec::Secret => "string",
            Codec::Bool | Codec::TriBool => "bool",
            Codec::Int => "integer",
            Codec::List => "list",
            Codec::Map => "map",
        }
    }

    fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null | Value::Unknown) => true,
            (Codec::Str | Codec::OptStr | Codec::Secret, Value::String(_) | Value::Secret(_)) => {
                true
            }
            (Codec::Bool | Codec::TriBool, Value::Bool(_)) => true,
            (Codec::Int, Value::Int(_)) => true,
            (Codec::List, Value::List(_)) => true,
            (Codec::Map, Value::Map(_)) => true,
            _ => false,
        }
    }

    fn encode(&self, value: &Value) -> Option<Json> {
        match self {
            Codec::Str => Some(Json::String(value.as_str().unwrap_or_default().to_string())),
            Codec::OptStr | Codec::Secret => value
                .as_str()
                .filter(|s| !s.is_empty())
                .map(|s| Json::String(s.to_string())),
            Codec::Bool => Some(Json::Bool(value.as_bool().unwrap_or(false))),
            Codec::TriBool => tri_bool_to_wire(value),
            Codec::Int => Some(Json::from(value.as_int().unwrap_or(0))),
            Codec::List => Some(list_to_wire(value)),
            Codec::Map => Some(map_to_wire(value)),
        }
    }

    /// `current` is the schema-resolved value held for the attribute.
    fn decode(&self, wire: Option<&Json>, current: &Value) -> Value {
        match self {
            Codec::Str => match wire.and_then(Json::as_str) {
                // An empty remote string does not overwrite an attribute that
                // has neither a value nor a default.
                Some("") | None if current.is_null() => Value::Null,
                Some(s) => Value::string(s),
                None => Value::string(""),
            },
            Codec::OptStr => wire
                .and_then(Json::as_str)
                .filter(|s| !s.is_empty())
                .map(Value::string)
                .unwrap_or(Value::Null),
            Codec::Bool => Value::Bool(wire.and_then(Json::as_bool).unwrap_or(false)),
            Codec::TriBool => tri_bool_from_wire(wire),
            Codec::Int => Value::Int(wire.and_then(Json::as_i64).unwrap_or(0)),
            Codec::List => list_from_wire(wire),
            Codec::Map => map_from_wire(wire),
            Codec::Secret => current.clone(),
        }
    }
}

/// One row of a variant table.
#[derive(Debug, Clone, Copy)]
pub struct FieldMapping {
    pub local: &'static str,
    pub wire: &'static str,
    pub codec: Codec,
}

type EncodeHook = fn(&DesiredState, &mut Json);
type DecodeHook = fn(&Json, &mut DesiredState);

/// Mapping rows and hooks for one integration variant.
pub struct VariantTable {
    pub kind: IntegrationKind,
    pub fields: &'static [FieldMapping],
    /// Runs after the rows, with the resolved state and the wire body.
    pub encode_hook: Option<EncodeHook>,
    /// Runs after the rows, with the wire body and the decoded state.
    pub decode_hook: Option<DecodeHook>,
}

/// Builds the wire payload for `desired`. Schema defaults are applied first,
/// so omitted collections are sent as empty collections.
pub fn to_remote_request(
    kind: ResourceKind,
    desired: &DesiredState,
) -> Result<ConfigurationOptions, ConversionError> {
    let integration =
        IntegrationKind::from_resource(kind).ok_or(ConversionError::NotAnIntegration(kind))?;
    let resolved = kind.schema().resolve(desired);
    let table = variants::table(integration);

    let mut body = Json::Object(Map::new());
    for mapping in table.fields {
        let value = resolved.value(&AttributePath::parse(mapping.local));
        if !mapping.codec.accepts(value) {
            return Err(ConversionError::TypeMismatch {
                path: mapping.local.to_string(),
                expected: mapping.codec.expected(),
                found: value.type_name(),
            });
        }
        if let Some(encoded) = mapping.codec.encode(value) {
            wire_set(&mut body, mapping.wire, encoded);
        }
    }
    if let Some(hook) = table.encode_hook {
        hook(&resolved, &mut body);
    }

    options_from_wire(integration, body)
}

/// Merges a remote object into the prior state. Non-sensitive fields come
/// from the remote; sensitive fields are copied from `prior` unchanged (and
/// stay `Null` when `prior` has none).
pub fn from_remote_object(remote: &RemoteObject, prior: &DesiredState) -> DesiredState {
    let kind = remote.kind.resource_kind();
    let schema = kind.schema();
    let table = variants::table(remote.kind);
    let body = options_to_wire(&remote.options);

    let mut state = schema.resolve(prior);
    for mapping in table.fields {
        let path = AttributePath::parse(mapping.local);
        let decoded = mapping
            .codec
            .decode(wire_get(&body, mapping.wire), state.value(&path));
        state.set(&path, decoded);
    }
    if let Some(hook) = table.decode_hook {
        hook(&body, &mut state);
    }

    state.set(&AttributePath::root("mrn"), Value::string(remote.mrn.as_str()));
    state.set(&AttributePath::root("name"), Value::string(remote.name.as_str()));
    if let Some(token) = &remote.token {
        state.set(&AttributePath::root("token"), Value::string(token.as_str()));
    } else if schema.attribute(&AttributePath::root("token")).is_some() {
        state.set(
            &AttributePath::root("token"),
            prior.value(&AttributePath::root("token")).clone(),
        );
    }

    for path in schema.sensitive_paths() {
        state.set(&path, prior.value(&path).clone());
    }
    state
}

fn options_from_wire(
    kind: IntegrationKind,
    body: Json,
) -> Result<ConfigurationOptions, ConversionError> {
    let payload = |e: serde_json::Error| ConversionError::Payload {
        kind,
        message: e.to_string(),
    };
    Ok(match kind {
        IntegrationKind::Aws => {
            ConfigurationOptions::Aws(serde_json::from_value(body).map_err(payload)?)
        }
        IntegrationKind::Azure => {
            ConfigurationOptions::Azure(serde_json::from_value(body).map_err(payload)?)
        }
        IntegrationKind::Gcp => {
            ConfigurationOptions::Gcp(serde_json::from_value(body).map_err(payload)?)
        }
        IntegrationKind::Ms365 => {
            ConfigurationOptions::Ms365(serde_json::from_value(body).map_err(payload)?)
        }
        IntegrationKind::SentinelOne => {
            ConfigurationOptions::SentinelOne(serde_json::from_value(body).map_err(payload)?)
        }
        IntegrationKind::CrowdStrike => {
            ConfigurationOptions::CrowdStrike(serde_json::from_value(body).map_err(payload)?)
        }
    })
}

/// The variant body of `options` as JSON, without the variant tag.
fn options_to_wire(options: &ConfigurationOptions) -> Json {
    let body = match options {
        ConfigurationOptions::Aws(o) => serde_json::to_value(o),
        ConfigurationOptions::Azure(o) => serde_json::to_value(o),
        ConfigurationOptions::Gcp(o) => serde_json::to_value(o),
        ConfigurationOptions::Ms365(o) => serde_json::to_value(o),
        ConfigurationOptions::SentinelOne(o) => serde_json::to_value(o),
        ConfigurationOptions::CrowdStrike(o) => serde_json::to_value(o),
    };
    body.unwrap_or_else(|e| {
        log::warn!("Failed to serialize {} options: {}", options.kind(), e);
        Json::Object(Map::new())
    })
}

#[cfg(test)]
mod tests {
    use super::options::*;
    use super::*;
    use crate::state::Credential;

    fn remote(options: ConfigurationOptions) -> RemoteObject {
        RemoteObject {
            mrn: "//captain.api.mondoo.app/spaces/s1/integrations/i1".to_string(),
            name: "test".to_string(),
            kind: options.kind(),
            options: options.without_credentials(),
            token: None,
        }
    }

    fn strip_identity(mut state: DesiredState) -> DesiredState {
        for field in ["mrn", "name", "space_id", "token"] {
            state.remove(&AttributePath::root(field));
        }
        state
    }

    #[test]
    fn test_canonical_defaults_survive_a_round_trip() {
        for kind in ResourceKind::integrations() {
            let canonical = kind.schema().canonical_default();
            let request = to_remote_request(*kind, &canonical).unwrap();
            let back = from_remote_object(&remote(request), &canonical);
            assert_eq!(
                strip_identity(back),
                strip_identity(canonical),
                "round trip changed {}",
                kind
            );
        }
    }

    #[test]
    fn test_omitted_collections_are_sent_empty() {
        let desired = DesiredState::new()
            .with("name", "aws")
            .with("region", "us-east-1")
            .with("scan_configuration.ec2_scan", true);
        let ConfigurationOptions::Aws(opts) =
            to_remote_request(ResourceKind::AwsServerless, &desired).unwrap()
        else {
            panic!("wrong variant");
        };
        assert!(opts.account_ids.is_empty());
        assert!(opts.scan_configuration.ec2_scan_options.tags_filter.is_empty());
        assert!(opts.scan_configuration.event_scan_triggers.is_empty());
        assert_eq!(opts.scan_configuration.vpc_configuration.cidr_block, "10.0.0.0/24");
        assert!(opts.scan_configuration.vpc_configuration.use_default_vpc);

        let json = serde_json::to_value(ConfigurationOptions::Aws(opts)).unwrap();
        assert_eq!(json["awsConfigurationOptions"]["accountIDs"], serde_json::json!([]));
    }

    #[test]
    fn test_azure_request() {
        let desired = DesiredState::new()
            .with("name", "azure")
            .with("client_id", "c")
            .with("tenant_id", "t")
            .with("subscription_allow_list", Value::list(["sub-2", "sub-1"]))
            .with("credentials.pem_file", "PEM");
        let request = to_remote_request(ResourceKind::Azure, &desired).unwrap();
        assert_eq!(
            request,
            ConfigurationOptions::Azure(AzureOptions {
                tenant_id: "t".into(),
                client_id: "c".into(),
                subscriptions_allowlist: vec!["sub-2".into(), "sub-1".into()],
                subscriptions_denylist: vec![],
                scan_vms: false,
                certificate: Some(Credential::new("PEM")),
            })
        );
    }

    #[test]
    fn test_gcp_always_discovers_all() {
        let desired = DesiredState::new().with("project_id", "p");
        let ConfigurationOptions::Gcp(opts) =
            to_remote_request(ResourceKind::Gcp, &desired).unwrap()
        else {
            panic!("wrong variant");
        };
        assert!(opts.discover_all);
        assert_eq!(opts.organization_id, "");
    }

    #[test]
    fn test_crowdstrike_create_assets_tri_state() {
        let base = DesiredState::new()
            .with("client_id", "c")
            .with("base_url", "https://api.crowdstrike.com")
            .with("customer_id", "cid");

        let ConfigurationOptions::CrowdStrike(unset) =
            to_remote_request(ResourceKind::CrowdStrike, &base).unwrap()
        else {
            panic!("wrong variant");
        };
        assert_eq!(unset.create_assets, None);
        assert_eq!(unset.cloud, "https://api.crowdstrike.com");
        assert_eq!(unset.member_cid, "cid");

        let ConfigurationOptions::CrowdStrike(off) =
            to_remote_request(ResourceKind::CrowdStrike, &base.with("create_assets", false))
                .unwrap()
        else {
            panic!("wrong variant");
        };
        assert_eq!(off.create_assets, Some(false));
    }

    #[test]
    fn test_type_mismatch_is_reported() {
        let desired = DesiredState::new().with("scan_vms", "yes");
        let err = to_remote_request(ResourceKind::Azure, &desired).unwrap_err();
        assert!(matches!(err, ConversionError::TypeMismatch { .. }));
    }

    #[test]
    fn test_non_integration_kind_is_rejected() {
        let err = to_remote_request(ResourceKind::Space, &DesiredState::new()).unwrap_err();
        assert!(matches!(err, ConversionError::NotAnIntegration(ResourceKind::Space)));
    }

    #[test]
    fn test_read_carries_secrets_and_token_from_prior() {
        let prior = ResourceKind::AwsServerless.schema().resolve(
            &DesiredState::new()
                .with("name", "aws")
                .with("region", "us-east-1")
                .with("token", "tok-123"),
        );
        let request = to_remote_request(ResourceKind::AwsServerless, &prior).unwrap();
        let state = from_remote_object(&remote(request), &prior);
        assert_eq!(state.get_str("token"), Some("tok-123"));
        assert_eq!(state.get_str("region"), Some("us-east-1"));

        let prior = ResourceKind::Ms365.schema().resolve(
            &DesiredState::new()
                .with("name", "m")
                .with("client_id", "c")
                .with("tenant_id", "t")
                .with("credentials.pem_file", "PEM"),
        );
        let request = to_remote_request(ResourceKind::Ms365, &prior).unwrap();
        let state = from_remote_object(&remote(request), &prior);
        assert_eq!(
            state.value(&"credentials.pem_file".into()),
            prior.value(&"credentials.pem_file".into())
        );
    }

    #[test]
    fn test_import_keeps_empty_string_defaults() {
        let remote = remote(ConfigurationOptions::Gcp(GcpOptions {
            project_id: String::new(),
            organization_id: "1234567890".into(),
            service_account: None,
            discover_all: true,
        }));
        let imported = from_remote_object(&remote, &DesiredState::new());
        assert_eq!(imported.get_str("project_id"), Some(""));
        assert_eq!(imported.get_str("organization_id"), Some("1234567890"));
        let project_id = AttributePath::root("project_id");
        assert_eq!(
            ResourceKind::Gcp.schema().resolve(&imported).value(&project_id),
            imported.value(&project_id)
        );
    }

    #[test]
    fn test_import_leaves_secrets_null() {
        let remote = remote(ConfigurationOptions::Ms365(Ms365Options {
            tenant_id: "t".into(),
            client_id: "c".into(),
            certificate: Some(Credential::new("should-not-appear")),
        }));
        let state = from_remote_object(&remote, &DesiredState::new());
        assert_eq!(state.value(&"credentials.pem_file".into()), &Value::Null);
        assert_eq!(state.get_str("tenant_id"), Some("t"));
    }
}
