//! Field-mapping tables and hooks for each integration variant.

use serde_json::{json, Value as Json};

use super::containers::{wire_get, wire_set};
use super::{Codec, FieldMapping, VariantTable};
use crate::client::IntegrationKind;
use crate::state::{AttributePath, DesiredState, Value};

const fn field(local: &'static str, wire: &'static str, codec: Codec) -> FieldMapping {
    FieldMapping { local, wire, codec }
}

/// Returns the mapping table for an integration kind.
pub fn table(kind: IntegrationKind) -> &'static VariantTable {
    match kind {
        IntegrationKind::Aws => &AWS,
        IntegrationKind::Azure => &AZURE,
        IntegrationKind::Gcp => &GCP,
        IntegrationKind::Ms365 => &MS365,
        IntegrationKind::SentinelOne => &SENTINEL_ONE,
        IntegrationKind::CrowdStrike => &CROWD_STRIKE,
    }
}

// ============================================================================
// AWS serverless
// ============================================================================

const CONSOLE_SIGN_IN_SOURCE: &str = "aws.signin";
const CONSOLE_SIGN_IN_DETAIL: &str = "AWS Console Sign In via CloudTrail";
const INSTANCE_STATE_SOURCE: &str = "aws.ec2";
const INSTANCE_STATE_DETAIL: &str = "EC2 Instance State-change Notification";

static AWS: VariantTable = VariantTable {
    kind: IntegrationKind::Aws,
    fields: &[
        field("region", "region", Codec::Str),
        field("account_ids", "accountIDs", Codec::List),
        field("is_organization", "isOrganization", Codec::Bool),
        field("scan_configuration.ec2_scan", "scanConfiguration.ec2Scan", Codec::Bool),
        field("scan_configuration.ecr_scan", "scanConfiguration.ecrScan", Codec::Bool),
        field("scan_configuration.ecs_scan", "scanConfiguration.ecsScan", Codec::Bool),
        field(
            "scan_configuration.cron_scan_in_hours",
            "scanConfiguration.cronScaninHours",
            Codec::Int,
        ),
        field(
            "scan_configuration.vpc_configuration.use_managed_vpc",
            "scanConfiguration.vpcConfiguration.useManagedVpc",
            Codec::Bool,
        ),
        field(
            "scan_configuration.vpc_configuration.cidr_block",
            "scanConfiguration.vpcConfiguration.cidrBlock",
            Codec::Str,
        ),
        field(
            "scan_configuration.ec2_scan_options.ssm",
            "scanConfiguration.ec2ScanOptions.ssm",
            Codec::Bool,
        ),
        field(
            "scan_configuration.ec2_scan_options.instance_ids_filter",
            "scanConfiguration.ec2ScanOptions.instanceIDsFilter",
            Codec::List,
        ),
        field(
            "scan_configuration.ec2_scan_options.regions_filter",
            "scanConfiguration.ec2ScanOptions.regionsFilter",
            Codec::List,
        ),
        field(
            "scan_configuration.ec2_scan_options.tags_filter",
            "scanConfiguration.ec2ScanOptions.tagsFilter",
            Codec::Map,
        ),
        field(
            "scan_configuration.ec2_scan_options.exclude_instance_ids_filter",
            "scanConfiguration.ec2ScanOptions.excludedInstanceIDsFilter",
            Codec::List,
        ),
        field(
            "scan_configuration.ec2_scan_options.exclude_regions_filter",
            "scanConfiguration.ec2ScanOptions.excludedRegionsFilter",
            Codec::List,
        ),
        field(
            "scan_configuration.ec2_scan_options.exclude_tags_filter",
            "scanConfiguration.ec2ScanOptions.excludedTagsFilter",
            Codec::Map,
        ),
        field(
            "scan_configuration.ec2_scan_options.ebs_volume_scan",
            "scanConfiguration.ec2ScanOptions.ebsVolumeScan",
            Codec::Bool,
        ),
        field(
            "scan_configuration.ec2_scan_options.ebs_scan_options.target_instances_per_scanner",
            "scanConfiguration.ec2ScanOptions.ebsScanOptions.targetInstancesPerScanner",
            Codec::Int,
        ),
        field(
            "scan_configuration.ec2_scan_options.ebs_scan_options.max_asg_instances",
            "scanConfiguration.ec2ScanOptions.ebsScanOptions.maxAsgInstances",
            Codec::Int,
        ),
        field(
            "scan_configuration.ec2_scan_options.instance_connect",
            "scanConfiguration.ec2ScanOptions.instanceConnect",
            Codec::Bool,
        ),
    ],
    encode_hook: Some(aws_encode),
    decode_hook: Some(aws_decode),
};

fn event_pattern(source: &str, detail: &str) -> Json {
    json!({
        "scanType": "ALL",
        "eventSource": source,
        "eventDetailType": detail,
    })
}

fn aws_encode(state: &DesiredState, wire: &mut Json) {
    let mut triggers = Vec::new();
    if state.value(&"console_sign_in_trigger".into()).as_bool() == Some(true) {
        triggers.push(event_pattern(CONSOLE_SIGN_IN_SOURCE, CONSOLE_SIGN_IN_DETAIL));
    }
    if state.value(&"instance_state_change_trigger".into()).as_bool() == Some(true) {
        triggers.push(event_pattern(INSTANCE_STATE_SOURCE, INSTANCE_STATE_DETAIL));
    }
    wire_set(wire, "scanConfiguration.eventScanTriggers", Json::Array(triggers));

    let use_managed = wire_get(wire, "scanConfiguration.vpcConfiguration.useManagedVpc")
        .and_then(Json::as_bool)
        .unwrap_or(false);
    wire_set(
        wire,
        "scanConfiguration.vpcConfiguration.useDefaultVpc",
        Json::Bool(!use_managed),
    );
}

fn aws_decode(wire: &Json, state: &mut DesiredState) {
    let sources: Vec<&str> = wire_get(wire, "scanConfiguration.eventScanTriggers")
        .and_then(Json::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.get("eventSource").and_then(Json::as_str))
                .collect()
        })
        .unwrap_or_default();

    state.set(
        &AttributePath::parse("console_sign_in_trigger"),
        Value::Bool(sources.contains(&CONSOLE_SIGN_IN_SOURCE)),
    );
    state.set(
        &AttributePath::parse("instance_state_change_trigger"),
        Value::Bool(sources.contains(&INSTANCE_STATE_SOURCE)),
    );
}

// ============================================================================
// Cloud tenants
// ============================================================================

static AZURE: VariantTable = VariantTable {
    kind: IntegrationKind::Azure,
    fields: &[
        field("tenant_id", "tenantId", Codec::Str),
        field("client_id", "clientId", Codec::Str),
        field("subscription_allow_list", "subscriptionsAllowlist", Codec::List),
        field("subscription_deny_list", "subscriptionsDenylist", Codec::List),
        field("scan_vms", "scanVms", Codec::Bool),
        field("credentials.pem_file", "certificate", Codec::Secret),
    ],
    encode_hook: None,
    decode_hook: None,
};

static GCP: VariantTable = VariantTable {
    kind: IntegrationKind::Gcp,
    fields: &[
        field("project_id", "projectId", Codec::Str),
        field("organization_id", "organizationId", Codec::Str),
        field("credentials.private_key", "serviceAccount", Codec::Secret),
    ],
    encode_hook: Some(gcp_encode),
    decode_hook: None,
};

fn gcp_encode(_state: &DesiredState, wire: &mut Json) {
    wire_set(wire, "discoverAll", Json::Bool(true));
}

static MS365: VariantTable = VariantTable {
    kind: IntegrationKind::Ms365,
    fields: &[
        field("tenant_id", "tenantId", Codec::Str),
        field("client_id", "clientId", Codec::Str),
        field("credentials.pem_file", "certificate", Codec::Secret),
    ],
    encode_hook: None,
    decode_hook: None,
};

// ============================================================================
// Endpoint security
// ============================================================================

static SENTINEL_ONE: VariantTable = VariantTable {
    kind: IntegrationKind::SentinelOne,
    fields: &[
        field("host", "host", Codec::Str),
        field("account", "account", Codec::Str),
    ],
    encode_hook: Some(sentinel_one_encode),
    decode_hook: None,
};

/// The certificate wins whenever it is non-empty; the client secret is the
/// fallback. Only one of the two is ever sent.
fn sentinel_one_encode(state: &DesiredState, wire: &mut Json) {
    let pem = state.get_str("credentials.pem_file").unwrap_or_default();
    let secret = state.get_str("credentials.client_secret").unwrap_or_default();
    if !pem.is_empty() {
        wire_set(wire, "certificate", Json::String(pem.to_string()));
    } else if !secret.is_empty() {
        wire_set(wire, "clientSecret", Json::String(secret.to_string()));
    }
}

static CROWD_STRIKE: VariantTable = VariantTable {
    kind: IntegrationKind::CrowdStrike,
    fields: &[
        field("client_id", "clientId", Codec::Str),
        field("base_url", "cloud", Codec::Str),
        field("customer_id", "memberCID", Codec::Str),
        field("create_assets", "createAssets", Codec::TriBool),
        field("credentials.client_secret", "clientSecret", Codec::Secret),
    ],
    encode_hook: None,
    decode_hook: None,
};
