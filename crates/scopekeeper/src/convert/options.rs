//! Wire-side configuration payloads, one struct per integration kind.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::client::IntegrationKind;
use crate::state::Credential;

/// Configuration payload sent to and returned by the remote service.
/// Exactly one variant is populated, matching the integration kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConfigurationOptions {
    #[serde(rename = "awsConfigurationOptions")]
    Aws(AwsOptions),
    #[serde(rename = "azureConfigurationOptions")]
    Azure(AzureOptions),
    #[serde(rename = "gcpConfigurationOptions")]
    Gcp(GcpOptions),
    #[serde(rename = "ms365ConfigurationOptions")]
    Ms365(Ms365Options),
    #[serde(rename = "sentinelOneConfigurationOptions")]
    SentinelOne(SentinelOneOptions),
    #[serde(rename = "crowdstrikeFalconConfigurationOptions")]
    CrowdStrike(CrowdStrikeOptions),
}

impl ConfigurationOptions {
    pub fn kind(&self) -> IntegrationKind {
        match self {
            ConfigurationOptions::Aws(_) => IntegrationKind::Aws,
            ConfigurationOptions::Azure(_) => IntegrationKind::Azure,
            ConfigurationOptions::Gcp(_) => IntegrationKind::Gcp,
            ConfigurationOptions::Ms365(_) => IntegrationKind::Ms365,
            ConfigurationOptions::SentinelOne(_) => IntegrationKind::SentinelOne,
            ConfigurationOptions::CrowdStrike(_) => IntegrationKind::CrowdStrike,
        }
    }

    /// Drops every credential. The service never returns them.
    pub fn without_credentials(&self) -> Self {
        let mut stripped = self.clone();
        match &mut stripped {
            ConfigurationOptions::Aws(_) => {}
            ConfigurationOptions::Azure(opts) => opts.certificate = None,
            ConfigurationOptions::Gcp(opts) => opts.service_account = None,
            ConfigurationOptions::Ms365(opts) => opts.certificate = None,
            ConfigurationOptions::SentinelOne(opts) => {
                opts.certificate = None;
                opts.client_secret = None;
            }
            ConfigurationOptions::CrowdStrike(opts) => opts.client_secret = None,
        }
        stripped
    }
}

// ============================================================================
// AWS
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AwsOptions {
    pub region: String,

    #[serde(rename = "accountIDs")]
    pub account_ids: Vec<String>,

    pub is_organization: bool,

    pub scan_configuration: ScanConfiguration,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScanConfiguration {
    pub ec2_scan: bool,
    pub ecr_scan: bool,
    pub ecs_scan: bool,

    #[serde(rename = "cronScaninHours")]
    pub cron_scan_in_hours: i64,

    /// CloudTrail/EventBridge patterns that trigger a scan.
    pub event_scan_triggers: Vec<EventPattern>,

    pub vpc_configuration: VpcConfiguration,

    pub ec2_scan_options: Ec2ScanOptions,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPattern {
    pub scan_type: String,
    pub event_source: String,
    pub event_detail_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VpcConfiguration {
    pub use_managed_vpc: bool,
    /// Always the negation of `use_managed_vpc`.
    pub use_default_vpc: bool,
    pub cidr_block: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Ec2ScanOptions {
    pub ssm: bool,

    #[serde(rename = "instanceIDsFilter")]
    pub instance_ids_filter: Vec<String>,

    pub regions_filter: Vec<String>,

    pub tags_filter: BTreeMap<String, String>,

    #[serde(rename = "excludedInstanceIDsFilter")]
    pub excluded_instance_ids_filter: Vec<String>,

    pub excluded_regions_filter: Vec<String>,

    pub excluded_tags_filter: BTreeMap<String, String>,

    pub ebs_volume_scan: bool,

    pub ebs_scan_options: EbsScanOptions,

    pub instance_connect: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EbsScanOptions {
    pub target_instances_per_scanner: i64,
    pub max_asg_instances: i64,
}

// ============================================================================
// Azure / MS365
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AzureOptions {
    pub tenant_id: String,
    pub client_id: String,
    pub subscriptions_allowlist: Vec<String>,
    pub subscriptions_denylist: Vec<String>,
    pub scan_vms: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate: Option<Credential>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Ms365Options {
    pub tenant_id: String,
    pub client_id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate: Option<Credential>,
}

// ============================================================================
// GCP
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GcpOptions {
    pub project_id: String,
    pub organization_id: String,

    /// Service account key (JSON).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_account: Option<Credential>,

    pub discover_all: bool,
}

// ============================================================================
// Endpoint security
// ============================================================================

/// At most one of `certificate` and `client_secret` is sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SentinelOneOptions {
    pub host: String,
    pub account: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate: Option<Credential>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<Credential>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CrowdStrikeOptions {
    pub client_id: String,

    /// API base URL.
    pub cloud: String,

    #[serde(rename = "memberCID")]
    pub member_cid: String,

    /// Unset leaves the service default in place.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_assets: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<Credential>,
}
