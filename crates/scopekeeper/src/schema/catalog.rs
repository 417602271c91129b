//! Resource kinds and their attribute schemas.

use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use super::{AttributeSchema, ResourceSchema};
use crate::state::Value;

/// The kind of declared resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceKind {
    Space,
    CustomFramework,
    #[serde(rename = "AwsServerlessIntegration")]
    AwsServerless,
    #[serde(rename = "AzureIntegration")]
    Azure,
    #[serde(rename = "GcpIntegration")]
    Gcp,
    #[serde(rename = "Ms365Integration")]
    Ms365,
    #[serde(rename = "SentinelOneIntegration")]
    SentinelOne,
    #[serde(rename = "CrowdStrikeIntegration")]
    CrowdStrike,
    #[serde(rename = "PolicyListing")]
    Policy,
}

impl ResourceKind {
    /// Returns all resource kinds.
    pub fn all() -> &'static [ResourceKind] {
        &[
            ResourceKind::Space,
            ResourceKind::CustomFramework,
            ResourceKind::AwsServerless,
            ResourceKind::Azure,
            ResourceKind::Gcp,
            ResourceKind::Ms365,
            ResourceKind::SentinelOne,
            ResourceKind::CrowdStrike,
            ResourceKind::Policy,
        ]
    }

    /// The integration kinds, in declaration order.
    pub fn integrations() -> &'static [ResourceKind] {
        &ResourceKind::all()[2..8]
    }

    /// Snake-case type name, e.g. `integration_azure`.
    pub fn type_name(&self) -> &'static str {
        match self {
            ResourceKind::Space => "space",
            ResourceKind::CustomFramework => "custom_framework",
            ResourceKind::AwsServerless => "integration_aws_serverless",
            ResourceKind::Azure => "integration_azure",
            ResourceKind::Gcp => "integration_gcp",
            ResourceKind::Ms365 => "integration_ms365",
            ResourceKind::SentinelOne => "integration_sentinelone",
            ResourceKind::CrowdStrike => "integration_crowdstrike",
            ResourceKind::Policy => "policy",
        }
    }

    pub fn is_integration(&self) -> bool {
        ResourceKind::integrations().contains(self)
    }

    pub fn schema(&self) -> &'static ResourceSchema {
        match self {
            ResourceKind::Space => &SPACE,
            ResourceKind::CustomFramework => &CUSTOM_FRAMEWORK,
            ResourceKind::AwsServerless => &AWS_SERVERLESS,
            ResourceKind::Azure => &AZURE,
            ResourceKind::Gcp => &GCP,
            ResourceKind::Ms365 => &MS365,
            ResourceKind::SentinelOne => &SENTINEL_ONE,
            ResourceKind::CrowdStrike => &CROWD_STRIKE,
            ResourceKind::Policy => &POLICY,
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceKind::Space => write!(f, "Space"),
            ResourceKind::CustomFramework => write!(f, "CustomFramework"),
            ResourceKind::AwsServerless => write!(f, "AwsServerlessIntegration"),
            ResourceKind::Azure => write!(f, "AzureIntegration"),
            ResourceKind::Gcp => write!(f, "GcpIntegration"),
            ResourceKind::Ms365 => write!(f, "Ms365Integration"),
            ResourceKind::SentinelOne => write!(f, "SentinelOneIntegration"),
            ResourceKind::CrowdStrike => write!(f, "CrowdStrikeIntegration"),
            ResourceKind::Policy => write!(f, "PolicyListing"),
        }
    }
}

impl std::str::FromStr for ResourceKind {
    type Err = String;

    /// Accepts both the manifest kind (`AzureIntegration`) and the type
    /// name (`integration_azure`), case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.to_lowercase();
        ResourceKind::all()
            .iter()
            .copied()
            .find(|kind| kind.to_string().to_lowercase() == wanted || kind.type_name() == wanted)
            .ok_or_else(|| format!("Unknown resource kind: {}", s))
    }
}

/// Longest accepted integration name.
pub const MAX_NAME_LENGTH: usize = 250;

/// Default CIDR block for a managed scanner VPC.
pub const DEFAULT_VPC_CIDR: &str = "10.0.0.0/24";

fn integration_base() -> Vec<AttributeSchema> {
    vec![
        AttributeSchema::string("space_id")
            .optional_computed()
            .describe("Space the integration belongs to. Falls back to the configured default space."),
        AttributeSchema::string("mrn").computed(),
        AttributeSchema::string("name")
            .required()
            .describe("Display name of the integration."),
    ]
}

fn integration(extra: Vec<AttributeSchema>) -> Vec<AttributeSchema> {
    let mut attributes = integration_base();
    attributes.extend(extra);
    attributes
}

static SPACE: LazyLock<ResourceSchema> = LazyLock::new(|| {
    ResourceSchema::new(
        ResourceKind::Space,
        vec![
            AttributeSchema::string("name").describe("Name of the space."),
            AttributeSchema::string("id").computed(),
            AttributeSchema::string("org_id")
                .required()
                .describe("Organization that owns the space."),
        ],
    )
});

static CUSTOM_FRAMEWORK: LazyLock<ResourceSchema> = LazyLock::new(|| {
    ResourceSchema::new(
        ResourceKind::CustomFramework,
        vec![
            AttributeSchema::string("space_id").required(),
            AttributeSchema::string("mrn").computed(),
            AttributeSchema::string("data_url")
                .required()
                .describe("Location of the framework YAML: a local path or an http(s) URL."),
        ],
    )
});

fn ec2_scan_options() -> AttributeSchema {
    AttributeSchema::object(
        "ec2_scan_options",
        vec![
            AttributeSchema::bool("ssm").default(false),
            AttributeSchema::list("instance_ids_filter"),
            AttributeSchema::list("regions_filter"),
            AttributeSchema::map("tags_filter"),
            AttributeSchema::list("exclude_instance_ids_filter"),
            AttributeSchema::list("exclude_regions_filter"),
            AttributeSchema::map("exclude_tags_filter"),
            AttributeSchema::bool("ebs_volume_scan").default(false),
            AttributeSchema::object(
                "ebs_scan_options",
                vec![
                    AttributeSchema::int("target_instances_per_scanner").default(0i64),
                    AttributeSchema::int("max_asg_instances").default(0i64),
                ],
            )
            .deprecated("EBS scan options are no longer honored by the scanner"),
            AttributeSchema::bool("instance_connect").default(false),
        ],
    )
}

static AWS_SERVERLESS: LazyLock<ResourceSchema> = LazyLock::new(|| {
    ResourceSchema::new(
        ResourceKind::AwsServerless,
        integration(vec![
            AttributeSchema::string("token")
                .computed()
                .describe("Registration token, returned once on create."),
            AttributeSchema::string("region").required(),
            AttributeSchema::bool("console_sign_in_trigger").default(false),
            AttributeSchema::bool("instance_state_change_trigger").default(false),
            AttributeSchema::list("account_ids")
                .describe("Accounts to scan. Conflicts with is_organization."),
            AttributeSchema::bool("is_organization").default(false),
            AttributeSchema::object(
                "scan_configuration",
                vec![
                    AttributeSchema::bool("ec2_scan").default(false),
                    AttributeSchema::bool("ecr_scan").default(false),
                    AttributeSchema::bool("ecs_scan").default(false),
                    AttributeSchema::int("cron_scan_in_hours").default(0i64),
                    AttributeSchema::object(
                        "vpc_configuration",
                        vec![
                            AttributeSchema::bool("use_managed_vpc").default(false),
                            AttributeSchema::string("cidr_block")
                                .default(Value::string(DEFAULT_VPC_CIDR)),
                        ],
                    ),
                    ec2_scan_options(),
                ],
            )
            .required(),
        ]),
    )
});

static AZURE: LazyLock<ResourceSchema> = LazyLock::new(|| {
    ResourceSchema::new(
        ResourceKind::Azure,
        integration(vec![
            AttributeSchema::string("client_id").required(),
            AttributeSchema::string("tenant_id").required(),
            AttributeSchema::bool("scan_vms").default(false),
            AttributeSchema::list("subscription_allow_list"),
            AttributeSchema::list("subscription_deny_list"),
            AttributeSchema::object(
                "credentials",
                vec![AttributeSchema::string("pem_file").required().sensitive()],
            )
            .required(),
        ]),
    )
});

static GCP: LazyLock<ResourceSchema> = LazyLock::new(|| {
    ResourceSchema::new(
        ResourceKind::Gcp,
        integration(vec![
            AttributeSchema::string("project_id").default(""),
            AttributeSchema::string("organization_id").default(""),
            AttributeSchema::object(
                "credentials",
                vec![AttributeSchema::string("private_key")
                    .required()
                    .sensitive()
                    .describe("Service account key, JSON encoded.")],
            )
            .required(),
        ]),
    )
});

static MS365: LazyLock<ResourceSchema> = LazyLock::new(|| {
    ResourceSchema::new(
        ResourceKind::Ms365,
        integration(vec![
            AttributeSchema::string("client_id").required(),
            AttributeSchema::string("tenant_id").required(),
            AttributeSchema::object(
                "credentials",
                vec![AttributeSchema::string("pem_file").required().sensitive()],
            )
            .required(),
        ]),
    )
});

static SENTINEL_ONE: LazyLock<ResourceSchema> = LazyLock::new(|| {
    ResourceSchema::new(
        ResourceKind::SentinelOne,
        integration(vec![
            AttributeSchema::string("host").required(),
            AttributeSchema::string("account").required(),
            AttributeSchema::object(
                "credentials",
                vec![
                    AttributeSchema::string("pem_file").sensitive(),
                    AttributeSchema::string("client_secret").sensitive(),
                ],
            )
            .required(),
        ]),
    )
});

static CROWD_STRIKE: LazyLock<ResourceSchema> = LazyLock::new(|| {
    ResourceSchema::new(
        ResourceKind::CrowdStrike,
        integration(vec![
            AttributeSchema::string("client_id").required(),
            AttributeSchema::string("base_url").required(),
            AttributeSchema::string("customer_id").required(),
            AttributeSchema::bool("create_assets")
                .describe("Create assets for discovered hosts. Unset leaves the service default."),
            AttributeSchema::object(
                "credentials",
                vec![AttributeSchema::string("client_secret").required().sensitive()],
            )
            .required(),
        ]),
    )
});

static POLICY: LazyLock<ResourceSchema> = LazyLock::new(|| {
    ResourceSchema::new(
        ResourceKind::Policy,
        vec![
            AttributeSchema::string("space_id"),
            AttributeSchema::string("space_mrn"),
            AttributeSchema::string("catalog_type").default("ALL"),
            AttributeSchema::bool("assigned_only"),
            AttributeSchema::objects(
                "policies",
                vec![
                    AttributeSchema::string("policy_mrn"),
                    AttributeSchema::string("policy_name"),
                    AttributeSchema::bool("assigned"),
                    AttributeSchema::string("action"),
                    AttributeSchema::string("version"),
                    AttributeSchema::bool("is_public"),
                    AttributeSchema::string("created_at"),
                    AttributeSchema::string("updated_at"),
                ],
            )
            .computed(),
        ],
    )
});
