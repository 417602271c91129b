//! Cross-field validation run before any remote call.
//!
//! Every rule of a [`ValidatorSet`] runs and all violations are collected,
//! so a user sees every problem with a declaration at once.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::schema::catalog::MAX_NAME_LENGTH;
use crate::schema::ResourceKind;
use crate::state::{AttributePath, DesiredState};

static RE_GUID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$").unwrap()
});

static RE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://[a-zA-Z0-9\-._~:/?#\[\]@!$&'()*+,;=%]+$").unwrap()
});

static RE_CATALOG_TYPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(ALL|POLICY|QUERYPACK)$").unwrap());

/// A problem with a declaration, tied to the attribute that caused it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub path: AttributePath,
    pub message: String,
}

impl Violation {
    pub fn new(path: AttributePath, message: impl Into<String>) -> Self {
        Self {
            path,
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            f.write_str(&self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// A single declarative check.
#[derive(Debug, Clone)]
pub enum Rule {
    /// `a` and `b` may not both be set. With `require_one`, one of them must be.
    MutuallyExclusive {
        a: AttributePath,
        b: AttributePath,
        require_one: bool,
    },
    /// `a` and `b` may not carry the same value.
    NotEqual { a: AttributePath, b: AttributePath },
    /// `field` must be set whenever `when` is set.
    ConditionalRequired {
        when: AttributePath,
        field: AttributePath,
    },
    ExactlyOneOf { a: AttributePath, b: AttributePath },
    MaxLength { field: AttributePath, max: usize },
    /// A set string value must match `pattern`.
    Matches {
        field: AttributePath,
        pattern: Regex,
        message: &'static str,
    },
}

impl Rule {
    pub fn mutually_exclusive(a: &str, b: &str) -> Self {
        Rule::MutuallyExclusive {
            a: a.into(),
            b: b.into(),
            require_one: false,
        }
    }

    pub fn one_of_exclusive(a: &str, b: &str) -> Self {
        Rule::MutuallyExclusive {
            a: a.into(),
            b: b.into(),
            require_one: true,
        }
    }

    pub fn not_equal(a: &str, b: &str) -> Self {
        Rule::NotEqual {
            a: a.into(),
            b: b.into(),
        }
    }

    pub fn required_when(when: &str, field: &str) -> Self {
        Rule::ConditionalRequired {
            when: when.into(),
            field: field.into(),
        }
    }

    pub fn exactly_one_of(a: &str, b: &str) -> Self {
        Rule::ExactlyOneOf {
            a: a.into(),
            b: b.into(),
        }
    }

    pub fn max_length(field: &str, max: usize) -> Self {
        Rule::MaxLength {
            field: field.into(),
            max,
        }
    }

    pub fn matches(field: &str, pattern: &Regex, message: &'static str) -> Self {
        Rule::Matches {
            field: field.into(),
            pattern: pattern.clone(),
            message,
        }
    }

    fn check(&self, state: &DesiredState, out: &mut Vec<Violation>) {
        match self {
            Rule::MutuallyExclusive { a, b, require_one } => {
                let (a_set, b_set) = (state.value(a).is_set(), state.value(b).is_set());
                if a_set && b_set {
                    out.push(Violation::new(a.clone(), format!("conflicts with {}", b)));
                } else if *require_one && !a_set && !b_set {
                    out.push(Violation::new(
                        a.clone(),
                        format!("one of {} or {} must be set", a, b),
                    ));
                }
            }
            Rule::NotEqual { a, b } => {
                let (left, right) = (state.value(a), state.value(b));
                if left.is_set() && right.is_set() && left == right {
                    out.push(Violation::new(a.clone(), format!("must not equal {}", b)));
                }
            }
            Rule::ConditionalRequired { when, field } => {
                if state.value(when).is_set() && !state.value(field).is_set() {
                    out.push(Violation::new(
                        field.clone(),
                        format!("is required when {} is set", when),
                    ));
                }
            }
            Rule::ExactlyOneOf { a, b } => {
                match (state.value(a).is_set(), state.value(b).is_set()) {
                    (true, true) => {
                        out.push(Violation::new(a.clone(), format!("conflicts with {}", b)))
                    }
                    (false, false) => out.push(Violation::new(
                        a.clone(),
                        format!("exactly one of {} or {} must be set", a, b),
                    )),
                    _ => {}
                }
            }
            Rule::MaxLength { field, max } => {
                if let Some(value) = state.value(field).as_str() {
                    let length = value.chars().count();
                    if length > *max {
                        out.push(Violation::new(
                            field.clone(),
                            format!("must be at most {} characters, got {}", max, length),
                        ));
                    }
                }
            }
            Rule::Matches {
                field,
                pattern,
                message,
            } => {
                if let Some(value) = state.value(field).as_str() {
                    if !value.is_empty() && !pattern.is_match(value) {
                        out.push(Violation::new(field.clone(), *message));
                    }
                }
            }
        }
    }
}

/// The rules declared for one resource kind.
#[derive(Debug, Clone, Default)]
pub struct ValidatorSet {
    rules: Vec<Rule>,
}

impl ValidatorSet {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    pub fn for_kind(kind: ResourceKind) -> Self {
        let name_length = || Rule::max_length("name", MAX_NAME_LENGTH);
        let rules = match kind {
            ResourceKind::AwsServerless => vec![
                Rule::mutually_exclusive("account_ids", "is_organization"),
                Rule::required_when(
                    "scan_configuration.vpc_configuration.use_managed_vpc",
                    "scan_configuration.vpc_configuration.cidr_block",
                ),
            ],
            ResourceKind::Azure => vec![
                name_length(),
                Rule::matches("client_id", &RE_GUID, "Client ID must be a valid GUID."),
                Rule::matches("tenant_id", &RE_GUID, "Tenant ID must be a valid GUID."),
                Rule::not_equal("client_id", "tenant_id"),
                Rule::mutually_exclusive("subscription_allow_list", "subscription_deny_list"),
            ],
            ResourceKind::Gcp => vec![
                name_length(),
                Rule::exactly_one_of("project_id", "organization_id"),
            ],
            ResourceKind::Ms365 => vec![name_length()],
            ResourceKind::SentinelOne => vec![
                name_length(),
                Rule::one_of_exclusive("credentials.pem_file", "credentials.client_secret"),
            ],
            ResourceKind::CrowdStrike => vec![
                name_length(),
                Rule::matches("base_url", &RE_URL, "must be a valid URL"),
            ],
            ResourceKind::Policy => vec![
                Rule::exactly_one_of("space_id", "space_mrn"),
                Rule::matches(
                    "catalog_type",
                    &RE_CATALOG_TYPE,
                    "must be one of ALL, POLICY, QUERYPACK",
                ),
            ],
            ResourceKind::Space | ResourceKind::CustomFramework => Vec::new(),
        };
        Self::new(rules)
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Runs every rule and returns all violations found.
    pub fn validate(&self, state: &DesiredState) -> Vec<Violation> {
        let mut violations = Vec::new();
        for rule in &self.rules {
            rule.check(state, &mut violations);
        }
        violations
    }
}
