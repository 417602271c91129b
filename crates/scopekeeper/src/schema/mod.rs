//! Attribute schemas: the shape, defaults and sensitivity of each resource kind.
//!
//! A [`ResourceSchema`] turns what the user wrote into a fully resolved
//! [`DesiredState`]: omitted lists and maps become empty containers, omitted
//! optional objects become their canonical default sub-tree, and scalar
//! defaults are filled in. Optional scalars without a default stay `Null`,
//! which is how tri-state booleans are kept.

pub mod catalog;

pub use catalog::ResourceKind;

use crate::state::{AttributePath, Credential, DesiredState, Fields, Value};
use crate::validation::Violation;

/// The type of an attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeKind {
    String,
    Bool,
    Int,
    /// Ordered sequence of strings.
    List,
    /// String-keyed string mapping.
    Map,
    /// Nested object with its own attributes.
    Object(Vec<AttributeSchema>),
    /// Sequence of nested objects.
    Objects(Vec<AttributeSchema>),
}

impl AttributeKind {
    fn name(&self) -> &'static str {
        match self {
            AttributeKind::String => "string",
            AttributeKind::Bool => "bool",
            AttributeKind::Int => "integer",
            AttributeKind::List => "list",
            AttributeKind::Map => "map",
            AttributeKind::Object(_) => "object",
            AttributeKind::Objects(_) => "object list",
        }
    }
}

/// Who provides an attribute's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Required,
    Optional,
    /// User may set it; otherwise the service fills it in.
    OptionalComputed,
    /// Only ever set by the service.
    Computed,
}

/// Whether computed attributes may already carry values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Create,
    Update,
}

/// Declaration of one attribute.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeSchema {
    pub name: &'static str,
    pub kind: AttributeKind,
    pub presence: Presence,
    pub default: Option<Value>,
    pub sensitive: bool,
    pub deprecated: Option<&'static str>,
    pub description: &'static str,
}

impl AttributeSchema {
    fn new(name: &'static str, kind: AttributeKind) -> Self {
        Self {
            name,
            kind,
            presence: Presence::Optional,
            default: None,
            sensitive: false,
            deprecated: None,
            description: "",
        }
    }

    pub fn string(name: &'static str) -> Self {
        Self::new(name, AttributeKind::String)
    }

    pub fn bool(name: &'static str) -> Self {
        Self::new(name, AttributeKind::Bool)
    }

    pub fn int(name: &'static str) -> Self {
        Self::new(name, AttributeKind::Int)
    }

    pub fn list(name: &'static str) -> Self {
        Self::new(name, AttributeKind::List)
    }

    pub fn map(name: &'static str) -> Self {
        Self::new(name, AttributeKind::Map)
    }

    pub fn object(name: &'static str, attributes: Vec<AttributeSchema>) -> Self {
        Self::new(name, AttributeKind::Object(attributes))
    }

    pub fn objects(name: &'static str, attributes: Vec<AttributeSchema>) -> Self {
        Self::new(name, AttributeKind::Objects(attributes))
    }

    pub fn required(mut self) -> Self {
        self.presence = Presence::Required;
        self
    }

    pub fn optional_computed(mut self) -> Self {
        self.presence = Presence::OptionalComputed;
        self
    }

    pub fn computed(mut self) -> Self {
        self.presence = Presence::Computed;
        self
    }

    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub fn deprecated(mut self, note: &'static str) -> Self {
        self.deprecated = Some(note);
        self
    }

    pub fn describe(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    /// Nested attributes of an object attribute.
    pub fn children(&self) -> &[AttributeSchema] {
        match &self.kind {
            AttributeKind::Object(children) | AttributeKind::Objects(children) => children,
            _ => &[],
        }
    }

    fn resolve_given(&self, value: &Value, expand_all: bool) -> Value {
        match (&self.kind, value) {
            (AttributeKind::Object(children), Value::Object(fields)) => {
                Value::Object(resolve_level(children, fields, expand_all))
            }
            (AttributeKind::String, Value::String(s)) if self.sensitive => {
                Value::Secret(Credential::new(s.as_str()))
            }
            _ => value.clone(),
        }
    }

    fn resolve_absent(&self, expand_all: bool) -> Value {
        if self.presence == Presence::Computed {
            return Value::Null;
        }
        match &self.kind {
            AttributeKind::Object(children) => {
                if self.presence == Presence::Required && !expand_all {
                    Value::Null
                } else {
                    Value::Object(resolve_level(children, &Fields::new(), expand_all))
                }
            }
            _ if self.presence == Presence::Required => Value::Null,
            AttributeKind::List => self.default.clone().unwrap_or(Value::List(Vec::new())),
            AttributeKind::Map => self.default.clone().unwrap_or(Value::Map(Default::default())),
            _ => self.default.clone().unwrap_or(Value::Null),
        }
    }
}

/// The attribute set of one resource kind.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceSchema {
    kind: ResourceKind,
    attributes: Vec<AttributeSchema>,
}

impl ResourceSchema {
    pub fn new(kind: ResourceKind, attributes: Vec<AttributeSchema>) -> Self {
        Self { kind, attributes }
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn attributes(&self) -> &[AttributeSchema] {
        &self.attributes
    }

    /// Finds the declaration for a dotted path.
    pub fn attribute(&self, path: &AttributePath) -> Option<&AttributeSchema> {
        let mut level = self.attributes.as_slice();
        let mut found = None;
        for segment in path.segments() {
            let attr = level.iter().find(|a| a.name == segment.as_str())?;
            level = attr.children();
            found = Some(attr);
        }
        found
    }

    /// Paths of every sensitive attribute.
    pub fn sensitive_paths(&self) -> Vec<AttributePath> {
        let mut paths = Vec::new();
        collect_sensitive(&self.attributes, &AttributePath::default(), &mut paths);
        paths
    }

    /// Fills in defaults and empty containers for everything the user omitted.
    pub fn resolve(&self, state: &DesiredState) -> DesiredState {
        DesiredState::from_fields(resolve_level(&self.attributes, state.fields(), false))
    }

    /// The tree schema defaults alone produce. Required scalars stay `Null`.
    pub fn canonical_default(&self) -> DesiredState {
        DesiredState::from_fields(resolve_level(&self.attributes, &Fields::new(), true))
    }

    /// Reports missing required attributes, unsupported attributes, and, on
    /// create, computed attributes the user tried to set.
    pub fn check_presence(&self, state: &DesiredState, phase: Phase) -> Vec<Violation> {
        let mut violations = Vec::new();
        check_level(
            &self.attributes,
            state.fields(),
            &AttributePath::default(),
            phase,
            &mut violations,
        );
        violations
    }

    /// Copy of `state` with every sensitive value withheld.
    pub fn redact(&self, state: &DesiredState) -> DesiredState {
        let mut redacted = state.clone();
        for path in self.sensitive_paths() {
            if redacted.get(&path).is_some() {
                redacted.set(&path, Value::Null);
            }
        }
        redacted
    }

    /// Builds a desired state from a YAML mapping, checking attribute names
    /// and value types. All problems are reported together.
    pub fn decode(&self, spec: &serde_yaml::Value) -> Result<DesiredState, Vec<Violation>> {
        let mut violations = Vec::new();
        let fields = match spec {
            serde_yaml::Value::Null => Fields::new(),
            serde_yaml::Value::Mapping(mapping) => decode_level(
                &self.attributes,
                mapping,
                &AttributePath::default(),
                &mut violations,
            ),
            other => {
                violations.push(Violation::new(
                    AttributePath::default(),
                    format!("expected a mapping, found {}", yaml_type(other)),
                ));
                Fields::new()
            }
        };

        if violations.is_empty() {
            Ok(DesiredState::from_fields(fields))
        } else {
            Err(violations)
        }
    }
}

fn resolve_level(attributes: &[AttributeSchema], given: &Fields, expand_all: bool) -> Fields {
    let mut resolved = Fields::new();
    for attr in attributes {
        let value = match given.get(attr.name).filter(|v| !v.is_null()) {
            Some(value) => attr.resolve_given(value, expand_all),
            None => attr.resolve_absent(expand_all),
        };
        resolved.insert(attr.name.to_string(), value);
    }
    // Undeclared keys are kept so presence checks can report them.
    for (key, value) in given {
        if !resolved.contains_key(key) {
            resolved.insert(key.clone(), value.clone());
        }
    }
    resolved
}

fn collect_sensitive(
    attributes: &[AttributeSchema],
    prefix: &AttributePath,
    out: &mut Vec<AttributePath>,
) {
    for attr in attributes {
        let path = prefix.child(attr.name);
        if attr.sensitive {
            out.push(path.clone());
        }
        if let AttributeKind::Object(children) = &attr.kind {
            collect_sensitive(children, &path, out);
        }
    }
}

fn check_level(
    attributes: &[AttributeSchema],
    fields: &Fields,
    prefix: &AttributePath,
    phase: Phase,
    out: &mut Vec<Violation>,
) {
    let null = Value::Null;
    for attr in attributes {
        let path = prefix.child(attr.name);
        let value = fields.get(attr.name).unwrap_or(&null);
        let absent = matches!(value, Value::Null | Value::Unknown);

        match attr.presence {
            Presence::Computed if phase == Phase::Create && !absent => {
                out.push(Violation::new(path.clone(), "is computed and cannot be configured"));
            }
            Presence::Required if absent => {
                out.push(Violation::new(path.clone(), "is required"));
            }
            _ => {}
        }

        if let (AttributeKind::Object(children), Value::Object(nested)) = (&attr.kind, value) {
            check_level(children, nested, &path, phase, out);
        }
    }

    for key in fields.keys() {
        if !attributes.iter().any(|a| a.name == key.as_str()) {
            out.push(Violation::new(prefix.child(key.as_str()), "is not a supported attribute"));
        }
    }
}

fn decode_level(
    attributes: &[AttributeSchema],
    mapping: &serde_yaml::Mapping,
    prefix: &AttributePath,
    out: &mut Vec<Violation>,
) -> Fields {
    let mut fields = Fields::new();
    for (key, raw) in mapping {
        let Some(key) = key.as_str() else {
            out.push(Violation::new(
                prefix.clone(),
                format!("attribute names must be strings, found {}", yaml_type(key)),
            ));
            continue;
        };
        let path = prefix.child(key);
        let Some(attr) = attributes.iter().find(|a| a.name == key) else {
            out.push(Violation::new(path, "is not a supported attribute"));
            continue;
        };
        if let Some(value) = decode_value(attr, raw, &path, out) {
            fields.insert(key.to_string(), value);
        }
    }
    fields
}

fn decode_value(
    attr: &AttributeSchema,
    raw: &serde_yaml::Value,
    path: &AttributePath,
    out: &mut Vec<Violation>,
) -> Option<Value> {
    use serde_yaml::Value as Yaml;

    if raw.is_null() {
        return Some(Value::Null);
    }

    let decoded = match (&attr.kind, raw) {
        (AttributeKind::String, _) => scalar_to_string(raw).map(Value::String),
        (AttributeKind::Bool, Yaml::Bool(b)) => Some(Value::Bool(*b)),
        (AttributeKind::Int, Yaml::Number(n)) => n.as_i64().map(Value::Int),
        (AttributeKind::List, Yaml::Sequence(items)) => items
            .iter()
            .map(scalar_to_string)
            .collect::<Option<Vec<_>>>()
            .map(Value::List),
        (AttributeKind::Map, Yaml::Mapping(entries)) => entries
            .iter()
            .map(|(k, v)| Some((scalar_to_string(k)?, scalar_to_string(v)?)))
            .collect::<Option<_>>()
            .map(Value::Map),
        (AttributeKind::Object(children), Yaml::Mapping(mapping)) => {
            Some(Value::Object(decode_level(children, mapping, path, out)))
        }
        (AttributeKind::Objects(children), Yaml::Sequence(items)) => {
            let mut objects = Vec::with_capacity(items.len());
            for item in items {
                let Yaml::Mapping(mapping) = item else {
                    out.push(Violation::new(path.clone(), "expected a list of mappings"));
                    return None;
                };
                objects.push(decode_level(children, mapping, path, out));
            }
            Some(Value::Objects(objects))
        }
        _ => None,
    };

    if decoded.is_none() {
        out.push(Violation::new(
            path.clone(),
            format!("expected {}, found {}", attr.kind.name(), yaml_type(raw)),
        ));
    }
    decoded
}

fn scalar_to_string(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn yaml_type(value: &serde_yaml::Value) -> &'static str {
    match value {
        serde_yaml::Value::Null => "null",
        serde_yaml::Value::Bool(_) => "bool",
        serde_yaml::Value::Number(_) => "number",
        serde_yaml::Value::String(_) => "string",
        serde_yaml::Value::Sequence(_) => "sequence",
        serde_yaml::Value::Mapping(_) => "mapping",
        serde_yaml::Value::Tagged(_) => "tagged value",
    }
}
