//! Desired-state tree for a single resource instance.
//!
//! A [`DesiredState`] is a named-field tree of [`Value`]s. `Null` (not
//! configured) and `Unknown` (known only after apply) are distinct from
//! empty containers, which is what lets the schema layer tell "omitted"
//! apart from "explicitly empty".

use std::collections::BTreeMap;
use std::fmt;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Named fields of one level of the tree.
pub type Fields = BTreeMap<String, Value>;

/// A single node in the desired-state tree.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Unknown,
    Bool(bool),
    Int(i64),
    String(String),
    /// Write-only value. Never produced by a remote read.
    Secret(Credential),
    /// Ordered string sequence.
    List(Vec<String>),
    /// String-keyed string mapping.
    Map(BTreeMap<String, String>),
    Object(Fields),
    /// Sequence of nested objects (computed listings only).
    Objects(Vec<Fields>),
}

impl Value {
    pub fn string(value: impl Into<String>) -> Self {
        Value::String(value.into())
    }

    pub fn list<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Value::List(items.into_iter().map(Into::into).collect())
    }

    pub fn map<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Value::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns true if the value carries a meaningful setting: not null or
    /// unknown, not an empty string or container, and not `false`.
    pub fn is_set(&self) -> bool {
        match self {
            Value::Null | Value::Unknown => false,
            Value::Bool(b) => *b,
            Value::Int(_) => true,
            Value::String(s) => !s.is_empty(),
            Value::Secret(c) => !c.is_empty(),
            Value::List(items) => !items.is_empty(),
            Value::Map(entries) => !entries.is_empty(),
            Value::Object(_) => true,
            Value::Objects(items) => !items.is_empty(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            Value::Secret(c) => Some(c.expose()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Fields> {
        match self {
            Value::Object(fields) => Some(fields),
            _ => None,
        }
    }

    /// Short type name used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Unknown => "unknown",
            Value::Bool(_) => "bool",
            Value::Int(_) => "integer",
            Value::String(_) => "string",
            Value::Secret(_) => "sensitive string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Object(_) => "object",
            Value::Objects(_) => "object list",
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

/// A write-only sensitive value (certificate, client secret, private key).
///
/// `Debug` is redacted. Serialization exposes the value and is only used
/// when building outgoing requests.
#[derive(Clone)]
pub struct Credential(SecretString);

impl Credential {
    pub fn new(value: impl Into<String>) -> Self {
        Self(SecretString::from(value.into()))
    }

    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    pub fn is_empty(&self) -> bool {
        self.0.expose_secret().is_empty()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential([REDACTED])")
    }
}

impl PartialEq for Credential {
    fn eq(&self, other: &Self) -> bool {
        self.expose() == other.expose()
    }
}

impl Serialize for Credential {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.expose())
    }
}

impl<'de> Deserialize<'de> for Credential {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Credential::new)
    }
}

/// A dotted path to an attribute, e.g. `credentials.pem_file`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AttributePath(Vec<String>);

impl AttributePath {
    pub fn root(name: impl Into<String>) -> Self {
        Self(vec![name.into()])
    }

    /// Parses a dotted path. Empty segments are dropped.
    pub fn parse(path: &str) -> Self {
        Self(
            path.split('.')
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    pub fn child(&self, name: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(name.into());
        Self(segments)
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for AttributePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

impl From<&str> for AttributePath {
    fn from(path: &str) -> Self {
        AttributePath::parse(path)
    }
}

/// The declared (or reconciled) configuration of one resource instance.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DesiredState {
    fields: Fields,
}

impl DesiredState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fields(fields: Fields) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn into_fields(self) -> Fields {
        self.fields
    }

    /// Builder-style setter for a dotted path.
    pub fn with(mut self, path: &str, value: impl Into<Value>) -> Self {
        self.set(&AttributePath::parse(path), value.into());
        self
    }

    /// Looks up a value; missing paths and non-object intermediates yield `None`.
    pub fn get(&self, path: &AttributePath) -> Option<&Value> {
        let (last, parents) = path.segments().split_last()?;
        let mut level = &self.fields;
        for segment in parents {
            level = level.get(segment)?.as_object()?;
        }
        level.get(last)
    }

    /// Looks up a value, treating a missing path as `Null`.
    pub fn value(&self, path: &AttributePath) -> &Value {
        static NULL: Value = Value::Null;
        self.get(path).unwrap_or(&NULL)
    }

    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(&AttributePath::parse(path)).and_then(Value::as_str)
    }

    /// Sets a value, creating intermediate objects as needed. A non-object
    /// intermediate is replaced by an object.
    pub fn set(&mut self, path: &AttributePath, value: Value) {
        let Some((last, parents)) = path.segments().split_last() else {
            return;
        };
        let mut level = &mut self.fields;
        for segment in parents {
            let slot = level
                .entry(segment.clone())
                .or_insert_with(|| Value::Object(Fields::new()));
            if !matches!(slot, Value::Object(_)) {
                *slot = Value::Object(Fields::new());
            }
            let Value::Object(fields) = slot else {
                return;
            };
            level = fields;
        }
        level.insert(last.clone(), value);
    }

    pub fn remove(&mut self, path: &AttributePath) -> Option<Value> {
        let (last, parents) = path.segments().split_last()?;
        let mut level = &mut self.fields;
        for segment in parents {
            level = match level.get_mut(segment)? {
                Value::Object(fields) => fields,
                _ => return None,
            };
        }
        level.remove(last)
    }
}
