//! Resource names (MRNs) for scopes and the import-identifier grammar.
//!
//! Scope MRNs look like `<authority>/organizations/<id>` or
//! `<authority>/spaces/<id>`. Objects live below a scope:
//!
//! ```text
//! import-id  = [ "//" ] *( segment "/" ) scope-id "/" collection "/" uid
//! segment    = 1*( any char except "/" )
//! ```
//!
//! The UID is always the final segment and the scope id the third from last.
//! When a fourth-from-last segment names a scope kind (`spaces` or
//! `organizations`) it is recorded; otherwise the scope is assumed to be a space.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Default authority of the remote configuration service.
pub const DEFAULT_AUTHORITY: &str = "//captain.api.mondoo.app";

/// Errors raised while parsing identifiers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentifierError {
    #[error("Identifier is empty")]
    Empty,

    #[error("Identifier '{0}' contains an empty path segment")]
    EmptySegment(String),

    #[error("Identifier '{id}' has {found} path segments, expected at least {expected}")]
    TooShort {
        id: String,
        found: usize,
        expected: usize,
    },

    #[error("Identifier '{id}': unknown scope kind '{kind}' (expected 'spaces' or 'organizations')")]
    UnknownScopeKind { id: String, kind: String },

    #[error("Identifier '{id}' names a '{found}' object, expected '{expected}'")]
    WrongCollection {
        id: String,
        expected: &'static str,
        found: String,
    },

    #[error("Identifier '{id}' must be scoped to {expected}")]
    WrongScope { id: String, expected: ScopeKind },

    #[error("Identifier '{id}' names a {found} object, expected {expected}")]
    KindMismatch {
        id: String,
        expected: String,
        found: String,
    },

    #[error("Scope MRN '{mrn}' does not belong to authority '{authority}'")]
    ForeignAuthority { mrn: String, authority: String },
}

/// The kind of namespace an object lives under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeKind {
    Organization,
    Space,
}

impl ScopeKind {
    /// Path segment naming this kind of scope.
    pub fn segment(&self) -> &'static str {
        match self {
            ScopeKind::Organization => "organizations",
            ScopeKind::Space => "spaces",
        }
    }
}

impl FromStr for ScopeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "organizations" => Ok(ScopeKind::Organization),
            "spaces" => Ok(ScopeKind::Space),
            other => Err(other.to_string()),
        }
    }
}

impl fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.segment())
    }
}

/// Builds and recognizes scope MRNs for one authority.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MrnScheme {
    authority: String,
}

impl MrnScheme {
    pub fn new(authority: impl Into<String>) -> Self {
        let authority = authority.into();
        Self {
            authority: authority.trim_end_matches('/').to_string(),
        }
    }

    pub fn authority(&self) -> &str {
        &self.authority
    }

    pub fn scope(&self, kind: ScopeKind, id: &str) -> String {
        format!("{}/{}/{}", self.authority, kind.segment(), id)
    }

    pub fn organization(&self, id: &str) -> String {
        self.scope(ScopeKind::Organization, id)
    }

    pub fn space(&self, id: &str) -> String {
        self.scope(ScopeKind::Space, id)
    }

    /// MRN of the object an import identifier points at, under this authority.
    pub fn object(&self, id: &ImportId) -> String {
        format!(
            "{}/{}/{}",
            self.scope(id.scope_kind(), id.scope_id()),
            id.collection(),
            id.uid()
        )
    }

    /// Splits a scope MRN of this authority into its kind and id.
    pub fn parse_scope(&self, mrn: &str) -> Result<(ScopeKind, String), IdentifierError> {
        let rest = mrn
            .strip_prefix(&self.authority)
            .and_then(|r| r.strip_prefix('/'))
            .ok_or_else(|| IdentifierError::ForeignAuthority {
                mrn: mrn.to_string(),
                authority: self.authority.clone(),
            })?;

        let mut parts = rest.split('/');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(kind), Some(id), None) if !id.is_empty() => {
                let kind = kind
                    .parse::<ScopeKind>()
                    .map_err(|kind| IdentifierError::UnknownScopeKind {
                        id: mrn.to_string(),
                        kind,
                    })?;
                Ok((kind, id.to_string()))
            }
            _ => Err(IdentifierError::TooShort {
                id: mrn.to_string(),
                found: rest.split('/').filter(|s| !s.is_empty()).count(),
                expected: 2,
            }),
        }
    }
}

impl Default for MrnScheme {
    fn default() -> Self {
        Self::new(DEFAULT_AUTHORITY)
    }
}

/// A composite object identifier, as accepted by import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportId {
    raw: String,
    scope_kind: ScopeKind,
    scope_id: String,
    collection: String,
    uid: String,
}

impl ImportId {
    /// Minimum trailing segments: scope id, collection, uid.
    const MIN_SEGMENTS: usize = 3;

    pub fn parse(id: &str) -> Result<Self, IdentifierError> {
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err(IdentifierError::Empty);
        }

        // A leading "//" introduces the authority host and is not a segment.
        let body = trimmed.strip_prefix("//").unwrap_or(trimmed);
        let segments: Vec<&str> = body.split('/').collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(IdentifierError::EmptySegment(trimmed.to_string()));
        }
        if segments.len() < Self::MIN_SEGMENTS {
            return Err(IdentifierError::TooShort {
                id: trimmed.to_string(),
                found: segments.len(),
                expected: Self::MIN_SEGMENTS,
            });
        }

        let n = segments.len();
        let scope_kind = n
            .checked_sub(4)
            .and_then(|i| segments[i].parse::<ScopeKind>().ok())
            .unwrap_or(ScopeKind::Space);

        Ok(Self {
            raw: trimmed.to_string(),
            scope_kind,
            scope_id: segments[n - 3].to_string(),
            collection: segments[n - 2].to_string(),
            uid: segments[n - 1].to_string(),
        })
    }

    /// Fails unless the identifier points into `collection`.
    pub fn expect_collection(&self, collection: &'static str) -> Result<(), IdentifierError> {
        if self.collection == collection {
            Ok(())
        } else {
            Err(IdentifierError::WrongCollection {
                id: self.raw.clone(),
                expected: collection,
                found: self.collection.clone(),
            })
        }
    }

    /// The identifier as given (trimmed).
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn scope_kind(&self) -> ScopeKind {
        self.scope_kind
    }

    pub fn scope_id(&self) -> &str {
        &self.scope_id
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }
}

impl FromStr for ImportId {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ImportId::parse(s)
    }
}

impl fmt::Display for ImportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
