//! Opaque domain-object references.
//!
//! A reference travels through the query string as a tagged string:
//! the reserved `___` prefix, then owner, type and primary key joined
//! by `:` (for example `___blog:Widget:42`). Decoding performs a
//! lookup through the [`ObjectStore`] seam and surfaces a missing
//! record as a clear not-found error, never a crash.

use std::fmt;

use serde_json::Value;

use crate::error::Result;

/// Reserved prefix marking an encoded object reference.
pub const OBJECT_REF_PREFIX: &str = "___";

/// Fixed delimiter between owner, type and primary key.
pub const OBJECT_REF_DELIM: char = ':';

/// A serialized object identity: owning app, model type, primary key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectRef {
    /// App that defines the model.
    pub owner: String,
    /// Model type name.
    pub model: String,
    /// Primary key.
    pub pk: i64,
}

impl ObjectRef {
    /// Build a reference from its parts.
    pub fn new(owner: impl Into<String>, model: impl Into<String>, pk: i64) -> Self {
        Self {
            owner: owner.into(),
            model: model.into(),
            pk,
        }
    }

    /// Encode into the tagged query-string form.
    pub fn encode(&self) -> String {
        format!(
            "{OBJECT_REF_PREFIX}{}{OBJECT_REF_DELIM}{}{OBJECT_REF_DELIM}{}",
            self.owner, self.model, self.pk
        )
    }

    /// Parse the tagged form back into a reference.
    ///
    /// Returns `None` for anything that is not a well-formed encoded
    /// reference (missing prefix, wrong arity, empty parts, or a
    /// non-numeric key).
    pub fn parse(raw: &str) -> Option<Self> {
        let rest = raw.strip_prefix(OBJECT_REF_PREFIX)?;
        let mut parts = rest.splitn(3, OBJECT_REF_DELIM);
        let owner = parts.next()?;
        let model = parts.next()?;
        let pk: i64 = parts.next()?.parse().ok()?;
        if owner.is_empty() || model.is_empty() || pk < 0 {
            return None;
        }
        Some(Self::new(owner, model, pk))
    }

    /// Does this raw value carry the reference prefix?
    pub fn is_encoded(raw: &str) -> bool {
        raw.starts_with(OBJECT_REF_PREFIX)
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{OBJECT_REF_DELIM}{}{OBJECT_REF_DELIM}{}",
            self.owner, self.model, self.pk
        )
    }
}

/// A domain object fetched through the store - the ORM boundary.
///
/// The core never inspects persistence details; it only needs the
/// identity, a display name for default messages, a template-context
/// projection, and the mutate hooks the delete/refresh lifecycle uses.
pub trait DomainObject: Send {
    /// Identity of this object.
    fn object_ref(&self) -> ObjectRef;

    /// Human-readable type name, used in default messages.
    fn display_name(&self) -> String {
        let model = self.object_ref().model;
        let mut chars = model.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => model,
        }
    }

    /// Fields exposed to the template context.
    fn context(&self) -> Value;

    /// Re-read persisted state after a mutation.
    fn refresh(&mut self) -> Result<()> {
        Ok(())
    }

    /// Remove the persisted record.
    fn delete(&self) -> Result<()>;
}

/// Lookup seam resolving a reference to a concrete object.
pub trait ObjectStore: Send + Sync {
    /// Fetch the referenced object, or `None` when it no longer exists.
    fn get(&self, reference: &ObjectRef) -> Option<Box<dyn DomainObject>>;
}
