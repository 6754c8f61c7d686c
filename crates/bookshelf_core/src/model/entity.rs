//! Shared entity contract and field schema types.
//!
//! # Responsibility
//! - Describe each resource's columns (`FieldDef`) and typed values
//!   (`FieldValue`).
//! - Provide explicit, typed mapping between records and value rows.
//!
//! # Invariants
//! - `Entity::values()` returns one value per `Entity::fields()` entry, in
//!   the same order.
//! - `Entity::copy_from()` copies every non-id field and never touches `id`.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier shared by every resource.
pub type EntityId = Uuid;

/// Storage/filter type of one entity field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Integer,
    Real,
    Bool,
    Uuid,
}

impl FieldKind {
    /// Lowercase label used in error messages.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Integer => "integer",
            Self::Real => "real",
            Self::Bool => "bool",
            Self::Uuid => "uuid",
        }
    }
}

/// Static description of one entity column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    /// External (JSON) property name.
    pub name: &'static str,
    /// SQL column name.
    pub column: &'static str,
    pub kind: FieldKind,
    pub nullable: bool,
}

impl FieldDef {
    pub const fn new(
        name: &'static str,
        column: &'static str,
        kind: FieldKind,
        nullable: bool,
    ) -> Self {
        Self {
            name,
            column,
            kind,
            nullable,
        }
    }

    /// Returns whether a user-supplied property name refers to this field.
    ///
    /// Matching ignores ASCII case and underscores, so `PublishedYear`,
    /// `publishedYear` and `published_year` all resolve to the same column.
    pub fn matches_property(&self, property: &str) -> bool {
        let wanted = normalize_property(property);
        !wanted.is_empty() && wanted == normalize_property(self.column)
    }
}

/// Primary-key field shared by every entity.
pub const ID_FIELD: FieldDef = FieldDef::new("id", "id", FieldKind::Uuid, false);

/// Typed value for one entity field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Text(String),
    Integer(i64),
    Real(f64),
    Bool(bool),
    Uuid(Uuid),
}

impl From<Option<String>> for FieldValue {
    fn from(value: Option<String>) -> Self {
        value.map_or(Self::Null, Self::Text)
    }
}

impl From<Option<i64>> for FieldValue {
    fn from(value: Option<i64>) -> Self {
        value.map_or(Self::Null, Self::Integer)
    }
}

impl From<Option<f64>> for FieldValue {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Self::Null, Self::Real)
    }
}

impl From<Option<Uuid>> for FieldValue {
    fn from(value: Option<Uuid>) -> Self {
        value.map_or(Self::Null, Self::Uuid)
    }
}

/// Validation failure raised before a record is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    BlankField {
        resource: &'static str,
        field: &'static str,
    },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankField { resource, field } => {
                write!(f, "{resource}.{field} must not be blank")
            }
        }
    }
}

impl Error for ValidationError {}

/// Contract implemented by every persisted resource.
pub trait Entity: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Route segment under `/api/`.
    const RESOURCE: &'static str;
    /// Backing SQL table.
    const TABLE: &'static str;

    /// Non-id fields in storage order.
    fn fields() -> &'static [FieldDef];

    fn id(&self) -> EntityId;

    fn set_id(&mut self, id: EntityId);

    /// Non-id values in `fields()` order.
    fn values(&self) -> Vec<FieldValue>;

    /// Rebuilds a record from an id and `fields()`-ordered values.
    fn from_values(id: EntityId, values: Vec<FieldValue>) -> Result<Self, FieldDecodeError>;

    /// Replaces every non-id field with the value from `other`.
    fn copy_from(&mut self, other: &Self);

    fn validate(&self) -> Result<(), ValidationError>;

    /// Resolves a user-supplied property name, including `Id`.
    fn find_field(property: &str) -> Option<&'static FieldDef> {
        if ID_FIELD.matches_property(property) {
            return Some(&ID_FIELD);
        }
        Self::fields()
            .iter()
            .find(|field| field.matches_property(property))
    }
}

/// Rejects blank required text.
pub(crate) fn require_text(
    resource: &'static str,
    field: &'static str,
    value: &str,
) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::BlankField { resource, field });
    }
    Ok(())
}

/// Decoding failure when rebuilding a record from stored values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDecodeError {
    pub resource: &'static str,
    pub field: &'static str,
    pub message: String,
}

impl Display for FieldDecodeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}: {}", self.resource, self.field, self.message)
    }
}

impl Error for FieldDecodeError {}

/// Sequential typed reader over `fields()`-ordered values.
pub(crate) struct FieldReader {
    resource: &'static str,
    fields: std::slice::Iter<'static, FieldDef>,
    values: std::vec::IntoIter<FieldValue>,
}

impl FieldReader {
    pub(crate) fn new(
        resource: &'static str,
        fields: &'static [FieldDef],
        values: Vec<FieldValue>,
    ) -> Self {
        Self {
            resource,
            fields: fields.iter(),
            values: values.into_iter(),
        }
    }

    fn next(&mut self) -> Result<(&'static str, FieldValue), FieldDecodeError> {
        let field = self.fields.next().ok_or_else(|| FieldDecodeError {
            resource: self.resource,
            field: "?",
            message: "more values requested than fields declared".to_string(),
        })?;
        let value = self.values.next().ok_or_else(|| FieldDecodeError {
            resource: self.resource,
            field: field.name,
            message: "missing value".to_string(),
        })?;
        Ok((field.name, value))
    }

    fn mismatch(&self, field: &'static str, expected: &str, got: &FieldValue) -> FieldDecodeError {
        FieldDecodeError {
            resource: self.resource,
            field,
            message: format!("expected {expected}, got {got:?}"),
        }
    }

    pub(crate) fn text(&mut self) -> Result<String, FieldDecodeError> {
        match self.next()? {
            (_, FieldValue::Text(value)) => Ok(value),
            (field, other) => Err(self.mismatch(field, "text", &other)),
        }
    }

    pub(crate) fn opt_text(&mut self) -> Result<Option<String>, FieldDecodeError> {
        match self.next()? {
            (_, FieldValue::Null) => Ok(None),
            (_, FieldValue::Text(value)) => Ok(Some(value)),
            (field, other) => Err(self.mismatch(field, "text or null", &other)),
        }
    }

    pub(crate) fn opt_integer(&mut self) -> Result<Option<i64>, FieldDecodeError> {
        match self.next()? {
            (_, FieldValue::Null) => Ok(None),
            (_, FieldValue::Integer(value)) => Ok(Some(value)),
            (field, other) => Err(self.mismatch(field, "integer or null", &other)),
        }
    }

    pub(crate) fn opt_real(&mut self) -> Result<Option<f64>, FieldDecodeError> {
        match self.next()? {
            (_, FieldValue::Null) => Ok(None),
            (_, FieldValue::Real(value)) => Ok(Some(value)),
            (_, FieldValue::Integer(value)) => Ok(Some(value as f64)),
            (field, other) => Err(self.mismatch(field, "real or null", &other)),
        }
    }

    pub(crate) fn bool(&mut self) -> Result<bool, FieldDecodeError> {
        match self.next()? {
            (_, FieldValue::Bool(value)) => Ok(value),
            (field, other) => Err(self.mismatch(field, "bool", &other)),
        }
    }

    pub(crate) fn opt_uuid(&mut self) -> Result<Option<Uuid>, FieldDecodeError> {
        match self.next()? {
            (_, FieldValue::Null) => Ok(None),
            (_, FieldValue::Uuid(value)) => Ok(Some(value)),
            (field, other) => Err(self.mismatch(field, "uuid or null", &other)),
        }
    }
}

fn normalize_property(value: &str) -> String {
    value
        .trim()
        .chars()
        .filter(|ch| *ch != '_')
        .map(|ch| ch.to_ascii_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{FieldDef, FieldKind, ID_FIELD};

    #[test]
    fn property_matching_ignores_case_and_underscores() {
        let field = FieldDef::new("publishedYear", "published_year", FieldKind::Integer, true);
        assert!(field.matches_property("PublishedYear"));
        assert!(field.matches_property("publishedYear"));
        assert!(field.matches_property("published_year"));
        assert!(!field.matches_property("published"));
        assert!(!field.matches_property("  "));
    }

    #[test]
    fn id_field_matches_pascal_case() {
        assert!(ID_FIELD.matches_property("Id"));
        assert!(ID_FIELD.matches_property("ID"));
    }
}
