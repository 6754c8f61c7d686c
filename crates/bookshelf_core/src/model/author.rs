//! Author resource.

use super::entity::{
    require_text, Entity, EntityId, FieldDecodeError, FieldDef, FieldKind, FieldReader,
    FieldValue, ValidationError,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const AUTHOR_FIELDS: &[FieldDef] = &[
    FieldDef::new("name", "name", FieldKind::Text, false),
    FieldDef::new("email", "email", FieldKind::Text, true),
    FieldDef::new("biography", "biography", FieldKind::Text, true),
    FieldDef::new("birthYear", "birth_year", FieldKind::Integer, true),
];

/// A person credited with one or more books.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    /// Nil when omitted by the client; assigned on create.
    #[serde(default)]
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub biography: Option<String>,
    #[serde(default)]
    pub birth_year: Option<i64>,
}

impl Author {
    /// Creates an author with a generated id.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            email: None,
            biography: None,
            birth_year: None,
        }
    }
}

impl Entity for Author {
    const RESOURCE: &'static str = "Author";
    const TABLE: &'static str = "authors";

    fn fields() -> &'static [FieldDef] {
        AUTHOR_FIELDS
    }

    fn id(&self) -> EntityId {
        self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = id;
    }

    fn values(&self) -> Vec<FieldValue> {
        vec![
            FieldValue::Text(self.name.clone()),
            self.email.clone().into(),
            self.biography.clone().into(),
            self.birth_year.into(),
        ]
    }

    fn from_values(id: EntityId, values: Vec<FieldValue>) -> Result<Self, FieldDecodeError> {
        let mut reader = FieldReader::new(Self::RESOURCE, AUTHOR_FIELDS, values);
        Ok(Self {
            id,
            name: reader.text()?,
            email: reader.opt_text()?,
            biography: reader.opt_text()?,
            birth_year: reader.opt_integer()?,
        })
    }

    fn copy_from(&mut self, other: &Self) {
        self.name = other.name.clone();
        self.email = other.email.clone();
        self.biography = other.biography.clone();
        self.birth_year = other.birth_year;
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_text(Self::RESOURCE, "name", &self.name)
    }
}
