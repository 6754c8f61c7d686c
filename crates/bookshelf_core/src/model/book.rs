//! Book resource, exposed under the `Books` route.

use super::entity::{
    require_text, Entity, EntityId, FieldDecodeError, FieldDef, FieldKind, FieldReader,
    FieldValue, ValidationError,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const BOOK_FIELDS: &[FieldDef] = &[
    FieldDef::new("title", "title", FieldKind::Text, false),
    FieldDef::new("authorId", "author_id", FieldKind::Uuid, true),
    FieldDef::new("isbn", "isbn", FieldKind::Text, true),
    FieldDef::new("publishedYear", "published_year", FieldKind::Integer, true),
    FieldDef::new("price", "price", FieldKind::Real, true),
    FieldDef::new("inStock", "in_stock", FieldKind::Bool, false),
];

/// A catalogued book.
///
/// `author_id` is a plain reference; the store does not enforce that the
/// author exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    #[serde(default)]
    pub id: EntityId,
    pub title: String,
    #[serde(default)]
    pub author_id: Option<EntityId>,
    #[serde(default)]
    pub isbn: Option<String>,
    #[serde(default)]
    pub published_year: Option<i64>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub in_stock: bool,
}

impl Book {
    /// Creates a book with a generated id.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            author_id: None,
            isbn: None,
            published_year: None,
            price: None,
            in_stock: false,
        }
    }
}

impl Entity for Book {
    const RESOURCE: &'static str = "Books";
    const TABLE: &'static str = "books";

    fn fields() -> &'static [FieldDef] {
        BOOK_FIELDS
    }

    fn id(&self) -> EntityId {
        self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = id;
    }

    fn values(&self) -> Vec<FieldValue> {
        vec![
            FieldValue::Text(self.title.clone()),
            self.author_id.into(),
            self.isbn.clone().into(),
            self.published_year.into(),
            self.price.into(),
            FieldValue::Bool(self.in_stock),
        ]
    }

    fn from_values(id: EntityId, values: Vec<FieldValue>) -> Result<Self, FieldDecodeError> {
        let mut reader = FieldReader::new(Self::RESOURCE, BOOK_FIELDS, values);
        Ok(Self {
            id,
            title: reader.text()?,
            author_id: reader.opt_uuid()?,
            isbn: reader.opt_text()?,
            published_year: reader.opt_integer()?,
            price: reader.opt_real()?,
            in_stock: reader.bool()?,
        })
    }

    fn copy_from(&mut self, other: &Self) {
        self.title = other.title.clone();
        self.author_id = other.author_id;
        self.isbn = other.isbn.clone();
        self.published_year = other.published_year;
        self.price = other.price;
        self.in_stock = other.in_stock;
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_text(Self::RESOURCE, "title", &self.title)
    }
}
