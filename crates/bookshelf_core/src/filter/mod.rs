//! Dynamic filter engine for list queries.
//!
//! # Responsibility
//! - Parse the JSON `filters` query value into `FilterCriteria`.
//! - Compile criteria against an entity's static field schema into a
//!   `FilterExpr` tree.
//! - Render the tree as a parameterized SQL predicate.
//!
//! # Invariants
//! - Criteria are AND-combined in the order given.
//! - User values are always bound parameters, never interpolated into SQL.
//! - Property and operator names resolve case-insensitively.

use crate::model::entity::{Entity, FieldKind};
use std::error::Error;
use std::fmt::{Display, Formatter};

mod criteria;
mod expr;

pub use criteria::{parse_filters, FilterCriteria, FilterOperator};
pub use expr::{compile_filters, CompareOp, FilterExpr, TextMatch, MAX_CRITERIA};

pub type FilterResult<T> = Result<T, FilterError>;

/// Rejection raised while parsing or compiling filter criteria.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    MalformedJson(String),
    UnknownProperty {
        resource: &'static str,
        property: String,
    },
    UnknownOperator(String),
    InvalidValue {
        property: &'static str,
        kind: FieldKind,
        value: String,
    },
    UnsupportedOperator {
        property: &'static str,
        kind: FieldKind,
        operator: FilterOperator,
    },
    NullNotAllowed {
        property: &'static str,
        operator: FilterOperator,
    },
    TooManyCriteria {
        count: usize,
        max: usize,
    },
}

impl Display for FilterError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MalformedJson(message) => write!(f, "malformed filters: {message}"),
            Self::UnknownProperty { resource, property } => {
                write!(f, "unknown property `{property}` for {resource}")
            }
            Self::UnknownOperator(operator) => write!(f, "unknown filter operator `{operator}`"),
            Self::InvalidValue {
                property,
                kind,
                value,
            } => write!(
                f,
                "value {value} is not a valid {} for `{property}`",
                kind.as_str()
            ),
            Self::UnsupportedOperator {
                property,
                kind,
                operator,
            } => write!(
                f,
                "operator {} is not supported for {} property `{property}`",
                operator.as_str(),
                kind.as_str()
            ),
            Self::NullNotAllowed { property, operator } => write!(
                f,
                "operator {} does not accept a null value for `{property}`",
                operator.as_str()
            ),
            Self::TooManyCriteria { count, max } => {
                write!(f, "too many filter criteria: {count} (at most {max})")
            }
        }
    }
}

impl Error for FilterError {}

/// Parses and compiles a raw `filters` query value for entity `E`.
///
/// Absent or blank input yields `FilterExpr::True`.
pub fn build_filter<E: Entity>(raw: Option<&str>) -> FilterResult<FilterExpr> {
    let criteria = parse_filters(raw)?;
    compile_filters::<E>(&criteria)
}
