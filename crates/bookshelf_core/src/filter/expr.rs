//! Typed filter expression tree and its SQL rendering.

use super::criteria::{FilterCriteria, FilterOperator};
use super::{FilterError, FilterResult};
use crate::model::entity::{Entity, FieldDef, FieldKind, FieldValue};
use serde_json::Value;
use uuid::Uuid;

/// Comparison operator with a direct SQL counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl CompareOp {
    fn sql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Lt => "<",
            Self::Le => "<=",
        }
    }
}

/// Substring position for text matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextMatch {
    Contains,
    StartsWith,
    EndsWith,
}

/// Compiled predicate over one entity table.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterExpr {
    /// Matches every row.
    True,
    And(Box<FilterExpr>, Box<FilterExpr>),
    Compare {
        column: &'static str,
        op: CompareOp,
        value: FieldValue,
        /// Nullable columns keep NULL rows under `Ne`.
        nullable: bool,
    },
    IsNull {
        column: &'static str,
        negated: bool,
    },
    Text {
        column: &'static str,
        mode: TextMatch,
        needle: String,
    },
}

impl FilterExpr {
    /// AND-combines `self` with `other`, dropping redundant `True` nodes.
    pub fn and(self, other: FilterExpr) -> FilterExpr {
        match (self, other) {
            (FilterExpr::True, expr) | (expr, FilterExpr::True) => expr,
            (left, right) => FilterExpr::And(Box::new(left), Box::new(right)),
        }
    }

    /// Renders a SQL predicate with `?` placeholders and its bound values.
    pub fn to_sql(&self) -> (String, Vec<FieldValue>) {
        let mut sql = String::new();
        let mut params = Vec::new();
        self.render(&mut sql, &mut params);
        (sql, params)
    }

    fn render(&self, sql: &mut String, params: &mut Vec<FieldValue>) {
        match self {
            Self::True => sql.push_str("1 = 1"),
            Self::And(left, right) => {
                sql.push('(');
                left.render(sql, params);
                sql.push_str(" AND ");
                right.render(sql, params);
                sql.push(')');
            }
            Self::Compare {
                column,
                op: CompareOp::Ne,
                value,
                nullable: true,
            } => {
                sql.push_str(&format!("({column} IS NULL OR {column} <> ?)"));
                params.push(value.clone());
            }
            Self::Compare {
                column, op, value, ..
            } => {
                sql.push_str(&format!("{column} {} ?", op.sql()));
                params.push(value.clone());
            }
            Self::IsNull { column, negated } => {
                let keyword = if *negated { "IS NOT NULL" } else { "IS NULL" };
                sql.push_str(&format!("{column} {keyword}"));
            }
            Self::Text {
                column,
                mode,
                needle,
            } => {
                let escaped = escape_like(needle);
                let pattern = match mode {
                    TextMatch::Contains => format!("%{escaped}%"),
                    TextMatch::StartsWith => format!("{escaped}%"),
                    TextMatch::EndsWith => format!("%{escaped}"),
                };
                sql.push_str(&format!("{column} LIKE ? ESCAPE '\\'"));
                params.push(FieldValue::Text(pattern));
            }
        }
    }
}

/// Upper bound on criteria per query; the AND chain nests one level per
/// criterion and SQLite caps expression depth at 1000.
pub const MAX_CRITERIA: usize = 256;

/// Compiles criteria against the field schema of `E`.
pub fn compile_filters<E: Entity>(criteria: &[FilterCriteria]) -> FilterResult<FilterExpr> {
    if criteria.len() > MAX_CRITERIA {
        return Err(FilterError::TooManyCriteria {
            count: criteria.len(),
            max: MAX_CRITERIA,
        });
    }

    criteria
        .iter()
        .try_fold(FilterExpr::True, |expr, criterion| {
            Ok(expr.and(compile_one::<E>(criterion)?))
        })
}

fn compile_one<E: Entity>(criterion: &FilterCriteria) -> FilterResult<FilterExpr> {
    let field = E::find_field(&criterion.property).ok_or_else(|| FilterError::UnknownProperty {
        resource: E::RESOURCE,
        property: criterion.property.clone(),
    })?;
    let operator = FilterOperator::parse(&criterion.operator)?;

    if criterion.value.is_null() {
        return match operator {
            FilterOperator::Equal => Ok(FilterExpr::IsNull {
                column: field.column,
                negated: false,
            }),
            FilterOperator::NotEqual => Ok(FilterExpr::IsNull {
                column: field.column,
                negated: true,
            }),
            _ => Err(FilterError::NullNotAllowed {
                property: field.name,
                operator,
            }),
        };
    }

    let compare = |op: CompareOp| -> FilterResult<FilterExpr> {
        Ok(FilterExpr::Compare {
            column: field.column,
            op,
            value: coerce_value(field, &criterion.value)?,
            nullable: field.nullable,
        })
    };
    let text = |mode: TextMatch| -> FilterResult<FilterExpr> {
        if field.kind != FieldKind::Text {
            return Err(unsupported(field, operator));
        }
        match coerce_value(field, &criterion.value)? {
            FieldValue::Text(needle) => Ok(FilterExpr::Text {
                column: field.column,
                mode,
                needle,
            }),
            _ => Err(invalid_value(field, &criterion.value)),
        }
    };

    match operator {
        FilterOperator::Equal => compare(CompareOp::Eq),
        FilterOperator::NotEqual => compare(CompareOp::Ne),
        FilterOperator::GreaterThan
        | FilterOperator::GreaterThanOrEqual
        | FilterOperator::LessThan
        | FilterOperator::LessThanOrEqual => {
            if !matches!(
                field.kind,
                FieldKind::Text | FieldKind::Integer | FieldKind::Real
            ) {
                return Err(unsupported(field, operator));
            }
            compare(match operator {
                FilterOperator::GreaterThan => CompareOp::Gt,
                FilterOperator::GreaterThanOrEqual => CompareOp::Ge,
                FilterOperator::LessThan => CompareOp::Lt,
                _ => CompareOp::Le,
            })
        }
        FilterOperator::Contains => text(TextMatch::Contains),
        FilterOperator::StartsWith => text(TextMatch::StartsWith),
        FilterOperator::EndsWith => text(TextMatch::EndsWith),
    }
}

/// Converts a JSON scalar to the field's storage type.
fn coerce_value(field: &FieldDef, value: &Value) -> FilterResult<FieldValue> {
    let coerced = match (field.kind, value) {
        (FieldKind::Text, Value::String(text)) => Some(FieldValue::Text(text.clone())),
        (FieldKind::Text, Value::Number(number)) => Some(FieldValue::Text(number.to_string())),
        (FieldKind::Text, Value::Bool(flag)) => Some(FieldValue::Text(flag.to_string())),
        (FieldKind::Integer, Value::Number(number)) => number
            .as_i64()
            .or_else(|| {
                number
                    .as_f64()
                    .filter(|float| float.fract() == 0.0 && float.abs() < i64::MAX as f64)
                    .map(|float| float as i64)
            })
            .map(FieldValue::Integer),
        (FieldKind::Integer, Value::String(text)) => {
            text.trim().parse::<i64>().ok().map(FieldValue::Integer)
        }
        (FieldKind::Real, Value::Number(number)) => number.as_f64().map(FieldValue::Real),
        (FieldKind::Real, Value::String(text)) => text
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|float| float.is_finite())
            .map(FieldValue::Real),
        (FieldKind::Bool, Value::Bool(flag)) => Some(FieldValue::Bool(*flag)),
        (FieldKind::Bool, Value::String(text)) => match text.trim().to_ascii_lowercase().as_str() {
            "true" => Some(FieldValue::Bool(true)),
            "false" => Some(FieldValue::Bool(false)),
            _ => None,
        },
        (FieldKind::Bool, Value::Number(number)) => match number.as_i64() {
            Some(0) => Some(FieldValue::Bool(false)),
            Some(1) => Some(FieldValue::Bool(true)),
            _ => None,
        },
        (FieldKind::Uuid, Value::String(text)) => {
            Uuid::parse_str(text.trim()).ok().map(FieldValue::Uuid)
        }
        _ => None,
    };

    coerced.ok_or_else(|| invalid_value(field, value))
}

fn invalid_value(field: &FieldDef, value: &Value) -> FilterError {
    FilterError::InvalidValue {
        property: field.name,
        kind: field.kind,
        value: value.to_string(),
    }
}

fn unsupported(field: &FieldDef, operator: FilterOperator) -> FilterError {
    FilterError::UnsupportedOperator {
        property: field.name,
        kind: field.kind,
        operator,
    }
}

fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::{compile_filters, escape_like, CompareOp, FilterExpr, MAX_CRITERIA};
    use crate::filter::{FilterCriteria, FilterError, FilterOperator};
    use crate::model::book::Book;
    use crate::model::entity::{FieldKind, FieldValue};
    use serde_json::json;
    use uuid::Uuid;

    fn criterion(property: &str, operator: FilterOperator, value: serde_json::Value) -> FilterCriteria {
        FilterCriteria::new(property, operator, value)
    }

    #[test]
    fn empty_criteria_compile_to_true() {
        let expr = compile_filters::<Book>(&[]).unwrap();
        assert_eq!(expr, FilterExpr::True);
        assert_eq!(expr.to_sql(), ("1 = 1".to_string(), Vec::new()));
    }

    #[test]
    fn criteria_are_and_combined_in_order() {
        let expr = compile_filters::<Book>(&[
            criterion("PublishedYear", FilterOperator::GreaterThanOrEqual, json!(1990)),
            criterion("Title", FilterOperator::StartsWith, json!("Rust")),
            criterion("InStock", FilterOperator::Equal, json!("true")),
        ])
        .unwrap();

        let (sql, params) = expr.to_sql();
        assert_eq!(
            sql,
            "((published_year >= ? AND title LIKE ? ESCAPE '\\') AND in_stock = ?)"
        );
        assert_eq!(
            params,
            vec![
                FieldValue::Integer(1990),
                FieldValue::Text("Rust%".to_string()),
                FieldValue::Bool(true),
            ]
        );
    }

    #[test]
    fn not_equal_on_nullable_column_keeps_null_rows() {
        let expr = compile_filters::<Book>(&[criterion(
            "isbn",
            FilterOperator::NotEqual,
            json!("123"),
        )])
        .unwrap();
        assert_eq!(expr.to_sql().0, "(isbn IS NULL OR isbn <> ?)");

        let expr = compile_filters::<Book>(&[criterion(
            "title",
            FilterOperator::NotEqual,
            json!("x"),
        )])
        .unwrap();
        assert!(matches!(
            expr,
            FilterExpr::Compare {
                op: CompareOp::Ne,
                nullable: false,
                ..
            }
        ));
        assert_eq!(expr.to_sql().0, "title <> ?");
    }

    #[test]
    fn null_value_maps_to_is_null_checks() {
        let expr = compile_filters::<Book>(&[
            criterion("AuthorId", FilterOperator::Equal, json!(null)),
            criterion("Price", FilterOperator::NotEqual, json!(null)),
        ])
        .unwrap();
        assert_eq!(
            expr.to_sql(),
            (
                "(author_id IS NULL AND price IS NOT NULL)".to_string(),
                Vec::new()
            )
        );

        let err = compile_filters::<Book>(&[criterion(
            "Price",
            FilterOperator::GreaterThan,
            json!(null),
        )])
        .unwrap_err();
        assert!(matches!(err, FilterError::NullNotAllowed { .. }));
    }

    #[test]
    fn values_are_coerced_to_field_kind() {
        let author_id = Uuid::new_v4();
        let expr = compile_filters::<Book>(&[
            criterion("AuthorId", FilterOperator::Equal, json!(author_id.to_string())),
            criterion("Price", FilterOperator::LessThan, json!("19.5")),
            criterion("PublishedYear", FilterOperator::Equal, json!(2001.0)),
            criterion("Isbn", FilterOperator::Equal, json!(978)),
        ])
        .unwrap();

        assert_eq!(
            expr.to_sql().1,
            vec![
                FieldValue::Uuid(author_id),
                FieldValue::Real(19.5),
                FieldValue::Integer(2001),
                FieldValue::Text("978".to_string()),
            ]
        );
    }

    #[test]
    fn rejects_unknown_property_and_bad_values() {
        let err = compile_filters::<Book>(&[criterion(
            "Publisher",
            FilterOperator::Equal,
            json!("x"),
        )])
        .unwrap_err();
        assert!(matches!(
            err,
            FilterError::UnknownProperty { resource: "Books", ref property } if property == "Publisher"
        ));

        let err = compile_filters::<Book>(&[criterion(
            "PublishedYear",
            FilterOperator::Equal,
            json!("nineteen"),
        )])
        .unwrap_err();
        assert!(matches!(
            err,
            FilterError::InvalidValue {
                kind: FieldKind::Integer,
                ..
            }
        ));

        let err = compile_filters::<Book>(&[criterion(
            "AuthorId",
            FilterOperator::Equal,
            json!("not-a-uuid"),
        )])
        .unwrap_err();
        assert!(matches!(err, FilterError::InvalidValue { .. }));
    }

    #[test]
    fn operators_are_restricted_by_field_kind() {
        let err = compile_filters::<Book>(&[criterion(
            "InStock",
            FilterOperator::GreaterThan,
            json!(true),
        )])
        .unwrap_err();
        assert!(matches!(err, FilterError::UnsupportedOperator { .. }));

        let err = compile_filters::<Book>(&[criterion(
            "PublishedYear",
            FilterOperator::Contains,
            json!(19),
        )])
        .unwrap_err();
        assert!(matches!(err, FilterError::UnsupportedOperator { .. }));
    }

    #[test]
    fn like_wildcards_in_needle_are_escaped() {
        assert_eq!(escape_like(r"50%_off\"), r"50\%\_off\\");
    }

    #[test]
    fn criteria_count_is_capped() {
        let at_limit = vec![criterion("Id", FilterOperator::Equal, json!(null)); MAX_CRITERIA];
        assert!(compile_filters::<Book>(&at_limit).is_ok());

        let over_limit = vec![criterion("Id", FilterOperator::Equal, json!(null)); MAX_CRITERIA + 1];
        let err = compile_filters::<Book>(&over_limit).unwrap_err();
        assert_eq!(
            err,
            FilterError::TooManyCriteria {
                count: MAX_CRITERIA + 1,
                max: MAX_CRITERIA,
            }
        );
    }
}
