//! Wire shape of filter criteria: `[{"Property", "Operator", "Value"}]`.

use super::{FilterError, FilterResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One user-supplied predicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterCriteria {
    #[serde(rename = "Property", alias = "property")]
    pub property: String,
    #[serde(rename = "Operator", alias = "operator")]
    pub operator: String,
    #[serde(rename = "Value", alias = "value", default)]
    pub value: Value,
}

impl FilterCriteria {
    pub fn new(property: impl Into<String>, operator: FilterOperator, value: Value) -> Self {
        Self {
            property: property.into(),
            operator: operator.as_str().to_string(),
            value,
        }
    }
}

/// Supported filter operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    Equal,
    NotEqual,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    Contains,
    StartsWith,
    EndsWith,
}

impl FilterOperator {
    const ALL: [Self; 9] = [
        Self::Equal,
        Self::NotEqual,
        Self::GreaterThan,
        Self::GreaterThanOrEqual,
        Self::LessThan,
        Self::LessThanOrEqual,
        Self::Contains,
        Self::StartsWith,
        Self::EndsWith,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Equal => "Equal",
            Self::NotEqual => "NotEqual",
            Self::GreaterThan => "GreaterThan",
            Self::GreaterThanOrEqual => "GreaterThanOrEqual",
            Self::LessThan => "LessThan",
            Self::LessThanOrEqual => "LessThanOrEqual",
            Self::Contains => "Contains",
            Self::StartsWith => "StartsWith",
            Self::EndsWith => "EndsWith",
        }
    }

    /// Case-insensitive lookup by name.
    pub fn parse(value: &str) -> FilterResult<Self> {
        let trimmed = value.trim();
        Self::ALL
            .into_iter()
            .find(|operator| operator.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| FilterError::UnknownOperator(trimmed.to_string()))
    }
}

/// Parses the raw `filters` query value.
///
/// `None`, blank input and JSON `null` all mean "no criteria".
pub fn parse_filters(raw: Option<&str>) -> FilterResult<Vec<FilterCriteria>> {
    let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return Ok(Vec::new());
    };

    let parsed: Option<Vec<FilterCriteria>> =
        serde_json::from_str(raw).map_err(|err| FilterError::MalformedJson(err.to_string()))?;
    Ok(parsed.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::{parse_filters, FilterOperator};
    use crate::filter::FilterError;
    use serde_json::json;

    #[test]
    fn blank_and_null_inputs_yield_no_criteria() {
        assert!(parse_filters(None).unwrap().is_empty());
        assert!(parse_filters(Some("   ")).unwrap().is_empty());
        assert!(parse_filters(Some("null")).unwrap().is_empty());
        assert!(parse_filters(Some("[]")).unwrap().is_empty());
    }

    #[test]
    fn parses_pascal_and_camel_case_keys() {
        let criteria = parse_filters(Some(
            r#"[{"Property":"Name","Operator":"Equal","Value":"Ada"},
                {"property":"birthYear","operator":"greaterthan","value":1800}]"#,
        ))
        .unwrap();

        assert_eq!(criteria.len(), 2);
        assert_eq!(criteria[0].property, "Name");
        assert_eq!(criteria[0].value, json!("Ada"));
        assert_eq!(criteria[1].operator, "greaterthan");
        assert_eq!(criteria[1].value, json!(1800));
    }

    #[test]
    fn missing_value_defaults_to_null() {
        let criteria =
            parse_filters(Some(r#"[{"Property":"Email","Operator":"Equal"}]"#)).unwrap();
        assert!(criteria[0].value.is_null());
    }

    #[test]
    fn malformed_json_is_rejected() {
        let err = parse_filters(Some("[{\"Property\":")).unwrap_err();
        assert!(matches!(err, FilterError::MalformedJson(_)));

        let err = parse_filters(Some(r#"{"Property":"Name"}"#)).unwrap_err();
        assert!(matches!(err, FilterError::MalformedJson(_)));
    }

    #[test]
    fn operator_lookup_is_case_insensitive() {
        assert_eq!(
            FilterOperator::parse("startswith").unwrap(),
            FilterOperator::StartsWith
        );
        assert_eq!(
            FilterOperator::parse(" GreaterThanOrEqual ").unwrap(),
            FilterOperator::GreaterThanOrEqual
        );
        assert!(matches!(
            FilterOperator::parse("Between"),
            Err(FilterError::UnknownOperator(name)) if name == "Between"
        ));
    }
}
