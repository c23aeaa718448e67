//! Contribution payload validation.
//!
//! Validates a `properties` bag against a category's active fields. Strict
//! mode enforces required fields and rejects unknown keys; draft mode only
//! type-checks the values that are present.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use geonote_common::{AppError, AppResult, FieldErrors};
use serde_json::{Map, Value};

use crate::fields::{CategorySchema, FieldSchema, FieldType};

/// Validation mode for contribution payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMode {
    /// Required fields must be present and non-null; unknown keys rejected.
    Strict,
    /// Missing or null required fields are allowed.
    Draft,
}

/// Normalize a properties bag in place: empty strings become null.
pub fn replace_null(properties: &mut Map<String, Value>) {
    for value in properties.values_mut() {
        if value.as_str().is_some_and(str::is_empty) {
            *value = Value::Null;
        }
    }
}

/// Validate a properties bag against a category.
///
/// Returns the aggregated per-field messages as a single
/// [`AppError::Validation`] when anything fails.
pub fn validate_properties(
    category: &CategorySchema,
    properties: &Map<String, Value>,
    mode: ValidationMode,
) -> AppResult<()> {
    let mut errors = FieldErrors::new();

    for (key, value) in properties {
        match category.active_field(key) {
            Some(field) => {
                if value.is_null() {
                    if mode == ValidationMode::Strict && field.required {
                        push(&mut errors, key, "Required field may not be null");
                    }
                } else if let Err(message) = check_value(field, value) {
                    push(&mut errors, key, message);
                }
            }
            None => {
                if mode == ValidationMode::Strict {
                    push(&mut errors, key, "Unknown field key");
                }
            }
        }
    }

    if mode == ValidationMode::Strict {
        for field in category.active_fields() {
            if field.required && !properties.contains_key(&field.key) {
                push(&mut errors, &field.key, "Required field is missing");
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(errors))
    }
}

fn push(errors: &mut FieldErrors, key: &str, message: impl Into<String>) {
    errors.entry(key.to_string()).or_default().push(message.into());
}

/// Check a single non-null value against its field subtype.
fn check_value(field: &FieldSchema, value: &Value) -> Result<(), String> {
    match &field.field_type {
        FieldType::Text { maxlength, .. } => {
            let text = value
                .as_str()
                .ok_or_else(|| "Value must be a string".to_string())?;
            if let Some(max) = maxlength {
                if text.chars().count() > *max {
                    return Err(format!("Value exceeds maximum length of {max}"));
                }
            }
            Ok(())
        }
        FieldType::Numeric { minval, maxval } => {
            let number = parse_number(value)
                .ok_or_else(|| "Value must be a number".to_string())?;
            if let Some(min) = minval {
                if number < *min {
                    return Err(format!("Value must be at least {min}"));
                }
            }
            if let Some(max) = maxval {
                if number > *max {
                    return Err(format!("Value must be at most {max}"));
                }
            }
            Ok(())
        }
        FieldType::Boolean => {
            if parse_boolean(value).is_some() {
                Ok(())
            } else {
                Err("Value must be a boolean".to_string())
            }
        }
        FieldType::Date => {
            let text = value
                .as_str()
                .ok_or_else(|| "Value must be a date string".to_string())?;
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .map(|_| ())
                .map_err(|_| "Value is not a valid date (expected YYYY-MM-DD)".to_string())
        }
        FieldType::Datetime => {
            let text = value
                .as_str()
                .ok_or_else(|| "Value must be a datetime string".to_string())?;
            if parse_datetime(text) {
                Ok(())
            } else {
                Err("Value is not a valid ISO-8601 datetime".to_string())
            }
        }
        FieldType::Time => {
            let text = value
                .as_str()
                .ok_or_else(|| "Value must be a time string".to_string())?;
            NaiveTime::parse_from_str(text, "%H:%M:%S")
                .or_else(|_| NaiveTime::parse_from_str(text, "%H:%M"))
                .map(|_| ())
                .map_err(|_| "Value is not a valid time (expected HH:MM)".to_string())
        }
        FieldType::Lookup { .. } => {
            let id = value
                .as_str()
                .ok_or_else(|| "Value must be a lookup value id".to_string())?;
            let active = field
                .field_type
                .active_lookup_ids()
                .unwrap_or_default();
            if active.contains(&id) {
                Ok(())
            } else {
                Err("Unknown or inactive lookup value".to_string())
            }
        }
        FieldType::MultiLookup { .. } => {
            let ids = value
                .as_array()
                .ok_or_else(|| "Value must be a list of lookup value ids".to_string())?;
            let active = field
                .field_type
                .active_lookup_ids()
                .unwrap_or_default();
            for id in ids {
                let id = id
                    .as_str()
                    .ok_or_else(|| "Value must be a list of lookup value ids".to_string())?;
                if !active.contains(&id) {
                    return Err("Unknown or inactive lookup value".to_string());
                }
            }
            Ok(())
        }
    }
}

/// Accepts JSON numbers and numeric strings; rejects booleans.
fn parse_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Accepts JSON booleans and the literal strings the web forms submit.
fn parse_boolean(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.as_str() {
            "true" | "1" | "t" => Some(true),
            "false" | "0" | "f" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn parse_datetime(text: &str) -> bool {
    DateTime::parse_from_rfc3339(text).is_ok()
        || NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S").is_ok()
        || NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M").is_ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::fields::LookupValueRef;
    use geonote_db::entities::category::DefaultStatus;
    use serde_json::json;

    fn field(key: &str, required: bool, field_type: FieldType) -> FieldSchema {
        FieldSchema {
            id: format!("id-{key}"),
            key: key.to_string(),
            name: key.to_string(),
            description: None,
            required,
            active: true,
            order: 0,
            field_type,
        }
    }

    fn category(fields: Vec<FieldSchema>) -> CategorySchema {
        CategorySchema {
            id: "c1".to_string(),
            project_id: "p1".to_string(),
            name: "Trees".to_string(),
            description: None,
            active: true,
            default_status: DefaultStatus::Pending,
            display_field_id: None,
            fields,
        }
    }

    fn props(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn strict_requires_required_fields() {
        let cat = category(vec![field(
            "name",
            true,
            FieldType::Text { maxlength: None, textarea: false },
        )]);

        let err = validate_properties(&cat, &props(json!({})), ValidationMode::Strict)
            .unwrap_err();
        match err {
            AppError::Validation(errors) => assert!(errors.contains_key("name")),
            other => panic!("unexpected error: {other}"),
        }

        assert!(validate_properties(&cat, &props(json!({})), ValidationMode::Draft).is_ok());
    }

    #[test]
    fn strict_rejects_unknown_keys_draft_ignores() {
        let cat = category(vec![]);
        let payload = props(json!({"mystery": 1}));

        assert!(validate_properties(&cat, &payload, ValidationMode::Strict).is_err());
        assert!(validate_properties(&cat, &payload, ValidationMode::Draft).is_ok());
    }

    #[test]
    fn numeric_bounds_are_inclusive() {
        let cat = category(vec![field(
            "age",
            false,
            FieldType::Numeric { minval: Some(0.0), maxval: Some(120.0) },
        )]);

        assert!(validate_properties(&cat, &props(json!({"age": 0})), ValidationMode::Strict).is_ok());
        assert!(validate_properties(&cat, &props(json!({"age": 120})), ValidationMode::Strict).is_ok());
        assert!(validate_properties(&cat, &props(json!({"age": "30"})), ValidationMode::Strict).is_ok());
        assert!(validate_properties(&cat, &props(json!({"age": 200})), ValidationMode::Strict).is_err());
        assert!(validate_properties(&cat, &props(json!({"age": true})), ValidationMode::Strict).is_err());
        assert!(
            validate_properties(&cat, &props(json!({"age": "abc"})), ValidationMode::Strict).is_err()
        );
    }

    #[test]
    fn boolean_accepts_form_literals() {
        let cat = category(vec![field("flag", false, FieldType::Boolean)]);

        for ok in [json!(true), json!("true"), json!("1"), json!("f")] {
            assert!(
                validate_properties(&cat, &props(json!({"flag": ok})), ValidationMode::Strict).is_ok()
            );
        }
        for bad in [json!(2), json!("yes"), json!([true])] {
            assert!(
                validate_properties(&cat, &props(json!({"flag": bad})), ValidationMode::Strict)
                    .is_err()
            );
        }
    }

    #[test]
    fn date_and_time_parse_iso() {
        let cat = category(vec![
            field("d", false, FieldType::Date),
            field("dt", false, FieldType::Datetime),
            field("t", false, FieldType::Time),
        ]);

        let good = props(json!({"d": "2026-03-01", "dt": "2026-03-01T12:30:00Z", "t": "12:30"}));
        assert!(validate_properties(&cat, &good, ValidationMode::Strict).is_ok());

        let bad = props(json!({"d": "01/03/2026"}));
        assert!(validate_properties(&cat, &bad, ValidationMode::Strict).is_err());
    }

    #[test]
    fn lookup_rejects_inactive_values() {
        let values = vec![
            LookupValueRef { id: "v1".to_string(), name: "Oak".to_string(), symbol: None, active: true },
            LookupValueRef { id: "v2".to_string(), name: "Elm".to_string(), symbol: None, active: false },
        ];
        let cat = category(vec![
            field("kind", false, FieldType::Lookup { values: values.clone() }),
            field("kinds", false, FieldType::MultiLookup { values }),
        ]);

        assert!(
            validate_properties(&cat, &props(json!({"kind": "v1"})), ValidationMode::Strict).is_ok()
        );
        assert!(
            validate_properties(&cat, &props(json!({"kind": "v2"})), ValidationMode::Strict).is_err()
        );
        assert!(
            validate_properties(&cat, &props(json!({"kinds": ["v1"]})), ValidationMode::Strict)
                .is_ok()
        );
        assert!(
            validate_properties(&cat, &props(json!({"kinds": ["v1", "v2"]})), ValidationMode::Strict)
                .is_err()
        );
    }

    #[test]
    fn replace_null_blanks_empty_strings() {
        let mut payload = props(json!({"a": "", "b": "x"}));
        replace_null(&mut payload);
        assert!(payload["a"].is_null());
        assert_eq!(payload["b"], json!("x"));
    }

    #[test]
    fn draft_still_type_checks_present_values() {
        let cat = category(vec![field(
            "age",
            true,
            FieldType::Numeric { minval: None, maxval: None },
        )]);
        assert!(
            validate_properties(&cat, &props(json!({"age": "abc"})), ValidationMode::Draft).is_err()
        );
    }
}
