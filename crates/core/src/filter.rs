//! Data grouping filter compiler.
//!
//! Compiles a grouping's rules into two observationally equivalent forms: a
//! pure predicate over a contribution row (single-fetch admission) and a
//! sea-orm [`Condition`] over the contribution table (list queries). The
//! compiler is deterministic and side-effect-free.

use std::collections::BTreeMap;

use geonote_common::{AppError, AppResult};
use geonote_db::entities::{contribution, rule};
use sea_orm::Condition;
use sea_orm::sea_query::{Expr, Value};
use sea_orm::ColumnTrait;
use serde_json::Value as Json;

use crate::fields::{CategorySchema, FieldType};

/// One compiled per-field constraint.
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    /// Case-insensitive substring match.
    TextContains(String),
    /// Inclusive numeric interval.
    NumericRange {
        minval: Option<f64>,
        maxval: Option<f64>,
    },
    /// Exact equality.
    BooleanEquals(bool),
    /// Inclusive interval over ISO-formatted values.
    DateRange {
        minval: Option<String>,
        maxval: Option<String>,
    },
    /// Membership in an id set.
    LookupIn(Vec<String>),
    /// Non-empty intersection with an id set.
    MultiLookupIntersects(Vec<String>),
}

impl Constraint {
    /// Evaluate against one property value. Missing values never match.
    #[must_use]
    pub fn matches(&self, value: Option<&Json>) -> bool {
        let Some(value) = value else { return false };
        if value.is_null() {
            return false;
        }

        match self {
            Self::TextContains(needle) => value
                .as_str()
                .is_some_and(|s| s.to_lowercase().contains(&needle.to_lowercase())),
            Self::NumericRange { minval, maxval } => {
                let Some(number) = as_number(value) else {
                    return false;
                };
                minval.is_none_or(|min| number >= min) && maxval.is_none_or(|max| number <= max)
            }
            Self::BooleanEquals(expected) => {
                // Parity with SQL `->>` text extraction
                as_text(value).is_some_and(|s| s == if *expected { "true" } else { "false" })
            }
            Self::DateRange { minval, maxval } => {
                let Some(text) = value.as_str() else {
                    return false;
                };
                minval.as_deref().is_none_or(|min| text >= min)
                    && maxval.as_deref().is_none_or(|max| text <= max)
            }
            Self::LookupIn(ids) => value.as_str().is_some_and(|id| ids.iter().any(|i| i == id)),
            Self::MultiLookupIntersects(ids) => value.as_array().is_some_and(|values| {
                values
                    .iter()
                    .filter_map(Json::as_str)
                    .any(|id| ids.iter().any(|i| i == id))
            }),
        }
    }

    /// The equivalent SQL condition on `properties ->> key`.
    #[must_use]
    pub fn to_condition(&self, key: &str) -> Condition {
        match self {
            Self::TextContains(needle) => Condition::all().add(Expr::cust_with_values(
                "properties ->> ? ILIKE ?",
                [
                    Value::from(key.to_string()),
                    Value::from(format!("%{}%", escape_like(needle))),
                ],
            )),
            Self::NumericRange { minval, maxval } => {
                let mut cond = Condition::all();
                if let Some(min) = minval {
                    cond = cond.add(Expr::cust_with_values(
                        "(properties ->> ?)::numeric >= ?",
                        [Value::from(key.to_string()), Value::from(*min)],
                    ));
                }
                if let Some(max) = maxval {
                    cond = cond.add(Expr::cust_with_values(
                        "(properties ->> ?)::numeric <= ?",
                        [Value::from(key.to_string()), Value::from(*max)],
                    ));
                }
                cond
            }
            Self::BooleanEquals(expected) => Condition::all().add(Expr::cust_with_values(
                "properties ->> ? = ?",
                [
                    Value::from(key.to_string()),
                    Value::from(if *expected { "true" } else { "false" }),
                ],
            )),
            Self::DateRange { minval, maxval } => {
                let mut cond = Condition::all();
                if let Some(min) = minval {
                    cond = cond.add(Expr::cust_with_values(
                        "properties ->> ? >= ?",
                        [Value::from(key.to_string()), Value::from(min.clone())],
                    ));
                }
                if let Some(max) = maxval {
                    cond = cond.add(Expr::cust_with_values(
                        "properties ->> ? <= ?",
                        [Value::from(key.to_string()), Value::from(max.clone())],
                    ));
                }
                cond
            }
            Self::LookupIn(ids) => {
                let mut cond = Condition::any();
                for id in ids {
                    cond = cond.add(Expr::cust_with_values(
                        "properties ->> ? = ?",
                        [Value::from(key.to_string()), Value::from(id.clone())],
                    ));
                }
                cond
            }
            Self::MultiLookupIntersects(ids) => {
                let mut cond = Condition::any();
                for id in ids {
                    cond = cond.add(Expr::cust_with_values(
                        "properties -> ? @> ?",
                        [
                            Value::from(key.to_string()),
                            Value::from(serde_json::json!([id])),
                        ],
                    ));
                }
                cond
            }
        }
    }
}

/// One compiled rule: a disjunct pinned to a single category.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledRule {
    pub category_id: String,
    pub min_date: Option<chrono::DateTime<chrono::FixedOffset>>,
    pub max_date: Option<chrono::DateTime<chrono::FixedOffset>>,
    /// Sorted by key so compilation is deterministic.
    pub constraints: BTreeMap<String, Constraint>,
}

impl CompiledRule {
    /// Evaluate against one contribution row.
    #[must_use]
    pub fn matches(&self, contribution: &contribution::Model) -> bool {
        if contribution.category_id != self.category_id {
            return false;
        }
        if self.min_date.is_some_and(|min| contribution.created_at < min) {
            return false;
        }
        if self.max_date.is_some_and(|max| contribution.created_at > max) {
            return false;
        }
        let properties = contribution.properties.as_object();
        self.constraints.iter().all(|(key, constraint)| {
            constraint.matches(properties.and_then(|p| p.get(key)))
        })
    }

    fn to_condition(&self) -> Condition {
        let mut cond =
            Condition::all().add(contribution::Column::CategoryId.eq(self.category_id.clone()));
        if let Some(min) = self.min_date {
            cond = cond.add(contribution::Column::CreatedAt.gte(min));
        }
        if let Some(max) = self.max_date {
            cond = cond.add(contribution::Column::CreatedAt.lte(max));
        }
        for (key, constraint) in &self.constraints {
            cond = cond.add(constraint.to_condition(key));
        }
        cond
    }
}

/// The compiled filter of one grouping: a disjunction of rules.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompiledGrouping {
    pub rules: Vec<CompiledRule>,
}

impl CompiledGrouping {
    /// Compile a grouping's active rules against the category schemas of
    /// the project. Constraint keys must exist as active fields of the
    /// pinned category.
    pub fn compile(rules: &[rule::Model], schemas: &[CategorySchema]) -> AppResult<Self> {
        let mut compiled = Vec::with_capacity(rules.len());
        for rule in rules {
            let schema = schemas
                .iter()
                .find(|s| s.id == rule.category_id)
                .ok_or_else(|| {
                    AppError::BadRequest(format!("Rule references unknown category {}", rule.category_id))
                })?;

            let mut constraints = BTreeMap::new();
            if let Some(raw) = &rule.constraints {
                let map = raw.as_object().ok_or_else(|| {
                    AppError::BadRequest("Rule constraints must be an object".to_string())
                })?;
                for (key, value) in map {
                    let field = schema.active_field(key).ok_or_else(|| {
                        AppError::BadRequest(format!(
                            "Rule constraint key '{key}' is not an active field of the category"
                        ))
                    })?;
                    constraints.insert(key.clone(), parse_constraint(&field.field_type, value)?);
                }
            }

            compiled.push(CompiledRule {
                category_id: rule.category_id.clone(),
                min_date: rule.min_date,
                max_date: rule.max_date,
                constraints,
            });
        }
        Ok(Self { rules: compiled })
    }

    /// Evaluate against one contribution row. An empty rule set admits
    /// nothing.
    #[must_use]
    pub fn matches(&self, contribution: &contribution::Model) -> bool {
        self.rules.iter().any(|rule| rule.matches(contribution))
    }

    /// The equivalent SQL condition. An empty rule set yields constant
    /// false.
    #[must_use]
    pub fn to_condition(&self) -> Condition {
        if self.rules.is_empty() {
            return Condition::any().add(Expr::value(false));
        }
        let mut cond = Condition::any();
        for rule in &self.rules {
            cond = cond.add(rule.to_condition());
        }
        cond
    }
}

/// Validate a constraints map for a rule write. Returns `BadRequest` if a
/// key is not an active field or a value has the wrong shape.
pub fn validate_constraints(schema: &CategorySchema, constraints: &Json) -> AppResult<()> {
    let map = constraints
        .as_object()
        .ok_or_else(|| AppError::BadRequest("Rule constraints must be an object".to_string()))?;
    for (key, value) in map {
        let field = schema.active_field(key).ok_or_else(|| {
            AppError::BadRequest(format!(
                "Rule constraint key '{key}' is not an active field of the category"
            ))
        })?;
        parse_constraint(&field.field_type, value)?;
    }
    Ok(())
}

fn parse_constraint(field_type: &FieldType, value: &Json) -> AppResult<Constraint> {
    match field_type {
        FieldType::Text { .. } => {
            let needle = value
                .as_str()
                .or_else(|| value.get("value").and_then(Json::as_str))
                .ok_or_else(|| bad_shape("text", "a string"))?;
            Ok(Constraint::TextContains(needle.to_string()))
        }
        FieldType::Numeric { .. } => {
            let obj = value.as_object().ok_or_else(|| {
                bad_shape("numeric", "an object with optional minval/maxval")
            })?;
            Ok(Constraint::NumericRange {
                minval: obj.get("minval").and_then(Json::as_f64),
                maxval: obj.get("maxval").and_then(Json::as_f64),
            })
        }
        FieldType::Boolean => {
            let expected = value
                .as_bool()
                .ok_or_else(|| bad_shape("boolean", "a boolean"))?;
            Ok(Constraint::BooleanEquals(expected))
        }
        FieldType::Date | FieldType::Datetime | FieldType::Time => {
            let obj = value.as_object().ok_or_else(|| {
                bad_shape("date", "an object with optional minval/maxval")
            })?;
            Ok(Constraint::DateRange {
                minval: obj.get("minval").and_then(Json::as_str).map(String::from),
                maxval: obj.get("maxval").and_then(Json::as_str).map(String::from),
            })
        }
        FieldType::Lookup { .. } | FieldType::MultiLookup { .. } => {
            let ids = value
                .as_array()
                .ok_or_else(|| bad_shape("lookup", "a list of value ids"))?
                .iter()
                .map(|v| {
                    v.as_str()
                        .map(String::from)
                        .ok_or_else(|| bad_shape("lookup", "a list of value ids"))
                })
                .collect::<AppResult<Vec<_>>>()?;
            if matches!(field_type, FieldType::Lookup { .. }) {
                Ok(Constraint::LookupIn(ids))
            } else {
                Ok(Constraint::MultiLookupIntersects(ids))
            }
        }
    }
}

fn bad_shape(subtype: &str, expected: &str) -> AppError {
    AppError::BadRequest(format!("Constraint on {subtype} field must be {expected}"))
}

/// Parity with [`Constraint::matches`] on numbers and numeric strings.
fn as_number(value: &Json) -> Option<f64> {
    match value {
        Json::Number(n) => n.as_f64(),
        Json::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// The textual form `->>` would produce for a scalar.
fn as_text(value: &Json) -> Option<String> {
    match value {
        Json::Bool(b) => Some(b.to_string()),
        Json::String(s) => Some(s.clone()),
        Json::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn escape_like(needle: &str) -> String {
    needle.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use geonote_db::entities::contribution::ContributionStatus;
    use serde_json::json;

    fn contribution(category_id: &str, properties: Json) -> contribution::Model {
        contribution::Model {
            id: "o1".to_string(),
            project_id: "p1".to_string(),
            category_id: category_id.to_string(),
            location_id: "l1".to_string(),
            status: ContributionStatus::Active,
            properties,
            creator_id: "u1".to_string(),
            updator_id: None,
            version: 1,
            display_field: None,
            num_media: 0,
            num_comments: 0,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn rule_with(category_id: &str, constraints: BTreeMap<String, Constraint>) -> CompiledRule {
        CompiledRule {
            category_id: category_id.to_string(),
            min_date: None,
            max_date: None,
            constraints,
        }
    }

    #[test]
    fn empty_grouping_admits_nothing() {
        let grouping = CompiledGrouping::default();
        assert!(!grouping.matches(&contribution("c1", json!({}))));
    }

    #[test]
    fn rule_pins_category() {
        let grouping = CompiledGrouping {
            rules: vec![rule_with("c1", BTreeMap::new())],
        };
        assert!(grouping.matches(&contribution("c1", json!({}))));
        assert!(!grouping.matches(&contribution("c2", json!({}))));
    }

    #[test]
    fn numeric_constraint_is_inclusive() {
        let mut constraints = BTreeMap::new();
        constraints.insert(
            "age".to_string(),
            Constraint::NumericRange { minval: Some(18.0), maxval: None },
        );
        let grouping = CompiledGrouping { rules: vec![rule_with("c1", constraints)] };

        assert!(grouping.matches(&contribution("c1", json!({"age": 18}))));
        assert!(grouping.matches(&contribution("c1", json!({"age": "30"}))));
        assert!(!grouping.matches(&contribution("c1", json!({"age": 12}))));
        assert!(!grouping.matches(&contribution("c1", json!({}))));
    }

    #[test]
    fn text_constraint_is_case_insensitive_substring() {
        let mut constraints = BTreeMap::new();
        constraints.insert("name".to_string(), Constraint::TextContains("Oak".to_string()));
        let grouping = CompiledGrouping { rules: vec![rule_with("c1", constraints)] };

        assert!(grouping.matches(&contribution("c1", json!({"name": "old oak tree"}))));
        assert!(!grouping.matches(&contribution("c1", json!({"name": "elm"}))));
    }

    #[test]
    fn multi_lookup_needs_intersection() {
        let mut constraints = BTreeMap::new();
        constraints.insert(
            "kinds".to_string(),
            Constraint::MultiLookupIntersects(vec!["v1".to_string(), "v2".to_string()]),
        );
        let grouping = CompiledGrouping { rules: vec![rule_with("c1", constraints)] };

        assert!(grouping.matches(&contribution("c1", json!({"kinds": ["v2", "v9"]}))));
        assert!(!grouping.matches(&contribution("c1", json!({"kinds": ["v9"]}))));
        assert!(!grouping.matches(&contribution("c1", json!({"kinds": []}))));
    }

    #[test]
    fn date_window_bounds_creation_time() {
        let now = Utc::now();
        let rule = CompiledRule {
            category_id: "c1".to_string(),
            min_date: Some((now + chrono::Duration::hours(1)).into()),
            max_date: None,
            constraints: BTreeMap::new(),
        };
        let grouping = CompiledGrouping { rules: vec![rule] };
        assert!(!grouping.matches(&contribution("c1", json!({}))));
    }

    #[test]
    fn rules_are_disjunctive() {
        let grouping = CompiledGrouping {
            rules: vec![rule_with("c1", BTreeMap::new()), rule_with("c2", BTreeMap::new())],
        };
        assert!(grouping.matches(&contribution("c1", json!({}))));
        assert!(grouping.matches(&contribution("c2", json!({}))));
        assert!(!grouping.matches(&contribution("c3", json!({}))));
    }

    #[test]
    fn compilation_is_deterministic() {
        let rules = vec![rule::Model {
            id: "r1".to_string(),
            grouping_id: "g1".to_string(),
            category_id: "c1".to_string(),
            min_date: None,
            max_date: None,
            constraints: Some(json!({"age": {"minval": 18}})),
            status: rule::RuleStatus::Active,
        }];
        let schema = crate::fields::CategorySchema {
            id: "c1".to_string(),
            project_id: "p1".to_string(),
            name: "Trees".to_string(),
            description: None,
            active: true,
            default_status: geonote_db::entities::category::DefaultStatus::Pending,
            display_field_id: None,
            fields: vec![crate::fields::FieldSchema {
                id: "f1".to_string(),
                key: "age".to_string(),
                name: "Age".to_string(),
                description: None,
                required: false,
                active: true,
                order: 0,
                field_type: FieldType::Numeric { minval: None, maxval: None },
            }],
        };

        let first = CompiledGrouping::compile(&rules, std::slice::from_ref(&schema)).unwrap();
        let second = CompiledGrouping::compile(&rules, std::slice::from_ref(&schema)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn constraint_on_unknown_key_is_rejected() {
        let rules = vec![rule::Model {
            id: "r1".to_string(),
            grouping_id: "g1".to_string(),
            category_id: "c1".to_string(),
            min_date: None,
            max_date: None,
            constraints: Some(json!({"mystery": {"minval": 1}})),
            status: rule::RuleStatus::Active,
        }];
        let schema = crate::fields::CategorySchema {
            id: "c1".to_string(),
            project_id: "p1".to_string(),
            name: "Trees".to_string(),
            description: None,
            active: true,
            default_status: geonote_db::entities::category::DefaultStatus::Pending,
            display_field_id: None,
            fields: vec![],
        };

        assert!(CompiledGrouping::compile(&rules, std::slice::from_ref(&schema)).is_err());
    }
}
