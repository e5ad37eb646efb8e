//! Query-string filters → typed predicates, AND-composed.
//!
//! `field=value` compares for equality; `field__op=value` uses one of the operators
//! the resource declares for that field (`ne`, `lt`, `lte`, `gt`, `gte`, `like`).

use crate::config::{parse_timestamp, ColumnType, Operator, Resource};
use crate::error::AppError;
use crate::session::Row;
use serde_json::Value;
use std::cmp::Ordering;

/// Query parameters that are never treated as filters.
pub const RESERVED_PARAMS: &[&str] = &["start", "count", "expand"];

#[derive(Clone, Debug, PartialEq)]
pub struct Predicate {
    pub column: String,
    pub ty: ColumnType,
    pub op: Operator,
    pub value: Value,
}

impl Predicate {
    /// Evaluate against a row with SQL semantics: NULL never matches.
    pub fn matches(&self, row: &Row) -> bool {
        let Some(actual) = row.get(&self.column).filter(|v| !v.is_null()) else {
            return false;
        };
        if self.op == Operator::Like {
            return match (actual.as_str(), self.value.as_str()) {
                (Some(s), Some(pattern)) => like_match(pattern, s),
                _ => false,
            };
        }
        let Some(ord) = compare(self.ty, actual, &self.value) else {
            return false;
        };
        match self.op {
            Operator::Eq => ord == Ordering::Equal,
            Operator::Ne => ord != Ordering::Equal,
            Operator::Lt => ord == Ordering::Less,
            Operator::Lte => ord != Ordering::Greater,
            Operator::Gt => ord == Ordering::Greater,
            Operator::Gte => ord != Ordering::Less,
            Operator::Like => false,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Filter {
    pub predicates: Vec<Predicate>,
}

impl Filter {
    /// Build from query parameters, skipping [`RESERVED_PARAMS`].
    pub fn from_query<'a>(
        resource: &Resource,
        params: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<Self, AppError> {
        let mut predicates = Vec::new();
        for (key, raw) in params {
            if RESERVED_PARAMS.contains(&key) {
                continue;
            }
            predicates.push(parse_predicate(resource, key, raw)?);
        }
        Ok(Filter { predicates })
    }

    /// Single equality predicate, used to load related rows.
    pub fn eq(column: &str, ty: ColumnType, value: Value) -> Self {
        Filter {
            predicates: vec![Predicate {
                column: column.to_string(),
                ty,
                op: Operator::Eq,
                value,
            }],
        }
    }

    pub fn matches(&self, row: &Row) -> bool {
        self.predicates.iter().all(|p| p.matches(row))
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }
}

fn parse_predicate(resource: &Resource, key: &str, raw: &str) -> Result<Predicate, AppError> {
    let (field, op) = match resource.filter_field(key) {
        Some(field) => (field, Operator::Eq),
        None => {
            let (name, suffix) = key
                .rsplit_once("__")
                .ok_or_else(|| unrecognized(key))?;
            let field = resource.filter_field(name).ok_or_else(|| unrecognized(key))?;
            let op = Operator::from_suffix(suffix).ok_or_else(|| unrecognized(key))?;
            (field, op)
        }
    };
    if !field.operators.contains(&op) {
        return Err(AppError::Validation(format!(
            "filter operator '{}' is not allowed on '{}'",
            op.sql(),
            field.column
        )));
    }
    let column = resource
        .column(&field.column)
        .ok_or_else(|| unrecognized(key))?;
    let value = if op == Operator::Like {
        Value::String(raw.to_string())
    } else {
        column.ty.parse_str(raw).ok_or_else(|| {
            AppError::Validation(format!("{} must be {}, got '{}'", key, column.ty.describe(), raw))
        })?
    };
    Ok(Predicate {
        column: column.name.clone(),
        ty: column.ty,
        op,
        value,
    })
}

fn unrecognized(key: &str) -> AppError {
    AppError::Validation(format!("unrecognized filter parameter '{}'", key))
}

/// Order two non-null values of a column type. None when either is not of that type.
pub fn compare(ty: ColumnType, a: &Value, b: &Value) -> Option<Ordering> {
    match ty {
        ColumnType::Integer | ColumnType::Bigint => Some(a.as_i64()?.cmp(&b.as_i64()?)),
        ColumnType::Float => a.as_f64()?.partial_cmp(&b.as_f64()?),
        ColumnType::Boolean => Some(a.as_bool()?.cmp(&b.as_bool()?)),
        ColumnType::Text => Some(a.as_str()?.cmp(b.as_str()?)),
        ColumnType::Uuid => Some(a.as_str()?.to_ascii_lowercase().cmp(&b.as_str()?.to_ascii_lowercase())),
        ColumnType::Timestamp => Some(parse_timestamp(a.as_str()?)?.cmp(&parse_timestamp(b.as_str()?)?)),
    }
}

/// SQL LIKE: `%` any run, `_` any single char, `\` escapes the next char.
pub fn like_match(pattern: &str, s: &str) -> bool {
    #[derive(Clone, Copy)]
    enum Tok {
        Any,
        One,
        Lit(char),
    }
    let mut toks = Vec::new();
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        toks.push(match c {
            '%' => Tok::Any,
            '_' => Tok::One,
            '\\' => Tok::Lit(chars.next().unwrap_or('\\')),
            c => Tok::Lit(c),
        });
    }
    let text: Vec<char> = s.chars().collect();
    // matched[j]: the tokens so far can consume exactly text[..j]
    let mut matched = vec![false; text.len() + 1];
    matched[0] = true;
    for tok in toks {
        let mut next = vec![false; text.len() + 1];
        match tok {
            Tok::Any => {
                let mut reachable = false;
                for j in 0..=text.len() {
                    reachable |= matched[j];
                    next[j] = reachable;
                }
            }
            Tok::One => {
                for j in 1..=text.len() {
                    next[j] = matched[j - 1];
                }
            }
            Tok::Lit(c) => {
                for j in 1..=text.len() {
                    next[j] = matched[j - 1] && text[j - 1] == c;
                }
            }
        }
        matched = next;
    }
    matched[text.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{resolve_resource, ColumnConfig, EntityConfig, FilterFieldConfig, ResourceConfig};
    use serde_json::json;

    fn customers() -> Resource {
        resolve_resource(&ResourceConfig {
            singular_name: "customer".into(),
            plural_name: "customers".into(),
            entity: EntityConfig {
                schema: None,
                table: "customer".into(),
                primary_key: "customer_id".into(),
                columns: vec![
                    ColumnConfig::new("customer_id", ColumnType::Integer),
                    ColumnConfig::new("first_name", ColumnType::Text),
                    ColumnConfig::new("territory_id", ColumnType::Integer).nullable(),
                ],
            },
            model: vec![],
            create_params: None,
            update_params: None,
            query_filter: Some(vec![
                FilterFieldConfig::Spec {
                    name: "first_name".into(),
                    operators: vec![Operator::Eq, Operator::Like],
                },
                FilterFieldConfig::Spec {
                    name: "territory_id".into(),
                    operators: vec![Operator::Eq, Operator::Gte, Operator::Lt],
                },
            ]),
            expansions: vec![],
            cache: Default::default(),
        })
        .unwrap()
    }

    fn row(v: Value) -> Row {
        v.as_object().unwrap().clone()
    }

    #[test]
    fn parses_equality_and_operator_suffixes() {
        let r = customers();
        let f = Filter::from_query(&r, [("first_name", "Sherlock"), ("territory_id__gte", "2"), ("start", "0")]).unwrap();
        assert_eq!(f.predicates.len(), 2);
        assert_eq!(f.predicates[0].op, Operator::Eq);
        assert_eq!(f.predicates[0].value, json!("Sherlock"));
        assert_eq!(f.predicates[1].op, Operator::Gte);
        assert_eq!(f.predicates[1].value, json!(2));
    }

    #[test]
    fn rejects_unknown_keys_operators_and_types() {
        let r = customers();
        for (key, value) in [
            ("last_name", "Holmes"),
            ("customer_id", "1"),
            ("first_name__gt", "A"),
            ("first_name__between", "A"),
            ("territory_id", "London"),
        ] {
            assert!(
                matches!(Filter::from_query(&r, [(key, value)]), Err(AppError::Validation(_))),
                "{}={} should be rejected",
                key,
                value
            );
        }
    }

    #[test]
    fn predicates_compose_with_and() {
        let r = customers();
        let f = Filter::from_query(&r, [("territory_id__gte", "1"), ("territory_id__lt", "3")]).unwrap();
        assert!(f.matches(&row(json!({ "territory_id": 1 }))));
        assert!(f.matches(&row(json!({ "territory_id": 2 }))));
        assert!(!f.matches(&row(json!({ "territory_id": 3 }))));
        assert!(!f.matches(&row(json!({ "territory_id": null }))), "null never matches");
    }

    #[test]
    fn like_wildcards() {
        assert!(like_match("Sher%", "Sherlock"));
        assert!(like_match("%lock", "Sherlock"));
        assert!(like_match("J_hn", "John"));
        assert!(!like_match("J_hn", "Jon"));
        assert!(like_match("100\\%", "100%"));
        assert!(!like_match("100\\%", "1000"));
        assert!(like_match("%", ""));
    }
}
