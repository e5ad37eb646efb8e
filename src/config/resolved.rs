//! Resolved resources: declarations validated and flattened for runtime use.

use crate::config::{ColumnType, Operator};
use crate::session::Row;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

impl ColumnType {
    /// PostgreSQL type used to cast bound parameters.
    pub fn pg_type(self) -> &'static str {
        match self {
            ColumnType::Integer => "int4",
            ColumnType::Bigint => "int8",
            ColumnType::Text => "text",
            ColumnType::Boolean => "bool",
            ColumnType::Float => "float8",
            ColumnType::Uuid => "uuid",
            ColumnType::Timestamp => "timestamptz",
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            ColumnType::Integer | ColumnType::Bigint => "an integer",
            ColumnType::Text => "a string",
            ColumnType::Boolean => "a boolean",
            ColumnType::Float => "a number",
            ColumnType::Uuid => "a uuid",
            ColumnType::Timestamp => "an RFC 3339 timestamp",
        }
    }

    /// Parse a query-string or path value. None when it is not of this type.
    pub fn parse_str(self, s: &str) -> Option<Value> {
        match self {
            ColumnType::Integer => s.parse::<i32>().ok().map(Value::from),
            ColumnType::Bigint => s.parse::<i64>().ok().map(Value::from),
            ColumnType::Text => Some(Value::String(s.to_string())),
            ColumnType::Boolean => match s.to_ascii_lowercase().as_str() {
                "true" | "1" => Some(Value::Bool(true)),
                "false" | "0" => Some(Value::Bool(false)),
                _ => None,
            },
            ColumnType::Float => s
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number),
            ColumnType::Uuid => uuid::Uuid::parse_str(s).ok().map(|u| Value::String(u.to_string())),
            ColumnType::Timestamp => parse_timestamp(s).map(|d| Value::String(d.to_rfc3339())),
        }
    }

    /// Check and normalize a JSON body value. Null is handled by the caller.
    pub fn coerce_json(self, v: &Value) -> Option<Value> {
        match (self, v) {
            (ColumnType::Integer, Value::Number(n)) => n
                .as_i64()
                .and_then(|i| i32::try_from(i).ok())
                .map(Value::from),
            (ColumnType::Bigint, Value::Number(n)) => n.as_i64().map(Value::from),
            (ColumnType::Float, Value::Number(n)) => n
                .as_f64()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number),
            (ColumnType::Text, Value::String(_)) | (ColumnType::Boolean, Value::Bool(_)) => Some(v.clone()),
            (ColumnType::Uuid | ColumnType::Timestamp, Value::String(s)) => self.parse_str(s),
            _ => None,
        }
    }
}

/// RFC 3339, or a naive `YYYY-MM-DDTHH:MM:SS[.f]` taken as UTC.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(d) = DateTime::parse_from_rfc3339(s) {
        return Some(d.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|n| n.and_utc())
}

#[derive(Clone, Debug)]
pub struct Column {
    pub name: String,
    pub ty: ColumnType,
    pub nullable: bool,
    pub has_default: bool,
}

#[derive(Clone, Debug)]
pub struct ParamField {
    pub name: String,
    pub required: bool,
}

/// Fields a create or update body may carry.
#[derive(Clone, Debug)]
pub struct Params {
    pub fields: Vec<ParamField>,
}

impl Params {
    pub fn field(&self, name: &str) -> Option<&ParamField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[derive(Clone, Debug)]
pub struct FilterField {
    pub column: String,
    pub operators: Vec<Operator>,
}

#[derive(Clone, Debug)]
pub struct Expansion {
    /// Plural name of the related resource, also the key it is returned under.
    pub resource: String,
    pub local_column: String,
    pub remote_column: String,
}

#[derive(Clone, Debug, Default)]
pub struct CachePolicy {
    pub max_age: u32,
    pub etag_column: Option<String>,
    pub last_modified_column: Option<String>,
}

#[derive(Clone, Debug)]
pub struct Resource {
    pub singular_name: String,
    pub plural_name: String,
    pub schema: Option<String>,
    pub table: String,
    pub primary_key: String,
    pub columns: Vec<Column>,
    /// Columns exposed in responses, in declaration order.
    pub model: Vec<String>,
    pub create_params: Option<Params>,
    pub update_params: Option<Params>,
    /// None: the list route accepts no filter parameters.
    pub query_filter: Option<Vec<FilterField>>,
    pub expansions: Vec<Expansion>,
    pub cache: CachePolicy,
}

impl Resource {
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn key_column(&self) -> &Column {
        // resolve() guarantees the key is a declared column
        self.column(&self.primary_key)
            .unwrap_or(&self.columns[0])
    }

    pub fn filter_field(&self, name: &str) -> Option<&FilterField> {
        self.query_filter
            .as_ref()
            .and_then(|fields| fields.iter().find(|f| f.column == name))
    }

    /// Parse a path identifier. None when it cannot identify any row.
    pub fn parse_key(&self, raw: &str) -> Option<Value> {
        self.key_column().ty.parse_str(raw)
    }

    /// Project a row through the serialization model.
    pub fn serialize(&self, row: &Row) -> Value {
        let mut out = Map::new();
        for name in &self.model {
            out.insert(name.clone(), row.get(name).cloned().unwrap_or(Value::Null));
        }
        Value::Object(out)
    }

    pub fn not_found(&self) -> String {
        format!("specified {} not found", self.singular_name)
    }
}

/// Resources known to an application, keyed by plural name.
#[derive(Clone, Debug, Default)]
pub struct ResourceRegistry {
    resources: HashMap<String, Arc<Resource>>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resource, replacing any earlier one with the same plural name.
    pub fn register(&mut self, resource: Resource) -> Arc<Resource> {
        let resource = Arc::new(resource);
        if self
            .resources
            .insert(resource.plural_name.clone(), resource.clone())
            .is_some()
        {
            tracing::warn!(resource = %resource.plural_name, "resource already registered, overwriting");
        }
        resource
    }

    pub fn get(&self, plural_name: &str) -> Option<Arc<Resource>> {
        self.resources.get(plural_name).cloned()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Resource>> {
        self.resources.values()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_str_rejects_mistyped_values() {
        assert_eq!(ColumnType::Integer.parse_str("42"), Some(json!(42)));
        assert_eq!(ColumnType::Integer.parse_str("forty-two"), None);
        assert_eq!(ColumnType::Boolean.parse_str("TRUE"), Some(json!(true)));
        assert_eq!(ColumnType::Boolean.parse_str("yes"), None);
        assert_eq!(ColumnType::Uuid.parse_str("not-a-uuid"), None);
    }

    #[test]
    fn timestamps_normalize_to_utc() {
        assert_eq!(
            ColumnType::Timestamp.parse_str("2020-01-01T01:00:00+01:00"),
            Some(json!("2020-01-01T00:00:00+00:00"))
        );
        assert_eq!(
            ColumnType::Timestamp.parse_str("2020-01-01T00:00:00"),
            Some(json!("2020-01-01T00:00:00+00:00"))
        );
    }

    #[test]
    fn coerce_json_checks_range_and_kind() {
        assert_eq!(ColumnType::Integer.coerce_json(&json!(7)), Some(json!(7)));
        assert_eq!(ColumnType::Integer.coerce_json(&json!(5_000_000_000i64)), None);
        assert_eq!(ColumnType::Integer.coerce_json(&json!("7")), None);
        assert_eq!(ColumnType::Text.coerce_json(&json!(7)), None);
        assert_eq!(ColumnType::Float.coerce_json(&json!(2)), Some(json!(2.0)));
    }

    fn territories(table: &str) -> Resource {
        use crate::config::{resolve_resource, ColumnConfig, EntityConfig, ResourceConfig};
        resolve_resource(&ResourceConfig {
            singular_name: "territory".into(),
            plural_name: "territories".into(),
            entity: EntityConfig {
                schema: None,
                table: table.into(),
                primary_key: "territory_id".into(),
                columns: vec![
                    ColumnConfig::new("territory_id", ColumnType::Integer),
                    ColumnConfig::new("name", ColumnType::Text),
                ],
            },
            model: vec![],
            create_params: None,
            update_params: None,
            query_filter: None,
            expansions: vec![],
            cache: Default::default(),
        })
        .unwrap()
    }

    #[test]
    fn registering_same_plural_replaces_earlier_resource() {
        let mut registry = ResourceRegistry::new();
        registry.register(territories("territory"));
        let second = registry.register(territories("territory_v2"));
        assert_eq!(registry.len(), 1);
        let current = registry.get("territories").unwrap();
        assert_eq!(current.table, "territory_v2");
        assert!(Arc::ptr_eq(&current, &second));
    }
}
