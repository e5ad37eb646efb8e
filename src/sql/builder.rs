//! Builds parameterized SELECT, COUNT, INSERT, UPDATE, DELETE from a resolved resource.

use crate::config::{ColumnType, Operator, Resource};
use crate::service::{Filter, Pagination};
use crate::session::Row;
use serde_json::Value;

/// Quote identifier for PostgreSQL (safe: only from validated declarations).
pub fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Schema-qualified table name when the resource declares a schema.
pub fn qualified_table(resource: &Resource) -> String {
    match &resource.schema {
        Some(schema) => format!("{}.{}", quoted(schema), quoted(&resource.table)),
        None => quoted(&resource.table),
    }
}

#[derive(Debug)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    /// Bind a value and return its placeholder, cast to the column type (values bind as text).
    fn push_param(&mut self, v: Value, ty: ColumnType) -> String {
        self.params.push(v);
        format!("${}::{}", self.params.len(), ty.pg_type())
    }
}

fn select_column_list(resource: &Resource) -> String {
    resource
        .columns
        .iter()
        .map(|c| quoted(&c.name))
        .collect::<Vec<_>>()
        .join(", ")
}

fn where_clause(q: &mut QueryBuf, filter: &Filter) -> String {
    let mut parts = Vec::with_capacity(filter.predicates.len());
    for p in &filter.predicates {
        let ty = if p.op == Operator::Like { ColumnType::Text } else { p.ty };
        let ph = q.push_param(p.value.clone(), ty);
        parts.push(format!("{} {} {}", quoted(&p.column), p.op.sql(), ph));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", parts.join(" AND "))
    }
}

/// SELECT by primary key.
pub fn select_by_key(resource: &Resource, key: &Value) -> QueryBuf {
    let mut q = QueryBuf::new();
    let ph = q.push_param(key.clone(), resource.key_column().ty);
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} = {}",
        select_column_list(resource),
        qualified_table(resource),
        quoted(&resource.primary_key),
        ph
    );
    q
}

/// SELECT with AND-ed predicates, ORDER BY primary key, optional OFFSET/LIMIT.
pub fn select_list(resource: &Resource, filter: &Filter, page: Option<&Pagination>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let where_sql = where_clause(&mut q, filter);
    let page_sql = page
        .map(|p| format!(" LIMIT {} OFFSET {}", p.limit(), p.offset()))
        .unwrap_or_default();
    q.sql = format!(
        "SELECT {} FROM {}{} ORDER BY {}{}",
        select_column_list(resource),
        qualified_table(resource),
        where_sql,
        quoted(&resource.primary_key),
        page_sql
    );
    q
}

/// COUNT(*) of the rows matching the filter.
pub fn select_count(resource: &Resource, filter: &Filter) -> QueryBuf {
    let mut q = QueryBuf::new();
    let where_sql = where_clause(&mut q, filter);
    q.sql = format!("SELECT COUNT(*) FROM {}{}", qualified_table(resource), where_sql);
    q
}

/// INSERT the given columns; omitted columns take their database default.
pub fn insert(resource: &Resource, values: &Row) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut cols = Vec::new();
    let mut placeholders = Vec::new();
    for c in &resource.columns {
        let Some(v) = values.get(&c.name) else { continue };
        placeholders.push(q.push_param(v.clone(), c.ty));
        cols.push(quoted(&c.name));
    }
    let returning = select_column_list(resource);
    q.sql = if cols.is_empty() {
        format!(
            "INSERT INTO {} DEFAULT VALUES RETURNING {}",
            qualified_table(resource),
            returning
        )
    } else {
        format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
            qualified_table(resource),
            cols.join(", "),
            placeholders.join(", "),
            returning
        )
    };
    q
}

/// UPDATE by key: SET only the given columns (the primary key is never set).
/// With nothing to set this degrades to a SELECT by key.
pub fn update(resource: &Resource, key: &Value, values: &Row) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut sets = Vec::new();
    for c in &resource.columns {
        if c.name == resource.primary_key {
            continue;
        }
        let Some(v) = values.get(&c.name) else { continue };
        let ph = q.push_param(v.clone(), c.ty);
        sets.push(format!("{} = {}", quoted(&c.name), ph));
    }
    if sets.is_empty() {
        return select_by_key(resource, key);
    }
    let key_ph = q.push_param(key.clone(), resource.key_column().ty);
    q.sql = format!(
        "UPDATE {} SET {} WHERE {} = {} RETURNING {}",
        qualified_table(resource),
        sets.join(", "),
        quoted(&resource.primary_key),
        key_ph,
        select_column_list(resource)
    );
    q
}

/// DELETE by key, returning the key of the deleted row.
pub fn delete(resource: &Resource, key: &Value) -> QueryBuf {
    let mut q = QueryBuf::new();
    let ph = q.push_param(key.clone(), resource.key_column().ty);
    q.sql = format!(
        "DELETE FROM {} WHERE {} = {} RETURNING {}",
        qualified_table(resource),
        quoted(&resource.primary_key),
        ph,
        quoted(&resource.primary_key)
    );
    q
}
