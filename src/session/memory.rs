//! In-memory sessions for development, demos and tests.
//!
//! Readers see the last committed state. The first write in a session takes the store's
//! write lock and works on a copy; commit publishes the copy, drop discards it.

use super::{Row, Session, SessionFactory};
use crate::config::{ColumnType, Resource};
use crate::error::AppError;
use crate::service::{Filter, Pagination};
use crate::sql::qualified_table;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Key {
    Int(i64),
    Text(String),
}

impl Key {
    fn from_value(ty: ColumnType, v: &Value) -> Option<Key> {
        match ty {
            ColumnType::Integer | ColumnType::Bigint => v.as_i64().map(Key::Int),
            ColumnType::Uuid => v.as_str().map(|s| Key::Text(s.to_ascii_lowercase())),
            _ => v.as_str().map(|s| Key::Text(s.to_string())),
        }
    }
}

#[derive(Clone, Debug, Default)]
struct Table {
    rows: BTreeMap<Key, Row>,
    next_id: i64,
}

type Tables = HashMap<String, Table>;

#[derive(Clone, Default)]
pub struct MemorySessionFactory {
    tables: Arc<Mutex<Tables>>,
}

impl MemorySessionFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert rows directly, outside any session.
    pub async fn seed(&self, resource: &Resource, rows: impl IntoIterator<Item = Value>) -> Result<(), AppError> {
        let mut tables = self.tables.lock().await;
        let table = tables.entry(qualified_table(resource)).or_default();
        for row in rows {
            let Value::Object(values) = row else {
                return Err(AppError::Store("seed rows must be JSON objects".into()));
            };
            insert_row(table, resource, &values)?;
        }
        Ok(())
    }
}

#[async_trait]
impl SessionFactory for MemorySessionFactory {
    async fn open(&self) -> Result<Box<dyn Session>, AppError> {
        Ok(Box::new(MemorySession {
            shared: self.tables.clone(),
            write: None,
        }))
    }
}

pub struct MemorySession {
    shared: Arc<Mutex<Tables>>,
    /// Held from the first write until commit or drop.
    write: Option<(OwnedMutexGuard<Tables>, Tables)>,
}

impl MemorySession {
    async fn working(&mut self) -> &mut Tables {
        if self.write.is_none() {
            let guard = self.shared.clone().lock_owned().await;
            let copy = guard.clone();
            self.write = Some((guard, copy));
        }
        match &mut self.write {
            Some((_, copy)) => copy,
            None => unreachable!("write state set above"),
        }
    }

    /// Run a read against the session's own writes if any, else the committed state.
    async fn read<T>(&self, resource: &Resource, f: impl FnOnce(Option<&Table>) -> T) -> T {
        let name = qualified_table(resource);
        match &self.write {
            Some((_, copy)) => f(copy.get(&name)),
            None => {
                let tables = self.shared.lock().await;
                f(tables.get(&name))
            }
        }
    }
}

#[async_trait]
impl Session for MemorySession {
    async fn get(&mut self, resource: &Resource, key: &Value) -> Result<Option<Row>, AppError> {
        let Some(key) = Key::from_value(resource.key_column().ty, key) else {
            return Ok(None);
        };
        Ok(self
            .read(resource, |t| t.and_then(|t| t.rows.get(&key).cloned()))
            .await)
    }

    async fn count(&mut self, resource: &Resource, filter: &Filter) -> Result<u64, AppError> {
        Ok(self
            .read(resource, |t| {
                t.map(|t| t.rows.values().filter(|r| filter.matches(r)).count() as u64)
                    .unwrap_or(0)
            })
            .await)
    }

    async fn fetch(
        &mut self,
        resource: &Resource,
        filter: &Filter,
        page: Option<&Pagination>,
    ) -> Result<Vec<Row>, AppError> {
        let (skip, take) = match page {
            Some(p) => (p.offset() as usize, p.limit() as usize),
            None => (0, usize::MAX),
        };
        Ok(self
            .read(resource, |t| {
                t.map(|t| {
                    t.rows
                        .values()
                        .filter(|r| filter.matches(r))
                        .skip(skip)
                        .take(take)
                        .cloned()
                        .collect()
                })
                .unwrap_or_default()
            })
            .await)
    }

    async fn insert(&mut self, resource: &Resource, values: &Row) -> Result<Row, AppError> {
        let name = qualified_table(resource);
        let table = self.working().await.entry(name).or_default();
        insert_row(table, resource, values)
    }

    async fn update(
        &mut self,
        resource: &Resource,
        key: &Value,
        values: &Row,
    ) -> Result<Option<Row>, AppError> {
        let Some(key) = Key::from_value(resource.key_column().ty, key) else {
            return Ok(None);
        };
        let name = qualified_table(resource);
        let Some(row) = self
            .working()
            .await
            .get_mut(&name)
            .and_then(|t| t.rows.get_mut(&key))
        else {
            return Ok(None);
        };
        for c in &resource.columns {
            if c.name == resource.primary_key {
                continue;
            }
            if let Some(v) = values.get(&c.name) {
                row.insert(c.name.clone(), v.clone());
            }
        }
        Ok(Some(row.clone()))
    }

    async fn delete(&mut self, resource: &Resource, key: &Value) -> Result<bool, AppError> {
        let Some(key) = Key::from_value(resource.key_column().ty, key) else {
            return Ok(false);
        };
        let name = qualified_table(resource);
        Ok(self
            .working()
            .await
            .get_mut(&name)
            .and_then(|t| t.rows.remove(&key))
            .is_some())
    }

    async fn commit(self: Box<Self>) -> Result<(), AppError> {
        if let Some((mut guard, copy)) = self.write {
            *guard = copy;
        }
        Ok(())
    }
}

/// Store only declared columns, filling omitted ones the way the database would.
fn insert_row(table: &mut Table, resource: &Resource, values: &Row) -> Result<Row, AppError> {
    let mut row = Row::new();
    for c in &resource.columns {
        let value = match values.get(&c.name) {
            Some(v) => v.clone(),
            None if c.has_default => match c.ty {
                ColumnType::Integer | ColumnType::Bigint if c.name == resource.primary_key => {
                    Value::from(table.next_id.max(0) + 1)
                }
                ColumnType::Integer | ColumnType::Bigint => Value::from(0),
                ColumnType::Float => Value::from(0.0),
                ColumnType::Boolean => Value::Bool(false),
                ColumnType::Text => Value::String(String::new()),
                ColumnType::Uuid => Value::String(uuid::Uuid::new_v4().to_string()),
                ColumnType::Timestamp => Value::String(chrono::Utc::now().to_rfc3339()),
            },
            None if c.nullable => Value::Null,
            None => {
                return Err(AppError::Store(format!(
                    "null value in column '{}' of '{}' violates not-null constraint",
                    c.name, resource.table
                )))
            }
        };
        row.insert(c.name.clone(), value);
    }
    let key_value = row.get(&resource.primary_key).cloned().unwrap_or(Value::Null);
    let key = Key::from_value(resource.key_column().ty, &key_value).ok_or_else(|| {
        AppError::Store(format!("invalid primary key for '{}'", resource.table))
    })?;
    if table.rows.contains_key(&key) {
        return Err(AppError::Store(format!(
            "duplicate key value {} for '{}'",
            key_value, resource.table
        )));
    }
    if let Key::Int(n) = key {
        table.next_id = table.next_id.max(n);
    }
    table.rows.insert(key, row.clone());
    Ok(row)
}
