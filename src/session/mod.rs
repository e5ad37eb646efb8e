//! Request-scoped database sessions.
//!
//! Handlers open one session per request through a [`SessionFactory`]. A session that is
//! dropped without [`Session::commit`] discards its writes, so every early return (validation
//! failure, not-found, database error) releases the session and rolls back.

mod memory;
mod postgres;

pub use memory::{MemorySession, MemorySessionFactory};
pub use postgres::{PgSession, PgSessionFactory};

use crate::config::Resource;
use crate::error::AppError;
use crate::service::{Filter, Pagination};
use async_trait::async_trait;
use serde_json::Value;

/// One database row as column name → JSON value.
pub type Row = serde_json::Map<String, Value>;

#[async_trait]
pub trait Session: Send {
    /// Row with the given primary key.
    async fn get(&mut self, resource: &Resource, key: &Value) -> Result<Option<Row>, AppError>;

    /// Number of rows matching the filter.
    async fn count(&mut self, resource: &Resource, filter: &Filter) -> Result<u64, AppError>;

    /// Rows matching the filter in primary-key order, optionally one page of them.
    async fn fetch(
        &mut self,
        resource: &Resource,
        filter: &Filter,
        page: Option<&Pagination>,
    ) -> Result<Vec<Row>, AppError>;

    /// Insert; columns missing from `values` take their defaults. Returns the stored row.
    async fn insert(&mut self, resource: &Resource, values: &Row) -> Result<Row, AppError>;

    /// Set the given columns on the row with this key. None when no such row.
    async fn update(
        &mut self,
        resource: &Resource,
        key: &Value,
        values: &Row,
    ) -> Result<Option<Row>, AppError>;

    /// Delete the row with this key. False when no such row.
    async fn delete(&mut self, resource: &Resource, key: &Value) -> Result<bool, AppError>;

    async fn commit(self: Box<Self>) -> Result<(), AppError>;
}

/// Caller-supplied source of sessions, shared by every route.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn open(&self) -> Result<Box<dyn Session>, AppError>;
}
