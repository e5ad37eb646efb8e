//! Sessions over a PostgreSQL transaction.

use super::{Row, Session, SessionFactory};
use crate::config::{Column, ColumnType, Resource};
use crate::error::AppError;
use crate::service::{Filter, Pagination};
use crate::sql::{self, PgBindValue, QueryBuf};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Transaction};

#[derive(Clone)]
pub struct PgSessionFactory {
    pool: PgPool,
}

impl PgSessionFactory {
    pub fn new(pool: PgPool) -> Self {
        PgSessionFactory { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl SessionFactory for PgSessionFactory {
    async fn open(&self) -> Result<Box<dyn Session>, AppError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgSession { tx }))
    }
}

/// Dropping the session rolls back the transaction and returns the connection to the pool.
pub struct PgSession {
    tx: Transaction<'static, Postgres>,
}

impl PgSession {
    async fn fetch_optional(&mut self, resource: &Resource, q: &QueryBuf) -> Result<Option<Row>, AppError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let row = bind_all(sqlx::query(&q.sql), &q.params)
            .fetch_optional(&mut *self.tx)
            .await?;
        row.map(|r| row_to_json(resource, &r)).transpose()
    }

    async fn fetch_all(&mut self, resource: &Resource, q: &QueryBuf) -> Result<Vec<Row>, AppError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let rows = bind_all(sqlx::query(&q.sql), &q.params)
            .fetch_all(&mut *self.tx)
            .await?;
        rows.iter().map(|r| row_to_json(resource, r)).collect()
    }
}

#[async_trait]
impl Session for PgSession {
    async fn get(&mut self, resource: &Resource, key: &Value) -> Result<Option<Row>, AppError> {
        let q = sql::select_by_key(resource, key);
        self.fetch_optional(resource, &q).await
    }

    async fn count(&mut self, resource: &Resource, filter: &Filter) -> Result<u64, AppError> {
        let q = sql::select_count(resource, filter);
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let mut query = sqlx::query_scalar::<_, i64>(&q.sql);
        for p in &q.params {
            query = query.bind(PgBindValue::from_json(p));
        }
        let n = query.fetch_one(&mut *self.tx).await?;
        Ok(n.max(0) as u64)
    }

    async fn fetch(
        &mut self,
        resource: &Resource,
        filter: &Filter,
        page: Option<&Pagination>,
    ) -> Result<Vec<Row>, AppError> {
        let q = sql::select_list(resource, filter, page);
        self.fetch_all(resource, &q).await
    }

    async fn insert(&mut self, resource: &Resource, values: &Row) -> Result<Row, AppError> {
        let q = sql::insert(resource, values);
        self.fetch_optional(resource, &q)
            .await?
            .ok_or(AppError::Db(sqlx::Error::RowNotFound))
    }

    async fn update(
        &mut self,
        resource: &Resource,
        key: &Value,
        values: &Row,
    ) -> Result<Option<Row>, AppError> {
        let q = sql::update(resource, key, values);
        self.fetch_optional(resource, &q).await
    }

    async fn delete(&mut self, resource: &Resource, key: &Value) -> Result<bool, AppError> {
        let q = sql::delete(resource, key);
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let row = bind_all(sqlx::query(&q.sql), &q.params)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(row.is_some())
    }

    async fn commit(self: Box<Self>) -> Result<(), AppError> {
        self.tx.commit().await?;
        Ok(())
    }
}

fn bind_all<'q>(
    mut query: sqlx::query::Query<'q, Postgres, sqlx::postgres::PgArguments>,
    params: &[Value],
) -> sqlx::query::Query<'q, Postgres, sqlx::postgres::PgArguments> {
    for p in params {
        query = query.bind(PgBindValue::from_json(p));
    }
    query
}

/// Decode every declared column using its declared type.
fn row_to_json(resource: &Resource, row: &PgRow) -> Result<Row, AppError> {
    let mut map = Row::new();
    for col in &resource.columns {
        map.insert(col.name.clone(), cell_to_value(row, col)?);
    }
    Ok(map)
}

fn cell_to_value(row: &PgRow, col: &Column) -> Result<Value, AppError> {
    use sqlx::Row as _;
    let name = col.name.as_str();
    Ok(match col.ty {
        ColumnType::Integer => row.try_get::<Option<i32>, _>(name)?.map(Value::from),
        ColumnType::Bigint => row.try_get::<Option<i64>, _>(name)?.map(Value::from),
        ColumnType::Text => row.try_get::<Option<String>, _>(name)?.map(Value::String),
        ColumnType::Boolean => row.try_get::<Option<bool>, _>(name)?.map(Value::Bool),
        ColumnType::Float => row
            .try_get::<Option<f64>, _>(name)?
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number),
        ColumnType::Uuid => row
            .try_get::<Option<uuid::Uuid>, _>(name)?
            .map(|u| Value::String(u.to_string())),
        ColumnType::Timestamp => row
            .try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(name)?
            .map(|d| Value::String(d.to_rfc3339())),
    }
    .unwrap_or(Value::Null))
}
