//! Create the schemas and tables declared by the registry.
//! Idempotent: `CREATE SCHEMA/TABLE IF NOT EXISTS`, existing tables are left as they are.

use crate::config::{Column, ColumnType, Resource, ResourceRegistry};
use crate::error::AppError;
use crate::sql::{qualified_table, quoted};
use sqlx::PgPool;
use std::collections::BTreeSet;

fn column_def(resource: &Resource, c: &Column) -> String {
    let is_key = c.name == resource.primary_key;
    let ty = match c.ty {
        ColumnType::Integer if is_key && c.has_default => "SERIAL",
        ColumnType::Bigint if is_key && c.has_default => "BIGSERIAL",
        ColumnType::Integer => "INTEGER",
        ColumnType::Bigint => "BIGINT",
        ColumnType::Text => "TEXT",
        ColumnType::Boolean => "BOOLEAN",
        ColumnType::Float => "DOUBLE PRECISION",
        ColumnType::Uuid => "UUID",
        ColumnType::Timestamp => "TIMESTAMPTZ",
    };
    let mut def = format!("{} {}", quoted(&c.name), ty);
    if !c.nullable {
        def.push_str(" NOT NULL");
    }
    if c.has_default {
        let default = match c.ty {
            ColumnType::Integer | ColumnType::Bigint if is_key => None,
            ColumnType::Integer | ColumnType::Bigint | ColumnType::Float => Some("0"),
            ColumnType::Boolean => Some("FALSE"),
            ColumnType::Text => Some("''"),
            ColumnType::Uuid => Some("gen_random_uuid()"),
            ColumnType::Timestamp => Some("NOW()"),
        };
        if let Some(d) = default {
            def.push_str(" DEFAULT ");
            def.push_str(d);
        }
    }
    def
}

/// DDL for one resource's table.
pub fn create_table_sql(resource: &Resource) -> String {
    let mut defs: Vec<String> = resource
        .columns
        .iter()
        .map(|c| column_def(resource, c))
        .collect();
    defs.push(format!("PRIMARY KEY ({})", quoted(&resource.primary_key)));
    format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        qualified_table(resource),
        defs.join(", ")
    )
}

/// Create every declared schema, then every resource table.
pub async fn create_tables(pool: &PgPool, registry: &ResourceRegistry) -> Result<(), AppError> {
    let schemas: BTreeSet<&str> = registry.iter().filter_map(|r| r.schema.as_deref()).collect();
    for schema in schemas {
        sqlx::query(&format!("CREATE SCHEMA IF NOT EXISTS {}", quoted(schema)))
            .execute(pool)
            .await?;
    }

    let mut resources: Vec<_> = registry.iter().collect();
    resources.sort_by(|a, b| a.plural_name.cmp(&b.plural_name));
    for resource in resources {
        let ddl = create_table_sql(resource);
        tracing::debug!(sql = %ddl, "ddl");
        sqlx::query(&ddl).execute(pool).await?;
        tracing::info!(table = %qualified_table(resource), "table ready");
    }
    Ok(())
}
