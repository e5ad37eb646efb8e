//! Declaration validation: identifiers, column references and cross-resource consistency.

use crate::config::{ColumnType, Operator, ResourceConfig};
use crate::error::ConfigError;
use crate::service::RESERVED_PARAMS;
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

fn identifier_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,62}$").expect("static regex"))
}

/// Names end up in SQL and URL paths, so they are restricted to plain identifiers.
pub fn check_identifier(name: &str) -> Result<(), ConfigError> {
    if identifier_re().is_match(name) {
        Ok(())
    } else {
        Err(ConfigError::InvalidIdentifier(name.to_string()))
    }
}

/// Validate one declaration on its own. Expansion targets are checked by [`validate_all`].
pub fn validate(config: &ResourceConfig) -> Result<(), ConfigError> {
    let resource = config.plural_name.as_str();
    check_identifier(&config.singular_name)?;
    check_identifier(&config.plural_name)?;
    if let Some(schema) = &config.entity.schema {
        check_identifier(schema)?;
    }
    check_identifier(&config.entity.table)?;

    let mut columns = HashSet::new();
    for c in &config.entity.columns {
        check_identifier(&c.name)?;
        if !columns.insert(c.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "resource '{}': duplicate column '{}'",
                resource, c.name
            )));
        }
    }
    let unknown = |column: &str| ConfigError::UnknownColumn {
        resource: resource.to_string(),
        column: column.to_string(),
    };

    let pk = config
        .entity
        .columns
        .iter()
        .find(|c| c.name == config.entity.primary_key)
        .ok_or_else(|| ConfigError::InvalidPrimaryKey {
            resource: resource.to_string(),
            column: config.entity.primary_key.clone(),
        })?;
    if !matches!(
        pk.type_,
        ColumnType::Integer | ColumnType::Bigint | ColumnType::Text | ColumnType::Uuid
    ) || pk.nullable
    {
        return Err(ConfigError::InvalidPrimaryKey {
            resource: resource.to_string(),
            column: pk.name.clone(),
        });
    }

    for name in &config.model {
        if !columns.contains(name.as_str()) {
            return Err(unknown(name.as_str()));
        }
    }
    if let Some(params) = &config.create_params {
        for p in params {
            if !columns.contains(p.name()) {
                return Err(unknown(p.name()));
            }
        }
        for c in config.entity.columns.iter().filter(|c| !c.nullable && !c.has_default) {
            if !params.iter().any(|p| p.name() == c.name && p.required()) {
                return Err(ConfigError::Validation(format!(
                    "resource '{}': column '{}' is not nullable and has no default, so it must be a required create param",
                    resource, c.name
                )));
            }
        }
    }
    for name in config.update_params.iter().flatten() {
        if !columns.contains(name.as_str()) {
            return Err(unknown(name.as_str()));
        }
        if *name == config.entity.primary_key {
            return Err(ConfigError::Validation(format!(
                "resource '{}': primary key cannot be an update param",
                resource
            )));
        }
    }
    for f in config.query_filter.iter().flatten() {
        let column = config
            .entity
            .columns
            .iter()
            .find(|c| c.name == f.name())
            .ok_or_else(|| unknown(f.name()))?;
        if RESERVED_PARAMS.contains(&f.name()) {
            return Err(ConfigError::Validation(format!(
                "resource '{}': '{}' is a reserved query parameter and cannot be filtered on",
                resource,
                f.name()
            )));
        }
        let operators = f.operators();
        if operators.is_empty() {
            return Err(ConfigError::Validation(format!(
                "resource '{}': filter '{}' declares no operators",
                resource,
                f.name()
            )));
        }
        if operators.contains(&Operator::Like) && column.type_ != ColumnType::Text {
            return Err(ConfigError::Validation(format!(
                "resource '{}': 'like' requires a text column, '{}' is not",
                resource,
                f.name()
            )));
        }
    }
    for e in &config.expansions {
        check_identifier(&e.resource)?;
        if !columns.contains(e.local_column.as_str()) {
            return Err(unknown(e.local_column.as_str()));
        }
    }
    for name in [&config.cache.etag_column, &config.cache.last_modified_column]
        .into_iter()
        .flatten()
    {
        if !columns.contains(name.as_str()) {
            return Err(unknown(name.as_str()));
        }
    }
    if let Some(name) = &config.cache.last_modified_column {
        if config.entity.columns.iter().any(|c| c.name == *name && c.type_ != ColumnType::Timestamp) {
            return Err(ConfigError::Validation(format!(
                "resource '{}': last-modified column '{}' must be a timestamp",
                resource, name
            )));
        }
    }
    Ok(())
}

/// Validate a set of declarations loaded together: each one, unique plural names, expansion targets.
pub fn validate_all(configs: &[ResourceConfig]) -> Result<(), ConfigError> {
    let mut plural_names = HashSet::new();
    for c in configs {
        validate(c)?;
        if !plural_names.insert(c.plural_name.as_str()) {
            return Err(ConfigError::DuplicateResource(c.plural_name.clone()));
        }
    }
    for c in configs {
        for e in &c.expansions {
            let target = configs
                .iter()
                .find(|t| t.plural_name == e.resource)
                .ok_or_else(|| ConfigError::UnknownExpansion {
                    resource: c.plural_name.clone(),
                    target: e.resource.clone(),
                })?;
            if !target.entity.columns.iter().any(|col| col.name == e.remote_column) {
                return Err(ConfigError::UnknownColumn {
                    resource: target.plural_name.clone(),
                    column: e.remote_column.clone(),
                });
            }
        }
    }
    Ok(())
}
