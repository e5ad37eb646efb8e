//! Build resolved resources from declarations, in code or from a JSON file.

use crate::config::resolved::{
    CachePolicy, Column, Expansion, FilterField, ParamField, Params, Resource, ResourceRegistry,
};
use crate::config::types::ResourceConfig;
use crate::config::{validate, validate_all};
use crate::error::ConfigError;
use std::path::Path;

/// Resolve one declaration (validates it first). Expansion targets are not checked here.
pub fn resolve_resource(config: &ResourceConfig) -> Result<Resource, ConfigError> {
    validate(config)?;

    let columns: Vec<Column> = config
        .entity
        .columns
        .iter()
        .map(|c| Column {
            name: c.name.clone(),
            ty: c.type_,
            nullable: c.nullable,
            has_default: c.has_default,
        })
        .collect();
    let model = if config.model.is_empty() {
        columns.iter().map(|c| c.name.clone()).collect()
    } else {
        config.model.clone()
    };
    let create_params = config.create_params.as_ref().map(|params| Params {
        fields: params
            .iter()
            .map(|p| ParamField {
                name: p.name().to_string(),
                required: p.required(),
            })
            .collect(),
    });
    let update_params = config.update_params.as_ref().map(|names| Params {
        fields: names
            .iter()
            .map(|n| ParamField {
                name: n.clone(),
                required: false,
            })
            .collect(),
    });
    let query_filter = config.query_filter.as_ref().map(|fields| {
        fields
            .iter()
            .map(|f| FilterField {
                column: f.name().to_string(),
                operators: f.operators(),
            })
            .collect()
    });

    Ok(Resource {
        singular_name: config.singular_name.clone(),
        plural_name: config.plural_name.clone(),
        schema: config.entity.schema.clone(),
        table: config.entity.table.clone(),
        primary_key: config.entity.primary_key.clone(),
        columns,
        model,
        create_params,
        update_params,
        query_filter,
        expansions: config
            .expansions
            .iter()
            .map(|e| Expansion {
                resource: e.resource.clone(),
                local_column: e.local_column.clone(),
                remote_column: e.remote_column.clone(),
            })
            .collect(),
        cache: CachePolicy {
            max_age: config.cache.max_age,
            etag_column: config.cache.etag_column.clone(),
            last_modified_column: config.cache.last_modified_column.clone(),
        },
    })
}

/// Validate a full set of declarations and register them all.
pub fn resolve(configs: &[ResourceConfig]) -> Result<ResourceRegistry, ConfigError> {
    validate_all(configs)?;
    let mut registry = ResourceRegistry::new();
    for config in configs {
        registry.register(resolve_resource(config)?);
    }
    Ok(registry)
}

/// Read a JSON array of resource declarations.
pub async fn load_from_path(path: impl AsRef<Path>) -> Result<Vec<ResourceConfig>, ConfigError> {
    let path = path.as_ref();
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
    parse_resources(&raw)
}

pub fn parse_resources(raw: &str) -> Result<Vec<ResourceConfig>, ConfigError> {
    serde_json::from_str(raw).map_err(|e| ConfigError::Load(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Operator;

    const RESOURCES: &str = r#"[
        {
            "singular_name": "customer",
            "plural_name": "customers",
            "entity": {
                "table": "customer",
                "primary_key": "customer_id",
                "columns": [
                    { "name": "customer_id", "type": "integer", "has_default": true },
                    { "name": "first_name", "type": "text" },
                    { "name": "last_name", "type": "text" },
                    { "name": "territory_id", "type": "integer", "nullable": true }
                ]
            },
            "create_params": ["first_name", "last_name", { "name": "territory_id", "required": false }],
            "update_params": ["first_name", "last_name"],
            "query_filter": ["territory_id", { "name": "first_name", "operators": ["eq", "like"] }],
            "expansions": [
                { "resource": "territories", "local_column": "territory_id", "remote_column": "territory_id" }
            ]
        },
        {
            "singular_name": "territory",
            "plural_name": "territories",
            "entity": {
                "table": "territory",
                "primary_key": "territory_id",
                "columns": [
                    { "name": "territory_id", "type": "integer" },
                    { "name": "name", "type": "text" }
                ]
            },
            "cache": { "max_age": 120 }
        }
    ]"#;

    #[test]
    fn resolves_file_declarations() {
        let configs = parse_resources(RESOURCES).unwrap();
        let registry = resolve(&configs).unwrap();
        assert_eq!(registry.len(), 2);

        let customers = registry.get("customers").unwrap();
        assert_eq!(customers.model.len(), 4, "empty model exposes every column");
        let create = customers.create_params.as_ref().unwrap();
        assert!(create.field("first_name").unwrap().required);
        assert!(!create.field("territory_id").unwrap().required);
        assert_eq!(
            customers.filter_field("first_name").unwrap().operators,
            vec![Operator::Eq, Operator::Like]
        );
        assert_eq!(customers.filter_field("territory_id").unwrap().operators, vec![Operator::Eq]);
        assert!(customers.filter_field("last_name").is_none());

        assert_eq!(registry.get("territories").unwrap().cache.max_age, 120);
    }

    #[test]
    fn rejects_model_field_missing_from_entity() {
        let mut configs = parse_resources(RESOURCES).unwrap();
        configs[1].model = vec!["territory_id".into(), "population".into()];
        assert!(matches!(
            resolve(&configs),
            Err(ConfigError::UnknownColumn { column, .. }) if column == "population"
        ));
    }

    #[test]
    fn rejects_unknown_expansion_target() {
        let mut configs = parse_resources(RESOURCES).unwrap();
        configs.truncate(1);
        assert!(matches!(resolve(&configs), Err(ConfigError::UnknownExpansion { .. })));
    }

    #[test]
    fn rejects_duplicate_plural_names() {
        let mut configs = parse_resources(RESOURCES).unwrap();
        configs.push(configs[1].clone());
        assert!(matches!(resolve(&configs), Err(ConfigError::DuplicateResource(name)) if name == "territories"));
    }

    #[test]
    fn rejects_like_on_non_text_column() {
        let mut configs = parse_resources(RESOURCES).unwrap();
        configs[0].query_filter = Some(vec![crate::config::FilterFieldConfig::Spec {
            name: "territory_id".into(),
            operators: vec![Operator::Like],
        }]);
        assert!(matches!(resolve(&configs), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn rejects_filter_on_reserved_parameter_name() {
        let mut configs = parse_resources(RESOURCES).unwrap();
        configs[1]
            .entity
            .columns
            .push(crate::config::ColumnConfig::new("count", crate::config::ColumnType::Integer).nullable());
        configs[1].query_filter = Some(vec![crate::config::FilterFieldConfig::Name("count".into())]);
        assert!(matches!(resolve(&configs), Err(ConfigError::Validation(msg)) if msg.contains("reserved")));

        configs[1].query_filter = None;
        assert!(resolve(&configs).is_ok(), "a column named count is fine when not filtered");
    }

    #[test]
    fn rejects_sql_unsafe_identifiers() {
        let mut configs = parse_resources(RESOURCES).unwrap();
        configs[1].entity.table = "territory; DROP TABLE customer".into();
        assert!(matches!(resolve(&configs), Err(ConfigError::InvalidIdentifier(_))));
    }
}
