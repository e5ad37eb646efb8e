//! Raw resource declarations as written in code or in a resources JSON file.

use serde::{Deserialize, Serialize};

/// Column types a resource may declare. Names follow the JSON file format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Integer,
    Bigint,
    Text,
    Boolean,
    Float,
    Uuid,
    Timestamp,
}

/// Comparison operators accepted by list filters (`field__op=value`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    Like,
}

impl Operator {
    pub fn from_suffix(s: &str) -> Option<Self> {
        Some(match s {
            "eq" => Operator::Eq,
            "ne" => Operator::Ne,
            "lt" => Operator::Lt,
            "lte" => Operator::Lte,
            "gt" => Operator::Gt,
            "gte" => Operator::Gte,
            "like" => Operator::Like,
            _ => return None,
        })
    }

    pub fn sql(self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "<>",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Like => "LIKE",
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ColumnConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub type_: ColumnType,
    #[serde(default)]
    pub nullable: bool,
    /// The database fills the column when an insert omits it (serial key, NOW(), ...).
    #[serde(default)]
    pub has_default: bool,
}

impl ColumnConfig {
    pub fn new(name: &str, type_: ColumnType) -> Self {
        ColumnConfig {
            name: name.to_string(),
            type_,
            nullable: false,
            has_default: false,
        }
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn with_default(mut self) -> Self {
        self.has_default = true;
        self
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EntityConfig {
    #[serde(default)]
    pub schema: Option<String>,
    pub table: String,
    pub primary_key: String,
    pub columns: Vec<ColumnConfig>,
}

/// A create parameter: bare name (required) or `{ "name": ..., "required": false }`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamConfig {
    Name(String),
    Spec {
        name: String,
        #[serde(default = "default_true")]
        required: bool,
    },
}

fn default_true() -> bool {
    true
}

impl ParamConfig {
    pub fn name(&self) -> &str {
        match self {
            ParamConfig::Name(n) | ParamConfig::Spec { name: n, .. } => n,
        }
    }

    pub fn required(&self) -> bool {
        match self {
            ParamConfig::Name(_) => true,
            ParamConfig::Spec { required, .. } => *required,
        }
    }
}

/// A filterable field: bare name (equality only) or `{ "name": ..., "operators": [...] }`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterFieldConfig {
    Name(String),
    Spec { name: String, operators: Vec<Operator> },
}

impl FilterFieldConfig {
    pub fn name(&self) -> &str {
        match self {
            FilterFieldConfig::Name(n) | FilterFieldConfig::Spec { name: n, .. } => n,
        }
    }

    pub fn operators(&self) -> Vec<Operator> {
        match self {
            FilterFieldConfig::Name(_) => vec![Operator::Eq],
            FilterFieldConfig::Spec { operators, .. } => operators.clone(),
        }
    }
}

/// Related resource returned alongside a single result when `expand=true`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExpansionConfig {
    /// Plural name of the related resource.
    pub resource: String,
    pub local_column: String,
    pub remote_column: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub max_age: u32,
    #[serde(default)]
    pub etag_column: Option<String>,
    #[serde(default)]
    pub last_modified_column: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResourceConfig {
    pub singular_name: String,
    pub plural_name: String,
    pub entity: EntityConfig,
    /// Columns exposed in responses. Empty exposes every column.
    #[serde(default)]
    pub model: Vec<String>,
    #[serde(default)]
    pub create_params: Option<Vec<ParamConfig>>,
    /// Columns a PATCH may set; all optional.
    #[serde(default)]
    pub update_params: Option<Vec<String>>,
    #[serde(default)]
    pub query_filter: Option<Vec<FilterFieldConfig>>,
    #[serde(default)]
    pub expansions: Vec<ExpansionConfig>,
    #[serde(default)]
    pub cache: CacheConfig,
}
