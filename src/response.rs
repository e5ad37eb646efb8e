//! Standard response envelope.

use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiResponseStatus {
    Success,
    Error,
}

/// Envelope for single results and results without a body (delete).
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub status: ApiResponseStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<T>,
}

/// Envelope for list results.
#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    pub status: ApiResponseStatus,
    pub result: T,
    pub pagination: PaginationData,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct PaginationData {
    /// First record offset.
    pub start: u64,
    /// Number of records returned.
    pub count: u64,
    /// Total number of records matching the filter.
    pub total: u64,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub status: ApiResponseStatus,
    pub detail: String,
}

impl ApiError {
    pub fn new(detail: impl Into<String>) -> Self {
        ApiError {
            status: ApiResponseStatus::Error,
            detail: detail.into(),
        }
    }
}

pub fn success<T: Serialize>(result: T) -> ApiResponse<T> {
    ApiResponse {
        status: ApiResponseStatus::Success,
        result: Some(result),
    }
}

pub fn success_empty() -> ApiResponse<()> {
    ApiResponse {
        status: ApiResponseStatus::Success,
        result: None,
    }
}

/// `{ key: value }`, the shape every result takes (`{"customer": {...}}`, `{"customers": [...]}`).
pub fn keyed(key: &str, value: Value) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert(key.to_string(), value);
    map
}

pub fn paginated(key: &str, rows: Vec<Value>, pagination: PaginationData) -> PaginatedResponse<Map<String, Value>> {
    PaginatedResponse {
        status: ApiResponseStatus::Success,
        result: keyed(key, Value::Array(rows)),
        pagination,
    }
}
