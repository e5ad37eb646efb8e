//! start/count query parameters → offset/limit, and the pagination block of list responses.

use crate::error::{AppError, ConfigError};
use crate::response::PaginationData;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PaginationSettings {
    /// Page size when the request gives no `count`.
    pub default_count: u64,
    /// Upper bound for `count`; larger requests are clamped.
    pub max_count: u64,
}

impl Default for PaginationSettings {
    fn default() -> Self {
        PaginationSettings {
            default_count: 200,
            max_count: 1000,
        }
    }
}

impl PaginationSettings {
    pub fn new(default_count: u64, max_count: u64) -> Result<Self, ConfigError> {
        if default_count == 0 || max_count == 0 {
            return Err(ConfigError::Settings("page sizes must be at least 1".into()));
        }
        if default_count > max_count {
            return Err(ConfigError::Settings(format!(
                "default page size {} exceeds maximum {}",
                default_count, max_count
            )));
        }
        Ok(PaginationSettings {
            default_count,
            max_count,
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pagination {
    pub start: u64,
    /// Effective page size after clamping.
    pub count: u64,
}

impl Pagination {
    /// Parse raw `start`/`count` values. Negative or non-numeric values and `count=0` are rejected.
    pub fn from_params(
        start: Option<&str>,
        count: Option<&str>,
        settings: &PaginationSettings,
    ) -> Result<Self, AppError> {
        let start = match start {
            None => 0,
            // OFFSET is a bigint in PostgreSQL
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(n) if n <= i64::MAX as u64 => n,
                _ => {
                    return Err(AppError::Validation(format!(
                        "start must be an integer between 0 and {}, got '{}'",
                        i64::MAX,
                        raw
                    )))
                }
            },
        };
        let count = match count {
            None => settings.default_count,
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(n) if n >= 1 => n,
                _ => {
                    return Err(AppError::Validation(format!(
                        "count must be an integer of at least 1, got '{}'",
                        raw
                    )))
                }
            },
        };
        Ok(Pagination {
            start,
            count: count.min(settings.max_count),
        })
    }

    pub fn offset(&self) -> u64 {
        self.start
    }

    pub fn limit(&self) -> u64 {
        self.count
    }

    /// Response block: `count` is what was actually returned, `total` what matched.
    pub fn data(&self, returned: usize, total: u64) -> PaginationData {
        PaginationData {
            start: self.start,
            count: returned as u64,
            total,
        }
    }
}
