//! Cache-control, ETag and Last-Modified headers for read routes, and conditional requests.

use crate::config::{parse_timestamp, Resource};
use crate::error::AppError;
use crate::session::Row;
use axum::http::{header, HeaderMap, HeaderValue};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;

/// IMF-fixdate (RFC 9110 §5.6.7).
pub const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

pub const NO_STORE: &str = "no-store";

pub fn format_http_date(d: &DateTime<Utc>) -> String {
    d.format(HTTP_DATE_FORMAT).to_string()
}

pub fn parse_http_date(s: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s.trim(), HTTP_DATE_FORMAT)
        .ok()
        .map(|n| n.and_utc())
}

fn cache_control(max_age: u32) -> HeaderValue {
    HeaderValue::from_str(&format!("private, must-revalidate, max-age={}", max_age))
        .unwrap_or_else(|_| HeaderValue::from_static("private, must-revalidate, max-age=0"))
}

/// Headers for a list response.
pub fn list_headers(resource: &Resource) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::CACHE_CONTROL, cache_control(resource.cache.max_age));
    headers
}

/// Headers for a write response.
pub fn write_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(NO_STORE));
    headers
}

/// Headers for a single-item response. Fails with `NotModified` when the request's
/// conditional headers show the client's copy is current.
pub fn item_headers(resource: &Resource, row: &Row, request: &HeaderMap) -> Result<HeaderMap, AppError> {
    let mut headers = HeaderMap::new();
    headers.insert(header::CACHE_CONTROL, cache_control(resource.cache.max_age));

    let etag = resource
        .cache
        .etag_column
        .as_ref()
        .and_then(|c| row.get(c))
        .and_then(entity_tag);
    let last_modified = resource
        .cache
        .last_modified_column
        .as_ref()
        .and_then(|c| row.get(c))
        .and_then(Value::as_str)
        .and_then(parse_timestamp);

    if let Some(tag) = &etag {
        match HeaderValue::from_str(tag) {
            Ok(v) => {
                headers.insert(header::ETAG, v);
            }
            Err(_) => tracing::debug!(resource = %resource.plural_name, %tag, "etag is not a valid header value"),
        }
    }
    if let Some(d) = &last_modified {
        if let Ok(v) = HeaderValue::from_str(&format_http_date(d)) {
            headers.insert(header::LAST_MODIFIED, v);
        }
    }

    // If-None-Match takes precedence over If-Modified-Since (RFC 9110 §13.2.2).
    // `*` matches any current representation, tagged or not.
    if let Some(inm) = request.get(header::IF_NONE_MATCH).and_then(|v| v.to_str().ok()) {
        let hit = match &etag {
            Some(tag) => none_match_hits(inm, tag),
            None => inm.split(',').any(|t| t.trim() == "*"),
        };
        if hit {
            return Err(AppError::NotModified(headers));
        }
        return Ok(headers);
    }
    if let (Some(d), Some(since)) = (
        last_modified,
        request
            .get(header::IF_MODIFIED_SINCE)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_http_date),
    ) {
        // HTTP dates have one-second resolution
        if d.timestamp() <= since.timestamp() {
            return Err(AppError::NotModified(headers));
        }
    }
    Ok(headers)
}

/// Quoted entity tag from a column value. Null, empty, or values with characters an
/// opaque tag cannot carry (`"`, controls, whitespace, non-ASCII) give none.
fn entity_tag(v: &Value) -> Option<String> {
    let raw = match v {
        Value::Null => return None,
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    let raw = raw.trim_matches('"');
    if raw.is_empty() {
        return None;
    }
    // etagc = %x21 / %x23-7E (RFC 9110 §8.8.3)
    if !raw.bytes().all(|b| b == 0x21 || (0x23..=0x7e).contains(&b)) {
        tracing::debug!(value = %raw, "column value cannot be used as an entity tag");
        return None;
    }
    Some(format!("\"{}\"", raw))
}

/// Weak comparison over a comma-separated If-None-Match list.
fn none_match_hits(header_value: &str, tag: &str) -> bool {
    let opaque = |t: &str| t.trim().trim_start_matches("W/").trim_matches('"').to_string();
    let ours = opaque(tag);
    header_value
        .split(',')
        .any(|t| t.trim() == "*" || opaque(t) == ours)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{resolve_resource, ColumnConfig, ColumnType, EntityConfig, ResourceConfig};
    use crate::config::CacheConfig;
    use serde_json::json;

    fn documents() -> Resource {
        resolve_resource(&ResourceConfig {
            singular_name: "document".into(),
            plural_name: "documents".into(),
            entity: EntityConfig {
                schema: None,
                table: "document".into(),
                primary_key: "id".into(),
                columns: vec![
                    ColumnConfig::new("id", ColumnType::Integer),
                    ColumnConfig::new("version", ColumnType::Text).nullable(),
                    ColumnConfig::new("modified_at", ColumnType::Timestamp).nullable(),
                ],
            },
            model: vec![],
            create_params: None,
            update_params: None,
            query_filter: None,
            expansions: vec![],
            cache: CacheConfig {
                max_age: 120,
                etag_column: Some("version".into()),
                last_modified_column: Some("modified_at".into()),
            },
        })
        .unwrap()
    }

    fn row(v: Value) -> Row {
        v.as_object().unwrap().clone()
    }

    fn request(pairs: &[(header::HeaderName, &str)]) -> HeaderMap {
        let mut h = HeaderMap::new();
        for (k, v) in pairs {
            h.insert(k.clone(), HeaderValue::from_str(v).unwrap());
        }
        h
    }

    #[test]
    fn emits_validators_and_max_age() {
        let r = documents();
        let h = item_headers(
            &r,
            &row(json!({ "id": 1, "version": "uniqueVersionId123", "modified_at": "2020-01-01T00:00:00+00:00" })),
            &HeaderMap::new(),
        )
        .unwrap();
        assert_eq!(h[header::CACHE_CONTROL], "private, must-revalidate, max-age=120");
        assert_eq!(h[header::ETAG], "\"uniqueVersionId123\"");
        assert_eq!(h[header::LAST_MODIFIED], "Wed, 01 Jan 2020 00:00:00 GMT");
    }

    #[test]
    fn omits_validators_when_columns_are_null() {
        let r = documents();
        let h = item_headers(&r, &row(json!({ "id": 1, "version": null, "modified_at": null })), &HeaderMap::new()).unwrap();
        assert!(h.get(header::ETAG).is_none());
        assert!(h.get(header::LAST_MODIFIED).is_none());
    }

    #[test]
    fn if_none_match_hit_is_not_modified() {
        let r = documents();
        let data = row(json!({ "id": 1, "version": "v7", "modified_at": null }));
        for inm in ["\"v7\"", "v7", "W/\"v7\"", "\"v1\", \"v7\"", "*"] {
            let res = item_headers(&r, &data, &request(&[(header::IF_NONE_MATCH, inm)]));
            assert!(matches!(res, Err(AppError::NotModified(_))), "{}", inm);
        }
        assert!(item_headers(&r, &data, &request(&[(header::IF_NONE_MATCH, "\"v6\"")])).is_ok());
    }

    #[test]
    fn wildcard_matches_untagged_rows() {
        let r = documents();
        let data = row(json!({ "id": 1, "version": null, "modified_at": null }));
        let res = item_headers(&r, &data, &request(&[(header::IF_NONE_MATCH, "*")]));
        assert!(matches!(res, Err(AppError::NotModified(_))));
        assert!(item_headers(&r, &data, &request(&[(header::IF_NONE_MATCH, "\"v1\"")])).is_ok());
    }

    #[test]
    fn unusable_tag_values_are_dropped() {
        assert_eq!(entity_tag(&json!("v\"2")), None);
        assert_eq!(entity_tag(&json!("two words")), None);
        assert_eq!(entity_tag(&json!("caf\u{e9}")), None);
        assert_eq!(entity_tag(&json!("\"abc\"")), Some("\"abc\"".to_string()));
        assert_eq!(entity_tag(&json!(42)), Some("\"42\"".to_string()));

        let r = documents();
        let h = item_headers(&r, &row(json!({ "id": 1, "version": "v\"2", "modified_at": null })), &HeaderMap::new()).unwrap();
        assert!(h.get(header::ETAG).is_none());
    }

    #[test]
    fn if_modified_since_compares_dates() {
        let r = documents();
        let data = row(json!({ "id": 1, "version": null, "modified_at": "2020-01-01T00:00:00.250+00:00" }));
        let at = |s: &str| item_headers(&r, &data, &request(&[(header::IF_MODIFIED_SINCE, s)]));
        assert!(matches!(at("Wed, 01 Jan 2020 00:00:00 GMT"), Err(AppError::NotModified(_))));
        assert!(matches!(at("Thu, 02 Jan 2020 00:00:00 GMT"), Err(AppError::NotModified(_))));
        assert!(at("Tue, 31 Dec 2019 23:59:59 GMT").is_ok());
        assert!(at("yesterday").is_ok());
    }

    #[test]
    fn http_dates_round_trip() {
        let d = parse_http_date("Wed, 01 Jan 2020 00:00:00 GMT").unwrap();
        assert_eq!(format_http_date(&d), "Wed, 01 Jan 2020 00:00:00 GMT");
    }
}
