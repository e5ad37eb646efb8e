//! Resource handlers: get by id, list, create, update, delete.

use crate::cache;
use crate::error::{AppError, ConfigError};
use crate::response::{keyed, paginated, success, success_empty};
use crate::service::{Filter, Pagination, RequestValidator};
use crate::session::{Row, Session};
use crate::state::ResourceState;
use crate::config::Resource;
use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;

type QueryParams = Result<Query<Vec<(String, String)>>, QueryRejection>;
type Body = Result<Json<Value>, JsonRejection>;

fn query_params(params: QueryParams) -> Result<Vec<(String, String)>, AppError> {
    params
        .map(|Query(p)| p)
        .map_err(|e| AppError::BadRequest(e.body_text()))
}

fn body(payload: Body) -> Result<Value, AppError> {
    payload
        .map(|Json(v)| v)
        .map_err(|e| AppError::BadRequest(e.body_text()))
}

/// Value of a parameter that may appear at most once.
fn single<'a>(params: &'a [(String, String)], name: &str) -> Result<Option<&'a str>, AppError> {
    let mut found = params.iter().filter(|(k, _)| k == name).map(|(_, v)| v.as_str());
    let first = found.next();
    if found.next().is_some() {
        return Err(AppError::Validation(format!("{} given more than once", name)));
    }
    Ok(first)
}

fn parse_expand(params: &[(String, String)]) -> Result<bool, AppError> {
    match single(params, "expand")? {
        None => Ok(false),
        Some(raw) => match raw.to_ascii_lowercase().as_str() {
            "" | "true" | "1" => Ok(true),
            "false" | "0" => Ok(false),
            _ => Err(AppError::Validation(format!("expand must be a boolean, got '{}'", raw))),
        },
    }
}

fn parse_key(resource: &Resource, raw: &str) -> Result<Value, AppError> {
    resource
        .parse_key(raw)
        .ok_or_else(|| AppError::NotFound(resource.not_found()))
}

/// Writes refresh the last-modified column unless the body sets it.
fn stamp_last_modified(resource: &Resource, values: &mut Row) {
    if let Some(column) = &resource.cache.last_modified_column {
        if !values.contains_key(column) {
            values.insert(column.clone(), Value::String(chrono::Utc::now().to_rfc3339()));
        }
    }
}

async fn load_expansions(
    state: &ResourceState,
    session: &mut dyn Session,
    row: &Row,
    result: &mut Row,
) -> Result<(), AppError> {
    for exp in &state.resource.expansions {
        let related = state.registry.get(&exp.resource).ok_or_else(|| {
            ConfigError::UnknownExpansion {
                resource: state.resource.plural_name.clone(),
                target: exp.resource.clone(),
            }
        })?;
        let remote = related.column(&exp.remote_column).ok_or_else(|| ConfigError::UnknownColumn {
            resource: related.plural_name.clone(),
            column: exp.remote_column.clone(),
        })?;
        let rows = match row.get(&exp.local_column) {
            None | Some(Value::Null) => Vec::new(),
            Some(value) => {
                let filter = Filter::eq(&remote.name, remote.ty, value.clone());
                session.fetch(&related, &filter, None).await?
            }
        };
        result.insert(
            exp.resource.clone(),
            Value::Array(rows.iter().map(|r| related.serialize(r)).collect()),
        );
    }
    Ok(())
}

pub async fn get_by_id(
    State(state): State<ResourceState>,
    Path(key): Path<String>,
    headers: HeaderMap,
    params: QueryParams,
) -> Result<Response, AppError> {
    let resource = &state.resource;
    let params = query_params(params)?;
    let expand = parse_expand(&params)?;
    let key = parse_key(resource, &key)?;

    let mut session = state.sessions.open().await?;
    let row = session
        .get(resource, &key)
        .await?
        .ok_or_else(|| AppError::NotFound(resource.not_found()))?;
    let cache_headers = cache::item_headers(resource, &row, &headers)?;

    let mut result = keyed(&resource.singular_name, resource.serialize(&row));
    if expand {
        load_expansions(&state, session.as_mut(), &row, &mut result).await?;
    }
    Ok((cache_headers, Json(success(result))).into_response())
}

pub async fn list(State(state): State<ResourceState>, params: QueryParams) -> Result<Response, AppError> {
    let resource = &state.resource;
    let params = query_params(params)?;
    let page = Pagination::from_params(
        single(&params, "start")?,
        single(&params, "count")?,
        &state.pagination,
    )?;
    let filter = Filter::from_query(resource, params.iter().map(|(k, v)| (k.as_str(), v.as_str())))?;

    let mut session = state.sessions.open().await?;
    let total = session.count(resource, &filter).await?;
    let rows = session.fetch(resource, &filter, Some(&page)).await?;

    let data = page.data(rows.len(), total);
    let items = rows.iter().map(|r| resource.serialize(r)).collect();
    Ok((
        cache::list_headers(resource),
        Json(paginated(&resource.plural_name, items, data)),
    )
        .into_response())
}

pub async fn create(State(state): State<ResourceState>, payload: Body) -> Result<Response, AppError> {
    let resource = &state.resource;
    let mut values = RequestValidator::validate_create(resource, body(payload)?)?;
    stamp_last_modified(resource, &mut values);

    let mut session = state.sessions.open().await?;
    let row = session.insert(resource, &values).await?;
    session.commit().await?;

    tracing::debug!(resource = %resource.plural_name, "created");
    Ok((
        StatusCode::CREATED,
        cache::write_headers(),
        Json(success(keyed(&resource.singular_name, resource.serialize(&row)))),
    )
        .into_response())
}

pub async fn update(
    State(state): State<ResourceState>,
    Path(key): Path<String>,
    payload: Body,
) -> Result<Response, AppError> {
    let resource = &state.resource;
    let key = parse_key(resource, &key)?;
    let mut values = RequestValidator::validate_update(resource, body(payload)?)?;
    stamp_last_modified(resource, &mut values);

    let mut session = state.sessions.open().await?;
    let row = session
        .update(resource, &key, &values)
        .await?
        .ok_or_else(|| AppError::NotFound(resource.not_found()))?;
    session.commit().await?;

    Ok((
        cache::write_headers(),
        Json(success(keyed(&resource.singular_name, resource.serialize(&row)))),
    )
        .into_response())
}

pub async fn delete(State(state): State<ResourceState>, Path(key): Path<String>) -> Result<Response, AppError> {
    let resource = &state.resource;
    let key = parse_key(resource, &key)?;

    let mut session = state.sessions.open().await?;
    if !session.delete(resource, &key).await? {
        return Err(AppError::NotFound(resource.not_found()));
    }
    session.commit().await?;

    Ok((cache::write_headers(), Json(success_empty())).into_response())
}
