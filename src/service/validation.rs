//! Create/update body validation against a resource's parameter models.

use crate::config::{Params, Resource};
use crate::error::AppError;
use crate::session::Row;
use serde_json::Value;

pub struct RequestValidator;

impl RequestValidator {
    /// Validate a create body: only declared params, all required params present, values of the column type.
    pub fn validate_create(resource: &Resource, body: Value) -> Result<Row, AppError> {
        let params = resource.create_params.as_ref().ok_or_else(|| {
            AppError::BadRequest(format!("{} cannot be created", resource.plural_name))
        })?;
        let row = validate_fields(resource, params, body)?;
        for field in params.fields.iter().filter(|f| f.required) {
            if !row.contains_key(&field.name) {
                return Err(AppError::Validation(format!("{} is required", field.name)));
            }
        }
        Ok(row)
    }

    /// Validate a PATCH body. Only the fields present are checked and later written.
    pub fn validate_update(resource: &Resource, body: Value) -> Result<Row, AppError> {
        let params = resource.update_params.as_ref().ok_or_else(|| {
            AppError::BadRequest(format!("{} cannot be updated", resource.plural_name))
        })?;
        validate_fields(resource, params, body)
    }
}

fn body_to_map(value: Value) -> Result<Row, AppError> {
    match value {
        Value::Object(m) => Ok(m),
        _ => Err(AppError::BadRequest("body must be a JSON object".into())),
    }
}

fn validate_fields(resource: &Resource, params: &Params, body: Value) -> Result<Row, AppError> {
    let body = body_to_map(body)?;
    let mut out = Row::new();
    for (name, value) in body {
        if params.field(&name).is_none() {
            return Err(AppError::Validation(format!("unknown field '{}'", name)));
        }
        let column = resource
            .column(&name)
            .ok_or_else(|| AppError::Validation(format!("unknown field '{}'", name)))?;
        let value = if value.is_null() {
            if !column.nullable {
                return Err(AppError::Validation(format!("{} may not be null", name)));
            }
            Value::Null
        } else {
            column.ty.coerce_json(&value).ok_or_else(|| {
                AppError::Validation(format!("{} must be {}", name, column.ty.describe()))
            })?
        };
        out.insert(name, value);
    }
    Ok(out)
}
