use serde_json::Value;

use crate::error::ConfigError;
use crate::parse::media_type::{ContentType, SUPPORTED_REQUEST_MEDIA_TYPES};
use crate::schema::SchemaComponent;

/// A request body: a structured value serialized according to the content
/// type, or a string sent as is.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Object(Value),
    Raw(String),
}

/// Serialize a body for a content type.
pub(crate) fn serialize(
    body: &Body,
    content_type: Option<&ContentType>,
    schemas: &dyn SchemaComponent,
    operation: &str,
) -> Result<String, ConfigError> {
    let value = match body {
        Body::Raw(raw) => return Ok(raw.clone()),
        Body::Object(value) => value,
    };
    match content_type {
        Some(ct) if ct.is_json() => Ok(format!("{:#}", schemas.as_json(value))),
        Some(ct) if ct.is_form_urlencoded() => form_encode(value, operation),
        _ => match value {
            Value::String(s) => Ok(s.clone()),
            _ => Err(ConfigError::UnsupportedMediaType {
                media_type: content_type.map_or_else(|| "(none)".to_string(), |ct| ct.to_string()),
                operation: operation.to_string(),
                supported: SUPPORTED_REQUEST_MEDIA_TYPES.join(", "),
            }),
        },
    }
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => Some(String::new()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

/// Flat `application/x-www-form-urlencoded`. Arrays of scalars repeat the key.
fn form_encode(value: &Value, operation: &str) -> Result<String, ConfigError> {
    let invalid = || ConfigError::InvalidFormBody {
        operation: operation.to_string(),
        body: value.to_string(),
    };
    let object = value.as_object().ok_or_else(invalid)?;
    let mut pairs: Vec<(&str, String)> = Vec::new();
    for (key, field) in object {
        match field {
            Value::Array(items) => {
                for item in items {
                    pairs.push((key.as_str(), scalar(item).ok_or_else(invalid)?));
                }
            }
            _ => pairs.push((key.as_str(), scalar(field).ok_or_else(invalid)?)),
        }
    }
    serde_urlencoded::to_string(&pairs).map_err(|_| invalid())
}
