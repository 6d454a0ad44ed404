//! Response body materialization.

use serde_json::Value;

use crate::error::{ResponseError, Result};
use crate::exchange::Exchange;
use crate::schema::Instance;

/// A response body, as far as its content type allows it to be understood.
#[derive(Debug, Clone, PartialEq)]
pub enum BodyObject {
    /// An empty JSON body.
    Null,
    /// Any non-JSON body, verbatim.
    Text(String),
    /// JSON without an applicable schema, or a JSON scalar.
    Json(Value),
    /// A JSON object or array described by the response schema.
    Instance(Instance),
}

impl BodyObject {
    /// The body as JSON, whatever form it was materialized in.
    pub fn to_json(&self) -> Value {
        match self {
            BodyObject::Null => Value::Null,
            BodyObject::Text(text) => Value::String(text.clone()),
            BodyObject::Json(value) => value.clone(),
            BodyObject::Instance(instance) => instance.value().clone(),
        }
    }

    pub fn as_instance(&self) -> Option<&Instance> {
        match self {
            BodyObject::Instance(instance) => Some(instance),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            BodyObject::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl Exchange {
    /// Parse the response body according to its content type. JSON objects
    /// and arrays are instantiated with the response schema when there is
    /// one; `mutable` decides whether the instance accepts writes.
    pub fn body_object(&self, mutable: bool) -> Result<BodyObject> {
        let response = self.response();
        let is_json = response.content_type().is_some_and(|ct| ct.is_json());
        if !is_json {
            return Ok(BodyObject::Text(response.body.clone()));
        }
        if response.body.is_empty() {
            return Ok(BodyObject::Null);
        }
        let value: Value = serde_json::from_str(&response.body).map_err(ResponseError::Json)?;
        match self.response_schema() {
            Some(schema) if value.is_object() || value.is_array() => Ok(BodyObject::Instance(
                self.schemas().instantiate(schema, value, mutable)?,
            )),
            _ => Ok(BodyObject::Json(value)),
        }
    }
}
