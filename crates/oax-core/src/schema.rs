//! Schema-aware values.
//!
//! [`SchemaComponent`] is the pluggable interface the engine uses for
//! anything schema related. [`StructuralSchemas`] covers the structural
//! keywords only; a full JSON Schema implementation can be swapped in through
//! [`DocumentBuilder::schemas`](crate::DocumentBuilder::schemas).

use std::collections::BTreeSet;
use std::fmt;

use serde_json::{Map, Value};

use crate::error::{ResolveError, SchemaError};
use crate::reference::Node;

pub trait SchemaComponent: fmt::Debug + Send + Sync {
    /// Wrap a value described by `schema`.
    fn instantiate(&self, schema: &Node, value: Value, mutable: bool) -> Result<Instance, SchemaError> {
        Ok(Instance::new(Some(schema.deref()?), value, mutable))
    }

    /// Names of the properties a schema describes, through `allOf`.
    fn described_property_names(&self, schema: &Node) -> Result<BTreeSet<String>, SchemaError>;

    fn is_reference(&self, node: &Node) -> bool {
        node.is_reference()
    }

    fn validate(&self, schema: &Node, value: &Value) -> Result<bool, SchemaError>;

    /// The canonical JSON form of a value, used for request bodies.
    fn as_json(&self, value: &Value) -> Value {
        value.clone()
    }
}

/// A value together with the schema describing it.
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    schema: Option<Node>,
    value: Value,
    mutable: bool,
}

impl Instance {
    pub fn new(schema: Option<Node>, value: Value, mutable: bool) -> Self {
        Self {
            schema,
            value,
            mutable,
        }
    }

    pub fn schema(&self) -> Option<&Node> {
        self.schema.as_ref()
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }

    pub fn is_mutable(&self) -> bool {
        self.mutable
    }

    pub fn as_str(&self) -> Option<&str> {
        self.value.as_str()
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.value.as_i64()
    }

    /// The property `key`, described by its subschema when there is one.
    pub fn get(&self, key: &str) -> Result<Option<Instance>, SchemaError> {
        let Some(child) = self.value.get(key) else {
            return Ok(None);
        };
        let schema = match &self.schema {
            Some(schema) => property_schema(schema, key)?,
            None => None,
        };
        Ok(Some(Instance::new(schema, child.clone(), self.mutable)))
    }

    pub fn index(&self, index: usize) -> Result<Option<Instance>, SchemaError> {
        let Some(child) = self.value.get(index) else {
            return Ok(None);
        };
        let schema = match &self.schema {
            Some(schema) => items_schema(schema, index)?,
            None => None,
        };
        Ok(Some(Instance::new(schema, child.clone(), self.mutable)))
    }

    pub fn len(&self) -> usize {
        match &self.value {
            Value::Array(items) => items.len(),
            Value::Object(object) => object.len(),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Set a property. Instances built immutable refuse.
    pub fn set(&mut self, key: &str, value: Value) -> Result<(), SchemaError> {
        if !self.mutable {
            return Err(SchemaError::Immutable(key.to_string()));
        }
        let object = self.value.as_object_mut().ok_or_else(|| SchemaError::NotAnObject {
            key: key.to_string(),
        })?;
        object.insert(key.to_string(), value);
        Ok(())
    }
}

/// The subschema for an object property: `properties`, then each `allOf`
/// branch, then an object-valued `additionalProperties`.
pub fn property_schema(schema: &Node, key: &str) -> Result<Option<Node>, ResolveError> {
    let schema = schema.deref()?;
    if let Some(property) = schema.get("properties").and_then(|p| p.get(key)) {
        return property.deref().map(Some);
    }
    if let Some(all_of) = schema.get("allOf") {
        for branch in all_of.items() {
            if let Some(found) = property_schema(&branch, key)? {
                return Ok(Some(found));
            }
        }
    }
    match schema.get("additionalProperties") {
        Some(additional) if additional.value().is_object() => additional.deref().map(Some),
        _ => Ok(None),
    }
}

/// The subschema for an array element: object `items`, or the positional
/// schema of a tuple-style `items` array.
pub fn items_schema(schema: &Node, index: usize) -> Result<Option<Node>, ResolveError> {
    let schema = schema.deref()?;
    let Some(items) = schema.get("items") else {
        return Ok(None);
    };
    if items.value().is_array() {
        return items.index(index).map(|n| n.deref()).transpose();
    }
    items.deref().map(Some)
}

/// Structural checks only: `type`, `enum`, `required`, `properties`,
/// `items`, `allOf` and `nullable`. Formats, patterns and bounds are not
/// checked.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralSchemas;

impl StructuralSchemas {
    fn type_matches(expected: &str, value: &Value) -> bool {
        match expected {
            "object" => value.is_object(),
            "array" => value.is_array(),
            "string" => value.is_string(),
            "boolean" => value.is_boolean(),
            "null" => value.is_null(),
            "number" => value.is_number(),
            "integer" => {
                value.is_i64()
                    || value.is_u64()
                    || value.as_f64().is_some_and(|f| f.fract() == 0.0)
            }
            _ => true,
        }
    }

    fn validate_object(&self, schema: &Node, object: &Map<String, Value>) -> Result<bool, SchemaError> {
        if let Some(required) = schema.value().get("required").and_then(Value::as_array) {
            let all_present = required
                .iter()
                .filter_map(Value::as_str)
                .all(|name| object.contains_key(name));
            if !all_present {
                return Ok(false);
            }
        }
        if let Some(properties) = schema.get("properties") {
            for (name, value) in object {
                if let Some(property) = properties.get(name) {
                    if !self.validate(&property, value)? {
                        return Ok(false);
                    }
                }
            }
        }
        Ok(true)
    }
}

impl SchemaComponent for StructuralSchemas {
    fn described_property_names(&self, schema: &Node) -> Result<BTreeSet<String>, SchemaError> {
        let schema = schema.deref()?;
        let mut names = BTreeSet::new();
        if let Some(properties) = schema.value().get("properties").and_then(Value::as_object) {
            names.extend(properties.keys().cloned());
        }
        if let Some(all_of) = schema.get("allOf") {
            for branch in all_of.items() {
                names.extend(self.described_property_names(&branch)?);
            }
        }
        Ok(names)
    }

    fn validate(&self, schema: &Node, value: &Value) -> Result<bool, SchemaError> {
        let schema = schema.deref()?;
        let keywords = schema.value();
        if value.is_null() && keywords.get("nullable").and_then(Value::as_bool) == Some(true) {
            return Ok(true);
        }
        match keywords.get("type") {
            Some(Value::String(expected)) if !Self::type_matches(expected, value) => {
                return Ok(false);
            }
            Some(Value::Array(expected)) => {
                let any = expected
                    .iter()
                    .filter_map(Value::as_str)
                    .any(|t| Self::type_matches(t, value));
                if !any {
                    return Ok(false);
                }
            }
            _ => {}
        }
        if let Some(allowed) = keywords.get("enum").and_then(Value::as_array) {
            if !allowed.contains(value) {
                return Ok(false);
            }
        }
        match value {
            Value::Object(object) => {
                if !self.validate_object(&schema, object)? {
                    return Ok(false);
                }
            }
            Value::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    if let Some(item_schema) = items_schema(&schema, i)? {
                        if !self.validate(&item_schema, item)? {
                            return Ok(false);
                        }
                    }
                }
            }
            _ => {}
        }
        if let Some(all_of) = schema.get("allOf") {
            for branch in all_of.items() {
                if !self.validate(&branch, value)? {
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }
}
