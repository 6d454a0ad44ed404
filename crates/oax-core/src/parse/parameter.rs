use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Parameter location. `body` and `formData` only occur in v2 documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ParameterLocation {
    Query,
    Header,
    Path,
    Cookie,
    Body,
    FormData,
}

impl ParameterLocation {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterLocation::Query => "query",
            ParameterLocation::Header => "header",
            ParameterLocation::Path => "path",
            ParameterLocation::Cookie => "cookie",
            ParameterLocation::Body => "body",
            ParameterLocation::FormData => "formData",
        }
    }
}

impl fmt::Display for ParameterLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An operation or path-item parameter, already dereferenced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,

    #[serde(rename = "in")]
    pub location: ParameterLocation,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub required: bool,

    /// v3 parameter schema, or the v2 body parameter's schema.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,

    /// v2 non-body parameter type.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub param_type: Option<String>,
}

impl Parameter {
    /// The parameter synthesized for a path template variable that the
    /// document does not declare.
    pub fn synthesized_path(name: &str) -> Self {
        Self {
            name: name.to_string(),
            location: ParameterLocation::Path,
            description: None,
            required: true,
            schema: None,
            param_type: Some("string".to_string()),
        }
    }

    pub fn key(&self) -> (&str, ParameterLocation) {
        (&self.name, self.location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_v2_form_data() {
        let p: Parameter =
            serde_json::from_value(json!({"name": "file", "in": "formData", "type": "file"}))
                .unwrap();
        assert_eq!(p.location, ParameterLocation::FormData);
        assert_eq!(p.param_type.as_deref(), Some("file"));
        assert!(!p.required);
    }

    #[test]
    fn test_synthesized_path() {
        let p = Parameter::synthesized_path("id");
        assert_eq!(p.key(), ("id", ParameterLocation::Path));
        assert!(p.required);
        assert_eq!(p.param_type.as_deref(), Some("string"));
    }
}
