use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A server variable for URL templates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerVariable {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(rename = "enum", default, skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<String>,
}

/// A v3 server URL definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Server {
    pub url: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub variables: IndexMap<String, ServerVariable>,
}

impl Server {
    /// Expand `{name}` variables with the given values, falling back to each
    /// variable's default. Unknown or undefaulted variables expand to "".
    /// A given value outside a variable's enum is only warned about.
    pub fn expanded_url(&self, values: &IndexMap<String, String>) -> String {
        let mut url = String::with_capacity(self.url.len());
        let mut rest = self.url.as_str();
        while let Some(open) = rest.find('{') {
            let Some(close) = rest[open..].find('}') else {
                break;
            };
            url.push_str(&rest[..open]);
            let name = &rest[open + 1..open + close];
            url.push_str(&self.variable_value(name, values));
            rest = &rest[open + close + 1..];
        }
        url.push_str(rest);
        url
    }

    fn variable_value(&self, name: &str, values: &IndexMap<String, String>) -> String {
        let variable = self.variables.get(name);
        if let Some(value) = values.get(name) {
            let outside_enum = variable
                .is_some_and(|v| !v.enum_values.is_empty() && !v.enum_values.contains(value));
            if outside_enum {
                log::warn!(
                    "value {value:?} for server variable {name} is not one of {:?} (server {})",
                    variable.map(|v| v.enum_values.as_slice()).unwrap_or_default(),
                    self.url
                );
            }
            return value.clone();
        }
        variable
            .and_then(|v| v.default.clone())
            .unwrap_or_default()
    }
}
