use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::error::ConfigError;

/// User agent sent when neither the request nor the document configures one.
pub const DEFAULT_USER_AGENT: &str = concat!("oax/", env!("CARGO_PKG_VERSION"));

/// Document-level client configuration, loaded from `.oax.yaml`.
///
/// Values here are the defaults every request of the document starts from.
/// Per-operation overrides live in `operations`, keyed by operationId.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub base_url: Option<String>,
    /// Preferred scheme for v2 documents.
    pub scheme: Option<String>,
    /// Index into a v3 document's `servers`.
    pub server: Option<usize>,
    pub server_variables: IndexMap<String, String>,
    pub headers: IndexMap<String, String>,
    pub user_agent: Option<String>,
    pub media_type: Option<String>,
    /// Read by transports; the core never times anything out.
    pub timeout_secs: Option<u64>,
    pub operations: IndexMap<String, OperationDefaults>,
}

/// Defaults for a single operation. Every field falls back to [`ClientConfig`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OperationDefaults {
    pub base_url: Option<String>,
    pub media_type: Option<String>,
    pub headers: IndexMap<String, String>,
    pub query_params: IndexMap<String, String>,
    pub user_agent: Option<String>,
}

impl ClientConfig {
    pub fn operation(&self, operation_id: Option<&str>) -> Option<&OperationDefaults> {
        operation_id.and_then(|id| self.operations.get(id))
    }

    /// Headers for an operation: document headers overlaid with the operation's.
    pub fn headers_for(&self, operation_id: Option<&str>) -> IndexMap<String, String> {
        let mut headers = self.headers.clone();
        if let Some(defaults) = self.operation(operation_id) {
            for (name, value) in &defaults.headers {
                headers.insert(name.clone(), value.clone());
            }
        }
        headers
    }

    pub fn user_agent_for(&self, operation_id: Option<&str>) -> &str {
        self.operation(operation_id)
            .and_then(|d| d.user_agent.as_deref())
            .or(self.user_agent.as_deref())
            .unwrap_or(DEFAULT_USER_AGENT)
    }

    pub fn base_url_for(&self, operation_id: Option<&str>) -> Option<&str> {
        self.operation(operation_id)
            .and_then(|d| d.base_url.as_deref())
            .or(self.base_url.as_deref())
    }

    pub fn media_type_for(&self, operation_id: Option<&str>) -> Option<&str> {
        self.operation(operation_id)
            .and_then(|d| d.media_type.as_deref())
            .or(self.media_type.as_deref())
    }
}

/// Default config file name.
pub const CONFIG_FILE_NAME: &str = ".oax.yaml";

/// Load config from a YAML file. Returns `None` if the file doesn't exist.
pub fn load_config(path: &Path) -> Result<Option<ClientConfig>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config: ClientConfig =
        serde_yaml_ng::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(Some(config))
}

/// Generate the default config file content.
pub fn default_config_content() -> &'static str {
    r#"# oax client configuration
# base_url: https://api.example.com/v1
# scheme: https          # v2 documents: preferred entry of `schemes`
# server: 0              # v3 documents: index into `servers`
server_variables: {}
headers: {}
  # Authorization: Bearer <token>
# user_agent: my-client/1.0
# media_type: application/json
# timeout_secs: 30

operations: {}
  # listPets:
  #   query_params:
  #     limit: "50"
"#
}
