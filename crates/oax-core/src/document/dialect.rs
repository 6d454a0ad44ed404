use indexmap::IndexMap;
use serde_json::Value;

use super::Document;
use crate::error::{ConfigError, Error, ResolveError};
use crate::parse::media_type::{ContentType, best_media_type};
use crate::parse::server::Server;
use crate::reference::Node;

/// Which server (v3) or scheme (v2) a base URL is computed for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerSelection {
    /// v2 only; ignored for v3 documents.
    pub scheme: Option<String>,
    /// v3 only: index into the document's `servers`.
    pub server: Option<usize>,
    /// v3 only: values for `{variable}`s in the server URL.
    pub server_variables: IndexMap<String, String>,
}

/// Behavior that differs between Swagger 2 and OpenAPI 3 documents.
pub(crate) trait Dialect: Send + Sync {
    fn base_url(
        &self,
        document: &Document,
        selection: &ServerSelection,
    ) -> Result<Option<String>, Error>;

    /// Media types the document accepts for request bodies by default.
    fn document_media_types(&self, document: &Document) -> Result<Option<Vec<String>>, ResolveError>;

    /// Media types an operation declares for its request body, if it declares any.
    fn request_media_types(&self, operation: &Node) -> Result<Option<Vec<String>>, ResolveError>;

    fn request_schema(
        &self,
        path_item: &Node,
        operation: &Node,
        media_type: Option<&str>,
    ) -> Result<Option<Node>, Error>;

    fn request_schemas(&self, path_item: &Node, operation: &Node) -> Result<Vec<Node>, Error>;

    /// The schema of a response object for a media type.
    fn response_schema(
        &self,
        response: &Node,
        media_type: Option<&str>,
    ) -> Result<Option<Node>, ResolveError>;

    fn response_schemas(&self, response: &Node) -> Result<Vec<Node>, ResolveError>;
}

pub(crate) struct V2;

pub(crate) struct V3;

fn string_list(node: Option<Node>) -> Option<Vec<String>> {
    let node = node?;
    let list = node.value().as_array()?;
    Some(
        list.iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
    )
}

fn deref_opt(node: Option<Node>) -> Result<Option<Node>, ResolveError> {
    node.map(|n| n.deref()).transpose()
}

impl V2 {
    /// `https`, then `http`, then whatever comes first. No `schemes` means https.
    pub fn preferred_scheme(document: &Document) -> Option<String> {
        let Some(schemes) = document.root().get("schemes") else {
            return Some("https".to_string());
        };
        let schemes: Vec<&str> = schemes.as_array()?.iter().filter_map(Value::as_str).collect();
        ["https", "http"]
            .into_iter()
            .find(|preferred| schemes.contains(preferred))
            .or_else(|| schemes.first().copied())
            .map(str::to_string)
    }

    /// The single `in: body` parameter, dereferenced. Path-item parameters
    /// apply too; an operation body parameter with the same name replaces one.
    pub fn body_parameter(path_item: &Node, operation: &Node) -> Result<Option<Node>, Error> {
        let mut found: Vec<(Option<String>, Node)> = Vec::new();
        for owner in [path_item, operation] {
            let Some(parameters) = owner.get("parameters") else {
                continue;
            };
            for parameter in parameters.deref()?.items() {
                let parameter = parameter.deref()?;
                if parameter.value().get("in").and_then(Value::as_str) != Some("body") {
                    continue;
                }
                let name = parameter.value().get("name").and_then(Value::as_str).map(str::to_string);
                match found.iter_mut().find(|(existing, _)| *existing == name) {
                    Some(slot) => slot.1 = parameter,
                    None => found.push((name, parameter)),
                }
            }
        }
        if found.len() > 1 {
            let id = operation
                .value()
                .get("operationId")
                .and_then(Value::as_str)
                .map_or_else(|| operation.pointer().to_string(), str::to_string);
            return Err(crate::error::DocumentError::MultipleBodyParameters(id).into());
        }
        Ok(found.pop().map(|(_, parameter)| parameter))
    }
}

impl Dialect for V2 {
    fn base_url(
        &self,
        document: &Document,
        selection: &ServerSelection,
    ) -> Result<Option<String>, Error> {
        let root = document.root();
        let Some(host) = root.get("host").and_then(Value::as_str) else {
            return Ok(None);
        };
        let scheme = match &selection.scheme {
            Some(scheme) => Some(scheme.clone()),
            None => V2::preferred_scheme(document),
        };
        let Some(scheme) = scheme else {
            return Ok(None);
        };
        let base_path = root.get("basePath").and_then(Value::as_str).unwrap_or("");
        Ok(Some(format!("{scheme}://{host}{base_path}")))
    }

    fn document_media_types(&self, document: &Document) -> Result<Option<Vec<String>>, ResolveError> {
        Ok(string_list(Node::root(document).get("consumes")))
    }

    fn request_media_types(&self, operation: &Node) -> Result<Option<Vec<String>>, ResolveError> {
        Ok(string_list(operation.get("consumes")))
    }

    fn request_schema(
        &self,
        path_item: &Node,
        operation: &Node,
        _media_type: Option<&str>,
    ) -> Result<Option<Node>, Error> {
        let Some(body) = V2::body_parameter(path_item, operation)? else {
            return Ok(None);
        };
        Ok(deref_opt(body.get("schema"))?)
    }

    fn request_schemas(&self, path_item: &Node, operation: &Node) -> Result<Vec<Node>, Error> {
        Ok(self.request_schema(path_item, operation, None)?.into_iter().collect())
    }

    fn response_schema(
        &self,
        response: &Node,
        _media_type: Option<&str>,
    ) -> Result<Option<Node>, ResolveError> {
        deref_opt(response.get_resolved("schema")?)
    }

    fn response_schemas(&self, response: &Node) -> Result<Vec<Node>, ResolveError> {
        Ok(self.response_schema(response, None)?.into_iter().collect())
    }
}

impl V3 {
    fn content(node: &Node) -> Result<Option<Node>, ResolveError> {
        node.deref()?.get("content").map(|c| c.deref()).transpose()
    }

    /// Look a media type up in a `content` map: exact key, then the same
    /// type without parameters, then `type/*`, then `*/*`.
    fn media_type_entry(content: &Node, media_type: &str) -> Option<Node> {
        if let Some(exact) = content.get(media_type) {
            return Some(exact);
        }
        let wanted = ContentType::parse(media_type);
        let entries = content.entries();
        let essence_match = entries
            .iter()
            .find(|(key, _)| ContentType::parse(key).essence() == wanted.essence());
        if let Some((_, node)) = essence_match {
            return Some(node.clone());
        }
        content
            .get(&format!("{}/*", wanted.main_type()))
            .or_else(|| content.get("*/*"))
    }

    fn schemas_of(content: &Node) -> Result<Vec<Node>, ResolveError> {
        let mut schemas = Vec::new();
        for (_, media) in content.entries() {
            if let Some(schema) = media.deref()?.get("schema") {
                schemas.push(schema.deref()?);
            }
        }
        Ok(schemas)
    }
}

impl Dialect for V3 {
    fn base_url(
        &self,
        document: &Document,
        selection: &ServerSelection,
    ) -> Result<Option<String>, Error> {
        let servers = match Node::root(document).get("servers") {
            Some(servers) => servers.items(),
            None => Vec::new(),
        };
        let server = match selection.server {
            Some(index) => Some(servers.get(index).ok_or(ConfigError::ServerOutOfRange {
                index,
                count: servers.len(),
            })?),
            None if servers.len() == 1 => servers.first(),
            None => None,
        };
        let Some(server) = server else {
            return Ok(None);
        };
        let server: Server = server.deref()?.deserialize("server")?;
        Ok(Some(server.expanded_url(&selection.server_variables)))
    }

    fn document_media_types(&self, _document: &Document) -> Result<Option<Vec<String>>, ResolveError> {
        Ok(None)
    }

    fn request_media_types(&self, operation: &Node) -> Result<Option<Vec<String>>, ResolveError> {
        let Some(request_body) = operation.get("requestBody") else {
            return Ok(None);
        };
        Ok(V3::content(&request_body)?.map(|content| {
            content.entries().into_iter().map(|(key, _)| key).collect()
        }))
    }

    fn request_schema(
        &self,
        _path_item: &Node,
        operation: &Node,
        media_type: Option<&str>,
    ) -> Result<Option<Node>, Error> {
        let Some(request_body) = operation.get("requestBody") else {
            return Ok(None);
        };
        let Some(content) = V3::content(&request_body)? else {
            return Ok(None);
        };
        let media_type = match media_type {
            Some(media_type) => media_type.to_string(),
            None => {
                let keys: Vec<String> = content.entries().into_iter().map(|(k, _)| k).collect();
                match best_media_type(&keys) {
                    Some(media_type) => media_type,
                    None => return Ok(None),
                }
            }
        };
        let Some(entry) = V3::media_type_entry(&content, &media_type) else {
            return Ok(None);
        };
        Ok(deref_opt(entry.deref()?.get("schema"))?)
    }

    fn request_schemas(&self, _path_item: &Node, operation: &Node) -> Result<Vec<Node>, Error> {
        let Some(request_body) = operation.get("requestBody") else {
            return Ok(Vec::new());
        };
        match V3::content(&request_body)? {
            Some(content) => Ok(V3::schemas_of(&content)?),
            None => Ok(Vec::new()),
        }
    }

    fn response_schema(
        &self,
        response: &Node,
        media_type: Option<&str>,
    ) -> Result<Option<Node>, ResolveError> {
        let (Some(content), Some(media_type)) = (V3::content(response)?, media_type) else {
            return Ok(None);
        };
        let Some(entry) = V3::media_type_entry(&content, media_type) else {
            return Ok(None);
        };
        deref_opt(entry.deref()?.get("schema"))
    }

    fn response_schemas(&self, response: &Node) -> Result<Vec<Node>, ResolveError> {
        match V3::content(response)? {
            Some(content) => V3::schemas_of(&content),
            None => Ok(Vec::new()),
        }
    }
}
