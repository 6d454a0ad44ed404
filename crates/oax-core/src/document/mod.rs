//! Loaded description documents and their operation catalog.

mod dialect;
mod operation;

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock, RwLock, Weak};

use serde::Deserialize;
use serde_json::Value;

use crate::config::ClientConfig;
use crate::error::{ConfigError, DocumentError, Result};
use crate::exchange::{Exchange, HttpMethod};
use crate::parse;
use crate::parse::media_type::best_media_type;
use crate::reference::registry::normalize_uri;
use crate::reference::{DocumentRegistry, Location, Node};
use crate::request::RequestConfig;
use crate::response::BodyObject;
use crate::schema::{SchemaComponent, StructuralSchemas};
use crate::transport::{Connection, Middleware, Transport};

pub use dialect::ServerSelection;
pub(crate) use dialect::{Dialect, V2, V3};
pub use operation::{Operation, OperationRef};

/// The dialect of a description document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version {
    /// Swagger 2.0
    V2,
    /// OpenAPI 3.x
    V3,
}

/// HTTP methods that may key an operation in a path item.
const PATH_ITEM_METHODS: [&str; 8] = [
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

/// A top-level tag.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Tag {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// A loaded, immutable description document. Cloning is cheap.
#[derive(Clone)]
pub struct Document {
    inner: Arc<DocumentInner>,
}

pub(crate) struct DocumentInner {
    root: Value,
    uri: Option<String>,
    version: Version,
    registry: DocumentRegistry,
    config: ClientConfig,
    connection: Option<Connection>,
    schemas: Arc<dyn SchemaComponent>,
    ref_cache: RwLock<HashMap<String, Location>>,
    operations: OnceLock<Vec<Operation>>,
    operations_by_id: OnceLock<HashMap<String, usize>>,
}

impl Document {
    pub fn builder(root: Value) -> DocumentBuilder {
        DocumentBuilder::new(root)
    }

    pub fn from_value(root: Value) -> Result<Self, DocumentError> {
        Self::builder(root).build()
    }

    pub fn from_yaml(input: &str) -> Result<Self, DocumentError> {
        Self::from_value(parse::from_yaml(input)?)
    }

    pub fn from_json(input: &str) -> Result<Self, DocumentError> {
        Self::from_value(parse::from_json(input)?)
    }

    pub fn root(&self) -> &Value {
        &self.inner.root
    }

    pub fn root_node(&self) -> Node {
        Node::root(self)
    }

    /// A node at the given JSON pointer.
    pub fn node(&self, pointer: &str) -> Node {
        Node::new(self.clone(), pointer)
    }

    pub fn uri(&self) -> Option<&str> {
        self.inner.uri.as_deref()
    }

    pub fn version(&self) -> Version {
        self.inner.version
    }

    pub fn is_v2(&self) -> bool {
        self.inner.version == Version::V2
    }

    pub fn is_v3(&self) -> bool {
        self.inner.version == Version::V3
    }

    pub fn registry(&self) -> &DocumentRegistry {
        &self.inner.registry
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn connection(&self) -> Option<&Connection> {
        self.inner.connection.as_ref()
    }

    pub fn schemas(&self) -> &Arc<dyn SchemaComponent> {
        &self.inner.schemas
    }

    pub fn title(&self) -> Option<&str> {
        self.root().get("info")?.get("title")?.as_str()
    }

    /// Tags declared at the top level, in document order.
    pub fn tags(&self) -> Result<Vec<Tag>> {
        let Some(tags) = self.root_node().get("tags") else {
            return Ok(Vec::new());
        };
        let mut out = Vec::new();
        for tag in tags.items() {
            out.push(tag.deref()?.deserialize("tag")?);
        }
        Ok(out)
    }

    pub(crate) fn dialect(&self) -> &'static dyn Dialect {
        match self.inner.version {
            Version::V2 => &V2,
            Version::V3 => &V3,
        }
    }

    pub(crate) fn ref_cache(&self) -> &RwLock<HashMap<String, Location>> {
        &self.inner.ref_cache
    }

    pub(crate) fn downgrade(&self) -> Weak<DocumentInner> {
        Arc::downgrade(&self.inner)
    }

    pub(crate) fn upgrade(weak: &Weak<DocumentInner>) -> Option<Document> {
        weak.upgrade().map(|inner| Document { inner })
    }

    pub fn ptr_eq(a: &Document, b: &Document) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }

    /// Every operation, in path then method order. Computed once.
    pub fn operations(&self) -> Result<Vec<OperationRef<'_>>> {
        Ok(self
            .operation_list()?
            .iter()
            .map(|operation| OperationRef::new(self, operation))
            .collect())
    }

    fn operation_list(&self) -> Result<&[Operation]> {
        if let Some(operations) = self.inner.operations.get() {
            return Ok(operations);
        }
        let computed = self.collect_operations()?;
        log::debug!("indexed {} operations", computed.len());
        Ok(self.inner.operations.get_or_init(|| computed))
    }

    fn collect_operations(&self) -> Result<Vec<Operation>> {
        let mut operations = Vec::new();
        let Some(paths) = self.root_node().get("paths") else {
            return Ok(operations);
        };
        for (path, item) in paths.entries() {
            if path.starts_with("x-") {
                continue;
            }
            let item = item.deref()?;
            for method in PATH_ITEM_METHODS {
                let Some(node) = item.get(method) else {
                    continue;
                };
                let node = node.deref()?;
                let Ok(method) = method.parse::<HttpMethod>() else {
                    continue;
                };
                let value = node.value();
                operations.push(Operation {
                    path: path.clone(),
                    method,
                    location: Location::of(&node, self),
                    path_item: Location::of(&item, self),
                    operation_id: value
                        .get("operationId")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                    tags: value
                        .get("tags")
                        .and_then(Value::as_array)
                        .map(|tags| {
                            tags.iter()
                                .filter_map(Value::as_str)
                                .map(str::to_string)
                                .collect()
                        })
                        .unwrap_or_default(),
                    summary: value
                        .get("summary")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                });
            }
        }
        Ok(operations)
    }

    fn operations_by_id(&self) -> Result<&HashMap<String, usize>> {
        if let Some(index) = self.inner.operations_by_id.get() {
            return Ok(index);
        }
        let mut index = HashMap::new();
        for (i, operation) in self.operation_list()?.iter().enumerate() {
            if let Some(id) = &operation.operation_id {
                index.entry(id.clone()).or_insert(i);
            }
        }
        Ok(self.inner.operations_by_id.get_or_init(|| index))
    }

    /// Look an operation up by operationId.
    pub fn operation(&self, operation_id: &str) -> Result<OperationRef<'_>> {
        let index = *self
            .operations_by_id()?
            .get(operation_id)
            .ok_or_else(|| ConfigError::UnknownOperation(operation_id.to_string()))?;
        Ok(OperationRef::new(self, &self.operation_list()?[index]))
    }

    /// Look an operation up by method and path template.
    pub fn operation_at(&self, method: HttpMethod, path: &str) -> Result<Option<OperationRef<'_>>> {
        Ok(self
            .operation_list()?
            .iter()
            .find(|op| op.method == method && op.path == path)
            .map(|op| OperationRef::new(self, op)))
    }

    pub fn operations_tagged(&self, tag: &str) -> Result<Vec<OperationRef<'_>>> {
        Ok(self
            .operations()?
            .into_iter()
            .filter(|op| op.is_tagged(tag))
            .collect())
    }

    /// The base URL for a server selection. A configured `base_url` wins over
    /// anything computed from the document.
    pub fn base_url(&self, selection: &ServerSelection) -> Result<Option<String>> {
        if let Some(base_url) = &self.inner.config.base_url {
            return Ok(Some(base_url.clone()));
        }
        self.dialect().base_url(self, selection)
    }

    /// The server selection configured for the document.
    pub fn server_selection(&self) -> ServerSelection {
        let config = &self.inner.config;
        ServerSelection {
            scheme: config.scheme.clone(),
            server: config.server,
            server_variables: config.server_variables.clone(),
        }
    }

    /// Default request media type for operations that do not declare one.
    pub fn request_media_type(&self) -> Result<Option<String>> {
        if let Some(media_type) = &self.inner.config.media_type {
            return Ok(Some(media_type.clone()));
        }
        Ok(self
            .dialect()
            .document_media_types(self)?
            .and_then(|candidates| best_media_type(&candidates)))
    }

    /// Run an operation by operationId and materialize its response body.
    pub fn call(&self, operation_id: &str, config: RequestConfig) -> Result<BodyObject> {
        self.operation(operation_id)?.run(config)
    }

    /// Run an operation by operationId; the returned instance accepts writes.
    pub fn call_mutable(&self, operation_id: &str, config: RequestConfig) -> Result<BodyObject> {
        self.operation(operation_id)?.run_mutable(config)
    }

    /// Run an operation by operationId, returning the raw exchange.
    pub fn call_exchange(&self, operation_id: &str, config: RequestConfig) -> Result<Exchange> {
        self.operation(operation_id)?.run_exchange(config)
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("uri", &self.inner.uri)
            .field("version", &self.inner.version)
            .field("title", &self.title())
            .finish()
    }
}

/// Configures and builds a [`Document`].
pub struct DocumentBuilder {
    root: Value,
    uri: Option<String>,
    register: bool,
    registry: Option<DocumentRegistry>,
    config: ClientConfig,
    connection: Option<Connection>,
    middleware: Vec<Arc<dyn Middleware>>,
    schemas: Option<Arc<dyn SchemaComponent>>,
}

impl DocumentBuilder {
    fn new(root: Value) -> Self {
        Self {
            root,
            uri: None,
            register: true,
            registry: None,
            config: ClientConfig::default(),
            connection: None,
            middleware: Vec::new(),
            schemas: None,
        }
    }

    /// The absolute URI the document is known by. Documents with a URI are
    /// registered so other documents can reference them.
    pub fn uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    /// Whether to register a document that has a URI. Defaults to true.
    pub fn register(mut self, register: bool) -> Self {
        self.register = register;
        self
    }

    /// Resolve cross-document references in this registry instead of the
    /// global one.
    pub fn registry(mut self, registry: DocumentRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.connection = Some(Connection::new(transport));
        self
    }

    pub fn connection(mut self, connection: Connection) -> Self {
        self.connection = Some(connection);
        self
    }

    /// Append a middleware to the connection's chain.
    pub fn middleware(mut self, middleware: impl Middleware + 'static) -> Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    pub fn schemas(mut self, schemas: impl SchemaComponent + 'static) -> Self {
        self.schemas = Some(Arc::new(schemas));
        self
    }

    pub fn build(self) -> Result<Document, DocumentError> {
        let version = parse::detect_version(&self.root)?;
        let uri = self
            .uri
            .map(|uri| {
                normalize_uri(&uri).map_err(|source| DocumentError::InvalidUri { uri, source })
            })
            .transpose()?;
        let registry = self
            .registry
            .unwrap_or_else(|| DocumentRegistry::global().clone());
        if self.connection.is_none() && !self.middleware.is_empty() {
            log::warn!(
                "{} middleware dropped: no transport configured",
                self.middleware.len()
            );
        }
        let connection = self.connection.map(|mut connection| {
            for middleware in self.middleware {
                connection = connection.with_arc(middleware);
            }
            connection
        });

        let document = Document {
            inner: Arc::new(DocumentInner {
                root: self.root,
                uri,
                version,
                registry,
                config: self.config,
                connection,
                schemas: self
                    .schemas
                    .unwrap_or_else(|| Arc::new(StructuralSchemas)),
                ref_cache: RwLock::new(HashMap::new()),
                operations: OnceLock::new(),
                operations_by_id: OnceLock::new(),
            }),
        };
        if self.register && document.uri().is_some() {
            document.registry().register(&document)?;
        }
        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::exchange::{HttpRequest, HttpResponse};
    use crate::transport::{Next, from_fn};
    use serde_json::json;

    fn petstore() -> Document {
        Document::builder(json!({
            "openapi": "3.0.0",
            "info": {"title": "Petstore", "version": "1"},
            "tags": [{"name": "pets", "description": "Pet operations"}],
            "servers": [{"url": "https://pets.example.com/v1"}],
            "paths": {
                "/pets": {
                    "get": {"operationId": "listPets", "tags": ["pets"]},
                    "post": {"operationId": "createPet", "tags": ["pets", "admin"]}
                },
                "/pets/{id}": {"$ref": "#/x-path-items/pet"},
                "x-ignored": {}
            },
            "x-path-items": {
                "pet": {
                    "get": {"operationId": "getPet"},
                    "delete": {}
                }
            }
        }))
        .registry(DocumentRegistry::new())
        .build()
        .unwrap()
    }

    #[test]
    fn test_operations_are_listed_in_order() {
        let doc = petstore();
        let ops: Vec<String> = doc
            .operations()
            .unwrap()
            .iter()
            .map(|op| op.human_id())
            .collect();
        assert_eq!(
            ops,
            vec![
                "listPets",
                "createPet",
                "getPet",
                "path: /pets/{id}, method: delete"
            ]
        );
    }

    #[test]
    fn test_operation_lookup() {
        let doc = petstore();
        let op = doc.operation("getPet").unwrap();
        assert_eq!(op.path_template(), "/pets/{id}");
        assert_eq!(op.http_method(), HttpMethod::Get);
        assert_eq!(
            op.node().unwrap().pointer(),
            "/x-path-items/pet/get"
        );
        let err = doc.operation("nope").unwrap_err();
        assert_eq!(err.to_string(), "operationId not found: \"nope\"");
    }

    #[test]
    fn test_operation_at() {
        let doc = petstore();
        let op = doc.operation_at(HttpMethod::Delete, "/pets/{id}").unwrap().unwrap();
        assert_eq!(op.operation_id(), None);
        assert!(doc.operation_at(HttpMethod::Put, "/pets").unwrap().is_none());
    }

    #[test]
    fn test_tags() {
        let doc = petstore();
        assert_eq!(doc.title(), Some("Petstore"));
        let tags = doc.tags().unwrap();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].name, "pets");
        let admin: Vec<_> = doc
            .operations_tagged("admin")
            .unwrap()
            .into_iter()
            .map(|op| op.human_id())
            .collect();
        assert_eq!(admin, vec!["createPet"]);
    }

    #[test]
    fn test_capabilities() {
        let doc = petstore();
        assert!(doc.is_v3());
        assert!(!doc.is_v2());
        assert_eq!(doc.version(), Version::V3);
    }

    #[test]
    fn test_base_url_prefers_config() {
        let doc = petstore();
        assert_eq!(
            doc.base_url(&ServerSelection::default()).unwrap().as_deref(),
            Some("https://pets.example.com/v1")
        );
        let configured = Document::builder(doc.root().clone())
            .registry(DocumentRegistry::new())
            .config(ClientConfig {
                base_url: Some("http://localhost:8080".to_string()),
                ..Default::default()
            })
            .build()
            .unwrap();
        assert_eq!(
            configured.base_url(&ServerSelection::default()).unwrap().as_deref(),
            Some("http://localhost:8080")
        );
    }

    #[test]
    fn test_registration_is_weak() {
        let registry = DocumentRegistry::new();
        let doc = Document::builder(json!({"openapi": "3.0.0"}))
            .uri("https://example.com/a.yaml")
            .registry(registry.clone())
            .build()
            .unwrap();
        assert!(registry.contains("https://example.com/a.yaml"));
        drop(doc);
        assert!(!registry.contains("https://example.com/a.yaml"));
    }

    struct Tag;

    impl Middleware for Tag {
        fn handle(
            &self,
            mut request: HttpRequest,
            next: Next<'_>,
        ) -> std::result::Result<HttpResponse, TransportError> {
            request.headers.push(("X-Tag".to_string(), "1".to_string()));
            next.run(request)
        }
    }

    #[test]
    fn test_middleware_applies_whatever_the_builder_order() {
        let doc = Document::builder(json!({"openapi": "3.0.0"}))
            .registry(DocumentRegistry::new())
            .middleware(Tag)
            .transport(from_fn(|req| {
                Ok(HttpResponse::new(200, Vec::new(), req.header("x-tag").unwrap_or("none")))
            }))
            .build()
            .unwrap();
        let request = HttpRequest {
            method: HttpMethod::Get,
            url: "https://example.com/".to_string(),
            headers: Vec::new(),
            body: None,
        };
        let (sent, response) = doc.connection().unwrap().run(request).unwrap();
        assert_eq!(sent.header("X-Tag"), Some("1"));
        assert_eq!(response.body, "1");
    }

    #[test]
    fn test_middleware_without_transport_is_dropped() {
        let doc = Document::builder(json!({"openapi": "3.0.0"}))
            .registry(DocumentRegistry::new())
            .middleware(Tag)
            .build()
            .unwrap();
        assert!(doc.connection().is_none());
    }

    #[test]
    fn test_rejects_relative_uri() {
        let err = Document::builder(json!({"openapi": "3.0.0"}))
            .uri("a.yaml")
            .build()
            .unwrap_err();
        assert!(matches!(err, DocumentError::InvalidUri { .. }));
    }
}
