use super::{Document, ServerSelection, V2};
use crate::config::OperationDefaults;
use crate::error::Result;
use crate::exchange::{Exchange, HttpMethod};
use crate::pagination::Pages;
use crate::parse::media_type::best_media_type;
use crate::parse::parameter::{Parameter, ParameterLocation};
use crate::reference::{Location, Node};
use crate::request::{Request, RequestConfig, template};
use crate::response::BodyObject;

/// An operation in the catalog: a method on a path template.
#[derive(Debug, Clone)]
pub struct Operation {
    pub(crate) path: String,
    pub(crate) method: HttpMethod,
    pub(crate) location: Location,
    pub(crate) path_item: Location,
    pub(crate) operation_id: Option<String>,
    pub(crate) tags: Vec<String>,
    pub(crate) summary: Option<String>,
}

impl Operation {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn operation_id(&self) -> Option<&str> {
        self.operation_id.as_deref()
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }
}

/// An operation together with the document it belongs to.
#[derive(Debug, Clone, Copy)]
pub struct OperationRef<'a> {
    document: &'a Document,
    operation: &'a Operation,
}

impl<'a> OperationRef<'a> {
    pub(crate) fn new(document: &'a Document, operation: &'a Operation) -> Self {
        Self {
            document,
            operation,
        }
    }

    pub fn document(&self) -> &'a Document {
        self.document
    }

    pub fn operation(&self) -> &'a Operation {
        self.operation
    }

    pub fn operation_id(&self) -> Option<&'a str> {
        self.operation.operation_id.as_deref()
    }

    pub fn path_template(&self) -> &'a str {
        &self.operation.path
    }

    pub fn http_method(&self) -> HttpMethod {
        self.operation.method
    }

    pub fn summary(&self) -> Option<&'a str> {
        self.operation.summary.as_deref()
    }

    pub fn tags(&self) -> &'a [String] {
        &self.operation.tags
    }

    pub fn is_tagged(&self, tag: &str) -> bool {
        self.operation.tags.iter().any(|t| t == tag)
    }

    /// A short name for messages: the operationId, else path and method.
    pub fn human_id(&self) -> String {
        match &self.operation.operation_id {
            Some(id) => id.clone(),
            None => format!(
                "path: {}, method: {}",
                self.operation.path,
                self.operation.method.as_str().to_ascii_lowercase()
            ),
        }
    }

    /// The operation object.
    pub fn node(&self) -> Result<Node> {
        Ok(self.operation.location.node(self.document)?)
    }

    pub fn path_item(&self) -> Result<Node> {
        Ok(self.operation.path_item.node(self.document)?)
    }

    /// Per-operation defaults from the document's client configuration.
    pub fn defaults(&self) -> Option<&'a OperationDefaults> {
        self.document.config().operation(self.operation_id())
    }

    /// Declared parameters, dereferenced. Path-item parameters come first;
    /// an operation parameter with the same name and location replaces one.
    pub fn parameters(&self) -> Result<Vec<Parameter>> {
        let mut parameters: Vec<Parameter> = Vec::new();
        for owner in [self.path_item()?, self.node()?] {
            let Some(list) = owner.get("parameters") else {
                continue;
            };
            for node in list.deref()?.items() {
                let parameter: Parameter = node.deref()?.deserialize("parameter")?;
                match parameters.iter_mut().find(|p| p.key() == parameter.key()) {
                    Some(existing) => *existing = parameter,
                    None => parameters.push(parameter),
                }
            }
        }
        Ok(parameters)
    }

    /// Declared parameters plus a required string path parameter for every
    /// template variable the document does not declare.
    pub fn inferred_parameters(&self) -> Result<Vec<Parameter>> {
        let mut parameters = self.parameters()?;
        for variable in template::variables(self.path_template()) {
            let declared = parameters.iter().any(|p| {
                p.name == variable && p.location == ParameterLocation::Path
            });
            if !declared {
                parameters.push(Parameter::synthesized_path(&variable));
            }
        }
        Ok(parameters)
    }

    /// The response object for a status: the exact status key, else `default`.
    pub fn oa_response(&self, status: u16) -> Result<Option<Node>> {
        let Some(responses) = self.node()?.get("responses") else {
            return Ok(None);
        };
        let responses = responses.deref()?;
        let response = responses
            .get(&status.to_string())
            .or_else(|| responses.get("default"));
        Ok(response.map(|r| r.deref()).transpose()?)
    }

    /// The media type a structured request body is sent as, before any
    /// request-level override.
    pub fn request_media_type(&self) -> Result<Option<String>> {
        if let Some(media_type) = self.document.config().media_type_for(self.operation_id()) {
            return Ok(Some(media_type.to_string()));
        }
        match self.document.dialect().request_media_types(&self.node()?)? {
            Some(candidates) => Ok(best_media_type(&candidates)),
            None => self.document.request_media_type(),
        }
    }

    /// The request body schema for a media type. v2 documents ignore the media
    /// type and use the body parameter's schema.
    pub fn request_schema(&self, media_type: Option<&str>) -> Result<Option<Node>> {
        let media_type = match media_type {
            Some(media_type) => Some(media_type.to_string()),
            None => self.request_media_type()?,
        };
        self.document
            .dialect()
            .request_schema(&self.path_item()?, &self.node()?, media_type.as_deref())
    }

    pub fn request_schemas(&self) -> Result<Vec<Node>> {
        self.document
            .dialect()
            .request_schemas(&self.path_item()?, &self.node()?)
    }

    /// The v2 `in: body` parameter. Always `None` for v3 documents.
    pub fn body_parameter(&self) -> Result<Option<Node>> {
        if !self.document.is_v2() {
            return Ok(None);
        }
        V2::body_parameter(&self.path_item()?, &self.node()?)
    }

    /// The schema describing a response with this status and media type.
    pub fn response_schema(&self, status: u16, media_type: Option<&str>) -> Result<Option<Node>> {
        let Some(response) = self.oa_response(status)? else {
            return Ok(None);
        };
        Ok(self.document.dialect().response_schema(&response, media_type)?)
    }

    /// Every response schema of the operation, across statuses and media types.
    pub fn response_schemas(&self) -> Result<Vec<Node>> {
        let Some(responses) = self.node()?.get("responses") else {
            return Ok(Vec::new());
        };
        let mut schemas = Vec::new();
        for (_, response) in responses.deref()?.entries() {
            let response = response.deref()?;
            schemas.extend(self.document.dialect().response_schemas(&response)?);
        }
        Ok(schemas)
    }

    /// The base URL for a server selection. Operation defaults and the client
    /// configuration are consulted before the document.
    pub fn base_url(&self, selection: &ServerSelection) -> Result<Option<String>> {
        if let Some(base_url) = self.document.config().base_url_for(self.operation_id()) {
            return Ok(Some(base_url.to_string()));
        }
        self.document.base_url(selection)
    }

    pub fn build_request(&self, config: RequestConfig) -> Result<Request<'a>> {
        Request::new(*self, config)
    }

    /// Run the operation, returning the exchange whatever its status.
    pub fn run_exchange(&self, config: RequestConfig) -> Result<Exchange> {
        self.build_request(config)?.run_exchange()
    }

    /// Run the operation, failing on a 4xx/5xx status, and materialize the
    /// response body.
    pub fn run(&self, config: RequestConfig) -> Result<BodyObject> {
        self.build_request(config)?.run()
    }

    pub fn run_mutable(&self, config: RequestConfig) -> Result<BodyObject> {
        self.build_request(config)?.run_mutable()
    }

    /// Run the operation and follow `Link: <...>; rel="next"` headers.
    pub fn each_link_page(&self, config: RequestConfig) -> Pages<'a> {
        Pages::new(*self, config)
    }
}

impl PartialEq for OperationRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        Document::ptr_eq(self.document, other.document)
            && std::ptr::eq(self.operation, other.operation)
    }
}
