//! Turning an operation and a [`RequestConfig`] into an HTTP request.

mod body;
pub mod template;

use indexmap::IndexMap;
use serde_json::Value;

use crate::document::{OperationRef, ServerSelection};
use crate::error::{ConfigError, Result};
use crate::exchange::{Exchange, HttpRequest};
use crate::parse::media_type::{ContentType, FALLBACK_CONTENT_TYPE};
use crate::parse::parameter::{Parameter, ParameterLocation};
use crate::reference::Node;
use crate::response::BodyObject;

pub use body::Body;

/// Call-time configuration of a request. Anything left unset falls back to
/// the operation's defaults, then the document's client configuration, then
/// what the document itself declares.
#[derive(Debug, Clone, Default)]
pub struct RequestConfig {
    pub path_params: IndexMap<String, String>,
    /// `None` sends no query string; `Some` of an empty map sends a bare `?`.
    pub query_params: Option<IndexMap<String, String>>,
    pub headers: Option<IndexMap<String, String>>,
    pub body: Option<Body>,
    pub base_url: Option<String>,
    pub media_type: Option<String>,
    pub scheme: Option<String>,
    pub server: Option<usize>,
    pub server_variables: Option<IndexMap<String, String>>,
    pub user_agent: Option<String>,
    /// Parameters by name. Each is routed to the path, query or headers
    /// according to the operation's parameter of that name.
    pub params: IndexMap<String, String>,
}

impl RequestConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn path_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.path_params.insert(name.into(), value.into());
        self
    }

    pub fn query_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_params
            .get_or_insert_with(IndexMap::new)
            .insert(name.into(), value.into());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .get_or_insert_with(IndexMap::new)
            .insert(name.into(), value.into());
        self
    }

    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn body_object(mut self, body: Value) -> Self {
        self.body = Some(Body::Object(body));
        self
    }

    pub fn raw_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(Body::Raw(body.into()));
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn media_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = Some(media_type.into());
        self
    }

    pub fn scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = Some(scheme.into());
        self
    }

    pub fn server(mut self, index: usize) -> Self {
        self.server = Some(index);
        self
    }

    pub fn server_variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.server_variables
            .get_or_insert_with(IndexMap::new)
            .insert(name.into(), value.into());
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }
}

/// A request for one operation with every configuration layer applied.
#[derive(Debug, Clone)]
pub struct Request<'a> {
    operation: OperationRef<'a>,
    path_params: IndexMap<String, String>,
    query_params: Option<IndexMap<String, String>>,
    headers: IndexMap<String, String>,
    body: Option<Body>,
    base_url: Option<String>,
    media_type: Option<String>,
    selection: ServerSelection,
    user_agent: String,
}

impl<'a> Request<'a> {
    pub fn new(operation: OperationRef<'a>, config: RequestConfig) -> Result<Self> {
        let document = operation.document();
        let client = document.config();
        let id = operation.operation_id();

        let mut headers = client.headers_for(id);
        headers.extend(config.headers.unwrap_or_default());

        let query_defaults = operation
            .defaults()
            .map(|d| d.query_params.clone())
            .unwrap_or_default();
        let query_params = match config.query_params {
            Some(given) => {
                let mut query = query_defaults;
                query.extend(given);
                Some(query)
            }
            None if !query_defaults.is_empty() => Some(query_defaults),
            None => None,
        };

        let defaults = document.server_selection();
        let selection = ServerSelection {
            scheme: config.scheme.or(defaults.scheme),
            server: config.server.or(defaults.server),
            server_variables: config.server_variables.unwrap_or(defaults.server_variables),
        };

        let mut request = Self {
            operation,
            path_params: config.path_params,
            query_params,
            headers,
            body: config.body,
            base_url: config.base_url,
            media_type: config.media_type,
            selection,
            user_agent: config
                .user_agent
                .unwrap_or_else(|| client.user_agent_for(id).to_string()),
        };
        for (name, value) in config.params {
            request.set_param(&name, value)?;
        }
        Ok(request)
    }

    pub fn operation(&self) -> OperationRef<'a> {
        self.operation
    }

    pub fn path_params(&self) -> &IndexMap<String, String> {
        &self.path_params
    }

    pub fn query_params(&self) -> Option<&IndexMap<String, String>> {
        self.query_params.as_ref()
    }

    /// Configured headers. `User-Agent` and `Content-Type` defaults are added
    /// when the HTTP request is built.
    pub fn headers(&self) -> &IndexMap<String, String> {
        &self.headers
    }

    pub fn body_object(&self) -> Option<&Body> {
        self.body.as_ref()
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn set_path_param(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.path_params.insert(name.into(), value.into());
    }

    pub fn set_query_param(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.query_params
            .get_or_insert_with(IndexMap::new)
            .insert(name.into(), value.into());
    }

    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.insert(name.into(), value.into());
    }

    pub fn set_body(&mut self, body: Body) {
        self.body = Some(body);
    }

    /// The unique parameter with this name, if any.
    pub fn param_for(&self, name: &str) -> Result<Option<Parameter>> {
        let mut matching: Vec<Parameter> = self
            .operation
            .inferred_parameters()?
            .into_iter()
            .filter(|p| p.name == name)
            .collect();
        if matching.len() > 1 {
            return Err(ConfigError::AmbiguousParameter {
                name: name.to_string(),
                operation: self.operation.human_id(),
                locations: matching.iter().map(|p| p.location.to_string()).collect(),
            }
            .into());
        }
        Ok(matching.pop())
    }

    fn param_for_known(&self, name: &str) -> Result<Parameter> {
        self.param_for(name)?.ok_or_else(|| {
            ConfigError::UnknownParameter {
                name: name.to_string(),
                operation: self.operation.human_id(),
            }
            .into()
        })
    }

    fn check_settable(&self, parameter: &Parameter) -> Result<()> {
        match parameter.location {
            ParameterLocation::Path | ParameterLocation::Query | ParameterLocation::Header => Ok(()),
            ParameterLocation::Cookie => Err(ConfigError::CookieParameter {
                name: parameter.name.clone(),
                operation: self.operation.human_id(),
            }
            .into()),
            ParameterLocation::Body | ParameterLocation::FormData => {
                Err(ConfigError::UnsupportedParameterLocation {
                    name: parameter.name.clone(),
                    location: parameter.location.to_string(),
                    operation: self.operation.human_id(),
                }
                .into())
            }
        }
    }

    /// Set a parameter by name, wherever the operation says it goes.
    pub fn set_param(&mut self, name: &str, value: impl Into<String>) -> Result<()> {
        let parameter = self.param_for_known(name)?;
        self.check_settable(&parameter)?;
        let value = value.into();
        match parameter.location {
            ParameterLocation::Path => self.set_path_param(parameter.name, value),
            ParameterLocation::Query => self.set_query_param(parameter.name, value),
            _ => self.set_header(parameter.name, value),
        }
        Ok(())
    }

    /// Read a parameter back by name.
    pub fn get_param(&self, name: &str) -> Result<Option<&str>> {
        let parameter = self.param_for_known(name)?;
        self.check_settable(&parameter)?;
        let value = match parameter.location {
            ParameterLocation::Path => self.path_params.get(name),
            ParameterLocation::Query => self.query_params.as_ref().and_then(|q| q.get(name)),
            _ => self
                .headers
                .iter()
                .find(|(n, _)| n.eq_ignore_ascii_case(name))
                .map(|(_, v)| v),
        };
        Ok(value.map(String::as_str))
    }

    /// The explicit base URL, else the operation's configured one, else the
    /// one computed from the document for this request's server selection.
    pub fn base_url(&self) -> Result<Option<String>> {
        match &self.base_url {
            Some(base_url) => Ok(Some(base_url.clone())),
            None => self.operation.base_url(&self.selection),
        }
    }

    /// The expanded path template plus the query string, if any.
    pub fn path(&self) -> Result<String> {
        let template = self.operation.path_template();
        let variables = template::variables(template);
        let missing: Vec<String> = variables
            .iter()
            .filter(|v| !self.path_params.contains_key(*v))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(ConfigError::MissingPathParams {
                template: template.to_string(),
                operation: self.operation.human_id(),
                missing,
            }
            .into());
        }
        let empty: Vec<String> = variables
            .iter()
            .filter(|v| self.path_params.get(*v).is_some_and(String::is_empty))
            .cloned()
            .collect();
        if !empty.is_empty() {
            return Err(ConfigError::EmptyPathParams {
                template: template.to_string(),
                operation: self.operation.human_id(),
                empty,
            }
            .into());
        }

        let mut path = template::expand(template, &self.path_params);
        if let Some(query) = &self.query_params {
            let query = url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(query)
                .finish();
            path.push('?');
            path.push_str(&query);
        }
        Ok(path)
    }

    pub fn url(&self) -> Result<String> {
        let base_url = self
            .base_url()?
            .ok_or_else(|| ConfigError::NoBaseUrl(self.operation.human_id()))?;
        Ok(template::join(&base_url, &self.path()?))
    }

    /// A configured `Content-Type` (or `content_type`) header.
    pub fn content_type_header(&self) -> Option<ContentType> {
        self.headers
            .iter()
            .find(|(name, _)| {
                name.eq_ignore_ascii_case("content-type") || name.eq_ignore_ascii_case("content_type")
            })
            .map(|(_, value)| ContentType::parse(value))
    }

    /// The request media type: explicit, else from a configured
    /// `Content-Type` header, else negotiated for the operation.
    pub fn media_type(&self) -> Result<Option<String>> {
        if let Some(media_type) = &self.media_type {
            return Ok(Some(media_type.clone()));
        }
        if let Some(content_type) = self.content_type_header() {
            return Ok(Some(content_type.essence().to_string()));
        }
        self.operation.request_media_type()
    }

    pub fn content_type(&self) -> Result<Option<ContentType>> {
        if let Some(header) = self.content_type_header() {
            return Ok(Some(header));
        }
        Ok(self.media_type()?.as_deref().map(ContentType::parse))
    }

    pub fn request_schema(&self) -> Result<Option<Node>> {
        self.operation.request_schema(self.media_type()?.as_deref())
    }

    /// The serialized body.
    pub fn body(&self) -> Result<Option<String>> {
        let Some(body) = &self.body else {
            return Ok(None);
        };
        let content_type = self.content_type()?;
        let schemas = self.operation.document().schemas();
        Ok(Some(body::serialize(
            body,
            content_type.as_ref(),
            schemas.as_ref(),
            &self.operation.human_id(),
        )?))
    }

    /// The HTTP request to send. `User-Agent` and a defaulted `Content-Type`
    /// go first; configured headers override them.
    pub fn http_request(&self) -> Result<HttpRequest> {
        let method = self.operation.http_method();
        let mut headers: Vec<(String, String)> =
            vec![("User-Agent".to_string(), self.user_agent.clone())];
        if self.content_type_header().is_none() {
            if let Some(media_type) = self.media_type()? {
                headers.push(("Content-Type".to_string(), media_type));
            } else if method.has_body() {
                headers.push(("Content-Type".to_string(), FALLBACK_CONTENT_TYPE.to_string()));
            }
        }
        for (name, value) in &self.headers {
            match headers.iter_mut().find(|(n, _)| n.eq_ignore_ascii_case(name)) {
                Some(existing) => *existing = (name.clone(), value.clone()),
                None => headers.push((name.clone(), value.clone())),
            }
        }
        Ok(HttpRequest {
            method,
            url: self.url()?,
            headers,
            body: self.body()?,
        })
    }

    /// Send the request, capturing the exchange whatever its status.
    pub fn run_exchange(&self) -> Result<Exchange> {
        let document = self.operation.document();
        let human_id = self.operation.human_id();
        let connection = document
            .connection()
            .ok_or_else(|| ConfigError::NoTransport(human_id.clone()))?;
        let request = self.http_request()?;
        log::debug!("{human_id}: {} {}", request.method, request.url);
        let (sent, response) = connection.run(request)?;
        log::debug!("{human_id}: {} {} -> {}", sent.method, sent.url, response.status);

        let media_type = response.content_type().map(|ct| ct.essence().to_string());
        let response_schema = self
            .operation
            .response_schema(response.status, media_type.as_deref())?;
        Ok(Exchange::new(
            human_id,
            sent,
            response,
            response_schema,
            document.schemas().clone(),
        ))
    }

    /// Send the request, fail on an HTTP error status, and materialize the
    /// response body.
    pub fn run(&self) -> Result<BodyObject> {
        self.run_exchange()?.raise_on_http_error()?.body_object(false)
    }

    /// Like [`Request::run`], but the materialized instance accepts writes.
    pub fn run_mutable(&self) -> Result<BodyObject> {
        self.run_exchange()?.raise_on_http_error()?.body_object(true)
    }

    /// The fully layered configuration of this request. Named parameters are
    /// already routed, so `params` is empty.
    pub fn to_config(&self) -> RequestConfig {
        RequestConfig {
            path_params: self.path_params.clone(),
            query_params: self.query_params.clone(),
            headers: Some(self.headers.clone()),
            body: self.body.clone(),
            base_url: self.base_url.clone(),
            media_type: self.media_type.clone(),
            scheme: self.selection.scheme.clone(),
            server: self.selection.server,
            server_variables: Some(self.selection.server_variables.clone()),
            user_agent: Some(self.user_agent.clone()),
            params: IndexMap::new(),
        }
    }
}
