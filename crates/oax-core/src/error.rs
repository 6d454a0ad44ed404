use std::path::PathBuf;

use thiserror::Error;

use crate::http_error::HttpError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Any failure surfaced by this crate.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Http(#[from] Box<HttpError>),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Pagination(#[from] PaginationError),

    #[error(transparent)]
    Response(#[from] ResponseError),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

impl Error {
    /// The HTTP error, if this is one.
    pub fn as_http(&self) -> Option<&HttpError> {
        match self {
            Error::Http(e) => Some(e),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported OpenAPI version: {0}")]
    UnsupportedVersion(String),

    #[error("instance does not look like a recognized openapi document: {0}")]
    Unrecognized(String),

    #[error("invalid document URI {uri}: {source}")]
    InvalidUri {
        uri: String,
        #[source]
        source: url::ParseError,
    },

    #[error("a document must have a URI to be registered")]
    MissingUri,

    #[error("malformed {what} at {pointer}: {source}")]
    Malformed {
        what: &'static str,
        pointer: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("multiple body parameters on operation {0}")]
    MultipleBodyParameters(String),
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("no document is registered for {uri} (referenced by {reference})")]
    UnregisteredDocument { uri: String, reference: String },

    #[error("reference target not found: {reference}")]
    RefTargetNotFound { reference: String },

    #[error("invalid reference format: {0}")]
    InvalidRefFormat(String),

    #[error("circular reference detected: {}", .chain.join(" -> "))]
    CircularRef { chain: Vec<String> },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(
        "path {template} for operation {operation} requires path_params which were missing: {missing:?}"
    )]
    MissingPathParams {
        template: String,
        operation: String,
        missing: Vec<String>,
    },

    #[error(
        "path {template} for operation {operation} requires path_params which were empty: {empty:?}"
    )]
    EmptyPathParams {
        template: String,
        operation: String,
        empty: Vec<String>,
    },

    #[error("There are multiple parameters for {name} on operation {operation}, located in: {locations:?}")]
    AmbiguousParameter {
        name: String,
        operation: String,
        locations: Vec<String>,
    },

    #[error("There is no parameter named {name} on operation {operation}")]
    UnknownParameter { name: String, operation: String },

    #[error("cookie parameters are not supported: {name} on operation {operation}")]
    CookieParameter { name: String, operation: String },

    #[error("cannot set parameter {name} located in {location} on operation {operation}")]
    UnsupportedParameterLocation {
        name: String,
        location: String,
        operation: String,
    },

    #[error(
        "cannot generate the request body with content type {media_type} for operation {operation}; supported media types: {supported}"
    )]
    UnsupportedMediaType {
        media_type: String,
        operation: String,
        supported: String,
    },

    #[error("form request body for operation {operation} must be a flat object, got: {body}")]
    InvalidFormBody { operation: String, body: String },

    #[error("no base_url has been specified for operation {0}")]
    NoBaseUrl(String),

    #[error("operationId not found: {0:?}")]
    UnknownOperation(String),

    #[error("server {index} was selected but the document declares {count} server(s)")]
    ServerOutOfRange { index: usize, count: usize },

    #[error("no transport has been configured to run operation {0}")]
    NoTransport(String),

    #[error("invalid URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml_ng::Error,
    },
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    Request(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("failed to read response body: {0}")]
    ResponseRead(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

#[derive(Debug, Error)]
pub enum PaginationError {
    #[error("response of operation {operation} included multiple links with rel=next: {links:?}")]
    MultipleNextLinks {
        operation: String,
        links: Vec<String>,
    },

    #[error("the URI of the link to the next page ({url}) did not match the URI of operation {operation}")]
    LinkMismatch { url: String, operation: String },

    #[error("invalid next link {url}: {source}")]
    InvalidLink {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

#[derive(Debug, Error)]
pub enum ResponseError {
    #[error("failed to parse response body as JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("cannot modify an immutable instance (setting {0:?})")]
    Immutable(String),

    #[error("cannot set {key:?} on a non-object instance")]
    NotAnObject { key: String },
}
