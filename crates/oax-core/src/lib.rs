//! Run OpenAPI v2/v3 operations straight from their description document.
//!
//! A [`Document`] wraps a parsed description document and exposes its
//! operations. Each [`OperationRef`] builds a [`Request`] from a
//! [`RequestConfig`], runs it through an injected [`Transport`] and captures
//! an [`Exchange`], whose body is materialized against the operation's
//! response schema.
//!
//! ```no_run
//! use oax_core::{Document, HttpResponse, RequestConfig};
//!
//! let yaml = r#"
//! openapi: 3.0.0
//! info: {title: Pets, version: "1"}
//! servers: [{url: "https://pets.example.com"}]
//! paths:
//!   /pets/{id}:
//!     get:
//!       operationId: getPet
//!       responses:
//!         "200": {description: ok}
//! "#;
//! let document = Document::builder(oax_core::parse::from_yaml(yaml).unwrap())
//!     .transport(oax_core::transport::from_fn(|_req| {
//!         Ok(HttpResponse::new(200, Vec::new(), "{}"))
//!     }))
//!     .build()
//!     .unwrap();
//! let pet = document
//!     .call("getPet", RequestConfig::new().path_param("id", "42"))
//!     .unwrap();
//! ```

pub mod config;
pub mod document;
pub mod error;
pub mod exchange;
pub mod http_error;
pub mod pagination;
pub mod parse;
pub mod reference;
pub mod request;
pub mod response;
pub mod schema;
pub mod transport;

pub use config::{ClientConfig, OperationDefaults};
pub use document::{
    Document, DocumentBuilder, Operation, OperationRef, ServerSelection, Tag, Version,
};
pub use error::{Error, Result};
pub use exchange::{Exchange, HttpMethod, HttpRequest, HttpResponse};
pub use http_error::{HttpError, HttpErrorKind, StatusClass};
pub use pagination::{Link, Pages};
pub use reference::{DocumentRegistry, Node};
pub use request::{Body, Request, RequestConfig};
pub use response::BodyObject;
pub use schema::{Instance, SchemaComponent, StructuralSchemas};
pub use transport::{Connection, LoggingMiddleware, Middleware, Next, Transport};
