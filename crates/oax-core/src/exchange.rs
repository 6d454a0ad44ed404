use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::http_error::{HttpError, HttpErrorKind};
use crate::pagination::{Link, parse_link_header};
use crate::parse::media_type::ContentType;
use crate::reference::Node;
use crate::schema::SchemaComponent;

/// HTTP method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Options,
    Head,
    Trace,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Head => "HEAD",
            HttpMethod::Trace => "TRACE",
        }
    }

    /// Methods that get a fallback `Content-Type` when none was negotiated.
    pub fn has_body(&self) -> bool {
        matches!(
            self,
            HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch | HttpMethod::Options
        )
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "get" => Ok(HttpMethod::Get),
            "post" => Ok(HttpMethod::Post),
            "put" => Ok(HttpMethod::Put),
            "delete" => Ok(HttpMethod::Delete),
            "patch" => Ok(HttpMethod::Patch),
            "options" => Ok(HttpMethod::Options),
            "head" => Ok(HttpMethod::Head),
            "trace" => Ok(HttpMethod::Trace),
            _ => Err(format!("unknown HTTP method: {s}")),
        }
    }
}

fn find_header<'h>(headers: &'h [(String, String)], name: &str) -> Option<&'h str> {
    headers
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// A request as handed to a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    /// First header with this name, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// A response as returned by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, headers: Vec<(String, String)>, body: impl Into<String>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Every value of a repeated header.
    pub fn header_values<'s>(&'s self, name: &'s str) -> impl Iterator<Item = &'s str> + 's {
        self.headers
            .iter()
            .filter(move |(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<ContentType> {
        self.header("Content-Type").map(ContentType::parse)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Links from every `Link` header, in order.
    pub fn links(&self) -> Vec<Link> {
        self.header_values("Link")
            .flat_map(parse_link_header)
            .collect()
    }
}

/// A request that was sent and the response it got, labeled with the
/// operation that produced it.
#[derive(Debug, Clone)]
pub struct Exchange {
    operation: String,
    request: HttpRequest,
    response: HttpResponse,
    response_schema: Option<Node>,
    schemas: Arc<dyn SchemaComponent>,
}

impl Exchange {
    pub fn new(
        operation: impl Into<String>,
        request: HttpRequest,
        response: HttpResponse,
        response_schema: Option<Node>,
        schemas: Arc<dyn SchemaComponent>,
    ) -> Self {
        Self {
            operation: operation.into(),
            request,
            response,
            response_schema,
            schemas,
        }
    }

    /// The human id of the operation.
    pub fn operation(&self) -> &str {
        &self.operation
    }

    pub fn request(&self) -> &HttpRequest {
        &self.request
    }

    pub fn response(&self) -> &HttpResponse {
        &self.response
    }

    pub fn response_schema(&self) -> Option<&Node> {
        self.response_schema.as_ref()
    }

    pub fn schemas(&self) -> &Arc<dyn SchemaComponent> {
        &self.schemas
    }

    /// Fail with the matching [`HttpError`] unless the status is 2xx.
    pub fn raise_on_http_error(self) -> Result<Self> {
        match HttpErrorKind::from_status(self.response.status) {
            None => Ok(self),
            Some(kind) => {
                log::debug!(
                    "{} {} failed with {}",
                    self.request.method,
                    self.request.url,
                    self.response.status
                );
                Err(Error::Http(Box::new(HttpError::new(kind, self))))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::StructuralSchemas;

    fn exchange(status: u16) -> Exchange {
        Exchange::new(
            "getPet",
            HttpRequest {
                method: HttpMethod::Get,
                url: "https://pets.example.com/pets/1".to_string(),
                headers: Vec::new(),
                body: None,
            },
            HttpResponse::new(status, Vec::new(), "{\"error\": \"nope\"}")
                .with_header("Content-Type", "application/json"),
            None,
            Arc::new(StructuralSchemas),
        )
    }

    #[test]
    fn test_http_method_parse() {
        assert_eq!("get".parse::<HttpMethod>().unwrap(), HttpMethod::Get);
        assert_eq!("PATCH".parse::<HttpMethod>().unwrap(), HttpMethod::Patch);
        assert!("connect".parse::<HttpMethod>().is_err());
        assert!(HttpMethod::Options.has_body());
        assert!(!HttpMethod::Delete.has_body());
    }

    #[test]
    fn test_response_headers() {
        let response = HttpResponse::new(200, Vec::new(), "")
            .with_header("content-type", "Application/JSON; charset=utf-8")
            .with_header("Link", "<https://a/?page=2>; rel=\"next\"")
            .with_header("link", "<https://a/?page=9>; rel=\"last\"");
        assert!(response.is_success());
        assert_eq!(response.content_type().unwrap().essence(), "application/json");
        let links = response.links();
        assert_eq!(links.len(), 2);
        assert!(links[0].has_rel("next"));
        assert!(links[1].has_rel("last"));
    }

    #[test]
    fn test_raise_on_http_error() {
        assert!(exchange(200).raise_on_http_error().is_ok());
        assert!(exchange(204).raise_on_http_error().is_ok());

        let err = exchange(404).raise_on_http_error().unwrap_err();
        let http = err.as_http().unwrap();
        assert_eq!(http.kind(), HttpErrorKind::NotFound404);
        assert!(http.kind().is_client_error());
        assert_eq!(http.exchange().response().status, 404);
        assert_eq!(
            err.to_string(),
            "Error calling operation getPet:\n{\"error\": \"nope\"}"
        );
    }
}
