//! `Link` headers (RFC 8288) and following `rel="next"` through pages.

use indexmap::IndexMap;
use url::Url;

use crate::document::OperationRef;
use crate::error::{ConfigError, Error, PaginationError, Result};
use crate::exchange::Exchange;
use crate::request::{Request, RequestConfig, template};

/// One link-value of a `Link` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    /// The URI reference between `<` and `>`, unresolved.
    pub target: String,
    pub rels: Vec<String>,
    /// Other parameters, in order.
    pub params: Vec<(String, String)>,
}

impl Link {
    pub fn has_rel(&self, rel: &str) -> bool {
        self.rels.iter().any(|r| r.eq_ignore_ascii_case(rel))
    }

    /// The target resolved against the URL of the request that got it.
    pub fn absolute_target(&self, base: &Url) -> std::result::Result<Url, url::ParseError> {
        base.join(&self.target)
    }
}

/// Split on `sep` where it is outside `<...>` and quoted strings.
fn split_outside(value: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut in_angle = false;
    let mut in_quote = false;
    let mut escaped = false;
    for (i, c) in value.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_quote => escaped = true,
            '"' if !in_angle => in_quote = !in_quote,
            '<' if !in_quote => in_angle = true,
            '>' if !in_quote => in_angle = false,
            c if c == sep && !in_angle && !in_quote => {
                parts.push(&value[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&value[start..]);
    parts
}

fn unquote(value: &str) -> String {
    let value = value.trim();
    match value.strip_prefix('"').and_then(|v| v.strip_suffix('"')) {
        Some(inner) => inner.replace("\\\"", "\"").replace("\\\\", "\\"),
        None => value.to_string(),
    }
}

/// Parse one `Link` header value. Malformed link-values are skipped.
pub fn parse_link_header(value: &str) -> Vec<Link> {
    let mut links = Vec::new();
    for link_value in split_outside(value, ',') {
        let mut segments = split_outside(link_value, ';').into_iter();
        let Some(target) = segments.next().map(str::trim) else {
            continue;
        };
        let Some(target) = target.strip_prefix('<').and_then(|t| t.strip_suffix('>')) else {
            continue;
        };
        let mut rels = Vec::new();
        let mut params = Vec::new();
        for segment in segments {
            let (name, value) = match segment.split_once('=') {
                Some((name, value)) => (name.trim().to_ascii_lowercase(), unquote(value)),
                None => (segment.trim().to_ascii_lowercase(), String::new()),
            };
            if name == "rel" && rels.is_empty() {
                rels = value.split_whitespace().map(str::to_string).collect();
            } else if !name.is_empty() {
                params.push((name, value));
            }
        }
        links.push(Link {
            target: target.trim().to_string(),
            rels,
            params,
        });
    }
    links
}

enum Cursor {
    Start,
    Next(RequestConfig),
    Failed(Error),
    Done,
}

/// Pages of an operation, lazily fetched by following `rel="next"` links.
///
/// The first page is the operation run with the given configuration. Each
/// following page re-runs the operation with the path and query parameters
/// of the single `next` link and the first request's configuration otherwise.
pub struct Pages<'a> {
    operation: OperationRef<'a>,
    initial: Option<RequestConfig>,
    template: Option<RequestConfig>,
    cursor: Cursor,
    raise_on_http_error: bool,
}

impl<'a> Pages<'a> {
    pub(crate) fn new(operation: OperationRef<'a>, config: RequestConfig) -> Self {
        Self {
            operation,
            initial: Some(config),
            template: None,
            cursor: Cursor::Start,
            raise_on_http_error: true,
        }
    }

    /// Whether a page with an error status ends iteration with an error.
    /// Defaults to true.
    pub fn raise_on_http_error(mut self, raise: bool) -> Self {
        self.raise_on_http_error = raise;
        self
    }

    fn fetch(&mut self, config: RequestConfig) -> Result<(Request<'a>, Exchange)> {
        let request = self.operation.build_request(config)?;
        if self.template.is_none() {
            self.template = Some(request.to_config());
        }
        let exchange = request.run_exchange()?;
        let exchange = if self.raise_on_http_error {
            exchange.raise_on_http_error()?
        } else {
            exchange
        };
        Ok((request, exchange))
    }

    /// The configuration of the page after `exchange`, if it links to one.
    fn next_config(&self, request: &Request<'a>, exchange: &Exchange) -> Result<Option<RequestConfig>> {
        let mut next: Vec<_> = exchange
            .response()
            .links()
            .into_iter()
            .filter(|link| link.has_rel("next"))
            .collect();
        let link = match next.len() {
            0 => return Ok(None),
            1 => next.remove(0),
            _ => {
                return Err(PaginationError::MultipleNextLinks {
                    operation: exchange.operation().to_string(),
                    links: next.into_iter().map(|l| l.target).collect(),
                }
                .into());
            }
        };

        let request_url = Url::parse(&exchange.request().url).map_err(|source| {
            PaginationError::InvalidLink {
                url: exchange.request().url.clone(),
                source,
            }
        })?;
        let target = link
            .absolute_target(&request_url)
            .map_err(|source| PaginationError::InvalidLink {
                url: link.target.clone(),
                source,
            })?;
        let base_url = request
            .base_url()?
            .ok_or_else(|| ConfigError::NoBaseUrl(exchange.operation().to_string()))?;
        let path_params = template::extract_url(&base_url, self.operation.path_template(), &target)
            .ok_or_else(|| PaginationError::LinkMismatch {
                url: target.to_string(),
                operation: exchange.operation().to_string(),
            })?;
        // Query parameters are single valued: a repeated key keeps its first
        // position and its last value.
        let query_params = target.query().map(|_| {
            let mut params = IndexMap::new();
            for (key, value) in target.query_pairs().into_owned() {
                if let Some(previous) = params.insert(key.clone(), value) {
                    log::debug!("next link repeats query key {key}; dropping {previous}");
                }
            }
            params
        });

        log::debug!("{}: following next link {target}", exchange.operation());
        let mut config = self.template.clone().unwrap_or_default();
        config.path_params = path_params;
        config.query_params = query_params;
        config.base_url = Some(base_url);
        Ok(Some(config))
    }
}

impl Iterator for Pages<'_> {
    type Item = Result<Exchange>;

    fn next(&mut self) -> Option<Self::Item> {
        let config = match std::mem::replace(&mut self.cursor, Cursor::Done) {
            Cursor::Start => self.initial.take().unwrap_or_default(),
            Cursor::Next(config) => config,
            Cursor::Failed(err) => return Some(Err(err)),
            Cursor::Done => return None,
        };
        let (request, exchange) = match self.fetch(config) {
            Ok(page) => page,
            Err(err) => return Some(Err(err)),
        };
        self.cursor = match self.next_config(&request, &exchange) {
            Ok(Some(config)) => Cursor::Next(config),
            Ok(None) => Cursor::Done,
            Err(err) => Cursor::Failed(err),
        };
        Some(Ok(exchange))
    }
}
