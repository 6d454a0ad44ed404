//! The seam between request building and the network.

use std::cell::RefCell;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use crate::error::TransportError;
use crate::exchange::{HttpRequest, HttpResponse};

/// Sends one request and returns its response. Closures of the right shape
/// are transports.
pub trait Transport: Send + Sync {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

impl<F> Transport for F
where
    F: Fn(&HttpRequest) -> Result<HttpResponse, TransportError> + Send + Sync,
{
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self(request)
    }
}

/// Pins a closure's signature so it can be passed where a [`Transport`] is
/// expected without annotating its argument and return types.
pub fn from_fn<F>(f: F) -> F
where
    F: Fn(&HttpRequest) -> Result<HttpResponse, TransportError> + Send + Sync,
{
    f
}

/// Observes or rewrites a request on its way out and the response on its way
/// back. Call `next.run(request)` to continue down the chain.
pub trait Middleware: Send + Sync {
    fn handle(&self, request: HttpRequest, next: Next<'_>) -> Result<HttpResponse, TransportError>;
}

/// The rest of a middleware chain.
pub struct Next<'a> {
    transport: &'a dyn Transport,
    middleware: &'a [Arc<dyn Middleware>],
    sent: &'a RefCell<Option<HttpRequest>>,
}

impl Next<'_> {
    pub fn run(self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        match self.middleware.split_first() {
            Some((first, rest)) => first.handle(
                request,
                Next {
                    transport: self.transport,
                    middleware: rest,
                    sent: self.sent,
                },
            ),
            None => {
                let response = self.transport.send(&request);
                *self.sent.borrow_mut() = Some(request);
                response
            }
        }
    }
}

/// A transport with its middleware chain. Running a request through it
/// captures the request as it finally went out.
#[derive(Clone)]
pub struct Connection {
    transport: Arc<dyn Transport>,
    middleware: Vec<Arc<dyn Middleware>>,
}

impl Connection {
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self::from_arc(Arc::new(transport))
    }

    pub fn from_arc(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            middleware: Vec::new(),
        }
    }

    /// Append a middleware. The first one added sees the request first.
    pub fn with(self, middleware: impl Middleware + 'static) -> Self {
        self.with_arc(Arc::new(middleware))
    }

    pub fn with_arc(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.middleware.push(middleware);
        self
    }

    /// Run a request, returning the request as sent and the response.
    pub fn run(&self, request: HttpRequest) -> Result<(HttpRequest, HttpResponse), TransportError> {
        let sent = RefCell::new(None);
        let original = request.clone();
        let response = Next {
            transport: self.transport.as_ref(),
            middleware: &self.middleware,
            sent: &sent,
        }
        .run(request)?;
        // a middleware that answers without calling `next` sent nothing new
        let sent = sent.into_inner().unwrap_or(original);
        Ok((sent, response))
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("middleware", &self.middleware.len())
            .finish_non_exhaustive()
    }
}

/// Logs each round trip at debug level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingMiddleware;

impl Middleware for LoggingMiddleware {
    fn handle(&self, request: HttpRequest, next: Next<'_>) -> Result<HttpResponse, TransportError> {
        let method = request.method;
        let url = request.url.clone();
        log::debug!("--> {method} {url}");
        let started = Instant::now();
        let result = next.run(request);
        match &result {
            Ok(response) => log::debug!(
                "<-- {} {method} {url} ({} bytes, {:?})",
                response.status,
                response.body.len(),
                started.elapsed()
            ),
            Err(e) => log::debug!("<-- {method} {url} failed: {e}"),
        }
        result
    }
}
