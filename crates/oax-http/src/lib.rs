//! A blocking [`Transport`] for `oax-core` backed by `reqwest`.

use std::time::Duration;

use oax_core::error::TransportError;
use oax_core::{ClientConfig, Connection, HttpRequest, HttpResponse, LoggingMiddleware, Transport};
use reqwest::Method;
use reqwest::blocking::Client;

/// Sends requests with a shared `reqwest` blocking client.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a client honouring `timeout_secs` from the client configuration.
    pub fn from_config(config: &ClientConfig) -> Result<Self, TransportError> {
        let mut builder = Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| TransportError::Request(Box::new(e)))?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl Transport for ReqwestTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let method = Method::from_bytes(request.method.as_str().as_bytes())
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;
        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder
            .send()
            .map_err(|e| TransportError::Request(Box::new(e)))?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| match value.to_str() {
                Ok(value) => Some((name.as_str().to_string(), value.to_string())),
                Err(_) => {
                    log::warn!("dropping non-text response header {name}");
                    None
                }
            })
            .collect();
        let body = response
            .text()
            .map_err(|e| TransportError::ResponseRead(Box::new(e)))?;
        Ok(HttpResponse::new(status, headers, body))
    }
}

/// A connection over [`ReqwestTransport`] that logs each round trip.
pub fn connection(config: &ClientConfig) -> Result<Connection, TransportError> {
    Ok(Connection::new(ReqwestTransport::from_config(config)?).with(LoggingMiddleware))
}
