// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Network transport behind the relay.
//!
//! [`Network`] is the only seam through which the relay touches the wire.
//! Production uses [`HttpNetwork`] (reqwest); tests plug in scripted stubs.
//!
//! A returned `Ok` means *some* response arrived, whatever its status.
//! `Err` means no response at all: DNS failure, refused connection, timeout.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::request::{InterceptedRequest, ResponseSnapshot, ResponseSource};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    #[error("network request failed: {0}")]
    Transport(String),
    #[error("network request timed out")]
    Timeout,
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl From<reqwest::Error> for NetworkError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            NetworkError::Timeout
        } else if err.is_builder() {
            NetworkError::InvalidRequest(err.to_string())
        } else {
            NetworkError::Transport(err.to_string())
        }
    }
}

#[async_trait]
pub trait Network: Send + Sync {
    async fn fetch(&self, request: &InterceptedRequest) -> Result<ResponseSnapshot, NetworkError>;
}

/// reqwest-backed transport.
#[derive(Clone)]
pub struct HttpNetwork {
    client: reqwest::Client,
}

impl HttpNetwork {
    pub fn new(timeout: Duration) -> Result<Self, NetworkError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// Wrap a preconfigured client (proxies, custom TLS roots, ...).
    #[must_use]
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, request: &InterceptedRequest) -> Result<ResponseSnapshot, NetworkError> {
        let method = reqwest::Method::from_bytes(request.method.as_bytes())
            .map_err(|e| NetworkError::InvalidRequest(e.to_string()))?;

        let mut builder = self.client.request(method, request.url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await?;
        let status = response.status();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.bytes().await?;

        debug!(url = %request.url, status = status.as_u16(), bytes = body.len(), "Network fetch complete");

        Ok(ResponseSnapshot {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body,
            source: ResponseSource::Network,
        })
    }
}
