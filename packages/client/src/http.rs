//! The reqwest-backed [`HttpClient`].

use std::io::Cursor;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use eth2api::{ApiError, Client, Codec, JsonCodec, ReqMethod, RequestDescriptor, ResponseHandle};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::Serialize;

/// A [`Client`] that talks HTTP to a beacon node.
///
/// Cloning is cheap; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct HttpClient<C = JsonCodec> {
    addr: String,
    cli: reqwest::Client,
    codec: C,
    timeout: Option<Duration>,
}

impl HttpClient<JsonCodec> {
    /// Client for the node at `addr`, e.g. `http://localhost:5052`.
    pub fn new(addr: impl Into<String>) -> Self {
        let addr: String = addr.into();
        Self {
            addr: addr.trim_end_matches('/').to_string(),
            cli: reqwest::Client::new(),
            codec: JsonCodec,
            timeout: None,
        }
    }
}

impl<C: Codec> HttpClient<C> {
    pub fn with_codec<D: Codec>(self, codec: D) -> HttpClient<D> {
        HttpClient {
            addr: self.addr,
            cli: self.cli,
            codec,
            timeout: self.timeout,
        }
    }

    /// Use a preconfigured `reqwest` client (proxies, TLS roots, pools).
    pub fn with_client(mut self, cli: reqwest::Client) -> Self {
        self.cli = cli;
        self
    }

    /// Bound every request, including reading the body, by `timeout`.
    ///
    /// Applied per request, so it holds for a client given through
    /// [`with_client`](Self::with_client) before or after this call.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    async fn dispatch<B: Serialize>(&self, req: &RequestDescriptor<B>) -> Result<(u16, Bytes), ApiError> {
        let url = req.url(&self.addr)?;
        let method = req.method();
        tracing::debug!(%method, %url, "dispatching request");

        let builder = match method {
            ReqMethod::Get => self.cli.get(&url),
            ReqMethod::Post => {
                let mut buf = Vec::new();
                if let Some(body) = req.body() {
                    self.codec.encode_request_body(&mut buf, body)?;
                }
                self.cli
                    .post(&url)
                    .header(CONTENT_TYPE, self.codec.content_type())
                    .body(buf)
            }
        };

        let mut builder = builder.header(ACCEPT, self.codec.content_type());
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        let resp = builder
            .send()
            .await
            .map_err(|e| ApiError::ClientUsage(format!("failed to execute {method} request: {e}")))?;
        let code = resp.status().as_u16();
        let body = resp
            .bytes()
            .await
            .map_err(|e| ApiError::ClientUsage(format!("failed to read {method} response: {e}")))?;
        tracing::debug!(code, len = body.len(), "received response");
        Ok((code, body))
    }
}

#[async_trait]
impl<C: Codec> Client for HttpClient<C> {
    type Codec = C;

    async fn request<B>(&self, req: RequestDescriptor<B>) -> ResponseHandle<C>
    where
        B: Serialize + Send + Sync,
    {
        match self.dispatch(&req).await {
            Ok((code, body)) => ResponseHandle::received(self.codec.clone(), code, Cursor::new(body)),
            Err(err) => {
                tracing::debug!(error = %err, "request failed before a response arrived");
                ResponseHandle::failed(self.codec.clone(), err)
            }
        }
    }
}
