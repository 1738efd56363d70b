//! Server-side route abstraction.
//!
//! Handlers are plain async functions from an [`IncomingRequest`] to a
//! [`PreparedResponse`]. A [`Server`] implementation owns the actual
//! routing table and the HTTP plumbing.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::future::Future;
use std::io::{self, Read};
use std::pin::Pin;
use std::sync::Arc;

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::codec::Codec;
use crate::envelope::Envelope;
use crate::error::{ApiError, ErrorMessage, IndexedErrorItem, IndexedErrorMessage};
use crate::request::ReqMethod;

pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

pub type HandlerFn<C> =
    Arc<dyn Fn(IncomingRequest<C>) -> BoxFuture<PreparedResponse<C>> + Send + Sync>;

/// Anything that can register routes. Routes are added at startup only.
pub trait Server<C: Codec> {
    fn add_route(&mut self, route: Route<C>);
}

// ---------------------------------------------------------------------------
// Route
// ---------------------------------------------------------------------------

/// A method, a path pattern with `:name` placeholders, and a handler.
pub struct Route<C> {
    method: ReqMethod,
    pattern: String,
    handler: HandlerFn<C>,
}

impl<C: Codec> Route<C> {
    pub fn new<F, Fut>(method: ReqMethod, pattern: impl Into<String>, handler: F) -> Self
    where
        F: Fn(IncomingRequest<C>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = PreparedResponse<C>> + Send + 'static,
    {
        let handler: HandlerFn<C> =
            Arc::new(move |req| -> BoxFuture<PreparedResponse<C>> { Box::pin(handler(req)) });
        Self {
            method,
            pattern: pattern.into(),
            handler,
        }
    }

    pub fn method(&self) -> ReqMethod {
        self.method
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn handler(&self) -> HandlerFn<C> {
        Arc::clone(&self.handler)
    }

    pub fn handle(&self, req: IncomingRequest<C>) -> BoxFuture<PreparedResponse<C>> {
        (self.handler)(req)
    }
}

impl<C> Clone for Route<C> {
    fn clone(&self) -> Self {
        Self {
            method: self.method,
            pattern: self.pattern.clone(),
            handler: Arc::clone(&self.handler),
        }
    }
}

impl<C> fmt::Debug for Route<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("pattern", &self.pattern)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// IncomingRequest
// ---------------------------------------------------------------------------

/// A request as seen by a handler.
pub struct IncomingRequest<C> {
    params: HashMap<String, String>,
    query: HashMap<String, Vec<String>>,
    body: Option<Box<dyn Read + Send + Sync>>,
    codec: C,
}

impl<C: Codec> IncomingRequest<C> {
    /// An empty request: no params, no query, and an empty body.
    pub fn new(codec: C) -> Self {
        Self {
            params: HashMap::new(),
            query: HashMap::new(),
            body: Some(Box::new(io::empty())),
            codec,
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Append a query value. Repeated keys accumulate.
    pub fn with_query_value(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.entry(name.into()).or_default().push(value.into());
        self
    }

    pub fn with_body<R: Read + Send + Sync + 'static>(mut self, body: R) -> Self {
        self.body = Some(Box::new(body));
        self
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub fn required_param(&self, name: &str) -> Result<&str, ApiError> {
        self.param(name)
            .ok_or_else(|| ApiError::MissingParam(name.to_string()))
    }

    /// Every value given for `name`, in arrival order.
    pub fn query(&self, name: &str) -> Option<&[String]> {
        self.query.get(name).map(Vec::as_slice)
    }

    pub fn query_first(&self, name: &str) -> Option<&str> {
        self.query(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// All values for `name`, with comma-joined values split apart.
    pub fn query_list(&self, name: &str) -> Vec<&str> {
        self.query(name)
            .unwrap_or_default()
            .iter()
            .flat_map(|v| v.split(','))
            .filter(|v| !v.is_empty())
            .collect()
    }

    /// Decode the body. The body can be decoded once; later calls fail with
    /// [`ApiError::BodyConsumed`].
    pub fn decode_body<T: DeserializeOwned>(&mut self) -> Result<T, ApiError> {
        let body = self.body.take().ok_or(ApiError::BodyConsumed)?;
        self.codec.decode_request_body(body)
    }
}

impl<C> fmt::Debug for IncomingRequest<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IncomingRequest")
            .field("params", &self.params)
            .field("query", &self.query)
            .field("body_consumed", &self.body.is_none())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// PreparedResponse
// ---------------------------------------------------------------------------

/// A response body that can be written with codec `C`.
pub trait EncodeBody<C>: Send {
    fn encode_body(&self, codec: &C, sink: &mut Vec<u8>) -> Result<(), ApiError>;
}

impl<C: Codec, T: Serialize + Send> EncodeBody<C> for T {
    fn encode_body(&self, codec: &C, sink: &mut Vec<u8>) -> Result<(), ApiError> {
        codec.encode_response_body(sink, self)
    }
}

/// Body of the message-only success responses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusMessage {
    pub message: String,
}

/// What a handler hands back: status code, optional body, extra headers.
pub struct PreparedResponse<C> {
    code: u16,
    body: Option<Box<dyn EncodeBody<C>>>,
    headers: BTreeMap<String, String>,
}

impl<C: Codec> PreparedResponse<C> {
    /// A bodiless response with the given status.
    pub fn with_code(code: u16) -> Self {
        Self {
            code,
            body: None,
            headers: BTreeMap::new(),
        }
    }

    pub fn with_body<T: Serialize + Send + 'static>(mut self, body: T) -> Self {
        self.body = Some(Box::new(body));
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// 200 with `data` as the body, unchanged. Callers wrap it in an
    /// [`Envelope`] unless the endpoint defines its own outer shape.
    pub fn ok<T: Serialize + Send + 'static>(data: T) -> Self {
        Self::with_code(200).with_body(data)
    }

    pub fn ok_msg(message: impl Into<String>) -> Self {
        Self::with_code(200).with_body(status_message(message))
    }

    /// 202: accepted, but not fully processed.
    pub fn accepted(message: impl Into<String>) -> Self {
        Self::with_code(202).with_body(status_message(message))
    }

    pub fn bad_input(err: impl fmt::Display) -> Self {
        Self::error(400, err)
    }

    /// 400 with per-element failures.
    pub fn bad_inputs(message: impl Into<String>, failures: Vec<IndexedErrorItem>) -> Self {
        Self::with_code(400).with_body(IndexedErrorMessage {
            error: ErrorMessage::new(400, message),
            failures,
        })
    }

    pub fn not_found(message: impl fmt::Display) -> Self {
        Self::error(404, message)
    }

    pub fn internal_error(err: impl fmt::Display) -> Self {
        Self::error(500, err)
    }

    pub fn syncing(message: impl fmt::Display) -> Self {
        Self::error(503, message)
    }

    pub fn error(code: u16, message: impl fmt::Display) -> Self {
        Self::with_code(code).with_body(ErrorMessage::new(u64::from(code), message.to_string()))
    }

    pub fn code(&self) -> u16 {
        self.code
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn has_body(&self) -> bool {
        self.body.is_some()
    }

    /// Encode the body, if any, with `codec`.
    pub fn encode_body(&self, codec: &C) -> Result<Option<Vec<u8>>, ApiError> {
        match &self.body {
            Some(body) => {
                let mut buf = Vec::new();
                body.encode_body(codec, &mut buf)?;
                Ok(Some(buf))
            }
            None => Ok(None),
        }
    }

    #[allow(clippy::type_complexity)]
    pub fn into_parts(
        self,
    ) -> (
        u16,
        BTreeMap<String, String>,
        Option<Box<dyn EncodeBody<C>>>,
    ) {
        (self.code, self.headers, self.body)
    }
}

fn status_message(message: impl Into<String>) -> Envelope<StatusMessage> {
    Envelope::wrap(StatusMessage {
        message: message.into(),
    })
}

impl<C> fmt::Debug for PreparedResponse<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreparedResponse")
            .field("code", &self.code)
            .field("headers", &self.headers)
            .field("has_body", &self.body.is_some())
            .finish()
    }
}
