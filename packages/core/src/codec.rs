//! Wire formats for request and response bodies.
//!
//! A [`Codec`] only has to provide [`Codec::encode`] and [`Codec::decode`];
//! the body-level operations are provided on top of them so that every
//! format classifies status codes the same way. Body sources are taken by
//! value and are dropped exactly once, whichever path is taken.

use std::io::{Read, Write};

use serde::{de::DeserializeOwned, Serialize};

use crate::error::{ApiError, ErrorBody, StatusClass};

pub trait Codec: Clone + Send + Sync + 'static {
    /// MIME type this codec produces and accepts.
    fn content_type(&self) -> &'static str;

    fn encode<W: Write, T: Serialize + ?Sized>(&self, sink: W, value: &T)
        -> Result<(), ApiError>;

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, ApiError>;

    fn encode_request_body<W: Write, T: Serialize + ?Sized>(
        &self,
        sink: W,
        body: &T,
    ) -> Result<(), ApiError> {
        self.encode(sink, body)
    }

    fn encode_response_body<W: Write, T: Serialize + ?Sized>(
        &self,
        sink: W,
        data: &T,
    ) -> Result<(), ApiError> {
        self.encode(sink, data)
    }

    /// Decode an incoming request body. An empty body is [`ApiError::NoContent`].
    fn decode_request_body<R: Read, T: DeserializeOwned>(&self, source: R) -> Result<T, ApiError> {
        let bytes = read_source(source)?;
        if is_blank(&bytes) {
            return Err(ApiError::NoContent);
        }
        self.decode(&bytes)
    }

    /// Decode a response body according to its status code.
    ///
    /// 2xx bodies decode into `T`; anything else is read as an error body and
    /// classified into an [`ApiError`].
    fn decode_response_body<R: Read, T: DeserializeOwned>(
        &self,
        code: u16,
        source: R,
    ) -> Result<T, ApiError> {
        let class = StatusClass::of(code);
        tracing::debug!(code, ?class, "decoding response body");
        match class {
            StatusClass::Unexpected => Err(ApiError::UnexpectedStatus(code)),
            StatusClass::Success => {
                let bytes = read_source(source)?;
                if is_blank(&bytes) {
                    return Err(ApiError::NoContent);
                }
                self.decode(&bytes)
            }
            _ => Err(self.decode_error_response(code, source)),
        }
    }

    /// Like [`Codec::decode_response_body`] for callers that only need the
    /// outcome. Success bodies are released unread.
    fn discard_response_body<R: Read>(&self, code: u16, source: R) -> Result<(), ApiError> {
        match StatusClass::of(code) {
            StatusClass::Unexpected => Err(ApiError::UnexpectedStatus(code)),
            StatusClass::Success => Ok(()),
            _ => Err(self.decode_error_response(code, source)),
        }
    }

    fn decode_error_response<R: Read>(&self, code: u16, source: R) -> ApiError {
        let decoded = read_source(source).and_then(|bytes| self.decode::<ErrorBody>(&bytes));
        match decoded {
            Ok(body) => ApiError::from_error_body(code, body),
            Err(err) => ApiError::MalformedErrorBody {
                code,
                reason: err.to_string(),
            },
        }
    }
}

fn read_source<R: Read>(mut source: R) -> Result<Vec<u8>, ApiError> {
    let mut buf = Vec::new();
    source
        .read_to_end(&mut buf)
        .map_err(|e| ApiError::Decode(format!("failed to read body: {e}")))?;
    Ok(buf)
}

fn is_blank(bytes: &[u8]) -> bool {
    bytes.iter().all(u8::is_ascii_whitespace)
}

// ---------------------------------------------------------------------------
// JSON
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn content_type(&self) -> &'static str {
        "application/json"
    }

    fn encode<W: Write, T: Serialize + ?Sized>(
        &self,
        sink: W,
        value: &T,
    ) -> Result<(), ApiError> {
        serde_json::to_writer(sink, value).map_err(|e| ApiError::Encoding(e.to_string()))
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, ApiError> {
        serde_json::from_slice(bytes).map_err(|e| ApiError::Decode(e.to_string()))
    }
}
