//! Client-side request abstraction.
//!
//! A [`Client`] turns a [`RequestDescriptor`] into a [`ResponseHandle`].
//! The handle is consumed by exactly one [`ResponseHandle::decode`] or
//! [`ResponseHandle::discard`], so a response body can never be read twice.

use std::fmt;
use std::io::Read;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

use crate::codec::Codec;
use crate::error::ApiError;
use crate::request::RequestDescriptor;

#[async_trait]
pub trait Client: Send + Sync {
    type Codec: Codec;

    /// Issue a request. Transport and encoding failures are not returned
    /// here; they surface from the handle's decode.
    async fn request<B>(&self, req: RequestDescriptor<B>) -> ResponseHandle<Self::Codec>
    where
        B: Serialize + Send + Sync;
}

enum HandleState {
    Received {
        code: u16,
        body: Box<dyn Read + Send>,
    },
    Failed(ApiError),
}

/// The outcome of one dispatched request, not yet decoded.
pub struct ResponseHandle<C> {
    codec: C,
    state: HandleState,
}

impl<C: Codec> ResponseHandle<C> {
    pub fn received<R: Read + Send + 'static>(codec: C, code: u16, body: R) -> Self {
        Self {
            codec,
            state: HandleState::Received {
                code,
                body: Box::new(body),
            },
        }
    }

    /// A request that never produced a response.
    pub fn failed(codec: C, err: ApiError) -> Self {
        Self {
            codec,
            state: HandleState::Failed(err),
        }
    }

    pub fn code(&self) -> Option<u16> {
        match &self.state {
            HandleState::Received { code, .. } => Some(*code),
            HandleState::Failed(_) => None,
        }
    }

    /// Decode the body into `T`, returning the status code alongside it.
    pub fn decode<T: DeserializeOwned>(self) -> Result<(u16, T), ApiError> {
        match self.state {
            HandleState::Failed(err) => Err(err),
            HandleState::Received { code, body } => self
                .codec
                .decode_response_body(code, body)
                .map(|value| (code, value)),
        }
    }

    /// Classify the response without decoding a success body.
    pub fn discard(self) -> Result<u16, ApiError> {
        match self.state {
            HandleState::Failed(err) => Err(err),
            HandleState::Received { code, body } => {
                self.codec.discard_response_body(code, body).map(|()| code)
            }
        }
    }
}

impl<C> fmt::Debug for ResponseHandle<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.state {
            HandleState::Received { code, .. } => f
                .debug_struct("ResponseHandle")
                .field("code", code)
                .finish_non_exhaustive(),
            HandleState::Failed(err) => f
                .debug_struct("ResponseHandle")
                .field("error", err)
                .finish(),
        }
    }
}

/// Issue a request where 404 means "not there".
///
/// Returns `Ok(None)` on 404, whatever the error body looked like.
pub async fn simple_request<C, B, T>(cli: &C, req: RequestDescriptor<B>) -> Result<Option<T>, ApiError>
where
    C: Client,
    B: Serialize + Send + Sync,
    T: DeserializeOwned,
{
    match cli.request(req).await.decode::<T>() {
        Ok((_, value)) => Ok(Some(value)),
        Err(err) if err.status_code() == Some(404) => Ok(None),
        Err(err) => Err(err),
    }
}

/// Issue a request where every non-success status is an error.
pub async fn minimal_request<C, B, T>(cli: &C, req: RequestDescriptor<B>) -> Result<T, ApiError>
where
    C: Client,
    B: Serialize + Send + Sync,
    T: DeserializeOwned,
{
    cli.request(req).await.decode::<T>().map(|(_, value)| value)
}
