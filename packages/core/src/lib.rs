//! Typed bindings for the Beacon Node JSON/HTTP API.
//!
//! This crate is transport-agnostic. It defines how a typed call becomes a
//! request and how a reply becomes either a typed value or a classified
//! [`ApiError`], and the mirror image of that contract on the server side.
//! The `eth2api-client` and `eth2api-server` packages plug real transports
//! (`reqwest` and `axum`) into these abstractions.
//!
//! # Crate layout
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`envelope`] | The `{"data": ...}` wrapper carried by success bodies |
//! | [`error`] | [`ApiError`], error bodies, and status-code classification |
//! | [`codec`] | The [`Codec`] trait and its JSON implementation |
//! | [`request`] | [`RequestDescriptor`] and query-parameter encoding |
//! | [`client`] | The [`Client`] trait, [`ResponseHandle`], and request helpers |
//! | [`server`] | [`Route`], [`IncomingRequest`], and [`PreparedResponse`] |
//! | [`params`] | Block, state, and validator identifiers |
//! | [`types`] | API payload types |
//!
//! # Status classification
//!
//! | Code | Outcome |
//! |------|---------|
//! | `< 200` | [`ApiError::UnexpectedStatus`] |
//! | `200..=299` | success; decode into the destination |
//! | `300..=499` | [`ApiError::InvalidRequest`] |
//! | `503` | [`ApiError::CurrentlySyncing`] |
//! | other `5xx` | [`ApiError::Internal`] |
//! | `>= 600` | [`ApiError::Unclassified`] |
//!
//! An error body that fails to decode yields [`ApiError::MalformedErrorBody`]
//! regardless of the code.

pub mod client;
pub mod codec;
pub mod envelope;
pub mod error;
pub mod params;
pub mod request;
pub mod server;
pub mod types;

pub use client::{minimal_request, simple_request, Client, ResponseHandle};
pub use codec::{Codec, JsonCodec};
pub use envelope::Envelope;
pub use error::{
    ApiError, ErrorBody, ErrorMessage, IndexedErrorItem, IndexedErrorMessage, StatusClass,
};
pub use params::{BlockId, ParamError, StateId, ValidatorId};
pub use request::{Query, QueryValue, ReqMethod, RequestDescriptor};
pub use server::{IncomingRequest, PreparedResponse, Route, Server, StatusMessage};
