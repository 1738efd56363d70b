//! Route handlers for every Beacon Node API endpoint the node serves.
//!
//! Each submodule covers one endpoint group. Handlers are async functions
//! from the shared [`BeaconBackend`] and an [`IncomingRequest`] to a
//! [`Reply`]; both arms of a `Reply` are sent as-is, so `?` can be used to
//! bail out early with an error response.
//!
//! | Module | Endpoints |
//! |--------|-----------|
//! | [`beacon`] | genesis, blocks, headers, states |
//! | [`pool`] | attestation, voluntary exit and sync committee pools |
//! | [`node`] | health, version, syncing |
//! | [`validator`] | block production, proposer duties |

pub mod beacon;
pub mod node;
pub mod pool;
pub mod validator;

use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;

use eth2api::{Codec, IncomingRequest, PreparedResponse, ReqMethod, Route, Server};
use serde::de::DeserializeOwned;

use crate::{backend::BeaconBackend, config::NodeConfig};

/// A handler outcome. `Err` carries an early error response.
pub type Reply<C> = Result<PreparedResponse<C>, PreparedResponse<C>>;

/// Register every endpoint on `server`.
pub fn register<C: Codec, S: Server<C>>(
    server: &mut S,
    backend: Arc<BeaconBackend>,
    config: &NodeConfig,
) {
    use ReqMethod::{Get, Post};

    // beacon
    server.add_route(route(Get, "/eth/v1/beacon/genesis", &backend, beacon::genesis::<C>));
    server.add_route(route(
        Get,
        "/eth/v1/beacon/blocks/:block_id/root",
        &backend,
        beacon::block_root::<C>,
    ));
    server.add_route(route(Get, "/eth/v1/beacon/blocks/:block_id", &backend, beacon::block::<C>));
    server.add_route(route(
        Get,
        "/eth/v2/beacon/blocks/:block_id",
        &backend,
        beacon::block_v2::<C>,
    ));
    server.add_route(route(
        Get,
        "/eth/v1/beacon/blocks/:block_id/attestations",
        &backend,
        beacon::block_attestations::<C>,
    ));
    server.add_route(route(Post, "/eth/v1/beacon/blocks", &backend, beacon::publish_block::<C>));
    server.add_route(route(Get, "/eth/v1/beacon/headers", &backend, beacon::block_headers::<C>));
    server.add_route(route(
        Get,
        "/eth/v1/beacon/headers/:block_id",
        &backend,
        beacon::block_header::<C>,
    ));
    server.add_route(route(
        Get,
        "/eth/v1/beacon/states/:state_id/root",
        &backend,
        beacon::state_root::<C>,
    ));
    server.add_route(route(
        Get,
        "/eth/v1/beacon/states/:state_id/finality_checkpoints",
        &backend,
        beacon::finality_checkpoints::<C>,
    ));

    // pool
    server.add_route(route(
        Get,
        "/eth/v1/beacon/pool/attestations",
        &backend,
        pool::pool_attestations::<C>,
    ));
    server.add_route(route(
        Post,
        "/eth/v1/beacon/pool/attestations",
        &backend,
        pool::publish_attestations::<C>,
    ));
    server.add_route(route(
        Get,
        "/eth/v1/beacon/pool/voluntary_exits",
        &backend,
        pool::pool_voluntary_exits::<C>,
    ));
    server.add_route(route(
        Post,
        "/eth/v1/beacon/pool/voluntary_exits",
        &backend,
        pool::publish_voluntary_exit::<C>,
    ));
    server.add_route(route(
        Post,
        "/eth/v1/beacon/pool/sync_committees",
        &backend,
        pool::publish_sync_committee_messages::<C>,
    ));

    // node
    server.add_route(route(Get, "/eth/v1/node/health", &backend, node::health::<C>));
    server.add_route(node::version(config.node_version.clone()));
    server.add_route(route(Get, "/eth/v1/node/syncing", &backend, node::syncing::<C>));

    // validator
    server.add_route(route(
        Get,
        "/eth/v1/validator/blocks/:slot",
        &backend,
        validator::produce_block::<C>,
    ));
    server.add_route(route(
        Get,
        "/eth/v1/validator/duties/proposer/:epoch",
        &backend,
        validator::proposer_duties::<C>,
    ));
}

/// Bind `handler` to a clone of `backend`.
fn route<C, F, Fut>(
    method: ReqMethod,
    pattern: &str,
    backend: &Arc<BeaconBackend>,
    handler: F,
) -> Route<C>
where
    C: Codec,
    F: Fn(Arc<BeaconBackend>, IncomingRequest<C>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Reply<C>> + Send + 'static,
{
    let backend = Arc::clone(backend);
    Route::new(method, pattern, move |req: IncomingRequest<C>| {
        let reply = handler(Arc::clone(&backend), req);
        async move { reply.await.unwrap_or_else(|resp| resp) }
    })
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub(crate) fn path_param<C, T>(
    req: &IncomingRequest<C>,
    name: &str,
) -> Result<T, PreparedResponse<C>>
where
    C: Codec,
    T: FromStr,
    T::Err: fmt::Display,
{
    let raw = req.required_param(name).map_err(PreparedResponse::bad_input)?;
    raw.parse()
        .map_err(|e| PreparedResponse::bad_input(format!("bad {name} path param: {e}")))
}

/// The first value of query param `name`, if present.
pub(crate) fn query_param<C, T>(
    req: &IncomingRequest<C>,
    name: &str,
) -> Result<Option<T>, PreparedResponse<C>>
where
    C: Codec,
    T: FromStr,
    T::Err: fmt::Display,
{
    req.query_first(name)
        .map(|raw| {
            raw.parse()
                .map_err(|e| PreparedResponse::bad_input(format!("bad {name} query param: {e}")))
        })
        .transpose()
}

pub(crate) fn decode_body<C, T>(req: &mut IncomingRequest<C>) -> Result<T, PreparedResponse<C>>
where
    C: Codec,
    T: DeserializeOwned,
{
    req.decode_body().map_err(PreparedResponse::bad_input)
}

#[cfg(test)]
pub(crate) mod testing {
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        Router,
    };
    use eth2api::types::Timestamp;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use super::*;
    use crate::{backend::memory::MemoryBackend, router::build_router};

    pub struct TestNode {
        pub mem: Arc<MemoryBackend>,
        pub router: Router,
    }

    impl TestNode {
        pub fn new() -> Self {
            let mem = Arc::new(MemoryBackend::new(Timestamp(1606824023)));
            let backend = Arc::new(BeaconBackend::from_memory(Arc::clone(&mem)));
            let config = NodeConfig {
                node_version: "test/0.0.1".to_string(),
                ..NodeConfig::default()
            };
            Self {
                router: build_router(backend, &config),
                mem,
            }
        }

        pub async fn get(&self, uri: &str) -> (StatusCode, serde_json::Value) {
            self.send("GET", uri, String::new()).await
        }

        pub async fn post(
            &self,
            uri: &str,
            body: serde_json::Value,
        ) -> (StatusCode, serde_json::Value) {
            self.send("POST", uri, body.to_string()).await
        }

        pub async fn send(
            &self,
            method: &str,
            uri: &str,
            body: String,
        ) -> (StatusCode, serde_json::Value) {
            let req = Request::builder()
                .method(method)
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body))
                .unwrap();
            let resp = self.router.clone().oneshot(req).await.unwrap();
            let status = resp.status();
            let bytes = resp.into_body().collect().await.unwrap().to_bytes();
            let json = if bytes.is_empty() {
                serde_json::Value::Null
            } else {
                serde_json::from_slice(&bytes).unwrap()
            };
            (status, json)
        }
    }

    pub fn root_hex(byte: u8) -> String {
        format!("0x{}", format!("{byte:02x}").repeat(32))
    }
}
