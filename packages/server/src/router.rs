//! Serves [`Route`]s over axum and assembles the node's [`Router`].

use std::collections::BTreeMap;
use std::io::Cursor;
use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    extract::{
        rejection::{BytesRejection, QueryRejection, RawPathParamsRejection},
        Query, RawPathParams,
    },
    http::{header::CONTENT_TYPE, HeaderName, HeaderValue, Method, StatusCode, Uri},
    response::Response,
    routing::{MethodFilter, MethodRouter},
    Router,
};
use eth2api::server::HandlerFn;
use eth2api::{ApiError, Codec, IncomingRequest, JsonCodec, PreparedResponse, ReqMethod, Route, Server};
use tower_http::trace::TraceLayer;

use crate::{backend::BeaconBackend, config::NodeConfig, handlers};

/// Receives failures that happen after the status line is decided, when
/// there is no one left to return an error to.
pub type FailureCallback = Arc<dyn Fn(&ApiError) + Send + Sync>;

/// A [`Server`] that collects routes and turns them into an axum [`Router`].
pub struct AxumServer<C> {
    codec: C,
    routes: Vec<Route<C>>,
    on_failure: FailureCallback,
}

impl<C: Codec> AxumServer<C> {
    pub fn new(codec: C) -> Self {
        Self {
            codec,
            routes: Vec::new(),
            on_failure: Arc::new(|err| tracing::error!("failed to write response: {err}")),
        }
    }

    pub fn with_failure_callback(
        mut self,
        on_failure: impl Fn(&ApiError) + Send + Sync + 'static,
    ) -> Self {
        self.on_failure = Arc::new(on_failure);
        self
    }

    pub fn routes(&self) -> &[Route<C>] {
        &self.routes
    }

    /// Build the router. Routes sharing a pattern share one method router.
    ///
    /// Requests that never reach a handler (unknown path, unsupported
    /// method, rejected path, query or body) still get an error body.
    pub fn into_router(self) -> Router {
        let mut by_path: BTreeMap<String, MethodRouter> = BTreeMap::new();

        for route in self.routes {
            let path = axum_path(route.pattern());
            let filter = match route.method() {
                ReqMethod::Get => MethodFilter::GET,
                ReqMethod::Post => MethodFilter::POST,
            };

            let handler = route.handler();
            let codec = self.codec.clone();
            let on_failure = Arc::clone(&self.on_failure);
            let endpoint = move |params: Result<RawPathParams, RawPathParamsRejection>,
                                 query: Result<Query<Vec<(String, String)>>, QueryRejection>,
                                 body: Result<Bytes, BytesRejection>| {
                let req = incoming_request(codec.clone(), params, query, body);
                let handler = Arc::clone(&handler);
                let codec = codec.clone();
                let on_failure = Arc::clone(&on_failure);
                async move {
                    let prepared = match req {
                        Ok(req) => dispatch(handler, req).await,
                        Err(rejected) => rejected,
                    };
                    write_response(&codec, prepared, &on_failure)
                }
            };

            let method_router = by_path
                .remove(&path)
                .unwrap_or_else(MethodRouter::new)
                .on(filter, endpoint);
            by_path.insert(path, method_router);
        }

        by_path
            .into_iter()
            .fold(Router::new(), |router, (path, methods)| router.route(&path, methods))
            .method_not_allowed_fallback(unrouted(
                self.codec.clone(),
                Arc::clone(&self.on_failure),
                405,
                "method not allowed",
            ))
            .fallback(unrouted(self.codec, self.on_failure, 404, "no such endpoint"))
    }
}

impl<C: Codec> Server<C> for AxumServer<C> {
    fn add_route(&mut self, route: Route<C>) {
        tracing::debug!(method = %route.method(), pattern = route.pattern(), "route registered");
        self.routes.push(route);
    }
}

/// `/eth/v1/beacon/blocks/:block_id` → `/eth/v1/beacon/blocks/{block_id}`
fn axum_path(pattern: &str) -> String {
    let path = pattern
        .trim_start_matches('/')
        .split('/')
        .map(|segment| match segment.strip_prefix(':') {
            Some(name) => format!("{{{name}}}"),
            None => segment.to_string(),
        })
        .collect::<Vec<_>>()
        .join("/");
    format!("/{path}")
}

/// Answers requests that matched no route, or no method of a route.
fn unrouted<C: Codec>(
    codec: C,
    on_failure: FailureCallback,
    code: u16,
    reason: &'static str,
) -> impl Fn(Method, Uri) -> std::future::Ready<Response> + Clone + Send + Sync + 'static {
    move |method: Method, uri: Uri| {
        let prepared = PreparedResponse::error(code, format!("{reason}: {method} {}", uri.path()));
        std::future::ready(write_response(&codec, prepared, &on_failure))
    }
}

fn incoming_request<C: Codec>(
    codec: C,
    params: Result<RawPathParams, RawPathParamsRejection>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
    body: Result<Bytes, BytesRejection>,
) -> Result<IncomingRequest<C>, PreparedResponse<C>> {
    let params = params.map_err(|r| PreparedResponse::error(r.status().as_u16(), r.body_text()))?;
    let Query(query) =
        query.map_err(|r| PreparedResponse::error(r.status().as_u16(), r.body_text()))?;
    let body = body.map_err(|r| PreparedResponse::error(r.status().as_u16(), r.body_text()))?;

    let mut req = IncomingRequest::new(codec).with_body(Cursor::new(body));
    for (name, value) in params.iter() {
        req = req.with_param(name, value);
    }
    for (name, value) in query {
        req = req.with_query_value(name, value);
    }
    Ok(req)
}

/// Run the handler on its own task so that a panic becomes a 500 instead of
/// a dropped connection.
async fn dispatch<C: Codec>(handler: HandlerFn<C>, req: IncomingRequest<C>) -> PreparedResponse<C> {
    match tokio::spawn(handler(req)).await {
        Ok(prepared) => prepared,
        Err(err) => {
            tracing::error!("route handler failed: {err}");
            PreparedResponse::internal_error("internal error while handling request")
        }
    }
}

fn write_response<C: Codec>(
    codec: &C,
    prepared: PreparedResponse<C>,
    on_failure: &FailureCallback,
) -> Response {
    let (code, headers, body) = prepared.into_parts();
    let mut response = Response::new(Body::empty());

    *response.status_mut() = StatusCode::from_u16(code).unwrap_or_else(|_| {
        on_failure(&ApiError::Encoding(format!("invalid status code {code}")));
        StatusCode::INTERNAL_SERVER_ERROR
    });

    for (name, value) in headers {
        match (
            HeaderName::try_from(name.as_str()),
            HeaderValue::try_from(value.as_str()),
        ) {
            (Ok(name), Ok(value)) => {
                response.headers_mut().insert(name, value);
            }
            _ => on_failure(&ApiError::Encoding(format!("invalid response header {name:?}"))),
        }
    }

    if let Some(body) = body {
        let mut buf = Vec::new();
        match body.encode_body(codec, &mut buf) {
            Ok(()) => {
                response
                    .headers_mut()
                    .insert(CONTENT_TYPE, HeaderValue::from_static(codec.content_type()));
                *response.body_mut() = Body::from(buf);
            }
            Err(err) => on_failure(&err),
        }
    }

    response
}

/// Build the complete node router over `backend`.
pub fn build_router(backend: Arc<BeaconBackend>, config: &NodeConfig) -> Router {
    let mut server = AxumServer::new(JsonCodec);
    handlers::register(&mut server, backend, config);
    server.into_router().layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::http::Request;
    use eth2api::{Envelope, ErrorMessage};
    use http_body_util::BodyExt;
    use serde::ser::Error as _;
    use tower::ServiceExt;

    use super::*;

    async fn send(router: Router, method: &str, uri: &str, body: &str) -> (StatusCode, Vec<u8>) {
        let req = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let resp = router.oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        (status, bytes.to_vec())
    }

    #[test]
    fn placeholders_are_translated() {
        assert_eq!(
            axum_path("/eth/v1/beacon/blocks/:block_id/root"),
            "/eth/v1/beacon/blocks/{block_id}/root"
        );
        assert_eq!(axum_path("eth/v1/node/health"), "/eth/v1/node/health");
    }

    #[tokio::test]
    async fn params_query_and_body_reach_handler() {
        let mut server = AxumServer::new(JsonCodec);
        server.add_route(Route::new(
            ReqMethod::Post,
            "/items/:id",
            |mut req: IncomingRequest<JsonCodec>| async move {
                let body: Vec<u64> = match req.decode_body() {
                    Ok(body) => body,
                    Err(err) => return PreparedResponse::bad_input(err),
                };
                let echo = serde_json::json!({
                    "id": req.param("id"),
                    "tags": req.query_list("tag"),
                    "sum": body.iter().sum::<u64>(),
                });
                PreparedResponse::ok(Envelope::wrap(echo))
            },
        ));

        let (status, body) = send(server.into_router(), "POST", "/items/7?tag=a,b&tag=c", "[1,2]").await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "data": { "id": "7", "tags": ["a", "b", "c"], "sum": 3 } })
        );
    }

    #[tokio::test]
    async fn methods_share_a_pattern() {
        let mut server = AxumServer::new(JsonCodec);
        server.add_route(Route::new(ReqMethod::Get, "/pool", |_req: IncomingRequest<JsonCodec>| async {
            PreparedResponse::ok(Envelope::wrap("get"))
        }));
        server.add_route(Route::new(ReqMethod::Post, "/pool", |_req: IncomingRequest<JsonCodec>| async {
            PreparedResponse::ok_msg("post")
        }));
        assert_eq!(server.routes().len(), 2);
        let router = server.into_router();

        let (status, body) = send(router.clone(), "GET", "/pool", "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, br#"{"data":"get"}"#);

        let (status, _) = send(router.clone(), "POST", "/pool", "").await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(router, "DELETE", "/pool", "").await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn unrouted_requests_get_error_bodies() {
        let mut server = AxumServer::new(JsonCodec);
        server.add_route(Route::new(
            ReqMethod::Post,
            "/items/:id",
            |_req: IncomingRequest<JsonCodec>| async { PreparedResponse::ok_msg("stored") },
        ));
        let router = server.into_router();

        let (status, body) = send(router.clone(), "GET", "/no/such/endpoint", "").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let msg: ErrorMessage = serde_json::from_slice(&body).unwrap();
        assert_eq!(msg.code, 404);
        assert!(msg.message.contains("/no/such/endpoint"));

        let (status, body) = send(router.clone(), "GET", "/items/7", "").await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
        let msg: ErrorMessage = serde_json::from_slice(&body).unwrap();
        assert_eq!(msg.code, 405);
        assert!(msg.message.contains("GET"));

        let (status, body) = send(router.clone(), "POST", "/items/%FF", "[]").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let msg: ErrorMessage = serde_json::from_slice(&body).unwrap();
        assert_eq!(msg.code, 400);

        let oversized = format!("[{}]", vec!["0"; 1_500_000].join(","));
        let (status, body) = send(router, "POST", "/items/7", &oversized).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        let msg: ErrorMessage = serde_json::from_slice(&body).unwrap();
        assert_eq!(msg.code, 413);
    }

    #[tokio::test]
    async fn panicking_handler_becomes_internal_error() {
        let mut server = AxumServer::new(JsonCodec);
        server.add_route(Route::new(ReqMethod::Get, "/boom", |_req: IncomingRequest<JsonCodec>| async {
            if true {
                panic!("handler bug");
            }
            PreparedResponse::ok_msg("unreachable")
        }));

        let (status, body) = send(server.into_router(), "GET", "/boom", "").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let msg: ErrorMessage = serde_json::from_slice(&body).unwrap();
        assert_eq!(msg.code, 500);
    }

    struct Unserializable;

    impl serde::Serialize for Unserializable {
        fn serialize<S: serde::Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
            Err(S::Error::custom("nope"))
        }
    }

    #[tokio::test]
    async fn late_failures_reach_callback() {
        let failures = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&failures);
        let mut server = AxumServer::new(JsonCodec).with_failure_callback(move |_err| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        server.add_route(Route::new(ReqMethod::Get, "/bad", |_req: IncomingRequest<JsonCodec>| async {
            PreparedResponse::with_code(200)
                .with_header("bad header", "x")
                .with_body(Unserializable)
        }));

        let (status, body) = send(server.into_router(), "GET", "/bad", "").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.is_empty());
        assert_eq!(failures.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn headers_are_written() {
        let mut server = AxumServer::new(JsonCodec);
        server.add_route(Route::new(ReqMethod::Get, "/v", |_req: IncomingRequest<JsonCodec>| async {
            PreparedResponse::ok(Envelope::wrap(1)).with_header("eth-consensus-version", "altair")
        }));
        let req = Request::builder().uri("/v").body(Body::empty()).unwrap();
        let resp = server.into_router().oneshot(req).await.unwrap();
        assert_eq!(resp.headers()["eth-consensus-version"], "altair");
        assert_eq!(resp.headers()["content-type"], "application/json");
    }
}
