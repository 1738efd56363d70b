//! `/eth/v1/node` endpoints.

use eth2api::types::{NodeVersionResponse, SyncingStatus};
use eth2api::{minimal_request, ApiError, Client, Envelope, RequestDescriptor};

/// Node health as reported by `GET /eth/v1/node/health`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    /// 200: synced and ready.
    Ready,
    /// 206: up, but still syncing.
    Syncing,
}

/// `GET /eth/v1/node/health`
///
/// Anything other than 200 or 206 (including 503) is an error.
pub async fn health<C: Client>(cli: &C) -> Result<HealthStatus, ApiError> {
    let code = cli
        .request(RequestDescriptor::get("/eth/v1/node/health"))
        .await
        .discard()?;
    Ok(if code == 206 {
        HealthStatus::Syncing
    } else {
        HealthStatus::Ready
    })
}

/// `GET /eth/v1/node/version`
pub async fn version<C: Client>(cli: &C) -> Result<String, ApiError> {
    let res: Envelope<NodeVersionResponse> =
        minimal_request(cli, RequestDescriptor::get("/eth/v1/node/version")).await?;
    Ok(res.data.version)
}

/// `GET /eth/v1/node/syncing`
pub async fn syncing<C: Client>(cli: &C) -> Result<SyncingStatus, ApiError> {
    minimal_request(cli, RequestDescriptor::get("/eth/v1/node/syncing"))
        .await
        .map(Envelope::into_data)
}
