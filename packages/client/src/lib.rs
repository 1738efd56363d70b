//! Beacon Node API client.
//!
//! [`HttpClient`] is the `reqwest`-backed [`Client`](eth2api::Client). The
//! [`beacon`], [`node`], and [`validator`] modules hold one async function
//! per endpoint; each takes any `Client`, so bindings can be exercised
//! against a test double as well as a live node.
//!
//! ```rust,ignore
//! use eth2api::BlockId;
//! use eth2api_client::{beacon, HttpClient};
//!
//! let cli = HttpClient::new("http://localhost:5052");
//! if let Some(root) = beacon::block_root(&cli, BlockId::Head).await? {
//!     println!("head is {root}");
//! }
//! ```

pub mod beacon;
mod http;
pub mod node;
pub mod validator;

#[cfg(test)]
mod spy;

pub use http::HttpClient;

use eth2api::{ApiError, Envelope};

/// Strip the `{"data": ...}` wrapper from an optional result.
fn unwrap_data<T>(res: Result<Option<Envelope<T>>, ApiError>) -> Result<Option<T>, ApiError> {
    res.map(|found| found.map(Envelope::into_data))
}
