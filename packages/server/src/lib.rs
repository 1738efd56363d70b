//! Public surface for the `eth2api-server` crate.
//!
//! Exposes the router builder, the backend traits, and config types so that
//! external crates (e.g. the conformance test suite) can spin up an
//! in-process node without spawning a subprocess.

pub mod backend;
pub mod config;
pub mod error;
pub mod handlers;
pub mod router;

pub use backend::{memory::MemoryBackend, BeaconBackend};
pub use config::NodeConfig;
pub use router::{build_router, AxumServer, FailureCallback};
