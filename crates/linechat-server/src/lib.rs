//! linechat relay server
//!
//! Server-side implementation of the linechat protocol: the shared session
//! registry with coordinator election, broadcast/private routing, the
//! heartbeat-driven liveness monitor, and the per-connection session
//! worker pipeline.

pub mod connection;
pub mod error;
pub mod liveness;
pub mod registry;
pub mod router;
pub mod server;
pub mod session;
pub mod worker;

pub use error::{ServerError, ServerResult};
pub use liveness::PingTracker;
pub use registry::{RegisterOutcome, Registry};
pub use router::Router;
pub use server::RelayServer;
pub use session::SessionHandle;
pub use worker::SessionWorker;
