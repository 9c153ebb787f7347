//! TCP front end for the relay
//!
//! Binds the listener, accepts connections, and hands each one to a
//! session pipeline (reader, worker, writer). The registry, ping tracker,
//! and clock are shared across all connections; everything else is
//! per-session.

use std::net::SocketAddr;
use std::sync::Arc;

use linechat_core::{Clock, RandomSource, ServerConfig, SessionId, SystemClock, SystemRandom, TimingConfig};
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::connection;
use crate::error::ServerResult;
use crate::liveness::PingTracker;
use crate::registry::Registry;
use crate::router::Router;

/// State shared by every connection of one relay instance.
pub struct Shared {
    pub registry: Arc<Registry>,
    pub tracker: Arc<PingTracker>,
    pub clock: Arc<dyn Clock>,
    pub timing: TimingConfig,
}

impl Shared {
    pub fn router(&self) -> Router {
        Router::new(Arc::clone(&self.registry), Arc::clone(&self.clock))
    }
}

/// The relay server: a bound listener plus the shared session state.
pub struct RelayServer {
    listener: TcpListener,
    shared: Arc<Shared>,
    next_id: u64,
}

impl RelayServer {
    /// Bind with production randomness and the system clock.
    pub async fn bind(config: ServerConfig) -> ServerResult<Self> {
        Self::bind_with(config, Box::new(SystemRandom::new())).await
    }

    /// Bind with an injected random source, for deterministic elections in
    /// tests.
    pub async fn bind_with(
        config: ServerConfig,
        rng: Box<dyn RandomSource>,
    ) -> ServerResult<Self> {
        let listener = TcpListener::bind((config.bind_addr.as_str(), config.port)).await?;
        let shared = Arc::new(Shared {
            registry: Arc::new(Registry::new(rng)),
            tracker: Arc::new(PingTracker::new()),
            clock: Arc::new(SystemClock),
            timing: config.timing,
        });
        Ok(Self {
            listener,
            shared,
            next_id: 0,
        })
    }

    /// The address the listener actually bound (relevant with port 0).
    pub fn local_addr(&self) -> ServerResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until interrupted. On Ctrl-C every registered
    /// session is force-closed before returning.
    pub async fn run(mut self) -> ServerResult<()> {
        info!(addr = %self.local_addr()?, "server is running");
        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, addr)) => {
                            self.next_id += 1;
                            let id = SessionId::new(self.next_id);
                            tokio::spawn(connection::handle(
                                stream,
                                addr,
                                id,
                                Arc::clone(&self.shared),
                            ));
                        }
                        Err(err) => {
                            warn!(%err, "accept failed");
                        }
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("shutdown requested, closing all sessions");
                    self.shared.registry.close_all();
                    break;
                }
            }
        }
        Ok(())
    }
}
