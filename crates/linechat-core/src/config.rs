//! Configuration for the linechat relay
//!
//! Consolidates the tunable timings of the heartbeat protocol and the
//! server's listen settings into serde-friendly structures with sensible
//! defaults. Binaries may load these from a TOML file or construct them
//! from CLI arguments.

use core::time::Duration;
use serde::{Deserialize, Serialize};

// ----------------------------------------------------------------------------
// Heartbeat Timing Configuration
// ----------------------------------------------------------------------------

/// Timings for the coordinator-driven heartbeat cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Seconds between heartbeat rounds emitted by the coordinator client.
    pub heartbeat_period_secs: u64,
    /// Per-target wait for a pong before the session is declared dead, in
    /// milliseconds. A hard upper bound, not extended on partial activity.
    pub ping_timeout_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            heartbeat_period_secs: 60,
            ping_timeout_ms: 50,
        }
    }
}

impl TimingConfig {
    /// Compressed timings for tests: rounds fire quickly, and the pong
    /// window is wide enough to absorb scheduler noise on loopback.
    pub fn fast() -> Self {
        Self {
            heartbeat_period_secs: 1,
            ping_timeout_ms: 200,
        }
    }

    pub fn heartbeat_period(&self) -> Duration {
        Duration::from_secs(self.heartbeat_period_secs)
    }

    pub fn ping_timeout(&self) -> Duration {
        Duration::from_millis(self.ping_timeout_ms)
    }
}

// ----------------------------------------------------------------------------
// Server Configuration
// ----------------------------------------------------------------------------

/// Listen settings and timings for the relay server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address the listener binds to.
    pub bind_addr: String,
    /// TCP port to listen on. Port 0 asks the OS for a free port.
    pub port: u16,
    /// Heartbeat timings shared with connected coordinators.
    #[serde(default)]
    pub timing: TimingConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1".to_string(),
            port: 0,
            timing: TimingConfig::default(),
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_timings_match_protocol_reference() {
        let timing = TimingConfig::default();
        assert_eq!(timing.heartbeat_period(), Duration::from_secs(60));
        assert_eq!(timing.ping_timeout(), Duration::from_millis(50));
    }

    #[test]
    fn server_config_parses_from_toml() {
        let config: ServerConfig = toml::from_str(
            r#"
            bind_addr = "0.0.0.0"
            port = 50505

            [timing]
            heartbeat_period_secs = 30
            ping_timeout_ms = 100
            "#,
        )
        .unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0");
        assert_eq!(config.port, 50505);
        assert_eq!(config.timing.heartbeat_period_secs, 30);
    }

    #[test]
    fn timing_section_is_optional() {
        let config: ServerConfig = toml::from_str(
            r#"
            bind_addr = "127.0.0.1"
            port = 50505
            "#,
        )
        .unwrap();
        assert_eq!(config.timing.ping_timeout_ms, 50);
    }
}
