//! Configuration schema definitions.
//!
//! The service only knows about bind and timeout options; everything else
//! is fixed at compile time.

use std::time::Duration;

/// Default listening port.
pub const DEFAULT_PORT: u16 = 8900;

/// Host used when none is configured (all interfaces).
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Environment keys for each option, as read by the loader.
pub mod keys {
    pub const HOST: &str = "ip";
    pub const PORT: &str = "port";
    pub const READ_TIMEOUT: &str = "http_read_timeout";
    pub const WRITE_TIMEOUT: &str = "http_write_timeout";
    pub const IDLE_TIMEOUT: &str = "http_idle_timeout";
    pub const SHUTDOWN_DEADLINE: &str = "shutdown_wait_timeout";
}

/// Bind and timeout configuration for the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Host or IP to bind. `0.0.0.0` listens on all interfaces.
    pub host: String,

    /// TCP port to bind. `0` asks the OS for an ephemeral port.
    pub port: u16,

    /// Maximum time to receive a request body.
    pub read_timeout: Duration,

    /// Maximum time a handler may take to produce a response.
    pub write_timeout: Duration,

    /// A connection with no I/O for this long is closed.
    pub idle_timeout: Duration,

    /// Upper bound on draining in-flight requests at shutdown.
    pub shutdown_deadline: Duration,
}

impl ServerConfig {
    /// Address tuple handed to the TCP bind.
    pub fn bind_target(&self) -> (&str, u16) {
        (self.host.as_str(), self.port)
    }

    /// Human-readable bind address for logs.
    pub fn bind_address(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            read_timeout: Duration::from_secs(15),
            write_timeout: Duration::from_secs(10),
            idle_timeout: Duration::from_secs(60),
            shutdown_deadline: Duration::from_secs(15),
        }
    }
}
