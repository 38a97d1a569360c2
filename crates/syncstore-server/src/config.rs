use std::net::{Ipv4Addr, SocketAddr};

/// Port used when no listen address is given
pub const DEFAULT_PORT: u16 = 7878;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    // Listen address
    pub listen_addr: SocketAddr,
    // log level for http tracing
    pub log_level: tracing::Level,
}

impl ServerConfig {
    pub fn new(listen_addr: SocketAddr) -> Self {
        tracing::debug!(%listen_addr, "Creating HTTP server config");
        Self {
            listen_addr,
            log_level: tracing::Level::INFO,
        }
    }

    pub fn with_log_level(mut self, log_level: tracing::Level) -> Self {
        self.log_level = log_level;
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_PORT)))
    }
}
