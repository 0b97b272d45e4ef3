use std::{net::SocketAddr, time::Duration};

use clap::Parser;

/// Runtime configuration, from flags or environment.
#[derive(Parser, Debug, Clone)]
#[command(name = "lockstep-server")]
#[command(about = "Synchronized video playback rooms over WebSocket", long_about = None)]
pub struct Config {
    /// Address to bind to
    #[arg(short = 'H', long, env = "LOCKSTEP_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(short = 'p', long, env = "LOCKSTEP_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Seconds an empty room is kept before it is deleted
    #[arg(long, env = "LOCKSTEP_GRACE_SECS", default_value_t = 10)]
    pub grace_period_secs: u64,

    /// Milliseconds to wait after a join error before closing the socket
    #[arg(long, default_value_t = 500)]
    pub error_close_delay_ms: u64,

    /// Default log level when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Config {
    pub fn bind_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(self.grace_period_secs)
    }

    pub fn error_close_delay(&self) -> Duration {
        Duration::from_millis(self.error_close_delay_ms)
    }
}
