use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:18090";

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub bind_addr: SocketAddr,
    /// Leading subject / path segment; empty means none.
    pub prefix: String,
    /// Deadline per engine round trip.
    pub operation_timeout: Option<Duration>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 18090)),
            prefix: String::new(),
            operation_timeout: None,
        }
    }
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let bind_addr = lookup("SCOPEDCRUD_BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .context("SCOPEDCRUD_BIND_ADDR must be a valid host:port")?;

        let prefix = lookup("SCOPEDCRUD_PREFIX").unwrap_or_default();

        let operation_timeout = match lookup("SCOPEDCRUD_TIMEOUT_MS") {
            Some(raw) if !raw.trim().is_empty() => {
                let millis = raw
                    .trim()
                    .parse::<u64>()
                    .context("SCOPEDCRUD_TIMEOUT_MS must be a whole number of milliseconds")?;
                Some(Duration::from_millis(millis))
            }
            _ => None,
        };

        Ok(Self {
            bind_addr,
            prefix,
            operation_timeout,
        })
    }

    pub fn with_bind_addr(mut self, bind_addr: SocketAddr) -> Self {
        self.bind_addr = bind_addr;
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = Some(timeout);
        self
    }
}
