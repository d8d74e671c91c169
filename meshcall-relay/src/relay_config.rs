use anyhow::{Context, Result};
use std::env;
use std::net::SocketAddr;

const DEFAULT_ADDR: &str = "0.0.0.0:3000";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayConfig {
    pub addr: SocketAddr,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
        }
    }
}

impl RelayConfig {
    /// Reads `RELAY_ADDR`, falling back to `0.0.0.0:3000`.
    pub fn from_env() -> Result<Self> {
        Self::parse(env::var("RELAY_ADDR").ok().as_deref())
    }

    fn parse(addr: Option<&str>) -> Result<Self> {
        let addr = addr.unwrap_or(DEFAULT_ADDR);
        let addr = addr
            .parse()
            .with_context(|| format!("Invalid relay address '{addr}'"))?;
        Ok(Self { addr })
    }
}
