use meshcall_core::IceServerConfig;
use serde::{Deserialize, Serialize};
use std::env;

const DEFAULT_STUN_SERVERS: [&str; 2] = [
    "stun:stun.l.google.com:19302",
    "stun:stun1.l.google.com:19302",
];

/// Relay/reflection servers used to establish direct connections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportConfig {
    pub ice_servers: Vec<IceServerConfig>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            ice_servers: DEFAULT_STUN_SERVERS
                .iter()
                .map(|url| IceServerConfig::stun(*url))
                .collect(),
        }
    }
}

impl TransportConfig {
    /// Default STUN servers plus a TURN server when `TURN_URL` is set
    /// (`TURN_USERNAME` and `TURN_CREDENTIAL` are optional).
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = env::var("TURN_URL") {
            config.ice_servers.push(IceServerConfig {
                urls: vec![url],
                username: env::var("TURN_USERNAME").ok(),
                credential: env::var("TURN_CREDENTIAL").ok(),
            });
        }
        config
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
