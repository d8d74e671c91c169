use serde::{Deserialize, Serialize};

/// Queue sizes for the manager loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Pending handle calls before callers wait.
    pub command_buffer: usize,
    /// Pending events from native connections.
    pub transport_buffer: usize,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            command_buffer: 64,
            transport_buffer: 256,
        }
    }
}
