use huddle_core::{DEFAULT_STUN_ADDR, IceServerConfig};
use std::time::Duration;

/// Delay between tearing a link down and rebuilding it on reset.
pub const DEFAULT_RESET_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, Clone)]
pub struct PeerConfig {
    /// Used until the relay's `welcome` provides its own list.
    pub ice_servers: Vec<IceServerConfig>,
    pub reset_delay: Duration,
}

impl Default for PeerConfig {
    fn default() -> Self {
        Self {
            ice_servers: vec![IceServerConfig::stun(DEFAULT_STUN_ADDR)],
            reset_delay: DEFAULT_RESET_DELAY,
        }
    }
}
