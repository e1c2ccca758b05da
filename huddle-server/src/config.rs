use clap::Parser;
use huddle_core::{DEFAULT_STUN_ADDR, IceServerConfig};
use std::net::SocketAddr;

/// Relay configuration. Every flag falls back to an environment variable.
#[derive(Debug, Clone, Parser)]
#[command(name = "huddle-server", about = "Signaling relay for mesh video rooms")]
pub struct ServerConfig {
    /// Address the relay listens on.
    #[arg(long, env = "HUDDLE_LISTEN", default_value = "0.0.0.0:4001")]
    pub listen: SocketAddr,

    /// STUN server handed to every peer.
    #[arg(long, env = "HUDDLE_STUN", default_value = DEFAULT_STUN_ADDR)]
    pub stun: String,

    #[arg(long, env = "TURN_URL")]
    pub turn_url: Option<String>,

    #[arg(long, env = "TURN_USERNAME")]
    pub turn_username: Option<String>,

    #[arg(long, env = "TURN_CREDENTIAL")]
    pub turn_credential: Option<String>,
}

impl ServerConfig {
    pub fn ice_servers(&self) -> Vec<IceServerConfig> {
        let mut servers = vec![IceServerConfig::stun(self.stun.clone())];

        if let Some(url) = &self.turn_url {
            servers.push(IceServerConfig {
                urls: vec![url.clone()],
                username: self.turn_username.clone(),
                credential: self.turn_credential.clone(),
            });
        }

        servers
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([0, 0, 0, 0], 4001)),
            stun: DEFAULT_STUN_ADDR.to_owned(),
            turn_url: None,
            turn_username: None,
            turn_credential: None,
        }
    }
}
