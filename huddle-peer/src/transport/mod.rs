mod peer_transport;
mod relay_client;
mod signal_sink;
mod webrtc_transport;

pub use peer_transport::*;
pub use relay_client::*;
pub use signal_sink::*;
pub use webrtc_transport::*;
