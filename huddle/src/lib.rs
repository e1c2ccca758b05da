pub use huddle_core::{SessionId, sanitize};

pub mod model {
    pub use huddle_core::model::*;
}

#[cfg(feature = "server")]
pub mod server {
    pub use huddle_server::*;
}

#[cfg(feature = "peer")]
pub mod peer {
    pub use huddle_peer::*;
}
