pub mod model;
pub mod sanitize;

pub use model::*;
pub use sanitize::sanitize;

/// Public STUN server used when nothing else is configured.
pub const DEFAULT_STUN_ADDR: &str = "stun:stun.l.google.com:19302";

/// Display name given to participants that join without one.
pub const ANONYMOUS_NAME: &str = "Anon";
