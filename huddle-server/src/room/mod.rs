mod message_log;
mod registry;
mod room;

pub use message_log::*;
pub use registry::*;
pub use room::*;
