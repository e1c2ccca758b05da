mod call;
mod config;
mod error;
pub mod link;
pub mod media;
pub mod transport;

pub use call::*;
pub use config::*;
pub use error::*;
