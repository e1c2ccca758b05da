mod controller;
mod local_media;
mod media_source;
mod track;

pub use controller::*;
pub use local_media::*;
pub use media_source::*;
pub use track::*;
