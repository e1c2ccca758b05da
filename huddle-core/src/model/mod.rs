mod chat;
mod media;
mod room;
mod session;
mod signaling;

pub use chat::ChatEntry;
pub use media::{MediaKind, TrackChange};
pub use room::{Member, RoomKey};
pub use session::{ParseSessionIdError, SessionId};
pub use signaling::{
    ClientEvent, IceCandidate, IceServerConfig, JoinRequest, NegotiationPayload, SdpKind,
    ServerEvent, SessionDescription,
};
