use crate::model::room::RoomKey;
use crate::model::session::SessionId;
use crate::model::signaling::ServerEvent;

/// One entry of a room's chat history. Position in the log is its sequence number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatEntry {
    pub room: RoomKey,
    pub sender: String,
    pub sender_session_id: SessionId,
    pub data: String,
}

impl ChatEntry {
    pub fn to_event(&self) -> ServerEvent {
        ServerEvent::ChatMessage {
            data: self.data.clone(),
            sender: self.sender.clone(),
            sender_session_id: self.sender_session_id,
        }
    }
}
