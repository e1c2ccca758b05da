use huddle_core::{ServerEvent, SessionId};

/// Sink the room registry pushes outbound events into.
///
/// Implementations must not block: the registry calls `deliver` while it holds
/// a room entry, which is what keeps per-room fan-out ordered.
pub trait SignalingOutput: Send + Sync {
    fn deliver(&self, session_id: &SessionId, event: ServerEvent);
}
