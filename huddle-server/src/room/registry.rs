use crate::room::room::{Participant, Room};
use crate::signaling::SignalingOutput;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use huddle_core::{ChatEntry, Member, RoomKey, ServerEvent, SessionId, TrackChange};
use std::sync::Arc;
use tracing::{debug, info};

struct RegistryInner {
    rooms: DashMap<RoomKey, Room>,
    /// session -> room index, so leave never scans rooms.
    sessions: DashMap<SessionId, RoomKey>,
}

/// Single source of truth for who is in which room.
///
/// Every mutating operation enqueues its outbound events while it still holds
/// the room's map entry. Two events of one room therefore reach every member's
/// queue in the order the registry applied them; rooms in different shards do
/// not contend.
#[derive(Clone)]
pub struct RoomRegistry {
    inner: Arc<RegistryInner>,
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                rooms: DashMap::new(),
                sessions: DashMap::new(),
            }),
        }
    }

    /// Adds `session_id` to `room` and returns the resulting membership.
    ///
    /// Every member (joiner included) gets `user-joined`; the joiner alone then
    /// gets `user-list` followed by the room's chat history.
    pub fn join(
        &self,
        session_id: SessionId,
        room: RoomKey,
        name: String,
        out: &dyn SignalingOutput,
    ) -> Vec<Member> {
        if let Some(current) = self.room_of(&session_id) {
            if current != room {
                info!(
                    "Session {} moves from room '{}' to '{}'",
                    session_id, current, room
                );
                self.leave(&session_id, out);
            }
        }

        let mut entry = self.inner.rooms.entry(room.clone()).or_insert_with(|| {
            info!("Creating new room: {}", room);
            Room::new(room.clone())
        });

        entry.upsert(session_id, name);
        self.inner.sessions.insert(session_id, room.clone());

        let member_ids = entry.member_ids();
        let members = entry.members();
        info!(
            "Session {} joined room '{}' ({} members)",
            session_id,
            room,
            entry.len()
        );

        for id in &member_ids {
            out.deliver(
                id,
                ServerEvent::UserJoined {
                    session_id,
                    member_ids: member_ids.clone(),
                    members: members.clone(),
                },
            );
        }

        out.deliver(
            &session_id,
            ServerEvent::UserList {
                members: members.clone(),
            },
        );

        if !entry.log().is_empty() {
            debug!(
                "Replaying {} chat entries to {}",
                entry.log().len(),
                session_id
            );
        }
        for chat in entry.log().entries() {
            out.deliver(&session_id, chat.to_event());
        }

        members
    }

    /// Removes the session from its room. Deletes the room (and its log) when it
    /// becomes empty. Returns the room left, `None` if the session was in none.
    pub fn leave(&self, session_id: &SessionId, out: &dyn SignalingOutput) -> Option<RoomKey> {
        let room = self.room_of(session_id)?;

        let Entry::Occupied(mut entry) = self.inner.rooms.entry(room.clone()) else {
            self.inner.sessions.remove(session_id);
            return None;
        };

        let removed = entry.get_mut().remove(session_id);
        self.inner
            .sessions
            .remove_if(session_id, |_, current| current == &room);
        if removed.is_none() {
            return None;
        }

        let remaining = entry.get().members();
        for member in &remaining {
            out.deliver(
                &member.id,
                ServerEvent::UserLeft {
                    session_id: *session_id,
                    members: remaining.clone(),
                },
            );
        }

        info!(
            "Session {} left room '{}' ({} remaining)",
            session_id,
            room,
            remaining.len()
        );

        if entry.get().is_empty() {
            let emptied = entry.remove();
            info!("Room '{}' is empty, removed", emptied.key());
        }

        Some(room)
    }

    /// Appends a chat entry to the sender's room log and broadcasts it to every
    /// member, sender included. `None` when the sender is in no room.
    pub fn post_chat(
        &self,
        session_id: &SessionId,
        sender: String,
        data: String,
        out: &dyn SignalingOutput,
    ) -> Option<ChatEntry> {
        let room = self.room_of(session_id)?;
        let mut entry = self.inner.rooms.get_mut(&room)?;
        if !entry.contains(session_id) {
            return None;
        }

        let chat = ChatEntry {
            room: room.clone(),
            sender,
            sender_session_id: *session_id,
            data,
        };
        let seq = entry.log_mut().append(chat.clone());
        debug!("Chat #{} in room '{}' from {}", seq, room, session_id);

        let event = chat.to_event();
        for id in entry.member_ids() {
            out.deliver(&id, event.clone());
        }

        Some(chat)
    }

    /// Tells every other member of the sender's room about a track toggle.
    pub fn broadcast_track_change(
        &self,
        session_id: &SessionId,
        change: TrackChange,
        out: &dyn SignalingOutput,
    ) -> bool {
        let Some(room) = self.room_of(session_id) else {
            return false;
        };
        let Some(entry) = self.inner.rooms.get(&room) else {
            return false;
        };
        if !entry.contains(session_id) {
            return false;
        }

        for id in entry.member_ids().iter().filter(|id| *id != session_id) {
            out.deliver(
                id,
                ServerEvent::TrackChange {
                    from_session_id: *session_id,
                    change,
                },
            );
        }
        true
    }

    /// Forwards an opaque negotiation payload to `to`, provided both sessions
    /// share a room.
    pub fn relay_signal(
        &self,
        from: &SessionId,
        to: &SessionId,
        payload: String,
        out: &dyn SignalingOutput,
    ) -> bool {
        let Some(room) = self.room_of(from) else {
            return false;
        };
        let Some(entry) = self.inner.rooms.get(&room) else {
            return false;
        };
        if !entry.contains(from) || !entry.contains(to) {
            debug!("Dropping signal {} -> {}: not in the same room", from, to);
            return false;
        }

        out.deliver(
            to,
            ServerEvent::Signal {
                from_session_id: *from,
                payload,
            },
        );
        true
    }

    pub fn room_of(&self, session_id: &SessionId) -> Option<RoomKey> {
        self.inner
            .sessions
            .get(session_id)
            .map(|entry| entry.value().clone())
    }

    /// Membership snapshot in join order; empty for unknown rooms.
    pub fn members_of(&self, room: &RoomKey) -> Vec<Member> {
        self.inner
            .rooms
            .get(room)
            .map(|entry| entry.members())
            .unwrap_or_default()
    }

    pub fn participant(&self, session_id: &SessionId) -> Option<Participant> {
        let room = self.room_of(session_id)?;
        let entry = self.inner.rooms.get(&room)?;
        entry.participant(session_id).cloned()
    }

    pub fn history_len(&self, room: &RoomKey) -> usize {
        self.inner
            .rooms
            .get(room)
            .map(|entry| entry.log().len())
            .unwrap_or(0)
    }

    pub fn contains_room(&self, room: &RoomKey) -> bool {
        self.inner.rooms.contains_key(room)
    }

    pub fn room_count(&self) -> usize {
        self.inner.rooms.len()
    }
}
