use crate::room::message_log::MessageLog;
use huddle_core::{Member, RoomKey, SessionId};
use std::time::SystemTime;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub id: SessionId,
    pub name: String,
    pub joined_at: SystemTime,
}

impl Participant {
    pub fn to_member(&self) -> Member {
        Member {
            id: self.id,
            name: self.name.clone(),
        }
    }
}

/// Membership (in join order) and chat history of a single room.
#[derive(Debug)]
pub struct Room {
    key: RoomKey,
    participants: Vec<Participant>,
    log: MessageLog,
}

impl Room {
    pub fn new(key: RoomKey) -> Self {
        Self {
            key,
            participants: Vec::new(),
            log: MessageLog::new(),
        }
    }

    pub fn key(&self) -> &RoomKey {
        &self.key
    }

    pub fn contains(&self, id: &SessionId) -> bool {
        self.participants.iter().any(|p| &p.id == id)
    }

    pub fn participant(&self, id: &SessionId) -> Option<&Participant> {
        self.participants.iter().find(|p| &p.id == id)
    }

    /// Adds the session, or only refreshes its display name when it is already a member.
    pub fn upsert(&mut self, id: SessionId, name: String) {
        match self.participants.iter_mut().find(|p| p.id == id) {
            Some(existing) => existing.name = name,
            None => self.participants.push(Participant {
                id,
                name,
                joined_at: SystemTime::now(),
            }),
        }
    }

    pub fn remove(&mut self, id: &SessionId) -> Option<Participant> {
        let idx = self.participants.iter().position(|p| &p.id == id)?;
        Some(self.participants.remove(idx))
    }

    pub fn member_ids(&self) -> Vec<SessionId> {
        self.participants.iter().map(|p| p.id).collect()
    }

    pub fn members(&self) -> Vec<Member> {
        self.participants.iter().map(Participant::to_member).collect()
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn log(&self) -> &MessageLog {
        &self.log
    }

    pub fn log_mut(&mut self) -> &mut MessageLog {
        &mut self.log
    }
}
