use crate::model::media::TrackChange;
use crate::model::room::Member;
use crate::model::session::SessionId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IceServerConfig {
    pub urls: Vec<String>,
    pub username: Option<String>,
    pub credential: Option<String>,
}

impl IceServerConfig {
    pub fn stun(url: impl Into<String>) -> Self {
        Self {
            urls: vec![url.into()],
            username: None,
            credential: None,
        }
    }
}

/// Payload of `join-call`: either the bare room url or `{url, name}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum JoinRequest {
    Url(String),
    Named {
        url: String,
        #[serde(default)]
        name: Option<String>,
    },
}

impl JoinRequest {
    pub fn url(&self) -> &str {
        match self {
            JoinRequest::Url(url) | JoinRequest::Named { url, .. } => url,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            JoinRequest::Url(_) => None,
            JoinRequest::Named { name, .. } => name.as_deref(),
        }
    }
}

/// Events a participant sends to the relay.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(
    tag = "op",
    content = "d",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum ClientEvent {
    JoinCall(JoinRequest),
    Signal {
        to_session_id: SessionId,
        payload: String,
    },
    ChatMessage {
        data: String,
        #[serde(default)]
        sender: String,
    },
    TrackChange(TrackChange),
    LeaveCall {},
}

/// Events the relay sends to a participant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(
    tag = "op",
    content = "d",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum ServerEvent {
    Welcome {
        session_id: SessionId,
        ice_servers: Vec<IceServerConfig>,
    },
    UserJoined {
        session_id: SessionId,
        member_ids: Vec<SessionId>,
        members: Vec<Member>,
    },
    UserList {
        members: Vec<Member>,
    },
    ChatMessage {
        data: String,
        sender: String,
        sender_session_id: SessionId,
    },
    UserLeft {
        session_id: SessionId,
        members: Vec<Member>,
    },
    Signal {
        from_session_id: SessionId,
        payload: String,
    },
    TrackChange {
        from_session_id: SessionId,
        #[serde(flatten)]
        change: TrackChange,
    },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SdpKind {
    Offer,
    Answer,
}

/// Session description in the shape browsers put on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub kind: SdpKind,
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpKind::Offer,
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpKind::Answer,
            sdp: sdp.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidate {
    pub candidate: String,
    #[serde(default)]
    pub sdp_mid: Option<String>,
    #[serde(default, rename = "sdpMLineIndex")]
    pub sdp_m_line_index: Option<u16>,
    #[serde(default)]
    pub username_fragment: Option<String>,
}

impl IceCandidate {
    pub fn new(candidate: impl Into<String>) -> Self {
        Self {
            candidate: candidate.into(),
            sdp_mid: None,
            sdp_m_line_index: None,
            username_fragment: None,
        }
    }
}

/// What travels inside the opaque `signal` payload between two peers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NegotiationPayload {
    Sdp(SessionDescription),
    Ice(IceCandidate),
}

impl NegotiationPayload {
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
