use crate::room::RoomRegistry;
use crate::signaling::SignalingOutput;
use dashmap::DashMap;
use huddle_core::{
    ANONYMOUS_NAME, ClientEvent, IceServerConfig, RoomKey, ServerEvent, SessionId, sanitize,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

struct SignalingInner {
    connections: DashMap<SessionId, mpsc::UnboundedSender<ServerEvent>>,
    ice_servers: Vec<IceServerConfig>,
}

/// The relay: owns every live connection's outbound queue and maps inbound
/// client events onto the [`RoomRegistry`].
#[derive(Clone)]
pub struct SignalingService {
    inner: Arc<SignalingInner>,
    registry: RoomRegistry,
}

impl SignalingService {
    pub fn new(ice_servers: Vec<IceServerConfig>) -> Self {
        Self::with_registry(RoomRegistry::new(), ice_servers)
    }

    pub fn with_registry(registry: RoomRegistry, ice_servers: Vec<IceServerConfig>) -> Self {
        Self {
            inner: Arc::new(SignalingInner {
                connections: DashMap::new(),
                ice_servers,
            }),
            registry,
        }
    }

    pub fn registry(&self) -> &RoomRegistry {
        &self.registry
    }

    pub fn ice_servers(&self) -> Vec<IceServerConfig> {
        self.inner.ice_servers.clone()
    }

    /// Registers a freshly accepted connection and greets it with its session id.
    pub fn add_connection(&self, session_id: SessionId, tx: mpsc::UnboundedSender<ServerEvent>) {
        self.inner.connections.insert(session_id, tx);
        self.deliver(
            &session_id,
            ServerEvent::Welcome {
                session_id,
                ice_servers: self.ice_servers(),
            },
        );
    }

    pub fn remove_connection(&self, session_id: &SessionId) {
        self.inner.connections.remove(session_id);
    }

    pub fn connection_count(&self) -> usize {
        self.inner.connections.len()
    }

    pub fn handle_event(&self, session_id: SessionId, event: ClientEvent) {
        match event {
            ClientEvent::JoinCall(request) => {
                let name = request
                    .name()
                    .map(sanitize)
                    .filter(|name| !name.trim().is_empty())
                    .unwrap_or_else(|| ANONYMOUS_NAME.to_owned());
                let room = RoomKey::from(request.url());
                info!("Session {} wants to join room '{}' as '{}'", session_id, room, name);
                self.registry.join(session_id, room, name, self);
            }

            ClientEvent::Signal {
                to_session_id,
                payload,
            } => {
                self.registry
                    .relay_signal(&session_id, &to_session_id, payload, self);
            }

            ClientEvent::ChatMessage { data, sender } => {
                let sender = Some(sanitize(&sender))
                    .filter(|s| !s.trim().is_empty())
                    .or_else(|| self.registry.participant(&session_id).map(|p| p.name))
                    .unwrap_or_else(|| ANONYMOUS_NAME.to_owned());
                if self
                    .registry
                    .post_chat(&session_id, sender, sanitize(&data), self)
                    .is_none()
                {
                    debug!("Chat from {} ignored: not in a room", session_id);
                }
            }

            ClientEvent::TrackChange(change) => {
                self.registry
                    .broadcast_track_change(&session_id, change, self);
            }

            ClientEvent::LeaveCall {} => self.leave(&session_id),
        }
    }

    /// Explicit `leave-call`. Same outward behavior as [`Self::disconnect`].
    pub fn leave(&self, session_id: &SessionId) {
        if self.registry.leave(session_id, self).is_none() {
            debug!("Leave from {} ignored: not in a room", session_id);
        }
    }

    /// Transport-level drop of the connection.
    pub fn disconnect(&self, session_id: &SessionId) {
        self.leave(session_id);
        self.remove_connection(session_id);
    }
}

impl SignalingOutput for SignalingService {
    fn deliver(&self, session_id: &SessionId, event: ServerEvent) {
        if let Some(conn) = self.inner.connections.get(session_id) {
            if conn.send(event).is_err() {
                warn!("Outbound queue of {} is closed", session_id);
            }
        } else {
            warn!("Attempted to send event to disconnected session {}", session_id);
        }
    }
}
