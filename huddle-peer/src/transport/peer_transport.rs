use crate::media::LocalTrack;
use anyhow::Result;
use async_trait::async_trait;
use huddle_core::{IceCandidate, IceServerConfig, MediaKind, SessionDescription, SessionId};
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkConnectionState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

/// Things the transport reports back to its link.
#[derive(Debug, Clone)]
pub enum TransportEvent {
    /// A local candidate that has to reach the remote peer.
    CandidateGenerated(IceCandidate),
    RemoteTrack { track_id: String, kind: MediaKind },
    StateChanged(LinkConnectionState),
}

/// The media transport under one peer link.
///
/// Offers and answers returned here are already applied as the local
/// description.
#[async_trait]
pub trait PeerTransport: Send + Sync {
    async fn create_offer(&self) -> Result<SessionDescription>;

    async fn create_answer(&self) -> Result<SessionDescription>;

    async fn set_remote_description(&self, description: SessionDescription) -> Result<()>;

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()>;

    /// Opens the sender slot for `track.kind()`.
    async fn add_track(&self, track: &LocalTrack) -> Result<()>;

    /// Swaps the track of an existing slot without renegotiation.
    async fn replace_track(&self, kind: MediaKind, track: &LocalTrack) -> Result<()>;

    async fn close(&self) -> Result<()>;
}

#[async_trait]
pub trait TransportFactory: Send + Sync {
    async fn create(
        &self,
        remote: SessionId,
        ice_servers: &[IceServerConfig],
        events: mpsc::UnboundedSender<TransportEvent>,
    ) -> Result<Arc<dyn PeerTransport>>;
}
