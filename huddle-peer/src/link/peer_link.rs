use crate::error::{LinkError, PayloadError};
use crate::link::{NegotiationInput, NegotiationState, PendingCandidates};
use crate::media::LocalTrack;
use crate::transport::{LinkConnectionState, PeerTransport, SignalSink};
use huddle_core::{
    ClientEvent, IceCandidate, MediaKind, NegotiationPayload, SdpKind, SessionDescription,
    SessionId,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outgoing sender slot. At most one per kind.
#[derive(Debug, Clone)]
pub struct Slot {
    pub track: LocalTrack,
    /// Mirror of the track's enabled flag as last pushed to this link.
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTrack {
    pub track_id: String,
    pub kind: MediaKind,
}

/// Point-in-time view of a link.
#[derive(Debug, Clone)]
pub struct LinkSnapshot {
    pub remote: SessionId,
    pub state: NegotiationState,
    pub connection: LinkConnectionState,
    pub remote_description_set: bool,
    pub pending_candidates: usize,
    pub slots: Vec<(MediaKind, Slot)>,
    pub remote_tracks: Vec<RemoteTrack>,
    pub closed: bool,
}

impl LinkSnapshot {
    pub fn slot(&self, kind: MediaKind) -> Option<&Slot> {
        self.slots.iter().find(|(k, _)| *k == kind).map(|(_, s)| s)
    }
}

/// One side of the negotiation with a single remote participant.
///
/// Methods that receive something illegal for the current state return
/// [`LinkError::OutOfState`] and leave the link untouched.
pub struct PeerLink {
    remote: SessionId,
    state: NegotiationState,
    connection: LinkConnectionState,
    remote_description_set: bool,
    pending: PendingCandidates,
    slots: HashMap<MediaKind, Slot>,
    remote_tracks: Vec<RemoteTrack>,
    transport: Arc<dyn PeerTransport>,
    signals: Arc<dyn SignalSink>,
    closed: bool,
}

impl PeerLink {
    pub fn new(
        remote: SessionId,
        transport: Arc<dyn PeerTransport>,
        signals: Arc<dyn SignalSink>,
    ) -> Self {
        Self {
            remote,
            state: NegotiationState::Stable,
            connection: LinkConnectionState::New,
            remote_description_set: false,
            pending: PendingCandidates::default(),
            slots: HashMap::new(),
            remote_tracks: Vec::new(),
            transport,
            signals,
            closed: false,
        }
    }

    pub fn remote(&self) -> SessionId {
        self.remote
    }

    pub fn state(&self) -> NegotiationState {
        self.state
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn pending_candidates(&self) -> usize {
        self.pending.len()
    }

    pub fn slot(&self, kind: MediaKind) -> Option<&Slot> {
        self.slots.get(&kind)
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    fn ensure_open(&self) -> Result<(), LinkError> {
        if self.closed {
            Err(LinkError::Closed)
        } else {
            Ok(())
        }
    }

    fn transition(&self, input: NegotiationInput) -> Result<NegotiationState, LinkError> {
        self.state.next(input).ok_or(LinkError::OutOfState {
            state: self.state,
            input,
        })
    }

    /// Puts `track` into the slot of its kind: replaces the slot's track if
    /// the slot exists, opens it otherwise.
    pub async fn attach_track(&mut self, track: LocalTrack) -> Result<(), LinkError> {
        self.ensure_open()?;
        let kind = track.kind();

        if self.slots.contains_key(&kind) {
            self.transport.replace_track(kind, &track).await?;
        } else {
            self.transport.add_track(&track).await?;
        }

        debug!("Slot {} towards {} now carries {}", kind, self.remote, track.id());
        self.slots.insert(
            kind,
            Slot {
                enabled: track.is_enabled(),
                track,
            },
        );
        Ok(())
    }

    /// Mirrors a soft mute. Never opens or closes a slot.
    pub fn set_slot_enabled(&mut self, kind: MediaKind, enabled: bool) {
        if let Some(slot) = self.slots.get_mut(&kind) {
            slot.enabled = enabled;
        }
    }

    /// Starts a negotiation round. Needs a stable link and at least one slot.
    pub async fn create_offer(&mut self) -> Result<(), LinkError> {
        self.ensure_open()?;
        let next = self.transition(NegotiationInput::CreateOffer)?;
        if self.slots.is_empty() {
            return Err(LinkError::NoLocalMedia);
        }

        let offer = self.transport.create_offer().await?;
        self.state = next;
        info!("Sending offer to {}", self.remote);
        self.send_payload(&NegotiationPayload::Sdp(offer)).await
    }

    pub async fn handle_payload(&mut self, payload: NegotiationPayload) -> Result<(), LinkError> {
        self.ensure_open()?;
        match payload {
            NegotiationPayload::Sdp(desc) => match desc.kind {
                SdpKind::Offer => self.accept_offer(desc).await,
                SdpKind::Answer => self.accept_answer(desc).await,
            },
            NegotiationPayload::Ice(candidate) => self.add_remote_candidate(candidate).await,
        }
    }

    async fn accept_offer(&mut self, offer: SessionDescription) -> Result<(), LinkError> {
        let next = self.transition(NegotiationInput::RemoteOffer)?;

        self.transport.set_remote_description(offer).await?;
        self.remote_description_set = true;

        let answered = self.answer().await;
        self.drain_pending().await;
        self.state = next;
        answered
    }

    async fn answer(&mut self) -> Result<(), LinkError> {
        let answer = self.transport.create_answer().await?;
        info!("Sending answer to {}", self.remote);
        self.send_payload(&NegotiationPayload::Sdp(answer)).await
    }

    async fn accept_answer(&mut self, answer: SessionDescription) -> Result<(), LinkError> {
        let next = self.transition(NegotiationInput::RemoteAnswer)?;

        // A rejected answer leaves us waiting for a well-formed one.
        self.transport.set_remote_description(answer).await?;
        self.remote_description_set = true;
        self.state = next;
        debug!("Negotiation with {} settled", self.remote);

        self.drain_pending().await;
        Ok(())
    }

    async fn add_remote_candidate(&mut self, candidate: IceCandidate) -> Result<(), LinkError> {
        if !self.remote_description_set {
            debug!("Queueing candidate from {} until its description", self.remote);
            self.pending.push(candidate);
            return Ok(());
        }
        self.apply_candidate(candidate).await;
        Ok(())
    }

    /// One bad candidate never aborts the link.
    async fn apply_candidate(&self, candidate: IceCandidate) {
        if let Err(e) = self.transport.add_ice_candidate(candidate).await {
            warn!("Candidate from {} rejected: {:#}", self.remote, e);
        }
    }

    async fn drain_pending(&mut self) {
        let queued: Vec<_> = self.pending.drain().collect();
        if !queued.is_empty() {
            debug!("Applying {} queued candidates from {}", queued.len(), self.remote);
        }
        for candidate in queued {
            self.apply_candidate(candidate).await;
        }
    }

    /// Trickles a locally gathered candidate to the remote side.
    pub async fn send_candidate(&mut self, candidate: IceCandidate) -> Result<(), LinkError> {
        self.ensure_open()?;
        self.send_payload(&NegotiationPayload::Ice(candidate)).await
    }

    async fn send_payload(&self, payload: &NegotiationPayload) -> Result<(), LinkError> {
        let payload = payload.to_json().map_err(PayloadError::from)?;
        self.signals
            .send(ClientEvent::Signal {
                to_session_id: self.remote,
                payload,
            })
            .await?;
        Ok(())
    }

    pub fn record_remote_track(&mut self, track: RemoteTrack) {
        if !self.closed {
            self.remote_tracks.push(track);
        }
    }

    pub fn set_connection_state(&mut self, state: LinkConnectionState) {
        self.connection = state;
    }

    /// Tears the transport down and forgets queued candidates and inbound
    /// media. Idempotent.
    pub async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.pending.clear();
        self.remote_tracks.clear();
        self.slots.clear();
        self.connection = LinkConnectionState::Closed;

        if let Err(e) = self.transport.close().await {
            warn!("Closing transport towards {} failed: {:#}", self.remote, e);
        }
        info!("Link with {} closed", self.remote);
    }

    pub fn snapshot(&self) -> LinkSnapshot {
        let mut slots: Vec<_> = self
            .slots
            .iter()
            .map(|(kind, slot)| (*kind, slot.clone()))
            .collect();
        slots.sort_by_key(|(kind, _)| *kind == MediaKind::Video);

        LinkSnapshot {
            remote: self.remote,
            state: self.state,
            connection: self.connection,
            remote_description_set: self.remote_description_set,
            pending_candidates: self.pending.len(),
            slots,
            remote_tracks: self.remote_tracks.clone(),
            closed: self.closed,
        }
    }
}
