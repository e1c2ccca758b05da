use crate::config::PeerConfig;
use crate::error::{CallError, Capture, MediaError};
use crate::link::{LinkHandle, LinkSetup, LinkSnapshot};
use crate::media::{LocalMedia, LocalTrack, MediaSource, SlotChange, TrackController, TrackUpdate};
use crate::transport::{LinkConnectionState, SignalSink, TransportFactory};
use futures::future::join_all;
use huddle_core::{
    ClientEvent, JoinRequest, MediaKind, Member, NegotiationPayload, ServerEvent, SessionId,
    TrackChange,
};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

/// What the call reports to the application.
#[derive(Debug, Clone)]
pub enum CallEvent {
    Joined {
        session_id: SessionId,
    },
    Members(Vec<Member>),
    PeerJoined {
        peer: SessionId,
    },
    PeerLeft {
        peer: SessionId,
    },
    Chat {
        from: SessionId,
        sender: String,
        data: String,
        own: bool,
    },
    RemoteTrackChange {
        peer: SessionId,
        change: TrackChange,
    },
    RemoteTrack {
        peer: SessionId,
        track_id: String,
        kind: MediaKind,
    },
    LinkState {
        peer: SessionId,
        state: LinkConnectionState,
    },
    LinkFailed {
        peer: SessionId,
        reason: String,
    },
    MediaUnavailable(MediaError),
    Ended,
}

/// Collaborators the call talks through.
#[derive(Clone)]
pub struct CallPorts {
    pub signals: Arc<dyn SignalSink>,
    pub transports: Arc<dyn TransportFactory>,
    pub media: Arc<dyn MediaSource>,
}

#[derive(Debug, Clone)]
pub struct CallSnapshot {
    pub session_id: Option<SessionId>,
    pub members: Vec<Member>,
    /// Ordered by remote session id.
    pub links: Vec<LinkSnapshot>,
    pub local_tracks: Vec<LocalTrack>,
    pub hard_disabled: Vec<MediaKind>,
    pub sharing_screen: bool,
    /// Peers we never offered to for lack of media; reset them once media exists.
    pub deferred_offers: Vec<SessionId>,
}

impl CallSnapshot {
    pub fn link(&self, peer: &SessionId) -> Option<&LinkSnapshot> {
        self.links.iter().find(|link| link.remote == *peer)
    }
}

enum CallCommand {
    SetMuted {
        kind: MediaKind,
        muted: bool,
        reply: oneshot::Sender<Result<(), MediaError>>,
    },
    SetDeviceEnabled {
        kind: MediaKind,
        enabled: bool,
        reply: oneshot::Sender<Result<(), MediaError>>,
    },
    StartScreenShare(oneshot::Sender<Result<(), MediaError>>),
    StopScreenShare(oneshot::Sender<Result<(), MediaError>>),
    SendChat(String),
    ResetLink(SessionId),
    Recreate(SessionId),
    Acquired {
        capture: Capture,
        result: Result<LocalTrack, MediaError>,
        reply: oneshot::Sender<Result<(), MediaError>>,
    },
    Snapshot(oneshot::Sender<CallSnapshot>),
    End(oneshot::Sender<()>),
}

/// Application side of a running call. Dropping every handle ends the call.
#[derive(Clone)]
pub struct CallHandle {
    tx: mpsc::UnboundedSender<CallCommand>,
}

impl CallHandle {
    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> CallCommand,
    ) -> Result<T, CallError> {
        let (tx, rx) = oneshot::channel();
        self.tx.send(make(tx)).map_err(|_| CallError::Ended)?;
        rx.await.map_err(|_| CallError::Ended)
    }

    /// Soft mute/unmute. The track stays in every link's slot.
    pub async fn set_muted(&self, kind: MediaKind, muted: bool) -> Result<(), CallError> {
        self.request(|reply| CallCommand::SetMuted { kind, muted, reply })
            .await??;
        Ok(())
    }

    /// Hard toggle: releases or reacquires the capture device. Links keep
    /// negotiating while the capture prompt is open; a second toggle of the
    /// same kind meanwhile fails with [`MediaError::CapturePending`].
    pub async fn set_device_enabled(&self, kind: MediaKind, enabled: bool) -> Result<(), CallError> {
        self.request(|reply| CallCommand::SetDeviceEnabled {
            kind,
            enabled,
            reply,
        })
        .await??;
        Ok(())
    }

    pub async fn start_screen_share(&self) -> Result<(), CallError> {
        self.request(CallCommand::StartScreenShare).await??;
        Ok(())
    }

    /// Also what to call when the captured surface goes away on its own.
    pub async fn stop_screen_share(&self) -> Result<(), CallError> {
        self.request(CallCommand::StopScreenShare).await??;
        Ok(())
    }

    pub fn send_chat(&self, text: impl Into<String>) -> Result<(), CallError> {
        self.tx
            .send(CallCommand::SendChat(text.into()))
            .map_err(|_| CallError::Ended)
    }

    /// Tears the link to `peer` down and rebuilds it after the reset delay.
    pub fn reset_link(&self, peer: SessionId) -> Result<(), CallError> {
        self.tx
            .send(CallCommand::ResetLink(peer))
            .map_err(|_| CallError::Ended)
    }

    pub async fn snapshot(&self) -> Result<CallSnapshot, CallError> {
        self.request(CallCommand::Snapshot).await
    }

    /// Leaves the room, closes every link and stops every local track.
    pub async fn end(&self) {
        let _ = self.request(CallCommand::End).await;
    }
}

/// Single owner of the link table and the local track set.
pub struct Call {
    room_url: String,
    name: String,
    config: PeerConfig,
    session_id: Option<SessionId>,
    members: Vec<Member>,
    links: HashMap<SessionId, LinkHandle>,
    /// Links that skipped their offer for lack of local media. Only a reset
    /// offers again.
    deferred_offers: BTreeSet<SessionId>,
    tracks: TrackController,
    media: Arc<dyn MediaSource>,
    /// Captures running off the actor; at most one per device.
    capturing: HashSet<Capture>,
    signals: Arc<dyn SignalSink>,
    transports: Arc<dyn TransportFactory>,
    events: mpsc::UnboundedSender<CallEvent>,
    commands: mpsc::WeakUnboundedSender<CallCommand>,
}

impl Call {
    /// Acquires local media, then joins `room_url` as soon as the relay's
    /// `welcome` arrives on `server_events`.
    pub fn spawn(
        room_url: impl Into<String>,
        name: impl Into<String>,
        config: PeerConfig,
        ports: CallPorts,
        server_events: mpsc::UnboundedReceiver<ServerEvent>,
    ) -> (CallHandle, mpsc::UnboundedReceiver<CallEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let room_url = room_url.into();
        let name = name.into();
        let commands = tx.downgrade();

        tokio::spawn(async move {
            let (media, refused) = LocalMedia::acquire(ports.media.as_ref()).await;
            for e in refused {
                let _ = events_tx.send(CallEvent::MediaUnavailable(e));
            }

            let call = Call {
                room_url,
                name,
                config,
                session_id: None,
                members: Vec::new(),
                links: HashMap::new(),
                deferred_offers: BTreeSet::new(),
                tracks: TrackController::new(media),
                media: ports.media,
                capturing: HashSet::new(),
                signals: ports.signals,
                transports: ports.transports,
                events: events_tx,
                commands,
            };
            call.run(rx, server_events).await;
        });

        (CallHandle { tx }, events_rx)
    }

    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<CallCommand>,
        mut server_events: mpsc::UnboundedReceiver<ServerEvent>,
    ) {
        loop {
            tokio::select! {
                biased;

                event = server_events.recv() => match event {
                    Some(event) => self.on_server_event(event).await,
                    None => {
                        warn!("Relay connection lost, tearing the call down");
                        self.teardown(false).await;
                        break;
                    }
                },

                command = commands.recv() => match command {
                    Some(CallCommand::End(done)) => {
                        self.teardown(true).await;
                        let _ = done.send(());
                        break;
                    }
                    Some(command) => self.on_command(command).await,
                    None => {
                        self.teardown(true).await;
                        break;
                    }
                },
            }
        }

        // Captures that finished after the call ended.
        commands.close();
        while let Ok(command) = commands.try_recv() {
            if let CallCommand::Acquired {
                result: Ok(track), ..
            } = command
            {
                track.stop();
            }
        }
    }

    fn emit(&self, event: CallEvent) {
        let _ = self.events.send(event);
    }

    async fn send(&self, event: ClientEvent) {
        if let Err(e) = self.signals.send(event).await {
            warn!("Failed to reach the relay: {:#}", e);
        }
    }

    async fn on_server_event(&mut self, event: ServerEvent) {
        match event {
            ServerEvent::Welcome {
                session_id,
                ice_servers,
            } => {
                info!("Relay assigned session {}", session_id);
                self.session_id = Some(session_id);
                if !ice_servers.is_empty() {
                    self.config.ice_servers = ice_servers;
                }
                self.emit(CallEvent::Joined { session_id });
                self.send(ClientEvent::JoinCall(JoinRequest::Named {
                    url: self.room_url.clone(),
                    name: Some(self.name.clone()),
                }))
                .await;
            }

            ServerEvent::UserJoined {
                session_id: joined,
                member_ids,
                members,
            } => {
                self.members = members;
                self.on_user_joined(joined, member_ids);
                self.emit(CallEvent::Members(self.members.clone()));
            }

            ServerEvent::UserList { members } => {
                self.members = members;
                self.emit(CallEvent::Members(self.members.clone()));
            }

            ServerEvent::UserLeft {
                session_id: left,
                members,
            } => {
                self.members = members;
                self.deferred_offers.remove(&left);
                if let Some(link) = self.links.remove(&left) {
                    link.close().await;
                }
                self.emit(CallEvent::PeerLeft { peer: left });
                self.emit(CallEvent::Members(self.members.clone()));
            }

            ServerEvent::Signal {
                from_session_id,
                payload,
            } => self.on_signal(from_session_id, &payload),

            ServerEvent::ChatMessage {
                data,
                sender,
                sender_session_id,
            } => self.emit(CallEvent::Chat {
                from: sender_session_id,
                own: Some(sender_session_id) == self.session_id,
                sender,
                data,
            }),

            ServerEvent::TrackChange {
                from_session_id,
                change,
            } => self.emit(CallEvent::RemoteTrackChange {
                peer: from_session_id,
                change,
            }),
        }
    }

    /// Builds a link for every listed member that has none. Only the joiner
    /// offers, so two members never offer to each other at once.
    fn on_user_joined(&mut self, joined: SessionId, member_ids: Vec<SessionId>) {
        let Some(me) = self.session_id else {
            debug!("Ignoring user-joined before welcome");
            return;
        };

        let created: Vec<_> = member_ids
            .into_iter()
            .filter(|id| *id != me && !self.links.contains_key(id))
            .collect();
        for peer in &created {
            self.create_link(*peer);
        }

        if joined == me {
            for peer in created {
                self.offer(peer);
            }
        } else {
            self.emit(CallEvent::PeerJoined { peer: joined });
        }
    }

    fn create_link(&mut self, peer: SessionId) {
        debug!("Creating link with {}", peer);
        let link = LinkHandle::spawn(LinkSetup {
            remote: peer,
            ice_servers: self.config.ice_servers.clone(),
            tracks: self.tracks.media().outgoing_tracks(),
            transports: self.transports.clone(),
            signals: self.signals.clone(),
            events: self.events.clone(),
        });
        self.links.insert(peer, link);
    }

    fn offer(&mut self, peer: SessionId) {
        let Some(link) = self.links.get(&peer) else {
            return;
        };
        if self.tracks.media().has_tracks() {
            link.offer();
        } else {
            debug!("No local media yet, deferring offer to {}", peer);
            self.deferred_offers.insert(peer);
        }
    }

    fn on_signal(&self, from: SessionId, raw: &str) {
        if Some(from) == self.session_id {
            return;
        }
        let payload = match NegotiationPayload::parse(raw) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Dropping malformed payload from {}: {}", from, e);
                return;
            }
        };
        match self.links.get(&from) {
            Some(link) => link.signal(payload),
            None => debug!("Dropping signal from {}: no link", from),
        }
    }

    async fn on_command(&mut self, command: CallCommand) {
        match command {
            CallCommand::SetMuted { kind, muted, reply } => {
                let result = self.tracks.set_muted(kind, muted);
                let _ = reply.send(self.apply_result(result).await);
            }
            CallCommand::SetDeviceEnabled {
                kind,
                enabled,
                reply,
            } => {
                let capture = Capture::Device(kind);
                if self.capturing.contains(&capture) {
                    let _ = reply.send(Err(MediaError::CapturePending(capture)));
                } else if !enabled {
                    let update = self.tracks.disable_device(kind);
                    self.apply(update).await;
                    let _ = reply.send(Ok(()));
                } else if self.tracks.needs_device(kind) {
                    self.capture(capture, reply);
                } else {
                    let _ = reply.send(Ok(()));
                }
            }
            CallCommand::StartScreenShare(reply) => {
                if self.capturing.contains(&Capture::Screen) {
                    let _ = reply.send(Err(MediaError::CapturePending(Capture::Screen)));
                } else {
                    match self.tracks.can_share_screen() {
                        Ok(()) => self.capture(Capture::Screen, reply),
                        Err(e) => {
                            let _ = reply.send(Err(e));
                        }
                    }
                }
            }
            CallCommand::StopScreenShare(reply) => {
                let result = self.tracks.stop_screen_share();
                let _ = reply.send(self.apply_result(result).await);
            }
            CallCommand::SendChat(data) => {
                self.send(ClientEvent::ChatMessage {
                    data,
                    sender: self.name.clone(),
                })
                .await;
            }
            CallCommand::ResetLink(peer) => self.reset_link(peer).await,
            CallCommand::Recreate(peer) => self.recreate_link(peer),
            CallCommand::Acquired {
                capture,
                result,
                reply,
            } => {
                self.capturing.remove(&capture);
                let result = match (capture, result) {
                    (_, Err(e)) => Err(e),
                    (Capture::Device(kind), Ok(track)) => {
                        Ok(self.tracks.install_device(kind, track))
                    }
                    (Capture::Screen, Ok(track)) => self.tracks.install_screen(track),
                };
                let _ = reply.send(self.apply_result(result).await);
            }
            CallCommand::Snapshot(reply) => {
                let _ = reply.send(self.snapshot().await);
            }
            CallCommand::End(done) => {
                self.teardown(true).await;
                let _ = done.send(());
            }
        }
    }

    async fn apply_result(
        &mut self,
        result: Result<TrackUpdate, MediaError>,
    ) -> Result<(), MediaError> {
        match result {
            Ok(update) => {
                self.apply(update).await;
                Ok(())
            }
            Err(e) => {
                warn!("Local media change refused: {}", e);
                Err(e)
            }
        }
    }

    /// Runs the capture prompt in its own task and posts the track back as
    /// [`CallCommand::Acquired`]. A track nobody is left to install is stopped.
    fn capture(&mut self, capture: Capture, reply: oneshot::Sender<Result<(), MediaError>>) {
        debug!("Capturing {}", capture);
        self.capturing.insert(capture);
        let media = self.media.clone();
        let commands = self.commands.clone();

        tokio::spawn(async move {
            let result = match capture {
                Capture::Device(kind) => media.acquire(kind).await,
                Capture::Screen => media.acquire_screen().await,
            };
            let command = CallCommand::Acquired {
                capture,
                result,
                reply,
            };
            let undelivered = match commands.upgrade() {
                Some(tx) => tx.send(command).err().map(|e| e.0),
                None => Some(command),
            };
            if let Some(CallCommand::Acquired {
                result: Ok(track), ..
            }) = undelivered
            {
                track.stop();
            }
        });
    }

    /// Pushes a track change to every open link and waits until each one has
    /// applied it, then tells the room.
    async fn apply(&mut self, update: TrackUpdate) {
        if update.is_noop() {
            return;
        }
        match update.slot {
            Some(SlotChange::Enabled { kind, enabled }) => {
                join_all(
                    self.links
                        .values()
                        .map(|link| link.set_enabled(kind, enabled)),
                )
                .await;
            }
            Some(SlotChange::Replaced(track)) => {
                join_all(self.links.values().map(|link| link.attach(track.clone()))).await;
            }
            None => {}
        }

        if let Some(change) = update.notice {
            if self.session_id.is_some() {
                self.send(ClientEvent::TrackChange(change)).await;
            }
        }
    }

    async fn reset_link(&mut self, peer: SessionId) {
        if let Some(link) = self.links.remove(&peer) {
            info!("Resetting link with {}", peer);
            link.close().await;
        }
        self.deferred_offers.remove(&peer);

        let commands = self.commands.clone();
        let delay = self.config.reset_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(tx) = commands.upgrade() {
                let _ = tx.send(CallCommand::Recreate(peer));
            }
        });
    }

    /// Second half of a reset. Skipped when something else already rebuilt
    /// the link or the peer has left meanwhile.
    fn recreate_link(&mut self, peer: SessionId) {
        if self.links.contains_key(&peer) {
            debug!("Link with {} already rebuilt", peer);
            return;
        }
        if !self.members.iter().any(|member| member.id == peer) {
            debug!("{} left before its link could be rebuilt", peer);
            return;
        }
        self.create_link(peer);
        self.offer(peer);
    }

    async fn snapshot(&self) -> CallSnapshot {
        let mut peers: Vec<_> = self.links.keys().copied().collect();
        peers.sort();

        let mut links = Vec::with_capacity(peers.len());
        for peer in peers {
            let Some(link) = self.links.get(&peer) else {
                continue;
            };
            if let Some(snapshot) = link.snapshot().await {
                links.push(snapshot);
            }
        }

        let media = self.tracks.media();
        CallSnapshot {
            session_id: self.session_id,
            members: self.members.clone(),
            links,
            local_tracks: media.outgoing_tracks(),
            hard_disabled: MediaKind::ALL
                .into_iter()
                .filter(|kind| media.is_hard_disabled(*kind))
                .collect(),
            sharing_screen: media.is_sharing_screen(),
            deferred_offers: self.deferred_offers.iter().copied().collect(),
        }
    }

    async fn close_all_links(&mut self) {
        let links: Vec<_> = self.links.drain().map(|(_, link)| link).collect();
        join_all(links.iter().map(LinkHandle::close)).await;
    }

    /// `leave` is false when the relay is already gone.
    async fn teardown(&mut self, leave: bool) {
        if leave && self.session_id.is_some() {
            self.send(ClientEvent::LeaveCall {}).await;
        }
        self.close_all_links().await;
        self.deferred_offers.clear();
        self.capturing.clear();
        self.tracks.stop_all();
        info!("Call ended");
        self.emit(CallEvent::Ended);
    }
}
