use crate::call::CallEvent;
use crate::error::LinkError;
use crate::link::{LinkSnapshot, PeerLink, RemoteTrack};
use crate::media::LocalTrack;
use crate::transport::{SignalSink, TransportEvent, TransportFactory};
use huddle_core::{IceServerConfig, MediaKind, NegotiationPayload, SessionId};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, warn};

pub enum LinkCommand {
    Offer,
    Signal(NegotiationPayload),
    Attach {
        track: LocalTrack,
        done: oneshot::Sender<()>,
    },
    SetEnabled {
        kind: MediaKind,
        enabled: bool,
        done: oneshot::Sender<()>,
    },
    Snapshot(oneshot::Sender<LinkSnapshot>),
    Close(oneshot::Sender<()>),
}

/// Everything a link task needs to build its transport.
pub struct LinkSetup {
    pub remote: SessionId,
    pub ice_servers: Vec<IceServerConfig>,
    /// Attached before any queued command runs.
    pub tracks: Vec<LocalTrack>,
    pub transports: Arc<dyn TransportFactory>,
    pub signals: Arc<dyn SignalSink>,
    pub events: mpsc::UnboundedSender<CallEvent>,
}

/// Mailbox of a running link task. Commands run one at a time in send order,
/// so a link never interleaves two negotiation steps.
pub struct LinkHandle {
    remote: SessionId,
    tx: mpsc::UnboundedSender<LinkCommand>,
}

impl LinkHandle {
    pub fn spawn(setup: LinkSetup) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let remote = setup.remote;
        tokio::spawn(run(setup, rx));
        Self { remote, tx }
    }

    pub fn remote(&self) -> SessionId {
        self.remote
    }

    fn send(&self, command: LinkCommand) {
        if self.tx.send(command).is_err() {
            debug!("Link with {} is gone", self.remote);
        }
    }

    pub fn offer(&self) {
        self.send(LinkCommand::Offer);
    }

    pub fn signal(&self, payload: NegotiationPayload) {
        self.send(LinkCommand::Signal(payload));
    }

    pub async fn attach(&self, track: LocalTrack) {
        let (done, rx) = oneshot::channel();
        self.send(LinkCommand::Attach { track, done });
        let _ = rx.await;
    }

    pub async fn set_enabled(&self, kind: MediaKind, enabled: bool) {
        let (done, rx) = oneshot::channel();
        self.send(LinkCommand::SetEnabled {
            kind,
            enabled,
            done,
        });
        let _ = rx.await;
    }

    /// `None` once the task has stopped.
    pub async fn snapshot(&self) -> Option<LinkSnapshot> {
        let (tx, rx) = oneshot::channel();
        self.send(LinkCommand::Snapshot(tx));
        rx.await.ok()
    }

    pub async fn close(&self) {
        let (done, rx) = oneshot::channel();
        self.send(LinkCommand::Close(done));
        let _ = rx.await;
    }
}

async fn run(setup: LinkSetup, mut commands: mpsc::UnboundedReceiver<LinkCommand>) {
    let LinkSetup {
        remote,
        ice_servers,
        tracks,
        transports,
        signals,
        events,
    } = setup;

    let (transport_tx, mut transport_rx) = mpsc::unbounded_channel();
    let transport = match transports.create(remote, &ice_servers, transport_tx).await {
        Ok(transport) => transport,
        Err(e) => {
            error!("Failed to create transport towards {}: {:#}", remote, e);
            let _ = events.send(CallEvent::LinkFailed {
                peer: remote,
                reason: format!("{e:#}"),
            });
            return;
        }
    };

    let mut link = PeerLink::new(remote, transport, signals);
    for track in tracks {
        if let Err(e) = link.attach_track(track).await {
            warn!("Failed to attach local track towards {}: {}", remote, e);
        }
    }

    loop {
        tokio::select! {
            biased;

            Some(event) = transport_rx.recv() => {
                on_transport_event(&mut link, event, &events).await;
            }

            command = commands.recv() => match command {
                Some(LinkCommand::Close(done)) => {
                    link.close().await;
                    let _ = done.send(());
                    break;
                }
                Some(command) => on_command(&mut link, command).await,
                None => {
                    link.close().await;
                    break;
                }
            },
        }
    }
}

async fn on_command(link: &mut PeerLink, command: LinkCommand) {
    match command {
        LinkCommand::Offer => {
            if let Err(e) = link.create_offer().await {
                report(link, "offer", e);
            }
        }
        LinkCommand::Signal(payload) => {
            if let Err(e) = link.handle_payload(payload).await {
                report(link, "signal", e);
            }
        }
        LinkCommand::Attach { track, done } => {
            if let Err(e) = link.attach_track(track).await {
                report(link, "track swap", e);
            }
            let _ = done.send(());
        }
        LinkCommand::SetEnabled {
            kind,
            enabled,
            done,
        } => {
            link.set_slot_enabled(kind, enabled);
            let _ = done.send(());
        }
        LinkCommand::Snapshot(tx) => {
            let _ = tx.send(link.snapshot());
        }
        LinkCommand::Close(done) => {
            link.close().await;
            let _ = done.send(());
        }
    }
}

fn report(link: &PeerLink, what: &str, e: LinkError) {
    match e {
        LinkError::OutOfState { .. } | LinkError::NoLocalMedia | LinkError::Closed => {
            debug!("Dropped {} for {}: {}", what, link.remote(), e)
        }
        _ => warn!("{} for {} failed: {}", what, link.remote(), e),
    }
}

async fn on_transport_event(
    link: &mut PeerLink,
    event: TransportEvent,
    events: &mpsc::UnboundedSender<CallEvent>,
) {
    let peer = link.remote();
    match event {
        TransportEvent::CandidateGenerated(candidate) => {
            if let Err(e) = link.send_candidate(candidate).await {
                report(link, "local candidate", e);
            }
        }
        TransportEvent::RemoteTrack { track_id, kind } => {
            link.record_remote_track(RemoteTrack {
                track_id: track_id.clone(),
                kind,
            });
            let _ = events.send(CallEvent::RemoteTrack {
                peer,
                track_id,
                kind,
            });
        }
        TransportEvent::StateChanged(state) => {
            link.set_connection_state(state);
            let _ = events.send(CallEvent::LinkState { peer, state });
        }
    }
}
