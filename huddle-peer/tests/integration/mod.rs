use crate::utils::mock_media_source::MockMediaSource;
use crate::utils::mock_signal_sink::MockSignalSink;
use crate::utils::mock_transport::MockTransportFactory;
use huddle_core::{Member, ServerEvent, SessionId};
use huddle_peer::{Call, CallEvent, CallHandle, CallPorts, CallSnapshot, PeerConfig};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;


pub const ROOM_URL: &str = "https://meet.example/room/standup";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("huddle_peer=debug")
        .with_test_writer()
        .try_init();
}

pub fn member(id: SessionId, name: &str) -> Member {
    Member {
        id,
        name: name.to_owned(),
    }
}

/// A call wired to mocks, already welcomed by the relay as `me`.
pub struct CallHarness {
    pub me: SessionId,
    pub handle: CallHandle,
    pub events: mpsc::UnboundedReceiver<CallEvent>,
    pub server: mpsc::UnboundedSender<ServerEvent>,
    pub sink: Arc<MockSignalSink>,
    pub transports: Arc<MockTransportFactory>,
    pub media: Arc<MockMediaSource>,
}

impl CallHarness {
    pub async fn start(media: MockMediaSource) -> Self {
        Self::with_config(media, PeerConfig::default()).await
    }

    pub async fn with_config(media: MockMediaSource, config: PeerConfig) -> Self {
        init_tracing();

        let sink = Arc::new(MockSignalSink::new());
        let transports = Arc::new(MockTransportFactory::new());
        let media = Arc::new(media);
        let (server, server_rx) = mpsc::unbounded_channel();

        let (handle, events) = Call::spawn(
            ROOM_URL,
            "Tester",
            config,
            CallPorts {
                signals: sink.clone(),
                transports: transports.clone(),
                media: media.clone(),
            },
            server_rx,
        );

        let me = SessionId::new();
        server
            .send(ServerEvent::Welcome {
                session_id: me,
                ice_servers: vec![],
            })
            .unwrap();

        let harness = Self {
            me,
            handle,
            events,
            server,
            sink,
            transports,
            media,
        };
        harness.snapshot().await;
        harness
    }

    pub fn push(&self, event: ServerEvent) {
        self.server.send(event).unwrap();
    }

    /// Round-trips through the call and every link, so everything pushed
    /// before has been handled.
    pub async fn snapshot(&self) -> CallSnapshot {
        self.handle.snapshot().await.expect("call is running")
    }

    /// Joins a room that already holds `others` (we are the joiner).
    pub async fn join_existing(&self, others: &[SessionId]) -> CallSnapshot {
        let mut member_ids = others.to_vec();
        member_ids.push(self.me);
        let members = member_ids
            .iter()
            .enumerate()
            .map(|(i, id)| member(*id, &format!("user-{i}")))
            .collect();

        self.push(ServerEvent::UserJoined {
            session_id: self.me,
            member_ids,
            members,
        });
        self.snapshot().await
    }

    /// Joins an empty room, then lets `newcomer` arrive after us.
    pub async fn welcome_newcomer(&self, present: &[SessionId], newcomer: SessionId) -> CallSnapshot {
        let mut member_ids = vec![self.me];
        member_ids.extend_from_slice(present);
        member_ids.push(newcomer);
        let members = member_ids
            .iter()
            .enumerate()
            .map(|(i, id)| member(*id, &format!("user-{i}")))
            .collect();

        self.push(ServerEvent::UserJoined {
            session_id: newcomer,
            member_ids,
            members,
        });
        self.snapshot().await
    }

    pub async fn next_event(&mut self, pred: impl Fn(&CallEvent) -> bool) -> CallEvent {
        loop {
            let event = timeout(Duration::from_secs(2), self.events.recv())
                .await
                .expect("timed out waiting for call event")
                .expect("event channel closed");
            if pred(&event) {
                return event;
            }
        }
    }
}
