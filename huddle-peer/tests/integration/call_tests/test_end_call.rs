use crate::integration::CallHarness;
use crate::utils::mock_media_source::MockMediaSource;
use huddle_core::{ClientEvent, SessionId};
use huddle_peer::{CallError, CallEvent};

#[tokio::test]
async fn test_ending_leaves_the_room_and_releases_everything() {
    let mut harness = CallHarness::start(MockMediaSource::new()).await;
    let (a, b) = (SessionId::new(), SessionId::new());
    let snapshot = harness.join_existing(&[a, b]).await;
    let tracks = snapshot.local_tracks;
    assert_eq!(tracks.len(), 2);

    harness.handle.end().await;

    assert_eq!(harness.sink.sent().last(), Some(&ClientEvent::LeaveCall {}));
    for peer in [a, b] {
        assert!(harness.transports.latest(&peer).is_closed());
    }
    assert!(tracks.iter().all(|t| t.is_stopped()));
    harness.next_event(|e| matches!(e, CallEvent::Ended)).await;

    let err = harness.handle.snapshot().await.unwrap_err();
    assert!(matches!(err, CallError::Ended));
}

#[tokio::test]
async fn test_losing_the_relay_tears_links_down_without_leaving() {
    let harness = CallHarness::start(MockMediaSource::new()).await;
    let peer = SessionId::new();
    harness.join_existing(&[peer]).await;

    let CallHarness {
        handle,
        mut events,
        server,
        sink,
        transports,
        ..
    } = harness;
    drop(server);

    loop {
        match events.recv().await {
            Some(CallEvent::Ended) => break,
            Some(_) => continue,
            None => panic!("call stopped without reporting the end"),
        }
    }

    assert!(transports.latest(&peer).is_closed());
    assert!(!sink.sent().contains(&ClientEvent::LeaveCall {}));
    drop(handle);
}
