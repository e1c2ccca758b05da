use crate::integration::CallHarness;
use crate::utils::mock_media_source::MockMediaSource;
use crate::utils::mock_transport::TransportOp;
use huddle_core::{MediaKind, SessionId, TrackChange};
use huddle_peer::media::TrackSource;
use huddle_peer::{CallError, MediaError};

fn adds(op: &TransportOp, kind: MediaKind) -> bool {
    matches!(op, TransportOp::AddTrack { kind: k, .. } if *k == kind)
}

fn replaces(op: &TransportOp, kind: MediaKind) -> bool {
    matches!(op, TransportOp::ReplaceTrack { kind: k, .. } if *k == kind)
}

#[tokio::test]
async fn test_soft_mute_never_touches_the_slots() {
    let harness = CallHarness::start(MockMediaSource::new()).await;
    let (a, b) = (SessionId::new(), SessionId::new());
    harness.join_existing(&[a, b]).await;

    harness.handle.set_muted(MediaKind::Audio, true).await.unwrap();
    let snapshot = harness.snapshot().await;

    for peer in [a, b] {
        let link = snapshot.link(&peer).unwrap();
        assert_eq!(link.slots.len(), 2);
        let audio = link.slot(MediaKind::Audio).unwrap();
        assert!(!audio.enabled);
        assert!(!audio.track.is_live());
        assert!(link.slot(MediaKind::Video).unwrap().enabled);

        let transport = harness.transports.latest(&peer);
        assert_eq!(transport.count(|op| replaces(op, MediaKind::Audio)), 0);
        assert_eq!(transport.count(|op| adds(op, MediaKind::Audio)), 1);
    }
    assert_eq!(
        harness.sink.track_changes(),
        [TrackChange {
            kind: MediaKind::Audio,
            enabled: false
        }]
    );

    harness.handle.set_muted(MediaKind::Audio, false).await.unwrap();
    let snapshot = harness.snapshot().await;
    assert!(snapshot.link(&a).unwrap().slot(MediaKind::Audio).unwrap().enabled);
}

#[tokio::test]
async fn test_hard_disable_swaps_in_a_placeholder_and_back() {
    let harness = CallHarness::start(MockMediaSource::new()).await;
    let peer = SessionId::new();
    harness.join_existing(&[peer]).await;
    let camera = harness.media.acquired(MediaKind::Video)[0].clone();

    harness
        .handle
        .set_device_enabled(MediaKind::Video, false)
        .await
        .unwrap();
    let snapshot = harness.snapshot().await;

    assert!(camera.is_stopped());
    assert_eq!(snapshot.hard_disabled, [MediaKind::Video]);
    let slot = snapshot.link(&peer).unwrap().slot(MediaKind::Video).unwrap();
    assert!(slot.track.is_placeholder());

    harness
        .handle
        .set_device_enabled(MediaKind::Video, true)
        .await
        .unwrap();
    let snapshot = harness.snapshot().await;

    let fresh = harness.media.acquired(MediaKind::Video)[1].clone();
    let link = snapshot.link(&peer).unwrap();
    assert!(link.slot(MediaKind::Video).unwrap().track.same_as(&fresh));
    assert_eq!(link.slots.len(), 2);

    let transport = harness.transports.latest(&peer);
    assert_eq!(transport.count(|op| adds(op, MediaKind::Video)), 1);
    assert_eq!(transport.count(|op| replaces(op, MediaKind::Video)), 2);
    assert_eq!(
        harness.sink.track_changes(),
        [
            TrackChange {
                kind: MediaKind::Video,
                enabled: false
            },
            TrackChange {
                kind: MediaKind::Video,
                enabled: true
            },
        ]
    );
}

#[tokio::test]
async fn test_refused_reacquire_keeps_the_placeholder() {
    let harness = CallHarness::start(MockMediaSource::new()).await;
    let peer = SessionId::new();
    harness.join_existing(&[peer]).await;

    harness
        .handle
        .set_device_enabled(MediaKind::Audio, false)
        .await
        .unwrap();
    harness.media.deny(MediaKind::Audio);

    let err = harness
        .handle
        .set_device_enabled(MediaKind::Audio, true)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CallError::Media(MediaError::PermissionDenied(MediaKind::Audio))
    ));

    let snapshot = harness.snapshot().await;
    let slot = snapshot.link(&peer).unwrap().slot(MediaKind::Audio).unwrap();
    assert!(slot.track.is_placeholder());
    assert_eq!(harness.sink.track_changes().len(), 1);
}

#[tokio::test]
async fn test_links_built_after_a_change_start_from_the_new_state() {
    let harness = CallHarness::start(MockMediaSource::new()).await;
    harness.join_existing(&[]).await;

    harness
        .handle
        .set_device_enabled(MediaKind::Video, false)
        .await
        .unwrap();
    let newcomer = SessionId::new();
    let snapshot = harness.welcome_newcomer(&[], newcomer).await;

    let slot = snapshot
        .link(&newcomer)
        .unwrap()
        .slot(MediaKind::Video)
        .unwrap();
    assert!(slot.track.is_placeholder());
    let transport = harness.transports.latest(&newcomer);
    assert_eq!(transport.count(|op| replaces(op, MediaKind::Video)), 0);
}

#[tokio::test]
async fn test_screen_share_restores_the_camera() {
    let harness = CallHarness::start(MockMediaSource::new()).await;
    let peer = SessionId::new();
    harness.join_existing(&[peer]).await;
    let camera = harness.media.acquired(MediaKind::Video)[0].clone();

    harness.handle.start_screen_share().await.unwrap();
    let snapshot = harness.snapshot().await;
    assert!(snapshot.sharing_screen);
    let slot = snapshot.link(&peer).unwrap().slot(MediaKind::Video).unwrap();
    assert_eq!(slot.track.source(), TrackSource::Screen);
    let screen = slot.track.clone();

    harness.handle.stop_screen_share().await.unwrap();
    let snapshot = harness.snapshot().await;

    assert!(!snapshot.sharing_screen);
    assert!(screen.is_stopped());
    let link = snapshot.link(&peer).unwrap();
    assert!(link.slot(MediaKind::Video).unwrap().track.same_as(&camera));
    assert_eq!(link.slots.len(), 2);
    assert!(!camera.is_stopped());
}

#[tokio::test]
async fn test_screen_share_ending_restores_a_hard_disabled_camera_as_placeholder() {
    let harness = CallHarness::start(MockMediaSource::new()).await;
    let peer = SessionId::new();
    harness.join_existing(&[peer]).await;

    harness
        .handle
        .set_device_enabled(MediaKind::Video, false)
        .await
        .unwrap();
    harness.handle.start_screen_share().await.unwrap();
    harness.handle.stop_screen_share().await.unwrap();
    let snapshot = harness.snapshot().await;

    let slot = snapshot.link(&peer).unwrap().slot(MediaKind::Video).unwrap();
    assert!(slot.track.is_placeholder());
    assert_eq!(harness.media.acquired(MediaKind::Video).len(), 1);
}

#[tokio::test]
async fn test_screen_share_refusal_changes_nothing() {
    let harness = CallHarness::start(MockMediaSource::new()).await;
    let peer = SessionId::new();
    harness.join_existing(&[peer]).await;
    harness.media.deny_screen();

    let err = harness.handle.start_screen_share().await.unwrap_err();
    assert!(matches!(err, CallError::Media(MediaError::ScreenDenied)));

    let err = harness.handle.stop_screen_share().await.unwrap_err();
    assert!(matches!(err, CallError::Media(MediaError::NotSharing)));

    let snapshot = harness.snapshot().await;
    let slot = snapshot.link(&peer).unwrap().slot(MediaKind::Video).unwrap();
    assert_eq!(slot.track.source(), TrackSource::Camera);
}
