use super::link_fixture;
use crate::utils::mock_transport::{REJECTED_SDP, TransportOp};
use huddle_core::{MediaKind, NegotiationPayload, SdpKind, SessionDescription};
use huddle_peer::LinkError;
use huddle_peer::link::{NegotiationInput, NegotiationState};
use huddle_peer::media::{LocalTrack, TrackSource};

fn mic() -> LocalTrack {
    LocalTrack::new(MediaKind::Audio, TrackSource::Microphone)
}

#[tokio::test]
async fn test_no_offer_without_local_media() {
    let mut f = link_fixture();

    let err = f.link.create_offer().await.unwrap_err();

    assert!(matches!(err, LinkError::NoLocalMedia));
    assert_eq!(f.link.state(), NegotiationState::Stable);
    assert_eq!(f.transport.count(|op| *op == TransportOp::CreateOffer), 0);
    assert!(f.sink.sent().is_empty());
}

#[tokio::test]
async fn test_one_offer_at_a_time() {
    let mut f = link_fixture();
    f.link.attach_track(mic()).await.unwrap();

    f.link.create_offer().await.unwrap();
    let err = f.link.create_offer().await.unwrap_err();

    assert!(matches!(
        err,
        LinkError::OutOfState {
            state: NegotiationState::HaveLocalOffer,
            input: NegotiationInput::CreateOffer,
        }
    ));
    assert_eq!(f.transport.count(|op| *op == TransportOp::CreateOffer), 1);
    assert_eq!(f.sink.sdp_to(&f.remote, SdpKind::Offer), 1);
}

#[tokio::test]
async fn test_remote_offer_is_dropped_while_our_offer_is_out() {
    let mut f = link_fixture();
    f.link.attach_track(mic()).await.unwrap();
    f.link.create_offer().await.unwrap();

    let result = f
        .link
        .handle_payload(NegotiationPayload::Sdp(SessionDescription::offer("v=0 glare")))
        .await;

    assert!(matches!(result, Err(LinkError::OutOfState { .. })));
    assert_eq!(f.link.state(), NegotiationState::HaveLocalOffer);
    assert_eq!(f.transport.count(|op| matches!(op, TransportOp::SetRemote(_))), 0);
    assert_eq!(f.sink.sdp_to(&f.remote, SdpKind::Answer), 0);
}

#[tokio::test]
async fn test_unsolicited_answer_is_dropped() {
    let mut f = link_fixture();

    let result = f
        .link
        .handle_payload(NegotiationPayload::Sdp(SessionDescription::answer("v=0 stray")))
        .await;

    assert!(matches!(result, Err(LinkError::OutOfState { .. })));
    assert_eq!(f.link.state(), NegotiationState::Stable);
    assert!(f.transport.ops().is_empty());
}

#[tokio::test]
async fn test_malformed_answer_keeps_waiting_for_a_good_one() {
    let mut f = link_fixture();
    f.link.attach_track(mic()).await.unwrap();
    f.link.create_offer().await.unwrap();

    let result = f
        .link
        .handle_payload(NegotiationPayload::Sdp(SessionDescription::answer(REJECTED_SDP)))
        .await;
    assert!(matches!(result, Err(LinkError::Transport(_))));
    assert_eq!(f.link.state(), NegotiationState::HaveLocalOffer);

    f.link
        .handle_payload(NegotiationPayload::Sdp(SessionDescription::answer("v=0 fine")))
        .await
        .unwrap();
    assert_eq!(f.link.state(), NegotiationState::Stable);
}

#[tokio::test]
async fn test_a_second_track_of_a_kind_replaces_the_first() {
    let mut f = link_fixture();
    let first = mic();
    let second = mic();

    f.link.attach_track(first.clone()).await.unwrap();
    f.link.attach_track(second.clone()).await.unwrap();

    assert_eq!(f.link.slot_count(), 1);
    assert!(f.link.slot(MediaKind::Audio).unwrap().track.same_as(&second));
    assert_eq!(
        f.transport.ops(),
        [
            TransportOp::AddTrack {
                kind: MediaKind::Audio,
                track_id: first.id().to_owned(),
            },
            TransportOp::ReplaceTrack {
                kind: MediaKind::Audio,
                track_id: second.id().to_owned(),
            },
        ]
    );
}

#[tokio::test]
async fn test_soft_mute_only_flips_the_slot_flag() {
    let mut f = link_fixture();
    f.link.attach_track(mic()).await.unwrap();

    f.link.set_slot_enabled(MediaKind::Audio, false);

    let slot = f.link.slot(MediaKind::Audio).unwrap();
    assert!(!slot.enabled);
    assert_eq!(f.link.slot_count(), 1);
    assert_eq!(f.transport.ops().len(), 1);
}
