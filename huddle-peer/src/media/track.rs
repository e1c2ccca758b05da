use huddle_core::MediaKind;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use uuid::Uuid;
use webrtc::api::media_engine::{MIME_TYPE_OPUS, MIME_TYPE_VP8};
use webrtc::media::Sample;
use webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

const LOCAL_STREAM_ID: &str = "huddle-local";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackSource {
    Microphone,
    Camera,
    Screen,
    /// Drops every sample written to it: peers see a silent/blank track.
    Placeholder,
}

struct TrackInner {
    id: String,
    kind: MediaKind,
    source: TrackSource,
    enabled: AtomicBool,
    stopped: AtomicBool,
    rtp: Arc<TrackLocalStaticSample>,
}

/// A locally produced track. Clones share state, so the same track can sit in
/// a sender slot of every link at once.
#[derive(Clone)]
pub struct LocalTrack {
    inner: Arc<TrackInner>,
}

impl LocalTrack {
    pub fn new(kind: MediaKind, source: TrackSource) -> Self {
        let id = format!("{kind}-{}", Uuid::new_v4());
        let rtp = Arc::new(TrackLocalStaticSample::new(
            codec_for(kind),
            id.clone(),
            LOCAL_STREAM_ID.to_owned(),
        ));

        Self {
            inner: Arc::new(TrackInner {
                id,
                kind,
                source,
                enabled: AtomicBool::new(source != TrackSource::Placeholder),
                stopped: AtomicBool::new(false),
                rtp,
            }),
        }
    }

    pub fn placeholder(kind: MediaKind) -> Self {
        Self::new(kind, TrackSource::Placeholder)
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn kind(&self) -> MediaKind {
        self.inner.kind
    }

    pub fn source(&self) -> TrackSource {
        self.inner.source
    }

    pub fn is_placeholder(&self) -> bool {
        self.inner.source == TrackSource::Placeholder
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.enabled.load(Ordering::Acquire)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.inner.enabled.store(enabled, Ordering::Release);
    }

    /// Releases the capture device. A stopped track stays stopped.
    pub fn stop(&self) {
        self.inner.stopped.store(true, Ordering::Release);
        self.set_enabled(false);
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.stopped.load(Ordering::Acquire)
    }

    /// Whether samples written now reach the wire.
    pub fn is_live(&self) -> bool {
        !self.is_placeholder() && !self.is_stopped() && self.is_enabled()
    }

    /// Feeds one captured sample to every link this track is attached to.
    ///
    /// Muted, stopped and placeholder tracks drop the sample and return
    /// `Ok(false)`, so a paused producer is never needed.
    pub async fn write_sample(&self, sample: &Sample) -> anyhow::Result<bool> {
        if !self.is_live() {
            return Ok(false);
        }
        self.inner.rtp.write_sample(sample).await?;
        Ok(true)
    }

    pub(crate) fn rtp_track(&self) -> Arc<TrackLocalStaticSample> {
        self.inner.rtp.clone()
    }

    pub fn same_as(&self, other: &LocalTrack) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for LocalTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalTrack")
            .field("id", &self.inner.id)
            .field("kind", &self.inner.kind)
            .field("source", &self.inner.source)
            .field("enabled", &self.is_enabled())
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

fn codec_for(kind: MediaKind) -> RTCRtpCodecCapability {
    match kind {
        MediaKind::Audio => RTCRtpCodecCapability {
            mime_type: MIME_TYPE_OPUS.to_owned(),
            clock_rate: 48000,
            channels: 2,
            ..Default::default()
        },
        MediaKind::Video => RTCRtpCodecCapability {
            mime_type: MIME_TYPE_VP8.to_owned(),
            clock_rate: 90000,
            ..Default::default()
        },
    }
}
