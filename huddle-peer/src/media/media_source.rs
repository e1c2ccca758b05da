use crate::error::MediaError;
use crate::media::{LocalTrack, TrackSource};
use async_trait::async_trait;
use huddle_core::MediaKind;

/// Capture devices. Acquisition may suspend (permission prompts) and may be
/// refused; a refusal only disables that kind locally.
#[async_trait]
pub trait MediaSource: Send + Sync {
    async fn acquire(&self, kind: MediaKind) -> Result<LocalTrack, MediaError>;

    async fn acquire_screen(&self) -> Result<LocalTrack, MediaError>;
}

/// Hands out sample-fed tracks for the kinds it was built with. Useful for
/// headless participants whose samples come from files or generators.
#[derive(Debug, Clone)]
pub struct StaticMediaSource {
    audio: bool,
    video: bool,
    screen: bool,
}

impl StaticMediaSource {
    pub fn new(audio: bool, video: bool) -> Self {
        Self {
            audio,
            video,
            screen: false,
        }
    }

    pub fn with_screen(mut self) -> Self {
        self.screen = true;
        self
    }
}

#[async_trait]
impl MediaSource for StaticMediaSource {
    async fn acquire(&self, kind: MediaKind) -> Result<LocalTrack, MediaError> {
        match kind {
            MediaKind::Audio if self.audio => Ok(LocalTrack::new(kind, TrackSource::Microphone)),
            MediaKind::Video if self.video => Ok(LocalTrack::new(kind, TrackSource::Camera)),
            _ => Err(MediaError::Unavailable(kind)),
        }
    }

    async fn acquire_screen(&self) -> Result<LocalTrack, MediaError> {
        if self.screen {
            Ok(LocalTrack::new(MediaKind::Video, TrackSource::Screen))
        } else {
            Err(MediaError::ScreenDenied)
        }
    }
}
