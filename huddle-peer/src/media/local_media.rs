use crate::error::MediaError;
use crate::media::{LocalTrack, MediaSource};
use huddle_core::MediaKind;
use tracing::{info, warn};

/// The participant's shared local track set.
///
/// `camera` keeps the camera (or its placeholder) while a screen share sits in
/// the video slot, so ending the share can put it back.
#[derive(Debug, Default)]
pub struct LocalMedia {
    audio: Option<LocalTrack>,
    camera: Option<LocalTrack>,
    screen: Option<LocalTrack>,
}

impl LocalMedia {
    /// Acquires microphone and camera. A refused kind is left empty and its
    /// error returned; the rest of the call goes on without it.
    pub async fn acquire(source: &dyn MediaSource) -> (Self, Vec<MediaError>) {
        let mut media = Self::default();
        let mut refused = Vec::new();

        for kind in MediaKind::ALL {
            match source.acquire(kind).await {
                Ok(track) => {
                    info!("Acquired local {} track {}", kind, track.id());
                    media.set_device(kind, Some(track));
                }
                Err(e) => {
                    warn!("Local {} unavailable: {}", kind, e);
                    refused.push(e);
                }
            }
        }

        (media, refused)
    }

    /// Track currently feeding the `kind` sender slot.
    pub fn outgoing(&self, kind: MediaKind) -> Option<&LocalTrack> {
        match kind {
            MediaKind::Audio => self.audio.as_ref(),
            MediaKind::Video => self.screen.as_ref().or(self.camera.as_ref()),
        }
    }

    pub fn outgoing_tracks(&self) -> Vec<LocalTrack> {
        MediaKind::ALL
            .into_iter()
            .filter_map(|kind| self.outgoing(kind).cloned())
            .collect()
    }

    pub fn has_tracks(&self) -> bool {
        self.audio.is_some() || self.camera.is_some() || self.screen.is_some()
    }

    /// Microphone or camera track, placeholder included.
    pub fn device(&self, kind: MediaKind) -> Option<&LocalTrack> {
        match kind {
            MediaKind::Audio => self.audio.as_ref(),
            MediaKind::Video => self.camera.as_ref(),
        }
    }

    pub(crate) fn set_device(&mut self, kind: MediaKind, track: Option<LocalTrack>) {
        match kind {
            MediaKind::Audio => self.audio = track,
            MediaKind::Video => self.camera = track,
        }
    }

    pub fn is_hard_disabled(&self, kind: MediaKind) -> bool {
        self.device(kind).is_some_and(LocalTrack::is_placeholder)
    }

    pub fn is_sharing_screen(&self) -> bool {
        self.screen.is_some()
    }

    pub(crate) fn set_screen(&mut self, track: Option<LocalTrack>) -> Option<LocalTrack> {
        std::mem::replace(&mut self.screen, track)
    }

    /// Stops and forgets every local track.
    pub fn stop_all(&mut self) {
        for track in [self.audio.take(), self.camera.take(), self.screen.take()]
            .into_iter()
            .flatten()
        {
            track.stop();
        }
    }
}
