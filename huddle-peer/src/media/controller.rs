use crate::error::MediaError;
use crate::media::{LocalMedia, LocalTrack};
use huddle_core::{MediaKind, TrackChange};
use tracing::{debug, info};

/// What every open link has to do to its sender slot after a local change.
#[derive(Debug, Clone)]
pub enum SlotChange {
    /// Mirror the track's enabled flag. The slot keeps its track.
    Enabled { kind: MediaKind, enabled: bool },
    /// Swap the slot's track in place.
    Replaced(LocalTrack),
}

/// Result of one controller operation: the slot change to fan out to links and
/// the notice to send to the room.
#[derive(Debug, Clone, Default)]
pub struct TrackUpdate {
    pub slot: Option<SlotChange>,
    pub notice: Option<TrackChange>,
}

impl TrackUpdate {
    pub fn is_noop(&self) -> bool {
        self.slot.is_none() && self.notice.is_none()
    }
}

/// Mute, hard disable and screen share on top of [`LocalMedia`].
///
/// Never adds or removes slots: every change is either a flag flip or an
/// in-place replacement, so no link needs renegotiation. Capture prompts are
/// not run here; the caller acquires the track and hands it to
/// [`install_device`](Self::install_device) or
/// [`install_screen`](Self::install_screen).
pub struct TrackController {
    media: LocalMedia,
}

impl TrackController {
    pub fn new(media: LocalMedia) -> Self {
        Self { media }
    }

    pub fn media(&self) -> &LocalMedia {
        &self.media
    }

    /// Soft mute: the track stays in its slot, only its enabled flag flips.
    pub fn set_muted(&mut self, kind: MediaKind, muted: bool) -> Result<TrackUpdate, MediaError> {
        let track = self
            .media
            .outgoing(kind)
            .filter(|track| !track.is_placeholder())
            .ok_or(MediaError::NoTrack(kind))?;

        let enabled = !muted;
        track.set_enabled(enabled);
        debug!("Local {} {}", kind, if muted { "muted" } else { "unmuted" });

        Ok(TrackUpdate {
            slot: Some(SlotChange::Enabled { kind, enabled }),
            notice: Some(TrackChange { kind, enabled }),
        })
    }

    /// Whether hard-enabling `kind` needs a fresh capture. False while a real
    /// device track is held.
    pub fn needs_device(&self, kind: MediaKind) -> bool {
        !self
            .media
            .device(kind)
            .is_some_and(|track| !track.is_placeholder())
    }

    /// Hard disable: releases the device and leaves a placeholder in the slot.
    pub fn disable_device(&mut self, kind: MediaKind) -> TrackUpdate {
        let Some(current) = self.media.device(kind) else {
            return TrackUpdate::default();
        };
        if current.is_placeholder() {
            return TrackUpdate::default();
        }

        current.stop();
        let placeholder = LocalTrack::placeholder(kind);
        self.media.set_device(kind, Some(placeholder.clone()));
        info!("Local {} device released", kind);

        TrackUpdate {
            slot: self.slot_visible(kind).then_some(SlotChange::Replaced(placeholder)),
            notice: Some(TrackChange {
                kind,
                enabled: false,
            }),
        }
    }

    /// Hard enable with a freshly acquired device track, swapped in for the
    /// placeholder.
    pub fn install_device(&mut self, kind: MediaKind, track: LocalTrack) -> TrackUpdate {
        if let Some(previous) = self.media.device(kind) {
            previous.stop();
        }
        self.media.set_device(kind, Some(track.clone()));
        info!("Local {} device reacquired as {}", kind, track.id());

        TrackUpdate {
            slot: self.slot_visible(kind).then_some(SlotChange::Replaced(track)),
            notice: Some(TrackChange {
                kind,
                enabled: true,
            }),
        }
    }

    /// Camera changes during a share only take effect when the share ends.
    fn slot_visible(&self, kind: MediaKind) -> bool {
        kind == MediaKind::Audio || !self.media.is_sharing_screen()
    }

    pub fn can_share_screen(&self) -> Result<(), MediaError> {
        if self.media.is_sharing_screen() {
            Err(MediaError::AlreadySharing)
        } else {
            Ok(())
        }
    }

    /// Puts a captured surface in the video slot. The camera side is kept for
    /// when the share ends.
    pub fn install_screen(&mut self, track: LocalTrack) -> Result<TrackUpdate, MediaError> {
        if let Err(e) = self.can_share_screen() {
            track.stop();
            return Err(e);
        }
        self.media.set_screen(Some(track.clone()));
        info!("Screen share started: {}", track.id());

        Ok(TrackUpdate {
            slot: Some(SlotChange::Replaced(track)),
            notice: Some(TrackChange {
                kind: MediaKind::Video,
                enabled: true,
            }),
        })
    }

    /// Ends the share (user action or the capture ending on its own) and puts
    /// back whatever the camera side holds: the camera or its placeholder.
    pub fn stop_screen_share(&mut self) -> Result<TrackUpdate, MediaError> {
        let screen = self.media.set_screen(None).ok_or(MediaError::NotSharing)?;
        screen.stop();

        let restored = match self.media.device(MediaKind::Video) {
            Some(camera) => camera.clone(),
            None => {
                let placeholder = LocalTrack::placeholder(MediaKind::Video);
                self.media
                    .set_device(MediaKind::Video, Some(placeholder.clone()));
                placeholder
            }
        };
        info!(
            "Screen share stopped, video slot back to {:?} track {}",
            restored.source(),
            restored.id()
        );

        Ok(TrackUpdate {
            notice: Some(TrackChange {
                kind: MediaKind::Video,
                enabled: restored.is_enabled(),
            }),
            slot: Some(SlotChange::Replaced(restored)),
        })
    }

    pub fn stop_all(&mut self) {
        self.media.stop_all();
    }
}
