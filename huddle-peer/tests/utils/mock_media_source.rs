use async_trait::async_trait;
use huddle_core::MediaKind;
use huddle_peer::MediaError;
use huddle_peer::media::{LocalTrack, MediaSource, TrackSource};
use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::watch;

/// Capture devices with switchable permissions. Captures can be held open
/// like an unanswered permission prompt.
pub struct MockMediaSource {
    denied: Mutex<HashSet<MediaKind>>,
    screen_denied: AtomicBool,
    acquired: Mutex<Vec<LocalTrack>>,
    screens: AtomicUsize,
    prompt_answered: watch::Sender<bool>,
    prompts_open: AtomicUsize,
}

impl Default for MockMediaSource {
    fn default() -> Self {
        Self {
            denied: Mutex::default(),
            screen_denied: AtomicBool::new(false),
            acquired: Mutex::default(),
            screens: AtomicUsize::new(0),
            prompt_answered: watch::Sender::new(true),
            prompts_open: AtomicUsize::new(0),
        }
    }
}

impl MockMediaSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Captures started from now on wait until [`answer_prompts`](Self::answer_prompts).
    pub fn hold_prompts(&self) {
        self.prompt_answered.send_replace(false);
    }

    pub fn answer_prompts(&self) {
        self.prompt_answered.send_replace(true);
    }

    /// Captures currently waiting on a held prompt.
    pub fn prompts_open(&self) -> usize {
        self.prompts_open.load(Ordering::SeqCst)
    }

    async fn prompt(&self) {
        let mut answered = self.prompt_answered.subscribe();
        let already = *answered.borrow();
        if !already {
            self.prompts_open.fetch_add(1, Ordering::SeqCst);
            let _ = answered.wait_for(|done| *done).await;
            self.prompts_open.fetch_sub(1, Ordering::SeqCst);
        }
    }

    pub fn denying(kinds: &[MediaKind]) -> Self {
        let source = Self::default();
        for kind in kinds {
            source.deny(*kind);
        }
        source
    }

    pub fn deny(&self, kind: MediaKind) {
        self.denied.lock().unwrap().insert(kind);
    }

    pub fn allow(&self, kind: MediaKind) {
        self.denied.lock().unwrap().remove(&kind);
    }

    pub fn deny_screen(&self) {
        self.screen_denied.store(true, Ordering::SeqCst);
    }

    /// Device tracks handed out so far for `kind`, oldest first.
    pub fn acquired(&self, kind: MediaKind) -> Vec<LocalTrack> {
        self.acquired
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.kind() == kind)
            .cloned()
            .collect()
    }

    pub fn screens(&self) -> usize {
        self.screens.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaSource for MockMediaSource {
    async fn acquire(&self, kind: MediaKind) -> Result<LocalTrack, MediaError> {
        self.prompt().await;
        if self.denied.lock().unwrap().contains(&kind) {
            return Err(MediaError::PermissionDenied(kind));
        }
        let source = match kind {
            MediaKind::Audio => TrackSource::Microphone,
            MediaKind::Video => TrackSource::Camera,
        };
        let track = LocalTrack::new(kind, source);
        self.acquired.lock().unwrap().push(track.clone());
        Ok(track)
    }

    async fn acquire_screen(&self) -> Result<LocalTrack, MediaError> {
        self.prompt().await;
        if self.screen_denied.load(Ordering::SeqCst) {
            return Err(MediaError::ScreenDenied);
        }
        self.screens.fetch_add(1, Ordering::SeqCst);
        Ok(LocalTrack::new(MediaKind::Video, TrackSource::Screen))
    }
}
