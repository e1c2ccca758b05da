use crate::link::{NegotiationInput, NegotiationState};
use huddle_core::MediaKind;
use std::fmt;
use thiserror::Error;

/// A capture device the user can be prompted for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capture {
    Device(MediaKind),
    Screen,
}

impl fmt::Display for Capture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capture::Device(kind) => write!(f, "{kind}"),
            Capture::Screen => f.write_str("screen"),
        }
    }
}

#[derive(Debug, Error)]
pub enum LinkError {
    /// The message does not fit the current negotiation state; dropped.
    #[error("{input:?} rejected in state {state:?}")]
    OutOfState {
        state: NegotiationState,
        input: NegotiationInput,
    },

    #[error("no local media to offer")]
    NoLocalMedia,

    #[error("link is closed")]
    Closed,

    #[error(transparent)]
    Payload(#[from] PayloadError),

    #[error("transport failure: {0:#}")]
    Transport(#[from] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("malformed negotiation payload: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MediaError {
    #[error("permission to use {0} was denied")]
    PermissionDenied(MediaKind),

    #[error("no {0} device available")]
    Unavailable(MediaKind),

    #[error("screen capture was denied")]
    ScreenDenied,

    #[error("no local {0} track")]
    NoTrack(MediaKind),

    #[error("screen share already running")]
    AlreadySharing,

    #[error("no screen share running")]
    NotSharing,

    /// A capture prompt for the same device is still open.
    #[error("capture of {0} is already in progress")]
    CapturePending(Capture),
}

#[derive(Debug, Error)]
pub enum CallError {
    #[error(transparent)]
    Media(#[from] MediaError),

    #[error("call has ended")]
    Ended,
}
