//! Session data providers.
//!
//! The navigator never talks to storage directly; it consumes the four
//! request/response providers below through [`SessionSource`]. Calls are
//! blocking and are run on the worker pool by `core::fetcher`.

pub mod archive;

pub use archive::SessionArchive;

use crate::entities::{
    Capture, CaptureDetails, CaptureId, CapturePage, OccurrenceDetails, OccurrenceId, PageToken,
    SessionId, Timeline,
};

/// Provider failure. Terminal for the attempt; no retry policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    NotFound { kind: &'static str, id: String },
    Io(String),
    Decode(String),
    Image(String),
}

impl FetchError {
    pub fn not_found(kind: &'static str, id: impl std::fmt::Display) -> Self {
        FetchError::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchError::NotFound { kind, id } => write!(f, "{} not found: {}", kind, id),
            FetchError::Io(e) => write!(f, "I/O error: {}", e),
            FetchError::Decode(e) => write!(f, "Malformed data: {}", e),
            FetchError::Image(e) => write!(f, "Image error: {}", e),
        }
    }
}

impl std::error::Error for FetchError {}

impl From<std::io::Error> for FetchError {
    fn from(e: std::io::Error) -> Self {
        FetchError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(e: serde_json::Error) -> Self {
        FetchError::Decode(e.to_string())
    }
}

/// Providers consumed by the navigator.
pub trait SessionSource: Send + Sync {
    /// Next page of captures, strictly time-ordered. `None` = first page.
    fn fetch_captures(
        &self,
        session: &SessionId,
        token: Option<PageToken>,
    ) -> Result<CapturePage, FetchError>;

    /// One capture with its sibling ids and 1-based position.
    fn fetch_capture_details(&self, id: &CaptureId) -> Result<CaptureDetails, FetchError>;

    /// Time-bucketed activity for the whole session.
    fn fetch_timeline(&self, session: &SessionId) -> Result<Timeline, FetchError>;

    /// Occurrence summary for the popup.
    fn fetch_occurrence(&self, id: &OccurrenceId) -> Result<OccurrenceDetails, FetchError>;

    /// Encoded image bytes of a capture.
    fn image_bytes(&self, capture: &Capture) -> Result<Vec<u8>, FetchError>;
}
