//! Entities - session data as returned by the providers.
//!
//! Plain data with serde shapes; behavior lives in `core`.

pub mod capture;
pub mod ids;
pub mod keys;
pub mod timeline;

pub use capture::{
    BBox, Capture, CaptureDetails, CapturePage, Detection, OccurrenceDetails, PageToken,
    SessionInfo,
};
pub use ids::{CaptureId, DetectionId, OccurrenceId, SessionId};
pub use timeline::{Timeline, TimelineTick};
