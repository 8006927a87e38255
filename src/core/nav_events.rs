//! Navigation events carried on the event bus.
//!
//! Views and key listeners only emit these; the main loop polls them and
//! applies each one to the navigator, pager or tracker.

use crate::core::navigator::NavIntent;
use crate::entities::OccurrenceId;

// === Input ===

/// Global key-down, already formatted as a combo ("ArrowLeft", "Shift+ArrowUp")
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyPressedEvent {
    pub combo: String,
}

impl KeyPressedEvent {
    pub fn new(combo: impl Into<String>) -> Self {
        Self { combo: combo.into() }
    }
}

// === Navigation ===

/// Intent for the navigator (plot click, list click, prev/next)
#[derive(Clone, Debug, PartialEq)]
pub struct NavIntentEvent(pub NavIntent);

/// Move by `delta` rows in capture list order
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ListStepEvent(pub isize);

/// Capture list scrolled near its end
#[derive(Clone, Copy, Debug)]
pub struct LoadMoreEvent;

// === Options ===

#[derive(Clone, Copy, Debug)]
pub struct SetSnapToDetectionsEvent(pub bool);

#[derive(Clone, Copy, Debug)]
pub struct ToggleOverlayModeEvent;

#[derive(Clone, Copy, Debug)]
pub struct ToggleCaptureListEvent;

// === Detections ===

/// Detection hot-zone clicked
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToggleOccurrenceEvent(pub OccurrenceId);

/// Retry the failed details/image fetch of the active capture
#[derive(Clone, Copy, Debug)]
pub struct RetryActiveEvent;
