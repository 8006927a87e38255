//! Core navigation engine - events, fetching, navigation state, workers
//!
//! These modules hold all navigator state and logic, independent of UI.

pub mod event_bus;
pub mod fetcher;
pub mod hotkeys;
pub mod nav_events;
pub mod nav_params;
pub mod navigator;
pub mod occurrences;
pub mod overlay;
pub mod pager;
pub mod search;
pub mod workers;

// Re-exports for convenience
pub use event_bus::{EventBus, ListenerGuard};
pub use fetcher::{FetchResponse, Fetcher};
pub use hotkeys::{HotkeyHandler, KeyScope};
pub use nav_params::{NavParams, ParamStore};
pub use navigator::{NavIntent, NavOutcome, Navigator};
pub use occurrences::ActiveOccurrences;
pub use overlay::OverlayMode;
pub use pager::CapturePager;
pub use workers::Workers;
