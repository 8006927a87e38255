//! capview - session playback navigator library
//!
//! Re-exports all modules for use by the binary target.

// Core engine (navigation, fetching, events, workers)
pub mod core;

// Data and providers
pub mod entities;
pub mod source;

// App modules
pub mod app;
pub mod cli;
pub mod config;
pub mod widgets;

// Re-export commonly used types from core
pub use core::event_bus::{downcast_event, BoxedEvent, EventBus, EventEmitter};
pub use core::navigator::{NavIntent, NavOutcome, Navigator};
pub use source::{FetchError, SessionArchive, SessionSource};
