//! Status bar widget - active capture, position and view toggles

mod status;

pub use status::StatusBar;
