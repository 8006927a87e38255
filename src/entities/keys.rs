//! Shareable navigation state keys.
//!
//! Avoid string typos across navigator, tracker and CLI.
//! Usage: `params.get(P_CAPTURE)`

/// Active capture id (single value)
pub const P_CAPTURE: &str = "capture";
/// Active occurrence ids (repeated key)
pub const P_OCCURRENCE: &str = "occurrence";
