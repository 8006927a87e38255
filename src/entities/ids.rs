//! String identifiers for session entities.
//!
//! Ids come from the data provider and are opaque to the navigator: they are
//! only compared, hashed and round-tripped through shareable state.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

string_id!(
    /// Monitoring session (one recording interval at one deployment)
    SessionId
);
string_id!(
    /// One recorded image
    CaptureId
);
string_id!(
    /// One bounding-box annotation
    DetectionId
);
string_id!(
    /// Cross-session entity linked from detections
    OccurrenceId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transparent_serde() {
        let id = CaptureId::new("cap-17");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"cap-17\"");
        let back: CaptureId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_display_matches_raw() {
        assert_eq!(OccurrenceId::from("occ 1").to_string(), "occ 1");
    }
}
