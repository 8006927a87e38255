//! Captures, detections and the per-capture details record.
//!
//! Shapes mirror what the data providers return. Optional fields are
//! genuinely optional upstream (missing image metadata, detections without
//! a box or occurrence) and consumers treat absence as "nothing to do".

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{CaptureId, DetectionId, OccurrenceId, SessionId};

/// Bounding box in source-image pixels: `[left, top, right, bottom]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct BBox {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl BBox {
    pub fn new(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self { left, top, right, bottom }
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }
}

impl From<[f64; 4]> for BBox {
    fn from(v: [f64; 4]) -> Self {
        Self::new(v[0], v[1], v[2], v[3])
    }
}

impl From<BBox> for [f64; 4] {
    fn from(b: BBox) -> Self {
        [b.left, b.top, b.right, b.bottom]
    }
}

/// One bounding-box annotation on a capture
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub id: DetectionId,
    #[serde(default)]
    pub bbox: Option<BBox>,
    #[serde(default)]
    pub score: f32,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub occurrence_id: Option<OccurrenceId>,
}

/// One recorded image
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Capture {
    pub id: CaptureId,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub detections: Vec<Detection>,
    /// Image location relative to the session source
    #[serde(default)]
    pub image: Option<String>,
    /// Automated analysis ran on this capture
    #[serde(default)]
    pub processed: bool,
}

impl Capture {
    /// Nominal size from metadata, when both dimensions are known.
    pub fn nominal_size(&self) -> Option<(u32, u32)> {
        match (self.width, self.height) {
            (Some(w), Some(h)) => Some((w, h)),
            _ => None,
        }
    }

    pub fn num_detections(&self) -> usize {
        self.detections.len()
    }
}

/// Capture plus its position in the session's strict temporal order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CaptureDetails {
    #[serde(flatten)]
    pub capture: Capture,
    #[serde(default)]
    pub prev_capture_id: Option<CaptureId>,
    #[serde(default)]
    pub next_capture_id: Option<CaptureId>,
    /// 1-based position within the session
    pub current_index: usize,
    pub total_captures: usize,
}

impl CaptureDetails {
    pub fn id(&self) -> &CaptureId {
        &self.capture.id
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.capture.timestamp
    }
}

/// Occurrence summary shown in the popup; passed through untouched.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OccurrenceDetails {
    pub id: OccurrenceId,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub best_score: Option<f32>,
    #[serde(default)]
    pub detections_count: usize,
    #[serde(default)]
    pub first_seen: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_seen: Option<DateTime<Utc>>,
}

/// Opaque continuation token: offset into the session's capture order
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageToken(pub usize);

/// One page of captures, strictly time-ordered
#[derive(Clone, Debug, PartialEq, Default)]
pub struct CapturePage {
    pub items: Vec<Capture>,
    pub has_more: bool,
    pub next_token: Option<PageToken>,
}

/// Session header
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub id: SessionId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub deployment: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_json_shape() {
        let json = r#"{
            "id": "c1",
            "timestamp": "2024-06-01T21:00:00Z",
            "width": 4096,
            "detections": [
                {"id": "d1", "bbox": [10, 20, 30, 60], "score": 0.9, "occurrence_id": "o1"},
                {"id": "d2"}
            ]
        }"#;
        let cap: Capture = serde_json::from_str(json).unwrap();
        assert_eq!(cap.width, Some(4096));
        assert_eq!(cap.height, None);
        assert_eq!(cap.nominal_size(), None);
        assert_eq!(cap.detections[0].bbox, Some(BBox::new(10.0, 20.0, 30.0, 60.0)));
        assert_eq!(cap.detections[0].occurrence_id, Some(OccurrenceId::from("o1")));
        assert!(cap.detections[1].bbox.is_none());
        assert!(!cap.processed);
    }

    #[test]
    fn test_bbox_serializes_as_array() {
        let b = BBox::new(1.0, 2.0, 3.5, 4.0);
        assert_eq!(serde_json::to_string(&b).unwrap(), "[1.0,2.0,3.5,4.0]");
        assert_eq!(b.width(), 2.5);
        assert_eq!(b.height(), 2.0);
    }

    #[test]
    fn test_details_flatten() {
        let json = r#"{
            "id": "c2", "timestamp": "2024-06-01T21:05:00Z",
            "prev_capture_id": "c1", "current_index": 2, "total_captures": 3
        }"#;
        let d: CaptureDetails = serde_json::from_str(json).unwrap();
        assert_eq!(d.id().as_str(), "c2");
        assert_eq!(d.prev_capture_id, Some(CaptureId::from("c1")));
        assert_eq!(d.next_capture_id, None);
    }
}
