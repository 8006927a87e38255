//! Detection overlay projector - source pixels to percentage boxes.
//!
//! Boxes are expressed as percentages of the image, so the frame view only
//! multiplies by the on-screen image rect each frame and stays correct across
//! window resizes without re-projecting.
//!
//! Size preference: natural (decoded) size, then nominal metadata size. A
//! size with a zero dimension is treated as unknown.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::entities::{Detection, DetectionId, OccurrenceId};

/// Layout aspect ratio when no size is known at all
pub const FALLBACK_ASPECT_RATIO: f32 = 16.0 / 9.0;

/// Render-space box, all values in percent of the effective image size
#[derive(Clone, Debug, PartialEq)]
pub struct BoxGeometry {
    pub detection_id: DetectionId,
    pub occurrence_id: Option<OccurrenceId>,
    pub label: Option<String>,
    pub score: f32,
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl BoxGeometry {
    /// Fractions (0..1) instead of percent
    pub fn fractions(&self) -> [f64; 4] {
        [
            self.left / 100.0,
            self.top / 100.0,
            self.width / 100.0,
            self.height / 100.0,
        ]
    }
}

/// Which detections the frame view shows
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OverlayMode {
    /// Every detection is drawn and clickable
    #[default]
    All,
    /// Only detections of active occurrences are drawn
    ActiveOnly,
}

impl OverlayMode {
    pub fn toggled(self) -> Self {
        match self {
            OverlayMode::All => OverlayMode::ActiveOnly,
            OverlayMode::ActiveOnly => OverlayMode::All,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OverlayMode::All => "All detections",
            OverlayMode::ActiveOnly => "Active only",
        }
    }
}

fn known(size: Option<(u32, u32)>) -> Option<(u32, u32)> {
    size.filter(|(w, h)| *w > 0 && *h > 0)
}

/// Natural size if known, else nominal.
pub fn effective_size(
    nominal: Option<(u32, u32)>,
    natural: Option<(u32, u32)>,
) -> Option<(u32, u32)> {
    known(natural).or(known(nominal))
}

/// Width / height used to reserve layout space.
pub fn aspect_ratio(nominal: Option<(u32, u32)>, natural: Option<(u32, u32)>) -> f32 {
    effective_size(nominal, natural)
        .map(|(w, h)| w as f32 / h as f32)
        .unwrap_or(FALLBACK_ASPECT_RATIO)
}

/// Project detections with a bbox into percentage boxes.
///
/// Empty when neither size is known. Detections without a bbox are skipped.
pub fn project_detections(
    detections: &[Detection],
    nominal: Option<(u32, u32)>,
    natural: Option<(u32, u32)>,
) -> Vec<BoxGeometry> {
    let Some((w, h)) = effective_size(nominal, natural) else {
        return Vec::new();
    };
    let (w, h) = (w as f64, h as f64);

    detections
        .iter()
        .filter_map(|det| {
            let bbox = det.bbox?;
            Some(BoxGeometry {
                detection_id: det.id.clone(),
                occurrence_id: det.occurrence_id.clone(),
                label: det.label.clone(),
                score: det.score,
                left: bbox.left / w * 100.0,
                top: bbox.top / h * 100.0,
                width: bbox.width() / w * 100.0,
                height: bbox.height() / h * 100.0,
            })
        })
        .collect()
}

/// One box as the frame view should draw it
#[derive(Clone, Debug, PartialEq)]
pub struct OverlayBox {
    pub geometry: BoxGeometry,
    /// Occurrence is in the active set
    pub active: bool,
    /// Click toggles the occurrence
    pub clickable: bool,
}

/// Boxes to draw plus whether the dimming mask is on.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OverlayLayout {
    pub boxes: Vec<OverlayBox>,
    pub mask: bool,
}

/// Apply overlay mode and active set to projected geometry.
pub fn layout_overlay(
    geometry: Vec<BoxGeometry>,
    active: &HashSet<OccurrenceId>,
    mode: OverlayMode,
) -> OverlayLayout {
    let boxes: Vec<OverlayBox> = geometry
        .into_iter()
        .filter_map(|g| {
            let is_active = g
                .occurrence_id
                .as_ref()
                .map(|o| active.contains(o))
                .unwrap_or(false);
            if mode == OverlayMode::ActiveOnly && !is_active {
                return None;
            }
            let clickable = g.occurrence_id.is_some();
            Some(OverlayBox {
                geometry: g,
                active: is_active,
                clickable,
            })
        })
        .collect();
    let mask = boxes.iter().any(|b| b.active);
    OverlayLayout { boxes, mask }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::BBox;
    use proptest::prelude::*;

    fn det(id: &str, bbox: Option<[f64; 4]>, occ: Option<&str>) -> Detection {
        Detection {
            id: DetectionId::from(id),
            bbox: bbox.map(BBox::from),
            score: 0.8,
            label: Some("moth".into()),
            occurrence_id: occ.map(OccurrenceId::from),
        }
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_basic_projection() {
        let boxes = project_detections(&[det("d", Some([10.0, 10.0, 50.0, 50.0]), None)], Some((100, 100)), None);
        assert_eq!(boxes.len(), 1);
        let b = &boxes[0];
        assert!(close(b.left, 10.0) && close(b.top, 10.0));
        assert!(close(b.width, 40.0) && close(b.height, 40.0));
    }

    #[test]
    fn test_natural_size_wins() {
        let boxes = project_detections(
            &[det("d", Some([10.0, 10.0, 50.0, 50.0]), None)],
            Some((50, 50)),
            Some((100, 100)),
        );
        assert!(close(boxes[0].width, 40.0));
        assert_eq!(aspect_ratio(Some((50, 100)), Some((200, 100))), 2.0);
    }

    #[test]
    fn test_non_square_axes() {
        let boxes = project_detections(&[det("d", Some([0.0, 25.0, 100.0, 50.0]), None)], Some((400, 100)), None);
        let b = &boxes[0];
        assert!(close(b.left, 0.0) && close(b.top, 25.0));
        assert!(close(b.width, 25.0) && close(b.height, 25.0));
    }

    #[test]
    fn test_unknown_size() {
        let d = [det("d", Some([1.0, 1.0, 2.0, 2.0]), None)];
        assert!(project_detections(&d, None, None).is_empty());
        assert!(project_detections(&d, Some((0, 100)), None).is_empty());
        assert_eq!(aspect_ratio(None, None), FALLBACK_ASPECT_RATIO);
        // zero natural size falls back to nominal
        assert_eq!(project_detections(&d, Some((10, 10)), Some((0, 0))).len(), 1);
    }

    #[test]
    fn test_missing_bbox_skipped() {
        let d = [det("a", None, Some("o")), det("b", Some([0.0, 0.0, 1.0, 1.0]), None)];
        let boxes = project_detections(&d, Some((10, 10)), None);
        assert_eq!(boxes.len(), 1);
        assert_eq!(boxes[0].detection_id.as_str(), "b");
    }

    #[test]
    fn test_layout_modes() {
        let d = [
            det("a", Some([0.0, 0.0, 1.0, 1.0]), Some("o1")),
            det("b", Some([2.0, 2.0, 3.0, 3.0]), Some("o2")),
            det("c", Some([4.0, 4.0, 5.0, 5.0]), None),
        ];
        let geom = project_detections(&d, Some((10, 10)), None);
        let mut active = HashSet::new();

        let all = layout_overlay(geom.clone(), &active, OverlayMode::All);
        assert_eq!(all.boxes.len(), 3);
        assert!(!all.mask);
        assert!(!all.boxes[2].clickable);

        active.insert(OccurrenceId::from("o2"));
        let all = layout_overlay(geom.clone(), &active, OverlayMode::All);
        assert!(all.mask);
        assert!(all.boxes[1].active && !all.boxes[0].active);

        let only = layout_overlay(geom, &active, OverlayMode::ActiveOnly);
        assert_eq!(only.boxes.len(), 1);
        assert_eq!(only.boxes[0].geometry.detection_id.as_str(), "b");
        assert!(only.mask);
    }

    proptest! {
        #[test]
        fn prop_boxes_inside_image(
            w in 1u32..5000, h in 1u32..5000,
            fx in 0.0f64..1.0, fy in 0.0f64..1.0, fw in 0.0f64..1.0, fh in 0.0f64..1.0,
        ) {
            let l = fx * w as f64;
            let t = fy * h as f64;
            let r = l + fw * (w as f64 - l);
            let b = t + fh * (h as f64 - t);
            let boxes = project_detections(&[det("p", Some([l, t, r, b]), None)], Some((w, h)), None);
            let g = &boxes[0];
            prop_assert!(g.left >= 0.0 && g.top >= 0.0);
            prop_assert!(g.left + g.width <= 100.0 + 1e-9);
            prop_assert!(g.top + g.height <= 100.0 + 1e-9);
        }
    }
}
