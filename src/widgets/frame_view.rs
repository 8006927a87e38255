//! Frame view - active capture image with detection overlay.
//!
//! Layout space is reserved from the aspect ratio (natural size, nominal
//! size, then 16:9), so the frame does not jump when the image arrives.
//! Boxes are projected in percent and scaled to the on-screen image rect.
//! When any visible box belongs to an active occurrence, the frame is dimmed
//! and active boxes are redrawn undimmed on top.

use eframe::egui::{
    self, Color32, ColorImage, Rect, Sense, Stroke, StrokeKind, TextureHandle, TextureOptions, Ui,
    Vec2,
};
use log::debug;
use std::collections::HashSet;

use crate::core::event_bus::EventEmitter;
use crate::core::fetcher::DecodedImage;
use crate::core::nav_events::{RetryActiveEvent, ToggleOccurrenceEvent};
use crate::core::overlay::{
    aspect_ratio, layout_overlay, project_detections, OverlayBox, OverlayMode,
};
use crate::entities::{CaptureDetails, CaptureId, OccurrenceId};
use crate::source::FetchError;

const COLOR_PLACEHOLDER: Color32 = Color32::from_rgb(40, 40, 45);
const COLOR_BOX: Color32 = Color32::from_rgb(80, 200, 120);
const COLOR_BOX_ACTIVE: Color32 = Color32::from_rgb(220, 160, 60);
const COLOR_ERROR: Color32 = Color32::from_rgb(200, 60, 60);
const MASK: Color32 = Color32::from_black_alpha(150);
const FULL_UV: Rect = Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0));

/// Largest rect of `aspect` (w/h) centered inside `outer`
pub fn fit_rect(outer: Rect, aspect: f32) -> Rect {
    if outer.width() <= 0.0 || outer.height() <= 0.0 || aspect <= 0.0 {
        return Rect::from_center_size(outer.center(), Vec2::ZERO);
    }
    let size = if outer.width() / outer.height() > aspect {
        Vec2::new(outer.height() * aspect, outer.height())
    } else {
        Vec2::new(outer.width(), outer.width() / aspect)
    };
    Rect::from_center_size(outer.center(), size)
}

/// Screen rect of a box given the on-screen image rect
pub fn box_rect(image_rect: Rect, b: &OverlayBox) -> Rect {
    let [l, t, w, h] = b.geometry.fractions();
    let min = image_rect.min + Vec2::new(l as f32 * image_rect.width(), t as f32 * image_rect.height());
    Rect::from_min_size(min, Vec2::new(w as f32 * image_rect.width(), h as f32 * image_rect.height()))
}

/// Uploaded image of one capture
struct LoadedTexture {
    capture: CaptureId,
    texture: TextureHandle,
    size: (u32, u32),
}

/// Frame view state (texture of the active capture)
#[derive(Default)]
pub struct FrameView {
    loaded: Option<LoadedTexture>,
    image_error: Option<(CaptureId, FetchError)>,
}

impl FrameView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upload the decoded image of `capture`
    pub fn set_image(&mut self, ctx: &egui::Context, capture: &CaptureId, image: &DecodedImage) {
        let color = ColorImage::from_rgba_unmultiplied(
            [image.width as usize, image.height as usize],
            &image.rgba,
        );
        let texture = ctx.load_texture(format!("capture-{}", capture), color, TextureOptions::LINEAR);
        debug!("FrameView: uploaded {} ({}x{})", capture, image.width, image.height);
        self.loaded = Some(LoadedTexture {
            capture: capture.clone(),
            texture,
            size: image.size(),
        });
        self.image_error = None;
    }

    pub fn set_image_error(&mut self, capture: &CaptureId, error: FetchError) {
        self.image_error = Some((capture.clone(), error));
    }

    /// Forget images of other captures
    pub fn retain(&mut self, active: Option<&CaptureId>) {
        if self.loaded.as_ref().is_some_and(|l| Some(&l.capture) != active) {
            self.loaded = None;
        }
        if self.image_error.as_ref().is_some_and(|(c, _)| Some(c) != active) {
            self.image_error = None;
        }
    }

    pub fn has_image_for(&self, capture: &CaptureId) -> bool {
        self.loaded.as_ref().is_some_and(|l| &l.capture == capture)
    }

    /// Natural size of the loaded image for `capture`
    pub fn natural_size(&self, capture: &CaptureId) -> Option<(u32, u32)> {
        self.loaded
            .as_ref()
            .filter(|l| &l.capture == capture)
            .map(|l| l.size)
    }

    /// Render details + overlay into the remaining space of `ui`.
    pub fn render(
        &self,
        ui: &mut Ui,
        details: Option<&CaptureDetails>,
        details_error: Option<&FetchError>,
        active_occurrences: &HashSet<OccurrenceId>,
        mode: OverlayMode,
        emitter: &EventEmitter,
    ) {
        if let Some(err) = details_error {
            ui.colored_label(COLOR_ERROR, format!("Failed to load capture: {}", err));
            if ui.button("Retry").clicked() {
                emitter.emit(RetryActiveEvent);
            }
            return;
        }
        let Some(details) = details else {
            ui.centered_and_justified(|ui| ui.spinner());
            return;
        };

        let capture = &details.capture;
        let natural = self.natural_size(&capture.id);
        let aspect = aspect_ratio(capture.nominal_size(), natural);

        let (outer, _) = ui.allocate_exact_size(ui.available_size(), Sense::hover());
        let image_rect = fit_rect(outer, aspect);
        let painter = ui.painter_at(outer);

        let texture = self.loaded.as_ref().filter(|l| l.capture == capture.id);
        match texture {
            Some(l) => {
                painter.image(l.texture.id(), image_rect, FULL_UV, Color32::WHITE);
            }
            None => {
                painter.rect_filled(image_rect, 0.0, COLOR_PLACEHOLDER);
                let label = match &self.image_error {
                    Some((id, e)) if *id == capture.id => e.to_string(),
                    _ if capture.image.is_none() => "No image".to_string(),
                    _ => "Loading image…".to_string(),
                };
                painter.text(
                    image_rect.center(),
                    egui::Align2::CENTER_CENTER,
                    label,
                    egui::FontId::proportional(14.0),
                    Color32::GRAY,
                );
            }
        }

        let geometry = project_detections(&capture.detections, capture.nominal_size(), natural);
        let layout = layout_overlay(geometry, active_occurrences, mode);

        if layout.mask {
            painter.rect_filled(image_rect, 0.0, MASK);
            if let Some(l) = texture {
                // Active regions undimmed
                for b in layout.boxes.iter().filter(|b| b.active) {
                    let r = box_rect(image_rect, b).intersect(image_rect);
                    let uv = Rect::from_min_max(
                        egui::pos2(
                            (r.min.x - image_rect.min.x) / image_rect.width(),
                            (r.min.y - image_rect.min.y) / image_rect.height(),
                        ),
                        egui::pos2(
                            (r.max.x - image_rect.min.x) / image_rect.width(),
                            (r.max.y - image_rect.min.y) / image_rect.height(),
                        ),
                    );
                    painter.image(l.texture.id(), r, uv, Color32::WHITE);
                }
            }
        }

        for (idx, b) in layout.boxes.iter().enumerate() {
            let r = box_rect(image_rect, b);
            let color = if b.active { COLOR_BOX_ACTIVE } else { COLOR_BOX };
            painter.rect_stroke(r, 1.0, Stroke::new(if b.active { 2.5 } else { 1.5 }, color), StrokeKind::Inside);
            if let Some(label) = &b.geometry.label {
                painter.text(
                    r.left_top() + Vec2::new(2.0, -2.0),
                    egui::Align2::LEFT_BOTTOM,
                    format!("{} {:.0}%", label, b.geometry.score * 100.0),
                    egui::FontId::proportional(11.0),
                    color,
                );
            }

            if !b.clickable {
                continue;
            }
            let Some(occ) = &b.geometry.occurrence_id else {
                continue;
            };
            let response = ui
                .interact(r, ui.id().with(("detection", idx)), Sense::click())
                .on_hover_cursor(egui::CursorIcon::PointingHand)
                .on_hover_text(format!("Occurrence {}", occ));
            if response.clicked() {
                emitter.emit(ToggleOccurrenceEvent(occ.clone()));
            }
        }
    }
}
