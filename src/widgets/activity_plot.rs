//! Activity plot - one bar per timeline tick, click to navigate.
//!
//! Bar height is `num_captures` relative to the busiest tick. Clicking emits
//! `NavIntentEvent(PlotClick)`; resolving the click (snap rules) is the
//! navigator's job.

use eframe::egui::{self, Color32, Pos2, Rect, Sense, Stroke, StrokeKind, Ui, Vec2};

use crate::core::event_bus::EventEmitter;
use crate::core::nav_events::NavIntentEvent;
use crate::core::navigator::NavIntent;
use crate::entities::{Timeline, TimelineTick};

const COLOR_BACKGROUND: Color32 = Color32::from_rgb(30, 30, 34);
const COLOR_EMPTY: Color32 = Color32::from_rgb(50, 50, 56);
const COLOR_CAPTURES: Color32 = Color32::from_rgb(90, 120, 170);
const COLOR_DETECTIONS: Color32 = Color32::from_rgb(80, 200, 120);
const COLOR_UNPROCESSED: Color32 = Color32::from_rgb(140, 140, 150);
const COLOR_ACTIVE: Color32 = Color32::from_rgb(220, 160, 60);

/// Configuration for the activity plot
#[derive(Clone, Debug)]
pub struct ActivityPlotConfig {
    pub height: f32,
    /// Minimum visible bar height for non-empty ticks
    pub min_bar: f32,
    pub gap: f32,
}

impl Default for ActivityPlotConfig {
    fn default() -> Self {
        Self {
            height: 80.0,
            min_bar: 2.0,
            gap: 1.0,
        }
    }
}

/// Tick index under horizontal position `x` for ticks laid out evenly
/// over `[left, left + width)`.
pub fn tick_at_x(left: f32, width: f32, count: usize, x: f32) -> Option<usize> {
    if count == 0 || width <= 0.0 || x < left || x >= left + width {
        return None;
    }
    let idx = ((x - left) / width * count as f32) as usize;
    Some(idx.min(count - 1))
}

fn bar_color(tick: &TimelineTick) -> Color32 {
    if tick.num_captures == 0 {
        COLOR_EMPTY
    } else if !tick.was_processed {
        COLOR_UNPROCESSED
    } else if tick.num_detections > 0 {
        COLOR_DETECTIONS
    } else {
        COLOR_CAPTURES
    }
}

fn tooltip(tick: &TimelineTick) -> String {
    format!(
        "{} - {}\n{} captures, {} detections (avg {:.1}){}",
        tick.start_date.format("%Y-%m-%d %H:%M"),
        tick.end_date.format("%H:%M"),
        tick.num_captures,
        tick.num_detections,
        tick.avg_detections,
        if tick.was_processed { "" } else { "\nnot processed" }
    )
}

/// Draw the plot; clicks are emitted as navigation intents.
pub fn activity_plot(
    ui: &mut Ui,
    timeline: &Timeline,
    active_tick: Option<usize>,
    config: &ActivityPlotConfig,
    emitter: &EventEmitter,
) -> egui::Response {
    let desired = Vec2::new(ui.available_width(), config.height);
    let (rect, response) = ui.allocate_exact_size(desired, Sense::click());

    if timeline.is_empty() {
        ui.painter().rect_filled(rect, 2.0, COLOR_BACKGROUND);
        ui.painter().text(
            rect.center(),
            egui::Align2::CENTER_CENTER,
            "No activity",
            egui::FontId::proportional(12.0),
            Color32::GRAY,
        );
        return response;
    }

    let count = timeline.len();
    let max = timeline.max_captures().max(1) as f32;
    let slot = rect.width() / count as f32;

    if ui.is_rect_visible(rect) {
        let painter = ui.painter();
        painter.rect_filled(rect, 2.0, COLOR_BACKGROUND);

        for (idx, tick) in timeline.ticks().iter().enumerate() {
            let x0 = rect.min.x + idx as f32 * slot;
            let x1 = x0 + (slot - config.gap).max(1.0);
            let h = if tick.num_captures == 0 {
                config.min_bar
            } else {
                (tick.num_captures as f32 / max * rect.height()).max(config.min_bar)
            };
            let bar = Rect::from_min_max(Pos2::new(x0, rect.max.y - h), Pos2::new(x1, rect.max.y));
            painter.rect_filled(bar, 0.0, bar_color(tick));
        }

        if let Some(idx) = active_tick.filter(|i| *i < count) {
            let x0 = rect.min.x + idx as f32 * slot;
            let marker = Rect::from_min_max(Pos2::new(x0, rect.min.y), Pos2::new(x0 + slot.max(2.0), rect.max.y));
            painter.rect_stroke(marker, 0.0, Stroke::new(1.5, COLOR_ACTIVE), StrokeKind::Inside);
        }
    }

    let hovered = response
        .hover_pos()
        .and_then(|p| tick_at_x(rect.min.x, rect.width(), count, p.x))
        .and_then(|i| timeline.get(i));
    let response = match hovered {
        Some(tick) => response.on_hover_text(tooltip(tick)),
        None => response,
    };

    if response.clicked() {
        if let Some(idx) = response
            .interact_pointer_pos()
            .and_then(|p| tick_at_x(rect.min.x, rect.width(), count, p.x))
        {
            emitter.emit(NavIntentEvent(NavIntent::PlotClick { tick: idx }));
        }
    }
    response
}
