//! Capture list - paged, scrollable list of captures in time order.
//!
//! Rows emit `NavIntentEvent(Select)`; nearing the end of the scroll area
//! emits `LoadMoreEvent`. The active row is scrolled into view whenever the
//! pager reports a pending scroll target.

use eframe::egui::{self, Color32, RichText, Ui};

use crate::core::event_bus::EventEmitter;
use crate::core::nav_events::{LoadMoreEvent, NavIntentEvent};
use crate::core::navigator::NavIntent;
use crate::core::pager::{CapturePager, ScrollMetrics};
use crate::entities::{Capture, CaptureId};

fn row_text(capture: &Capture) -> String {
    let n = capture.num_detections();
    let ts = capture.timestamp.format("%Y-%m-%d %H:%M:%S");
    match n {
        0 => ts.to_string(),
        1 => format!("{ts}  ·  1 detection"),
        _ => format!("{ts}  ·  {n} detections"),
    }
}

/// Render the list into `ui`.
pub fn capture_list(
    ui: &mut Ui,
    pager: &mut CapturePager,
    active: Option<&CaptureId>,
    load_more_threshold: f32,
    emitter: &EventEmitter,
) {
    ui.horizontal(|ui| {
        ui.strong("Captures");
        ui.weak(format!("{}{}", pager.len(), if pager.has_more() { "+" } else { "" }));
    });
    ui.separator();

    let scroll_to = pager.take_scroll_target();

    let output = egui::ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui| {
            for (idx, capture) in pager.items().iter().enumerate() {
                let selected = active == Some(&capture.id);
                let text = if capture.processed {
                    RichText::new(row_text(capture)).monospace()
                } else {
                    RichText::new(row_text(capture)).monospace().color(Color32::GRAY)
                };
                let response = ui.selectable_label(selected, text);
                if scroll_to == Some(idx) {
                    response.scroll_to_me(None);
                }
                if response.clicked() {
                    emitter.emit(NavIntentEvent(NavIntent::Select(capture.id.clone())));
                }
            }

            if pager.is_loading() {
                ui.horizontal(|ui| {
                    ui.spinner();
                    ui.weak("Loading…");
                });
            } else if let Some(err) = pager.error() {
                ui.colored_label(Color32::from_rgb(200, 60, 60), err.to_string());
                if ui.small_button("Retry").clicked() {
                    emitter.emit(LoadMoreEvent);
                }
            } else if pager.is_empty() && !pager.has_more() {
                ui.weak("No captures in this session");
            }
        });

    let metrics = ScrollMetrics {
        offset: output.state.offset.y,
        viewport: output.inner_rect.height(),
        content: output.content_size.y,
    };
    if pager.should_request_more(metrics, load_more_threshold) {
        emitter.emit(LoadMoreEvent);
    }
}
