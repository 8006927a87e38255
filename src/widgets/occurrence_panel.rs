//! Occurrence panel - summaries of the active occurrences.

use chrono::{DateTime, Utc};
use eframe::egui::{self, Color32, Ui};
use std::collections::HashMap;

use crate::core::event_bus::EventEmitter;
use crate::core::nav_events::ToggleOccurrenceEvent;
use crate::entities::{OccurrenceDetails, OccurrenceId};
use crate::source::FetchError;

/// Fetched occurrence summaries, keyed by id
pub type OccurrenceCache = HashMap<OccurrenceId, Result<OccurrenceDetails, FetchError>>;

fn summary(d: &OccurrenceDetails) -> String {
    let label = d.label.as_deref().unwrap_or("unlabelled");
    let score = d
        .best_score
        .map(|s| format!(", best {:.0}%", s * 100.0))
        .unwrap_or_default();
    format!("{} · {} detections{}", label, d.detections_count, score)
}

fn seen(at: Option<DateTime<Utc>>) -> String {
    at.map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// List `active` occurrences in the given order.
pub fn occurrence_panel(
    ui: &mut Ui,
    active: &[OccurrenceId],
    cache: &OccurrenceCache,
    emitter: &EventEmitter,
) {
    if active.is_empty() {
        ui.weak("Click a detection to follow its occurrence");
        return;
    }
    egui::Grid::new("occurrences").striped(true).show(ui, |ui| {
        for id in active {
            ui.monospace(id.as_str());
            match cache.get(id) {
                Some(Ok(d)) => {
                    ui.label(summary(d)).on_hover_text(format!(
                        "first seen {}\nlast seen {}",
                        seen(d.first_seen),
                        seen(d.last_seen),
                    ));
                }
                Some(Err(e)) => {
                    ui.colored_label(Color32::from_rgb(200, 60, 60), e.to_string());
                }
                None => {
                    ui.spinner();
                }
            }
            if ui.small_button("✕").on_hover_text("Stop highlighting").clicked() {
                emitter.emit(ToggleOccurrenceEvent(id.clone()));
            }
            ui.end_row();
        }
    });
}
