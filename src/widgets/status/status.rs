use eframe::egui;

use crate::core::event_bus::EventEmitter;
use crate::core::nav_events::{SetSnapToDetectionsEvent, ToggleOverlayModeEvent};
use crate::core::navigator::Navigator;
use crate::core::overlay::OverlayMode;
use crate::core::pager::CapturePager;

/// Status bar component
#[derive(Default)]
pub struct StatusBar {
    pub current_message: String,
}

impl StatusBar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_message(&mut self, message: impl Into<String>) {
        self.current_message = message.into();
    }

    /// Position label: "12 / 340" once details are loaded
    pub fn position_label(navigator: &Navigator) -> String {
        match navigator.position() {
            Some((idx, total)) => format!("{} / {}", idx, total),
            None => "- / -".to_string(),
        }
    }

    /// Render status bar at bottom of screen
    pub fn render(
        &self,
        ctx: &egui::Context,
        navigator: &Navigator,
        pager: &CapturePager,
        overlay_mode: OverlayMode,
        emitter: &EventEmitter,
    ) {
        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                // Active capture
                match navigator.details() {
                    Some(d) => {
                        ui.monospace(d.id().as_str());
                        ui.separator();
                        ui.monospace(d.timestamp().format("%Y-%m-%d %H:%M:%S").to_string());
                    }
                    None => {
                        ui.monospace(navigator.active().map(|c| c.as_str()).unwrap_or("---"));
                    }
                }

                ui.separator();
                ui.monospace(Self::position_label(navigator));

                if navigator.is_loading() || pager.is_loading() {
                    ui.separator();
                    ui.spinner();
                }

                ui.separator();

                let mut snap = navigator.snap_to_detections();
                if ui.checkbox(&mut snap, "Snap to detections").changed() {
                    emitter.emit(SetSnapToDetectionsEvent(snap));
                }

                ui.separator();

                if ui.button(overlay_mode.as_str()).clicked() {
                    emitter.emit(ToggleOverlayModeEvent);
                }

                // Status message (if any)
                if !self.current_message.is_empty() {
                    ui.separator();
                    ui.monospace(&self.current_message);
                }
            });
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_label_before_details() {
        assert_eq!(StatusBar::position_label(&Navigator::new(false)), "- / -");
    }
}
