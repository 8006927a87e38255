//! Main application loop - eframe::App implementation.
//!
//! Each frame:
//! 1. Forward keyboard input to the bus
//! 2. Apply fetch responses and bus events (`pump`)
//! 3. Render toolbar, activity plot, status bar, capture list, frame view
//! 4. Keep repainting while requests are outstanding

use eframe::{egui, glow};
use log::{info, trace};
use std::time::Duration;

use super::NavigatorApp;
use crate::core::nav_events::{NavIntentEvent, ToggleCaptureListEvent};
use crate::core::navigator::NavIntent;
use crate::core::occurrences::active_occurrence_ids;
use crate::entities::OccurrenceId;
use crate::widgets::{activity_plot, capture_list, occurrence_panel};

const PENDING_REPAINT: Duration = Duration::from_millis(30);

impl eframe::App for NavigatorApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_keyboard_input(ctx);
        self.pump(ctx);

        let emitter = self.event_bus.emitter();

        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.strong(&self.session.name);
                if let Some(dep) = &self.session.deployment {
                    ui.weak(dep);
                }
                ui.separator();

                if ui
                    .add_enabled(self.navigator.can_prev(), egui::Button::new("◀ Prev"))
                    .on_hover_text("ArrowLeft")
                    .clicked()
                {
                    emitter.emit(NavIntentEvent(NavIntent::Prev));
                }
                if ui
                    .add_enabled(self.navigator.can_next(), egui::Button::new("Next ▶"))
                    .on_hover_text("ArrowRight")
                    .clicked()
                {
                    emitter.emit(NavIntentEvent(NavIntent::Next));
                }

                ui.separator();
                if ui.selectable_label(self.settings.show_capture_list, "List").clicked() {
                    emitter.emit(ToggleCaptureListEvent);
                }
                ui.toggle_value(&mut self.show_occurrences, "Occurrences");
                if ui.button("Copy link").clicked() {
                    let link = self.params.to_query_string();
                    info!("Link: {}", link);
                    ctx.copy_text(link);
                    self.status_bar.set_message("Link copied");
                }
            });
        });

        egui::TopBottomPanel::top("activity").show(ctx, |ui| {
            activity_plot(
                ui,
                self.navigator.timeline(),
                self.navigator.active_tick(),
                &self.plot_config,
                &emitter,
            );
        });

        self.status_bar.render(
            ctx,
            &self.navigator,
            &self.pager,
            self.settings.overlay_mode,
            &emitter,
        );

        if self.settings.show_capture_list {
            egui::SidePanel::left("capture_list")
                .resizable(true)
                .default_width(260.0)
                .show(ctx, |ui| {
                    capture_list(
                        ui,
                        &mut self.pager,
                        self.navigator.active(),
                        self.settings.load_more_threshold,
                        &emitter,
                    );
                });
        }

        let active_occurrences = active_occurrence_ids(&self.params);

        if self.show_occurrences {
            let mut ordered: Vec<OccurrenceId> = active_occurrences.iter().cloned().collect();
            ordered.sort();
            egui::Window::new("Occurrences")
                .open(&mut self.show_occurrences)
                .default_width(320.0)
                .show(ctx, |ui| {
                    occurrence_panel(ui, &ordered, &self.occurrences, &emitter);
                });
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            self.frame_view.render(
                ui,
                self.navigator.details(),
                self.navigator.details_error(),
                &active_occurrences,
                self.settings.overlay_mode,
                &emitter,
            );
        });

        if self.has_pending_work() {
            ctx.request_repaint_after(PENDING_REPAINT);
        }
    }

    /// Persist settings on exit.
    fn on_exit(&mut self, _gl: Option<&glow::Context>) {
        self.save_settings();
        trace!("Settings persisted on exit");
    }
}
