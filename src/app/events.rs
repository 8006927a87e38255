//! Event handling - fetch responses, bus events and keyboard input.
//!
//! Runs once per frame on the UI thread:
//! 1. keyboard → `KeyPressedEvent` (scoped listeners re-emit intents)
//! 2. fetch responses → navigator / pager / frame view / occurrence cache
//! 3. bus events → navigator intents, list steps, toggles

use eframe::egui;
use log::{debug, trace, warn};

use super::NavigatorApp;
use crate::core::event_bus::downcast_event;
use crate::core::fetcher::FetchResponse;
use crate::core::hotkeys::HotkeyHandler;
use crate::core::nav_events::{
    KeyPressedEvent, ListStepEvent, LoadMoreEvent, NavIntentEvent, RetryActiveEvent,
    SetSnapToDetectionsEvent, ToggleCaptureListEvent, ToggleOccurrenceEvent, ToggleOverlayModeEvent,
};
use crate::core::navigator::{NavIntent, NavOutcome};
use crate::core::occurrences::ActiveOccurrences;
use crate::core::pager::ListStep;

/// Max rounds of derived events per frame
const MAX_EVENT_ROUNDS: usize = 10;

impl NavigatorApp {
    /// Process everything that arrived since the last frame.
    pub fn pump(&mut self, ctx: &egui::Context) {
        let responses = self.fetcher.poll();
        self.handle_responses(ctx, responses);
        self.handle_events();
        self.pager.sync_active(self.navigator.active());
    }

    /// True while any request is outstanding (keep repainting)
    pub fn has_pending_work(&self) -> bool {
        self.fetcher.pending() > 0
    }

    /// Forward key-down events to the bus unless a text field has focus.
    pub fn handle_keyboard_input(&self, ctx: &egui::Context) {
        if ctx.wants_keyboard_input() {
            return;
        }
        let combos: Vec<String> = ctx.input(|i| {
            i.events
                .iter()
                .filter_map(|e| match e {
                    egui::Event::Key {
                        key,
                        pressed: true,
                        modifiers,
                        ..
                    } => Some(HotkeyHandler::combo(
                        &format!("{:?}", key),
                        modifiers.ctrl,
                        modifiers.shift,
                        modifiers.alt,
                    )),
                    _ => None,
                })
                .collect()
        });
        for combo in combos {
            trace!("Key: {}", combo);
            self.event_bus.emit(KeyPressedEvent::new(combo));
        }
    }

    pub fn handle_responses(&mut self, ctx: &egui::Context, responses: Vec<FetchResponse>) {
        for response in responses {
            match response {
                FetchResponse::Page { token, result } => {
                    if self.pager.apply_page(token, result) && !self.navigator.is_mounted() {
                        let first = self.pager.first().map(|c| c.id.clone());
                        if let Some(id) = self.navigator.mount(first.as_ref(), &mut self.params) {
                            self.fetcher.request_details(&id);
                        }
                    }
                }
                FetchResponse::Details { id, result } => {
                    if self.navigator.apply_details(&id, result) {
                        self.request_active_image();
                    }
                }
                FetchResponse::Timeline { result } => match result {
                    Ok(timeline) => self.navigator.set_timeline(timeline),
                    Err(e) => self.status_bar.set_message(format!("Timeline unavailable: {}", e)),
                },
                FetchResponse::Occurrence { id, result } => {
                    self.occurrences.insert(id, result);
                }
                FetchResponse::Image { id, result } => {
                    if self.navigator.active() != Some(&id) {
                        debug!("Discarding stale image for {}", id);
                        continue;
                    }
                    match result {
                        Ok(image) => self.frame_view.set_image(ctx, &id, &image),
                        Err(e) => self.frame_view.set_image_error(&id, e),
                    }
                }
            }
        }
    }

    /// Drain the bus, including events emitted while handling it.
    pub fn handle_events(&mut self) {
        for round in 0..MAX_EVENT_ROUNDS {
            let events = self.event_bus.poll();
            if events.is_empty() {
                return;
            }
            trace!("Event round {}: {} events", round, events.len());
            for event in events {
                if let Some(e) = downcast_event::<NavIntentEvent>(&event) {
                    self.navigate(e.0.clone());
                    continue;
                }
                if let Some(e) = downcast_event::<ListStepEvent>(&event) {
                    match self.pager.step(self.navigator.active(), e.0) {
                        ListStep::Select(id) => self.event_bus.emit(NavIntentEvent(NavIntent::Select(id))),
                        ListStep::LoadMore => self.load_more(),
                        ListStep::Stay => {}
                    }
                    continue;
                }
                if downcast_event::<LoadMoreEvent>(&event).is_some() {
                    self.load_more();
                    continue;
                }
                if let Some(e) = downcast_event::<SetSnapToDetectionsEvent>(&event) {
                    let outcome = self.navigator.set_snap_to_detections(e.0, &mut self.params);
                    self.settings.snap_to_detections = e.0;
                    self.on_outcome(outcome);
                    continue;
                }
                if downcast_event::<ToggleOverlayModeEvent>(&event).is_some() {
                    self.settings.overlay_mode = self.settings.overlay_mode.toggled();
                    continue;
                }
                if downcast_event::<ToggleCaptureListEvent>(&event).is_some() {
                    self.settings.show_capture_list = !self.settings.show_capture_list;
                    self.sync_key_listeners();
                    continue;
                }
                if let Some(e) = downcast_event::<ToggleOccurrenceEvent>(&event) {
                    let now_active = ActiveOccurrences::new(&mut self.params).toggle(&e.0);
                    if now_active && !self.occurrences.contains_key(&e.0) {
                        self.fetcher.request_occurrence(&e.0);
                    }
                    continue;
                }
                if downcast_event::<RetryActiveEvent>(&event).is_some() {
                    self.retry_active();
                    continue;
                }
            }
        }
        warn!("Event rounds exhausted; remaining events deferred to next frame");
    }

    fn navigate(&mut self, intent: NavIntent) {
        let outcome = self.navigator.dispatch(intent, &mut self.params);
        self.on_outcome(outcome);
    }

    fn on_outcome(&mut self, outcome: NavOutcome) {
        if let NavOutcome::Moved(id) = outcome {
            self.frame_view.retain(Some(&id));
            self.fetcher.request_details(&id);
        }
    }

    pub(super) fn load_more(&mut self) {
        if let Some(token) = self.pager.begin_load() {
            self.fetcher.request_page(token);
        }
    }

    fn request_active_image(&mut self) {
        let Some(capture) = self.navigator.details().map(|d| d.capture.clone()) else {
            return;
        };
        if capture.image.is_none() || self.frame_view.has_image_for(&capture.id) {
            return;
        }
        self.fetcher.request_image(&capture);
    }

    fn retry_active(&mut self) {
        if let Some(id) = self.navigator.retry() {
            self.fetcher.request_details(&id);
        } else {
            // Details fine; the image may have failed
            self.request_active_image();
        }
    }
}
