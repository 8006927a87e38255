//! Application module - NavigatorApp and related functionality.
//!
//! - `events` - fetch responses, bus events, keyboard input
//! - `run` - eframe::App implementation (panels, persistence)

mod events;
mod run;

use log::{debug, info, warn};
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::NavigatorSettings;
use crate::core::event_bus::{EventBus, ListenerGuard};
use crate::core::fetcher::Fetcher;
use crate::core::hotkeys::{install_scope, HotkeyHandler, KeyScope};
use crate::core::nav_params::NavParams;
use crate::core::navigator::Navigator;
use crate::core::occurrences::active_occurrence_ids;
use crate::core::pager::CapturePager;
use crate::core::workers::Workers;
use crate::entities::SessionInfo;
use crate::source::SessionSource;
use crate::widgets::{ActivityPlotConfig, FrameView, OccurrenceCache, StatusBar};

/// Main application state.
///
/// Owns the navigator state (active capture, list, shareable params) and
/// the UI pieces around it. All mutation happens on the UI thread in
/// `pump()`; workers only post fetch responses.
pub struct NavigatorApp {
    pub event_bus: EventBus,
    pub navigator: Navigator,
    pub pager: CapturePager,
    /// Shareable navigation state (`capture`, `occurrence`)
    pub params: NavParams,
    pub settings: NavigatorSettings,
    settings_path: Option<PathBuf>,
    session: SessionInfo,
    fetcher: Fetcher,
    hotkeys: Arc<HotkeyHandler>,
    /// Frame view key listener (ArrowLeft/ArrowRight)
    frame_keys: Option<ListenerGuard>,
    /// Capture list key listener (ArrowUp/ArrowDown), only while the list is shown
    list_keys: Option<ListenerGuard>,
    frame_view: FrameView,
    occurrences: OccurrenceCache,
    status_bar: StatusBar,
    plot_config: ActivityPlotConfig,
    show_occurrences: bool,
}

impl NavigatorApp {
    pub fn new(
        source: Arc<dyn SessionSource>,
        session: SessionInfo,
        params: NavParams,
        settings: NavigatorSettings,
        workers: Arc<Workers>,
    ) -> Self {
        let fetcher = Fetcher::new(source, session.id.clone(), workers, settings.details_cache_size);
        let plot_config = ActivityPlotConfig {
            height: settings.plot_height,
            ..ActivityPlotConfig::default()
        };
        let mut app = Self {
            event_bus: EventBus::new(),
            navigator: Navigator::new(settings.snap_to_detections),
            pager: CapturePager::new(),
            params,
            settings,
            settings_path: None,
            session,
            fetcher,
            hotkeys: Arc::new(HotkeyHandler::with_defaults()),
            frame_keys: None,
            list_keys: None,
            frame_view: FrameView::new(),
            occurrences: OccurrenceCache::new(),
            status_bar: StatusBar::new(),
            plot_config,
            show_occurrences: false,
        };
        app.start();
        app
    }

    /// Persist settings to `path` on exit
    pub fn with_settings_path(mut self, path: PathBuf) -> Self {
        self.settings_path = Some(path);
        self
    }

    pub fn session(&self) -> &SessionInfo {
        &self.session
    }

    /// Shareable link for the current view
    pub fn link(&self) -> String {
        self.params.to_query_string()
    }

    /// Initial requests: timeline, first page, linked capture and occurrences.
    fn start(&mut self) {
        info!("Opening session {} ({})", self.session.id, self.session.name);
        self.fetcher.request_timeline();
        self.load_more();

        // A linked capture mounts right away; otherwise the first page does
        if let Some(id) = self.navigator.mount(None, &mut self.params) {
            self.fetcher.request_details(&id);
        }

        let linked = active_occurrence_ids(&self.params);
        if !linked.is_empty() {
            self.show_occurrences = true;
        }
        for id in &linked {
            self.fetcher.request_occurrence(id);
        }

        self.sync_key_listeners();
    }

    /// Install/remove scoped key listeners to match the mounted views.
    pub fn sync_key_listeners(&mut self) {
        if self.frame_keys.is_none() {
            self.frame_keys = Some(install_scope(&self.event_bus, Arc::clone(&self.hotkeys), KeyScope::Frame));
        }
        match (self.settings.show_capture_list, self.list_keys.is_some()) {
            (true, false) => {
                self.list_keys = Some(install_scope(
                    &self.event_bus,
                    Arc::clone(&self.hotkeys),
                    KeyScope::CaptureList,
                ));
            }
            (false, true) => {
                // Guard drop unsubscribes
                self.list_keys = None;
                debug!("Capture list key listener removed");
            }
            _ => {}
        }
    }

    pub fn save_settings(&mut self) {
        self.settings.snap_to_detections = self.navigator.snap_to_detections();
        let Some(path) = &self.settings_path else {
            return;
        };
        if let Err(e) = self.settings.save(path) {
            warn!("Failed to save settings: {:#}", e);
        }
    }
}
