//! Navigation controller - the single owner of "the active capture".
//!
//! **Architecture**: every input (activity plot click, capture list click,
//! prev/next buttons, arrow keys) arrives as a [`NavIntent`] and goes through
//! [`Navigator::dispatch`]. Nothing else writes `active`; background data
//! (timeline, pages, details) only fills in derived state.
//!
//! **State**:
//! - `active`: current capture id, mirrored to the `capture` parameter
//! - `details`: fetch state of the active capture's `CaptureDetails`
//! - `timeline`: ticks used by plot clicks and snap stepping
//! - `snap_to_detections`: resolve plot/prev/next to capture-bearing buckets
//!
//! # Transitions
//!
//! - **PlotClick(tick)**: the tick's representative when snapping is off or
//!   the tick itself is eligible; otherwise nearest-capture search anchored at
//!   the tick's start.
//! - **Select(id)**: the id itself.
//! - **Prev/Next**: snapping off → sibling ids from the details; snapping on
//!   → search strictly before/after the active capture's timestamp.
//!
//! - **Snap on**: an active capture sitting in a tick without captures moves
//!   to the nearest capture-bearing tick; otherwise nothing moves.
//!
//! A missing target disables the control (`NavOutcome::Disabled`). A failed
//! details fetch is kept as an inline error and never resets `active`.

use log::{debug, warn};

use crate::core::nav_params::ParamStore;
use crate::core::search::{find_closest_capture_id, is_eligible, SearchOptions};
use crate::entities::keys::P_CAPTURE;
use crate::entities::{CaptureDetails, CaptureId, Timeline};
use crate::source::FetchError;

/// Tagged navigation input
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NavIntent {
    /// Activity plot click on timeline tick index
    PlotClick { tick: usize },
    /// Concrete capture chosen (list row, list-order key step)
    Select(CaptureId),
    /// Temporal previous
    Prev,
    /// Temporal next
    Next,
}

/// Result of dispatching an intent
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NavOutcome {
    /// Active capture changed; details for it must be fetched
    Moved(CaptureId),
    /// Target is already active
    Unchanged,
    /// No candidate; the control is a no-op
    Disabled,
}

/// Fetch state of the active capture's details
#[derive(Clone, Debug, Default, PartialEq)]
pub enum DetailsState {
    #[default]
    Idle,
    Loading,
    Ready(CaptureDetails),
    Failed(FetchError),
}

/// Navigation controller state
#[derive(Debug, Default)]
pub struct Navigator {
    active: Option<CaptureId>,
    details: DetailsState,
    timeline: Timeline,
    snap_to_detections: bool,
    mounted: bool,
}

impl Navigator {
    pub fn new(snap_to_detections: bool) -> Self {
        Self {
            snap_to_detections,
            ..Self::default()
        }
    }

    // === Accessors ===

    pub fn active(&self) -> Option<&CaptureId> {
        self.active.as_ref()
    }

    pub fn details_state(&self) -> &DetailsState {
        &self.details
    }

    /// Details of the active capture, once loaded
    pub fn details(&self) -> Option<&CaptureDetails> {
        match &self.details {
            DetailsState::Ready(d) => Some(d),
            _ => None,
        }
    }

    pub fn details_error(&self) -> Option<&FetchError> {
        match &self.details {
            DetailsState::Failed(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.details == DetailsState::Loading
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// (1-based index, total) of the active capture
    pub fn position(&self) -> Option<(usize, usize)> {
        self.details().map(|d| (d.current_index, d.total_captures))
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    /// Tick containing the active capture (plot highlight)
    pub fn active_tick(&self) -> Option<usize> {
        self.details()
            .and_then(|d| self.timeline.tick_index_at(d.timestamp()))
    }

    pub fn snap_to_detections(&self) -> bool {
        self.snap_to_detections
    }

    // === Background data ===

    /// Timeline arrival. Does not touch the active capture.
    pub fn set_timeline(&mut self, timeline: Timeline) {
        debug!("Navigator: timeline with {} ticks", timeline.len());
        self.timeline = timeline;
    }

    /// Change how plot/prev/next resolve.
    ///
    /// Turning snapping on re-anchors an active capture whose tick has no
    /// captures onto the nearest capture-bearing tick. Turning it off never
    /// moves the active capture.
    pub fn set_snap_to_detections<S: ParamStore + ?Sized>(
        &mut self,
        snap: bool,
        params: &mut S,
    ) -> NavOutcome {
        if self.snap_to_detections == snap {
            return NavOutcome::Unchanged;
        }
        debug!("Navigator: snap_to_detections = {}", snap);
        self.snap_to_detections = snap;
        if !snap {
            return NavOutcome::Unchanged;
        }
        let Some(target) = self.snap_target() else {
            return NavOutcome::Unchanged;
        };
        if self.active.as_ref() == Some(&target) {
            return NavOutcome::Unchanged;
        }
        debug!("Navigator: snapped to {}", target);
        self.set_active(target.clone(), params);
        NavOutcome::Moved(target)
    }

    /// Pick the initial capture, once.
    ///
    /// A `capture` parameter (shared link) wins over `first`, the first
    /// capture of the first page. Returns the id to fetch when mounting
    /// happened now.
    pub fn mount<S: ParamStore + ?Sized>(
        &mut self,
        first: Option<&CaptureId>,
        params: &mut S,
    ) -> Option<CaptureId> {
        if self.mounted {
            return None;
        }
        let initial = params
            .get(P_CAPTURE)
            .filter(|s| !s.is_empty())
            .map(CaptureId::from)
            .or_else(|| first.cloned())?;
        debug!("Navigator: mounted on {}", initial);
        self.mounted = true;
        self.set_active(initial.clone(), params);
        Some(initial)
    }

    /// Apply a details response. Results for anything but the active capture
    /// are stale and dropped. Returns whether the response was applied.
    pub fn apply_details(
        &mut self,
        id: &CaptureId,
        result: Result<CaptureDetails, FetchError>,
    ) -> bool {
        if self.active.as_ref() != Some(id) {
            debug!("Navigator: discarding stale details for {}", id);
            return false;
        }
        self.details = match result {
            Ok(d) => {
                if d.id() != id {
                    warn!("Details for {} carry id {}", id, d.id());
                }
                DetailsState::Ready(d)
            }
            Err(e) => DetailsState::Failed(e),
        };
        true
    }

    /// Re-request details after a failure. Returns the id to fetch.
    pub fn retry(&mut self) -> Option<CaptureId> {
        if !matches!(self.details, DetailsState::Failed(_)) {
            return None;
        }
        let id = self.active.clone()?;
        self.details = DetailsState::Loading;
        Some(id)
    }

    // === Intents ===

    /// Target of `intent` under the current state, without applying it.
    pub fn resolve(&self, intent: &NavIntent) -> Option<CaptureId> {
        match intent {
            NavIntent::PlotClick { tick } => self.plot_target(*tick),
            NavIntent::Select(id) => Some(id.clone()),
            NavIntent::Prev => self.prev_target(),
            NavIntent::Next => self.next_target(),
        }
    }

    /// The one place `active` changes after mount.
    pub fn dispatch<S: ParamStore + ?Sized>(
        &mut self,
        intent: NavIntent,
        params: &mut S,
    ) -> NavOutcome {
        let Some(target) = self.resolve(&intent) else {
            debug!("Navigator: {:?} has no target", intent);
            return NavOutcome::Disabled;
        };
        if self.active.as_ref() == Some(&target) {
            return NavOutcome::Unchanged;
        }
        debug!("Navigator: {:?} -> {}", intent, target);
        self.mounted = true;
        self.set_active(target.clone(), params);
        NavOutcome::Moved(target)
    }

    pub fn can_prev(&self) -> bool {
        self.prev_target().is_some()
    }

    pub fn can_next(&self) -> bool {
        self.next_target().is_some()
    }

    fn set_active<S: ParamStore + ?Sized>(&mut self, id: CaptureId, params: &mut S) {
        params.set(P_CAPTURE, id.as_str());
        self.active = Some(id);
        self.details = DetailsState::Loading;
    }

    fn plot_target(&self, tick: usize) -> Option<CaptureId> {
        let t = self.timeline.get(tick)?;
        let direct = !self.snap_to_detections || is_eligible(t, &SearchOptions::snapping(true));
        if direct {
            if let Some(rep) = &t.representative_capture_id {
                return Some(rep.clone());
            }
        }
        find_closest_capture_id(
            self.timeline.ticks(),
            t.start_date,
            &SearchOptions::snapping(self.snap_to_detections),
        )
    }

    /// Nearest capture-bearing tick when the active one is not eligible.
    fn snap_target(&self) -> Option<CaptureId> {
        let ts = self.details()?.timestamp();
        let opts = SearchOptions::snapping(true);
        let ticks = self.timeline.ticks();
        let current = self.timeline.tick_index_at(ts).and_then(|idx| ticks.get(idx));
        if current.is_some_and(|t| is_eligible(t, &opts)) {
            return None;
        }
        find_closest_capture_id(ticks, ts, &opts)
    }

    fn prev_target(&self) -> Option<CaptureId> {
        let d = self.details()?;
        if self.snap_to_detections {
            find_closest_capture_id(
                self.timeline.ticks(),
                d.timestamp(),
                &SearchOptions::before(d.timestamp(), true),
            )
        } else {
            d.prev_capture_id.clone()
        }
    }

    fn next_target(&self) -> Option<CaptureId> {
        let d = self.details()?;
        if self.snap_to_detections {
            find_closest_capture_id(
                self.timeline.ticks(),
                d.timestamp(),
                &SearchOptions::after(d.timestamp(), true),
            )
        } else {
            d.next_capture_id.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::nav_params::NavParams;
    use crate::entities::{Capture, TimelineTick};
    use chrono::{DateTime, Utc};

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    fn id(s: &str) -> CaptureId {
        CaptureId::from(s)
    }

    fn tick(start: i64, end: i64, caps: u32, rep: Option<&str>) -> TimelineTick {
        TimelineTick {
            start_date: at(start),
            end_date: at(end),
            num_captures: caps,
            num_detections: caps,
            avg_detections: 1.0,
            was_processed: true,
            representative_capture_id: rep.map(CaptureId::from),
        }
    }

    /// 0..10 'a' | 10..20 empty | 20..30 'c' | 30..40 rep-less | 40..50 'e'
    fn timeline() -> Timeline {
        Timeline::from_ticks(vec![
            tick(0, 10, 2, Some("a")),
            tick(10, 20, 0, Some("b-empty")),
            tick(20, 30, 1, Some("c")),
            tick(30, 40, 3, None),
            tick(40, 50, 1, Some("e")),
        ])
    }

    fn details(cid: &str, ts: i64, prev: Option<&str>, next: Option<&str>, idx: usize) -> CaptureDetails {
        CaptureDetails {
            capture: Capture {
                id: id(cid),
                timestamp: at(ts),
                width: None,
                height: None,
                detections: Vec::new(),
                image: None,
                processed: true,
            },
            prev_capture_id: prev.map(CaptureId::from),
            next_capture_id: next.map(CaptureId::from),
            current_index: idx,
            total_captures: 9,
        }
    }

    fn mounted_on(cid: &str, ts: i64, snap: bool) -> (Navigator, NavParams) {
        let mut nav = Navigator::new(snap);
        nav.set_timeline(timeline());
        let mut params = NavParams::new();
        nav.mount(Some(&id(cid)), &mut params);
        nav.apply_details(&id(cid), Ok(details(cid, ts, Some("sib-prev"), Some("sib-next"), 4)));
        (nav, params)
    }

    #[test]
    fn test_mount_once_and_mirrors_param() {
        let mut nav = Navigator::new(false);
        let mut params = NavParams::new();
        assert_eq!(nav.mount(None, &mut params), None);
        assert!(!nav.is_mounted());

        assert_eq!(nav.mount(Some(&id("first")), &mut params), Some(id("first")));
        assert_eq!(params.get(P_CAPTURE), Some("first"));
        assert!(nav.is_loading());

        // Later page arrivals do not move the active capture
        assert_eq!(nav.mount(Some(&id("other")), &mut params), None);
        assert_eq!(nav.active(), Some(&id("first")));
    }

    #[test]
    fn test_mount_prefers_shared_link() {
        let mut nav = Navigator::new(false);
        let mut params = NavParams::parse("capture=linked&occurrence=o1");
        assert_eq!(nav.mount(Some(&id("first")), &mut params), Some(id("linked")));
        assert_eq!(params.to_query_string(), "capture=linked&occurrence=o1");
    }

    #[test]
    fn test_select_sets_directly() {
        let (mut nav, mut params) = mounted_on("c", 25, false);
        assert_eq!(nav.dispatch(NavIntent::Select(id("zz")), &mut params), NavOutcome::Moved(id("zz")));
        assert_eq!(params.get(P_CAPTURE), Some("zz"));
        assert_eq!(nav.dispatch(NavIntent::Select(id("zz")), &mut params), NavOutcome::Unchanged);
    }

    #[test]
    fn test_prev_next_siblings_without_snap() {
        let (mut nav, mut params) = mounted_on("c", 25, false);
        assert!(nav.can_prev() && nav.can_next());
        assert_eq!(nav.position(), Some((4, 9)));
        assert_eq!(nav.dispatch(NavIntent::Next, &mut params), NavOutcome::Moved(id("sib-next")));

        // Details not loaded yet: controls disabled
        assert!(!nav.can_next());
        assert_eq!(nav.dispatch(NavIntent::Next, &mut params), NavOutcome::Disabled);
    }

    #[test]
    fn test_first_capture_has_no_prev() {
        let mut nav = Navigator::new(false);
        let mut params = NavParams::new();
        nav.mount(Some(&id("a")), &mut params);
        nav.apply_details(&id("a"), Ok(details("a", 1, None, Some("b"), 1)));
        assert!(!nav.can_prev());
        assert_eq!(nav.dispatch(NavIntent::Prev, &mut params), NavOutcome::Disabled);
        assert_eq!(nav.active(), Some(&id("a")));
    }

    #[test]
    fn test_prev_next_with_snap_search() {
        let (mut nav, mut params) = mounted_on("c", 25, true);
        // Backward: 'b-empty' excluded (no captures), 'a' ends before 25
        assert_eq!(nav.resolve(&NavIntent::Prev), Some(id("a")));
        // Forward: rep-less tick skipped, 'e' starts after 25
        assert_eq!(nav.resolve(&NavIntent::Next), Some(id("e")));
        assert_eq!(nav.dispatch(NavIntent::Prev, &mut params), NavOutcome::Moved(id("a")));
    }

    #[test]
    fn test_snap_next_at_end_disabled() {
        let (nav, _) = mounted_on("e", 45, true);
        assert!(!nav.can_next());
        assert!(nav.can_prev());
    }

    #[test]
    fn test_plot_click_rules() {
        let (mut nav, mut params) = mounted_on("a", 5, false);
        // No snap: representative used directly, even for an empty bucket
        assert_eq!(nav.resolve(&NavIntent::PlotClick { tick: 1 }), Some(id("b-empty")));
        // No snap, no representative: nearest resolvable tick
        assert_eq!(nav.resolve(&NavIntent::PlotClick { tick: 3 }), Some(id("c")));

        nav.set_snap_to_detections(true, &mut params);
        // Snap: eligible tick used directly
        assert_eq!(nav.resolve(&NavIntent::PlotClick { tick: 2 }), Some(id("c")));
        // Snap: empty bucket resolved by search from its start (10): 'a' at 0
        // and 'c' at 20 tie, earliest wins
        assert_eq!(nav.resolve(&NavIntent::PlotClick { tick: 1 }), Some(id("a")));
        assert_eq!(nav.resolve(&NavIntent::PlotClick { tick: 99 }), None);

        assert_eq!(nav.dispatch(NavIntent::PlotClick { tick: 4 }, &mut params), NavOutcome::Moved(id("e")));
    }

    #[test]
    fn test_toggling_snap_keeps_active() {
        let (mut nav, mut params) = mounted_on("c", 25, false);
        assert_eq!(nav.set_snap_to_detections(true, &mut params), NavOutcome::Unchanged);
        assert_eq!(nav.active(), Some(&id("c")));
        assert!(nav.details().is_some());
        assert_eq!(nav.set_snap_to_detections(false, &mut params), NavOutcome::Unchanged);
        assert_eq!(nav.active(), Some(&id("c")));
    }

    #[test]
    fn test_snap_on_reanchors_from_empty_tick() {
        // Active at 18 sits in the empty 10..20 bucket: 'c' starts 2s away, 'a' 18s
        let (mut nav, mut params) = mounted_on("b-empty", 18, false);
        assert_eq!(nav.set_snap_to_detections(true, &mut params), NavOutcome::Moved(id("c")));
        assert_eq!(params.get(P_CAPTURE), Some("c"));
        assert!(nav.is_loading());
        // Already snapping: no further move
        assert_eq!(nav.set_snap_to_detections(true, &mut params), NavOutcome::Unchanged);
    }

    #[test]
    fn test_snap_on_before_details_does_not_move() {
        let mut nav = Navigator::new(false);
        nav.set_timeline(timeline());
        let mut params = NavParams::new();
        nav.mount(Some(&id("b-empty")), &mut params);
        assert_eq!(nav.set_snap_to_detections(true, &mut params), NavOutcome::Unchanged);
        assert_eq!(nav.active(), Some(&id("b-empty")));
        assert!(nav.snap_to_detections());
    }

    #[test]
    fn test_stale_details_discarded() {
        let (mut nav, mut params) = mounted_on("a", 5, false);
        nav.dispatch(NavIntent::Select(id("x")), &mut params);
        nav.dispatch(NavIntent::Select(id("y")), &mut params);

        // Response for x arrives after y became active
        assert!(!nav.apply_details(&id("x"), Ok(details("x", 1, None, None, 1))));
        assert!(nav.is_loading());
        assert!(nav.apply_details(&id("y"), Ok(details("y", 2, None, None, 2))));
        assert_eq!(nav.position(), Some((2, 9)));
    }

    #[test]
    fn test_failure_is_local_and_retryable() {
        let (mut nav, mut params) = mounted_on("a", 5, false);
        nav.dispatch(NavIntent::Select(id("bad")), &mut params);
        assert!(nav.apply_details(&id("bad"), Err(FetchError::Io("boom".into()))));
        assert_eq!(nav.active(), Some(&id("bad")));
        assert!(nav.details_error().is_some());
        assert!(!nav.can_next());

        assert_eq!(nav.retry(), Some(id("bad")));
        assert!(nav.is_loading());
        assert_eq!(nav.retry(), None);
    }

    #[test]
    fn test_active_tick() {
        let (nav, _) = mounted_on("c", 25, false);
        assert_eq!(nav.active_tick(), Some(2));
    }
}
