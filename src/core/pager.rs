//! Capture list pager - append-only paging with scroll-driven loading.
//!
//! Pages are requested by token; at most one request is in flight and a
//! response is only applied when its token matches the in-flight one. The
//! loaded list never reorders: pages are appended, duplicates dropped.
//!
//! Scrolling is tracked by id, not index: when the active capture changes
//! (from any input path) the pager remembers it and hands the row index to
//! the view once that row is loaded.

use log::{debug, warn};
use std::collections::HashMap;

use crate::entities::{Capture, CaptureId, CapturePage, PageToken};
use crate::source::FetchError;

/// Default remaining-scroll distance that triggers the next page
pub const DEFAULT_LOAD_MORE_THRESHOLD: f32 = 200.0;

/// Scroll position of the list viewport, in points
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ScrollMetrics {
    pub offset: f32,
    pub viewport: f32,
    pub content: f32,
}

impl ScrollMetrics {
    pub fn remaining(&self) -> f32 {
        (self.content - (self.offset + self.viewport)).max(0.0)
    }
}

/// Result of a list-order step
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ListStep {
    /// Adjacent loaded row
    Select(CaptureId),
    /// Past the last loaded row with more pages available
    LoadMore,
    /// Edge of the list, nothing to do
    Stay,
}

#[derive(Debug)]
pub struct CapturePager {
    items: Vec<Capture>,
    index: HashMap<CaptureId, usize>,
    has_more: bool,
    next_token: Option<PageToken>,
    /// Token of the request in flight (`Some(None)` = first page)
    in_flight: Option<Option<PageToken>>,
    error: Option<FetchError>,
    last_active: Option<CaptureId>,
    pending_scroll: Option<CaptureId>,
}

impl Default for CapturePager {
    fn default() -> Self {
        Self::new()
    }
}

impl CapturePager {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            index: HashMap::new(),
            // Unknown until the first page answers
            has_more: true,
            next_token: None,
            in_flight: None,
            error: None,
            last_active: None,
            pending_scroll: None,
        }
    }

    pub fn items(&self) -> &[Capture] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn first(&self) -> Option<&Capture> {
        self.items.first()
    }

    pub fn get(&self, id: &CaptureId) -> Option<&Capture> {
        self.position_of(id).map(|i| &self.items[i])
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn error(&self) -> Option<&FetchError> {
        self.error.as_ref()
    }

    pub fn position_of(&self, id: &CaptureId) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Near-end rule: more pages, nothing in flight, and at most `threshold`
    /// points left to scroll.
    pub fn should_request_more(&self, scroll: ScrollMetrics, threshold: f32) -> bool {
        self.has_more && !self.is_loading() && scroll.remaining() <= threshold
    }

    /// Mark the next page as in flight and return its token, or `None` when
    /// there is nothing to load or a request is already pending.
    pub fn begin_load(&mut self) -> Option<Option<PageToken>> {
        if !self.has_more || self.is_loading() {
            return None;
        }
        let token = self.next_token;
        self.in_flight = Some(token);
        self.error = None;
        debug!("Pager: loading page {:?}", token);
        Some(token)
    }

    /// Apply a page response. Returns whether it was applied.
    pub fn apply_page(
        &mut self,
        token: Option<PageToken>,
        result: Result<CapturePage, FetchError>,
    ) -> bool {
        if self.in_flight != Some(token) {
            debug!("Pager: discarding page {:?} (in flight: {:?})", token, self.in_flight);
            return false;
        }
        self.in_flight = None;
        match result {
            Ok(page) => {
                let before = self.items.len();
                for capture in page.items {
                    if self.index.contains_key(&capture.id) {
                        warn!("Pager: duplicate capture {} dropped", capture.id);
                        continue;
                    }
                    self.index.insert(capture.id.clone(), self.items.len());
                    self.items.push(capture);
                }
                self.has_more = page.has_more;
                self.next_token = page.next_token;
                if self.has_more && self.next_token.is_none() {
                    warn!("Pager: page claims more results but has no token");
                    self.has_more = false;
                }
                debug!(
                    "Pager: +{} captures ({} loaded, more: {})",
                    self.items.len() - before,
                    self.items.len(),
                    self.has_more
                );
            }
            Err(e) => self.error = Some(e),
        }
        true
    }

    /// Adjacent row in list order relative to `active`.
    pub fn step(&self, active: Option<&CaptureId>, delta: isize) -> ListStep {
        if self.items.is_empty() {
            return ListStep::Stay;
        }
        let target = match active {
            None if delta > 0 => 0,
            None => return ListStep::Stay,
            Some(id) => match self.position_of(id) {
                Some(pos) => pos as isize + delta,
                // Active row not loaded yet: page towards it
                None if self.has_more => return ListStep::LoadMore,
                None => return ListStep::Stay,
            },
        };
        if target < 0 {
            return ListStep::Stay;
        }
        match self.items.get(target as usize) {
            Some(c) => ListStep::Select(c.id.clone()),
            None if self.has_more => ListStep::LoadMore,
            None => ListStep::Stay,
        }
    }

    /// Note the current active capture; a change schedules a scroll.
    pub fn sync_active(&mut self, active: Option<&CaptureId>) {
        if self.last_active.as_ref() == active {
            return;
        }
        self.last_active = active.cloned();
        self.pending_scroll = active.cloned();
    }

    /// Row to bring into view, once it is loaded.
    pub fn take_scroll_target(&mut self) -> Option<usize> {
        let pos = self.pending_scroll.as_ref().and_then(|id| self.position_of(id))?;
        self.pending_scroll = None;
        Some(pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cap(id: &str) -> Capture {
        Capture {
            id: CaptureId::from(id),
            timestamp: chrono::DateTime::from_timestamp(0, 0).unwrap(),
            width: None,
            height: None,
            detections: Vec::new(),
            image: None,
            processed: false,
        }
    }

    fn page(ids: &[&str], next: Option<usize>) -> CapturePage {
        CapturePage {
            items: ids.iter().map(|s| cap(s)).collect(),
            has_more: next.is_some(),
            next_token: next.map(PageToken),
        }
    }

    fn id(s: &str) -> CaptureId {
        CaptureId::from(s)
    }

    fn loaded(ids: &[&str], next: Option<usize>) -> CapturePager {
        let mut p = CapturePager::new();
        let token = p.begin_load().unwrap();
        assert!(p.apply_page(token, Ok(page(ids, next))));
        p
    }

    fn near_end() -> ScrollMetrics {
        ScrollMetrics {
            offset: 850.0,
            viewport: 100.0,
            content: 1000.0,
        }
    }

    #[test]
    fn test_near_end_rule() {
        let p = loaded(&["a"], Some(1));
        assert!(p.should_request_more(near_end(), DEFAULT_LOAD_MORE_THRESHOLD));
        let top = ScrollMetrics {
            offset: 0.0,
            ..near_end()
        };
        assert!(!p.should_request_more(top, DEFAULT_LOAD_MORE_THRESHOLD));
    }

    #[test]
    fn test_single_request_in_flight() {
        let mut p = loaded(&["a", "b"], Some(2));
        assert_eq!(p.begin_load(), Some(Some(PageToken(2))));
        assert!(p.is_loading());
        assert!(!p.should_request_more(near_end(), DEFAULT_LOAD_MORE_THRESHOLD));
        assert_eq!(p.begin_load(), None);
    }

    #[test]
    fn test_appends_in_order_and_stops() {
        let mut p = loaded(&["a", "b"], Some(2));
        let t = p.begin_load().unwrap();
        p.apply_page(t, Ok(page(&["c", "b"], None)));
        let ids: Vec<_> = p.items().iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);
        assert!(!p.has_more());
        assert_eq!(p.begin_load(), None);
        assert!(!p.should_request_more(near_end(), DEFAULT_LOAD_MORE_THRESHOLD));
    }

    #[test]
    fn test_stale_page_discarded() {
        let mut p = loaded(&["a"], Some(1));
        p.begin_load();
        assert!(!p.apply_page(Some(PageToken(7)), Ok(page(&["zz"], None))));
        assert!(!p.apply_page(None, Ok(page(&["zz"], None))));
        assert_eq!(p.len(), 1);
        assert!(p.is_loading());
    }

    #[test]
    fn test_failure_inline_then_retry() {
        let mut p = loaded(&["a"], Some(1));
        let t = p.begin_load().unwrap();
        p.apply_page(t, Err(FetchError::Io("gone".into())));
        assert!(p.error().is_some());
        assert!(!p.is_loading());
        assert!(p.has_more());
        // Next scroll retries the same token and clears the error
        assert_eq!(p.begin_load(), Some(Some(PageToken(1))));
        assert!(p.error().is_none());
    }

    #[test]
    fn test_step() {
        let p = loaded(&["a", "b", "c"], Some(3));
        assert_eq!(p.step(Some(&id("b")), 1), ListStep::Select(id("c")));
        assert_eq!(p.step(Some(&id("b")), -1), ListStep::Select(id("a")));
        assert_eq!(p.step(Some(&id("a")), -1), ListStep::Stay);
        assert_eq!(p.step(Some(&id("c")), 1), ListStep::LoadMore);
        assert_eq!(p.step(None, 1), ListStep::Select(id("a")));
        assert_eq!(p.step(None, -1), ListStep::Stay);

        let done = loaded(&["a"], None);
        assert_eq!(done.step(Some(&id("a")), 1), ListStep::Stay);
    }

    #[test]
    fn test_step_from_unloaded_active_never_jumps_to_top() {
        // Active capture came from a plot click far past the loaded rows
        let p = loaded(&["c1", "c2"], Some(2));
        assert_eq!(p.step(Some(&id("c500")), 1), ListStep::LoadMore);
        assert_eq!(p.step(Some(&id("c500")), -1), ListStep::LoadMore);

        let done = loaded(&["c1", "c2"], None);
        assert_eq!(done.step(Some(&id("c500")), 1), ListStep::Stay);
        assert_eq!(done.step(Some(&id("c500")), -1), ListStep::Stay);
    }

    #[test]
    fn test_scroll_follows_external_changes() {
        let mut p = loaded(&["a", "b"], Some(2));
        p.sync_active(Some(&id("b")));
        assert_eq!(p.take_scroll_target(), Some(1));
        assert_eq!(p.take_scroll_target(), None);

        // Same active again: no scroll
        p.sync_active(Some(&id("b")));
        assert_eq!(p.take_scroll_target(), None);

        // Active not loaded yet: scroll once its page arrives
        p.sync_active(Some(&id("d")));
        assert_eq!(p.take_scroll_target(), None);
        let t = p.begin_load().unwrap();
        p.apply_page(t, Ok(page(&["c", "d"], None)));
        assert_eq!(p.take_scroll_target(), Some(3));
    }

    #[test]
    fn test_more_without_token_stops() {
        let mut p = CapturePager::new();
        let t = p.begin_load().unwrap();
        p.apply_page(
            t,
            Ok(CapturePage {
                items: vec![cap("a")],
                has_more: true,
                next_token: None,
            }),
        );
        assert!(!p.has_more());
    }
}
