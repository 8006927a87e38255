//! Session archive - a directory with `session.json` and image files.
//!
//! Layout:
//! ```text
//! session_dir/
//!   session.json      { session, captures, timeline?, occurrences?, timeline_interval_minutes? }
//!   images/...        paths referenced by captures[].image
//! ```
//!
//! Captures are ordered by (timestamp, id) at load; that order defines paging,
//! sibling ids and 1-based positions. A missing `timeline` is aggregated from
//! the captures; missing occurrence records are derived from detections.

use chrono::{DateTime, TimeDelta, Utc};
use log::{debug, info, warn};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use super::{FetchError, SessionSource};
use crate::entities::{
    Capture, CaptureDetails, CaptureId, CapturePage, OccurrenceDetails, OccurrenceId, PageToken,
    SessionId, SessionInfo, Timeline, TimelineTick,
};

pub const SESSION_FILE: &str = "session.json";
pub const DEFAULT_PAGE_SIZE: usize = 50;
pub const DEFAULT_INTERVAL_MINUTES: i64 = 10;

#[derive(Deserialize)]
struct SessionFile {
    session: SessionInfo,
    #[serde(default)]
    captures: Vec<Capture>,
    #[serde(default)]
    timeline: Option<Vec<TimelineTick>>,
    #[serde(default)]
    occurrences: Vec<OccurrenceDetails>,
    #[serde(default)]
    timeline_interval_minutes: Option<i64>,
}

/// Read-only archive implementing all providers.
#[derive(Debug)]
pub struct SessionArchive {
    root: PathBuf,
    info: SessionInfo,
    captures: Vec<Capture>,
    index: HashMap<CaptureId, usize>,
    timeline: Timeline,
    occurrences: HashMap<OccurrenceId, OccurrenceDetails>,
    page_size: usize,
}

impl SessionArchive {
    /// Open `dir/session.json`. `interval_minutes` is used only when the
    /// file carries neither a timeline nor its own interval.
    pub fn open(dir: &Path, interval_minutes: Option<i64>) -> Result<Self, FetchError> {
        let path = dir.join(SESSION_FILE);
        let raw = std::fs::read_to_string(&path)
            .map_err(|e| FetchError::Io(format!("{}: {}", path.display(), e)))?;
        let file: SessionFile = serde_json::from_str(&raw)?;
        let interval = file
            .timeline_interval_minutes
            .or(interval_minutes)
            .unwrap_or(DEFAULT_INTERVAL_MINUTES);
        let archive = Self::from_parts(
            dir.to_path_buf(),
            file.session,
            file.captures,
            file.timeline,
            file.occurrences,
            interval,
        );
        info!(
            "Opened session '{}' ({}): {} captures, {} ticks",
            archive.info.name,
            archive.info.id,
            archive.captures.len(),
            archive.timeline.len()
        );
        Ok(archive)
    }

    fn from_parts(
        root: PathBuf,
        info: SessionInfo,
        mut captures: Vec<Capture>,
        timeline: Option<Vec<TimelineTick>>,
        occurrences: Vec<OccurrenceDetails>,
        interval_minutes: i64,
    ) -> Self {
        captures.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));

        let mut index = HashMap::with_capacity(captures.len());
        captures.retain(|c| {
            if index.contains_key(&c.id) {
                warn!("Duplicate capture id {}, keeping first", c.id);
                return false;
            }
            index.insert(c.id.clone(), 0);
            true
        });
        for (i, c) in captures.iter().enumerate() {
            index.insert(c.id.clone(), i);
        }

        let timeline = match timeline {
            Some(ticks) => {
                let tl = Timeline::from_ticks(ticks);
                if !tl.is_well_formed() {
                    warn!("Session {} timeline is not ascending/contiguous; search results may be off", info.id);
                }
                tl
            }
            None => Timeline::aggregate(&captures, TimeDelta::minutes(interval_minutes.max(1))),
        };

        let mut occ = derive_occurrences(&captures);
        for o in occurrences {
            occ.insert(o.id.clone(), o);
        }

        Self {
            root,
            info,
            captures,
            index,
            timeline,
            occurrences: occ,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn info(&self) -> &SessionInfo {
        &self.info
    }

    pub fn session_id(&self) -> &SessionId {
        &self.info.id
    }

    pub fn len(&self) -> usize {
        self.captures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.captures.is_empty()
    }

    fn check_session(&self, session: &SessionId) -> Result<(), FetchError> {
        if *session == self.info.id {
            Ok(())
        } else {
            Err(FetchError::not_found("session", session))
        }
    }
}

fn derive_occurrences(captures: &[Capture]) -> HashMap<OccurrenceId, OccurrenceDetails> {
    let mut out: HashMap<OccurrenceId, OccurrenceDetails> = HashMap::new();
    for cap in captures {
        for det in &cap.detections {
            let Some(occ_id) = &det.occurrence_id else {
                continue;
            };
            let entry = out.entry(occ_id.clone()).or_insert_with(|| OccurrenceDetails {
                id: occ_id.clone(),
                label: None,
                best_score: None,
                detections_count: 0,
                first_seen: None,
                last_seen: None,
            });
            entry.detections_count += 1;
            if entry.label.is_none() {
                entry.label = det.label.clone();
            }
            if entry.best_score.is_none_or(|s| det.score > s) {
                entry.best_score = Some(det.score);
            }
            entry.first_seen = Some(min_time(entry.first_seen, cap.timestamp));
            entry.last_seen = Some(max_time(entry.last_seen, cap.timestamp));
        }
    }
    out
}

fn min_time(a: Option<DateTime<Utc>>, b: DateTime<Utc>) -> DateTime<Utc> {
    a.map_or(b, |a| a.min(b))
}

fn max_time(a: Option<DateTime<Utc>>, b: DateTime<Utc>) -> DateTime<Utc> {
    a.map_or(b, |a| a.max(b))
}

/// Relative path without `..` or root components
fn is_contained(rel: &Path) -> bool {
    rel.components().all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

impl SessionSource for SessionArchive {
    fn fetch_captures(
        &self,
        session: &SessionId,
        token: Option<PageToken>,
    ) -> Result<CapturePage, FetchError> {
        self.check_session(session)?;
        let start = token.map(|t| t.0).unwrap_or(0).min(self.captures.len());
        let end = (start + self.page_size).min(self.captures.len());
        let has_more = end < self.captures.len();
        debug!("Page {}..{} of {} (has_more={})", start, end, self.captures.len(), has_more);
        Ok(CapturePage {
            items: self.captures[start..end].to_vec(),
            has_more,
            next_token: has_more.then_some(PageToken(end)),
        })
    }

    fn fetch_capture_details(&self, id: &CaptureId) -> Result<CaptureDetails, FetchError> {
        let &idx = self
            .index
            .get(id)
            .ok_or_else(|| FetchError::not_found("capture", id))?;
        let prev = idx.checked_sub(1).map(|i| self.captures[i].id.clone());
        let next = self.captures.get(idx + 1).map(|c| c.id.clone());
        Ok(CaptureDetails {
            capture: self.captures[idx].clone(),
            prev_capture_id: prev,
            next_capture_id: next,
            current_index: idx + 1,
            total_captures: self.captures.len(),
        })
    }

    fn fetch_timeline(&self, session: &SessionId) -> Result<Timeline, FetchError> {
        self.check_session(session)?;
        Ok(self.timeline.clone())
    }

    fn fetch_occurrence(&self, id: &OccurrenceId) -> Result<OccurrenceDetails, FetchError> {
        self.occurrences
            .get(id)
            .cloned()
            .ok_or_else(|| FetchError::not_found("occurrence", id))
    }

    fn image_bytes(&self, capture: &Capture) -> Result<Vec<u8>, FetchError> {
        let rel = capture
            .image
            .as_deref()
            .ok_or_else(|| FetchError::not_found("image for capture", &capture.id))?;
        let rel = Path::new(rel);
        if !is_contained(rel) {
            return Err(FetchError::Io(format!(
                "image path escapes session directory: {}",
                rel.display()
            )));
        }
        let path = self.root.join(rel);
        std::fs::read(&path).map_err(|e| FetchError::Io(format!("{}: {}", path.display(), e)))
    }
}
