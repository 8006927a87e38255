//! Timeline model - time-bucketed activity of one session.
//!
//! Ticks are half-open `[start_date, end_date)` buckets, ascending and
//! contiguous. Consumers (search, activity plot) rely on that ordering and do
//! not re-check it; `is_well_formed()` exists only for load-time diagnostics.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use super::capture::Capture;
use super::ids::CaptureId;

/// Upper bound on ticks built by [`Timeline::aggregate`]
pub const MAX_AGGREGATE_TICKS: usize = 10_000;

/// One time bucket of a session's activity
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimelineTick {
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[serde(default)]
    pub num_captures: u32,
    #[serde(default)]
    pub num_detections: u32,
    #[serde(default)]
    pub avg_detections: f64,
    #[serde(default)]
    pub was_processed: bool,
    #[serde(default)]
    pub representative_capture_id: Option<CaptureId>,
}

/// Ordered ticks of a session
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timeline {
    ticks: Vec<TimelineTick>,
}

impl Timeline {
    /// Wrap a provider feed as-is. Caller guarantees ordering.
    pub fn from_ticks(ticks: Vec<TimelineTick>) -> Self {
        Self { ticks }
    }

    pub fn ticks(&self) -> &[TimelineTick] {
        &self.ticks
    }

    pub fn get(&self, index: usize) -> Option<&TimelineTick> {
        self.ticks.get(index)
    }

    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }

    /// Session span covered by the ticks
    pub fn span(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let first = self.ticks.first()?;
        let last = self.ticks.last()?;
        Some((first.start_date, last.end_date))
    }

    /// Largest capture count of any tick (plot scaling)
    pub fn max_captures(&self) -> u32 {
        self.ticks.iter().map(|t| t.num_captures).max().unwrap_or(0)
    }

    /// Index of the tick whose interval contains `at`
    pub fn tick_index_at(&self, at: DateTime<Utc>) -> Option<usize> {
        self.ticks
            .iter()
            .position(|t| t.start_date <= at && at < t.end_date)
    }

    /// True when ticks are non-empty intervals, ascending and contiguous.
    pub fn is_well_formed(&self) -> bool {
        self.ticks.iter().all(|t| t.start_date < t.end_date)
            && self
                .ticks
                .windows(2)
                .all(|w| w[0].end_date == w[1].start_date)
    }

    /// Build ticks from raw captures.
    ///
    /// Buckets are aligned to multiples of `interval` since the Unix epoch and
    /// cover the first to the last capture. Empty buckets are kept so the
    /// timeline stays contiguous; they carry no representative.
    pub fn aggregate(captures: &[Capture], interval: TimeDelta) -> Self {
        let mut step = interval.num_seconds().max(1);
        let first = captures.iter().map(|c| c.timestamp.timestamp()).min();
        let last = captures.iter().map(|c| c.timestamp.timestamp()).max();
        let (Some(first), Some(last)) = (first, last) else {
            return Self::default();
        };

        // Widen buckets when outliers stretch the span too far
        let span_buckets = last.div_euclid(step) - first.div_euclid(step) + 1;
        let limit = MAX_AGGREGATE_TICKS as i64;
        if span_buckets > limit {
            let widened = step * ((span_buckets + limit - 3) / (limit - 2));
            log::warn!(
                "Capture span needs {} buckets of {}s; using {}s buckets",
                span_buckets,
                step,
                widened
            );
            step = widened;
        }

        let origin = first.div_euclid(step) * step;
        let count = ((last.div_euclid(step) * step - origin) / step + 1) as usize;

        let mut ticks: Vec<TimelineTick> = (0..count)
            .filter_map(|i| {
                let start = DateTime::from_timestamp(origin + i as i64 * step, 0)?;
                let end = DateTime::from_timestamp(origin + (i as i64 + 1) * step, 0)?;
                Some(TimelineTick {
                    start_date: start,
                    end_date: end,
                    num_captures: 0,
                    num_detections: 0,
                    avg_detections: 0.0,
                    was_processed: false,
                    representative_capture_id: None,
                })
            })
            .collect();

        // (detections, timestamp) of the current representative per bucket
        let mut best: Vec<Option<(usize, DateTime<Utc>)>> = vec![None; ticks.len()];
        let mut all_processed = vec![true; ticks.len()];

        for cap in captures {
            let idx = ((cap.timestamp.timestamp() - origin) / step) as usize;
            let Some(tick) = ticks.get_mut(idx) else {
                continue;
            };
            let dets = cap.num_detections();
            tick.num_captures += 1;
            tick.num_detections += dets as u32;
            all_processed[idx] &= cap.processed;

            let better = match best[idx] {
                None => true,
                Some((best_dets, best_ts)) => {
                    dets > best_dets || (dets == best_dets && cap.timestamp < best_ts)
                }
            };
            if better {
                best[idx] = Some((dets, cap.timestamp));
                tick.representative_capture_id = Some(cap.id.clone());
            }
        }

        for (tick, processed) in ticks.iter_mut().zip(all_processed) {
            if tick.num_captures > 0 {
                tick.avg_detections = tick.num_detections as f64 / tick.num_captures as f64;
                tick.was_processed = processed;
            }
        }

        log::debug!(
            "Aggregated {} captures into {} ticks ({}s buckets)",
            captures.len(),
            ticks.len(),
            step
        );
        Self { ticks }
    }
}
