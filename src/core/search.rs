//! Nearest-capture search over timeline ticks.
//!
//! The one nearest-match primitive: plot clicks, prev/next stepping in snap
//! mode and snap toggling all resolve through [`find_closest_capture_id`].
//!
//! Ticks must be ascending and contiguous (see `Timeline`); the search does
//! not check this. A tick whose `[start_date, end_date)` holds the target is
//! at distance zero; any other tick is measured from its `start_date`.

use chrono::{DateTime, TimeDelta, Utc};

use crate::entities::{CaptureId, TimelineTick};

/// Constraints for [`find_closest_capture_id`]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SearchOptions {
    /// Exclusive lower bound: ticks with `start_date <= min_date` are skipped
    pub min_date: Option<DateTime<Utc>>,
    /// Exclusive upper bound: ticks with `end_date >= max_date` are skipped
    pub max_date: Option<DateTime<Utc>>,
    /// Skip ticks without captures
    pub snap_to_detections: bool,
}

impl SearchOptions {
    pub fn snapping(snap_to_detections: bool) -> Self {
        Self {
            snap_to_detections,
            ..Self::default()
        }
    }

    /// Strictly after `date`
    pub fn after(date: DateTime<Utc>, snap_to_detections: bool) -> Self {
        Self {
            min_date: Some(date),
            max_date: None,
            snap_to_detections,
        }
    }

    /// Strictly before `date`
    pub fn before(date: DateTime<Utc>, snap_to_detections: bool) -> Self {
        Self {
            min_date: None,
            max_date: Some(date),
            snap_to_detections,
        }
    }
}

/// Whether `tick` may be returned under `opts`.
///
/// Snapping tests `num_captures`, not `num_detections`: an empty bucket
/// cannot hold detections, and bucket eligibility is defined on captures.
pub fn is_eligible(tick: &TimelineTick, opts: &SearchOptions) -> bool {
    if tick.representative_capture_id.is_none() {
        return false;
    }
    if opts.snap_to_detections && tick.num_captures == 0 {
        return false;
    }
    if let Some(min) = opts.min_date {
        if tick.start_date <= min {
            return false;
        }
    }
    if let Some(max) = opts.max_date {
        if tick.end_date >= max {
            return false;
        }
    }
    true
}

/// Distance from `tick` to `target`: zero inside the tick, else from its start.
pub fn tick_distance(tick: &TimelineTick, target: DateTime<Utc>) -> TimeDelta {
    if tick.start_date <= target && target < tick.end_date {
        TimeDelta::zero()
    } else {
        (tick.start_date - target).abs()
    }
}

/// Index of the eligible tick nearest to `target`; earliest index wins ties.
pub fn find_closest_tick(
    ticks: &[TimelineTick],
    target: DateTime<Utc>,
    opts: &SearchOptions,
) -> Option<usize> {
    let mut best: Option<(usize, TimeDelta)> = None;
    for (idx, tick) in ticks.iter().enumerate() {
        if !is_eligible(tick, opts) {
            continue;
        }
        let distance = tick_distance(tick, target);
        // Strict improvement only
        if best.is_none_or(|(_, d)| distance < d) {
            best = Some((idx, distance));
        }
    }
    best.map(|(idx, _)| idx)
}

/// Representative capture of the nearest eligible tick.
pub fn find_closest_capture_id(
    ticks: &[TimelineTick],
    target: DateTime<Utc>,
    opts: &SearchOptions,
) -> Option<CaptureId> {
    let idx = find_closest_tick(ticks, target, opts)?;
    ticks[idx].representative_capture_id.clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    fn tick(start: i64, end: i64, caps: u32, dets: u32, rep: Option<&str>) -> TimelineTick {
        TimelineTick {
            start_date: at(start),
            end_date: at(end),
            num_captures: caps,
            num_detections: dets,
            avg_detections: if caps > 0 { dets as f64 / caps as f64 } else { 0.0 },
            was_processed: true,
            representative_capture_id: rep.map(CaptureId::from),
        }
    }

    fn scenario() -> Vec<TimelineTick> {
        vec![tick(0, 5, 3, 0, Some("a")), tick(5, 10, 2, 4, Some("b"))]
    }

    fn id(s: &str) -> Option<CaptureId> {
        Some(CaptureId::from(s))
    }

    #[test]
    fn test_scenario_snap_picks_detecting_bucket() {
        let got = find_closest_capture_id(&scenario(), at(6), &SearchOptions::snapping(true));
        assert_eq!(got, id("b"));
    }

    #[test]
    fn test_scenario_raw_nearest() {
        let got = find_closest_capture_id(&scenario(), at(4), &SearchOptions::default());
        assert_eq!(got, id("a"));
    }

    #[test]
    fn test_containing_tick_beats_nearer_start() {
        // 9 is one second from 'short' by start, but falls inside 'long'
        let ticks = vec![tick(0, 10, 1, 0, Some("long")), tick(10, 12, 1, 0, Some("short"))];
        let got = find_closest_capture_id(&ticks, at(9), &SearchOptions::default());
        assert_eq!(got, id("long"));
        // End is exclusive: 10 belongs to 'short'
        let got = find_closest_capture_id(&ticks, at(10), &SearchOptions::default());
        assert_eq!(got, id("short"));
        // Containing tick ineligible: back to start distance
        let ticks = vec![tick(0, 10, 0, 0, Some("long")), tick(10, 12, 1, 0, Some("short"))];
        let got = find_closest_capture_id(&ticks, at(9), &SearchOptions::snapping(true));
        assert_eq!(got, id("short"));
    }

    #[test]
    fn test_min_date_boundary_is_exclusive() {
        let got = find_closest_capture_id(&scenario(), at(5), &SearchOptions::after(at(5), false));
        assert_eq!(got, None);
        let got = find_closest_capture_id(&scenario(), at(5), &SearchOptions::after(at(4), false));
        assert_eq!(got, id("b"));
    }

    #[test]
    fn test_max_date_boundary_is_exclusive() {
        // 'a' ends at 5: excluded when max is 5, kept when max is 6
        let got = find_closest_capture_id(&scenario(), at(5), &SearchOptions::before(at(5), false));
        assert_eq!(got, None);
        let got = find_closest_capture_id(&scenario(), at(5), &SearchOptions::before(at(6), false));
        assert_eq!(got, id("a"));
    }

    #[test]
    fn test_snap_excludes_empty_bucket_even_if_nearest() {
        let ticks = vec![
            tick(0, 10, 1, 1, Some("far")),
            tick(10, 20, 0, 0, Some("empty")),
        ];
        let got = find_closest_capture_id(&ticks, at(10), &SearchOptions::snapping(true));
        assert_eq!(got, id("far"));
        let got = find_closest_capture_id(&ticks, at(10), &SearchOptions::default());
        assert_eq!(got, id("empty"));
    }

    #[test]
    fn test_tie_goes_to_earliest() {
        let ticks = vec![
            tick(0, 10, 1, 0, Some("left")),
            tick(10, 20, 0, 0, None),
            tick(20, 30, 1, 0, Some("right")),
        ];
        let got = find_closest_capture_id(&ticks, at(10), &SearchOptions::default());
        assert_eq!(got, id("left"));
    }

    #[test]
    fn test_no_candidate() {
        let ticks = vec![tick(0, 10, 0, 0, None), tick(10, 20, 4, 0, None)];
        assert_eq!(find_closest_capture_id(&ticks, at(3), &SearchOptions::default()), None);
        assert_eq!(find_closest_capture_id(&[], at(3), &SearchOptions::default()), None);
    }

    fn arb_ticks() -> impl Strategy<Value = Vec<TimelineTick>> {
        prop::collection::vec((1i64..20, 0u32..3, any::<bool>()), 0..24).prop_map(|rows| {
            let mut start = 0;
            rows.into_iter()
                .enumerate()
                .map(|(i, (len, caps, has_rep))| {
                    let rep = (has_rep && caps > 0).then(|| format!("c{i}"));
                    let t = tick(start, start + len, caps, caps, rep.as_deref());
                    start += len;
                    t
                })
                .collect()
        })
    }

    proptest! {
        #[test]
        fn prop_result_is_earliest_minimal_eligible(
            ticks in arb_ticks(),
            target in -10i64..400,
            min in proptest::option::of(0i64..300),
            max in proptest::option::of(0i64..300),
            snap in any::<bool>(),
        ) {
            let opts = SearchOptions {
                min_date: min.map(at),
                max_date: max.map(at),
                snap_to_detections: snap,
            };
            let target = at(target);
            let got = find_closest_tick(&ticks, target, &opts);

            let eligible: Vec<usize> = (0..ticks.len()).filter(|&i| is_eligible(&ticks[i], &opts)).collect();
            match got {
                None => prop_assert!(eligible.is_empty()),
                Some(idx) => {
                    let t = &ticks[idx];
                    prop_assert!(t.representative_capture_id.is_some());
                    if snap { prop_assert!(t.num_captures > 0); }
                    if let Some(m) = opts.min_date { prop_assert!(t.start_date > m); }
                    if let Some(m) = opts.max_date { prop_assert!(t.end_date < m); }
                    let d = tick_distance(t, target);
                    for &j in &eligible {
                        let dj = tick_distance(&ticks[j], target);
                        prop_assert!(dj >= d);
                        if j < idx { prop_assert!(dj > d); }
                    }
                }
            }
        }
    }
}
