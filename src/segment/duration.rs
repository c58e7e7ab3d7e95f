//! Duration and time-warp segment.
//!
//! # Algorithm
//!
//! Each segment stores the minimal-duration schedule of a visit subsequence:
//! total duration (travel + service + unavoidable waiting), accumulated
//! time-warp (lateness after optimally placing waiting time), and the window
//! `[tw_early, tw_late]` of start times that realise that schedule. Merging
//! two segments over the edge between them is O(1) and associative, which is
//! what makes constant-time move evaluation possible.
//!
//! # Reference
//!
//! Vidal, T., Crainic, T.G., Gendreau, M., Prins, C. (2013). "A hybrid
//! genetic algorithm with adaptive diversity management for a large class of
//! vehicle routing problems with time-windows", *Computers & Operations
//! Research* 40(1), 475-489.

use crate::{Duration, MAX_VALUE};

/// Summary of the duration behaviour of a contiguous visit subsequence.
///
/// # Examples
///
/// ```
/// use hgs_routing::segment::DurationSegment;
///
/// let a = DurationSegment::visit(0, 0, 10, 0);
/// let b = DurationSegment::visit(0, 0, 5, 0);
/// let merged = DurationSegment::merge(7, &a, &b);
/// // Arriving at b no earlier than 7 overshoots its window by 2.
/// assert_eq!(merged.time_warp(), 2);
/// assert_eq!(merged.duration(), 7);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DurationSegment {
    duration: Duration,
    time_warp: Duration,
    tw_early: Duration,
    tw_late: Duration,
    release_time: Duration,
}

impl DurationSegment {
    /// Creates a segment from raw field values.
    pub fn new(
        duration: Duration,
        time_warp: Duration,
        tw_early: Duration,
        tw_late: Duration,
        release_time: Duration,
    ) -> Self {
        Self {
            duration,
            time_warp,
            tw_early,
            tw_late,
            release_time,
        }
    }

    /// Segment of a single visit with the given service duration and time
    /// window.
    pub fn visit(
        service_duration: Duration,
        tw_early: Duration,
        tw_late: Duration,
        release_time: Duration,
    ) -> Self {
        Self::new(service_duration, 0, tw_early, tw_late, release_time)
    }

    /// Identity segment: merging it on either side of `other` yields `other`.
    pub fn empty() -> Self {
        Self::new(0, 0, 0, MAX_VALUE, 0)
    }

    /// Merges two adjacent segments over an edge of the given duration.
    pub fn merge(edge_duration: Duration, first: &Self, second: &Self) -> Self {
        // Arrival at the second segment when starting the first at its
        // earliest minimal-duration start.
        let arrive = first.duration - first.time_warp + edge_duration;
        let wait = (second.tw_early - arrive - first.tw_late).max(0);
        let warp = (first.tw_early.saturating_add(arrive) - second.tw_late).max(0);

        Self {
            duration: first
                .duration
                .saturating_add(second.duration)
                .saturating_add(edge_duration)
                .saturating_add(wait),
            time_warp: first.time_warp.saturating_add(second.time_warp).saturating_add(warp),
            tw_early: (second.tw_early - arrive).max(first.tw_early) - wait,
            tw_late: (second.tw_late - arrive).min(first.tw_late) + warp,
            release_time: first.release_time.max(second.release_time),
        }
    }

    /// Total duration of the minimal-duration schedule: travel, service, and
    /// unavoidable waiting.
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Time-warp of the subsequence, including lateness forced by starting no
    /// earlier than the release time.
    pub fn time_warp(&self) -> Duration {
        self.time_warp + (self.release_time - self.tw_late).max(0)
    }

    /// Earliest start time of the minimal-duration schedule.
    pub fn tw_early(&self) -> Duration {
        self.tw_early
    }

    /// Latest start time of the minimal-duration schedule.
    pub fn tw_late(&self) -> Duration {
        self.tw_late
    }

    /// Largest release time over the visits in this segment.
    pub fn release_time(&self) -> Duration {
        self.release_time
    }

    /// Earliest time the subsequence can actually begin.
    pub fn start_time(&self) -> Duration {
        self.tw_early.max(self.release_time.min(self.tw_late))
    }
}
