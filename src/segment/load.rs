//! Load segment for one capacity dimension.
//!
//! Tracks the total delivery and pickup quantities of a visit subsequence
//! together with the maximum load carried while traversing it. Deliveries
//! are on board from the start of the segment; pickups stay on board until
//! its end. A reload depot ends the segment: trips are summarised
//! independently and their excesses summed.

use crate::Load;

/// Summary of the load behaviour of a contiguous visit subsequence, for a
/// single capacity dimension.
///
/// # Examples
///
/// ```
/// use hgs_routing::segment::LoadSegment;
///
/// let a = LoadSegment::client(4, 0);
/// let b = LoadSegment::client(0, 6);
/// let m = LoadSegment::merge(&a, &b);
/// assert_eq!(m.delivery(), 4);
/// assert_eq!(m.pickup(), 6);
/// assert_eq!(m.max_load(), 6);
/// assert_eq!(m.excess(5), 1);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadSegment {
    delivery: Load,
    pickup: Load,
    load: Load,
}

impl LoadSegment {
    /// Creates a segment from raw field values.
    pub fn new(delivery: Load, pickup: Load, load: Load) -> Self {
        Self {
            delivery,
            pickup,
            load,
        }
    }

    /// Segment of a single client visit.
    pub fn client(delivery: Load, pickup: Load) -> Self {
        Self::new(delivery, pickup, delivery.max(pickup))
    }

    /// Identity segment: merging it on either side of `other` yields `other`.
    pub fn empty() -> Self {
        Self::new(0, 0, 0)
    }

    /// Merges two adjacent segments.
    pub fn merge(first: &Self, second: &Self) -> Self {
        Self {
            delivery: first.delivery + second.delivery,
            pickup: first.pickup + second.pickup,
            load: (first.load + second.delivery).max(second.load + first.pickup),
        }
    }

    /// Total quantity delivered within this segment.
    pub fn delivery(&self) -> Load {
        self.delivery
    }

    /// Total quantity picked up within this segment.
    pub fn pickup(&self) -> Load {
        self.pickup
    }

    /// Maximum load carried at any point while traversing this segment.
    pub fn max_load(&self) -> Load {
        self.load
    }

    /// Load in excess of the given capacity.
    pub fn excess(&self, capacity: Load) -> Load {
        (self.load - capacity).max(0)
    }
}
