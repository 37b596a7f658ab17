//! Sort-and-sweep broad-phase.
//!
//! Projects every bounding box onto the x axis, sorts the intervals and sweeps
//! them once, keeping an active list of boxes whose interval is still open.
//! Candidates are confirmed with a full box test. Runs in O(n log n + k).

use crate::types::Vec2;

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Aabb {
    pub min: Vec2,
    pub max: Vec2,
}

impl Aabb {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    pub fn from_center_half_extents(center: Vec2, half: Vec2) -> Self {
        Self {
            min: center - half,
            max: center + half,
        }
    }

    /// Closed-interval overlap: touching boxes overlap.
    pub fn overlaps(&self, other: &Aabb) -> bool {
        !(self.max.x < other.min.x
            || self.min.x > other.max.x
            || self.max.y < other.min.y
            || self.min.y > other.max.y)
    }

    pub fn is_finite(&self) -> bool {
        self.min.is_finite() && self.max.is_finite()
    }

    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }
}

/// One body as seen by the broad-phase.
#[derive(Debug, Clone, Copy)]
pub struct Proxy {
    pub aabb: Aabb,
    /// Infinite-mass participant (static, or frozen after a degenerate step).
    pub fixed: bool,
}

/// Returns index pairs `(i, k)` with `i < k` whose boxes overlap, sorted.
///
/// Pairs where both proxies are fixed are dropped. Boxes with non-finite
/// bounds are skipped so a corrupted body cannot poison the sweep.
pub fn sweep_and_prune(proxies: &[Proxy]) -> Vec<(usize, usize)> {
    #[derive(Clone, Copy)]
    struct Interval {
        min: f64,
        max: f64,
        idx: usize,
    }

    let mut intervals: Vec<Interval> = proxies
        .iter()
        .enumerate()
        .filter(|(_, p)| p.aabb.is_finite())
        .map(|(idx, p)| Interval {
            min: p.aabb.min.x,
            max: p.aabb.max.x,
            idx,
        })
        .collect();

    // Stable under ties: equal starts fall back to insertion order.
    intervals.sort_by(|a, b| a.min.total_cmp(&b.min).then(a.idx.cmp(&b.idx)));

    let mut active: Vec<Interval> = Vec::new();
    let mut pairs = Vec::new();

    for current in intervals {
        active.retain(|open| open.max >= current.min);
        for open in &active {
            let (i, k) = if open.idx < current.idx {
                (open.idx, current.idx)
            } else {
                (current.idx, open.idx)
            };
            if proxies[i].fixed && proxies[k].fixed {
                continue;
            }
            if proxies[i].aabb.overlaps(&proxies[k].aabb) {
                pairs.push((i, k));
            }
        }
        active.push(current);
    }

    pairs.sort_unstable();
    pairs
}
