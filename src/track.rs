//! Live and historical track geometry.
//!
//! Live points are append-only within a session, so the builder keys its
//! cache on sequence length and only converts samples it has not seen.
//! Historical tracks are decimated to bound render cost.

use log::debug;

use crate::geo_utils::haversine_distance;
use crate::{LineGeometry, LngLat, PositionSample};

/// Incremental builder for the live track geometry.
///
/// Feed it the full live point sequence on every render pass. A pass with
/// the same length as the previous one returns the cached line untouched.
/// A shorter sequence means a new session started, and the builder starts
/// over.
#[derive(Debug, Clone, Default)]
pub struct TrackBuilder {
    line: Option<LineGeometry>,
    /// First coordinate, held until a second one makes a line
    pending: Option<LngLat>,
    /// Length of the sample sequence the cache reflects
    seen: usize,
    /// Running haversine length in meters
    distance_m: f64,
    first_timestamp_ms: Option<i64>,
    last_timestamp_ms: Option<i64>,
    rebuilds: u64,
}

impl TrackBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bring the cached geometry up to date and return it.
    ///
    /// Returns `None` while fewer than two points exist.
    pub fn build(&mut self, points: &[PositionSample]) -> Option<&LineGeometry> {
        if points.len() != self.seen {
            if points.len() < self.seen {
                debug!(
                    "[TrackBuilder] Sequence shrank from {} to {}, rebuilding",
                    self.seen,
                    points.len()
                );
                self.reset();
            }
            self.append(&points[self.seen..]);
            self.seen = points.len();
            self.rebuilds += 1;
        }
        self.geometry()
    }

    /// The cached geometry, without looking at new samples.
    pub fn geometry(&self) -> Option<&LineGeometry> {
        self.line.as_ref()
    }

    /// Forget everything; used when a new session starts.
    pub fn reset(&mut self) {
        *self = Self {
            rebuilds: self.rebuilds,
            ..Self::default()
        };
    }

    /// Distance covered by the live track in meters.
    pub fn distance_m(&self) -> f64 {
        self.distance_m
    }

    /// Time between the first and last accepted samples.
    pub fn elapsed_ms(&self) -> i64 {
        match (self.first_timestamp_ms, self.last_timestamp_ms) {
            (Some(first), Some(last)) => (last - first).max(0),
            _ => 0,
        }
    }

    /// Number of times new samples were folded into the cache.
    pub fn rebuild_count(&self) -> u64 {
        self.rebuilds
    }

    fn append(&mut self, new_points: &[PositionSample]) {
        for sample in new_points {
            if !sample.is_valid() {
                debug!(
                    "[TrackBuilder] Skipping invalid sample at t={}",
                    sample.timestamp_ms
                );
                continue;
            }
            let coord = sample.coord();
            self.first_timestamp_ms.get_or_insert(sample.timestamp_ms);
            self.last_timestamp_ms = Some(sample.timestamp_ms);

            if let Some(line) = self.line.as_mut() {
                if let Some(prev) = line.last() {
                    self.distance_m += haversine_distance(prev, &coord);
                }
                line.coordinates.push(coord);
            } else if let Some(first) = self.pending.take() {
                self.distance_m += haversine_distance(&first, &coord);
                self.line = Some(LineGeometry {
                    coordinates: vec![first, coord],
                });
            } else {
                self.pending = Some(coord);
            }
        }
    }
}

/// Uniformly thin a sequence to at most roughly `max_points` entries.
///
/// Keeps every `ceil(len / max_points)`-th element starting with the first,
/// and always keeps the last. Sequences already within budget are returned
/// whole.
pub fn decimate<T: Clone>(items: &[T], max_points: usize) -> Vec<T> {
    if max_points == 0 || items.len() <= max_points {
        return items.to_vec();
    }
    let stride = decimation_stride(items.len(), max_points);
    let mut kept: Vec<T> = items.iter().step_by(stride).cloned().collect();
    if (items.len() - 1) % stride != 0 {
        if let Some(last) = items.last() {
            kept.push(last.clone());
        }
    }
    kept
}

/// Stride used by [`decimate`].
pub fn decimation_stride(total_points: usize, max_points: usize) -> usize {
    if max_points == 0 {
        return 1;
    }
    total_points.div_ceil(max_points).max(1)
}

/// Renderable geometry for a recorded (non-live) track.
///
/// Invalid samples are dropped before decimation. Returns `None` when fewer
/// than two usable samples remain.
pub fn historical_geometry(samples: &[PositionSample], max_points: usize) -> Option<LineGeometry> {
    let coords: Vec<LngLat> = samples
        .iter()
        .filter(|s| s.is_valid())
        .map(PositionSample::coord)
        .collect();
    LineGeometry::from_coords(decimate(&coords, max_points)).ok()
}
