//! Nearby route candidates: ingestion, caching and hit testing.
//!
//! Candidates come from the network and are untrusted. Each record is
//! validated on its own so one corrupt entry never hides the others.

use std::collections::HashSet;

use log::debug;
use rstar::{RTree, RTreeObject, AABB};
use serde::Deserialize;
use serde_json::Value;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::geo_utils::{distance_to_line, meters_to_degrees};
use crate::validator::validate_line_geometry;
use crate::{Bounds, LineGeometry, LngLat, OverlayError, Result};

/// A previously recorded route near the user, offered for selection.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct RouteCandidate {
    pub id: String,
    /// Short owner description supplied by the API (e.g. display name)
    pub owner_summary: String,
    pub geometry: LineGeometry,
    /// Distance from the user in meters; infinite when the API omitted it
    pub distance_from_user: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCandidate {
    id: Value,
    #[serde(default)]
    owner_summary: Option<String>,
    #[serde(default)]
    geometry: Option<Value>,
    #[serde(default)]
    distance_from_user: Option<f64>,
}

/// Validate a single candidate record.
pub fn parse_candidate(record: &Value) -> Result<RouteCandidate> {
    let raw = RawCandidate::deserialize(record).map_err(|e| OverlayError::MalformedCandidate {
        reason: e.to_string(),
    })?;

    let id = match &raw.id {
        Value::String(s) if !s.trim().is_empty() => s.clone(),
        Value::Number(n) => n.to_string(),
        other => {
            return Err(OverlayError::MalformedCandidate {
                reason: format!("unusable id {other}"),
            })
        }
    };

    let geometry_value = raw
        .geometry
        .as_ref()
        .ok_or(OverlayError::MissingCoordinates)?;
    let geometry = validate_line_geometry(geometry_value)?;

    let distance_from_user = raw
        .distance_from_user
        .filter(|d| d.is_finite() && *d >= 0.0)
        .unwrap_or(f64::INFINITY);

    Ok(RouteCandidate {
        id,
        owner_summary: raw.owner_summary.unwrap_or_default(),
        geometry,
        distance_from_user,
    })
}

/// Validate a nearby-route fetch result.
///
/// Malformed records and repeated ids are dropped with a debug log; the
/// survivors keep their input order. A payload that is not an array yields
/// no candidates.
pub fn parse_candidates(payload: &Value) -> Vec<RouteCandidate> {
    let Some(records) = payload.as_array() else {
        debug!("[Nearby] Payload is not an array, ignoring");
        return Vec::new();
    };

    #[cfg(feature = "parallel")]
    let parsed: Vec<Result<RouteCandidate>> = records.par_iter().map(parse_candidate).collect();

    #[cfg(not(feature = "parallel"))]
    let parsed: Vec<Result<RouteCandidate>> = records.iter().map(parse_candidate).collect();

    let mut seen = HashSet::new();
    let mut candidates = Vec::with_capacity(parsed.len());
    for (index, result) in parsed.into_iter().enumerate() {
        match result {
            Ok(candidate) => {
                if seen.insert(candidate.id.clone()) {
                    candidates.push(candidate);
                } else {
                    debug!("[Nearby] Dropping duplicate route id '{}'", candidate.id);
                }
            }
            Err(e) => debug!("[Nearby] Dropping candidate #{}: {}", index, e),
        }
    }

    debug!(
        "[Nearby] Accepted {} of {} candidates",
        candidates.len(),
        records.len()
    );
    candidates
}

// ============================================================================
// Cache
// ============================================================================

/// Nearby-route results with an expiry, owned by the network collaborator.
#[derive(Debug, Clone)]
pub struct NearbyRouteCache {
    candidates: Vec<RouteCandidate>,
    fetched_at_ms: Option<i64>,
    ttl_ms: u64,
}

impl NearbyRouteCache {
    /// Create an empty cache whose entries expire after `ttl_ms`.
    pub fn new(ttl_ms: u64) -> Self {
        Self {
            candidates: Vec::new(),
            fetched_at_ms: None,
            ttl_ms,
        }
    }

    /// Replace the cached candidates.
    pub fn store(&mut self, candidates: Vec<RouteCandidate>, now_ms: i64) {
        self.candidates = candidates;
        self.fetched_at_ms = Some(now_ms);
    }

    /// Cached candidates, or `None` once expired or never fetched.
    pub fn get(&self, now_ms: i64) -> Option<&[RouteCandidate]> {
        self.is_fresh(now_ms).then_some(self.candidates.as_slice())
    }

    /// Whether the cache holds a result younger than its ttl.
    pub fn is_fresh(&self, now_ms: i64) -> bool {
        match self.age_ms(now_ms) {
            Some(age) => age < self.ttl_ms,
            None => false,
        }
    }

    /// Age of the cached result; clock skew backwards counts as zero.
    pub fn age_ms(&self, now_ms: i64) -> Option<u64> {
        self.fetched_at_ms
            .map(|fetched| now_ms.saturating_sub(fetched).max(0) as u64)
    }

    /// Drop the cached result.
    pub fn invalidate(&mut self) {
        self.candidates.clear();
        self.fetched_at_ms = None;
    }
}

// ============================================================================
// Hit testing
// ============================================================================

/// Candidate envelope for R-tree indexing.
#[derive(Debug, Clone)]
struct IndexedRoute {
    id: String,
    bounds: Bounds,
    coordinates: Vec<LngLat>,
}

impl RTreeObject for IndexedRoute {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(
            [self.bounds.min_lng, self.bounds.min_lat],
            [self.bounds.max_lng, self.bounds.max_lat],
        )
    }
}

/// Spatial index over candidate routes for tap-to-select.
#[derive(Debug)]
pub struct CandidateIndex {
    tree: RTree<IndexedRoute>,
}

impl Default for CandidateIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl CandidateIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self { tree: RTree::new() }
    }

    /// Index a candidate set, replacing anything indexed before.
    pub fn rebuild(&mut self, candidates: &[RouteCandidate]) {
        let routes: Vec<IndexedRoute> = candidates
            .iter()
            .filter_map(|c| {
                c.geometry.bounds().map(|bounds| IndexedRoute {
                    id: c.id.clone(),
                    bounds,
                    coordinates: c.geometry.coordinates.clone(),
                })
            })
            .collect();
        self.tree = RTree::bulk_load(routes);
    }

    pub fn clear(&mut self) {
        self.tree = RTree::new();
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Id of the route nearest to `point`, if one lies within `radius_m`.
    pub fn pick(&self, point: LngLat, radius_m: f64) -> Option<&str> {
        let lat_margin = meters_to_degrees(radius_m);
        let lng_margin = lat_margin / point.lat.to_radians().cos().abs().max(0.01);
        let search = AABB::from_corners(
            [point.lng - lng_margin, point.lat - lat_margin],
            [point.lng + lng_margin, point.lat + lat_margin],
        );

        self.tree
            .locate_in_envelope_intersecting(&search)
            .map(|route| (route, distance_to_line(&point, &route.coordinates)))
            .filter(|(_, distance)| *distance <= radius_m)
            .min_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.id.cmp(&b.0.id)))
            .map(|(route, _)| route.id.as_str())
    }
}
