//! Synthetic GPS sessions for stress testing and benchmarking.
//!
//! Generates a live recording as a noisy walk along a winding path, plus a
//! nearby-route payload shaped like the network's, optionally with some
//! deliberately corrupt records mixed in.
//!
//! Feature-gated behind `synthetic`; not included in production builds.
//!
//! # Example
//!
//! ```rust
//! use trackoverlay::synthetic::{PathPattern, SyntheticSession};
//! use trackoverlay::LngLat;
//!
//! let session = SyntheticSession {
//!     origin: LngLat::new(21.01, 52.23),
//!     sample_count: 500,
//!     sample_interval_ms: 1_000,
//!     step_meters: 3.0,
//!     pattern: PathPattern::Winding,
//!     gps_noise_sigma_meters: 3.0,
//!     seed: 42,
//! };
//!
//! let samples = session.generate();
//! assert_eq!(samples.len(), 500);
//! ```

use std::f64::consts::PI;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{json, Value};

use crate::geo_utils::METERS_PER_DEGREE_LAT;
use crate::{LngLat, PositionSample};

// ============================================================================
// Types
// ============================================================================

/// Shape of the generated path.
#[derive(Debug, Clone, Copy)]
pub enum PathPattern {
    /// Straight line with minor drift.
    Straight,
    /// Winding path with realistic turns.
    Winding,
    /// Loop that returns near its start point.
    Loop,
}

/// Configuration for a synthetic live session.
#[derive(Debug, Clone)]
pub struct SyntheticSession {
    /// Starting point.
    pub origin: LngLat,
    /// Number of samples to emit.
    pub sample_count: usize,
    /// Time between samples in milliseconds.
    pub sample_interval_ms: i64,
    /// Distance moved between samples in meters.
    pub step_meters: f64,
    /// Shape of the path.
    pub pattern: PathPattern,
    /// GPS noise standard deviation in meters (approximated as uniform).
    pub gps_noise_sigma_meters: f64,
    /// RNG seed for deterministic reproduction.
    pub seed: u64,
}

// ============================================================================
// Coordinate Helpers
// ============================================================================

fn meters_to_deg_lat(meters: f64) -> f64 {
    meters / METERS_PER_DEGREE_LAT
}

fn meters_to_deg_lng(meters: f64, latitude: f64) -> f64 {
    let meters_per_deg_lng = METERS_PER_DEGREE_LAT * latitude.to_radians().cos();
    if meters_per_deg_lng.abs() < 1e-10 {
        return 0.0;
    }
    meters / meters_per_deg_lng
}

// ============================================================================
// Generation
// ============================================================================

impl SyntheticSession {
    /// Generate the samples, oldest first.
    pub fn generate(&self) -> Vec<PositionSample> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let path = walk(
            self.origin,
            self.sample_count,
            self.step_meters,
            self.pattern,
            &mut rng,
        );

        path.iter()
            .enumerate()
            .map(|(i, c)| {
                let (lng, lat) = jitter(c, self.gps_noise_sigma_meters, &mut rng);
                PositionSample::new(lat, lng, i as i64 * self.sample_interval_ms)
            })
            .collect()
    }
}

/// Build a nearby-route fetch payload around `origin`.
///
/// Every `corrupt_every`-th record (if non-zero) has its coordinates
/// removed, mimicking malformed network data.
pub fn nearby_routes_payload(
    origin: LngLat,
    route_count: usize,
    points_per_route: usize,
    corrupt_every: usize,
    seed: u64,
) -> Value {
    let mut rng = StdRng::seed_from_u64(seed);
    let records: Vec<Value> = (0..route_count)
        .map(|i| {
            let heading = i as f64 * (2.0 * PI / route_count.max(1) as f64);
            let offset = 150.0 + rng.gen_range(0.0..400.0);
            let start = LngLat::new(
                origin.lng + meters_to_deg_lng(offset * heading.cos(), origin.lat),
                origin.lat + meters_to_deg_lat(offset * heading.sin()),
            );
            let path = walk(start, points_per_route, 25.0, PathPattern::Winding, &mut rng);
            let coordinates: Vec<[f64; 2]> = path.iter().map(|c| [c.lng, c.lat]).collect();

            let geometry = if corrupt_every > 0 && (i + 1) % corrupt_every == 0 {
                json!({ "type": "LineString" })
            } else {
                json!({ "type": "LineString", "coordinates": coordinates })
            };

            json!({
                "id": format!("route-{i}"),
                "ownerSummary": format!("Athlete {}", i % 7),
                "geometry": geometry,
                "distanceFromUser": offset,
            })
        })
        .collect();
    Value::Array(records)
}

fn walk(
    origin: LngLat,
    count: usize,
    step_meters: f64,
    pattern: PathPattern,
    rng: &mut StdRng,
) -> Vec<LngLat> {
    let mut points = Vec::with_capacity(count);
    if count == 0 {
        return points;
    }
    let mut heading: f64 = rng.gen_range(0.0..2.0 * PI);
    let mut current = origin;
    points.push(current);

    for i in 1..count {
        let heading_change = match pattern {
            PathPattern::Straight => rng.gen_range(-0.02..0.02),
            PathPattern::Winding => {
                let base_turn = (i as f64 * 0.05).sin() * 0.2;
                base_turn + rng.gen_range(-0.1..0.1)
            }
            PathPattern::Loop => 2.0 * PI / count as f64 + rng.gen_range(-0.02..0.02),
        };
        heading += heading_change;

        current = LngLat::new(
            current.lng + meters_to_deg_lng(step_meters * heading.cos(), current.lat),
            current.lat + meters_to_deg_lat(step_meters * heading.sin()),
        );
        points.push(current);
    }
    points
}

fn jitter(c: &LngLat, sigma_meters: f64, rng: &mut StdRng) -> (f64, f64) {
    if sigma_meters <= 0.0 {
        return (c.lng, c.lat);
    }
    let dx = rng.gen_range(-sigma_meters..sigma_meters);
    let dy = rng.gen_range(-sigma_meters..sigma_meters);
    (
        c.lng + meters_to_deg_lng(dx, c.lat),
        c.lat + meters_to_deg_lat(dy),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_candidates;

    #[test]
    fn test_generation_is_deterministic() {
        let session = SyntheticSession {
            origin: LngLat::new(8.55, 47.37),
            sample_count: 50,
            sample_interval_ms: 1_000,
            step_meters: 4.0,
            pattern: PathPattern::Loop,
            gps_noise_sigma_meters: 2.0,
            seed: 7,
        };
        assert_eq!(session.generate(), session.generate());
        assert!(session.generate().iter().all(PositionSample::is_valid));
    }

    #[test]
    fn test_corrupt_records_are_dropped() {
        let payload = nearby_routes_payload(LngLat::new(8.55, 47.37), 10, 20, 5, 1);
        assert_eq!(parse_candidates(&payload).len(), 8);
    }
}
