//! Geographic helpers shared by the track builder and route picking.

use geo::{Coord, EuclideanDistance, HaversineDistance, LineString, Point};

use crate::{LngLat, PositionSample};

/// Meters per degree of latitude.
pub const METERS_PER_DEGREE_LAT: f64 = 111_320.0;

/// Great-circle distance between two coordinates in meters.
pub fn haversine_distance(a: &LngLat, b: &LngLat) -> f64 {
    Point::new(a.lng, a.lat).haversine_distance(&Point::new(b.lng, b.lat))
}

/// Total length of a sample sequence in meters.
pub fn track_length(samples: &[PositionSample]) -> f64 {
    samples
        .windows(2)
        .map(|w| haversine_distance(&w[0].coord(), &w[1].coord()))
        .sum()
}

/// Convert a radius in meters to degrees of latitude.
pub fn meters_to_degrees(meters: f64) -> f64 {
    meters / METERS_PER_DEGREE_LAT
}

/// Approximate distance in meters from a point to a polyline.
///
/// Projects into a local equirectangular frame centred on `point`, which is
/// accurate at the tap-tolerance scale this is used for.
pub fn distance_to_line(point: &LngLat, line: &[LngLat]) -> f64 {
    if line.is_empty() {
        return f64::INFINITY;
    }
    let cos_lat = point.lat.to_radians().cos();
    let project = |c: &LngLat| Coord {
        x: (c.lng - point.lng) * METERS_PER_DEGREE_LAT * cos_lat,
        y: (c.lat - point.lat) * METERS_PER_DEGREE_LAT,
    };

    let origin = Point::new(0.0, 0.0);
    if line.len() == 1 {
        return origin.euclidean_distance(&Point::from(project(&line[0])));
    }
    let projected: LineString<f64> = line.iter().map(project).collect();
    origin.euclidean_distance(&projected)
}
