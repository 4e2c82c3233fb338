//! Render-safety checks for geometry arriving from the network.
//!
//! Accepts a GeoJSON `LineString` geometry, or a `Feature` wrapping one.
//! Nothing is repaired: a payload is either converted as-is or rejected.

use log::debug;
use serde_json::Value;

use crate::{LineGeometry, LngLat, OverlayError, Result};

const LINE_TYPE: &str = "LineString";
const FEATURE_TYPE: &str = "Feature";

/// Validate an untrusted payload and convert it to a [`LineGeometry`].
///
/// Rejects when the type tag is not a line type, `coordinates` is not a
/// sequence, the sequence has fewer than two entries, or any entry is not
/// a finite in-range `[lng, lat, ...]` pair.
pub fn validate_line_geometry(candidate: &Value) -> Result<LineGeometry> {
    let geometry = unwrap_feature(candidate)?;

    match geometry.get("type").and_then(Value::as_str) {
        Some(LINE_TYPE) => {}
        Some(other) => {
            return Err(OverlayError::NotALineType {
                found: other.to_string(),
            })
        }
        None => {
            return Err(OverlayError::NotALineType {
                found: type_name(geometry.get("type")).to_string(),
            })
        }
    }

    let raw = geometry
        .get("coordinates")
        .and_then(Value::as_array)
        .ok_or(OverlayError::MissingCoordinates)?;

    if raw.len() < LineGeometry::MIN_POINTS {
        return Err(OverlayError::InsufficientPoints {
            context: "line geometry".to_string(),
            point_count: raw.len(),
            minimum_required: LineGeometry::MIN_POINTS,
        });
    }

    let coordinates = raw
        .iter()
        .enumerate()
        .map(|(index, pair)| parse_position(index, pair))
        .collect::<Result<Vec<LngLat>>>()?;

    LineGeometry::from_coords(coordinates)
}

/// Boolean render-safe verdict for an untrusted payload.
///
/// Rejections are logged at debug level and never propagated.
pub fn is_render_safe(candidate: &Value) -> bool {
    match validate_line_geometry(candidate) {
        Ok(_) => true,
        Err(e) => {
            debug!("[Validator] Rejected geometry: {}", e);
            false
        }
    }
}

/// Validate an optional payload, logging and dropping it when malformed.
pub fn validated_or_none(label: &str, candidate: Option<&Value>) -> Option<LineGeometry> {
    let candidate = candidate?;
    match validate_line_geometry(candidate) {
        Ok(line) => Some(line),
        Err(e) => {
            debug!("[Validator] Dropping {}: {}", label, e);
            None
        }
    }
}

fn unwrap_feature(candidate: &Value) -> Result<&Value> {
    if candidate.get("type").and_then(Value::as_str) == Some(FEATURE_TYPE) {
        return candidate
            .get("geometry")
            .filter(|g| g.is_object())
            .ok_or_else(|| OverlayError::NotALineType {
                found: "Feature without geometry".to_string(),
            });
    }
    Ok(candidate)
}

fn parse_position(index: usize, pair: &Value) -> Result<LngLat> {
    let values = pair
        .as_array()
        .ok_or_else(|| OverlayError::InvalidCoordinate {
            index,
            reason: format!("expected a position array, got {}", type_name(Some(pair))),
        })?;

    if values.len() < 2 {
        return Err(OverlayError::InvalidCoordinate {
            index,
            reason: format!("position has {} values, need 2", values.len()),
        });
    }

    let (Some(lng), Some(lat)) = (values[0].as_f64(), values[1].as_f64()) else {
        return Err(OverlayError::InvalidCoordinate {
            index,
            reason: "position values are not numbers".to_string(),
        });
    };

    let coord = LngLat::new(lng, lat);
    if !coord.is_valid() {
        return Err(OverlayError::InvalidCoordinate {
            index,
            reason: format!("({lng}, {lat}) is outside valid lng/lat ranges"),
        });
    }
    Ok(coord)
}

fn type_name(value: Option<&Value>) -> &'static str {
    match value {
        None | Some(Value::Null) => "null",
        Some(Value::Bool(_)) => "bool",
        Some(Value::Number(_)) => "number",
        Some(Value::String(_)) => "string",
        Some(Value::Array(_)) => "array",
        Some(Value::Object(_)) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_feature_wrapper_is_unwrapped() {
        let feature = json!({
            "type": "Feature",
            "properties": {},
            "geometry": { "type": "LineString", "coordinates": [[21.0, 52.2], [21.1, 52.3]] }
        });
        assert!(is_render_safe(&feature));
    }

    #[test]
    fn test_feature_without_geometry() {
        let feature = json!({ "type": "Feature", "geometry": null });
        assert!(matches!(
            validate_line_geometry(&feature),
            Err(OverlayError::NotALineType { .. })
        ));
    }

    #[test]
    fn test_elevation_component_is_ignored() {
        let line = json!({ "type": "LineString", "coordinates": [[21.0, 52.2, 110.0], [21.1, 52.3, 112.5]] });
        let geometry = validate_line_geometry(&line).unwrap();
        assert_eq!(geometry.coordinates[1], LngLat::new(21.1, 52.3));
    }
}
