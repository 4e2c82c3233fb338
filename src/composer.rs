//! Render-layer composition.
//!
//! Turns the current mode, theme, selection and validated geometry into an
//! ordered back-to-front layer list for the map surface. Composition is a
//! pure function: identical inputs give an identical list, and any missing
//! input simply removes its layers.

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use crate::nearby::RouteCandidate;
use crate::style::{
    marker_color, outline_color, signal_ring_style, stroke_style, Emphasis, Outline, StrokeStyle,
    MARKER_RADIUS,
};
use crate::{LineGeometry, LngLat, SignalQuality, Theme, TrackingMode};

/// Layer id of the live track.
pub const LIVE_TRACK_ID: &str = "live-track";
/// Layer id of the shadow track.
pub const SHADOW_TRACK_ID: &str = "shadow-track";
/// Layer id of the signal-quality ring.
pub const SIGNAL_RING_ID: &str = "user-position-signal";
/// Layer id of the user-position dot.
pub const POSITION_MARKER_ID: &str = "user-position";

const NEARBY_PREFIX: &str = "nearby-";
const SELECTED_PREFIX: &str = "selected-";

/// What a layer represents; determines its z-priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
pub enum LayerRole {
    NearbyRoute,
    SelectedRoute,
    ShadowTrack,
    LiveTrack,
    SignalRing,
    PositionMarker,
}

impl LayerRole {
    /// Back-to-front draw priority; lower draws first.
    pub fn z_priority(self) -> u32 {
        match self {
            LayerRole::NearbyRoute => 0,
            LayerRole::SelectedRoute => 1,
            LayerRole::ShadowTrack => 2,
            LayerRole::LiveTrack => 3,
            LayerRole::SignalRing => 4,
            LayerRole::PositionMarker => 5,
        }
    }
}

/// Geometry carried by a render layer.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
pub enum LayerGeometry {
    Line { line: LineGeometry },
    Point { position: LngLat },
}

impl LayerGeometry {
    pub fn as_line(&self) -> Option<&LineGeometry> {
        match self {
            LayerGeometry::Line { line } => Some(line),
            LayerGeometry::Point { .. } => None,
        }
    }

    pub fn as_point(&self) -> Option<&LngLat> {
        match self {
            LayerGeometry::Point { position } => Some(position),
            LayerGeometry::Line { .. } => None,
        }
    }
}

/// Serializes as the matching GeoJSON geometry.
impl Serialize for LayerGeometry {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            LayerGeometry::Line { line } => line.serialize(serializer),
            LayerGeometry::Point { position } => {
                let mut state = serializer.serialize_struct("Point", 2)?;
                state.serialize_field("type", "Point")?;
                state.serialize_field("coordinates", position)?;
                state.end()
            }
        }
    }
}

/// One styled layer handed to the map surface.
///
/// For point layers `stroke_color` is the fill color and `circle_radius`
/// is set.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct RenderLayer {
    pub id: String,
    pub role: LayerRole,
    pub geometry: LayerGeometry,
    pub stroke_color: String,
    pub stroke_width: f64,
    pub opacity: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dash_pattern: Option<Vec<f64>>,
    /// Contrast pass drawn beneath this layer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outline: Option<Outline>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub circle_radius: Option<f64>,
}

impl RenderLayer {
    fn line(id: String, role: LayerRole, line: &LineGeometry, style: StrokeStyle) -> Self {
        Self {
            id,
            role,
            geometry: LayerGeometry::Line { line: line.clone() },
            stroke_color: style.color,
            stroke_width: style.width,
            opacity: style.opacity,
            dash_pattern: style.dash_pattern,
            outline: style.outline,
            circle_radius: None,
        }
    }
}

/// Everything the composer looks at.
#[derive(Debug, Clone, Copy, Default)]
pub struct ComposeInput<'a> {
    pub mode: TrackingMode,
    pub theme: Theme,
    /// Already validated candidates
    pub nearby_routes: &'a [RouteCandidate],
    pub selected_route_id: Option<&'a str>,
    pub shadow_track: Option<&'a LineGeometry>,
    /// Whether the session has recorded any point yet
    pub has_live_points: bool,
    pub live_geometry: Option<&'a LineGeometry>,
    pub signal_quality: SignalQuality,
    /// Last trusted user position, if any
    pub user_position: Option<LngLat>,
}

/// Build the ordered layer list, back to front.
///
/// 1. nearby routes, muted (idle only)
/// 2. the selected nearby route again, highlighted with an outline
/// 3. the shadow track, dashed with an outline, from the first live point
/// 4. the live track
/// 5. the signal ring and the position dot
pub fn compose_layers(input: &ComposeInput<'_>) -> Vec<RenderLayer> {
    let mut layers = Vec::with_capacity(input.nearby_routes.len() + 5);
    let theme = input.theme;

    if input.mode == TrackingMode::Idle {
        for candidate in input.nearby_routes {
            layers.push(RenderLayer::line(
                format!("{NEARBY_PREFIX}{}", candidate.id),
                LayerRole::NearbyRoute,
                &candidate.geometry,
                stroke_style(theme, Emphasis::Muted),
            ));
        }

        // The base pass above stays underneath the highlight for contrast.
        if let Some(selected) = input
            .selected_route_id
            .and_then(|id| input.nearby_routes.iter().find(|c| c.id == id))
        {
            layers.push(RenderLayer::line(
                format!("{SELECTED_PREFIX}{}", selected.id),
                LayerRole::SelectedRoute,
                &selected.geometry,
                stroke_style(theme, Emphasis::Highlight),
            ));
        }
    }

    let has_live_points = input.has_live_points || input.live_geometry.is_some();
    if let (Some(shadow), true) = (input.shadow_track, has_live_points) {
        layers.push(RenderLayer::line(
            SHADOW_TRACK_ID.to_string(),
            LayerRole::ShadowTrack,
            shadow,
            stroke_style(theme, Emphasis::Shadow),
        ));
    }

    if let Some(live) = input.live_geometry {
        layers.push(RenderLayer::line(
            LIVE_TRACK_ID.to_string(),
            LayerRole::LiveTrack,
            live,
            stroke_style(theme, Emphasis::Live),
        ));
    }

    if let Some(position) = input.user_position {
        let ring = signal_ring_style(input.signal_quality);
        layers.push(RenderLayer {
            id: SIGNAL_RING_ID.to_string(),
            role: LayerRole::SignalRing,
            geometry: LayerGeometry::Point { position },
            stroke_color: ring.color.to_string(),
            stroke_width: 0.0,
            opacity: ring.opacity,
            dash_pattern: None,
            outline: None,
            circle_radius: Some(ring.radius),
        });
        layers.push(RenderLayer {
            id: POSITION_MARKER_ID.to_string(),
            role: LayerRole::PositionMarker,
            geometry: LayerGeometry::Point { position },
            stroke_color: marker_color(theme).to_string(),
            stroke_width: 0.0,
            opacity: 1.0,
            dash_pattern: None,
            outline: Some(Outline {
                color: outline_color(Theme::Light).to_string(),
                width: 2.0,
            }),
            circle_radius: Some(MARKER_RADIUS),
        });
    }

    // Stable, so candidates keep their input order within a role.
    layers.sort_by_key(|layer| layer.role.z_priority());
    layers
}
