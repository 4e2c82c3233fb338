//! # Track Overlay
//!
//! Live GPS overlay engine for fitness map screens.
//!
//! This library provides:
//! - Validation of untrusted route geometry before it reaches the map
//! - Incremental live-track construction with decimation for long tracks
//! - Ordered, themed render-layer composition (nearby routes, selection,
//!   shadow track, live track, position marker)
//! - Follow-mode camera control with an idle-state preview fallback
//! - Signal and capability state tracking that degrades instead of failing
//!
//! ## Features
//!
//! - **`parallel`** - Validate large nearby-route payloads with rayon
//! - **`synthetic`** - Synthetic GPS session generator for tests and benches
//! - **`ffi`** - Enable FFI bindings for mobile platforms (iOS/Android)
//!
//! ## Quick Start
//!
//! ```rust
//! use trackoverlay::{Capability, EngineConfig, LiveMapEngine, PositionSample};
//!
//! let capability = Capability::from_access_token(Some("pk.test".to_string()));
//! let mut engine = LiveMapEngine::new(capability, EngineConfig::default());
//!
//! let session = engine.start_session(None);
//! engine.push_sample(session, PositionSample::new(52.2300, 21.0100, 0));
//! engine.push_sample(session, PositionSample::new(52.2310, 21.0110, 1_000));
//!
//! let frame = engine.render();
//! assert!(frame.layers.iter().any(|l| l.id == "live-track"));
//! assert!(frame.viewport.is_some());
//! ```

use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{OptionExt, OverlayError, Result};

// Geographic utilities (distance, bounds)
pub mod geo_utils;

// Untrusted geometry validation
pub mod validator;
pub use validator::{is_render_safe, validate_line_geometry};

// Live and historical track construction
pub mod track;
pub use track::{decimate, historical_geometry, TrackBuilder};

// Pure style tables
pub mod style;
pub use style::{Emphasis, Outline, SignalRingStyle, StrokeStyle};

// Render-layer composition
pub mod composer;
pub use composer::{compose_layers, ComposeInput, LayerGeometry, LayerRole, RenderLayer};

// Viewport control
pub mod camera;
pub use camera::{compute_viewport, CameraController, LocationError, PreviewRequest};

// Signal and capability state
pub mod availability;
pub use availability::{AvailabilityMachine, AvailabilityState, Capability, MapSurfaceConfig};

// Nearby-route ingestion, caching and hit testing
pub mod nearby;
pub use nearby::{parse_candidates, CandidateIndex, NearbyRouteCache, RouteCandidate};

// Engine orchestration
pub mod engine;
pub use engine::{EngineObserver, Frame, LiveMapEngine, NoopObserver, SessionToken};

// Synthetic GPS sessions for tests and benches
#[cfg(feature = "synthetic")]
pub mod synthetic;

// FFI bindings for mobile platforms (iOS/Android)
#[cfg(feature = "ffi")]
pub mod ffi;

#[cfg(feature = "ffi")]
uniffi::setup_scaffolding!();

/// Initialize logging for Android (only used in FFI)
#[cfg(all(feature = "ffi", target_os = "android"))]
pub(crate) fn init_logging() {
    use android_logger::Config;
    use log::LevelFilter;

    android_logger::init_once(
        Config::default()
            .with_max_level(LevelFilter::Debug)
            .with_tag("TrackOverlayRust"),
    );
}

#[cfg(all(feature = "ffi", not(target_os = "android")))]
pub(crate) fn init_logging() {
    // No-op on non-Android platforms
}

// ============================================================================
// Core Types
// ============================================================================

/// A map coordinate in GeoJSON order (longitude first).
///
/// Serializes as a `[lng, lat]` pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct LngLat {
    pub lng: f64,
    pub lat: f64,
}

impl LngLat {
    pub fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }

    /// Check if the coordinate is finite and inside valid lat/lng ranges.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

impl From<[f64; 2]> for LngLat {
    fn from(pair: [f64; 2]) -> Self {
        Self::new(pair[0], pair[1])
    }
}

impl From<LngLat> for [f64; 2] {
    fn from(c: LngLat) -> Self {
        [c.lng, c.lat]
    }
}

/// A single sample from the device location provider.
///
/// Immutable once created; appended to the live point sequence in
/// arrival order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct PositionSample {
    pub lat: f64,
    pub lng: f64,
    /// Milliseconds since the Unix epoch
    pub timestamp_ms: i64,
}

impl PositionSample {
    pub fn new(lat: f64, lng: f64, timestamp_ms: i64) -> Self {
        Self {
            lat,
            lng,
            timestamp_ms,
        }
    }

    /// The sample position as a map coordinate.
    pub fn coord(&self) -> LngLat {
        LngLat::new(self.lng, self.lat)
    }

    /// Check if the sample has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.coord().is_valid()
    }
}

/// A renderable polyline.
///
/// Always holds at least two finite, in-range coordinates. Serializes as a
/// GeoJSON `LineString`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename = "LineString")]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct LineGeometry {
    pub coordinates: Vec<LngLat>,
}

impl LineGeometry {
    /// Minimum number of coordinates for a renderable line.
    pub const MIN_POINTS: usize = 2;

    /// Build a line from coordinates, checking the geometry invariants.
    pub fn from_coords(coordinates: Vec<LngLat>) -> Result<Self> {
        if coordinates.len() < Self::MIN_POINTS {
            return Err(OverlayError::InsufficientPoints {
                context: "line geometry".to_string(),
                point_count: coordinates.len(),
                minimum_required: Self::MIN_POINTS,
            });
        }
        if let Some(index) = coordinates.iter().position(|c| !c.is_valid()) {
            return Err(OverlayError::InvalidCoordinate {
                index,
                reason: "not finite or out of range".to_string(),
            });
        }
        Ok(Self { coordinates })
    }

    /// Build a line from position samples, in sample order.
    pub fn from_samples(samples: &[PositionSample]) -> Result<Self> {
        Self::from_coords(samples.iter().map(PositionSample::coord).collect())
    }

    pub fn len(&self) -> usize {
        self.coordinates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coordinates.is_empty()
    }

    pub fn first(&self) -> Option<&LngLat> {
        self.coordinates.first()
    }

    pub fn last(&self) -> Option<&LngLat> {
        self.coordinates.last()
    }

    /// Bounding box of the line.
    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::from_coords(&self.coordinates)
    }
}

/// Bounding box in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl Bounds {
    /// Create bounds from coordinates.
    pub fn from_coords(coords: &[LngLat]) -> Option<Self> {
        if coords.is_empty() {
            return None;
        }
        let mut min_lat = f64::MAX;
        let mut max_lat = f64::MIN;
        let mut min_lng = f64::MAX;
        let mut max_lng = f64::MIN;

        for c in coords {
            min_lat = min_lat.min(c.lat);
            max_lat = max_lat.max(c.lat);
            min_lng = min_lng.min(c.lng);
            max_lng = max_lng.max(c.lng);
        }

        Some(Self {
            min_lat,
            max_lat,
            min_lng,
            max_lng,
        })
    }

    /// Get the center point of the bounds.
    pub fn center(&self) -> LngLat {
        LngLat::new(
            (self.min_lng + self.max_lng) / 2.0,
            (self.min_lat + self.max_lat) / 2.0,
        )
    }

    /// Grow the bounds by a margin in degrees on every side.
    pub fn expanded(&self, margin_degrees: f64) -> Self {
        Self {
            min_lat: self.min_lat - margin_degrees,
            max_lat: self.max_lat + margin_degrees,
            min_lng: self.min_lng - margin_degrees,
            max_lng: self.max_lng + margin_degrees,
        }
    }
}

/// GPS signal quality as classified by the location subsystem.
///
/// Only affects marker styling, never whether geometry renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
pub enum SignalQuality {
    Good,
    Weak,
    Lost,
    #[default]
    Disabled,
}

/// Map theme; drives base style and stroke colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

/// Recording mode of the host screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
pub enum TrackingMode {
    /// Browsing before a recording; nearby routes are shown
    #[default]
    Idle,
    Live,
    Paused,
}

/// Camera state applied by the host to the map surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct ViewportState {
    pub center: LngLat,
    pub zoom: f64,
    pub follow_enabled: bool,
}

/// Route selection owned by the host screen.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct SelectionState {
    pub selected_route_id: Option<String>,
}

// ============================================================================
// Configuration
// ============================================================================

/// Configuration for the overlay engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct EngineConfig {
    /// Maximum points rendered for a historical (non-live) track.
    /// Default: 50
    pub max_render_points: u32,

    /// Zoom level used while follow mode tracks the user.
    /// Default: 16.0
    pub live_zoom: f64,

    /// Zoom level for the idle preview viewport.
    /// Default: 14.0
    pub preview_zoom: f64,

    /// Timeout for the one-shot preview location lookup.
    /// Default: 5000 ms
    pub preview_timeout_ms: u64,

    /// How long fetched nearby routes stay fresh.
    /// Default: 300000 ms (5 minutes)
    pub nearby_cache_ttl_ms: u64,

    /// Tap tolerance when picking a nearby route on the map.
    /// Default: 40.0 meters
    pub route_pick_radius_m: f64,

    /// Base map style for the light theme.
    pub style_url_light: String,

    /// Base map style for the dark theme.
    pub style_url_dark: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_render_points: 50,
            live_zoom: camera::DEFAULT_LIVE_ZOOM,
            preview_zoom: 14.0,
            preview_timeout_ms: 5_000,
            nearby_cache_ttl_ms: 300_000,
            route_pick_radius_m: 40.0,
            style_url_light: "mapbox://styles/mapbox/outdoors-v12".to_string(),
            style_url_dark: "mapbox://styles/mapbox/dark-v11".to_string(),
        }
    }
}

impl EngineConfig {
    /// Parse a configuration from JSON. Missing keys take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the engine cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.max_render_points == 0 {
            return Err(OverlayError::Config(
                "max_render_points must be at least 1".to_string(),
            ));
        }
        if !(self.live_zoom.is_finite() && self.live_zoom > 0.0) {
            return Err(OverlayError::Config(format!(
                "live_zoom must be positive, got {}",
                self.live_zoom
            )));
        }
        if !(self.preview_zoom.is_finite() && self.preview_zoom > 0.0) {
            return Err(OverlayError::Config(format!(
                "preview_zoom must be positive, got {}",
                self.preview_zoom
            )));
        }
        if !(self.route_pick_radius_m.is_finite() && self.route_pick_radius_m >= 0.0) {
            return Err(OverlayError::Config(format!(
                "route_pick_radius_m must be non-negative, got {}",
                self.route_pick_radius_m
            )));
        }
        Ok(())
    }

    /// Base map style for a theme.
    pub fn style_url(&self, theme: Theme) -> &str {
        match theme {
            Theme::Light => &self.style_url_light,
            Theme::Dark => &self.style_url_dark,
        }
    }
}
