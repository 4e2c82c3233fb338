//! FFI bindings for mobile platforms (iOS/Android).
//!
//! This module provides the UniFFI bindings that expose the overlay engine
//! to Kotlin and Swift. Untrusted network payloads cross the boundary as
//! JSON strings and are validated on this side.

use std::sync::{Arc, Mutex, MutexGuard};

use log::{debug, info};
use serde_json::Value;

use crate::camera::{LocationError, PreviewRequest};
use crate::engine::{Frame, LiveMapEngine, SessionToken};
use crate::{
    init_logging, is_render_safe, Capability, EngineConfig, LineGeometry, LngLat, PositionSample,
    SignalQuality, Theme,
};

/// Parse a JSON payload, treating unparseable text as absent.
fn parse_payload(label: &str, json: &str) -> Option<Value> {
    match serde_json::from_str(json) {
        Ok(value) => Some(value),
        Err(e) => {
            debug!("[TrackOverlayRust] Unparseable {} payload: {}", label, e);
            None
        }
    }
}

// ============================================================================
// Engine Handle
// ============================================================================

/// One overlay engine per mounted map screen.
#[derive(uniffi::Object)]
pub struct LiveMapHandle {
    inner: Mutex<LiveMapEngine>,
}

impl LiveMapHandle {
    fn engine(&self) -> MutexGuard<'_, LiveMapEngine> {
        // A panic mid-call leaves the engine usable; its state is always
        // consistent between calls.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[uniffi::export]
impl LiveMapHandle {
    /// Create an engine. A missing or blank token disables mapping.
    #[uniffi::constructor]
    pub fn new(access_token: Option<String>, config: EngineConfig) -> Arc<Self> {
        init_logging();
        info!("[TrackOverlayRust] Creating live map engine");
        let config = match config.validate() {
            Ok(()) => config,
            Err(e) => {
                info!("[TrackOverlayRust] {}; using defaults", e);
                EngineConfig::default()
            }
        };
        Arc::new(Self {
            inner: Mutex::new(LiveMapEngine::new(
                Capability::from_access_token(access_token),
                config,
            )),
        })
    }

    pub fn mapping_available(&self) -> bool {
        self.engine().mapping_available()
    }

    /// Access token for the native map view, if mapping is enabled.
    pub fn access_token(&self) -> Option<String> {
        match self.engine().map_surface() {
            Ok(surface) => Some(surface.access_token.clone()),
            Err(e) => {
                debug!("[TrackOverlayRust] {}", e);
                None
            }
        }
    }

    pub fn style_url(&self) -> Option<String> {
        self.engine().style_url().map(str::to_string)
    }

    pub fn set_theme(&self, theme: Theme) {
        self.engine().set_theme(theme);
    }

    /// Current generation for tagging the location subscription.
    pub fn subscribe(&self) -> u64 {
        self.engine().subscribe().generation()
    }

    /// Start recording; returns the new generation.
    pub fn start_session(&self, shadow_json: Option<String>) -> u64 {
        let shadow = shadow_json.and_then(|json| parse_payload("shadow track", &json));
        self.engine().start_session(shadow.as_ref()).generation()
    }

    pub fn pause(&self) {
        self.engine().pause();
    }

    pub fn resume(&self) {
        self.engine().resume();
    }

    pub fn finish_session(&self) -> Vec<PositionSample> {
        self.engine().finish_session()
    }

    pub fn unmount(&self) {
        self.engine().unmount();
    }

    pub fn push_sample(&self, generation: u64, sample: PositionSample) -> bool {
        self.engine()
            .push_sample(SessionToken::from_generation(generation), sample)
    }

    /// Push samples from a flat buffer: [lat1, lng1, t1, lat2, lng2, t2, ...].
    ///
    /// Returns how many were accepted.
    pub fn push_samples_flat(&self, generation: u64, flat: Vec<f64>) -> u32 {
        let token = SessionToken::from_generation(generation);
        let mut engine = self.engine();
        flat.chunks_exact(3)
            .map(|chunk| PositionSample::new(chunk[0], chunk[1], chunk[2] as i64))
            .filter(|sample| engine.push_sample(token, *sample))
            .count() as u32
    }

    pub fn set_signal_quality(&self, quality: SignalQuality) {
        self.engine().set_signal_quality(quality);
    }

    /// Hand over a nearby-route fetch result; returns how many survived.
    pub fn set_nearby_routes_json(&self, payload: String) -> u32 {
        match parse_payload("nearby routes", &payload) {
            Some(value) => self.engine().set_nearby_routes(&value) as u32,
            None => self.engine().set_nearby_candidates(Vec::new()) as u32,
        }
    }

    pub fn select_route(&self, route_id: Option<String>) {
        self.engine().select_route(route_id);
    }

    pub fn pick_route_at(&self, point: LngLat) -> Option<String> {
        self.engine().pick_route_at(point).map(str::to_string)
    }

    pub fn set_follow(&self, enabled: bool) {
        self.engine().set_follow(enabled);
    }

    pub fn on_user_gesture(&self, center: LngLat, zoom: f64) {
        self.engine().on_user_gesture(center, zoom);
    }

    pub fn request_preview_location(&self, now_ms: i64) -> Option<PreviewRequest> {
        self.engine().request_preview_location(now_ms)
    }

    /// Report a preview lookup. Pass either a sample or an error message.
    pub fn resolve_preview_location(
        &self,
        request: PreviewRequest,
        sample: Option<PositionSample>,
        error: Option<String>,
        now_ms: i64,
    ) -> bool {
        let outcome = match (sample, error) {
            (Some(sample), None) => Ok(sample),
            (_, Some(message)) => Err(LocationError::Unavailable(message)),
            (None, None) => Err(LocationError::Unavailable("no result".to_string())),
        };
        self.engine()
            .resolve_preview_location(request, outcome, now_ms)
    }

    pub fn notify_map_loaded(&self) -> bool {
        self.engine().notify_map_loaded()
    }

    pub fn render(&self) -> Frame {
        self.engine().render()
    }

    /// Render and serialize the frame for JS hosts.
    pub fn render_json(&self) -> String {
        let frame = self.engine().render();
        serde_json::to_string(&frame).unwrap_or_else(|e| {
            debug!("[TrackOverlayRust] Failed to serialize frame: {}", e);
            r#"{"layers":[],"viewport":null}"#.to_string()
        })
    }
}

// ============================================================================
// Standalone Functions
// ============================================================================

/// Render-safe verdict for a geometry payload.
#[uniffi::export]
pub fn ffi_is_render_safe(geometry_json: String) -> bool {
    parse_payload("geometry", &geometry_json)
        .map(|value| is_render_safe(&value))
        .unwrap_or(false)
}

/// Decimated geometry for a recorded track.
#[uniffi::export]
pub fn ffi_historical_geometry(
    samples: Vec<PositionSample>,
    max_render_points: u32,
) -> Option<LineGeometry> {
    init_logging();
    crate::historical_geometry(&samples, max_render_points as usize)
}

/// Get default configuration.
#[uniffi::export]
pub fn default_config() -> EngineConfig {
    init_logging();
    EngineConfig::default()
}
