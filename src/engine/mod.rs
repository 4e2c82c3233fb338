//! # Live Map Engine
//!
//! Ties the overlay components together for one map screen.
//!
//! ## Architecture
//!
//! The engine is composed of focused modules:
//! - `AvailabilityMachine` - capability and signal state, gates rendering
//! - `TrackBuilder` - incremental live-track geometry
//! - `CameraController` - follow-mode viewport and preview lookup
//! - `CandidateIndex` - R-tree for tap-to-select on nearby routes
//! - `SessionGuard` - generation tags that discard stale callbacks
//!
//! All state changes happen on the host's UI thread. Nothing here blocks,
//! and nothing here is fatal: bad input is logged and dropped, and the
//! worst outcome is a frame with fewer layers.

pub mod observer;
pub mod session;

pub use observer::{EngineEvent, EngineObserver, EventRecorder, NoopObserver};
pub use session::{SessionGuard, SessionToken};

use std::sync::Arc;

use log::{debug, info, warn};
use serde::Serialize;
use serde_json::Value;

use crate::availability::{AvailabilityMachine, AvailabilityState, Capability, MapSurfaceConfig};
use crate::camera::{CameraController, LocationError, PreviewRequest};
use crate::composer::{compose_layers, ComposeInput, RenderLayer};
use crate::nearby::{parse_candidates, CandidateIndex, RouteCandidate};
use crate::track::{historical_geometry, TrackBuilder};
use crate::validator::validated_or_none;
use crate::{
    EngineConfig, LineGeometry, LngLat, OverlayError, PositionSample, Result, SelectionState,
    SignalQuality, Theme, TrackingMode, ViewportState,
};

/// Output of one render pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct Frame {
    /// Layers back to front
    pub layers: Vec<RenderLayer>,
    /// Camera to apply; `None` means show a loading state
    pub viewport: Option<ViewportState>,
}

impl Frame {
    /// Frame with nothing to draw.
    pub fn empty() -> Self {
        Self {
            layers: Vec::new(),
            viewport: None,
        }
    }
}

/// Overlay engine for a live map screen.
pub struct LiveMapEngine {
    capability: Capability<MapSurfaceConfig>,
    config: EngineConfig,
    availability: AvailabilityMachine,
    camera: CameraController,
    track: TrackBuilder,
    session: SessionGuard,

    // Session data
    live_points: Vec<PositionSample>,
    shadow: Option<LineGeometry>,
    mode: TrackingMode,

    // Browse data
    nearby: Vec<RouteCandidate>,
    nearby_index: CandidateIndex,
    selection: SelectionState,

    theme: Theme,
    map_loaded: bool,
    observer: Arc<dyn EngineObserver>,
}

impl LiveMapEngine {
    /// Create an engine for one mounted map screen.
    pub fn new(capability: Capability<MapSurfaceConfig>, config: EngineConfig) -> Self {
        let availability = AvailabilityMachine::new(capability.is_available());
        Self {
            camera: CameraController::new(&config),
            capability,
            config,
            availability,
            track: TrackBuilder::new(),
            session: SessionGuard::new(),
            live_points: Vec::new(),
            shadow: None,
            mode: TrackingMode::Idle,
            nearby: Vec::new(),
            nearby_index: CandidateIndex::new(),
            selection: SelectionState::default(),
            theme: Theme::default(),
            map_loaded: false,
            observer: Arc::new(NoopObserver),
        }
    }

    /// Attach an observer for map-loaded and state-change notifications.
    pub fn with_observer(mut self, observer: Arc<dyn EngineObserver>) -> Self {
        self.observer = observer;
        self
    }

    // ========================================================================
    // Host-facing state
    // ========================================================================

    /// Whether the host should render this engine's output at all.
    pub fn mapping_available(&self) -> bool {
        self.availability.should_render()
    }

    /// Settings for constructing the map surface.
    pub fn map_surface(&self) -> Result<&MapSurfaceConfig> {
        self.capability
            .handle()
            .ok_or(OverlayError::CapabilityUnavailable)
    }

    /// Base map style for the current theme.
    pub fn style_url(&self) -> Option<&str> {
        self.capability
            .handle()
            .map(|_| self.config.style_url(self.theme))
    }

    pub fn state(&self) -> AvailabilityState {
        self.availability.state()
    }

    pub fn mode(&self) -> TrackingMode {
        self.mode
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.theme = theme;
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Token for the current generation, for tagging a location subscription.
    pub fn subscribe(&self) -> SessionToken {
        self.session.current()
    }

    /// Map finished its initial load. Notifies the observer the first time
    /// only; returns whether this call fired the notification.
    pub fn notify_map_loaded(&mut self) -> bool {
        if self.map_loaded || !self.mapping_available() || !self.session.is_mounted() {
            return false;
        }
        self.map_loaded = true;
        info!("[Engine] Map finished initial load");
        self.observer.on_map_loaded();
        true
    }

    // ========================================================================
    // Session lifecycle
    // ========================================================================

    /// Begin a new recording.
    ///
    /// Invalidates the previous subscription and any preview lookup, clears
    /// the live points, discards nearby candidates and selection, and takes
    /// an optional shadow track. A malformed shadow payload is dropped.
    pub fn start_session(&mut self, shadow: Option<&Value>) -> SessionToken {
        let token = self.session.advance();
        self.camera.cancel_preview();
        self.live_points.clear();
        self.track.reset();
        self.clear_nearby();
        self.selection = SelectionState::default();
        self.shadow = validated_or_none("shadow track", shadow);
        self.mode = TrackingMode::Live;
        info!(
            "[Engine] Started session {} (shadow: {})",
            token.generation(),
            self.shadow.is_some()
        );
        token
    }

    /// Stop appending samples; the track stays on screen.
    pub fn pause(&mut self) {
        if self.mode == TrackingMode::Live {
            self.mode = TrackingMode::Paused;
        }
    }

    /// Continue appending samples after a pause.
    pub fn resume(&mut self) {
        if self.mode == TrackingMode::Paused {
            self.mode = TrackingMode::Live;
        }
    }

    /// End the recording and return its samples. Back to browse mode.
    pub fn finish_session(&mut self) -> Vec<PositionSample> {
        self.track.build(&self.live_points);
        let points = std::mem::take(&mut self.live_points);
        info!(
            "[Engine] Finished session {} with {} points, {:.0}m",
            self.session.current().generation(),
            points.len(),
            self.track.distance_m()
        );
        self.track.reset();
        self.shadow = None;
        self.mode = TrackingMode::Idle;
        points
    }

    /// The host screen went away. Later callbacks are discarded.
    pub fn unmount(&mut self) {
        self.camera.cancel_preview();
        self.session.unmount();
        debug!("[Engine] Unmounted");
    }

    // ========================================================================
    // Location input
    // ========================================================================

    /// Feed a sample from the location subscription tagged with `token`.
    ///
    /// Returns whether the sample was accepted. Stale tokens, invalid
    /// samples and a missing mapping capability all drop it. Samples move
    /// the marker and camera in any mode but only extend the track while
    /// live.
    pub fn push_sample(&mut self, token: SessionToken, sample: PositionSample) -> bool {
        if !self.session.accepts(token) {
            debug!(
                "[Engine] Discarding sample from stale session {}",
                token.generation()
            );
            return false;
        }
        if !self.mapping_available() {
            return false;
        }
        if !sample.is_valid() {
            debug!(
                "[Engine] Dropping invalid sample ({}, {}) at t={}",
                sample.lat, sample.lng, sample.timestamp_ms
            );
            return false;
        }

        let before = self.availability.state().as_str();
        if self.availability.on_position(sample) {
            let after = self.availability.state().as_str();
            info!("[Engine] {} -> {}", before, after);
            self.camera.cancel_preview();
            self.observer.on_state_changed(before, after);
        }

        if self.mode == TrackingMode::Live {
            self.live_points.push(sample);
        }
        self.camera.on_position(&sample);
        true
    }

    /// Signal classification from the location subsystem.
    pub fn set_signal_quality(&mut self, quality: SignalQuality) {
        self.availability.on_signal(quality);
    }

    /// Samples recorded in the current session.
    pub fn live_points(&self) -> &[PositionSample] {
        &self.live_points
    }

    /// Distance recorded so far in meters, as of the last render.
    pub fn live_distance_m(&self) -> f64 {
        self.track.distance_m()
    }

    /// Recording time so far in milliseconds, as of the last render.
    pub fn live_elapsed_ms(&self) -> i64 {
        self.track.elapsed_ms()
    }

    // ========================================================================
    // Preview lookup
    // ========================================================================

    /// Ask for a one-shot device location to preview the idle map.
    ///
    /// Returns a request for the host to fulfil, or `None` when no preview
    /// is needed (a position is known, one is already pending, the engine
    /// is recording, or mapping is unavailable).
    pub fn request_preview_location(&mut self, now_ms: i64) -> Option<PreviewRequest> {
        if !self.mapping_available()
            || !self.session.is_mounted()
            || self.mode != TrackingMode::Idle
            || self.availability.last_known().is_some()
        {
            return None;
        }
        self.camera
            .begin_preview_lookup(self.session.current().generation(), now_ms)
    }

    /// Report the outcome of a preview lookup.
    ///
    /// Failures and timeouts are logged and leave the engine awaiting a
    /// position. Returns whether the preview set the viewport.
    pub fn resolve_preview_location(
        &mut self,
        request: PreviewRequest,
        outcome: std::result::Result<PositionSample, LocationError>,
        now_ms: i64,
    ) -> bool {
        if !self.session.is_mounted() {
            debug!("[Engine] Discarding preview result after unmount");
            return false;
        }
        let generation = self.session.current().generation();
        match self
            .camera
            .resolve_preview(request, generation, outcome, now_ms)
        {
            Ok(applied) => applied,
            Err(e) => {
                warn!("[Engine] Preview location unavailable: {}", e);
                false
            }
        }
    }

    // ========================================================================
    // Nearby routes and selection
    // ========================================================================

    /// Take a nearby-route fetch result. Only used while browsing.
    ///
    /// Returns how many candidates survived validation.
    pub fn set_nearby_routes(&mut self, payload: &Value) -> usize {
        self.set_nearby_candidates(parse_candidates(payload))
    }

    /// Take already validated candidates (e.g. from a cache).
    pub fn set_nearby_candidates(&mut self, candidates: Vec<RouteCandidate>) -> usize {
        if self.mode != TrackingMode::Idle {
            debug!(
                "[Engine] Ignoring {} nearby routes while recording",
                candidates.len()
            );
            return 0;
        }
        self.nearby_index.rebuild(&candidates);
        self.nearby = candidates;
        self.nearby.len()
    }

    pub fn nearby_routes(&self) -> &[RouteCandidate] {
        &self.nearby
    }

    /// Selection passed down from the host screen.
    pub fn select_route(&mut self, route_id: Option<String>) {
        self.selection.selected_route_id = route_id;
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    /// Select the nearby route under a tap, if any lies within the pick
    /// radius. A tap on empty map clears the selection.
    pub fn pick_route_at(&mut self, point: LngLat) -> Option<&str> {
        if self.mode != TrackingMode::Idle || !self.mapping_available() {
            return None;
        }
        let picked = self
            .nearby_index
            .pick(point, self.config.route_pick_radius_m)
            .map(str::to_string);
        self.selection.selected_route_id = picked;
        self.selection.selected_route_id.as_deref()
    }

    fn clear_nearby(&mut self) {
        self.nearby.clear();
        self.nearby_index.clear();
    }

    // ========================================================================
    // Camera input
    // ========================================================================

    /// Toggle follow mode.
    pub fn set_follow(&mut self, enabled: bool) {
        if !self.mapping_available() {
            return;
        }
        let last_known = self.availability.last_known().copied();
        self.camera.set_follow(enabled, last_known.as_ref());
    }

    /// User panned or zoomed the map.
    pub fn on_user_gesture(&mut self, center: LngLat, zoom: f64) {
        if !self.mapping_available() {
            return;
        }
        self.camera.on_user_gesture(center, zoom);
    }

    pub fn follow_enabled(&self) -> bool {
        self.camera.follow_enabled()
    }

    pub fn viewport(&self) -> Option<&ViewportState> {
        if self.mapping_available() {
            self.camera.viewport()
        } else {
            None
        }
    }

    // ========================================================================
    // Rendering
    // ========================================================================

    /// Compose the layers and viewport for the current state.
    pub fn render(&mut self) -> Frame {
        if !self.mapping_available() {
            return Frame::empty();
        }

        let live_geometry = self.track.build(&self.live_points);
        let input = ComposeInput {
            mode: self.mode,
            theme: self.theme,
            nearby_routes: &self.nearby,
            selected_route_id: self.selection.selected_route_id.as_deref(),
            shadow_track: self.shadow.as_ref(),
            has_live_points: !self.live_points.is_empty(),
            live_geometry,
            signal_quality: self.availability.signal(),
            user_position: self.availability.last_known().map(PositionSample::coord),
        };

        Frame {
            layers: compose_layers(&input),
            viewport: self.camera.viewport().copied(),
        }
    }

    /// Decimated geometry for a recorded track, e.g. a past activity.
    pub fn historical_track(&self, samples: &[PositionSample]) -> Option<LineGeometry> {
        historical_geometry(samples, self.config.max_render_points as usize)
    }
}
