//! Viewport control.
//!
//! The camera follows the latest trusted position while follow mode is on,
//! and leaves the viewport alone once the user pans or zooms. Before any
//! position arrives, a one-shot device location lookup may supply a preview
//! center. That lookup is fire-and-forget: the host performs it and reports
//! back, and a result that is late, stale or failed is simply dropped.

use log::debug;
use thiserror::Error;

use crate::{EngineConfig, LngLat, OverlayError, PositionSample, Result, ViewportState};

/// Zoom used by [`compute_viewport`] while following the user.
pub const DEFAULT_LIVE_ZOOM: f64 = 16.0;

/// Failure reported by the device location collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocationError {
    #[error("location permission denied")]
    PermissionDenied,
    #[error("location services unavailable: {0}")]
    Unavailable(String),
    #[error("location request timed out")]
    TimedOut,
}

/// Viewport for the next frame.
///
/// With follow enabled and a position available, centers on that position
/// at the live tracking zoom. Otherwise the previous viewport is returned
/// unchanged, which preserves manual pans and zooms.
pub fn compute_viewport(
    current: Option<&PositionSample>,
    previous: Option<&ViewportState>,
    follow_enabled: bool,
) -> Option<ViewportState> {
    follow_viewport(current, previous, follow_enabled, DEFAULT_LIVE_ZOOM)
}

fn follow_viewport(
    current: Option<&PositionSample>,
    previous: Option<&ViewportState>,
    follow_enabled: bool,
    zoom: f64,
) -> Option<ViewportState> {
    match current {
        Some(sample) if follow_enabled && sample.is_valid() => Some(ViewportState {
            center: sample.coord(),
            zoom,
            follow_enabled: true,
        }),
        _ => previous.copied(),
    }
}

/// Ticket for an in-flight preview lookup.
///
/// The host hands it back with the outcome so late answers can be told
/// apart from current ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct PreviewRequest {
    pub id: u64,
    /// Session generation the request was issued under
    pub generation: u64,
    pub issued_at_ms: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PreviewState {
    NotRequested,
    InFlight(PreviewRequest),
    Settled,
}

/// Owns the viewport and the preview lookup.
#[derive(Debug)]
pub struct CameraController {
    viewport: Option<ViewportState>,
    follow_enabled: bool,
    live_zoom: f64,
    preview_zoom: f64,
    preview_timeout_ms: u64,
    preview: PreviewState,
    next_request_id: u64,
}

impl CameraController {
    /// Create a controller with follow mode on and no viewport yet.
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            viewport: None,
            follow_enabled: true,
            live_zoom: config.live_zoom,
            preview_zoom: config.preview_zoom,
            preview_timeout_ms: config.preview_timeout_ms,
            preview: PreviewState::NotRequested,
            next_request_id: 1,
        }
    }

    /// Current viewport; `None` means the host should show a loading state.
    pub fn viewport(&self) -> Option<&ViewportState> {
        self.viewport.as_ref()
    }

    pub fn follow_enabled(&self) -> bool {
        self.follow_enabled
    }

    /// Apply a trusted position.
    pub fn on_position(&mut self, sample: &PositionSample) {
        self.viewport = follow_viewport(
            Some(sample),
            self.viewport.as_ref(),
            self.follow_enabled,
            self.live_zoom,
        );
    }

    /// The user panned or zoomed: keep their viewport and stop following.
    pub fn on_user_gesture(&mut self, center: LngLat, zoom: f64) {
        self.follow_enabled = false;
        let zoom = if zoom.is_finite() && zoom > 0.0 {
            zoom
        } else {
            self.viewport.map_or(self.live_zoom, |v| v.zoom)
        };
        if center.is_valid() {
            self.viewport = Some(ViewportState {
                center,
                zoom,
                follow_enabled: false,
            });
        } else if let Some(viewport) = self.viewport.as_mut() {
            viewport.follow_enabled = false;
        }
    }

    /// Toggle follow mode. Turning it on recenters on `last_known`.
    pub fn set_follow(&mut self, enabled: bool, last_known: Option<&PositionSample>) {
        self.follow_enabled = enabled;
        if enabled {
            if let Some(sample) = last_known {
                self.on_position(sample);
            }
        } else if let Some(viewport) = self.viewport.as_mut() {
            viewport.follow_enabled = false;
        }
    }

    /// Start a preview lookup if the camera has nothing to show yet.
    ///
    /// Returns `None` when a viewport already exists or a lookup is already
    /// in flight or settled.
    pub fn begin_preview_lookup(&mut self, generation: u64, now_ms: i64) -> Option<PreviewRequest> {
        if self.viewport.is_some() || self.preview != PreviewState::NotRequested {
            return None;
        }
        let request = PreviewRequest {
            id: self.next_request_id,
            generation,
            issued_at_ms: now_ms,
        };
        self.next_request_id += 1;
        self.preview = PreviewState::InFlight(request);
        Some(request)
    }

    /// Apply the outcome of a preview lookup.
    ///
    /// Returns `Ok(true)` when the preview set the viewport and `Ok(false)`
    /// when the answer was stale or no longer needed. Lookup failures and
    /// timeouts come back as errors for the caller to log; the camera stays
    /// without a viewport either way.
    pub fn resolve_preview(
        &mut self,
        request: PreviewRequest,
        generation: u64,
        outcome: std::result::Result<PositionSample, LocationError>,
        now_ms: i64,
    ) -> Result<bool> {
        if self.preview != PreviewState::InFlight(request) || request.generation != generation {
            debug!(
                "[Camera] Discarding stale preview result for request {}",
                request.id
            );
            return Ok(false);
        }
        self.preview = PreviewState::Settled;

        let elapsed_ms = now_ms.saturating_sub(request.issued_at_ms).max(0) as u64;
        if elapsed_ms > self.preview_timeout_ms {
            return Err(OverlayError::LookupTimedOut {
                elapsed_ms,
                timeout_ms: self.preview_timeout_ms,
            });
        }

        let sample = outcome.map_err(|e| OverlayError::LocationLookup {
            reason: e.to_string(),
        })?;
        if !sample.is_valid() {
            return Err(OverlayError::LocationLookup {
                reason: format!("invalid position ({}, {})", sample.lat, sample.lng),
            });
        }

        if self.viewport.is_some() {
            // A real position beat the preview.
            return Ok(false);
        }
        self.viewport = Some(ViewportState {
            center: sample.coord(),
            zoom: self.preview_zoom,
            follow_enabled: self.follow_enabled,
        });
        Ok(true)
    }

    /// Drop any in-flight lookup; a later answer will be discarded.
    pub fn cancel_preview(&mut self) {
        if let PreviewState::InFlight(request) = self.preview {
            debug!("[Camera] Cancelling preview request {}", request.id);
            self.preview = PreviewState::NotRequested;
        }
    }

    /// Whether a preview lookup is waiting for an answer.
    pub fn preview_in_flight(&self) -> bool {
        matches!(self.preview, PreviewState::InFlight(_))
    }
}
