//! Signal and capability state.
//!
//! ```text
//! capability-unavailable   (terminal, renders nothing)
//! awaiting-position ──first valid sample──▶ tracking { last_known, signal }
//! ```
//!
//! There is no way back from `tracking` to `awaiting-position`: a session
//! that has seen a position keeps its last known one, and losing signal
//! only changes how the marker looks.

use log::{debug, info};

use crate::{PositionSample, SignalQuality};

/// Map surface settings available once the mapping capability resolves.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct MapSurfaceConfig {
    pub access_token: String,
}

/// Optional mapping dependency, resolved once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Capability<H> {
    Available(H),
    Unavailable,
}

impl<H> Capability<H> {
    pub fn is_available(&self) -> bool {
        matches!(self, Capability::Available(_))
    }

    pub fn handle(&self) -> Option<&H> {
        match self {
            Capability::Available(handle) => Some(handle),
            Capability::Unavailable => None,
        }
    }
}

impl Capability<MapSurfaceConfig> {
    /// Resolve from a map access token; blank or missing means unavailable.
    pub fn from_access_token(token: Option<String>) -> Self {
        match token.map(|t| t.trim().to_string()) {
            Some(token) if !token.is_empty() => {
                info!("[Availability] Mapping capability available");
                Capability::Available(MapSurfaceConfig {
                    access_token: token,
                })
            }
            _ => {
                info!("[Availability] No map access token, mapping disabled");
                Capability::Unavailable
            }
        }
    }
}

/// Rendering state of the engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AvailabilityState {
    CapabilityUnavailable,
    AwaitingPosition,
    Tracking {
        last_known: PositionSample,
        signal: SignalQuality,
    },
}

impl AvailabilityState {
    /// Short name for logs and observers.
    pub fn as_str(&self) -> &'static str {
        match self {
            AvailabilityState::CapabilityUnavailable => "capability_unavailable",
            AvailabilityState::AwaitingPosition => "awaiting_position",
            AvailabilityState::Tracking { .. } => "tracking",
        }
    }
}

/// Drives [`AvailabilityState`] from positions and signal reports.
#[derive(Debug, Clone)]
pub struct AvailabilityMachine {
    state: AvailabilityState,
    /// Latest reported quality, kept while awaiting a first position
    signal: SignalQuality,
}

impl AvailabilityMachine {
    /// Start in `awaiting-position`, or the terminal unavailable state.
    pub fn new(capability_available: bool) -> Self {
        let state = if capability_available {
            AvailabilityState::AwaitingPosition
        } else {
            AvailabilityState::CapabilityUnavailable
        };
        Self {
            state,
            signal: SignalQuality::default(),
        }
    }

    pub fn state(&self) -> AvailabilityState {
        self.state
    }

    /// Whether this engine renders anything at all.
    pub fn should_render(&self) -> bool {
        self.state != AvailabilityState::CapabilityUnavailable
    }

    pub fn signal(&self) -> SignalQuality {
        self.signal
    }

    pub fn last_known(&self) -> Option<&PositionSample> {
        match &self.state {
            AvailabilityState::Tracking { last_known, .. } => Some(last_known),
            _ => None,
        }
    }

    /// Feed a position. Invalid samples are ignored.
    ///
    /// Returns `true` when this caused a state transition.
    pub fn on_position(&mut self, sample: PositionSample) -> bool {
        if !sample.is_valid() {
            debug!(
                "[Availability] Ignoring invalid position ({}, {})",
                sample.lat, sample.lng
            );
            return false;
        }
        match self.state {
            AvailabilityState::CapabilityUnavailable => false,
            AvailabilityState::AwaitingPosition => {
                self.state = AvailabilityState::Tracking {
                    last_known: sample,
                    signal: self.signal,
                };
                true
            }
            AvailabilityState::Tracking { signal, .. } => {
                self.state = AvailabilityState::Tracking {
                    last_known: sample,
                    signal,
                };
                false
            }
        }
    }

    /// Record a signal classification from the location subsystem.
    pub fn on_signal(&mut self, quality: SignalQuality) {
        self.signal = quality;
        if let AvailabilityState::Tracking { signal, .. } = &mut self.state {
            *signal = quality;
        }
    }
}
