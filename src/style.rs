//! Style tables for overlay layers.
//!
//! Every style is a pure function of its inputs. Dark and light themes use
//! different hues so strokes keep their contrast on both base maps.

use serde::Serialize;

use crate::{SignalQuality, Theme};

/// How strongly a line layer should stand out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Emphasis {
    /// Nearby route candidates: thin, neutral, semi-transparent
    Muted,
    /// The selected candidate
    Highlight,
    /// Ghost track to race against
    Shadow,
    /// The user's own recording
    Live,
}

/// A contrast pass drawn beneath a stroke.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct Outline {
    pub color: String,
    pub width: f64,
}

/// Resolved stroke style for a line layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StrokeStyle {
    pub color: String,
    pub width: f64,
    pub opacity: f64,
    /// Dash and gap lengths in units of line width
    pub dash_pattern: Option<Vec<f64>>,
    pub outline: Option<Outline>,
}

/// Marker ring style for a signal quality.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalRingStyle {
    pub color: &'static str,
    pub radius: f64,
    pub opacity: f64,
}

const SHADOW_DASH: [f64; 2] = [2.0, 1.5];

/// Stroke style for a line layer.
pub fn stroke_style(theme: Theme, emphasis: Emphasis) -> StrokeStyle {
    let (color, width, opacity) = match (theme, emphasis) {
        (Theme::Light, Emphasis::Muted) => ("#8E8E93", 3.0, 0.45),
        (Theme::Dark, Emphasis::Muted) => ("#AEAEB2", 3.0, 0.35),
        (Theme::Light, Emphasis::Highlight) => ("#FF6B00", 6.0, 1.0),
        (Theme::Dark, Emphasis::Highlight) => ("#FF9F0A", 6.0, 1.0),
        (Theme::Light, Emphasis::Shadow) => ("#7C3AED", 4.0, 0.8),
        (Theme::Dark, Emphasis::Shadow) => ("#A78BFA", 4.0, 0.8),
        (Theme::Light, Emphasis::Live) => ("#FC4C02", 5.0, 1.0),
        (Theme::Dark, Emphasis::Live) => ("#30D158", 5.0, 1.0),
    };

    let outline = match emphasis {
        Emphasis::Highlight | Emphasis::Shadow => Some(Outline {
            color: outline_color(theme).to_string(),
            width: width + 3.0,
        }),
        Emphasis::Muted | Emphasis::Live => None,
    };

    let dash_pattern = match emphasis {
        Emphasis::Shadow => Some(SHADOW_DASH.to_vec()),
        _ => None,
    };

    StrokeStyle {
        color: color.to_string(),
        width,
        opacity,
        dash_pattern,
        outline,
    }
}

/// Color of the contrast pass under emphasized strokes.
pub fn outline_color(theme: Theme) -> &'static str {
    match theme {
        Theme::Light => "#FFFFFF",
        Theme::Dark => "#1C1C1E",
    }
}

/// Fill color of the user-position dot.
pub fn marker_color(theme: Theme) -> &'static str {
    match theme {
        Theme::Light => "#007AFF",
        Theme::Dark => "#0A84FF",
    }
}

/// Radius of the user-position dot in pixels.
pub const MARKER_RADIUS: f64 = 7.0;

/// Ring drawn around the user-position dot.
///
/// Static per quality; any pulsing is left to the host renderer.
pub fn signal_ring_style(quality: SignalQuality) -> SignalRingStyle {
    match quality {
        SignalQuality::Good => SignalRingStyle {
            color: "#34C759",
            radius: 18.0,
            opacity: 0.25,
        },
        SignalQuality::Weak => SignalRingStyle {
            color: "#FFCC00",
            radius: 24.0,
            opacity: 0.2,
        },
        SignalQuality::Lost => SignalRingStyle {
            color: "#FF3B30",
            radius: 30.0,
            opacity: 0.15,
        },
        SignalQuality::Disabled => SignalRingStyle {
            color: "#8E8E93",
            radius: 12.0,
            opacity: 0.1,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_live_hue_differs_by_theme() {
        let light = stroke_style(Theme::Light, Emphasis::Live);
        let dark = stroke_style(Theme::Dark, Emphasis::Live);
        assert_ne!(light.color, dark.color);
        assert_eq!(light.opacity, 1.0);
        assert!(light.dash_pattern.is_none());
    }

    #[test]
    fn test_emphasized_strokes_carry_outline() {
        for theme in [Theme::Light, Theme::Dark] {
            let highlight = stroke_style(theme, Emphasis::Highlight);
            let muted = stroke_style(theme, Emphasis::Muted);
            let outline = highlight.outline.expect("highlight has an outline");
            assert!(outline.width > highlight.width);
            assert!(highlight.width > muted.width);
            assert!(muted.opacity < 1.0);
            assert!(stroke_style(theme, Emphasis::Shadow).dash_pattern.is_some());
        }
    }

    #[test]
    fn test_ring_grows_as_signal_degrades() {
        let good = signal_ring_style(SignalQuality::Good);
        let weak = signal_ring_style(SignalQuality::Weak);
        let lost = signal_ring_style(SignalQuality::Lost);
        assert!(good.radius < weak.radius && weak.radius < lost.radius);
    }
}
