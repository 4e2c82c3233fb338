//! End-to-end tests for the live map engine

use std::sync::Arc;

use serde_json::json;
use trackoverlay::engine::{EngineEvent, EventRecorder};
use trackoverlay::{
    AvailabilityState, Capability, EngineConfig, LayerRole, LiveMapEngine, LngLat, LocationError,
    OverlayError, PositionSample, SessionToken, SignalQuality, Theme, TrackingMode,
};

fn engine() -> LiveMapEngine {
    LiveMapEngine::new(
        Capability::from_access_token(Some("pk.test".to_string())),
        EngineConfig::default(),
    )
}

fn sample(i: usize) -> PositionSample {
    PositionSample::new(52.23 + i as f64 * 0.0001, 21.01, i as i64 * 1_000)
}

fn nearby_payload() -> serde_json::Value {
    json!([
        {
            "id": "r1",
            "ownerSummary": "Ana",
            "geometry": { "type": "LineString", "coordinates": [[21.000, 52.2300], [21.020, 52.2300]] },
            "distanceFromUser": 120.0
        },
        {
            "id": "r2",
            "ownerSummary": "Ben",
            "geometry": { "type": "LineString", "coordinates": [[21.000, 52.2400], [21.020, 52.2400]] },
            "distanceFromUser": 900.0
        }
    ])
}

fn roles(engine: &mut LiveMapEngine) -> Vec<LayerRole> {
    engine.render().layers.iter().map(|l| l.role).collect()
}

#[test]
fn test_unavailable_capability_renders_nothing() {
    let mut engine = LiveMapEngine::new(Capability::from_access_token(None), EngineConfig::default());
    assert!(!engine.mapping_available());
    assert_eq!(engine.state(), AvailabilityState::CapabilityUnavailable);
    assert!(matches!(
        engine.map_surface(),
        Err(OverlayError::CapabilityUnavailable)
    ));
    assert!(engine.style_url().is_none());

    assert_eq!(engine.set_nearby_routes(&nearby_payload()), 2);
    engine.select_route(Some("r1".to_string()));
    assert!(engine.render().layers.is_empty());

    let token = engine.start_session(Some(&json!({
        "type": "LineString",
        "coordinates": [[21.0, 52.0], [21.1, 52.1]]
    })));
    for i in 0..5 {
        assert!(!engine.push_sample(token, sample(i)));
    }
    engine.set_signal_quality(SignalQuality::Good);
    engine.on_user_gesture(LngLat::new(21.0, 52.0), 12.0);
    assert!(engine.request_preview_location(0).is_none());
    assert!(!engine.notify_map_loaded());

    let frame = engine.render();
    assert!(frame.layers.is_empty());
    assert!(frame.viewport.is_none());
    assert!(engine.viewport().is_none());
    assert_eq!(engine.state(), AvailabilityState::CapabilityUnavailable);
}

#[test]
fn test_first_sample_starts_tracking_and_notifies() {
    let recorder = Arc::new(EventRecorder::new());
    let mut engine = engine().with_observer(recorder.clone());
    assert_eq!(engine.state(), AvailabilityState::AwaitingPosition);
    assert!(engine.render().viewport.is_none());

    let token = engine.subscribe();
    assert!(engine.push_sample(token, sample(0)));
    assert!(engine.push_sample(token, sample(1)));

    assert!(matches!(engine.state(), AvailabilityState::Tracking { .. }));
    assert_eq!(
        recorder.events(),
        vec![EngineEvent::StateChanged {
            from: "awaiting_position",
            to: "tracking"
        }]
    );
}

#[test]
fn test_map_loaded_fires_once() {
    let recorder = Arc::new(EventRecorder::new());
    let mut engine = engine().with_observer(recorder.clone());

    assert!(engine.notify_map_loaded());
    assert!(!engine.notify_map_loaded());
    assert_eq!(recorder.events(), vec![EngineEvent::MapLoaded]);
}

#[test]
fn test_idle_samples_move_marker_without_recording() {
    let mut engine = engine();
    let token = engine.subscribe();
    engine.push_sample(token, sample(0));
    engine.push_sample(token, sample(1));

    assert!(engine.live_points().is_empty());
    assert_eq!(roles(&mut engine), vec![LayerRole::SignalRing, LayerRole::PositionMarker]);
}

#[test]
fn test_live_session_renders_track() {
    let mut engine = engine();
    let token = engine.start_session(None);
    assert_eq!(engine.mode(), TrackingMode::Live);
    for i in 0..10 {
        assert!(engine.push_sample(token, sample(i)));
    }

    let frame = engine.render();
    let live = frame
        .layers
        .iter()
        .find(|l| l.role == LayerRole::LiveTrack)
        .expect("live track layer");
    let line = live.geometry.as_line().unwrap();
    assert_eq!(line.len(), 10);
    assert_eq!(line.last(), Some(&sample(9).coord()));

    let viewport = frame.viewport.unwrap();
    assert_eq!(viewport.center, sample(9).coord());
    assert!(viewport.follow_enabled);
    assert!(engine.live_distance_m() > 90.0);
    assert_eq!(engine.live_elapsed_ms(), 9_000);
}

#[test]
fn test_invalid_samples_are_dropped() {
    let mut engine = engine();
    let token = engine.start_session(None);
    assert!(!engine.push_sample(token, PositionSample::new(f64::NAN, 21.0, 0)));
    assert!(!engine.push_sample(token, PositionSample::new(95.0, 21.0, 0)));
    assert!(engine.push_sample(token, sample(0)));
    assert_eq!(engine.live_points().len(), 1);
}

#[test]
fn test_stale_subscription_is_ignored() {
    let mut engine = engine();
    let first = engine.start_session(None);
    engine.push_sample(first, sample(0));

    let second = engine.start_session(None);
    assert_ne!(first, second);
    assert!(!engine.push_sample(first, sample(1)));
    assert!(engine.live_points().is_empty());

    assert!(engine.push_sample(second, sample(2)));
    assert!(!engine.push_sample(SessionToken::from_generation(9_999), sample(3)));
    assert_eq!(engine.live_points().len(), 1);
}

#[test]
fn test_unmount_discards_late_callbacks() {
    let mut engine = engine();
    let token = engine.start_session(None);
    engine.push_sample(token, sample(0));
    engine.unmount();

    assert!(!engine.push_sample(token, sample(1)));
    assert!(!engine.push_sample(engine.subscribe(), sample(1)));
    assert!(engine.request_preview_location(0).is_none());
    assert_eq!(engine.live_points().len(), 1);
}

#[test]
fn test_pause_keeps_track_and_stops_appending() {
    let mut engine = engine();
    let token = engine.start_session(None);
    for i in 0..3 {
        engine.push_sample(token, sample(i));
    }
    engine.pause();
    assert_eq!(engine.mode(), TrackingMode::Paused);
    engine.push_sample(token, sample(3));
    assert_eq!(engine.live_points().len(), 3);
    assert!(roles(&mut engine).contains(&LayerRole::LiveTrack));

    engine.resume();
    engine.push_sample(token, sample(4));
    assert_eq!(engine.live_points().len(), 4);
}

#[test]
fn test_finish_returns_samples_and_goes_idle() {
    let mut engine = engine();
    let token = engine.start_session(None);
    for i in 0..4 {
        engine.push_sample(token, sample(i));
    }
    let recorded = engine.finish_session();

    assert_eq!(recorded.len(), 4);
    assert_eq!(engine.mode(), TrackingMode::Idle);
    assert!(engine.live_points().is_empty());
    assert!(!roles(&mut engine).contains(&LayerRole::LiveTrack));
}

#[test]
fn test_shadow_track_renders_beneath_live() {
    let mut engine = engine();
    let shadow = json!({
        "type": "Feature",
        "geometry": {
            "type": "LineString",
            "coordinates": [[21.0100, 52.2300], [21.0102, 52.2310]]
        }
    });
    let token = engine.start_session(Some(&shadow));
    assert!(!roles(&mut engine).contains(&LayerRole::ShadowTrack));

    // The first fix shows the ghost before the live line exists
    engine.push_sample(token, sample(0));
    assert_eq!(
        roles(&mut engine),
        vec![LayerRole::ShadowTrack, LayerRole::SignalRing, LayerRole::PositionMarker]
    );

    engine.push_sample(token, sample(1));
    assert_eq!(
        roles(&mut engine),
        vec![
            LayerRole::ShadowTrack,
            LayerRole::LiveTrack,
            LayerRole::SignalRing,
            LayerRole::PositionMarker
        ]
    );
}

#[test]
fn test_malformed_shadow_is_dropped() {
    let mut engine = engine();
    let shadow = json!({ "type": "Polygon", "coordinates": [[[21.0, 52.0], [21.1, 52.0], [21.0, 52.1]]] });
    let token = engine.start_session(Some(&shadow));
    engine.push_sample(token, sample(0));
    engine.push_sample(token, sample(1));
    assert!(!roles(&mut engine).contains(&LayerRole::ShadowTrack));
}

#[test]
fn test_nearby_routes_and_selection_while_idle() {
    let mut engine = engine();
    assert_eq!(engine.set_nearby_routes(&nearby_payload()), 2);
    engine.select_route(Some("r2".to_string()));

    assert_eq!(
        roles(&mut engine),
        vec![LayerRole::NearbyRoute, LayerRole::NearbyRoute, LayerRole::SelectedRoute]
    );

    engine.start_session(None);
    assert!(engine.nearby_routes().is_empty());
    assert!(engine.selection().selected_route_id.is_none());
    assert_eq!(engine.set_nearby_routes(&nearby_payload()), 0);
    assert!(roles(&mut engine).is_empty());
}

#[test]
fn test_tap_selects_nearest_route() {
    let mut engine = engine();
    engine.set_nearby_routes(&nearby_payload());

    assert_eq!(engine.pick_route_at(LngLat::new(21.01, 52.2301)), Some("r1"));
    assert_eq!(engine.selection().selected_route_id.as_deref(), Some("r1"));

    assert_eq!(engine.pick_route_at(LngLat::new(21.01, 52.2350)), None);
    assert!(engine.selection().selected_route_id.is_none());
}

#[test]
fn test_gesture_stops_follow_until_reenabled() {
    let mut engine = engine();
    let token = engine.start_session(None);
    engine.push_sample(token, sample(0));

    engine.on_user_gesture(LngLat::new(21.05, 52.30), 12.0);
    engine.push_sample(token, sample(1));
    let viewport = *engine.viewport().unwrap();
    assert_eq!(viewport.center, LngLat::new(21.05, 52.30));
    assert!(!engine.follow_enabled());

    engine.set_follow(true);
    assert_eq!(engine.viewport().unwrap().center, sample(1).coord());
}

#[test]
fn test_preview_lookup_before_first_position() {
    let mut engine = engine();
    let request = engine.request_preview_location(1_000).unwrap();
    assert!(engine.request_preview_location(1_001).is_none());

    assert!(engine.resolve_preview_location(request, Ok(PositionSample::new(52.0, 21.0, 0)), 1_200));
    let viewport = engine.render().viewport.unwrap();
    assert_eq!(viewport.zoom, engine.config().preview_zoom);
    assert_eq!(engine.state(), AvailabilityState::AwaitingPosition);
}

#[test]
fn test_failed_preview_keeps_awaiting() {
    let mut engine = engine();
    let request = engine.request_preview_location(0).unwrap();
    assert!(!engine.resolve_preview_location(
        request,
        Err(LocationError::Unavailable("no fix".to_string())),
        50
    ));
    assert!(engine.render().viewport.is_none());
    assert_eq!(engine.state(), AvailabilityState::AwaitingPosition);
}

#[test]
fn test_preview_discarded_after_new_session() {
    let mut engine = engine();
    let request = engine.request_preview_location(0).unwrap();
    engine.start_session(None);
    assert!(!engine.resolve_preview_location(request, Ok(PositionSample::new(52.0, 21.0, 0)), 10));
    assert!(engine.viewport().is_none());
}

#[test]
fn test_no_preview_once_position_known() {
    let mut engine = engine();
    let token = engine.subscribe();
    engine.push_sample(token, sample(0));
    assert!(engine.request_preview_location(0).is_none());
}

#[test]
fn test_signal_quality_changes_ring_only() {
    let mut engine = engine();
    let token = engine.subscribe();
    engine.push_sample(token, sample(0));

    engine.set_signal_quality(SignalQuality::Good);
    let good = engine.render();
    engine.set_signal_quality(SignalQuality::Lost);
    let lost = engine.render();

    assert_eq!(good.layers.len(), lost.layers.len());
    assert_ne!(good.layers[0], lost.layers[0]);
    assert_eq!(good.layers[1], lost.layers[1]);
    assert!(matches!(engine.state(), AvailabilityState::Tracking { .. }));
}

#[test]
fn test_theme_switches_style_url() {
    let mut engine = engine();
    let light = engine.style_url().map(str::to_string);
    engine.set_theme(Theme::Dark);
    assert_ne!(engine.style_url().map(str::to_string), light);
    assert_eq!(engine.map_surface().unwrap().access_token, "pk.test");
}

#[test]
fn test_historical_track_is_decimated() {
    let engine = engine();
    let samples: Vec<PositionSample> = (0..500).map(sample).collect();
    let line = engine.historical_track(&samples).unwrap();

    assert_eq!(line.len(), 51);
    assert_eq!(line.first(), Some(&samples[0].coord()));
    assert_eq!(line.last(), Some(&samples[499].coord()));
}
