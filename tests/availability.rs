//! Tests for the signal and capability state machine

use trackoverlay::{AvailabilityMachine, AvailabilityState, Capability, PositionSample, SignalQuality};

#[test]
fn test_capability_from_token() {
    assert!(Capability::from_access_token(Some("pk.abc".to_string())).is_available());
    assert!(!Capability::from_access_token(Some("   ".to_string())).is_available());
    assert!(!Capability::from_access_token(None).is_available());

    let capability = Capability::from_access_token(Some(" pk.abc ".to_string()));
    assert_eq!(capability.handle().unwrap().access_token, "pk.abc");
}

#[test]
fn test_unavailable_is_terminal() {
    let mut machine = AvailabilityMachine::new(false);
    assert!(!machine.should_render());

    assert!(!machine.on_position(PositionSample::new(52.23, 21.01, 0)));
    machine.on_signal(SignalQuality::Good);
    assert_eq!(machine.state(), AvailabilityState::CapabilityUnavailable);
    assert!(machine.last_known().is_none());
}

#[test]
fn test_first_valid_sample_starts_tracking() {
    let mut machine = AvailabilityMachine::new(true);
    assert_eq!(machine.state(), AvailabilityState::AwaitingPosition);

    assert!(!machine.on_position(PositionSample::new(f64::NAN, 21.01, 0)));
    assert_eq!(machine.state(), AvailabilityState::AwaitingPosition);

    let sample = PositionSample::new(52.23, 21.01, 1_000);
    assert!(machine.on_position(sample));
    assert_eq!(machine.last_known(), Some(&sample));
}

#[test]
fn test_signal_reported_before_position_carries_over() {
    let mut machine = AvailabilityMachine::new(true);
    machine.on_signal(SignalQuality::Weak);
    machine.on_position(PositionSample::new(52.23, 21.01, 0));

    match machine.state() {
        AvailabilityState::Tracking { signal, .. } => assert_eq!(signal, SignalQuality::Weak),
        other => panic!("expected tracking, got {other:?}"),
    }
}

#[test]
fn test_losing_signal_keeps_last_known_position() {
    let mut machine = AvailabilityMachine::new(true);
    let sample = PositionSample::new(52.23, 21.01, 0);
    machine.on_position(sample);

    machine.on_signal(SignalQuality::Lost);
    machine.on_signal(SignalQuality::Disabled);

    assert_eq!(
        machine.state(),
        AvailabilityState::Tracking {
            last_known: sample,
            signal: SignalQuality::Disabled
        }
    );
    assert!(machine.should_render());
}

#[test]
fn test_later_samples_update_last_known_without_transition() {
    let mut machine = AvailabilityMachine::new(true);
    machine.on_position(PositionSample::new(52.23, 21.01, 0));
    let next = PositionSample::new(52.24, 21.02, 1_000);

    assert!(!machine.on_position(next));
    assert_eq!(machine.last_known(), Some(&next));
}
