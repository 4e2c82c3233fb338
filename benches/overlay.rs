//! Performance benchmarks for the overlay engine.
//!
//! Run with: `cargo bench --features synthetic`
//!
//! A render pass runs on the UI thread for every location update, so the
//! numbers that matter are per-frame composition and track building at
//! realistic session lengths.

use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use trackoverlay::synthetic::{nearby_routes_payload, PathPattern, SyntheticSession};
use trackoverlay::{
    compose_layers, historical_geometry, parse_candidates, validate_line_geometry, Capability,
    ComposeInput, EngineConfig, LiveMapEngine, LngLat, SignalQuality, TrackBuilder, TrackingMode,
};

fn origin() -> LngLat {
    LngLat::new(21.01, 52.23)
}

fn session(sample_count: usize) -> SyntheticSession {
    SyntheticSession {
        origin: origin(),
        sample_count,
        sample_interval_ms: 1_000,
        step_meters: 3.0,
        pattern: PathPattern::Winding,
        gps_noise_sigma_meters: 4.0,
        seed: 42,
    }
}

// ============================================================================
// Benchmarks
// ============================================================================

/// Appending one sample to an existing track, as happens per location update.
fn bench_incremental_track(c: &mut Criterion) {
    let mut group = c.benchmark_group("incremental_track");

    // 1h, 3h and 6h sessions at 1 Hz
    for count in [3_600, 10_800, 21_600] {
        let samples = session(count).generate();
        group.bench_with_input(BenchmarkId::new("append_one", count), &samples, |b, s| {
            let mut warm = TrackBuilder::new();
            warm.build(&s[..s.len() - 1]);
            b.iter_batched(
                || warm.clone(),
                |mut builder| builder.build(black_box(s)).map(|line| line.len()),
                BatchSize::LargeInput,
            )
        });
    }

    group.finish();
}

/// Full rebuild from scratch, e.g. after a session restore.
fn bench_full_track_build(c: &mut Criterion) {
    let samples = session(10_800).generate();
    c.bench_function("build_3h_track", |b| {
        b.iter(|| {
            let mut builder = TrackBuilder::new();
            builder.build(black_box(&samples)).map(|line| line.len())
        })
    });
}

fn bench_historical_decimation(c: &mut Criterion) {
    let mut group = c.benchmark_group("historical_geometry");
    for count in [500, 5_000, 50_000] {
        let samples = session(count).generate();
        group.bench_with_input(BenchmarkId::new("samples", count), &samples, |b, s| {
            b.iter(|| historical_geometry(black_box(s), 50))
        });
    }
    group.finish();
}

fn bench_validation(c: &mut Criterion) {
    let mut group = c.benchmark_group("nearby_validation");
    for count in [10, 50, 200] {
        // Every 7th record is malformed
        let payload = nearby_routes_payload(origin(), count, 400, 7, 7);
        group.bench_with_input(BenchmarkId::new("routes", count), &payload, |b, p| {
            b.iter(|| parse_candidates(black_box(p)))
        });
    }
    group.finish();

    let payload = nearby_routes_payload(origin(), 1, 5_000, 0, 11);
    let geometry = &payload[0]["geometry"];
    c.bench_function("validate_5000_point_line", |b| {
        b.iter(|| validate_line_geometry(black_box(geometry)))
    });
}

fn bench_compose(c: &mut Criterion) {
    let candidates = parse_candidates(&nearby_routes_payload(origin(), 50, 400, 0, 3));
    let samples = session(3_600).generate();
    let mut builder = TrackBuilder::new();
    let live = builder.build(&samples).cloned();

    c.bench_function("compose_idle_50_routes", |b| {
        let input = ComposeInput {
            nearby_routes: &candidates,
            selected_route_id: candidates.first().map(|c| c.id.as_str()),
            user_position: Some(origin()),
            signal_quality: SignalQuality::Good,
            ..ComposeInput::default()
        };
        b.iter(|| compose_layers(black_box(&input)))
    });

    c.bench_function("compose_live_1h", |b| {
        let input = ComposeInput {
            mode: TrackingMode::Live,
            live_geometry: live.as_ref(),
            user_position: Some(origin()),
            signal_quality: SignalQuality::Weak,
            ..ComposeInput::default()
        };
        b.iter(|| compose_layers(black_box(&input)))
    });
}

/// One location update followed by a render, through the engine.
fn bench_engine_frame(c: &mut Criterion) {
    let samples = session(3_600).generate();
    c.bench_function("engine_push_and_render_1h", |b| {
        b.iter(|| {
            let capability = Capability::from_access_token(Some("bench".to_string()));
            let mut engine = LiveMapEngine::new(capability, EngineConfig::default());
            let token = engine.start_session(None);
            for sample in &samples {
                engine.push_sample(token, *sample);
                black_box(engine.render());
            }
        })
    });
}

criterion_group!(
    benches,
    bench_incremental_track,
    bench_full_track_build,
    bench_historical_decimation,
    bench_validation,
    bench_compose,
);

criterion_group! {
    name = slow_benches;
    config = Criterion::default().sample_size(10);
    targets = bench_engine_frame
}

criterion_main!(benches, slow_benches);
