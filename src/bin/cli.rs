//! trackoverlay CLI - Debug tool for the live overlay engine
//!
//! Usage:
//!   trackoverlay-cli replay <gpx> [--shadow <gpx>] [--dark] [--pause-after <n>]
//!   trackoverlay-cli decimate <gpx> [--max <n>]
//!   trackoverlay-cli validate <json>
//!
//! Replays recorded GPX tracks through the engine as if they were a live
//! location stream and prints the resulting frame, which helps check layer
//! ordering and styling without a device.

use clap::{Parser, Subcommand};
use gpx::{read, Gpx};
use log::info;
use serde_json::{json, Value};
use std::fs::{self, File};
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use trackoverlay::geo_utils::track_length;
use trackoverlay::{
    historical_geometry, parse_candidates, validate_line_geometry, Capability, EngineConfig,
    LineGeometry, LiveMapEngine, OptionExt, PositionSample, SignalQuality, Theme,
};

/// Cadence assigned to GPX points, which may not carry timestamps.
const REPLAY_INTERVAL_MS: i64 = 1_000;

#[derive(Parser)]
#[command(name = "trackoverlay-cli")]
#[command(about = "Debug tool for the live track overlay engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Engine configuration as JSON
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose debug output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a GPX track as a live session and print the final frame
    Replay {
        /// GPX file to replay
        track: PathBuf,

        /// GPX file used as the shadow track
        #[arg(short, long)]
        shadow: Option<PathBuf>,

        /// Use the dark theme
        #[arg(long)]
        dark: bool,

        /// Pause recording after this many samples
        #[arg(long)]
        pause_after: Option<usize>,
    },

    /// Decimate a GPX track for display and print it as GeoJSON
    Decimate {
        /// GPX file to decimate
        track: PathBuf,

        /// Maximum points to keep (defaults to the configured value)
        #[arg(short, long)]
        max: Option<usize>,
    },

    /// Validate a nearby-route payload and report what would render
    Validate {
        /// JSON file holding an array of route candidates
        payload: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format(|buf, record| writeln!(buf, "[{:5}] {}", record.level(), record.args()))
        .init();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    };

    let result = match cli.command {
        Commands::Replay {
            track,
            shadow,
            dark,
            pause_after,
        } => run_replay(&track, shadow.as_deref(), dark, pause_after, config),
        Commands::Decimate { track, max } => run_decimate(&track, max, &config),
        Commands::Validate { payload } => run_validate(&payload),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig, String> {
    match path {
        Some(path) => {
            let text = fs::read_to_string(path).map_err(|e| e.to_string())?;
            EngineConfig::from_json_str(&text).map_err(|e| e.to_string())
        }
        None => Ok(EngineConfig::default()),
    }
}

/// Parse a GPX file into position samples at a fixed cadence.
fn load_samples(path: &Path) -> Result<Vec<PositionSample>, String> {
    let file = File::open(path).map_err(|e| format!("{}: {}", path.display(), e))?;
    let gpx: Gpx = read(BufReader::new(file)).map_err(|e| e.to_string())?;

    let samples: Vec<PositionSample> = gpx
        .tracks
        .iter()
        .flat_map(|track| track.segments.iter())
        .flat_map(|segment| segment.points.iter())
        .enumerate()
        .map(|(i, pt)| {
            let point = pt.point();
            PositionSample::new(point.y(), point.x(), i as i64 * REPLAY_INTERVAL_MS)
        })
        .collect();

    if samples.is_empty() {
        return Err(format!("{}: no track points found", path.display()));
    }
    info!("Loaded {} points from {}", samples.len(), path.display());
    Ok(samples)
}

fn run_replay(
    track: &Path,
    shadow: Option<&Path>,
    dark: bool,
    pause_after: Option<usize>,
    config: EngineConfig,
) -> Result<(), String> {
    let samples = load_samples(track)?;
    let shadow_payload = match shadow {
        Some(path) => {
            let shadow_samples = load_samples(path)?;
            let coordinates: Vec<[f64; 2]> =
                shadow_samples.iter().map(|s| [s.lng, s.lat]).collect();
            Some(json!({ "type": "LineString", "coordinates": coordinates }))
        }
        None => None,
    };

    let capability = Capability::from_access_token(Some("cli-replay".to_string()));
    let mut engine = LiveMapEngine::new(capability, config);
    engine.set_theme(if dark { Theme::Dark } else { Theme::Light });
    engine.notify_map_loaded();
    engine.set_signal_quality(SignalQuality::Good);

    let token = engine.start_session(shadow_payload.as_ref());
    let mut accepted = 0usize;
    for (i, sample) in samples.iter().enumerate() {
        if pause_after == Some(i) {
            engine.pause();
            info!("Paused after {} samples", i);
        }
        if engine.push_sample(token, *sample) {
            accepted += 1;
        }
    }

    let frame = engine.render();
    info!(
        "Replayed {} samples ({} accepted), {} recorded, {:.0}m, {} layers",
        samples.len(),
        accepted,
        engine.live_points().len(),
        engine.live_distance_m(),
        frame.layers.len()
    );
    print_json(&serde_json::to_value(&frame).map_err(|e| e.to_string())?)
}

fn run_decimate(track: &Path, max: Option<usize>, config: &EngineConfig) -> Result<(), String> {
    let samples = load_samples(track)?;
    let max = max.unwrap_or(config.max_render_points as usize);
    let geometry = historical_geometry(&samples, max)
        .ok_or_insufficient_points("usable track", samples.len(), LineGeometry::MIN_POINTS)
        .map_err(|e| e.to_string())?;
    info!(
        "Decimated {} points ({:.0}m) to {} (max {})",
        samples.len(),
        track_length(&samples),
        geometry.len(),
        max
    );
    print_json(&serde_json::to_value(&geometry).map_err(|e| e.to_string())?)
}

fn run_validate(payload: &Path) -> Result<(), String> {
    let text = fs::read_to_string(payload).map_err(|e| e.to_string())?;
    let value: Value = serde_json::from_str(&text).map_err(|e| e.to_string())?;

    let records = value.as_array().map_or(0, Vec::len);
    let accepted = parse_candidates(&value);

    println!("{}", "=".repeat(60));
    println!("Nearby route payload: {}", payload.display());
    println!("{}", "=".repeat(60));
    for record in value.as_array().into_iter().flatten() {
        let id = record.get("id").map_or("<none>".to_string(), Value::to_string);
        match record.get("geometry").map(validate_line_geometry) {
            Some(Ok(line)) => println!("  [OK]  {} - {} points", id, line.len()),
            Some(Err(e)) => println!("  [ERR] {} - {}", id, e),
            None => println!("  [ERR] {} - no geometry", id),
        }
    }
    println!(
        "\n{} of {} candidates would render",
        accepted.len(),
        records
    );
    Ok(())
}

fn print_json(value: &Value) -> Result<(), String> {
    let text = serde_json::to_string_pretty(value).map_err(|e| e.to_string())?;
    println!("{}", text);
    Ok(())
}
