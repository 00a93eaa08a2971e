use anyhow::{anyhow, Result};
use chrono::Utc;
use clap::Parser;
use std::time::Duration;
use tokio::time::{interval, sleep, sleep_until, Instant};

use speed_tracker_rs::geocode::GeocodeCoordinator;
use speed_tracker_rs::status::{current_timestamp, StatusSnapshot};
use speed_tracker_rs::tone::NullPlayer;
use speed_tracker_rs::{
    NominatimClient, SimulatedProvider, SpeedAlert, SpeedTracker, SpeedUnit, ToneSynth,
    WatchOptions,
};

#[derive(Parser, Debug)]
#[command(name = "speed_tracker")]
#[command(about = "Real-time GPS speed and distance tracker", long_about = None)]
struct Args {
    /// Duration in seconds (0 = continuous)
    #[arg(value_name = "SECONDS", default_value = "0")]
    duration: u64,

    /// Speed limit in display units; alerts fire above it
    #[arg(long)]
    limit: Option<f64>,

    /// Speed unit (kmh, mph, knots)
    #[arg(long, default_value = "kmh")]
    unit: String,

    /// Disable the audible alert tone
    #[arg(long)]
    mute: bool,

    /// Disable reverse geocode lookups
    #[arg(long)]
    no_geocode: bool,

    /// Status snapshot interval in seconds
    #[arg(long, default_value = "2")]
    status_interval: u64,

    /// Fix delivery interval in milliseconds
    #[arg(long, default_value = "1000")]
    fix_interval_ms: u64,

    /// Output directory
    #[arg(long, default_value = "speed_tracker_sessions")]
    output_dir: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let unit: SpeedUnit = args.unit.parse().map_err(|e| anyhow!("{}", e))?;

    println!("[{}] Speed Tracker RS Starting", ts_now());
    println!("  Duration: {} seconds (0=continuous)", args.duration);
    println!("  Unit: {}", unit);
    match args.limit {
        Some(limit) => println!("  Speed Limit: {} {}", limit, unit),
        None => println!("  Speed Limit: none"),
    }
    println!("  Geocode: {}", if args.no_geocode { "off" } else { "on" });
    println!("  Output Dir: {}", args.output_dir);

    std::fs::create_dir_all(&args.output_dir)?;

    let provider = SimulatedProvider::new(Duration::from_millis(args.fix_interval_ms));
    let mut tracker = SpeedTracker::new();
    tracker.start(&provider, WatchOptions::default())?;

    let mut geocoder = if args.no_geocode {
        None
    } else {
        Some(GeocodeCoordinator::new(NominatimClient::new()))
    };
    let mut alert = SpeedAlert::new(args.limit, !args.mute);
    let mut synth = ToneSynth::default();
    let mut player = NullPlayer;

    let start = Utc::now();
    let mut fix_count = 0u64;
    let mut max_speed_display = 0.0f64;
    let mut status_ticker = interval(Duration::from_secs(args.status_interval.max(1)));

    println!("[{}] Tracking started...", ts_now());

    loop {
        if args.duration > 0 {
            let elapsed = Utc::now().signed_duration_since(start);
            if elapsed.num_seconds() as u64 >= args.duration {
                println!("[{}] Duration reached, stopping...", ts_now());
                break;
            }
        }

        let geocode_deadline = geocoder.as_ref().and_then(|g| g.next_deadline());
        let hide_wait = alert.hide_deadline().map(|at| {
            Duration::from_secs_f64((at - current_timestamp()).max(0.0))
        });

        tokio::select! {
            alive = tracker.poll_event(), if tracker.is_tracking() => {
                if !alive || !tracker.is_tracking() {
                    println!(
                        "[{}] Tracking stopped: {}",
                        ts_now(),
                        tracker.state().error.as_deref().unwrap_or("stream ended")
                    );
                    break;
                }
                fix_count += 1;

                let speed_display = unit.convert(tracker.state().speed);
                if speed_display > max_speed_display {
                    max_speed_display = speed_display;
                }

                if let Some(g) = geocoder.as_mut() {
                    g.push_position(
                        tracker.state().latitude,
                        tracker.state().longitude,
                        Instant::now(),
                    );
                }

                let now_s = current_timestamp();
                if alert.update(speed_display, now_s).is_some() {
                    if let Err(e) = synth.play(&mut player) {
                        log::warn!("could not play alert tone: {}", e);
                    }
                    // Headless playback completes immediately; the playing
                    // flag must clear even on synthesis error
                    alert.tone_finished();
                    println!(
                        "[{}] ALERT: {:.0} {} (+{:.0} over {:.0})",
                        ts_now(),
                        speed_display,
                        unit,
                        alert.overshoot(speed_display),
                        alert.limit().unwrap_or(0.0)
                    );
                }
            }
            _ = async { sleep_until(geocode_deadline.unwrap()).await }, if geocode_deadline.is_some() => {
                if let Some(g) = geocoder.as_mut() {
                    g.service(Instant::now()).await;
                    if let Some(street) = g.address().street.as_deref() {
                        println!("[{}] Address: {}", ts_now(), street);
                    }
                }
            }
            _ = async { sleep(hide_wait.unwrap()).await }, if hide_wait.is_some() => {
                alert.tick(current_timestamp());
            }
            _ = status_ticker.tick() => {
                alert.tick(current_timestamp());
                let snapshot = build_snapshot(
                    &tracker, geocoder.as_ref(), &alert, unit,
                    fix_count, max_speed_display, &start,
                );
                let status_path = format!("{}/live_status.json", args.output_dir);
                let _ = snapshot.save(&status_path);
                println!(
                    "[{}] {:.1} {} | {} | fixes: {}{}",
                    ts_now(),
                    snapshot.speed_display,
                    unit,
                    snapshot.distance_display,
                    fix_count,
                    if snapshot.over_limit { " | OVER LIMIT" } else { "" }
                );
            }
        }
    }

    tracker.stop();
    synth.dispose();

    let snapshot = build_snapshot(
        &tracker, geocoder.as_ref(), &alert, unit,
        fix_count, max_speed_display, &start,
    );
    let status_path = format!("{}/live_status_final.json", args.output_dir);
    snapshot.save(&status_path)?;

    println!("\n=== Final Stats ===");
    println!("Fixes processed: {}", fix_count);
    println!("Distance: {}", snapshot.distance_display);
    println!("Max speed: {:.1} {}", max_speed_display, unit);
    if let Some(address) = &snapshot.full_address {
        println!("Last address: {}", address);
    }

    Ok(())
}

fn build_snapshot(
    tracker: &SpeedTracker,
    geocoder: Option<&GeocodeCoordinator>,
    alert: &SpeedAlert,
    unit: SpeedUnit,
    fix_count: u64,
    max_speed_display: f64,
    start: &chrono::DateTime<Utc>,
) -> StatusSnapshot {
    let state = tracker.state();
    let speed_display = unit.convert(state.speed);

    let mut snapshot = StatusSnapshot::new(unit);
    snapshot.uptime_seconds = Utc::now().signed_duration_since(*start).num_seconds().max(0) as u64;
    snapshot.is_tracking = state.is_tracking;
    snapshot.speed_ms = state.speed;
    snapshot.speed_display = speed_display;
    snapshot.max_speed_display = max_speed_display;
    snapshot.distance_m = state.distance;
    snapshot.distance_display = speed_tracker_rs::units::format_distance(state.distance);
    snapshot.accuracy_m = state.accuracy;
    snapshot.latitude = state.latitude;
    snapshot.longitude = state.longitude;
    snapshot.fix_count = fix_count;
    snapshot.tracker_error = state.error.clone();
    snapshot.speed_limit = alert.limit();
    snapshot.over_limit = alert.is_over_limit();
    snapshot.overshoot = alert.overshoot(speed_display);

    if let Some(g) = geocoder {
        snapshot.street = g.address().street.clone();
        snapshot.full_address = g.address().full_address.clone();
        snapshot.address_loading = g.is_loading();
        snapshot.address_error = g.error().map(str::to_string);
    }

    snapshot
}

fn ts_now() -> String {
    Utc::now().format("%H:%M:%S").to_string()
}
