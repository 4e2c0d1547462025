// LaneWatch - main.rs
//
// Console entry point. Handles:
// 1. CLI argument parsing
// 2. Config loading (lanewatch.toml) with CLI overrides
// 3. Logging initialisation (debug mode support)
// 4. Running both lanes and printing each violation to stdout

use clap::Parser;
use lanewatch::app::tail::TailConfig;
use lanewatch::platform::config::{self, AppConfig, PlatformPaths};
use lanewatch::util;
use lanewatch::{CoordinatorConfig, LaneCoordinator, Violation};
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

/// LaneWatch - weigh-station violation monitor.
///
/// Tails the SOCK1 and SOCK2 sensor logs and prints every overweight or
/// oversize vehicle reported after start-up.
#[derive(Parser, Debug)]
#[command(name = "lanewatch", version, about)]
struct Cli {
    /// Config file (defaults to lanewatch.toml in the platform config dir).
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Lane 1 (SOCK1) log file, overrides the config.
    #[arg(long = "lane1")]
    lane1: Option<PathBuf>,

    /// Lane 2 (SOCK2) log file, overrides the config.
    #[arg(long = "lane2")]
    lane2: Option<PathBuf>,

    /// Settle delay before each read in milliseconds, overrides the config.
    #[arg(long = "settle-ms")]
    settle_ms: Option<u64>,

    /// Print one JSON object per violation instead of plain text.
    #[arg(long = "json")]
    json: bool,

    /// Enable debug logging (equivalent to RUST_LOG=debug).
    #[arg(short = 'd', long = "debug")]
    debug: bool,
}

fn coordinator_config(cli: &Cli, app: &AppConfig) -> CoordinatorConfig {
    let mut config = CoordinatorConfig::new(
        cli.lane1.clone().unwrap_or_else(|| app.lane1_log.clone()),
        cli.lane2.clone().unwrap_or_else(|| app.lane2_log.clone()),
    );
    config.tail = TailConfig {
        settle_delay: Duration::from_millis(cli.settle_ms.unwrap_or(app.settle_delay_ms)),
        poll_interval: Duration::from_millis(app.poll_interval_ms),
        native_notifications: app.native_notifications,
        ..TailConfig::default()
    };
    config
}

fn print_violation(violation: &Violation, json: bool) {
    let mut out = std::io::stdout().lock();
    let written = if json {
        match serde_json::to_string(violation) {
            Ok(line) => writeln!(out, "{line}"),
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialise violation");
                return;
            }
        }
    } else {
        writeln!(out, "{violation}")
    };
    if let Err(e) = written.and_then(|_| out.flush()) {
        tracing::warn!(error = %e, "Failed to write violation to stdout");
    }
}

fn main() {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| PlatformPaths::resolve().config_file());
    let (app_config, config_warnings) = config::load_config(&config_path);

    util::logging::init(cli.debug, app_config.log_level.as_deref());

    tracing::info!(
        version = util::constants::APP_VERSION,
        debug = cli.debug,
        config = %config_path.display(),
        "LaneWatch starting"
    );
    for warning in &config_warnings {
        tracing::warn!(error = %warning, "Configuration warning");
    }

    let config = coordinator_config(&cli, &app_config);
    tracing::info!(
        lane1 = %config.lane1_path.display(),
        lane2 = %config.lane2_path.display(),
        settle_ms = config.tail.settle_delay.as_millis() as u64,
        display_secs = app_config.display_duration_secs,
        "Lane configuration"
    );

    let mut lanes = LaneCoordinator::new(config);
    let (_, violations) = lanes.subscribe_channel();

    if let Err(e) = lanes.start() {
        tracing::error!(error = %e, "Failed to start lane watchers");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }

    // The bus keeps the sender alive, so this runs until the process is killed.
    for violation in violations {
        print_violation(&violation, cli.json);
    }

    lanes.stop();
}
