// LaneWatch - util/constants.rs
//
// Single source of truth for all named constants, limits, and defaults.
// Every tunable bound used by the tail pipeline is defined here so config
// validation and the watcher agree on the same numbers.

// =============================================================================
// Application metadata
// =============================================================================

/// Application display name.
pub const APP_NAME: &str = "LaneWatch";

/// Application identifier used for config/data directories.
pub const APP_ID: &str = "LaneWatch";

/// Current application version (updated by release script).
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name of the configuration file looked up in the platform config directory.
pub const CONFIG_FILE_NAME: &str = "lanewatch.toml";

// =============================================================================
// Lane sources
// =============================================================================

/// Source tag written by the lane 1 sensor.
pub const SOURCE_TAG_LANE_1: &str = "SOCK1";

/// Source tag written by the lane 2 sensor.
pub const SOURCE_TAG_LANE_2: &str = "SOCK2";

/// Default lane 1 log file name, relative to the config file directory.
pub const DEFAULT_LANE_1_LOG: &str = "camealogSOCK1.log";

/// Default lane 2 log file name, relative to the config file directory.
pub const DEFAULT_LANE_2_LOG: &str = "camealogSOCK2.log";

// =============================================================================
// Live tail timing
// =============================================================================

/// Pause between a change notification and the read that follows it (ms).
/// Gives the sensor process time to finish flushing a just-appended line.
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 100;

/// Minimum user-configurable settle delay (ms). Zero disables the pause.
pub const MIN_SETTLE_DELAY_MS: u64 = 0;

/// Maximum user-configurable settle delay (ms).
pub const MAX_SETTLE_DELAY_MS: u64 = 5_000;

/// How often an idle lane re-checks its file when no notification arrived (ms).
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;

/// Minimum user-configurable poll interval (ms).
pub const MIN_POLL_INTERVAL_MS: u64 = 50;

/// Maximum user-configurable poll interval (ms).
pub const MAX_POLL_INTERVAL_MS: u64 = 60_000; // 60 s

/// Maximum bytes pulled from one file in a single read.
///
/// A drain keeps reading until the file is exhausted, so this only bounds the
/// size of one buffer, not the amount processed per notification. A single
/// line longer than this is discarded rather than buffered without limit.
pub const MAX_TAIL_READ_BYTES: usize = 4 * 1024 * 1024; // 4 MB

// =============================================================================
// Presentation
// =============================================================================

/// How long a presentation layer should keep a violation on screen (seconds).
pub const DEFAULT_DISPLAY_DURATION_SECS: u64 = 10;

/// Minimum display duration (seconds).
pub const MIN_DISPLAY_DURATION_SECS: u64 = 1;

/// Maximum display duration (seconds).
pub const MAX_DISPLAY_DURATION_SECS: u64 = 3_600;

// =============================================================================
// Logging
// =============================================================================

/// Default tracing filter when neither RUST_LOG, --debug nor config set one.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Log levels accepted in `[logging] level`.
pub const VALID_LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace"];
