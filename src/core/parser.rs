// LaneWatch - core/parser.rs
//
// Line-oriented parsing of weigh-station sensor records.
// Core layer: works on in-memory text only, never touches the filesystem.
//
// A sensor line looks like:
//
//   13/11/2025-14:01:00 --- SOCK1---overload: True, overloadAxels: False,
//   number: A123BC77, weight: 45000, limit : 40000, oversize: False
//
// Only the `overload ... oversize` record is checked strictly. The leading
// date and tag are best-effort: a missing or bad date falls back to the
// current local time, and the source is taken from the file being tailed.

use crate::core::model::{LogEntry, Source};
use chrono::{Local, NaiveDateTime};
use regex::Regex;
use std::sync::OnceLock;

/// chrono format of the date token at the start of each sensor line.
pub const TIMESTAMP_FORMAT: &str = "%d/%m/%Y-%H:%M:%S";

/// Record grammar. Field order is fixed; booleans and field names are
/// case-insensitive; whitespace is allowed around every `:` and `,`.
fn record_regex() -> &'static Regex {
    static RECORD: OnceLock<Regex> = OnceLock::new();
    RECORD.get_or_init(|| {
        // Pattern is a literal exercised by the unit tests below.
        Regex::new(
            r"(?i)overload\s*:\s*(?P<overload>true|false)\s*,\s*overloadAxels\s*:\s*(?P<axles>true|false)\s*,\s*number\s*:\s*(?P<number>[^,]+),\s*weight\s*:\s*(?P<weight>\d+)\s*,\s*limit\s*:\s*(?P<limit>\d+)\s*,\s*oversize\s*:\s*(?P<oversize>true|false)",
        )
        .expect("record regex: invalid pattern")
    })
}

/// `DD/MM/YYYY-HH:mm:ss` anywhere in the line; the first occurrence wins.
fn timestamp_regex() -> &'static Regex {
    static TIMESTAMP: OnceLock<Regex> = OnceLock::new();
    TIMESTAMP.get_or_init(|| {
        Regex::new(r"\d{2}/\d{2}/\d{4}-\d{2}:\d{2}:\d{2}")
            .expect("timestamp regex: invalid pattern")
    })
}

/// Parse one raw log line written by `source`.
///
/// Returns `None` for blank lines and for anything that does not contain a
/// complete sensor record. Never panics and never reports an error: a line
/// is either a fully populated entry or it is dropped.
pub fn parse_line(raw_line: &str, source: Source) -> Option<LogEntry> {
    parse_line_with_clock(raw_line, source, || Local::now().naive_local())
}

/// As [`parse_line`], with the fallback clock supplied by the caller.
pub(crate) fn parse_line_with_clock(
    raw_line: &str,
    source: Source,
    now: impl FnOnce() -> NaiveDateTime,
) -> Option<LogEntry> {
    if raw_line.trim().is_empty() {
        return None;
    }

    let caps = record_regex().captures(raw_line)?;

    let license_plate = caps.name("number")?.as_str().trim();
    if license_plate.is_empty() {
        tracing::trace!(source = %source, "Record without a plate number; skipped");
        return None;
    }

    let flag = |name: &str| {
        caps.name(name)
            .map(|m| m.as_str().eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    };
    // Digits-only by grammar, so the only failure is overflow.
    let number = |name: &str| {
        caps.name(name)
            .and_then(|m| m.as_str().parse::<u32>().ok())
            .unwrap_or(0)
    };

    let timestamp = sniff_timestamp(raw_line).unwrap_or_else(now);

    Some(LogEntry {
        timestamp,
        source,
        is_overload: flag("overload"),
        is_overload_axles: flag("axles"),
        is_oversize: flag("oversize"),
        license_plate: license_plate.to_string(),
        weight: number("weight"),
        limit: number("limit"),
        raw_line: raw_line.to_string(),
        valid: true,
    })
}

/// Find the sensor date token in `raw_line` and parse it.
///
/// `None` when there is no token or the token is not a real date
/// (e.g. `31/02/2025-10:00:00`).
pub(crate) fn sniff_timestamp(raw_line: &str) -> Option<NaiveDateTime> {
    let token = timestamp_regex().find(raw_line)?;
    NaiveDateTime::parse_from_str(token.as_str(), TIMESTAMP_FORMAT).ok()
}
