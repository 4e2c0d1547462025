// LaneWatch - core/model.rs
//
// Core data model types. Pure data definitions with no I/O and no platform
// dependencies. These types are the shared vocabulary across all layers.

use crate::util::constants::{SOURCE_TAG_LANE_1, SOURCE_TAG_LANE_2};
use crate::util::error::SourceError;
use chrono::NaiveDateTime;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

// =============================================================================
// Source and lane
// =============================================================================

/// The sensor that wrote a log line. Each sensor writes its own file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Source {
    #[serde(rename = "SOCK1")]
    Sock1,
    #[serde(rename = "SOCK2")]
    Sock2,
}

impl Source {
    /// Both configured sources, lane 1 first.
    pub fn all() -> &'static [Source] {
        &[Source::Sock1, Source::Sock2]
    }

    /// The tag as it appears in the sensor log.
    pub fn tag(&self) -> &'static str {
        match self {
            Source::Sock1 => SOURCE_TAG_LANE_1,
            Source::Sock2 => SOURCE_TAG_LANE_2,
        }
    }

    /// Lane fed by this source. Total over `Source`: there is no fallback lane.
    pub fn lane(&self) -> Lane {
        match self {
            Source::Sock1 => Lane::One,
            Source::Sock2 => Lane::Two,
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Tag parser for hosts that route lines themselves. The tail pipeline
/// binds a lane to its file and never reads the in-line tag.
impl FromStr for Source {
    type Err = SourceError;

    /// Case-insensitive, surrounding whitespace ignored. Anything other than
    /// the two known tags is an error.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim();
        if tag.eq_ignore_ascii_case(SOURCE_TAG_LANE_1) {
            Ok(Source::Sock1)
        } else if tag.eq_ignore_ascii_case(SOURCE_TAG_LANE_2) {
            Ok(Source::Sock2)
        } else {
            Err(SourceError::Unrecognised {
                tag: tag.to_string(),
            })
        }
    }
}

/// A monitored traffic lane. Serialises as its number (`1` or `2`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(into = "u8")]
pub enum Lane {
    One,
    Two,
}

impl Lane {
    /// Lane number as shown to operators.
    pub fn number(&self) -> u8 {
        match self {
            Lane::One => 1,
            Lane::Two => 2,
        }
    }

    /// Source whose file feeds this lane.
    pub fn source(&self) -> Source {
        match self {
            Lane::One => Source::Sock1,
            Lane::Two => Source::Sock2,
        }
    }
}

impl From<Lane> for u8 {
    fn from(lane: Lane) -> Self {
        lane.number()
    }
}

impl fmt::Display for Lane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

// =============================================================================
// Log entry (output of parsing)
// =============================================================================

/// One sensor record parsed from a log line.
///
/// Short-lived: built by the parser, handed to the classifier, then dropped.
/// A `LogEntry` only exists for lines that matched the record grammar, so
/// `valid` is always true for entries produced by `parse_line`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// Time from the line prefix, or the local time of parsing when the
    /// prefix is missing or unparseable.
    pub timestamp: NaiveDateTime,
    pub source: Source,
    pub is_overload: bool,
    pub is_overload_axles: bool,
    pub is_oversize: bool,
    /// Trimmed, never empty.
    pub license_plate: String,
    pub weight: u32,
    pub limit: u32,
    /// The unmodified line text.
    pub raw_line: String,
    pub valid: bool,
}

// =============================================================================
// Violation (output of classification)
// =============================================================================

/// Kind of regulatory violation. Records without a violation never produce a
/// `Violation`, so there is no "none" kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ViolationKind {
    /// Gross or per-axle load exceeds the permitted limit.
    Overweight,
    /// Vehicle dimensions exceed the permitted envelope.
    Oversize,
}

impl ViolationKind {
    /// Short label for compact display.
    pub fn label(&self) -> &'static str {
        match self {
            ViolationKind::Overweight => "Overweight",
            ViolationKind::Oversize => "Oversize",
        }
    }

    /// Operator-facing description, as shown on the lane display.
    pub fn description(&self) -> &'static str {
        match self {
            ViolationKind::Overweight => "permissible weight exceeded",
            ViolationKind::Oversize => "permissible dimensions exceeded",
        }
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A classified violation, published to every subscribed listener.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub license_plate: String,
    pub kind: ViolationKind,
    pub timestamp: NaiveDateTime,
    pub lane: Lane,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] lane {}: {} - {} ({})",
            self.timestamp.format("%d/%m/%Y %H:%M:%S"),
            self.lane,
            self.license_plate,
            self.kind.description(),
            self.kind,
        )
    }
}

// =============================================================================
// Watcher signalling
// =============================================================================

/// Messages delivered to a lane worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchSignal {
    /// The watched file (or its directory entry) changed.
    Changed,
    /// Shut the worker down.
    Stop,
}

/// Counters kept by a lane worker, for diagnostics and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TailStats {
    /// Number of completed drains (one per coalesced batch of notifications).
    pub drains: u64,
    /// Complete lines read from the file.
    pub lines_read: u64,
    /// Lines that matched the record grammar.
    pub entries_parsed: u64,
    /// Violations detected, counted before they are published.
    pub violations: u64,
    /// Soft I/O failures during drains.
    pub io_errors: u64,
}
