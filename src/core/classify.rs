// LaneWatch - core/classify.rs
//
// Maps a parsed sensor record to at most one violation.
// Pure function: no I/O, no state.

use crate::core::model::{LogEntry, Violation, ViolationKind};

/// Classify a parsed entry.
///
/// Single-label with a fixed priority: any overload flag (gross or per-axle)
/// makes the record `Overweight` even when it is also flagged oversize.
/// `Oversize` is reported only when no overload flag is set. Records with no
/// flag set, and invalid entries, yield `None`.
pub fn classify(entry: &LogEntry) -> Option<Violation> {
    if !entry.valid {
        return None;
    }

    let kind = if entry.is_overload || entry.is_overload_axles {
        ViolationKind::Overweight
    } else if entry.is_oversize {
        ViolationKind::Oversize
    } else {
        return None;
    };

    Some(Violation {
        license_plate: entry.license_plate.clone(),
        kind,
        timestamp: entry.timestamp,
        lane: entry.source.lane(),
    })
}
