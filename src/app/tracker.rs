// LaneWatch - app/tracker.rs
//
// Per-file read offset for live tailing.
//
// A `TailTracker` remembers how many bytes of one log file have already been
// turned into lines. Each call to `read_new_lines` returns only the complete
// lines appended since the previous call.
//
// Rules:
//   - The offset is seeded to the file's size at initialisation, so content
//     present before start is never replayed.
//   - The offset only ever advances past a terminating '\n'. A trailing
//     partial line stays unconsumed and is re-read on the next call.
//   - A file shorter than the offset was truncated or rotated: the offset is
//     reset to 0 and the new content is read from the start.
//   - On Unix a different (device, inode) behind the path is also a rotation,
//     whatever its size. Elsewhere only the size check applies, so a
//     replacement already larger than the old offset is read from there.
//   - A line longer than the read budget is dropped whole: the over-budget
//     prefix and everything up to its '\n' are consumed and never returned.
//   - A missing file is not an error; the offset is left alone.
//   - Any other I/O failure leaves the offset untouched so the same bytes are
//     retried next time.
//
// Files are opened with `File::open`. On Unix this never blocks writers; on
// Windows std opens with FILE_SHARE_READ | FILE_SHARE_WRITE | FILE_SHARE_DELETE,
// so the sensor process can keep appending (and rotating) while we read.

use crate::util::constants::MAX_TAIL_READ_BYTES;
use crate::util::error::TailError;
use std::fs::{File, Metadata};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Consumed-byte offset for one watched file.
#[derive(Debug)]
pub struct TailTracker {
    path: PathBuf,
    /// Bytes from the start of the file already returned as complete lines.
    consumed_bytes: u64,
    /// Upper bound on bytes pulled into memory by one read.
    max_read_bytes: usize,
    /// Inside an oversized line; skip through its terminator.
    discarding: bool,
    /// Identity of the file the offset belongs to, where the platform has one.
    identity: Option<FileIdentity>,
}

type FileIdentity = (u64, u64);

#[cfg(unix)]
fn file_identity(metadata: &Metadata) -> Option<FileIdentity> {
    use std::os::unix::fs::MetadataExt;
    Some((metadata.dev(), metadata.ino()))
}

#[cfg(not(unix))]
fn file_identity(_metadata: &Metadata) -> Option<FileIdentity> {
    None
}

impl TailTracker {
    /// Create a tracker positioned at the current end of `path`.
    ///
    /// A file that does not exist yet starts at offset 0, so everything
    /// written to it after creation is new content.
    pub fn initialize(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let metadata = std::fs::metadata(&path).ok();
        let consumed_bytes = metadata.as_ref().map(Metadata::len).unwrap_or(0);
        let identity = metadata.as_ref().and_then(file_identity);
        tracing::debug!(
            file = %path.display(),
            offset = consumed_bytes,
            "Tail: seeding initial offset"
        );
        Self {
            path,
            consumed_bytes,
            max_read_bytes: MAX_TAIL_READ_BYTES,
            discarding: false,
            identity,
        }
    }

    /// Override the per-read byte budget.
    pub fn with_max_read_bytes(mut self, max_read_bytes: usize) -> Self {
        self.max_read_bytes = max_read_bytes.max(1);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn consumed_bytes(&self) -> u64 {
        self.consumed_bytes
    }

    /// Read the complete lines appended since the last call.
    ///
    /// Reads at most `max_read_bytes` per call; callers that need everything
    /// currently available call again until an empty vector comes back.
    /// Line terminators (`\n` or `\r\n`) are stripped; bytes are decoded as
    /// lossy UTF-8.
    pub fn read_new_lines(&mut self) -> Result<Vec<String>, TailError> {
        let mut file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::trace!(file = %self.path.display(), "Tail: file not present");
                return Ok(Vec::new());
            }
            Err(e) => return Err(self.io_error("open", e)),
        };

        let metadata = file.metadata().map_err(|e| self.io_error("stat", e))?;
        if metadata.is_dir() {
            return Err(self.io_error(
                "stat",
                io::Error::new(io::ErrorKind::Other, "path is a directory"),
            ));
        }
        let current_size = metadata.len();

        let identity = file_identity(&metadata);
        if self.identity.is_some() && identity != self.identity {
            tracing::info!(
                file = %self.path.display(),
                old_offset = self.consumed_bytes,
                "Tail: file replaced, resetting offset to 0"
            );
            self.consumed_bytes = 0;
            self.discarding = false;
        }
        self.identity = identity;

        // Shrunk below our offset: truncated or replaced by rotation.
        if current_size < self.consumed_bytes {
            tracing::info!(
                file = %self.path.display(),
                old_offset = self.consumed_bytes,
                new_size = current_size,
                "Tail: file truncated or rotated, resetting offset to 0"
            );
            self.consumed_bytes = 0;
            self.discarding = false;
        }

        if current_size == self.consumed_bytes {
            return Ok(Vec::new());
        }

        let available = current_size - self.consumed_bytes;
        let limit = available.min(self.max_read_bytes as u64);

        file.seek(SeekFrom::Start(self.consumed_bytes))
            .map_err(|e| self.io_error("seek", e))?;
        let mut buf = Vec::with_capacity(limit as usize);
        file.take(limit)
            .read_to_end(&mut buf)
            .map_err(|e| self.io_error("read", e))?;

        // Remainder of a line already being discarded.
        let skipped = if self.discarding {
            match buf.iter().position(|&b| b == b'\n') {
                Some(pos) => {
                    self.discarding = false;
                    pos + 1
                }
                None => {
                    self.consumed_bytes += buf.len() as u64;
                    return Ok(Vec::new());
                }
            }
        } else {
            0
        };
        self.consumed_bytes += skipped as u64;
        let rest = &buf[skipped..];

        let Some(last_newline) = rest.iter().rposition(|&b| b == b'\n') else {
            if rest.len() >= self.max_read_bytes {
                // A whole budget with no terminator can never become a line
                // we are willing to buffer. Drop it so the tail keeps moving.
                tracing::warn!(
                    file = %self.path.display(),
                    bytes = rest.len(),
                    "Tail: line exceeds read budget, discarding"
                );
                self.consumed_bytes += rest.len() as u64;
                self.discarding = true;
            }
            return Ok(Vec::new());
        };

        let complete = &rest[..=last_newline];
        let lines: Vec<String> = String::from_utf8_lossy(complete)
            .lines()
            .map(str::to_string)
            .collect();

        self.consumed_bytes += complete.len() as u64;

        tracing::trace!(
            file = %self.path.display(),
            lines = lines.len(),
            offset = self.consumed_bytes,
            "Tail: read new lines"
        );

        Ok(lines)
    }

    fn io_error(&self, operation: &'static str, source: io::Error) -> TailError {
        TailError::Io {
            path: self.path.clone(),
            operation,
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, OpenOptions};
    use std::io::Write;

    fn append(path: &Path, text: &str) {
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .unwrap();
        f.write_all(text.as_bytes()).unwrap();
    }

    #[test]
    fn test_existing_content_not_replayed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lane.log");
        fs::write(&path, "old line 1\nold line 2\n").unwrap();

        let mut tracker = TailTracker::initialize(&path);
        assert_eq!(tracker.consumed_bytes(), 22);
        assert!(tracker.read_new_lines().unwrap().is_empty());

        append(&path, "new line\n");
        assert_eq!(tracker.read_new_lines().unwrap(), vec!["new line"]);
        assert_eq!(tracker.consumed_bytes(), 31);
    }

    #[test]
    fn test_no_new_bytes_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lane.log");
        fs::write(&path, "a\n").unwrap();

        let mut tracker = TailTracker::initialize(&path);
        let before = tracker.consumed_bytes();
        for _ in 0..3 {
            assert!(tracker.read_new_lines().unwrap().is_empty());
            assert_eq!(tracker.consumed_bytes(), before);
        }
    }

    #[test]
    fn test_partial_line_deferred() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lane.log");
        fs::write(&path, "").unwrap();
        let mut tracker = TailTracker::initialize(&path);

        append(&path, "first\nsec");
        assert_eq!(tracker.read_new_lines().unwrap(), vec!["first"]);
        assert_eq!(tracker.consumed_bytes(), 6);

        // Still no terminator: nothing consumed.
        assert!(tracker.read_new_lines().unwrap().is_empty());
        assert_eq!(tracker.consumed_bytes(), 6);

        append(&path, "ond\nthird\n");
        assert_eq!(tracker.read_new_lines().unwrap(), vec!["second", "third"]);
        assert_eq!(tracker.consumed_bytes(), 19);
    }

    #[test]
    fn test_crlf_stripped_and_order_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lane.log");
        let mut tracker = TailTracker::initialize(&path);

        append(&path, "one\r\ntwo\r\n\r\nthree\r\n");
        assert_eq!(
            tracker.read_new_lines().unwrap(),
            vec!["one", "two", "", "three"]
        );
    }

    #[test]
    fn test_missing_file_returns_empty_and_keeps_offset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.log");
        let mut tracker = TailTracker::initialize(&path);
        assert_eq!(tracker.consumed_bytes(), 0);
        assert!(tracker.read_new_lines().unwrap().is_empty());
        assert_eq!(tracker.consumed_bytes(), 0);

        // Created later: everything in it is new.
        append(&path, "created\n");
        assert_eq!(tracker.read_new_lines().unwrap(), vec!["created"]);
    }

    #[test]
    fn test_file_removed_after_reading_keeps_offset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lane.log");
        fs::write(&path, "x\n").unwrap();
        let mut tracker = TailTracker::initialize(&path);
        fs::remove_file(&path).unwrap();
        assert!(tracker.read_new_lines().unwrap().is_empty());
        assert_eq!(tracker.consumed_bytes(), 2);
    }

    #[test]
    fn test_truncation_resets_offset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lane.log");
        fs::write(&path, "a long line of old content\n").unwrap();
        let mut tracker = TailTracker::initialize(&path);

        fs::write(&path, "fresh\n").unwrap();
        assert_eq!(tracker.read_new_lines().unwrap(), vec!["fresh"]);
        assert_eq!(tracker.consumed_bytes(), 6);
    }

    #[cfg(unix)]
    #[test]
    fn test_replaced_file_read_from_start_even_if_larger() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lane.log");
        fs::write(&path, "old\n").unwrap();
        let mut tracker = TailTracker::initialize(&path);

        fs::rename(&path, dir.path().join("lane.log.1")).unwrap();
        fs::write(&path, "new one\nnew two\n").unwrap();
        assert_eq!(tracker.read_new_lines().unwrap(), vec!["new one", "new two"]);
        assert_eq!(tracker.consumed_bytes(), 16);

        append(&path, "more\n");
        assert_eq!(tracker.read_new_lines().unwrap(), vec!["more"]);
    }

    #[test]
    fn test_read_budget_splits_across_calls() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lane.log");
        let mut tracker = TailTracker::initialize(&path).with_max_read_bytes(8);

        append(&path, "aaa\nbbb\nccc\n");
        assert_eq!(tracker.read_new_lines().unwrap(), vec!["aaa", "bbb"]);
        assert_eq!(tracker.read_new_lines().unwrap(), vec!["ccc"]);
        assert!(tracker.read_new_lines().unwrap().is_empty());
    }

    #[test]
    fn test_oversized_line_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lane.log");
        let mut tracker = TailTracker::initialize(&path).with_max_read_bytes(4);

        append(&path, "abcdefgh\nok\n");
        // First budget holds "abcd" with no newline: dropped.
        assert!(tracker.read_new_lines().unwrap().is_empty());
        assert_eq!(tracker.consumed_bytes(), 4);
        // "efgh" belongs to the same line.
        assert!(tracker.read_new_lines().unwrap().is_empty());
        assert_eq!(tracker.consumed_bytes(), 8);
        assert_eq!(tracker.read_new_lines().unwrap(), vec!["ok"]);
        assert_eq!(tracker.consumed_bytes(), 12);
    }

    #[test]
    fn test_oversized_line_tail_never_returned() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lane.log");
        let mut tracker = TailTracker::initialize(&path).with_max_read_bytes(8);

        append(&path, "xxxxxxxxTAIL\nok\n");
        assert!(tracker.read_new_lines().unwrap().is_empty());
        assert_eq!(tracker.read_new_lines().unwrap(), vec!["ok"]);
        assert!(tracker.read_new_lines().unwrap().is_empty());
        assert_eq!(tracker.consumed_bytes(), 16);
    }

    #[test]
    fn test_unreadable_path_is_error_and_keeps_offset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lane.log");
        let mut tracker = TailTracker::initialize(&path);
        fs::create_dir(&path).unwrap();

        let err = tracker.read_new_lines().unwrap_err();
        assert!(matches!(err, TailError::Io { .. }));
        assert_eq!(tracker.consumed_bytes(), 0);

        // Recovers once a real file takes its place.
        fs::remove_dir(&path).unwrap();
        append(&path, "back\n");
        assert_eq!(tracker.read_new_lines().unwrap(), vec!["back"]);
    }

    #[test]
    fn test_invalid_utf8_decoded_lossily() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lane.log");
        let mut tracker = TailTracker::initialize(&path);

        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .unwrap();
        f.write_all(b"ok \xff\n").unwrap();
        drop(f);

        let lines = tracker.read_new_lines().unwrap();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("ok "));
    }
}
