// LaneWatch - util/error.rs
//
// Typed error hierarchy with context-preserving error chains.
// No string-based error propagation: every failure carries the path or value
// that caused it and keeps its underlying source for diagnostic logging.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Top-level error type for all LaneWatch operations.
/// Errors are categorised by the subsystem that produced them.
#[derive(Debug)]
pub enum LaneWatchError {
    /// A sensor source tag was not recognised.
    Source(SourceError),

    /// Reading new content from a watched log file failed.
    Tail(TailError),

    /// Starting or stopping the lane watchers failed.
    Watch(WatchError),

    /// Configuration loading or validation failed.
    Config(ConfigError),
}

impl fmt::Display for LaneWatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Source(e) => write!(f, "Source error: {e}"),
            Self::Tail(e) => write!(f, "Tail error: {e}"),
            Self::Watch(e) => write!(f, "Watch error: {e}"),
            Self::Config(e) => write!(f, "Configuration error: {e}"),
        }
    }
}

impl std::error::Error for LaneWatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Source(e) => Some(e),
            Self::Tail(e) => Some(e),
            Self::Watch(e) => Some(e),
            Self::Config(e) => Some(e),
        }
    }
}

// ---------------------------------------------------------------------------
// Source errors
// ---------------------------------------------------------------------------

/// Errors related to sensor source tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    /// The tag is neither SOCK1 nor SOCK2. Unknown tags are never aliased to
    /// a lane.
    Unrecognised { tag: String },
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unrecognised { tag } => write!(
                f,
                "Unrecognised source tag '{tag}'. Expected SOCK1 or SOCK2"
            ),
        }
    }
}

impl std::error::Error for SourceError {}

impl From<SourceError> for LaneWatchError {
    fn from(e: SourceError) -> Self {
        Self::Source(e)
    }
}

// ---------------------------------------------------------------------------
// Tail errors
// ---------------------------------------------------------------------------

/// Errors raised while reading appended content from a log file.
///
/// These are soft failures: the watcher logs them, leaves the offset where
/// it was and retries on the next notification.
#[derive(Debug)]
pub enum TailError {
    /// I/O error with path context.
    Io {
        path: PathBuf,
        operation: &'static str,
        source: io::Error,
    },
}

impl fmt::Display for TailError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io {
                path,
                operation,
                source,
            } => write!(
                f,
                "I/O error during {operation} on '{}': {source}",
                path.display()
            ),
        }
    }
}

impl std::error::Error for TailError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
        }
    }
}

impl From<TailError> for LaneWatchError {
    fn from(e: TailError) -> Self {
        Self::Tail(e)
    }
}

// ---------------------------------------------------------------------------
// Watch errors
// ---------------------------------------------------------------------------

/// Errors related to the lane watcher lifecycle.
#[derive(Debug)]
pub enum WatchError {
    /// The native filesystem notifier could not be created or attached.
    Notifier {
        path: PathBuf,
        source: notify::Error,
    },

    /// A lane worker thread could not be spawned.
    Spawn { lane: u8, source: io::Error },
}

impl fmt::Display for WatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Notifier { path, source } => write!(
                f,
                "Cannot watch '{}' for changes: {source}",
                path.display()
            ),
            Self::Spawn { lane, source } => {
                write!(f, "Cannot start worker for lane {lane}: {source}")
            }
        }
    }
}

impl std::error::Error for WatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Notifier { source, .. } => Some(source),
            Self::Spawn { source, .. } => Some(source),
        }
    }
}

impl From<WatchError> for LaneWatchError {
    fn from(e: WatchError) -> Self {
        Self::Watch(e)
    }
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

/// Errors related to configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    /// TOML parsing failed.
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// A config value is out of the allowed range.
    ValueOutOfRange {
        field: String,
        value: String,
        expected: String,
    },

    /// I/O error reading config file.
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TomlParse { path, source } => {
                write!(f, "Config parse error '{}': {source}", path.display())
            }
            Self::ValueOutOfRange {
                field,
                value,
                expected,
            } => write!(
                f,
                "Config '{field}' = '{value}' is out of range. Expected: {expected}"
            ),
            Self::Io { path, source } => {
                write!(f, "Config I/O error '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::TomlParse { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<ConfigError> for LaneWatchError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

/// Convenience type alias for LaneWatch results.
pub type Result<T> = std::result::Result<T, LaneWatchError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_tail_error_display_includes_path_and_operation() {
        let err = TailError::Io {
            path: PathBuf::from("lane1.log"),
            operation: "seek",
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        let text = err.to_string();
        assert!(text.contains("seek"), "{text}");
        assert!(text.contains("lane1.log"), "{text}");
        assert!(err.source().is_some());
    }

    #[test]
    fn test_top_level_error_preserves_chain() {
        let err: LaneWatchError = SourceError::Unrecognised {
            tag: "SOCK9".to_string(),
        }
        .into();
        assert!(err.to_string().starts_with("Source error:"));
        let inner = err.source().expect("source should be set");
        assert!(inner.to_string().contains("SOCK9"));
    }
}
