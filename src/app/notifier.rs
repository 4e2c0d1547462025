// LaneWatch - app/notifier.rs
//
// Native filesystem change notifications for one log file.
//
// The parent directory is watched non-recursively and events are filtered by
// file name. Watching the directory rather than the file means a log that
// does not exist yet, or that is deleted and recreated by rotation, is still
// noticed. Each relevant event is forwarded as `WatchSignal::Changed`; the
// lane worker coalesces bursts, so duplicate or spurious events are harmless.
//
// Events are delivered on the notify backend's own thread. The callback only
// does a non-blocking channel send.

use crate::core::model::WatchSignal;
use crate::util::error::WatchError;
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::mpsc;

/// Directory that has to be watched to see changes to `file`.
pub fn watch_dir_for(file: &Path) -> PathBuf {
    match file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Start delivering change signals for `file` into `tx`.
///
/// The returned watcher must be kept alive; dropping it stops notifications.
pub fn spawn_notifier(
    file: &Path,
    tx: mpsc::Sender<WatchSignal>,
) -> Result<RecommendedWatcher, WatchError> {
    let dir = watch_dir_for(file);
    let file_name: Option<OsString> = file.file_name().map(|n| n.to_os_string());
    let label = file.display().to_string();

    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
        Ok(event) => {
            if is_relevant(&event, file_name.as_deref()) {
                // Worker gone means the lane is stopping; nothing to do.
                let _ = tx.send(WatchSignal::Changed);
            }
        }
        Err(e) => {
            tracing::warn!(file = %label, error = %e, "Change notification error");
        }
    })
    .map_err(|source| WatchError::Notifier {
        path: file.to_path_buf(),
        source,
    })?;

    watcher
        .watch(&dir, RecursiveMode::NonRecursive)
        .map_err(|source| WatchError::Notifier {
            path: dir.clone(),
            source,
        })?;

    tracing::debug!(
        file = %file.display(),
        dir = %dir.display(),
        "Native change notifications active"
    );

    Ok(watcher)
}

/// True when `event` may have changed the size or identity of the file.
fn is_relevant(event: &Event, file_name: Option<&std::ffi::OsStr>) -> bool {
    if event.kind.is_access() {
        return false;
    }
    match file_name {
        Some(name) => event.paths.iter().any(|p| p.file_name() == Some(name)),
        // Pathological path with no file name: accept everything in the dir.
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, CreateKind, EventKind, ModifyKind};
    use std::ffi::OsStr;

    fn event(kind: EventKind, path: &str) -> Event {
        Event::new(kind).add_path(PathBuf::from(path))
    }

    #[test]
    fn test_watch_dir_for() {
        assert_eq!(
            watch_dir_for(Path::new("/var/log/lane1.log")),
            PathBuf::from("/var/log")
        );
        assert_eq!(watch_dir_for(Path::new("lane1.log")), PathBuf::from("."));
    }

    #[test]
    fn test_filters_by_file_name() {
        let name = Some(OsStr::new("lane1.log"));
        assert!(is_relevant(
            &event(EventKind::Modify(ModifyKind::Any), "/logs/lane1.log"),
            name
        ));
        assert!(is_relevant(
            &event(EventKind::Create(CreateKind::File), "/logs/lane1.log"),
            name
        ));
        assert!(!is_relevant(
            &event(EventKind::Modify(ModifyKind::Any), "/logs/lane2.log"),
            name
        ));
    }

    #[test]
    fn test_access_events_ignored() {
        let name = Some(OsStr::new("lane1.log"));
        assert!(!is_relevant(
            &event(EventKind::Access(AccessKind::Any), "/logs/lane1.log"),
            name
        ));
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("no-such-dir").join("lane1.log");
        let (tx, _rx) = mpsc::channel();
        assert!(matches!(
            spawn_notifier(&file, tx),
            Err(WatchError::Notifier { .. })
        ));
    }
}
