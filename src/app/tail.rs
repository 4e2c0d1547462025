// LaneWatch - app/tail.rs
//
// Live tail of one lane's sensor log.
//
// Architecture:
//   - `TailWatcher` is the owner-side handle; `run_tail_worker` runs on a
//     dedicated background thread and is the only code that touches the
//     lane's `TailTracker`, so the offset needs no lock.
//   - Change notifications (native, see notifier.rs, or manual via
//     `notify_changed`) arrive as `WatchSignal::Changed` over an mpsc channel.
//   - While idle the worker also wakes every poll interval and drains as if
//     notified, which covers files whose directory did not exist at start and
//     notifications the platform dropped.
//   - Violations are published on the shared `ViolationBus` in file order.
//
// Drain cycle:
//   Idle --Changed/poll--> settle delay --> read/parse/classify/publish until
//   no complete lines remain --> Idle.
//   Signals arriving during the settle delay are absorbed by it. Signals that
//   arrive while lines are being read collapse into exactly one follow-up
//   drain, so bytes written mid-drain are never stranded.
//
// Cancellation:
//   - `stop` sets the cancel flag, drops the notifier, wakes the worker with
//     `WatchSignal::Stop` and joins it.
//   - A pending settle delay is cut short; no new read starts once the flag
//     is set.
//   - A batch of lines already read is published to completion before the
//     worker exits, so `stop` returns only after the last event went out.
//   - `stop` called from a listener running on this lane's own worker cannot
//     join itself; it sets the halt flag instead. Listeners after the caller
//     do not see the current violation and the rest of the batch is dropped.
//
// Error policy: I/O failures are logged and counted, the offset stays where
// it was, and the next signal retries. Nothing is propagated out of the
// worker.

use crate::app::events::ViolationBus;
use crate::app::notifier;
use crate::app::tracker::TailTracker;
use crate::core::classify::classify;
use crate::core::model::{Source, TailStats, WatchSignal};
use crate::core::parser::parse_line;
use crate::util::constants::{
    DEFAULT_POLL_INTERVAL_MS, DEFAULT_SETTLE_DELAY_MS, MAX_TAIL_READ_BYTES,
};
use crate::util::error::WatchError;
use notify::RecommendedWatcher;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, TryRecvError};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

// =============================================================================
// Configuration
// =============================================================================

/// Timing and buffer settings shared by both lanes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TailConfig {
    /// Pause between a change signal and the read that follows.
    pub settle_delay: Duration,
    /// Idle wake-up interval for the poll fallback.
    pub poll_interval: Duration,
    /// Byte budget for a single read.
    pub max_read_bytes: usize,
    /// Attach native filesystem notifications. When false only the poll
    /// fallback and manual `notify_changed` calls trigger drains.
    pub native_notifications: bool,
}

impl Default for TailConfig {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_millis(DEFAULT_SETTLE_DELAY_MS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            max_read_bytes: MAX_TAIL_READ_BYTES,
            native_notifications: true,
        }
    }
}

// =============================================================================
// TailWatcher
// =============================================================================

/// A running tail of one sensor log file.
pub struct TailWatcher {
    source: Source,
    path: PathBuf,
    signal_tx: mpsc::Sender<WatchSignal>,
    /// No new settle/read once set.
    cancel: Arc<AtomicBool>,
    /// Suppress publishing immediately (re-entrant stop only).
    halt: Arc<AtomicBool>,
    stats: Arc<Mutex<TailStats>>,
    /// Kept alive for as long as notifications are wanted.
    notifier: Option<RecommendedWatcher>,
    worker: Option<JoinHandle<()>>,
}

impl TailWatcher {
    /// Seed the offset from the file's current size and start the worker.
    ///
    /// The offset is captured before this returns, so nothing written before
    /// the call is ever reported. A missing file is fine. A notifier that
    /// cannot be attached is logged and the lane falls back to polling; only
    /// a failure to spawn the worker thread is an error.
    pub fn start(
        path: impl Into<PathBuf>,
        source: Source,
        config: &TailConfig,
        bus: ViolationBus,
    ) -> Result<Self, WatchError> {
        let path = path.into();
        let lane = source.lane();
        let tracker = TailTracker::initialize(&path).with_max_read_bytes(config.max_read_bytes);

        let (signal_tx, signal_rx) = mpsc::channel();
        let cancel = Arc::new(AtomicBool::new(false));
        let halt = Arc::new(AtomicBool::new(false));
        let stats = Arc::new(Mutex::new(TailStats::default()));

        let notifier = if config.native_notifications {
            match notifier::spawn_notifier(&path, signal_tx.clone()) {
                Ok(w) => Some(w),
                Err(e) => {
                    tracing::warn!(
                        lane = lane.number(),
                        error = %e,
                        "Native notifications unavailable; relying on polling"
                    );
                    None
                }
            }
        } else {
            None
        };

        let worker_state = LaneWorker {
            tracker,
            source,
            bus,
            cancel: Arc::clone(&cancel),
            halt: Arc::clone(&halt),
            stats: Arc::clone(&stats),
        };
        let settle_delay = config.settle_delay;
        let poll_interval = config.poll_interval;

        let worker = std::thread::Builder::new()
            .name(format!("lane{}-tail", lane.number()))
            .spawn(move || run_tail_worker(worker_state, signal_rx, settle_delay, poll_interval))
            .map_err(|source| WatchError::Spawn {
                lane: lane.number(),
                source,
            })?;

        tracing::info!(
            lane = lane.number(),
            source = %source,
            file = %path.display(),
            "Lane tail started"
        );

        Ok(Self {
            source,
            path,
            signal_tx,
            cancel,
            halt,
            stats,
            notifier,
            worker: Some(worker),
        })
    }

    pub fn source(&self) -> Source {
        self.source
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True until `stop` has been called.
    pub fn is_active(&self) -> bool {
        !self.cancel.load(Ordering::SeqCst)
    }

    /// Deliver a change signal as if the filesystem had reported one.
    ///
    /// For hosts with their own notification source. Ignored after `stop`.
    pub fn notify_changed(&self) {
        if self.is_active() {
            let _ = self.signal_tx.send(WatchSignal::Changed);
        }
    }

    /// Snapshot of the worker's counters.
    pub fn stats(&self) -> TailStats {
        *self.stats.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Stop the lane. After this returns no further violation is published
    /// by this lane. Idempotent.
    pub fn stop(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };

        self.cancel.store(true, Ordering::SeqCst);
        // Dropping the watcher detaches the native subscription.
        self.notifier = None;
        let _ = self.signal_tx.send(WatchSignal::Stop);

        if worker.thread().id() == std::thread::current().id() {
            // Called from a listener on our own worker thread.
            self.halt.store(true, Ordering::SeqCst);
            tracing::debug!(
                lane = self.source.lane().number(),
                "Lane stop requested from its own worker"
            );
            return;
        }

        if worker.join().is_err() {
            tracing::error!(
                lane = self.source.lane().number(),
                "Lane worker panicked"
            );
        }
        tracing::info!(lane = self.source.lane().number(), "Lane tail stopped");
    }
}

impl Drop for TailWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for TailWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TailWatcher")
            .field("source", &self.source)
            .field("path", &self.path)
            .field("active", &self.is_active())
            .field("native", &self.notifier.is_some())
            .finish()
    }
}

// =============================================================================
// Worker (private to the background thread)
// =============================================================================

struct LaneWorker {
    tracker: TailTracker,
    source: Source,
    bus: ViolationBus,
    cancel: Arc<AtomicBool>,
    halt: Arc<AtomicBool>,
    stats: Arc<Mutex<TailStats>>,
}

/// What woke an idle or settling worker.
enum Wake {
    Drain,
    Exit,
}

fn run_tail_worker(
    mut lane: LaneWorker,
    rx: mpsc::Receiver<WatchSignal>,
    settle_delay: Duration,
    poll_interval: Duration,
) {
    let lane_no = lane.source.lane().number();
    tracing::debug!(lane = lane_no, "Tail worker running");

    loop {
        // Idle.
        let wake = match rx.recv_timeout(poll_interval) {
            Ok(WatchSignal::Changed) => Wake::Drain,
            Err(RecvTimeoutError::Timeout) => Wake::Drain,
            Ok(WatchSignal::Stop) | Err(RecvTimeoutError::Disconnected) => Wake::Exit,
        };
        if matches!(wake, Wake::Exit) || lane.cancelled() {
            break;
        }

        // Draining. Repeat while signals keep arriving mid-read.
        loop {
            if let Wake::Exit = settle(&rx, settle_delay) {
                tracing::debug!(lane = lane_no, "Tail worker exiting");
                return;
            }
            if lane.cancelled() {
                tracing::debug!(lane = lane_no, "Tail worker exiting");
                return;
            }

            lane.drain();

            match collapse_pending(&rx) {
                Some(Wake::Drain) => continue,
                Some(Wake::Exit) => {
                    tracing::debug!(lane = lane_no, "Tail worker exiting");
                    return;
                }
                None => break,
            }
        }
    }

    tracing::debug!(lane = lane_no, "Tail worker exiting");
}

/// Wait out the settle delay, absorbing duplicate change signals.
fn settle(rx: &mpsc::Receiver<WatchSignal>, delay: Duration) -> Wake {
    let deadline = Instant::now() + delay;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Wake::Drain;
        }
        match rx.recv_timeout(remaining) {
            Ok(WatchSignal::Changed) => continue,
            Err(RecvTimeoutError::Timeout) => return Wake::Drain,
            Ok(WatchSignal::Stop) | Err(RecvTimeoutError::Disconnected) => return Wake::Exit,
        }
    }
}

/// Empty the channel without blocking. Any number of queued change signals
/// collapses into one follow-up drain.
fn collapse_pending(rx: &mpsc::Receiver<WatchSignal>) -> Option<Wake> {
    let mut pending = None;
    loop {
        match rx.try_recv() {
            Ok(WatchSignal::Changed) => pending = Some(Wake::Drain),
            Ok(WatchSignal::Stop) | Err(TryRecvError::Disconnected) => return Some(Wake::Exit),
            Err(TryRecvError::Empty) => return pending,
        }
    }
}

impl LaneWorker {
    fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    /// Read and dispatch every complete line currently in the file.
    fn drain(&mut self) {
        self.update_stats(|s| s.drains += 1);

        while !self.cancelled() {
            let offset_before = self.tracker.consumed_bytes();
            let lines = match self.tracker.read_new_lines() {
                Ok(lines) => lines,
                Err(e) => {
                    tracing::warn!(
                        lane = self.source.lane().number(),
                        error = %e,
                        "Tail: read failed; will retry on next change"
                    );
                    self.update_stats(|s| s.io_errors += 1);
                    return;
                }
            };
            if lines.is_empty() {
                // Only discarded bytes: keep going while the offset moves.
                if self.tracker.consumed_bytes() == offset_before {
                    return;
                }
                continue;
            }

            let mut parsed = 0u64;
            let mut violations = Vec::new();
            for line in &lines {
                let Some(entry) = parse_line(line, self.source) else {
                    tracing::trace!(lane = self.source.lane().number(), "Tail: line skipped");
                    continue;
                };
                parsed += 1;
                violations.extend(classify(&entry));
            }

            // Counters first, so a listener that reads them sees this batch.
            let read = lines.len() as u64;
            let detected = violations.len() as u64;
            self.update_stats(|s| {
                s.lines_read += read;
                s.entries_parsed += parsed;
                s.violations += detected;
            });

            // Past the read: this batch is delivered in full.
            for violation in &violations {
                if self.halt.load(Ordering::SeqCst) {
                    return;
                }
                tracing::debug!(
                    lane = violation.lane.number(),
                    plate = %violation.license_plate,
                    kind = %violation.kind,
                    "Violation detected"
                );
                self.bus.publish_unless_halted(violation, &self.halt);
            }
        }
    }

    fn update_stats(&self, f: impl FnOnce(&mut TailStats)) {
        let mut stats = self.stats.lock().unwrap_or_else(|p| p.into_inner());
        f(&mut stats);
    }
}
