// LaneWatch - app/coordinator.rs
//
// Runs one `TailWatcher` per lane and exposes a single violation stream.
//
// Lane 1 is always bound to SOCK1 and lane 2 to SOCK2; the two lanes share
// nothing except the `ViolationBus` they publish into. Events from one lane
// keep file order; there is no ordering between lanes.

use crate::app::events::{ListenerId, ViolationBus};
use crate::app::tail::{TailConfig, TailWatcher};
use crate::core::model::{Lane, Source, TailStats, Violation};
use crate::util::error::WatchError;
use std::path::PathBuf;
use std::sync::mpsc;

/// Everything the coordinator needs: two paths and the tail tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// Log written by the SOCK1 sensor.
    pub lane1_path: PathBuf,
    /// Log written by the SOCK2 sensor.
    pub lane2_path: PathBuf,
    pub tail: TailConfig,
}

impl CoordinatorConfig {
    pub fn new(lane1_path: impl Into<PathBuf>, lane2_path: impl Into<PathBuf>) -> Self {
        Self {
            lane1_path: lane1_path.into(),
            lane2_path: lane2_path.into(),
            tail: TailConfig::default(),
        }
    }

    /// Path tailed for `lane`.
    pub fn path_for(&self, lane: Lane) -> &PathBuf {
        match lane {
            Lane::One => &self.lane1_path,
            Lane::Two => &self.lane2_path,
        }
    }
}

/// Owner of both lane watchers.
#[derive(Debug)]
pub struct LaneCoordinator {
    config: CoordinatorConfig,
    bus: ViolationBus,
    /// Index 0 is lane 1. Empty while stopped.
    lanes: Vec<TailWatcher>,
}

impl LaneCoordinator {
    pub fn new(config: CoordinatorConfig) -> Self {
        Self {
            config,
            bus: ViolationBus::new(),
            lanes: Vec::new(),
        }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// The shared event bus, for consumers that want to hold their own handle.
    pub fn bus(&self) -> &ViolationBus {
        &self.bus
    }

    /// Register a violation listener. See [`ViolationBus::subscribe`].
    pub fn subscribe<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&Violation) + Send + Sync + 'static,
    {
        self.bus.subscribe(listener)
    }

    /// Register a channel listener. See [`ViolationBus::subscribe_channel`].
    pub fn subscribe_channel(&self) -> (ListenerId, mpsc::Receiver<Violation>) {
        self.bus.subscribe_channel()
    }

    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.bus.unsubscribe(id)
    }

    pub fn is_running(&self) -> bool {
        !self.lanes.is_empty()
    }

    /// Capture both files' current sizes and begin tailing.
    ///
    /// When this returns, content already in either file will never be
    /// reported. Missing files are tolerated. Starting twice is a no-op.
    pub fn start(&mut self) -> Result<(), WatchError> {
        if self.is_running() {
            tracing::debug!("Coordinator already running");
            return Ok(());
        }

        let mut lanes = Vec::with_capacity(Source::all().len());
        for source in Source::all() {
            let path = self.config.path_for(source.lane()).clone();
            if !path.exists() {
                tracing::warn!(
                    lane = source.lane().number(),
                    file = %path.display(),
                    "Log file does not exist yet; lane stays idle until it appears"
                );
            }
            // On error, watchers already in `lanes` are stopped by Drop.
            let watcher = TailWatcher::start(path, *source, &self.config.tail, self.bus.clone())?;
            lanes.push(watcher);
        }

        self.lanes = lanes;
        tracing::info!("Both lanes running");
        Ok(())
    }

    /// Stop both lanes. After this returns no further violation is published.
    /// Idempotent; also called on drop.
    pub fn stop(&mut self) {
        if self.lanes.is_empty() {
            return;
        }
        for lane in &mut self.lanes {
            lane.stop();
        }
        self.lanes.clear();
        tracing::info!("Both lanes stopped");
    }

    /// Deliver a change signal to one lane, for hosts with their own
    /// notification source. No-op while stopped.
    pub fn notify_changed(&self, lane: Lane) {
        if let Some(watcher) = self.watcher(lane) {
            watcher.notify_changed();
        }
    }

    /// Counters for one lane, `None` while stopped.
    pub fn stats(&self, lane: Lane) -> Option<TailStats> {
        self.watcher(lane).map(TailWatcher::stats)
    }

    fn watcher(&self, lane: Lane) -> Option<&TailWatcher> {
        self.lanes.iter().find(|w| w.source().lane() == lane)
    }
}

impl Drop for LaneCoordinator {
    fn drop(&mut self) {
        self.stop();
    }
}
