// LaneWatch - lib.rs
//
// Library entry point, exposing the tailing pipeline for integration testing
// and for embedding in a presentation front-end.
//
// Typical use:
//   let mut lanes = LaneCoordinator::new(CoordinatorConfig::new(p1, p2));
//   lanes.subscribe(|v| println!("{v}"));
//   lanes.start()?;

pub mod app;
pub mod core;
pub mod platform;
pub mod util;

pub use app::coordinator::{CoordinatorConfig, LaneCoordinator};
pub use app::events::{ListenerId, ViolationBus};
pub use core::model::{Lane, LogEntry, Source, Violation, ViolationKind};
