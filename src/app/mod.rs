// LaneWatch - app/mod.rs
//
// Application layer: file tailing, change notifications, lane orchestration
// and event fan-out.
// Dependencies: core layer, util.
// Must NOT depend on: platform (config is resolved by the binary).

pub mod coordinator;
pub mod events;
pub mod notifier;
pub mod tail;
pub mod tracker;
