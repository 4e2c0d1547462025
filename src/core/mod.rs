// LaneWatch - core/mod.rs
//
// Core business logic layer: record parsing and violation classification.
// Must NOT depend on: app, platform, or any I/O.

pub mod classify;
pub mod model;
pub mod parser;
