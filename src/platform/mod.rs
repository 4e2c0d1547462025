// LaneWatch - platform/mod.rs
//
// Platform abstraction layer: config directory resolution and config file
// loading.
// Dependencies: standard library, directories, toml.
// Must NOT depend on: core, app.

pub mod config;
