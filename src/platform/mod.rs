// Folio - platform/mod.rs
//
// Platform abstraction layer: config file location and loading, post file
// reading.
// Dependencies: standard library, directories, toml, util.
// Must NOT depend on: core, app.

pub mod config;
pub mod fs;
