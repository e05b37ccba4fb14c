// Folio - app/mod.rs
//
// Application layer: scan orchestration, caching, and the query facade.
// Dependencies: core, platform, util.

pub mod cache;
pub mod scan;
pub mod service;
