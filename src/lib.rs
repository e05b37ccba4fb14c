// Folio - lib.rs
//
// Library entry point. The engine is used as a library by a route layer;
// the `folio` binary in main.rs is a thin command-line front end over it.

pub mod app;
pub mod core;
pub mod platform;
pub mod util;
