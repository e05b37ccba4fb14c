// Folio - core/mod.rs
//
// Core content logic layer.
// Dependencies: parsing/rendering crates only (serde_yaml, comrak, syntect).
// Must NOT depend on: platform, app. Discovery reads file metadata, never
// file contents.

pub mod discovery;
pub mod frontmatter;
pub mod model;
pub mod post;
pub mod query;
pub mod render;
pub mod slug;
