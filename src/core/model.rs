// Folio - core/model.rs
//
// Core data model types. Pure data definitions with no I/O and no
// platform dependencies.
//
// These types are the shared vocabulary across all layers.

use crate::util::constants;
use crate::util::error::{LoadError, LoadErrorKind};
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use std::sync::Arc;

// =============================================================================
// Post (canonical output of the builder)
// =============================================================================

/// A single blog post, normalised from one Markdown file.
///
/// Built once per scan and never modified afterwards; the content store
/// shares posts as `Arc<Post>` so queries can hand them out without copying.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Post {
    /// Unique, URL-safe identifier.
    pub slug: String,

    pub title: String,

    /// Publication date; the primary sort key.
    pub date: NaiveDate,

    /// Tag set. Ordered only so serialised output is stable.
    pub tags: BTreeSet<String>,

    /// Summary text, either from front-matter or derived from the body.
    pub excerpt: String,

    /// Optional image reference (URL or site-relative path).
    pub featured_image: Option<String>,

    /// Drafts are hidden from queries unless explicitly requested.
    pub draft: bool,

    pub author: String,

    /// Estimated reading time in whole minutes (at least 1).
    pub reading_time: usize,

    /// Raw Markdown body (front-matter removed).
    pub body: String,

    /// Body rendered to HTML with highlighted code blocks.
    pub rendered_html: String,

    /// File the post was built from.
    pub source: PathBuf,

    /// Every front-matter key, including ones Folio does not interpret,
    /// for templates that need custom fields.
    pub meta: serde_yaml::Mapping,
}

impl Post {
    /// Date as `YYYY-MM-DD`.
    pub fn date_iso(&self) -> String {
        self.date.format(constants::ISO_DATE_FORMAT).to_string()
    }

    /// Date for display, e.g. "January 30, 2024".
    pub fn date_formatted(&self) -> String {
        self.date.format(constants::DISPLAY_DATE_FORMAT).to_string()
    }

    pub fn year(&self) -> i32 {
        self.date.year()
    }

    pub fn month(&self) -> u32 {
        self.date.month()
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }
}

// =============================================================================
// Discovered files
// =============================================================================

/// A post file found during directory discovery, before it is read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredPost {
    pub path: PathBuf,

    /// File size in bytes.
    pub size: u64,

    /// Last-modified time, if the platform reports one.
    pub modified: Option<DateTime<Utc>>,
}

// =============================================================================
// Skipped files
// =============================================================================

/// Record of a file that did not become a post during a scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub kind: LoadErrorKind,
    pub reason: String,
}

impl From<&LoadError> for SkippedFile {
    fn from(err: &LoadError) -> Self {
        Self {
            path: err.path().clone(),
            kind: err.kind(),
            reason: err.to_string(),
        }
    }
}

// =============================================================================
// Freshness token
// =============================================================================

/// Cheap fingerprint of the posts directory.
///
/// Computed from file metadata only. Two tokens compare equal when nothing
/// observable about the post files has changed and the cache generation
/// has not been bumped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct FreshnessToken {
    /// Number of matching post files.
    pub file_count: usize,

    /// Sum of the matching files' sizes in bytes.
    pub total_bytes: u64,

    /// Newest modification time among the files and the directory itself,
    /// in nanoseconds since the Unix epoch (0 when unavailable).
    pub newest_mtime_ns: u128,

    /// Explicit invalidation counter owned by the cache.
    pub generation: u64,
}

impl FreshnessToken {
    /// Return a copy carrying the given cache generation.
    pub fn with_generation(mut self, generation: u64) -> Self {
        self.generation = generation;
        self
    }
}

// =============================================================================
// Content store (one scan's snapshot)
// =============================================================================

/// Immutable snapshot of every post produced by one scan.
///
/// Posts are kept in scan order; ordering for display is the query layer's
/// job. A slug index makes exact lookups O(1).
#[derive(Debug, Clone, Default)]
pub struct ContentStore {
    posts: Vec<Arc<Post>>,
    by_slug: HashMap<String, usize>,
    skipped: Vec<SkippedFile>,
    scanned_at: Option<DateTime<Utc>>,
}

impl ContentStore {
    /// Build a store from scanned posts. Slugs must already be unique; the
    /// scanner guarantees this. A repeated slug keeps its first occurrence
    /// in the index.
    pub fn new(posts: Vec<Post>, skipped: Vec<SkippedFile>, scanned_at: DateTime<Utc>) -> Self {
        let posts: Vec<Arc<Post>> = posts.into_iter().map(Arc::new).collect();
        let mut by_slug = HashMap::with_capacity(posts.len());
        for (idx, post) in posts.iter().enumerate() {
            by_slug.entry(post.slug.clone()).or_insert(idx);
        }
        Self {
            posts,
            by_slug,
            skipped,
            scanned_at: Some(scanned_at),
        }
    }

    /// Store served before any scan has succeeded.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn posts(&self) -> &[Arc<Post>] {
        &self.posts
    }

    pub fn get(&self, slug: &str) -> Option<&Arc<Post>> {
        self.by_slug.get(slug).and_then(|&idx| self.posts.get(idx))
    }

    pub fn skipped(&self) -> &[SkippedFile] {
        &self.skipped
    }

    /// When the scan that produced this store finished. `None` for the
    /// empty placeholder store.
    pub fn scanned_at(&self) -> Option<DateTime<Utc>> {
        self.scanned_at
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    pub fn draft_count(&self) -> usize {
        self.posts.iter().filter(|p| p.draft).count()
    }
}

/// Stores compare by content, not by scan time, so two scans of an
/// unchanged directory are equal.
impl PartialEq for ContentStore {
    fn eq(&self, other: &Self) -> bool {
        self.posts == other.posts && self.skipped == other.skipped
    }
}

// =============================================================================
// Tests
// =============================================================================
