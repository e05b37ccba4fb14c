// Folio - util/constants.rs
//
// Single source of truth for all named constants, limits, and defaults.
// Config validation and discovery clamp user values against these bounds.

// =============================================================================
// Application metadata
// =============================================================================

/// Application display name.
pub const APP_NAME: &str = "Folio";

/// Application identifier used for config/data directories.
pub const APP_ID: &str = "Folio";

/// Current application version (updated by release script).
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// Content discovery limits
// =============================================================================

/// Default posts directory, relative to the working directory.
pub const DEFAULT_POSTS_DIR: &str = "./posts";

/// Default directory recursion depth. 1 = files directly inside the posts
/// directory, no subdirectories.
pub const DEFAULT_MAX_DEPTH: usize = 1;

/// Hard upper bound on max depth (prevents runaway traversal).
pub const ABSOLUTE_MAX_DEPTH: usize = 16;

/// Default file-count guard for a single scan.
pub const DEFAULT_MAX_FILES: usize = 2_000;

/// Minimum sensible value for the max-files limit.
pub const MIN_MAX_FILES: usize = 1;

/// Hard upper bound on max files (prevents configuration mistakes).
pub const ABSOLUTE_MAX_FILES: usize = 50_000;

/// Largest post file that will be read, in bytes. Larger files are skipped.
pub const MAX_POST_FILE_SIZE: u64 = 4 * 1024 * 1024; // 4 MB

/// Default include glob patterns (matched against file names).
pub const DEFAULT_INCLUDE_PATTERNS: &[&str] = &["*.md", "*.markdown"];

/// Default exclude glob patterns (file names and directory names).
pub const DEFAULT_EXCLUDE_PATTERNS: &[&str] = &[
    ".*",
    "*~",
    "*.bak",
    "*.tmp",
    "*.swp",
    "node_modules",
    "_drafts_archive",
];

// =============================================================================
// File reading
// =============================================================================

/// Retry limits for transient I/O errors while reading post files.
pub const READ_MAX_RETRIES: u32 = 3;

/// Backoff delays between read retries (ms).
pub const READ_RETRY_DELAYS_MS: [u64; 3] = [25, 50, 100];

// =============================================================================
// Post building
// =============================================================================

/// Front-matter delimiter line.
pub const FRONT_MATTER_DELIMITER: &str = "---";

/// Default excerpt length in characters when the post does not supply one.
pub const DEFAULT_EXCERPT_LENGTH: usize = 160;

/// Minimum user-configurable excerpt length.
pub const MIN_EXCERPT_LENGTH: usize = 20;

/// Maximum user-configurable excerpt length.
pub const MAX_EXCERPT_LENGTH: usize = 2_000;

/// Suffix appended to a derived excerpt that was shortened.
pub const EXCERPT_ELLIPSIS: &str = "...";

/// Reading speed used for the reading-time estimate.
pub const DEFAULT_WORDS_PER_MINUTE: usize = 200;

/// Minimum user-configurable reading speed.
pub const MIN_WORDS_PER_MINUTE: usize = 50;

/// Maximum user-configurable reading speed.
pub const MAX_WORDS_PER_MINUTE: usize = 1_000;

/// Author used when a post does not name one.
pub const DEFAULT_AUTHOR: &str = "Anonymous";

/// Date formats accepted for the `date` front-matter key, tried in order.
/// RFC 3339 timestamps are accepted in addition to these.
pub const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"];

/// Display format for `Post::date_formatted`.
pub const DISPLAY_DATE_FORMAT: &str = "%B %d, %Y";

/// ISO format for `Post::date_iso`.
pub const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

// =============================================================================
// Rendering
// =============================================================================

/// CSS class prefix for syntax-highlighted code spans.
pub const HIGHLIGHT_CLASS_PREFIX: &str = "hl-";

/// Language assumed for fenced code blocks without an info string.
pub const DEFAULT_CODE_LANGUAGE: &str = "text";

// =============================================================================
// Query defaults
// =============================================================================

/// Default number of posts per page.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Maximum page size a caller may request.
pub const DEFAULT_MAX_PAGE_SIZE: usize = 100;

/// Hard upper bound on the configurable maximum page size.
pub const ABSOLUTE_MAX_PAGE_SIZE: usize = 1_000;

/// Default number of posts for the "recent posts" view.
pub const DEFAULT_RECENT_LIMIT: usize = 5;

/// Default number of posts for the "related posts" view.
pub const DEFAULT_RELATED_LIMIT: usize = 3;

// =============================================================================
// Logging
// =============================================================================

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

// =============================================================================
// Configuration
// =============================================================================

/// Configuration file name.
pub const CONFIG_FILE_NAME: &str = "folio.toml";
