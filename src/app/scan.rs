// Folio - app/scan.rs
//
// Content store scanner. Orchestrates discovery, file reading and post
// building for one pass over the posts directory.
//
// Error policy:
//   - Scan-fatal errors (root unreadable, too many files) abort the pass.
//   - Per-file errors are non-fatal: the file is recorded as skipped, logged
//     at WARN with its path and reason, and the scan continues.
//   - Files are parsed in parallel (rayon) but combined in path order so
//     duplicate-slug resolution is deterministic.

use crate::core::discovery::{self, DiscoveryConfig};
use crate::core::frontmatter::parse_front_matter;
use crate::core::model::{DiscoveredPost, Post, SkippedFile};
use crate::core::post::PostBuilder;
use crate::platform::fs::read_post_file;
use crate::util::constants;
use crate::util::error::{LoadError, ScanError};
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;

/// Configuration for a scan pass.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub discovery: DiscoveryConfig,

    /// Files larger than this are skipped unread.
    pub max_file_size: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            discovery: DiscoveryConfig::default(),
            max_file_size: constants::MAX_POST_FILE_SIZE,
        }
    }
}

/// Result of a successful scan pass.
#[derive(Debug, Clone, Default)]
pub struct ScanOutcome {
    /// Valid posts with unique slugs, in no particular order.
    pub posts: Vec<Post>,

    /// Files that did not become posts, sorted by path.
    pub skipped: Vec<SkippedFile>,

    /// Discovery warnings (entries that could not be inspected).
    pub warnings: Vec<String>,
}

/// Scan `root` and build every post it contains.
///
/// Returns `Err` only for scan-fatal conditions; see the module header.
pub fn scan_posts(
    root: &Path,
    config: &ScanConfig,
    builder: &PostBuilder,
) -> Result<ScanOutcome, ScanError> {
    let scan_start = Instant::now();

    let discovered = discovery::discover_posts(root, &config.discovery)?;
    let total_files = discovered.files.len();
    for warning in &discovered.warnings {
        tracing::warn!(warning = %warning, "Discovery warning");
    }

    let results: Vec<Result<Post, LoadError>> = discovered
        .files
        .par_iter()
        .map(|file| load_post(file, builder, config.max_file_size))
        .collect();

    let (posts, mut errors) = resolve_duplicates(results);
    errors.sort_by(|a, b| a.path().cmp(b.path()));

    for err in &errors {
        tracing::warn!(
            file = %err.path().display(),
            kind = err.kind().label(),
            reason = %err,
            "Post skipped"
        );
    }

    let skipped: Vec<SkippedFile> = errors.iter().map(SkippedFile::from).collect();

    tracing::info!(
        root = %root.display(),
        files = total_files,
        posts = posts.len(),
        skipped = skipped.len(),
        elapsed_ms = scan_start.elapsed().as_millis() as u64,
        "Scan complete"
    );

    Ok(ScanOutcome {
        posts,
        skipped,
        warnings: discovered.warnings,
    })
}

/// Read, split and build a single post file.
fn load_post(
    file: &DiscoveredPost,
    builder: &PostBuilder,
    max_file_size: u64,
) -> Result<Post, LoadError> {
    let raw = read_post_file(&file.path, max_file_size)?;

    let front_matter = parse_front_matter(&raw).map_err(|source| LoadError::FrontMatter {
        path: file.path.clone(),
        source,
    })?;

    let post = builder
        .build(front_matter.metadata, &front_matter.body, &file.path)
        .map_err(|source| LoadError::Post {
            path: file.path.clone(),
            source,
        })?;

    tracing::trace!(file = %file.path.display(), slug = %post.slug, "Post built");
    Ok(post)
}

/// Enforce slug uniqueness over path-ordered build results.
///
/// A published post beats a draft with the same slug; otherwise the first
/// file in path order keeps the slug. Every loser becomes a `DuplicateSlug`
/// error.
fn resolve_duplicates(results: Vec<Result<Post, LoadError>>) -> (Vec<Post>, Vec<LoadError>) {
    let mut posts: Vec<Post> = Vec::with_capacity(results.len());
    let mut by_slug: HashMap<String, usize> = HashMap::new();
    let mut errors: Vec<LoadError> = Vec::new();

    for result in results {
        let post = match result {
            Ok(post) => post,
            Err(e) => {
                errors.push(e);
                continue;
            }
        };

        let Some(&idx) = by_slug.get(&post.slug) else {
            by_slug.insert(post.slug.clone(), posts.len());
            posts.push(post);
            continue;
        };

        if posts[idx].draft && !post.draft {
            let loser = std::mem::replace(&mut posts[idx], post);
            errors.push(LoadError::DuplicateSlug {
                path: loser.source,
                slug: loser.slug,
                kept: posts[idx].source.clone(),
            });
        } else {
            errors.push(LoadError::DuplicateSlug {
                path: post.source,
                slug: post.slug,
                kept: posts[idx].source.clone(),
            });
        }
    }

    (posts, errors)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::post::BuildConfig;
    use crate::util::error::LoadErrorKind;
    use std::fs;

    fn builder() -> PostBuilder {
        PostBuilder::new(BuildConfig::default())
    }

    fn write(dir: &Path, name: &str, content: &str) {
        fs::write(dir.join(name), content).expect("write post");
    }

    fn post_file(title: &str, date: &str, extra: &str) -> String {
        format!("---\ntitle: {title}\ndate: {date}\n{extra}---\nBody of {title}.\n")
    }

    #[test]
    fn test_scan_builds_valid_posts() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.md", &post_file("A", "2025-01-01", "tags: [x]\n"));
        write(dir.path(), "b.md", &post_file("B", "2025-02-01", "tags: [y]\n"));

        let outcome = scan_posts(dir.path(), &ScanConfig::default(), &builder()).unwrap();
        let mut slugs: Vec<_> = outcome.posts.iter().map(|p| p.slug.as_str()).collect();
        slugs.sort();
        assert_eq!(slugs, vec!["a", "b"]);
        assert!(outcome.skipped.is_empty());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_discovery_warnings_reach_outcome() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.md", &post_file("A", "2025-01-01", ""));
        fs::write(dir.path().join(OsStr::from_bytes(b"bad\xff.md")), "x").unwrap();

        let outcome = scan_posts(dir.path(), &ScanConfig::default(), &builder()).unwrap();
        assert_eq!(outcome.posts.len(), 1);
        assert_eq!(outcome.warnings.len(), 1);
        assert!(outcome.warnings[0].contains("non-UTF-8"), "got: {:?}", outcome.warnings);
    }

    #[test]
    fn test_bad_files_are_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.md", &post_file("A", "2025-01-01", ""));
        write(dir.path(), "b.md", &post_file("B", "2025-02-01", ""));
        write(dir.path(), "broken.md", "---\ntitle: [unclosed\n---\nBody\n");
        write(dir.path(), "undated.md", "---\ntitle: No date\n---\nBody\n");

        let outcome = scan_posts(dir.path(), &ScanConfig::default(), &builder()).unwrap();
        assert_eq!(outcome.posts.len(), 2);
        let kinds: Vec<_> = outcome.skipped.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![LoadErrorKind::MalformedFrontMatter, LoadErrorKind::InvalidPost]
        );
        assert!(outcome.skipped[1].reason.contains("date"));
    }

    #[test]
    fn test_duplicate_slug_first_path_wins() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "2024-01-01-hello.md", &post_file("First", "2024-01-01", ""));
        write(dir.path(), "2024-06-01-hello.md", &post_file("Second", "2024-06-01", ""));

        let outcome = scan_posts(dir.path(), &ScanConfig::default(), &builder()).unwrap();
        assert_eq!(outcome.posts.len(), 1);
        assert_eq!(outcome.posts[0].title, "First");
        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.skipped[0].kind, LoadErrorKind::DuplicateSlug);
        assert!(outcome.skipped[0].path.ends_with("2024-06-01-hello.md"));
    }

    #[test]
    fn test_duplicate_slug_published_beats_draft() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a-draft.md", &post_file("Draft", "2024-01-01", "slug: same\ndraft: true\n"));
        write(dir.path(), "b-live.md", &post_file("Live", "2024-01-02", "slug: same\n"));

        let outcome = scan_posts(dir.path(), &ScanConfig::default(), &builder()).unwrap();
        assert_eq!(outcome.posts.len(), 1);
        assert_eq!(outcome.posts[0].title, "Live");
        assert!(outcome.skipped[0].path.ends_with("a-draft.md"));
    }

    #[test]
    fn test_non_markdown_ignored() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.md", &post_file("A", "2025-01-01", ""));
        write(dir.path(), "notes.txt", "---\ntitle: nope\n---\n");

        let outcome = scan_posts(dir.path(), &ScanConfig::default(), &builder()).unwrap();
        assert_eq!(outcome.posts.len(), 1);
        assert!(outcome.skipped.is_empty());
    }

    #[test]
    fn test_missing_root_is_fatal() {
        let result = scan_posts(
            Path::new("/nonexistent/folio/posts"),
            &ScanConfig::default(),
            &builder(),
        );
        assert!(matches!(result, Err(ScanError::DirectoryUnreadable { .. })));
    }

    #[test]
    fn test_empty_directory_is_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = scan_posts(dir.path(), &ScanConfig::default(), &builder()).unwrap();
        assert!(outcome.posts.is_empty());
        assert!(outcome.skipped.is_empty());
    }
}
