// Folio - core/discovery.rs
//
// Post file discovery and the directory freshness fingerprint.
//
// Architecture note: this module uses `walkdir` for directory traversal as an
// OS abstraction. It reads only file *metadata* (size, mtime), never file
// *contents*; reading is owned by the app layer (app::scan).
//
// Limits:
//   - Per-entry I/O errors are non-fatal and collected as warnings.
//   - max_files is a hard guard: enumeration stops as soon as it is exceeded
//     and the whole scan fails with TooManyFiles.
//   - Exclude patterns short-circuit directory descent via filter_entry.

use crate::core::model::{DiscoveredPost, FreshnessToken};
use crate::util::constants;
use crate::util::error::ScanError;
use chrono::{DateTime, Utc};
use std::path::Path;
use std::time::SystemTime;

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for a discovery pass.
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Maximum directory recursion depth. 1 = the posts directory only.
    pub max_depth: usize,

    /// Maximum number of matching files before the scan is refused.
    pub max_files: usize,

    /// Glob patterns (filename-only) that a file MUST match to be included.
    /// An empty list means "include everything that is not excluded".
    pub include_patterns: Vec<String>,

    /// Glob patterns matched against filenames AND directory component names.
    /// Matching files are skipped; matching directories are not descended into.
    pub exclude_patterns: Vec<String>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            max_depth: constants::DEFAULT_MAX_DEPTH,
            max_files: constants::DEFAULT_MAX_FILES,
            include_patterns: constants::DEFAULT_INCLUDE_PATTERNS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            exclude_patterns: constants::DEFAULT_EXCLUDE_PATTERNS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
        }
    }
}

/// Result of a discovery pass.
#[derive(Debug, Clone, Default)]
pub struct Discovery {
    /// Matching files, sorted by path.
    pub files: Vec<DiscoveredPost>,

    /// Newest modification time among the walked directories themselves.
    /// Catches renames, which leave file sizes and mtimes unchanged.
    pub newest_dir_mtime: Option<DateTime<Utc>>,

    /// Entries that could not be inspected.
    pub warnings: Vec<String>,
}

// =============================================================================
// Discovery
// =============================================================================

/// Discover post files under `root`, applying include/exclude glob patterns.
///
/// # Fatal errors
/// `DirectoryUnreadable` if the root is missing or cannot be listed,
/// `NotADirectory` if it is a file, `TooManyFiles` once more than
/// `max_files` matching files have been seen.
///
/// # Non-fatal errors
/// Entries below the root that cannot be accessed are recorded in
/// `Discovery::warnings` and skipped.
pub fn discover_posts(root: &Path, config: &DiscoveryConfig) -> Result<Discovery, ScanError> {
    preflight(root)?;

    let max_files = config
        .max_files
        .clamp(constants::MIN_MAX_FILES, constants::ABSOLUTE_MAX_FILES);
    let max_depth = config.max_depth.min(constants::ABSOLUTE_MAX_DEPTH);

    tracing::debug!(
        root = %root.display(),
        max_depth,
        max_files,
        include = ?config.include_patterns,
        exclude = ?config.exclude_patterns,
        "Discovery starting"
    );

    let include_pats = compile_patterns(&config.include_patterns, "include");
    let exclude_pats = compile_patterns(&config.exclude_patterns, "exclude");

    let mut discovery = Discovery::default();

    let walker = walkdir::WalkDir::new(root)
        .max_depth(max_depth)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| {
            if e.file_type().is_dir() {
                // Always allow the root itself.
                if e.depth() == 0 {
                    return true;
                }
                let name = e.file_name().to_str().unwrap_or("");
                return !is_excluded_component(name, &exclude_pats);
            }
            true
        });

    for entry_result in walker {
        let entry = match entry_result {
            Ok(e) => e,
            Err(e) => {
                let path_str = e
                    .path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "<unknown>".to_string());
                let msg = format!("Cannot access '{path_str}': {e}");
                tracing::debug!(warning = %msg, "Discovery warning");
                discovery.warnings.push(msg);
                continue;
            }
        };

        if entry.file_type().is_dir() {
            if let Ok(meta) = entry.metadata() {
                let mtime = meta.modified().ok().map(DateTime::<Utc>::from);
                discovery.newest_dir_mtime = discovery.newest_dir_mtime.max(mtime);
            }
            continue;
        }

        let path = entry.path();

        let file_name = match path.file_name().and_then(|n| n.to_str()) {
            Some(n) => n,
            None => {
                let msg = format!("Skipping '{}': non-UTF-8 filename", path.display());
                tracing::debug!(warning = %msg, "Discovery warning");
                discovery.warnings.push(msg);
                continue;
            }
        };

        if is_excluded_filename(file_name, &exclude_pats) {
            tracing::trace!(file = file_name, "Excluded by pattern");
            continue;
        }

        if !is_included(file_name, &include_pats) {
            tracing::trace!(file = file_name, "Not matched by include patterns");
            continue;
        }

        // A symlinked post is read through the link, so its freshness comes
        // from the target.
        let metadata = if entry.path_is_symlink() {
            std::fs::metadata(path).map_err(|e| e.to_string())
        } else {
            entry.metadata().map_err(|e| e.to_string())
        };
        let metadata = match metadata {
            Ok(m) => m,
            Err(e) => {
                let msg = format!("Cannot read metadata for '{}': {e}", path.display());
                tracing::debug!(warning = %msg, "Discovery warning");
                discovery.warnings.push(msg);
                continue;
            }
        };

        discovery.files.push(DiscoveredPost {
            path: path.to_path_buf(),
            size: metadata.len(),
            modified: metadata.modified().ok().map(DateTime::<Utc>::from),
        });

        if discovery.files.len() > max_files {
            tracing::debug!(
                root = %root.display(),
                limit = max_files,
                "Post file limit exceeded, scan refused"
            );
            return Err(ScanError::TooManyFiles {
                path: root.to_path_buf(),
                max: max_files,
            });
        }
    }

    discovery.files.sort_by(|a, b| a.path.cmp(&b.path));

    tracing::debug!(
        files = discovery.files.len(),
        warnings = discovery.warnings.len(),
        "Discovery complete"
    );

    Ok(discovery)
}

/// Compute the freshness fingerprint of `root` from file metadata alone.
///
/// The returned token carries generation 0; the cache stamps its own
/// generation on top.
pub fn fingerprint(root: &Path, config: &DiscoveryConfig) -> Result<FreshnessToken, ScanError> {
    let discovery = discover_posts(root, config)?;
    Ok(token_for(&discovery))
}

/// Summarise a discovery pass as a freshness token.
pub fn token_for(discovery: &Discovery) -> FreshnessToken {
    let newest_file = discovery.files.iter().filter_map(|f| f.modified).max();
    let newest = newest_file.max(discovery.newest_dir_mtime);

    FreshnessToken {
        file_count: discovery.files.len(),
        total_bytes: discovery.files.iter().map(|f| f.size).sum(),
        newest_mtime_ns: newest.map(mtime_ns).unwrap_or(0),
        generation: 0,
    }
}

fn mtime_ns(t: DateTime<Utc>) -> u128 {
    SystemTime::from(t)
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0)
}

/// Check the root before walking.
///
/// `fs::metadata()` is used rather than `Path::is_dir()` because the helper
/// maps every error to `false`, hiding permission problems. `read_dir` is
/// then attempted so an unlistable directory fails here rather than being
/// reported as an empty blog.
fn preflight(root: &Path) -> Result<(), ScanError> {
    let meta = std::fs::metadata(root).map_err(|source| ScanError::DirectoryUnreadable {
        path: root.to_path_buf(),
        source,
    })?;
    if !meta.is_dir() {
        return Err(ScanError::NotADirectory {
            path: root.to_path_buf(),
        });
    }
    std::fs::read_dir(root).map_err(|source| ScanError::DirectoryUnreadable {
        path: root.to_path_buf(),
        source,
    })?;
    Ok(())
}

// =============================================================================
// Glob helpers
// =============================================================================

/// Compile a list of glob pattern strings into `glob::Pattern` objects.
/// Patterns that fail to compile are logged as warnings and skipped.
fn compile_patterns(patterns: &[String], kind: &str) -> Vec<glob::Pattern> {
    patterns
        .iter()
        .filter_map(|p| match glob::Pattern::new(p) {
            Ok(compiled) => Some(compiled),
            Err(e) => {
                tracing::warn!(pattern = p, kind, error = %e, "Invalid glob pattern, skipping");
                None
            }
        })
        .collect()
}

/// Returns true if `dir_name` matches an exclude pattern. Hidden-directory
/// patterns such as `.*` apply to directories as well as literals such as
/// `node_modules`; extension globs such as `*.bak` only apply to files.
fn is_excluded_component(dir_name: &str, exclude_pats: &[glob::Pattern]) -> bool {
    exclude_pats.iter().any(|p| {
        let s = p.as_str();
        let literal = !s.contains('*') && !s.contains('?') && !s.contains('[');
        (literal || s == ".*") && p.matches(dir_name)
    })
}

/// Returns true if `file_name` matches any exclude pattern (wildcard or literal).
fn is_excluded_filename(file_name: &str, exclude_pats: &[glob::Pattern]) -> bool {
    exclude_pats.iter().any(|p| p.matches(file_name))
}

/// Returns true if `file_name` matches at least one include pattern.
/// An empty include list means "include all".
fn is_included(file_name: &str, include_pats: &[glob::Pattern]) -> bool {
    if include_pats.is_empty() {
        return true;
    }
    include_pats.iter().any(|p| p.matches(file_name))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn make_temp_tree() -> TempDir {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path();

        fs::write(root.join("a.md"), "---\ntitle: A\n---\n").expect("write a.md");
        fs::write(root.join("b.markdown"), "---\ntitle: B\n---\n").expect("write b.markdown");
        fs::write(root.join("notes.txt"), "not a post\n").expect("write notes.txt");

        // Editor and backup leftovers
        fs::write(root.join(".hidden.md"), "hidden").expect("write .hidden.md");
        fs::write(root.join("a.md~"), "backup").expect("write a.md~");

        // Subdirectory
        let sub = root.join("series");
        fs::create_dir(&sub).expect("mkdir series");
        fs::write(sub.join("part-1.md"), "---\ntitle: P1\n---\n").expect("write part-1.md");

        // Excluded directory
        let node = root.join("node_modules");
        fs::create_dir(&node).expect("mkdir node_modules");
        fs::write(node.join("readme.md"), "excluded\n").expect("write readme.md");

        dir
    }

    fn names(discovery: &Discovery) -> Vec<String> {
        discovery
            .files
            .iter()
            .map(|f| f.path.file_name().unwrap().to_str().unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_discovers_markdown_files_at_top_level() {
        let dir = make_temp_tree();
        let discovery = discover_posts(dir.path(), &DiscoveryConfig::default()).unwrap();

        assert_eq!(names(&discovery), vec!["a.md", "b.markdown"]);
        assert!(discovery.warnings.is_empty(), "unexpected warnings: {:?}", discovery.warnings);
    }

    #[test]
    fn test_deeper_walk_skips_excluded_directories() {
        let dir = make_temp_tree();
        let config = DiscoveryConfig {
            max_depth: 3,
            ..Default::default()
        };
        let found = names(&discover_posts(dir.path(), &config).unwrap());
        assert!(found.contains(&"part-1.md".to_string()), "got {found:?}");
        assert!(
            !found.contains(&"readme.md".to_string()),
            "node_modules should be excluded, got {found:?}"
        );
    }

    #[test]
    fn test_files_sorted_by_path() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["c.md", "a.md", "b.md"] {
            fs::write(dir.path().join(name), "x").unwrap();
        }
        let discovery = discover_posts(dir.path(), &DiscoveryConfig::default()).unwrap();
        assert_eq!(names(&discovery), vec!["a.md", "b.md", "c.md"]);
    }

    #[test]
    fn test_too_many_files_is_fatal() {
        let dir = make_temp_tree(); // two matching files at depth 1
        let config = DiscoveryConfig {
            max_files: 1,
            ..Default::default()
        };
        let err = discover_posts(dir.path(), &config).unwrap_err();
        assert!(matches!(err, ScanError::TooManyFiles { max: 1, .. }), "got {err:?}");
    }

    #[test]
    fn test_exactly_max_files_is_allowed() {
        let dir = make_temp_tree();
        let config = DiscoveryConfig {
            max_files: 2,
            ..Default::default()
        };
        assert_eq!(discover_posts(dir.path(), &config).unwrap().files.len(), 2);
    }

    #[test]
    fn test_root_not_found() {
        let result = discover_posts(
            Path::new("/nonexistent/path/folio-posts"),
            &DiscoveryConfig::default(),
        );
        assert!(matches!(result, Err(ScanError::DirectoryUnreadable { .. })));
    }

    #[test]
    fn test_root_not_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("post.md");
        fs::write(&file, "content").unwrap();
        let result = discover_posts(&file, &DiscoveryConfig::default());
        assert!(matches!(result, Err(ScanError::NotADirectory { .. })));
    }

    #[test]
    fn test_file_metadata_collected() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("meta.md"), "hello world").unwrap();
        let discovery = discover_posts(dir.path(), &DiscoveryConfig::default()).unwrap();
        assert_eq!(discovery.files.len(), 1);
        assert_eq!(discovery.files[0].size, 11);
        assert!(discovery.files[0].modified.is_some());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_file_reports_target_metadata() {
        let target_dir = tempfile::tempdir().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let target = target_dir.path().join("real.md");
        fs::write(&target, "a much longer target body").unwrap();
        std::os::unix::fs::symlink(&target, dir.path().join("link.md")).unwrap();

        let discovery = discover_posts(dir.path(), &DiscoveryConfig::default()).unwrap();
        assert_eq!(discovery.files.len(), 1);
        assert_eq!(discovery.files[0].size, 25);
    }

    #[test]
    fn test_fingerprint_stable_without_changes() {
        let dir = make_temp_tree();
        let config = DiscoveryConfig::default();
        let a = fingerprint(dir.path(), &config).unwrap();
        let b = fingerprint(dir.path(), &config).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.file_count, 2);
        assert_eq!(a.generation, 0);
    }

    #[test]
    fn test_fingerprint_changes_when_file_added() {
        let dir = make_temp_tree();
        let config = DiscoveryConfig::default();
        let before = fingerprint(dir.path(), &config).unwrap();
        fs::write(dir.path().join("new.md"), "---\ntitle: New\n---\n").unwrap();
        let after = fingerprint(dir.path(), &config).unwrap();
        assert_ne!(before, after);
        assert_eq!(after.file_count, 3);
    }

    #[test]
    fn test_fingerprint_ignores_non_matching_sizes() {
        let dir = make_temp_tree();
        let config = DiscoveryConfig::default();
        let token = fingerprint(dir.path(), &config).unwrap();
        let expected: u64 = ["a.md", "b.markdown"]
            .iter()
            .map(|n| fs::metadata(dir.path().join(n)).unwrap().len())
            .sum();
        assert_eq!(token.total_bytes, expected);
    }

    #[test]
    fn test_hidden_directory_pattern_applies_to_directories() {
        let pats = compile_patterns(&[".*".to_string(), "*.bak".to_string()], "exclude");
        assert!(is_excluded_component(".git", &pats));
        assert!(!is_excluded_component("drafts.bak", &pats));
        assert!(!is_excluded_component("posts", &pats));
    }
}
