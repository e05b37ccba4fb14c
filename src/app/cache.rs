// Folio - app/cache.rs
//
// Memoised content store keyed by a directory freshness token.
//
// Concurrency model:
//   - The current (snapshot, token) pair lives behind an RwLock and is only
//     ever replaced by swapping an Arc; readers never see a partial store.
//   - Rescans are single-flight: a Mutex serialises them and every caller
//     re-checks the cached token after acquiring it, so callers that raced
//     on the same stale token reuse the winner's result.
//   - Lock poisoning is recovered with `PoisonError::into_inner`; the
//     guarded values are replaced whole and never left half-written.
//
// Failure policy: a failed probe or rescan keeps serving the previous
// snapshot (or an empty store) together with a `CacheWarning`. A token whose
// rescan failed is remembered so the same failing scan is not repeated on
// every request.

use crate::app::scan::{scan_posts, ScanConfig};
use crate::core::discovery::{self, DiscoveryConfig};
use crate::core::model::{ContentStore, FreshnessToken};
use crate::core::post::PostBuilder;
use crate::util::error::ScanError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

// =============================================================================
// Freshness probing
// =============================================================================

/// Source of freshness tokens for the cache.
pub trait FreshnessProbe: Send + Sync {
    /// Compute the current token. Must be cheap: metadata only.
    fn probe(&self) -> Result<FreshnessToken, ScanError>;
}

/// Production probe: fingerprints the posts directory.
#[derive(Debug, Clone)]
pub struct DirectoryProbe {
    root: PathBuf,
    config: DiscoveryConfig,
}

impl DirectoryProbe {
    pub fn new(root: impl Into<PathBuf>, config: DiscoveryConfig) -> Self {
        Self {
            root: root.into(),
            config,
        }
    }
}

impl FreshnessProbe for DirectoryProbe {
    fn probe(&self) -> Result<FreshnessToken, ScanError> {
        discovery::fingerprint(&self.root, &self.config)
    }
}

// =============================================================================
// Public result types
// =============================================================================

/// Degraded-mode notice: the cache could not refresh and is serving older
/// (or empty) content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheWarning {
    pub message: String,
    pub since: DateTime<Utc>,
}

/// Result of a cache read.
#[derive(Debug, Clone)]
pub struct CacheRead {
    pub store: Arc<ContentStore>,

    /// Set when the store could not be refreshed.
    pub warning: Option<CacheWarning>,
}

/// Cache status indicator.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStatus {
    pub posts_dir: PathBuf,

    /// Completion time of the last successful scan.
    pub last_scan: Option<DateTime<Utc>>,

    pub post_count: usize,
    pub draft_count: usize,
    pub skipped_count: usize,

    /// Token of the cached snapshot.
    pub token: Option<FreshnessToken>,

    pub generation: u64,

    /// Number of full scans performed since the cache was created.
    pub scan_count: u64,

    pub degraded: Option<CacheWarning>,
}

// =============================================================================
// PostCache
// =============================================================================

#[derive(Debug)]
struct CacheEntry {
    store: Arc<ContentStore>,
    token: FreshnessToken,
}

/// Single-snapshot post cache.
///
/// `Send + Sync`: share by reference or `Arc` between request handlers.
pub struct PostCache {
    root: PathBuf,
    scan_config: ScanConfig,
    builder: PostBuilder,
    probe: Box<dyn FreshnessProbe>,

    entry: RwLock<Option<Arc<CacheEntry>>>,
    refresh: Mutex<()>,
    generation: AtomicU64,
    scans: AtomicU64,

    /// Token whose rescan last failed, with the warning it produced.
    failed: Mutex<Option<(FreshnessToken, CacheWarning)>>,

    /// Warning from the most recent read, for `status()`.
    last_warning: Mutex<Option<CacheWarning>>,
}

impl std::fmt::Debug for PostCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostCache")
            .field("root", &self.root)
            .field("generation", &self.generation.load(Ordering::SeqCst))
            .field("scans", &self.scans.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl PostCache {
    /// Cache over `root` using the directory fingerprint as freshness probe.
    pub fn new(root: impl Into<PathBuf>, scan_config: ScanConfig, builder: PostBuilder) -> Self {
        let root = root.into();
        let probe = DirectoryProbe::new(root.clone(), scan_config.discovery.clone());
        Self::with_probe(root, scan_config, builder, Box::new(probe))
    }

    /// Cache with a caller-supplied freshness probe.
    pub fn with_probe(
        root: impl Into<PathBuf>,
        scan_config: ScanConfig,
        builder: PostBuilder,
        probe: Box<dyn FreshnessProbe>,
    ) -> Self {
        Self {
            root: root.into(),
            scan_config,
            builder,
            probe,
            entry: RwLock::new(None),
            refresh: Mutex::new(()),
            generation: AtomicU64::new(0),
            scans: AtomicU64::new(0),
            failed: Mutex::new(None),
            last_warning: Mutex::new(None),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Return the current valid content store, rescanning if it is stale.
    pub fn get_posts(&self) -> CacheRead {
        let generation = self.generation.load(Ordering::SeqCst);
        let token = match self.probe.probe() {
            Ok(token) => token.with_generation(generation),
            Err(e) => return self.degraded(format!("Freshness check failed: {e}")),
        };

        if let Some(store) = self.current_if(token) {
            return self.fresh(store);
        }
        if let Some(warning) = self.failed_warning(token) {
            return self.serve_with(warning);
        }

        let _refresh = lock(&self.refresh);

        // Another caller may have refreshed (or failed) while we waited.
        if let Some(store) = self.current_if(token) {
            tracing::trace!("Rescan already completed by another caller");
            return self.fresh(store);
        }
        if let Some(warning) = self.failed_warning(token) {
            return self.serve_with(warning);
        }

        tracing::debug!(
            root = %self.root.display(),
            files = token.file_count,
            generation,
            "Content stale, rescanning"
        );
        self.scans.fetch_add(1, Ordering::SeqCst);

        match scan_posts(&self.root, &self.scan_config, &self.builder) {
            Ok(outcome) => {
                let store = Arc::new(ContentStore::new(
                    outcome.posts,
                    outcome.skipped,
                    Utc::now(),
                ));
                let entry = Arc::new(CacheEntry {
                    store: Arc::clone(&store),
                    token,
                });
                *write(&self.entry) = Some(entry);
                *lock(&self.failed) = None;
                tracing::info!(
                    posts = store.len(),
                    skipped = store.skipped().len(),
                    "Content store refreshed"
                );
                self.fresh(store)
            }
            Err(e) => {
                let warning = self.warn(format!("Rescan failed: {e}"));
                *lock(&self.failed) = Some((token, warning.clone()));
                self.serve_with(warning)
            }
        }
    }

    /// Force the next `get_posts()` to rescan.
    pub fn invalidate(&self) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!(generation, "Cache invalidated");
    }

    /// Report the cache status without probing the directory.
    pub fn status(&self) -> CacheStatus {
        let entry = read(&self.entry).clone();
        let store = entry.as_ref().map(|e| Arc::clone(&e.store));
        CacheStatus {
            posts_dir: self.root.clone(),
            last_scan: store.as_ref().and_then(|s| s.scanned_at()),
            post_count: store.as_ref().map_or(0, |s| s.len()),
            draft_count: store.as_ref().map_or(0, |s| s.draft_count()),
            skipped_count: store.as_ref().map_or(0, |s| s.skipped().len()),
            token: entry.as_ref().map(|e| e.token),
            generation: self.generation.load(Ordering::SeqCst),
            scan_count: self.scans.load(Ordering::SeqCst),
            degraded: lock(&self.last_warning).clone(),
        }
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    fn current_if(&self, token: FreshnessToken) -> Option<Arc<ContentStore>> {
        read(&self.entry)
            .as_ref()
            .filter(|e| e.token == token)
            .map(|e| Arc::clone(&e.store))
    }

    fn current_or_empty(&self) -> Arc<ContentStore> {
        read(&self.entry)
            .as_ref()
            .map(|e| Arc::clone(&e.store))
            .unwrap_or_else(|| Arc::new(ContentStore::empty()))
    }

    fn failed_warning(&self, token: FreshnessToken) -> Option<CacheWarning> {
        lock(&self.failed)
            .as_ref()
            .filter(|(failed_token, _)| *failed_token == token)
            .map(|(_, warning)| warning.clone())
    }

    fn fresh(&self, store: Arc<ContentStore>) -> CacheRead {
        *lock(&self.last_warning) = None;
        CacheRead {
            store,
            warning: None,
        }
    }

    fn degraded(&self, message: String) -> CacheRead {
        let warning = self.warn(message);
        self.serve_with(warning)
    }

    fn serve_with(&self, warning: CacheWarning) -> CacheRead {
        *lock(&self.last_warning) = Some(warning.clone());
        CacheRead {
            store: self.current_or_empty(),
            warning: Some(warning),
        }
    }

    fn warn(&self, message: String) -> CacheWarning {
        tracing::warn!(
            root = %self.root.display(),
            reason = %message,
            "Serving cached content in degraded mode"
        );
        CacheWarning {
            message,
            since: Utc::now(),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn read<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::post::BuildConfig;
    use std::fs;
    use std::sync::Barrier;
    use std::thread;

    /// Probe whose token only changes when the test says so.
    struct ManualProbe {
        token: Mutex<FreshnessToken>,
    }

    impl ManualProbe {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                token: Mutex::new(FreshnessToken::default()),
            })
        }

        fn advance(&self) {
            lock(&self.token).file_count += 1;
        }
    }

    impl FreshnessProbe for Arc<ManualProbe> {
        fn probe(&self) -> Result<FreshnessToken, ScanError> {
            Ok(*lock(&self.token))
        }
    }

    fn write_post(dir: &Path, name: &str, date: &str) {
        fs::write(
            dir.join(name),
            format!("---\ntitle: {name}\ndate: {date}\n---\nBody.\n"),
        )
        .unwrap();
    }

    fn cache_for(dir: &Path) -> PostCache {
        PostCache::new(dir, ScanConfig::default(), PostBuilder::new(BuildConfig::default()))
    }

    #[test]
    fn test_consecutive_reads_reuse_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        write_post(dir.path(), "a.md", "2025-01-01");
        let cache = cache_for(dir.path());

        let first = cache.get_posts();
        let second = cache.get_posts();
        assert!(first.warning.is_none());
        assert!(Arc::ptr_eq(&first.store, &second.store));
        assert_eq!(first.store, second.store);
        assert_eq!(cache.status().scan_count, 1);
    }

    #[test]
    fn test_added_file_picked_up() {
        let dir = tempfile::tempdir().unwrap();
        write_post(dir.path(), "a.md", "2025-01-01");
        let cache = cache_for(dir.path());
        assert_eq!(cache.get_posts().store.len(), 1);

        write_post(dir.path(), "b-second-post.md", "2025-02-01");
        let read = cache.get_posts();
        assert_eq!(read.store.len(), 2);
        assert!(read.store.get("b-second-post").is_some());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_post_edit_picked_up() {
        let store = tempfile::tempdir().unwrap();
        let posts = tempfile::tempdir().unwrap();
        let target = store.path().join("a.md");
        fs::write(&target, "---\ntitle: Old\ndate: 2025-01-01\n---\nBody.\n").unwrap();
        std::os::unix::fs::symlink(&target, posts.path().join("a.md")).unwrap();

        let cache = cache_for(posts.path());
        assert_eq!(cache.get_posts().store.get("a").unwrap().title, "Old");

        fs::write(
            &target,
            "---\ntitle: New and much longer title\ndate: 2025-01-01\n---\nBody.\n",
        )
        .unwrap();
        let later = std::time::SystemTime::now() + std::time::Duration::from_secs(10);
        fs::File::options()
            .write(true)
            .open(&target)
            .unwrap()
            .set_modified(later)
            .unwrap();

        let read = cache.get_posts();
        assert_eq!(read.store.get("a").unwrap().title, "New and much longer title");
        assert_eq!(cache.status().scan_count, 2);
    }

    #[test]
    fn test_stale_until_token_advances() {
        let dir = tempfile::tempdir().unwrap();
        write_post(dir.path(), "a.md", "2025-01-01");
        let probe = ManualProbe::new();
        let cache = PostCache::with_probe(
            dir.path(),
            ScanConfig::default(),
            PostBuilder::new(BuildConfig::default()),
            Box::new(Arc::clone(&probe)),
        );
        assert_eq!(cache.get_posts().store.len(), 1);

        fs::remove_file(dir.path().join("a.md")).unwrap();
        assert_eq!(cache.get_posts().store.len(), 1, "token unchanged: stale store served");

        probe.advance();
        assert_eq!(cache.get_posts().store.len(), 0);
    }

    #[test]
    fn test_invalidate_forces_rescan() {
        let dir = tempfile::tempdir().unwrap();
        write_post(dir.path(), "a.md", "2025-01-01");
        let probe = ManualProbe::new();
        let cache = PostCache::with_probe(
            dir.path(),
            ScanConfig::default(),
            PostBuilder::new(BuildConfig::default()),
            Box::new(Arc::clone(&probe)),
        );
        cache.get_posts();
        write_post(dir.path(), "b.md", "2025-01-02");

        cache.invalidate();
        assert_eq!(cache.get_posts().store.len(), 2);
        assert_eq!(cache.status().scan_count, 2);
        assert_eq!(cache.status().generation, 1);
    }

    #[test]
    fn test_unreadable_directory_serves_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let posts = dir.path().join("posts");
        fs::create_dir(&posts).unwrap();
        write_post(&posts, "a.md", "2025-01-01");
        let cache = cache_for(&posts);
        assert_eq!(cache.get_posts().store.len(), 1);

        fs::remove_dir_all(&posts).unwrap();
        let read = cache.get_posts();
        assert_eq!(read.store.len(), 1, "previous snapshot retained");
        let warning = read.warning.expect("degraded-mode warning");
        assert!(warning.message.contains("unreadable"), "got: {}", warning.message);
        assert!(cache.status().degraded.is_some());
    }

    #[test]
    fn test_failure_without_snapshot_serves_empty_store() {
        let cache = cache_for(Path::new("/nonexistent/folio/posts"));
        let read = cache.get_posts();
        assert!(read.store.is_empty());
        assert!(read.warning.is_some());
        assert_eq!(cache.status().scan_count, 0);
    }

    #[test]
    fn test_failed_scan_not_repeated_for_same_token() {
        // The probe reports a token, but the scan itself fails (root missing).
        let probe = ManualProbe::new();
        let cache = PostCache::with_probe(
            "/nonexistent/folio/posts",
            ScanConfig::default(),
            PostBuilder::new(BuildConfig::default()),
            Box::new(Arc::clone(&probe)),
        );
        assert!(cache.get_posts().warning.is_some());
        assert!(cache.get_posts().warning.is_some());
        assert_eq!(cache.status().scan_count, 1);

        probe.advance();
        cache.get_posts();
        assert_eq!(cache.status().scan_count, 2);
    }

    #[test]
    fn test_recovery_clears_warning() {
        let dir = tempfile::tempdir().unwrap();
        let posts = dir.path().join("posts");
        let cache = cache_for(&posts);
        assert!(cache.get_posts().warning.is_some());

        fs::create_dir(&posts).unwrap();
        write_post(&posts, "a.md", "2025-01-01");
        let read = cache.get_posts();
        assert!(read.warning.is_none());
        assert_eq!(read.store.len(), 1);
        assert!(cache.status().degraded.is_none());
    }

    #[test]
    fn test_concurrent_stale_reads_scan_once() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..20 {
            write_post(dir.path(), &format!("post-{i:02}.md"), "2025-01-01");
        }
        let cache = Arc::new(cache_for(dir.path()));
        let threads = 8;
        let barrier = Arc::new(Barrier::new(threads));

        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    cache.get_posts().store.len()
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), 20);
        }
        assert_eq!(cache.status().scan_count, 1);
    }

    #[test]
    fn test_cache_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PostCache>();
    }
}
