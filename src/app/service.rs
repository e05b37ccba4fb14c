// Folio - app/service.rs
//
// Query service: the read API the route layer calls. Every operation pulls
// the current snapshot from the cache and applies the declarative policy in
// core::query. Reads never mutate the snapshot.

use crate::app::cache::{CacheStatus, PostCache};
use crate::app::scan::ScanConfig;
use crate::core::discovery::DiscoveryConfig;
use crate::core::model::{ContentStore, Post};
use crate::core::post::{BuildConfig, PostBuilder};
use crate::core::query::{self, Page, PageRequest, PostFilter, SortOrder, TagCount};
use crate::core::render::RenderConfig;
use crate::platform::config::AppConfig;
use crate::util::constants;
use crate::util::error::QueryError;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Query-side settings.
#[derive(Debug, Clone)]
pub struct QueryConfig {
    /// Page size used when a list request does not name one.
    pub page_size: usize,
    pub max_page_size: usize,
    pub recent_limit: usize,
    pub related_limit: usize,
    pub sort: SortOrder,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            page_size: constants::DEFAULT_PAGE_SIZE,
            max_page_size: constants::DEFAULT_MAX_PAGE_SIZE,
            recent_limit: constants::DEFAULT_RECENT_LIMIT,
            related_limit: constants::DEFAULT_RELATED_LIMIT,
            sort: SortOrder::default(),
        }
    }
}

/// A list request: filters plus a 1-based page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub filter: PostFilter,

    /// 1-based page number; 0 is treated as 1.
    pub page: usize,

    /// None = the configured default page size.
    pub page_size: Option<usize>,
}

impl ListQuery {
    pub fn tag(tag: impl Into<String>) -> Self {
        Self {
            filter: PostFilter {
                tag: Some(tag.into()),
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

/// Facade over the cache and query policy.
#[derive(Debug)]
pub struct BlogService {
    cache: PostCache,
    config: QueryConfig,
}

impl BlogService {
    pub fn new(cache: PostCache, config: QueryConfig) -> Self {
        Self { cache, config }
    }

    /// Assemble the whole engine (builder, scanner, cache, service) from a
    /// validated configuration.
    pub fn from_config(app: &AppConfig) -> Self {
        let discovery = DiscoveryConfig {
            max_depth: app.max_depth,
            max_files: app.max_files,
            include_patterns: app.include_patterns.clone(),
            exclude_patterns: app.exclude_patterns.clone(),
        };
        let scan_config = ScanConfig {
            discovery,
            max_file_size: app.max_file_size,
        };
        let builder = PostBuilder::new(BuildConfig {
            excerpt_length: app.excerpt_length,
            words_per_minute: app.words_per_minute,
            default_author: app.default_author.clone(),
            render: RenderConfig {
                allow_raw_html: app.allow_raw_html,
                hard_breaks: app.hard_breaks,
                smart_punctuation: app.smart_punctuation,
            },
        });
        let query = QueryConfig {
            page_size: app.page_size,
            max_page_size: app.max_page_size,
            recent_limit: app.recent_limit,
            related_limit: app.related_limit,
            sort: SortOrder::default(),
        };

        tracing::debug!(posts_dir = %app.posts_dir.display(), "Blog service configured");
        Self::new(PostCache::new(&app.posts_dir, scan_config, builder), query)
    }

    pub fn cache(&self) -> &PostCache {
        &self.cache
    }

    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    fn store(&self) -> Arc<ContentStore> {
        self.cache.get_posts().store
    }

    /// Filtered posts in the configured order.
    fn select(&self, store: &ContentStore, filter: &PostFilter) -> Vec<Arc<Post>> {
        let mut posts = query::apply_filter(store.posts(), filter);
        query::sort_posts(&mut posts, &self.config.sort);
        posts
    }

    /// Filter, sort (date descending, slug ascending) and paginate.
    pub fn list(&self, request: &ListQuery) -> Result<Page<Arc<Post>>, QueryError> {
        let store = self.store();
        let posts = self.select(&store, &request.filter);
        let page_request = PageRequest::new(
            request.page,
            request.page_size.unwrap_or(self.config.page_size),
        );
        let page = query::paginate(posts, page_request, self.config.max_page_size)?;

        tracing::debug!(
            tag = request.filter.tag.as_deref().unwrap_or(""),
            page = page.page,
            items = page.items.len(),
            total = page.total_items,
            "List query"
        );
        Ok(page)
    }

    /// Exact slug lookup. Drafts are `NotFound` unless requested.
    pub fn get(&self, slug: &str, include_drafts: bool) -> Result<Arc<Post>, QueryError> {
        let store = self.store();
        store
            .get(slug)
            .filter(|post| include_drafts || !post.draft)
            .cloned()
            .ok_or_else(|| QueryError::NotFound {
                slug: slug.to_string(),
            })
    }

    /// Tag usage over visible posts, most used first.
    pub fn tags(&self, include_drafts: bool) -> Vec<TagCount> {
        let store = self.store();
        let visible = query::apply_filter(store.posts(), &PostFilter::visible(include_drafts));
        query::tag_counts(&visible)
    }

    /// Newest published posts. `None` uses the configured limit.
    pub fn recent(&self, limit: Option<usize>) -> Vec<Arc<Post>> {
        let store = self.store();
        let mut posts = self.select(&store, &PostFilter::default());
        posts.truncate(limit.unwrap_or(self.config.recent_limit));
        posts
    }

    /// Published posts sharing tags with `slug`.
    pub fn related(&self, slug: &str, limit: Option<usize>) -> Result<Vec<Arc<Post>>, QueryError> {
        let store = self.store();
        let target = store
            .get(slug)
            .filter(|post| !post.draft)
            .ok_or_else(|| QueryError::NotFound {
                slug: slug.to_string(),
            })?;
        let visible = query::apply_filter(store.posts(), &PostFilter::default());
        Ok(query::related(
            &visible,
            target,
            limit.unwrap_or(self.config.related_limit),
            &self.config.sort,
        ))
    }

    /// Case-insensitive search over title, body and tags of published posts.
    pub fn search(&self, text: &str) -> Vec<Arc<Post>> {
        let filter = PostFilter {
            text: text.to_string(),
            ..Default::default()
        };
        let store = self.store();
        self.select(&store, &filter)
    }

    /// Completion time of the scan behind the current snapshot.
    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.store().scanned_at()
    }

    pub fn status(&self) -> CacheStatus {
        self.cache.status()
    }

    /// Force the next read to rescan.
    pub fn invalidate(&self) {
        self.cache.invalidate();
    }
}

// =============================================================================
// Tests
// =============================================================================
