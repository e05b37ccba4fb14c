// Folio - core/query.rs
//
// Declarative query policy over a content snapshot: filtering, sorting,
// pagination, and the derived tag/related views.
// All active filters are AND-combined.
// Core layer: pure logic, no I/O.

use crate::core::model::Post;
use crate::util::error::QueryError;
use chrono::NaiveDate;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

// =============================================================================
// Filtering
// =============================================================================

/// Complete filter state. All fields are AND-combined when applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostFilter {
    /// Exact, case-sensitive tag. None = any tags.
    pub tag: Option<String>,

    /// Drafts are hidden unless this is set.
    pub include_drafts: bool,

    /// Publication year. None = any year.
    pub year: Option<i32>,

    /// Earliest date (inclusive). None = no lower bound.
    pub since: Option<NaiveDate>,

    /// Latest date (inclusive). None = no upper bound.
    pub until: Option<NaiveDate>,

    /// Case-insensitive substring over title, body and tags. Empty = no filter.
    pub text: String,
}

impl PostFilter {
    /// Filter that only applies draft visibility.
    pub fn visible(include_drafts: bool) -> Self {
        Self {
            include_drafts,
            ..Default::default()
        }
    }
}

/// Apply `filter` to `posts`, returning the matching posts in input order.
pub fn apply_filter(posts: &[Arc<Post>], filter: &PostFilter) -> Vec<Arc<Post>> {
    let text_lower = filter.text.trim().to_lowercase();

    posts
        .iter()
        .filter(|post| matches_all(post, filter, &text_lower))
        .cloned()
        .collect()
}

fn matches_all(post: &Post, filter: &PostFilter, text_lower: &str) -> bool {
    if post.draft && !filter.include_drafts {
        return false;
    }

    if let Some(ref tag) = filter.tag {
        if !post.has_tag(tag) {
            return false;
        }
    }

    if let Some(year) = filter.year {
        if post.year() != year {
            return false;
        }
    }

    if let Some(since) = filter.since {
        if post.date < since {
            return false;
        }
    }
    if let Some(until) = filter.until {
        if post.date > until {
            return false;
        }
    }

    if !text_lower.is_empty() && !matches_text(post, text_lower) {
        return false;
    }

    true
}

fn matches_text(post: &Post, text_lower: &str) -> bool {
    post.title.to_lowercase().contains(text_lower)
        || post.body.to_lowercase().contains(text_lower)
        || post.tags.iter().any(|t| t.to_lowercase().contains(text_lower))
}

// =============================================================================
// Sorting
// =============================================================================

/// Field a sort key compares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    Date,
    Slug,
    Title,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SortKey {
    pub field: SortField,
    pub direction: Direction,
}

impl SortKey {
    pub const fn new(field: SortField, direction: Direction) -> Self {
        Self { field, direction }
    }

    fn compare(&self, a: &Post, b: &Post) -> Ordering {
        let ord = match self.field {
            SortField::Date => a.date.cmp(&b.date),
            SortField::Slug => a.slug.cmp(&b.slug),
            SortField::Title => a.title.cmp(&b.title),
        };
        match self.direction {
            Direction::Ascending => ord,
            Direction::Descending => ord.reverse(),
        }
    }
}

/// Ordered list of sort keys; later keys break ties in earlier ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SortOrder {
    keys: Vec<SortKey>,
}

impl SortOrder {
    pub fn new(keys: Vec<SortKey>) -> Self {
        Self { keys }
    }

    pub fn keys(&self) -> &[SortKey] {
        &self.keys
    }

    /// Total order over posts. Slug is appended as a final tiebreak so the
    /// result never depends on input order.
    pub fn compare(&self, a: &Post, b: &Post) -> Ordering {
        self.keys
            .iter()
            .map(|key| key.compare(a, b))
            .find(|ord| ord.is_ne())
            .unwrap_or_else(|| a.slug.cmp(&b.slug))
    }
}

/// Newest first; same-day posts by slug ascending.
impl Default for SortOrder {
    fn default() -> Self {
        Self::new(vec![
            SortKey::new(SortField::Date, Direction::Descending),
            SortKey::new(SortField::Slug, Direction::Ascending),
        ])
    }
}

pub fn sort_posts(posts: &mut [Arc<Post>], order: &SortOrder) {
    posts.sort_by(|a, b| order.compare(a, b));
}

// =============================================================================
// Pagination
// =============================================================================

/// 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: usize,
    pub page_size: usize,
}

impl PageRequest {
    pub fn new(page: usize, page_size: usize) -> Self {
        Self { page, page_size }
    }
}

/// One page of results plus the totals a pager needs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub page_size: usize,
    pub total_items: usize,
    pub total_pages: usize,
}

impl<T> Page<T> {
    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }
}

/// Slice `items` into the requested page.
///
/// `page_size` must be in `1..=max_page_size`. Page 0 is treated as page 1.
/// An empty input still has a valid, empty page 1; any later page is
/// `OutOfRange`.
pub fn paginate<T>(
    items: Vec<T>,
    request: PageRequest,
    max_page_size: usize,
) -> Result<Page<T>, QueryError> {
    if request.page_size == 0 || request.page_size > max_page_size {
        return Err(QueryError::InvalidPageSize {
            page_size: request.page_size,
            max: max_page_size,
        });
    }

    let page = request.page.max(1);
    let total_items = items.len();
    let total_pages = total_items.div_ceil(request.page_size).max(1);

    if page > total_pages {
        return Err(QueryError::OutOfRange { page, total_pages });
    }

    let start = (page - 1) * request.page_size;
    let items: Vec<T> = items
        .into_iter()
        .skip(start)
        .take(request.page_size)
        .collect();

    Ok(Page {
        items,
        page,
        page_size: request.page_size,
        total_items,
        total_pages,
    })
}

// =============================================================================
// Derived views
// =============================================================================

/// A tag and the number of posts carrying it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagCount {
    pub tag: String,
    pub count: usize,
}

/// Count tags across `posts`, most used first, ties by name.
pub fn tag_counts(posts: &[Arc<Post>]) -> Vec<TagCount> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for post in posts {
        for tag in &post.tags {
            *counts.entry(tag.as_str()).or_insert(0) += 1;
        }
    }

    let mut result: Vec<TagCount> = counts
        .into_iter()
        .map(|(tag, count)| TagCount {
            tag: tag.to_string(),
            count,
        })
        .collect();
    result.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.tag.cmp(&b.tag)));
    result
}

/// Posts sharing at least one tag with `target`, most shared tags first,
/// then in `order`. `target` itself is never included.
pub fn related(
    posts: &[Arc<Post>],
    target: &Post,
    limit: usize,
    order: &SortOrder,
) -> Vec<Arc<Post>> {
    let mut scored: Vec<(usize, &Arc<Post>)> = posts
        .iter()
        .filter(|p| p.slug != target.slug)
        .map(|p| (p.tags.intersection(&target.tags).count(), p))
        .filter(|(score, _)| *score > 0)
        .collect();

    scored.sort_by(|(sa, a), (sb, b)| sb.cmp(sa).then_with(|| order.compare(a, b)));

    scored
        .into_iter()
        .take(limit)
        .map(|(_, p)| Arc::clone(p))
        .collect()
}

// =============================================================================
// Tests
// =============================================================================
