// Folio - core/post.rs
//
// Post model builder: validates front-matter and turns it, together with
// the body and source path, into a canonical `Post`.
// Core layer: pure transformation, never touches the filesystem.

use crate::core::frontmatter::value_kind;
use crate::core::model::Post;
use crate::core::render::{MarkdownRenderer, RenderConfig};
use crate::core::slug;
use crate::util::constants;
use crate::util::error::PostError;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_yaml::{Mapping, Value};
use std::collections::BTreeSet;
use std::path::Path;

/// Tunables for post building.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Maximum length of a derived excerpt, in characters.
    pub excerpt_length: usize,

    /// Reading speed for the reading-time estimate.
    pub words_per_minute: usize,

    /// Author for posts that do not name one.
    pub default_author: String,

    pub render: RenderConfig,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            excerpt_length: constants::DEFAULT_EXCERPT_LENGTH,
            words_per_minute: constants::DEFAULT_WORDS_PER_MINUTE,
            default_author: constants::DEFAULT_AUTHOR.to_string(),
            render: RenderConfig::default(),
        }
    }
}

/// Builds posts from parsed front-matter. Holds the Markdown renderer so it
/// is constructed once per cache, not once per file.
#[derive(Debug)]
pub struct PostBuilder {
    config: BuildConfig,
    renderer: MarkdownRenderer,
}

impl PostBuilder {
    pub fn new(config: BuildConfig) -> Self {
        let renderer = MarkdownRenderer::new(&config.render);
        Self { config, renderer }
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    /// Produce a canonical post or the first field that makes it invalid.
    ///
    /// `source` supplies the default slug and is recorded on the post; it is
    /// never opened.
    pub fn build(&self, metadata: Mapping, body: &str, source: &Path) -> Result<Post, PostError> {
        let title = required_text(&metadata, "title")?;
        let date = parse_date(
            metadata
                .get("date")
                .ok_or(PostError::MissingField { field: "date" })?,
        )?;

        let slug = match optional_string(&metadata, "slug")? {
            Some(explicit) => slug::slugify(&explicit),
            None => slug::slug_from_path(source),
        };
        if slug.is_empty() {
            return Err(PostError::InvalidField {
                field: "slug",
                reason: "does not contain any letters or digits".to_string(),
            });
        }

        let tags = match metadata.get("tags") {
            Some(value) => parse_tags(value)?,
            None => BTreeSet::new(),
        };

        let draft = match metadata.get("draft") {
            None | Some(Value::Null) => false,
            Some(Value::Bool(b)) => *b,
            Some(other) => {
                return Err(PostError::InvalidField {
                    field: "draft",
                    reason: format!("must be true or false, found {}", value_kind(other)),
                })
            }
        };

        let featured_image = match optional_string(&metadata, "featured_image")? {
            Some(image) => Some(image),
            None => optional_string(&metadata, "image")?,
        };

        let author = optional_string(&metadata, "author")?
            .unwrap_or_else(|| self.config.default_author.clone());

        let rendered_html = self.renderer.render(body);

        let excerpt = match optional_string(&metadata, "excerpt")? {
            Some(excerpt) => excerpt,
            None => match optional_string(&metadata, "description")? {
                Some(description) => description,
                None => derive_excerpt(
                    &self.renderer.plain_text(body),
                    self.config.excerpt_length,
                ),
            },
        };

        let reading_time = reading_time(body, self.config.words_per_minute);

        Ok(Post {
            slug,
            title,
            date,
            tags,
            excerpt,
            featured_image,
            draft,
            author,
            reading_time,
            body: body.to_string(),
            rendered_html,
            source: source.to_path_buf(),
            meta: metadata,
        })
    }
}

// =============================================================================
// Field helpers
// =============================================================================

/// Required text field. Numbers are accepted and stringified so a title
/// like `2048` does not need quoting.
fn required_text(metadata: &Mapping, field: &'static str) -> Result<String, PostError> {
    let value = metadata
        .get(field)
        .ok_or(PostError::MissingField { field })?;
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Null => return Err(PostError::MissingField { field }),
        other => {
            return Err(PostError::InvalidField {
                field,
                reason: format!("must be text, found {}", value_kind(other)),
            })
        }
    };
    if text.is_empty() {
        return Err(PostError::MissingField { field });
    }
    Ok(text)
}

/// Optional string field. Absent, null, and blank all mean `None`.
fn optional_string(metadata: &Mapping, field: &'static str) -> Result<Option<String>, PostError> {
    match metadata.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
        }
        Some(other) => Err(PostError::InvalidField {
            field,
            reason: format!("must be text, found {}", value_kind(other)),
        }),
    }
}

/// Parse the `date` field into a calendar date.
fn parse_date(value: &Value) -> Result<NaiveDate, PostError> {
    let raw = match value {
        Value::String(s) => s.trim(),
        Value::Null => return Err(PostError::MissingField { field: "date" }),
        other => {
            return Err(PostError::InvalidField {
                field: "date",
                reason: format!("must be a date string, found {}", value_kind(other)),
            })
        }
    };

    if let Ok(date) = NaiveDate::parse_from_str(raw, constants::DATE_FORMATS[0]) {
        return Ok(date);
    }
    for format in &constants::DATE_FORMATS[1..] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(dt.date());
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.date_naive());
    }

    Err(PostError::InvalidField {
        field: "date",
        reason: format!("'{raw}' is not a valid date (expected YYYY-MM-DD)"),
    })
}

/// Coerce the `tags` field into a set.
///
/// A list of scalars is the normal form. A single string is split on commas
/// (`tags: rust, web`). A single number or boolean becomes a one-element
/// set. Mappings and nested lists are rejected.
fn parse_tags(value: &Value) -> Result<BTreeSet<String>, PostError> {
    let invalid = |found: &Value| PostError::InvalidField {
        field: "tags",
        reason: format!("must be a list of text values, found {}", value_kind(found)),
    };

    let raw: Vec<String> = match value {
        Value::Null => Vec::new(),
        Value::String(s) => s.split(',').map(str::to_string).collect(),
        Value::Number(_) | Value::Bool(_) => vec![scalar_text(value).unwrap_or_default()],
        Value::Sequence(items) => items
            .iter()
            .map(|item| scalar_text(item).ok_or_else(|| invalid(item)))
            .collect::<Result<_, _>>()?,
        other => return Err(invalid(other)),
    };

    Ok(raw
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect())
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

// =============================================================================
// Derived fields
// =============================================================================

/// Excerpt of plain `text`, whitespace collapsed and cut at a word boundary.
pub fn derive_excerpt(text: &str, max_chars: usize) -> String {
    let clean = text.split_whitespace().collect::<Vec<_>>().join(" ");

    if clean.chars().count() <= max_chars {
        return clean;
    }

    let cut: String = clean.chars().take(max_chars).collect();
    // Only back off to a word boundary if the cut landed mid-word.
    let next_is_space = clean.chars().nth(max_chars).is_some_and(char::is_whitespace);
    let truncated = if next_is_space {
        cut.as_str()
    } else {
        match cut.rfind(' ') {
            Some(idx) if idx > 0 => &cut[..idx],
            _ => cut.as_str(),
        }
    };

    format!(
        "{}{}",
        truncated.trim_end_matches(|c: char| c.is_whitespace() || c == ',' || c == '.'),
        constants::EXCERPT_ELLIPSIS
    )
}

/// Whole minutes to read `body` at `words_per_minute`, never less than 1.
pub fn reading_time(body: &str, words_per_minute: usize) -> usize {
    let words = body.split_whitespace().count();
    let wpm = words_per_minute.max(1);
    ((words + wpm / 2) / wpm).max(1)
}

// =============================================================================
// Tests
// =============================================================================
