// Folio - core/slug.rs
//
// Slug derivation for posts: URL-safe, lowercase, hyphen-separated.

use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

/// Matches a leading `YYYY-MM-DD-` date prefix on a file stem.
fn date_prefix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{4}-\d{2}-\d{2}-(.+)$").expect("valid date prefix regex"))
}

/// Normalise arbitrary text into a slug: lowercase ASCII letters and digits,
/// every other run collapsed to a single hyphen, no leading or trailing
/// hyphen. Non-ASCII letters are transliterated.
pub fn slugify(text: &str) -> String {
    slug::slugify(text)
}

/// Derive a slug from a post file path.
///
/// `2024-01-30-Hello World.md` -> `hello-world`. The date prefix is dropped
/// because the date lives in front-matter; keeping it would make the slug
/// change whenever a post is re-dated.
pub fn slug_from_path(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or_default();

    let name = date_prefix_re()
        .captures(&stem)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| stem.to_string());

    slugify(&name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_stem() {
        assert_eq!(slug_from_path(Path::new("posts/a.md")), "a");
    }

    #[test]
    fn test_date_prefix_stripped() {
        assert_eq!(
            slug_from_path(Path::new("2024-01-30-hello-world.md")),
            "hello-world"
        );
    }

    #[test]
    fn test_case_and_punctuation_collapsed() {
        assert_eq!(
            slug_from_path(Path::new("My First Post!! (Draft).md")),
            "my-first-post-draft"
        );
    }

    #[test]
    fn test_date_only_stem_kept() {
        // No trailing name after the date: nothing to strip.
        assert_eq!(slug_from_path(Path::new("2024-01-30.md")), "2024-01-30");
    }

    #[test]
    fn test_slugify_is_idempotent() {
        let once = slugify("Rust & WebAssembly: Part 2");
        assert_eq!(once, "rust-webassembly-part-2");
        assert_eq!(slugify(&once), once);
    }
}
