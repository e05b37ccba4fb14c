// Folio - platform/config.rs
//
// Platform-specific configuration directory resolution and folio.toml
// loading with startup validation.
//
// Uses the `directories` crate for XDG (Linux), AppData (Windows),
// Library (macOS) compliance.

use crate::util::constants;
use crate::util::error::ConfigError;
use directories::ProjectDirs;
use std::fmt::Display;
use std::path::{Path, PathBuf};

/// Resolved platform paths for Folio configuration.
#[derive(Debug, Clone)]
pub struct PlatformPaths {
    /// Configuration directory (e.g. ~/.config/folio/ or %APPDATA%\Folio\config\)
    pub config_dir: PathBuf,
}

impl PlatformPaths {
    /// Resolve platform-appropriate paths.
    ///
    /// Falls back to the current directory if platform dirs cannot be
    /// determined.
    pub fn resolve() -> Self {
        if let Some(proj_dirs) = ProjectDirs::from("", "", constants::APP_ID) {
            let config_dir = proj_dirs.config_dir().to_path_buf();
            tracing::debug!(config = %config_dir.display(), "Platform paths resolved");
            Self { config_dir }
        } else {
            tracing::warn!("Could not determine platform directories, using current directory");
            Self {
                config_dir: PathBuf::from("."),
            }
        }
    }

    /// Default location of folio.toml.
    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(constants::CONFIG_FILE_NAME)
    }
}

// =============================================================================
// folio.toml loading and validation
// =============================================================================

/// Raw deserialisable shape of folio.toml.
///
/// Unknown keys are silently ignored for forward compatibility.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct RawConfig {
    pub content: ContentSection,
    pub render: RenderSection,
    pub query: QuerySection,
    pub logging: LoggingSection,
}

/// `[content]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct ContentSection {
    /// Posts directory. Relative paths resolve against the config file's
    /// directory.
    pub posts_dir: Option<String>,
    pub max_depth: Option<usize>,
    pub max_files: Option<usize>,
    pub max_file_size_bytes: Option<u64>,
    pub include_patterns: Option<Vec<String>>,
    pub exclude_patterns: Option<Vec<String>>,
    pub excerpt_length: Option<usize>,
    pub words_per_minute: Option<usize>,
    pub default_author: Option<String>,
}

/// `[render]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct RenderSection {
    pub allow_raw_html: Option<bool>,
    pub hard_breaks: Option<bool>,
    pub smart_punctuation: Option<bool>,
}

/// `[query]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct QuerySection {
    pub page_size: Option<usize>,
    pub max_page_size: Option<usize>,
    pub recent_limit: Option<usize>,
    pub related_limit: Option<usize>,
}

/// `[logging]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub level: Option<String>,
}

/// Validated application configuration derived from folio.toml.
///
/// All values are validated against named constants at load time.
/// Invalid values produce actionable warnings and fall back to defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    // -- Content --
    pub posts_dir: PathBuf,
    pub max_depth: usize,
    pub max_files: usize,
    pub max_file_size: u64,
    pub include_patterns: Vec<String>,
    pub exclude_patterns: Vec<String>,
    pub excerpt_length: usize,
    pub words_per_minute: usize,
    pub default_author: String,

    // -- Render --
    pub allow_raw_html: bool,
    pub hard_breaks: bool,
    pub smart_punctuation: bool,

    // -- Query --
    pub page_size: usize,
    pub max_page_size: usize,
    pub recent_limit: usize,
    pub related_limit: usize,

    // -- Logging --
    /// Logging level string (for init before tracing is available).
    pub log_level: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            posts_dir: PathBuf::from(constants::DEFAULT_POSTS_DIR),
            max_depth: constants::DEFAULT_MAX_DEPTH,
            max_files: constants::DEFAULT_MAX_FILES,
            max_file_size: constants::MAX_POST_FILE_SIZE,
            include_patterns: to_strings(constants::DEFAULT_INCLUDE_PATTERNS),
            exclude_patterns: to_strings(constants::DEFAULT_EXCLUDE_PATTERNS),
            excerpt_length: constants::DEFAULT_EXCERPT_LENGTH,
            words_per_minute: constants::DEFAULT_WORDS_PER_MINUTE,
            default_author: constants::DEFAULT_AUTHOR.to_string(),
            allow_raw_html: true,
            hard_breaks: false,
            smart_punctuation: true,
            page_size: constants::DEFAULT_PAGE_SIZE,
            max_page_size: constants::DEFAULT_MAX_PAGE_SIZE,
            recent_limit: constants::DEFAULT_RECENT_LIMIT,
            related_limit: constants::DEFAULT_RELATED_LIMIT,
            log_level: None,
        }
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

/// Load and validate folio.toml from `config_path`.
///
/// Returns `AppConfig` with validated values and a list of non-fatal warnings.
/// If the file does not exist, returns defaults with no warnings (first run).
/// If the file is unparseable, returns defaults with a warning: the engine
/// still starts but the user is told why their settings were ignored.
pub fn load_config(config_path: &Path) -> (AppConfig, Vec<String>) {
    let mut warnings: Vec<String> = Vec::new();

    if !config_path.exists() {
        tracing::debug!(path = %config_path.display(), "No folio.toml found; using defaults");
        return (AppConfig::default(), warnings);
    }

    let content = match std::fs::read_to_string(config_path) {
        Ok(c) => c,
        Err(source) => {
            let err = ConfigError::Io {
                path: config_path.to_path_buf(),
                source,
            };
            let msg = format!("{err}. Using defaults.");
            tracing::warn!("{}", msg);
            warnings.push(msg);
            return (AppConfig::default(), warnings);
        }
    };

    let raw: RawConfig = match toml::from_str(&content) {
        Ok(r) => r,
        Err(source) => {
            let err = ConfigError::TomlParse {
                path: config_path.to_path_buf(),
                source,
            };
            let msg = format!(
                "{err}. Using defaults. See folio.example.toml for the expected format."
            );
            tracing::warn!("{}", msg);
            warnings.push(msg);
            return (AppConfig::default(), warnings);
        }
    };

    tracing::info!(path = %config_path.display(), "Loaded folio.toml");

    let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));
    let config = validate(raw, base_dir, &mut warnings);

    if !warnings.is_empty() {
        tracing::warn!(count = warnings.len(), "Config validation produced warnings");
    }

    (config, warnings)
}

/// Validate every field against named constants, accumulating warnings.
fn validate(raw: RawConfig, base_dir: &Path, warnings: &mut Vec<String>) -> AppConfig {
    let mut config = AppConfig::default();

    // -- Content --
    if let Some(dir) = raw.content.posts_dir {
        if dir.trim().is_empty() {
            warnings.push(format!(
                "[content] posts_dir is empty. Using default ({}).",
                constants::DEFAULT_POSTS_DIR
            ));
        } else {
            let path = PathBuf::from(dir);
            config.posts_dir = if path.is_absolute() {
                path
            } else {
                base_dir.join(path)
            };
        }
    }

    apply_range(
        &mut config.max_depth,
        raw.content.max_depth,
        "[content] max_depth",
        1,
        constants::ABSOLUTE_MAX_DEPTH,
        warnings,
    );
    apply_range(
        &mut config.max_files,
        raw.content.max_files,
        "[content] max_files",
        constants::MIN_MAX_FILES,
        constants::ABSOLUTE_MAX_FILES,
        warnings,
    );
    apply_range(
        &mut config.max_file_size,
        raw.content.max_file_size_bytes,
        "[content] max_file_size_bytes",
        1,
        constants::MAX_POST_FILE_SIZE,
        warnings,
    );
    apply_range(
        &mut config.excerpt_length,
        raw.content.excerpt_length,
        "[content] excerpt_length",
        constants::MIN_EXCERPT_LENGTH,
        constants::MAX_EXCERPT_LENGTH,
        warnings,
    );
    apply_range(
        &mut config.words_per_minute,
        raw.content.words_per_minute,
        "[content] words_per_minute",
        constants::MIN_WORDS_PER_MINUTE,
        constants::MAX_WORDS_PER_MINUTE,
        warnings,
    );

    if let Some(patterns) = raw.content.include_patterns {
        if patterns.is_empty() {
            warnings.push(
                "[content] include_patterns is empty; every non-excluded file would be read. \
                 Using default (*.md, *.markdown)."
                    .to_string(),
            );
        } else {
            config.include_patterns = patterns;
        }
    }
    if let Some(patterns) = raw.content.exclude_patterns {
        config.exclude_patterns = patterns;
    }

    if let Some(author) = raw.content.default_author {
        let author = author.trim();
        if author.is_empty() {
            warnings.push(format!(
                "[content] default_author is empty. Using default ({}).",
                constants::DEFAULT_AUTHOR
            ));
        } else {
            config.default_author = author.to_string();
        }
    }

    // -- Render --
    if let Some(v) = raw.render.allow_raw_html {
        config.allow_raw_html = v;
    }
    if let Some(v) = raw.render.hard_breaks {
        config.hard_breaks = v;
    }
    if let Some(v) = raw.render.smart_punctuation {
        config.smart_punctuation = v;
    }

    // -- Query --
    apply_range(
        &mut config.max_page_size,
        raw.query.max_page_size,
        "[query] max_page_size",
        1,
        constants::ABSOLUTE_MAX_PAGE_SIZE,
        warnings,
    );
    // page_size is bounded by the (possibly customised) max_page_size.
    let max_page_size = config.max_page_size;
    if config.page_size > max_page_size {
        config.page_size = max_page_size;
    }
    apply_range(
        &mut config.page_size,
        raw.query.page_size,
        "[query] page_size",
        1,
        max_page_size,
        warnings,
    );
    apply_range(
        &mut config.recent_limit,
        raw.query.recent_limit,
        "[query] recent_limit",
        1,
        max_page_size,
        warnings,
    );
    apply_range(
        &mut config.related_limit,
        raw.query.related_limit,
        "[query] related_limit",
        1,
        max_page_size,
        warnings,
    );

    // -- Logging: level --
    if let Some(ref level) = raw.logging.level {
        let valid = ["error", "warn", "info", "debug", "trace"];
        if valid.contains(&level.to_lowercase().as_str()) {
            config.log_level = Some(level.to_lowercase());
        } else {
            warnings.push(format!(
                "[logging] level = \"{level}\" is not recognised. \
                 Valid values: error, warn, info, debug, trace. Using default ({}).",
                constants::DEFAULT_LOG_LEVEL
            ));
        }
    }

    config
}

/// Store `value` in `target` if it lies in `min..=max`, otherwise keep the
/// default and record a warning naming the accepted range.
fn apply_range<T>(
    target: &mut T,
    value: Option<T>,
    field: &str,
    min: T,
    max: T,
    warnings: &mut Vec<String>,
) where
    T: PartialOrd + Display + Copy,
{
    let Some(value) = value else {
        return;
    };
    if value >= min && value <= max {
        *target = value;
    } else {
        let err = ConfigError::ValueOutOfRange {
            field: field.to_string(),
            value: value.to_string(),
            expected: format!("{min}-{max}"),
        };
        warnings.push(format!("{err}. Using default ({}).", *target));
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(content: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(constants::CONFIG_FILE_NAME);
        std::fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let (config, warnings) = load_config(Path::new("/nonexistent/folio/folio.toml"));
        assert_eq!(config, AppConfig::default());
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_valid_values_applied() {
        let (dir, path) = write_config(
            r#"
[content]
posts_dir = "content/posts"
max_depth = 2
excerpt_length = 200
default_author = "Ada"

[render]
allow_raw_html = false

[query]
page_size = 5
max_page_size = 50

[logging]
level = "DEBUG"
"#,
        );
        let (config, warnings) = load_config(&path);
        assert!(warnings.is_empty(), "unexpected warnings: {warnings:?}");
        assert_eq!(config.posts_dir, dir.path().join("content/posts"));
        assert_eq!(config.max_depth, 2);
        assert_eq!(config.excerpt_length, 200);
        assert_eq!(config.default_author, "Ada");
        assert!(!config.allow_raw_html);
        assert_eq!(config.page_size, 5);
        assert_eq!(config.max_page_size, 50);
        assert_eq!(config.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_out_of_range_values_warn_and_default() {
        let (_dir, path) = write_config(
            "[content]\nmax_files = 0\nwords_per_minute = 5\n[query]\npage_size = 5000\n",
        );
        let (config, warnings) = load_config(&path);
        assert_eq!(config.max_files, constants::DEFAULT_MAX_FILES);
        assert_eq!(config.words_per_minute, constants::DEFAULT_WORDS_PER_MINUTE);
        assert_eq!(config.page_size, constants::DEFAULT_PAGE_SIZE);
        assert_eq!(warnings.len(), 3, "got: {warnings:?}");
        assert!(warnings[0].contains("max_files"));
    }

    #[test]
    fn test_unparseable_file_gives_defaults_with_warning() {
        let (_dir, path) = write_config("[content\nmax_depth = ");
        let (config, warnings) = load_config(&path);
        assert_eq!(config, AppConfig::default());
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("Config parse error"));
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let (_dir, path) = write_config("[future]\nfeature = true\n[content]\nmax_depth = 3\n");
        let (config, warnings) = load_config(&path);
        assert!(warnings.is_empty());
        assert_eq!(config.max_depth, 3);
    }

    #[test]
    fn test_invalid_log_level_warns() {
        let (_dir, path) = write_config("[logging]\nlevel = \"loud\"\n");
        let (config, warnings) = load_config(&path);
        assert!(config.log_level.is_none());
        assert_eq!(warnings.len(), 1);
    }
}
