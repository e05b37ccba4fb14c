// Folio - util/error.rs
//
// Typed error hierarchy with context-preserving error chains.
// No string-based error propagation: every failure carries the path or
// field it concerns and, where there is one, the underlying cause.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Top-level error type for all Folio operations.
/// Errors are categorised by the subsystem that produced them.
#[derive(Debug)]
pub enum FolioError {
    /// The posts directory could not be scanned.
    Scan(ScanError),

    /// A query against the content store failed.
    Query(QueryError),

    /// Configuration loading or validation failed.
    Config(ConfigError),

    /// I/O error with path context.
    Io {
        path: PathBuf,
        operation: &'static str,
        source: io::Error,
    },
}

impl fmt::Display for FolioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scan(e) => write!(f, "Scan error: {e}"),
            Self::Query(e) => write!(f, "Query error: {e}"),
            Self::Config(e) => write!(f, "Configuration error: {e}"),
            Self::Io {
                path,
                operation,
                source,
            } => write!(
                f,
                "I/O error during {operation} on '{}': {source}",
                path.display()
            ),
        }
    }
}

impl std::error::Error for FolioError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Scan(e) => Some(e),
            Self::Query(e) => Some(e),
            Self::Config(e) => Some(e),
            Self::Io { source, .. } => Some(source),
        }
    }
}

// ---------------------------------------------------------------------------
// Front-matter errors
// ---------------------------------------------------------------------------

/// The file opens with a front-matter delimiter but the block cannot be
/// read as a key/value mapping.
#[derive(Debug)]
pub enum FrontMatterError {
    /// Opening delimiter found, closing delimiter missing.
    Unterminated,

    /// The block is not valid YAML.
    Yaml { source: serde_yaml::Error },

    /// The block is valid YAML but not a mapping (e.g. a list or a scalar).
    NotAMapping { found: &'static str },
}

impl fmt::Display for FrontMatterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unterminated => {
                write!(f, "malformed front-matter: closing '---' delimiter not found")
            }
            Self::Yaml { source } => write!(f, "malformed front-matter: {source}"),
            Self::NotAMapping { found } => write!(
                f,
                "malformed front-matter: expected key/value mapping, found {found}"
            ),
        }
    }
}

impl std::error::Error for FrontMatterError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Yaml { source } => Some(source),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Post errors
// ---------------------------------------------------------------------------

/// Metadata could not be turned into a valid post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostError {
    /// A required front-matter key is absent.
    MissingField { field: &'static str },

    /// A front-matter key is present but its value is unusable.
    InvalidField { field: &'static str, reason: String },
}

impl PostError {
    /// The front-matter key this error concerns.
    pub fn field(&self) -> &'static str {
        match self {
            Self::MissingField { field } | Self::InvalidField { field, .. } => field,
        }
    }
}

impl fmt::Display for PostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingField { field } => {
                write!(f, "invalid post: missing required field '{field}'")
            }
            Self::InvalidField { field, reason } => {
                write!(f, "invalid post: field '{field}' {reason}")
            }
        }
    }
}

impl std::error::Error for PostError {}

// ---------------------------------------------------------------------------
// Per-file load errors
// ---------------------------------------------------------------------------

/// Classification of a per-file failure, used for counting and reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadErrorKind {
    Unreadable,
    InvalidEncoding,
    TooLarge,
    MalformedFrontMatter,
    InvalidPost,
    DuplicateSlug,
}

impl LoadErrorKind {
    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Unreadable => "unreadable",
            Self::InvalidEncoding => "invalid encoding",
            Self::TooLarge => "too large",
            Self::MalformedFrontMatter => "malformed front-matter",
            Self::InvalidPost => "invalid post",
            Self::DuplicateSlug => "duplicate slug",
        }
    }
}

impl fmt::Display for LoadErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single post file that was skipped during a scan.
/// Never fatal to the scan as a whole.
#[derive(Debug)]
pub enum LoadError {
    /// The file could not be read.
    Read { path: PathBuf, source: io::Error },

    /// The file is not valid UTF-8.
    InvalidEncoding {
        path: PathBuf,
        source: std::string::FromUtf8Error,
    },

    /// The file exceeds the maximum post size.
    TooLarge { path: PathBuf, size: u64, max: u64 },

    /// The front-matter block is present but unparsable.
    FrontMatter {
        path: PathBuf,
        source: FrontMatterError,
    },

    /// The metadata does not describe a valid post.
    Post { path: PathBuf, source: PostError },

    /// Another file already produced this slug.
    DuplicateSlug {
        path: PathBuf,
        slug: String,
        kept: PathBuf,
    },
}

impl LoadError {
    /// Path of the file that was skipped.
    pub fn path(&self) -> &PathBuf {
        match self {
            Self::Read { path, .. }
            | Self::InvalidEncoding { path, .. }
            | Self::TooLarge { path, .. }
            | Self::FrontMatter { path, .. }
            | Self::Post { path, .. }
            | Self::DuplicateSlug { path, .. } => path,
        }
    }

    pub fn kind(&self) -> LoadErrorKind {
        match self {
            Self::Read { .. } => LoadErrorKind::Unreadable,
            Self::InvalidEncoding { .. } => LoadErrorKind::InvalidEncoding,
            Self::TooLarge { .. } => LoadErrorKind::TooLarge,
            Self::FrontMatter { .. } => LoadErrorKind::MalformedFrontMatter,
            Self::Post { .. } => LoadErrorKind::InvalidPost,
            Self::DuplicateSlug { .. } => LoadErrorKind::DuplicateSlug,
        }
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read { path, source } => {
                write!(f, "'{}': cannot read file: {source}", path.display())
            }
            Self::InvalidEncoding { path, source } => {
                write!(f, "'{}': invalid UTF-8 encoding: {source}", path.display())
            }
            Self::TooLarge { path, size, max } => write!(
                f,
                "'{}' is {size} bytes, exceeds maximum post size of {max} bytes",
                path.display()
            ),
            Self::FrontMatter { path, source } => write!(f, "'{}': {source}", path.display()),
            Self::Post { path, source } => write!(f, "'{}': {source}", path.display()),
            Self::DuplicateSlug { path, slug, kept } => write!(
                f,
                "'{}': slug '{slug}' is already used by '{}'",
                path.display(),
                kept.display()
            ),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Read { source, .. } => Some(source),
            Self::InvalidEncoding { source, .. } => Some(source),
            Self::FrontMatter { source, .. } => Some(source),
            Self::Post { source, .. } => Some(source),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Scan errors
// ---------------------------------------------------------------------------

/// Scan-level failures. Any of these abandons the whole scan; the cache
/// keeps serving its previous snapshot.
#[derive(Debug)]
pub enum ScanError {
    /// The posts directory does not exist or cannot be listed.
    DirectoryUnreadable { path: PathBuf, source: io::Error },

    /// The posts path exists but is not a directory.
    NotADirectory { path: PathBuf },

    /// The directory holds more matching files than the configured guard.
    TooManyFiles { path: PathBuf, max: usize },
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DirectoryUnreadable { path, source } => {
                write!(f, "Posts directory '{}' is unreadable: {source}", path.display())
            }
            Self::NotADirectory { path } => {
                write!(f, "Posts path '{}' is not a directory", path.display())
            }
            Self::TooManyFiles { path, max } => write!(
                f,
                "Scan of '{}' stopped: more than {max} post files. \
                 Increase [content] max_files in config or narrow the posts directory.",
                path.display()
            ),
        }
    }
}

impl std::error::Error for ScanError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::DirectoryUnreadable { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<ScanError> for FolioError {
    fn from(e: ScanError) -> Self {
        Self::Scan(e)
    }
}

// ---------------------------------------------------------------------------
// Query errors
// ---------------------------------------------------------------------------

/// Errors returned to the route layer by the query service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// No visible post has this slug.
    NotFound { slug: String },

    /// The requested page is past the last page.
    OutOfRange { page: usize, total_pages: usize },

    /// The requested page size is zero or above the configured maximum.
    InvalidPageSize { page_size: usize, max: usize },
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { slug } => write!(f, "No post with slug '{slug}'"),
            Self::OutOfRange { page, total_pages } => {
                write!(f, "Page {page} is out of range (1-{total_pages})")
            }
            Self::InvalidPageSize { page_size, max } => {
                write!(f, "Page size {page_size} is invalid (1-{max})")
            }
        }
    }
}

impl std::error::Error for QueryError {}

impl From<QueryError> for FolioError {
    fn from(e: QueryError) -> Self {
        Self::Query(e)
    }
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

/// Errors related to configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    /// TOML parsing failed.
    TomlParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// A config value is out of the allowed range.
    ValueOutOfRange {
        field: String,
        value: String,
        expected: String,
    },

    /// I/O error reading config file.
    Io { path: PathBuf, source: io::Error },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TomlParse { path, source } => {
                write!(f, "Config parse error '{}': {source}", path.display())
            }
            Self::ValueOutOfRange {
                field,
                value,
                expected,
            } => write!(
                f,
                "Config '{field}' = '{value}' is out of range. Expected: {expected}"
            ),
            Self::Io { path, source } => {
                write!(f, "Config I/O error '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::TomlParse { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<ConfigError> for FolioError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

/// Convenience type alias for Folio results.
pub type Result<T> = std::result::Result<T, FolioError>;
