// Folio - core/frontmatter.rs
//
// Splits raw post text into a YAML front-matter mapping and a Markdown body.
// Core layer: operates on strings only, never touches the filesystem.

use crate::util::constants::FRONT_MATTER_DELIMITER;
use crate::util::error::FrontMatterError;
use serde_yaml::{Mapping, Value};

/// Result of splitting a post file.
#[derive(Debug, Clone, PartialEq)]
pub struct FrontMatter {
    /// Parsed key/value metadata. Empty when the file has no front-matter.
    pub metadata: Mapping,

    /// Markdown body following the closing delimiter.
    pub body: String,
}

/// Split `raw` into front-matter and body.
///
/// A file without an opening `---` line is valid: the metadata is empty and
/// the whole text is the body. A file that opens a block but never closes
/// it, or whose block is not a YAML mapping, is `MalformedFrontMatter`.
pub fn parse_front_matter(raw: &str) -> Result<FrontMatter, FrontMatterError> {
    let text = raw.strip_prefix('\u{feff}').unwrap_or(raw);

    let Some(after_open) = strip_delimiter_line(text) else {
        return Ok(FrontMatter {
            metadata: Mapping::new(),
            body: text.to_string(),
        });
    };

    // Find the closing delimiter on its own line.
    let mut offset = 0;
    let mut closing: Option<(usize, usize)> = None;
    for line in after_open.split_inclusive('\n') {
        if is_delimiter(line) {
            closing = Some((offset, offset + line.len()));
            break;
        }
        offset += line.len();
    }

    let (yaml_end, body_start) = closing.ok_or(FrontMatterError::Unterminated)?;
    let yaml = &after_open[..yaml_end];
    let body = trim_leading_blank_line(&after_open[body_start..]);

    let metadata = parse_mapping(yaml)?;

    Ok(FrontMatter {
        metadata,
        body: body.to_string(),
    })
}

/// If `text` starts with a delimiter line, return everything after it.
fn strip_delimiter_line(text: &str) -> Option<&str> {
    let line_end = text.find('\n').map(|i| i + 1).unwrap_or(text.len());
    let first_line = &text[..line_end];
    is_delimiter(first_line).then(|| &text[line_end..])
}

fn is_delimiter(line: &str) -> bool {
    line.trim_end() == FRONT_MATTER_DELIMITER
}

/// Drop one blank line directly after the closing delimiter.
fn trim_leading_blank_line(body: &str) -> &str {
    body.strip_prefix("\r\n")
        .or_else(|| body.strip_prefix('\n'))
        .unwrap_or(body)
}

fn parse_mapping(yaml: &str) -> Result<Mapping, FrontMatterError> {
    if yaml.trim().is_empty() {
        return Ok(Mapping::new());
    }

    let value: Value =
        serde_yaml::from_str(yaml).map_err(|source| FrontMatterError::Yaml { source })?;

    match value {
        Value::Mapping(map) => Ok(map),
        Value::Null => Ok(Mapping::new()),
        other => Err(FrontMatterError::NotAMapping {
            found: value_kind(&other),
        }),
    }
}

/// Short description of a YAML value's type, for error messages.
pub(crate) fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a list",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

// =============================================================================
// Tests
// =============================================================================
