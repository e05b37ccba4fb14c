// Folio - core/render.rs
//
// Markdown -> HTML rendering with class-based syntax highlighting.
//
// Pipeline: comrak parses the body into an AST, fenced code blocks are
// replaced by pre-highlighted HTML blocks (syntect, CSS classes rather than
// inline colours so the site theme controls the palette), then comrak
// formats the tree. Pure transformation: no I/O.

use crate::util::constants;
use comrak::nodes::{AstNode, NodeHtmlBlock, NodeValue};
use comrak::options::Options;
use comrak::{format_html, parse_document, Arena};
use syntect::html::{ClassStyle, ClassedHTMLGenerator};
use syntect::parsing::{SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;

/// Rendering options exposed through configuration.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Pass raw HTML in post bodies through to the output.
    pub allow_raw_html: bool,

    /// Treat single newlines as hard line breaks.
    pub hard_breaks: bool,

    /// Convert straight quotes and dashes to typographic ones.
    pub smart_punctuation: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            allow_raw_html: true,
            hard_breaks: false,
            smart_punctuation: true,
        }
    }
}

/// Comrak-based renderer with syntect highlighting.
///
/// Construct once and share; loading the syntax definitions is the
/// expensive part.
pub struct MarkdownRenderer {
    options: Options<'static>,
    syntax_set: SyntaxSet,
    class_style: ClassStyle,
    allow_raw_html: bool,
}

/// Placeholder for author HTML when raw HTML is disabled.
const RAW_HTML_OMITTED: &str = "<!-- raw HTML omitted -->";

impl std::fmt::Debug for MarkdownRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarkdownRenderer")
            .field("syntaxes", &self.syntax_set.syntaxes().len())
            .finish_non_exhaustive()
    }
}

impl MarkdownRenderer {
    pub fn new(config: &RenderConfig) -> Self {
        Self {
            options: build_options(config),
            syntax_set: SyntaxSet::load_defaults_newlines(),
            class_style: ClassStyle::SpacedPrefixed {
                prefix: constants::HIGHLIGHT_CLASS_PREFIX,
            },
            allow_raw_html: config.allow_raw_html,
        }
    }

    /// Render a Markdown body to HTML.
    ///
    /// Never fails: a code block the highlighter rejects is emitted as
    /// escaped plain text instead.
    pub fn render(&self, markdown: &str) -> String {
        let arena = Arena::new();
        let root = parse_document(&arena, markdown, &self.options);

        self.rewrite_nodes(root);

        let mut html = String::new();
        if let Err(e) = format_html(root, &self.options, &mut html) {
            // Writing into a String cannot fail in practice.
            tracing::warn!(error = %e, "HTML formatting failed; output may be truncated");
        }
        html
    }

    /// Plain text of a Markdown body: text, inline code and code block
    /// contents, with block boundaries and line breaks as spaces. Author
    /// HTML contributes nothing.
    pub fn plain_text(&self, markdown: &str) -> String {
        let arena = Arena::new();
        let root = parse_document(&arena, markdown, &self.options);
        let mut text = String::new();
        collect_text(root, &mut text);
        text
    }

    /// Replace every fenced/indented code block with highlighted HTML and,
    /// when raw HTML is disabled, blank out author HTML.
    ///
    /// The formatter always runs with raw HTML enabled so the injected
    /// highlight blocks survive; author HTML is filtered here instead.
    fn rewrite_nodes<'a>(&self, node: &'a AstNode<'a>) {
        if let Some((info, literal)) = extract_code_block(node) {
            let language = info.split_whitespace().next().filter(|s| !s.is_empty());
            let html = match highlight_code(language, &literal, &self.syntax_set, &self.class_style)
            {
                Ok(html) => html,
                Err(e) => {
                    tracing::debug!(
                        language = language.unwrap_or(constants::DEFAULT_CODE_LANGUAGE),
                        error = %e,
                        "Highlighting failed, emitting plain code block"
                    );
                    plain_code_block(language, &literal)
                }
            };
            let mut data = node.data.borrow_mut();
            data.value = NodeValue::HtmlBlock(NodeHtmlBlock {
                block_type: 0,
                literal: html,
            });
            return;
        }

        if !self.allow_raw_html {
            let mut data = node.data.borrow_mut();
            match data.value {
                NodeValue::HtmlBlock(ref mut block) => {
                    block.literal = format!("{RAW_HTML_OMITTED}\n");
                }
                NodeValue::HtmlInline(ref mut html) => {
                    *html = RAW_HTML_OMITTED.to_string();
                }
                _ => {}
            }
        }

        let mut child = node.first_child();
        while let Some(next) = child {
            self.rewrite_nodes(next);
            child = next.next_sibling();
        }
    }
}

fn build_options(config: &RenderConfig) -> Options<'static> {
    let mut options = Options::default();

    let ext = &mut options.extension;
    ext.strikethrough = true;
    ext.table = true;
    ext.autolink = true;
    ext.tasklist = true;
    ext.footnotes = true;

    options.parse.smart = config.smart_punctuation;

    let render = &mut options.render;
    render.hardbreaks = config.hard_breaks;
    render.r#unsafe = true;
    render.github_pre_lang = true;

    options
}

fn extract_code_block(node: &AstNode<'_>) -> Option<(String, String)> {
    let data = node.data.borrow();
    if let NodeValue::CodeBlock(block) = &data.value {
        Some((block.info.trim().to_string(), block.literal.clone()))
    } else {
        None
    }
}

fn highlight_code(
    language: Option<&str>,
    code: &str,
    syntax_set: &SyntaxSet,
    class_style: &ClassStyle,
) -> Result<String, syntect::Error> {
    let lang_token = language.unwrap_or(constants::DEFAULT_CODE_LANGUAGE);
    let syntax =
        find_syntax(syntax_set, lang_token).unwrap_or_else(|| syntax_set.find_syntax_plain_text());

    let mut code_with_newline = code.to_string();
    if !code_with_newline.ends_with('\n') {
        code_with_newline.push('\n');
    }

    let mut generator =
        ClassedHTMLGenerator::new_with_class_style(syntax, syntax_set, *class_style);
    for line in LinesWithEndings::from(code_with_newline.as_str()) {
        generator.parse_html_for_line_which_includes_newline(line)?;
    }

    let lang_class = ammonia::clean_text(&lang_token.to_ascii_lowercase());
    Ok(format!(
        "<pre class=\"highlight\" data-language=\"{lang_class}\"><code class=\"language-{lang_class}\">{}</code></pre>\n",
        generator.finalize()
    ))
}

fn find_syntax<'s>(syntax_set: &'s SyntaxSet, token: &str) -> Option<&'s SyntaxReference> {
    let lowercase = token.to_ascii_lowercase();
    syntax_set
        .find_syntax_by_token(&lowercase)
        .or_else(|| syntax_set.find_syntax_by_name(token))
        .or_else(|| syntax_set.find_syntax_by_extension(&lowercase))
}

fn plain_code_block(language: Option<&str>, literal: &str) -> String {
    let mut html = String::from("<pre class=\"highlight\"");
    if let Some(lang) = language {
        html.push_str(" data-language=\"");
        html.push_str(&ammonia::clean_text(lang));
        html.push('"');
    }
    html.push_str("><code>");
    html.push_str(&ammonia::clean_text(literal));
    html.push_str("</code></pre>\n");
    html
}

fn collect_text<'a>(node: &'a AstNode<'a>, buffer: &mut String) {
    let is_block = {
        let data = node.data.borrow();
        match &data.value {
            NodeValue::Text(text) => buffer.push_str(text),
            NodeValue::Code(code) => buffer.push_str(&code.literal),
            NodeValue::CodeBlock(block) => buffer.push_str(&block.literal),
            NodeValue::LineBreak | NodeValue::SoftBreak => buffer.push(' '),
            _ => {}
        }
        data.value.block()
    };

    let mut child = node.first_child();
    while let Some(next) = child {
        collect_text(next, buffer);
        child = next.next_sibling();
    }
    if is_block {
        buffer.push(' ');
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn renderer() -> MarkdownRenderer {
        MarkdownRenderer::new(&RenderConfig::default())
    }

    #[test]
    fn test_renders_basic_markdown() {
        let html = renderer().render("# Title\n\nSome *emphasis* here.\n");
        assert!(html.contains("<h1>"), "got: {html}");
        assert!(html.contains("<em>emphasis</em>"), "got: {html}");
    }

    #[test]
    fn test_fenced_code_is_highlighted_with_classes() {
        let html = renderer().render("```rust\nfn main() {}\n```\n");
        assert!(html.contains("data-language=\"rust\""), "got: {html}");
        assert!(html.contains("class=\"language-rust\""), "got: {html}");
        assert!(html.contains("hl-"), "expected prefixed span classes, got: {html}");
        assert!(!html.contains("```"), "fence markers must not leak: {html}");
    }

    #[test]
    fn test_unknown_language_falls_back_to_plain_text() {
        let html = renderer().render("```nosuchlang\n<tag> & stuff\n```\n");
        assert!(html.contains("&lt;tag&gt;"), "code must be escaped: {html}");
        assert!(!html.contains("<tag>"), "raw tag leaked: {html}");
    }

    #[test]
    fn test_tables_enabled() {
        let html = renderer().render("| a | b |\n|---|---|\n| 1 | 2 |\n");
        assert!(html.contains("<table>"), "got: {html}");
    }

    #[test]
    fn test_raw_html_can_be_disabled() {
        let strict = MarkdownRenderer::new(&RenderConfig {
            allow_raw_html: false,
            ..Default::default()
        });
        let html = strict.render("<div class=\"x\">hi</div>\n\nText <b>bold</b>\n\n```rust\nlet x = 1;\n```\n");
        assert!(!html.contains("<div class=\"x\">"), "got: {html}");
        assert!(!html.contains("<b>"), "got: {html}");
        assert!(html.contains(RAW_HTML_OMITTED), "got: {html}");
        assert!(html.contains("language-rust"), "code blocks still highlighted: {html}");
    }

    #[test]
    fn test_unknown_language_attribute_is_escaped() {
        let html = renderer().render("```\"x><script>\nbody\n```\n");
        assert!(!html.contains("<script>"), "got: {html}");
    }

    #[test]
    fn test_plain_text_decodes_entities_and_skips_markup() {
        let text = renderer().plain_text(
            "# Fish &amp; chips\n\nEat *more* `fish` &lt;3<br>\nnow\n\n<div>hidden</div>\n",
        );
        let words = text.split_whitespace().collect::<Vec<_>>().join(" ");
        assert_eq!(words, "Fish & chips Eat more fish <3 now");
    }
}
