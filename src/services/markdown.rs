//! Markdown rendering service
//!
//! This module provides Markdown to HTML conversion with syntax
//! highlighting for code blocks. It uses pulldown-cmark for Markdown
//! parsing and syntect for highlighting, and can extract a table of
//! contents from the rendered headings.
//!
//! # Example
//!
//! ```
//! use pressroom::services::markdown::MarkdownRenderer;
//!
//! let renderer = MarkdownRenderer::new();
//! let html = renderer.render("# Hello World\n\nThis is **bold** text.");
//! assert!(html.contains("<h1"));
//! assert!(html.contains("<strong>"));
//! ```

use once_cell::sync::Lazy;
use pulldown_cmark::{html, CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use syntect::highlighting::ThemeSet;
use syntect::html::highlighted_html_for_string;
use syntect::parsing::SyntaxSet;

static SYNTAX_SET: Lazy<SyntaxSet> = Lazy::new(SyntaxSet::load_defaults_newlines);
static THEME_SET: Lazy<ThemeSet> = Lazy::new(ThemeSet::load_defaults);

const DEFAULT_THEME: &str = "base16-ocean.dark";

/// One entry of a rendered document's table of contents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocEntry {
    /// Heading level (1-6)
    pub level: u8,
    /// Anchor id injected into the heading element
    pub id: String,
    /// Plain heading text
    pub text: String,
}

/// A thread-safe Markdown renderer with syntax highlighting support.
///
/// The renderer supports common Markdown features including headings,
/// lists, links and images, blockquotes, fenced code blocks with
/// highlighting, tables, task lists, strikethrough, and smart
/// punctuation. Headings receive stable anchor ids so the table of
/// contents can link into the document.
#[derive(Clone)]
pub struct MarkdownRenderer {
    theme_name: String,
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkdownRenderer {
    /// Creates a new MarkdownRenderer with the default highlighting theme.
    pub fn new() -> Self {
        Self::with_theme(DEFAULT_THEME)
    }

    /// Creates a new MarkdownRenderer with a specific syntect theme.
    ///
    /// Falls back to the default theme if the requested one is unknown.
    pub fn with_theme(theme_name: &str) -> Self {
        let validated = if THEME_SET.themes.contains_key(theme_name) {
            theme_name.to_string()
        } else {
            DEFAULT_THEME.to_string()
        };

        Self {
            theme_name: validated,
        }
    }

    /// Renders Markdown text to HTML.
    pub fn render(&self, markdown: &str) -> String {
        self.render_with_toc(markdown).0
    }

    /// Renders Markdown text to HTML and extracts the table of contents.
    ///
    /// Headings get anchor ids derived from their text; duplicate heading
    /// texts are disambiguated with a numeric suffix.
    pub fn render_with_toc(&self, markdown: &str) -> (String, Vec<TocEntry>) {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        options.insert(Options::ENABLE_SMART_PUNCTUATION);

        let events: Vec<Event> = Parser::new_ext(markdown, options).collect();

        let mut toc = Vec::new();
        let events = self.process_events(events, &mut toc);

        let mut html_output = String::new();
        html::push_html(&mut html_output, events.into_iter());

        (html_output, toc)
    }

    /// Rewrite the event stream: highlight fenced code blocks and attach
    /// anchor ids to headings while collecting TOC entries.
    fn process_events<'a>(
        &self,
        events: Vec<Event<'a>>,
        toc: &mut Vec<TocEntry>,
    ) -> Vec<Event<'a>> {
        let mut output = Vec::with_capacity(events.len());
        let mut seen_ids: HashMap<String, usize> = HashMap::new();

        let mut i = 0;
        while i < events.len() {
            match &events[i] {
                Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(lang))) => {
                    // Collect the code block body up to the matching end
                    let lang = lang.to_string();
                    let mut code = String::new();
                    i += 1;
                    while i < events.len() {
                        match &events[i] {
                            Event::Text(text) => code.push_str(text),
                            Event::End(TagEnd::CodeBlock) => break,
                            _ => {}
                        }
                        i += 1;
                    }
                    output.push(Event::Html(self.highlight_code(&code, &lang).into()));
                }
                Event::Start(Tag::Heading { level, .. }) => {
                    let level = *level;
                    // Gather heading text up to the matching end
                    let mut text = String::new();
                    let mut inner = Vec::new();
                    i += 1;
                    while i < events.len() {
                        match &events[i] {
                            Event::Text(t) | Event::Code(t) => {
                                text.push_str(t);
                                inner.push(events[i].clone());
                            }
                            Event::End(TagEnd::Heading(_)) => break,
                            other => inner.push(other.clone()),
                        }
                        i += 1;
                    }

                    let id = unique_anchor_id(&text, &mut seen_ids);
                    toc.push(TocEntry {
                        level: heading_level_number(level),
                        id: id.clone(),
                        text: text.clone(),
                    });

                    output.push(Event::Start(Tag::Heading {
                        level,
                        id: Some(id.into()),
                        classes: Vec::new(),
                        attrs: Vec::new(),
                    }));
                    output.extend(inner);
                    output.push(Event::End(TagEnd::Heading(level)));
                }
                event => output.push(event.clone()),
            }
            i += 1;
        }

        output
    }

    /// Highlight a fenced code block, falling back to a plain block when
    /// the language is unknown or highlighting fails.
    fn highlight_code(&self, code: &str, lang: &str) -> String {
        let syntax = SYNTAX_SET
            .find_syntax_by_token(lang)
            .or_else(|| SYNTAX_SET.find_syntax_by_extension(lang));

        if let Some(syntax) = syntax {
            let theme = &THEME_SET.themes[&self.theme_name];
            if let Ok(highlighted) =
                highlighted_html_for_string(code, &SYNTAX_SET, syntax, theme)
            {
                return highlighted;
            }
        }

        format!(
            "<pre><code class=\"language-{}\">{}</code></pre>",
            escape_html_attr(lang),
            escape_html(code)
        )
    }
}

/// Derive a unique anchor id from heading text
fn unique_anchor_id(text: &str, seen: &mut HashMap<String, usize>) -> String {
    let base = anchor_id(text);
    let count = seen.entry(base.clone()).or_insert(0);
    *count += 1;
    if *count == 1 {
        base
    } else {
        format!("{}-{}", base, *count - 1)
    }
}

/// Derive an anchor id from heading text: lowercase, alphanumerics kept,
/// whitespace and punctuation collapsed into single hyphens.
fn anchor_id(text: &str) -> String {
    let mut id = String::new();
    let mut prev_hyphen = true; // suppress leading hyphens

    for c in text.to_lowercase().chars() {
        if c.is_alphanumeric() {
            id.push(c);
            prev_hyphen = false;
        } else if !prev_hyphen {
            id.push('-');
            prev_hyphen = true;
        }
    }

    let id = id.trim_end_matches('-').to_string();
    if id.is_empty() {
        "section".to_string()
    } else {
        id
    }
}

fn heading_level_number(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_html_attr(s: &str) -> String {
    escape_html(s).replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_basic_markdown() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render("# Title\n\nParagraph with **bold** and *italic*.");

        assert!(html.contains("<h1"));
        assert!(html.contains("<strong>bold</strong>"));
        assert!(html.contains("<em>italic</em>"));
    }

    #[test]
    fn test_render_lists() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render("- one\n- two\n\n1. first\n2. second");

        assert!(html.contains("<ul>"));
        assert!(html.contains("<ol>"));
        assert!(html.contains("<li>one</li>"));
    }

    #[test]
    fn test_render_links() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render("[Rust](https://www.rust-lang.org)");

        assert!(html.contains("<a href=\"https://www.rust-lang.org\">Rust</a>"));
    }

    #[test]
    fn test_render_tables() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render("| a | b |\n|---|---|\n| 1 | 2 |");

        assert!(html.contains("<table>"));
        assert!(html.contains("<td>1</td>"));
    }

    #[test]
    fn test_code_block_highlighted() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render("```rust\nfn main() {}\n```");

        // syntect emits inline-styled pre blocks
        assert!(html.contains("<pre"));
        assert!(html.contains("main"));
    }

    #[test]
    fn test_code_block_unknown_language_falls_back() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render("```nosuchlang\nsome code\n```");

        assert!(html.contains("language-nosuchlang"));
        assert!(html.contains("some code"));
    }

    #[test]
    fn test_code_block_escapes_html() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render("```nosuchlang\n<script>alert(1)</script>\n```");

        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_heading_anchor_ids() {
        let renderer = MarkdownRenderer::new();
        let (html, toc) = renderer.render_with_toc("# Hello World\n\n## Second Part");

        assert!(html.contains("id=\"hello-world\""));
        assert_eq!(toc.len(), 2);
        assert_eq!(toc[0].level, 1);
        assert_eq!(toc[0].id, "hello-world");
        assert_eq!(toc[0].text, "Hello World");
        assert_eq!(toc[1].level, 2);
        assert_eq!(toc[1].id, "second-part");
    }

    #[test]
    fn test_duplicate_headings_get_unique_ids() {
        let renderer = MarkdownRenderer::new();
        let (_html, toc) = renderer.render_with_toc("# Setup\n\n# Setup\n\n# Setup");

        assert_eq!(toc[0].id, "setup");
        assert_eq!(toc[1].id, "setup-1");
        assert_eq!(toc[2].id, "setup-2");
    }

    #[test]
    fn test_empty_markdown() {
        let renderer = MarkdownRenderer::new();
        let (html, toc) = renderer.render_with_toc("");

        assert!(html.is_empty());
        assert!(toc.is_empty());
    }

    #[test]
    fn test_unknown_theme_falls_back() {
        let renderer = MarkdownRenderer::with_theme("no-such-theme");
        let html = renderer.render("```rust\nlet x = 1;\n```");
        assert!(html.contains("<pre"));
    }

    #[test]
    fn test_anchor_id_symbols() {
        assert_eq!(anchor_id("Hello, World!"), "hello-world");
        assert_eq!(anchor_id("  spaces  "), "spaces");
        assert_eq!(anchor_id("???"), "section");
    }

    #[test]
    fn test_strikethrough() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render("~~gone~~");
        assert!(html.contains("<del>gone</del>"));
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(30))]

        /// Anchor ids contain only lowercase alphanumerics and single hyphens.
        #[test]
        fn anchor_ids_are_url_safe(text in ".{0,60}") {
            let id = anchor_id(&text);
            prop_assert!(!id.is_empty());
            prop_assert!(!id.starts_with('-') && !id.ends_with('-'));
            prop_assert!(!id.contains("--"));
            for c in id.chars() {
                prop_assert!(c.is_alphanumeric() || c == '-');
                prop_assert!(!c.is_uppercase());
            }
        }

        /// Rendering never panics on arbitrary input.
        #[test]
        fn render_never_panics(text in ".{0,200}") {
            let renderer = MarkdownRenderer::new();
            let _ = renderer.render_with_toc(&text);
        }
    }
}
