use chrono::{DateTime, Local};
use once_cell::sync::Lazy;
use pulldown_cmark::{Options, Parser, html};
use regex::Regex;

use crate::fetcher::{Category, Identifier};

/// An ordered sequence of titled sections assembled from fetched records and
/// supplementary facts. Immutable after creation; `redacted` consumes the
/// document and returns the scrubbed successor.
#[derive(Debug, Clone)]
pub struct ReportDocument {
    title: String,
    generated_at: DateTime<Local>,
    sections: Vec<Section>,
}

#[derive(Debug, Clone)]
pub struct Section {
    pub heading: String,
    pub body: String,
}

/// A category that failed to fetch, surfaced in the final document as an
/// explicit notice rather than omitted silently.
#[derive(Debug, Clone)]
pub struct Gap {
    pub category: Category,
    pub message: String,
}

impl ReportDocument {
    pub fn new(title: impl Into<String>, sections: Vec<Section>) -> Self {
        ReportDocument {
            title: title.into(),
            generated_at: Local::now(),
            sections,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn generated_at(&self) -> DateTime<Local> {
        self.generated_at
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Deterministic markdown rendering; the archived artifact is exactly
    /// this string.
    pub fn to_markdown(&self) -> String {
        let mut markdown = format!(
            "# {}\n\n_Generated on {}_\n",
            self.title,
            self.generated_at.format("%Y-%m-%d %H:%M:%S")
        );
        for section in &self.sections {
            markdown.push_str(&format!("\n## {}\n\n{}\n", section.heading, section.body));
        }
        markdown
    }

    /// Strips internal provider identifiers from every section before the
    /// document is published or archived, independent of which category
    /// produced the offending field.
    pub fn redacted(self, identifiers: &[Identifier]) -> Self {
        ReportDocument {
            title: redact_text(&self.title, identifiers),
            generated_at: self.generated_at,
            sections: self
                .sections
                .into_iter()
                .map(|section| Section {
                    heading: section.heading,
                    body: redact_text(&section.body, identifiers),
                })
                .collect(),
        }
    }
}

// Labelled ID mentions, e.g. "(Match ID: 115192)", "Cricbuzz player id #1413".
static LABELLED_ID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s*\(?(?:cricbuzz\s+)?(?:match|player)\s+id\s*[:#]?\s*\d+\)?").unwrap()
});

fn redact_text(text: &str, identifiers: &[Identifier]) -> String {
    let mut scrubbed = LABELLED_ID_RE.replace_all(text, "").into_owned();
    for identifier in identifiers {
        // Digits only, so the pattern cannot fail to compile.
        if let Ok(pattern) = Regex::new(&format!(r"(?i)\s*\(?\bid\s*[:#]?\s*{identifier}\b\)?")) {
            scrubbed = pattern.replace_all(&scrubbed, "").into_owned();
        }
    }
    scrubbed
}

// Basic CSS for the rendered HTML preview.
const HTML_CSS: &str = r#"<style>
    body { font-family: Arial, sans-serif; margin: 40px; line-height: 1.6; color: #333; }
    h1 { font-size: 24px; color: #2c3e50; }
    h2 { font-size: 20px; color: #34495e; }
    p { font-size: 16px; margin: 10px 0; }
    ul, ol { margin: 15px 0; padding-left: 30px; }
    li { margin-bottom: 8px; }
    code { background: #f4f4f4; padding: 2px 4px; border-radius: 4px; }
    pre { background: #f4f4f4; padding: 10px; border-radius: 4px; overflow-x: auto; }
    table { border-collapse: collapse; width: 100%; margin: 15px 0; }
    th, td { border: 1px solid #ddd; padding: 8px; text-align: left; }
    th { background: #f4f4f4; }
</style>"#;

/// Renders a markdown document into a standalone styled HTML page.
pub fn markdown_to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    let parser = Parser::new_ext(markdown, options);
    let mut body = String::new();
    html::push_html(&mut body, parser);
    format!("<html><head>{HTML_CSS}</head><body>{body}</body></html>")
}
