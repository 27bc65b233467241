//! HTML rendering of a parsed [`Document`].

use super::{Block, Document, Inline};

/// Rendering knobs.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlOptions {
    /// Added to every heading level (recommendations render `#` as `<h2>`).
    pub heading_offset: u8,
}

/// Render a document as an HTML fragment. Text is escaped.
pub fn to_html(doc: &Document, opts: HtmlOptions) -> String {
    let mut out = String::new();
    let mut prev_line = false;

    for block in &doc.blocks {
        match block {
            Block::Heading { level, content } => {
                let tag = level.saturating_add(opts.heading_offset).min(6);
                out.push_str(&format!("<h{tag}>"));
                push_inlines(&mut out, content);
                out.push_str(&format!("</h{tag}>"));
                prev_line = false;
            }
            Block::Line(content) => {
                if prev_line {
                    out.push_str("<br>");
                }
                push_inlines(&mut out, content);
                prev_line = true;
            }
            Block::List(items) => {
                out.push_str("<ul>");
                for item in items {
                    out.push_str("<li>");
                    push_inlines(&mut out, item);
                    out.push_str("</li>");
                }
                out.push_str("</ul>");
                prev_line = false;
            }
        }
    }

    out
}

fn push_inlines(out: &mut String, inlines: &[Inline]) {
    for inline in inlines {
        match inline {
            Inline::Text(t) => out.push_str(&escape(t)),
            Inline::Bold(t) => {
                out.push_str("<strong>");
                out.push_str(&escape(t));
                out.push_str("</strong>");
            }
        }
    }
}

/// Escape text for HTML element content and attribute values.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
