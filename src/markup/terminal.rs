//! Terminal rendering of a parsed [`Document`] with ANSI styling.

use colored::Colorize;

use super::{Block, Document, Inline};

/// Render a document for the terminal: bold runs in bold, headings in cyan,
/// list items as indented bullets. Blocks end with a newline.
pub fn to_terminal(doc: &Document) -> String {
    let mut out = String::new();

    for block in &doc.blocks {
        match block {
            Block::Heading { level, content } => {
                let plain = plain_inlines(content);
                let styled = match level {
                    1 => plain.bold().cyan().underline(),
                    2 => plain.bold().cyan(),
                    _ => plain.bold(),
                };
                out.push_str(&styled.to_string());
                out.push('\n');
            }
            Block::Line(content) => {
                push_inlines(&mut out, content);
                out.push('\n');
            }
            Block::List(items) => {
                for item in items {
                    out.push_str("  • ");
                    push_inlines(&mut out, item);
                    out.push('\n');
                }
            }
        }
    }

    out
}

fn push_inlines(out: &mut String, inlines: &[Inline]) {
    for inline in inlines {
        match inline {
            Inline::Text(t) => out.push_str(t),
            Inline::Bold(t) => out.push_str(&t.bold().to_string()),
        }
    }
}

fn plain_inlines(inlines: &[Inline]) -> String {
    inlines
        .iter()
        .map(|i| match i {
            Inline::Text(t) | Inline::Bold(t) => t.as_str(),
        })
        .collect()
}
