/// Light markup used in assistant messages and recommendations.
///
/// The assistant answers in a small Markdown subset. Text is parsed into a
/// [`Document`] of tagged variants first and rendered second, so the same
/// parse feeds both the HTML surface and the terminal.
///
/// # Grammar
///
/// Input is split on `\n` (a trailing `\r` is dropped). Each line is one of:
///
/// | Line prefix | Block                                   |
/// |-------------|-----------------------------------------|
/// | `### `      | heading level 3                         |
/// | `## `       | heading level 2                         |
/// | `# `        | heading level 1                         |
/// | `- `        | bullet item; consecutive items form one list |
/// | anything    | text line (possibly empty)              |
///
/// Inside headings, items and text lines, `**x**` is bold when `x` is
/// non-empty. An unclosed `**` stays literal, which keeps a half-streamed
/// message stable until the closing marker arrives.
pub mod html;
pub mod terminal;

pub use html::{HtmlOptions, to_html};
pub use terminal::to_terminal;

/// A run of inline content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    Text(String),
    Bold(String),
}

/// One block-level element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// Level is 1..=3.
    Heading { level: u8, content: Vec<Inline> },
    /// A text line. Adjacent lines are separated by a line break.
    Line(Vec<Inline>),
    /// Bullet list; one entry per item.
    List(Vec<Vec<Inline>>),
}

/// Parsed message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    pub blocks: Vec<Block>,
}

impl Document {
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

/// Parse message text into blocks.
pub fn parse(text: &str) -> Document {
    if text.is_empty() {
        return Document::default();
    }

    let mut blocks: Vec<Block> = Vec::new();

    for raw in text.split('\n') {
        let line = raw.strip_suffix('\r').unwrap_or(raw);

        if let Some((level, rest)) = heading(line) {
            blocks.push(Block::Heading {
                level,
                content: parse_inline(rest),
            });
        } else if let Some(item) = line.strip_prefix("- ") {
            let item = parse_inline(item);
            match blocks.last_mut() {
                Some(Block::List(items)) => items.push(item),
                _ => blocks.push(Block::List(vec![item])),
            }
        } else {
            blocks.push(Block::Line(parse_inline(line)));
        }
    }

    Document { blocks }
}

fn heading(line: &str) -> Option<(u8, &str)> {
    if let Some(rest) = line.strip_prefix("### ") {
        Some((3, rest))
    } else if let Some(rest) = line.strip_prefix("## ") {
        Some((2, rest))
    } else {
        line.strip_prefix("# ").map(|rest| (1, rest))
    }
}

/// Split a line into text and bold runs.
pub fn parse_inline(line: &str) -> Vec<Inline> {
    let mut out = Vec::new();
    let mut text = String::new();
    let mut rest = line;

    while let Some(open) = rest.find("**") {
        let after = &rest[open + 2..];
        match after.find("**") {
            Some(close) if close > 0 => {
                text.push_str(&rest[..open]);
                if !text.is_empty() {
                    out.push(Inline::Text(std::mem::take(&mut text)));
                }
                out.push(Inline::Bold(after[..close].to_string()));
                rest = &after[close + 2..];
            }
            _ => {
                // Empty or unclosed: keep the marker literal and move on.
                text.push_str(&rest[..open + 2]);
                rest = after;
            }
        }
    }

    text.push_str(rest);
    if !text.is_empty() {
        out.push(Inline::Text(text));
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
