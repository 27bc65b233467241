//! Where chat output goes.
//!
//! [`ChatSurface`] is the seam between the session logic and the display.
//! [`HtmlSurface`] keeps an in-memory message list equivalent to the chat
//! page's DOM (one node per message, markup rendered to HTML) and can export
//! it; [`TerminalSurface`] prints to stdout as content arrives.

use std::io::{self, Write};

use colored::Colorize;

use super::history::{ChatMessage, Role};
use crate::markup::{self, HtmlOptions};

/// Handle to a message node created by [`ChatSurface::append`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageId(pub usize);

/// Display operations the chat session needs.
pub trait ChatSurface {
    /// Add a message node and return its handle.
    fn append(&mut self, role: Role, content: &str) -> MessageId;

    /// Re-render an existing node with new full content.
    fn update(&mut self, id: MessageId, content: &str);

    fn show_typing(&mut self);

    fn hide_typing(&mut self);

    /// Enable or disable the send control.
    fn set_send_enabled(&mut self, enabled: bool);

    fn set_status(&mut self, healthy: bool, label: &str);

    /// Remove every message node.
    fn clear(&mut self);

    /// Render a message restored from history, keeping its timestamp.
    fn restore(&mut self, message: &ChatMessage) -> MessageId {
        self.append(message.role, &message.content)
    }
}

// ---------------------------------------------------------------------------
// HTML surface
// ---------------------------------------------------------------------------

/// A rendered message node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageNode {
    pub role: Role,
    /// Markup-rendered bubble content.
    pub bubble_html: String,
    /// `HH:MM` label.
    pub time: String,
}

impl MessageNode {
    fn to_html(&self) -> String {
        let (class, avatar) = match self.role {
            Role::User => ("user", "👤"),
            Role::Assistant => ("assistant", "🤖"),
        };
        format!(
            "<div class=\"message {class}\"><div class=\"message-avatar\">{avatar}</div>\
             <div class=\"message-content\"><div class=\"message-bubble\">{}</div>\
             <div class=\"message-time\">{}</div></div></div>",
            self.bubble_html, self.time
        )
    }
}

/// In-memory equivalent of the chat page.
#[derive(Debug, Clone)]
pub struct HtmlSurface {
    nodes: Vec<MessageNode>,
    typing: bool,
    send_enabled: bool,
    status: Option<(bool, String)>,
}

impl Default for HtmlSurface {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            typing: false,
            send_enabled: true,
            status: None,
        }
    }
}

impl HtmlSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nodes(&self) -> &[MessageNode] {
        &self.nodes
    }

    pub fn is_typing(&self) -> bool {
        self.typing
    }

    pub fn send_enabled(&self) -> bool {
        self.send_enabled
    }

    pub fn status(&self) -> Option<(bool, &str)> {
        self.status.as_ref().map(|(ok, label)| (*ok, label.as_str()))
    }

    /// The message list as one HTML fragment.
    pub fn to_html(&self) -> String {
        let mut out = String::from("<div id=\"chatMessages\">");
        for node in &self.nodes {
            out.push_str(&node.to_html());
        }
        out.push_str("</div>");
        out
    }

    fn push(&mut self, role: Role, content: &str, time: String) -> MessageId {
        self.nodes.push(MessageNode {
            role,
            bubble_html: render_bubble(content),
            time,
        });
        MessageId(self.nodes.len() - 1)
    }
}

fn render_bubble(content: &str) -> String {
    markup::to_html(&markup::parse(content), HtmlOptions::default())
}

fn local_time_now() -> String {
    chrono::Local::now().format("%H:%M").to_string()
}

impl ChatSurface for HtmlSurface {
    fn append(&mut self, role: Role, content: &str) -> MessageId {
        self.push(role, content, local_time_now())
    }

    fn update(&mut self, id: MessageId, content: &str) {
        if let Some(node) = self.nodes.get_mut(id.0) {
            node.bubble_html = render_bubble(content);
        }
    }

    fn show_typing(&mut self) {
        self.typing = true;
    }

    fn hide_typing(&mut self) {
        self.typing = false;
    }

    fn set_send_enabled(&mut self, enabled: bool) {
        self.send_enabled = enabled;
    }

    fn set_status(&mut self, healthy: bool, label: &str) {
        self.status = Some((healthy, label.to_string()));
    }

    fn clear(&mut self) {
        self.nodes.clear();
    }

    fn restore(&mut self, message: &ChatMessage) -> MessageId {
        self.push(message.role, &message.content, message.display_time())
    }
}

// ---------------------------------------------------------------------------
// Terminal surface
// ---------------------------------------------------------------------------

/// Streams chat output to a terminal (stdout unless built
/// [`with_writer`](TerminalSurface::with_writer)).
///
/// A streamed reply is printed line by line: once a chunk completes a line,
/// that line is rendered through the markup transform and written out. The
/// unfinished last line is held back until its newline arrives or the reply
/// ends, so bold runs, headings and bullets look the same while streaming as
/// they do on replay. When a node is rewritten with content that does not
/// continue what was printed (a fallback reply replacing a partial stream),
/// the full content is printed again.
#[derive(Debug)]
pub struct TerminalSurface<W: Write = io::Stdout> {
    out: W,
    next_id: usize,
    open: Option<OpenMessage>,
    typing: bool,
}

/// The reply currently streaming in.
#[derive(Debug)]
struct OpenMessage {
    id: MessageId,
    content: String,
    /// Byte length of `content` already written, always at a line end.
    printed: usize,
}

impl TerminalSurface {
    pub fn new() -> Self {
        Self::with_writer(io::stdout())
    }
}

impl Default for TerminalSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write> TerminalSurface<W> {
    pub fn with_writer(out: W) -> Self {
        Self {
            out,
            next_id: 0,
            open: None,
            typing: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, text: &str) {
        let _ = self.out.write_all(text.as_bytes());
        let _ = self.out.flush();
    }

    /// Write whatever is left of the open message and close it.
    fn close_open(&mut self) {
        if let Some(open) = self.open.take() {
            let rest = &open.content[open.printed..];
            if !rest.is_empty() {
                self.emit(&render_line(rest));
            }
        }
    }

    /// Write every completed line of the open message not yet on screen.
    fn flush_lines(&mut self) {
        let Some(open) = self.open.as_mut() else {
            return;
        };
        let pending = &open.content[open.printed..];
        let Some(end) = pending.rfind('\n') else {
            return;
        };
        let rendered: String = pending[..end].split('\n').map(render_line).collect();
        open.printed += end + 1;
        self.emit(&rendered);
    }

    fn next_id(&mut self) -> MessageId {
        let id = MessageId(self.next_id);
        self.next_id += 1;
        id
    }

    fn prefix(role: Role) -> colored::ColoredString {
        match role {
            Role::User => "you ›".green().bold(),
            Role::Assistant => "assistant ›".cyan().bold(),
        }
    }

    fn header(&mut self, role: Role, time: &str) {
        let line = format!("{} {}\n", Self::prefix(role), time.dimmed());
        self.emit(&line);
    }

    fn print_full(&mut self, role: Role, content: &str, time: &str) {
        self.header(role, time);
        self.emit(&markup::to_terminal(&markup::parse(content)));
    }
}

/// One line of assistant text, styled and newline-terminated.
fn render_line(line: &str) -> String {
    if line.trim_end_matches('\r').is_empty() {
        return "\n".to_string();
    }
    markup::to_terminal(&markup::parse(line))
}

impl<W: Write> ChatSurface for TerminalSurface<W> {
    fn append(&mut self, role: Role, content: &str) -> MessageId {
        self.hide_typing();
        self.close_open();
        let id = self.next_id();

        if role == Role::Assistant && content.is_empty() {
            // Placeholder for a streamed reply.
            self.header(role, &local_time_now());
            self.open = Some(OpenMessage {
                id,
                content: String::new(),
                printed: 0,
            });
        } else {
            self.print_full(role, content, &local_time_now());
        }
        id
    }

    fn update(&mut self, id: MessageId, content: &str) {
        let continues = matches!(
            &self.open,
            Some(open) if open.id == id && content.starts_with(&open.content[..open.printed])
        );

        if continues {
            if let Some(open) = self.open.as_mut() {
                open.content = content.to_string();
            }
            self.flush_lines();
            return;
        }

        if self.open.as_ref().is_some_and(|open| open.id == id) {
            // Replaced wholesale; the held-back partial line is stale.
            self.open = None;
        } else {
            self.close_open();
        }
        self.print_full(Role::Assistant, content, &local_time_now());
    }

    fn show_typing(&mut self) {
        if !self.typing {
            let text = "assistant is typing…".dimmed().to_string();
            self.emit(&text);
            self.typing = true;
        }
    }

    fn hide_typing(&mut self) {
        if self.typing {
            self.emit("\r\x1b[2K");
            self.typing = false;
        }
    }

    fn set_send_enabled(&mut self, enabled: bool) {
        // The prompt is only redrawn once the reply is complete.
        if enabled {
            self.close_open();
        }
    }

    fn set_status(&mut self, healthy: bool, label: &str) {
        let dot = if healthy { "●".green() } else { "●".red() };
        let line = format!("{dot} {}\n", label.dimmed());
        self.emit(&line);
    }

    fn clear(&mut self) {
        self.close_open();
        let line = format!("{}\n", "Chat history cleared.".dimmed());
        self.emit(&line);
    }

    fn restore(&mut self, message: &ChatMessage) -> MessageId {
        self.close_open();
        let id = self.next_id();
        self.print_full(message.role, &message.content, &message.display_time());
        id
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn html_surface_updates_in_place() {
        let mut surface = HtmlSurface::new();
        surface.append(Role::User, "hi");
        let id = surface.append(Role::Assistant, "");
        surface.update(id, "**Hel");
        surface.update(id, "**Hello**");

        assert_eq!(surface.nodes().len(), 2);
        assert_eq!(surface.nodes()[1].bubble_html, "<strong>Hello</strong>");
    }

    #[test]
    fn html_surface_export_wraps_nodes() {
        let mut surface = HtmlSurface::new();
        surface.append(Role::User, "a < b");
        let html = surface.to_html();
        assert!(html.starts_with("<div id=\"chatMessages\">"));
        assert!(html.contains("<div class=\"message user\">"));
        assert!(html.contains("a &lt; b"));
    }

    #[test]
    fn restore_keeps_stored_time() {
        let mut surface = HtmlSurface::new();
        let msg = ChatMessage {
            role: Role::Assistant,
            content: "ok".to_string(),
            timestamp: "not a time".to_string(),
            context: None,
        };
        surface.restore(&msg);
        assert_eq!(surface.nodes()[0].time, "not a time");
    }

    #[test]
    fn clear_empties_nodes() {
        let mut surface = HtmlSurface::new();
        surface.append(Role::User, "x");
        surface.clear();
        assert!(surface.nodes().is_empty());
    }

    fn terminal_output(surface: TerminalSurface<Vec<u8>>) -> String {
        String::from_utf8(surface.into_inner()).unwrap()
    }

    /// Everything after the `assistant ›` header line.
    fn reply_body(output: &str) -> &str {
        output.split_once('\n').map(|(_, body)| body).unwrap_or("")
    }

    #[test]
    fn terminal_stream_renders_markup_per_completed_line() {
        colored::control::set_override(false);
        let mut surface = TerminalSurface::with_writer(Vec::new());
        let id = surface.append(Role::Assistant, "");
        surface.update(id, "**Hi");
        surface.update(id, "**Hi** there\n### Ti");
        surface.update(id, "**Hi** there\n### Tips\n- water\n- sl");

        let so_far = String::from_utf8(surface.out.clone()).unwrap();
        assert_eq!(reply_body(&so_far), "Hi there\nTips\n  • water\n");

        surface.update(id, "**Hi** there\n### Tips\n- water\n- sleep");
        surface.set_send_enabled(true);
        let out = terminal_output(surface);
        assert!(out.starts_with("assistant ›"));
        assert_eq!(reply_body(&out), "Hi there\nTips\n  • water\n  • sleep\n");
        assert!(!out.contains("**"));
    }

    #[test]
    fn terminal_stream_matches_replay_rendering() {
        colored::control::set_override(false);
        let text = "Drink **more** water\n\n- walk\n- rest";

        let mut streamed = TerminalSurface::with_writer(Vec::new());
        let id = streamed.append(Role::Assistant, "");
        for end in [3, 12, 21, 25, text.len()] {
            streamed.update(id, &text[..end]);
        }
        streamed.set_send_enabled(true);

        let mut replayed = TerminalSurface::with_writer(Vec::new());
        replayed.append(Role::Assistant, text);

        assert_eq!(
            reply_body(&terminal_output(streamed)),
            reply_body(&terminal_output(replayed))
        );
    }

    #[test]
    fn terminal_replacement_drops_held_back_text() {
        colored::control::set_override(false);
        let mut surface = TerminalSurface::with_writer(Vec::new());
        let id = surface.append(Role::Assistant, "");
        surface.update(id, "partial");
        surface.update(id, "Fallback **reply**");
        surface.set_send_enabled(true);

        let out = terminal_output(surface);
        assert!(!out.contains("partial"));
        assert!(out.ends_with("Fallback reply\n"));
    }
}
