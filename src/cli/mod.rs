//! CLI command implementations for vitalis.
//!
//! Provides subcommand handlers for:
//! - `vitalis health`: API probe, assistant status, config and storage
//! - `vitalis quick` / `vitalis predict`: run a prediction and show the result
//! - `vitalis recommend`: recommendations for the last prediction
//! - `vitalis handoff`: chat link carrying the last prediction
//! - `vitalis chat`: interactive assistant session
//! - `vitalis status` / `vitalis history`: chat status and stored history
//! - `vitalis config show|init|set|reset`: configuration management

use std::io::{self, BufRead, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use colored::Colorize;

use crate::api::types::{PredictRequest, PredictionResult, QuickPredictRequest};
use crate::api::{ApiClient, ClientError};
use crate::chat::history::HistoryStore;
use crate::chat::surface::{ChatSurface, HtmlSurface, TerminalSurface};
use crate::chat::ChatSession;
use crate::config::{self, VitalisConfig};
use crate::predict::{self, PredictionSession};
use crate::render::recommendations::{recommendations_html, recommendations_terminal};
use crate::render::{self, ResultKind};
use crate::status::{self, StatusIndicator, StatusPoller};
use crate::storage::{FileStore, KeyValueStore};

fn client(cfg: &VitalisConfig) -> ApiClient {
    ApiClient::from_config(&cfg.api)
}

fn open_store(cfg: &VitalisConfig) -> Box<dyn KeyValueStore> {
    Box::new(FileStore::new(cfg.storage.resolved_dir()))
}

fn prediction_session(cfg: &VitalisConfig) -> PredictionSession {
    PredictionSession::open(client(cfg), open_store(cfg))
}

// ---------------------------------------------------------------------------
// vitalis health
// ---------------------------------------------------------------------------

/// Check the service, the assistant, and local state.
pub fn run_health(cfg: &VitalisConfig) -> Result<()> {
    println!("{}", "vitalis Health Check".bold().cyan());
    println!("{}", "=".repeat(40));

    let global_exists = config::global_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    print_health_item(
        "Global config",
        global_exists,
        if global_exists {
            "~/.vitalis/config.toml found"
        } else {
            "not found (run `vitalis config init` to create)"
        },
    );

    let client = client(cfg);
    let probe = client.health();
    let api_detail = match status::probe_warning(&probe) {
        None => format!("model loaded at {}", client.base_url()),
        Some(warning) => warning.to_string(),
    };
    print_health_item("Prediction API", probe.is_ok(), &api_detail);
    if let Ok(p) = &probe {
        print_health_item(
            "Model",
            p.model_loaded,
            if p.model_loaded { "loaded" } else { "not loaded" },
        );
    }

    let indicator = status::check(&client);
    print_health_item("Assistant", indicator.healthy, &indicator.label);
    print_health_item(
        "Streaming",
        true,
        if cfg.chat.stream {
            "enabled"
        } else {
            "disabled (replies use /api/chat)"
        },
    );

    let storage_dir = cfg.storage.resolved_dir();
    print_health_item(
        "Storage",
        true,
        &storage_dir.display().to_string(),
    );

    let session = prediction_session(cfg);
    print_health_item(
        "Last prediction",
        session.last().is_some(),
        &match session.last() {
            Some(last) => format!(
                "{} (BMI {})",
                last.prediction.predicted_class, last.prediction.bmi
            ),
            None => "none yet (run `vitalis quick` or `vitalis predict`)".to_string(),
        },
    );

    Ok(())
}

fn print_health_item(name: &str, ok: bool, detail: &str) {
    let status = if ok {
        "✓".green().bold()
    } else {
        "✗".red().bold()
    };
    println!("  {} {:<18} {}", status, name, detail.dimmed());
}

// ---------------------------------------------------------------------------
// vitalis quick | predict
// ---------------------------------------------------------------------------

/// Quick prediction from the four basic fields.
pub fn run_quick(cfg: &VitalisConfig, req: &QuickPredictRequest, html: bool) -> Result<()> {
    let mut session = prediction_session(cfg);
    let outcome = session.quick(req).cloned();
    print_outcome(ResultKind::Quick, &outcome, html);
    Ok(())
}

/// Full prediction with lifestyle features.
pub fn run_predict(cfg: &VitalisConfig, req: &PredictRequest, html: bool) -> Result<()> {
    let mut session = prediction_session(cfg);
    let outcome = session.full(req).cloned();
    print_outcome(ResultKind::Full, &outcome, html);
    Ok(())
}

fn print_outcome(kind: ResultKind, outcome: &Result<PredictionResult, ClientError>, html: bool) {
    if html {
        println!("{}", render::render_outcome(kind, outcome).to_container_html());
        return;
    }
    match outcome {
        Ok(result) => {
            print!("{}", render::result_terminal(kind, result));
            println!();
            println!(
                "  {} {}",
                "Next:".dimmed(),
                "`vitalis recommend` or `vitalis chat --from-last`".dimmed()
            );
        }
        Err(e) => print_error(e),
    }
}

fn print_error(err: &ClientError) {
    if err.is_local() {
        println!("{}", render::error_text(err).yellow());
    } else {
        println!("{} {}", "✗".red().bold(), render::error_text(err).red());
    }
}

// ---------------------------------------------------------------------------
// vitalis recommend
// ---------------------------------------------------------------------------

/// Recommendations for the last prediction.
pub fn run_recommend(cfg: &VitalisConfig, html: bool) -> Result<()> {
    let session = prediction_session(cfg);
    let outcome = match session.recommendations() {
        Ok(outcome) => outcome,
        Err(e) => {
            print_error(&e);
            return Ok(());
        }
    };

    if html {
        println!("{}", recommendations_html(&outcome.recommendations));
        return Ok(());
    }

    println!("{}", "Personal Health Recommendations".bold().cyan());
    println!("{}", "=".repeat(40));
    if outcome.fallback {
        println!(
            "{}",
            "The recommendation service is unavailable; showing general advice.".yellow()
        );
        println!();
    }
    print!("{}", recommendations_terminal(&outcome.recommendations));
    Ok(())
}

// ---------------------------------------------------------------------------
// vitalis handoff
// ---------------------------------------------------------------------------

/// Print the chat page link for the last prediction.
pub fn run_handoff(cfg: &VitalisConfig) -> Result<()> {
    let session = prediction_session(cfg);
    match session.handoff_url(&cfg.chat.chat_page) {
        Ok(url) => {
            println!("{url}");
            println!();
            println!(
                "  {} {}",
                "Terminal:".dimmed(),
                "vitalis chat --from-last".bold()
            );
        }
        Err(e) => print_error(&e),
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// vitalis status | history
// ---------------------------------------------------------------------------

/// One-shot assistant status.
pub fn run_status(cfg: &VitalisConfig) -> Result<()> {
    let indicator = status::check(&client(cfg));
    print_health_item("Assistant", indicator.healthy, &indicator.label);
    Ok(())
}

/// Print the stored conversation, as text or as the chat page's HTML.
pub fn run_history(cfg: &VitalisConfig, html: bool) -> Result<()> {
    let snapshot = HistoryStore::new(open_store(cfg)).load();

    if html {
        let mut surface = HtmlSurface::new();
        for message in &snapshot.messages {
            surface.restore(message);
        }
        println!("{}", surface.to_html());
        return Ok(());
    }

    if snapshot.messages.is_empty() {
        println!("{}", "No chat history yet. Start one with `vitalis chat`.".yellow());
    } else {
        let mut surface = TerminalSurface::new();
        for message in &snapshot.messages {
            surface.restore(message);
        }
        println!();
    }
    if snapshot.context.is_some() {
        println!("{}", "Health data attached to this conversation.".dimmed());
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// vitalis chat
// ---------------------------------------------------------------------------

/// A line typed at the chat prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatInput {
    Empty,
    Message(String),
    Analyze,
    Clear,
    Status,
    Help,
    Quit,
    Unknown(String),
}

impl ChatInput {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Self::Empty;
        }
        if !line.starts_with('/') {
            return Self::Message(line.to_string());
        }
        match line.to_ascii_lowercase().as_str() {
            "/analyze" | "/analyse" => Self::Analyze,
            "/clear" => Self::Clear,
            "/status" => Self::Status,
            "/help" | "/?" => Self::Help,
            "/quit" | "/exit" | "/q" => Self::Quit,
            _ => Self::Unknown(line.to_string()),
        }
    }
}

/// Interactive chat loop.
///
/// `data` is a hand-off link or bare encoded value; `from_last` attaches the
/// last stored prediction. Either replaces the conversation's health data.
pub fn run_chat(cfg: &VitalisConfig, data: Option<&str>, from_last: bool) -> Result<()> {
    let client = client(cfg);
    let mut session = ChatSession::open(client.clone(), HistoryStore::new(open_store(cfg)))
        .with_streaming(cfg.chat.stream);
    let mut surface = TerminalSurface::new();

    println!("{}", "vitalis Health Assistant".bold().cyan());
    println!("{}", "=".repeat(40));

    if let Some(data) = data {
        match predict::decode_handoff(data) {
            Ok(context) => {
                session.set_context(Some(context));
                println!("{}", "Health data loaded. Type /analyze for an assessment.".green());
            }
            Err(e) => print_error(&e),
        }
    }
    if from_last {
        match prediction_session(cfg).last() {
            Some(last) => {
                session.set_context(Some(last.to_value()));
                println!("{}", "Last prediction loaded. Type /analyze for an assessment.".green());
            }
            None => print_error(&ClientError::MissingPrediction),
        }
    }

    if session.messages().is_empty() {
        println!(
            "{}",
            "Ask anything about nutrition, exercise or weight management. /help lists commands."
                .dimmed()
        );
    } else {
        session.replay(&mut surface);
        println!();
    }

    let indicator = Arc::new(Mutex::new(StatusIndicator::unknown()));
    let _poller = {
        let slot = Arc::clone(&indicator);
        StatusPoller::spawn(
            client.clone(),
            Duration::from_secs(cfg.chat.status_interval_secs.max(1)),
            move |update| {
                if let Ok(mut current) = slot.lock() {
                    *current = update;
                }
            },
        )
    };

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut shown_label = String::new();

    loop {
        let current = indicator
            .lock()
            .map(|i| i.clone())
            .unwrap_or_else(|_| StatusIndicator::unknown());
        if current.label != shown_label {
            surface.set_status(current.healthy, &current.label);
            shown_label = current.label.clone();
        }

        let Some(line) = prompt(&mut input, &format!("{} ", "you ›".green().bold()))? else {
            break;
        };

        match ChatInput::parse(&line) {
            ChatInput::Empty => {}
            ChatInput::Message(message) => {
                session.send(&message, &mut surface);
            }
            ChatInput::Analyze => {
                session.request_analysis(&mut surface);
            }
            ChatInput::Clear => {
                let answer = prompt(&mut input, "Clear the whole conversation? [y/N] ")?;
                if answer.as_deref().is_some_and(is_yes) {
                    session.clear(&mut surface);
                }
            }
            ChatInput::Status => {
                let fresh = status::check(&client);
                surface.set_status(fresh.healthy, &fresh.label);
                shown_label = fresh.label.clone();
                if let Ok(mut current) = indicator.lock() {
                    *current = fresh;
                }
            }
            ChatInput::Help => print_chat_help(),
            ChatInput::Quit => break,
            ChatInput::Unknown(cmd) => {
                println!("{} {}", "Unknown command:".yellow(), cmd);
                print_chat_help();
            }
        }
    }

    println!();
    println!("{}", "Conversation saved.".dimmed());
    Ok(())
}

fn print_chat_help() {
    println!("  {}  ask for an assessment of the loaded health data", "/analyze".bold());
    println!("  {}    forget this conversation", "/clear".bold());
    println!("  {}   check the assistant now", "/status".bold());
    println!("  {}     leave (history is kept)", "/quit".bold());
}

/// Print `label` and read one line. `None` at end of input.
fn prompt(input: &mut impl BufRead, label: &str) -> Result<Option<String>> {
    print!("{label}");
    io::stdout().flush().context("failed to flush stdout")?;

    let mut line = String::new();
    let read = input
        .read_line(&mut line)
        .context("failed to read from stdin")?;
    Ok((read > 0).then_some(line))
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

// ---------------------------------------------------------------------------
// vitalis config show | init | set | reset
// ---------------------------------------------------------------------------

/// Show the effective (merged) configuration as TOML.
pub fn run_config_show() -> Result<()> {
    let toml_str = config::show_effective_config()?;
    println!("{}", "Effective vitalis Configuration".bold().cyan());
    println!("{}", "=".repeat(50));
    println!();
    println!("{toml_str}");

    let global_exists = config::global_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    let project_exists = config::project_config_file()
        .map(|p| p.exists())
        .unwrap_or(false);
    println!("{}", "Sources (highest priority last):".dimmed());
    println!("  {} built-in defaults", "·".dimmed());
    print_source(global_exists, "~/.vitalis/config.toml");
    print_source(project_exists, ".vitalis.toml");
    println!(
        "  {} {}",
        "·".dimmed(),
        "VITALIS_* environment variables".dimmed()
    );

    Ok(())
}

fn print_source(exists: bool, name: &str) {
    if exists {
        println!("  {} {}", "✓".green(), name.dimmed());
    } else {
        println!("  {} {}", "·".dimmed(), format!("{name} (not found)").dimmed());
    }
}

/// Initialize a default config file at `~/.vitalis/config.toml`.
pub fn run_config_init(force: bool) -> Result<()> {
    let path = config::init_config(force)?;
    println!(
        "{} Config written to {}",
        "✓".green().bold(),
        path.display()
    );
    Ok(())
}

/// Set a single configuration value in the global config file.
pub fn run_config_set(key: &str, value: &str) -> Result<()> {
    config::set_config_value(key, value)?;
    println!("{} Set {} = {}", "✓".green().bold(), key.bold(), value);
    Ok(())
}

/// Reset configuration to defaults.
pub fn run_config_reset() -> Result<()> {
    let path = config::reset_config()?;
    println!(
        "{} Config reset to defaults at {}",
        "✓".green().bold(),
        path.display()
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
