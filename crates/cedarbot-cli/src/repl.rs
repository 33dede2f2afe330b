//! Interactive REPL — the terminal rendering of a conversation.
//!
//! Uses `rustyline` for readline-style editing. Input history stays in memory
//! for the lifetime of the process.

use std::sync::Arc;

use anyhow::Result;
use colored::Colorize;
use rustyline::config::Configurer;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{DefaultEditor, Editor};
use tracing::debug;

use cedarbot_chat::{ConversationController, Draft, RejectReason, SubmitOutcome};
use cedarbot_core::types::{AttachmentRef, Session};

use crate::helpers;

/// Exit commands (case-insensitive match).
const EXIT_COMMANDS: &[&str] = &["exit", "quit", "/exit", "/quit", ":q"];

/// A slash command typed at the prompt.
#[derive(Debug, PartialEq, Eq)]
enum ReplCommand {
    Exit,
    Help,
    Attach(String),
    Detach(usize),
    Attachments,
    Session,
    History,
    Reset,
    /// Known command with bad arguments, with a usage hint.
    Invalid(String),
}

/// Run the interactive REPL loop.
pub async fn run(
    controller: Arc<ConversationController>,
    user: Option<String>,
    session_hint: Option<String>,
) -> Result<()> {
    let mut editor = create_editor()?;
    let mut draft = Draft::new();

    let Some(session) = start_session(&mut editor, &controller, user, session_hint)? else {
        return Ok(());
    };
    helpers::print_banner(&session);

    loop {
        let prompt = if draft.attachments().is_empty() {
            "You: ".to_string()
        } else {
            format!("You [📎 {}]: ", draft.attachments().len())
        };

        // Read input
        let input = match editor.readline(&prompt) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("Input error: {e}");
                break;
            }
        };

        let trimmed = input.trim();
        if !trimmed.is_empty() {
            let _ = editor.add_history_entry(&input);
        }

        if let Some(command) = parse_command(trimmed) {
            match command {
                ReplCommand::Exit => {
                    println!("\nGoodbye! 👋");
                    break;
                }
                ReplCommand::Help => print_help(),
                ReplCommand::Attach(path) => attach(&mut draft, &path),
                ReplCommand::Detach(index) => match draft.remove_attachment(index - 1) {
                    Some(removed) => println!("Removed {}", removed.name),
                    None => println!("{}", format!("No attachment #{index}").yellow()),
                },
                ReplCommand::Attachments => list_attachments(&draft),
                ReplCommand::Session => match controller.session() {
                    Some(session) => print_session(&session),
                    None => println!("{}", "No active session".yellow()),
                },
                ReplCommand::History => {
                    for message in controller.messages() {
                        helpers::print_message(&message);
                    }
                }
                ReplCommand::Reset => {
                    controller.reset();
                    draft.clear();
                    println!("{}", "Session reset.".dimmed());
                    match start_session(&mut editor, &controller, None, None)? {
                        Some(session) => helpers::print_banner(&session),
                        None => break,
                    }
                }
                ReplCommand::Invalid(hint) => println!("{}", hint.yellow()),
            }
            continue;
        }

        // Blank line only sends when attachments are queued
        if trimmed.is_empty() && draft.attachments().is_empty() {
            continue;
        }

        let text = chat_text(trimmed);
        draft.set_text(text);
        debug!(chars = text.len(), attachments = draft.attachments().len(), "submitting turn");
        helpers::print_thinking();
        let outcome = controller.submit_draft(&mut draft).await;
        helpers::clear_thinking();

        match outcome {
            SubmitOutcome::Answered | SubmitOutcome::Failed(_) => {
                if let Some(reply) = controller.messages().last() {
                    helpers::print_message(reply);
                }
            }
            SubmitOutcome::Rejected(RejectReason::AwaitingResponse) => {
                println!("{}", "Still waiting for the previous answer…".yellow());
            }
            SubmitOutcome::Rejected(RejectReason::NoSession) => {
                println!("{}", "No active session. Use /reset to start one.".yellow());
            }
            SubmitOutcome::Ignored | SubmitOutcome::Discarded => {}
        }
    }

    Ok(())
}

/// Start a session, prompting for a user id until one is accepted.
///
/// Returns `None` if the user aborts the prompt.
fn start_session(
    editor: &mut Editor<(), DefaultHistory>,
    controller: &ConversationController,
    mut user: Option<String>,
    mut session_hint: Option<String>,
) -> Result<Option<Session>> {
    loop {
        let user_id = match user.take() {
            Some(u) => u,
            None => match editor.readline("User name/number: ") {
                Ok(line) => line,
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => return Ok(None),
                Err(e) => return Err(e.into()),
            },
        };

        if session_hint.is_none() {
            session_hint = match editor.readline("Session id (blank to generate): ") {
                Ok(line) => Some(line),
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => return Ok(None),
                Err(e) => return Err(e.into()),
            };
        }

        match controller.start(&user_id, session_hint.as_deref()) {
            Ok(session) => return Ok(Some(session)),
            Err(e) => println!("{}", format!("Please enter a user name or number ({e}).").yellow()),
        }
    }
}

/// Queue a file as an attachment for the next message.
fn attach(draft: &mut Draft, path: &str) {
    let expanded = helpers::expand_tilde(path);
    match AttachmentRef::from_path(&expanded) {
        Ok(attachment) => {
            println!("Attached {}", helpers::describe_attachment(&attachment));
            draft.add_attachment(attachment);
        }
        Err(e) => println!("{}", format!("Cannot attach {}: {e}", expanded.display()).yellow()),
    }
}

fn list_attachments(draft: &Draft) {
    if draft.attachments().is_empty() {
        println!("{}", "No attachments queued".dimmed());
        return;
    }
    for (i, attachment) in draft.attachments().iter().enumerate() {
        println!("  #{} {}", i + 1, helpers::describe_attachment(attachment));
    }
}

fn print_session(session: &Session) {
    println!("  {:<10} {}", "User:".bold(), session.user_id);
    println!("  {:<10} {}", "Session:".bold(), session.session_id);
    println!(
        "  {:<10} {}",
        "Started:".bold(),
        session.started_at.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M:%S")
    );
}

fn print_help() {
    println!();
    println!("  {:<18} attach a file to the next message", "/attach <path>");
    println!("  {:<18} remove a queued attachment", "/detach <n>");
    println!("  {:<18} list queued attachments", "/attachments");
    println!("  {:<18} show session details", "/session");
    println!("  {:<18} print the conversation so far", "/history");
    println!("  {:<18} end this session and start a new one", "/reset");
    println!("  {:<18} quit", "exit");
    println!();
}

/// Create a rustyline editor.
fn create_editor() -> Result<Editor<(), DefaultHistory>> {
    let mut editor = DefaultEditor::new()?;
    editor.set_max_history_size(1000)?;
    Ok(editor)
}

/// Parse a REPL command. Returns `None` for ordinary chat input, including
/// unknown `/words` and anything starting with `//`.
fn parse_command(input: &str) -> Option<ReplCommand> {
    if is_exit_command(input) {
        return Some(ReplCommand::Exit);
    }
    if input.starts_with("//") {
        return None;
    }
    let rest = input.strip_prefix('/')?;
    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };

    let command = match name.to_lowercase().as_str() {
        "help" => ReplCommand::Help,
        "attach" if arg.is_empty() => ReplCommand::Invalid("Usage: /attach <path>".into()),
        "attach" => ReplCommand::Attach(arg.to_string()),
        "detach" => match arg.parse::<usize>() {
            Ok(n) if n > 0 => ReplCommand::Detach(n),
            _ => ReplCommand::Invalid("Usage: /detach <n> (see /attachments)".into()),
        },
        "attachments" => ReplCommand::Attachments,
        "session" => ReplCommand::Session,
        "history" => ReplCommand::History,
        "reset" => ReplCommand::Reset,
        _ => return None,
    };
    Some(command)
}

/// Text to send for a non-command line; a leading `//` escapes to a single `/`.
fn chat_text(input: &str) -> &str {
    if input.starts_with("//") {
        &input[1..]
    } else {
        input
    }
}

/// Check if input is an exit command.
fn is_exit_command(input: &str) -> bool {
    let lower = input.to_lowercase();
    EXIT_COMMANDS.contains(&lower.as_str())
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
