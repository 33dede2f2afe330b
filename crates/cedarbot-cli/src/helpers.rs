//! Shared CLI helpers — path expansion, message printing, banner.

use std::path::PathBuf;

use colored::Colorize;

use cedarbot_core::types::{AttachmentRef, Message, Sender, Session};

/// How many trailing characters of the session id are shown.
pub const SESSION_ID_DISPLAY_LEN: usize = 8;

/// Expand `~` at the start of a path to the user's home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs_next::home_dir() {
            return home.join(rest);
        }
    }
    if path == "~" {
        if let Some(home) = dirs_next::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

/// Print one history entry.
pub fn print_message(message: &Message) {
    let time = message
        .timestamp
        .with_timezone(&chrono::Local)
        .format("%H:%M");

    println!();
    match message.sender {
        Sender::User => println!("{}  {}", "👤 You".green().bold(), time.to_string().dimmed()),
        Sender::Bot => println!("{}  {}", "🌲 Cedarbot".cyan().bold(), time.to_string().dimmed()),
    }
    if message.is_error() {
        println!("{}", message.content.red());
    } else {
        println!("{}", message.content);
    }
    for attachment in &message.attachments {
        println!("  {}", describe_attachment(attachment).dimmed());
    }
    println!();
}

/// One-line description of an attachment, e.g. `🖼 photo.png (12.0 KB)`.
pub fn describe_attachment(attachment: &AttachmentRef) -> String {
    let icon = if attachment.is_image() { "🖼" } else { "📄" };
    format!(
        "{icon} {} ({})",
        attachment.name,
        format_size(attachment.size_bytes)
    )
}

/// Human-readable byte count.
pub fn format_size(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    let b = bytes as f64;
    if b < KB {
        format!("{bytes} B")
    } else if b < MB {
        format!("{:.1} KB", b / KB)
    } else {
        format!("{:.1} MB", b / MB)
    }
}

/// Print the banner shown when a session starts.
pub fn print_banner(session: &Session) {
    let version = env!("CARGO_PKG_VERSION");
    println!();
    println!(
        "{}  v{}",
        "🌲 Cedarbot".cyan().bold(),
        version.dimmed()
    );
    println!(
        "{} {}   {} …{}",
        "user:".dimmed(),
        session.user_id.bold(),
        "session:".dimmed(),
        session.short_id(SESSION_ID_DISPLAY_LEN)
    );
    println!(
        "{}",
        "Type a message, /help for commands, or \"exit\" to quit.".dimmed()
    );
    println!();
}

/// Print a "thinking" spinner placeholder.
pub fn print_thinking() {
    eprint!("{}", "⠿ thinking...".dimmed());
}

/// Clear the "thinking" placeholder.
pub fn clear_thinking() {
    eprint!("\r{}\r", " ".repeat(40));
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
