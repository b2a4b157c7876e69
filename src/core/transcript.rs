//! Conversation history rendering for display and export.

use std::fmt::Write;
use std::str::FromStr;

use chrono::{DateTime, Local, Utc};
use serde::Serialize;

use super::message::{Message, Role};
use super::session::WELCOME_MESSAGE;

/// Output format for a transcript.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TranscriptFormat {
    /// Chat-style lines for the terminal.
    #[default]
    Text,
    /// JSON (full fidelity).
    Json,
    /// Markdown (human readable).
    Markdown,
}

impl FromStr for TranscriptFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            "markdown" | "md" => Ok(Self::Markdown),
            other => Err(format!("unknown format '{other}'")),
        }
    }
}

#[derive(Serialize)]
struct ExportedTranscript<'a> {
    exported_at: DateTime<Utc>,
    messages: &'a [Message],
}

/// Render `messages` in the requested format.
///
/// # Errors
///
/// Returns error if JSON serialization fails.
pub fn render(messages: &[Message], format: TranscriptFormat) -> serde_json::Result<String> {
    match format {
        TranscriptFormat::Text => Ok(format_as_text(messages)),
        TranscriptFormat::Json => serde_json::to_string_pretty(&ExportedTranscript {
            exported_at: Utc::now(),
            messages,
        }),
        TranscriptFormat::Markdown => Ok(format_as_markdown(messages)),
    }
}

/// One chat line: `[14:05] you: text`.
#[must_use]
pub fn format_line(message: &Message) -> String {
    format!(
        "[{}] {}: {}",
        format_time(message.timestamp),
        speaker(message.role),
        message.content
    )
}

fn format_as_text(messages: &[Message]) -> String {
    if messages.is_empty() {
        return format!("{}: {WELCOME_MESSAGE}", speaker(Role::Assistant));
    }
    messages
        .iter()
        .map(format_line)
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_as_markdown(messages: &[Message]) -> String {
    let mut md = String::new();

    let _ = writeln!(md, "# Conversation\n");
    let _ = writeln!(md, "**Messages:** {}\n", messages.len());
    let _ = writeln!(md, "---\n");

    for message in messages {
        let heading = match message.role {
            Role::User => "## You",
            Role::Assistant => "## Assistant",
            Role::System => "## System",
        };
        let _ = writeln!(md, "{heading}\n");
        let _ = writeln!(md, "*{}*\n", format_timestamp(message.timestamp));
        let _ = writeln!(md, "{}\n", message.content);
    }

    md
}

const fn speaker(role: Role) -> &'static str {
    match role {
        Role::User => "you",
        Role::Assistant => "assistant",
        Role::System => "system",
    }
}

fn format_time(timestamp: DateTime<Utc>) -> String {
    timestamp.with_timezone(&Local).format("%H:%M").to_string()
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp
        .with_timezone(&Local)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}
