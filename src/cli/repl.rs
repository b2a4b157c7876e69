//! Interactive chat loop.

use std::io::Write as _;

use dialoguer::{Confirm, theme::ColorfulTheme};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::config::Config;
use crate::core::transcript::{self, TranscriptFormat};
use crate::core::{ChatSession, DrugTag, Mode};

const HELP: &str = "\
Commands:
  /mode [assistant|companion]  switch mode (toggles without an argument)
  /drug <name>(<ingredient>)   attach a drug to the next question
  /drop <n>                    remove attached drug number n
  /tags                        list attached drugs
  /history                     print the conversation
  /new                         delete the conversation and start over
  /help                        show this help
  /quit                        leave
An empty line sends the attached drugs without a question.";

/// One line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// Text to send.
    Message(String),
    /// Switch to a mode, or toggle when `None`.
    Mode(Option<Mode>),
    Drug(DrugTag),
    /// Remove the tag at a zero-based index.
    Drop(usize),
    Tags,
    History,
    New,
    Help,
    Quit,
    Empty,
}

impl Input {
    /// Text to submit as a turn, if this input is one.
    ///
    /// A blank line is a turn only when drugs are attached.
    #[must_use]
    pub fn submission(&self, has_tags: bool) -> Option<&str> {
        match self {
            Self::Message(text) => Some(text),
            Self::Empty if has_tags => Some(""),
            _ => None,
        }
    }
}

/// Parse a line typed at the prompt.
///
/// # Errors
///
/// Returns a message for the user if a slash command is unknown or malformed.
pub fn parse_input(line: &str) -> Result<Input, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Input::Empty);
    }
    let Some(command) = line.strip_prefix('/') else {
        return Ok(Input::Message(line.to_string()));
    };

    let (name, arg) = command
        .split_once(char::is_whitespace)
        .map_or((command, ""), |(name, arg)| (name, arg.trim()));

    match name {
        "mode" if arg.is_empty() => Ok(Input::Mode(None)),
        "mode" => arg.parse().map(|mode| Input::Mode(Some(mode))),
        "drug" => arg.parse().map(Input::Drug),
        "drop" => match arg.parse::<usize>() {
            Ok(n) if n > 0 => Ok(Input::Drop(n - 1)),
            _ => Err(format!("expected a drug number, got '{arg}'")),
        },
        "tags" => Ok(Input::Tags),
        "history" => Ok(Input::History),
        "new" | "reset" => Ok(Input::New),
        "help" | "?" => Ok(Input::Help),
        "quit" | "exit" | "q" => Ok(Input::Quit),
        other => Err(format!("unknown command '/{other}', try /help")),
    }
}

fn print_banner(mode: Mode) {
    let banner = mode.banner();
    println!("== {} ==", banner.title);
    println!("{}", banner.notice);
    println!();
}

fn print_tags(session: &ChatSession) {
    let tags = session.pending();
    if tags.is_empty() {
        println!("No drugs attached.");
        return;
    }
    for (i, tag) in tags.iter().enumerate() {
        println!("  {}. {tag}", i + 1);
    }
}

fn switch_mode(session: &ChatSession, mode: Option<Mode>) {
    let mode = match mode {
        Some(mode) => {
            session.set_mode(mode);
            mode
        }
        None => session.toggle_mode(),
    };
    if let Err(e) = Config::save_mode(mode) {
        tracing::warn!(error = %e, "failed to save mode");
    }
    print_banner(mode);
}

async fn print_history(session: &ChatSession) -> anyhow::Result<()> {
    let messages = session.history().await?;
    println!("{}", transcript::render(&messages, TranscriptFormat::Text)?);
    Ok(())
}

fn confirm_reset() -> anyhow::Result<bool> {
    Ok(Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt("Delete the whole conversation?")
        .default(false)
        .interact()?)
}

/// Run the interactive loop until `/quit` or end of input.
///
/// # Errors
///
/// Returns an error if stdin or stdout fail.
pub async fn run(session: &ChatSession) -> anyhow::Result<()> {
    print_banner(session.mode());
    if let Err(e) = print_history(session).await {
        tracing::warn!(error = %e, "could not load history");
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("{}> ", session.mode());
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            println!();
            break;
        };

        let input = match parse_input(&line) {
            Ok(input) => input,
            Err(message) => {
                println!("{message}");
                continue;
            }
        };

        if let Some(text) = input.submission(!session.pending().is_empty()) {
            println!("you: {}", session.display_question(text));
            let reply = session.respond(text).await;
            println!("assistant: {reply}");
            println!();
            continue;
        }

        match input {
            Input::Empty | Input::Message(_) => {}
            Input::Mode(mode) => switch_mode(session, mode),
            Input::Drug(tag) => {
                if !session.mode().accepts_annotations() {
                    println!("Drugs can only be attached in assistant mode.");
                } else if session.attach(tag.clone()) {
                    println!("Attached {tag}.");
                } else {
                    println!("{tag} is already attached.");
                }
            }
            Input::Drop(index) => match session.detach(index) {
                Some(tag) => println!("Removed {tag}."),
                None => println!("No drug number {}.", index + 1),
            },
            Input::Tags => print_tags(session),
            Input::History => print_history(session).await?,
            Input::New => {
                if confirm_reset()? {
                    match session.reset().await {
                        Ok(()) => println!("Conversation deleted."),
                        Err(e) => {
                            tracing::error!(error = %e, "reset failed");
                            println!("Could not delete the conversation.");
                        }
                    }
                }
            }
            Input::Help => println!("{HELP}"),
            Input::Quit => break,
        }
    }

    Ok(())
}
