//! CLI command parsing and execution.

pub mod repl;

use clap::{Parser, Subcommand};

use crate::core::DrugTag;
use crate::core::Mode;
use crate::core::transcript::TranscriptFormat;

/// medchat - medication consultation and a companion to talk to.
#[derive(Parser)]
#[command(name = "medchat")]
#[command(about = "Medication consultation and emotional-support chat")]
#[command(version)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase logging verbosity.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Keep the conversation in memory only.
    #[arg(long, global = true)]
    pub ephemeral: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Send one message and print the reply.
    #[command(visible_alias = "a")]
    Ask {
        /// The message to send.
        text: String,

        /// Mode to ask in (defaults to the saved mode).
        #[arg(short, long)]
        mode: Option<Mode>,

        /// Attach a drug as `name(ingredient)`. Repeatable.
        #[arg(short, long = "drug", value_name = "NAME(INGREDIENT)")]
        drugs: Vec<DrugTag>,
    },

    /// Start the interactive chat (default).
    Chat,

    /// Print the conversation so far.
    History {
        /// Output format (text, json or markdown).
        #[arg(short, long, default_value = "text")]
        format: TranscriptFormat,

        /// Output file path (stdout if not specified).
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Delete the conversation and the assistant thread.
    Reset {
        /// Skip the confirmation prompt.
        #[arg(short, long)]
        yes: bool,
    },

    /// Show or set the default mode.
    Mode {
        /// Mode to switch to.
        mode: Option<Mode>,
    },

    /// Manage the health profile.
    Profile {
        #[command(subcommand)]
        command: ProfileCommands,
    },

    /// Manage configuration.
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ProfileCommands {
    /// Show the saved profile.
    Show,

    /// Update profile fields. Omitted fields keep their value.
    Set {
        #[arg(long)]
        age: Option<String>,

        #[arg(long)]
        gender: Option<String>,

        /// Underlying conditions.
        #[arg(long)]
        conditions: Option<String>,

        /// Medications currently taken.
        #[arg(long)]
        medications: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the current configuration.
    Show,

    /// Show the configuration file path.
    Path,
}
