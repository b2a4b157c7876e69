use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use dialoguer::{Confirm, theme::ColorfulTheme};
use tracing_subscriber::EnvFilter;

use medchat::{
    Config,
    cli::{Cli, Commands, ConfigCommands, ProfileCommands},
    core::{ChatSession, FALLBACK_REPLY, MemoryStore, Mode, SqliteStore, Store, transcript},
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load()?;

    match cli.command {
        None | Some(Commands::Chat) => {
            let session = open_session(&config, cli.ephemeral, None)?;
            medchat::cli::repl::run(&session).await?;
        }

        Some(Commands::Ask { text, mode, drugs }) => {
            let session = open_session(&config, cli.ephemeral, mode)?;
            for tag in drugs {
                session.attach(tag);
            }
            println!("you: {}", session.display_question(&text));
            match session.ask(&text).await {
                Ok(reply) => println!("assistant: {reply}"),
                Err(e) => {
                    println!("assistant: {FALLBACK_REPLY}");
                    return Err(e.into());
                }
            }
        }

        Some(Commands::History { format, output }) => {
            let session = open_session(&config, cli.ephemeral, None)?;
            let messages = session.history().await?;
            let content = transcript::render(&messages, format)?;

            if let Some(path) = output {
                std::fs::write(&path, &content)?;
                println!("Exported conversation to {path}");
            } else {
                println!("{content}");
            }
        }

        Some(Commands::Reset { yes }) => {
            let confirmed = yes
                || Confirm::with_theme(&ColorfulTheme::default())
                    .with_prompt("Delete the whole conversation?")
                    .default(false)
                    .interact()?;
            if confirmed {
                let session = open_session(&config, cli.ephemeral, None)?;
                session.reset().await?;
                println!("Conversation deleted");
            }
        }

        Some(Commands::Mode { mode }) => match mode {
            Some(mode) => {
                Config::save_mode(mode)?;
                println!("Mode set to {mode}");
            }
            None => println!("{}", Config::load_mode()),
        },

        Some(Commands::Profile { command }) => match command {
            ProfileCommands::Show => {
                if config.profile.is_blank() {
                    println!("No profile saved yet. Set one with `medchat profile set`.");
                }
                println!("{}", config.profile.render());
            }
            ProfileCommands::Set {
                age,
                gender,
                conditions,
                medications,
            } => {
                let mut profile = config.profile;
                for (field, value) in [
                    (&mut profile.age, age),
                    (&mut profile.gender, gender),
                    (&mut profile.conditions, conditions),
                    (&mut profile.medications, medications),
                ] {
                    if let Some(value) = value {
                        *field = value;
                    }
                }
                Config::save_profile(&profile)?;
                println!("{}", profile.render());
            }
        },

        Some(Commands::Config { command }) => match command {
            ConfigCommands::Show => {
                println!("{}", toml::to_string_pretty(&config)?);
            }
            ConfigCommands::Path => {
                let path = Config::config_path()?;
                println!("{}", path.display());
            }
        },
    }

    Ok(())
}

/// Wire the store, the client and the saved preferences into a session.
///
/// A store that fails to open is kept closed: the session still runs, history
/// reads come back empty and every turn fails with the fallback reply.
fn open_session(
    config: &Config,
    ephemeral: bool,
    mode: Option<Mode>,
) -> anyhow::Result<ChatSession> {
    let store: Arc<dyn Store> = if ephemeral {
        Arc::new(MemoryStore::new())
    } else {
        let path = config.store_path()?;
        match SqliteStore::open(&path) {
            Ok(store) => {
                tracing::debug!(path = %path.display(), "opened store");
                Arc::new(store)
            }
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "failed to open store");
                let closed = MemoryStore::new();
                closed.close();
                Arc::new(closed)
            }
        }
    };

    let client = Arc::new(config.create_client()?);
    tracing::info!(base_url = client.base_url(), "using assistant service");

    let mode = mode.unwrap_or_else(Config::load_mode);
    Ok(ChatSession::new(store, client, config.request_builder()).with_mode(mode))
}
