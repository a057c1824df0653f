// ABOUTME: Entry point for sage — a terminal research agent with pluggable strategies.
// ABOUTME: Parses CLI args, loads config, publishes credentials, and launches the app.

use anyhow::Result;
use clap::{Parser, Subcommand};

use sage::app::{self, App};
use sage::config::Config;

#[derive(Parser)]
#[command(name = "sage", about = "A terminal research agent", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Open the interactive chat TUI (the default).
    Chat {
        /// Start a fresh session instead of restoring the previous one.
        #[arg(long)]
        fresh: bool,
    },
    /// Ask a single question and print the answer to stdout.
    Ask {
        /// The question to answer.
        input: String,
        /// Name of a prompt template under the templates directory.
        #[arg(long)]
        template: Option<String>,
        /// Template variables as key=value pairs.
        #[arg(short = 'v', long = "var", value_parser = parse_var)]
        vars: Vec<(String, String)>,
    },
}

fn parse_var(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected key=value, got '{}'", s)),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load()?;

    // Load local .env if present, then the config-dir secrets file, then
    // publish credential-looking config values into the environment. Env
    // mutation must finish before the runtime spawns threads.
    let _ = dotenvy::dotenv();
    let _ = dotenvy::from_path(Config::secrets_env_path());
    config.publish_credentials();

    let runtime = tokio::runtime::Runtime::new()?;
    match cli.command {
        Some(Command::Ask {
            input,
            template,
            vars,
        }) => runtime.block_on(app::run_ask(config, input, template, vars)),
        Some(Command::Chat { fresh }) => runtime.block_on(App::new(config, fresh).run()),
        None => runtime.block_on(App::new(config, false).run()),
    }
}
