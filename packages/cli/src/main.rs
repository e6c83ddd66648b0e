mod commands;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{
    domain, fetch, init, resave, scripts, DomainArgs, FetchArgs, InitArgs, ResaveArgs,
    ScriptsArgs,
};
use tracing_subscriber::EnvFilter;

/// Clonup CLI - edit and republish cloned pages
#[derive(Parser, Debug)]
#[command(name = "clonup")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a default clonup.config.json
    Init(InitArgs),

    /// Download the current HTML of a clone
    Fetch(FetchArgs),

    /// Apply edits to a page and produce clean, persistable HTML
    Resave(ResaveArgs),

    /// List the editable tracking and navigation scripts of a page
    Scripts(ScriptsArgs),

    /// Configure a custom domain for a clone
    Domain(DomainArgs),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match std::env::current_dir() {
        Ok(cwd) => match cli.command {
            Command::Init(args) => init(args, &cwd),
            Command::Fetch(args) => fetch(args, &cwd).await,
            Command::Resave(args) => resave(args, &cwd).await,
            Command::Scripts(args) => scripts(args),
            Command::Domain(args) => domain(args, &cwd).await,
        },
        Err(err) => Err(anyhow::anyhow!("Cannot get current directory: {err}")),
    };

    if let Err(err) = result {
        eprintln!();
        eprintln!("{} {}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
