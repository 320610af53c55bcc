mod commands;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{compose, init, libraries, serve, ComposeArgs, InitArgs, LibrariesArgs, ServeArgs};
use tracing_subscriber::EnvFilter;

/// Livepad CLI - live HTML/CSS/JS playground
#[derive(Parser, Debug)]
#[command(name = "livepad")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log at debug level (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create starter source files and a config
    Init(InitArgs),

    /// Compose a preview document from source files
    Compose(ComposeArgs),

    /// Start the playground server
    Serve(ServeArgs),

    /// List the library catalog
    Libraries(LibrariesArgs),
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = std::env::current_dir()
        .map_err(anyhow::Error::from)
        .and_then(|cwd| match cli.command {
            Command::Init(args) => init(args, &cwd),
            Command::Compose(args) => compose(args, &cwd),
            Command::Serve(args) => serve(args, &cwd),
            Command::Libraries(args) => libraries(args),
        });

    if let Err(err) = result {
        eprintln!();
        eprintln!("{} {:#}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
