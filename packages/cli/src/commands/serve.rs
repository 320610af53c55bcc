use anyhow::Result;
use clap::Args;
use colored::Colorize;
use livepad_workspace::{serve as serve_http, watch_sources, LivepadConfig, SourceFiles, Workspace};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Port to listen on (overrides config)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Interface to bind (overrides config)
    #[arg(long)]
    pub host: Option<String>,

    /// Mirror index.html / style.css / script.js from this directory
    #[arg(short, long)]
    pub watch: Option<String>,
}

pub fn serve(args: ServeArgs, cwd: &Path) -> Result<()> {
    let mut config = LivepadConfig::load(cwd)?;
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(host) = args.host {
        config.host = host;
    }

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(run(config, args.watch, cwd))
}

async fn run(config: LivepadConfig, watch: Option<String>, cwd: &Path) -> Result<()> {
    let addr = config.address();
    let workspace = Arc::new(Workspace::open(config, cwd)?);

    let watch_handle = match watch {
        Some(dir) => {
            let files = SourceFiles::new(cwd.join(dir));
            println!("  {} Watching {}", "👀".cyan(), files.dir().display());
            Some(watch_sources(
                files,
                workspace.session().clone(),
                Duration::from_millis(50),
            )?)
        }
        None => None,
    };

    println!("{}", "🚀 Starting Livepad...".bright_blue().bold());
    println!("  Open {}", format!("http://{addr}").cyan());
    println!("  Press Ctrl+C to stop");

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
        }
    };
    serve_http(workspace.clone(), &addr, shutdown).await?;

    drop(watch_handle);
    match Arc::try_unwrap(workspace) {
        Ok(workspace) => workspace.shutdown().await,
        Err(workspace) => {
            // Connections still draining; save what we have
            if let Err(e) = workspace.save_now().await {
                tracing::warn!(error = %e, "final save failed");
            }
        }
    }

    println!("\n{}", "👋 Stopped".green());
    Ok(())
}
