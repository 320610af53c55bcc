use anyhow::{anyhow, Result};
use clap::Args;
use colored::Colorize;
use livepad_editor::{BufferKind, SourceBuffers};
use livepad_workspace::{LivepadConfig, SourceFiles, DEFAULT_CONFIG_NAME};
use std::path::Path;

const STARTER_MARKUP: &str = r#"<main>
  <h1>Hello, Livepad</h1>
  <button id="greet">Click me</button>
</main>
"#;

const STARTER_STYLES: &str = r#"body {
  font-family: system-ui, sans-serif;
  padding: 2rem;
}

button {
  padding: 8px 16px;
  background: #3366ff;
  color: white;
  border: none;
  border-radius: 4px;
}
"#;

const STARTER_SCRIPT: &str = r#"document.getElementById('greet').addEventListener('click', () => {
  document.querySelector('h1').textContent = 'Hello again!';
});
"#;

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Directory for the source files
    #[arg(default_value = ".")]
    pub dir: String,

    /// Port written to the config
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Force overwrite existing files
    #[arg(short, long)]
    pub force: bool,
}

pub fn init(args: InitArgs, cwd: &Path) -> Result<()> {
    let config_path = cwd.join(DEFAULT_CONFIG_NAME);
    let files = SourceFiles::new(cwd.join(&args.dir));

    let existing: Vec<_> = BufferKind::ALL
        .into_iter()
        .map(|kind| files.path_for(kind))
        .chain(std::iter::once(config_path.clone()))
        .filter(|path| path.exists())
        .collect();

    if !existing.is_empty() && !args.force {
        for path in &existing {
            println!("{} {} already exists", "⚠️".yellow(), path.display().to_string().bright_white());
        }
        return Err(anyhow!(
            "Refusing to overwrite {} existing file(s); use --force to overwrite",
            existing.len()
        ));
    }

    println!("{}", "📝 Initializing Livepad project...".bright_blue().bold());

    files.write_all(&SourceBuffers::new(STARTER_MARKUP, STARTER_STYLES, STARTER_SCRIPT))?;
    for kind in BufferKind::ALL {
        println!("  {} Created {}", "✓".green(), SourceFiles::file_name(kind));
    }

    let mut config = LivepadConfig::default();
    if let Some(port) = args.port {
        config.port = port;
    }
    config.save(cwd)?;
    println!("  {} Created {}", "✓".green(), DEFAULT_CONFIG_NAME);

    println!();
    println!("{}", "✅ Project initialized!".green().bold());
    println!();
    println!("Next steps:");
    println!("  1. Run: livepad serve --watch {}", args.dir);
    println!("  2. Open http://{}", config.address());

    Ok(())
}
