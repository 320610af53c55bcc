use anyhow::Result;
use clap::Args;
use colored::Colorize;
use livepad_composer::LibraryRegistry;

#[derive(Debug, Args)]
pub struct LibrariesArgs {
    /// Print the head fragments of each library
    #[arg(short, long)]
    pub fragments: bool,
}

pub fn libraries(args: LibrariesArgs) -> Result<()> {
    let registry = LibraryRegistry::builtin();

    println!("{}", "📚 Library catalog".bright_blue().bold());
    for entry in registry.entries() {
        println!("  {} {}", "•".cyan(), entry.name.bright_white());
        if args.fragments {
            for fragment in &entry.fragments {
                println!("      {}", fragment.dimmed());
            }
        }
    }
    println!();
    println!("{} libraries available", registry.len());

    Ok(())
}
