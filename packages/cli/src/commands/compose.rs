use anyhow::{anyhow, Context, Result};
use clap::Args;
use colored::Colorize;
use livepad_composer::{ComposedDocument, DocumentComposer, LibraryRegistry, LibraryToggleSet};
use livepad_editor::EditSession;
use livepad_workspace::{
    watch_sources, PreviewScheduler, PublishedPreview, SandboxRenderer, SharedSession, SourceFiles,
    DEFAULT_PREVIEW_DEBOUNCE,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Settle time for bursts of file writes
const FILE_SETTLE: Duration = Duration::from_millis(50);

#[derive(Debug, Args)]
pub struct ComposeArgs {
    /// Directory holding index.html, style.css and script.js
    #[arg(default_value = ".")]
    pub path: String,

    /// Enable a catalog library (repeatable)
    #[arg(short, long = "lib")]
    pub libs: Vec<String>,

    /// Output file (defaults to preview.html next to the sources)
    #[arg(short, long)]
    pub out: Option<String>,

    /// Output to stdout instead of a file
    #[arg(long)]
    pub stdout: bool,

    /// Recompose whenever a source file changes
    #[arg(short, long)]
    pub watch: bool,
}

pub fn compose(args: ComposeArgs, cwd: &Path) -> Result<()> {
    let files = SourceFiles::new(cwd.join(&args.path));
    if !files.dir().is_dir() {
        return Err(anyhow!("Source directory does not exist: {}", files.dir().display()));
    }

    let registry = Arc::new(LibraryRegistry::builtin());
    let toggles = enabled_libraries(&registry, &args.libs)?;
    let out = match &args.out {
        Some(out) => cwd.join(out),
        None => files.dir().join("preview.html"),
    };

    if args.watch {
        return watch(files, registry, toggles, out);
    }

    let document = compose_files(&files, registry, &toggles)?;
    if args.stdout {
        println!("{}", document);
    } else {
        fs::write(&out, document.as_str())
            .with_context(|| format!("Failed to write {}", out.display()))?;
        println!(
            "{} Composed {} ({} bytes)",
            "✅".green(),
            out.display(),
            document.len()
        );
    }

    Ok(())
}

fn enabled_libraries(registry: &LibraryRegistry, names: &[String]) -> Result<LibraryToggleSet> {
    let mut toggles = LibraryToggleSet::for_registry(registry);
    for name in names {
        toggles.set(registry, name, true).with_context(|| {
            format!(
                "Available libraries: {}",
                registry.names().collect::<Vec<_>>().join(", ")
            )
        })?;
    }
    Ok(toggles)
}

fn compose_files(
    files: &SourceFiles,
    registry: Arc<LibraryRegistry>,
    toggles: &LibraryToggleSet,
) -> Result<ComposedDocument> {
    let buffers = files.read_all()?;
    Ok(DocumentComposer::new(registry).compose(
        &buffers.markup,
        &buffers.styles,
        &buffers.script,
        toggles,
    ))
}

/// Writes each rendered document over the output file
struct OutputFileRenderer {
    path: PathBuf,
}

impl SandboxRenderer for OutputFileRenderer {
    fn render(&self, preview: &Arc<PublishedPreview>) {
        match fs::write(&self.path, preview.document.as_str()) {
            Ok(()) => println!(
                "  {} {} (generation {})",
                "✓".green(),
                self.path.display(),
                preview.generation
            ),
            Err(e) => eprintln!("  {} {} - {}", "✗".red(), self.path.display(), e.to_string().red()),
        }
    }
}

fn watch(
    files: SourceFiles,
    registry: Arc<LibraryRegistry>,
    toggles: LibraryToggleSet,
    out: PathBuf,
) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async move {
        let mut session = EditSession::new(registry.clone());
        session.store_mut().replace_libraries(toggles);
        let session: SharedSession = Arc::new(Mutex::new(session));

        let scheduler = PreviewScheduler::spawn(
            session.clone(),
            DocumentComposer::new(registry),
            Arc::new(OutputFileRenderer { path: out }),
            DEFAULT_PREVIEW_DEBOUNCE,
        );
        scheduler.attach(session.lock().unwrap_or_else(|e| e.into_inner()).store_mut());

        let handle = watch_sources(files, session, FILE_SETTLE)?;
        println!("\n{}", "👀 Watching for changes... (Ctrl+C to stop)".bright_blue());

        tokio::signal::ctrl_c().await?;
        handle.stop();
        scheduler.shutdown();
        Ok::<_, anyhow::Error>(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use livepad_editor::SourceBuffers;

    #[test]
    fn test_compose_to_file() {
        let dir = tempfile::tempdir().unwrap();
        SourceFiles::new(dir.path())
            .write_all(&SourceBuffers::new("<p>Hi</p>", "p{color:red}", "console.log(1)"))
            .unwrap();

        compose(
            ComposeArgs {
                path: ".".to_string(),
                libs: vec!["jQuery".to_string()],
                out: Some("out.html".to_string()),
                stdout: false,
                watch: false,
            },
            dir.path(),
        )
        .unwrap();

        assert_eq!(
            fs::read_to_string(dir.path().join("out.html")).unwrap(),
            "<html><head><style>p{color:red}</style>\
             <script src=\"https://code.jquery.com/jquery-3.7.1.min.js\"></script>\
             </head><body><p>Hi</p><script>console.log(1)</script></body></html>"
        );
    }

    #[test]
    fn test_unknown_library_is_an_error() {
        let registry = LibraryRegistry::builtin();
        let err = enabled_libraries(&registry, &["Backbone".to_string()]).unwrap_err();
        assert!(format!("{err:#}").contains("Backbone"));
    }

    #[test]
    fn test_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let result = compose(
            ComposeArgs {
                path: "nowhere".to_string(),
                libs: vec![],
                out: None,
                stdout: true,
                watch: false,
            },
            dir.path(),
        );
        assert!(result.is_err());
    }
}
