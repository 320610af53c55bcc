//! Mirrors `index.html` / `style.css` / `script.js` from a directory into the
//! session buffers, so the playground can be driven from an external editor.

use crate::scheduler::Debouncer;
use crate::SharedSession;
use livepad_editor::{BufferKind, SourceBuffers};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher as NotifyWatcher};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

const IDLE_POLL: Duration = Duration::from_millis(100);

#[derive(Error, Debug)]
pub enum WatcherError {
    #[error("Failed to create watcher: {0}")]
    CreateError(#[from] notify::Error),

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub type WatcherResult<T> = Result<T, WatcherError>;

/// On-disk layout of a playground directory
#[derive(Debug, Clone)]
pub struct SourceFiles {
    dir: PathBuf,
}

impl SourceFiles {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn file_name(kind: BufferKind) -> &'static str {
        match kind {
            BufferKind::Markup => "index.html",
            BufferKind::Styles => "style.css",
            BufferKind::Script => "script.js",
        }
    }

    pub fn path_for(&self, kind: BufferKind) -> PathBuf {
        self.dir.join(Self::file_name(kind))
    }

    /// Buffer a changed path maps to, if any
    pub fn kind_for(path: &Path) -> Option<BufferKind> {
        let name = path.file_name()?.to_str()?;
        BufferKind::ALL
            .into_iter()
            .find(|kind| Self::file_name(*kind) == name)
    }

    /// Read one file; a missing file reads as empty
    pub fn read(&self, kind: BufferKind) -> WatcherResult<String> {
        let path = self.path_for(kind);
        match std::fs::read_to_string(&path) {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
            Err(source) => Err(WatcherError::Io { path, source }),
        }
    }

    pub fn read_all(&self) -> WatcherResult<SourceBuffers> {
        Ok(SourceBuffers::new(
            self.read(BufferKind::Markup)?,
            self.read(BufferKind::Styles)?,
            self.read(BufferKind::Script)?,
        ))
    }

    pub fn write_all(&self, buffers: &SourceBuffers) -> WatcherResult<()> {
        std::fs::create_dir_all(&self.dir).map_err(|source| WatcherError::Io {
            path: self.dir.clone(),
            source,
        })?;
        for kind in BufferKind::ALL {
            let path = self.path_for(kind);
            std::fs::write(&path, buffers.get(kind))
                .map_err(|source| WatcherError::Io { path, source })?;
        }
        Ok(())
    }
}

pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    receiver: Receiver<notify::Result<Event>>,
}

impl FileWatcher {
    pub fn new(path: &Path) -> WatcherResult<Self> {
        let (tx, rx) = channel();

        let mut watcher = RecommendedWatcher::new(
            move |res| {
                let _ = tx.send(res);
            },
            Config::default(),
        )?;

        watcher.watch(path, RecursiveMode::NonRecursive)?;

        Ok(Self {
            _watcher: watcher,
            receiver: rx,
        })
    }

    /// Wait up to `timeout` for the next event. `Err` once the watcher is gone.
    pub fn next_event_timeout(&self, timeout: Duration) -> Result<Option<Event>, RecvTimeoutError> {
        match self.receiver.recv_timeout(timeout) {
            Ok(Ok(event)) => Ok(Some(event)),
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "file watch error");
                Ok(None)
            }
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Stops the watch thread when dropped
pub struct WatchHandle {
    stop: Arc<AtomicBool>,
    thread: Option<thread::JoinHandle<()>>,
}

impl WatchHandle {
    pub fn stop(mut self) {
        self.halt();
    }

    fn halt(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.halt();
    }
}

/// Load the source files into the session, then keep it in sync with
/// changes on disk. Bursts of writes settle for `window` before the
/// buffers are touched.
pub fn watch_sources(
    files: SourceFiles,
    session: SharedSession,
    window: Duration,
) -> WatcherResult<WatchHandle> {
    let initial = files.read_all()?;
    session
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .store_mut()
        .replace_all(initial.markup, initial.styles, initial.script);

    let watcher = FileWatcher::new(files.dir())?;
    let stop = Arc::new(AtomicBool::new(false));

    tracing::info!(dir = %files.dir().display(), "watching source files");

    let thread = {
        let stop = stop.clone();
        thread::Builder::new()
            .name("livepad-watch".to_string())
            .spawn(move || watch_loop(watcher, files, session, window, stop))
            .map_err(|source| WatcherError::Io {
                path: PathBuf::new(),
                source,
            })?
    };

    Ok(WatchHandle {
        stop,
        thread: Some(thread),
    })
}

fn watch_loop(
    watcher: FileWatcher,
    files: SourceFiles,
    session: SharedSession,
    window: Duration,
    stop: Arc<AtomicBool>,
) {
    let mut debouncer = Debouncer::new(window);
    let mut pending = HashSet::new();

    while !stop.load(Ordering::SeqCst) {
        let timeout = debouncer
            .remaining(Instant::now())
            .unwrap_or(IDLE_POLL)
            .min(IDLE_POLL);

        match watcher.next_event_timeout(timeout) {
            Ok(Some(event)) if !matches!(event.kind, EventKind::Access(_)) => {
                for path in &event.paths {
                    if let Some(kind) = SourceFiles::kind_for(path) {
                        pending.insert(kind);
                        debouncer.touch(Instant::now());
                    }
                }
            }
            Ok(_) => {}
            Err(_) => {
                tracing::debug!("file watcher closed");
                return;
            }
        }

        if debouncer.poll(Instant::now()) {
            for kind in std::mem::take(&mut pending) {
                sync_buffer(&files, &session, kind);
            }
        }
    }
}

fn sync_buffer(files: &SourceFiles, session: &SharedSession, kind: BufferKind) {
    let text = match files.read(kind) {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(error = %e, buffer = %kind, "could not read source file");
            return;
        }
    };

    let mut session = session.lock().unwrap_or_else(|e| e.into_inner());
    if session.store().buffer(kind) == text {
        return;
    }
    tracing::debug!(buffer = %kind, bytes = text.len(), "source file changed");
    session.store_mut().set_buffer(kind, text);
}
