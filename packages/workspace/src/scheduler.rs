//! # Preview Scheduling
//!
//! Trailing-edge debounce between buffer edits and preview renders.
//!
//! Every edit bumps a generation counter and restarts the quiet timer. When
//! the timer runs out the latest session state is composed and published on
//! a `watch` channel; the renderer follows that channel, so it can only ever
//! move forward to newer documents.

use crate::sandbox::SandboxRenderer;
use crate::SharedSession;
use chrono::{DateTime, Utc};
use livepad_composer::{ComposedDocument, DocumentComposer};
use livepad_editor::{SourceBufferStore, SubscriptionId};
use serde::Serialize;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;

pub const DEFAULT_PREVIEW_DEBOUNCE: Duration = Duration::from_millis(300);

/// Clock-free trailing-edge debounce.
///
/// Callers feed in the current instant; nothing sleeps here.
#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            deadline: None,
        }
    }

    /// Register an input, pushing the deadline out by a full window
    pub fn touch(&mut self, now: Instant) {
        self.deadline = Some(now + self.window);
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left until the pending deadline
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(now))
    }

    /// True exactly once when a pending deadline has passed
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }
}

struct TriggerState {
    generation: AtomicU64,
    wake: Notify,
    closed: AtomicBool,
}

/// Cheap handle that marks the debounced work as due
#[derive(Clone)]
pub struct Trigger {
    state: Arc<TriggerState>,
}

impl Trigger {
    pub fn new() -> Self {
        Self {
            state: Arc::new(TriggerState {
                generation: AtomicU64::new(0),
                wake: Notify::new(),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Record a change and restart the quiet timer. Never blocks.
    pub fn fire(&self) -> u64 {
        let generation = self.state.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.wake.notify_one();
        generation
    }

    /// Latest recorded change
    pub fn generation(&self) -> u64 {
        self.state.generation.load(Ordering::SeqCst)
    }

    /// Subscribe the trigger to every mutation of a buffer store
    pub fn attach(&self, store: &mut SourceBufferStore) -> SubscriptionId {
        let trigger = self.clone();
        store.subscribe(move |_| {
            trigger.fire();
        })
    }

    pub(crate) fn close(&self) {
        self.state.closed.store(true, Ordering::SeqCst);
        self.state.wake.notify_one();
    }

    fn is_closed(&self) -> bool {
        self.state.closed.load(Ordering::SeqCst)
    }
}

impl Default for Trigger {
    fn default() -> Self {
        Self::new()
    }
}

/// Run `action` once per quiet period of `window` after the trigger fires.
///
/// A fire during the window restarts it; a steady stream of fires runs
/// nothing until the stream pauses. `action` receives the generation that
/// was current when the window closed.
pub(crate) fn spawn_debounced<F, Fut>(trigger: Trigger, window: Duration, mut action: F) -> JoinHandle<()>
where
    F: FnMut(u64) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        loop {
            trigger.state.wake.notified().await;
            if trigger.is_closed() {
                return;
            }

            loop {
                tokio::select! {
                    _ = tokio::time::sleep(window) => break,
                    _ = trigger.state.wake.notified() => {
                        if trigger.is_closed() {
                            return;
                        }
                    }
                }
            }

            action(trigger.generation()).await;
        }
    })
}

/// A document as published to the preview
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishedPreview {
    pub generation: u64,
    pub document: ComposedDocument,
    pub hash: u32,
    pub composed_at: DateTime<Utc>,
}

impl PublishedPreview {
    fn new(generation: u64, document: ComposedDocument) -> Self {
        Self {
            generation,
            hash: document.content_hash(),
            document,
            composed_at: Utc::now(),
        }
    }
}

struct PreviewShared {
    session: SharedSession,
    composer: DocumentComposer,
    tx: watch::Sender<Arc<PublishedPreview>>,
}

impl PreviewShared {
    fn compose(&self, generation: u64) -> Arc<PublishedPreview> {
        let (buffers, toggles) = {
            let session = self.session.lock().unwrap_or_else(|e| e.into_inner());
            (session.store().snapshot(), session.store().libraries().clone())
        };
        let document = self
            .composer
            .compose(&buffers.markup, &buffers.styles, &buffers.script, &toggles);
        Arc::new(PublishedPreview::new(generation, document))
    }

    /// Publish unless something at least as new is already out
    fn publish(&self, preview: Arc<PublishedPreview>) -> bool {
        self.tx.send_if_modified(|current| {
            if preview.generation > current.generation {
                *current = preview;
                true
            } else {
                false
            }
        })
    }
}

/// Debounced compose → publish → render driver
pub struct PreviewScheduler {
    trigger: Trigger,
    shared: Arc<PreviewShared>,
    debounce_task: JoinHandle<()>,
    render_task: JoinHandle<()>,
}

impl PreviewScheduler {
    /// Compose the initial preview and start the driver tasks.
    /// Must be called from within a tokio runtime.
    pub fn spawn(
        session: SharedSession,
        composer: DocumentComposer,
        renderer: Arc<dyn SandboxRenderer>,
        window: Duration,
    ) -> Self {
        let trigger = Trigger::new();

        let initial = {
            let (buffers, toggles) = {
                let session = session.lock().unwrap_or_else(|e| e.into_inner());
                (session.store().snapshot(), session.store().libraries().clone())
            };
            composer.compose(&buffers.markup, &buffers.styles, &buffers.script, &toggles)
        };
        let (tx, rx) = watch::channel(Arc::new(PublishedPreview::new(0, initial)));

        let shared = Arc::new(PreviewShared {
            session,
            composer,
            tx,
        });

        let debounce_task = {
            let shared = shared.clone();
            let trigger_for_task = trigger.clone();
            spawn_debounced(trigger.clone(), window, move |generation| {
                let shared = shared.clone();
                let trigger = trigger_for_task.clone();
                async move {
                    let preview = shared.compose(generation);
                    if trigger.generation() != generation {
                        tracing::debug!(generation, "discarding superseded preview");
                        return;
                    }
                    if shared.publish(preview) {
                        tracing::debug!(generation, "published preview");
                    }
                }
            })
        };

        let render_task = tokio::spawn(render_loop(rx, renderer));

        Self {
            trigger,
            shared,
            debounce_task,
            render_task,
        }
    }

    /// Note a buffer or library change
    pub fn on_buffer_changed(&self) -> u64 {
        self.trigger.fire()
    }

    pub fn trigger(&self) -> Trigger {
        self.trigger.clone()
    }

    /// Wire the scheduler to a store's observers
    pub fn attach(&self, store: &mut SourceBufferStore) -> SubscriptionId {
        self.trigger.attach(store)
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<PublishedPreview>> {
        self.shared.tx.subscribe()
    }

    pub fn current(&self) -> Arc<PublishedPreview> {
        self.shared.tx.borrow().clone()
    }

    /// Compose and publish right away, skipping the quiet window
    pub fn flush(&self) -> Arc<PublishedPreview> {
        let generation = self.trigger.generation();
        self.shared.publish(self.shared.compose(generation));
        self.current()
    }

    pub fn shutdown(self) {
        self.trigger.close();
        self.debounce_task.abort();
        self.render_task.abort();
    }
}

async fn render_loop(
    mut rx: watch::Receiver<Arc<PublishedPreview>>,
    renderer: Arc<dyn SandboxRenderer>,
) {
    loop {
        let preview = rx.borrow_and_update().clone();
        renderer.render(&preview);
        if rx.changed().await.is_err() {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::RecordingRenderer;
    use livepad_composer::LibraryRegistry;
    use livepad_editor::{BufferKind, EditSession};
    use std::sync::Mutex;

    const WINDOW: Duration = Duration::from_millis(300);

    fn setup() -> (SharedSession, PreviewScheduler, Arc<RecordingRenderer>) {
        let registry = Arc::new(LibraryRegistry::builtin());
        let session = Arc::new(Mutex::new(EditSession::new(registry.clone())));
        let renderer = Arc::new(RecordingRenderer::default());
        let scheduler = PreviewScheduler::spawn(
            session.clone(),
            DocumentComposer::new(registry),
            renderer.clone(),
            WINDOW,
        );
        scheduler.attach(session.lock().unwrap().store_mut());
        (session, scheduler, renderer)
    }

    fn edit(session: &SharedSession, markup: &str) {
        session
            .lock()
            .unwrap()
            .store_mut()
            .set_buffer(BufferKind::Markup, markup);
    }

    #[test]
    fn test_debouncer_fires_once_after_quiet_window() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(WINDOW);
        assert!(!debouncer.poll(start));

        debouncer.touch(start);
        debouncer.touch(start + Duration::from_millis(200));
        assert!(!debouncer.poll(start + Duration::from_millis(400)));
        assert_eq!(
            debouncer.remaining(start + Duration::from_millis(400)),
            Some(Duration::from_millis(100))
        );

        assert!(debouncer.poll(start + Duration::from_millis(500)));
        assert!(!debouncer.poll(start + Duration::from_millis(900)));
        assert!(!debouncer.is_pending());
    }

    #[test]
    fn test_debouncer_cancel() {
        let now = Instant::now();
        let mut debouncer = Debouncer::new(WINDOW);
        debouncer.touch(now);
        debouncer.cancel();
        assert!(!debouncer.poll(now + WINDOW * 2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_edits_coalesce_into_one_render() {
        let (session, scheduler, renderer) = setup();
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(renderer.count(), 1); // initial document

        for i in 0..10 {
            edit(&session, &format!("<p>{i}</p>"));
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        // Still inside the window of the last edit
        assert_eq!(renderer.count(), 1);

        tokio::time::sleep(Duration::from_millis(400)).await;

        let rendered = renderer.documents();
        assert_eq!(rendered.len(), 2);
        assert!(rendered[1].contains("<p>9</p>"));
        assert_eq!(scheduler.current().generation, 10);
        scheduler.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_separate_pauses_render_separately() {
        let (session, scheduler, renderer) = setup();

        edit(&session, "<p>a</p>");
        tokio::time::sleep(Duration::from_millis(350)).await;
        edit(&session, "<p>b</p>");
        tokio::time::sleep(Duration::from_millis(350)).await;

        let rendered = renderer.documents();
        assert_eq!(rendered.len(), 3);
        assert!(rendered[1].contains("<p>a</p>"));
        assert!(rendered[2].contains("<p>b</p>"));
        scheduler.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_library_toggle_schedules_render() {
        let (session, scheduler, renderer) = setup();
        session
            .lock()
            .unwrap()
            .store_mut()
            .set_library("jQuery", true)
            .unwrap();

        tokio::time::sleep(Duration::from_millis(350)).await;

        assert!(renderer.documents().last().unwrap().contains("jquery-3.7.1.min.js"));
        scheduler.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_publish_is_rejected() {
        let (session, scheduler, _renderer) = setup();
        edit(&session, "<p>old</p>");
        let stale = scheduler.shared.compose(1);
        edit(&session, "<p>new</p>");
        let fresh = scheduler.shared.compose(2);

        assert!(scheduler.shared.publish(fresh));
        assert!(!scheduler.shared.publish(stale));
        assert!(scheduler.current().document.as_str().contains("<p>new</p>"));
        scheduler.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_skips_window() {
        let (session, scheduler, _renderer) = setup();
        edit(&session, "<p>now</p>");

        let preview = scheduler.flush();

        assert_eq!(preview.generation, 1);
        assert!(preview.document.as_str().contains("<p>now</p>"));
        scheduler.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn test_published_generations_only_increase() {
        let (session, scheduler, _renderer) = setup();
        let mut rx = scheduler.subscribe();
        let mut seen = vec![rx.borrow_and_update().generation];

        for round in 0..3 {
            for i in 0..3 {
                edit(&session, &format!("<p>{round}-{i}</p>"));
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            tokio::time::sleep(Duration::from_millis(400)).await;
            if rx.has_changed().unwrap() {
                seen.push(rx.borrow_and_update().generation);
            }
        }

        assert_eq!(seen, vec![0, 3, 6, 9]);
        scheduler.shutdown();
    }
}
