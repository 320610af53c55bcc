//! Debounced write-behind of the session to local persistence.
//!
//! Runs beside the preview scheduler and never holds the session lock while
//! writing, so a slow disk cannot stall the preview.

use crate::notice::Notifier;
use crate::persistence::{LocalPersistence, PersistenceError};
use crate::scheduler::{spawn_debounced, Trigger};
use crate::SharedSession;
use livepad_editor::{SessionSnapshot, SourceBufferStore, SubscriptionId};
use std::time::Duration;
use tokio::task::JoinHandle;

pub const DEFAULT_AUTOSAVE_DEBOUNCE: Duration = Duration::from_millis(1000);

pub struct Autosaver {
    trigger: Trigger,
    session: SharedSession,
    persistence: LocalPersistence,
    notifier: Notifier,
    task: JoinHandle<()>,
}

impl Autosaver {
    pub fn spawn(
        session: SharedSession,
        persistence: LocalPersistence,
        notifier: Notifier,
        window: Duration,
    ) -> Self {
        let trigger = Trigger::new();
        let task = {
            let session = session.clone();
            let persistence = persistence.clone();
            let notifier = notifier.clone();
            spawn_debounced(trigger.clone(), window, move |generation| {
                let session = session.clone();
                let persistence = persistence.clone();
                let notifier = notifier.clone();
                async move {
                    let (sequence, snapshot) = {
                        let session = session.lock().unwrap_or_else(|e| e.into_inner());
                        if !session.settings().auto_save {
                            tracing::trace!(generation, "autosave disabled, skipping");
                            return;
                        }
                        (persistence.next_sequence(), session.snapshot())
                    };
                    if let Err(e) = write(persistence, sequence, snapshot).await {
                        tracing::warn!(error = %e, generation, "autosave failed");
                        notifier.error(format!("Autosave failed: {e}"));
                    } else {
                        tracing::debug!(generation, "autosaved session");
                    }
                }
            })
        };

        Self {
            trigger,
            session,
            persistence,
            notifier,
            task,
        }
    }

    /// Schedule a save (settings changes, renames)
    pub fn touch(&self) {
        self.trigger.fire();
    }

    /// Save on every buffer or library change
    pub fn attach(&self, store: &mut SourceBufferStore) -> SubscriptionId {
        self.trigger.attach(store)
    }

    /// Write immediately regardless of the auto-save setting
    pub async fn save_now(&self) -> Result<(), PersistenceError> {
        let (sequence, snapshot) = {
            let session = self.session.lock().unwrap_or_else(|e| e.into_inner());
            (self.persistence.next_sequence(), session.snapshot())
        };
        let result = write(self.persistence.clone(), sequence, snapshot).await;
        if let Err(e) = &result {
            self.notifier.error(format!("Save failed: {e}"));
        }
        result
    }

    pub fn shutdown(self) {
        self.trigger.close();
        self.task.abort();
    }
}

async fn write(
    persistence: LocalPersistence,
    sequence: u64,
    snapshot: SessionSnapshot,
) -> Result<(), PersistenceError> {
    tokio::task::spawn_blocking(move || persistence.save_sequenced(sequence, &snapshot))
        .await
        .map_err(|e| PersistenceError::Task(e.to_string()))?
        .map(|_| ())
}
