//! Transient, self-clearing status messages shown after an admin action.

use serde::Serialize;
use std::{
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
}

#[derive(Default)]
struct Slot {
    generation: u64,
    current: Option<Notification>,
}

/// Holds at most one notification and clears it after `ttl`.
///
/// A newer notification resets the slot; the timer of an older one does not
/// clear it.
#[derive(Clone)]
pub struct Notifier {
    slot: Arc<Mutex<Slot>>,
    ttl: Duration,
}

impl Notifier {
    pub const DEFAULT_TTL: Duration = Duration::from_secs(3);

    pub fn new(ttl: Duration) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Slot::default())),
            ttl,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Publish a notification. Must be called from within a tokio runtime.
    pub fn notify(&self, kind: NotificationKind, message: impl Into<String>) {
        let generation = {
            let mut slot = self.lock();
            slot.generation += 1;
            slot.current = Some(Notification {
                kind,
                message: message.into(),
            });
            slot.generation
        };

        let notifier = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(notifier.ttl).await;
            let mut slot = notifier.lock();
            if slot.generation == generation {
                slot.current = None;
            }
        });
    }

    pub fn current(&self) -> Option<Notification> {
        self.lock().current.clone()
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TTL)
    }
}
