//! Preference writes with change notification.
//!
//! # Responsibility
//! - Persist the dark-mode flag through the preferences repository.
//! - Push every successful write to in-process subscribers.
//!
//! # Invariants
//! - Publication happens only after the repository write succeeded.
//! - Listeners run outside the subscriber lock, so a listener may
//!   subscribe or unsubscribe without deadlocking.

use crate::model::preferences::{PreferencesPatch, UserPreferences};
use crate::repo::preferences_repo::PreferencesRepository;
use crate::repo::RepoResult;
use log::debug;
use once_cell::sync::Lazy;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// One published preference change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreferenceChange {
    pub owner_id: String,
    pub dark_mode: bool,
}

pub type SubscriptionId = u64;

type Listener = Arc<dyn Fn(&PreferenceChange) + Send + Sync>;

static GLOBAL_BROADCASTER: Lazy<Arc<PreferenceBroadcaster>> =
    Lazy::new(|| Arc::new(PreferenceBroadcaster::new()));

/// Fan-out of preference changes to registered listeners.
#[derive(Default)]
pub struct PreferenceBroadcaster {
    next_id: AtomicU64,
    listeners: Mutex<BTreeMap<SubscriptionId, Listener>>,
}

impl PreferenceBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide broadcaster shared by every default `PreferencesService`.
    pub fn global() -> Arc<Self> {
        Arc::clone(&GLOBAL_BROADCASTER)
    }

    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&PreferenceChange) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.lock().insert(id, Arc::new(listener));
        id
    }

    /// Returns `false` when `id` was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.lock().remove(&id).is_some()
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().len()
    }

    /// Calls every current listener once; returns how many were called.
    pub fn publish(&self, change: &PreferenceChange) -> usize {
        let snapshot: Vec<Listener> = self.lock().values().cloned().collect();
        for listener in &snapshot {
            listener(change);
        }
        debug!(
            "event=preferences_publish module=service status=ok listeners={}",
            snapshot.len()
        );
        snapshot.len()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<SubscriptionId, Listener>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Preferences use-case service.
pub struct PreferencesService<R: PreferencesRepository> {
    repo: R,
    broadcaster: Arc<PreferenceBroadcaster>,
}

impl<R: PreferencesRepository> PreferencesService<R> {
    /// Service publishing to `PreferenceBroadcaster::global()`.
    pub fn new(repo: R) -> Self {
        Self::with_broadcaster(repo, PreferenceBroadcaster::global())
    }

    pub fn with_broadcaster(repo: R, broadcaster: Arc<PreferenceBroadcaster>) -> Self {
        Self { repo, broadcaster }
    }

    pub fn current(&self, owner_id: &str) -> RepoResult<Option<UserPreferences>> {
        self.repo.get_preferences(owner_id)
    }

    /// Stored dark-mode flag; `false` when nothing was stored yet.
    pub fn dark_mode_enabled(&self, owner_id: &str) -> RepoResult<bool> {
        Ok(self
            .current(owner_id)?
            .map(|prefs| prefs.dark_mode)
            .unwrap_or(false))
    }

    pub fn set_dark_mode(&self, owner_id: &str, enabled: bool) -> RepoResult<UserPreferences> {
        let saved = self
            .repo
            .set_preferences(owner_id, &PreferencesPatch::dark_mode(enabled))?;
        self.broadcaster.publish(&PreferenceChange {
            owner_id: saved.owner_id().to_string(),
            dark_mode: saved.dark_mode,
        });
        Ok(saved)
    }

    pub fn toggle_dark_mode(&self, owner_id: &str) -> RepoResult<UserPreferences> {
        let enabled = self.dark_mode_enabled(owner_id)?;
        self.set_dark_mode(owner_id, !enabled)
    }
}

#[cfg(test)]
mod tests {
    use super::{PreferenceBroadcaster, PreferenceChange};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn listener_may_unsubscribe_itself_while_being_called() {
        let broadcaster = Arc::new(PreferenceBroadcaster::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let inner = Arc::clone(&broadcaster);
        let counter = Arc::clone(&calls);
        let id = Arc::new(AtomicUsize::new(usize::MAX));
        let own_id = Arc::clone(&id);
        let subscribed = broadcaster.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            inner.unsubscribe(own_id.load(Ordering::SeqCst) as u64);
        });
        id.store(subscribed as usize, Ordering::SeqCst);

        let change = PreferenceChange {
            owner_id: "u1".to_string(),
            dark_mode: true,
        };
        assert_eq!(broadcaster.publish(&change), 1);
        assert_eq!(broadcaster.publish(&change), 0);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
