//! Single-flight lifecycle management for inference backends.
//!
//! Heavy backends (model weights, remote sessions) load lazily on first
//! use. The manager collapses concurrent load requests into one in-flight
//! load per backend, latches failures instead of retrying, and keeps the
//! rest of the session running when a backend never comes up.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::backend::{BackendId, BackendLoader, BackendState, LoadOutcome};

#[derive(Default)]
struct Slot {
    state: BackendState,
    waiters: Vec<oneshot::Sender<LoadOutcome>>,
}

struct Inner {
    loader: Arc<dyn BackendLoader>,
    slots: Mutex<HashMap<BackendId, Slot>>,
}

impl Inner {
    fn settle(&self, backend: BackendId, outcome: LoadOutcome) {
        let waiters = {
            let mut slots = self.slots.lock();
            let slot = slots.entry(backend).or_default();
            slot.state = match outcome {
                LoadOutcome::Ready => BackendState::Ready,
                LoadOutcome::Failed => BackendState::Failed,
            };
            std::mem::take(&mut slot.waiters)
        };
        debug!(%backend, waiters = waiters.len(), ready = outcome.is_ready(), "backend load settled");
        for tx in waiters {
            let _ = tx.send(outcome);
        }
    }
}

/// Owns the load state of every inference backend.
///
/// Guarantees at most one in-flight load per backend: concurrent
/// [`ensure_loaded`](Self::ensure_loaded) calls attach to the running load
/// and share its outcome. A started load always runs to completion, even
/// if every caller gives up waiting. A failed load latches; nothing
/// retries automatically.
#[derive(Clone)]
pub struct ModelLifecycleManager {
    inner: Arc<Inner>,
}

impl ModelLifecycleManager {
    /// Manager that delegates the slow work to `loader`.
    #[must_use]
    pub fn new(loader: Arc<dyn BackendLoader>) -> Self {
        Self {
            inner: Arc::new(Inner {
                loader,
                slots: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Bring a backend up, reusing any load already in flight.
    ///
    /// Resolves immediately when the backend is already `ready`, and also
    /// immediately when it is latched `failed`: a failed backend is never
    /// reloaded implicitly, callers degrade instead.
    pub async fn ensure_loaded(&self, backend: BackendId) -> LoadOutcome {
        let rx = {
            let mut slots = self.inner.slots.lock();
            let slot = slots.entry(backend).or_default();
            match slot.state {
                BackendState::Ready => return LoadOutcome::Ready,
                BackendState::Failed => return LoadOutcome::Failed,
                BackendState::Loading | BackendState::Unloaded => {
                    let (tx, rx) = oneshot::channel();
                    slot.waiters.push(tx);
                    if slot.state == BackendState::Unloaded {
                        slot.state = BackendState::Loading;
                        debug!(%backend, "backend load started");
                        self.spawn_load(backend);
                    }
                    rx
                }
            }
        };

        // The load task always settles the slot; a dropped sender means it
        // died mid-way, which counts as a failure.
        rx.await.unwrap_or(LoadOutcome::Failed)
    }

    fn spawn_load(&self, backend: BackendId) {
        let inner = Arc::clone(&self.inner);
        drop(tokio::spawn(async move {
            let outcome = match inner.loader.load(backend).await {
                Ok(()) => LoadOutcome::Ready,
                Err(error) => {
                    warn!(%backend, %error, "backend load failed, continuing without it");
                    LoadOutcome::Failed
                }
            };
            inner.settle(backend, outcome);
        }));
    }

    /// Observable state of a backend.
    #[must_use]
    pub fn state(&self, backend: BackendId) -> BackendState {
        self.inner
            .slots
            .lock()
            .get(&backend)
            .map_or(BackendState::Unloaded, |slot| slot.state)
    }

    /// True once a backend finished loading successfully.
    #[must_use]
    pub fn is_ready(&self, backend: BackendId) -> bool {
        self.state(backend) == BackendState::Ready
    }

    /// Return a failed backend to `unloaded` so the next request may try
    /// again. Only an explicit user action calls this; states other than
    /// `failed` are left untouched.
    pub fn reset(&self, backend: BackendId) {
        let mut slots = self.inner.slots.lock();
        if let Some(slot) = slots.get_mut(&backend)
            && slot.state == BackendState::Failed
        {
            debug!(%backend, "failed backend reset to unloaded");
            slot.state = BackendState::Unloaded;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::errors::InferenceError;
    use async_trait::async_trait;

    /// Loader that sleeps, counts calls, and fails the first `fail_first`
    /// attempts per call order (not per backend).
    struct ScriptedLoader {
        calls: AtomicUsize,
        fail_first: usize,
        delay: Duration,
    }

    impl ScriptedLoader {
        fn succeeding(delay: Duration) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_first: 0,
                delay,
            }
        }

        fn failing_first(fail_first: usize, delay: Duration) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_first,
                delay,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl BackendLoader for ScriptedLoader {
        async fn load(&self, backend: BackendId) -> Result<(), InferenceError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            if call < self.fail_first {
                Err(InferenceError::LoadFailed(format!(
                    "{backend} scripted failure"
                )))
            } else {
                Ok(())
            }
        }
    }

    fn manager_with(loader: Arc<ScriptedLoader>) -> ModelLifecycleManager {
        ModelLifecycleManager::new(loader)
    }

    #[tokio::test(start_paused = true)]
    async fn first_request_loads_and_becomes_ready() {
        let loader = Arc::new(ScriptedLoader::succeeding(Duration::from_millis(50)));
        let manager = manager_with(Arc::clone(&loader));

        assert_eq!(manager.state(BackendId::Facial), BackendState::Unloaded);
        let outcome = manager.ensure_loaded(BackendId::Facial).await;
        assert_eq!(outcome, LoadOutcome::Ready);
        assert!(manager.is_ready(BackendId::Facial));
        assert_eq!(loader.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn ready_backend_resolves_without_reloading() {
        let loader = Arc::new(ScriptedLoader::succeeding(Duration::from_millis(50)));
        let manager = manager_with(Arc::clone(&loader));

        let _ = manager.ensure_loaded(BackendId::Chat).await;
        let outcome = manager.ensure_loaded(BackendId::Chat).await;
        assert_eq!(outcome, LoadOutcome::Ready);
        assert_eq!(loader.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_requests_share_one_load() {
        let loader = Arc::new(ScriptedLoader::succeeding(Duration::from_millis(200)));
        let manager = manager_with(Arc::clone(&loader));

        let (a, b, c) = tokio::join!(
            manager.ensure_loaded(BackendId::Vocal),
            manager.ensure_loaded(BackendId::Vocal),
            manager.ensure_loaded(BackendId::Vocal),
        );
        assert_eq!(a, LoadOutcome::Ready);
        assert_eq!(b, LoadOutcome::Ready);
        assert_eq!(c, LoadOutcome::Ready);
        assert_eq!(loader.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failure_latches_without_retrying() {
        let loader = Arc::new(ScriptedLoader::failing_first(
            usize::MAX,
            Duration::from_millis(50),
        ));
        let manager = manager_with(Arc::clone(&loader));

        let first = manager.ensure_loaded(BackendId::Facial).await;
        assert_eq!(first, LoadOutcome::Failed);
        assert_eq!(manager.state(BackendId::Facial), BackendState::Failed);

        let second = manager.ensure_loaded(BackendId::Facial).await;
        assert_eq!(second, LoadOutcome::Failed);
        assert_eq!(loader.calls(), 1, "failed backend must not reload");
    }

    #[tokio::test(start_paused = true)]
    async fn backends_fail_independently() {
        let loader = Arc::new(ScriptedLoader::failing_first(
            1,
            Duration::from_millis(50),
        ));
        let manager = manager_with(Arc::clone(&loader));

        let vocal = manager.ensure_loaded(BackendId::Vocal).await;
        let facial = manager.ensure_loaded(BackendId::Facial).await;
        assert_eq!(vocal, LoadOutcome::Failed);
        assert_eq!(facial, LoadOutcome::Ready);
        assert_eq!(manager.state(BackendId::Vocal), BackendState::Failed);
        assert_eq!(manager.state(BackendId::Facial), BackendState::Ready);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_allows_a_manual_reload() {
        let loader = Arc::new(ScriptedLoader::failing_first(
            1,
            Duration::from_millis(50),
        ));
        let manager = manager_with(Arc::clone(&loader));

        let first = manager.ensure_loaded(BackendId::Chat).await;
        assert_eq!(first, LoadOutcome::Failed);

        manager.reset(BackendId::Chat);
        assert_eq!(manager.state(BackendId::Chat), BackendState::Unloaded);

        let second = manager.ensure_loaded(BackendId::Chat).await;
        assert_eq!(second, LoadOutcome::Ready);
        assert_eq!(loader.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn reset_ignores_non_failed_states() {
        let loader = Arc::new(ScriptedLoader::succeeding(Duration::from_millis(50)));
        let manager = manager_with(Arc::clone(&loader));

        let _ = manager.ensure_loaded(BackendId::Facial).await;
        manager.reset(BackendId::Facial);
        assert_eq!(manager.state(BackendId::Facial), BackendState::Ready);
    }

    #[tokio::test(start_paused = true)]
    async fn loading_state_is_visible_mid_flight() {
        let loader = Arc::new(ScriptedLoader::succeeding(Duration::from_millis(500)));
        let manager = manager_with(Arc::clone(&loader));

        let pending = tokio::spawn({
            let manager = manager.clone();
            async move { manager.ensure_loaded(BackendId::Vocal).await }
        });
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;
        assert_eq!(manager.state(BackendId::Vocal), BackendState::Loading);

        let outcome = pending.await.unwrap();
        assert_eq!(outcome, LoadOutcome::Ready);
        assert_eq!(manager.state(BackendId::Vocal), BackendState::Ready);
    }

    #[tokio::test(start_paused = true)]
    async fn abandoned_waiter_does_not_poison_the_load() {
        let loader = Arc::new(ScriptedLoader::succeeding(Duration::from_millis(500)));
        let manager = manager_with(Arc::clone(&loader));

        let abandoned = tokio::spawn({
            let manager = manager.clone();
            async move { manager.ensure_loaded(BackendId::Facial).await }
        });
        tokio::task::yield_now().await;
        abandoned.abort();

        let outcome = manager.ensure_loaded(BackendId::Facial).await;
        assert_eq!(outcome, LoadOutcome::Ready);
        assert_eq!(loader.calls(), 1);
    }
}
