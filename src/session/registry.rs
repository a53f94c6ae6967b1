//! Session registry: identity, isolation and eviction.
//!
//! The registry map is the only structure shared by every request. It sits
//! behind a `std` `RwLock` held only for map operations. Each session has
//! its own async mutex, so work on one session never waits on another.

use super::state::Session;
use crate::config::RegistryConfig;
use crate::core::current_timestamp_ms;
use crate::error::{Result, SessionError};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tokio::sync::{MutexGuard, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy)]
struct Activity {
    at: Instant,
    unix_ms: i64,
}

impl Activity {
    fn now() -> Self {
        Self {
            at: Instant::now(),
            unix_ms: current_timestamp_ms(),
        }
    }
}

#[derive(Debug)]
struct SessionSlot {
    id: String,
    state: tokio::sync::Mutex<Session>,
    activity: Mutex<Activity>,
}

/// Shared handle to a registered session.
///
/// Cloning is cheap. A handle stays usable after eviction, but the evicted
/// session is no longer reachable through the registry.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    slot: Arc<SessionSlot>,
}

impl SessionHandle {
    fn new(session: Session) -> Self {
        Self {
            slot: Arc::new(SessionSlot {
                id: session.id().to_string(),
                state: tokio::sync::Mutex::new(session),
                activity: Mutex::new(Activity::now()),
            }),
        }
    }

    /// Returns the session id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.slot.id
    }

    /// Acquires the session lock, refreshing its activity.
    ///
    /// Operations on one session are serialized in lock acquisition order.
    pub async fn lock(&self) -> MutexGuard<'_, Session> {
        let guard = self.slot.state.lock().await;
        self.touch();
        guard
    }

    /// Refreshes the last-activity time.
    pub fn touch(&self) {
        *self
            .slot
            .activity
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Activity::now();
    }

    /// Returns the last-activity time as Unix milliseconds.
    #[must_use]
    pub fn last_activity_ms(&self) -> i64 {
        self.activity().unix_ms
    }

    fn last_active(&self) -> Instant {
        self.activity().at
    }

    fn activity(&self) -> Activity {
        *self
            .slot
            .activity
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether another operation currently holds the session lock.
    fn is_busy(&self) -> bool {
        self.slot.state.try_lock().is_err()
    }

    fn is_expired(&self, now: Instant, timeout: std::time::Duration) -> bool {
        now.saturating_duration_since(self.last_active()) > timeout
    }
}

/// Owner of every session.
///
/// # Examples
///
/// ```
/// use rlm_context::config::RegistryConfig;
/// use rlm_context::session::SessionRegistry;
///
/// let registry = SessionRegistry::new(RegistryConfig::default(), 100);
/// let handle = registry.create_session(Some("work".to_string()));
/// assert_eq!(handle.id(), "work");
/// assert!(registry.get("work").is_ok());
/// ```
#[derive(Debug)]
pub struct SessionRegistry {
    config: RegistryConfig,
    history_limit: usize,
    sessions: RwLock<HashMap<String, SessionHandle>>,
    shutdown: watch::Sender<bool>,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl SessionRegistry {
    /// Creates an empty registry. Sessions keep `history_limit` records.
    #[must_use]
    pub fn new(config: RegistryConfig, history_limit: usize) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            config,
            history_limit,
            sessions: RwLock::new(HashMap::new()),
            shutdown,
            sweeper: Mutex::new(None),
        }
    }

    /// Returns the registry configuration.
    #[must_use]
    pub const fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Creates a session, or returns the live session already registered
    /// under `id`.
    ///
    /// Without an id a random one is generated. At capacity, the least
    /// recently active session is evicted first.
    pub fn create_session(&self, id: Option<String>) -> SessionHandle {
        let id = id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let now = Instant::now();
        let mut sessions = self.write();

        if let Some(existing) = sessions.get(&id) {
            if !existing.is_expired(now, self.config.session_timeout) {
                existing.touch();
                return existing.clone();
            }
            sessions.remove(&id);
        }

        while sessions.len() >= self.config.max_sessions {
            let Some(oldest) = sessions
                .values()
                .min_by_key(|handle| handle.last_active())
                .map(|handle| handle.id().to_string())
            else {
                break;
            };
            sessions.remove(&oldest);
            tracing::info!(session = %oldest, "evicted least recently active session");
        }

        let handle = SessionHandle::new(Session::new(id.clone(), self.history_limit));
        sessions.insert(id, handle.clone());
        tracing::info!(session = handle.id(), total = sessions.len(), "session created");
        handle
    }

    /// Returns a live session, refreshing its activity.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::SessionNotFound`] for unknown or expired ids.
    pub fn get(&self, id: &str) -> Result<SessionHandle> {
        let now = Instant::now();
        let found = self.read().get(id).cloned();
        match found {
            Some(handle) if !handle.is_expired(now, self.config.session_timeout) => {
                handle.touch();
                Ok(handle)
            }
            Some(_) => {
                self.evict_if_expired(id, now);
                Err(not_found(id))
            }
            None => Err(not_found(id)),
        }
    }

    /// Returns the default session, creating it on first use.
    pub fn default_session(&self) -> SessionHandle {
        let id = &self.config.default_session_id;
        self.get(id)
            .unwrap_or_else(|_| self.create_session(Some(id.clone())))
    }

    /// Resolves an optional session id. `None` and the default id resolve to
    /// the default session.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::SessionNotFound`] for other unknown ids.
    pub fn resolve(&self, id: Option<&str>) -> Result<SessionHandle> {
        match id {
            None => Ok(self.default_session()),
            Some(id) if id == self.config.default_session_id => Ok(self.default_session()),
            Some(id) => self.get(id),
        }
    }

    /// Evicts every idle session past the timeout; sessions currently
    /// locked by an operation are skipped. Returns the number evicted.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let timeout = self.config.session_timeout;
        let mut sessions = self.write();
        let before = sessions.len();
        sessions.retain(|id, handle| {
            let keep = handle.is_busy() || !handle.is_expired(now, timeout);
            if !keep {
                tracing::info!(session = %id, "evicted idle session");
            }
            keep
        });
        let evicted = before - sessions.len();
        if evicted > 0 {
            tracing::debug!(evicted, remaining = sessions.len(), "sweep complete");
        }
        evicted
    }

    /// Removes a session. Returns whether it existed.
    pub fn remove(&self, id: &str) -> bool {
        self.write().remove(id).is_some()
    }

    /// Returns the registered session ids, sorted.
    #[must_use]
    pub fn list(&self) -> Vec<String> {
        let mut ids: Vec<_> = self.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Returns the number of registered sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Returns whether no session is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Starts the periodic sweep on the current tokio runtime.
    ///
    /// The task holds only a weak reference and stops on [`shutdown`] or
    /// when the registry is dropped. Calling this twice has no effect.
    ///
    /// [`shutdown`]: Self::shutdown
    pub fn start_sweeper(self: &Arc<Self>) {
        let mut slot = self.sweeper.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            return;
        }

        let registry = Arc::downgrade(self);
        let mut stop = self.shutdown.subscribe();
        let period = self.config.effective_sweep_interval();

        *slot = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let Some(registry) = registry.upgrade() else {
                            break;
                        };
                        registry.sweep();
                    }
                    _ = stop.changed() => break,
                }
            }
            tracing::debug!("session sweeper stopped");
        }));
        tracing::info!(interval = ?period, "session sweeper started");
    }

    /// Stops the sweep and evicts every session.
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
        if let Some(task) = self
            .sweeper
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            task.abort();
        }
        let mut sessions = self.write();
        let count = sessions.len();
        sessions.clear();
        tracing::info!(evicted = count, "session registry shut down");
    }

    fn evict_if_expired(&self, id: &str, now: Instant) {
        let mut sessions = self.write();
        if sessions
            .get(id)
            .is_some_and(|h| h.is_expired(now, self.config.session_timeout))
        {
            sessions.remove(id);
            tracing::info!(session = %id, "evicted expired session on access");
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, SessionHandle>> {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, SessionHandle>> {
        self.sessions.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for SessionRegistry {
    fn drop(&mut self) {
        self.shutdown.send_replace(true);
    }
}

fn not_found(id: &str) -> crate::Error {
    SessionError::SessionNotFound { id: id.to_string() }.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn registry(max_sessions: usize, timeout_secs: u64) -> SessionRegistry {
        SessionRegistry::new(
            RegistryConfig {
                max_sessions,
                session_timeout: Duration::from_secs(timeout_secs),
                sweep_interval: Duration::from_secs(timeout_secs),
                ..RegistryConfig::default()
            },
            10,
        )
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let registry = registry(10, 60);
        let handle = registry.create_session(None);
        assert!(!handle.id().is_empty());
        assert_eq!(registry.get(handle.id()).unwrap().id(), handle.id());
        assert_eq!(
            registry.get("missing").unwrap_err().code(),
            "SessionNotFound"
        );
    }

    #[tokio::test]
    async fn test_create_existing_returns_same_session() {
        let registry = registry(10, 60);
        let first = registry.create_session(Some("a".into()));
        first.lock().await.load_context("doc", "kept");

        let second = registry.create_session(Some("a".into()));
        assert!(second.lock().await.context("doc").is_ok());
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_default_session_is_lazy_and_reused() {
        let registry = registry(10, 60);
        assert!(registry.is_empty());
        let a = registry.resolve(None).unwrap();
        let b = registry.resolve(Some("default")).unwrap();
        assert_eq!(a.id(), "default");
        assert!(Arc::ptr_eq(&a.slot, &b.slot));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_capacity_evicts_least_recently_active() {
        let registry = registry(2, 3600);
        registry.create_session(Some("a".into()));
        tokio::time::advance(Duration::from_secs(1)).await;
        registry.create_session(Some("b".into()));
        tokio::time::advance(Duration::from_secs(1)).await;
        registry.get("a").unwrap();
        tokio::time::advance(Duration::from_secs(1)).await;

        registry.create_session(Some("c".into()));

        assert_eq!(registry.list(), vec!["a", "c"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_evicts_idle_only() {
        let registry = registry(10, 60);
        registry.create_session(Some("idle".into()));
        registry.create_session(Some("busy".into()));

        tokio::time::advance(Duration::from_secs(59)).await;
        registry.get("busy").unwrap();
        tokio::time::advance(Duration::from_secs(2)).await;

        assert_eq!(registry.sweep(), 1);
        assert_eq!(registry.list(), vec!["busy"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_session_not_returned_before_sweep() {
        let registry = registry(10, 60);
        registry.create_session(Some("old".into()));
        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(registry.get("old").is_err());
        assert!(registry.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_locked_session_survives_sweep() {
        let registry = registry(10, 60);
        let handle = registry.create_session(Some("running".into()));
        let guard = handle.lock().await;
        tokio::time::advance(Duration::from_secs(120)).await;
        assert_eq!(registry.sweep(), 0);
        drop(guard);
        assert_eq!(registry.sweep(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_task_and_shutdown() {
        let registry = Arc::new(registry(10, 10));
        registry.create_session(Some("x".into()));
        registry.start_sweeper();

        tokio::time::sleep(Duration::from_secs(25)).await;
        assert!(registry.is_empty());

        registry.create_session(Some("y".into()));
        registry.shutdown();
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_remove() {
        let registry = registry(10, 60);
        registry.create_session(Some("gone".into()));
        assert!(registry.remove("gone"));
        assert!(!registry.remove("gone"));
    }
}
