//! Session storage.
//!
//! [`SessionStore`] is the seam between request handlers and wherever
//! sessions live. [`InMemorySessionStore`] keeps them in a process-local map;
//! a restart loses every session.

use super::state::SessionState;
use crate::error::SessionError;
use crate::types::SessionId;
use crate::workspace::{EscapePolicy, WorkspaceSandbox};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, MutexGuard, RwLock};

/// Shared handle to one live session.
pub type SessionHandle = Arc<Session>;

/// One live session: its identity, its sandbox and its guarded state.
///
/// Request handlers hold [`Session::lock`] for the whole request, so two
/// requests against the same session run one after the other.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    sandbox: WorkspaceSandbox,
    state: Mutex<SessionState>,
    last_activity: StdMutex<Instant>,
}

impl Session {
    fn new(id: SessionId, sandbox: WorkspaceSandbox) -> Self {
        let state = SessionState::new(sandbox.root().display().to_string());
        Self {
            id,
            sandbox,
            state: Mutex::new(state),
            last_activity: StdMutex::new(Instant::now()),
        }
    }

    /// Returns the session identifier.
    #[must_use]
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Returns the session's workspace sandbox.
    #[must_use]
    pub fn sandbox(&self) -> &WorkspaceSandbox {
        &self.sandbox
    }

    /// Waits for exclusive access to the session state.
    pub async fn lock(&self) -> MutexGuard<'_, SessionState> {
        let mut state = self.state.lock().await;
        self.touch();
        state.context.last_activity = Utc::now();
        state
    }

    /// Returns true if a request currently holds the session lock.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.state.try_lock().is_err()
    }

    /// Returns how long the session has gone unused.
    #[must_use]
    pub fn idle_for(&self) -> Duration {
        self.last_activity
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .elapsed()
    }

    fn touch(&self) {
        *self
            .last_activity
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Instant::now();
    }
}

/// A mutation applied to a session's state under its lock.
pub type StateUpdate = Box<dyn FnOnce(&mut SessionState) + Send>;

/// Storage for live sessions.
#[async_trait]
pub trait SessionStore: Send + Sync + std::fmt::Debug {
    /// Returns the session for `id`, creating it on first reference.
    ///
    /// With no id a new session is created under a generated id. Creating
    /// a session provisions its sandbox directory. Every call refreshes the
    /// session's last-activity time.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::invalid_id` for an unusable client id and
    /// `SessionError::provision_failed` if the sandbox cannot be created.
    async fn get_or_create(&self, id: Option<&str>) -> Result<SessionHandle, SessionError>;

    /// Returns an existing session without creating one.
    async fn get(&self, id: &SessionId) -> Option<SessionHandle>;

    /// Applies `update` to a session's state under its lock.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::not_found` if no such session exists.
    async fn update(&self, id: &SessionId, update: StateUpdate) -> Result<(), SessionError>;

    /// Removes a session. Returns false if it did not exist.
    async fn evict(&self, id: &SessionId) -> bool;

    /// Removes every session idle for at least `idle_timeout`.
    ///
    /// Sessions in use by a request are kept regardless of idle time.
    async fn evict_idle(&self, idle_timeout: Duration) -> Vec<SessionId>;

    /// Returns the number of live sessions.
    async fn len(&self) -> usize;

    /// Returns the ids of live sessions.
    async fn ids(&self) -> Vec<SessionId>;
}

/// Process-local session store.
#[derive(Debug)]
pub struct InMemorySessionStore {
    workspace_root: PathBuf,
    policy: EscapePolicy,
    remove_workspace_on_evict: bool,
    sessions: RwLock<HashMap<SessionId, SessionHandle>>,
}

impl InMemorySessionStore {
    /// Creates a store that provisions sandboxes under `workspace_root`.
    #[must_use]
    pub fn new(workspace_root: impl Into<PathBuf>, policy: EscapePolicy) -> Self {
        Self {
            workspace_root: workspace_root.into(),
            policy,
            remove_workspace_on_evict: false,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Deletes a session's sandbox directory when the session is evicted.
    #[must_use]
    pub fn with_remove_on_evict(mut self, remove: bool) -> Self {
        self.remove_workspace_on_evict = remove;
        self
    }

    /// Returns the directory holding every session sandbox.
    #[must_use]
    pub fn workspace_root(&self) -> &std::path::Path {
        &self.workspace_root
    }

    async fn release(&self, session: &Session) {
        if !self.remove_workspace_on_evict {
            return;
        }
        if let Err(e) = tokio::fs::remove_dir_all(session.sandbox.root()).await {
            tracing::warn!(
                session_id = %session.id,
                error = %e,
                "failed to remove workspace of evicted session"
            );
        }
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get_or_create(&self, id: Option<&str>) -> Result<SessionHandle, SessionError> {
        let id = match id {
            Some(raw) => SessionId::parse(raw).map_err(|e| SessionError::invalid_id(e.to_string()))?,
            None => SessionId::new(),
        };

        if let Some(session) = self.sessions.read().await.get(&id) {
            session.touch();
            return Ok(Arc::clone(session));
        }

        // Re-check under the write lock: another request may have created it.
        let mut sessions = self.sessions.write().await;
        if let Some(session) = sessions.get(&id) {
            session.touch();
            return Ok(Arc::clone(session));
        }

        let root = self.workspace_root.join(id.as_str());
        let sandbox = WorkspaceSandbox::provision(&root, self.policy)
            .await
            .map_err(|e| SessionError::provision_failed(&root, e.to_string()))?;

        tracing::info!(session_id = %id, root = %sandbox.root().display(), "session created");
        let session = Arc::new(Session::new(id.clone(), sandbox));
        sessions.insert(id, Arc::clone(&session));
        Ok(session)
    }

    async fn get(&self, id: &SessionId) -> Option<SessionHandle> {
        let sessions = self.sessions.read().await;
        let session = sessions.get(id)?;
        session.touch();
        Some(Arc::clone(session))
    }

    async fn update(&self, id: &SessionId, update: StateUpdate) -> Result<(), SessionError> {
        let session = self
            .get(id)
            .await
            .ok_or_else(|| SessionError::not_found(id.clone()))?;
        let mut state = session.lock().await;
        update(&mut state);
        Ok(())
    }

    async fn evict(&self, id: &SessionId) -> bool {
        let removed = self.sessions.write().await.remove(id);
        match removed {
            Some(session) => {
                tracing::info!(session_id = %id, "session evicted");
                self.release(&session).await;
                true
            }
            None => false,
        }
    }

    async fn evict_idle(&self, idle_timeout: Duration) -> Vec<SessionId> {
        let evicted: Vec<SessionHandle> = {
            let mut sessions = self.sessions.write().await;
            let idle: Vec<SessionId> = sessions
                .iter()
                .filter(|(_, s)| {
                    s.idle_for() >= idle_timeout && !s.is_locked() && Arc::strong_count(s) == 1
                })
                .map(|(id, _)| id.clone())
                .collect();
            idle.iter().filter_map(|id| sessions.remove(id)).collect()
        };

        for session in &evicted {
            tracing::info!(
                session_id = %session.id,
                idle_secs = session.idle_for().as_secs(),
                "idle session evicted"
            );
            self.release(session).await;
        }
        evicted.iter().map(|s| s.id.clone()).collect()
    }

    async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    async fn ids(&self) -> Vec<SessionId> {
        let mut ids: Vec<_> = self.sessions.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::Message;
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> InMemorySessionStore {
        InMemorySessionStore::new(dir.path().join("workspace"), EscapePolicy::Rebase)
    }

    #[tokio::test]
    async fn first_reference_provisions_sandbox() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let session = store.get_or_create(Some("abc")).await.unwrap();

        assert_eq!(session.id().as_str(), "abc");
        assert!(session.sandbox().root().is_dir());
        assert!(session.sandbox().root().ends_with("abc"));
        assert!(session.lock().await.messages.is_empty());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn second_reference_returns_same_session() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let first = store.get_or_create(Some("abc")).await.unwrap();
        first.lock().await.messages.push(Message::user("hi"));

        let second = store.get_or_create(Some("abc")).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.sandbox().root(), first.sandbox().root());
        assert_eq!(second.lock().await.messages.len(), 1);
    }

    #[tokio::test]
    async fn missing_id_generates_one() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let a = store.get_or_create(None).await.unwrap();
        let b = store.get_or_create(None).await.unwrap();

        assert!(a.id().as_str().starts_with("sess_"));
        assert_ne!(a.id(), b.id());
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn path_like_id_is_rejected() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let error = store.get_or_create(Some("../etc")).await.unwrap_err();
        assert!(error.is_invalid_id());
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn concurrent_creation_yields_one_session() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(store(&dir));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.get_or_create(Some("shared")).await.unwrap() })
            })
            .collect();
        let sessions = futures::future::join_all(handles).await;

        let first = sessions[0].as_ref().unwrap();
        for session in &sessions {
            assert!(Arc::ptr_eq(first, session.as_ref().unwrap()));
        }
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn get_never_creates() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let id = SessionId::parse("ghost").unwrap();
        assert!(store.get(&id).await.is_none());
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn update_mutates_under_lock() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let session = store.get_or_create(Some("abc")).await.unwrap();

        store
            .update(
                session.id(),
                Box::new(|state| state.messages.push(Message::user("x"))),
            )
            .await
            .unwrap();

        assert_eq!(session.lock().await.messages.len(), 1);

        let missing = SessionId::parse("nope").unwrap();
        let error = store.update(&missing, Box::new(|_| {})).await.unwrap_err();
        assert!(error.is_not_found());
    }

    #[tokio::test]
    async fn evict_keeps_workspace_by_default() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let session = store.get_or_create(Some("abc")).await.unwrap();
        let root = session.sandbox().root().to_path_buf();
        drop(session);

        assert!(store.evict(&SessionId::parse("abc").unwrap()).await);
        assert!(!store.evict(&SessionId::parse("abc").unwrap()).await);
        assert!(root.is_dir());
    }

    #[tokio::test]
    async fn evict_can_remove_workspace() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir).with_remove_on_evict(true);
        let session = store.get_or_create(Some("abc")).await.unwrap();
        let root = session.sandbox().root().to_path_buf();
        drop(session);

        assert!(store.evict(&SessionId::parse("abc").unwrap()).await);
        assert!(!root.exists());
    }

    #[tokio::test]
    async fn evict_idle_skips_sessions_in_use() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        store.get_or_create(Some("idle")).await.unwrap();
        let busy = store.get_or_create(Some("busy")).await.unwrap();
        let _guard = busy.lock().await;

        let evicted = store.evict_idle(Duration::ZERO).await;

        assert_eq!(evicted, vec![SessionId::parse("idle").unwrap()]);
        assert_eq!(store.ids().await, vec![SessionId::parse("busy").unwrap()]);
    }

    #[tokio::test]
    async fn evict_idle_keeps_recent_sessions() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        store.get_or_create(Some("fresh")).await.unwrap();

        let evicted = store.evict_idle(Duration::from_secs(3600)).await;

        assert!(evicted.is_empty());
        assert_eq!(store.len().await, 1);
    }
}
