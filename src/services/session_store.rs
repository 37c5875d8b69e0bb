use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rand::distributions::Alphanumeric;
use rand::Rng;

use crate::wizard::{RemoteLookups, WizardDefinition, WizardError, WizardSession};

/// Maximum number of live sessions kept in memory.
pub const MAX_SESSIONS: usize = 500;

const SESSION_ID_LEN: usize = 24;

/// Thread-safe, bounded in-memory store of wizard sessions.
///
/// Closures passed to [`SessionStore::with_session`] run under the lock and must
/// not await.
#[derive(Clone, Debug)]
pub struct SessionStore {
    inner: Arc<Mutex<StoreInner>>,
    capacity: usize,
}

#[derive(Debug, Default)]
struct StoreInner {
    sessions: HashMap<String, WizardSession>,
    notices: HashMap<String, Vec<String>>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

pub fn random_session_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SESSION_ID_LEN)
        .map(char::from)
        .collect()
}

impl SessionStore {
    pub fn new() -> Self {
        Self::with_capacity(MAX_SESSIONS)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(StoreInner::default())),
            capacity: capacity.max(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, StoreInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Open a session on `definition` and return its id. The oldest sessions are
    /// evicted when the store is full.
    pub fn create(&self, definition: Arc<WizardDefinition>, lookups: RemoteLookups) -> Result<String, WizardError> {
        let id = random_session_id();
        let session = WizardSession::new(id.clone(), definition, lookups)?;
        let mut inner = self.lock();
        inner.sessions.insert(id.clone(), session);
        while inner.sessions.len() > self.capacity {
            let Some(oldest) = inner
                .sessions
                .values()
                .min_by_key(|s| s.created_at())
                .map(|s| s.id().to_string())
            else {
                break;
            };
            tracing::debug!(session = %oldest, "Evicting wizard session");
            inner.sessions.remove(&oldest);
            inner.notices.remove(&oldest);
        }
        Ok(id)
    }

    /// Run `f` against the session, if it still exists.
    pub fn with_session<R>(&self, id: &str, f: impl FnOnce(&mut WizardSession) -> R) -> Option<R> {
        let mut inner = self.lock();
        inner.sessions.get_mut(id).map(f)
    }

    pub fn snapshot(&self, id: &str) -> Option<WizardSession> {
        self.lock().sessions.get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.lock().sessions.contains_key(id)
    }

    pub fn remove(&self, id: &str) -> Option<WizardSession> {
        let mut inner = self.lock();
        inner.notices.remove(id);
        inner.sessions.remove(id)
    }

    /// Queue a one-shot message shown on the session's next page render.
    pub fn push_notice(&self, id: &str, message: impl Into<String>) {
        let mut inner = self.lock();
        if inner.sessions.contains_key(id) {
            inner.notices.entry(id.to_string()).or_default().push(message.into());
        }
    }

    pub fn take_notices(&self, id: &str) -> Vec<String> {
        self.lock().notices.remove(id).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.lock().sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wizard::{FieldDefinition, FieldKind, StepDefinition, SubmitMethod};
    use serde_json::json;

    fn definition() -> Arc<WizardDefinition> {
        let def = WizardDefinition::builder("demo", "Demo")
            .field(FieldDefinition::new("name", "Name", FieldKind::Text).required())
            .step(StepDefinition::new("one", "One").with_fields(["name"]))
            .submit_to(SubmitMethod::Post, |_| "/demo".into())
            .build()
            .expect("definition builds");
        Arc::new(def)
    }

    #[test]
    fn test_create_and_mutate() {
        let store = SessionStore::new();
        let id = store.create(definition(), RemoteLookups::new()).unwrap();
        assert_eq!(id.len(), SESSION_ID_LEN);
        assert!(store.contains(&id));

        let result = store.with_session(&id, |s| s.set_value("name", json!("x")));
        assert_eq!(result, Some(Ok(())));
        let snapshot = store.snapshot(&id).expect("should exist");
        assert_eq!(snapshot.values().text("name"), Some("x"));
        assert!(store.with_session("missing", |_| ()).is_none());
    }

    #[test]
    fn test_notices_are_taken_once() {
        let store = SessionStore::new();
        let id = store.create(definition(), RemoteLookups::new()).unwrap();
        store.push_notice(&id, "first");
        store.push_notice(&id, "second");
        store.push_notice("missing", "dropped");
        assert_eq!(store.take_notices(&id), vec!["first", "second"]);
        assert!(store.take_notices(&id).is_empty());
        assert!(store.take_notices("missing").is_empty());
    }

    #[test]
    fn test_eviction() {
        let store = SessionStore::with_capacity(2);
        let first = store.create(definition(), RemoteLookups::new()).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = store.create(definition(), RemoteLookups::new()).unwrap();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let third = store.create(definition(), RemoteLookups::new()).unwrap();
        assert_eq!(store.len(), 2);
        assert!(!store.contains(&first));
        assert!(store.contains(&second));
        assert!(store.contains(&third));
    }

    #[test]
    fn test_remove() {
        let store = SessionStore::new();
        let id = store.create(definition(), RemoteLookups::new()).unwrap();
        assert!(store.remove(&id).is_some());
        assert!(store.is_empty());
        assert!(store.remove(&id).is_none());
    }
}
