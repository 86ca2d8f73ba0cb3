use std::sync::Arc;

use tokio::sync::watch;
use tracing::info;

use super::{SessionRecord, SessionStore};

/// Process-wide session shared by every screen.
///
/// Loaded from the [`SessionStore`] once at startup; sign-in and sign-out
/// write through to the store and notify subscribers.
#[derive(Clone)]
pub struct SessionContext {
    inner: Arc<Inner>,
}

struct Inner {
    store: SessionStore,
    current: watch::Sender<Option<SessionRecord>>,
}

impl SessionContext {
    /// Restore any persisted session from `store`.
    pub fn load(store: SessionStore) -> Self {
        let restored = if store.is_logged_in() {
            store.get().map(|mut record| {
                if record.token.is_none() {
                    record.token = store.token();
                }
                record
            })
        } else {
            None
        };
        if let Some(record) = restored.as_ref() {
            info!(user_id = %record.user_id, "restored persisted session");
        }
        let (current, _) = watch::channel(restored);
        Self {
            inner: Arc::new(Inner { store, current }),
        }
    }

    /// Snapshot of the signed-in user.
    pub fn current(&self) -> Option<SessionRecord> {
        self.inner.current.borrow().clone()
    }

    /// Bearer token for outgoing requests.
    pub fn token(&self) -> Option<String> {
        self.inner
            .current
            .borrow()
            .as_ref()
            .and_then(|record| record.token.clone())
            .filter(|token| !token.is_empty())
    }

    /// Farmer id used by crop and profile endpoints.
    pub fn user_id(&self) -> Option<String> {
        self.inner
            .current
            .borrow()
            .as_ref()
            .map(|record| record.user_id.clone())
    }

    /// Whether a session record is currently published.
    pub fn is_authenticated(&self) -> bool {
        self.inner.current.borrow().is_some()
    }

    /// Persist `record` and publish it.
    pub fn sign_in(&self, record: SessionRecord) {
        info!(user_id = %record.user_id, "signed in");
        self.inner.store.save(&record);
        self.inner.current.send_replace(Some(record));
    }

    /// Replace profile fields of the signed-in user, keeping the token and
    /// the role granted at login.
    pub fn update_profile(&self, mut record: SessionRecord) {
        if let Some(current) = self.current() {
            if record.token.is_none() {
                record.token = current.token.filter(|token| !token.is_empty());
            }
            if current.role.is_some() {
                record.role = current.role;
            }
        }
        self.inner.store.save(&record);
        self.inner.current.send_replace(Some(record));
    }

    /// Clear the persisted session and publish the logged-out state.
    pub fn sign_out(&self) {
        info!("signed out");
        self.inner.store.logout();
        self.inner.current.send_replace(None);
    }

    /// Receiver that observes every sign-in/sign-out.
    pub fn subscribe(&self) -> watch::Receiver<Option<SessionRecord>> {
        self.inner.current.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn record() -> SessionRecord {
        serde_json::from_value(serde_json::json!({
            "userId": "f-9",
            "name": "Gopal",
            "contact": "9988776655",
            "token": "secret"
        }))
        .unwrap()
    }

    #[test]
    fn restores_only_when_flag_set() {
        let kv = Arc::new(MemoryStore::new());
        let store = SessionStore::new(kv);
        assert!(!SessionContext::load(store.clone()).is_authenticated());

        store.save(&record());
        let context = SessionContext::load(store);
        assert_eq!(context.user_id().as_deref(), Some("f-9"));
        assert_eq!(context.token().as_deref(), Some("secret"));
    }

    #[tokio::test]
    async fn subscribers_observe_sign_in_and_out() {
        let store = SessionStore::new(Arc::new(MemoryStore::new()));
        let context = SessionContext::load(store.clone());
        let mut rx = context.subscribe();

        context.sign_in(record());
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().as_ref().map(|r| r.name.as_str()), Some("Gopal"));
        assert!(store.is_logged_in());

        context.sign_out();
        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().is_none());
        assert!(!store.is_logged_in());
    }

    #[test]
    fn profile_update_keeps_token() {
        let context = SessionContext::load(SessionStore::new(Arc::new(MemoryStore::new())));
        context.sign_in(record());

        let mut updated = record();
        updated.token = None;
        updated.name = "Gopal Rao".to_string();
        context.update_profile(updated);

        assert_eq!(context.token().as_deref(), Some("secret"));
        assert_eq!(context.current().map(|r| r.name), Some("Gopal Rao".to_string()));
    }

    #[test]
    fn profile_update_keeps_login_role() {
        let context = SessionContext::load(SessionStore::new(Arc::new(MemoryStore::new())));
        let mut admin = record();
        admin.role = Some("admin".to_string());
        context.sign_in(admin);

        let mut refreshed = record();
        refreshed.token = None;
        refreshed.role = Some("farmer".to_string());
        context.update_profile(refreshed);

        let current = context.current().unwrap();
        assert_eq!(current.role.as_deref(), Some("admin"));
        assert_eq!(current.token.as_deref(), Some("secret"));
    }
}
