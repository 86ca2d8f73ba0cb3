use std::sync::Arc;

use tracing::{debug, warn};

use super::SessionRecord;
use crate::storage::KeyValueStore;

/// Key holding the JSON-encoded [`SessionRecord`].
pub const USER_KEY: &str = "user";
/// Key holding the bearer token (empty when the backend sent none).
pub const TOKEN_KEY: &str = "token";
/// Key holding `"true"` while a user is logged in.
pub const LOGGED_IN_KEY: &str = "isLoggedIn";

/// Save/load/clear the logged-in user.
///
/// Storage failures are logged and swallowed; callers observe them as an
/// absent session.
#[derive(Clone)]
pub struct SessionStore {
    kv: Arc<dyn KeyValueStore>,
}

impl SessionStore {
    /// Wrap a key-value backend.
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// Persist the record, its token and the logged-in flag.
    pub fn save(&self, user: &SessionRecord) {
        let serialized = match serde_json::to_string(user) {
            Ok(value) => value,
            Err(err) => {
                warn!(?err, "failed to serialise session record");
                return;
            }
        };
        let token = user.token.as_deref().unwrap_or_default();
        let writes = [
            (USER_KEY, serialized.as_str()),
            (TOKEN_KEY, token),
            (LOGGED_IN_KEY, "true"),
        ];
        for (key, value) in writes {
            if let Err(err) = self.kv.set(key, value) {
                warn!(key, %err, "failed to persist session value");
            }
        }
        debug!(user_id = %user.user_id, "session saved");
    }

    /// The stored record, or `None` when absent or unreadable.
    pub fn get(&self) -> Option<SessionRecord> {
        let raw = match self.kv.get(USER_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                warn!(%err, "failed to read session record");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(record) => Some(record),
            Err(err) => {
                warn!(%err, "stored session record is unreadable");
                None
            }
        }
    }

    /// Reads the persisted flag only; token presence is not re-checked.
    pub fn is_logged_in(&self) -> bool {
        match self.kv.get(LOGGED_IN_KEY) {
            Ok(flag) => flag.as_deref() == Some("true"),
            Err(err) => {
                warn!(%err, "failed to read login flag");
                false
            }
        }
    }

    /// Stored bearer token, `None` when missing or empty.
    pub fn token(&self) -> Option<String> {
        match self.kv.get(TOKEN_KEY) {
            Ok(token) => token.filter(|value| !value.is_empty()),
            Err(err) => {
                warn!(%err, "failed to read token");
                None
            }
        }
    }

    /// Remove every session key. Safe to call repeatedly.
    pub fn logout(&self) {
        for key in [USER_KEY, TOKEN_KEY, LOGGED_IN_KEY] {
            if let Err(err) = self.kv.remove(key) {
                warn!(key, %err, "failed to clear session value");
            }
        }
        debug!("session cleared");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{FileStore, MemoryStore, StorageError};
    use tempfile::tempdir;

    fn sample_record() -> SessionRecord {
        SessionRecord {
            user_id: "u-17".to_string(),
            name: "Lakshmi Rao".to_string(),
            contact: Some("9876501234".to_string()),
            token: Some("tok-1".to_string()),
            role: Some("farmer".to_string()),
            village: Some("Kolar".to_string()),
            taluka: None,
            district: Some("Kolar".to_string()),
            state: Some("Karnataka".to_string()),
            pincode: Some("563101".to_string()),
        }
    }

    #[test]
    fn save_then_get_returns_identical_record() {
        let store = SessionStore::new(Arc::new(MemoryStore::new()));
        let record = sample_record();
        store.save(&record);

        assert_eq!(store.get(), Some(record));
        assert!(store.is_logged_in());
        assert_eq!(store.token().as_deref(), Some("tok-1"));
    }

    #[test]
    fn missing_token_is_stored_as_empty() {
        let kv = Arc::new(MemoryStore::new());
        let store = SessionStore::new(kv.clone());
        let mut record = sample_record();
        record.token = None;
        store.save(&record);

        assert_eq!(kv.get(TOKEN_KEY).unwrap().as_deref(), Some(""));
        assert_eq!(store.token(), None);
        assert!(store.is_logged_in());
    }

    #[test]
    fn logout_twice_matches_logout_once() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("session.json");
        let store = SessionStore::new(Arc::new(FileStore::new(&path)));
        store.save(&sample_record());

        store.logout();
        let once = std::fs::read_to_string(&path)?;
        store.logout();
        let twice = std::fs::read_to_string(&path)?;

        assert_eq!(once, twice);
        assert!(!store.is_logged_in());
        assert_eq!(store.get(), None);
        assert_eq!(store.token(), None);
        Ok(())
    }

    #[test]
    fn unreadable_record_reads_as_absent() {
        let kv = Arc::new(MemoryStore::new());
        kv.set(USER_KEY, "{broken").unwrap();
        let store = SessionStore::new(kv);
        assert_eq!(store.get(), None);
    }

    struct FailingStore;

    impl KeyValueStore for FailingStore {
        fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
            Err(StorageError::Io {
                path: "session.json".into(),
                source: std::io::Error::other("disk full"),
            })
        }

        fn set(&self, key: &str, _value: &str) -> Result<(), StorageError> {
            self.get(key).map(|_| ())
        }

        fn remove(&self, key: &str) -> Result<(), StorageError> {
            self.get(key).map(|_| ())
        }
    }

    #[test]
    fn storage_failures_degrade_to_logged_out() {
        let store = SessionStore::new(Arc::new(FailingStore));
        store.save(&sample_record());
        store.logout();
        assert!(!store.is_logged_in());
        assert_eq!(store.get(), None);
    }
}
