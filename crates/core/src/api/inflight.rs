use std::{
    collections::HashMap,
    future::Future,
    sync::atomic::{AtomicU64, Ordering},
};

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::watch;
use tracing::debug;

use super::error::ApiError;

type Outcome = Option<Result<Value, ApiError>>;

/// Coalesces identical concurrent requests.
///
/// The first caller for a key performs the request; callers arriving while it
/// is in flight wait for and share its result. If the leading caller is
/// dropped before finishing, waiters fall back to issuing their own request.
#[derive(Default)]
pub struct InFlight {
    pending: Mutex<HashMap<String, (u64, watch::Receiver<Outcome>)>>,
    next_id: AtomicU64,
}

enum Role {
    Leader(u64, watch::Sender<Outcome>),
    Follower(watch::Receiver<Outcome>),
}

struct Cleanup<'a> {
    owner: &'a InFlight,
    key: &'a str,
    id: u64,
}

impl Drop for Cleanup<'_> {
    fn drop(&mut self) {
        let mut pending = self.owner.pending.lock();
        if pending.get(self.key).map(|(id, _)| *id) == Some(self.id) {
            pending.remove(self.key);
        }
    }
}

impl InFlight {
    /// Tracker with nothing in flight.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently being fetched.
    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    /// True when no request is in flight.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Run `fetch` unless an identical request is already in flight.
    pub async fn run<F, Fut>(&self, key: &str, fetch: F) -> Result<Value, ApiError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, ApiError>>,
    {
        let role = {
            let mut pending = self.pending.lock();
            match pending.get(key) {
                Some((_, rx)) => Role::Follower(rx.clone()),
                None => {
                    let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                    let (tx, rx) = watch::channel(None);
                    pending.insert(key.to_string(), (id, rx));
                    Role::Leader(id, tx)
                }
            }
        };

        match role {
            Role::Leader(id, tx) => {
                let _cleanup = Cleanup {
                    owner: self,
                    key,
                    id,
                };
                let result = fetch().await;
                tx.send_replace(Some(result.clone()));
                result
            }
            Role::Follower(mut rx) => {
                debug!(key, "joining in-flight request");
                loop {
                    let current = rx.borrow_and_update().clone();
                    if let Some(result) = current {
                        return result;
                    }
                    if rx.changed().await.is_err() {
                        break;
                    }
                }
                let last = rx.borrow().clone();
                match last {
                    Some(result) => result,
                    None => fetch().await,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc,
        },
        time::Duration,
    };

    #[tokio::test]
    async fn concurrent_identical_requests_share_one_fetch() {
        let inflight = Arc::new(InFlight::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let fetch = |calls: Arc<AtomicUsize>| async move {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(serde_json::json!({"crops": []}))
        };

        let (a, b) = tokio::join!(
            inflight.run("GET /crop/recent", || fetch(calls.clone())),
            inflight.run("GET /crop/recent", || fetch(calls.clone())),
        );

        assert_eq!(a, b);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(inflight.is_empty());
    }

    #[tokio::test]
    async fn distinct_keys_run_independently() {
        let inflight = InFlight::new();
        let calls = AtomicUsize::new(0);
        let fetch = || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(Value::Null)
        };
        let _ = tokio::join!(inflight.run("a", fetch), inflight.run("b", fetch));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn waiter_refetches_when_leader_is_cancelled() {
        let inflight = Arc::new(InFlight::new());
        let leader = {
            let inflight = inflight.clone();
            tokio::spawn(async move {
                inflight
                    .run("k", || async {
                        tokio::time::sleep(Duration::from_secs(60)).await;
                        Ok(Value::Bool(false))
                    })
                    .await
            })
        };
        while inflight.is_empty() {
            tokio::task::yield_now().await;
        }

        let waiter = {
            let inflight = inflight.clone();
            tokio::spawn(async move { inflight.run("k", || async { Ok(Value::Bool(true)) }).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        leader.abort();

        assert_eq!(waiter.await.unwrap(), Ok(Value::Bool(true)));
        assert!(inflight.is_empty());
    }
}
