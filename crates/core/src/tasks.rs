//! Lifetime of background work started by a screen.

use std::future::Future;

use tokio::task::JoinHandle;
use tracing::debug;

/// Tasks owned by one screen; leaving the screen aborts whatever is still running
/// so late results never land on a screen that is gone.
#[derive(Debug, Default)]
pub struct ScreenTasks {
    owner: &'static str,
    handles: Vec<JoinHandle<()>>,
}

impl ScreenTasks {
    /// Empty set; `owner` labels the abort log line.
    pub fn new(owner: &'static str) -> Self {
        Self {
            owner,
            handles: Vec::new(),
        }
    }

    /// Spawn `future` on the current runtime and track it.
    pub fn spawn<F>(&mut self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.handles.retain(|handle| !handle.is_finished());
        self.handles.push(tokio::spawn(future));
    }

    /// Tasks that have not finished yet.
    pub fn active(&self) -> usize {
        self.handles
            .iter()
            .filter(|handle| !handle.is_finished())
            .count()
    }

    /// Abort every tracked task.
    pub fn abort_all(&mut self) {
        let running = self.active();
        if running > 0 {
            debug!(owner = self.owner, running, "aborting screen tasks");
        }
        for handle in self.handles.drain(..) {
            handle.abort();
        }
    }
}

impl Drop for ScreenTasks {
    fn drop(&mut self) {
        self.abort_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn dropping_aborts_pending_work() {
        let (tx, mut rx) = mpsc::channel::<&str>(4);
        {
            let mut tasks = ScreenTasks::new("crops");
            let tx = tx.clone();
            tasks.spawn(async move {
                tokio::time::sleep(Duration::from_millis(200)).await;
                let _ = tx.send("late").await;
            });
            assert_eq!(tasks.active(), 1);
        }
        drop(tx);
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn finished_tasks_are_pruned() {
        let (tx, mut rx) = mpsc::channel::<u8>(4);
        let mut tasks = ScreenTasks::new("home");
        let first = tx.clone();
        tasks.spawn(async move {
            let _ = first.send(1).await;
        });
        assert_eq!(rx.recv().await, Some(1));
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(tasks.active(), 0);

        tasks.spawn(async move {
            let _ = tx.send(2).await;
        });
        assert_eq!(rx.recv().await, Some(2));
        tasks.abort_all();
        assert_eq!(tasks.active(), 0);
    }
}
