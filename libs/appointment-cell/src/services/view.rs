// libs/appointment-cell/src/services/view.rs
use std::future::Future;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use tokio::task::{AbortHandle, JoinHandle};
use tracing::debug;

#[derive(Default)]
struct ScopeTasks {
    closed: bool,
    handles: Vec<AbortHandle>,
}

/// Delayed work tied to the lifetime of one view (a wizard page, a chat panel).
///
/// Tearing the scope down, explicitly or by dropping it, aborts everything still
/// pending so a late completion never lands on state the view no longer owns.
pub struct ViewScope {
    name: String,
    tasks: Mutex<ScopeTasks>,
}

impl ViewScope {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tasks: Mutex::new(ScopeTasks::default()),
        }
    }

    /// Runs `task` after `delay` unless the scope is torn down first.
    /// Returns `None` when the scope is already closed.
    pub fn spawn_after<F>(&self, delay: Duration, task: F) -> Option<JoinHandle<()>>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        // Registration and the closed check share one critical section with teardown
        let mut tasks = self.lock_tasks();
        if tasks.closed {
            debug!("View {} is closed, dropping delayed task", self.name);
            return None;
        }

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            task.await;
        });

        tasks.handles.retain(|t| !t.is_finished());
        tasks.handles.push(handle.abort_handle());

        Some(handle)
    }

    /// Number of delayed tasks that have neither run nor been cancelled.
    pub fn pending(&self) -> usize {
        self.lock_tasks().handles.iter().filter(|t| !t.is_finished()).count()
    }

    pub fn is_closed(&self) -> bool {
        self.lock_tasks().closed
    }

    pub fn teardown(&self) {
        let handles = {
            let mut tasks = self.lock_tasks();
            if tasks.closed {
                return;
            }
            tasks.closed = true;
            std::mem::take(&mut tasks.handles)
        };

        debug!("Tearing down view {}, cancelling {} tasks", self.name, handles.len());
        for handle in handles {
            handle.abort();
        }
    }

    fn lock_tasks(&self) -> MutexGuard<'_, ScopeTasks> {
        self.tasks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for ViewScope {
    fn drop(&mut self) {
        self.teardown();
    }
}
