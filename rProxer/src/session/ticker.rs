//! Cancellable periodic background tasks.

use std::future::Future;
use std::ops::ControlFlow;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

/// A background loop that can be (re)started and stopped.
///
/// The loop waits `first`, then runs its tick every `every` until the tick
/// breaks or the ticker is stopped or dropped.
#[derive(Debug)]
pub struct Ticker {
    name: &'static str,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Ticker {
    /// Create a stopped ticker.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            handle: Mutex::new(None),
        }
    }

    /// Start the loop, replacing a running one. Must be called within a tokio runtime.
    pub fn start<F, Fut>(&self, first: Duration, every: Duration, mut tick: F)
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ControlFlow<()>> + Send + 'static,
    {
        let name = self.name;
        let task = tokio::spawn(async move {
            tokio::time::sleep(first).await;
            loop {
                if tick().await.is_break() {
                    log::debug!("{name} ticker finished");
                    break;
                }
                tokio::time::sleep(every).await;
            }
        });

        if let Some(previous) = self.handle.lock().replace(task) {
            previous.abort();
        }
    }

    /// Stop the loop if it runs.
    pub fn stop(&self) {
        if let Some(task) = self.handle.lock().take() {
            task.abort();
        }
    }

    /// Check whether the loop is still running.
    pub fn is_running(&self) -> bool {
        self.handle
            .lock()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.stop();
    }
}
