//! Liveness handles shared between a consumer and the task feeding it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;

/// Handle for one transcript-stream subscription. Cloned into every callback path; once
/// cancelled, late deliveries observe `is_active() == false` and are dropped.
#[derive(Clone, Debug)]
pub struct Subscription {
    active: Arc<AtomicBool>,
}

impl Default for Subscription {
    fn default() -> Self {
        Self::new()
    }
}

impl Subscription {
    pub fn new() -> Self {
        Self {
            active: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Returns true only for the call that actually cancelled.
    pub fn cancel(&self) -> bool {
        self.active.swap(false, Ordering::SeqCst)
    }
}

/// Signal side of a cooperative shutdown pair.
#[derive(Clone, Debug)]
pub struct ShutdownHandle {
    notify: Arc<Notify>,
}

impl ShutdownHandle {
    pub fn signal(&self) {
        self.notify.notify_one();
    }
}

/// Wait side of a cooperative shutdown pair; held by the spawned task.
#[derive(Clone, Debug)]
pub struct ShutdownListener {
    notify: Arc<Notify>,
}

impl ShutdownListener {
    pub fn new_pair() -> (ShutdownHandle, Self) {
        let notify = Arc::new(Notify::new());
        (
            ShutdownHandle {
                notify: notify.clone(),
            },
            ShutdownListener { notify },
        )
    }

    pub async fn wait(&self) {
        self.notify.notified().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn cancel_is_visible_to_clones() {
        let sub = Subscription::new();
        let late = sub.clone();
        assert!(late.is_active());
        assert!(sub.cancel());
        assert!(!sub.cancel());
        assert!(!late.is_active());
    }

    #[tokio::test]
    async fn listener_wakes_on_signal() {
        let (handle, listener) = ShutdownListener::new_pair();
        let task = tokio::spawn(async move { listener.wait().await });
        handle.signal();
        tokio::time::timeout(Duration::from_millis(100), task)
            .await
            .expect("listener should wake")
            .expect("task should not panic");
    }
}
