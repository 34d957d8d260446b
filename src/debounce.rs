use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;

/// Quiet period before a debounced search runs.
pub const DEFAULT_DEBOUNCE_DELAY: Duration = Duration::from_millis(150);

/// Cancel-then-reschedule timer: each `schedule` aborts the pending run and
/// re-arms the delay, so at most one run happens per quiet window.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    pending: Option<JoinHandle<()>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Must be called from within a tokio runtime.
    pub fn schedule<F>(&mut self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        let delay = self.delay;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            task.await;
        }));
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE_DELAY)
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn recorder() -> Arc<Mutex<Vec<&'static str>>> {
        Arc::new(Mutex::new(Vec::new()))
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_schedules_collapse_into_the_last_one() {
        let runs = recorder();
        let mut debouncer = Debouncer::new(Duration::from_millis(150));
        for term in ["d", "do", "dom"] {
            let runs = runs.clone();
            debouncer.schedule(async move { runs.lock().unwrap().push(term) });
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        assert!(debouncer.is_pending());
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(*runs.lock().unwrap(), vec!["dom"]);
        assert!(!debouncer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn spaced_schedules_all_run() {
        let runs = recorder();
        let mut debouncer = Debouncer::new(Duration::from_millis(150));
        for term in ["a", "b"] {
            let runs = runs.clone();
            debouncer.schedule(async move { runs.lock().unwrap().push(term) });
            tokio::time::sleep(Duration::from_millis(300)).await;
        }
        assert_eq!(*runs.lock().unwrap(), vec!["a", "b"]);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_and_drop_stop_the_pending_run() {
        let runs = recorder();
        let mut debouncer = Debouncer::default();
        let r = runs.clone();
        debouncer.schedule(async move { r.lock().unwrap().push("cancelled") });
        debouncer.cancel();
        assert!(!debouncer.is_pending());

        let r = runs.clone();
        debouncer.schedule(async move { r.lock().unwrap().push("dropped") });
        drop(debouncer);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(runs.lock().unwrap().is_empty());
    }
}
