use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKey {
    /// Debounced save after the latest edit.
    Save,
    /// Short-fuse save right after a single cell edit.
    SaveImmediate,
    LoadPeriod,
    StatusReset,
}

/// One pending timer per key. Scheduling a key replaces its previous timer.
///
/// Only the wait is cancellable: once the delay elapses the operation is
/// spawned on its own, so aborting a key never interrupts a store call that
/// is already in flight.
#[derive(Debug, Default)]
pub struct TaskScheduler {
    timers: HashMap<TaskKey, JoinHandle<()>>,
}

impl TaskScheduler {
    pub fn schedule<F>(&mut self, key: TaskKey, delay: Duration, op: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.cancel(key);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            tokio::spawn(op);
        });
        self.timers.insert(key, handle);
    }

    /// Returns true if a timer was still waiting.
    pub fn cancel(&mut self, key: TaskKey) -> bool {
        match self.timers.remove(&key) {
            Some(handle) => {
                let waiting = !handle.is_finished();
                handle.abort();
                if waiting {
                    log::debug!("cancelled pending {key:?}");
                }
                waiting
            }
            None => false,
        }
    }

    pub fn cancel_all(&mut self) {
        let keys: Vec<TaskKey> = self.timers.keys().copied().collect();
        for key in keys {
            self.cancel(key);
        }
    }

    pub fn is_pending(&self, key: TaskKey) -> bool {
        self.timers.get(&key).is_some_and(|h| !h.is_finished())
    }
}

impl Drop for TaskScheduler {
    fn drop(&mut self) {
        for handle in self.timers.values() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    fn counter_op(counter: &Arc<AtomicUsize>) -> impl Future<Output = ()> + Send + 'static {
        let counter = Arc::clone(counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_after_delay() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut tasks = TaskScheduler::default();
        tasks.schedule(TaskKey::Save, ms(100), counter_op(&counter));
        assert!(tasks.is_pending(TaskKey::Save));

        tokio::time::sleep(ms(50)).await;
        settle().await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        tokio::time::sleep(ms(60)).await;
        settle().await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(!tasks.is_pending(TaskKey::Save));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reschedule_replaces_previous_timer() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut tasks = TaskScheduler::default();
        tasks.schedule(TaskKey::Save, ms(100), counter_op(&counter));
        tokio::time::sleep(ms(80)).await;
        tasks.schedule(TaskKey::Save, ms(100), counter_op(&counter));
        tokio::time::sleep(ms(80)).await;
        settle().await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        tokio::time::sleep(ms(30)).await;
        settle().await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_keys_are_independent() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut tasks = TaskScheduler::default();
        tasks.schedule(TaskKey::Save, ms(100), counter_op(&counter));
        tasks.schedule(TaskKey::SaveImmediate, ms(10), counter_op(&counter));
        assert!(tasks.cancel(TaskKey::Save));
        tokio::time::sleep(ms(200)).await;
        settle().await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_does_not_interrupt_running_op() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut tasks = TaskScheduler::default();
        let slow = {
            let counter = Arc::clone(&counter);
            async move {
                tokio::time::sleep(ms(500)).await;
                counter.fetch_add(1, Ordering::SeqCst);
            }
        };
        tasks.schedule(TaskKey::Save, ms(10), slow);
        tokio::time::sleep(ms(20)).await;
        settle().await;
        assert!(!tasks.cancel(TaskKey::Save));
        tokio::time::sleep(ms(600)).await;
        settle().await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_all() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut tasks = TaskScheduler::default();
        tasks.schedule(TaskKey::Save, ms(10), counter_op(&counter));
        tasks.schedule(TaskKey::LoadPeriod, ms(10), counter_op(&counter));
        tasks.cancel_all();
        tokio::time::sleep(ms(50)).await;
        settle().await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }
}
