//! TTL Cleanup Task
//!
//! Background task that periodically removes expired cache entries.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::cache::{deadline_after, FAR_FUTURE};
use crate::error::{CacheError, Result};

// == Sweep ==
/// Something the cleaner can sweep. Implementations visit their shards in
/// index order against the single `now` they are given.
pub trait Sweep: Send + Sync + 'static {
    /// Removes every entry whose deadline is at or before `now`.
    ///
    /// Returns the number of entries removed.
    fn sweep_expired(&self, now: Instant) -> usize;
}

// == Cleaner ==
/// Handle to the background sweep task.
///
/// Dropping the handle stops the task.
#[derive(Debug)]
pub struct Cleaner {
    stop_tx: watch::Sender<bool>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Cleaner {
    /// Spawns a task that sweeps `target` once per `interval`.
    ///
    /// The first sweep happens one full interval after spawning. A sweep that
    /// overruns its slot delays the next tick instead of bursting. Intervals
    /// longer than `FAR_FUTURE` are capped to it.
    ///
    /// # Errors
    /// `CacheError::MissingRuntime` when called outside a tokio runtime.
    pub fn spawn(target: Arc<dyn Sweep>, interval: Duration) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|_| CacheError::MissingRuntime)?;
        let (stop_tx, mut stop_rx) = watch::channel(false);

        let handle = runtime.spawn(async move {
            info!(
                "Starting TTL cleanup task with interval of {:?}",
                interval
            );

            let period = interval.min(FAR_FUTURE);
            let mut ticker = time::interval_at(deadline_after(Instant::now(), period), period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    // Err means every sender is gone
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                    }
                    _ = ticker.tick() => {
                        // One snapshot per pass so all shards agree on "now"
                        let removed = target.sweep_expired(Instant::now());

                        if removed > 0 {
                            info!("TTL cleanup: removed {} expired entries", removed);
                        } else {
                            debug!("TTL cleanup: no expired entries found");
                        }
                    }
                }
            }

            info!("TTL cleanup task stopped");
        });

        Ok(Self {
            stop_tx,
            handle: Mutex::new(Some(handle)),
        })
    }

    // == Stop ==
    /// Signals the task to exit. A sweep already running finishes first; no
    /// sweep starts afterwards. Idempotent.
    pub fn stop(&self) {
        self.stop_tx.send_replace(true);
    }

    pub fn is_stopped(&self) -> bool {
        *self.stop_tx.borrow()
    }

    // == Join ==
    /// Stops the task and waits for it to exit.
    pub async fn join(&self) {
        self.stop();
        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            // A cancelled or panicked task has exited either way.
            let _ = handle.await;
        }
    }

    /// True once the task has exited.
    pub fn is_finished(&self) -> bool {
        self.handle
            .lock()
            .as_ref()
            .map_or(true, |handle| handle.is_finished())
    }
}

impl Drop for Cleaner {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Records every sweep timestamp.
    #[derive(Default)]
    struct Recorder {
        sweeps: Mutex<Vec<Instant>>,
        removed_per_sweep: AtomicUsize,
    }

    impl Sweep for Recorder {
        fn sweep_expired(&self, now: Instant) -> usize {
            self.sweeps.lock().push(now);
            self.removed_per_sweep.load(Ordering::Relaxed)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleaner_sweeps_once_per_interval() {
        let recorder = Arc::new(Recorder::default());
        let start = Instant::now();
        let cleaner = Cleaner::spawn(recorder.clone(), Duration::from_secs(10)).unwrap();

        time::sleep(Duration::from_secs(35)).await;

        let sweeps = recorder.sweeps.lock().clone();
        assert_eq!(sweeps.len(), 3);
        for (i, at) in sweeps.iter().enumerate() {
            let expected = Duration::from_secs(10 * (i as u64 + 1));
            let elapsed = *at - start;
            // Timer wheel resolution is one millisecond
            assert!(
                elapsed >= expected && elapsed < expected + Duration::from_millis(5),
                "sweep {} ran at {:?}",
                i,
                elapsed
            );
        }

        cleaner.join().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleaner_stop_prevents_further_sweeps() {
        let recorder = Arc::new(Recorder::default());
        recorder.removed_per_sweep.store(1, Ordering::Relaxed);
        let cleaner = Cleaner::spawn(recorder.clone(), Duration::from_secs(10)).unwrap();

        time::sleep(Duration::from_secs(15)).await;
        assert_eq!(recorder.sweeps.lock().len(), 1);

        cleaner.join().await;
        assert!(cleaner.is_stopped());
        assert!(cleaner.is_finished());

        time::sleep(Duration::from_secs(60)).await;
        assert_eq!(recorder.sweeps.lock().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleaner_drop_stops_task() {
        let recorder = Arc::new(Recorder::default());
        let cleaner = Cleaner::spawn(recorder.clone(), Duration::from_secs(1)).unwrap();

        drop(cleaner);

        time::sleep(Duration::from_secs(10)).await;
        assert!(recorder.sweeps.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleaner_accepts_maximal_interval() {
        let recorder = Arc::new(Recorder::default());
        let cleaner = Cleaner::spawn(recorder.clone(), Duration::MAX).unwrap();

        time::sleep(Duration::from_secs(3600)).await;

        // The task is parked on its timer rather than dead from an overflow
        assert!(!cleaner.is_finished());
        assert!(recorder.sweeps.lock().is_empty());

        cleaner.join().await;
        assert!(cleaner.is_finished());
    }

    #[test]
    fn test_cleaner_requires_runtime() {
        let recorder = Arc::new(Recorder::default());
        let result = Cleaner::spawn(recorder, Duration::from_secs(1));
        assert!(matches!(result, Err(CacheError::MissingRuntime)));
    }
}
