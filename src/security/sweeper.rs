//! Background purge of stale entries from the in-memory stores.
//!
//! The stores already reject dead entries on read; the sweeper only bounds
//! memory for keys that are never presented again. It is started and stopped
//! by the server, never at construction time, so tests can build stores
//! without timers running behind their back.

use std::sync::Arc;
use std::time::Duration;
use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{interval, MissedTickBehavior},
};
use tracing::{debug, error, trace};

/// A store that can drop its own expired entries.
pub trait Sweep: Send + Sync {
    fn name(&self) -> &'static str;

    /// Remove expired entries, returning how many went away, or `None` when
    /// the cycle was skipped.
    fn sweep_expired(&self) -> Option<usize>;
}

struct SweepJob {
    target: Arc<dyn Sweep>,
    every: Duration,
}

#[derive(Default)]
pub struct Sweeper {
    jobs: Vec<SweepJob>,
}

impl Sweeper {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_job(mut self, target: Arc<dyn Sweep>, every: Duration) -> Self {
        self.jobs.push(SweepJob {
            target,
            every: every.max(Duration::from_millis(1)),
        });
        self
    }

    /// Spawn one task per job on the current tokio runtime.
    #[must_use]
    pub fn start(self) -> SweeperHandle {
        let (stop, _) = watch::channel(false);
        let tasks = self
            .jobs
            .into_iter()
            .map(|job| {
                debug!(store = job.target.name(), every = ?job.every, "Starting sweeper");
                tokio::spawn(run(job, stop.subscribe()))
            })
            .collect();

        SweeperHandle { stop, tasks }
    }
}

/// Owns the sweeper tasks. Dropping it without calling
/// [`shutdown`](Self::shutdown) also stops them, just without waiting.
pub struct SweeperHandle {
    stop: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl SweeperHandle {
    pub async fn shutdown(self) {
        let _ = self.stop.send(true);
        for task in self.tasks {
            if let Err(err) = task.await {
                error!("Sweeper task failed: {err}");
            }
        }
        debug!("Sweepers stopped");
    }
}

async fn run(job: SweepJob, mut stop: watch::Receiver<bool>) {
    let mut ticker = interval(job.every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick fires immediately; nothing can be stale yet.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => sweep_once(job.target.as_ref()),
            changed = stop.changed() => {
                if changed.is_err() || *stop.borrow() {
                    break;
                }
            }
        }
    }
}

fn sweep_once(target: &dyn Sweep) {
    match target.sweep_expired() {
        Some(0) => trace!(store = target.name(), "Nothing to sweep"),
        Some(removed) => debug!(store = target.name(), removed, "Swept expired entries"),
        None => trace!(store = target.name(), "Sweep cycle skipped"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::sleep;

    #[derive(Default)]
    struct CountingStore {
        calls: AtomicUsize,
    }

    impl Sweep for CountingStore {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn sweep_expired(&self) -> Option<usize> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Some(1)
        }
    }

    #[tokio::test]
    async fn sweeps_on_schedule_until_shutdown() {
        let store = Arc::new(CountingStore::default());
        let handle = Sweeper::new()
            .with_job(store.clone(), Duration::from_millis(10))
            .start();

        sleep(Duration::from_millis(80)).await;
        handle.shutdown().await;

        let calls = store.calls.load(Ordering::SeqCst);
        assert!(calls >= 2, "expected several sweeps, got {calls}");

        sleep(Duration::from_millis(40)).await;
        assert_eq!(store.calls.load(Ordering::SeqCst), calls);
    }

    #[tokio::test]
    async fn dropping_the_handle_stops_tasks() {
        let store = Arc::new(CountingStore::default());
        let handle = Sweeper::new()
            .with_job(store.clone(), Duration::from_millis(10))
            .start();
        drop(handle);

        sleep(Duration::from_millis(30)).await;
        let calls = store.calls.load(Ordering::SeqCst);
        sleep(Duration::from_millis(40)).await;
        assert_eq!(store.calls.load(Ordering::SeqCst), calls);
    }

    #[tokio::test]
    async fn no_jobs_is_fine() {
        Sweeper::new().start().shutdown().await;
    }
}
