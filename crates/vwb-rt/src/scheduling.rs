//! ---
//! vwb_section: "01-core-functionality"
//! vwb_subsection: "module"
//! vwb_type: "source"
//! vwb_scope: "code"
//! vwb_description: "Runtime helpers supporting the background simulators."
//! vwb_version: "v0.1.0"
//! vwb_owner: "tbd"
//! ---
use std::time::Duration;

use anyhow::Result;
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::debug;

/// Fixed-period ticker whose first tick fires one full period after creation.
///
/// Late ticks are delayed rather than bursted, so a stalled runtime never
/// produces a catch-up volley.
#[derive(Debug)]
pub struct PeriodicTicker {
    interval: Interval,
}

impl PeriodicTicker {
    pub fn new(period: Duration) -> Self {
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { interval }
    }

    pub async fn tick(&mut self) -> Instant {
        self.interval.tick().await
    }
}

/// Tracks spawned long-running tasks so they can be joined on shutdown.
#[derive(Debug, Default)]
pub struct TaskGroup {
    tasks: Vec<(&'static str, JoinHandle<Result<()>>)>,
}

impl TaskGroup {
    pub fn spawn<F>(&mut self, name: &'static str, fut: F)
    where
        F: std::future::Future<Output = Result<()>> + Send + 'static,
    {
        let handle = tokio::spawn(fut);
        self.tasks.push((name, handle));
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Await every task in spawn order, surfacing the first failure.
    pub async fn join(self) -> Result<()> {
        for (name, task) in self.tasks {
            task.await
                .map_err(|err| anyhow::anyhow!("task {name} join failure: {err}"))??;
            debug!(task = name, "task joined");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn first_tick_waits_a_full_period() {
        let start = Instant::now();
        let mut ticker = PeriodicTicker::new(Duration::from_secs(1));
        ticker.tick().await;
        assert_eq!(start.elapsed().as_secs(), 1);
        ticker.tick().await;
        assert_eq!(start.elapsed().as_secs(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn task_group_joins_all_tasks() {
        let counter = Arc::new(AtomicU32::new(0));
        let mut group = TaskGroup::default();
        for name in ["a", "b"] {
            let counter = Arc::clone(&counter);
            group.spawn(name, async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
        }
        assert_eq!(group.len(), 2);
        group.join().await.unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn task_group_surfaces_failures() {
        let mut group = TaskGroup::default();
        group.spawn("failing", async { Err(anyhow::anyhow!("boom")) });
        let err = group.join().await.unwrap_err();
        assert!(err.to_string().contains("boom"));
    }
}
