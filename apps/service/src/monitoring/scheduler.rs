use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, info};

use super::executor::CheckExecutor;
use super::types::{ActiveCheck, CheckSet};

/// Start offsets that spread `count` checks evenly across one interval
pub fn stagger_offsets(interval: Duration, count: usize) -> Vec<Duration> {
    if count == 0 {
        return Vec::new();
    }
    let step = interval / count as u32;
    (0..count as u32).map(|i| step * i).collect()
}

/// Monitoring scheduler - drives every active check on its own cadence
pub struct MonitoringScheduler {
    executor: Arc<CheckExecutor>,
}

impl MonitoringScheduler {
    /// Create a new monitoring scheduler
    pub fn new(executor: Arc<CheckExecutor>) -> Self {
        Self { executor }
    }

    /// Schedule a single check for periodic probing.
    ///
    /// Every tick spawns the attempt as its own task, so a slow attempt never
    /// delays the next tick. Attempts may therefore overlap.
    pub fn schedule_check(
        &self,
        check: Arc<ActiveCheck>,
        start_offset: Duration,
        period: Duration,
    ) -> JoinHandle<()> {
        let executor = self.executor.clone();

        tokio::spawn(async move {
            let mut timer = interval_at(Instant::now() + start_offset, period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                timer.tick().await;

                let executor = executor.clone();
                let check = check.clone();
                tokio::spawn(async move {
                    // Outcome is already logged and recorded by the executor.
                    let _ = executor.run_check(&check).await;
                });
            }
        })
    }

    /// Schedule every check in a set with staggered first ticks
    pub fn schedule_checks(&self, set: &CheckSet) -> Vec<JoinHandle<()>> {
        stagger_offsets(set.interval, set.len())
            .into_iter()
            .zip(set.checks())
            .map(|(offset, check)| {
                debug!("Scheduling {} with offset {:?}", check.definition.name, offset);
                self.schedule_check(check.clone(), offset, set.interval)
            })
            .collect()
    }

    /// Drive the active set until the sending side of `checks` is dropped.
    ///
    /// A new value on the channel replaces the whole set: the old cadence tasks
    /// are stopped and the new set is scheduled from scratch. Attempts already
    /// in flight are separate tasks and run to completion.
    pub async fn run(&self, mut checks: watch::Receiver<Arc<CheckSet>>) {
        loop {
            let set = Arc::clone(&checks.borrow_and_update());
            if set.is_empty() {
                info!("Check set is empty, nothing to schedule");
            } else {
                info!("Scheduling {} checks every {:?}", set.len(), set.interval);
            }
            let handles = self.schedule_checks(&set);

            let changed = checks.changed().await;
            for handle in handles {
                handle.abort();
            }
            if changed.is_err() {
                info!("Check set source closed, scheduler stopping");
                break;
            }
        }
    }
}
