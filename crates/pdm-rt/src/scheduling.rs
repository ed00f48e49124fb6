//! ---
//! pdm_section: "12-runtime"
//! pdm_subsection: "module"
//! pdm_type: "source"
//! pdm_scope: "code"
//! pdm_description: "Fixed-period loop pacing and background task tracking."
//! pdm_version: "v0.1.0"
//! pdm_owner: "tbd"
//! ---
use std::future::Future;
use std::time::Duration;

use anyhow::{anyhow, Result};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

/// Async pacing for fixed-interval loops. Overruns push the schedule back
/// rather than bursting to catch up.
#[derive(Debug)]
pub struct RateLimiter {
    interval: tokio::time::Interval,
}

impl RateLimiter {
    /// First tick completes immediately.
    pub fn new(period: Duration) -> Self {
        Self::from_interval(tokio::time::interval(period))
    }

    /// First tick completes one full period from now.
    pub fn delayed(period: Duration) -> Self {
        Self::from_interval(tokio::time::interval_at(Instant::now() + period, period))
    }

    fn from_interval(mut interval: tokio::time::Interval) -> Self {
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { interval }
    }

    pub fn period(&self) -> Duration {
        self.interval.period()
    }

    pub async fn tick(&mut self) -> Instant {
        self.interval.tick().await
    }
}

/// Named background tasks joined together on shutdown.
#[derive(Debug, Default)]
pub struct TaskGroup {
    tasks: Vec<(String, JoinHandle<Result<()>>)>,
}

impl TaskGroup {
    pub fn spawn<F>(&mut self, name: impl Into<String>, fut: F)
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        let name = name.into();
        debug!(task = %name, "spawning background task");
        self.tasks.push((name, tokio::spawn(fut)));
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Wait for every task; the first failure is returned after all have finished.
    pub async fn join(self) -> Result<()> {
        let mut first_error = None;
        for (name, task) in self.tasks {
            let outcome = task
                .await
                .map_err(|err| anyhow!("task '{name}' join failure: {err}"))
                .and_then(|result| result.map_err(|err| err.context(format!("task '{name}' failed"))));
            if let Err(err) = outcome {
                first_error.get_or_insert(err);
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
