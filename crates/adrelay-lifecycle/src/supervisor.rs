// SPDX-FileCopyrightText: 2026 Adrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Supervised fixed-interval background loops.
//!
//! Each cycle runs in its own spawned task. A panic inside a cycle surfaces
//! as a `JoinError`, gets logged and counted, and the loop carries on at the
//! next tick. Cancellation is observed only between cycles, so a cycle that
//! has started always finishes its writes.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use adrelay_core::AdrelayError;

use crate::metrics;

/// A unit of periodic background work.
#[async_trait]
pub trait CycleTask: Send + Sync + 'static {
    /// Short name used in logs and metric labels.
    fn name(&self) -> &'static str;

    /// Run one cycle. Errors are logged by the caller and never stop the loop.
    async fn run_cycle(&self) -> Result<(), AdrelayError>;
}

/// Run `task` every `period` until `cancel` fires.
///
/// The first cycle starts immediately. Ticks missed while a cycle runs are
/// delayed rather than bunched, so cycles never overlap.
pub fn spawn_periodic(
    task: Arc<dyn CycleTask>,
    period: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let name = task.name();
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(task = name, period_secs = period.as_secs(), "background task started");

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!(task = name, "background task shutting down");
                    break;
                }
                _ = interval.tick() => {}
            }

            let cycle = Arc::clone(&task);
            match tokio::spawn(async move { cycle.run_cycle().await }).await {
                Ok(Ok(())) => debug!(task = name, "cycle complete"),
                Ok(Err(e)) => warn!(task = name, error = %e, "cycle failed (non-fatal)"),
                Err(e) if e.is_panic() => {
                    metrics::record_task_panic(name);
                    error!(task = name, error = %e, "cycle panicked, continuing on next tick");
                }
                Err(e) => warn!(task = name, error = %e, "cycle aborted"),
            }
        }
    })
}

/// Owns the background loops and joins them at shutdown.
pub struct Supervisor {
    cancel: CancellationToken,
    handles: Vec<(&'static str, JoinHandle<()>)>,
}

impl Supervisor {
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            handles: Vec::new(),
        }
    }

    pub fn spawn(&mut self, task: Arc<dyn CycleTask>, period: Duration) {
        let name = task.name();
        let handle = spawn_periodic(task, period, self.cancel.clone());
        self.handles.push((name, handle));
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Wait for every loop to exit. Call after the token is cancelled.
    pub async fn join_all(self) {
        for (name, handle) in self.handles {
            if let Err(e) = handle.await {
                error!(task = name, error = %e, "background task ended abnormally");
            }
        }
        debug!("all background tasks joined");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        runs: AtomicUsize,
        panic_on: Option<usize>,
    }

    #[async_trait]
    impl CycleTask for Counting {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn run_cycle(&self) -> Result<(), AdrelayError> {
            let run = self.runs.fetch_add(1, Ordering::SeqCst) + 1;
            if self.panic_on == Some(run) {
                panic!("cycle {run} blew up");
            }
            if run % 2 == 0 {
                return Err(AdrelayError::Internal("even cycle".into()));
            }
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn loop_survives_errors_and_panics() {
        let task = Arc::new(Counting {
            runs: AtomicUsize::new(0),
            panic_on: Some(3),
        });
        let cancel = CancellationToken::new();
        let handle = spawn_periodic(task.clone(), Duration::from_secs(10), cancel.clone());

        tokio::time::sleep(Duration::from_secs(45)).await;
        cancel.cancel();
        handle.await.unwrap();

        assert_eq!(task.runs.load(Ordering::SeqCst), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn supervisor_joins_after_cancel() {
        let cancel = CancellationToken::new();
        let mut supervisor = Supervisor::new(cancel.clone());
        let task = Arc::new(Counting {
            runs: AtomicUsize::new(0),
            panic_on: None,
        });
        supervisor.spawn(task.clone(), Duration::from_secs(60));
        supervisor.spawn(task.clone(), Duration::from_secs(60));
        assert_eq!(supervisor.len(), 2);

        tokio::time::sleep(Duration::from_secs(1)).await;
        cancel.cancel();
        supervisor.join_all().await;

        assert_eq!(task.runs.load(Ordering::SeqCst), 2);
    }
}
