// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Worker scheduler.
//!
//! Runs each registered [`Worker`] on its own fixed-interval timer. Every
//! tick first consults leader election; non-leaders skip the reconcile but
//! keep the timer armed so they take over on the tick after promotion.
//! Reconcile errors are logged and counted, never fatal: the next tick
//! retries naturally, giving at-least-once eventually-consistent
//! convergence.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::metrics;
use crate::workers::Worker;
use crate::workers::leader::LeaderElection;

struct Registration {
    worker: Arc<dyn Worker>,
    interval: Duration,
}

/// Collects workers before the scheduler starts.
pub struct Scheduler {
    leader: Arc<dyn LeaderElection>,
    registrations: Vec<Registration>,
}

impl Scheduler {
    /// Create a scheduler gated on the given leader election.
    pub fn new(leader: Arc<dyn LeaderElection>) -> Self {
        metrics::register_metrics();
        Self {
            leader,
            registrations: Vec::new(),
        }
    }

    /// Register a worker with its poll interval.
    pub fn register(&mut self, worker: Arc<dyn Worker>, interval: Duration) {
        self.registrations.push(Registration { worker, interval });
    }

    /// Spawn one timer loop per registered worker.
    pub fn start(self) -> SchedulerHandle {
        let mut entries = Vec::with_capacity(self.registrations.len());

        for registration in self.registrations {
            let shutdown = Arc::new(Notify::new());
            let worker_type = registration.worker.worker_type();
            let handle = tokio::spawn(run_worker_loop(
                registration.worker,
                registration.interval,
                self.leader.clone(),
                shutdown.clone(),
            ));
            entries.push(WorkerEntry {
                worker_type,
                shutdown,
                handle,
            });
        }

        info!(workers = entries.len(), "scheduler started");
        SchedulerHandle { entries }
    }
}

struct WorkerEntry {
    worker_type: &'static str,
    shutdown: Arc<Notify>,
    handle: JoinHandle<()>,
}

/// Handle over the running worker loops.
pub struct SchedulerHandle {
    entries: Vec<WorkerEntry>,
}

impl SchedulerHandle {
    /// Gracefully stop all workers.
    ///
    /// Signals every loop, waits for in-flight reconcile batches to finish
    /// (cooperative cancellation - no mid-record interruption), and resets
    /// each worker type's metrics so scraped leader gauges do not go stale.
    pub async fn shutdown(self) {
        for entry in &self.entries {
            entry.shutdown.notify_one();
        }
        for entry in self.entries {
            if let Err(e) = entry.handle.await {
                warn!(worker_type = entry.worker_type, error = %e, "worker task panicked");
            }
            metrics::reset_worker_metrics(entry.worker_type);
        }
        info!("scheduler stopped");
    }

    /// True while every worker loop is still running.
    pub fn is_running(&self) -> bool {
        self.entries.iter().all(|entry| !entry.handle.is_finished())
    }
}

async fn run_worker_loop(
    worker: Arc<dyn Worker>,
    interval: Duration,
    leader: Arc<dyn LeaderElection>,
    shutdown: Arc<Notify>,
) {
    info!(
        worker_id = %worker.id(),
        worker_type = worker.worker_type(),
        interval_secs = interval.as_secs(),
        "worker started"
    );

    loop {
        tokio::select! {
            biased;

            _ = shutdown.notified() => {
                info!(worker_type = worker.worker_type(), "worker received shutdown signal");
                break;
            }

            _ = tokio::time::sleep(interval) => {
                if !leader.is_leader().await {
                    metrics::set_leader(worker.worker_type(), false);
                    debug!(worker_type = worker.worker_type(), "not leader, skipping reconcile");
                    continue;
                }
                metrics::set_leader(worker.worker_type(), true);

                let started = Instant::now();
                let errors = worker.reconcile().await;
                metrics::observe_reconcile(worker.worker_type(), started.elapsed(), errors.len());

                for error in &errors {
                    warn!(
                        worker_type = worker.worker_type(),
                        error = %error,
                        "reconcile error"
                    );
                }
            }
        }
    }

    info!(worker_type = worker.worker_type(), "worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workers::leader::StaticLeader;
    use armada_core::error::ServiceError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingWorker {
        id: String,
        ticks: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Worker for CountingWorker {
        fn id(&self) -> &str {
            &self.id
        }

        fn worker_type(&self) -> &'static str {
            "counting"
        }

        async fn reconcile(&self) -> Vec<ServiceError> {
            self.ticks.fetch_add(1, Ordering::SeqCst);
            Vec::new()
        }
    }

    #[tokio::test]
    async fn test_leader_runs_reconcile() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let mut scheduler = Scheduler::new(Arc::new(StaticLeader(true)));
        scheduler.register(
            Arc::new(CountingWorker {
                id: "w1".to_string(),
                ticks: ticks.clone(),
            }),
            Duration::from_millis(10),
        );

        let handle = scheduler.start();
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.shutdown().await;

        assert!(ticks.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    async fn test_standby_never_reconciles() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let mut scheduler = Scheduler::new(Arc::new(StaticLeader(false)));
        scheduler.register(
            Arc::new(CountingWorker {
                id: "w1".to_string(),
                ticks: ticks.clone(),
            }),
            Duration::from_millis(10),
        );

        let handle = scheduler.start();
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.shutdown().await;

        assert_eq!(ticks.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_shutdown_stops_loops() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let mut scheduler = Scheduler::new(Arc::new(StaticLeader(true)));
        scheduler.register(
            Arc::new(CountingWorker {
                id: "w1".to_string(),
                ticks: ticks.clone(),
            }),
            Duration::from_millis(10),
        );

        let handle = scheduler.start();
        assert!(handle.is_running());
        handle.shutdown().await;
    }
}
