//! Fixed-cadence job runner with single-instance execution per job.
//!
//! Each job gets its own ticker task. A tick that arrives while the previous
//! run of the same job is still in flight is dropped, never queued. Different
//! jobs run independently and may overlap.

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobId {
    #[serde(rename = "realtime_processing")]
    Realtime,
    OptimizationAnalysis,
    EquipmentHealth,
    SampleData,
}

impl JobId {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobId::Realtime => "realtime_processing",
            JobId::OptimizationAnalysis => "optimization_analysis",
            JobId::EquipmentHealth => "equipment_health",
            JobId::SampleData => "sample_data",
        }
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[async_trait]
pub trait ScheduledJob: Send + Sync {
    fn id(&self) -> JobId;

    /// One run of the job body. Errors are logged by the scheduler and never
    /// interrupt the schedule.
    async fn run(&self) -> anyhow::Result<()>;
}

/// Counters for one job, readable while the scheduler runs
#[derive(Debug, Default)]
pub struct JobStats {
    started: AtomicU64,
    failed: AtomicU64,
    coalesced: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct JobStatsSnapshot {
    pub started: u64,
    pub failed: u64,
    pub coalesced: u64,
}

impl JobStats {
    pub fn snapshot(&self) -> JobStatsSnapshot {
        JobStatsSnapshot {
            started: self.started.load(Ordering::SeqCst),
            failed: self.failed.load(Ordering::SeqCst),
            coalesced: self.coalesced.load(Ordering::SeqCst),
        }
    }
}

/// Clears the in-flight flag when a run ends, including on panic
struct InFlightGuard(Arc<AtomicBool>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

struct JobEntry {
    job: Arc<dyn ScheduledJob>,
    every: Duration,
    stats: Arc<JobStats>,
}

#[derive(Default)]
pub struct Scheduler {
    jobs: Vec<JobEntry>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a job; its first run happens one `every` after start
    pub fn with_job(mut self, job: Arc<dyn ScheduledJob>, every: Duration) -> Self {
        self.jobs.push(JobEntry {
            job,
            every,
            stats: Arc::new(JobStats::default()),
        });
        self
    }

    pub fn start(self) -> SchedulerHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut tickers = JoinSet::new();
        let mut stats = Vec::with_capacity(self.jobs.len());

        for entry in self.jobs {
            info!(
                job = %entry.job.id(),
                interval_secs = entry.every.as_secs_f64(),
                "Scheduling job"
            );
            stats.push((entry.job.id(), entry.stats.clone()));
            tickers.spawn(run_ticker(entry, shutdown_rx.clone()));
        }

        info!(jobs = stats.len(), "Scheduler started");
        SchedulerHandle {
            shutdown_tx,
            tickers,
            stats,
        }
    }
}

/// Running scheduler, owned by the process entry point
pub struct SchedulerHandle {
    shutdown_tx: watch::Sender<bool>,
    tickers: JoinSet<()>,
    stats: Vec<(JobId, Arc<JobStats>)>,
}

impl SchedulerHandle {
    pub fn stats(&self) -> Vec<(JobId, JobStatsSnapshot)> {
        self.stats
            .iter()
            .map(|(id, stats)| (*id, stats.snapshot()))
            .collect()
    }

    pub fn stats_for(&self, id: JobId) -> Option<JobStatsSnapshot> {
        self.stats
            .iter()
            .find(|(job, _)| *job == id)
            .map(|(_, stats)| stats.snapshot())
    }

    /// Stop ticking and wait for every in-flight run to finish
    pub async fn shutdown(mut self) {
        info!("Scheduler shutting down");
        // Receivers only fail to get this if they already exited
        let _ = self.shutdown_tx.send(true);

        while let Some(result) = self.tickers.join_next().await {
            if let Err(e) = result {
                error!(error = %e, "Scheduler ticker task failed");
            }
        }
        info!("Scheduler stopped");
    }
}

async fn run_ticker(entry: JobEntry, mut shutdown: watch::Receiver<bool>) {
    let job_id = entry.job.id();
    let in_flight = Arc::new(AtomicBool::new(false));
    let mut runs: JoinSet<()> = JoinSet::new();

    let mut ticker = interval_at(Instant::now() + entry.every, entry.every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if in_flight
                    .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                    .is_err()
                {
                    entry.stats.coalesced.fetch_add(1, Ordering::SeqCst);
                    debug!(job = %job_id, "Previous run still in flight, tick coalesced");
                    continue;
                }

                let guard = InFlightGuard(in_flight.clone());
                let job = entry.job.clone();
                let stats = entry.stats.clone();
                runs.spawn(async move {
                    let _guard = guard;
                    execute(job.as_ref(), &stats).await;
                });
            }
            Some(result) = runs.join_next(), if !runs.is_empty() => {
                if let Err(e) = result {
                    stats_failed(&entry.stats);
                    error!(job = %job_id, error = %e, "Job run aborted");
                }
            }
            _ = shutdown.changed() => break,
        }
    }

    while let Some(result) = runs.join_next().await {
        if let Err(e) = result {
            stats_failed(&entry.stats);
            error!(job = %job_id, error = %e, "Job run aborted");
        }
    }
    debug!(job = %job_id, "Ticker stopped");
}

fn stats_failed(stats: &JobStats) {
    stats.failed.fetch_add(1, Ordering::SeqCst);
}

async fn execute(job: &dyn ScheduledJob, stats: &JobStats) {
    let job_id = job.id();
    stats.started.fetch_add(1, Ordering::SeqCst);
    let started = Instant::now();
    debug!(job = %job_id, "Job run started");

    let result = job.run().await;
    let duration_ms = started.elapsed().as_millis() as u64;

    match result {
        Ok(()) => info!(job = %job_id, duration_ms, "Job run completed"),
        Err(e) => {
            stats_failed(stats);
            error!(job = %job_id, duration_ms, error = %format!("{:#}", e), "Job run failed");
        }
    }
}
