use crate::config::{SchedulerSettings, Settings};
use crate::database::postgres::PostgresManager;
use crate::indicators::config::{load_indicator_config, mapped_columns};
use crate::indicators::registry::IndicatorRegistry;
use crate::processor::job::BackgroundJob;
use crate::processor::pool::{WorkerPool, WorkerSupervisor};
use crate::processor::queue::JobQueue;
use crate::processor::router::{JobRouter, QuotesHandler};
use anyhow::{Context, Result};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Half the logical CPUs, at least one. The pipeline is CPU-bound numerical
/// work, so the default leaves headroom for the rest of the host.
pub fn default_parallel_workers() -> usize {
    (num_cpus::get() / 2).max(1)
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub max_parallel_workers: usize,
    pub tick_interval: Duration,
    pub shutdown_poll_interval: Duration,
    pub backup_path: PathBuf,
}

impl SchedulerConfig {
    /// Effective worker cap: CLI override, then configuration, then the CPU
    /// default.
    pub fn from_settings(settings: &SchedulerSettings, concurrency: Option<usize>) -> Self {
        let max_parallel_workers = concurrency
            .or(settings.parallel_processes)
            .unwrap_or_else(default_parallel_workers)
            .max(1);
        Self {
            max_parallel_workers,
            tick_interval: Duration::from_secs(settings.tick_interval_secs),
            shutdown_poll_interval: Duration::from_secs(settings.shutdown_poll_secs),
            backup_path: PathBuf::from(&settings.backup_file),
        }
    }
}

/// The background job scheduler: an unbounded FIFO fed by `submit`, drained
/// by a fixed-interval loop that dispatches to worker processes while the
/// live-worker count stays under the cap. Only states are running, stopping
/// (after `shutdown` is called) and stopped (once the drain finished).
pub struct TaskScheduler {
    queue: Arc<JobQueue>,
    supervisor: Arc<dyn WorkerSupervisor>,
    stop: Arc<AtomicBool>,
    config: SchedulerConfig,
    loop_task: Mutex<Option<JoinHandle<()>>>,
}

impl TaskScheduler {
    pub fn start(
        config: SchedulerConfig,
        router: Arc<JobRouter>,
        supervisor: Arc<dyn WorkerSupervisor>,
    ) -> Self {
        info!(
            "Using {} parallel processes to calculate indicators",
            config.max_parallel_workers
        );
        let queue = Arc::new(JobQueue::new());
        let stop = Arc::new(AtomicBool::new(false));
        let loop_task = tokio::spawn(run_loop(
            Arc::clone(&queue),
            router,
            Arc::clone(&supervisor),
            Arc::clone(&stop),
            config.clone(),
        ));
        Self {
            queue,
            supervisor,
            stop,
            config,
            loop_task: Mutex::new(Some(loop_task)),
        }
    }

    /// Append a job to the queue tail. Never blocks and never fails; safe to
    /// call from any concurrent context.
    pub fn submit(&self, job: BackgroundJob) {
        debug!(
            "Add job \"{}\" with data={} and id {}",
            job.table, job.data, job.uuid
        );
        self.queue.push(job);
        debug!("{} jobs in queue", self.queue.len());
    }

    pub fn queued_jobs(&self) -> usize {
        self.queue.len()
    }

    /// Restore jobs persisted by the previous run. Returns how many came
    /// back; a missing or unreadable backup restores none.
    pub fn load_persisted(&self) -> usize {
        self.queue.load_backup(&self.config.backup_path)
    }

    /// Stop the scheduling loop, wait for every live worker process to
    /// finish, then persist all never-dispatched jobs to the backup file.
    /// Jobs already handed to a worker are not captured here.
    pub async fn shutdown(&self) {
        info!("Scheduler shutdown requested");
        self.stop.store(true, Ordering::SeqCst);
        if let Some(task) = self.loop_task.lock().take() {
            task.abort();
        }
        loop {
            let live = self.supervisor.live_workers();
            if live == 0 {
                break;
            }
            info!("Wait for {live} worker processes to finish...");
            tokio::time::sleep(self.config.shutdown_poll_interval).await;
        }
        match self.queue.save_backup(&self.config.backup_path) {
            Ok(count) => info!(
                "Wrote {count} jobs to backup file \"{}\"",
                self.config.backup_path.display()
            ),
            Err(e) => error!("Unable to back up queued jobs: {e:#}"),
        }
    }
}

async fn run_loop(
    queue: Arc<JobQueue>,
    router: Arc<JobRouter>,
    supervisor: Arc<dyn WorkerSupervisor>,
    stop: Arc<AtomicBool>,
    config: SchedulerConfig,
) {
    let mut ticker = tokio::time::interval(config.tick_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let mut working_on_jobs = false;
    loop {
        ticker.tick().await;
        if stop.load(Ordering::SeqCst) {
            break;
        }

        // Admission control: release queued jobs while capacity lasts. The
        // count is re-sampled per dispatch; a failed dispatch is logged and
        // ends the burst until the next tick, never aborting the loop.
        while supervisor.live_workers() < config.max_parallel_workers {
            let Some(job) = queue.pop() else {
                break;
            };
            if let Err(e) = router.dispatch(&job) {
                error!("Error dispatching job {}: {e:#}", job.uuid);
                break;
            }
        }

        if !queue.is_empty() {
            working_on_jobs = true;
            info!(
                "Active processes={}, queue={}",
                supervisor.live_workers(),
                queue.len()
            );
        } else {
            if working_on_jobs {
                info!("All worker processes finished!");
            }
            working_on_jobs = false;
        }
    }
    info!("Scheduler loop ended");
}

/// Run the scheduler service in the foreground until interrupted: load and
/// validate configuration, bootstrap storage, restore persisted jobs and
/// hand control to the scheduling loop.
pub async fn start_scheduler(concurrency: Option<usize>) -> Result<()> {
    let settings = Settings::load()?;
    let registry = IndicatorRegistry::new();
    let entries = load_indicator_config(Path::new(&settings.indicators.config_file), &registry)
        .context("invalid indicator configuration")?;
    info!("Loaded {} indicator configuration entries", entries.len());

    // The scheduler itself only needs storage to bootstrap the schema; each
    // worker process opens its own connection.
    let db = PostgresManager::connect(&settings.postgres).await?;
    db.init_tables().await?;
    db.ensure_indicator_columns(&mapped_columns(&entries)).await?;
    drop(db);

    let pool = Arc::new(WorkerPool::new());
    let mut router = JobRouter::new();
    router.register("quotes", Box::new(QuotesHandler::new(Arc::clone(&pool))));

    let config = SchedulerConfig::from_settings(&settings.scheduler, concurrency);
    let scheduler = TaskScheduler::start(config, Arc::new(router), pool);
    let restored = scheduler.load_persisted();
    if restored > 0 {
        info!("Restored {restored} queued jobs from backup");
    }

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    scheduler.shutdown().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::job::BackgroundJob;
    use crate::processor::queue::JobQueue;
    use crate::processor::router::JobHandler;
    use std::sync::atomic::AtomicUsize;

    /// Pretends every dispatched worker keeps running forever.
    struct PinnedSupervisor(Arc<AtomicUsize>);

    impl WorkerSupervisor for PinnedSupervisor {
        fn live_workers(&self) -> usize {
            self.0.load(Ordering::SeqCst)
        }
    }

    /// Records dispatched security ids and counts them as live workers.
    struct RecordingHandler {
        dispatched: Mutex<Vec<i64>>,
        live: Arc<AtomicUsize>,
    }

    impl JobHandler for Arc<RecordingHandler> {
        fn handle(&self, job: &BackgroundJob) -> Result<()> {
            self.dispatched.lock().push(job.id1.unwrap_or_default());
            self.live.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn test_config(tick: Duration, backup: &Path) -> SchedulerConfig {
        SchedulerConfig {
            max_parallel_workers: 2,
            tick_interval: tick,
            shutdown_poll_interval: Duration::from_millis(10),
            backup_path: backup.to_path_buf(),
        }
    }

    fn recording_router(handler: &Arc<RecordingHandler>) -> Arc<JobRouter> {
        let mut router = JobRouter::new();
        router.register("quotes", Box::new(Arc::clone(handler)));
        Arc::new(router)
    }

    #[tokio::test]
    async fn live_worker_count_never_exceeds_the_cap() {
        let dir = tempfile::tempdir().unwrap();
        let live = Arc::new(AtomicUsize::new(0));
        let handler = Arc::new(RecordingHandler {
            dispatched: Mutex::new(Vec::new()),
            live: Arc::clone(&live),
        });
        let supervisor = Arc::new(PinnedSupervisor(Arc::clone(&live)));

        let scheduler = TaskScheduler::start(
            test_config(Duration::from_millis(20), &dir.path().join("jobs.json")),
            recording_router(&handler),
            supervisor,
        );
        for id in 1..=5 {
            scheduler.submit(BackgroundJob::for_quotes(id));
        }
        tokio::time::sleep(Duration::from_millis(200)).await;

        // Workers never finish, so only the cap's worth of jobs may go out.
        assert_eq!(handler.dispatched.lock().as_slice(), &[1, 2]);
        assert_eq!(scheduler.queued_jobs(), 3);
        scheduler.shutdown_loop_only_for_test();
    }

    #[tokio::test]
    async fn dispatches_in_fifo_order_as_capacity_frees() {
        let dir = tempfile::tempdir().unwrap();
        let handler = Arc::new(RecordingHandler {
            dispatched: Mutex::new(Vec::new()),
            // Never incremented through this supervisor, so capacity is
            // always available.
            live: Arc::new(AtomicUsize::new(0)),
        });
        let supervisor = Arc::new(PinnedSupervisor(Arc::new(AtomicUsize::new(0))));

        let scheduler = TaskScheduler::start(
            test_config(Duration::from_millis(20), &dir.path().join("jobs.json")),
            recording_router(&handler),
            supervisor,
        );
        for id in 1..=5 {
            scheduler.submit(BackgroundJob::for_quotes(id));
        }
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(handler.dispatched.lock().as_slice(), &[1, 2, 3, 4, 5]);
        assert_eq!(scheduler.queued_jobs(), 0);
        scheduler.shutdown_loop_only_for_test();
    }

    #[tokio::test]
    async fn shutdown_persists_never_dispatched_jobs_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let backup = dir.path().join("jobs.json");
        let handler = Arc::new(RecordingHandler {
            dispatched: Mutex::new(Vec::new()),
            live: Arc::new(AtomicUsize::new(0)),
        });
        let supervisor = Arc::new(PinnedSupervisor(Arc::new(AtomicUsize::new(0))));

        // A long tick keeps the loop from dispatching after its first pass.
        let scheduler = TaskScheduler::start(
            test_config(Duration::from_secs(3600), &backup),
            recording_router(&handler),
            supervisor,
        );
        tokio::time::sleep(Duration::from_millis(50)).await;

        let jobs: Vec<BackgroundJob> = (1..=3).map(BackgroundJob::for_quotes).collect();
        for job in &jobs {
            scheduler.submit(job.clone());
        }
        scheduler.shutdown().await;
        assert!(handler.dispatched.lock().is_empty());

        // A fresh queue restores all three jobs with identical fields.
        let restored = JobQueue::new();
        assert_eq!(restored.load_backup(&backup), 3);
        for job in &jobs {
            assert_eq!(&restored.pop().unwrap(), job);
        }
    }

    #[tokio::test]
    async fn load_persisted_restores_into_the_running_queue() {
        let dir = tempfile::tempdir().unwrap();
        let backup = dir.path().join("jobs.json");

        let seed = JobQueue::new();
        seed.push(BackgroundJob::for_quotes(7));
        seed.save_backup(&backup).unwrap();

        let handler = Arc::new(RecordingHandler {
            dispatched: Mutex::new(Vec::new()),
            live: Arc::new(AtomicUsize::new(0)),
        });
        let supervisor = Arc::new(PinnedSupervisor(Arc::new(AtomicUsize::new(0))));
        let scheduler = TaskScheduler::start(
            test_config(Duration::from_secs(3600), &backup),
            recording_router(&handler),
            supervisor,
        );
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(scheduler.load_persisted(), 1);
        assert_eq!(scheduler.queued_jobs(), 1);
        scheduler.shutdown_loop_only_for_test();
    }

    impl TaskScheduler {
        fn shutdown_loop_only_for_test(&self) {
            self.stop.store(true, Ordering::SeqCst);
            if let Some(task) = self.loop_task.lock().take() {
                task.abort();
            }
        }
    }
}
