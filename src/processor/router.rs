use crate::processor::job::BackgroundJob;
use crate::processor::pool::WorkerPool;
use anyhow::{anyhow, Context, Result};
use std::collections::HashMap;
use std::process::Command;
use std::sync::Arc;
use tracing::{info, warn};

/// Handles jobs of one target entity kind. Implementations spawn whatever
/// background work the kind needs; the scheduler never looks inside.
pub trait JobHandler: Send + Sync {
    fn handle(&self, job: &BackgroundJob) -> Result<()>;
}

/// Routing table from a job's `table` kind to its handler. New kinds register
/// here without touching the scheduling loop; a job with no registered
/// handler is logged and dropped.
#[derive(Default)]
pub struct JobRouter {
    routes: HashMap<String, Box<dyn JobHandler>>,
}

impl JobRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, table: &str, handler: Box<dyn JobHandler>) {
        self.routes.insert(table.to_string(), handler);
    }

    pub fn dispatch(&self, job: &BackgroundJob) -> Result<()> {
        match self.routes.get(&job.table) {
            Some(handler) => handler.handle(job),
            None => {
                warn!(
                    "No background job handler for table \"{}\" defined, dropping job {}",
                    job.table, job.uuid
                );
                Ok(())
            }
        }
    }
}

/// Dispatches a quotes-update job into an isolated worker process running the
/// indicator pipeline for the security in `id1`. The spawned process opens
/// its own storage connection and reports only through its logs.
pub struct QuotesHandler {
    pool: Arc<WorkerPool>,
}

impl QuotesHandler {
    pub fn new(pool: Arc<WorkerPool>) -> Self {
        Self { pool }
    }
}

impl JobHandler for QuotesHandler {
    fn handle(&self, job: &BackgroundJob) -> Result<()> {
        let security = job
            .id1
            .ok_or_else(|| anyhow!("quotes job {} carries no security id", job.uuid))?;
        let exe = std::env::current_exe().context("failed to resolve own executable")?;
        let mut command = Command::new(exe);
        command
            .arg("calculate")
            .arg("--security")
            .arg(security.to_string())
            .arg("--job-id")
            .arg(job.uuid.to_string());
        let pid = self
            .pool
            .spawn(&mut command)
            .context("failed to spawn indicator worker")?;
        info!(
            "Dispatched job {} for security {security} to worker process {pid}",
            job.uuid
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct RecordingHandler {
        calls: AtomicUsize,
    }

    impl JobHandler for Arc<RecordingHandler> {
        fn handle(&self, _job: &BackgroundJob) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn routes_to_registered_handler() {
        let handler = Arc::new(RecordingHandler::default());
        let mut router = JobRouter::new();
        router.register("quotes", Box::new(Arc::clone(&handler)));

        router.dispatch(&BackgroundJob::for_quotes(1)).unwrap();
        assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unknown_kind_is_dropped_without_error() {
        let router = JobRouter::new();
        let job = BackgroundJob::new("securities").with_primary_id(3);
        assert!(router.dispatch(&job).is_ok());
    }

    #[test]
    fn quotes_job_without_security_id_errors() {
        let handler = QuotesHandler::new(Arc::new(WorkerPool::new()));
        let job = BackgroundJob::new("quotes");
        assert!(handler.handle(&job).is_err());
    }
}
