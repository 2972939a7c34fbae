use crate::processor::job::BackgroundJob;
use anyhow::{Context, Result};
use crossbeam::queue::SegQueue;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// Unbounded FIFO of pending jobs. Enqueue and dequeue are lock-free, so
/// `push` is safe to call from request-handling contexts while the scheduling
/// loop drains the head.
#[derive(Default)]
pub struct JobQueue {
    inner: SegQueue<BackgroundJob>,
}

impl JobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, job: BackgroundJob) {
        self.inner.push(job);
    }

    pub fn pop(&self) -> Option<BackgroundJob> {
        self.inner.pop()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Re-enqueue jobs persisted by a previous run, in their original order.
    /// A missing, empty or malformed backup file restores zero jobs and is
    /// never fatal.
    pub fn load_backup(&self, path: &Path) -> usize {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Unable to load job backup \"{}\": {e}", path.display());
                return 0;
            }
        };
        let jobs: Vec<BackgroundJob> = match serde_json::from_str(&raw) {
            Ok(jobs) => jobs,
            Err(e) => {
                warn!(
                    "Job backup \"{}\" contains no valid job list: {e}",
                    path.display()
                );
                return 0;
            }
        };
        if jobs.is_empty() {
            info!("No jobs in backup file");
            return 0;
        }
        let count = jobs.len();
        for job in jobs {
            debug!("Restoring job \"{}\" with id {}", job.table, job.uuid);
            self.inner.push(job);
        }
        info!("Loaded {count} backed up jobs from \"{}\"", path.display());
        count
    }

    /// Drain every queued job and overwrite the backup file with them.
    pub fn save_backup(&self, path: &Path) -> Result<usize> {
        let mut jobs = Vec::new();
        while let Some(job) = self.inner.pop() {
            jobs.push(job);
        }
        let payload = serde_json::to_string(&jobs).context("failed to serialize job backup")?;
        fs::write(path, payload)
            .with_context(|| format!("failed to write job backup \"{}\"", path.display()))?;
        Ok(jobs.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pops_in_submission_order() {
        let queue = JobQueue::new();
        for id in 1..=5 {
            queue.push(BackgroundJob::for_quotes(id));
        }
        assert_eq!(queue.len(), 5);
        for id in 1..=5 {
            assert_eq!(queue.pop().unwrap().id1, Some(id));
        }
        assert!(queue.is_empty());
    }

    #[test]
    fn backup_round_trip_preserves_jobs_and_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jobs.json");

        let queue = JobQueue::new();
        let jobs: Vec<BackgroundJob> = (1..=3).map(BackgroundJob::for_quotes).collect();
        for job in &jobs {
            queue.push(job.clone());
        }
        assert_eq!(queue.save_backup(&path).unwrap(), 3);
        assert!(queue.is_empty());

        let restored = JobQueue::new();
        assert_eq!(restored.load_backup(&path), 3);
        for job in &jobs {
            assert_eq!(&restored.pop().unwrap(), job);
        }
    }

    #[test]
    fn missing_backup_restores_zero_jobs() {
        let dir = tempfile::tempdir().unwrap();
        let queue = JobQueue::new();
        assert_eq!(queue.load_backup(&dir.path().join("jobs.json")), 0);
    }

    #[test]
    fn malformed_backup_restores_zero_jobs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jobs.json");
        fs::write(&path, "{ not a list").unwrap();
        let queue = JobQueue::new();
        assert_eq!(queue.load_backup(&path), 0);

        fs::write(&path, "{\"table\": \"quotes\"}").unwrap();
        assert_eq!(queue.load_backup(&path), 0);
    }

    #[test]
    fn empty_backup_restores_zero_jobs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jobs.json");
        fs::write(&path, "[]").unwrap();
        let queue = JobQueue::new();
        assert_eq!(queue.load_backup(&path), 0);
    }

    #[test]
    fn save_overwrites_previous_backup() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jobs.json");

        let queue = JobQueue::new();
        queue.push(BackgroundJob::for_quotes(1));
        queue.push(BackgroundJob::for_quotes(2));
        queue.save_backup(&path).unwrap();

        queue.push(BackgroundJob::for_quotes(3));
        queue.save_backup(&path).unwrap();

        let restored = JobQueue::new();
        assert_eq!(restored.load_backup(&path), 1);
        assert_eq!(restored.pop().unwrap().id1, Some(3));
    }
}
