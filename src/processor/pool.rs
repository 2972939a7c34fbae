use parking_lot::Mutex;
use std::io;
use std::process::{Child, Command};

/// Seam the scheduler samples its admission-control count through.
pub trait WorkerSupervisor: Send + Sync {
    fn live_workers(&self) -> usize;
}

/// Bookkeeping for spawned worker processes. The scheduler never receives a
/// result from a worker; finished children are simply reaped while counting.
#[derive(Default)]
pub struct WorkerPool {
    children: Mutex<Vec<Child>>,
}

impl WorkerPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&self, command: &mut Command) -> io::Result<u32> {
        let child = command.spawn()?;
        let pid = child.id();
        self.children.lock().push(child);
        Ok(pid)
    }
}

impl WorkerSupervisor for WorkerPool {
    fn live_workers(&self) -> usize {
        let mut children = self.children.lock();
        children.retain_mut(|child| matches!(child.try_wait(), Ok(None)));
        children.len()
    }
}
