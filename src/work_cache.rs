use super::*;

/// How many templates back a share may reference before it is stale. The
/// grace window lets shares computed against the previous notify land while
/// the swap broadcast is still in flight.
pub const RETAINED_TEMPLATES: usize = 4;

/// The single slot holding current work plus the short tail of superseded
/// templates, keyed by job id. One writer (the generator), many readers (the
/// sessions); publication is a pointer swap under the write lock.
pub struct WorkCache {
    inner: parking_lot::RwLock<VecDeque<Arc<Workbase>>>,
}

impl WorkCache {
    pub fn new() -> Self {
        Self {
            inner: parking_lot::RwLock::new(VecDeque::with_capacity(RETAINED_TEMPLATES)),
        }
    }

    pub fn publish(&self, workbase: Arc<Workbase>) {
        let mut recent = self.inner.write();
        if recent.len() == RETAINED_TEMPLATES {
            recent.pop_back();
        }
        recent.push_front(workbase);
    }

    pub fn current(&self) -> Option<Arc<Workbase>> {
        self.inner.read().front().cloned()
    }

    /// Resolve a share back to the template it was computed under. `None`
    /// means the job fell out of the grace window and the share is stale.
    pub fn get(&self, job_id: JobId) -> Option<Arc<Workbase>> {
        self.inner
            .read()
            .iter()
            .find(|workbase| workbase.job_id == job_id)
            .cloned()
    }
}

impl Default for WorkCache {
    fn default() -> Self {
        Self::new()
    }
}
