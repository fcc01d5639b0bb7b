use crate::core::models::snapshot::Snapshot;
use std::sync::Arc;

/// Holds at most one materialized current snapshot.
#[derive(Debug, Default, Clone)]
pub(crate) struct SnapshotCache {
    slot: Option<Arc<Snapshot>>,
}

impl SnapshotCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<&Arc<Snapshot>> {
        self.slot.as_ref()
    }

    pub fn store(&mut self, snapshot: Arc<Snapshot>) {
        self.slot = Some(snapshot);
    }

    pub fn invalidate(&mut self) {
        self.slot = None;
    }

    /// Whether `snapshot` is the very object currently cached.
    pub fn holds(&self, snapshot: &Arc<Snapshot>) -> bool {
        self.slot
            .as_ref()
            .is_some_and(|cached| Arc::ptr_eq(cached, snapshot))
    }

    pub fn is_empty(&self) -> bool {
        self.slot.is_none()
    }
}
