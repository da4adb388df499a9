//! Admission gate for encoder processes.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Caps how many encoder processes run at once across every ingest run.
///
/// Cloning shares the same permits.
#[derive(Debug, Clone)]
pub struct EncodeGate {
    permits: Arc<Semaphore>,
    capacity: usize,
}

impl EncodeGate {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Wait for a free slot. The slot is released when the permit drops.
    pub async fn acquire(&self) -> vs_core::Result<OwnedSemaphorePermit> {
        self.permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| vs_core::Error::Internal(format!("encode gate closed: {e}")))
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slots not currently held.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }
}
