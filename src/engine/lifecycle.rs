// Worker lifecycle — deployment, promotion, and page takeover.

use std::sync::Arc;

use anyhow::Result;
use parking_lot::RwLock;
use tracing::{error, info};

use super::events::{EventLoop, WorkerHandle};
use super::worker::ProxyWorker;

/// Lifecycle states of a worker. `Active` is terminal until the worker
/// is replaced by a newer deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Installing,
    Installed,
    Activating,
    Active,
}

/// The worker currently controlling traffic. Empty until a first
/// deployment succeeds.
pub type WorkerSlot = Arc<RwLock<Option<WorkerHandle>>>;

pub fn empty_slot() -> WorkerSlot {
    Arc::new(RwLock::new(None))
}

/// Deploy a new worker: install its core files, activate immediately
/// with no waiting period, and take over the slot so in-flight traffic
/// routes to it at once. A failed install (or activation) shuts the new
/// worker down and leaves the previous one in control.
pub async fn deploy(slot: &WorkerSlot, worker: ProxyWorker) -> Result<WorkerHandle> {
    let handle = EventLoop::spawn(Arc::new(worker));

    if let Err(e) = handle.install().await {
        error!("install failed, keeping previous worker: {}", e);
        handle.shutdown();
        return Err(e);
    }

    // Promoted straight past the waiting state.
    if let Err(e) = handle.activate().await {
        error!("activation failed, keeping previous worker: {}", e);
        handle.shutdown();
        return Err(e);
    }

    let previous = slot.write().replace(handle.clone());
    if let Some(previous) = previous {
        previous.shutdown();
    }
    info!("worker deployed and controlling requests");
    Ok(handle)
}
