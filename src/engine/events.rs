// Event harness — delivers install/activate/fetch/message events to a
// worker and keeps each event open until its handler future settles.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::worker::{FetchOutcome, ProxyWorker};
use crate::control::ControlReply;
use crate::http::ProxyRequest;

const EVENT_QUEUE_DEPTH: usize = 64;

/// Events delivered to a worker. Every variant carries the channel whose
/// resolution marks the event as fully handled.
pub enum WorkerEvent {
    Install {
        done: oneshot::Sender<Result<()>>,
    },
    Activate {
        done: oneshot::Sender<Result<()>>,
    },
    Fetch {
        request: ProxyRequest,
        respond: oneshot::Sender<Result<FetchOutcome>>,
    },
    Message {
        payload: Value,
        reply: oneshot::Sender<Option<ControlReply>>,
    },
}

/// Dispatches queued events to a worker.
pub struct EventLoop {
    worker: Arc<ProxyWorker>,
    events: mpsc::Receiver<WorkerEvent>,
    cancel: CancellationToken,
}

impl EventLoop {
    /// Spawn a worker's event loop and return the handle used to reach it.
    pub fn spawn(worker: Arc<ProxyWorker>) -> WorkerHandle {
        let (tx, rx) = mpsc::channel(EVENT_QUEUE_DEPTH);
        let cancel = CancellationToken::new();
        let event_loop = EventLoop {
            worker,
            events: rx,
            cancel: cancel.clone(),
        };
        tokio::spawn(event_loop.run());
        WorkerHandle { events: tx, cancel }
    }

    async fn run(mut self) {
        loop {
            let event = tokio::select! {
                _ = self.cancel.cancelled() => break,
                event = self.events.recv() => match event {
                    Some(event) => event,
                    None => break,
                },
            };
            self.dispatch(event).await;
        }
        debug!("worker event loop stopped");
    }

    async fn dispatch(&self, event: WorkerEvent) {
        match event {
            // Lifecycle transitions gate the state machine; they run to
            // completion before the next event is taken.
            WorkerEvent::Install { done } => {
                let _ = done.send(self.worker.install().await);
            }
            WorkerEvent::Activate { done } => {
                let _ = done.send(self.worker.activate().await);
            }
            // Requests and control messages interleave freely: entries
            // under different keys are independent, and same-key writes
            // settle last-write-wins.
            WorkerEvent::Fetch { request, respond } => {
                let worker = Arc::clone(&self.worker);
                tokio::spawn(async move {
                    let _ = respond.send(worker.handle_fetch(&request).await);
                });
            }
            WorkerEvent::Message { payload, reply } => {
                let worker = Arc::clone(&self.worker);
                tokio::spawn(async move {
                    let _ = reply.send(worker.handle_message(&payload).await);
                });
            }
        }
    }
}

/// Cloneable handle for posting events to a worker.
#[derive(Clone)]
pub struct WorkerHandle {
    events: mpsc::Sender<WorkerEvent>,
    cancel: CancellationToken,
}

impl WorkerHandle {
    pub async fn install(&self) -> Result<()> {
        let (done, rx) = oneshot::channel();
        self.send(WorkerEvent::Install { done }).await?;
        rx.await
            .map_err(|_| anyhow!("worker stopped during install"))?
    }

    pub async fn activate(&self) -> Result<()> {
        let (done, rx) = oneshot::channel();
        self.send(WorkerEvent::Activate { done }).await?;
        rx.await
            .map_err(|_| anyhow!("worker stopped during activation"))?
    }

    /// Intercept one request.
    pub async fn fetch(&self, request: ProxyRequest) -> Result<FetchOutcome> {
        let (respond, rx) = oneshot::channel();
        self.send(WorkerEvent::Fetch { request, respond }).await?;
        rx.await.map_err(|_| anyhow!("worker stopped during fetch"))?
    }

    /// Post a control message and await the acknowledgement. `None`
    /// means the worker did not recognize the message and posted no
    /// reply.
    pub async fn post_message(&self, payload: Value) -> Result<Option<ControlReply>> {
        let (reply, rx) = oneshot::channel();
        self.send(WorkerEvent::Message { payload, reply }).await?;
        Ok(rx.await.unwrap_or(None))
    }

    /// Stop the event loop. Handlers already spawned run to completion.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    async fn send(&self, event: WorkerEvent) -> Result<()> {
        self.events
            .send(event)
            .await
            .map_err(|_| anyhow!("worker event loop is gone"))
    }
}
