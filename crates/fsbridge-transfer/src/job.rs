//! The per-job plumbing shared by both engines and the caller's handle.

use std::sync::Arc;

use fsbridge_types::{Direction, JobId, TransferEvent};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::completion::Outcome;
use crate::error::{Result, TransferError};
use crate::logging::{JobEvent, JobLog, TransferLogger};
use crate::storage::LocalStorage;

/// Where a job's begin/progress events go. Disabled kinds are dropped here.
#[derive(Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<TransferEvent>,
    begin: bool,
    progress: bool,
}

impl EventSink {
    pub fn new(tx: mpsc::UnboundedSender<TransferEvent>, begin: bool, progress: bool) -> Self {
        Self { tx, begin, progress }
    }

    pub fn wants_progress(&self) -> bool {
        self.progress
    }

    pub fn emit(&self, event: TransferEvent) {
        let wanted = if event.is_progress() { self.progress } else { self.begin };
        if wanted {
            // A caller that dropped its receiver simply stops hearing about it.
            let _ = self.tx.send(event);
        }
    }
}

/// Everything an engine needs besides its spec.
pub struct JobContext {
    pub job_id: JobId,
    pub direction: Direction,
    pub token: CancellationToken,
    pub events: EventSink,
    pub storage: LocalStorage,
    pub logger: Arc<dyn TransferLogger>,
}

impl JobContext {
    pub fn log(&self, event: JobEvent) {
        self.logger.log(JobLog::new(component(self.direction), self.job_id, event));
    }

    pub fn is_aborted(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Fail with `Aborted` if a stop was requested.
    pub fn check_abort(&self) -> Result<()> {
        if self.token.is_cancelled() {
            Err(self.aborted(0))
        } else {
            Ok(())
        }
    }

    /// Log the stop and build the error the job finishes with.
    pub fn aborted(&self, bytes: u64) -> TransferError {
        self.log(JobEvent::Aborted { bytes });
        TransferError::Aborted(self.direction)
    }
}

pub(crate) fn component(direction: Direction) -> &'static str {
    match direction {
        Direction::Download => "downloader",
        Direction::Upload => "uploader",
    }
}

/// Caller side of a submitted job: its event stream, its single outcome, and
/// a way to stop it.
pub struct JobHandle<T> {
    job_id: JobId,
    direction: Direction,
    token: CancellationToken,
    events: mpsc::UnboundedReceiver<TransferEvent>,
    outcome: Outcome<T>,
}

impl<T> JobHandle<T> {
    pub(crate) fn new(
        job_id: JobId,
        direction: Direction,
        token: CancellationToken,
        events: mpsc::UnboundedReceiver<TransferEvent>,
        outcome: Outcome<T>,
    ) -> Self {
        Self { job_id, direction, token, events, outcome }
    }

    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Request an abort. The job notices at its next chunk.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Next begin/progress event. `None` once the job has finished and every
    /// event has been consumed.
    pub async fn next_event(&mut self) -> Option<TransferEvent> {
        self.events.recv().await
    }

    /// Wait for the terminal outcome, discarding unread events. The event
    /// queue is closed first, so the job stops queueing while it runs.
    pub async fn wait(self) -> Result<T> {
        let Self { mut events, outcome, .. } = self;
        events.close();
        drop(events);
        outcome.await.unwrap_or(Err(TransferError::Interrupted))
    }

    /// Wait for the terminal outcome while collecting every event, in order.
    pub async fn wait_with_events(mut self) -> (Vec<TransferEvent>, Result<T>) {
        let mut events = Vec::new();
        let outcome = loop {
            tokio::select! {
                biased;
                Some(event) = self.events.recv() => events.push(event),
                outcome = &mut self.outcome => break outcome.unwrap_or(Err(TransferError::Interrupted)),
            }
        };
        // Everything the job sent was queued before it reported its outcome.
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        (events, outcome)
    }
}
