//! One-shot terminal outcome delivery.
//!
//! `finish` consumes the reporter, so a job cannot complete twice. A reporter
//! dropped without finishing (the worker panicked or was torn down) still
//! delivers [`TransferError::Interrupted`], so a job cannot complete zero times.

use fsbridge_types::JobId;
use tokio::sync::oneshot;
use tracing::debug;

use crate::error::{Result, TransferError};

pub type Outcome<T> = oneshot::Receiver<Result<T>>;

pub struct CompletionReporter<T> {
    job_id: JobId,
    tx: Option<oneshot::Sender<Result<T>>>,
}

/// Create the reporter/receiver pair for one job.
pub fn channel<T>(job_id: JobId) -> (CompletionReporter<T>, Outcome<T>) {
    let (tx, rx) = oneshot::channel();
    (CompletionReporter { job_id, tx: Some(tx) }, rx)
}

impl<T> CompletionReporter<T> {
    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    pub fn finish(mut self, outcome: Result<T>) {
        if let Some(tx) = self.tx.take() {
            if tx.send(outcome).is_err() {
                debug!(job_id = %self.job_id, "outcome dropped, nobody is waiting");
            }
        }
    }
}

impl<T> Drop for CompletionReporter<T> {
    fn drop(&mut self) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(Err(TransferError::Interrupted));
        }
    }
}
