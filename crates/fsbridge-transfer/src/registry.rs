//! Job id → cancellation handle lookup.
//!
//! The registry never owns a job. Each entry holds a clone of the job's
//! cancellation token, inserted at submission and removed by the job's own
//! [`Registration`] guard when it reaches a terminal state. A stop request for
//! an id that is not (or no longer) registered does nothing.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use fsbridge_types::{Direction, JobId};
use tokio_util::sync::CancellationToken;

use crate::error::{Result, TransferError};

struct ActiveJob {
    direction: Direction,
    token: CancellationToken,
    /// Distinguishes successive jobs that reuse an id.
    generation: u64,
}

#[derive(Default)]
pub struct JobRegistry {
    jobs: DashMap<JobId, ActiveJob>,
    next_generation: AtomicU64,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a job. Fails if the id belongs to a job that is still active.
    pub fn register(self: &Arc<Self>, job_id: JobId, direction: Direction) -> Result<Registration> {
        match self.jobs.entry(job_id) {
            Entry::Occupied(_) => Err(TransferError::invalid(format!("job {} is already active", job_id))),
            Entry::Vacant(slot) => {
                let token = CancellationToken::new();
                let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
                slot.insert(ActiveJob {
                    direction,
                    token: token.clone(),
                    generation,
                });
                Ok(Registration {
                    registry: Arc::clone(self),
                    job_id,
                    generation,
                    token,
                })
            }
        }
    }

    /// Signal abort to a job of any direction. Returns whether one was found.
    pub fn cancel(&self, job_id: JobId) -> bool {
        match self.jobs.get(&job_id) {
            Some(job) => {
                job.token.cancel();
                true
            }
            None => false,
        }
    }

    /// Signal abort only if the registered job runs in `direction`.
    pub fn cancel_direction(&self, job_id: JobId, direction: Direction) -> bool {
        match self.jobs.get(&job_id) {
            Some(job) if job.direction == direction => {
                job.token.cancel();
                true
            }
            _ => false,
        }
    }

    /// Signal abort to every registered job. Returns how many were signalled.
    pub fn cancel_all(&self) -> usize {
        // Clone the tokens out so no shard lock is held while cancelling.
        let tokens: Vec<CancellationToken> = self.jobs.iter().map(|job| job.token.clone()).collect();
        for token in &tokens {
            token.cancel();
        }
        tokens.len()
    }

    pub fn contains(&self, job_id: JobId) -> bool {
        self.jobs.contains_key(&job_id)
    }

    pub fn direction_of(&self, job_id: JobId) -> Option<Direction> {
        self.jobs.get(&job_id).map(|job| job.direction)
    }

    /// Number of outstanding jobs.
    pub fn pending_count(&self) -> usize {
        self.jobs.len()
    }

    fn unregister(&self, job_id: JobId, generation: u64) {
        self.jobs.remove_if(&job_id, |_, job| job.generation == generation);
    }
}

/// A job's entry in the registry. Dropping it unregisters the job.
pub struct Registration {
    registry: Arc<JobRegistry>,
    job_id: JobId,
    generation: u64,
    token: CancellationToken,
}

impl Registration {
    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.registry.unregister(self.job_id, self.generation);
    }
}
