//! Job Repository
//!
//! In-memory registry of video generation jobs. Readers always receive a
//! cloned snapshot; writers apply a transition while holding the entry lock,
//! so a poller never observes a half-updated record.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use thiserror::Error;
use uuid::Uuid;
use verdant_core::domain::job::{JobRecord, TransitionError};

/// Repository error type
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("job {0} already exists")]
    Duplicate(Uuid),
    #[error("job {0} not found")]
    NotFound(Uuid),
    #[error(transparent)]
    Transition(#[from] TransitionError),
}

/// Process-wide job registry keyed by job id
#[derive(Debug, Default)]
pub struct JobStore {
    jobs: DashMap<Uuid, JobRecord>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new job; an existing id is never overwritten
    pub fn create(&self, record: JobRecord) -> Result<Uuid, StoreError> {
        let id = record.id();

        match self.jobs.entry(id) {
            Entry::Occupied(_) => Err(StoreError::Duplicate(id)),
            Entry::Vacant(slot) => {
                slot.insert(record);
                Ok(id)
            }
        }
    }

    /// Find a job by ID
    pub fn get(&self, id: Uuid) -> Option<JobRecord> {
        self.jobs.get(&id).map(|entry| entry.value().clone())
    }

    /// Apply a state transition to a stored job
    pub fn update<F, R>(&self, id: Uuid, transition: F) -> Result<R, StoreError>
    where
        F: FnOnce(&mut JobRecord) -> Result<R, TransitionError>,
    {
        let mut entry = self.jobs.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        Ok(transition(entry.value_mut())?)
    }

    /// Delete a job by ID, returning the evicted record
    pub fn remove(&self, id: Uuid) -> Option<JobRecord> {
        self.jobs.remove(&id).map(|(_, record)| record)
    }

    /// IDs of jobs strictly older than `max_age` at `now`
    pub fn list_expired(&self, max_age: chrono::Duration, now: DateTime<Utc>) -> Vec<Uuid> {
        self.jobs
            .iter()
            .filter(|entry| entry.value().age(now) > max_age)
            .map(|entry| *entry.key())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}
