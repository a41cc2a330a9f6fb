//! Voter storage.
//!
//! [`VoterStore`] is the contract every backend honours: voters are keyed by
//! id, mutations are existence-checked, and each voter owns an ordered
//! history list keyed by poll id. Two backends exist:
//!
//! * [`MemoryStore`] keeps voters in a mutex-guarded map.
//! * [`PgStore`] keeps each voter as a JSONB document in PostgreSQL.
//!
//! Deleting a voter that does not exist is an error in both backends.

use rocket::async_trait;
use shared::{ErrorCode, Voter, VoterHistory};
use thiserror::Error;

pub mod history;
pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Voter {0} not found")]
    NotFound(u64),
    #[error("Voter {0} already exists")]
    AlreadyExists(u64),
    #[error("Poll {poll_id} not found in history of voter {voter_id}")]
    PollNotFound { voter_id: u64, poll_id: u64 },
    #[error("Voter {voter_id} already has history for poll {poll_id}")]
    DuplicatePoll { voter_id: u64, poll_id: u64 },
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),
    #[error("Storage error: {0}")]
    Internal(String),
}

impl StoreError {
    pub fn code(&self) -> ErrorCode {
        match self {
            StoreError::NotFound(_) => ErrorCode::NotFound,
            StoreError::AlreadyExists(_) => ErrorCode::AlreadyExists,
            StoreError::PollNotFound { .. } => ErrorCode::PollNotFound,
            StoreError::DuplicatePoll { .. } => ErrorCode::DuplicatePoll,
            StoreError::StorageUnavailable(_) => ErrorCode::StorageUnavailable,
            StoreError::Internal(_) => ErrorCode::SystemError,
        }
    }
}

/// Only failures to reach the database count as unavailability. Statement,
/// constraint and decode failures are internal errors.
impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => StoreError::StorageUnavailable(e.to_string()),
            _ => StoreError::Internal(e.to_string()),
        }
    }
}

#[async_trait]
pub trait VoterStore: Send + Sync {
    /// Inserts a new voter. Fails with `AlreadyExists` if the id is taken.
    async fn create(&self, voter: Voter) -> Result<(), StoreError>;

    async fn read(&self, id: u64) -> Result<Voter, StoreError>;

    /// Every stored voter, in ascending id order. Empty when nothing is stored.
    async fn read_all(&self) -> Result<Vec<Voter>, StoreError>;

    /// Replaces the whole stored record, history included.
    async fn update(&self, voter: Voter) -> Result<(), StoreError>;

    /// Replaces name and email in one step, keeping the stored history.
    /// Returns the voter as stored.
    async fn update_profile(&self, voter: Voter) -> Result<Voter, StoreError>;

    async fn delete(&self, id: u64) -> Result<(), StoreError>;

    async fn delete_all(&self) -> Result<(), StoreError>;

    /// `"ok"` when storage is reachable, otherwise a description of the failure.
    async fn health_check(&self) -> String;

    async fn get_by_poll(&self, voter_id: u64, poll_id: u64) -> Result<VoterHistory, StoreError>;

    /// Appends `entry` to the voter's history under `poll_id`.
    async fn add_by_poll(
        &self,
        voter_id: u64,
        poll_id: u64,
        entry: VoterHistory,
    ) -> Result<VoterHistory, StoreError>;

    /// Replaces the entry for `poll_id` without moving it.
    async fn update_by_poll(
        &self,
        voter_id: u64,
        poll_id: u64,
        entry: VoterHistory,
    ) -> Result<VoterHistory, StoreError>;

    async fn delete_by_poll(&self, voter_id: u64, poll_id: u64) -> Result<(), StoreError>;
}
