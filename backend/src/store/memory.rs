use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use rocket::async_trait;
use tracing::{debug, error};
use shared::{Voter, VoterHistory};
use super::{history, StoreError, VoterStore};

/// Voters held in process memory. One lock guards every operation, so each
/// check-then-act sequence is atomic.
#[derive(Debug, Default)]
pub struct MemoryStore {
    voters: Mutex<HashMap<u64, Voter>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<u64, Voter>>, StoreError> {
        self.voters.lock().map_err(|e| {
            error!("Failed to acquire voter store lock: {}", e);
            StoreError::StorageUnavailable("voter store lock poisoned".into())
        })
    }

    fn mutate_voter<T>(
        &self,
        voter_id: u64,
        op: impl FnOnce(&mut Voter) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut voters = self.lock()?;
        let mut voter = voters.get(&voter_id).cloned().ok_or(StoreError::NotFound(voter_id))?;
        let out = op(&mut voter)?;
        voters.insert(voter_id, voter);
        Ok(out)
    }
}

#[async_trait]
impl VoterStore for MemoryStore {
    async fn create(&self, voter: Voter) -> Result<(), StoreError> {
        history::ensure_unique_polls(&voter)?;
        let mut voters = self.lock()?;
        if voters.contains_key(&voter.id) {
            return Err(StoreError::AlreadyExists(voter.id));
        }
        debug!(voter_id = voter.id, "Adding voter");
        voters.insert(voter.id, voter);
        Ok(())
    }

    async fn read(&self, id: u64) -> Result<Voter, StoreError> {
        self.lock()?.get(&id).cloned().ok_or(StoreError::NotFound(id))
    }

    async fn read_all(&self) -> Result<Vec<Voter>, StoreError> {
        let mut voters: Vec<Voter> = self.lock()?.values().cloned().collect();
        voters.sort_by_key(|v| v.id);
        Ok(voters)
    }

    async fn update(&self, voter: Voter) -> Result<(), StoreError> {
        history::ensure_unique_polls(&voter)?;
        let mut voters = self.lock()?;
        match voters.get_mut(&voter.id) {
            Some(stored) => {
                *stored = voter;
                Ok(())
            }
            None => Err(StoreError::NotFound(voter.id)),
        }
    }

    async fn update_profile(&self, voter: Voter) -> Result<Voter, StoreError> {
        self.mutate_voter(voter.id, |stored| {
            stored.name = voter.name;
            stored.email = voter.email;
            Ok(stored.clone())
        })
    }

    async fn delete(&self, id: u64) -> Result<(), StoreError> {
        self.lock()?
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound(id))
    }

    async fn delete_all(&self) -> Result<(), StoreError> {
        self.lock()?.clear();
        Ok(())
    }

    async fn health_check(&self) -> String {
        if self.voters.is_poisoned() {
            "voter store lock poisoned".into()
        } else {
            "ok".into()
        }
    }

    async fn get_by_poll(&self, voter_id: u64, poll_id: u64) -> Result<VoterHistory, StoreError> {
        let voters = self.lock()?;
        let voter = voters.get(&voter_id).ok_or(StoreError::NotFound(voter_id))?;
        history::find(voter, poll_id)
    }

    async fn add_by_poll(
        &self,
        voter_id: u64,
        poll_id: u64,
        entry: VoterHistory,
    ) -> Result<VoterHistory, StoreError> {
        self.mutate_voter(voter_id, |voter| history::add(voter, poll_id, entry))
    }

    async fn update_by_poll(
        &self,
        voter_id: u64,
        poll_id: u64,
        entry: VoterHistory,
    ) -> Result<VoterHistory, StoreError> {
        self.mutate_voter(voter_id, |voter| history::update(voter, poll_id, entry))
    }

    async fn delete_by_poll(&self, voter_id: u64, poll_id: u64) -> Result<(), StoreError> {
        self.mutate_voter(voter_id, |voter| history::remove(voter, poll_id).map(|_| ()))
    }
}
