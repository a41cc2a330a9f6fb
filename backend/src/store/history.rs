//! History list operations shared by every backend.
//!
//! Each function works on a voter the caller has already fetched; the caller
//! writes the whole voter back afterwards.

use shared::{Voter, VoterHistory};
use super::StoreError;

/// Rejects a voter whose history repeats a poll id.
pub fn ensure_unique_polls(voter: &Voter) -> Result<(), StoreError> {
    match voter.repeated_poll() {
        Some(poll_id) => Err(StoreError::DuplicatePoll { voter_id: voter.id, poll_id }),
        None => Ok(()),
    }
}

pub fn find(voter: &Voter, poll_id: u64) -> Result<VoterHistory, StoreError> {
    voter.poll(poll_id)
        .copied()
        .ok_or(StoreError::PollNotFound { voter_id: voter.id, poll_id })
}

pub fn add(voter: &mut Voter, poll_id: u64, mut entry: VoterHistory) -> Result<VoterHistory, StoreError> {
    if voter.poll_position(poll_id).is_some() {
        return Err(StoreError::DuplicatePoll { voter_id: voter.id, poll_id });
    }
    entry.poll_id = poll_id;
    voter.history.push(entry);
    Ok(entry)
}

pub fn update(voter: &mut Voter, poll_id: u64, mut entry: VoterHistory) -> Result<VoterHistory, StoreError> {
    let idx = voter.poll_position(poll_id)
        .ok_or(StoreError::PollNotFound { voter_id: voter.id, poll_id })?;
    entry.poll_id = poll_id;
    voter.history[idx] = entry;
    Ok(entry)
}

pub fn remove(voter: &mut Voter, poll_id: u64) -> Result<VoterHistory, StoreError> {
    let idx = voter.poll_position(poll_id)
        .ok_or(StoreError::PollNotFound { voter_id: voter.id, poll_id })?;
    Ok(voter.history.remove(idx))
}
