use crate::models::{Voter, VoterHistory};

pub const MAX_NAME_LENGTH: usize = 100;
pub const MAX_EMAIL_LENGTH: usize = 254;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Path id {path} does not match payload id {payload}")]
    IdMismatch { path: u64, payload: u64 },
    #[error("Path poll id {path} does not match payload poll id {payload}")]
    PollIdMismatch { path: u64, payload: u64 },
    #[error("Voter name is empty")]
    EmptyName,
    #[error("Voter name exceeds maximum length of {MAX_NAME_LENGTH}")]
    NameTooLong,
    #[error("Email exceeds maximum length of {MAX_EMAIL_LENGTH}")]
    EmailTooLong,
    #[error("Invalid email address: {0}")]
    InvalidEmail(String),
    #[error("Poll {0} appears more than once in voter history")]
    RepeatedPoll(u64),
}

pub fn validate_voter(path_id: u64, voter: &Voter) -> Result<(), ValidationError> {
    if path_id != voter.id {
        return Err(ValidationError::IdMismatch { path: path_id, payload: voter.id });
    }

    let name = voter.name.trim();
    if name.is_empty() { return Err(ValidationError::EmptyName); }
    if name.chars().count() > MAX_NAME_LENGTH { return Err(ValidationError::NameTooLong); }

    if voter.email.len() > MAX_EMAIL_LENGTH { return Err(ValidationError::EmailTooLong); }
    if !voter.email.is_empty() && !is_plausible_email(&voter.email) {
        return Err(ValidationError::InvalidEmail(voter.email.clone()));
    }

    if let Some(poll_id) = voter.repeated_poll() {
        return Err(ValidationError::RepeatedPoll(poll_id));
    }

    Ok(())
}

pub fn validate_history_entry(path_poll_id: u64, entry: &VoterHistory) -> Result<(), ValidationError> {
    if path_poll_id != entry.poll_id {
        return Err(ValidationError::PollIdMismatch { path: path_poll_id, payload: entry.poll_id });
    }
    Ok(())
}

fn is_plausible_email(email: &str) -> bool {
    let mut parts = email.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => {
            !local.is_empty() && !domain.is_empty() && !email.chars().any(char::is_whitespace)
        }
        _ => false,
    }
}
