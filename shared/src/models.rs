use serde::{Serialize, Deserialize};
use time::OffsetDateTime;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Voter {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub history: Vec<VoterHistory>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct VoterHistory {
    pub poll_id: u64,
    pub vote_id: u64,
    #[serde(with = "time::serde::rfc3339")]
    pub vote_date: OffsetDateTime,
}

/// The JSONB body of a voter row in the document store.
#[cfg(feature = "backend")]
#[derive(Debug, sqlx::FromRow)]
pub struct VoterDocument {
    pub doc: sqlx::types::Json<Voter>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthCheckResult {
    pub status: String,
    pub version: String,
    #[serde(rename = "uptime_seconds")]
    pub uptime: u64,
    #[serde(rename = "transaction_count")]
    pub transactions: u64,
    #[serde(rename = "error_count")]
    pub errors: u64,
    #[serde(rename = "database_status")]
    pub db_health: String,
}

impl Voter {
    pub fn new(id: u64, name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            email: email.into(),
            history: Vec::new(),
        }
    }

    pub fn with_history(mut self, history: Vec<VoterHistory>) -> Self {
        self.history = history;
        self
    }

    /// Index of the history entry recorded for `poll_id`, if any.
    pub fn poll_position(&self, poll_id: u64) -> Option<usize> {
        self.history.iter().position(|h| h.poll_id == poll_id)
    }

    pub fn poll(&self, poll_id: u64) -> Option<&VoterHistory> {
        self.history.iter().find(|h| h.poll_id == poll_id)
    }

    /// First poll id that appears more than once in the history.
    pub fn repeated_poll(&self) -> Option<u64> {
        self.history.iter().enumerate().find_map(|(i, h)| {
            self.history[..i]
                .iter()
                .any(|earlier| earlier.poll_id == h.poll_id)
                .then_some(h.poll_id)
        })
    }
}

impl VoterHistory {
    pub fn new(poll_id: u64, vote_id: u64, vote_date: OffsetDateTime) -> Self {
        Self { poll_id, vote_id, vote_date }
    }
}
