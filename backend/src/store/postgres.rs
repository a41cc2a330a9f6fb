use std::time::Duration;
use futures::TryStreamExt;
use rocket::async_trait;
use serde_json::json;
use sqlx::{migrate::MigrateError, postgres::PgPoolOptions, types::Json, PgPool, Postgres, Transaction};
use tracing::{debug, info, instrument, warn};
use shared::{Voter, VoterDocument, VoterHistory};
use super::{history, StoreError, VoterStore};

/// Selects the history entry for one poll out of a voter document.
/// The poll id is supplied through the `vars` argument, never spliced into the path.
const POLL_PATH: &str = "$.history[*] ? (@.poll_id == $poll_id)";

/// Typed parameters for the history lookup path.
#[derive(Debug, Clone, Copy)]
struct PollFilter {
    poll_id: u64,
}

impl PollFilter {
    fn vars(&self) -> Json<serde_json::Value> {
        Json(json!({ "poll_id": self.poll_id }))
    }
}

/// Voters stored as JSONB documents in PostgreSQL, one row per voter.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connects, then applies pending migrations.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await?;

        let store = Self::from_pool(pool);
        store.migrate().await?;
        Ok(store)
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| match e {
                MigrateError::Execute(e) => StoreError::from(e),
                other => StoreError::Internal(other.to_string()),
            })?;
        info!("📋 Voter store migrations complete");
        Ok(())
    }

    async fn lock_voter(tx: &mut Transaction<'_, Postgres>, voter_id: u64) -> Result<Voter, StoreError> {
        let record = sqlx::query_as::<_, VoterDocument>(
            "SELECT doc FROM voters WHERE id = $1::numeric FOR UPDATE"
        )
        .bind(key(voter_id))
        .fetch_optional(&mut **tx)
        .await?;

        record.map(|r| r.doc.0).ok_or(StoreError::NotFound(voter_id))
    }

    async fn write_back(tx: &mut Transaction<'_, Postgres>, voter: &Voter) -> Result<(), StoreError> {
        sqlx::query("UPDATE voters SET doc = $2 WHERE id = $1::numeric")
            .bind(key(voter.id))
            .bind(Json(voter))
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    /// Fetches the voter under a row lock, applies `op` to a copy and writes
    /// the whole document back in the same transaction.
    async fn mutate_voter<T, F>(&self, voter_id: u64, op: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut Voter) -> Result<T, StoreError> + Send,
        T: Send,
    {
        let mut tx = self.pool.begin().await?;
        let mut voter = Self::lock_voter(&mut tx, voter_id).await?;
        let out = op(&mut voter)?;
        Self::write_back(&mut tx, &voter).await?;
        tx.commit().await?;
        Ok(out)
    }
}

/// The key column is `NUMERIC(20, 0)` so every `u64` fits. Keys travel as
/// decimal text and are cast with `$n::numeric` in each statement.
fn key(id: u64) -> String {
    id.to_string()
}

#[async_trait]
impl VoterStore for PgStore {
    #[instrument(skip(self, voter), fields(voter_id = voter.id))]
    async fn create(&self, voter: Voter) -> Result<(), StoreError> {
        history::ensure_unique_polls(&voter)?;
        let result = sqlx::query(
            "INSERT INTO voters (id, doc) VALUES ($1::numeric, $2) ON CONFLICT (id) DO NOTHING"
        )
        .bind(key(voter.id))
        .bind(Json(&voter))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::AlreadyExists(voter.id));
        }
        debug!("Voter document inserted");
        Ok(())
    }

    async fn read(&self, id: u64) -> Result<Voter, StoreError> {
        sqlx::query_as::<_, VoterDocument>("SELECT doc FROM voters WHERE id = $1::numeric")
            .bind(key(id))
            .fetch_optional(&self.pool)
            .await?
            .map(|r| r.doc.0)
            .ok_or(StoreError::NotFound(id))
    }

    async fn read_all(&self) -> Result<Vec<Voter>, StoreError> {
        let voters = sqlx::query_as::<_, VoterDocument>("SELECT doc FROM voters ORDER BY id")
            .fetch(&self.pool)
            .map_ok(|r| r.doc.0)
            .try_collect()
            .await?;
        Ok(voters)
    }

    #[instrument(skip(self, voter), fields(voter_id = voter.id))]
    async fn update(&self, voter: Voter) -> Result<(), StoreError> {
        history::ensure_unique_polls(&voter)?;
        let result = sqlx::query("UPDATE voters SET doc = $2 WHERE id = $1::numeric")
            .bind(key(voter.id))
            .bind(Json(&voter))
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(voter.id));
        }
        Ok(())
    }

    #[instrument(skip(self, voter), fields(voter_id = voter.id))]
    async fn update_profile(&self, voter: Voter) -> Result<Voter, StoreError> {
        self.mutate_voter(voter.id, |stored| {
            stored.name = voter.name;
            stored.email = voter.email;
            Ok(stored.clone())
        }).await
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: u64) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM voters WHERE id = $1::numeric")
            .bind(key(id))
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    async fn delete_all(&self) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM voters").execute(&self.pool).await?;
        info!("🗑️ Removed {} voters", result.rows_affected());
        Ok(())
    }

    async fn health_check(&self) -> String {
        match sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(&self.pool).await {
            Ok(_) => "ok".into(),
            Err(e) => {
                warn!("Voter store health check failed: {}", e);
                e.to_string()
            }
        }
    }

    async fn get_by_poll(&self, voter_id: u64, poll_id: u64) -> Result<VoterHistory, StoreError> {
        let filter = PollFilter { poll_id };

        // No row: the voter is absent. NULL: the voter has no entry for the poll.
        let row = sqlx::query_as::<_, (Option<Json<VoterHistory>>,)>(
            "SELECT jsonb_path_query_first(doc, $2::jsonpath, $3) FROM voters WHERE id = $1::numeric"
        )
        .bind(key(voter_id))
        .bind(POLL_PATH)
        .bind(filter.vars())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            None => Err(StoreError::NotFound(voter_id)),
            Some((None,)) => Err(StoreError::PollNotFound { voter_id, poll_id }),
            Some((Some(Json(entry)),)) => Ok(entry),
        }
    }

    #[instrument(skip(self, entry))]
    async fn add_by_poll(
        &self,
        voter_id: u64,
        poll_id: u64,
        entry: VoterHistory,
    ) -> Result<VoterHistory, StoreError> {
        self.mutate_voter(voter_id, |voter| history::add(voter, poll_id, entry)).await
    }

    #[instrument(skip(self, entry))]
    async fn update_by_poll(
        &self,
        voter_id: u64,
        poll_id: u64,
        entry: VoterHistory,
    ) -> Result<VoterHistory, StoreError> {
        self.mutate_voter(voter_id, |voter| history::update(voter, poll_id, entry)).await
    }

    #[instrument(skip(self))]
    async fn delete_by_poll(&self, voter_id: u64, poll_id: u64) -> Result<(), StoreError> {
        self.mutate_voter(voter_id, |voter| history::remove(voter, poll_id).map(|_| ())).await
    }
}
