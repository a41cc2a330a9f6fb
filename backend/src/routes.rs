use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use rocket::{State, Build, Rocket, get, post, put, delete, routes, catchers};
use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::json::{self, Json};
use tracing::{info, warn, instrument};
use shared::{validate_history_entry, validate_voter, HealthCheckResult, Voter, VoterHistory};
use crate::{
    catchers::{bad_request, internal_error, not_found, service_unavailable, unprocessable_entity},
    cors::CORS,
    error::ApiError,
    store::VoterStore,
};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

type Body<'r, T> = Result<Json<T>, json::Error<'r>>;

pub struct AppState {
    pub store: Arc<dyn VoterStore>,
    boot_time: Instant,
    transactions: AtomicU64,
    errors: AtomicU64,
}

impl AppState {
    pub fn new(store: Arc<dyn VoterStore>) -> Self {
        Self {
            store,
            boot_time: Instant::now(),
            transactions: AtomicU64::new(0),
            errors: AtomicU64::new(0),
        }
    }

    /// Counts the request, and counts it again as an error if `handler` fails.
    async fn track<T>(
        &self,
        op: &'static str,
        handler: impl Future<Output = Result<T, ApiError>>,
    ) -> Result<T, ApiError> {
        self.transactions.fetch_add(1, Ordering::Relaxed);
        let result = handler.await;
        if let Err(e) = &result {
            self.errors.fetch_add(1, Ordering::Relaxed);
            warn!(op, status = e.status().code, "Request failed: {}", e);
        }
        result
    }

    pub async fn health(&self) -> HealthCheckResult {
        HealthCheckResult {
            status: "ok".into(),
            version: VERSION.into(),
            uptime: self.boot_time.elapsed().as_secs(),
            transactions: self.transactions.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            db_health: self.store.health_check().await,
        }
    }
}

/// Mounts the voter routes, catchers and CORS fairing onto `rocket`.
pub fn stage(rocket: Rocket<Build>, state: AppState) -> Rocket<Build> {
    rocket
        .attach(CORS)
        .manage(state)
        .mount(
            "/",
            routes![
                list_voters,
                delete_all_voters,
                get_voter,
                add_voter,
                update_voter,
                delete_voter,
                get_voter_history,
                get_voter_poll,
                add_voter_poll,
                update_voter_poll,
                delete_voter_poll,
                health_check,
                all_options
            ],
        )
        .register(
            "/",
            catchers![
                bad_request,
                not_found,
                unprocessable_entity,
                internal_error,
                service_unavailable
            ],
        )
}

#[rocket::options("/<_..>")]
pub async fn all_options() -> Status {
    Status::Ok
}

#[get("/voters")]
pub async fn list_voters(state: &State<AppState>) -> Result<Json<Vec<Voter>>, ApiError> {
    state.track("list_voters", async {
        Ok(Json(state.store.read_all().await?))
    }).await
}

#[delete("/voters")]
pub async fn delete_all_voters(state: &State<AppState>) -> Result<&'static str, ApiError> {
    state.track("delete_all_voters", async {
        state.store.delete_all().await?;
        info!("All voters deleted");
        Ok("All voters deleted")
    }).await
}

#[get("/voters/health")]
pub async fn health_check(state: &State<AppState>) -> Json<HealthCheckResult> {
    Json(state.health().await)
}

#[get("/voters/<id>")]
pub async fn get_voter(state: &State<AppState>, id: u64) -> Result<Json<Voter>, ApiError> {
    state.track("get_voter", async {
        Ok(Json(state.store.read(id).await?))
    }).await
}

#[instrument(skip(state, voter))]
#[post("/voters/<id>", data = "<voter>")]
pub async fn add_voter(
    state: &State<AppState>,
    id: u64,
    voter: Body<'_, Voter>,
) -> Result<Custom<Json<Voter>>, ApiError> {
    state.track("add_voter", async {
        let voter = voter?.into_inner();
        validate_voter(id, &voter)?;
        state.store.create(voter.clone()).await?;
        Ok(Custom(Status::Created, Json(voter)))
    }).await
}

/// Replaces the voter's profile fields. The stored history is kept; history
/// changes go through the poll routes.
#[instrument(skip(state, voter))]
#[put("/voters/<id>", data = "<voter>")]
pub async fn update_voter(
    state: &State<AppState>,
    id: u64,
    voter: Body<'_, Voter>,
) -> Result<Json<Voter>, ApiError> {
    state.track("update_voter", async {
        let mut voter = voter?.into_inner();
        voter.history.clear();
        validate_voter(id, &voter)?;
        Ok(Json(state.store.update_profile(voter).await?))
    }).await
}

#[instrument(skip(state))]
#[delete("/voters/<id>")]
pub async fn delete_voter(state: &State<AppState>, id: u64) -> Result<&'static str, ApiError> {
    state.track("delete_voter", async {
        state.store.delete(id).await?;
        Ok("Delete OK")
    }).await
}

#[get("/voters/<id>/polls")]
pub async fn get_voter_history(
    state: &State<AppState>,
    id: u64,
) -> Result<Json<Vec<VoterHistory>>, ApiError> {
    state.track("get_voter_history", async {
        Ok(Json(state.store.read(id).await?.history))
    }).await
}

#[get("/voters/<id>/polls/<poll_id>")]
pub async fn get_voter_poll(
    state: &State<AppState>,
    id: u64,
    poll_id: u64,
) -> Result<Json<VoterHistory>, ApiError> {
    state.track("get_voter_poll", async {
        Ok(Json(state.store.get_by_poll(id, poll_id).await?))
    }).await
}

#[instrument(skip(state, entry))]
#[post("/voters/<id>/polls/<poll_id>", data = "<entry>")]
pub async fn add_voter_poll(
    state: &State<AppState>,
    id: u64,
    poll_id: u64,
    entry: Body<'_, VoterHistory>,
) -> Result<Custom<Json<VoterHistory>>, ApiError> {
    state.track("add_voter_poll", async {
        let entry = entry?.into_inner();
        validate_history_entry(poll_id, &entry)?;
        let stored = state.store.add_by_poll(id, poll_id, entry).await?;
        Ok(Custom(Status::Created, Json(stored)))
    }).await
}

#[instrument(skip(state, entry))]
#[put("/voters/<id>/polls/<poll_id>", data = "<entry>")]
pub async fn update_voter_poll(
    state: &State<AppState>,
    id: u64,
    poll_id: u64,
    entry: Body<'_, VoterHistory>,
) -> Result<Json<VoterHistory>, ApiError> {
    state.track("update_voter_poll", async {
        let entry = entry?.into_inner();
        validate_history_entry(poll_id, &entry)?;
        Ok(Json(state.store.update_by_poll(id, poll_id, entry).await?))
    }).await
}

#[instrument(skip(state))]
#[delete("/voters/<id>/polls/<poll_id>")]
pub async fn delete_voter_poll(
    state: &State<AppState>,
    id: u64,
    poll_id: u64,
) -> Result<&'static str, ApiError> {
    state.track("delete_voter_poll", async {
        state.store.delete_by_poll(id, poll_id).await?;
        Ok("Delete OK")
    }).await
}
