#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;
    use rocket::async_trait;
    use rocket::http::{ContentType, Status};
    use rocket::local::asynchronous::Client;
    use serde_json::json;
    use time::OffsetDateTime;
    use shared::{ErrorCode, ErrorResponse, HealthCheckResult, Voter, VoterHistory};
    use crate::routes::{self, AppState};
    use crate::store::{MemoryStore, StoreError, VoterStore};

    fn vote_date() -> OffsetDateTime {
        OffsetDateTime::from_unix_timestamp(1_584_457_200).unwrap()
    }

    fn test_voters() -> Vec<Voter> {
        vec![
            Voter::new(1, "Count Chocula", "count@example.com")
                .with_history(vec![VoterHistory::new(1, 1, vote_date())]),
            Voter::new(2, "Captain Crunch", "crunch@example.com"),
            Voter::new(3, "Tony the Tiger", "tony@example.com"),
        ]
    }

    async fn client_with(store: Arc<dyn VoterStore>) -> Client {
        let rocket = routes::stage(rocket::build(), AppState::new(store));
        Client::tracked(rocket).await.unwrap()
    }

    async fn client() -> Client {
        client_with(Arc::new(MemoryStore::new())).await
    }

    async fn post_json(client: &Client, uri: String, body: &impl serde::Serialize) -> Status {
        client.post(uri)
            .header(ContentType::JSON)
            .body(serde_json::to_string(body).unwrap())
            .dispatch()
            .await
            .status()
    }

    async fn seed(client: &Client) {
        for v in test_voters() {
            assert_eq!(post_json(client, format!("/voters/{}", v.id), &v).await, Status::Created);
        }
    }

    async fn health(client: &Client) -> HealthCheckResult {
        let response = client.get("/voters/health").dispatch().await;
        assert_eq!(response.status(), Status::Ok);
        response.into_json().await.unwrap()
    }

    #[rocket::async_test]
    async fn test_health_before_activity() {
        let client = client().await;
        let h = health(&client).await;
        assert_eq!(h.status, "ok");
        assert_eq!(h.db_health, "ok");
        assert_eq!(h.transactions, 0);
        assert_eq!(h.errors, 0);
    }

    #[rocket::async_test]
    async fn test_empty_list_is_json_array() {
        let client = client().await;
        let response = client.get("/voters").dispatch().await;
        assert_eq!(response.status(), Status::Ok);
        assert_eq!(response.into_string().await.unwrap(), "[]");
    }

    #[rocket::async_test]
    async fn test_create_list_delete() {
        let client = client().await;
        seed(&client).await;

        let all: Vec<Voter> = client.get("/voters").dispatch().await.into_json().await.unwrap();
        assert_eq!(all, test_voters());

        let fetched: Voter = client.get("/voters/1").dispatch().await.into_json().await.unwrap();
        assert_eq!(fetched, test_voters()[0]);

        assert_eq!(client.delete("/voters/1").dispatch().await.status(), Status::Ok);
        let all: Vec<Voter> = client.get("/voters").dispatch().await.into_json().await.unwrap();
        assert_eq!(all.len(), 2);

        let response = client.get("/voters/1").dispatch().await;
        assert_eq!(response.status(), Status::NotFound);
        let body: ErrorResponse = response.into_json().await.unwrap();
        assert_eq!(body.code, Some(ErrorCode::NotFound));

        assert_eq!(client.delete("/voters/1").dispatch().await.status(), Status::NotFound);

        assert_eq!(client.delete("/voters").dispatch().await.status(), Status::Ok);
        let all: Vec<Voter> = client.get("/voters").dispatch().await.into_json().await.unwrap();
        assert!(all.is_empty());
    }

    #[rocket::async_test]
    async fn test_duplicate_create_conflicts() {
        let client = client().await;
        seed(&client).await;

        let impostor = Voter::new(2, "Franken Berry", "");
        assert_eq!(post_json(&client, "/voters/2".into(), &impostor).await, Status::Conflict);

        let stored: Voter = client.get("/voters/2").dispatch().await.into_json().await.unwrap();
        assert_eq!(stored.name, "Captain Crunch");
    }

    #[rocket::async_test]
    async fn test_create_rejects_bad_payloads() {
        let client = client().await;

        let mismatched = Voter::new(5, "Lucky", "");
        assert_eq!(post_json(&client, "/voters/4".into(), &mismatched).await, Status::BadRequest);

        let nameless = Voter::new(4, "", "");
        assert_eq!(post_json(&client, "/voters/4".into(), &nameless).await, Status::BadRequest);

        let repeated = Voter::new(4, "Lucky", "").with_history(vec![
            VoterHistory::new(1, 1, vote_date()),
            VoterHistory::new(1, 2, vote_date()),
        ]);
        assert_eq!(post_json(&client, "/voters/4".into(), &repeated).await, Status::BadRequest);

        let response = client.post("/voters/4")
            .header(ContentType::JSON)
            .body("{\"id\": \"four\"}")
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::BadRequest);

        let all: Vec<Voter> = client.get("/voters").dispatch().await.into_json().await.unwrap();
        assert!(all.is_empty());
    }

    #[rocket::async_test]
    async fn test_body_without_content_type() {
        let client = client().await;

        let response = client.post("/voters/4").body("not json").dispatch().await;
        assert_eq!(response.status(), Status::BadRequest);
        let body: ErrorResponse = response.into_json().await.unwrap();
        assert_eq!(body.code, Some(ErrorCode::InvalidInput));

        let response = client.put("/voters/4/polls/1").body("").dispatch().await;
        assert_eq!(response.status(), Status::BadRequest);

        let voter = Voter::new(4, "Lucky", "");
        let response = client.post("/voters/4")
            .body(serde_json::to_string(&voter).unwrap())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Created);
    }

    #[rocket::async_test]
    async fn test_large_ids_are_accepted() {
        let client = client().await;
        for id in [i64::MAX as u64 + 1, u64::MAX] {
            let voter = json!({ "id": id, "name": "Big Number" });
            assert_eq!(post_json(&client, format!("/voters/{}", id), &voter).await, Status::Created);
            let stored: Voter = client.get(format!("/voters/{}", id)).dispatch().await.into_json().await.unwrap();
            assert_eq!(stored.id, id);
        }
    }

    #[rocket::async_test]
    async fn test_update_preserves_history() {
        let client = client().await;
        seed(&client).await;

        let update = Voter::new(1, "Count Chocula Jr", "junior@example.com")
            .with_history(vec![VoterHistory::new(99, 99, vote_date())]);
        let response = client.put("/voters/1")
            .header(ContentType::JSON)
            .body(serde_json::to_string(&update).unwrap())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
        let returned: Voter = response.into_json().await.unwrap();
        assert_eq!(returned.history, test_voters()[0].history);

        let stored: Voter = client.get("/voters/1").dispatch().await.into_json().await.unwrap();
        assert_eq!(stored.name, "Count Chocula Jr");
        assert_eq!(stored.email, "junior@example.com");
        assert_eq!(stored.history, test_voters()[0].history);
    }

    #[rocket::async_test]
    async fn test_update_missing_voter() {
        let client = client().await;
        let response = client.put("/voters/9")
            .header(ContentType::JSON)
            .body(serde_json::to_string(&Voter::new(9, "Ohno Wontwork", "")).unwrap())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::NotFound);
    }

    #[rocket::async_test]
    async fn test_poll_lifecycle() {
        let client = client().await;
        seed(&client).await;

        let first = VoterHistory::new(5, 1, vote_date());
        assert_eq!(post_json(&client, "/voters/2/polls/5".into(), &first).await, Status::Created);

        let fetched: VoterHistory = client.get("/voters/2/polls/5").dispatch().await.into_json().await.unwrap();
        assert_eq!(fetched, first);

        let second = VoterHistory::new(5, 2, vote_date());
        assert_eq!(post_json(&client, "/voters/2/polls/5".into(), &second).await, Status::Conflict);

        let third = VoterHistory::new(5, 3, vote_date());
        let response = client.put("/voters/2/polls/5")
            .header(ContentType::JSON)
            .body(serde_json::to_string(&third).unwrap())
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Ok);
        let fetched: VoterHistory = client.get("/voters/2/polls/5").dispatch().await.into_json().await.unwrap();
        assert_eq!(fetched, third);

        let history: Vec<VoterHistory> = client.get("/voters/2/polls").dispatch().await.into_json().await.unwrap();
        assert_eq!(history, vec![third]);

        assert_eq!(client.delete("/voters/2/polls/5").dispatch().await.status(), Status::Ok);

        let response = client.get("/voters/2/polls/5").dispatch().await;
        assert_eq!(response.status(), Status::NotFound);
        let body: ErrorResponse = response.into_json().await.unwrap();
        assert_eq!(body.code, Some(ErrorCode::PollNotFound));

        assert_eq!(client.delete("/voters/2/polls/5").dispatch().await.status(), Status::NotFound);
    }

    #[rocket::async_test]
    async fn test_poll_routes_check_ids() {
        let client = client().await;
        seed(&client).await;

        let entry = VoterHistory::new(6, 1, vote_date());
        assert_eq!(post_json(&client, "/voters/2/polls/7".into(), &entry).await, Status::BadRequest);

        let response = client.get("/voters/42/polls/1").dispatch().await;
        assert_eq!(response.status(), Status::NotFound);
        let body: ErrorResponse = response.into_json().await.unwrap();
        assert_eq!(body.code, Some(ErrorCode::NotFound));

        assert_eq!(post_json(&client, "/voters/42/polls/6".into(), &entry).await, Status::NotFound);
        assert_eq!(client.get("/voters/42/polls").dispatch().await.status(), Status::NotFound);
    }

    #[rocket::async_test]
    async fn test_non_numeric_ids_are_rejected() {
        let client = client().await;
        assert_eq!(client.get("/voters/abc").dispatch().await.status(), Status::UnprocessableEntity);
        assert_eq!(client.get("/voters/-1/polls").dispatch().await.status(), Status::UnprocessableEntity);
        assert_eq!(client.get("/ballots").dispatch().await.status(), Status::NotFound);
    }

    #[rocket::async_test]
    async fn test_health_counts_requests_and_errors() {
        let client = client().await;
        seed(&client).await;
        client.get("/voters/1").dispatch().await;
        client.get("/voters/77").dispatch().await;

        let h = health(&client).await;
        assert_eq!(h.transactions, 5);
        assert_eq!(h.errors, 1);
        assert_eq!(h.version, env!("CARGO_PKG_VERSION"));
    }

    #[rocket::async_test]
    async fn test_cors_headers_for_localhost() {
        let client = client().await;
        let response = client.get("/voters")
            .header(rocket::http::Header::new("Origin", "http://localhost:3000"))
            .dispatch()
            .await;
        assert_eq!(
            response.headers().get_one("Access-Control-Allow-Origin"),
            Some("http://localhost:3000")
        );

        let response = client.get("/voters")
            .header(rocket::http::Header::new("Origin", "https://example.com"))
            .dispatch()
            .await;
        assert_eq!(response.headers().get_one("Access-Control-Allow-Origin"), None);
    }

    /// Delegates to a memory store, pausing before every voter read or write
    /// so that other requests can land in between.
    struct SlowStore {
        inner: MemoryStore,
        pause: Duration,
    }

    #[async_trait]
    impl VoterStore for SlowStore {
        async fn create(&self, voter: Voter) -> Result<(), StoreError> { self.inner.create(voter).await }
        async fn read(&self, id: u64) -> Result<Voter, StoreError> {
            tokio::time::sleep(self.pause).await;
            self.inner.read(id).await
        }
        async fn read_all(&self) -> Result<Vec<Voter>, StoreError> { self.inner.read_all().await }
        async fn update(&self, voter: Voter) -> Result<(), StoreError> {
            tokio::time::sleep(self.pause).await;
            self.inner.update(voter).await
        }
        async fn update_profile(&self, voter: Voter) -> Result<Voter, StoreError> {
            tokio::time::sleep(self.pause).await;
            self.inner.update_profile(voter).await
        }
        async fn delete(&self, id: u64) -> Result<(), StoreError> { self.inner.delete(id).await }
        async fn delete_all(&self) -> Result<(), StoreError> { self.inner.delete_all().await }
        async fn health_check(&self) -> String { self.inner.health_check().await }
        async fn get_by_poll(&self, voter_id: u64, poll_id: u64) -> Result<VoterHistory, StoreError> {
            self.inner.get_by_poll(voter_id, poll_id).await
        }
        async fn add_by_poll(&self, voter_id: u64, poll_id: u64, entry: VoterHistory) -> Result<VoterHistory, StoreError> {
            self.inner.add_by_poll(voter_id, poll_id, entry).await
        }
        async fn update_by_poll(&self, voter_id: u64, poll_id: u64, entry: VoterHistory) -> Result<VoterHistory, StoreError> {
            self.inner.update_by_poll(voter_id, poll_id, entry).await
        }
        async fn delete_by_poll(&self, voter_id: u64, poll_id: u64) -> Result<(), StoreError> {
            self.inner.delete_by_poll(voter_id, poll_id).await
        }
    }

    #[rocket::async_test]
    async fn test_update_during_poll_add_keeps_entry() {
        let store = SlowStore { inner: MemoryStore::new(), pause: Duration::from_millis(200) };
        let client = client_with(Arc::new(store)).await;
        seed(&client).await;

        let entry = VoterHistory::new(5, 7, vote_date());
        let update = Voter::new(1, "Count Chocula Jr", "junior@example.com");
        let put = async {
            client.put("/voters/1")
                .header(ContentType::JSON)
                .body(serde_json::to_string(&update).unwrap())
                .dispatch()
                .await
                .status()
        };
        let post = async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            post_json(&client, "/voters/1/polls/5".into(), &entry).await
        };
        let (put_status, post_status) = tokio::join!(put, post);
        assert_eq!(put_status, Status::Ok);
        assert_eq!(post_status, Status::Created);

        let stored: Voter = client.get("/voters/1").dispatch().await.into_json().await.unwrap();
        assert_eq!(stored.name, "Count Chocula Jr");
        assert_eq!(stored.history, vec![VoterHistory::new(1, 1, vote_date()), entry]);
    }

    struct UnreachableStore;

    #[async_trait]
    impl VoterStore for UnreachableStore {
        async fn create(&self, _: Voter) -> Result<(), StoreError> { Err(down()) }
        async fn read(&self, _: u64) -> Result<Voter, StoreError> { Err(down()) }
        async fn read_all(&self) -> Result<Vec<Voter>, StoreError> { Err(down()) }
        async fn update(&self, _: Voter) -> Result<(), StoreError> { Err(down()) }
        async fn update_profile(&self, _: Voter) -> Result<Voter, StoreError> { Err(down()) }
        async fn delete(&self, _: u64) -> Result<(), StoreError> { Err(down()) }
        async fn delete_all(&self) -> Result<(), StoreError> { Err(down()) }
        async fn health_check(&self) -> String { "connection refused".into() }
        async fn get_by_poll(&self, _: u64, _: u64) -> Result<VoterHistory, StoreError> { Err(down()) }
        async fn add_by_poll(&self, _: u64, _: u64, _: VoterHistory) -> Result<VoterHistory, StoreError> { Err(down()) }
        async fn update_by_poll(&self, _: u64, _: u64, _: VoterHistory) -> Result<VoterHistory, StoreError> { Err(down()) }
        async fn delete_by_poll(&self, _: u64, _: u64) -> Result<(), StoreError> { Err(down()) }
    }

    fn down() -> StoreError {
        StoreError::StorageUnavailable("connection refused".into())
    }

    #[rocket::async_test]
    async fn test_unreachable_storage() {
        let client = client_with(Arc::new(UnreachableStore)).await;

        let response = client.get("/voters").dispatch().await;
        assert_eq!(response.status(), Status::ServiceUnavailable);
        let body: ErrorResponse = response.into_json().await.unwrap();
        assert_eq!(body.code, Some(ErrorCode::StorageUnavailable));

        let h = health(&client).await;
        assert_eq!(h.status, "ok");
        assert_eq!(h.db_health, "connection refused");
        assert_eq!(h.errors, 1);
    }
}
