use std::sync::Arc;

use axum::http::{header, HeaderValue, StatusCode};
use axum_test::{TestRequest, TestResponse, TestServer};
use serde_json::{json, Value};

use skillify_auth::{Claims, JwtService};
use skillify_common::{UserRole, MAX_PAGE};
use skillify_marketplace::{build_app, store::MemoryStore, AppConfig, AppState};

struct TestApp {
    server: TestServer,
    store: Arc<MemoryStore>,
}

fn test_config() -> AppConfig {
    AppConfig::from_vars(|key| match key {
        "BCRYPT_COST" => Some("4".to_string()),
        "JWT_SECRET" => Some("test-secret".to_string()),
        _ => None,
    })
    .unwrap()
}

fn create_test_app() -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let state = AppState::new(store.clone(), test_config());
    let server = TestServer::new(build_app(state)).unwrap();
    TestApp { server, store }
}

fn bearer(token: &str) -> HeaderValue {
    HeaderValue::from_str(&format!("Bearer {}", token)).unwrap()
}

fn with_query(mut request: TestRequest, query: &[(&str, &str)]) -> TestRequest {
    for (key, value) in query {
        request = request.add_query_param(key, value);
    }
    request
}

fn message(response: &TestResponse) -> String {
    response.json::<Value>()["message"]
        .as_str()
        .unwrap_or_default()
        .to_string()
}

impl TestApp {
    /// Signs up and returns the bearer token.
    async fn signup(&self, name: &str, email: &str, role: &str) -> String {
        let response = self
            .server
            .post("/auth/signup")
            .json(&json!({
                "name": name,
                "email": email,
                "password": "password123",
                "role": role,
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        response.json::<Value>()["data"]["token"]
            .as_str()
            .unwrap()
            .to_string()
    }

    async fn get(&self, path: &str, token: &str) -> TestResponse {
        self.get_query(path, token, &[]).await
    }

    async fn get_query(&self, path: &str, token: &str, query: &[(&str, &str)]) -> TestResponse {
        with_query(self.server.get(path), query)
            .add_header(header::AUTHORIZATION, bearer(token))
            .await
    }

    async fn post(&self, path: &str, token: &str, body: Value) -> TestResponse {
        self.server
            .post(path)
            .add_header(header::AUTHORIZATION, bearer(token))
            .json(&body)
            .await
    }

    async fn patch(&self, path: &str, token: &str, body: Value) -> TestResponse {
        self.server
            .patch(path)
            .add_header(header::AUTHORIZATION, bearer(token))
            .json(&body)
            .await
    }

    async fn delete(&self, path: &str, token: &str) -> TestResponse {
        self.server
            .delete(path)
            .add_header(header::AUTHORIZATION, bearer(token))
            .await
    }

    async fn mentor_profile_id(&self, mentor_token: &str) -> String {
        let response = self.get("/mentors/profile", mentor_token).await;
        response.assert_status_ok();
        response.json::<Value>()["data"]["id"]
            .as_str()
            .unwrap()
            .to_string()
    }

    async fn mentor_rating(&self, mentor_id: &str) -> f64 {
        let response = self.server.get(&format!("/mentors/{}", mentor_id)).await;
        response.assert_status_ok();
        response.json::<Value>()["data"]["rating"].as_f64().unwrap()
    }

    async fn book(&self, learner_token: &str, mentor_id: &str, date: &str) -> String {
        let response = self
            .post(
                "/sessions",
                learner_token,
                json!({ "mentorId": mentor_id, "date": date }),
            )
            .await;
        response.assert_status(StatusCode::CREATED);
        let body = response.json::<Value>();
        assert_eq!(body["data"]["status"], "CONFIRMED");
        body["data"]["id"].as_str().unwrap().to_string()
    }
}

/// Mentor, learner, and the mentor's profile id.
async fn mentor_and_learner(app: &TestApp) -> (String, String, String) {
    let mentor = app.signup("Grace Hopper", "grace@example.com", "MENTOR").await;
    let learner = app.signup("Ada Lovelace", "ada@example.com", "LEARNER").await;
    let mentor_id = app.mentor_profile_id(&mentor).await;
    (mentor, learner, mentor_id)
}

#[tokio::test]
async fn test_health_endpoints() {
    let app = create_test_app();

    let response = app.server.get("/health").await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["status"], "OK");

    let response = app.server.get("/health/db").await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>(), json!({ "ok": true }));
}

#[tokio::test]
async fn test_unknown_route() {
    let app = create_test_app();

    let response = app.server.get("/nope").await;
    response.assert_status(StatusCode::NOT_FOUND);
    let body = response.json::<Value>();
    assert_eq!(body["message"], "Route not found");
    assert_eq!(body["path"], "/nope");
    assert_eq!(body["method"], "GET");
}

#[tokio::test]
async fn test_signup_sets_cookie_and_me_returns_profile() {
    let app = create_test_app();

    let response = app
        .server
        .post("/auth/signup")
        .json(&json!({
            "name": "Ada",
            "email": "ada@example.com",
            "password": "password123",
            "role": "LEARNER",
        }))
        .await;
    response.assert_status(StatusCode::CREATED);

    let cookie = response.header(header::SET_COOKIE);
    let cookie = cookie.to_str().unwrap();
    assert!(cookie.starts_with("token="));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Strict"));
    assert!(!cookie.contains("; Secure"));

    let body = response.json::<Value>();
    assert_eq!(body["data"]["user"]["role"], "LEARNER");
    assert!(body["data"]["user"].get("passwordHash").is_none());

    // The cookie alone authenticates.
    let token = body["data"]["token"].as_str().unwrap();
    let response = app
        .server
        .get("/auth/me")
        .add_header(
            header::COOKIE,
            HeaderValue::from_str(&format!("token={}", token)).unwrap(),
        )
        .await;
    response.assert_status_ok();
    let me = response.json::<Value>();
    assert_eq!(me["data"]["email"], "ada@example.com");
    assert!(me["data"]["learnerProfile"]["id"].is_string());
    assert!(me["data"]["mentorProfile"].is_null());
}

#[tokio::test]
async fn test_signup_validation() {
    let app = create_test_app();
    let cases = [
        (json!({ "name": "A", "email": "a@example.com", "password": "secret1" }), "All fields are required"),
        (json!({ "name": "A", "email": "not-an-email", "password": "secret1", "role": "LEARNER" }), "Invalid email format"),
        (json!({ "name": "A", "email": "a@example.com", "password": "secret1", "role": "ADMIN" }), "Invalid role"),
        (json!({ "name": "A", "email": "a@example.com", "password": "short", "role": "LEARNER" }), "Password must be at least 6 characters long"),
    ];

    for (body, expected) in cases {
        let response = app.server.post("/auth/signup").json(&body).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(message(&response), expected);
    }
}

#[tokio::test]
async fn test_duplicate_signup_conflicts() {
    let app = create_test_app();
    app.signup("Ada", "ada@example.com", "LEARNER").await;

    let response = app
        .server
        .post("/auth/signup")
        .json(&json!({
            "name": "Ada Again",
            "email": "ada@example.com",
            "password": "password123",
            "role": "MENTOR",
        }))
        .await;
    response.assert_status(StatusCode::CONFLICT);
    assert_eq!(message(&response), "User already exists");
}

#[tokio::test]
async fn test_signup_is_all_or_nothing() {
    let app = create_test_app();
    app.store.fail_next_profile_insert();

    let response = app
        .server
        .post("/auth/signup")
        .json(&json!({
            "name": "Ghost",
            "email": "ghost@example.com",
            "password": "password123",
            "role": "MENTOR",
        }))
        .await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(message(&response), "Internal server error");

    // Neither the user nor the profile was kept, so the email is still free.
    let response = app
        .server
        .post("/auth/login")
        .json(&json!({ "email": "ghost@example.com", "password": "password123" }))
        .await;
    response.assert_status_unauthorized();
    app.signup("Ghost", "ghost@example.com", "MENTOR").await;
}

#[tokio::test]
async fn test_login_and_logout() {
    let app = create_test_app();
    app.signup("Ada", "ada@example.com", "LEARNER").await;

    let response = app
        .server
        .post("/auth/login")
        .json(&json!({ "email": "ada@example.com", "password": "password123" }))
        .await;
    response.assert_status_ok();
    assert_eq!(message(&response), "Login successful");

    let response = app
        .server
        .post("/auth/login")
        .json(&json!({ "email": "ada@example.com", "password": "wrong-password" }))
        .await;
    response.assert_status_unauthorized();
    assert_eq!(message(&response), "Invalid credentials");

    let response = app.server.post("/auth/login").json(&json!({})).await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(message(&response), "Email and password are required");

    let response = app.server.post("/auth/logout").await;
    response.assert_status_ok();
    let cookie = response.header(header::SET_COOKIE);
    assert!(cookie.to_str().unwrap().contains("Max-Age=0"));
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let app = create_test_app();

    let response = app.server.get("/sessions").await;
    response.assert_status_unauthorized();
    assert_eq!(message(&response), "Unauthorized - No token provided");

    let response = app.get("/auth/me", "garbage").await;
    response.assert_status_unauthorized();
    assert_eq!(message(&response), "Unauthorized - Invalid token");
}

#[tokio::test]
async fn test_booking_rules() {
    let app = create_test_app();
    let (mentor, learner, mentor_id) = mentor_and_learner(&app).await;

    let response = app
        .post("/sessions", &mentor, json!({ "mentorId": mentor_id, "date": "2030-01-01" }))
        .await;
    response.assert_status(StatusCode::FORBIDDEN);
    assert_eq!(message(&response), "Only learners can book sessions");

    let response = app.post("/sessions", &learner, json!({ "mentorId": mentor_id })).await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(message(&response), "Mentor ID and date are required");

    let response = app
        .post(
            "/sessions",
            &learner,
            json!({ "mentorId": uuid::Uuid::new_v4(), "date": "2030-01-01" }),
        )
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(message(&response), "Mentor not found");

    // No slot exclusivity: the same slot can be booked twice.
    app.book(&learner, &mentor_id, "2030-01-01T10:00:00Z").await;
    app.book(&learner, &mentor_id, "2030-01-01T10:00:00Z").await;
}

#[tokio::test]
async fn test_review_lifecycle_updates_rating() {
    let app = create_test_app();
    let (mentor, learner, mentor_id) = mentor_and_learner(&app).await;
    let session_id = app.book(&learner, &mentor_id, "2030-01-01T10:00:00Z").await;

    // Not completed yet.
    let response = app
        .post("/reviews", &learner, json!({ "sessionId": session_id, "rating": 4 }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(message(&response), "Can only review completed sessions");

    let response = app
        .patch(
            &format!("/sessions/{}", session_id),
            &mentor,
            json!({ "status": "COMPLETED" }),
        )
        .await;
    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(body["data"]["status"], "COMPLETED");
    assert_eq!(body["data"]["mentor"]["user"]["name"], "Grace Hopper");
    assert_eq!(body["data"]["learner"]["user"]["name"], "Ada Lovelace");

    let response = app
        .post("/reviews", &learner, json!({ "sessionId": session_id, "rating": 6 }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(message(&response), "Rating must be between 1 and 5");

    let response = app
        .post(
            "/reviews",
            &learner,
            json!({ "sessionId": session_id, "rating": 4, "comment": "Very helpful" }),
        )
        .await;
    response.assert_status(StatusCode::CREATED);
    let review = response.json::<Value>();
    let review_id = review["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(review["data"]["session"]["mentor"]["user"]["name"], "Grace Hopper");
    assert_eq!(app.mentor_rating(&mentor_id).await, 4.0);

    let response = app
        .post("/reviews", &learner, json!({ "sessionId": session_id, "rating": 5 }))
        .await;
    response.assert_status(StatusCode::CONFLICT);
    assert_eq!(message(&response), "Review already exists for this session");

    let response =
        with_query(app.server.get("/reviews"), &[("mentorId", mentor_id.as_str())]).await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["data"].as_array().unwrap().len(), 1);

    // Completed sessions with a review are kept.
    let response = app.delete(&format!("/sessions/{}", session_id), &learner).await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(message(&response), "Cannot delete completed sessions with reviews");

    let response = app.delete(&format!("/reviews/{}", review_id), &mentor).await;
    response.assert_status(StatusCode::FORBIDDEN);
    assert_eq!(message(&response), "Only learners can delete reviews");

    let response = app.delete(&format!("/reviews/{}", review_id), &learner).await;
    response.assert_status_ok();
    assert_eq!(app.mentor_rating(&mentor_id).await, 0.0);

    let response = app.delete(&format!("/sessions/{}", session_id), &learner).await;
    response.assert_status_ok();
}

#[tokio::test]
async fn test_rating_is_mean_of_reviews() {
    let app = create_test_app();
    let (mentor, learner, mentor_id) = mentor_and_learner(&app).await;

    for rating in [5, 4, 4] {
        let session_id = app.book(&learner, &mentor_id, "2030-02-01").await;
        app.patch(
            &format!("/sessions/{}", session_id),
            &mentor,
            json!({ "status": "COMPLETED" }),
        )
        .await
        .assert_status_ok();
        app.post("/reviews", &learner, json!({ "sessionId": session_id, "rating": rating }))
            .await
            .assert_status(StatusCode::CREATED);
    }

    // 13 / 3 rounded to two places.
    assert_eq!(app.mentor_rating(&mentor_id).await, 4.33);
}

#[tokio::test]
async fn test_only_parties_touch_a_session() {
    let app = create_test_app();
    let (_mentor, learner, mentor_id) = mentor_and_learner(&app).await;
    let outsider = app.signup("Eve", "eve@example.com", "LEARNER").await;
    let other_mentor = app.signup("Linus", "linus@example.com", "MENTOR").await;
    let session_id = app.book(&learner, &mentor_id, "2030-01-01").await;
    let path = format!("/sessions/{}", session_id);

    for token in [&outsider, &other_mentor] {
        let response = app.patch(&path, token, json!({ "status": "CANCELLED" })).await;
        response.assert_status(StatusCode::FORBIDDEN);
        assert_eq!(message(&response), "You can only update your own sessions");

        let response = app.delete(&path, token).await;
        response.assert_status(StatusCode::FORBIDDEN);
        assert_eq!(message(&response), "You can only delete your own sessions");
    }

    let response = app
        .post(
            "/reviews",
            &outsider,
            json!({ "sessionId": session_id, "rating": 1 }),
        )
        .await;
    response.assert_status(StatusCode::FORBIDDEN);
    assert_eq!(message(&response), "You can only review your own sessions");

    // Any status may follow any other.
    for status in ["COMPLETED", "PENDING", "CANCELLED"] {
        let response = app.patch(&path, &learner, json!({ "status": status })).await;
        response.assert_status_ok();
        assert_eq!(response.json::<Value>()["data"]["status"], status);
    }

    let response = app.patch(&path, &learner, json!({ "status": "DONE" })).await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(message(&response), "Invalid status");

    let response = app.patch(&path, &learner, json!({})).await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(message(&response), "Status is required");

    let response = app.delete(&path, &learner).await;
    response.assert_status_ok();
    app.get(&path, &learner).await.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_session_listing_filters_and_pages() {
    let app = create_test_app();
    let (mentor, learner, mentor_id) = mentor_and_learner(&app).await;

    let mut confirmed = Vec::new();
    for day in ["2030-01-05", "2030-01-03", "2030-01-04"] {
        confirmed.push(app.book(&learner, &mentor_id, day).await);
    }
    let cancelled = app.book(&learner, &mentor_id, "2030-01-01").await;
    app.patch(
        &format!("/sessions/{}", cancelled),
        &learner,
        json!({ "status": "CANCELLED" }),
    )
    .await
    .assert_status_ok();

    let response = app
        .get_query(
            "/sessions",
            &learner,
            &[("status", "CONFIRMED"), ("page", "1"), ("limit", "2")],
        )
        .await;
    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(
        body["meta"],
        json!({ "total": 3, "page": 1, "limit": 2, "totalPages": 2 })
    );
    let dates: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["date"].as_str().unwrap())
        .collect();
    assert_eq!(dates.len(), 2);
    assert!(dates[0].starts_with("2030-01-03"));
    assert!(dates[1].starts_with("2030-01-04"));

    // The mentor sees the same bookings from the other side.
    let response = app.get_query("/sessions", &mentor, &[("startDate", "2030-01-04")]).await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["meta"]["total"], 2);

    let response = app.get_query("/sessions", &learner, &[("status", "BOGUS")]).await;
    response.assert_status(StatusCode::BAD_REQUEST);

    // Limits are clamped.
    let response = app
        .get_query("/sessions", &learner, &[("limit", "1000"), ("page", "0")])
        .await;
    let meta = &response.json::<Value>()["meta"];
    assert_eq!(meta["limit"], 100);
    assert_eq!(meta["page"], 1);

    // Pages past any offset the store can express are capped, not overflowed.
    let response = app
        .get_query(
            "/sessions",
            &learner,
            &[("page", "9223372036854775807"), ("limit", "100")],
        )
        .await;
    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(body["meta"]["page"], MAX_PAGE);
    assert_eq!(body["meta"]["total"], 4);
    assert!(body["data"].as_array().unwrap().is_empty());

    let outsider = app.signup("Eve", "eve@example.com", "LEARNER").await;
    let response = app.get("/sessions", &outsider).await;
    assert_eq!(
        response.json::<Value>()["meta"],
        json!({ "total": 0, "page": 1, "limit": 10, "totalPages": 0 })
    );
}

#[tokio::test]
async fn test_profiles_and_mentor_search() {
    let app = create_test_app();
    let (mentor, learner, _) = mentor_and_learner(&app).await;
    let second = app.signup("Linus", "linus@example.com", "MENTOR").await;

    let response = app
        .server
        .put("/mentors/profile")
        .add_header(header::AUTHORIZATION, bearer(&mentor))
        .json(&json!({
            "bio": "Compilers and COBOL",
            "pricePerHour": 80,
            "experience": 30,
            "skills": ["COBOL", { "name": "Compilers" }],
        }))
        .await;
    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(
        body["data"]["skills"],
        json!([{ "name": "COBOL" }, { "name": "Compilers" }])
    );

    app.server
        .put("/mentors/profile")
        .add_header(header::AUTHORIZATION, bearer(&second))
        .json(&json!({ "pricePerHour": 200, "experience": 5 }))
        .await
        .assert_status_ok();

    let response = app
        .server
        .put("/mentors/profile")
        .add_header(header::AUTHORIZATION, bearer(&second))
        .json(&json!({ "pricePerHour": -1 }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let response = app
        .server
        .put("/mentors/profile")
        .add_header(header::AUTHORIZATION, bearer(&learner))
        .json(&json!({ "bio": "nope" }))
        .await;
    response.assert_status(StatusCode::FORBIDDEN);
    assert_eq!(message(&response), "Only mentors can update mentor profiles");

    let response = with_query(app.server.get("/mentors"), &[("sort", "price_desc")]).await;
    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(body["meta"]["total"], 2);
    assert_eq!(body["data"][0]["user"]["name"], "Linus");

    let response = with_query(app.server.get("/mentors"), &[("search", "cobol")]).await;
    let body = response.json::<Value>();
    assert_eq!(body["meta"]["total"], 1);
    assert_eq!(body["data"][0]["user"]["name"], "Grace Hopper");

    let response = with_query(
        app.server.get("/mentors"),
        &[("maxPrice", "100"), ("experience", "10")],
    )
    .await;
    assert_eq!(response.json::<Value>()["meta"]["total"], 1);

    let response = with_query(app.server.get("/mentors"), &[("minPrice", "abc")]).await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let response = with_query(
        app.server.get("/mentors"),
        &[("page", "9223372036854775807"), ("limit", "100")],
    )
    .await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["meta"]["page"], MAX_PAGE);

    let response = app
        .server
        .put("/learners/profile")
        .add_header(header::AUTHORIZATION, bearer(&learner))
        .json(&json!({ "age": 0 }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let response = app
        .server
        .put("/learners/profile")
        .add_header(header::AUTHORIZATION, bearer(&learner))
        .json(&json!({ "bio": "Learning Rust", "age": 28, "skillsWanted": ["Rust"] }))
        .await;
    response.assert_status_ok();

    let response = app.get("/learners/profile", &learner).await;
    let body = response.json::<Value>();
    assert_eq!(body["data"]["age"], 28);
    assert_eq!(body["data"]["skillsWanted"], json!(["Rust"]));

    let response = app.get("/learners/profile", &mentor).await;
    response.assert_status(StatusCode::FORBIDDEN);
    assert_eq!(message(&response), "Only learners can access learner profiles");
}

#[tokio::test]
async fn test_missing_resources_are_not_found() {
    let app = create_test_app();
    let (mentor, learner, mentor_id) = mentor_and_learner(&app).await;
    let unknown = uuid::Uuid::new_v4().to_string();

    let response = app
        .post("/reviews", &learner, json!({ "sessionId": unknown, "rating": 5 }))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(message(&response), "Session not found");

    let session_path = format!("/sessions/{}", unknown);
    let response = app
        .patch(&session_path, &mentor, json!({ "status": "COMPLETED" }))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(message(&response), "Session not found");

    let response = app.delete(&session_path, &learner).await;
    response.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(message(&response), "Session not found");

    let response = app.delete(&format!("/reviews/{}", unknown), &learner).await;
    response.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(message(&response), "Review not found");

    // Ids that are not UUIDs name nothing either.
    let response = app.get("/sessions/not-a-uuid", &learner).await;
    response.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(message(&response), "Session not found");

    let response = app.server.get("/mentors/42").await;
    response.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(message(&response), "Mentor not found");

    let response = app.delete("/reviews/xyz", &learner).await;
    response.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(message(&response), "Review not found");

    // A valid learner token whose account has no learner profile.
    let config = test_config();
    let claims = Claims::new(
        uuid::Uuid::new_v4(),
        "orphan@example.com".to_string(),
        UserRole::Learner,
        &config.jwt,
    );
    let orphan = JwtService::new(&config.jwt).generate_token(&claims).unwrap();
    let response = app
        .post(
            "/sessions",
            &orphan,
            json!({ "mentorId": mentor_id, "date": "2030-01-01" }),
        )
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(message(&response), "Learner profile not found");
}

#[tokio::test]
async fn test_reviews_belong_to_their_author() {
    let app = create_test_app();
    let (mentor, learner, mentor_id) = mentor_and_learner(&app).await;
    let other_learner = app.signup("Eve", "eve@example.com", "LEARNER").await;

    let session_id = app.book(&learner, &mentor_id, "2030-03-01").await;
    app.patch(
        &format!("/sessions/{}", session_id),
        &mentor,
        json!({ "status": "COMPLETED" }),
    )
    .await
    .assert_status_ok();
    let response = app
        .post("/reviews", &learner, json!({ "sessionId": session_id, "rating": 3 }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let review_id = response.json::<Value>()["data"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let response = app
        .delete(&format!("/reviews/{}", review_id), &other_learner)
        .await;
    response.assert_status(StatusCode::FORBIDDEN);
    assert_eq!(message(&response), "You can only delete your own reviews");
    assert_eq!(app.mentor_rating(&mentor_id).await, 3.0);

    let response =
        with_query(app.server.get("/reviews"), &[("sessionId", session_id.as_str())]).await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["data"][0]["id"], review_id);
}
