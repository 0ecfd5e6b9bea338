use campus_volunteer::{
    AppConfig, AppState, MemoryRepository, RepositoryState, create_router,
    models::{NewUser, Role},
    password::hash_password,
};
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_sessions::MemoryStore;

pub struct TestApp {
    pub address: String,
    pub repo: Arc<MemoryRepository>,
}

impl TestApp {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    /// A client that keeps the session cookie, like a browser tab.
    fn client(&self) -> Client {
        Client::builder()
            .cookie_store(true)
            .build()
            .expect("Failed to build client")
    }

    async fn admin_client(&self) -> Client {
        let password_hash = hash_password("admin-pw".to_string()).await.unwrap();
        self.repo
            .insert_user(NewUser {
                name: "Campus Admin".to_string(),
                email: "root@campus.edu".to_string(),
                password_hash,
                role: Role::Admin,
            })
            .unwrap();

        let client = self.client();
        let response = client
            .post(self.url("/api/login"))
            .json(&json!({"email": "root@campus.edu", "password": "admin-pw"}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        client
    }

    async fn volunteer_client(&self, name: &str) -> Client {
        let client = self.client();
        let response = client
            .post(self.url("/api/register"))
            .json(&json!({
                "name": name,
                "email": format!("{}@campus.edu", name.to_lowercase()),
                "password": "pw",
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        client
    }

    async fn create_event(&self, admin: &Client, slots: Value) -> Value {
        let response = admin
            .post(self.url("/api/events"))
            .json(&json!({
                "name": "Library Book Drive",
                "date": "2026-05-09",
                "venue": "Main Library",
                "category": "community",
                "slots": slots,
                "tagline": "Sort and shelve donated books.",
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        response.json().await.unwrap()
    }
}

async fn spawn_app() -> TestApp {
    spawn_app_with(Arc::new(MemoryRepository::new()), MemoryStore::default()).await
}

/// Starts a server over existing state, as a restarted process would see it.
async fn spawn_app_with(repo: Arc<MemoryRepository>, sessions: MemoryStore) -> TestApp {
    let state = AppState::new(repo.clone() as RepositoryState, AppConfig::default());
    let router = create_router(state, sessions);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    TestApp { address, repo }
}

async fn error_of(response: reqwest::Response) -> String {
    let body: Value = response.json().await.unwrap();
    body["error"].as_str().unwrap_or_default().to_string()
}

#[tokio::test]
async fn test_health_check() {
    let app = spawn_app().await;
    let response = app.client().get(app.url("/api/health")).send().await.expect("req fail");

    assert!(response.status().is_success());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({"status": "ok"}));
}

#[tokio::test]
async fn test_session_lifecycle() {
    let app = spawn_app().await;
    let client = app.client();

    let me: Value = client.get(app.url("/api/me")).send().await.unwrap().json().await.unwrap();
    assert!(me.is_null());

    let response = client
        .post(app.url("/api/register"))
        .json(&json!({"name": "Ada", "email": "Ada@Campus.edu", "password": "pw", "skill": "logistics"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let user: Value = response.json().await.unwrap();
    assert_eq!(user["email"], "ada@campus.edu");
    assert_eq!(user["role"], "volunteer");
    assert!(user.get("password_hash").is_none());

    let me: Value = client.get(app.url("/api/me")).send().await.unwrap().json().await.unwrap();
    assert_eq!(me["id"], user["id"]);

    let logout = client.post(app.url("/api/logout")).send().await.unwrap();
    assert_eq!(logout.status(), StatusCode::OK);
    let me: Value = client.get(app.url("/api/me")).send().await.unwrap().json().await.unwrap();
    assert!(me.is_null());

    let login = client
        .post(app.url("/api/login"))
        .json(&json!({"email": "ada@campus.edu", "password": "pw"}))
        .send()
        .await
        .unwrap();
    assert_eq!(login.status(), StatusCode::OK);
    let me: Value = client.get(app.url("/api/me")).send().await.unwrap().json().await.unwrap();
    assert_eq!(me["name"], "Ada");
}

#[tokio::test]
async fn test_session_survives_server_restart() {
    let repo = Arc::new(MemoryRepository::new());
    let sessions = MemoryStore::default();
    let first = spawn_app_with(repo.clone(), sessions.clone()).await;
    let client = first.volunteer_client("Grace").await;

    // A fresh server over the same session store still knows the cookie.
    let second = spawn_app_with(repo, sessions).await;
    let me: Value = client.get(second.url("/api/me")).send().await.unwrap().json().await.unwrap();
    assert_eq!(me["name"], "Grace");

    let mine = client.get(second.url("/api/applications")).send().await.unwrap();
    assert_eq!(mine.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_logout_without_session_succeeds() {
    let app = spawn_app().await;
    let response = app.client().post(app.url("/api/logout")).send().await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_duplicate_registration() {
    let app = spawn_app().await;
    app.volunteer_client("Ada").await;

    let response = app
        .client()
        .post(app.url("/api/register"))
        .json(&json!({"name": "Ada Again", "email": " ADA@campus.edu", "password": "x"}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_of(response).await, "Email already registered");
    assert_eq!(app.repo.user_count().unwrap(), 1);
}

#[tokio::test]
async fn test_malformed_json_uses_error_envelope() {
    let app = spawn_app().await;
    let response = app
        .client()
        .post(app.url("/api/login"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(!error_of(response).await.is_empty());
}

#[tokio::test]
async fn test_access_control() {
    let app = spawn_app().await;
    let anonymous = app.client();
    let volunteer = app.volunteer_client("Ada").await;
    let admin = app.admin_client().await;

    let response = anonymous.get(app.url("/api/applications")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(error_of(response).await, "Unauthorized");

    let response = anonymous.get(app.url("/api/volunteers")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = volunteer.get(app.url("/api/volunteers")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(error_of(response).await, "Forbidden");

    let response = volunteer.post(app.url("/api/seed")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = admin
        .put(app.url("/api/volunteers/me"))
        .json(&json!({"skill": "x"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let profiles: Vec<Value> = admin
        .get(app.url("/api/volunteers"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(profiles.len(), 1);
    assert_eq!(profiles[0]["email"], "ada@campus.edu");
}

#[tokio::test]
async fn test_single_slot_event() {
    let app = spawn_app().await;
    let admin = app.admin_client().await;
    let event = app.create_event(&admin, json!("1")).await;
    assert_eq!(event["slots"], 1);

    let a = app.volunteer_client("Alice").await;
    let b = app.volunteer_client("Bob").await;

    let response = a
        .post(app.url("/api/applications"))
        .json(&json!({"event_id": event["id"]}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let application: Value = response.json().await.unwrap();
    assert_eq!(application["status"], "applied");
    assert_eq!(application["event_name"], "Library Book Drive");

    let events: Vec<Value> = a.get(app.url("/api/events")).send().await.unwrap().json().await.unwrap();
    assert_eq!(events[0]["applicants"], 1);
    assert_eq!(events[0]["slots_left"], 0);
    assert_eq!(events[0]["applied"], true);

    let response = b
        .post(app.url("/api/applications"))
        .json(&json!({"event_id": event["id"]}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_of(response).await, "Event full");

    let mine: Vec<Value> = b.get(app.url("/api/applications")).send().await.unwrap().json().await.unwrap();
    assert!(mine.is_empty());
}

#[tokio::test]
async fn test_profile_partial_update() {
    let app = spawn_app().await;
    let client = app.client();
    client
        .post(app.url("/api/register"))
        .json(&json!({
            "name": "Ada", "email": "ada@campus.edu", "password": "pw",
            "skill": "first aid", "availability": "evenings",
        }))
        .send()
        .await
        .unwrap();

    let response = client
        .put(app.url("/api/volunteers/me"))
        .json(&json!({"skill": "photography", "availability": null}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let profile: Value = response.json().await.unwrap();
    assert_eq!(profile["skill"], "photography");
    assert_eq!(profile["availability"], "evenings");
}

#[tokio::test]
async fn test_delete_event_cascades() {
    let app = spawn_app().await;
    let admin = app.admin_client().await;
    let event = app.create_event(&admin, json!(4)).await;
    let volunteer = app.volunteer_client("Ada").await;

    volunteer
        .post(app.url("/api/applications"))
        .json(&json!({"event_id": event["id"].to_string()}))
        .send()
        .await
        .unwrap();
    assert_eq!(app.repo.application_count().unwrap(), 1);

    let response = admin
        .delete(app.url(&format!("/api/events/{}", event["id"])))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(app.repo.application_count().unwrap(), 0);

    let response = admin
        .delete(app.url(&format!("/api/events/{}", event["id"])))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(error_of(response).await, "Event not found");
}

#[tokio::test]
async fn test_seed_endpoint() {
    let app = spawn_app().await;
    let admin = app.admin_client().await;

    for _ in 0..2 {
        let response = admin.post(app.url("/api/seed")).send().await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["status"], "seeded");
    }

    let events: Vec<Value> = app
        .client()
        .get(app.url("/api/events"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(events.len(), 3);
    assert_eq!(events[0]["name"], "Freshers Welcome Expo");
    assert_eq!(events[0]["date"], "2026-03-12");
    assert_eq!(events[0]["slots_left"], 18);

    // The configured bootstrap admin can now sign in.
    let response = app
        .client()
        .post(app.url("/api/login"))
        .json(&json!({"email": "admin@campus.edu", "password": "admin123"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_unknown_paths_are_json_404() {
    let app = spawn_app().await;

    for path in ["/api/nope", "/definitely/missing.js"] {
        let response = app.client().get(app.url(path)).send().await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(error_of(response).await, "Not found");
    }

    let response = app.client().post(app.url("/api/nope")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let app = spawn_app().await;
    let doc: Value = app
        .client()
        .get(app.url("/api-docs/openapi.json"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert!(doc["paths"].get("/api/applications").is_some());
    assert!(doc["paths"].get("/api/events/{id}").is_some());
}
