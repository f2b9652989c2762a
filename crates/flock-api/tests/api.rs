use std::time::Duration;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use flock_api::auth::create_token;
use flock_api::remote::RemoteClient;
use flock_api::{AppState, AppStateInner};
use flock_db::Database;
use flock_types::models::Role;

const SECRET: &str = "integration-test-secret";

struct TestApp {
    state: AppState,
    router: Router,
}

impl TestApp {
    fn new(remote: RemoteClient) -> Self {
        let db = Database::open_in_memory().unwrap();
        let state = AppStateInner::new(db, SECRET.to_string(), remote, 0.80);
        let router = flock_api::router(state.clone());
        Self { state, router }
    }

    fn offline() -> Self {
        Self::new(RemoteClient::disabled())
    }

    async fn request(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self.router.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
        (status, value)
    }

    /// Registers a member and returns `(user_id, token)`.
    async fn register(&self, email: &str) -> (Uuid, String) {
        let (status, body) = self
            .request(
                Method::POST,
                "/api/auth/register",
                None,
                Some(json!({ "email": email, "password": "password123", "full_name": "Test Member" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        let id: Uuid = serde_json::from_value(body["user_id"].clone()).unwrap();
        (id, body["token"].as_str().unwrap().to_string())
    }

    /// Registers a user, promotes them and returns a token carrying the new role.
    async fn register_as(&self, email: &str, role: Role) -> (Uuid, String) {
        let (id, _) = self.register(email).await;
        self.state.db.set_role(id, role).unwrap();
        (id, create_token(SECRET, id, email, role).unwrap())
    }

    async fn create_event(&self, staff_token: &str) -> String {
        let (status, event) = self
            .request(
                Method::POST,
                "/api/events",
                Some(staff_token),
                Some(json!({
                    "title": "Sunday Service",
                    "category": "Worship",
                    "starts_at": "2030-05-05T10:00:00Z"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{event}");
        assert_eq!(event["category"], "worship");
        event["id"].as_str().unwrap().to_string()
    }
}

#[tokio::test]
async fn health_is_public() {
    let app = TestApp::offline();
    let (status, body) = app.request(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok", "database": true }));
}

#[tokio::test]
async fn protected_routes_need_a_token() {
    let app = TestApp::offline();
    let (status, body) = app.request(Method::GET, "/api/events", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());

    let (status, _) = app.request(Method::GET, "/api/events", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn register_login_and_me() {
    let app = TestApp::offline();
    let (id, token) = app.register("Grace@Example.org").await;

    let (status, _) = app
        .request(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "email": "grace@example.org", "password": "password123", "full_name": "Again" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, login) = app
        .request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "grace@example.org", "password": "password123" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(login["role"], "member");

    let (status, _) = app
        .request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "grace@example.org", "password": "wrong-password" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, me) = app.request(Method::GET, "/api/auth/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["id"], id.to_string());
    assert_eq!(me["email"], "grace@example.org");
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
    let app = TestApp::offline();
    let (status, body) = app
        .request(Method::POST, "/api/auth/register", None, Some(json!({ "email": "x@y.z" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn members_are_kept_off_staff_routes() {
    let app = TestApp::offline();
    let (_, token) = app.register("member@example.org").await;

    for uri in ["/api/users", "/api/analytics/dashboard", "/api/email-templates", "/api/workflows", "/api/reports"] {
        let (status, _) = app.request(Method::GET, uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{uri}");
    }

    let (status, _) = app
        .request(
            Method::POST,
            "/api/events",
            Some(&token),
            Some(json!({ "title": "Picnic", "category": "social", "starts_at": "2030-06-01T12:00:00Z" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn donations_credit_their_project() {
    let app = TestApp::offline();
    let (_, admin) = app.register_as("admin@example.org", Role::Admin).await;
    let (_, member) = app.register("giver@example.org").await;

    let (status, project) = app
        .request(
            Method::POST,
            "/api/donation-projects",
            Some(&admin),
            Some(json!({ "name": "Roof Repair", "goal_cents": 500000 })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let project_id = project["id"].as_str().unwrap().to_string();

    let (status, _) = app
        .request(
            Method::POST,
            "/api/donation-projects",
            Some(&admin),
            Some(json!({ "name": "roof repair", "goal_cents": 1 })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, donation) = app
        .request(
            Method::POST,
            "/api/donations",
            Some(&member),
            Some(json!({ "amount_cents": 2500, "method": "card", "project_id": project_id })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{donation}");
    assert_eq!(donation["currency"], "USD");

    let (status, _) = app
        .request(
            Method::POST,
            "/api/donations",
            Some(&member),
            Some(json!({ "amount_cents": 0, "method": "cash" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, projects) = app.request(Method::GET, "/api/donation-projects", Some(&member), None).await;
    let roof = projects
        .as_array()
        .unwrap()
        .iter()
        .find(|p| p["id"] == project_id.as_str())
        .unwrap();
    assert_eq!(roof["raised_cents"], 2500);

    let (_, mine) = app.request(Method::GET, "/api/donations", Some(&member), None).await;
    assert_eq!(mine.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn prayer_support_and_testimony_likes_toggle() {
    let app = TestApp::offline();
    let (_, author) = app.register("author@example.org").await;
    let (_, friend) = app.register("friend@example.org").await;
    let (_, pastor) = app.register_as("pastor@example.org", Role::Pastor).await;

    let (status, prayer) = app
        .request(
            Method::POST,
            "/api/prayers",
            Some(&author),
            Some(json!({ "title": "Healing", "body": "For my mother's recovery" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let support_uri = format!("/api/prayers/{}/support", prayer["id"].as_str().unwrap());

    let (_, first) = app.request(Method::POST, &support_uri, Some(&friend), None).await;
    assert_eq!(first, json!({ "supported": true, "support_count": 1 }));
    let (_, second) = app.request(Method::POST, &support_uri, Some(&friend), None).await;
    assert_eq!(second, json!({ "supported": false, "support_count": 0 }));

    let (status, testimony) = app
        .request(
            Method::POST,
            "/api/testimonies",
            Some(&author),
            Some(json!({ "title": "Answered", "body": "She is home again" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let testimony_id = testimony["id"].as_str().unwrap().to_string();
    let like_uri = format!("/api/testimonies/{testimony_id}/like");

    // Hidden from other members until approved.
    let (status, _) = app.request(Method::POST, &like_uri, Some(&friend), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .request(
            Method::PUT,
            &format!("/api/testimonies/{testimony_id}/approve"),
            Some(&pastor),
            Some(json!({ "approved": true })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, liked) = app.request(Method::POST, &like_uri, Some(&friend), None).await;
    assert_eq!(liked, json!({ "liked": true, "likes_count": 1 }));
    let (_, unliked) = app.request(Method::POST, &like_uri, Some(&friend), None).await;
    assert_eq!(unliked, json!({ "liked": false, "likes_count": 0 }));
}

#[tokio::test]
async fn channel_messages_round_trip() {
    let app = TestApp::offline();
    let (_, admin) = app.register_as("office@example.org", Role::Staff).await;
    let (_, member) = app.register("chatty@example.org").await;

    let (status, channel) = app
        .request(
            Method::POST,
            "/api/channels",
            Some(&admin),
            Some(json!({ "name": "youth-group" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let messages_uri = format!("/api/channels/{}/messages", channel["id"].as_str().unwrap());

    let (status, _) = app
        .request(Method::POST, "/api/channels", Some(&admin), Some(json!({ "name": "youth-group" })))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .request(Method::POST, "/api/channels", Some(&admin), Some(json!({ "name": "Youth Group" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    for body in ["first", "second"] {
        let (status, _) = app
            .request(Method::POST, &messages_uri, Some(&member), Some(json!({ "body": body })))
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, _) = app
        .request(Method::POST, &messages_uri, Some(&member), Some(json!({ "body": "   " })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, page) = app
        .request(Method::GET, &format!("{messages_uri}?limit=1"), Some(&member), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let page = page.as_array().unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0]["body"], "second");

    let (status, _) = app
        .request(
            Method::GET,
            &format!("/api/channels/{}/messages", Uuid::new_v4()),
            Some(&member),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn proxy_routes_fall_back_to_mock() {
    let app = TestApp::offline();
    let (_, token) = app.register("reader@example.org").await;

    let (status, body) = app.request(Method::GET, "/api/ministries", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], "mock");
    assert!(!body["data"].as_array().unwrap().is_empty());

    let (_, body) = app
        .request(Method::GET, "/api/resources?category=Study", Some(&token), None)
        .await;
    assert_eq!(body["source"], "mock");
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn proxy_routes_pass_remote_data_through() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ministries"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": "choir" }])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/announcements"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let remote = RemoteClient::new(Some(server.uri()), Duration::from_secs(5)).unwrap();
    let app = TestApp::new(remote);
    let (_, token) = app.register("reader@example.org").await;

    let (_, body) = app.request(Method::GET, "/api/ministries", Some(&token), None).await;
    assert_eq!(body, json!({ "source": "remote", "data": [{ "id": "choir" }] }));

    let (status, body) = app.request(Method::GET, "/api/announcements", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], "mock");
}

#[tokio::test]
async fn face_recognition_checks_in_confident_matches() {
    let server = MockServer::start().await;
    let app_remote = RemoteClient::new(Some(server.uri()), Duration::from_secs(5)).unwrap();
    let app = TestApp::new(app_remote);

    let (_, staff) = app.register_as("usher@example.org", Role::Staff).await;
    let (seen, _) = app.register("seen@example.org").await;
    let (blurry, _) = app.register("blurry@example.org").await;
    let event_id = app.create_event(&staff).await;

    Mock::given(method("POST"))
        .and(path("/face/recognize"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "matches": [
                { "user_id": seen, "confidence": 0.93 },
                { "user_id": blurry, "confidence": 0.41 },
                { "user_id": Uuid::new_v4(), "confidence": 0.99 }
            ]
        })))
        .mount(&server)
        .await;

    let (status, body) = app
        .request(
            Method::POST,
            "/api/attendance/recognize",
            Some(&staff),
            Some(json!({ "event_id": event_id, "image_base64": "aGVsbG8=" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["source"], "remote");
    let recognized = body["recognized"].as_array().unwrap();
    assert_eq!(recognized.len(), 1);
    assert_eq!(recognized[0]["user_id"], seen.to_string());
    assert_eq!(recognized[0]["newly_checked_in"], true);

    let (_, attendance) = app
        .request(Method::GET, &format!("/api/events/{event_id}/attendance"), Some(&staff), None)
        .await;
    let attendance = attendance.as_array().unwrap();
    assert_eq!(attendance.len(), 1);
    assert_eq!(attendance[0]["method"], "face");
}

#[tokio::test]
async fn face_recognition_without_backend_matches_nobody() {
    let app = TestApp::offline();
    let (_, staff) = app.register_as("usher@example.org", Role::Staff).await;
    let event_id = app.create_event(&staff).await;

    let (status, body) = app
        .request(
            Method::POST,
            "/api/attendance/recognize",
            Some(&staff),
            Some(json!({ "event_id": event_id, "image_base64": "aGVsbG8=" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], "mock");
    assert!(body["recognized"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn face_enrolment_needs_the_backend() {
    let app = TestApp::offline();
    let (_, staff) = app.register_as("usher@example.org", Role::Staff).await;
    let (member, _) = app.register("newcomer@example.org").await;

    let (status, _) = app
        .request(
            Method::POST,
            &format!("/api/users/{member}/face"),
            Some(&staff),
            Some(json!({ "image_base64": "aGVsbG8=" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn face_enrolment_marks_the_member() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/face/enroll"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let app = TestApp::new(RemoteClient::new(Some(server.uri()), Duration::from_secs(5)).unwrap());
    let (_, staff) = app.register_as("usher@example.org", Role::Staff).await;
    let (member, _) = app.register("newcomer@example.org").await;

    let (status, user) = app
        .request(
            Method::POST,
            &format!("/api/users/{member}/face"),
            Some(&staff),
            Some(json!({ "image_base64": "aGVsbG8=" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(user["face_enrolled"], true);
}

#[tokio::test]
async fn manual_check_in_is_idempotent() {
    let app = TestApp::offline();
    let (_, staff) = app.register_as("usher@example.org", Role::Staff).await;
    let (_, member) = app.register("early@example.org").await;
    let event_id = app.create_event(&staff).await;

    let body = json!({ "event_id": event_id });
    let (status, first) = app.request(Method::POST, "/api/attendance", Some(&member), Some(body.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(first["newly_checked_in"], true);

    let (status, again) = app.request(Method::POST, "/api/attendance", Some(&member), Some(body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(again["newly_checked_in"], false);

    let (status, _) = app
        .request(
            Method::POST,
            "/api/attendance",
            Some(&member),
            Some(json!({ "event_id": event_id, "user_id": Uuid::new_v4() })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn email_templates_render_with_missing_variables() {
    let app = TestApp::offline();
    let (_, staff) = app.register_as("office@example.org", Role::Staff).await;

    let (status, rendered) = app
        .request(
            Method::POST,
            "/api/email-templates/welcome/render",
            Some(&staff),
            Some(json!({ "variables": { "first_name": "Priscilla", "church_name": "Grace Chapel" } })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rendered["subject"], "Welcome to Grace Chapel, Priscilla!");
    let missing = rendered["missing_variables"].as_array().unwrap();
    assert!(missing.contains(&json!("pastor_name")));

    let (status, _) = app
        .request(
            Method::POST,
            "/api/email-templates/newsletter/render",
            Some(&staff),
            Some(json!({ "variables": {} })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn reports_validate_their_range() {
    let app = TestApp::offline();
    let (_, admin) = app.register_as("admin@example.org", Role::Admin).await;

    let (status, _) = app
        .request(
            Method::POST,
            "/api/reports",
            Some(&admin),
            Some(json!({ "kind": "membership", "from": "2030-02-01", "to": "2030-01-01" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, report) = app
        .request(
            Method::POST,
            "/api/reports",
            Some(&admin),
            Some(json!({ "kind": "membership", "from": "2000-01-01", "to": "2100-12-31" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{report}");
    assert_eq!(report["data"]["new_members"], 1);

    let (status, fetched) = app
        .request(
            Method::GET,
            &format!("/api/reports/{}", report["id"].as_str().unwrap()),
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["kind"], "membership");
}

#[tokio::test]
async fn raw_token_header_is_accepted() {
    let app = TestApp::offline();
    let (id, token) = app.register("raw@example.org").await;

    let request = Request::builder()
        .uri("/api/auth/me")
        .header("x-auth-token", &token)
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let me: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(me["id"], id.to_string());
}

#[tokio::test]
async fn deleted_accounts_lose_access_and_their_gifts() {
    let app = TestApp::offline();
    let (_, admin) = app.register_as("admin@example.org", Role::Admin).await;
    let (donor_id, donor) = app.register("leaving@example.org").await;

    let (_, project) = app
        .request(
            Method::POST,
            "/api/donation-projects",
            Some(&admin),
            Some(json!({ "name": "Roof", "goal_cents": 100000 })),
        )
        .await;
    let project_id = project["id"].as_str().unwrap().to_string();
    let (status, _) = app
        .request(
            Method::POST,
            "/api/donations",
            Some(&donor),
            Some(json!({ "amount_cents": 5000, "method": "cash", "project_id": project_id })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = app
        .request(Method::DELETE, &format!("/api/users/{donor_id}"), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app
        .request(
            Method::POST,
            "/api/prayers",
            Some(&donor),
            Some(json!({ "title": "Still here?", "body": "Token outlived the account" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (_, projects) = app.request(Method::GET, "/api/donation-projects", Some(&admin), None).await;
    let roof = projects
        .as_array()
        .unwrap()
        .iter()
        .find(|p| p["id"] == project_id.as_str())
        .unwrap();
    assert_eq!(roof["raised_cents"], 0);
}

#[tokio::test]
async fn role_changes_apply_to_existing_tokens() {
    let app = TestApp::offline();
    let (_, admin) = app.register_as("admin@example.org", Role::Admin).await;
    let (member_id, member) = app.register("rising@example.org").await;

    let (status, _) = app.request(Method::GET, "/api/users", Some(&member), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .request(
            Method::PUT,
            &format!("/api/users/{member_id}/role"),
            Some(&member),
            Some(json!({ "role": "admin" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, updated) = app
        .request(
            Method::PUT,
            &format!("/api/users/{member_id}/role"),
            Some(&admin),
            Some(json!({ "role": "staff" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["role"], "staff");

    let (status, _) = app.request(Method::GET, "/api/users", Some(&member), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn user_management_rules() {
    let app = TestApp::offline();
    let (admin_id, admin) = app.register_as("admin@example.org", Role::Admin).await;
    let (alice_id, alice) = app.register("alice@example.org").await;
    let (_, bob) = app.register("bob@example.org").await;

    let (status, _) = app
        .request(Method::DELETE, &format!("/api/users/{admin_id}"), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .request(Method::DELETE, &format!("/api/users/{alice_id}"), Some(&bob), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .request(
            Method::PATCH,
            &format!("/api/users/{alice_id}"),
            Some(&bob),
            Some(json!({ "full_name": "Mallory" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, updated) = app
        .request(
            Method::PATCH,
            &format!("/api/users/{alice_id}"),
            Some(&alice),
            Some(json!({ "phone": "555-0123" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["phone"], "555-0123");
    assert_eq!(updated["full_name"], "Test Member");
    assert!(updated.get("password").is_none() && updated.get("password_hash").is_none());

    let (status, _) = app
        .request(Method::GET, "/api/users?role=bishop", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn appointment_status_rules() {
    let app = TestApp::offline();
    let (pastor_id, pastor) = app.register_as("pastor@example.org", Role::Pastor).await;
    let (staff_id, _) = app.register_as("office@example.org", Role::Staff).await;
    let (_, member) = app.register("seeker@example.org").await;
    let (_, stranger) = app.register("stranger@example.org").await;

    let booking = |pastor: Uuid| {
        json!({
            "pastor_id": pastor,
            "subject": "Pre-marital counselling",
            "scheduled_at": "2030-04-10T15:00:00Z"
        })
    };

    let (status, _) = app
        .request(Method::POST, "/api/appointments", Some(&member), Some(booking(staff_id)))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, appointment) = app
        .request(Method::POST, "/api/appointments", Some(&member), Some(booking(pastor_id)))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(appointment["status"], "pending");
    let status_uri = format!("/api/appointments/{}/status", appointment["id"].as_str().unwrap());

    let (status, _) = app
        .request(Method::PUT, &status_uri, Some(&member), Some(json!({ "status": "confirmed" })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .request(Method::PUT, &status_uri, Some(&stranger), Some(json!({ "status": "cancelled" })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, confirmed) = app
        .request(Method::PUT, &status_uri, Some(&pastor), Some(json!({ "status": "confirmed" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(confirmed["status"], "confirmed");

    let (status, cancelled) = app
        .request(Method::PUT, &status_uri, Some(&member), Some(json!({ "status": "cancelled" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["status"], "cancelled");

    let (_, theirs) = app.request(Method::GET, "/api/appointments", Some(&stranger), None).await;
    assert!(theirs.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn events_update_and_delete() {
    let app = TestApp::offline();
    let (_, staff) = app.register_as("office@example.org", Role::Staff).await;
    let (_, member) = app.register("pew@example.org").await;
    let event_id = app.create_event(&staff).await;
    let event_uri = format!("/api/events/{event_id}");

    let (status, _) = app
        .request(Method::PATCH, &event_uri, Some(&member), Some(json!({ "title": "Mine now" })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .request(
            Method::PATCH,
            &event_uri,
            Some(&staff),
            Some(json!({ "ends_at": "2030-05-05T09:00:00Z" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, updated) = app
        .request(
            Method::PATCH,
            &event_uri,
            Some(&staff),
            Some(json!({ "location": "Main hall", "ends_at": "2030-05-05T12:00:00Z" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["location"], "Main hall");
    assert_eq!(updated["title"], "Sunday Service");

    let (status, _) = app
        .request(Method::POST, "/api/attendance", Some(&member), Some(json!({ "event_id": event_id })))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = app.request(Method::DELETE, &event_uri, Some(&member), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.request(Method::DELETE, &event_uri, Some(&staff), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.request(Method::GET, &event_uri, Some(&staff), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .request(Method::GET, "/api/events?upcoming=maybe", Some(&member), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn workflows_over_http() {
    let app = TestApp::offline();
    let (_, staff) = app.register_as("office@example.org", Role::Staff).await;

    let (status, _) = app
        .request(
            Method::POST,
            "/api/workflows",
            Some(&staff),
            Some(json!({ "name": "Empty", "trigger": "manual", "steps": [] })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, workflow) = app
        .request(
            Method::POST,
            "/api/workflows",
            Some(&staff),
            Some(json!({
                "name": "Visitor follow-up",
                "trigger": "first_visit",
                "steps": [
                    { "action": "email", "subject": "Welcome {{ first_name }}", "template": "Coffee on {{ day }}?" },
                    { "action": "sms", "template": "Hi {{ first_name }}!" }
                ]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{workflow}");
    let workflow_uri = format!("/api/workflows/{}", workflow["id"].as_str().unwrap());

    let (status, run) = app
        .request(
            Method::POST,
            &format!("{workflow_uri}/run"),
            Some(&staff),
            Some(json!({ "variables": { "first_name": "Apollos" } })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(run["steps"][0]["subject"], "Welcome Apollos");
    assert_eq!(run["steps"][1]["body"], "Hi Apollos!");
    assert_eq!(run["missing_variables"], json!(["day"]));

    let (status, _) = app.request(Method::DELETE, &workflow_uri, Some(&staff), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.request(Method::DELETE, &workflow_uri, Some(&staff), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app
        .request(Method::POST, &format!("{workflow_uri}/run"), Some(&staff), Some(json!({ "variables": {} })))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn donation_summary_is_zero_filled() {
    use chrono::{Datelike, Utc};

    let app = TestApp::offline();
    let (_, staff) = app.register_as("treasurer@example.org", Role::Staff).await;
    let (_, member) = app.register("tither@example.org").await;

    for amount in [1000, 2500] {
        let (status, _) = app
            .request(
                Method::POST,
                "/api/donations",
                Some(&member),
                Some(json!({ "amount_cents": amount, "method": "bank_transfer" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, _) = app.request(Method::GET, "/api/donations/summary", Some(&member), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let now = Utc::now();
    let (status, summary) = app
        .request(
            Method::GET,
            &format!("/api/donations/summary?year={}", now.year()),
            Some(&staff),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["total_cents"], 3500);
    assert_eq!(summary["count"], 2);
    let months = summary["months"].as_array().unwrap();
    assert_eq!(months.len(), 12);
    for month in months {
        let expected = if month["month"] == now.month() { 3500 } else { 0 };
        assert_eq!(month["total_cents"], expected, "{month}");
    }

    let (status, body) = app
        .request(Method::GET, "/api/donations/summary?year=abc", Some(&staff), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn member_growth_window_is_bounded() {
    let app = TestApp::offline();
    let (_, staff) = app.register_as("office@example.org", Role::Staff).await;

    let (status, growth) = app
        .request(Method::GET, "/api/analytics/members/growth", Some(&staff), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let growth = growth.as_array().unwrap();
    assert_eq!(growth.len(), 6);
    assert_eq!(growth[5]["count"], 1);

    for months in ["0", "25"] {
        let (status, _) = app
            .request(
                Method::GET,
                &format!("/api/analytics/members/growth?months={months}"),
                Some(&staff),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "months={months}");
    }
}

#[tokio::test]
async fn unapproved_testimony_is_hidden_from_other_members() {
    let app = TestApp::offline();
    let (_, author) = app.register("author@example.org").await;
    let (_, other) = app.register("other@example.org").await;

    let (_, testimony) = app
        .request(
            Method::POST,
            "/api/testimonies",
            Some(&author),
            Some(json!({ "title": "Provision", "body": "Rent was covered" })),
        )
        .await;
    assert_eq!(testimony["approved"], false);
    let comments_uri = format!("/api/testimonies/{}/comments", testimony["id"].as_str().unwrap());

    let (status, _) = app.request(Method::GET, &comments_uri, Some(&other), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app
        .request(Method::POST, &comments_uri, Some(&other), Some(json!({ "body": "Amen" })))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, listed) = app.request(Method::GET, "/api/testimonies", Some(&other), None).await;
    assert!(listed.as_array().unwrap().is_empty());

    let (status, _) = app.request(Method::GET, &comments_uri, Some(&author), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn message_pages_do_not_skip_same_second_messages() {
    let app = TestApp::offline();
    let (_, member) = app.register("busy@example.org").await;
    let (_, channels) = app.request(Method::GET, "/api/channels", Some(&member), None).await;
    let general = channels
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["name"] == "general")
        .unwrap();
    let messages_uri = format!("/api/channels/{}/messages", general["id"].as_str().unwrap());

    for body in ["a", "b", "c"] {
        let (status, _) = app
            .request(Method::POST, &messages_uri, Some(&member), Some(json!({ "body": body })))
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (_, first) = app
        .request(Method::GET, &format!("{messages_uri}?limit=2"), Some(&member), None)
        .await;
    let first = first.as_array().unwrap();
    assert_eq!(first.len(), 2);
    let cursor = first[1]["id"].as_str().unwrap();

    let (status, second) = app
        .request(
            Method::GET,
            &format!("{messages_uri}?limit=2&before={cursor}"),
            Some(&member),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let mut bodies: Vec<&str> = first.iter().map(|m| m["body"].as_str().unwrap()).collect();
    bodies.extend(second.as_array().unwrap().iter().map(|m| m["body"].as_str().unwrap()));
    assert_eq!(bodies, ["c", "b", "a"]);

    let (status, _) = app
        .request(
            Method::GET,
            &format!("{messages_uri}?before={}", Uuid::new_v4()),
            Some(&member),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn blank_resource_category_keeps_everything() {
    let app = TestApp::offline();
    let (_, token) = app.register("reader@example.org").await;

    let (_, all) = app.request(Method::GET, "/api/resources", Some(&token), None).await;
    let (status, blank) = app
        .request(Method::GET, "/api/resources?category=", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(blank["data"], all["data"]);
    assert_eq!(blank["data"].as_array().unwrap().len(), 4);
}
