//! REST handlers for the church-management service, one module per resource.

pub mod analytics;
pub mod appointments;
pub mod attendance;
pub mod auth;
pub mod channels;
pub mod donations;
pub mod email_templates;
pub mod error;
pub mod events;
pub mod middleware;
pub mod mock;
pub mod prayers;
pub mod proxy;
pub mod remote;
pub mod reports;
pub mod sermons;
pub mod state;
pub mod template;
pub mod testimonies;
pub mod users;
pub mod workflows;

use axum::{
    Json, Router,
    extract::{State, WebSocketUpgrade},
    middleware::from_fn_with_state,
    response::IntoResponse,
    routing::{get, patch, post, put},
};

use flock_types::api::HealthResponse;

pub use state::{AppState, AppStateInner};

/// Builds the full application: `/health`, the `/api` resources and the
/// `/api/gateway` WebSocket.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/gateway", get(ws_upgrade));

    let protected_routes = Router::new()
        .route("/auth/me", get(auth::me))
        // Members
        .route("/users", get(users::list_users))
        .route(
            "/users/{user_id}",
            get(users::get_user).patch(users::update_user).delete(users::delete_user),
        )
        .route("/users/{user_id}/role", put(users::set_role))
        .route("/users/{user_id}/face", post(attendance::enroll_face))
        // Giving
        .route("/donations", get(donations::list_donations).post(donations::create_donation))
        .route("/donations/summary", get(donations::summary))
        .route(
            "/donation-projects",
            get(donations::list_projects).post(donations::create_project),
        )
        .route("/donation-projects/{project_id}", patch(donations::update_project))
        // Pastoral care
        .route(
            "/appointments",
            get(appointments::list_appointments).post(appointments::create_appointment),
        )
        .route("/appointments/{appointment_id}/status", put(appointments::set_status))
        .route("/prayers", get(prayers::list_prayers).post(prayers::create_prayer))
        .route("/prayers/{prayer_id}", get(prayers::get_prayer))
        .route("/prayers/{prayer_id}/status", put(prayers::set_status))
        .route("/prayers/{prayer_id}/support", post(prayers::toggle_support))
        .route(
            "/testimonies",
            get(testimonies::list_testimonies).post(testimonies::create_testimony),
        )
        .route("/testimonies/{testimony_id}/approve", put(testimonies::approve))
        .route("/testimonies/{testimony_id}/like", post(testimonies::toggle_like))
        .route(
            "/testimonies/{testimony_id}/comments",
            get(testimonies::list_comments).post(testimonies::add_comment),
        )
        // Calendar & media
        .route("/events", get(events::list_events).post(events::create_event))
        .route(
            "/events/{event_id}",
            get(events::get_event).patch(events::update_event).delete(events::delete_event),
        )
        .route("/events/{event_id}/attendance", get(events::list_attendance))
        .route("/sermons", get(sermons::list_sermons).post(sermons::create_sermon))
        .route(
            "/sermons/{sermon_id}",
            get(sermons::get_sermon).delete(sermons::delete_sermon),
        )
        // Messaging
        .route("/channels", get(channels::list_channels).post(channels::create_channel))
        .route(
            "/channels/{channel_id}/messages",
            get(channels::get_messages).post(channels::send_message),
        )
        // Attendance
        .route("/attendance", post(attendance::check_in))
        .route("/attendance/recognize", post(attendance::recognize))
        // Remote backend
        .route("/ministries", get(proxy::ministries))
        .route("/announcements", get(proxy::announcements))
        .route("/resources", get(proxy::resources))
        // Analytics & reporting
        .route("/analytics/dashboard", get(analytics::dashboard))
        .route("/analytics/members/growth", get(analytics::member_growth))
        .route("/analytics/attendance", get(analytics::attendance))
        .route("/reports", get(reports::list_reports).post(reports::create_report))
        .route("/reports/{report_id}", get(reports::get_report))
        // Communication
        .route("/email-templates", get(email_templates::list_templates))
        .route("/email-templates/{key}/render", post(email_templates::render_template))
        .route(
            "/workflows",
            get(workflows::list_workflows).post(workflows::create_workflow),
        )
        .route("/workflows/{workflow_id}", axum::routing::delete(workflows::delete_workflow))
        .route("/workflows/{workflow_id}/run", post(workflows::run_workflow))
        .layer(from_fn_with_state(state.clone(), middleware::require_auth));

    Router::new()
        .route("/health", get(health))
        .nest("/api", public_routes.merge(protected_routes))
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let db_state = state.clone();
    let database = tokio::task::spawn_blocking(move || db_state.db.ping())
        .await
        .unwrap_or(false);
    Json(HealthResponse {
        status: "ok".to_string(),
        database,
    })
}

/// The socket authenticates itself with an `Identify` command after upgrade.
async fn ws_upgrade(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    let dispatcher = state.dispatcher.clone();
    let jwt_secret = state.jwt_secret.clone();
    ws.on_upgrade(move |socket| flock_gateway::handle_connection(socket, dispatcher, jwt_secret))
}
