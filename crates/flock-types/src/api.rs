use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{
    AppointmentStatus, Attendance, DonationMethod, PrayerStatus, ReportKind, Role, StepAction,
};

// -- JWT Claims --

/// JWT claims shared by the REST middleware and the WebSocket gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub role: Role,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub phone: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub full_name: String,
    pub role: Role,
    pub token: String,
}

// -- Members --

#[derive(Debug, Default, Deserialize)]
pub struct UserQuery {
    pub role: Option<Role>,
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateUserRequest {
    pub full_name: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateRoleRequest {
    pub role: Role,
}

// -- Donations --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateDonationRequest {
    pub amount_cents: i64,
    pub method: DonationMethod,
    pub project_id: Option<Uuid>,
    pub note: Option<String>,
    pub currency: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DonationQuery {
    pub user_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SummaryQuery {
    pub year: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlyTotal {
    /// 1-based calendar month.
    pub month: u32,
    pub total_cents: i64,
    pub count: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DonationSummary {
    pub year: i32,
    pub months: Vec<MonthlyTotal>,
    pub total_cents: i64,
    pub count: i64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateProjectRequest {
    pub name: String,
    pub description: Option<String>,
    pub goal_cents: i64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateProjectRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub goal_cents: Option<i64>,
    pub active: Option<bool>,
}

// -- Appointments --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateAppointmentRequest {
    pub pastor_id: Uuid,
    pub subject: String,
    pub notes: Option<String>,
    pub scheduled_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppointmentStatusRequest {
    pub status: AppointmentStatus,
}

// -- Prayers --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreatePrayerRequest {
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub is_anonymous: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct PrayerQuery {
    pub status: Option<PrayerStatus>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PrayerStatusRequest {
    pub status: PrayerStatus,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SupportResponse {
    pub supported: bool,
    pub support_count: i64,
}

// -- Testimonies --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateTestimonyRequest {
    pub title: String,
    pub body: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApproveRequest {
    pub approved: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LikeResponse {
    pub liked: bool,
    pub likes_count: i64,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateCommentRequest {
    pub body: String,
}

// -- Events --

#[derive(Debug, Default, Deserialize)]
pub struct EventQuery {
    pub category: Option<String>,
    pub upcoming: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateEventRequest {
    pub title: String,
    pub description: Option<String>,
    pub category: String,
    pub location: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateEventRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub location: Option<String>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
}

// -- Sermons --

#[derive(Debug, Default, Deserialize)]
pub struct SermonQuery {
    pub series: Option<String>,
    pub speaker: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateSermonRequest {
    pub title: String,
    pub speaker: String,
    pub series: Option<String>,
    pub scripture: Option<String>,
    pub media_url: Option<String>,
    pub preached_on: NaiveDate,
}

// -- Channels --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateChannelRequest {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendMessageRequest {
    pub body: String,
}

// -- Attendance --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CheckInRequest {
    pub event_id: Uuid,
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CheckInResponse {
    pub attendance: Attendance,
    pub newly_checked_in: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecognizeRequest {
    pub event_id: Uuid,
    pub image_base64: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RecognizedMember {
    pub user_id: Uuid,
    pub full_name: String,
    pub confidence: f64,
    pub newly_checked_in: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RecognizeResponse {
    pub event_id: Uuid,
    pub source: DataSource,
    pub recognized: Vec<RecognizedMember>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FaceEnrollRequest {
    pub image_base64: String,
}

/// Wire format of the remote face-recognition backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FaceRecognitionResult {
    #[serde(default)]
    pub matches: Vec<FaceMatch>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceMatch {
    pub user_id: Uuid,
    pub confidence: f64,
}

// -- Remote proxy --

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    Remote,
    Mock,
}

/// Envelope for routes that proxy the remote backend.
#[derive(Debug, Serialize, Deserialize)]
pub struct Proxied<T> {
    pub source: DataSource,
    pub data: T,
}

#[derive(Debug, Default, Deserialize)]
pub struct ResourceQuery {
    pub category: Option<String>,
}

// -- Analytics --

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_members: i64,
    pub new_members_this_month: i64,
    pub total_donations_cents: i64,
    pub donations_this_month_cents: i64,
    pub upcoming_events: i64,
    pub open_prayers: i64,
    pub approved_testimonies: i64,
    pub pending_testimonies: i64,
    pub check_ins_last_30_days: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct GrowthQuery {
    pub months: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlyCount {
    /// `YYYY-MM`
    pub month: String,
    pub count: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct AttendanceQuery {
    pub event_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventAttendanceStats {
    pub event_id: Uuid,
    pub title: String,
    pub starts_at: DateTime<Utc>,
    pub manual: i64,
    pub face: i64,
    pub total: i64,
}

// -- Templates & workflows --

#[derive(Debug, Default, Deserialize)]
pub struct RenderRequest {
    #[serde(default)]
    pub variables: HashMap<String, String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RenderedTemplate {
    pub subject: String,
    pub body: String,
    pub missing_variables: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EmailTemplateInfo {
    pub key: String,
    pub name: String,
    pub subject: String,
    pub body: String,
    pub variables: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowStep {
    pub action: StepAction,
    pub subject: Option<String>,
    pub template: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateWorkflowRequest {
    pub name: String,
    pub trigger: String,
    pub steps: Vec<WorkflowStep>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    pub id: Uuid,
    pub name: String,
    pub trigger: String,
    pub steps: Vec<WorkflowStep>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RenderedStep {
    pub action: StepAction,
    pub subject: Option<String>,
    pub body: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WorkflowRun {
    pub workflow_id: Uuid,
    pub steps: Vec<RenderedStep>,
    pub missing_variables: Vec<String>,
}

// -- Reports --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateReportRequest {
    pub kind: ReportKind,
    pub from: NaiveDate,
    pub to: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub id: Uuid,
    pub kind: ReportKind,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub generated_by: Uuid,
    pub generated_at: DateTime<Utc>,
    pub data: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Breakdown {
    pub label: String,
    pub total_cents: i64,
    pub count: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DonationReport {
    pub total_cents: i64,
    pub count: i64,
    pub by_method: Vec<Breakdown>,
    pub by_project: Vec<Breakdown>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AttendanceReport {
    pub total_check_ins: i64,
    pub events: Vec<EventAttendanceStats>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleCount {
    pub role: Role,
    pub count: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MembershipReport {
    pub new_members: i64,
    pub by_role: Vec<RoleCount>,
}

// -- Health --

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub database: bool,
}
