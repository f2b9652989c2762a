use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{Datelike, Utc};
use tracing::info;
use uuid::Uuid;

use flock_db::models::NewDonation;
use flock_types::api::{
    Claims, CreateDonationRequest, CreateProjectRequest, DonationQuery, DonationSummary,
    SummaryQuery, UpdateProjectRequest,
};
use flock_types::models::{Donation, DonationProject};

use crate::error::{ApiError, ApiJson, ApiQuery, ApiResult};
use crate::middleware::require_staff;
use crate::state::{AppState, blocking};

const DEFAULT_CURRENCY: &str = "USD";

pub async fn create_donation(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<CreateDonationRequest>,
) -> ApiResult<impl IntoResponse> {
    if req.amount_cents <= 0 {
        return Err(ApiError::bad_request("amount_cents must be positive"));
    }
    let currency = match req.currency.as_deref().map(str::trim) {
        None | Some("") => DEFAULT_CURRENCY.to_string(),
        Some(c) if c.len() == 3 && c.chars().all(|ch| ch.is_ascii_alphabetic()) => c.to_uppercase(),
        Some(_) => return Err(ApiError::bad_request("currency must be a 3-letter code")),
    };

    if let Some(project_id) = req.project_id {
        let project = blocking(&state, move |db| db.get_project(project_id))
            .await?
            .ok_or(ApiError::NotFound("donation project"))?;
        if !project.active {
            return Err(ApiError::bad_request("donation project is closed"));
        }
    }

    let donor = claims.sub;
    let donation = blocking(&state, move |db| {
        db.create_donation(&NewDonation {
            id: Uuid::new_v4(),
            user_id: donor,
            project_id: req.project_id,
            amount_cents: req.amount_cents,
            currency: &currency,
            method: req.method,
            note: req.note.as_deref(),
        })
    })
    .await?;

    info!("{} donated {} {} via {}", donor, donation.amount_cents, donation.currency, donation.method);
    Ok((StatusCode::CREATED, Json(donation)))
}

/// Members only ever see their own gifts; staff may filter by donor.
pub async fn list_donations(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiQuery(query): ApiQuery<DonationQuery>,
) -> ApiResult<Json<Vec<Donation>>> {
    let donor = if claims.role.is_staff() {
        query.user_id
    } else {
        if query.user_id.is_some_and(|id| id != claims.sub) {
            return Err(ApiError::Forbidden);
        }
        Some(claims.sub)
    };

    let donations = blocking(&state, move |db| db.list_donations(donor, query.project_id)).await?;
    Ok(Json(donations))
}

pub async fn summary(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiQuery(query): ApiQuery<SummaryQuery>,
) -> ApiResult<Json<DonationSummary>> {
    require_staff(&claims)?;
    let year = query.year.unwrap_or_else(|| Utc::now().year());
    if !(1900..=9999).contains(&year) {
        return Err(ApiError::bad_request("year out of range"));
    }

    let months = blocking(&state, move |db| db.monthly_totals(year)).await?;
    Ok(Json(DonationSummary {
        year,
        total_cents: months.iter().map(|m| m.total_cents).sum(),
        count: months.iter().map(|m| m.count).sum(),
        months,
    }))
}

// -- Projects --

pub async fn list_projects(State(state): State<AppState>) -> ApiResult<Json<Vec<DonationProject>>> {
    Ok(Json(blocking(&state, |db| db.list_projects()).await?))
}

pub async fn create_project(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<CreateProjectRequest>,
) -> ApiResult<impl IntoResponse> {
    require_staff(&claims)?;
    let name = req.name.trim().to_string();
    if name.is_empty() {
        return Err(ApiError::bad_request("name is required"));
    }
    if req.goal_cents < 0 {
        return Err(ApiError::bad_request("goal_cents cannot be negative"));
    }

    let project = blocking(&state, move |db| {
        if db.project_name_exists(&name)? {
            return Ok(None);
        }
        db.create_project(Uuid::new_v4(), &name, req.description.as_deref(), req.goal_cents)
            .map(Some)
    })
    .await?
    .ok_or_else(|| ApiError::Conflict("a project with that name already exists".into()))?;

    Ok((StatusCode::CREATED, Json(project)))
}

pub async fn update_project(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(project_id): Path<Uuid>,
    ApiJson(req): ApiJson<UpdateProjectRequest>,
) -> ApiResult<Json<DonationProject>> {
    require_staff(&claims)?;
    let name = req.name.map(|n| n.trim().to_string());
    if name.as_deref() == Some("") {
        return Err(ApiError::bad_request("name cannot be empty"));
    }
    if req.goal_cents.is_some_and(|g| g < 0) {
        return Err(ApiError::bad_request("goal_cents cannot be negative"));
    }

    blocking(&state, move |db| {
        db.update_project(project_id, name.as_deref(), req.description.as_deref(), req.goal_cents, req.active)
    })
    .await?
    .map(Json)
    .ok_or(ApiError::NotFound("donation project"))
}
