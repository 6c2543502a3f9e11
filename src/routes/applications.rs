use axum::extract::{Json, Path, Query, State};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::applications;
use crate::tracker::{
    self, ApplicationStatus, ApplicationSummary, StatusEntry, StuckApplication,
    TrackedApplication, DEFAULT_STUCK_DAYS,
};
use crate::utils::time::to_iso;
use crate::{auth::AuthenticatedUser, error::AppResult, state::AppState};

#[derive(Deserialize)]
pub struct CreateApplicationRequest {
    pub company: String,
    pub role: String,
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
    pub note: Option<String>,
}

#[derive(Deserialize)]
pub struct StuckQuery {
    #[serde(default = "default_stuck_days")]
    pub days: i64,
}

const fn default_stuck_days() -> i64 {
    DEFAULT_STUCK_DAYS
}

#[derive(Serialize)]
pub struct StatusEntryResponse {
    pub status: ApplicationStatus,
    pub note: Option<String>,
    pub changed_at: String,
}

#[derive(Serialize)]
pub struct UpdateStatusResponse {
    pub message: String,
    pub entry: StatusEntryResponse,
}

#[derive(Serialize)]
pub struct ApplicationDetailResponse {
    pub id: Uuid,
    pub company: String,
    pub role: String,
    pub current_status: ApplicationStatus,
    pub created_at: String,
    pub history: Vec<StatusEntryResponse>,
}

pub async fn create_application(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(payload): Json<CreateApplicationRequest>,
) -> AppResult<Json<ApplicationSummary>> {
    let mut conn = state.db()?;
    let tracked =
        applications::create_application(&mut conn, user.user_id, &payload.company, &payload.role)?;
    Ok(Json(tracked.summary()))
}

pub async fn update_status(
    State(state): State<AppState>,
    Path(application_id): Path<Uuid>,
    user: AuthenticatedUser,
    Json(payload): Json<UpdateStatusRequest>,
) -> AppResult<Json<UpdateStatusResponse>> {
    let mut conn = state.db()?;
    let entry = applications::record_status(
        &mut conn,
        user.user_id,
        application_id,
        &payload.status,
        payload.note.as_deref(),
    )?;

    Ok(Json(UpdateStatusResponse {
        message: "updated".to_string(),
        entry: to_entry_response(&entry),
    }))
}

pub async fn list_applications(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<Vec<ApplicationSummary>>> {
    let mut conn = state.db()?;
    let tracked = applications::load_user_applications(&mut conn, user.user_id)?;
    Ok(Json(tracked.iter().map(TrackedApplication::summary).collect()))
}

pub async fn get_application(
    State(state): State<AppState>,
    Path(application_id): Path<Uuid>,
    user: AuthenticatedUser,
) -> AppResult<Json<ApplicationDetailResponse>> {
    let mut conn = state.db()?;
    let tracked = applications::load_owned_application(&mut conn, user.user_id, application_id)?;
    let application = tracked.application();

    Ok(Json(ApplicationDetailResponse {
        id: application.id,
        company: application.company.clone(),
        role: application.role.clone(),
        current_status: tracked.current().status,
        created_at: to_iso(application.created_at),
        history: tracked.history().iter().map(to_entry_response).collect(),
    }))
}

pub async fn stuck_applications(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<StuckQuery>,
) -> AppResult<Json<Vec<StuckApplication>>> {
    let stuck = load_stuck(&state, user.user_id, query.days)?;
    Ok(Json(stuck))
}

/// Stuck applications of `user_id` relative to the current time.
pub(crate) fn load_stuck(
    state: &AppState,
    user_id: Uuid,
    days: i64,
) -> AppResult<Vec<StuckApplication>> {
    let mut conn = state.db()?;
    let tracked = applications::load_user_applications(&mut conn, user_id)?;
    let now = Utc::now().naive_utc();
    Ok(tracker::stuck(&tracked, days, now)?
        .into_iter()
        .map(TrackedApplication::stuck_view)
        .collect())
}

fn to_entry_response(entry: &StatusEntry) -> StatusEntryResponse {
    StatusEntryResponse {
        status: entry.status,
        note: entry.note.clone(),
        changed_at: to_iso(entry.changed_at),
    }
}
