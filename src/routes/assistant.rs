use axum::extract::{Json, Query, State};
use serde::Serialize;

use super::applications::{load_stuck, StuckQuery};
use crate::applications;
use crate::tracker::TrackedApplication;
use crate::{auth::AuthenticatedUser, error::AppResult, state::AppState};

#[derive(Serialize)]
pub struct SummaryResponse {
    pub summary: String,
}

#[derive(Serialize)]
pub struct FollowupsResponse {
    pub suggestions: String,
}

pub async fn summary(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> AppResult<Json<SummaryResponse>> {
    let digests: Vec<_> = {
        let mut conn = state.db()?;
        applications::load_user_applications(&mut conn, user.user_id)?
            .iter()
            .map(TrackedApplication::digest)
            .collect()
    };

    let summary = state.assistant.summarize(&digests).await;
    Ok(Json(SummaryResponse { summary }))
}

pub async fn followups(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<StuckQuery>,
) -> AppResult<Json<FollowupsResponse>> {
    let stuck = load_stuck(&state, user.user_id, query.days)?;
    let suggestions = state.assistant.suggest_followups(&stuck).await;
    Ok(Json(FollowupsResponse { suggestions }))
}
