use axum::extract::{Path, State};
use axum::{
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::{require_profile, AuthUser};
use crate::error::{AppError, AppResult};
use crate::models::vote::{tally_options, CastVoteRequest, VoteResults};
use crate::points::PointEvent;
use crate::{api::ok, db, AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/votes", get(list_active))
        .route("/api/votes/:id", post(cast))
        .route("/api/votes/:id/results", get(results))
}

async fn list_active(State(state): State<AppState>, user: AuthUser) -> AppResult<Json<Value>> {
    let votes = db::votes::list_active_with_choice(&state.pool, user.id).await?;
    Ok(ok(votes))
}

/// Records the caller's single participation in a poll and awards points.
async fn cast(
    State(state): State<AppState>,
    user: AuthUser,
    Path(vote_id): Path<Uuid>,
    Json(req): Json<CastVoteRequest>,
) -> AppResult<Json<Value>> {
    require_profile(&state.pool, &user).await?;

    let mut tx = state.pool.begin().await?;
    let vote = db::votes::get_vote(&mut tx, vote_id)
        .await?
        .ok_or_else(|| AppError::not_found("Poll not found"))?;

    if !vote.is_open_at(Utc::now()) {
        return Err(AppError::conflict("This poll is closed"));
    }
    if !vote.has_option(req.option_index) {
        return Err(AppError::bad_request("Pick one of the poll's options"));
    }
    if !db::votes::insert_user_vote(&mut tx, user.id, vote_id, req.option_index).await? {
        return Err(AppError::conflict("You have already voted in this poll"));
    }
    let total = db::points::award_points(&mut tx, user.id, PointEvent::Vote).await?;
    tx.commit().await?;

    Ok(ok(json!({
        "vote_id": vote_id,
        "option_index": req.option_index,
        "points_awarded": PointEvent::Vote.value(),
        "points": total,
    })))
}

async fn results(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(vote_id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    let mut conn = state.pool.acquire().await?;
    let vote = db::votes::get_vote(&mut conn, vote_id)
        .await?
        .ok_or_else(|| AppError::not_found("Poll not found"))?;
    let counts = db::votes::option_counts(&state.pool, vote_id).await?;
    let results = tally_options(&vote.options, &counts);

    Ok(ok(VoteResults {
        vote_id,
        title: vote.title,
        total: results.iter().map(|r| r.count).sum(),
        results,
    }))
}
