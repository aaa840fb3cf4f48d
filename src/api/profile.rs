use axum::extract::{Path, Query, State};
use axum::{routing::get, Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::{require_profile, AuthUser};
use crate::error::{AppError, AppResult};
use crate::models::profile::ProfileUpdate;
use crate::points::PointEvent;
use crate::{api::ok, db, AppState};

const DEFAULT_LEADERBOARD: i64 = 10;
const MAX_LEADERBOARD: i64 = 50;
const MAX_USERNAME_BASE: usize = 200;

#[derive(Deserialize)]
struct LeaderboardQuery {
    limit: Option<i64>,
}

#[derive(Deserialize)]
struct SuggestQuery {
    base: String,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/profile/me", get(get_me).put(update_me))
        .route("/api/profiles/:username", get(get_public))
        .route("/api/leaderboard", get(leaderboard))
        .route("/api/usernames/suggest", get(suggest_username))
}

async fn get_me(State(state): State<AppState>, user: AuthUser) -> AppResult<Json<Value>> {
    let profile = require_profile(&state.pool, &user).await?;
    Ok(ok(profile))
}

/// Saves profile fields and grants the completion bonus the first time the
/// profile becomes complete.
async fn update_me(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<ProfileUpdate>,
) -> AppResult<Json<Value>> {
    let update = req.validated()?;

    let mut tx = state.pool.begin().await?;
    let mut profile = db::profiles::update_profile(&mut tx, user.id, &update)
        .await?
        .ok_or_else(|| AppError::not_found("Complete your member signup first"))?;

    let mut points_awarded = 0;
    if !profile.profile_completed
        && profile.meets_completion_criteria()
        && db::profiles::mark_completed(&mut tx, user.id).await?
    {
        let event = PointEvent::ProfileCompletion;
        profile.points = db::points::award_points(&mut tx, user.id, event).await?;
        profile.profile_completed = true;
        points_awarded = event.value();
    }
    tx.commit().await?;

    Ok(ok(json!({ "profile": profile, "points_awarded": points_awarded })))
}

async fn get_public(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> AppResult<Json<Value>> {
    let profile = db::profiles::get_public_profile(&state.pool, &name.to_ascii_lowercase())
        .await?
        .ok_or_else(|| AppError::not_found("Profile not found"))?;
    Ok(ok(profile))
}

async fn leaderboard(
    State(state): State<AppState>,
    Query(query): Query<LeaderboardQuery>,
) -> AppResult<Json<Value>> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_LEADERBOARD)
        .clamp(1, MAX_LEADERBOARD);
    let entries = db::profiles::leaderboard(&state.pool, limit).await?;
    Ok(ok(entries))
}

async fn suggest_username(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(query): Query<SuggestQuery>,
) -> AppResult<Json<Value>> {
    if query.base.chars().count() > MAX_USERNAME_BASE {
        return Err(AppError::bad_request("Name is too long"));
    }
    let mut conn = state.pool.acquire().await?;
    let suggestion = db::profiles::suggest_username(&mut conn, &query.base).await?;
    Ok(ok(json!({ "username": suggestion })))
}
