use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::{require_admin, AuthUser};
use crate::error::{AppError, AppResult};
use crate::models::badge::NewBadge;
use crate::models::vote::NewVote;
use crate::models::wish::{WishListQuery, WishStatusUpdate};
use crate::{api::ok, db, AppState};

#[derive(Deserialize)]
struct UserSearchQuery {
    search: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/admin/stats", get(stats))
        .route("/api/admin/users", get(list_users))
        .route("/api/admin/wishes", get(list_wishes))
        .route("/api/admin/wishes/:id/status", post(set_wish_status))
        .route("/api/admin/points/audit", get(points_audit))
        .route("/api/admin/points/audit/fix", post(fix_all_points))
        .route("/api/admin/points/audit/:user_id/fix", post(fix_user_points))
        .route("/api/admin/votes", post(create_vote))
        .route("/api/admin/votes/:id/close", post(close_vote))
        .route("/api/admin/badges", post(create_badge))
}

async fn stats(State(state): State<AppState>, user: AuthUser) -> AppResult<Json<Value>> {
    require_admin(&state.pool, &user).await?;
    let stats = db::stats::admin_stats(&state.pool).await?;
    Ok(ok(stats))
}

async fn list_users(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<UserSearchQuery>,
) -> AppResult<Json<Value>> {
    require_admin(&state.pool, &user).await?;
    let search = query
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    let users = db::profiles::list_profiles(&state.pool, search).await?;
    Ok(ok(users))
}

async fn list_wishes(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<WishListQuery>,
) -> AppResult<Json<Value>> {
    require_admin(&state.pool, &user).await?;
    let wishes = db::wishes::list_by_status(&state.pool, query.status).await?;
    Ok(ok(wishes))
}

/// Moves a wish along its lifecycle. Anything other than
/// pending→approved, pending→rejected or approved→fulfilled is refused.
async fn set_wish_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<WishStatusUpdate>,
) -> AppResult<Json<Value>> {
    let req = req.validated()?;
    let admin = require_admin(&state.pool, &user).await?;

    let current = db::wishes::get_wish(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("Wish not found"))?;
    if !current.status.can_transition_to(req.status) {
        return Err(AppError::conflict(format!(
            "A {} wish cannot become {}",
            current.status, req.status
        )));
    }

    let wish = db::wishes::transition(
        &state.pool,
        id,
        current.status,
        req.status,
        req.note.as_deref(),
        req.fulfilled_by.as_deref(),
    )
    .await?
    .ok_or_else(|| AppError::conflict("The wish was changed by someone else, reload and retry"))?;

    tracing::info!(
        wish_id = %id,
        admin_id = %admin.id,
        from = %current.status,
        to = %wish.status,
        "wish status changed"
    );
    Ok(ok(wish))
}

async fn points_audit(State(state): State<AppState>, user: AuthUser) -> AppResult<Json<Value>> {
    require_admin(&state.pool, &user).await?;
    let discrepancies = db::points::audit(&state.pool).await?;
    Ok(ok(json!({
        "count": discrepancies.len(),
        "discrepancies": discrepancies,
    })))
}

async fn fix_all_points(State(state): State<AppState>, user: AuthUser) -> AppResult<Json<Value>> {
    let admin = require_admin(&state.pool, &user).await?;
    let fixed = db::points::fix_discrepancies(&state.pool, None).await?;
    tracing::info!(admin_id = %admin.id, fixed = fixed.len(), "bulk points correction");
    Ok(ok(json!({ "fixed": fixed.len(), "corrections": fixed })))
}

async fn fix_user_points(
    State(state): State<AppState>,
    user: AuthUser,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    let admin = require_admin(&state.pool, &user).await?;
    if db::profiles::get_profile(&state.pool, user_id).await?.is_none() {
        return Err(AppError::not_found("Profile not found"));
    }
    let fixed = db::points::fix_discrepancies(&state.pool, Some(user_id)).await?;
    tracing::info!(admin_id = %admin.id, user_id = %user_id, fixed = fixed.len(), "points correction");
    Ok(ok(json!({ "fixed": fixed.len(), "corrections": fixed })))
}

async fn create_vote(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<NewVote>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let req = req.validated(Utc::now())?;
    require_admin(&state.pool, &user).await?;
    let vote = db::votes::create_vote(&state.pool, &req).await?;
    Ok((StatusCode::CREATED, ok(vote)))
}

async fn close_vote(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    require_admin(&state.pool, &user).await?;
    if !db::votes::close_vote(&state.pool, id).await? {
        return Err(AppError::not_found("No open poll with that id"));
    }
    Ok(ok(json!({ "closed": id })))
}

async fn create_badge(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<NewBadge>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let req = req.validated()?;
    let admin = require_admin(&state.pool, &user).await?;

    let mut tx = state.pool.begin().await?;
    let badge = db::badges::create_badge(&mut tx, &req).await?;
    let awarded = db::badges::backfill_badge(&mut tx, &badge).await?;
    tx.commit().await?;

    tracing::info!(admin_id = %admin.id, badge_id = %badge.id, awarded, "badge created");
    Ok((StatusCode::CREATED, ok(badge)))
}
