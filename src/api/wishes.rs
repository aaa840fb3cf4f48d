use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{routing::get, Json, Router};
use serde_json::Value;
use uuid::Uuid;

use crate::auth::{require_profile, AuthUser};
use crate::error::{AppError, AppResult};
use crate::models::wish::{Wish, WishInput, WishStatus};
use crate::{api::ok, db, AppState};

const ACTIVE_WISH_EXISTS: &str =
    "You already have an active wish. Wait until it is fulfilled or rejected before submitting another.";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/wishes", get(list_public).post(create))
        .route("/api/wishes/mine", get(list_mine))
        .route(
            "/api/wishes/:id",
            get(get_one).put(update).delete(withdraw),
        )
}

/// Creates a pending wish. A member may only hold one active wish.
async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<WishInput>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let input = req.validated()?;
    require_profile(&state.pool, &user).await?;

    let mut conn = state.pool.acquire().await?;
    if db::wishes::has_active_wish(&mut conn, user.id).await? {
        return Err(AppError::conflict(ACTIVE_WISH_EXISTS));
    }
    let wish = db::wishes::insert_wish(&mut conn, user.id, &input).await?;

    tracing::info!(wish_id = %wish.id, user_id = %user.id, "wish submitted");
    Ok((StatusCode::CREATED, ok(wish)))
}

async fn list_mine(State(state): State<AppState>, user: AuthUser) -> AppResult<Json<Value>> {
    let wishes = db::wishes::list_user_wishes(&state.pool, user.id).await?;
    Ok(ok(wishes))
}

/// The community marketplace: approved wishes awaiting a supporter.
async fn list_public(State(state): State<AppState>, _user: AuthUser) -> AppResult<Json<Value>> {
    let wishes = db::wishes::list_by_status(&state.pool, Some(WishStatus::Approved)).await?;
    Ok(ok(wishes))
}

fn visible_to(wish: &Wish, user: &AuthUser) -> bool {
    wish.user_id == user.id || wish.status.is_public()
}

async fn get_one(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    let wish = db::wishes::get_wish(&state.pool, id)
        .await?
        .filter(|wish| visible_to(wish, &user))
        .ok_or_else(|| AppError::not_found("Wish not found"))?;
    Ok(ok(wish))
}

/// Explains why an owner-and-pending guarded write touched nothing.
async fn guarded_write_error(state: &AppState, id: Uuid, user: &AuthUser, verb: &str) -> AppError {
    match db::wishes::get_wish(&state.pool, id).await {
        Ok(Some(wish)) if wish.user_id == user.id => AppError::conflict(format!(
            "Only pending wishes can be {verb}; this one is {}",
            wish.status
        )),
        Ok(_) => AppError::not_found("Wish not found"),
        Err(err) => err.into(),
    }
}

async fn update(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<WishInput>,
) -> AppResult<Json<Value>> {
    let input = req.validated()?;
    match db::wishes::update_pending_wish(&state.pool, id, user.id, &input).await? {
        Some(wish) => Ok(ok(wish)),
        None => Err(guarded_write_error(&state, id, &user, "edited").await),
    }
}

async fn withdraw(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    if db::wishes::delete_pending_wish(&state.pool, id, user.id).await? {
        tracing::info!(wish_id = %id, user_id = %user.id, "wish withdrawn");
        Ok(ok(serde_json::json!({ "deleted": id })))
    } else {
        Err(guarded_write_error(&state, id, &user, "withdrawn").await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn wish(owner: Uuid, status: WishStatus) -> Wish {
        Wish {
            id: Uuid::new_v4(),
            user_id: owner,
            title: "Voice assistant setup".into(),
            description: "Help configuring a smart speaker".into(),
            category: None,
            status,
            admin_note: None,
            fulfilled_by: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn owners_see_their_pending_wishes_others_do_not() {
        let owner = AuthUser { id: Uuid::new_v4(), email: None };
        let other = AuthUser { id: Uuid::new_v4(), email: None };
        let pending = wish(owner.id, WishStatus::Pending);
        assert!(visible_to(&pending, &owner));
        assert!(!visible_to(&pending, &other));

        let approved = wish(owner.id, WishStatus::Approved);
        assert!(visible_to(&approved, &other));
        let rejected = wish(owner.id, WishStatus::Rejected);
        assert!(!visible_to(&rejected, &other));
    }
}
