use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde_json::Value;

use crate::auth::AuthUser;
use crate::error::AppResult;
use crate::{api::ok, db, AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/badges", get(list_badges))
        .route("/api/badges/mine", get(my_badges))
}

async fn list_badges(State(state): State<AppState>) -> AppResult<Json<Value>> {
    let mut conn = state.pool.acquire().await?;
    let badges = db::badges::list_badges(&mut conn).await?;
    Ok(ok(badges))
}

async fn my_badges(State(state): State<AppState>, user: AuthUser) -> AppResult<Json<Value>> {
    let badges = db::badges::user_badges(&state.pool, user.id).await?;
    Ok(ok(badges))
}
