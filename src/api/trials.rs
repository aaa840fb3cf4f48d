use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::{AppError, AppResult};
use crate::models::trial::{NewTrialAlert, Trial, TrialSearchRequest};
use crate::{api::ok, db, AppState};

const MAX_ALERTS_PER_USER: i64 = 10;
const MAX_NCT_ID_LEN: usize = 32;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/trials/search", post(search))
        .route("/api/trials/alerts", get(list_alerts).post(create_alert))
        .route("/api/trials/alerts/:id", delete(delete_alert))
        .route("/api/trials/alerts/:id/check", post(check_alert))
        .route("/api/trials/:id", get(get_trial))
}

async fn search(
    State(state): State<AppState>,
    Json(req): Json<TrialSearchRequest>,
) -> AppResult<Json<Value>> {
    let req = req.normalized()?;
    let page = state.trials.search(&req).await?;
    Ok(ok(page))
}

async fn get_trial(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Value>> {
    let id = id.trim();
    if id.is_empty()
        || id.len() > MAX_NCT_ID_LEN
        || !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    {
        return Err(AppError::bad_request("Invalid trial identifier"));
    }
    let trial = state.trials.get(id).await?;
    Ok(ok(trial))
}

async fn create_alert(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<NewTrialAlert>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let alert = req.validated()?;
    if db::trial_alerts::count_alerts(&state.pool, user.id).await? >= MAX_ALERTS_PER_USER {
        return Err(AppError::conflict(format!(
            "You can keep at most {MAX_ALERTS_PER_USER} trial alerts"
        )));
    }
    let alert = db::trial_alerts::insert_alert(&state.pool, user.id, &alert).await?;
    Ok((StatusCode::CREATED, ok(alert)))
}

async fn list_alerts(State(state): State<AppState>, user: AuthUser) -> AppResult<Json<Value>> {
    let alerts = db::trial_alerts::list_alerts(&state.pool, user.id).await?;
    Ok(ok(alerts))
}

async fn delete_alert(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    if !db::trial_alerts::delete_alert(&state.pool, id, user.id).await? {
        return Err(AppError::not_found("Alert not found"));
    }
    Ok(ok(json!({ "deleted": id })))
}

/// Runs the alert's search and returns trials the user has not been told
/// about yet, remembering them for next time.
async fn check_alert(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    let alert = db::trial_alerts::get_alert(&state.pool, id, user.id)
        .await?
        .ok_or_else(|| AppError::not_found("Alert not found"))?;

    let page = state.trials.search(&alert.search_request()).await?;
    let ids: Vec<String> = page.trials.iter().map(|t| t.nct_id.clone()).collect();
    let fresh = db::trial_alerts::record_hits(&state.pool, alert.id, &ids).await?;
    let new_trials: Vec<Trial> = page
        .trials
        .into_iter()
        .filter(|trial| fresh.contains(&trial.nct_id))
        .collect();

    tracing::info!(
        alert_id = %alert.id,
        matched = ids.len(),
        new = new_trials.len(),
        "trial alert checked"
    );
    Ok(ok(json!({
        "alert_id": alert.id,
        "new_trials": new_trials,
        "total_count": page.total_count,
    })))
}
