use axum::extract::State;
use axum::http::StatusCode;
use axum::{
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::{AppError, AppResult};
use crate::models::referral::{CodeOwner, ReferralKind};
use crate::models::supporter::{ConvertRequest, SupporterSignup};
use crate::{api::ok, db, referral, AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/supporters", post(signup))
        .route("/api/supporters/me", get(get_me))
        .route("/api/supporters/convert", post(convert))
}

/// Registers the caller as a supporter, crediting the member whose code
/// they arrived with.
async fn signup(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<SupporterSignup>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let req = req.validated()?;
    let code = req
        .referral_code
        .as_deref()
        .map(|raw| {
            referral::normalize_code(raw)
                .ok_or_else(|| AppError::bad_request("That referral code is not valid"))
        })
        .transpose()?;

    let mut tx = state.pool.begin().await?;
    if db::supporters::get_by_user_conn(&mut tx, user.id).await?.is_some() {
        return Err(AppError::conflict("You are already registered as a supporter"));
    }

    let referred_by = match code {
        Some(code) => match db::referrals::find_code_owner(&mut tx, &code).await? {
            None => return Err(AppError::bad_request("That referral code is not valid")),
            Some(CodeOwner::Profile(id)) if id == user.id => {
                return Err(AppError::bad_request("You cannot use your own referral code"))
            }
            Some(CodeOwner::Profile(id)) => Some(id),
            Some(CodeOwner::Supporter(id)) => {
                tracing::debug!(supporter_id = %id, "supporter code used; no points attached");
                None
            }
        },
        None => None,
    };

    let own_code = db::profiles::unique_referral_code(&mut tx).await?;
    let supporter = db::supporters::insert_supporter(
        &mut tx,
        user.id,
        &req.name,
        &req.email,
        &own_code,
        referred_by,
    )
    .await?;

    if let Some(referrer_id) = referred_by {
        let kind = ReferralKind::Supporter;
        if db::referrals::insert_referral(&mut tx, referrer_id, supporter.id, kind).await? {
            db::points::award_points(&mut tx, referrer_id, kind.point_event()).await?;
        }
    }
    tx.commit().await?;

    tracing::info!(
        supporter_id = %supporter.id,
        referred = referred_by.is_some(),
        "supporter registered"
    );
    Ok((StatusCode::CREATED, ok(supporter)))
}

async fn get_me(State(state): State<AppState>, user: AuthUser) -> AppResult<Json<Value>> {
    let supporter = db::supporters::get_by_user(&state.pool, user.id)
        .await?
        .ok_or_else(|| AppError::not_found("No supporter registration found"))?;
    Ok(ok(supporter))
}

/// Turns the calling supporter into a member. Calling it again after a
/// successful conversion returns the existing profile unchanged.
async fn convert(
    State(state): State<AppState>,
    user: AuthUser,
    body: Option<Json<ConvertRequest>>,
) -> AppResult<Json<Value>> {
    let req = body.map(|Json(req)| req).unwrap_or_default();

    let mut tx = state.pool.begin().await?;
    if let Some(existing) = db::profiles::get_profile_conn(&mut tx, user.id).await? {
        tx.commit().await?;
        return Ok(ok(json!({ "created": false, "profile": existing })));
    }

    let supporter = db::supporters::get_by_user_conn(&mut tx, user.id)
        .await?
        .ok_or_else(|| AppError::not_found("No supporter registration found"))?;

    let base = req
        .username
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(&supporter.name);
    let username = db::profiles::suggest_username(&mut tx, base).await?;

    let profile = db::profiles::insert_profile(
        &mut tx,
        user.id,
        &username,
        Some(&supporter.name),
        &supporter.referral_code,
    )
    .await?;
    db::badges::sync_badges(&mut tx, profile.id, profile.points).await?;
    if !db::supporters::mark_converted(&mut tx, supporter.id, profile.id).await? {
        tracing::warn!(
            supporter_id = %supporter.id,
            stale_profile_id = ?supporter.converted_profile_id,
            "supporter already marked converted to another profile"
        );
    }

    let referrer = supporter.referred_by.filter(|id| *id != profile.id);
    let mut referrer_credited: Option<Uuid> = None;
    if let Some(referrer_id) = referrer {
        let kind = ReferralKind::Member;
        if db::referrals::insert_referral(&mut tx, referrer_id, profile.id, kind).await? {
            db::points::award_points(&mut tx, referrer_id, kind.point_event()).await?;
            referrer_credited = Some(referrer_id);
        }
    }
    tx.commit().await?;

    tracing::info!(
        supporter_id = %supporter.id,
        profile_id = %profile.id,
        username = %profile.username,
        referrer = ?referrer_credited,
        "supporter converted to member"
    );
    Ok(ok(json!({ "created": true, "profile": profile })))
}
