use axum::extract::State;
use axum::{
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

use crate::auth::{require_profile, AuthUser};
use crate::error::{AppError, AppResult};
use crate::models::referral::{ClaimReferralRequest, CodeOwner, ReferralKind};
use crate::{api::ok, db, referral, AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/referrals/me", get(get_mine))
        .route("/api/referrals/claim", post(claim))
}

async fn get_mine(State(state): State<AppState>, user: AuthUser) -> AppResult<Json<Value>> {
    let profile = require_profile(&state.pool, &user).await?;
    let counts = db::referrals::counts(&state.pool, profile.id).await?;
    let referred = db::referrals::list_referred(&state.pool, profile.id).await?;
    let share = referral::share_links(&state.site_url, &profile.referral_code, profile.display_label());

    Ok(ok(json!({
        "referral_code": profile.referral_code,
        "counts": counts,
        "referred": referred,
        "share": share,
    })))
}

/// Attributes the caller's membership to the owner of `code`.
async fn claim(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<ClaimReferralRequest>,
) -> AppResult<Json<Value>> {
    let code = referral::normalize_code(&req.code)
        .ok_or_else(|| AppError::bad_request("That referral code is not valid"))?;

    let mut tx = state.pool.begin().await?;
    if db::profiles::get_profile_conn(&mut tx, user.id).await?.is_none() {
        return Err(AppError::not_found("Complete your member signup first"));
    }

    let referrer_id = match db::referrals::find_code_owner(&mut tx, &code).await? {
        Some(CodeOwner::Profile(id)) if id == user.id => {
            return Err(AppError::bad_request("You cannot use your own referral code"))
        }
        Some(CodeOwner::Profile(id)) => id,
        Some(CodeOwner::Supporter(_)) => {
            return Err(AppError::bad_request(
                "Only member referral codes can be claimed",
            ))
        }
        None => return Err(AppError::bad_request("That referral code is not valid")),
    };

    if db::referrals::has_member_referrer(&mut tx, user.id).await? {
        return Err(AppError::conflict("You have already been referred"));
    }

    let kind = ReferralKind::Member;
    if !db::referrals::insert_referral(&mut tx, referrer_id, user.id, kind).await? {
        return Err(AppError::conflict("This referral has already been recorded"));
    }
    db::points::award_points(&mut tx, referrer_id, kind.point_event()).await?;
    tx.commit().await?;

    tracing::info!(referrer_id = %referrer_id, referred_id = %user.id, "referral claimed");
    Ok(ok(json!({ "referrer_id": referrer_id })))
}
