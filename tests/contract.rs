//! Handler contracts that need Postgres. They run when `DATABASE_URL` points
//! at a scratch database and are skipped otherwise.

use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Value};
use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool};
use tetra_community::auth::Claims;
use tetra_community::config::Config;
use tetra_community::error::AppError;
use tetra_community::points::{self, SIGNUP_POINTS};
use tetra_community::{app, db, referral, username, AppState};
use tokio::sync::OnceCell;
use tower::ServiceExt;
use uuid::Uuid;

const SECRET: &str = "contract-secret";
const AUDIENCE: &str = "authenticated";

static SCHEMA_READY: OnceCell<()> = OnceCell::const_new();

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS profiles (
    id UUID PRIMARY KEY,
    username TEXT NOT NULL UNIQUE,
    display_name TEXT,
    bio TEXT,
    location TEXT,
    avatar_url TEXT,
    points INTEGER NOT NULL DEFAULT 0,
    referral_code TEXT NOT NULL UNIQUE,
    is_public BOOLEAN NOT NULL DEFAULT FALSE,
    profile_completed BOOLEAN NOT NULL DEFAULT FALSE,
    role TEXT NOT NULL DEFAULT 'member',
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
CREATE TABLE IF NOT EXISTS supporters (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    user_id UUID NOT NULL UNIQUE,
    name TEXT NOT NULL,
    email TEXT NOT NULL UNIQUE,
    referral_code TEXT NOT NULL UNIQUE,
    referred_by UUID,
    converted_profile_id UUID,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
CREATE TABLE IF NOT EXISTS referrals (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    referrer_id UUID NOT NULL,
    referred_id UUID NOT NULL,
    kind TEXT NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    UNIQUE (referrer_id, referred_id, kind)
);
CREATE TABLE IF NOT EXISTS wishes (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    user_id UUID NOT NULL,
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    category TEXT,
    status TEXT NOT NULL DEFAULT 'pending',
    admin_note TEXT,
    fulfilled_by TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
CREATE UNIQUE INDEX IF NOT EXISTS wishes_one_active_per_user
    ON wishes (user_id) WHERE status IN ('pending', 'approved');
CREATE TABLE IF NOT EXISTS votes (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    title TEXT NOT NULL,
    description TEXT,
    options TEXT[] NOT NULL,
    is_active BOOLEAN NOT NULL DEFAULT TRUE,
    ends_at TIMESTAMPTZ,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
CREATE TABLE IF NOT EXISTS user_votes (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    user_id UUID NOT NULL,
    vote_id UUID NOT NULL,
    option_index INTEGER NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    UNIQUE (user_id, vote_id)
);
CREATE TABLE IF NOT EXISTS badges (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    name TEXT NOT NULL UNIQUE,
    description TEXT,
    icon TEXT,
    points_threshold INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS user_badges (
    user_id UUID NOT NULL,
    badge_id UUID NOT NULL,
    awarded_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    UNIQUE (user_id, badge_id)
);
"#;

async fn ensure_schema(pool: &PgPool) {
    SCHEMA_READY
        .get_or_init(|| async {
            pool.execute(SCHEMA).await.expect("create schema");
        })
        .await;
}

async fn test_env() -> Option<(Router, PgPool)> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set; skipping");
        return None;
    };
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .expect("connect database");
    ensure_schema(&pool).await;

    let config = Config {
        database_url,
        db_max_connections: 5,
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        jwt_secret: SECRET.into(),
        jwt_audience: AUDIENCE.into(),
        trials_api_url: "http://127.0.0.1:1".into(),
        trials_api_key: None,
        trials_timeout: Duration::from_secs(1),
        public_site_url: "https://community.example".into(),
    };
    let state = AppState::new(pool.clone(), &config).expect("build state");
    Some((app(state), pool))
}

fn token_for(user_id: Uuid) -> String {
    let claims = Claims {
        sub: user_id,
        email: None,
        exp: (chrono::Utc::now().timestamp() + 3600) as usize,
        aud: AUDIENCE.into(),
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

async fn call(
    app: &Router,
    method: Method,
    uri: &str,
    token: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"));
    let req = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

async fn register_supporter(app: &Router, user_id: Uuid, referral_code: Option<&str>) -> Value {
    let (status, body) = call(
        app,
        Method::POST,
        "/api/supporters",
        &token_for(user_id),
        Some(json!({
            "name": format!("Ana {}", &user_id.simple().to_string()[..6]),
            "email": format!("{}@example.org", user_id.simple()),
            "referral_code": referral_code,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["data"].clone()
}

/// Supporter signup followed by conversion; returns the new member's id and
/// profile.
async fn join_as_member(app: &Router, referral_code: Option<&str>) -> (Uuid, Value) {
    let user_id = Uuid::new_v4();
    register_supporter(app, user_id, referral_code).await;
    let (status, body) = call(
        app,
        Method::POST,
        "/api/supporters/convert",
        &token_for(user_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["created"], true);
    (user_id, body["data"]["profile"].clone())
}

async fn insert_profile_row(pool: &PgPool, points: i32, role: &str) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO profiles (id, username, points, referral_code, role)
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(id)
    .bind(format!("seed_{}", id.simple()))
    .bind(points)
    .bind(referral::generate_code())
    .bind(role)
    .execute(pool)
    .await
    .expect("insert profile");
    id
}

async fn stored_points(pool: &PgPool, user_id: Uuid) -> i32 {
    db::profiles::get_profile(pool, user_id)
        .await
        .unwrap()
        .expect("profile exists")
        .points
}

#[tokio::test]
async fn conversion_is_idempotent_and_awards_signup_badges() {
    let Some((app, pool)) = test_env().await else {
        return;
    };
    let badge_name = format!("Welcome {}", Uuid::new_v4().simple());
    sqlx::query("INSERT INTO badges (name, points_threshold) VALUES ($1, $2)")
        .bind(&badge_name)
        .bind(SIGNUP_POINTS)
        .execute(&pool)
        .await
        .unwrap();

    let (user_id, profile) = join_as_member(&app, None).await;
    assert_eq!(profile["points"], SIGNUP_POINTS);

    let token = token_for(user_id);
    let (status, body) = call(&app, Method::GET, "/api/badges/mine", &token, None).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|badge| badge["name"].as_str())
        .collect();
    assert!(names.contains(&badge_name.as_str()), "{names:?}");

    let (status, body) = call(&app, Method::POST, "/api/supporters/convert", &token, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["created"], false);
    assert_eq!(body["data"]["profile"]["id"], profile["id"]);
    assert_eq!(stored_points(&pool, user_id).await, SIGNUP_POINTS);

    let (_, body) = call(&app, Method::GET, "/api/supporters/me", &token, None).await;
    assert_eq!(body["data"]["converted_profile_id"], profile["id"]);
}

#[tokio::test]
async fn referrals_are_credited_once_and_audit_clean() {
    let Some((app, pool)) = test_env().await else {
        return;
    };
    let (referrer_id, referrer) = join_as_member(&app, None).await;
    let referrer_code = referrer["referral_code"].as_str().unwrap().to_string();

    // +10 at supporter signup, +20 at conversion.
    let (referred_id, referred) = join_as_member(&app, Some(&referrer_code)).await;
    assert_eq!(stored_points(&pool, referrer_id).await, 40);

    let mut conn = pool.acquire().await.unwrap();
    let tallies = db::points::tallies(&mut conn, Some(referrer_id)).await.unwrap();
    assert_eq!(tallies.len(), 1);
    assert_eq!(tallies[0].member_referrals, 1);
    assert_eq!(tallies[0].supporter_referrals, 1);
    assert!(points::audit(&tallies).is_empty());
    let tallies = db::points::tallies(&mut conn, Some(referred_id)).await.unwrap();
    assert!(points::audit(&tallies).is_empty());
    drop(conn);

    let referred_token = token_for(referred_id);
    let (status, body) = call(
        &app,
        Method::POST,
        "/api/referrals/claim",
        &referred_token,
        Some(json!({ "code": referrer_code })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "You have already been referred");

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/referrals/claim",
        &token_for(referrer_id),
        Some(json!({ "code": referrer_code })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "You cannot use your own referral code");

    let (newcomer_id, _) = join_as_member(&app, None).await;
    let newcomer_token = token_for(newcomer_id);
    let referred_code = referred["referral_code"].as_str().unwrap();
    let (status, _) = call(
        &app,
        Method::POST,
        "/api/referrals/claim",
        &newcomer_token,
        Some(json!({ "code": referred_code })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stored_points(&pool, referred_id).await, SIGNUP_POINTS + 20);

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/referrals/claim",
        &newcomer_token,
        Some(json!({ "code": referrer_code })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "You have already been referred");
    assert_eq!(stored_points(&pool, referrer_id).await, 40);
}

#[tokio::test]
async fn a_member_holds_one_active_wish() {
    let Some((app, pool)) = test_env().await else {
        return;
    };
    let (user_id, _) = join_as_member(&app, None).await;
    let token = token_for(user_id);
    let wish = json!({
        "title": "Adapted wheelchair",
        "description": "A lightweight wheelchair for getting around town",
    });

    let (status, _) = call(&app, Method::POST, "/api/wishes", &token, Some(wish.clone())).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = call(&app, Method::POST, "/api/wishes", &token, Some(wish)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let refusal = body["error"].as_str().unwrap().to_string();
    assert!(refusal.contains("active wish"));

    // Writes that skip the pre-check hit the partial index instead.
    let err = sqlx::query(
        "INSERT INTO wishes (user_id, title, description, status)
         VALUES ($1, 'Second wish', 'Should never be stored', 'approved')",
    )
    .bind(user_id)
    .execute(&pool)
    .await
    .unwrap_err();
    let err = AppError::from(err);
    assert_eq!(err.status, StatusCode::CONFLICT);
    assert_eq!(err.message, refusal);

    let (_, body) = call(&app, Method::GET, "/api/wishes/mine", &token, None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn converted_supporter_keeps_its_first_link() {
    let Some((app, pool)) = test_env().await else {
        return;
    };
    let user_id = Uuid::new_v4();
    register_supporter(&app, user_id, None).await;
    let supporter = db::supporters::get_by_user(&pool, user_id)
        .await
        .unwrap()
        .unwrap();

    let first = Uuid::new_v4();
    let mut conn = pool.acquire().await.unwrap();
    assert!(db::supporters::mark_converted(&mut conn, supporter.id, first).await.unwrap());
    assert!(!db::supporters::mark_converted(&mut conn, supporter.id, Uuid::new_v4())
        .await
        .unwrap());
    drop(conn);

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/supporters/convert",
        &token_for(user_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["created"], true);

    let supporter = db::supporters::get_by_user(&pool, user_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(supporter.converted_profile_id, Some(first));
}

#[tokio::test]
async fn new_badge_reaches_members_already_past_its_threshold() {
    let Some((app, pool)) = test_env().await else {
        return;
    };
    let admin_id = insert_profile_row(&pool, 0, "admin").await;
    let veteran_id = insert_profile_row(&pool, 5_000, "member").await;

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/admin/badges",
        &token_for(admin_id),
        Some(json!({
            "name": format!("Veteran {}", Uuid::new_v4().simple()),
            "points_threshold": 5_000,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let badge_id: Uuid = body["data"]["id"].as_str().unwrap().parse().unwrap();

    let held = |badges: Vec<tetra_community::models::badge::AwardedBadge>| {
        badges.iter().any(|badge| badge.id == badge_id)
    };
    assert!(held(db::badges::user_badges(&pool, veteran_id).await.unwrap()));
    assert!(!held(db::badges::user_badges(&pool, admin_id).await.unwrap()));
}

#[tokio::test]
async fn username_suggestion_skips_a_crowded_name() {
    let Some((_app, pool)) = test_env().await else {
        return;
    };
    let base = format!("crowd{}", &Uuid::new_v4().simple().to_string()[..8]);
    sqlx::query(
        "INSERT INTO profiles (id, username, points, referral_code)
         SELECT gen_random_uuid(),
                CASE WHEN n = 0 THEN $1 ELSE $1 || n END,
                10,
                $1 || '-' || n
         FROM generate_series(0, 100) AS n",
    )
    .bind(&base)
    .execute(&pool)
    .await
    .unwrap();

    let mut conn = pool.acquire().await.unwrap();
    let suggestion = db::profiles::suggest_username(&mut conn, &base).await.unwrap();
    assert!(suggestion.starts_with(&base));
    assert_eq!(suggestion.len(), base.len() + 6);
    assert!(username::is_valid(&suggestion));
    assert!(!db::profiles::username_exists(&mut conn, &suggestion).await.unwrap());
}
