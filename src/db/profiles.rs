use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::models::profile::{LeaderboardEntry, Profile, ProfileUpdate, PublicProfile, ROLE_MEMBER};
use crate::points::SIGNUP_POINTS;
use crate::{referral, username};

const PROFILE_COLUMNS: &str = "id, username, display_name, bio, location, avatar_url, points, \
     referral_code, is_public, profile_completed, role, created_at";

const MAX_CODE_ATTEMPTS: usize = 10;
const MAX_RANDOM_USERNAME_ATTEMPTS: usize = 10;

pub async fn get_profile(pool: &PgPool, id: Uuid) -> Result<Option<Profile>, sqlx::Error> {
    let mut conn = pool.acquire().await?;
    let profile = get_profile_conn(&mut conn, id).await?;
    Ok(profile)
}

pub async fn get_profile_conn(
    conn: &mut PgConnection,
    id: Uuid,
) -> Result<Option<Profile>, sqlx::Error> {
    sqlx::query_as::<_, Profile>(&format!(
        "SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await
}

pub async fn get_public_profile(
    pool: &PgPool,
    username: &str,
) -> Result<Option<PublicProfile>, sqlx::Error> {
    sqlx::query_as::<_, PublicProfile>(
        "SELECT username, display_name, bio, location, avatar_url, points, created_at
         FROM profiles
         WHERE username = $1 AND is_public = TRUE",
    )
    .bind(username)
    .fetch_optional(pool)
    .await
}

pub async fn leaderboard(pool: &PgPool, limit: i64) -> Result<Vec<LeaderboardEntry>, sqlx::Error> {
    sqlx::query_as::<_, LeaderboardEntry>(
        "SELECT username, display_name, avatar_url, points
         FROM profiles
         WHERE is_public = TRUE
         ORDER BY points DESC, created_at ASC
         LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await
}

pub async fn list_profiles(
    pool: &PgPool,
    search: Option<&str>,
) -> Result<Vec<Profile>, sqlx::Error> {
    let pattern = search.map(|s| format!("%{}%", s.replace('%', "\\%").replace('_', "\\_")));
    sqlx::query_as::<_, Profile>(&format!(
        "SELECT {PROFILE_COLUMNS} FROM profiles
         WHERE $1::text IS NULL OR username ILIKE $1 OR display_name ILIKE $1
         ORDER BY created_at DESC
         LIMIT 200"
    ))
    .bind(pattern)
    .fetch_all(pool)
    .await
}

pub async fn username_exists(conn: &mut PgConnection, name: &str) -> Result<bool, sqlx::Error> {
    let row: Option<(i32,)> = sqlx::query_as("SELECT 1 FROM profiles WHERE username = $1")
        .bind(name)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row.is_some())
}

/// First free username derived from `raw`: the normalized base, then numeric
/// suffixes, then a random suffix.
pub async fn suggest_username(conn: &mut PgConnection, raw: &str) -> Result<String, sqlx::Error> {
    for candidate in username::candidates(raw) {
        if !username_exists(conn, &candidate).await? {
            return Ok(candidate);
        }
    }
    tracing::warn!(base = %username::normalize(raw), "numeric username suffixes exhausted");
    for _ in 0..MAX_RANDOM_USERNAME_ATTEMPTS {
        let candidate = username::random_fallback(raw);
        if !username_exists(conn, &candidate).await? {
            return Ok(candidate);
        }
    }
    Err(sqlx::Error::Protocol(format!(
        "could not find a free username for {:?}",
        username::normalize(raw)
    )))
}

pub async fn referral_code_exists(conn: &mut PgConnection, code: &str) -> Result<bool, sqlx::Error> {
    let row: Option<(i32,)> = sqlx::query_as(
        "SELECT 1 FROM profiles WHERE referral_code = $1
         UNION ALL
         SELECT 1 FROM supporters WHERE referral_code = $1
         LIMIT 1",
    )
    .bind(code)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row.is_some())
}

pub async fn unique_referral_code(conn: &mut PgConnection) -> Result<String, sqlx::Error> {
    for _ in 0..MAX_CODE_ATTEMPTS {
        let code = referral::generate_code();
        if !referral_code_exists(conn, &code).await? {
            return Ok(code);
        }
    }
    // 32^8 codes; reaching this means something is badly wrong with the table.
    Err(sqlx::Error::Protocol(
        "could not allocate a unique referral code".into(),
    ))
}

/// Inserts a member profile carrying the signup points.
pub async fn insert_profile(
    conn: &mut PgConnection,
    id: Uuid,
    username: &str,
    display_name: Option<&str>,
    referral_code: &str,
) -> Result<Profile, sqlx::Error> {
    sqlx::query_as::<_, Profile>(&format!(
        "INSERT INTO profiles (id, username, display_name, points, referral_code, is_public, profile_completed, role)
         VALUES ($1, $2, $3, $4, $5, FALSE, FALSE, $6)
         RETURNING {PROFILE_COLUMNS}"
    ))
    .bind(id)
    .bind(username)
    .bind(display_name)
    .bind(SIGNUP_POINTS)
    .bind(referral_code)
    .bind(ROLE_MEMBER)
    .fetch_one(&mut *conn)
    .await
}

/// Applies the provided fields; `None` leaves a column unchanged.
pub async fn update_profile(
    conn: &mut PgConnection,
    id: Uuid,
    update: &ProfileUpdate,
) -> Result<Option<Profile>, sqlx::Error> {
    sqlx::query_as::<_, Profile>(&format!(
        "UPDATE profiles SET
             display_name = COALESCE($2, display_name),
             bio = COALESCE($3, bio),
             location = COALESCE($4, location),
             avatar_url = COALESCE($5, avatar_url),
             is_public = COALESCE($6, is_public)
         WHERE id = $1
         RETURNING {PROFILE_COLUMNS}"
    ))
    .bind(id)
    .bind(update.display_name.as_deref())
    .bind(update.bio.as_deref())
    .bind(update.location.as_deref())
    .bind(update.avatar_url.as_deref())
    .bind(update.is_public)
    .fetch_optional(&mut *conn)
    .await
}

/// Flips `profile_completed` once. Returns false if it was already set.
pub async fn mark_completed(conn: &mut PgConnection, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE profiles SET profile_completed = TRUE
         WHERE id = $1 AND profile_completed = FALSE",
    )
    .bind(id)
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected() == 1)
}
