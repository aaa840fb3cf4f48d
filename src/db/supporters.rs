use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::models::supporter::Supporter;

const SUPPORTER_COLUMNS: &str =
    "id, user_id, name, email, referral_code, referred_by, converted_profile_id, created_at";

pub async fn get_by_user(pool: &PgPool, user_id: Uuid) -> Result<Option<Supporter>, sqlx::Error> {
    let mut conn = pool.acquire().await?;
    let supporter = get_by_user_conn(&mut conn, user_id).await?;
    Ok(supporter)
}

pub async fn get_by_user_conn(
    conn: &mut PgConnection,
    user_id: Uuid,
) -> Result<Option<Supporter>, sqlx::Error> {
    sqlx::query_as::<_, Supporter>(&format!(
        "SELECT {SUPPORTER_COLUMNS} FROM supporters WHERE user_id = $1"
    ))
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await
}

pub async fn insert_supporter(
    conn: &mut PgConnection,
    user_id: Uuid,
    name: &str,
    email: &str,
    referral_code: &str,
    referred_by: Option<Uuid>,
) -> Result<Supporter, sqlx::Error> {
    sqlx::query_as::<_, Supporter>(&format!(
        "INSERT INTO supporters (user_id, name, email, referral_code, referred_by)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING {SUPPORTER_COLUMNS}"
    ))
    .bind(user_id)
    .bind(name)
    .bind(email)
    .bind(referral_code)
    .bind(referred_by)
    .fetch_one(&mut *conn)
    .await
}

/// Links the supporter to its new profile. Returns false when the row was
/// already linked, leaving the earlier link in place.
pub async fn mark_converted(
    conn: &mut PgConnection,
    supporter_id: Uuid,
    profile_id: Uuid,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE supporters SET converted_profile_id = $1
         WHERE id = $2 AND converted_profile_id IS NULL",
    )
    .bind(profile_id)
    .bind(supporter_id)
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected() == 1)
}
