use sqlx::PgPool;
use uuid::Uuid;

use crate::models::trial::{NewTrialAlert, TrialAlert};

const ALERT_COLUMNS: &str = "id, user_id, conditions, status, phase, country, city, created_at";

pub async fn count_alerts(pool: &PgPool, user_id: Uuid) -> Result<i64, sqlx::Error> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM trial_alerts WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(pool)
        .await?;
    Ok(count)
}

pub async fn insert_alert(
    pool: &PgPool,
    user_id: Uuid,
    alert: &NewTrialAlert,
) -> Result<TrialAlert, sqlx::Error> {
    sqlx::query_as::<_, TrialAlert>(&format!(
        "INSERT INTO trial_alerts (user_id, conditions, status, phase, country, city)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING {ALERT_COLUMNS}"
    ))
    .bind(user_id)
    .bind(&alert.conditions)
    .bind(&alert.status)
    .bind(&alert.phase)
    .bind(alert.country.as_deref())
    .bind(alert.city.as_deref())
    .fetch_one(pool)
    .await
}

pub async fn list_alerts(pool: &PgPool, user_id: Uuid) -> Result<Vec<TrialAlert>, sqlx::Error> {
    sqlx::query_as::<_, TrialAlert>(&format!(
        "SELECT {ALERT_COLUMNS} FROM trial_alerts WHERE user_id = $1 ORDER BY created_at DESC"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub async fn get_alert(
    pool: &PgPool,
    id: Uuid,
    user_id: Uuid,
) -> Result<Option<TrialAlert>, sqlx::Error> {
    sqlx::query_as::<_, TrialAlert>(&format!(
        "SELECT {ALERT_COLUMNS} FROM trial_alerts WHERE id = $1 AND user_id = $2"
    ))
    .bind(id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

pub async fn delete_alert(pool: &PgPool, id: Uuid, user_id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM trial_alerts WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() == 1)
}

/// Marks trials as notified for the alert and returns the ids that were not
/// notified before.
pub async fn record_hits(
    pool: &PgPool,
    alert_id: Uuid,
    nct_ids: &[String],
) -> Result<Vec<String>, sqlx::Error> {
    if nct_ids.is_empty() {
        return Ok(Vec::new());
    }
    let rows: Vec<(String,)> = sqlx::query_as(
        "INSERT INTO trial_alert_hits (alert_id, nct_id)
         SELECT $1, UNNEST($2::text[])
         ON CONFLICT (alert_id, nct_id) DO NOTHING
         RETURNING nct_id",
    )
    .bind(alert_id)
    .bind(nct_ids.to_vec())
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}
