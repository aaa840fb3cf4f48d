use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::models::badge::{AwardedBadge, Badge, NewBadge};
use crate::points;

pub async fn list_badges(conn: &mut PgConnection) -> Result<Vec<Badge>, sqlx::Error> {
    sqlx::query_as::<_, Badge>(
        "SELECT id, name, description, icon, points_threshold
         FROM badges
         ORDER BY points_threshold ASC, name ASC",
    )
    .fetch_all(&mut *conn)
    .await
}

pub async fn user_badges(pool: &PgPool, user_id: Uuid) -> Result<Vec<AwardedBadge>, sqlx::Error> {
    sqlx::query_as::<_, AwardedBadge>(
        "SELECT b.id, b.name, b.description, b.icon, b.points_threshold, ub.awarded_at
         FROM user_badges ub
         JOIN badges b ON b.id = ub.badge_id
         WHERE ub.user_id = $1
         ORDER BY ub.awarded_at ASC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub async fn create_badge(conn: &mut PgConnection, badge: &NewBadge) -> Result<Badge, sqlx::Error> {
    sqlx::query_as::<_, Badge>(
        "INSERT INTO badges (name, description, icon, points_threshold)
         VALUES ($1, $2, $3, $4)
         RETURNING id, name, description, icon, points_threshold",
    )
    .bind(&badge.name)
    .bind(badge.description.as_deref())
    .bind(badge.icon.as_deref())
    .bind(badge.points_threshold)
    .fetch_one(&mut *conn)
    .await
}

/// Awards `badge` to every profile already at or above its threshold.
/// Returns how many profiles received it.
pub async fn backfill_badge(conn: &mut PgConnection, badge: &Badge) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO user_badges (user_id, badge_id)
         SELECT id, $1 FROM profiles WHERE points >= $2
         ON CONFLICT (user_id, badge_id) DO NOTHING",
    )
    .bind(badge.id)
    .bind(badge.points_threshold)
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected())
}

/// Inserts the badges `points` qualifies for that the user does not hold
/// yet. Returns how many were new.
pub async fn sync_badges(
    conn: &mut PgConnection,
    user_id: Uuid,
    points: i32,
) -> Result<u64, sqlx::Error> {
    let all = list_badges(conn).await?;
    let mut awarded = 0;
    for badge_id in points::earned_badges(points, &all) {
        let result = sqlx::query(
            "INSERT INTO user_badges (user_id, badge_id)
             VALUES ($1, $2)
             ON CONFLICT (user_id, badge_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(badge_id)
        .execute(&mut *conn)
        .await?;
        awarded += result.rows_affected();
    }
    if awarded > 0 {
        tracing::info!(user_id = %user_id, awarded, "badges awarded");
    }
    Ok(awarded)
}
