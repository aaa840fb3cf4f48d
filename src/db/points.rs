use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::db::badges;
use crate::points::{self, Discrepancy, PointEvent, PointsTally};

/// Adds the event's value to the stored total, then awards any badges the
/// new total reaches. Returns the new total.
pub async fn award_points(
    conn: &mut PgConnection,
    user_id: Uuid,
    event: PointEvent,
) -> Result<i32, sqlx::Error> {
    let (total,): (i32,) =
        sqlx::query_as("UPDATE profiles SET points = points + $1 WHERE id = $2 RETURNING points")
            .bind(event.value())
            .bind(user_id)
            .fetch_one(&mut *conn)
            .await?;

    tracing::info!(
        user_id = %user_id,
        event = event.as_str(),
        awarded = event.value(),
        total,
        "points awarded"
    );

    badges::sync_badges(conn, user_id, total).await?;
    Ok(total)
}

pub async fn tallies(
    conn: &mut PgConnection,
    user_id: Option<Uuid>,
) -> Result<Vec<PointsTally>, sqlx::Error> {
    sqlx::query_as::<_, PointsTally>(
        "SELECT p.id AS user_id,
                p.username,
                p.points AS current_points,
                p.profile_completed,
                (SELECT COUNT(*) FROM referrals r
                  WHERE r.referrer_id = p.id AND r.kind = 'member') AS member_referrals,
                (SELECT COUNT(*) FROM referrals r
                  WHERE r.referrer_id = p.id AND r.kind = 'supporter') AS supporter_referrals,
                (SELECT COUNT(*) FROM user_votes v WHERE v.user_id = p.id) AS votes
         FROM profiles p
         WHERE $1::uuid IS NULL OR p.id = $1
         ORDER BY p.username",
    )
    .bind(user_id)
    .fetch_all(&mut *conn)
    .await
}

pub async fn audit(pool: &PgPool) -> Result<Vec<Discrepancy>, sqlx::Error> {
    let mut conn = pool.acquire().await?;
    let tallies = tallies(&mut conn, None).await?;
    Ok(points::audit(&tallies))
}

/// Rewrites stored totals to their expected values, for one profile or all
/// of them, in a single transaction. Returns what was corrected.
pub async fn fix_discrepancies(
    pool: &PgPool,
    user_id: Option<Uuid>,
) -> Result<Vec<Discrepancy>, sqlx::Error> {
    let mut tx = pool.begin().await?;
    let tallies = tallies(&mut tx, user_id).await?;
    let discrepancies = points::audit(&tallies);

    for item in &discrepancies {
        let expected = i32::try_from(item.expected_points).map_err(|_| {
            sqlx::Error::Protocol(format!(
                "expected points for {} overflow the points column",
                item.user_id
            ))
        })?;
        sqlx::query("UPDATE profiles SET points = $1 WHERE id = $2")
            .bind(expected)
            .bind(item.user_id)
            .execute(&mut *tx)
            .await?;
        badges::sync_badges(&mut tx, item.user_id, expected).await?;

        tracing::info!(
            user_id = %item.user_id,
            from = item.current_points,
            to = expected,
            "points corrected"
        );
    }

    tx.commit().await?;
    Ok(discrepancies)
}
