use serde::Serialize;
use sqlx::PgPool;

#[derive(Debug, Default, Serialize)]
pub struct WishCounts {
    pub pending: i64,
    pub approved: i64,
    pub fulfilled: i64,
    pub rejected: i64,
}

#[derive(Debug, Serialize)]
pub struct AdminStats {
    pub members: i64,
    pub supporters: i64,
    pub unconverted_supporters: i64,
    pub referrals: i64,
    pub active_votes: i64,
    pub wishes: WishCounts,
}

pub async fn admin_stats(pool: &PgPool) -> Result<AdminStats, sqlx::Error> {
    let (members, supporters, unconverted_supporters, referrals, active_votes): (
        i64,
        i64,
        i64,
        i64,
        i64,
    ) = sqlx::query_as(
        "SELECT
            (SELECT COUNT(*) FROM profiles),
            (SELECT COUNT(*) FROM supporters),
            (SELECT COUNT(*) FROM supporters WHERE converted_profile_id IS NULL),
            (SELECT COUNT(*) FROM referrals),
            (SELECT COUNT(*) FROM votes WHERE is_active = TRUE)",
    )
    .fetch_one(pool)
    .await?;

    let rows: Vec<(String, i64)> =
        sqlx::query_as("SELECT status, COUNT(*) FROM wishes GROUP BY status")
            .fetch_all(pool)
            .await?;
    let mut wishes = WishCounts::default();
    for (status, count) in rows {
        match status.as_str() {
            "pending" => wishes.pending = count,
            "approved" => wishes.approved = count,
            "fulfilled" => wishes.fulfilled = count,
            "rejected" => wishes.rejected = count,
            other => tracing::warn!(status = other, "unexpected wish status in stats"),
        }
    }

    Ok(AdminStats {
        members,
        supporters,
        unconverted_supporters,
        referrals,
        active_votes,
        wishes,
    })
}
