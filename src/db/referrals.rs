use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::models::referral::{CodeOwner, ReferralCounts, ReferralKind, ReferredEntry};

pub async fn find_code_owner(
    conn: &mut PgConnection,
    code: &str,
) -> Result<Option<CodeOwner>, sqlx::Error> {
    let profile: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM profiles WHERE referral_code = $1")
        .bind(code)
        .fetch_optional(&mut *conn)
        .await?;
    if let Some((id,)) = profile {
        return Ok(Some(CodeOwner::Profile(id)));
    }

    let supporter: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM supporters WHERE referral_code = $1")
            .bind(code)
            .fetch_optional(&mut *conn)
            .await?;
    Ok(supporter.map(|(id,)| CodeOwner::Supporter(id)))
}

/// Records the edge. Returns false when it already existed.
pub async fn insert_referral(
    conn: &mut PgConnection,
    referrer_id: Uuid,
    referred_id: Uuid,
    kind: ReferralKind,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO referrals (referrer_id, referred_id, kind)
         VALUES ($1, $2, $3)
         ON CONFLICT (referrer_id, referred_id, kind) DO NOTHING",
    )
    .bind(referrer_id)
    .bind(referred_id)
    .bind(kind.as_str())
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn has_member_referrer(
    conn: &mut PgConnection,
    referred_id: Uuid,
) -> Result<bool, sqlx::Error> {
    let row: Option<(i32,)> = sqlx::query_as(
        "SELECT 1 FROM referrals WHERE referred_id = $1 AND kind = 'member' LIMIT 1",
    )
    .bind(referred_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row.is_some())
}

pub async fn counts(pool: &PgPool, referrer_id: Uuid) -> Result<ReferralCounts, sqlx::Error> {
    let rows: Vec<(String, i64)> = sqlx::query_as(
        "SELECT kind, COUNT(*) FROM referrals WHERE referrer_id = $1 GROUP BY kind",
    )
    .bind(referrer_id)
    .fetch_all(pool)
    .await?;

    let mut counts = ReferralCounts::default();
    for (kind, count) in rows {
        match kind.as_str() {
            "member" => counts.members = count,
            "supporter" => counts.supporters = count,
            _ => {}
        }
    }
    Ok(counts)
}

pub async fn list_referred(
    pool: &PgPool,
    referrer_id: Uuid,
) -> Result<Vec<ReferredEntry>, sqlx::Error> {
    sqlx::query_as::<_, ReferredEntry>(
        "SELECT r.referred_id,
                r.kind,
                COALESCE(p.display_name, p.username, s.name) AS name,
                r.created_at
         FROM referrals r
         LEFT JOIN profiles p ON r.kind = 'member' AND p.id = r.referred_id
         LEFT JOIN supporters s ON r.kind = 'supporter' AND s.id = r.referred_id
         WHERE r.referrer_id = $1
         ORDER BY r.created_at DESC",
    )
    .bind(referrer_id)
    .fetch_all(pool)
    .await
}
