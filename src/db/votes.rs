use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::models::vote::{NewVote, Vote, VoteWithChoice};

const VOTE_COLUMNS: &str = "id, title, description, options, is_active, ends_at, created_at";

pub async fn list_active_with_choice(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Vec<VoteWithChoice>, sqlx::Error> {
    sqlx::query_as::<_, VoteWithChoice>(
        "SELECT v.id, v.title, v.description, v.options, v.ends_at, v.created_at,
                uv.option_index AS my_choice
         FROM votes v
         LEFT JOIN user_votes uv ON uv.vote_id = v.id AND uv.user_id = $1
         WHERE v.is_active = TRUE AND (v.ends_at IS NULL OR v.ends_at > NOW())
         ORDER BY v.created_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub async fn get_vote(conn: &mut PgConnection, id: Uuid) -> Result<Option<Vote>, sqlx::Error> {
    sqlx::query_as::<_, Vote>(&format!("SELECT {VOTE_COLUMNS} FROM votes WHERE id = $1"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
}

/// Records the user's participation. Returns false if they already voted.
pub async fn insert_user_vote(
    conn: &mut PgConnection,
    user_id: Uuid,
    vote_id: Uuid,
    option_index: i32,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO user_votes (user_id, vote_id, option_index)
         VALUES ($1, $2, $3)
         ON CONFLICT (user_id, vote_id) DO NOTHING",
    )
    .bind(user_id)
    .bind(vote_id)
    .bind(option_index)
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn option_counts(pool: &PgPool, vote_id: Uuid) -> Result<Vec<(i32, i64)>, sqlx::Error> {
    sqlx::query_as(
        "SELECT option_index, COUNT(*) FROM user_votes WHERE vote_id = $1 GROUP BY option_index",
    )
    .bind(vote_id)
    .fetch_all(pool)
    .await
}

pub async fn create_vote(pool: &PgPool, vote: &NewVote) -> Result<Vote, sqlx::Error> {
    sqlx::query_as::<_, Vote>(&format!(
        "INSERT INTO votes (title, description, options, is_active, ends_at)
         VALUES ($1, $2, $3, TRUE, $4)
         RETURNING {VOTE_COLUMNS}"
    ))
    .bind(&vote.title)
    .bind(vote.description.as_deref())
    .bind(&vote.options)
    .bind(vote.ends_at)
    .fetch_one(pool)
    .await
}

pub async fn close_vote(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE votes SET is_active = FALSE WHERE id = $1 AND is_active = TRUE")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() == 1)
}
