use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::models::wish::{Wish, WishInput, WishStatus};

const WISH_COLUMNS: &str = "id, user_id, title, description, category, status, admin_note, \
     fulfilled_by, created_at, updated_at";

pub async fn has_active_wish(conn: &mut PgConnection, user_id: Uuid) -> Result<bool, sqlx::Error> {
    let row: Option<(i32,)> = sqlx::query_as(
        "SELECT 1 FROM wishes
         WHERE user_id = $1 AND status IN ('pending', 'approved')
         LIMIT 1",
    )
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row.is_some())
}

pub async fn insert_wish(
    conn: &mut PgConnection,
    user_id: Uuid,
    input: &WishInput,
) -> Result<Wish, sqlx::Error> {
    sqlx::query_as::<_, Wish>(&format!(
        "INSERT INTO wishes (user_id, title, description, category, status)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING {WISH_COLUMNS}"
    ))
    .bind(user_id)
    .bind(&input.title)
    .bind(&input.description)
    .bind(input.category.as_deref())
    .bind(WishStatus::Pending.as_str())
    .fetch_one(&mut *conn)
    .await
}

pub async fn get_wish(pool: &PgPool, id: Uuid) -> Result<Option<Wish>, sqlx::Error> {
    sqlx::query_as::<_, Wish>(&format!("SELECT {WISH_COLUMNS} FROM wishes WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn list_user_wishes(pool: &PgPool, user_id: Uuid) -> Result<Vec<Wish>, sqlx::Error> {
    sqlx::query_as::<_, Wish>(&format!(
        "SELECT {WISH_COLUMNS} FROM wishes WHERE user_id = $1 ORDER BY created_at DESC"
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub async fn list_by_status(
    pool: &PgPool,
    status: Option<WishStatus>,
) -> Result<Vec<Wish>, sqlx::Error> {
    sqlx::query_as::<_, Wish>(&format!(
        "SELECT {WISH_COLUMNS} FROM wishes
         WHERE $1::text IS NULL OR status = $1
         ORDER BY created_at DESC"
    ))
    .bind(status.map(WishStatus::as_str))
    .fetch_all(pool)
    .await
}

/// Edits a wish only while it is the caller's and still pending.
pub async fn update_pending_wish(
    pool: &PgPool,
    id: Uuid,
    user_id: Uuid,
    input: &WishInput,
) -> Result<Option<Wish>, sqlx::Error> {
    sqlx::query_as::<_, Wish>(&format!(
        "UPDATE wishes
         SET title = $3, description = $4, category = $5, updated_at = NOW()
         WHERE id = $1 AND user_id = $2 AND status = 'pending'
         RETURNING {WISH_COLUMNS}"
    ))
    .bind(id)
    .bind(user_id)
    .bind(&input.title)
    .bind(&input.description)
    .bind(input.category.as_deref())
    .fetch_optional(pool)
    .await
}

pub async fn delete_pending_wish(pool: &PgPool, id: Uuid, user_id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "DELETE FROM wishes WHERE id = $1 AND user_id = $2 AND status = 'pending'",
    )
    .bind(id)
    .bind(user_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Moves a wish from `from` to `to`. Returns `None` when the wish is no
/// longer in `from` (someone else moved it first).
pub async fn transition(
    pool: &PgPool,
    id: Uuid,
    from: WishStatus,
    to: WishStatus,
    note: Option<&str>,
    fulfilled_by: Option<&str>,
) -> Result<Option<Wish>, sqlx::Error> {
    sqlx::query_as::<_, Wish>(&format!(
        "UPDATE wishes
         SET status = $3,
             admin_note = COALESCE($4, admin_note),
             fulfilled_by = COALESCE($5, fulfilled_by),
             updated_at = NOW()
         WHERE id = $1 AND status = $2
         RETURNING {WISH_COLUMNS}"
    ))
    .bind(id)
    .bind(from.as_str())
    .bind(to.as_str())
    .bind(note)
    .bind(fulfilled_by)
    .fetch_optional(pool)
    .await
}
