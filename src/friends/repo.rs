use anyhow::Context;
use sqlx::PgPool;
use uuid::Uuid;

use super::{
    dto::PendingRequest,
    transitions::{Friendship, FriendshipStatus},
};
use crate::auth::repo::User;

/// The row linking `a` and `b`, whichever of them asked.
pub async fn find_between(db: &PgPool, a: Uuid, b: Uuid) -> anyhow::Result<Option<Friendship>> {
    let row = sqlx::query_as::<_, Friendship>(
        r#"
        SELECT id, user_id, friend_user_id, status, created_at, updated_at
          FROM friendships
         WHERE (user_id = $1 AND friend_user_id = $2)
            OR (user_id = $2 AND friend_user_id = $1)
         LIMIT 1
        "#,
    )
    .bind(a)
    .bind(b)
    .fetch_optional(db)
    .await
    .context("find friendship between users")?;
    Ok(row)
}

pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Friendship>> {
    let row = sqlx::query_as::<_, Friendship>(
        r#"
        SELECT id, user_id, friend_user_id, status, created_at, updated_at
          FROM friendships
         WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(db)
    .await
    .context("find friendship by id")?;
    Ok(row)
}

/// New pending request. The pair index makes a concurrent duplicate fail with a unique violation.
pub async fn insert_pending(
    db: &PgPool,
    requester: Uuid,
    recipient: Uuid,
) -> anyhow::Result<Friendship> {
    let row = sqlx::query_as::<_, Friendship>(
        r#"
        INSERT INTO friendships (id, user_id, friend_user_id, status)
        VALUES ($1, $2, $3, 'pending')
        RETURNING id, user_id, friend_user_id, status, created_at, updated_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(requester)
    .bind(recipient)
    .fetch_one(db)
    .await
    .context("insert friendship")?;
    Ok(row)
}

/// Moves a pending row owned by `recipient` to `to`. Returns false if it was no longer pending.
pub async fn answer_pending(
    db: &PgPool,
    id: Uuid,
    recipient: Uuid,
    to: FriendshipStatus,
) -> anyhow::Result<bool> {
    let res = sqlx::query(
        r#"
        UPDATE friendships
           SET status = $3, updated_at = now()
         WHERE id = $1 AND friend_user_id = $2 AND status = 'pending'
        "#,
    )
    .bind(id)
    .bind(recipient)
    .bind(to)
    .execute(db)
    .await
    .context("update friendship status")?;
    Ok(res.rows_affected() == 1)
}

/// Deletes every row between the pair regardless of status or direction.
pub async fn delete_between(db: &PgPool, a: Uuid, b: Uuid) -> anyhow::Result<u64> {
    let res = sqlx::query(
        r#"
        DELETE FROM friendships
         WHERE (user_id = $1 AND friend_user_id = $2)
            OR (user_id = $2 AND friend_user_id = $1)
        "#,
    )
    .bind(a)
    .bind(b)
    .execute(db)
    .await
    .context("delete friendship")?;
    Ok(res.rows_affected())
}

/// Users linked to `user_id` by an accepted friendship, in either direction.
pub async fn list_friends(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<User>> {
    let rows = sqlx::query_as::<_, User>(
        r#"
        SELECT u.id, u.username, u.email, u.password_hash, u.created_at
          FROM friendships f
          JOIN users u
            ON u.id = CASE WHEN f.user_id = $1 THEN f.friend_user_id ELSE f.user_id END
         WHERE (f.user_id = $1 OR f.friend_user_id = $1)
           AND f.status = 'accepted'
         ORDER BY u.username ASC
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await
    .context("list friends")?;
    Ok(rows)
}

/// Pending requests addressed to `user_id`, oldest first.
pub async fn list_incoming_pending(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<PendingRequest>> {
    let rows = sqlx::query_as::<_, PendingRequest>(
        r#"
        SELECT f.id, f.user_id, f.friend_user_id, f.status, u.username, u.email, f.created_at
          FROM friendships f
          JOIN users u ON u.id = f.user_id
         WHERE f.friend_user_id = $1 AND f.status = 'pending'
         ORDER BY f.created_at ASC
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await
    .context("list pending friend requests")?;
    Ok(rows)
}

/// The subset of `candidates` that are accepted friends of `user_id`.
pub async fn accepted_among(
    db: &PgPool,
    user_id: Uuid,
    candidates: &[Uuid],
) -> anyhow::Result<Vec<Uuid>> {
    let rows: Vec<(Uuid,)> = sqlx::query_as(
        r#"
        SELECT CASE WHEN user_id = $1 THEN friend_user_id ELSE user_id END
          FROM friendships
         WHERE status = 'accepted'
           AND ((user_id = $1 AND friend_user_id = ANY($2))
             OR (friend_user_id = $1 AND user_id = ANY($2)))
        "#,
    )
    .bind(user_id)
    .bind(candidates)
    .fetch_all(db)
    .await
    .context("check accepted friends")?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}
