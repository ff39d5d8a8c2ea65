use anyhow::Context;
use sqlx::{FromRow, PgPool};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use super::dto::CapsuleDraft;

/// Capsule with its recipients folded in.
#[derive(Debug, Clone, FromRow)]
pub struct CapsuleRow {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub description: String,
    pub unlock_date: Date,
    pub capsule_type: String,
    pub media: String,
    pub friends: Vec<Uuid>,
    pub created_at: OffsetDateTime,
}

impl CapsuleRow {
    pub fn is_recipient(&self, user_id: Uuid) -> bool {
        self.friends.contains(&user_id)
    }
}

const SELECT_CAPSULE: &str = r#"
    SELECT c.id, c.owner_id, c.title, c.description, c.unlock_date, c.capsule_type,
           c.media, c.created_at,
           COALESCE(array_agg(r.user_id ORDER BY r.user_id)
                    FILTER (WHERE r.user_id IS NOT NULL), '{}') AS friends
      FROM time_capsules c
      LEFT JOIN capsule_recipients r ON r.capsule_id = c.id
"#;

/// Inserts the capsule and its recipients atomically.
pub async fn insert(
    db: &PgPool,
    owner_id: Uuid,
    draft: &CapsuleDraft,
    media: &str,
) -> anyhow::Result<Uuid> {
    let id = Uuid::new_v4();
    let mut tx = db.begin().await.context("begin capsule transaction")?;

    sqlx::query(
        r#"
        INSERT INTO time_capsules (id, owner_id, title, description, unlock_date, capsule_type, media)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(id)
    .bind(owner_id)
    .bind(&draft.title)
    .bind(&draft.description)
    .bind(draft.unlock_date)
    .bind(draft.capsule_type.as_str())
    .bind(media)
    .execute(&mut *tx)
    .await
    .context("insert capsule")?;

    if !draft.friends.is_empty() {
        sqlx::query(
            r#"
            INSERT INTO capsule_recipients (capsule_id, user_id)
            SELECT $1, UNNEST($2::uuid[])
            "#,
        )
        .bind(id)
        .bind(&draft.friends)
        .execute(&mut *tx)
        .await
        .context("insert capsule recipients")?;
    }

    tx.commit().await.context("commit capsule")?;
    Ok(id)
}

pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<CapsuleRow>> {
    let row = sqlx::query_as::<_, CapsuleRow>(&format!(
        "{} WHERE c.id = $1 GROUP BY c.id",
        SELECT_CAPSULE
    ))
    .bind(id)
    .fetch_optional(db)
    .await
    .context("find capsule by id")?;
    Ok(row)
}

/// Capsules owned by or shared with `user_id`, soonest unlock first.
pub async fn list_visible(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<CapsuleRow>> {
    let rows = sqlx::query_as::<_, CapsuleRow>(&format!(
        r#"{}
         WHERE c.owner_id = $1
            OR EXISTS (SELECT 1 FROM capsule_recipients x
                        WHERE x.capsule_id = c.id AND x.user_id = $1)
         GROUP BY c.id
         ORDER BY c.unlock_date ASC, c.created_at ASC"#,
        SELECT_CAPSULE
    ))
    .bind(user_id)
    .fetch_all(db)
    .await
    .context("list capsules")?;
    Ok(rows)
}

/// Deletes an owned capsule and returns its media key. Recipients go with it.
pub async fn delete(db: &PgPool, id: Uuid, owner_id: Uuid) -> anyhow::Result<Option<String>> {
    let media: Option<(String,)> = sqlx::query_as(
        r#"
        DELETE FROM time_capsules
         WHERE id = $1 AND owner_id = $2
        RETURNING media
        "#,
    )
    .bind(id)
    .bind(owner_id)
    .fetch_optional(db)
    .await
    .context("delete capsule")?;
    Ok(media.map(|(key,)| key))
}
