use anyhow::Context;
use sqlx::{FromRow, PgConnection, PgPool};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use super::dto::ProfilePatch;

/// Profile joined with the owning user's name and email.
#[derive(Debug, Clone, FromRow)]
pub struct ProfileRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub email: String,
    pub bio: String,
    pub profile_picture: Option<String>,
    pub contact_no: String,
    pub cnic: String,
    pub dob: Option<Date>,
    pub gender: String,
    pub address: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

const SELECT_PROFILE: &str = r#"
    SELECT p.id, p.user_id, u.username, u.email, p.bio, p.profile_picture,
           p.contact_no, p.cnic, p.dob, p.gender, p.address, p.created_at, p.updated_at
      FROM profiles p
      JOIN users u ON u.id = p.user_id
"#;

pub async fn find_by_user(db: &PgPool, user_id: Uuid) -> anyhow::Result<Option<ProfileRow>> {
    let row = sqlx::query_as::<_, ProfileRow>(&format!("{} WHERE p.user_id = $1", SELECT_PROFILE))
        .bind(user_id)
        .fetch_optional(db)
        .await
        .context("find profile by user")?;
    Ok(row)
}

/// Every profile except the caller's, newest first.
pub async fn list_except(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<ProfileRow>> {
    let rows = sqlx::query_as::<_, ProfileRow>(&format!(
        "{} WHERE p.user_id <> $1 ORDER BY p.created_at DESC",
        SELECT_PROFILE
    ))
    .bind(user_id)
    .fetch_all(db)
    .await
    .context("list profiles")?;
    Ok(rows)
}

/// Fails with a unique violation when the user already has a profile.
pub async fn insert(
    conn: &mut PgConnection,
    user_id: Uuid,
    patch: &ProfilePatch,
    picture: Option<&str>,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO profiles (id, user_id, bio, profile_picture, contact_no, cnic, dob, gender, address)
        VALUES ($1, $2, COALESCE($3, ''), $4, COALESCE($5, ''), COALESCE($6, ''), $7,
                COALESCE($8, ''), COALESCE($9, ''))
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(patch.bio.as_deref())
    .bind(picture)
    .bind(patch.contact_no.as_deref())
    .bind(patch.cnic.as_deref())
    .bind(patch.dob)
    .bind(patch.gender.as_deref())
    .bind(patch.address.as_deref())
    .execute(&mut *conn)
    .await
    .context("insert profile")?;
    Ok(())
}

/// Overwrites only the fields present in `patch`. Returns false when there is no profile.
pub async fn update(
    conn: &mut PgConnection,
    user_id: Uuid,
    patch: &ProfilePatch,
    picture: Option<&str>,
) -> anyhow::Result<bool> {
    let res = sqlx::query(
        r#"
        UPDATE profiles
           SET bio             = COALESCE($2, bio),
               profile_picture = COALESCE($3, profile_picture),
               contact_no      = COALESCE($4, contact_no),
               cnic            = COALESCE($5, cnic),
               dob             = COALESCE($6, dob),
               gender          = COALESCE($7, gender),
               address         = COALESCE($8, address),
               updated_at      = now()
         WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .bind(patch.bio.as_deref())
    .bind(picture)
    .bind(patch.contact_no.as_deref())
    .bind(patch.cnic.as_deref())
    .bind(patch.dob)
    .bind(patch.gender.as_deref())
    .bind(patch.address.as_deref())
    .execute(&mut *conn)
    .await
    .context("update profile")?;
    Ok(res.rows_affected() > 0)
}

/// Deletes the profile and hands back its picture key, if any.
pub async fn delete(db: &PgPool, user_id: Uuid) -> anyhow::Result<Option<Option<String>>> {
    let row = sqlx::query_as::<_, (Option<String>,)>(
        r#"DELETE FROM profiles WHERE user_id = $1 RETURNING profile_picture"#,
    )
    .bind(user_id)
    .fetch_optional(db)
    .await
    .context("delete profile")?;
    Ok(row.map(|(picture,)| picture))
}
