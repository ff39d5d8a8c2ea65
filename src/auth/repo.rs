use anyhow::Context;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

pub use crate::auth::repo_types::User;

impl User {
    /// Find a user by (already normalized) email.
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(db)
        .await
        .context("find user by email")?;
        Ok(user)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await
        .context("find user by id")?;
        Ok(user)
    }

    /// Create a new user with hashed password. Fails with a unique violation on a taken email.
    pub async fn create(
        db: &PgPool,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, username, email, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING id, username, email, password_hash, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .fetch_one(db)
        .await
        .context("insert user")?;
        Ok(user)
    }

    /// Every user except `exclude`, by username.
    pub async fn list_except(db: &PgPool, exclude: Uuid) -> anyhow::Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, created_at
            FROM users
            WHERE id <> $1
            ORDER BY username ASC, created_at ASC
            "#,
        )
        .bind(exclude)
        .fetch_all(db)
        .await
        .context("list users")?;
        Ok(users)
    }

    pub async fn update_username(
        conn: &mut PgConnection,
        id: Uuid,
        username: &str,
    ) -> anyhow::Result<()> {
        sqlx::query(r#"UPDATE users SET username = $2 WHERE id = $1"#)
            .bind(id)
            .bind(username)
            .execute(&mut *conn)
            .await
            .context("update username")?;
        Ok(())
    }
}
