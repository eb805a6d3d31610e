use async_trait::async_trait;
use time::OffsetDateTime;

use crate::application::repos::{RepoError, SessionsRepo};
use crate::domain::entities::{SessionRecord, UserRecord};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct SessionUserRow {
    id: i64,
    username: String,
    password_hash: String,
    joined: OffsetDateTime,
}

#[async_trait]
impl SessionsRepo for PostgresRepositories {
    async fn create_session(&self, record: SessionRecord) -> Result<(), RepoError> {
        sqlx::query(
            "INSERT INTO sessions (token_digest, user_id, created_at, expires_at) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(&record.token_digest)
        .bind(record.user_id)
        .bind(record.created_at)
        .bind(record.expires_at)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn find_user_by_digest(
        &self,
        digest: &str,
        now: OffsetDateTime,
    ) -> Result<Option<UserRecord>, RepoError> {
        let row = sqlx::query_as::<_, SessionUserRow>(
            "SELECT u.id, u.username, u.password_hash, u.joined \
             FROM sessions s \
             INNER JOIN users u ON u.id = s.user_id \
             WHERE s.token_digest = $1 AND s.expires_at > $2",
        )
        .bind(digest)
        .bind(now)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(|row| UserRecord {
            id: row.id,
            username: row.username,
            password_hash: row.password_hash,
            joined: row.joined,
        }))
    }

    async fn delete_session(&self, digest: &str) -> Result<(), RepoError> {
        sqlx::query("DELETE FROM sessions WHERE token_digest = $1")
            .bind(digest)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(())
    }
}
