use async_trait::async_trait;
use time::OffsetDateTime;

use crate::application::repos::{
    CommentsRepo, CreateCommentParams, PostComment, RepoError,
};
use crate::domain::entities::CommentRecord;

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct PostCommentRow {
    id: i64,
    text: String,
    created: OffsetDateTime,
    author_username: String,
}

#[derive(sqlx::FromRow)]
struct CommentRow {
    id: i64,
    text: String,
    created: OffsetDateTime,
    author_id: i64,
    post_id: i64,
}

#[async_trait]
impl CommentsRepo for PostgresRepositories {
    async fn list_for_post(&self, post_id: i64) -> Result<Vec<PostComment>, RepoError> {
        let rows = sqlx::query_as::<_, PostCommentRow>(
            "SELECT c.id, c.text, c.created, u.username AS author_username \
             FROM comments c \
             INNER JOIN users u ON u.id = c.author_id \
             WHERE c.post_id = $1 \
             ORDER BY c.created ASC, c.id ASC",
        )
        .bind(post_id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows
            .into_iter()
            .map(|row| PostComment {
                id: row.id,
                text: row.text,
                created: row.created,
                author_username: row.author_username,
            })
            .collect())
    }

    async fn create_comment(
        &self,
        params: CreateCommentParams,
    ) -> Result<CommentRecord, RepoError> {
        let row = sqlx::query_as::<_, CommentRow>(
            "INSERT INTO comments (text, author_id, post_id) \
             VALUES ($1, $2, $3) \
             RETURNING id, text, created, author_id, post_id",
        )
        .bind(&params.text)
        .bind(params.author_id)
        .bind(params.post_id)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(CommentRecord {
            id: row.id,
            text: row.text,
            created: row.created,
            author_id: row.author_id,
            post_id: row.post_id,
        })
    }
}
