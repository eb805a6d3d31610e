use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use time::OffsetDateTime;

use crate::application::repos::{
    CreatePostParams, FeedPost, FeedQuery, PostsRepo, PostsWriteRepo, RepoError, UpdatePostParams,
};
use crate::domain::entities::PostRecord;

use super::{PostgresRepositories, map_sqlx_error};

const FEED_SELECT: &str = "SELECT p.id, p.text, p.pub_date, p.image, p.author_id, \
     u.username AS author_username, g.slug AS group_slug, g.title AS group_title \
     FROM posts p \
     INNER JOIN users u ON u.id = p.author_id \
     LEFT JOIN groups g ON g.id = p.group_id \
     WHERE 1=1";

#[derive(sqlx::FromRow)]
struct FeedPostRow {
    id: i64,
    text: String,
    pub_date: OffsetDateTime,
    image: Option<String>,
    author_id: i64,
    author_username: String,
    group_slug: Option<String>,
    group_title: Option<String>,
}

impl From<FeedPostRow> for FeedPost {
    fn from(row: FeedPostRow) -> Self {
        Self {
            id: row.id,
            text: row.text,
            pub_date: row.pub_date,
            image: row.image,
            author_id: row.author_id,
            author_username: row.author_username,
            group_slug: row.group_slug,
            group_title: row.group_title,
        }
    }
}

#[derive(sqlx::FromRow)]
struct PostRow {
    id: i64,
    text: String,
    pub_date: OffsetDateTime,
    image: Option<String>,
    author_id: i64,
    group_id: Option<i64>,
}

impl From<PostRow> for PostRecord {
    fn from(row: PostRow) -> Self {
        Self {
            id: row.id,
            text: row.text,
            pub_date: row.pub_date,
            image: row.image,
            author_id: row.author_id,
            group_id: row.group_id,
        }
    }
}

#[async_trait]
impl PostsRepo for PostgresRepositories {
    async fn list_feed(
        &self,
        query: FeedQuery,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<FeedPost>, RepoError> {
        let mut qb: QueryBuilder<'_, Postgres> = QueryBuilder::new(FEED_SELECT);
        Self::apply_feed_filter(&mut qb, query);
        qb.push(" ORDER BY p.pub_date DESC, p.id DESC LIMIT ");
        qb.push_bind(limit as i64);
        qb.push(" OFFSET ");
        qb.push_bind(offset as i64);

        let rows = qb
            .build_query_as::<FeedPostRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(FeedPost::from).collect())
    }

    async fn count_feed(&self, query: FeedQuery) -> Result<u64, RepoError> {
        let mut qb: QueryBuilder<'_, Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM posts p WHERE 1=1");
        Self::apply_feed_filter(&mut qb, query);

        let count = qb
            .build_query_scalar::<i64>()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn find_feed_post(
        &self,
        username: &str,
        post_id: i64,
    ) -> Result<Option<FeedPost>, RepoError> {
        let mut qb: QueryBuilder<'_, Postgres> = QueryBuilder::new(FEED_SELECT);
        qb.push(" AND u.username = ");
        qb.push_bind(username);
        qb.push(" AND p.id = ");
        qb.push_bind(post_id);

        let row = qb
            .build_query_as::<FeedPostRow>()
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(FeedPost::from))
    }

    async fn find_by_author_and_id(
        &self,
        username: &str,
        post_id: i64,
    ) -> Result<Option<PostRecord>, RepoError> {
        let row = sqlx::query_as::<_, PostRow>(
            "SELECT p.id, p.text, p.pub_date, p.image, p.author_id, p.group_id \
             FROM posts p \
             INNER JOIN users u ON u.id = p.author_id \
             WHERE u.username = $1 AND p.id = $2",
        )
        .bind(username)
        .bind(post_id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(PostRecord::from))
    }
}

#[async_trait]
impl PostsWriteRepo for PostgresRepositories {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        let row = sqlx::query_as::<_, PostRow>(
            "INSERT INTO posts (text, image, author_id, group_id) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id, text, pub_date, image, author_id, group_id",
        )
        .bind(&params.text)
        .bind(&params.image)
        .bind(params.author_id)
        .bind(params.group_id)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError> {
        // A missing image in the params keeps whatever the row already holds.
        let row = sqlx::query_as::<_, PostRow>(
            "UPDATE posts \
             SET text = $1, group_id = $2, image = COALESCE($3, image) \
             WHERE id = $4 \
             RETURNING id, text, pub_date, image, author_id, group_id",
        )
        .bind(&params.text)
        .bind(params.group_id)
        .bind(&params.image)
        .bind(params.id)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into())
    }
}
