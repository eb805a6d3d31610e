//! Postgres-backed repository implementations.

mod comments;
mod follows;
mod groups;
mod posts;
mod sessions;
mod users;
mod util;

pub use util::map_sqlx_error;

use std::sync::Arc;

use sqlx::{
    Postgres, QueryBuilder,
    postgres::{PgPool, PgPoolOptions},
    query,
};

use crate::application::repos::FeedQuery;

#[derive(Clone)]
pub struct PostgresRepositories {
    pool: Arc<PgPool>,
}

impl PostgresRepositories {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
        PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
    }

    pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations")
            .run(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        query("SELECT 1").execute(self.pool()).await.map(|_| ())
    }

    /// Append the WHERE conditions that narrow the feed to one scope. The
    /// caller has already emitted `WHERE 1=1` so every branch can start with
    /// `AND`.
    fn apply_feed_filter(qb: &mut QueryBuilder<'_, Postgres>, query: FeedQuery) {
        match query {
            FeedQuery::All => {}
            FeedQuery::Group { group_id } => {
                qb.push(" AND p.group_id = ");
                qb.push_bind(group_id);
            }
            FeedQuery::Author { author_id } => {
                qb.push(" AND p.author_id = ");
                qb.push_bind(author_id);
            }
            FeedQuery::FollowedBy { user_id } => {
                qb.push(
                    " AND EXISTS (SELECT 1 FROM follows f WHERE f.user_id = ",
                );
                qb.push_bind(user_id);
                qb.push(" AND f.author_id = p.author_id)");
            }
        }
    }
}
