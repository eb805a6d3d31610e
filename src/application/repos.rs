//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;

use crate::domain::entities::{
    CommentRecord, GroupRecord, PostRecord, SessionRecord, UserRecord,
};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("integrity error: {message}")]
    Integrity { message: String },
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Explicit feed selection: filter criteria resolved to row ids before the
/// store is consulted, so the query the store runs is fully described here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedQuery {
    All,
    Group { group_id: i64 },
    Author { author_id: i64 },
    FollowedBy { user_id: i64 },
}

/// Post row joined with the display attributes every feed needs.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedPost {
    pub id: i64,
    pub text: String,
    pub pub_date: OffsetDateTime,
    pub image: Option<String>,
    pub author_id: i64,
    pub author_username: String,
    pub group_slug: Option<String>,
    pub group_title: Option<String>,
}

/// Comment joined with its author's username.
#[derive(Debug, Clone, PartialEq)]
pub struct PostComment {
    pub id: i64,
    pub text: String,
    pub created: OffsetDateTime,
    pub author_username: String,
}

#[derive(Debug, Clone)]
pub struct NewUserParams {
    pub username: String,
    pub password_hash: String,
}

#[derive(Debug, Clone)]
pub struct CreatePostParams {
    pub text: String,
    pub image: Option<String>,
    pub author_id: i64,
    pub group_id: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct UpdatePostParams {
    pub id: i64,
    pub text: String,
    pub group_id: Option<i64>,
    /// Replacement media path; `None` keeps the stored image untouched.
    pub image: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CreateCommentParams {
    pub text: String,
    pub author_id: i64,
    pub post_id: i64,
}

#[async_trait]
pub trait UsersRepo: Send + Sync {
    async fn create_user(&self, params: NewUserParams) -> Result<UserRecord, RepoError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, RepoError>;
}

#[async_trait]
pub trait GroupsRepo: Send + Sync {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<GroupRecord>, RepoError>;

    /// All groups ordered by title, for the post form's group selector.
    async fn list_all(&self) -> Result<Vec<GroupRecord>, RepoError>;
}

#[async_trait]
pub trait PostsRepo: Send + Sync {
    /// One feed window ordered `pub_date DESC, id DESC`.
    async fn list_feed(
        &self,
        query: FeedQuery,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<FeedPost>, RepoError>;

    async fn count_feed(&self, query: FeedQuery) -> Result<u64, RepoError>;

    /// A post addressed the way URLs address it: author username + post id.
    /// A mismatched username resolves to `None`.
    async fn find_feed_post(
        &self,
        username: &str,
        post_id: i64,
    ) -> Result<Option<FeedPost>, RepoError>;

    async fn find_by_author_and_id(
        &self,
        username: &str,
        post_id: i64,
    ) -> Result<Option<PostRecord>, RepoError>;
}

#[async_trait]
pub trait PostsWriteRepo: Send + Sync {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError>;

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError>;
}

#[async_trait]
pub trait CommentsRepo: Send + Sync {
    /// Comments for a post, oldest first.
    async fn list_for_post(&self, post_id: i64) -> Result<Vec<PostComment>, RepoError>;

    async fn create_comment(&self, params: CreateCommentParams)
    -> Result<CommentRecord, RepoError>;
}

#[async_trait]
pub trait FollowsRepo: Send + Sync {
    /// Insert the pair unless it already exists; reports whether a row was
    /// created. Never errors on the duplicate case.
    async fn create_if_absent(&self, user_id: i64, author_id: i64)
    -> Result<bool, RepoError>;

    /// Delete the pair if present; reports whether a row was removed.
    async fn delete(&self, user_id: i64, author_id: i64) -> Result<bool, RepoError>;

    async fn exists(&self, user_id: i64, author_id: i64) -> Result<bool, RepoError>;
}

#[async_trait]
pub trait SessionsRepo: Send + Sync {
    async fn create_session(&self, record: SessionRecord) -> Result<(), RepoError>;

    /// Resolve an unexpired session digest to its user.
    async fn find_user_by_digest(
        &self,
        digest: &str,
        now: OffsetDateTime,
    ) -> Result<Option<UserRecord>, RepoError>;

    async fn delete_session(&self, digest: &str) -> Result<(), RepoError>;
}
