//! Domain entities mirrored from persistent storage.

use time::OffsetDateTime;

#[derive(Debug, Clone, PartialEq)]
pub struct UserRecord {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub joined: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupRecord {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PostRecord {
    pub id: i64,
    pub text: String,
    pub pub_date: OffsetDateTime,
    pub image: Option<String>,
    pub author_id: i64,
    pub group_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommentRecord {
    pub id: i64,
    pub text: String,
    pub created: OffsetDateTime,
    pub author_id: i64,
    pub post_id: i64,
}

/// Directed "reader subscribes to author" relationship. The pair is unique.
#[derive(Debug, Clone, PartialEq)]
pub struct FollowRecord {
    pub id: i64,
    pub user_id: i64,
    pub author_id: i64,
}

/// Server-side login session. The cookie carries the raw token; only its
/// digest is persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecord {
    pub token_digest: String,
    pub user_id: i64,
    pub created_at: OffsetDateTime,
    pub expires_at: OffsetDateTime,
}
