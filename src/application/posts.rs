//! Post, comment and follow mutations behind the HTTP handlers.

use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;
use tracing::info;

use crate::application::repos::{
    CommentsRepo, CreateCommentParams, CreatePostParams, FollowsRepo, GroupsRepo, PostsWriteRepo,
    RepoError, UpdatePostParams, UsersRepo,
};
use crate::domain::entities::{CommentRecord, PostRecord};
use crate::domain::policy;
use crate::infra::media::{MediaError, MediaStorage};

/// Raw post form payload as submitted, before validation.
#[derive(Debug, Default, Clone)]
pub struct PostInput {
    pub text: String,
    /// Group slug; empty or missing means "no group".
    pub group: Option<String>,
    pub image: Option<ImageUpload>,
}

#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub filename: String,
    pub bytes: Bytes,
}

/// Field-level validation outcomes the form template renders inline.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PostFieldErrors {
    pub text: Option<&'static str>,
    pub group: Option<&'static str>,
    pub image: Option<&'static str>,
}

impl PostFieldErrors {
    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.group.is_none() && self.image.is_none()
    }
}

#[derive(Debug, Error)]
pub enum PostSubmitError {
    /// Input failed validation; re-render the form with these errors.
    #[error("post form validation failed")]
    Invalid(PostFieldErrors),
    #[error(transparent)]
    Media(#[from] MediaError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Error)]
pub enum CommentSubmitError {
    #[error("comment text must not be empty")]
    EmptyText,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Error)]
pub enum FollowError {
    #[error("unknown author")]
    UnknownAuthor,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Clone)]
pub struct PostService {
    posts_write: Arc<dyn PostsWriteRepo>,
    groups: Arc<dyn GroupsRepo>,
    users: Arc<dyn UsersRepo>,
    follows: Arc<dyn FollowsRepo>,
    media: Arc<MediaStorage>,
}

impl PostService {
    pub fn new(
        posts_write: Arc<dyn PostsWriteRepo>,
        groups: Arc<dyn GroupsRepo>,
        users: Arc<dyn UsersRepo>,
        follows: Arc<dyn FollowsRepo>,
        media: Arc<MediaStorage>,
    ) -> Self {
        Self {
            posts_write,
            groups,
            users,
            follows,
            media,
        }
    }

    /// Validate and persist a new post on behalf of `author_id`.
    pub async fn create_post(
        &self,
        author_id: i64,
        input: PostInput,
    ) -> Result<PostRecord, PostSubmitError> {
        let (text, group_id, image) = self.validate(input).await?;

        let image_path = match image {
            Some(upload) => Some(self.media.store(&upload.filename, &upload.bytes).await?),
            None => None,
        };

        let record = self
            .posts_write
            .create_post(CreatePostParams {
                text,
                image: image_path,
                author_id,
                group_id,
            })
            .await?;

        info!(
            target = "pero::posts",
            post_id = record.id,
            author_id,
            "post created"
        );
        Ok(record)
    }

    /// Validate and persist edits to an existing post. Authorization is the
    /// caller's job; this only applies the write.
    pub async fn update_post(
        &self,
        post_id: i64,
        input: PostInput,
    ) -> Result<PostRecord, PostSubmitError> {
        let (text, group_id, image) = self.validate(input).await?;

        let image_path = match image {
            Some(upload) => Some(self.media.store(&upload.filename, &upload.bytes).await?),
            None => None,
        };

        let record = self
            .posts_write
            .update_post(UpdatePostParams {
                id: post_id,
                text,
                group_id,
                image: image_path,
            })
            .await?;

        info!(target = "pero::posts", post_id = record.id, "post updated");
        Ok(record)
    }

    /// Subscribe `user_id` to `author_username`'s posts. Idempotent, and a
    /// self-follow is silently skipped per the authorization policy.
    pub async fn follow(&self, user_id: i64, author_username: &str) -> Result<(), FollowError> {
        let author = self
            .users
            .find_by_username(author_username)
            .await?
            .ok_or(FollowError::UnknownAuthor)?;

        if !policy::can_follow(user_id, author.id) {
            return Ok(());
        }

        if self.follows.create_if_absent(user_id, author.id).await? {
            info!(
                target = "pero::follows",
                user_id,
                author_id = author.id,
                "follow created"
            );
        }
        Ok(())
    }

    /// Remove the follow if present; a missing pair is a no-op.
    pub async fn unfollow(&self, user_id: i64, author_username: &str) -> Result<(), FollowError> {
        let author = self
            .users
            .find_by_username(author_username)
            .await?
            .ok_or(FollowError::UnknownAuthor)?;

        if self.follows.delete(user_id, author.id).await? {
            info!(
                target = "pero::follows",
                user_id,
                author_id = author.id,
                "follow removed"
            );
        }
        Ok(())
    }

    async fn validate(
        &self,
        input: PostInput,
    ) -> Result<(String, Option<i64>, Option<ImageUpload>), PostSubmitError> {
        let mut errors = PostFieldErrors::default();

        let text = input.text.trim().to_string();
        if text.is_empty() {
            errors.text = Some("Post text must not be empty.");
        }

        if let Some(upload) = input.image.as_ref()
            && imagesize::blob_size(&upload.bytes).is_err()
        {
            errors.image = Some("Upload a valid image file.");
        }

        let group_id = match input.group.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(slug) => match self.groups.find_by_slug(slug).await? {
                Some(group) => Some(group.id),
                None => {
                    errors.group = Some("Choose an existing group.");
                    None
                }
            },
        };

        if errors.is_empty() {
            Ok((text, group_id, input.image))
        } else {
            Err(PostSubmitError::Invalid(errors))
        }
    }
}

/// Comment creation is small enough to stand alone: validate, insert, done.
#[derive(Clone)]
pub struct CommentService {
    comments: Arc<dyn CommentsRepo>,
}

impl CommentService {
    pub fn new(comments: Arc<dyn CommentsRepo>) -> Self {
        Self { comments }
    }

    pub async fn add_comment(
        &self,
        author_id: i64,
        post_id: i64,
        text: &str,
    ) -> Result<CommentRecord, CommentSubmitError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(CommentSubmitError::EmptyText);
        }

        let record = self
            .comments
            .create_comment(CreateCommentParams {
                text: text.to_string(),
                author_id,
                post_id,
            })
            .await?;

        info!(
            target = "pero::comments",
            comment_id = record.id,
            post_id,
            "comment created"
        );
        Ok(record)
    }
}
