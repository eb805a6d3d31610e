//! Feed composition: paginated post lists for every scope the site serves.

use std::sync::Arc;

use thiserror::Error;

use crate::application::pagination::{Page, Paginator};
use crate::application::repos::{
    CommentsRepo, FeedPost, FeedQuery, FollowsRepo, GroupsRepo, PostComment, PostsRepo, RepoError,
    UsersRepo,
};
use crate::domain::entities::{GroupRecord, UserRecord};

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("unknown group")]
    UnknownGroup,
    #[error("unknown author")]
    UnknownAuthor,
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// A group feed page together with the group header the template renders.
pub struct GroupFeed {
    pub group: GroupRecord,
    pub page: Page<FeedPost>,
}

/// An author profile page: header data plus one page of their posts.
pub struct ProfileFeed {
    pub author: UserRecord,
    pub post_count: u64,
    /// Whether the viewing user already follows this author.
    pub following: bool,
    pub page: Page<FeedPost>,
}

/// A single post with everything its detail view shows.
pub struct PostDetail {
    pub post: FeedPost,
    pub author_post_count: u64,
    pub comments: Vec<PostComment>,
}

#[derive(Clone)]
pub struct FeedService {
    posts: Arc<dyn PostsRepo>,
    groups: Arc<dyn GroupsRepo>,
    users: Arc<dyn UsersRepo>,
    follows: Arc<dyn FollowsRepo>,
    comments: Arc<dyn CommentsRepo>,
    paginator: Paginator,
}

impl FeedService {
    pub fn new(
        posts: Arc<dyn PostsRepo>,
        groups: Arc<dyn GroupsRepo>,
        users: Arc<dyn UsersRepo>,
        follows: Arc<dyn FollowsRepo>,
        comments: Arc<dyn CommentsRepo>,
        page_size: u64,
    ) -> Self {
        Self {
            posts,
            groups,
            users,
            follows,
            comments,
            paginator: Paginator::new(page_size),
        }
    }

    pub fn page_size(&self) -> u64 {
        self.paginator.page_size()
    }

    /// One page of the global feed, newest first.
    pub async fn global_page(&self, requested: Option<i64>) -> Result<Page<FeedPost>, FeedError> {
        self.fetch_page(FeedQuery::All, requested).await
    }

    /// One page of a group's feed; the slug must resolve.
    pub async fn group_page(
        &self,
        slug: &str,
        requested: Option<i64>,
    ) -> Result<GroupFeed, FeedError> {
        let group = self
            .groups
            .find_by_slug(slug)
            .await?
            .ok_or(FeedError::UnknownGroup)?;

        let page = self
            .fetch_page(FeedQuery::Group { group_id: group.id }, requested)
            .await?;

        Ok(GroupFeed { group, page })
    }

    /// One page of an author's profile feed plus the profile header data.
    pub async fn profile_page(
        &self,
        username: &str,
        requested: Option<i64>,
        viewer: Option<i64>,
    ) -> Result<ProfileFeed, FeedError> {
        let author = self
            .users
            .find_by_username(username)
            .await?
            .ok_or(FeedError::UnknownAuthor)?;

        let query = FeedQuery::Author {
            author_id: author.id,
        };
        let post_count = self.posts.count_feed(query).await?;
        let page = self.fetch_page(query, requested).await?;

        let following = match viewer {
            Some(user_id) => self.follows.exists(user_id, author.id).await?,
            None => false,
        };

        Ok(ProfileFeed {
            author,
            post_count,
            following,
            page,
        })
    }

    /// One page of posts by the authors the given user follows.
    pub async fn following_page(
        &self,
        user_id: i64,
        requested: Option<i64>,
    ) -> Result<Page<FeedPost>, FeedError> {
        self.fetch_page(FeedQuery::FollowedBy { user_id }, requested)
            .await
    }

    /// A post addressed by author username and id, with its comments.
    pub async fn post_detail(
        &self,
        username: &str,
        post_id: i64,
    ) -> Result<Option<PostDetail>, FeedError> {
        let Some(post) = self.posts.find_feed_post(username, post_id).await? else {
            return Ok(None);
        };

        let author_post_count = self
            .posts
            .count_feed(FeedQuery::Author {
                author_id: post.author_id,
            })
            .await?;
        let comments = self.comments.list_for_post(post.id).await?;

        Ok(Some(PostDetail {
            post,
            author_post_count,
            comments,
        }))
    }

    async fn fetch_page(
        &self,
        query: FeedQuery,
        requested: Option<i64>,
    ) -> Result<Page<FeedPost>, FeedError> {
        let total = self.posts.count_feed(query).await?;
        let window = self.paginator.window(requested, total);
        let items = self
            .posts
            .list_feed(query, window.limit, window.offset)
            .await?;
        Ok(Page::new(items, window))
    }
}
