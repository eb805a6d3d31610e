//! Shared fixtures: in-memory repositories and request helpers.
#![allow(dead_code)]

use std::sync::{Arc, Mutex, OnceLock};

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, Response, header},
};
use http_body_util::BodyExt;
use time::{Duration, OffsetDateTime};
use tower::ServiceExt;

use pero::application::auth::{AuthService, hash_password, token_digest};
use pero::application::feed::FeedService;
use pero::application::posts::{CommentService, PostService};
use pero::application::repos::{
    CommentsRepo, CreateCommentParams, CreatePostParams, FeedPost, FeedQuery, FollowsRepo,
    GroupsRepo, NewUserParams, PostComment, PostsRepo, PostsWriteRepo, RepoError, SessionsRepo,
    UpdatePostParams, UsersRepo,
};
use pero::domain::entities::{
    CommentRecord, FollowRecord, GroupRecord, PostRecord, SessionRecord, UserRecord,
};
use pero::infra::http::{HttpState, build_router};
use pero::infra::media::MediaStorage;

pub const PASSWORD: &str = "correct horse battery";

/// A one-pixel GIF that passes image validation.
pub const TINY_GIF: &[u8] = b"GIF89a\x01\x00\x01\x00\x80\x00\x00\x00\x00\x00\xff\xff\xff,\x00\x00\x00\x00\x01\x00\x01\x00\x00\x02\x02D\x01\x00;";

fn shared_password_hash() -> String {
    static HASH: OnceLock<String> = OnceLock::new();
    HASH.get_or_init(|| hash_password(PASSWORD).expect("hashing test password"))
        .clone()
}

#[derive(Default)]
struct Inner {
    users: Vec<UserRecord>,
    groups: Vec<GroupRecord>,
    posts: Vec<PostRecord>,
    comments: Vec<CommentRecord>,
    follows: Vec<FollowRecord>,
    sessions: Vec<SessionRecord>,
    next_id: i64,
}

impl Inner {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// All repository traits over one shared in-memory store.
#[derive(Default)]
pub struct MemoryRepos {
    inner: Mutex<Inner>,
}

impl MemoryRepos {
    pub fn add_user(&self, username: &str) -> UserRecord {
        let mut inner = self.inner.lock().unwrap();
        let record = UserRecord {
            id: inner.next_id(),
            username: username.to_string(),
            password_hash: shared_password_hash(),
            joined: OffsetDateTime::now_utc(),
        };
        inner.users.push(record.clone());
        record
    }

    pub fn add_group(&self, title: &str, slug: &str, description: &str) -> GroupRecord {
        let mut inner = self.inner.lock().unwrap();
        let record = GroupRecord {
            id: inner.next_id(),
            title: title.to_string(),
            slug: slug.to_string(),
            description: description.to_string(),
        };
        inner.groups.push(record.clone());
        record
    }

    pub fn add_post(&self, author_id: i64, text: &str, group_id: Option<i64>) -> PostRecord {
        self.add_post_at(author_id, text, group_id, OffsetDateTime::now_utc())
    }

    pub fn add_post_at(
        &self,
        author_id: i64,
        text: &str,
        group_id: Option<i64>,
        pub_date: OffsetDateTime,
    ) -> PostRecord {
        let mut inner = self.inner.lock().unwrap();
        let record = PostRecord {
            id: inner.next_id(),
            text: text.to_string(),
            pub_date,
            image: None,
            author_id,
            group_id,
        };
        inner.posts.push(record.clone());
        record
    }

    pub fn post_count(&self) -> usize {
        self.inner.lock().unwrap().posts.len()
    }

    pub fn latest_post(&self) -> Option<PostRecord> {
        let inner = self.inner.lock().unwrap();
        inner.posts.iter().max_by_key(|post| post.id).cloned()
    }

    pub fn follow_pairs(&self) -> Vec<(i64, i64)> {
        let inner = self.inner.lock().unwrap();
        inner
            .follows
            .iter()
            .map(|follow| (follow.user_id, follow.author_id))
            .collect()
    }

    pub fn session_count(&self) -> usize {
        self.inner.lock().unwrap().sessions.len()
    }

    fn feed_post(inner: &Inner, post: &PostRecord) -> FeedPost {
        let author = inner
            .users
            .iter()
            .find(|user| user.id == post.author_id)
            .expect("post author exists");
        let group = post
            .group_id
            .and_then(|id| inner.groups.iter().find(|group| group.id == id));

        FeedPost {
            id: post.id,
            text: post.text.clone(),
            pub_date: post.pub_date,
            image: post.image.clone(),
            author_id: post.author_id,
            author_username: author.username.clone(),
            group_slug: group.map(|group| group.slug.clone()),
            group_title: group.map(|group| group.title.clone()),
        }
    }

    fn matches(inner: &Inner, post: &PostRecord, query: FeedQuery) -> bool {
        match query {
            FeedQuery::All => true,
            FeedQuery::Group { group_id } => post.group_id == Some(group_id),
            FeedQuery::Author { author_id } => post.author_id == author_id,
            FeedQuery::FollowedBy { user_id } => inner
                .follows
                .iter()
                .any(|follow| follow.user_id == user_id && follow.author_id == post.author_id),
        }
    }
}

#[async_trait]
impl UsersRepo for MemoryRepos {
    async fn create_user(&self, params: NewUserParams) -> Result<UserRecord, RepoError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.users.iter().any(|user| user.username == params.username) {
            return Err(RepoError::Duplicate {
                constraint: "users_username_key".to_string(),
            });
        }
        let record = UserRecord {
            id: inner.next_id(),
            username: params.username,
            password_hash: params.password_hash,
            joined: OffsetDateTime::now_utc(),
        };
        inner.users.push(record.clone());
        Ok(record)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, RepoError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .users
            .iter()
            .find(|user| user.username == username)
            .cloned())
    }
}

#[async_trait]
impl GroupsRepo for MemoryRepos {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<GroupRecord>, RepoError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.groups.iter().find(|group| group.slug == slug).cloned())
    }

    async fn list_all(&self) -> Result<Vec<GroupRecord>, RepoError> {
        let inner = self.inner.lock().unwrap();
        let mut groups = inner.groups.clone();
        groups.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(groups)
    }
}

#[async_trait]
impl PostsRepo for MemoryRepos {
    async fn list_feed(
        &self,
        query: FeedQuery,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<FeedPost>, RepoError> {
        let inner = self.inner.lock().unwrap();
        let mut posts: Vec<&PostRecord> = inner
            .posts
            .iter()
            .filter(|post| Self::matches(&inner, post, query))
            .collect();
        posts.sort_by(|a, b| b.pub_date.cmp(&a.pub_date).then(b.id.cmp(&a.id)));

        Ok(posts
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .map(|post| Self::feed_post(&inner, post))
            .collect())
    }

    async fn count_feed(&self, query: FeedQuery) -> Result<u64, RepoError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .posts
            .iter()
            .filter(|post| Self::matches(&inner, post, query))
            .count() as u64)
    }

    async fn find_feed_post(
        &self,
        username: &str,
        post_id: i64,
    ) -> Result<Option<FeedPost>, RepoError> {
        let inner = self.inner.lock().unwrap();
        let Some(author) = inner.users.iter().find(|user| user.username == username) else {
            return Ok(None);
        };
        Ok(inner
            .posts
            .iter()
            .find(|post| post.id == post_id && post.author_id == author.id)
            .map(|post| Self::feed_post(&inner, post)))
    }

    async fn find_by_author_and_id(
        &self,
        username: &str,
        post_id: i64,
    ) -> Result<Option<PostRecord>, RepoError> {
        let inner = self.inner.lock().unwrap();
        let Some(author) = inner.users.iter().find(|user| user.username == username) else {
            return Ok(None);
        };
        Ok(inner
            .posts
            .iter()
            .find(|post| post.id == post_id && post.author_id == author.id)
            .cloned())
    }
}

#[async_trait]
impl PostsWriteRepo for MemoryRepos {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        let mut inner = self.inner.lock().unwrap();
        let record = PostRecord {
            id: inner.next_id(),
            text: params.text,
            pub_date: OffsetDateTime::now_utc(),
            image: params.image,
            author_id: params.author_id,
            group_id: params.group_id,
        };
        inner.posts.push(record.clone());
        Ok(record)
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError> {
        let mut inner = self.inner.lock().unwrap();
        let post = inner
            .posts
            .iter_mut()
            .find(|post| post.id == params.id)
            .ok_or(RepoError::NotFound)?;
        post.text = params.text;
        post.group_id = params.group_id;
        if let Some(image) = params.image {
            post.image = Some(image);
        }
        Ok(post.clone())
    }
}

#[async_trait]
impl CommentsRepo for MemoryRepos {
    async fn list_for_post(&self, post_id: i64) -> Result<Vec<PostComment>, RepoError> {
        let inner = self.inner.lock().unwrap();
        let mut comments: Vec<&CommentRecord> = inner
            .comments
            .iter()
            .filter(|comment| comment.post_id == post_id)
            .collect();
        comments.sort_by(|a, b| a.created.cmp(&b.created).then(a.id.cmp(&b.id)));

        Ok(comments
            .into_iter()
            .map(|comment| {
                let author = inner
                    .users
                    .iter()
                    .find(|user| user.id == comment.author_id)
                    .expect("comment author exists");
                PostComment {
                    id: comment.id,
                    text: comment.text.clone(),
                    created: comment.created,
                    author_username: author.username.clone(),
                }
            })
            .collect())
    }

    async fn create_comment(
        &self,
        params: CreateCommentParams,
    ) -> Result<CommentRecord, RepoError> {
        let mut inner = self.inner.lock().unwrap();
        let record = CommentRecord {
            id: inner.next_id(),
            text: params.text,
            created: OffsetDateTime::now_utc(),
            author_id: params.author_id,
            post_id: params.post_id,
        };
        inner.comments.push(record.clone());
        Ok(record)
    }
}

#[async_trait]
impl FollowsRepo for MemoryRepos {
    async fn create_if_absent(&self, user_id: i64, author_id: i64) -> Result<bool, RepoError> {
        let mut inner = self.inner.lock().unwrap();
        if inner
            .follows
            .iter()
            .any(|follow| follow.user_id == user_id && follow.author_id == author_id)
        {
            return Ok(false);
        }
        let id = inner.next_id();
        inner.follows.push(FollowRecord {
            id,
            user_id,
            author_id,
        });
        Ok(true)
    }

    async fn delete(&self, user_id: i64, author_id: i64) -> Result<bool, RepoError> {
        let mut inner = self.inner.lock().unwrap();
        let before = inner.follows.len();
        inner
            .follows
            .retain(|follow| !(follow.user_id == user_id && follow.author_id == author_id));
        Ok(inner.follows.len() != before)
    }

    async fn exists(&self, user_id: i64, author_id: i64) -> Result<bool, RepoError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .follows
            .iter()
            .any(|follow| follow.user_id == user_id && follow.author_id == author_id))
    }
}

#[async_trait]
impl SessionsRepo for MemoryRepos {
    async fn create_session(&self, record: SessionRecord) -> Result<(), RepoError> {
        let mut inner = self.inner.lock().unwrap();
        inner.sessions.push(record);
        Ok(())
    }

    async fn find_user_by_digest(
        &self,
        digest: &str,
        now: OffsetDateTime,
    ) -> Result<Option<UserRecord>, RepoError> {
        let inner = self.inner.lock().unwrap();
        let Some(session) = inner
            .sessions
            .iter()
            .find(|session| session.token_digest == digest && session.expires_at > now)
        else {
            return Ok(None);
        };
        Ok(inner
            .users
            .iter()
            .find(|user| user.id == session.user_id)
            .cloned())
    }

    async fn delete_session(&self, digest: &str) -> Result<(), RepoError> {
        let mut inner = self.inner.lock().unwrap();
        inner.sessions.retain(|session| session.token_digest != digest);
        Ok(())
    }
}

pub struct TestApp {
    pub router: Router,
    pub repos: Arc<MemoryRepos>,
    pub state: HttpState,
    // Holds the media directory alive for the duration of the test.
    _media_dir: tempfile::TempDir,
}

pub fn test_app() -> TestApp {
    test_app_with_page_size(10)
}

pub fn test_app_with_page_size(page_size: u64) -> TestApp {
    let repos = Arc::new(MemoryRepos::default());
    let media_dir = tempfile::tempdir().expect("media tempdir");
    let media =
        Arc::new(MediaStorage::new(media_dir.path().to_path_buf()).expect("media storage"));

    let feed = Arc::new(FeedService::new(
        repos.clone(),
        repos.clone(),
        repos.clone(),
        repos.clone(),
        repos.clone(),
        page_size,
    ));
    let posts = Arc::new(PostService::new(
        repos.clone(),
        repos.clone(),
        repos.clone(),
        repos.clone(),
        media.clone(),
    ));
    let comments = Arc::new(CommentService::new(repos.clone()));
    let auth = Arc::new(AuthService::new(
        repos.clone(),
        repos.clone(),
        Duration::hours(2),
    ));

    let state = HttpState {
        feed,
        posts,
        comments,
        auth,
        groups: repos.clone(),
        media,
        db: None,
    };

    TestApp {
        router: build_router(state.clone()),
        repos,
        state,
        _media_dir: media_dir,
    }
}

impl TestApp {
    /// Plant a session for the user and return the cookie header value.
    pub async fn log_in(&self, user: &UserRecord) -> String {
        let token = format!("test-token-{}", user.id);
        let now = OffsetDateTime::now_utc();
        self.repos
            .create_session(SessionRecord {
                token_digest: token_digest(&token),
                user_id: user.id,
                created_at: now,
                expires_at: now + Duration::hours(1),
            })
            .await
            .expect("session created");
        format!("pero_session={token}")
    }

    pub async fn get(&self, path: &str, cookie: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder().method("GET").uri(path);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = builder.body(Body::empty()).expect("request");
        self.router.clone().oneshot(request).await.expect("response")
    }

    pub async fn post_form(
        &self,
        path: &str,
        body: &str,
        cookie: Option<&str>,
    ) -> Response<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(path)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = builder
            .body(Body::from(body.to_string()))
            .expect("request");
        self.router.clone().oneshot(request).await.expect("response")
    }

    pub async fn post_multipart(
        &self,
        path: &str,
        form: MultipartForm,
        cookie: Option<&str>,
    ) -> Response<Body> {
        let (content_type, body) = form.finish();
        let mut builder = Request::builder()
            .method("POST")
            .uri(path)
            .header(header::CONTENT_TYPE, content_type);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = builder.body(Body::from(body)).expect("request");
        self.router.clone().oneshot(request).await.expect("response")
    }
}

pub async fn body_string(response: Response<Body>) -> String {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body collected")
        .to_bytes();
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}

pub fn location(response: &Response<Body>) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("")
}

const BOUNDARY: &str = "----pero-test-boundary";

/// Minimal multipart/form-data body builder for the post form.
#[derive(Default)]
pub struct MultipartForm {
    body: Vec<u8>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, filename: &str, content_type: &str, bytes: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(bytes);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn finish(mut self) -> (String, Vec<u8>) {
        self.body
            .extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        (
            format!("multipart/form-data; boundary={BOUNDARY}"),
            self.body,
        )
    }
}
