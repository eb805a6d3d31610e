use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;
use time::OffsetDateTime;
use time::macros::format_description;

use crate::application::error::{ErrorReport, HttpError};
use crate::application::feed::PostDetail;
use crate::application::pagination::Page;
use crate::application::repos::{FeedPost, PostComment};

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Template rendering failed",
            err,
        )
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

pub fn render_not_found_response(viewer: Option<String>) -> Response {
    let view = LayoutContext::new("Page not found".to_string(), viewer, ErrorPageView::not_found());
    let mut response = render_template_response(ErrorTemplate { view }, StatusCode::NOT_FOUND);
    ErrorReport::from_message(
        "presentation::views::render_not_found_response",
        StatusCode::NOT_FOUND,
        "Resource not found",
    )
    .attach(&mut response);
    response
}

/// Everything the base layout needs, wrapped around the page content.
#[derive(Clone)]
pub struct LayoutContext<T> {
    pub title: String,
    /// Username of the signed-in viewer, if any.
    pub viewer: Option<String>,
    pub content: T,
}

impl<T> LayoutContext<T> {
    pub fn new(title: String, viewer: Option<String>, content: T) -> Self {
        Self {
            title,
            viewer,
            content,
        }
    }
}

#[derive(Clone)]
pub struct GroupBadge {
    pub slug: String,
    pub title: String,
}

#[derive(Clone)]
pub struct PostCard {
    pub id: i64,
    pub author_username: String,
    pub text: String,
    pub published: String,
    pub iso_date: String,
    pub group: Option<GroupBadge>,
    pub image_url: Option<String>,
}

impl PostCard {
    pub fn from_feed_post(post: &FeedPost) -> Self {
        let group = match (post.group_slug.as_ref(), post.group_title.as_ref()) {
            (Some(slug), Some(title)) => Some(GroupBadge {
                slug: slug.clone(),
                title: title.clone(),
            }),
            _ => None,
        };

        Self {
            id: post.id,
            author_username: post.author_username.clone(),
            text: post.text.clone(),
            published: format_published(post.pub_date),
            iso_date: format_iso(post.pub_date),
            group,
            image_url: post.image.as_ref().map(|path| format!("/media/{path}")),
        }
    }
}

#[derive(Clone)]
pub struct CommentView {
    pub author_username: String,
    pub text: String,
    pub published: String,
}

impl CommentView {
    pub fn from_comment(comment: &PostComment) -> Self {
        Self {
            author_username: comment.author_username.clone(),
            text: comment.text.clone(),
            published: format_published(comment.created),
        }
    }
}

/// Numbered page navigation rendered under every feed.
#[derive(Clone)]
pub struct PaginationView {
    pub number: u64,
    pub total_pages: u64,
    pub has_previous: bool,
    pub has_next: bool,
    /// Path the page links point at, without the query string.
    pub base_path: String,
}

impl PaginationView {
    pub fn from_page<T>(page: &Page<T>, base_path: impl Into<String>) -> Self {
        Self {
            number: page.number,
            total_pages: page.total_pages,
            has_previous: page.has_previous(),
            has_next: page.has_next(),
            base_path: base_path.into(),
        }
    }

    pub fn previous_number(&self) -> u64 {
        self.number.saturating_sub(1)
    }

    pub fn next_number(&self) -> u64 {
        self.number + 1
    }
}

pub fn post_cards(page: &Page<FeedPost>) -> Vec<PostCard> {
    page.items.iter().map(PostCard::from_feed_post).collect()
}

#[derive(Template)]
#[template(path = "about_author.html")]
pub struct AboutAuthorTemplate {
    pub view: LayoutContext<()>,
}

#[derive(Template)]
#[template(path = "about_tech.html")]
pub struct AboutTechTemplate {
    pub view: LayoutContext<()>,
}

pub struct IndexContext {
    pub posts: Vec<PostCard>,
    pub pagination: PaginationView,
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub view: LayoutContext<IndexContext>,
}

pub struct GroupContext {
    pub title: String,
    pub slug: String,
    pub description: String,
    pub posts: Vec<PostCard>,
    pub pagination: PaginationView,
}

#[derive(Template)]
#[template(path = "group.html")]
pub struct GroupTemplate {
    pub view: LayoutContext<GroupContext>,
}

pub struct ProfileContext {
    pub username: String,
    pub post_count: u64,
    pub following: bool,
    pub is_self: bool,
    /// Follow buttons only make sense for a signed-in viewer looking at
    /// someone else's page.
    pub show_follow_controls: bool,
    pub posts: Vec<PostCard>,
    pub pagination: PaginationView,
}

#[derive(Template)]
#[template(path = "profile.html")]
pub struct ProfileTemplate {
    pub view: LayoutContext<ProfileContext>,
}

pub struct PostDetailContext {
    pub post: PostCard,
    pub author_post_count: u64,
    pub can_edit: bool,
    pub comments: Vec<CommentView>,
    pub comment_text: String,
    pub comment_error: Option<&'static str>,
    /// Whether to render the comment form at all.
    pub viewer_signed_in: bool,
}

impl PostDetailContext {
    pub fn from_detail(detail: &PostDetail, viewer_id: Option<i64>) -> Self {
        Self {
            post: PostCard::from_feed_post(&detail.post),
            author_post_count: detail.author_post_count,
            can_edit: viewer_id == Some(detail.post.author_id),
            comments: detail.comments.iter().map(CommentView::from_comment).collect(),
            comment_text: String::new(),
            comment_error: None,
            viewer_signed_in: viewer_id.is_some(),
        }
    }
}

#[derive(Template)]
#[template(path = "post.html")]
pub struct PostTemplate {
    pub view: LayoutContext<PostDetailContext>,
}

#[derive(Clone)]
pub struct GroupOption {
    pub slug: String,
    pub title: String,
    pub selected: bool,
}

pub struct PostFormContext {
    pub heading: &'static str,
    pub submit_label: &'static str,
    /// Where the form posts back to.
    pub action: String,
    pub text: String,
    pub groups: Vec<GroupOption>,
    pub text_error: Option<&'static str>,
    pub group_error: Option<&'static str>,
    pub image_error: Option<&'static str>,
}

#[derive(Template)]
#[template(path = "post_form.html")]
pub struct PostFormTemplate {
    pub view: LayoutContext<PostFormContext>,
}

pub struct FollowIndexContext {
    pub posts: Vec<PostCard>,
    pub pagination: PaginationView,
}

#[derive(Template)]
#[template(path = "follow.html")]
pub struct FollowIndexTemplate {
    pub view: LayoutContext<FollowIndexContext>,
}

pub struct LoginContext {
    pub username: String,
    pub next: Option<String>,
    pub error: Option<&'static str>,
}

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub view: LayoutContext<LoginContext>,
}

pub struct SignupContext {
    pub username: String,
    pub username_error: Option<&'static str>,
    pub password_error: Option<&'static str>,
}

#[derive(Template)]
#[template(path = "signup.html")]
pub struct SignupTemplate {
    pub view: LayoutContext<SignupContext>,
}

pub struct ErrorPageView {
    pub status: u16,
    pub message: &'static str,
}

impl ErrorPageView {
    pub fn not_found() -> Self {
        Self {
            status: 404,
            message: "The page you are looking for does not exist.",
        }
    }
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub view: LayoutContext<ErrorPageView>,
}

fn format_published(value: OffsetDateTime) -> String {
    let description = format_description!("[day padding:none] [month repr:short] [year]");
    value
        .format(&description)
        .unwrap_or_else(|_| value.to_string())
}

fn format_iso(value: OffsetDateTime) -> String {
    value
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| value.to_string())
}
