mod about;
mod extract;
mod forms;
mod media;
mod middleware;
mod posts;
mod profiles;
mod session;

pub use extract::{MaybeUser, RequireUser, SESSION_COOKIE};

use std::sync::Arc;

use axum::{
    Router,
    http::{StatusCode, header},
    middleware as axum_middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use sqlx::Error as SqlxError;

use crate::application::auth::AuthService;
use crate::application::error::{ErrorReport, HttpError};
use crate::application::feed::{FeedError, FeedService};
use crate::application::posts::{CommentService, PostService};
use crate::application::repos::{GroupsRepo, RepoError};
use crate::infra::db::PostgresRepositories;
use crate::infra::media::MediaStorage;
use crate::presentation::views::render_not_found_response;

use middleware::{log_responses, set_request_context};

#[derive(Clone)]
pub struct HttpState {
    pub feed: Arc<FeedService>,
    pub posts: Arc<PostService>,
    pub comments: Arc<CommentService>,
    pub auth: Arc<AuthService>,
    pub groups: Arc<dyn GroupsRepo>,
    pub media: Arc<MediaStorage>,
    /// Absent when the state is backed by in-memory repositories.
    pub db: Option<Arc<PostgresRepositories>>,
}

/// A `302 Found` redirect; axum's `Redirect` has no constructor for it.
pub(crate) fn redirect_found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/", get(posts::index))
        .route("/about/author/", get(about::author))
        .route("/about/tech/", get(about::tech))
        .route("/group/{slug}/", get(posts::group_index))
        .route("/new/", get(posts::new_post_form).post(posts::new_post_submit))
        .route("/follow/", get(profiles::follow_index))
        .route(
            "/auth/signup/",
            get(session::signup_form).post(session::signup_submit),
        )
        .route(
            "/auth/login/",
            get(session::login_form).post(session::login_submit),
        )
        .route("/auth/logout/", get(session::logout))
        .route("/media/{*path}", get(media::serve_media))
        .route("/_health/db", get(db_health))
        .route("/{username}/", get(profiles::profile))
        .route("/{username}/follow/", get(profiles::profile_follow))
        .route("/{username}/unfollow/", get(profiles::profile_unfollow))
        .route("/{username}/{post_id}/", get(posts::post_detail))
        .route(
            "/{username}/{post_id}/edit/",
            get(posts::edit_post_form).post(posts::edit_post_submit),
        )
        .route("/{username}/{post_id}/comment/", post(posts::add_comment))
        .fallback(not_found)
        .with_state(state)
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}

async fn not_found(MaybeUser(viewer): MaybeUser) -> Response {
    render_not_found_response(viewer.map(|user| user.username))
}

async fn db_health(
    axum::extract::State(state): axum::extract::State<HttpState>,
) -> Response {
    match state.db {
        Some(db) => db_health_response(db.health_check().await),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

fn db_health_response(result: Result<(), SqlxError>) -> Response {
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
            ErrorReport::from_error(
                "infra::http::db_health",
                StatusCode::SERVICE_UNAVAILABLE,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}

/// Map a repository error to a consistent HTTP error response.
pub fn repo_error_to_http(source: &'static str, err: RepoError) -> HttpError {
    match err {
        RepoError::Duplicate { constraint } => {
            HttpError::new(source, StatusCode::CONFLICT, "Duplicate record", constraint)
        }
        RepoError::NotFound => HttpError::new(
            source,
            StatusCode::NOT_FOUND,
            "Resource not found",
            "resource not found",
        ),
        RepoError::Integrity { message } => HttpError::new(
            source,
            StatusCode::CONFLICT,
            "Integrity constraint violated",
            message,
        ),
        RepoError::Persistence(message) => HttpError::new(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            "Persistence error",
            message,
        ),
    }
}

/// Unknown scopes become 404 pages; everything else surfaces as an HTTP
/// error with its report attached.
fn feed_error_to_response(err: FeedError, viewer: Option<String>) -> Response {
    match err {
        FeedError::UnknownGroup => {
            let mut response = render_not_found_response(viewer);
            ErrorReport::from_message(
                "infra::http::feed_error_to_response",
                StatusCode::NOT_FOUND,
                "Unknown group",
            )
            .attach(&mut response);
            response
        }
        FeedError::UnknownAuthor => {
            let mut response = render_not_found_response(viewer);
            ErrorReport::from_message(
                "infra::http::feed_error_to_response",
                StatusCode::NOT_FOUND,
                "Unknown author",
            )
            .attach(&mut response);
            response
        }
        FeedError::Repo(err) => {
            repo_error_to_http("infra::http::feed_error_to_response", err).into_response()
        }
    }
}
