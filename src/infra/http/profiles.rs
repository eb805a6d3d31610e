//! Author profiles and the follow surface.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::application::pagination::PageQuery;
use crate::application::posts::FollowError;
use crate::presentation::views::{
    FollowIndexContext, FollowIndexTemplate, LayoutContext, PaginationView, ProfileContext,
    ProfileTemplate, post_cards, render_not_found_response, render_template_response,
};

use super::{
    HttpState, MaybeUser, RequireUser, feed_error_to_response, redirect_found,
    repo_error_to_http,
};

pub async fn profile(
    State(state): State<HttpState>,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
    MaybeUser(viewer): MaybeUser,
) -> Response {
    let viewer_id = viewer.as_ref().map(|user| user.id);
    let viewer_name = viewer.as_ref().map(|user| user.username.clone());

    match state
        .feed
        .profile_page(&username, query.requested(), viewer_id)
        .await
    {
        Ok(feed) => {
            let is_self = viewer_id == Some(feed.author.id);
            let content = ProfileContext {
                username: feed.author.username.clone(),
                post_count: feed.post_count,
                following: feed.following,
                is_self,
                show_follow_controls: viewer_id.is_some() && !is_self,
                posts: post_cards(&feed.page),
                pagination: PaginationView::from_page(&feed.page, format!("/{username}/")),
            };
            let view = LayoutContext::new(feed.author.username, viewer_name, content);
            render_template_response(ProfileTemplate { view }, StatusCode::OK)
        }
        Err(err) => feed_error_to_response(err, viewer_name),
    }
}

pub async fn follow_index(
    State(state): State<HttpState>,
    Query(query): Query<PageQuery>,
    RequireUser(user): RequireUser,
) -> Response {
    match state.feed.following_page(user.id, query.requested()).await {
        Ok(page) => {
            let content = FollowIndexContext {
                posts: post_cards(&page),
                pagination: PaginationView::from_page(&page, "/follow/"),
            };
            let view = LayoutContext::new(
                "Following".to_string(),
                Some(user.username),
                content,
            );
            render_template_response(FollowIndexTemplate { view }, StatusCode::OK)
        }
        Err(err) => feed_error_to_response(err, Some(user.username)),
    }
}

pub async fn profile_follow(
    State(state): State<HttpState>,
    Path(username): Path<String>,
    RequireUser(user): RequireUser,
) -> Response {
    match state.posts.follow(user.id, &username).await {
        Ok(()) => redirect_found(&format!("/{username}/")),
        Err(FollowError::UnknownAuthor) => render_not_found_response(Some(user.username)),
        Err(FollowError::Repo(err)) => {
            repo_error_to_http("infra::http::profiles::profile_follow", err).into_response()
        }
    }
}

pub async fn profile_unfollow(
    State(state): State<HttpState>,
    Path(username): Path<String>,
    RequireUser(user): RequireUser,
) -> Response {
    match state.posts.unfollow(user.id, &username).await {
        Ok(()) => redirect_found(&format!("/{username}/")),
        Err(FollowError::UnknownAuthor) => render_not_found_response(Some(user.username)),
        Err(FollowError::Repo(err)) => {
            repo_error_to_http("infra::http::profiles::profile_unfollow", err).into_response()
        }
    }
}
