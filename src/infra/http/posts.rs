//! Feed pages, the post form, and comments.

use axum::{
    Form,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::Multipart;

use crate::application::error::HttpError;
use crate::application::pagination::PageQuery;
use crate::application::posts::{CommentSubmitError, PostFieldErrors, PostSubmitError};
use crate::application::repos::GroupsRepo;
use crate::domain::policy;
use crate::domain::entities::UserRecord;
use crate::presentation::views::{
    GroupContext, GroupOption, GroupTemplate, IndexContext, IndexTemplate, LayoutContext,
    PaginationView, PostDetailContext, PostFormContext, PostFormTemplate, PostTemplate,
    post_cards, render_not_found_response, render_template_response,
};

use super::{
    HttpState, MaybeUser, RequireUser, feed_error_to_response, forms, redirect_found,
    repo_error_to_http,
};

fn viewer_name(viewer: &Option<UserRecord>) -> Option<String> {
    viewer.as_ref().map(|user| user.username.clone())
}

pub async fn index(
    State(state): State<HttpState>,
    Query(query): Query<PageQuery>,
    MaybeUser(viewer): MaybeUser,
) -> Response {
    match state.feed.global_page(query.requested()).await {
        Ok(page) => {
            let content = IndexContext {
                posts: post_cards(&page),
                pagination: PaginationView::from_page(&page, "/"),
            };
            let view =
                LayoutContext::new("Latest posts".to_string(), viewer_name(&viewer), content);
            render_template_response(IndexTemplate { view }, StatusCode::OK)
        }
        Err(err) => feed_error_to_response(err, viewer_name(&viewer)),
    }
}

pub async fn group_index(
    State(state): State<HttpState>,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
    MaybeUser(viewer): MaybeUser,
) -> Response {
    match state.feed.group_page(&slug, query.requested()).await {
        Ok(feed) => {
            let content = GroupContext {
                title: feed.group.title.clone(),
                slug: feed.group.slug.clone(),
                description: feed.group.description.clone(),
                posts: post_cards(&feed.page),
                pagination: PaginationView::from_page(&feed.page, format!("/group/{slug}/")),
            };
            let view = LayoutContext::new(feed.group.title, viewer_name(&viewer), content);
            render_template_response(GroupTemplate { view }, StatusCode::OK)
        }
        Err(err) => feed_error_to_response(err, viewer_name(&viewer)),
    }
}

pub async fn post_detail(
    State(state): State<HttpState>,
    Path((username, post_id)): Path<(String, String)>,
    MaybeUser(viewer): MaybeUser,
) -> Response {
    // A non-numeric id segment is a page that does not exist, not a 400.
    let Ok(post_id) = post_id.parse::<i64>() else {
        return render_not_found_response(viewer_name(&viewer));
    };

    match state.feed.post_detail(&username, post_id).await {
        Ok(Some(detail)) => {
            let viewer_id = viewer.as_ref().map(|user| user.id);
            let content = PostDetailContext::from_detail(&detail, viewer_id);
            let view = LayoutContext::new(
                format!("Post by {username}"),
                viewer_name(&viewer),
                content,
            );
            render_template_response(PostTemplate { view }, StatusCode::OK)
        }
        Ok(None) => render_not_found_response(viewer_name(&viewer)),
        Err(err) => feed_error_to_response(err, viewer_name(&viewer)),
    }
}

async fn group_options(
    groups: &dyn GroupsRepo,
    selected: Option<&str>,
) -> Result<Vec<GroupOption>, Response> {
    match groups.list_all().await {
        Ok(records) => Ok(records
            .into_iter()
            .map(|group| GroupOption {
                selected: selected == Some(group.slug.as_str()),
                slug: group.slug,
                title: group.title,
            })
            .collect()),
        Err(err) => Err(repo_error_to_http("infra::http::posts::group_options", err)
            .into_response()),
    }
}

fn post_form_view(
    heading: &'static str,
    submit_label: &'static str,
    action: String,
    text: String,
    groups: Vec<GroupOption>,
    errors: PostFieldErrors,
    viewer: Option<String>,
) -> Response {
    let content = PostFormContext {
        heading,
        submit_label,
        action,
        text,
        groups,
        text_error: errors.text,
        group_error: errors.group,
        image_error: errors.image,
    };
    let view = LayoutContext::new(heading.to_string(), viewer, content);
    render_template_response(PostFormTemplate { view }, StatusCode::OK)
}

pub async fn new_post_form(
    State(state): State<HttpState>,
    RequireUser(user): RequireUser,
) -> Response {
    let groups = match group_options(state.groups.as_ref(), None).await {
        Ok(groups) => groups,
        Err(response) => return response,
    };

    post_form_view(
        "New post",
        "Publish",
        "/new/".to_string(),
        String::new(),
        groups,
        PostFieldErrors::default(),
        Some(user.username),
    )
}

pub async fn new_post_submit(
    State(state): State<HttpState>,
    RequireUser(user): RequireUser,
    mut multipart: Multipart,
) -> Response {
    let input = match forms::read_post_form(&mut multipart).await {
        Ok(input) => input,
        Err(err) => return HttpError::from(err).into_response(),
    };

    let entered_text = input.text.clone();
    let entered_group = input.group.clone();

    match state.posts.create_post(user.id, input).await {
        Ok(_) => redirect_found("/"),
        Err(PostSubmitError::Invalid(errors)) => {
            let groups = match group_options(state.groups.as_ref(), entered_group.as_deref()).await
            {
                Ok(groups) => groups,
                Err(response) => return response,
            };
            post_form_view(
                "New post",
                "Publish",
                "/new/".to_string(),
                entered_text,
                groups,
                errors,
                Some(user.username),
            )
        }
        Err(PostSubmitError::Media(err)) => HttpError::from_error(
            "infra::http::posts::new_post_submit",
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to store the uploaded image",
            &err,
        )
        .into_response(),
        Err(PostSubmitError::Repo(err)) => {
            repo_error_to_http("infra::http::posts::new_post_submit", err).into_response()
        }
    }
}

pub async fn edit_post_form(
    State(state): State<HttpState>,
    Path((username, post_id)): Path<(String, String)>,
    RequireUser(user): RequireUser,
) -> Response {
    let Ok(post_id) = post_id.parse::<i64>() else {
        return render_not_found_response(Some(user.username));
    };

    let detail = match state.feed.post_detail(&username, post_id).await {
        Ok(Some(detail)) => detail,
        Ok(None) => return render_not_found_response(Some(user.username)),
        Err(err) => return feed_error_to_response(err, Some(user.username)),
    };

    // Only the author may edit; everyone else is bounced to the post page.
    if !policy::can_edit_post(user.id, detail.post.author_id) {
        return redirect_found(&format!("/{username}/{post_id}/"));
    }

    let groups =
        match group_options(state.groups.as_ref(), detail.post.group_slug.as_deref()).await {
            Ok(groups) => groups,
            Err(response) => return response,
        };

    post_form_view(
        "Edit post",
        "Save",
        format!("/{username}/{post_id}/edit/"),
        detail.post.text,
        groups,
        PostFieldErrors::default(),
        Some(user.username),
    )
}

pub async fn edit_post_submit(
    State(state): State<HttpState>,
    Path((username, post_id)): Path<(String, String)>,
    RequireUser(user): RequireUser,
    mut multipart: Multipart,
) -> Response {
    let Ok(post_id) = post_id.parse::<i64>() else {
        return render_not_found_response(Some(user.username));
    };

    let detail = match state.feed.post_detail(&username, post_id).await {
        Ok(Some(detail)) => detail,
        Ok(None) => return render_not_found_response(Some(user.username)),
        Err(err) => return feed_error_to_response(err, Some(user.username)),
    };

    if !policy::can_edit_post(user.id, detail.post.author_id) {
        return redirect_found(&format!("/{username}/{post_id}/"));
    }

    let input = match forms::read_post_form(&mut multipart).await {
        Ok(input) => input,
        Err(err) => return HttpError::from(err).into_response(),
    };

    let entered_text = input.text.clone();
    let entered_group = input.group.clone();

    match state.posts.update_post(post_id, input).await {
        Ok(_) => redirect_found(&format!("/{username}/{post_id}/")),
        Err(PostSubmitError::Invalid(errors)) => {
            let groups = match group_options(state.groups.as_ref(), entered_group.as_deref()).await
            {
                Ok(groups) => groups,
                Err(response) => return response,
            };
            post_form_view(
                "Edit post",
                "Save",
                format!("/{username}/{post_id}/edit/"),
                entered_text,
                groups,
                errors,
                Some(user.username),
            )
        }
        Err(PostSubmitError::Media(err)) => HttpError::from_error(
            "infra::http::posts::edit_post_submit",
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to store the uploaded image",
            &err,
        )
        .into_response(),
        Err(PostSubmitError::Repo(err)) => {
            repo_error_to_http("infra::http::posts::edit_post_submit", err).into_response()
        }
    }
}

pub async fn add_comment(
    State(state): State<HttpState>,
    Path((username, post_id)): Path<(String, String)>,
    RequireUser(user): RequireUser,
    Form(form): Form<forms::CommentForm>,
) -> Response {
    let Ok(post_id) = post_id.parse::<i64>() else {
        return render_not_found_response(Some(user.username));
    };

    let detail = match state.feed.post_detail(&username, post_id).await {
        Ok(Some(detail)) => detail,
        Ok(None) => return render_not_found_response(Some(user.username)),
        Err(err) => return feed_error_to_response(err, Some(user.username)),
    };

    let result = state.comments.add_comment(user.id, post_id, &form.text).await;
    match result {
        Ok(_) => redirect_found(&format!("/{username}/{post_id}/")),
        Err(CommentSubmitError::EmptyText) => {
            // Re-render the post page with a field error so the input is
            // not silently dropped.
            let mut content = PostDetailContext::from_detail(&detail, Some(user.id));
            content.comment_text = form.text;
            content.comment_error = Some("Enter a comment.");
            let view = LayoutContext::new(
                format!("Post by {username}"),
                Some(user.username),
                content,
            );
            render_template_response(PostTemplate { view }, StatusCode::OK)
        }
        Err(CommentSubmitError::Repo(err)) => {
            repo_error_to_http("infra::http::posts::add_comment", err).into_response()
        }
    }
}
