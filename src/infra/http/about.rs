//! Static pages about the site and the stack it runs on.

use axum::{http::StatusCode, response::Response};

use crate::presentation::views::{
    AboutAuthorTemplate, AboutTechTemplate, LayoutContext, render_template_response,
};

use super::MaybeUser;

pub async fn author(MaybeUser(viewer): MaybeUser) -> Response {
    let viewer = viewer.map(|user| user.username);
    let view = LayoutContext::new("About the author".to_string(), viewer, ());
    render_template_response(AboutAuthorTemplate { view }, StatusCode::OK)
}

pub async fn tech(MaybeUser(viewer): MaybeUser) -> Response {
    let viewer = viewer.map(|user| user.username);
    let view = LayoutContext::new("Technologies".to_string(), viewer, ());
    render_template_response(AboutTechTemplate { view }, StatusCode::OK)
}
