//! Signup, login and logout handlers.

use axum::{
    Form,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use time::OffsetDateTime;

use crate::application::auth::{AuthError, EstablishedSession};
use crate::application::error::HttpError;
use crate::presentation::views::{
    LayoutContext, LoginContext, LoginTemplate, SignupContext, SignupTemplate,
    render_template_response,
};

use super::{HttpState, MaybeUser, SESSION_COOKIE, forms, redirect_found};

fn session_cookie(session: &EstablishedSession) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, session.token.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(session.expires_at - OffsetDateTime::now_utc())
        .build()
}

/// Only same-site relative paths are honoured as a post-login destination.
fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") => path,
        _ => "/",
    }
}

fn render_login(
    viewer: Option<String>,
    username: String,
    next: Option<String>,
    error: Option<&'static str>,
) -> Response {
    let content = LoginContext {
        username,
        next,
        error,
    };
    let view = LayoutContext::new("Log in".to_string(), viewer, content);
    render_template_response(LoginTemplate { view }, StatusCode::OK)
}

pub async fn login_form(
    Query(query): Query<forms::LoginQuery>,
    MaybeUser(viewer): MaybeUser,
) -> Response {
    render_login(
        viewer.map(|user| user.username),
        String::new(),
        query.next,
        None,
    )
}

pub async fn login_submit(
    State(state): State<HttpState>,
    jar: CookieJar,
    Form(form): Form<forms::LoginForm>,
) -> Response {
    match state.auth.login(&form.username, &form.password).await {
        Ok(session) => {
            let destination = safe_next(form.next.as_deref()).to_string();
            let jar = jar.add(session_cookie(&session));
            (jar, redirect_found(&destination)).into_response()
        }
        Err(AuthError::InvalidCredentials) => render_login(
            None,
            form.username,
            form.next,
            Some("Invalid username or password."),
        ),
        Err(err) => HttpError::from_error(
            "infra::http::session::login_submit",
            StatusCode::INTERNAL_SERVER_ERROR,
            "Login failed",
            &err,
        )
        .into_response(),
    }
}

fn render_signup(
    username: String,
    username_error: Option<&'static str>,
    password_error: Option<&'static str>,
) -> Response {
    let content = SignupContext {
        username,
        username_error,
        password_error,
    };
    let view = LayoutContext::new("Sign up".to_string(), None, content);
    render_template_response(SignupTemplate { view }, StatusCode::OK)
}

pub async fn signup_form(MaybeUser(viewer): MaybeUser) -> Response {
    if viewer.is_some() {
        return redirect_found("/");
    }
    render_signup(String::new(), None, None)
}

pub async fn signup_submit(
    State(state): State<HttpState>,
    jar: CookieJar,
    Form(form): Form<forms::SignupForm>,
) -> Response {
    match state.auth.signup(&form.username, &form.password).await {
        Ok(session) => {
            let jar = jar.add(session_cookie(&session));
            (jar, redirect_found("/")).into_response()
        }
        Err(AuthError::Invalid(errors)) => {
            render_signup(form.username, errors.username, errors.password)
        }
        Err(err) => HttpError::from_error(
            "infra::http::session::signup_submit",
            StatusCode::INTERNAL_SERVER_ERROR,
            "Signup failed",
            &err,
        )
        .into_response(),
    }
}

pub async fn logout(State(state): State<HttpState>, jar: CookieJar) -> Response {
    let jar = match jar.get(SESSION_COOKIE) {
        Some(cookie) => {
            if let Err(err) = state.auth.logout(cookie.value()).await {
                return HttpError::from_error(
                    "infra::http::session::logout",
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Logout failed",
                    &err,
                )
                .into_response();
            }
            jar.remove(Cookie::build((SESSION_COOKIE, "")).path("/").build())
        }
        None => jar,
    };

    (jar, redirect_found("/")).into_response()
}
